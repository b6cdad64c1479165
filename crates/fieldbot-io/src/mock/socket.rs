//! 模拟请求 socket
//!
//! 行为与 REQ socket 一致：未收到应答前再次 `send` 会失败，`reset` 后恢复。

use crate::{IoError, Readiness, RequestSocket};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

/// 一次请求对应的脚本结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockReply {
    /// 服务器按时应答
    Reply(Vec<u8>),
    /// 等待超时
    Timeout,
    /// 就绪信号但无数据
    Spurious,
    /// 发送失败
    SendError,
}

impl MockReply {
    pub fn json(raw: &str) -> Self {
        MockReply::Reply(raw.as_bytes().to_vec())
    }
}

#[derive(Default)]
struct SocketState {
    script: VecDeque<MockReply>,
    sent: Vec<Vec<u8>>,
    current: Option<MockReply>,
    awaiting_reply: bool,
    ready: Option<Vec<u8>>,
    resets: usize,
    polls: Vec<Duration>,
}

/// 模拟请求 socket
///
/// 脚本耗尽后每个请求都超时。
pub struct MockRequestSocket {
    state: Arc<Mutex<SocketState>>,
}

#[derive(Clone)]
pub struct MockSocketHandle {
    state: Arc<Mutex<SocketState>>,
}

impl MockRequestSocket {
    pub fn new() -> (Self, MockSocketHandle) {
        let state = Arc::new(Mutex::new(SocketState::default()));
        (
            Self {
                state: state.clone(),
            },
            MockSocketHandle { state },
        )
    }
}

impl MockSocketHandle {
    pub fn push(&self, reply: MockReply) {
        self.state.lock().script.push_back(reply);
    }

    pub fn push_json(&self, raw: &str) {
        self.push(MockReply::json(raw));
    }

    /// 已发送的请求（按顺序）
    pub fn sent(&self) -> Vec<Vec<u8>> {
        self.state.lock().sent.clone()
    }

    pub fn resets(&self) -> usize {
        self.state.lock().resets
    }

    /// 每次 `poll_readable` 收到的超时参数
    pub fn polls(&self) -> Vec<Duration> {
        self.state.lock().polls.clone()
    }

    pub fn remaining(&self) -> usize {
        self.state.lock().script.len()
    }
}

impl RequestSocket for MockRequestSocket {
    fn send(&mut self, payload: &[u8]) -> Result<(), IoError> {
        let mut state = self.state.lock();
        if state.awaiting_reply {
            return Err(IoError::Transport(
                "Operation cannot be accomplished in current state".to_string(),
            ));
        }
        let reply = state.script.pop_front().unwrap_or(MockReply::Timeout);
        if reply == MockReply::SendError {
            return Err(IoError::Transport("send failed".to_string()));
        }
        state.sent.push(payload.to_vec());
        state.current = Some(reply);
        state.awaiting_reply = true;
        Ok(())
    }

    fn poll_readable(&mut self, timeout: Duration) -> Result<Readiness, IoError> {
        let mut state = self.state.lock();
        state.polls.push(timeout);
        match state.current.take() {
            Some(MockReply::Reply(bytes)) => {
                state.ready = Some(bytes);
                Ok(Readiness::Readable)
            },
            Some(MockReply::Spurious) => Ok(Readiness::Spurious),
            _ => Ok(Readiness::TimedOut),
        }
    }

    fn recv(&mut self) -> Result<Vec<u8>, IoError> {
        let mut state = self.state.lock();
        match state.ready.take() {
            Some(bytes) => {
                state.awaiting_reply = false;
                Ok(bytes)
            },
            None => Err(IoError::Transport("Resource temporarily unavailable".to_string())),
        }
    }

    fn reset(&mut self) -> Result<(), IoError> {
        let mut state = self.state.lock();
        state.awaiting_reply = false;
        state.current = None;
        state.ready = None;
        state.resets += 1;
        Ok(())
    }
}
