//! ZeroMQ REQ 后端
//!
//! 决策服务器是一个 REP socket。REQ socket 在收到应答之前拒绝再次发送，
//! 所以超时后必须 `reset()` 重建 socket 才能继续（lazy pirate 模式）。

use crate::{IoError, Readiness, RequestSocket};
use std::time::Duration;
use tracing::debug;

impl From<zmq::Error> for IoError {
    fn from(err: zmq::Error) -> Self {
        IoError::Transport(err.to_string())
    }
}

/// ZeroMQ REQ socket
pub struct ZmqReqSocket {
    ctx: zmq::Context,
    socket: zmq::Socket,
    endpoint: String,
}

impl ZmqReqSocket {
    /// 连接决策服务器（如 `tcp://10.42.0.1:1980`）
    pub fn connect(endpoint: &str) -> Result<Self, IoError> {
        Self::connect_with_context(zmq::Context::new(), endpoint)
    }

    /// 在已有 context 上连接（`inproc://` 端点需要共享 context）
    pub fn connect_with_context(ctx: zmq::Context, endpoint: &str) -> Result<Self, IoError> {
        let socket = open_socket(&ctx, endpoint)?;
        debug!("ZMQ REQ socket connected to {}", endpoint);
        Ok(Self {
            ctx,
            socket,
            endpoint: endpoint.to_string(),
        })
    }
}

fn open_socket(ctx: &zmq::Context, endpoint: &str) -> Result<zmq::Socket, IoError> {
    let socket = ctx.socket(zmq::REQ)?;
    // 关闭时立即丢弃未发出的消息
    socket.set_linger(0)?;
    socket.connect(endpoint)?;
    Ok(socket)
}

impl RequestSocket for ZmqReqSocket {
    fn send(&mut self, payload: &[u8]) -> Result<(), IoError> {
        self.socket.send(payload, 0)?;
        Ok(())
    }

    fn poll_readable(&mut self, timeout: Duration) -> Result<Readiness, IoError> {
        let timeout_ms = i64::try_from(timeout.as_millis()).unwrap_or(i64::MAX);
        let mut items = [self.socket.as_poll_item(zmq::POLLIN)];
        let signalled = zmq::poll(&mut items, timeout_ms)?;
        if signalled == 0 {
            Ok(Readiness::TimedOut)
        } else if items[0].is_readable() {
            Ok(Readiness::Readable)
        } else {
            Ok(Readiness::Spurious)
        }
    }

    fn recv(&mut self) -> Result<Vec<u8>, IoError> {
        Ok(self.socket.recv_bytes(zmq::DONTWAIT)?)
    }

    fn reset(&mut self) -> Result<(), IoError> {
        self.socket = open_socket(&self.ctx, &self.endpoint)?;
        debug!("ZMQ REQ socket reconnected to {}", self.endpoint);
        Ok(())
    }
}
