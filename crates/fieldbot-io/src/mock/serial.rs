//! 模拟串口

use crate::{IoError, SerialLink};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

/// 一次 `read_line` 的脚本结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockRead {
    Line(String),
    Timeout,
    /// 硬错误（如设备拔出）
    Broken,
}

#[derive(Default)]
struct SerialState {
    script: VecDeque<MockRead>,
    writes: Vec<Vec<u8>>,
    reads: usize,
    fail_writes: bool,
}

/// 模拟串口链路
///
/// 脚本读完后每次 `read_line` 都返回超时。
pub struct MockSerialLink {
    name: String,
    state: Arc<Mutex<SerialState>>,
}

/// [`MockSerialLink`] 的观察/编排 handle
#[derive(Clone)]
pub struct MockSerialHandle {
    state: Arc<Mutex<SerialState>>,
}

impl MockSerialLink {
    pub fn new(name: impl Into<String>) -> (Self, MockSerialHandle) {
        let state = Arc::new(Mutex::new(SerialState::default()));
        (
            Self {
                name: name.into(),
                state: state.clone(),
            },
            MockSerialHandle { state },
        )
    }
}

impl MockSerialHandle {
    pub fn push_line(&self, line: impl Into<String>) {
        self.state.lock().script.push_back(MockRead::Line(line.into()));
    }

    pub fn push(&self, read: MockRead) {
        self.state.lock().script.push_back(read);
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.state.lock().fail_writes = fail;
    }

    /// 已写出的指令（按顺序）
    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.state.lock().writes.clone()
    }

    /// `read_line` 调用次数
    pub fn reads(&self) -> usize {
        self.state.lock().reads
    }

    pub fn remaining(&self) -> usize {
        self.state.lock().script.len()
    }
}

impl SerialLink for MockSerialLink {
    fn write_all(&mut self, bytes: &[u8]) -> Result<(), IoError> {
        let mut state = self.state.lock();
        if state.fail_writes {
            return Err(IoError::Io(std::io::Error::from(
                std::io::ErrorKind::BrokenPipe,
            )));
        }
        state.writes.push(bytes.to_vec());
        Ok(())
    }

    fn read_line(&mut self) -> Result<String, IoError> {
        let mut state = self.state.lock();
        state.reads += 1;
        match state.script.pop_front() {
            Some(MockRead::Line(line)) => Ok(line),
            Some(MockRead::Timeout) | None => Err(IoError::Timeout),
            Some(MockRead::Broken) => Err(IoError::Io(std::io::Error::from(
                std::io::ErrorKind::BrokenPipe,
            ))),
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}
