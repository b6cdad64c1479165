//! 模拟相机

use crate::{CaptureDevice, IoError};
use fieldbot_protocol::Frame;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

#[derive(Default)]
struct CameraState {
    script: VecDeque<Option<Frame>>,
    repeat: Option<Frame>,
    reads: usize,
}

/// 模拟相机
///
/// 依次返回脚本中的帧（`None` 表示丢帧）；脚本耗尽后返回 `repeat` 帧，未设置则一直丢帧。
pub struct MockCamera {
    state: Arc<Mutex<CameraState>>,
}

#[derive(Clone)]
pub struct MockCameraHandle {
    state: Arc<Mutex<CameraState>>,
}

impl MockCamera {
    pub fn new() -> (Self, MockCameraHandle) {
        let state = Arc::new(Mutex::new(CameraState::default()));
        (
            Self {
                state: state.clone(),
            },
            MockCameraHandle { state },
        )
    }
}

impl MockCameraHandle {
    pub fn push_frame(&self, frame: Frame) {
        self.state.lock().script.push_back(Some(frame));
    }

    pub fn push_drop(&self) {
        self.state.lock().script.push_back(None);
    }

    /// 脚本耗尽后持续返回的帧
    pub fn set_repeat(&self, frame: Option<Frame>) {
        self.state.lock().repeat = frame;
    }

    pub fn reads(&self) -> usize {
        self.state.lock().reads
    }

    pub fn remaining(&self) -> usize {
        self.state.lock().script.len()
    }
}

impl CaptureDevice for MockCamera {
    fn read_frame(&mut self) -> Result<Frame, IoError> {
        let mut state = self.state.lock();
        state.reads += 1;
        let next = match state.script.pop_front() {
            Some(entry) => entry,
            None => state.repeat.clone(),
        };
        next.ok_or(IoError::FrameDropped)
    }
}
