//! 控制循环的三个接缝
//!
//! 驱动层组件直接实现这些 trait；测试可以换成闭包或脚本。

use fieldbot_driver::{ActuatorLink, DecisionChannel, DriverError, FrameSource};
use fieldbot_io::{RequestSocket, SerialLink};
use fieldbot_protocol::{Command, Frame, Status};
use std::sync::Arc;

/// 感知：提供最新帧
pub trait Sense {
    /// 总是返回一帧（失败时为全零帧）
    fn latest_frame(&self) -> Arc<Frame>;
}

/// 决策：根据上次状态和当前帧给出动作
pub trait Decide {
    /// `Ok(None)` 表示本轮没有动作；`Err` 只用于不可恢复的通道故障
    fn propose(&mut self, status: &Status, frame: &Frame) -> Result<Option<Command>, DriverError>;
}

/// 执行：下发指令，返回新状态
pub trait Actuate {
    /// 从不失败；故障折算为哨兵状态
    fn execute(&mut self, command: &Command) -> Status;
}

impl Sense for FrameSource {
    fn latest_frame(&self) -> Arc<Frame> {
        self.latest()
    }
}

impl<S: RequestSocket> Decide for DecisionChannel<S> {
    fn propose(&mut self, status: &Status, frame: &Frame) -> Result<Option<Command>, DriverError> {
        DecisionChannel::propose(self, status, frame)
    }
}

impl<L: SerialLink> Actuate for ActuatorLink<L> {
    fn execute(&mut self, command: &Command) -> Status {
        ActuatorLink::execute(self, command)
    }
}

impl<T: Sense + ?Sized> Sense for Box<T> {
    fn latest_frame(&self) -> Arc<Frame> {
        (**self).latest_frame()
    }
}

impl<T: Decide + ?Sized> Decide for Box<T> {
    fn propose(&mut self, status: &Status, frame: &Frame) -> Result<Option<Command>, DriverError> {
        (**self).propose(status, frame)
    }
}

impl<T: Actuate + ?Sized> Actuate for Box<T> {
    fn execute(&mut self, command: &Command) -> Status {
        (**self).execute(command)
    }
}
