//! 组装好的机器人

use crate::control_loop::{ControlLoop, LoopMetrics, LoopSnapshot, StepOutcome};
use crate::error::ClientError;
use fieldbot_driver::{
    ActuatorLink, ActuatorMetrics, ActuatorSnapshot, CancelToken, CaptureMetrics,
    CaptureSnapshot, DecisionChannel, DecisionMetrics, DecisionSnapshot, FrameSource,
};
use fieldbot_io::{RequestSocket, SerialLink};
use fieldbot_protocol::{Frame, Role, Status};
use std::sync::Arc;

/// 所有计数器的快照
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RobotSnapshot {
    pub control: LoopSnapshot,
    pub capture: CaptureSnapshot,
    pub decision: DecisionSnapshot,
    pub actuator: ActuatorSnapshot,
}

/// 一台运行中的机器人
///
/// 由 [`RobotBuilder`](crate::RobotBuilder) 创建。drop 时停止采集线程。
pub struct Robot<L, S> {
    role: Role,
    control: ControlLoop<FrameSource, DecisionChannel<S>, ActuatorLink<L>>,
    loop_metrics: Arc<LoopMetrics>,
    capture_metrics: Arc<CaptureMetrics>,
    decision_metrics: Arc<DecisionMetrics>,
    actuator_metrics: Arc<ActuatorMetrics>,
}

impl<L: SerialLink, S: RequestSocket> Robot<L, S> {
    pub(crate) fn new(
        role: Role,
        frames: FrameSource,
        decision: DecisionChannel<S>,
        actuator: ActuatorLink<L>,
        token: CancelToken,
    ) -> Self {
        let capture_metrics = frames.metrics();
        let decision_metrics = decision.metrics();
        let actuator_metrics = actuator.metrics();
        let control = ControlLoop::new(frames, decision, actuator, token);

        Self {
            role,
            loop_metrics: control.metrics(),
            control,
            capture_metrics,
            decision_metrics,
            actuator_metrics,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// 最近一次执行结果
    pub fn status(&self) -> &Status {
        self.control.status()
    }

    pub fn latest_frame(&self) -> Arc<Frame> {
        self.control.sense().latest()
    }

    pub fn is_actuator_connected(&self) -> bool {
        self.control.actuate().is_connected()
    }

    pub fn is_capturing(&self) -> bool {
        self.control.sense().is_capturing()
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.control.token().clone()
    }

    /// 执行一轮
    pub fn step(&mut self) -> Result<StepOutcome, ClientError> {
        Ok(self.control.step()?)
    }

    /// 运行到取消或致命故障
    pub fn run(&mut self) -> Result<(), ClientError> {
        Ok(self.control.run()?)
    }

    pub fn snapshot(&self) -> RobotSnapshot {
        RobotSnapshot {
            control: self.loop_metrics.snapshot(),
            capture: self.capture_metrics.snapshot(),
            decision: self.decision_metrics.snapshot(),
            actuator: self.actuator_metrics.snapshot(),
        }
    }
}
