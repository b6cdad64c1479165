//! 控制循环
//!
//! 单线程、严格串行：每轮取一帧、请求一次动作，有动作才执行。
//! 状态只在执行完成后更新，下一轮请求携带的总是最近一次执行结果。
//!
//! 单轮中的 panic 被捕获并记录，循环继续；只有不可恢复的通道故障
//! （[`DriverError::is_fatal`]）会让 `run` 返回错误。

use crate::seams::{Actuate, Decide, Sense};
use fieldbot_driver::{CancelToken, DriverError};
use fieldbot_protocol::{Command, Status};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, error, info, warn};

/// 循环所处阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// 等待决策（采帧 + 请求）
    AwaitingAction,
    /// 正在执行指令
    Executing,
}

/// 单轮结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// 执行了指令，得到新状态
    Acted(Status),
    /// 本轮没有动作
    Idle,
}

/// 循环计数
#[derive(Debug, Default)]
pub struct LoopMetrics {
    pub iterations: AtomicU64,
    pub actions_executed: AtomicU64,
    pub idle_cycles: AtomicU64,
    pub panics_caught: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopSnapshot {
    pub iterations: u64,
    pub actions_executed: u64,
    pub idle_cycles: u64,
    pub panics_caught: u64,
}

impl LoopMetrics {
    pub fn snapshot(&self) -> LoopSnapshot {
        LoopSnapshot {
            iterations: self.iterations.load(Ordering::Relaxed),
            actions_executed: self.actions_executed.load(Ordering::Relaxed),
            idle_cycles: self.idle_cycles.load(Ordering::Relaxed),
            panics_caught: self.panics_caught.load(Ordering::Relaxed),
        }
    }
}

pub struct ControlLoop<S, D, A> {
    sense: S,
    decide: D,
    actuate: A,
    status: Status,
    state: LoopState,
    token: CancelToken,
    metrics: Arc<LoopMetrics>,
}

impl<S, D, A> ControlLoop<S, D, A>
where
    S: Sense,
    D: Decide,
    A: Actuate,
{
    /// 初始状态为 `{command: "?"}`
    pub fn new(sense: S, decide: D, actuate: A, token: CancelToken) -> Self {
        Self {
            sense,
            decide,
            actuate,
            status: Status::initial(),
            state: LoopState::AwaitingAction,
            token,
            metrics: Arc::new(LoopMetrics::default()),
        }
    }

    pub fn status(&self) -> &Status {
        &self.status
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn metrics(&self) -> Arc<LoopMetrics> {
        self.metrics.clone()
    }

    pub fn token(&self) -> &CancelToken {
        &self.token
    }

    pub fn sense(&self) -> &S {
        &self.sense
    }

    pub fn decide(&self) -> &D {
        &self.decide
    }

    pub fn actuate(&self) -> &A {
        &self.actuate
    }

    /// 执行一轮
    pub fn step(&mut self) -> Result<StepOutcome, DriverError> {
        self.state = LoopState::AwaitingAction;
        let frame = self.sense.latest_frame();

        match self.decide.propose(&self.status, &frame)? {
            Some(command) => Ok(StepOutcome::Acted(self.act(&command))),
            None => {
                self.metrics.idle_cycles.fetch_add(1, Ordering::Relaxed);
                Ok(StepOutcome::Idle)
            },
        }
    }

    fn act(&mut self, command: &Command) -> Status {
        self.state = LoopState::Executing;
        let status = self.actuate.execute(command);
        self.status = status.clone();
        self.state = LoopState::AwaitingAction;
        self.metrics.actions_executed.fetch_add(1, Ordering::Relaxed);
        status
    }

    /// 运行直到取消或遇到不可恢复的故障
    pub fn run(&mut self) -> Result<(), DriverError> {
        info!("Control loop started");

        while !self.token.is_cancelled() {
            self.metrics.iterations.fetch_add(1, Ordering::Relaxed);

            match panic::catch_unwind(AssertUnwindSafe(|| self.step())) {
                Ok(Ok(outcome)) => debug!("Iteration finished: {:?}", outcome),
                Ok(Err(e)) if e.is_fatal() => {
                    error!("Control loop aborted: {}", e);
                    return Err(e);
                },
                Ok(Err(e)) => warn!("Iteration failed: {}", e),
                Err(payload) => {
                    self.metrics.panics_caught.fetch_add(1, Ordering::Relaxed);
                    self.state = LoopState::AwaitingAction;
                    error!("Iteration panicked: {}", panic_message(payload.as_ref()));
                },
            }
        }

        info!("Control loop stopped");
        Ok(())
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        *s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic"
    }
}
