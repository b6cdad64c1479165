//! 决策通道
//!
//! 每次迭代发送一次请求（角色 + 上次状态 + 最新帧），最多等待 `timeout` 取回动作。
//! 超时、解析失败、无动作都只表示“本轮没有动作”；只有 socket 报告就绪却读不到数据时
//! 才返回 [`DriverError::ChannelBroken`]。

use crate::error::DriverError;
use crate::metrics::{DecisionMetrics, bump};
use fieldbot_io::{Readiness, RequestSocket};
use fieldbot_protocol::{Command, Frame, Request, Response, Role, Status};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecisionConfig {
    /// 等待应答的上限
    pub timeout: Duration,
    /// 就绪但无数据时是否终止（否则按超时处理）
    pub fatal_on_spurious_wakeup: bool,
    /// 超时或传输错误后重建 socket，恢复一问一答状态
    pub reset_on_failure: bool,
}

impl Default for DecisionConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(1000),
            fatal_on_spurious_wakeup: true,
            reset_on_failure: true,
        }
    }
}

enum Exchange {
    Reply(Vec<u8>),
    TimedOut,
    Spurious,
}

/// 与决策服务器的请求/应答通道
pub struct DecisionChannel<S> {
    socket: S,
    role: Role,
    config: DecisionConfig,
    metrics: Arc<DecisionMetrics>,
}

impl<S: RequestSocket> DecisionChannel<S> {
    pub fn new(socket: S, role: Role, config: DecisionConfig) -> Self {
        Self {
            socket,
            role,
            config,
            metrics: Arc::new(DecisionMetrics::default()),
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn metrics(&self) -> Arc<DecisionMetrics> {
        self.metrics.clone()
    }

    /// 请求下一个动作
    ///
    /// `Ok(None)` 表示本轮没有动作（超时、无效应答或服务器未给出动作）。
    pub fn propose(
        &mut self,
        status: &Status,
        frame: &Frame,
    ) -> Result<Option<Command>, DriverError> {
        bump(&self.metrics.requests_total);
        debug!("Requesting action (last status {})", status);

        match self.exchange(status, frame) {
            Ok(Exchange::Reply(bytes)) => Ok(self.interpret(&bytes)),
            Ok(Exchange::TimedOut) => {
                warn!("Poll timeout: no reply within {:?}", self.config.timeout);
                bump(&self.metrics.poll_timeouts);
                self.recover();
                Ok(None)
            },
            Ok(Exchange::Spurious) => {
                if self.config.fatal_on_spurious_wakeup {
                    error!("Socket timeout: readiness signalled but no reply to read");
                    return Err(DriverError::ChannelBroken);
                }
                warn!("Socket timeout: readiness signalled but no reply to read");
                bump(&self.metrics.poll_timeouts);
                self.recover();
                Ok(None)
            },
            Err(e) => {
                warn!("Decision request failed: {}", e);
                bump(&self.metrics.transport_errors);
                self.recover();
                Ok(None)
            },
        }
    }

    fn exchange(&mut self, status: &Status, frame: &Frame) -> Result<Exchange, DriverError> {
        let payload = Request::new(self.role, status, frame).encode()?;
        self.socket.send(&payload)?;

        match self.socket.poll_readable(self.config.timeout)? {
            Readiness::Readable => Ok(Exchange::Reply(self.socket.recv()?)),
            Readiness::TimedOut => Ok(Exchange::TimedOut),
            Readiness::Spurious => Ok(Exchange::Spurious),
        }
    }

    fn interpret(&self, bytes: &[u8]) -> Option<Command> {
        info!("Response: {}", String::from_utf8_lossy(bytes));
        let response = match Response::decode(bytes) {
            Ok(response) => response,
            Err(e) => {
                warn!("Discarding unreadable reply: {}", e);
                bump(&self.metrics.invalid_replies);
                return None;
            },
        };

        match response.action() {
            Some(action) => {
                info!("Action: {}", action);
                bump(&self.metrics.actions_received);
                Some(action)
            },
            None => {
                debug!("Server returned no action");
                bump(&self.metrics.empty_replies);
                None
            },
        }
    }

    fn recover(&mut self) {
        if !self.config.reset_on_failure {
            return;
        }
        match self.socket.reset() {
            Ok(()) => {
                bump(&self.metrics.socket_resets);
                debug!("Decision socket reset");
            },
            Err(e) => warn!("Failed to reset decision socket: {}", e),
        }
    }
}
