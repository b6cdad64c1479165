//! 驱动层计数器
//!
//! 所有计数器都是 `AtomicU64`，可以在任意线程无锁读取。

use std::sync::atomic::{AtomicU64, Ordering};

/// 帧采集计数
#[derive(Debug, Default)]
pub struct CaptureMetrics {
    /// 成功读取并发布的帧数
    pub frames_captured: AtomicU64,
    /// 丢帧次数（以全零帧替代）
    pub frames_dropped: AtomicU64,
    /// 形状与配置不符而被替换的帧数
    pub shape_mismatches: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureSnapshot {
    pub frames_captured: u64,
    pub frames_dropped: u64,
    pub shape_mismatches: u64,
}

impl CaptureMetrics {
    pub fn snapshot(&self) -> CaptureSnapshot {
        CaptureSnapshot {
            frames_captured: self.frames_captured.load(Ordering::Relaxed),
            frames_dropped: self.frames_dropped.load(Ordering::Relaxed),
            shape_mismatches: self.shape_mismatches.load(Ordering::Relaxed),
        }
    }
}

/// 执行器链路计数
#[derive(Debug, Default)]
pub struct ActuatorMetrics {
    /// 调用 `execute` 的次数
    pub commands_total: AtomicU64,
    /// 成功解析的固件状态数
    pub statuses_parsed: AtomicU64,
    /// 读到无法解析（或超时为空）的状态行次数
    pub parse_failures: AtomicU64,
    /// 返回哨兵状态 255 的次数
    pub local_failures: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActuatorSnapshot {
    pub commands_total: u64,
    pub statuses_parsed: u64,
    pub parse_failures: u64,
    pub local_failures: u64,
}

impl ActuatorMetrics {
    pub fn snapshot(&self) -> ActuatorSnapshot {
        ActuatorSnapshot {
            commands_total: self.commands_total.load(Ordering::Relaxed),
            statuses_parsed: self.statuses_parsed.load(Ordering::Relaxed),
            parse_failures: self.parse_failures.load(Ordering::Relaxed),
            local_failures: self.local_failures.load(Ordering::Relaxed),
        }
    }
}

/// 决策通道计数
#[derive(Debug, Default)]
pub struct DecisionMetrics {
    pub requests_total: AtomicU64,
    /// 带动作的应答
    pub actions_received: AtomicU64,
    /// 合法但无动作的应答
    pub empty_replies: AtomicU64,
    /// 无法解析的应答
    pub invalid_replies: AtomicU64,
    /// 等待应答超时
    pub poll_timeouts: AtomicU64,
    /// 发送/接收失败
    pub transport_errors: AtomicU64,
    /// socket 重建次数
    pub socket_resets: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecisionSnapshot {
    pub requests_total: u64,
    pub actions_received: u64,
    pub empty_replies: u64,
    pub invalid_replies: u64,
    pub poll_timeouts: u64,
    pub transport_errors: u64,
    pub socket_resets: u64,
}

impl DecisionMetrics {
    pub fn snapshot(&self) -> DecisionSnapshot {
        DecisionSnapshot {
            requests_total: self.requests_total.load(Ordering::Relaxed),
            actions_received: self.actions_received.load(Ordering::Relaxed),
            empty_replies: self.empty_replies.load(Ordering::Relaxed),
            invalid_replies: self.invalid_replies.load(Ordering::Relaxed),
            poll_timeouts: self.poll_timeouts.load(Ordering::Relaxed),
            transport_errors: self.transport_errors.load(Ordering::Relaxed),
            socket_resets: self.socket_resets.load(Ordering::Relaxed),
        }
    }
}

pub(crate) fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}
