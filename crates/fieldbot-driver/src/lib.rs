//! 驱动层模块
//!
//! 本模块提供控制客户端的三个设备组件：
//! - [`FrameSource`]: 后台采集线程 + 单槽最新帧（ArcSwap 无锁读取）
//! - [`ActuatorLink`]: 串口指令下发与状态行解析（有界重试）
//! - [`DecisionChannel`]: 与决策服务器的一问一答
//!
//! 以及贯穿各组件的 [`CancelToken`] 和原子计数器。
//!
//! # 失败策略
//!
//! 组件边界吸收几乎所有错误并换成安全默认值（全零帧、无动作、哨兵状态 255）。
//! 唯一向上传播的是 [`DriverError::ChannelBroken`]。

pub mod actuator;
pub mod cancel;
pub mod decision;
mod error;
pub mod frame_source;
pub mod metrics;

pub use actuator::{ActuatorConfig, ActuatorLink};
pub use cancel::CancelToken;
pub use decision::{DecisionChannel, DecisionConfig};
pub use error::DriverError;
pub use frame_source::{FrameSource, FrameSourceConfig};
pub use metrics::{
    ActuatorMetrics, ActuatorSnapshot, CaptureMetrics, CaptureSnapshot, DecisionMetrics,
    DecisionSnapshot,
};
