//! 控制客户端
//!
//! 把三个设备组件串成一个“感知 → 决策 → 执行”循环：
//!
//! ```text
//! FrameSource ──latest()──┐
//!                         ▼
//!   Status ──────► DecisionChannel.propose() ──► Option<Command>
//!     ▲                                              │
//!     └──────────── ActuatorLink.execute() ◄─────────┘
//! ```
//!
//! - [`ControlLoop`]: 主循环（泛型于 [`Sense`]/[`Decide`]/[`Actuate`]，便于替换）
//! - [`RobotBuilder`]: 按配置组装各组件
//! - [`Robot`]: 组装好的机器人，负责运行和统计

pub mod builder;
pub mod control_loop;
mod error;
pub mod robot;
pub mod seams;

pub use builder::{RobotBuilder, resolve_role};
pub use control_loop::{ControlLoop, LoopMetrics, LoopSnapshot, LoopState, StepOutcome};
pub use error::ClientError;
pub use robot::{Robot, RobotSnapshot};
pub use seams::{Actuate, Decide, Sense};

// 常用类型
pub use fieldbot_config::RobotConfig;
pub use fieldbot_driver::{CancelToken, DriverError};
pub use fieldbot_protocol::{Command, Frame, Role, Status};
