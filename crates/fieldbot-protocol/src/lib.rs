//! # Fieldbot Protocol
//!
//! 决策服务器与执行器固件之间的数据类型和编解码（无硬件依赖）
//!
//! ## 模块
//!
//! - `role`: 机器人角色（picker / delivery）
//! - `command`: 动作指令、状态码与状态
//! - `frame`: 固定形状的 BGR 图像帧
//! - `message`: 决策服务器的请求/应答 JSON 格式
//! - `status_line`: 固件状态行的严格解析
//!
//! ## 数据流
//!
//! ```text
//! FrameSource ──Frame──▶ Request ──JSON──▶ decision server
//!                                             │
//! firmware ◀──Command── Response ◀──JSON──────┘
//!    │
//!    └──status line──▶ Status ──last_action──▶ 下一次 Request
//! ```

pub mod command;
mod error;
pub mod frame;
pub mod message;
pub mod role;
pub mod status_line;

pub use command::{Command, Status, StatusCode};
pub use error::ProtocolError;
pub use frame::{CHANNELS, Frame};
pub use message::{Request, Response};
pub use role::Role;
pub use status_line::parse_status_line;
