//! Mock 硬件接口
//!
//! 可编排的模拟串口、相机和请求 socket。每个 mock 都附带一个可克隆的 handle，
//! 测试在 mock 被移进驱动之后仍可通过 handle 追加脚本、检查调用记录。

mod camera;
mod serial;
mod socket;

pub use camera::{MockCamera, MockCameraHandle};
pub use serial::{MockRead, MockSerialHandle, MockSerialLink};
pub use socket::{MockReply, MockRequestSocket, MockSocketHandle};
