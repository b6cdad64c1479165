//! # Fieldbot IO Layer
//!
//! 硬件与传输抽象层，为驱动层提供统一接口：
//!
//! - [`SerialLink`]: 面向行的串口链路（执行器固件）
//! - [`CaptureDevice`]: 相机帧源
//! - [`RequestSocket`]: 严格一问一答的请求 socket（决策服务器）
//!
//! 后端按 feature 选择：`serial`（serialport）、`zmq`（ZeroMQ REQ）、`opencv`（VideoCapture），
//! `mock` 提供可编排的模拟实现。

use fieldbot_protocol::Frame;
use std::time::Duration;
use thiserror::Error;

pub mod line;

#[cfg(feature = "serial")]
pub mod serial;
#[cfg(feature = "serial")]
pub use serial::SerialPortLink;

#[cfg(feature = "zmq")]
pub mod zmq_req;
#[cfg(feature = "zmq")]
pub use zmq_req::ZmqReqSocket;

#[cfg(feature = "opencv")]
pub mod camera;
#[cfg(feature = "opencv")]
pub use camera::OpenCvCamera;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use line::LineReader;

/// IO 层统一错误类型
#[derive(Error, Debug)]
pub enum IoError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Device Error: {0}")]
    Device(#[from] DeviceError),
    #[error("Read timeout")]
    Timeout,
    #[error("Frame dropped")]
    FrameDropped,
    #[error("Transport Error: {0}")]
    Transport(String),
    #[error("Backend not available: {0}")]
    Unsupported(&'static str),
}

impl IoError {
    pub fn is_timeout(&self) -> bool {
        match self {
            IoError::Timeout => true,
            IoError::Io(e) => e.kind() == std::io::ErrorKind::TimedOut,
            _ => false,
        }
    }

    /// 设备不存在或无权限，对同一路径重试无意义
    pub fn is_fatal(&self) -> bool {
        match self {
            IoError::Device(e) => e.is_fatal(),
            IoError::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::NotFound | std::io::ErrorKind::PermissionDenied
            ),
            _ => false,
        }
    }
}

/// 设备错误的结构化分类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceErrorKind {
    Unknown,
    NotFound,
    NoDevice,
    AccessDenied,
    Busy,
    UnsupportedConfig,
    Backend,
}

/// 结构化设备错误
#[derive(Error, Debug, Clone)]
#[error("{kind:?}: {message}")]
pub struct DeviceError {
    pub kind: DeviceErrorKind,
    pub message: String,
}

impl DeviceError {
    pub fn new(kind: DeviceErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// 重试也无法恢复的错误
    pub fn is_fatal(&self) -> bool {
        matches!(
            self.kind,
            DeviceErrorKind::NoDevice | DeviceErrorKind::AccessDenied | DeviceErrorKind::NotFound
        )
    }
}

impl From<String> for DeviceError {
    fn from(message: String) -> Self {
        Self::new(DeviceErrorKind::Unknown, message)
    }
}

impl From<&str> for DeviceError {
    fn from(message: &str) -> Self {
        Self::new(DeviceErrorKind::Unknown, message)
    }
}

/// 执行器串口链路
///
/// 连接在启动时打开一次，进程生命周期内复用。
pub trait SerialLink {
    /// 写出完整的指令字节
    fn write_all(&mut self, bytes: &[u8]) -> Result<(), IoError>;

    /// 读取一行（去掉行尾）
    ///
    /// 读超时返回 `IoError::Timeout`，已读到的半行保留到下次调用。
    fn read_line(&mut self) -> Result<String, IoError>;

    /// 设备路径（日志用）
    fn name(&self) -> &str {
        "serial"
    }
}

impl<T: SerialLink + ?Sized> SerialLink for Box<T> {
    fn write_all(&mut self, bytes: &[u8]) -> Result<(), IoError> {
        (**self).write_all(bytes)
    }

    fn read_line(&mut self) -> Result<String, IoError> {
        (**self).read_line()
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// 相机参数（分辨率与画质调节，尽力设置）
#[derive(Debug, Clone, PartialEq)]
pub struct CameraSettings {
    pub index: i32,
    pub width: usize,
    pub height: usize,
    pub saturation: f64,
    pub contrast: f64,
    pub brightness: f64,
}

/// 相机帧源
///
/// 实现负责把设备输出规整成 `height × width × 3` 的 BGR 帧。
pub trait CaptureDevice: Send {
    /// 读取下一帧；失败视为丢帧
    fn read_frame(&mut self) -> Result<Frame, IoError>;
}

impl<T: CaptureDevice + ?Sized> CaptureDevice for Box<T> {
    fn read_frame(&mut self) -> Result<Frame, IoError> {
        (**self).read_frame()
    }
}

/// `poll_readable` 的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// 有应答可读
    Readable,
    /// 等待超时，没有任何就绪信号
    TimedOut,
    /// 报告就绪，但目标 socket 并没有可读数据
    Spurious,
}

/// 严格一问一答的请求 socket
///
/// 上一个请求没有收到应答（或被 `reset`）之前不能再次发送。
pub trait RequestSocket {
    fn send(&mut self, payload: &[u8]) -> Result<(), IoError>;

    /// 等待应答可读，最多 `timeout`
    fn poll_readable(&mut self, timeout: Duration) -> Result<Readiness, IoError>;

    /// 非阻塞读取应答
    fn recv(&mut self) -> Result<Vec<u8>, IoError>;

    /// 关闭并重新连接，丢弃未完成的请求
    fn reset(&mut self) -> Result<(), IoError>;
}

impl<T: RequestSocket + ?Sized> RequestSocket for Box<T> {
    fn send(&mut self, payload: &[u8]) -> Result<(), IoError> {
        (**self).send(payload)
    }

    fn poll_readable(&mut self, timeout: Duration) -> Result<Readiness, IoError> {
        (**self).poll_readable(timeout)
    }

    fn recv(&mut self) -> Result<Vec<u8>, IoError> {
        (**self).recv()
    }

    fn reset(&mut self) -> Result<(), IoError> {
        (**self).reset()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_timeout_classification() {
        assert!(IoError::Timeout.is_timeout());
        assert!(IoError::Io(std::io::Error::from(std::io::ErrorKind::TimedOut)).is_timeout());
        assert!(!IoError::Io(std::io::Error::from(std::io::ErrorKind::BrokenPipe)).is_timeout());
        assert!(!IoError::FrameDropped.is_timeout());
    }

    #[test]
    fn test_device_error_fatal() {
        assert!(DeviceError::new(DeviceErrorKind::NotFound, "x").is_fatal());
        assert!(!DeviceError::new(DeviceErrorKind::Busy, "x").is_fatal());
        assert!(IoError::Device(DeviceError::new(DeviceErrorKind::AccessDenied, "x")).is_fatal());
        assert!(IoError::Io(std::io::Error::from(std::io::ErrorKind::NotFound)).is_fatal());
        assert!(!IoError::Timeout.is_fatal());
        let err: DeviceError = "boom".into();
        assert_eq!(err.kind, DeviceErrorKind::Unknown);
        assert_eq!(format!("{}", err), "Unknown: boom");
    }
}
