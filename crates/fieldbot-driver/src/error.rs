//! 驱动层错误类型定义

use fieldbot_io::IoError;
use fieldbot_protocol::ProtocolError;
use thiserror::Error;

/// 驱动层错误类型
#[derive(Error, Debug)]
pub enum DriverError {
    /// 串口/相机/网络错误
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// 协议编解码错误
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// 决策通道报告就绪却没有数据（socket timeout），通道视为已损坏
    #[error("Decision channel broken: readiness signalled without inbound data")]
    ChannelBroken,

    /// 执行器串口未连接
    #[error("Actuator controller not connected")]
    NotConnected,

    /// 多次读取后仍未得到可解析的状态行
    #[error("No parseable status line after {0} attempts")]
    StatusRetriesExhausted(usize),

    /// 收到取消信号
    #[error("Operation cancelled")]
    Cancelled,

    /// 后台线程错误
    #[error("IO thread error: {0}")]
    IoThread(String),
}

impl DriverError {
    /// 是否需要终止进程
    pub fn is_fatal(&self) -> bool {
        matches!(self, DriverError::ChannelBroken)
    }
}

#[cfg(test)]
mod tests {
    use super::DriverError;
    use fieldbot_io::IoError;
    use fieldbot_protocol::ProtocolError;

    #[test]
    fn test_driver_error_display() {
        let msg = format!("{}", DriverError::Io(IoError::Timeout));
        assert!(msg.contains("Read timeout"), "Io error message: {}", msg);

        let msg = format!("{}", DriverError::StatusRetriesExhausted(5));
        assert_eq!(msg, "No parseable status line after 5 attempts");

        let msg = format!("{}", DriverError::NotConnected);
        assert_eq!(msg, "Actuator controller not connected");
    }

    #[test]
    fn test_from_protocol_error() {
        let err: DriverError = ProtocolError::MissingField("result").into();
        match err {
            DriverError::Protocol(ProtocolError::MissingField(field)) => assert_eq!(field, "result"),
            _ => panic!("Expected Protocol variant"),
        }
    }

    #[test]
    fn test_only_channel_broken_is_fatal() {
        assert!(DriverError::ChannelBroken.is_fatal());
        assert!(!DriverError::NotConnected.is_fatal());
        assert!(!DriverError::Cancelled.is_fatal());
        assert!(!DriverError::Io(IoError::Timeout).is_fatal());
    }
}
