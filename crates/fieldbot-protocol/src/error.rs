//! 协议层错误类型定义

use thiserror::Error;

/// 协议层错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// 未知的机器人角色
    #[error("Unrecognized robot role: {0:?} (expected \"picker\" or \"delivery\")")]
    UnknownRole(String),

    /// 帧数据长度与声明的形状不符
    #[error("Invalid frame shape: expected {expected} samples for {height}x{width}x3, got {actual}")]
    FrameShape {
        height: usize,
        width: usize,
        expected: usize,
        actual: usize,
    },

    /// 状态行语法错误
    #[error("Malformed status line at byte {offset}: {reason}")]
    StatusSyntax { offset: usize, reason: &'static str },

    /// 状态行缺少必需字段
    #[error("Status line missing field `{0}`")]
    MissingField(&'static str),

    /// 状态行字段类型或取值非法
    #[error("Invalid value for field `{field}`: {value}")]
    InvalidField { field: &'static str, value: String },

    /// 状态行字段重复
    #[error("Duplicate field `{0}` in status line")]
    DuplicateField(String),

    /// 决策服务器消息编解码失败
    #[error("Message codec error: {0}")]
    Codec(String),
}

impl From<serde_json::Error> for ProtocolError {
    fn from(err: serde_json::Error) -> Self {
        Self::Codec(err.to_string())
    }
}
