//! 动作指令与执行状态
//!
//! `Command` 是固件理解的动作标识（原样写入串口），
//! `Status` 是固件执行后回报的结果，或本地合成的哨兵状态。

use serde::{Deserialize, Serialize};
use std::fmt;

/// 未知指令的占位符（初始状态和本地失败时使用）
pub const UNKNOWN_COMMAND: &str = "?";

/// 固件动作指令
///
/// 内容不做解释，按文本写入串口。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Command(String);

impl Command {
    pub fn new(command: impl Into<String>) -> Self {
        Self(command.into())
    }

    /// 占位指令 `?`
    pub fn unknown() -> Self {
        Self(UNKNOWN_COMMAND.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_unknown(&self) -> bool {
        self.0 == UNKNOWN_COMMAND
    }

    /// 串口线上格式：指令文本 + 可选结束符
    pub fn to_wire(&self, terminator: &str) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.0.len() + terminator.len());
        bytes.extend_from_slice(self.0.as_bytes());
        bytes.extend_from_slice(terminator.as_bytes());
        bytes
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Command {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Command {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// 固件状态码
///
/// - `0`: 成功
/// - `255`: 保留，表示本地执行失败（没有收到固件回报）
/// - 其他: 由固件定义
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatusCode(pub u8);

impl StatusCode {
    pub const SUCCESS: StatusCode = StatusCode(0);
    pub const LOCAL_FAILURE: StatusCode = StatusCode(255);

    pub fn is_success(&self) -> bool {
        *self == Self::SUCCESS
    }

    /// 是否为本地合成的哨兵码（而非固件回报）
    pub fn is_local_failure(&self) -> bool {
        *self == Self::LOCAL_FAILURE
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 最近一次执行结果
///
/// 系统中只保留一个，每次迭代覆盖，不累积历史。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    /// 固件回显的指令（未知时为 `?`）
    pub command: Command,
    /// 状态码（初始状态没有）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<StatusCode>,
}

impl Status {
    /// 启动时的初始状态 `{command: "?"}`
    pub fn initial() -> Self {
        Self {
            command: Command::unknown(),
            result: None,
        }
    }

    /// 哨兵状态 `{command: "?", result: 255}`
    pub fn local_failure() -> Self {
        Self {
            command: Command::unknown(),
            result: Some(StatusCode::LOCAL_FAILURE),
        }
    }

    pub fn new(command: impl Into<Command>, result: StatusCode) -> Self {
        Self {
            command: command.into(),
            result: Some(result),
        }
    }

    pub fn is_local_failure(&self) -> bool {
        self.result.is_some_and(|code| code.is_local_failure())
    }
}

impl Default for Status {
    fn default() -> Self {
        Self::initial()
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.result {
            Some(code) => write!(f, "{{command: {}, result: {}}}", self.command, code),
            None => write!(f, "{{command: {}}}", self.command),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_and_sentinel() {
        let initial = Status::initial();
        assert!(initial.command.is_unknown());
        assert_eq!(initial.result, None);
        assert!(!initial.is_local_failure());

        let sentinel = Status::local_failure();
        assert_eq!(sentinel.command.as_str(), "?");
        assert_eq!(sentinel.result, Some(StatusCode(255)));
        assert!(sentinel.is_local_failure());
    }

    #[test]
    fn test_command_wire_format() {
        let cmd = Command::new("F1");
        assert_eq!(cmd.to_wire(""), b"F1".to_vec());
        assert_eq!(cmd.to_wire("\n"), b"F1\n".to_vec());
    }

    #[test]
    fn test_status_display() {
        assert_eq!(Status::initial().to_string(), "{command: ?}");
        assert_eq!(
            Status::new("F1", StatusCode::SUCCESS).to_string(),
            "{command: F1, result: 0}"
        );
    }

    #[test]
    fn test_status_code_classes() {
        assert!(StatusCode(0).is_success());
        assert!(!StatusCode(3).is_success());
        assert!(StatusCode(255).is_local_failure());
        assert!(!StatusCode(254).is_local_failure());
    }
}
