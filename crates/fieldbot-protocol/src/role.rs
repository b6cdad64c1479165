//! 机器人角色

use crate::error::ProtocolError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 机器人角色（启动时确定，运行期间不变）
///
/// 每次请求都会携带角色，服务器据此选择策略。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// 采摘机器人（带相机）
    Picker,
    /// 运输机器人（无相机）
    Delivery,
}

impl Role {
    /// 线上使用的名称
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Picker => "picker",
            Role::Delivery => "delivery",
        }
    }

    /// 只有 picker 需要打开相机
    pub fn requires_camera(&self) -> bool {
        matches!(self, Role::Picker)
    }

    /// 从主机名推断角色
    ///
    /// 取第一个 `-` 之前的部分，例如 `picker-03` → `picker`。
    pub fn from_hostname(hostname: &str) -> Result<Self, ProtocolError> {
        let prefix = hostname.split('-').next().unwrap_or_default();
        prefix.parse()
    }
}

impl FromStr for Role {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "picker" => Ok(Role::Picker),
            "delivery" => Ok(Role::Delivery),
            other => Err(ProtocolError::UnknownRole(other.to_string())),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_roles() {
        assert_eq!("picker".parse::<Role>().unwrap(), Role::Picker);
        assert_eq!("delivery".parse::<Role>().unwrap(), Role::Delivery);
    }

    #[test]
    fn test_parse_rejects_everything_else() {
        for bad in ["", "Picker", "DELIVERY", "forklift", "picker ", "picker-1"] {
            let err = bad.parse::<Role>().unwrap_err();
            assert_eq!(err, ProtocolError::UnknownRole(bad.to_string()));
        }
    }

    #[test]
    fn test_from_hostname() {
        assert_eq!(Role::from_hostname("picker-03").unwrap(), Role::Picker);
        assert_eq!(Role::from_hostname("delivery").unwrap(), Role::Delivery);
        assert!(Role::from_hostname("raspberrypi").is_err());
        assert!(Role::from_hostname("").is_err());
    }

    #[test]
    fn test_requires_camera() {
        assert!(Role::Picker.requires_camera());
        assert!(!Role::Delivery.requires_camera());
    }

    #[test]
    fn test_serde_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Picker).unwrap(), "\"picker\"");
        let role: Role = serde_json::from_str("\"delivery\"").unwrap();
        assert_eq!(role, Role::Delivery);
    }
}
