//! 决策服务器消息格式
//!
//! 请求（每次迭代一个）：
//!
//! ```json
//! { "type": "request", "robot": "picker", "last_action": "?", "bgr": [[[0,0,0], ...], ...] }
//! ```
//!
//! 应答：
//!
//! ```json
//! { "action": "F1" }   // 执行
//! { }                  // 无动作
//! ```

use crate::command::{Command, Status};
use crate::error::ProtocolError;
use crate::frame::Frame;
use crate::role::Role;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum RequestKind {
    Request,
}

/// 发给决策服务器的请求
///
/// 编码时借用帧快照，解码（如测试桩服务器）时持有数据。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request<'a> {
    #[serde(rename = "type")]
    kind: RequestKind,
    /// 机器人角色
    pub robot: Role,
    /// 上一次状态中的指令（未知时为 `?`）
    pub last_action: Cow<'a, str>,
    /// 帧快照
    pub bgr: Cow<'a, Frame>,
}

impl<'a> Request<'a> {
    pub fn new(robot: Role, status: &'a Status, frame: &'a Frame) -> Self {
        Self {
            kind: RequestKind::Request,
            robot,
            last_action: Cow::Borrowed(status.command.as_str()),
            bgr: Cow::Borrowed(frame),
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Request<'static>, ProtocolError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// 决策服务器的应答
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Response {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    action: Option<serde_json::Value>,
}

impl Response {
    pub fn with_action(action: impl Into<Command>) -> Self {
        Self {
            action: Some(serde_json::Value::String(action.into().as_str().to_string())),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    pub fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        Ok(serde_json::to_vec(self)?)
    }

    /// 取出动作
    ///
    /// 字符串原样作为指令，数字按十进制文本作为指令；
    /// 缺失、`null`、空串、`0`、`false` 以及其他类型都视为无动作。
    pub fn action(&self) -> Option<Command> {
        match self.action.as_ref()? {
            serde_json::Value::String(s) if !s.is_empty() => Some(Command::new(s.clone())),
            serde_json::Value::Number(n) if n.as_f64() != Some(0.0) => {
                Some(Command::new(n.to_string()))
            },
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_field_names() {
        let status = Status::initial();
        let frame = Frame::zeros(1, 1);
        let request = Request::new(Role::Picker, &status, &frame);
        let value: serde_json::Value = serde_json::from_slice(&request.encode().unwrap()).unwrap();

        assert_eq!(value["type"], "request");
        assert_eq!(value["robot"], "picker");
        assert_eq!(value["last_action"], "?");
        assert_eq!(value["bgr"], serde_json::json!([[[0, 0, 0]]]));
    }

    #[test]
    fn test_request_decoded_by_stub_server_matches_frame() {
        let data: Vec<u8> = (0..2 * 3 * 3).map(|i| (i * 13 % 256) as u8).collect();
        let frame = Frame::from_raw(2, 3, data).unwrap();
        let status = Status::new("F1", crate::StatusCode::SUCCESS);
        let bytes = Request::new(Role::Delivery, &status, &frame).encode().unwrap();

        let decoded = Request::decode(&bytes).unwrap();
        assert_eq!(decoded.robot, Role::Delivery);
        assert_eq!(decoded.last_action, "F1");
        assert_eq!(decoded.bgr.as_ref(), &frame);
    }

    #[test]
    fn test_request_decode_rejects_other_kinds() {
        let bytes = br#"{"type":"reply","robot":"picker","last_action":"?","bgr":[]}"#;
        assert!(Request::decode(bytes).is_err());
    }

    #[test]
    fn test_response_action() {
        let response = Response::decode(br#"{"action": "F1"}"#).unwrap();
        assert_eq!(response.action(), Some(Command::new("F1")));

        let response = Response::decode(br#"{"action": 12}"#).unwrap();
        assert_eq!(response.action(), Some(Command::new("12")));
    }

    #[test]
    fn test_response_without_action() {
        for raw in [
            &br#"{}"#[..],
            br#"{"other": 1}"#,
            br#"{"action": null}"#,
            br#"{"action": ""}"#,
            br#"{"action": 0}"#,
            br#"{"action": false}"#,
            br#"{"action": ["F1"]}"#,
        ] {
            let response = Response::decode(raw).unwrap();
            assert_eq!(response.action(), None, "raw = {:?}", String::from_utf8_lossy(raw));
        }
    }

    #[test]
    fn test_response_unparseable() {
        assert!(Response::decode(b"not json").is_err());
        assert!(Response::decode(b"[1, 2]").is_err());
    }

    #[test]
    fn test_response_encode() {
        let bytes = Response::with_action("F2").encode().unwrap();
        assert_eq!(bytes, br#"{"action":"F2"}"#.to_vec());
        assert_eq!(Response::empty().encode().unwrap(), b"{}".to_vec());
    }
}
