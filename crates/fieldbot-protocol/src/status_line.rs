//! 固件状态行解析
//!
//! 固件每执行一条指令回报一行文本状态。这里按严格语法校验，不做任何求值。
//!
//! 接受两种形式：
//!
//! ```text
//! {'command': 'F1', 'result': 0}      # 映射形式（JSON，或单引号的字面量写法）
//! command=F1 result=0                 # 键值对形式（以空白、`,` 或 `;` 分隔）
//! ```
//!
//! 两种形式都要求 `command`（非空）与 `result`（`0..=255` 整数），重复键拒绝。
//! 其余键忽略，值可以是浮点数、`True`/`False`/`None`（及 JSON 的 `true`/`false`/`null`）或列表。

use crate::command::{Command, Status, StatusCode};
use crate::error::ProtocolError;
use serde::de::{Deserialize, Deserializer, MapAccess, Visitor};
use serde_json::Value as JsonValue;
use std::fmt;

/// 字面量嵌套深度上限
const MAX_DEPTH: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Value {
    Str(String),
    Int(i64),
    /// 只允许出现在被忽略的键上（原文保留用于报错）
    Other(String),
}

impl From<JsonValue> for Value {
    fn from(value: JsonValue) -> Self {
        match value {
            JsonValue::String(s) => Value::Str(s),
            JsonValue::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Other(n.to_string()),
            },
            other => Value::Other(other.to_string()),
        }
    }
}

/// 按出现顺序保留的 JSON 对象键值对（`serde_json::Map` 会吞掉重复键）
struct JsonFields(Vec<(String, Value)>);

impl<'de> Deserialize<'de> for JsonFields {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct FieldsVisitor;

        impl<'de> Visitor<'de> for FieldsVisitor {
            type Value = JsonFields;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a JSON object")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<JsonFields, A::Error> {
                let mut fields = Vec::with_capacity(map.size_hint().unwrap_or(2));
                while let Some((key, value)) = map.next_entry::<String, JsonValue>()? {
                    fields.push((key, Value::from(value)));
                }
                Ok(JsonFields(fields))
            }
        }

        deserializer.deserialize_map(FieldsVisitor)
    }
}

/// 解析一行固件状态
///
/// 行尾的 `\r\n` 与首尾空白会被忽略。
///
/// # 示例
///
/// ```
/// use fieldbot_protocol::{parse_status_line, StatusCode};
///
/// let status = parse_status_line("{'command': 'X', 'result': 0}").unwrap();
/// assert_eq!(status.command.as_str(), "X");
/// assert_eq!(status.result, Some(StatusCode::SUCCESS));
///
/// assert!(parse_status_line("garbage").is_err());
/// assert!(parse_status_line("{bad").is_err());
/// ```
pub fn parse_status_line(line: &str) -> Result<Status, ProtocolError> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Err(ProtocolError::StatusSyntax {
            offset: 0,
            reason: "empty line",
        });
    }

    let fields = if trimmed.starts_with('{') {
        match serde_json::from_str::<JsonFields>(trimmed) {
            Ok(JsonFields(fields)) => fields,
            Err(_) => MappingParser::new(trimmed).parse()?,
        }
    } else {
        parse_pairs(trimmed)?
    };

    let mut command = None;
    let mut result = None;
    let mut seen: Vec<&str> = Vec::with_capacity(fields.len());
    for (key, value) in &fields {
        if seen.contains(&key.as_str()) {
            return Err(ProtocolError::DuplicateField(key.clone()));
        }
        seen.push(key);

        match key.as_str() {
            "command" => command = Some(command_from(value)?),
            "result" => result = Some(result_from(value)?),
            _ => {},
        }
    }

    let command = command.ok_or(ProtocolError::MissingField("command"))?;
    let result = result.ok_or(ProtocolError::MissingField("result"))?;
    Ok(Status::new(command, result))
}

fn command_from(value: &Value) -> Result<Command, ProtocolError> {
    match value {
        Value::Str(s) if !s.is_empty() => Ok(Command::new(s.clone())),
        Value::Int(n) => Ok(Command::new(n.to_string())),
        Value::Str(s) => Err(ProtocolError::InvalidField {
            field: "command",
            value: format!("{:?}", s),
        }),
        Value::Other(raw) => Err(ProtocolError::InvalidField {
            field: "command",
            value: raw.clone(),
        }),
    }
}

fn result_from(value: &Value) -> Result<StatusCode, ProtocolError> {
    match value {
        Value::Int(n) => u8::try_from(*n).map(StatusCode).map_err(|_| ProtocolError::InvalidField {
            field: "result",
            value: n.to_string(),
        }),
        Value::Str(s) => Err(ProtocolError::InvalidField {
            field: "result",
            value: format!("{:?}", s),
        }),
        Value::Other(raw) => Err(ProtocolError::InvalidField {
            field: "result",
            value: raw.clone(),
        }),
    }
}

/// `key=value` 形式
fn parse_pairs(line: &str) -> Result<Vec<(String, Value)>, ProtocolError> {
    let mut fields = Vec::new();
    let mut offset = 0;
    for token in line.split(|c: char| c.is_whitespace() || c == ',' || c == ';') {
        let token_offset = offset;
        offset += token.len() + 1;
        if token.is_empty() {
            continue;
        }

        let Some((key, raw)) = token.split_once('=') else {
            return Err(ProtocolError::StatusSyntax {
                offset: token_offset,
                reason: "expected key=value",
            });
        };
        if key.is_empty() || !key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(ProtocolError::StatusSyntax {
                offset: token_offset,
                reason: "invalid key",
            });
        }
        if raw.is_empty() {
            return Err(ProtocolError::StatusSyntax {
                offset: token_offset + key.len() + 1,
                reason: "missing value",
            });
        }

        let value = match parse_integer(raw) {
            Some(n) => Value::Int(n),
            None => Value::Str(raw.to_string()),
        };
        fields.push((key.to_string(), value));
    }
    Ok(fields)
}

fn parse_integer(raw: &str) -> Option<i64> {
    let digits = raw.strip_prefix(['-', '+']).unwrap_or(raw);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok()
}

/// `{'key': value, ...}` 形式
struct MappingParser<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> MappingParser<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    fn error(&self, reason: &'static str) -> ProtocolError {
        ProtocolError::StatusSyntax {
            offset: self.pos,
            reason,
        }
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    fn expect(&mut self, expected: char, reason: &'static str) -> Result<(), ProtocolError> {
        self.skip_ws();
        if self.peek() == Some(expected) {
            self.bump();
            Ok(())
        } else {
            Err(self.error(reason))
        }
    }

    fn parse(mut self) -> Result<Vec<(String, Value)>, ProtocolError> {
        let mut fields = Vec::new();
        self.expect('{', "expected '{'")?;

        self.skip_ws();
        if self.peek() == Some('}') {
            self.bump();
        } else {
            loop {
                self.skip_ws();
                let key = self.parse_string()?;
                self.expect(':', "expected ':'")?;
                self.skip_ws();
                let value = self.parse_value(0)?;
                fields.push((key, value));

                self.skip_ws();
                match self.bump() {
                    Some(',') => continue,
                    Some('}') => break,
                    Some(_) => return Err(self.error("expected ',' or '}'")),
                    None => return Err(self.error("unterminated mapping")),
                }
            }
        }

        self.skip_ws();
        if self.pos != self.src.len() {
            return Err(self.error("trailing characters"));
        }
        Ok(fields)
    }

    fn parse_value(&mut self, depth: usize) -> Result<Value, ProtocolError> {
        match self.peek() {
            Some('\'' | '"') => self.parse_string().map(Value::Str),
            Some(c) if c == '-' || c == '+' || c == '.' || c.is_ascii_digit() => self.parse_number(),
            Some('[') => self.parse_list(depth + 1),
            Some(c) if c.is_ascii_alphabetic() => self.parse_keyword(),
            Some(_) => Err(self.error("expected value")),
            None => Err(self.error("unexpected end of line")),
        }
    }

    /// 整数，或浮点数（`1.5`、`-2e3`）
    fn parse_number(&mut self) -> Result<Value, ProtocolError> {
        let start = self.pos;
        if matches!(self.peek(), Some('-' | '+')) {
            self.bump();
        }
        let int_digits = self.skip_digits();
        let mut is_float = false;
        let mut frac_digits = 0;
        if self.peek() == Some('.') {
            self.bump();
            is_float = true;
            frac_digits = self.skip_digits();
        }
        if int_digits + frac_digits == 0 {
            return Err(self.error("invalid number"));
        }
        if matches!(self.peek(), Some('e' | 'E')) {
            self.bump();
            is_float = true;
            if matches!(self.peek(), Some('-' | '+')) {
                self.bump();
            }
            if self.skip_digits() == 0 {
                return Err(self.error("invalid exponent"));
            }
        }

        let raw = &self.src[start..self.pos];
        match parse_integer(raw) {
            Some(n) if !is_float => Ok(Value::Int(n)),
            // 浮点数或超出 i64 的整数
            _ => Ok(Value::Other(raw.to_string())),
        }
    }

    fn skip_digits(&mut self) -> usize {
        let mut count = 0;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.bump();
            count += 1;
        }
        count
    }

    fn parse_keyword(&mut self) -> Result<Value, ProtocolError> {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_alphanumeric() || c == '_') {
            self.bump();
        }
        match &self.src[start..self.pos] {
            word @ ("True" | "False" | "None" | "true" | "false" | "null") => {
                Ok(Value::Other(word.to_string()))
            },
            _ => {
                self.pos = start;
                Err(self.error("unexpected identifier"))
            },
        }
    }

    fn parse_list(&mut self, depth: usize) -> Result<Value, ProtocolError> {
        if depth > MAX_DEPTH {
            return Err(self.error("nesting too deep"));
        }
        let start = self.pos;
        self.bump();

        loop {
            self.skip_ws();
            if self.peek() == Some(']') {
                self.bump();
                break;
            }
            self.parse_value(depth)?;
            self.skip_ws();
            match self.bump() {
                Some(',') => continue,
                Some(']') => break,
                Some(_) => return Err(self.error("expected ',' or ']'")),
                None => return Err(self.error("unterminated list")),
            }
        }
        Ok(Value::Other(self.src[start..self.pos].to_string()))
    }

    fn parse_string(&mut self) -> Result<String, ProtocolError> {
        let quote = match self.peek() {
            Some(q @ ('\'' | '"')) => q,
            _ => return Err(self.error("expected quoted string")),
        };
        self.bump();

        let mut out = String::new();
        loop {
            match self.bump() {
                Some('\\') => match self.bump() {
                    Some(c @ ('\\' | '\'' | '"')) => out.push(c),
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    _ => return Err(self.error("invalid escape")),
                },
                Some(c) if c == quote => return Ok(out),
                Some(c) => out.push(c),
                None => return Err(self.error("unterminated string")),
            }
        }
    }
}
