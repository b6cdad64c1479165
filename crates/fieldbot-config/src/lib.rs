//! # 机器人配置
//!
//! 启动时加载一次、之后只读的配置。支持两种文件：
//!
//! - `*.toml`: 分节配置（`[network]`、`[serial]`、`[camera]`），缺省项取默认值
//! - `*.json`: 旧版扁平设置（`ZMQ_ADDR`、`ARDUINO_DEV` 等大写键）
//!
//! ```toml
//! role = "picker"
//!
//! [network]
//! addr = "tcp://10.42.0.1:1980"
//! timeout_ms = 500
//!
//! [serial]
//! devices = ["/dev/ttyACM0", "/dev/ttyUSB0"]
//! ```

mod legacy;

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

pub use legacy::LegacySettings;

/// 配置错误
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid JSON settings: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl ConfigError {
    fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

/// 顶层配置
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RobotConfig {
    /// 机器人角色（`picker` / `delivery`）；未设置时由主机名推断
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// 输出调试日志
    pub verbose: bool,
    pub network: NetworkConfig,
    pub serial: SerialConfig,
    pub camera: CameraConfig,
}

/// 决策服务器连接
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// ZeroMQ 端点
    pub addr: String,
    /// 等待应答的超时（毫秒）
    pub timeout_ms: u64,
    /// 就绪却读不到应答时终止进程
    pub fatal_on_spurious_wakeup: bool,
    /// 超时或传输错误后重建 socket
    pub reset_on_failure: bool,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            addr: "tcp://127.0.0.1:1980".to_string(),
            timeout_ms: 1000,
            fatal_on_spurious_wakeup: true,
            reset_on_failure: true,
        }
    }
}

impl NetworkConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// 执行器串口
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    /// 候选设备路径
    pub devices: Vec<String>,
    pub baud: u32,
    /// 单次读超时（毫秒）
    pub read_timeout_ms: u64,
    /// 每个候选的打开次数
    pub open_attempts: usize,
    /// 把尝试序号追加到路径后面（`/dev/ttyACM` → `/dev/ttyACM0`, `/dev/ttyACM1`, ...）
    pub enumerate_suffix: bool,
    /// 打开后等待固件复位（毫秒）
    pub connect_settle_ms: u64,
    /// 写指令后、重读状态前的等待（毫秒）
    pub settle_ms: u64,
    /// 读取状态行的最大次数
    pub max_status_attempts: usize,
    /// 指令结尾追加的字符串
    pub command_terminator: String,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            devices: vec!["/dev/ttyACM0".to_string()],
            baud: 9600,
            read_timeout_ms: 1000,
            open_attempts: 3,
            enumerate_suffix: false,
            connect_settle_ms: 2000,
            settle_ms: 2000,
            max_status_attempts: 5,
            command_terminator: String::new(),
        }
    }
}

impl SerialConfig {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn connect_settle(&self) -> Duration {
        Duration::from_millis(self.connect_settle_ms)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
}

/// 相机
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub index: i32,
    pub width: usize,
    pub height: usize,
    pub saturation: f64,
    pub contrast: f64,
    pub brightness: f64,
    /// 采集线程读取间隔（毫秒），与相机实际帧率无关
    pub poll_interval_ms: u64,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            index: 0,
            width: 640,
            height: 480,
            saturation: 0.5,
            contrast: 0.5,
            brightness: 0.5,
            poll_interval_ms: 10,
        }
    }
}

impl CameraConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl RobotConfig {
    /// 加载并校验配置文件
    ///
    /// 扩展名为 `.json` 时按旧版扁平设置解析，其余按 TOML 解析。
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let config = if is_json {
            debug!("Loading legacy settings from {}", path.display());
            Self::from_legacy_json(&content)?
        } else {
            debug!("Loading config from {}", path.display());
            Self::from_toml(&content)?
        };

        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_legacy_json(content: &str) -> Result<Self, ConfigError> {
        let settings: LegacySettings = serde_json::from_str(content)?;
        Ok(settings.into_config())
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// 校验取值范围
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.network.addr.trim().is_empty() {
            return Err(ConfigError::invalid("network.addr", "must not be empty"));
        }
        if self.serial.devices.is_empty() {
            return Err(ConfigError::invalid("serial.devices", "no candidate device"));
        }
        if self.serial.devices.iter().any(|d| d.trim().is_empty()) {
            return Err(ConfigError::invalid("serial.devices", "empty device path"));
        }
        if self.serial.baud == 0 {
            return Err(ConfigError::invalid("serial.baud", "must be positive"));
        }
        if self.serial.open_attempts == 0 {
            return Err(ConfigError::invalid("serial.open_attempts", "must be at least 1"));
        }
        if self.serial.max_status_attempts == 0 {
            return Err(ConfigError::invalid(
                "serial.max_status_attempts",
                "must be at least 1",
            ));
        }
        if self.camera.width == 0 || self.camera.height == 0 {
            return Err(ConfigError::invalid(
                "camera",
                format!(
                    "frame size {}x{} is empty",
                    self.camera.width, self.camera.height
                ),
            ));
        }
        if self.camera.poll_interval_ms == 0 {
            return Err(ConfigError::invalid(
                "camera.poll_interval_ms",
                "must be positive",
            ));
        }
        Ok(())
    }
}
