//! 旧版扁平 JSON 设置
//!
//! 键名全大写，`ARDUINO_DEV` 是设备路径前缀（加载后打开 `前缀 + 尝试序号`），
//! `ARDUINO_TIMEOUT` 单位为秒，`ZMQ_TIMEOUT` 单位为毫秒。未知键被忽略。

use crate::RobotConfig;
use serde::Deserialize;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct LegacySettings {
    #[serde(rename = "ZMQ_ADDR")]
    pub zmq_addr: Option<String>,
    #[serde(rename = "ZMQ_TIMEOUT")]
    pub zmq_timeout: Option<u64>,
    #[serde(rename = "ARDUINO_DEV")]
    pub arduino_dev: Option<DeviceList>,
    #[serde(rename = "ARDUINO_BAUD")]
    pub arduino_baud: Option<u32>,
    #[serde(rename = "ARDUINO_TIMEOUT")]
    pub arduino_timeout: Option<f64>,
    #[serde(rename = "CAMERA_INDEX")]
    pub camera_index: Option<i32>,
    #[serde(rename = "CAMERA_WIDTH")]
    pub camera_width: Option<usize>,
    #[serde(rename = "CAMERA_HEIGHT")]
    pub camera_height: Option<usize>,
    #[serde(rename = "CAMERA_SATURATION")]
    pub camera_saturation: Option<f64>,
    #[serde(rename = "CAMERA_CONTRAST")]
    pub camera_contrast: Option<f64>,
    #[serde(rename = "CAMERA_BRIGHTNESS")]
    pub camera_brightness: Option<f64>,
    #[serde(rename = "VERBOSE")]
    pub verbose: Option<bool>,
}

/// 单个路径或路径列表
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum DeviceList {
    One(String),
    Many(Vec<String>),
}

impl DeviceList {
    fn into_vec(self) -> Vec<String> {
        match self {
            DeviceList::One(path) => vec![path],
            DeviceList::Many(paths) => paths,
        }
    }
}

impl LegacySettings {
    pub fn into_config(self) -> RobotConfig {
        let mut config = RobotConfig::default();
        config.serial.enumerate_suffix = true;

        if let Some(addr) = self.zmq_addr {
            config.network.addr = addr;
        }
        if let Some(timeout) = self.zmq_timeout {
            config.network.timeout_ms = timeout;
        }
        if let Some(devices) = self.arduino_dev {
            config.serial.devices = devices.into_vec();
        } else {
            config.serial.devices = vec!["/dev/ttyACM".to_string()];
        }
        if let Some(baud) = self.arduino_baud {
            config.serial.baud = baud;
        }
        if let Some(seconds) = self.arduino_timeout {
            config.serial.read_timeout_ms = (seconds.max(0.0) * 1000.0).round() as u64;
        }
        if let Some(index) = self.camera_index {
            config.camera.index = index;
        }
        if let Some(width) = self.camera_width {
            config.camera.width = width;
        }
        if let Some(height) = self.camera_height {
            config.camera.height = height;
        }
        if let Some(v) = self.camera_saturation {
            config.camera.saturation = v;
        }
        if let Some(v) = self.camera_contrast {
            config.camera.contrast = v;
        }
        if let Some(v) = self.camera_brightness {
            config.camera.brightness = v;
        }
        if let Some(verbose) = self.verbose {
            config.verbose = verbose;
        }
        config
    }
}
