//! serialport 后端
//!
//! 执行器固件（Arduino 类微控制器）挂在 USB 串口上，按行回报状态。

use crate::line::LineReader;
use crate::{DeviceError, DeviceErrorKind, IoError, SerialLink};
use serialport::SerialPort;
use std::io::Write;
use std::time::Duration;
use tracing::debug;

/// 基于 `serialport` 的串口链路
pub struct SerialPortLink {
    reader: LineReader<Box<dyn SerialPort>>,
    path: String,
}

impl SerialPortLink {
    /// 打开串口
    ///
    /// # 参数
    /// - `path`: 设备路径（如 `/dev/ttyACM0`）
    /// - `baud`: 波特率
    /// - `read_timeout`: 单次读超时
    pub fn open(path: &str, baud: u32, read_timeout: Duration) -> Result<Self, IoError> {
        let port = serialport::new(path, baud)
            .timeout(read_timeout)
            .open()
            .map_err(|e| IoError::Device(map_serial_error(path, e)))?;
        debug!("Opened serial port {} at {} baud", path, baud);

        Ok(Self {
            reader: LineReader::new(port),
            path: path.to_string(),
        })
    }
}

impl SerialLink for SerialPortLink {
    fn write_all(&mut self, bytes: &[u8]) -> Result<(), IoError> {
        let port = self.reader.get_mut();
        port.write_all(bytes)?;
        port.flush()?;
        Ok(())
    }

    fn read_line(&mut self) -> Result<String, IoError> {
        self.reader.read_line()
    }

    fn name(&self) -> &str {
        &self.path
    }
}

fn map_serial_error(path: &str, err: serialport::Error) -> DeviceError {
    let kind = match err.kind() {
        serialport::ErrorKind::NoDevice => DeviceErrorKind::NoDevice,
        serialport::ErrorKind::InvalidInput => DeviceErrorKind::UnsupportedConfig,
        serialport::ErrorKind::Io(std::io::ErrorKind::NotFound) => DeviceErrorKind::NotFound,
        serialport::ErrorKind::Io(std::io::ErrorKind::PermissionDenied) => {
            DeviceErrorKind::AccessDenied
        },
        serialport::ErrorKind::Io(_) => DeviceErrorKind::Backend,
        _ => DeviceErrorKind::Unknown,
    };
    DeviceError::new(kind, format!("{}: {}", path, err))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_missing_device_fails() {
        let result = SerialPortLink::open(
            "/dev/fieldbot-does-not-exist",
            9600,
            Duration::from_millis(10),
        );
        assert!(matches!(result, Err(IoError::Device(_))));
    }
}
