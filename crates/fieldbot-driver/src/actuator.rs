//! 执行器链路
//!
//! 指令以纯文本写到串口，固件回一行状态。连接在启动时建立一次，之后复用。
//! 任何失败（未连接、写失败、读不到可解析的状态）都折算成哨兵状态 `{?, 255}`，
//! `execute` 本身从不返回错误。

use crate::cancel::CancelToken;
use crate::error::DriverError;
use crate::metrics::{ActuatorMetrics, bump};
use fieldbot_io::{IoError, SerialLink};
use fieldbot_protocol::{Command, Status, parse_status_line};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// 执行器链路配置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActuatorConfig {
    /// 候选设备路径（按顺序尝试，第一个成功的胜出）
    pub devices: Vec<String>,
    /// 每个候选的打开次数
    pub open_attempts: usize,
    /// 为 true 时第 i 次尝试打开 `路径 + i`（/dev/ttyACM → ttyACM0, ttyACM1, ...）
    pub enumerate_suffix: bool,
    /// 打开成功后等待固件复位的时间
    pub connect_settle: Duration,
    /// 写指令后、以及每次重读前的等待
    pub settle: Duration,
    /// 读取状态行的最大次数
    pub max_status_attempts: usize,
    /// 指令结尾追加的字节（默认不追加）
    pub command_terminator: String,
}

impl Default for ActuatorConfig {
    fn default() -> Self {
        Self {
            devices: vec!["/dev/ttyACM0".to_string()],
            open_attempts: 3,
            enumerate_suffix: false,
            connect_settle: Duration::from_secs(2),
            settle: Duration::from_secs(2),
            max_status_attempts: 5,
            command_terminator: String::new(),
        }
    }
}

impl ActuatorConfig {
    /// 按尝试顺序展开的设备路径
    pub fn candidates(&self) -> Vec<String> {
        let mut paths = Vec::with_capacity(self.devices.len() * self.open_attempts);
        for device in &self.devices {
            for attempt in 0..self.open_attempts {
                if self.enumerate_suffix {
                    paths.push(format!("{}{}", device, attempt));
                } else {
                    paths.push(device.clone());
                }
            }
        }
        paths
    }
}

/// 执行器链路
pub struct ActuatorLink<L> {
    link: Option<L>,
    config: ActuatorConfig,
    token: CancelToken,
    metrics: Arc<ActuatorMetrics>,
}

impl<L: SerialLink> ActuatorLink<L> {
    /// 依次尝试打开候选设备，第一个成功的胜出
    ///
    /// 全部失败时返回未连接的链路：之后每次 `execute` 都得到哨兵状态，进程继续运行。
    pub fn connect<F>(config: ActuatorConfig, token: CancelToken, mut open: F) -> Self
    where
        F: FnMut(&str) -> Result<L, IoError>,
    {
        let candidates = config.candidates();
        let total = candidates.len();
        // 已确认不存在或无权限的路径，后续重复尝试直接跳过
        let mut dead: Vec<&str> = Vec::new();

        for (i, path) in candidates.iter().enumerate() {
            if token.is_cancelled() {
                break;
            }
            if dead.contains(&path.as_str()) {
                continue;
            }
            debug!("Opening actuator controller {} ({}/{})", path, i + 1, total);
            match open(path) {
                Ok(link) => {
                    info!("Connected to actuator controller at {}", path);
                    // 打开串口会让固件复位，等它起来
                    token.sleep(config.connect_settle);
                    return Self::with_link(link, config, token);
                },
                Err(e) => {
                    warn!("Failed to open {}: {}", path, e);
                    if e.is_fatal() {
                        dead.push(path);
                    }
                },
            }
        }

        error!("Actuator controller not found after {} attempts", total);
        Self::disconnected(config, token)
    }

    pub fn with_link(link: L, config: ActuatorConfig, token: CancelToken) -> Self {
        Self {
            link: Some(link),
            config,
            token,
            metrics: Arc::new(ActuatorMetrics::default()),
        }
    }

    pub fn disconnected(config: ActuatorConfig, token: CancelToken) -> Self {
        Self {
            link: None,
            config,
            token,
            metrics: Arc::new(ActuatorMetrics::default()),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.link.is_some()
    }

    pub fn device_name(&self) -> Option<&str> {
        self.link.as_ref().map(|link| link.name())
    }

    pub fn metrics(&self) -> Arc<ActuatorMetrics> {
        self.metrics.clone()
    }

    /// 下发指令并返回固件状态
    ///
    /// 失败时返回 `Status::local_failure()`。
    pub fn execute(&mut self, command: &Command) -> Status {
        bump(&self.metrics.commands_total);
        info!("Command: {}", command);

        match self.try_execute(command) {
            Ok(status) => {
                info!("Status: {}", status);
                status
            },
            Err(e) => {
                error!("Command {} failed: {}", command, e);
                bump(&self.metrics.local_failures);
                Status::local_failure()
            },
        }
    }

    fn try_execute(&mut self, command: &Command) -> Result<Status, DriverError> {
        let link = self.link.as_mut().ok_or(DriverError::NotConnected)?;

        link.write_all(&command.to_wire(&self.config.command_terminator))?;
        if self.token.sleep(self.config.settle) {
            return Err(DriverError::Cancelled);
        }

        let max_attempts = self.config.max_status_attempts;
        for attempt in 1..=max_attempts {
            match link.read_line() {
                Ok(line) => match parse_status_line(&line) {
                    Ok(status) => {
                        bump(&self.metrics.statuses_parsed);
                        return Ok(status);
                    },
                    Err(e) => {
                        warn!(
                            "Unreadable status line {:?} ({}/{}): {}",
                            line, attempt, max_attempts, e
                        );
                        bump(&self.metrics.parse_failures);
                    },
                },
                Err(e) if e.is_timeout() => {
                    warn!("No status line ({}/{})", attempt, max_attempts);
                    bump(&self.metrics.parse_failures);
                },
                Err(e) => return Err(e.into()),
            }

            if attempt < max_attempts && self.token.sleep(self.config.settle) {
                return Err(DriverError::Cancelled);
            }
        }

        Err(DriverError::StatusRetriesExhausted(max_attempts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldbot_io::mock::{MockRead, MockSerialHandle, MockSerialLink};
    use fieldbot_io::{DeviceError, DeviceErrorKind};
    use fieldbot_protocol::StatusCode;

    fn fast_config() -> ActuatorConfig {
        ActuatorConfig {
            connect_settle: Duration::ZERO,
            settle: Duration::ZERO,
            ..Default::default()
        }
    }

    fn connected() -> (ActuatorLink<MockSerialLink>, MockSerialHandle) {
        let (link, handle) = MockSerialLink::new("mock0");
        (
            ActuatorLink::with_link(link, fast_config(), CancelToken::new()),
            handle,
        )
    }

    #[test]
    fn test_candidates_plain() {
        let config = ActuatorConfig {
            devices: vec!["/dev/ttyACM0".into(), "/dev/ttyUSB0".into()],
            open_attempts: 2,
            ..Default::default()
        };
        assert_eq!(
            config.candidates(),
            vec!["/dev/ttyACM0", "/dev/ttyACM0", "/dev/ttyUSB0", "/dev/ttyUSB0"]
        );
    }

    #[test]
    fn test_candidates_enumerated() {
        let config = ActuatorConfig {
            devices: vec!["/dev/ttyACM".into()],
            open_attempts: 3,
            enumerate_suffix: true,
            ..Default::default()
        };
        assert_eq!(
            config.candidates(),
            vec!["/dev/ttyACM0", "/dev/ttyACM1", "/dev/ttyACM2"]
        );
    }

    #[test]
    fn test_connect_first_success_wins() {
        let config = ActuatorConfig {
            devices: vec!["/dev/ttyACM".into()],
            enumerate_suffix: true,
            ..fast_config()
        };
        let mut tried = Vec::new();
        let link = ActuatorLink::connect(config, CancelToken::new(), |path| {
            tried.push(path.to_string());
            if path == "/dev/ttyACM1" {
                Ok(MockSerialLink::new(path).0)
            } else {
                Err(IoError::Timeout)
            }
        });

        assert!(link.is_connected());
        assert_eq!(link.device_name(), Some("/dev/ttyACM1"));
        assert_eq!(tried, vec!["/dev/ttyACM0", "/dev/ttyACM1"]);
    }

    #[test]
    fn test_connect_skips_repeats_of_missing_device() {
        let config = ActuatorConfig {
            devices: vec!["/dev/ttyACM0".into(), "/dev/ttyUSB0".into()],
            open_attempts: 3,
            ..fast_config()
        };
        let mut tried = Vec::new();
        let link: ActuatorLink<MockSerialLink> =
            ActuatorLink::connect(config, CancelToken::new(), |path| {
                tried.push(path.to_string());
                if path == "/dev/ttyACM0" {
                    Err(IoError::Device(DeviceError::new(DeviceErrorKind::NotFound, path)))
                } else {
                    Err(IoError::Timeout)
                }
            });

        assert!(!link.is_connected());
        assert_eq!(
            tried,
            vec!["/dev/ttyACM0", "/dev/ttyUSB0", "/dev/ttyUSB0", "/dev/ttyUSB0"]
        );
    }

    #[test]
    fn test_connect_failure_yields_sentinel() {
        let mut link: ActuatorLink<MockSerialLink> =
            ActuatorLink::connect(fast_config(), CancelToken::new(), |_| {
                Err(IoError::Unsupported("no serial"))
            });
        assert!(!link.is_connected());

        let status = link.execute(&Command::new("F1"));
        assert_eq!(status, Status::local_failure());
        assert_eq!(link.metrics().snapshot().local_failures, 1);
    }

    #[test]
    fn test_execute_writes_raw_command() {
        let (mut link, handle) = connected();
        handle.push_line("{'command': 'F1', 'result': 0}");

        let status = link.execute(&Command::new("F1"));
        assert_eq!(status, Status::new("F1", StatusCode::SUCCESS));
        // 默认没有结尾换行
        assert_eq!(handle.writes(), vec![b"F1".to_vec()]);
    }

    #[test]
    fn test_execute_retries_until_parseable() {
        let (mut link, handle) = connected();
        handle.push_line("garbage");
        handle.push_line("{bad");
        handle.push_line("{'command': 'X', 'result': 0}");

        let status = link.execute(&Command::new("X"));
        assert_eq!(status, Status::new("X", StatusCode(0)));

        let snapshot = link.metrics().snapshot();
        assert_eq!(snapshot.parse_failures, 2);
        assert_eq!(snapshot.statuses_parsed, 1);
        assert_eq!(handle.reads(), 3);
    }

    #[test]
    fn test_execute_exhausts_attempts() {
        let (mut link, handle) = connected();
        for _ in 0..10 {
            handle.push_line("noise");
        }

        let status = link.execute(&Command::new("F1"));
        assert!(status.is_local_failure());
        assert_eq!(handle.reads(), 5);
        assert_eq!(link.metrics().snapshot().parse_failures, 5);
    }

    #[test]
    fn test_timeouts_count_as_attempts() {
        let (mut link, handle) = connected();
        handle.push(MockRead::Timeout);
        handle.push_line("{'command': 'L', 'result': 3}");

        let status = link.execute(&Command::new("L"));
        assert_eq!(status, Status::new("L", StatusCode(3)));
    }

    #[test]
    fn test_broken_link_returns_sentinel() {
        let (mut link, handle) = connected();
        handle.push(MockRead::Broken);
        handle.push_line("{'command': 'F1', 'result': 0}");

        assert!(link.execute(&Command::new("F1")).is_local_failure());
        assert_eq!(handle.reads(), 1);
    }

    #[test]
    fn test_write_failure_returns_sentinel() {
        let (mut link, handle) = connected();
        handle.set_fail_writes(true);
        handle.push_line("{'command': 'F1', 'result': 0}");

        assert!(link.execute(&Command::new("F1")).is_local_failure());
        assert_eq!(handle.reads(), 0);
    }

    #[test]
    fn test_cancel_interrupts_settle() {
        let (link, handle) = MockSerialLink::new("mock0");
        let token = CancelToken::new();
        let config = ActuatorConfig {
            settle: Duration::from_secs(60),
            ..fast_config()
        };
        let mut link = ActuatorLink::with_link(link, config, token.clone());
        handle.push_line("{'command': 'F1', 'result': 0}");

        token.cancel();
        assert!(link.execute(&Command::new("F1")).is_local_failure());
    }
}
