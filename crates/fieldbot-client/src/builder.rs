//! Robot Builder
//!
//! 按配置组装三个组件。组装顺序固定：先确定角色（不合法直接失败，不碰任何设备），
//! 再连接决策服务器，然后打开串口，最后（仅 picker）打开相机。
//! 串口和相机失败都是软失败：分别退化为哨兵状态和全零帧。

use crate::error::ClientError;
use crate::robot::Robot;
use fieldbot_config::RobotConfig;
use fieldbot_driver::{
    ActuatorConfig, ActuatorLink, CancelToken, DecisionChannel, DecisionConfig, FrameSource,
    FrameSourceConfig,
};
use fieldbot_io::{CameraSettings, CaptureDevice, IoError, RequestSocket, SerialLink};
use fieldbot_protocol::{ProtocolError, Role};
use tracing::{info, warn};

#[cfg(all(feature = "serial", feature = "zmq"))]
use fieldbot_io::{SerialPortLink, ZmqReqSocket};

/// 按优先级确定角色：命令行 > 配置文件 > 主机名前缀
///
/// 第一个给出的来源即为结果，不合法时直接报错，不再尝试后面的来源。
pub fn resolve_role(
    cli: Option<&str>,
    config: Option<&str>,
    hostname: Option<&str>,
) -> Result<Role, ProtocolError> {
    if let Some(role) = cli.or(config) {
        return role.parse();
    }
    match hostname {
        Some(hostname) => Role::from_hostname(hostname),
        None => Err(ProtocolError::UnknownRole(String::new())),
    }
}

/// Robot Builder（链式构造）
///
/// # Example
///
/// ```no_run
/// use fieldbot_client::{RobotBuilder, RobotConfig, Role};
///
/// let mut robot = RobotBuilder::new(RobotConfig::default())
///     .role(Role::Picker)
///     .build()
///     .unwrap();
/// robot.run().unwrap();
/// ```
pub struct RobotBuilder {
    config: RobotConfig,
    role: Option<Role>,
    token: CancelToken,
}

impl RobotBuilder {
    pub fn new(config: RobotConfig) -> Self {
        Self {
            config,
            role: None,
            token: CancelToken::new(),
        }
    }

    /// 显式指定角色（优先于配置文件中的 `role`）
    pub fn role(mut self, role: Role) -> Self {
        self.role = Some(role);
        self
    }

    /// 共享的取消令牌（Ctrl-C 处理器持有另一个克隆）
    pub fn cancel_token(mut self, token: CancelToken) -> Self {
        self.token = token;
        self
    }

    pub fn config(&self) -> &RobotConfig {
        &self.config
    }

    pub fn actuator_config(&self) -> ActuatorConfig {
        let serial = &self.config.serial;
        ActuatorConfig {
            devices: serial.devices.clone(),
            open_attempts: serial.open_attempts,
            enumerate_suffix: serial.enumerate_suffix,
            connect_settle: serial.connect_settle(),
            settle: serial.settle(),
            max_status_attempts: serial.max_status_attempts,
            command_terminator: serial.command_terminator.clone(),
        }
    }

    pub fn decision_config(&self) -> DecisionConfig {
        let network = &self.config.network;
        DecisionConfig {
            timeout: network.timeout(),
            fatal_on_spurious_wakeup: network.fatal_on_spurious_wakeup,
            reset_on_failure: network.reset_on_failure,
        }
    }

    pub fn frame_source_config(&self) -> FrameSourceConfig {
        let camera = &self.config.camera;
        FrameSourceConfig {
            height: camera.height,
            width: camera.width,
            poll_interval: camera.poll_interval(),
        }
    }

    pub fn camera_settings(&self) -> CameraSettings {
        let camera = &self.config.camera;
        CameraSettings {
            index: camera.index,
            width: camera.width,
            height: camera.height,
            saturation: camera.saturation,
            contrast: camera.contrast,
            brightness: camera.brightness,
        }
    }

    fn resolved_role(&self) -> Result<Role, ClientError> {
        match self.role {
            Some(role) => Ok(role),
            None => Ok(resolve_role(None, self.config.role.as_deref(), None)?),
        }
    }

    /// 用给定的后端工厂组装
    ///
    /// - `connect`: 按地址建立请求 socket（失败为致命错误）
    /// - `open_serial`: 按路径打开串口（逐个候选调用）
    /// - `open_camera`: 打开相机（仅 picker 调用）
    pub fn build_with<L, S, D, C, O, K>(
        self,
        connect: C,
        open_serial: O,
        open_camera: K,
    ) -> Result<Robot<L, S>, ClientError>
    where
        L: SerialLink,
        S: RequestSocket,
        D: CaptureDevice + 'static,
        C: FnOnce(&str) -> Result<S, IoError>,
        O: FnMut(&str) -> Result<L, IoError>,
        K: FnOnce(&CameraSettings) -> Result<D, IoError>,
    {
        let role = self.resolved_role()?;
        self.config.validate()?;
        info!("Starting {} robot", role);

        let addr = self.config.network.addr.clone();
        let socket = connect(&addr).map_err(|source| ClientError::Connect {
            addr: addr.clone(),
            source,
        })?;
        info!("Connected to decision server at {}", addr);
        let decision = DecisionChannel::new(socket, role, self.decision_config());

        let actuator = ActuatorLink::connect(self.actuator_config(), self.token.clone(), open_serial);

        let frames = if role.requires_camera() {
            match open_camera(&self.camera_settings()) {
                Ok(device) => {
                    FrameSource::spawn(device, self.frame_source_config(), self.token.clone())?
                },
                Err(e) => {
                    warn!("Camera unavailable: {}, sending blank frames", e);
                    FrameSource::disabled(self.frame_source_config())
                },
            }
        } else {
            FrameSource::disabled(self.frame_source_config())
        };

        Ok(Robot::new(role, frames, decision, actuator, self.token))
    }

    /// 使用真实硬件后端组装（ZeroMQ + serialport，启用 `opencv` 时带相机）
    #[cfg(all(feature = "serial", feature = "zmq"))]
    pub fn build(self) -> Result<Robot<SerialPortLink, ZmqReqSocket>, ClientError> {
        let baud = self.config.serial.baud;
        let read_timeout = self.config.serial.read_timeout();

        self.build_with(
            ZmqReqSocket::connect,
            |path| SerialPortLink::open(path, baud, read_timeout),
            open_camera,
        )
    }
}

#[cfg(all(feature = "serial", feature = "zmq"))]
fn open_camera(settings: &CameraSettings) -> Result<Box<dyn CaptureDevice>, IoError> {
    #[cfg(feature = "opencv")]
    {
        Ok(Box::new(fieldbot_io::OpenCvCamera::open(settings)?))
    }

    #[cfg(not(feature = "opencv"))]
    {
        let _ = settings;
        Err(IoError::Unsupported(
            "camera support not compiled in (enable the `opencv` feature)",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_role_precedence() {
        assert_eq!(
            resolve_role(Some("delivery"), Some("picker"), Some("picker-01")).unwrap(),
            Role::Delivery
        );
        assert_eq!(
            resolve_role(None, Some("picker"), Some("delivery-01")).unwrap(),
            Role::Picker
        );
        assert_eq!(
            resolve_role(None, None, Some("delivery-07")).unwrap(),
            Role::Delivery
        );
    }

    #[test]
    fn test_resolve_role_rejects_unknown() {
        assert!(matches!(
            resolve_role(Some("harvester"), None, Some("picker-01")),
            Err(ProtocolError::UnknownRole(ref r)) if r == "harvester"
        ));
        assert!(resolve_role(None, None, Some("workstation")).is_err());
        assert!(resolve_role(None, None, None).is_err());
    }

    #[test]
    fn test_component_configs_follow_robot_config() {
        let mut config = RobotConfig::default();
        config.network.timeout_ms = 250;
        config.serial.settle_ms = 0;
        config.serial.enumerate_suffix = true;
        config.camera.width = 320;
        config.camera.height = 240;
        config.camera.poll_interval_ms = 5;

        let builder = RobotBuilder::new(config);
        assert_eq!(
            builder.decision_config().timeout,
            std::time::Duration::from_millis(250)
        );
        assert!(builder.actuator_config().enumerate_suffix);
        assert!(builder.actuator_config().settle.is_zero());

        let frames = builder.frame_source_config();
        assert_eq!((frames.height, frames.width), (240, 320));
        assert_eq!(frames.poll_interval, std::time::Duration::from_millis(5));
        assert_eq!(builder.camera_settings().width, 320);
    }
}
