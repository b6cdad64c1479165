use fieldbot_config::ConfigError;
use fieldbot_driver::DriverError;
use fieldbot_io::IoError;
use fieldbot_protocol::ProtocolError;
use thiserror::Error;

/// 客户端错误
#[derive(Error, Debug)]
pub enum ClientError {
    /// 角色无法确定或不合法
    #[error("Role error: {0}")]
    Role(#[from] ProtocolError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// 决策服务器连接失败
    #[error("Failed to connect to decision server at {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: IoError,
    },

    #[error("Driver error: {0}")]
    Driver(#[from] DriverError),
}

impl ClientError {
    /// 启动阶段的配置类错误（对应退出码 2）
    pub fn is_configuration(&self) -> bool {
        matches!(self, ClientError::Role(_) | ClientError::Config(_))
    }
}
