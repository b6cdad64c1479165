//! # fieldbot
//!
//! 机器人板载控制客户端：采帧、向决策服务器请求动作、通过串口执行。
//!
//! ```bash
//! # 角色由主机名推断（picker-03 → picker）
//! fieldbot --config /etc/fieldbot/robot.toml
//!
//! # 显式指定角色和服务器地址
//! fieldbot --role delivery --addr tcp://10.42.0.1:1980 -v
//!
//! # 输出合并后的配置
//! fieldbot --config settings.json --print-config
//! ```
//!
//! 退出码：0 正常停止（Ctrl-C），1 运行期致命故障，2 配置/角色错误。

use anyhow::{Context, Result};
use clap::Parser;
use fieldbot_client::{CancelToken, ClientError, Role, RobotBuilder, RobotConfig, resolve_role};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const EXIT_RUNTIME: u8 = 1;
const EXIT_CONFIG: u8 = 2;

/// 日志默认开启的 crate
const LOG_TARGETS: &[&str] = &[
    "fieldbot",
    "fieldbot_client",
    "fieldbot_driver",
    "fieldbot_io",
    "fieldbot_config",
    "fieldbot_protocol",
];

/// fieldbot - 采摘/运输机器人控制客户端
#[derive(Parser, Debug)]
#[command(name = "fieldbot")]
#[command(about = "Onboard control client for picker and delivery robots", long_about = None)]
#[command(version)]
struct Cli {
    /// 配置文件（TOML，或旧版 JSON 设置）
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// 机器人角色（picker / delivery），默认读取配置或主机名
    #[arg(short, long)]
    role: Option<String>,

    /// 覆盖决策服务器地址
    #[arg(long)]
    addr: Option<String>,

    /// 输出调试日志
    #[arg(short, long)]
    verbose: bool,

    /// 打印合并后的配置并退出
    #[arg(long)]
    print_config: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let loaded = load_config(&cli);
    let verbose = cli.verbose || loaded.as_ref().is_ok_and(|config| config.verbose);
    init_logging(verbose);

    let config = match loaded {
        Ok(config) => config,
        Err(e) => {
            error!("{:#}", e);
            return ExitCode::from(EXIT_CONFIG);
        },
    };

    if cli.print_config {
        return match config.to_toml_string() {
            Ok(text) => {
                print!("{}", text);
                ExitCode::SUCCESS
            },
            Err(e) => {
                error!("{}", e);
                ExitCode::from(EXIT_CONFIG)
            },
        };
    }

    match run(&cli, config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::from(exit_code_for(&e))
        },
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let directives: Vec<String> = LOG_TARGETS
            .iter()
            .map(|target| format!("{}={}", target, level))
            .collect();
        EnvFilter::new(directives.join(","))
    });

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// 读取配置文件（未给出时使用默认值）并应用命令行覆盖
fn load_config(cli: &Cli) -> Result<RobotConfig> {
    let mut config = match cli.config.as_deref() {
        Some(path) => RobotConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => RobotConfig::default(),
    };

    if let Some(addr) = &cli.addr {
        config.network.addr = addr.clone();
        config.validate().context("Invalid --addr")?;
    }
    if cli.verbose {
        config.verbose = true;
    }
    Ok(config)
}

fn run(cli: &Cli, config: RobotConfig) -> Result<()> {
    let hostname = hostname();
    let role = resolve_role(
        cli.role.as_deref(),
        config.role.as_deref(),
        hostname.as_deref(),
    )
    .map_err(ClientError::from)
    .with_context(|| match hostname.as_deref() {
        Some(host) => format!("Cannot determine robot role (hostname {:?})", host),
        None => "Cannot determine robot role".to_string(),
    })?;

    if missing_camera_backend(role) {
        error!(
            "Built without the `opencv` feature: this {} robot will only send blank frames",
            role
        );
    }

    let token = CancelToken::new();
    let handler_token = token.clone();
    ctrlc::set_handler(move || {
        info!("Interrupt received, stopping");
        handler_token.cancel();
    })
    .context("Failed to install Ctrl-C handler")?;

    let mut robot = RobotBuilder::new(config)
        .role(role)
        .cancel_token(token)
        .build()
        .context("Failed to start robot")?;

    let result = robot.run();
    info!("Final counters: {:?}", robot.snapshot());
    result.context("Control loop failed")
}

/// 需要相机的角色但未编译相机后端
fn missing_camera_backend(role: Role) -> bool {
    role.requires_camera() && !cfg!(feature = "opencv")
}

fn exit_code_for(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<ClientError>() {
        Some(e) if e.is_configuration() => EXIT_CONFIG,
        _ => EXIT_RUNTIME,
    }
}

#[cfg(unix)]
fn hostname() -> Option<String> {
    nix::unistd::gethostname()
        .ok()
        .and_then(|name| name.into_string().ok())
}

#[cfg(not(unix))]
fn hostname() -> Option<String> {
    None
}
