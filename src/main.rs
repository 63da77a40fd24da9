//! cloudgame-webrtc - WebRTC 连接工厂诊断工具
//!
//! 主入口程序

mod cli;

use anyhow::Result;
use clap::Parser;
use cli::{Args, Commands};
use cloudgame_webrtc::config::{Config, ConfigSource};
use cloudgame_webrtc::webrtc::{global_settings, PeerConnectionFactory, SharedTimestamp};
use std::str::FromStr;
use tracing::{error, info, warn, Level};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = Config::get_config_path(args.config.as_deref());
    // 日志尚未初始化, 来源在 init_logging 之后报告
    let (config, source) = Config::load_with_source(&config_path)?;

    // 命令行 -v 优先于配置文件
    let log_level = match args.verbose {
        Some(verbose) => verbose_level(verbose),
        None => config.logging.level.as_str(),
    };
    init_logging(log_level);
    match source {
        ConfigSource::File => info!("配置文件: {}", config_path),
        ConfigSource::Default => warn!("配置文件不存在: {}, 使用默认配置", config_path),
    }

    match args.command.unwrap_or(Commands::Check { connections: 1 }) {
        Commands::Check { connections } => run_check(config, connections).await,
        Commands::Config => {
            print!("{}", toml::to_string_pretty(&config)?);
            Ok(())
        }
    }
}

fn verbose_level(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// 初始化日志 (RUST_LOG 优先)
fn init_logging(log_level: &str) {
    let level = Level::from_str(log_level).unwrap_or(Level::INFO);
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_ascii_lowercase()));

    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .with_env_filter(filter)
        .init();
}

/// 构建连接工厂并创建若干连接
async fn run_check(config: Config, connections: usize) -> Result<()> {
    info!("cloudgame-webrtc v{} 启动中...", env!("CARGO_PKG_VERSION"));

    let clock = SharedTimestamp::new(0);
    let factory = match PeerConnectionFactory::new(&config.webrtc, clock).await {
        Ok(factory) => factory,
        Err(e) if e.is_fatal() => {
            error!("网络层无法初始化: {}", e);
            std::process::exit(1);
        }
        Err(e) => return Err(e.into()),
    };

    if let Some(settings) = global_settings() {
        info!("端口策略: {:?}", settings.port_strategy());
    }
    info!("拦截器链: {:?}", factory.interceptors());
    for server in factory.ice_servers() {
        info!("ICE 服务器: {}", server.urls.join(", "));
    }

    for i in 0..connections {
        let pc = factory.new_connection().await?;
        info!("连接 #{} 已创建, 状态: {}", i + 1, pc.connection_state());
        if let Err(e) = pc.close().await {
            warn!("关闭连接 #{} 失败: {}", i + 1, e);
        }
    }

    println!("OK: {} 个连接创建成功", connections);
    Ok(())
}
