//! 配置管理模块
//!
//! 负责加载和管理 WebRTC 连接工厂的配置

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use anyhow::Result;

/// 配置来源
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSource {
    /// 从配置文件读取
    File,
    /// 文件不存在, 使用默认配置
    Default,
}

/// 应用程序配置
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    /// WebRTC 配置
    #[serde(default)]
    pub webrtc: WebrtcConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// WebRTC 配置
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WebrtcConfig {
    /// 不注册 webrtc-rs 默认拦截器 (NACK, RTCP 报告, TWCC)
    #[serde(default)]
    pub disable_default_interceptors: bool,
    /// webrtc-rs 内部日志级别
    #[serde(default)]
    pub log_level: LogLevel,
    /// ICE 临时端口范围, 优先于 single_port
    #[serde(default)]
    pub ice_ports: IcePorts,
    /// 所有连接复用的单个 UDP 端口 (0 = 不使用)
    #[serde(default)]
    pub single_port: u16,
    /// NAT 1:1 映射的公网 IP
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ice_ip_map: Option<String>,
    /// ICE 服务器列表
    #[serde(default = "default_ice_servers")]
    pub ice_servers: Vec<IceServerConfig>,
}

/// ICE 端口范围
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct IcePorts {
    #[serde(default)]
    pub min: u16,
    #[serde(default)]
    pub max: u16,
}

impl IcePorts {
    /// 两端都大于 0 时才视为已配置
    pub fn is_configured(&self) -> bool {
        self.min > 0 && self.max > 0
    }
}

/// ICE 服务器配置
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct IceServerConfig {
    /// 服务器 URL (例如: stun:stun.l.google.com:19302)
    pub urls: String,
    /// 用户名 (TURN)
    #[serde(default)]
    pub username: String,
    /// 凭证 (TURN)
    #[serde(default)]
    pub credential: String,
}

impl IceServerConfig {
    pub fn new(urls: impl Into<String>) -> Self {
        Self {
            urls: urls.into(),
            username: String::new(),
            credential: String::new(),
        }
    }
}

/// webrtc-rs 日志级别
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Off,
    #[default]
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// 转换为 log 门面的级别过滤器
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Off => log::LevelFilter::Off,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// 日志级别: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for WebrtcConfig {
    fn default() -> Self {
        WebrtcConfig {
            disable_default_interceptors: false,
            log_level: LogLevel::default(),
            ice_ports: IcePorts::default(),
            single_port: 0,
            ice_ip_map: None,
            ice_servers: default_ice_servers(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: default_log_level(),
        }
    }
}

impl WebrtcConfig {
    /// NAT 映射 IP, 空字符串视为未配置
    pub fn nat_ip(&self) -> Option<&str> {
        self.ice_ip_map
            .as_deref()
            .map(str::trim)
            .filter(|ip| !ip.is_empty())
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_ice_servers() -> Vec<IceServerConfig> {
    vec![IceServerConfig::new("stun:stun.l.google.com:19302")]
}

impl Config {
    /// 从文件加载配置
    ///
    /// 如果文件不存在，返回默认配置
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let (config, source) = Self::load_with_source(path)?;
        match source {
            ConfigSource::File => tracing::info!("配置加载成功: {:?}", path),
            ConfigSource::Default => tracing::warn!("配置文件不存在: {:?}, 使用默认配置", path),
        }
        Ok(config)
    }

    /// 加载配置并返回其来源, 不输出日志
    ///
    /// 日志系统初始化前使用, 由调用方在初始化后报告来源
    pub fn load_with_source<P: AsRef<Path>>(path: P) -> Result<(Self, ConfigSource)> {
        let path = path.as_ref();

        if !path.exists() {
            return Ok((Config::default(), ConfigSource::Default));
        }

        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("配置文件解析失败: {}", e))?;

        Ok((config, ConfigSource::File))
    }

    /// 保存配置到文件
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path.as_ref(), content)?;
        Ok(())
    }

    /// 获取配置文件路径
    ///
    /// 优先级: 命令行指定 > 当前目录 > 用户主目录
    pub fn get_config_path(cli_path: Option<&str>) -> String {
        if let Some(p) = cli_path {
            return p.to_string();
        }

        if Path::new("config.toml").exists() {
            return "config.toml".to_string();
        }

        if let Ok(home) = std::env::var("HOME") {
            let config_path = format!("{}/.config/cloudgame-webrtc/config.toml", home);
            if Path::new(&config_path).exists() {
                return config_path;
            }
        }

        "config.toml".to_string()
    }
}
