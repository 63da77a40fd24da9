//! ICE 端口策略
//!
//! 临时端口范围与单端口复用互斥, 配置了范围时范围优先。

use super::StartupError;
use crate::config::WebrtcConfig;
use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr, UdpSocket};

/// UDP 端口绑定器
pub trait PortBinder: Send + Sync {
    /// 绑定一个 UDP 端口, 端口被占用时可以改用其它端口
    fn bind(&self, port: u16) -> io::Result<UdpSocket>;
}

/// `PortRoll` 默认最多尝试的端口数 (含请求端口本身)
pub const PORT_ROLL_ATTEMPTS: u16 = 100;

/// 默认绑定器: 请求端口被占用时依次尝试后续端口, 最多尝试 `attempts` 个
#[derive(Debug, Clone)]
pub struct PortRoll {
    host: IpAddr,
    attempts: u16,
}

impl PortRoll {
    pub fn new(host: IpAddr) -> Self {
        Self {
            host,
            attempts: PORT_ROLL_ATTEMPTS,
        }
    }

    /// 设置尝试次数 (至少 1 次)
    pub fn with_attempts(mut self, attempts: u16) -> Self {
        self.attempts = attempts.max(1);
        self
    }
}

impl Default for PortRoll {
    fn default() -> Self {
        Self::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
    }
}

impl PortBinder for PortRoll {
    fn bind(&self, port: u16) -> io::Result<UdpSocket> {
        let last = port.saturating_add(self.attempts - 1);
        let mut candidate = port;
        loop {
            match UdpSocket::bind((self.host, candidate)) {
                Ok(socket) => return Ok(socket),
                Err(e) if e.kind() == io::ErrorKind::AddrInUse && candidate < last => {
                    tracing::debug!("UDP 端口 {} 已被占用, 尝试 {}", candidate, candidate + 1);
                    candidate += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// 解析得到的端口分配方式
#[derive(Debug)]
pub enum PortAllocation {
    /// 不限制端口, 使用 webrtc-rs 默认行为
    EngineDefault,
    /// 每个连接从临时端口范围中取端口
    Range { min: u16, max: u16 },
    /// 所有连接复用同一个已绑定的 UDP socket
    Muxed(UdpSocket),
}

/// 已生效的端口策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortStrategy {
    EngineDefault,
    EphemeralRange { min: u16, max: u16 },
    Muxed { local_addr: SocketAddr },
}

/// 根据配置决定端口分配方式, 需要单端口时完成绑定
pub fn resolve(
    config: &WebrtcConfig,
    binder: &dyn PortBinder,
) -> Result<PortAllocation, StartupError> {
    let ports = config.ice_ports;

    if ports.is_configured() {
        if ports.min > ports.max {
            return Err(StartupError::InvalidPortRange {
                min: ports.min,
                max: ports.max,
            });
        }
        if config.single_port > 0 {
            tracing::warn!(
                "已配置 ICE 端口范围 {}-{}, 忽略 single_port {}",
                ports.min,
                ports.max,
                config.single_port
            );
        }
        return Ok(PortAllocation::Range {
            min: ports.min,
            max: ports.max,
        });
    }

    if config.single_port > 0 {
        let socket = binder
            .bind(config.single_port)
            .map_err(|source| StartupError::Bind {
                port: config.single_port,
                source,
            })?;
        match socket.local_addr() {
            Ok(addr) => tracing::info!("WebRTC 单端口监听: {}", addr),
            Err(e) => tracing::warn!("无法获取 WebRTC 监听地址: {}", e),
        }
        return Ok(PortAllocation::Muxed(socket));
    }

    Ok(PortAllocation::EngineDefault)
}
