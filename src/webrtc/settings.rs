//! 进程级 WebRTC 引擎设置
//!
//! `SettingEngine` 在进程内只构建一次, 所有连接工厂共享同一份设置
//! (包括单端口模式下绑定的 UDP socket)。

use super::log_bridge::WebrtcLogBridge;
use super::port::{self, PortAllocation, PortBinder, PortStrategy};
use super::StartupError;
use crate::config::{LogLevel, WebrtcConfig};
use std::fmt;
use std::sync::Arc;
use tokio::sync::OnceCell;
use webrtc::api::setting_engine::SettingEngine;
use webrtc::ice::udp_mux::{UDPMuxDefault, UDPMuxParams};
use webrtc::ice::udp_network::{EphemeralUDP, UDPNetwork};
use webrtc::ice_transport::ice_candidate_type::RTCIceCandidateType;

static GLOBAL_SETTINGS: SettingsCell = SettingsCell::new();

/// 获取已构建的进程级设置 (尚未构建时返回 None)
pub fn global_settings() -> Option<Arc<GlobalSettings>> {
    GLOBAL_SETTINGS.get()
}

/// 构建或获取进程级设置
pub(crate) async fn global_or_build(
    config: &WebrtcConfig,
    binder: &dyn PortBinder,
) -> Result<Arc<GlobalSettings>, Arc<StartupError>> {
    GLOBAL_SETTINGS.get_or_build(config, binder).await
}

/// 已解析的 WebRTC 引擎设置, 构建后只读
pub struct GlobalSettings {
    engine: SettingEngine,
    port_strategy: PortStrategy,
    nat_ip: Option<String>,
    log_level: LogLevel,
}

impl GlobalSettings {
    fn build(config: &WebrtcConfig, binder: &dyn PortBinder) -> Result<Self, StartupError> {
        WebrtcLogBridge::new(config.log_level).install();

        let mut engine = SettingEngine::default();
        let allocation = port::resolve(config, binder)?;
        let (network, port_strategy) = udp_network(allocation, config.single_port)?;
        if let Some(network) = network {
            engine.set_udp_network(network);
        }

        let nat_ip = config.nat_ip().map(str::to_string);
        if let Some(ip) = &nat_ip {
            engine.set_nat_1to1_ips(vec![ip.clone()], RTCIceCandidateType::Host);
            tracing::info!("NAT 1:1 映射: {}", ip);
        }

        tracing::info!("WebRTC 全局设置已构建: {:?}", port_strategy);
        Ok(Self {
            engine,
            port_strategy,
            nat_ip,
            log_level: config.log_level,
        })
    }

    /// webrtc-rs 设置引擎 (clone 共享同一个 UDP mux)
    pub fn engine(&self) -> SettingEngine {
        self.engine.clone()
    }

    pub fn port_strategy(&self) -> PortStrategy {
        self.port_strategy
    }

    pub fn nat_ip(&self) -> Option<&str> {
        self.nat_ip.as_deref()
    }

    pub fn log_level(&self) -> LogLevel {
        self.log_level
    }
}

/// 将端口分配转换为 webrtc-rs 的 UDP 网络设置 (None = 引擎默认)
fn udp_network(
    allocation: PortAllocation,
    single_port: u16,
) -> Result<(Option<UDPNetwork>, PortStrategy), StartupError> {
    match allocation {
        PortAllocation::EngineDefault => Ok((None, PortStrategy::EngineDefault)),
        PortAllocation::Range { min, max } => {
            let ephemeral = EphemeralUDP::new(min, max)
                .map_err(|source| StartupError::PortRange { min, max, source })?;
            Ok((
                Some(UDPNetwork::Ephemeral(ephemeral)),
                PortStrategy::EphemeralRange { min, max },
            ))
        }
        PortAllocation::Muxed(socket) => {
            let bind_err = |source| StartupError::Bind {
                port: single_port,
                source,
            };
            let local_addr = socket.local_addr().map_err(bind_err)?;
            socket.set_nonblocking(true).map_err(bind_err)?;
            let socket = tokio::net::UdpSocket::from_std(socket).map_err(bind_err)?;

            let mux = UDPMuxDefault::new(UDPMuxParams::new(socket));
            Ok((
                Some(UDPNetwork::Muxed(mux)),
                PortStrategy::Muxed { local_addr },
            ))
        }
    }
}

impl fmt::Debug for GlobalSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GlobalSettings")
            .field("port_strategy", &self.port_strategy)
            .field("nat_ip", &self.nat_ip)
            .field("log_level", &self.log_level)
            .finish_non_exhaustive()
    }
}

/// 只初始化一次的设置单元
///
/// 并发调用者等待同一次构建, 之后都得到同一个 `Arc` (或同一个错误)。
pub(crate) struct SettingsCell {
    cell: OnceCell<Result<Arc<GlobalSettings>, Arc<StartupError>>>,
}

impl SettingsCell {
    pub(crate) const fn new() -> Self {
        Self {
            cell: OnceCell::const_new(),
        }
    }

    pub(crate) fn get(&self) -> Option<Arc<GlobalSettings>> {
        self.cell.get().and_then(|built| built.as_ref().ok().cloned())
    }

    pub(crate) async fn get_or_build(
        &self,
        config: &WebrtcConfig,
        binder: &dyn PortBinder,
    ) -> Result<Arc<GlobalSettings>, Arc<StartupError>> {
        self.cell
            .get_or_init(|| async {
                GlobalSettings::build(config, binder)
                    .map(Arc::new)
                    .map_err(|e| {
                        tracing::error!("WebRTC 全局设置构建失败: {}", e);
                        Arc::new(e)
                    })
            })
            .await
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IcePorts;
    use crate::webrtc::port::tests::{CountingBinder, FailingBinder};
    use std::sync::atomic::Ordering;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_callers_share_one_build() {
        let cell = Arc::new(SettingsCell::new());
        let binder = Arc::new(CountingBinder::default());
        let config = WebrtcConfig {
            single_port: 9000,
            ..Default::default()
        };

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let cell = cell.clone();
                let binder = binder.clone();
                let config = config.clone();
                tokio::spawn(async move {
                    cell.get_or_build(&config, binder.as_ref()).await.unwrap()
                })
            })
            .collect();

        let mut results = Vec::new();
        for handle in handles {
            results.push(handle.await.unwrap());
        }

        assert_eq!(binder.calls.load(Ordering::SeqCst), 1);
        assert!(results.iter().all(|s| Arc::ptr_eq(s, &results[0])));
        assert!(Arc::ptr_eq(&cell.get().unwrap(), &results[0]));
    }

    #[tokio::test]
    async fn test_second_config_is_ignored() {
        let cell = SettingsCell::new();
        let binder = CountingBinder::default();

        let first = cell
            .get_or_build(&WebrtcConfig::default(), &binder)
            .await
            .unwrap();
        let second = cell
            .get_or_build(
                &WebrtcConfig {
                    single_port: 9000,
                    ..Default::default()
                },
                &binder,
            )
            .await
            .unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.port_strategy(), PortStrategy::EngineDefault);
        assert_eq!(binder.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_range_never_binds() {
        let cell = SettingsCell::new();
        let binder = FailingBinder::default();
        let config = WebrtcConfig {
            ice_ports: IcePorts { min: 10000, max: 10010 },
            single_port: 9000,
            ..Default::default()
        };

        let settings = cell.get_or_build(&config, &binder).await.unwrap();
        assert_eq!(
            settings.port_strategy(),
            PortStrategy::EphemeralRange { min: 10000, max: 10010 }
        );
        assert_eq!(binder.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_range_sets_ephemeral_network() {
        let (network, strategy) =
            udp_network(PortAllocation::Range { min: 10000, max: 10010 }, 9000).unwrap();
        assert!(matches!(network, Some(UDPNetwork::Ephemeral(_))));
        assert_eq!(strategy, PortStrategy::EphemeralRange { min: 10000, max: 10010 });
    }

    #[test]
    fn test_engine_rejects_inverted_range() {
        let err = udp_network(PortAllocation::Range { min: 10010, max: 10000 }, 0).err().expect("expected Err for inverted range");
        assert!(matches!(
            err,
            StartupError::PortRange { min: 10010, max: 10000, .. }
        ));
    }

    #[test]
    fn test_engine_default_keeps_network_unset() {
        let (network, strategy) = udp_network(PortAllocation::EngineDefault, 0).unwrap();
        assert!(network.is_none());
        assert_eq!(strategy, PortStrategy::EngineDefault);
    }

    #[tokio::test]
    async fn test_single_port_is_muxed() {
        let cell = SettingsCell::new();
        let binder = CountingBinder::default();
        let config = WebrtcConfig {
            single_port: 9000,
            ice_ip_map: Some("203.0.113.7".to_string()),
            ..Default::default()
        };

        let settings = cell.get_or_build(&config, &binder).await.unwrap();
        match settings.port_strategy() {
            PortStrategy::Muxed { local_addr } => assert!(local_addr.ip().is_loopback()),
            other => panic!("unexpected strategy: {:?}", other),
        }
        assert_eq!(settings.nat_ip(), Some("203.0.113.7"));
    }

    #[tokio::test]
    async fn test_startup_error_is_cached() {
        let cell = SettingsCell::new();
        let binder = FailingBinder::default();
        let config = WebrtcConfig {
            single_port: 9000,
            ..Default::default()
        };

        let first = cell.get_or_build(&config, &binder).await.unwrap_err();
        let second = cell.get_or_build(&config, &binder).await.unwrap_err();

        assert!(Arc::ptr_eq(&first, &second));
        assert!(matches!(*first, StartupError::Bind { port: 9000, .. }));
        assert_eq!(binder.calls.load(Ordering::SeqCst), 1);
        assert!(cell.get().is_none());
    }
}
