//! WebRTC PeerConnection 工厂
//!
//! 编解码器、拦截器链和进程级设置组装成一个不可变的 API 句柄,
//! 之后按需创建相互独立的 PeerConnection。

use super::interceptor::{InterceptorChain, InterceptorStage};
use super::port::{PortBinder, PortRoll};
use super::settings::{self, GlobalSettings};
use super::{FactoryError, SharedTimestamp};
use crate::config::{IceServerConfig, WebrtcConfig};
use std::sync::Arc;
use webrtc::{
    api::{media_engine::MediaEngine, APIBuilder, API},
    ice_transport::ice_server::RTCIceServer,
    peer_connection::{configuration::RTCConfiguration, RTCPeerConnection},
};

/// PeerConnection 工厂
///
/// clone 后共享同一个 API 句柄, 可在多个任务中并发创建连接
#[derive(Clone)]
pub struct PeerConnectionFactory {
    api: Arc<API>,
    configuration: RTCConfiguration,
    interceptors: Vec<InterceptorStage>,
}

impl PeerConnectionFactory {
    /// 创建连接工厂
    ///
    /// 首次调用时构建进程级设置; 返回 `is_fatal()` 的错误时进程不应继续运行
    pub async fn new(config: &WebrtcConfig, clock: SharedTimestamp) -> Result<Self, FactoryError> {
        Self::with_binder(config, clock, &PortRoll::default()).await
    }

    /// 使用指定的端口绑定器创建连接工厂
    pub async fn with_binder(
        config: &WebrtcConfig,
        clock: SharedTimestamp,
        binder: &dyn PortBinder,
    ) -> Result<Self, FactoryError> {
        let (media_engine, chain) = build_media(config, clock)?;
        let settings = settings::global_or_build(config, binder).await?;
        Ok(Self::assemble(config, media_engine, chain, &settings))
    }

    pub(crate) fn assemble(
        config: &WebrtcConfig,
        media_engine: MediaEngine,
        chain: InterceptorChain,
        settings: &GlobalSettings,
    ) -> Self {
        let (interceptors, registry) = chain.into_parts();

        let api = APIBuilder::new()
            .with_media_engine(media_engine)
            .with_interceptor_registry(registry)
            .with_setting_engine(settings.engine())
            .build();

        let configuration = RTCConfiguration {
            ice_servers: ice_servers(&config.ice_servers),
            ..Default::default()
        };

        tracing::info!(
            "创建 PeerConnectionFactory: {} 个 ICE 服务器, 拦截器 {:?}",
            configuration.ice_servers.len(),
            interceptors
        );

        Self {
            api: Arc::new(api),
            configuration,
            interceptors,
        }
    }

    /// 创建新的 PeerConnection
    ///
    /// 错误原样返回, 不重试
    pub async fn new_connection(&self) -> Result<RTCPeerConnection, webrtc::Error> {
        self.api.new_peer_connection(self.configuration.clone()).await
    }

    /// 每个连接使用的 ICE 服务器
    pub fn ice_servers(&self) -> &[RTCIceServer] {
        &self.configuration.ice_servers
    }

    /// 拦截器链顺序
    pub fn interceptors(&self) -> &[InterceptorStage] {
        &self.interceptors
    }
}

/// 注册默认编解码器并组装拦截器链
pub(crate) fn build_media(
    config: &WebrtcConfig,
    clock: SharedTimestamp,
) -> Result<(MediaEngine, InterceptorChain), FactoryError> {
    let mut media_engine = MediaEngine::default();
    media_engine
        .register_default_codecs()
        .map_err(FactoryError::Codecs)?;

    let chain = InterceptorChain::build(
        &mut media_engine,
        config.disable_default_interceptors,
        clock,
    )
    .map_err(FactoryError::Interceptors)?;

    Ok((media_engine, chain))
}

/// 转换 ICE 服务器配置, 保持原有顺序
fn ice_servers(servers: &[IceServerConfig]) -> Vec<RTCIceServer> {
    servers
        .iter()
        .map(|server| RTCIceServer {
            urls: vec![server.urls.clone()],
            username: server.username.clone(),
            credential: server.credential.clone(),
            ..Default::default()
        })
        .collect()
}
