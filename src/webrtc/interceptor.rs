//! 拦截器链
//!
//! 默认拦截器 (可关闭) 先注册, 时间戳重定时拦截器始终最后注册。
//! webrtc-rs 按注册顺序逐层包装 writer, 最后注册的处于最外层,
//! 因此发送路径上重定时最先看到 RTP 包, 默认拦截器 (NACK 缓存,
//! 发送报告) 看到的都是改写后的时间戳。

use super::SharedTimestamp;
use async_trait::async_trait;
use std::sync::Arc;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::interceptor::registry::Registry;
use webrtc::interceptor::stream_info::StreamInfo;
use webrtc::interceptor::{
    Attributes, Error, Interceptor, InterceptorBuilder, RTCPReader, RTCPWriter, RTPReader,
    RTPWriter,
};
use webrtc::rtp::packet::Packet;

/// 拦截器链中的阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterceptorStage {
    /// webrtc-rs 默认拦截器集合 (NACK, RTCP 报告, TWCC ...)
    EngineDefaults,
    /// 时间戳重定时
    ReTime,
}

/// 已组装的拦截器链
pub struct InterceptorChain {
    stages: Vec<InterceptorStage>,
    registry: Registry,
}

impl InterceptorChain {
    /// 组装拦截器链
    ///
    /// 默认拦截器会向 `media_engine` 注册所需的 RTCP 反馈和头部扩展
    pub fn build(
        media_engine: &mut MediaEngine,
        disable_defaults: bool,
        clock: SharedTimestamp,
    ) -> Result<Self, webrtc::Error> {
        let mut registry = Registry::new();
        let mut stages = Vec::with_capacity(2);

        if !disable_defaults {
            registry = register_default_interceptors(registry, media_engine)?;
            stages.push(InterceptorStage::EngineDefaults);
        }

        registry.add(Box::new(ReTimeInterceptorBuilder::new(clock)));
        stages.push(InterceptorStage::ReTime);

        tracing::debug!("拦截器链: {:?}", stages);
        Ok(Self { stages, registry })
    }

    pub fn stages(&self) -> &[InterceptorStage] {
        &self.stages
    }

    pub fn into_parts(self) -> (Vec<InterceptorStage>, Registry) {
        (self.stages, self.registry)
    }
}

/// 重定时拦截器构建器, 每个连接构建一个拦截器实例
pub struct ReTimeInterceptorBuilder {
    clock: SharedTimestamp,
}

impl ReTimeInterceptorBuilder {
    pub fn new(clock: SharedTimestamp) -> Self {
        Self { clock }
    }
}

impl InterceptorBuilder for ReTimeInterceptorBuilder {
    fn build(&self, _id: &str) -> Result<Arc<dyn Interceptor + Send + Sync>, Error> {
        Ok(Arc::new(ReTimeInterceptor {
            clock: self.clock.clone(),
        }))
    }
}

/// 将出站 RTP 包的时间戳改写为共享时间戳的当前值
///
/// 只改写本地流的 RTP 包, RTCP 和远端流原样透传, 不丢包也不阻塞。
pub struct ReTimeInterceptor {
    clock: SharedTimestamp,
}

#[async_trait]
impl Interceptor for ReTimeInterceptor {
    async fn bind_rtcp_reader(
        &self,
        reader: Arc<dyn RTCPReader + Send + Sync>,
    ) -> Arc<dyn RTCPReader + Send + Sync> {
        reader
    }

    async fn bind_rtcp_writer(
        &self,
        writer: Arc<dyn RTCPWriter + Send + Sync>,
    ) -> Arc<dyn RTCPWriter + Send + Sync> {
        writer
    }

    async fn bind_local_stream(
        &self,
        info: &StreamInfo,
        writer: Arc<dyn RTPWriter + Send + Sync>,
    ) -> Arc<dyn RTPWriter + Send + Sync> {
        tracing::trace!(ssrc = info.ssrc, mime = %info.mime_type, "绑定重定时本地流");
        Arc::new(ReTimeWriter {
            clock: self.clock.clone(),
            next: writer,
        })
    }

    async fn unbind_local_stream(&self, _info: &StreamInfo) {}

    async fn bind_remote_stream(
        &self,
        _info: &StreamInfo,
        reader: Arc<dyn RTPReader + Send + Sync>,
    ) -> Arc<dyn RTPReader + Send + Sync> {
        reader
    }

    async fn unbind_remote_stream(&self, _info: &StreamInfo) {}

    async fn close(&self) -> Result<(), Error> {
        Ok(())
    }
}

struct ReTimeWriter {
    clock: SharedTimestamp,
    next: Arc<dyn RTPWriter + Send + Sync>,
}

#[async_trait]
impl RTPWriter for ReTimeWriter {
    async fn write(&self, pkt: &Packet, attributes: &Attributes) -> Result<usize, Error> {
        let mut pkt = pkt.clone();
        pkt.header.timestamp = self.clock.load();
        self.next.write(&pkt, attributes).await
    }
}
