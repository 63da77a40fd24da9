//! 连接工厂错误类型

use std::io;
use std::sync::Arc;
use thiserror::Error;

/// 启动期网络配置错误
///
/// 出现时进程无法建立任何网络通路，入口程序应直接退出
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid ICE port range {min}-{max}")]
    InvalidPortRange { min: u16, max: u16 },

    #[error("ICE port range {min}-{max} rejected by engine: {source}")]
    PortRange {
        min: u16,
        max: u16,
        #[source]
        source: webrtc::ice::Error,
    },

    #[error("failed to bind UDP port {port}: {source}")]
    Bind {
        port: u16,
        #[source]
        source: io::Error,
    },
}

/// 连接工厂构建错误
#[derive(Debug, Error)]
pub enum FactoryError {
    /// 全局设置构建失败 (致命)
    #[error("webrtc startup failed: {0}")]
    Startup(Arc<StartupError>),

    #[error("failed to register default codecs: {0}")]
    Codecs(#[source] webrtc::Error),

    #[error("failed to register interceptors: {0}")]
    Interceptors(#[source] webrtc::Error),
}

impl FactoryError {
    /// 是否为不可恢复的启动错误
    pub fn is_fatal(&self) -> bool {
        matches!(self, FactoryError::Startup(_))
    }
}

impl From<Arc<StartupError>> for FactoryError {
    fn from(err: Arc<StartupError>) -> Self {
        FactoryError::Startup(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        let startup = FactoryError::from(Arc::new(StartupError::InvalidPortRange {
            min: 20,
            max: 10,
        }));
        assert!(startup.is_fatal());
        assert_eq!(
            startup.to_string(),
            "webrtc startup failed: invalid ICE port range 20-10"
        );

        let codecs = FactoryError::Codecs(webrtc::Error::ErrCodecNotFound);
        assert!(!codecs.is_fatal());
    }

    #[test]
    fn test_bind_error_message() {
        let err = StartupError::Bind {
            port: 9000,
            source: io::Error::new(io::ErrorKind::AddrInUse, "in use"),
        };
        assert_eq!(err.to_string(), "failed to bind UDP port 9000: in use");
    }
}
