//! WebRTC 模块
//!
//! 进程级设置只构建一次, 连接工厂复用它按需创建 PeerConnection。

mod error;
pub mod interceptor;
pub mod log_bridge;
pub mod peer_connection;
pub mod port;
pub mod settings;
mod timestamp;

pub use error::{FactoryError, StartupError};
pub use interceptor::{InterceptorChain, InterceptorStage, ReTimeInterceptor};
pub use peer_connection::PeerConnectionFactory;
pub use port::{PortBinder, PortRoll, PortStrategy};
pub use settings::{global_settings, GlobalSettings};
pub use timestamp::SharedTimestamp;
