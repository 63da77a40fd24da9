//! cloudgame-webrtc - 云游戏 WebRTC 连接工厂
//!
//! 一次性构建进程级 WebRTC 配置 (编解码器, 端口策略, 拦截器链),
//! 然后按需创建 PeerConnection

pub mod config;
pub mod webrtc;
