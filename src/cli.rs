//! CLI argument definitions for cloudgame-webrtc

use clap::{Parser, Subcommand};

/// cloudgame-webrtc - 命令行参数
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// 配置文件路径
    #[arg(short, long, env = "CLOUDGAME_WEBRTC_CONFIG")]
    pub config: Option<String>,

    /// 日志级别 (0=warn, 1=info, 2=debug, 3=trace)
    #[arg(short, long)]
    pub verbose: Option<u8>,
}

/// 子命令
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// 构建连接工厂并试创建 PeerConnection
    Check {
        /// 创建的连接数量
        #[arg(short = 'n', long, default_value = "1")]
        connections: usize,
    },

    /// 打印生效的配置
    Config,
}
