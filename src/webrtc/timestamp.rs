//! 共享 RTP 时间戳
//!
//! 由调用方 (媒体时钟) 持有并推进, 重定时拦截器在每个出站 RTP 包上读取。
//! 多个连接的拦截器会并发读取, 调用方可在任意线程写入, 因此内部使用原子变量。

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// 共享 32 位时间戳句柄, clone 后指向同一个计数器
#[derive(Debug, Clone, Default)]
pub struct SharedTimestamp {
    value: Arc<AtomicU32>,
}

impl SharedTimestamp {
    pub fn new(initial: u32) -> Self {
        Self {
            value: Arc::new(AtomicU32::new(initial)),
        }
    }

    /// 读取当前时间戳
    pub fn load(&self) -> u32 {
        self.value.load(Ordering::Acquire)
    }

    /// 设置时间戳
    pub fn store(&self, timestamp: u32) {
        self.value.store(timestamp, Ordering::Release);
    }

    /// 推进时间戳 (回绕), 返回推进后的值
    pub fn advance(&self, delta: u32) -> u32 {
        self.value
            .fetch_add(delta, Ordering::AcqRel)
            .wrapping_add(delta)
    }
}
