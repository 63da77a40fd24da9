//! webrtc-rs 日志级别适配
//!
//! webrtc-rs 通过 `log` 门面输出日志。tracing-subscriber 初始化时安装的
//! `LogTracer` 负责把这些记录转入 tracing, 这里只设置 `log` 门面的级别,
//! 不占用全局 logger。

use crate::config::LogLevel;
use log::{Level, LevelFilter};

/// 按配置级别过滤 webrtc-rs 的 `log` 记录
#[derive(Debug, Clone, Copy)]
pub struct WebrtcLogBridge {
    filter: LevelFilter,
}

impl WebrtcLogBridge {
    pub fn new(level: LogLevel) -> Self {
        Self {
            filter: level.to_level_filter(),
        }
    }

    pub fn filter(&self) -> LevelFilter {
        self.filter
    }

    pub fn allows(&self, level: Level) -> bool {
        level <= self.filter
    }

    /// 应用级别过滤, 返回之前的级别
    pub fn install(self) -> LevelFilter {
        let previous = log::max_level();
        log::set_max_level(self.filter);
        tracing::debug!("webrtc 日志级别: {} (之前: {})", self.filter, previous);
        previous
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use log::{Log, Metadata, Record};

    struct NoopLogger;

    impl Log for NoopLogger {
        fn enabled(&self, _metadata: &Metadata) -> bool {
            false
        }

        fn log(&self, _record: &Record) {}

        fn flush(&self) {}
    }

    static NOOP: NoopLogger = NoopLogger;

    #[test]
    fn test_level_filtering() {
        let bridge = WebrtcLogBridge::new(LogLevel::Warn);
        assert!(bridge.allows(Level::Error));
        assert!(bridge.allows(Level::Warn));
        assert!(!bridge.allows(Level::Info));
    }

    #[test]
    fn test_off_disables_everything() {
        let bridge = WebrtcLogBridge::new(LogLevel::Off);
        assert!(!bridge.allows(Level::Error));
        assert_eq!(bridge.filter(), LevelFilter::Off);
    }

    #[test]
    fn test_install_leaves_logger_slot_free() {
        WebrtcLogBridge::new(LogLevel::Debug).install();
        WebrtcLogBridge::new(LogLevel::Error).install();

        // LogTracer 仍然可以在之后注册
        assert!(log::set_logger(&NOOP).is_ok());
    }
}
