//! 日志基础设施

use std::io;
use tracing_appender::{non_blocking, non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingConfig;

pub struct Logger;

impl Logger {
    /// 初始化全局日志：控制台输出加按日期分割的文件输出
    ///
    /// 返回的 guard 必须保持存活，否则文件日志会丢失尾部内容。
    pub fn init(config: &LoggingConfig) -> anyhow::Result<Option<WorkerGuard>> {
        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&config.level))?;

        let (file_layer, guard) = if config.file_output {
            std::fs::create_dir_all(&config.log_dir)?;
            let file_appender = rolling::daily(&config.log_dir, &config.file_prefix);
            let (writer, guard) = non_blocking(file_appender);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(false)
                .with_thread_names(true);
            (Some(layer), Some(guard))
        } else {
            (None, None)
        };

        let console_layer = config
            .console_output
            .then(|| fmt::layer().with_writer(io::stdout).with_ansi(true));

        tracing_subscriber::registry()
            .with(filter)
            .with(file_layer)
            .with(console_layer)
            .try_init()?;

        Ok(guard)
    }
}
