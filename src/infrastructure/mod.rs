//! 基础设施层：存储、数据库与日志

#[cfg(feature = "database")]
pub mod database;
pub mod logger;
pub mod store;
