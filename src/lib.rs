//! # SForum 论坛服务
//!
//! 分层结构：
//! - `app`：帖子、评论的处理器与业务服务，以及创建帖子的中间件管道
//! - `core`：错误处理、响应结构、HTTP 中间件和通用处理管道
//! - `infrastructure`：存储、数据库和日志
//! - `config`：TOML 配置

pub mod app;
pub mod config;
pub mod core;
pub mod infrastructure;

pub use app::{router, AppState};
pub use config::Config;
pub use core::error::CoreError;
