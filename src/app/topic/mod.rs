//! 帖子：创建管道、查看、点赞与状态管理

pub mod handler;
pub mod middleware;
pub mod model;
pub mod service;

pub use service::TopicService;
