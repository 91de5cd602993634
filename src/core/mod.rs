//! 核心层：错误处理、响应结构、中间件与处理管道

pub mod auth;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod pipeline;
pub mod response;
