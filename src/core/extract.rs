//! 请求提取器
//!
//! 包装 axum 的 `Json`、`Path`、`Query`，解析失败时返回统一的错误响应。

use axum::extract::{FromRequest, FromRequestParts};

use crate::core::error::CoreError;

/// JSON 请求体
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(CoreError))]
pub struct AppJson<T>(pub T);

/// 路径参数
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(CoreError))]
pub struct AppPath<T>(pub T);

/// 查询参数
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(CoreError))]
pub struct AppQuery<T>(pub T);
