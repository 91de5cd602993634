//! 当前用户提取
//!
//! 会话认证不在本服务范围内，前置网关通过 `X-User-Id` 头传递已认证的用户 ID。

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use crate::core::error::CoreError;

pub const USER_ID_HEADER: &str = "x-user-id";

/// 已认证用户
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: i64,
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = CoreError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|h| h.to_str().ok())
            .and_then(|s| s.trim().parse::<i64>().ok())
            .filter(|id| *id > 0)
            .ok_or(CoreError::Unauthorized)?;

        Ok(Self { id })
    }
}
