//! 核心错误处理模块

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::error;

use crate::core::pipeline::Halt;
use crate::infrastructure::store::StoreError;

/// 核心错误类型
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("请求无效: {0}")]
    BadRequest(String),
    #[error("未认证")]
    Unauthorized,
    #[error("权限不足: {0}")]
    Forbidden(String),
    #[error("资源不存在: {0}")]
    NotFound(String),
    #[error("资源冲突: {0}")]
    Conflict(String),
    #[error("阶段 {} 拒绝了请求: {}", .0.stage, .0.reason)]
    Rejected(Halt),
    #[error(transparent)]
    Store(StoreError),
    #[error("服务器内部错误: {0}")]
    InternalServerError(String),
}

/// 错误响应结构
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub code: u16,
    pub timestamp: String,
}

impl From<StoreError> for CoreError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity, id } => {
                CoreError::NotFound(format!("{} {} 不存在", entity, id))
            }
            StoreError::Conflict(msg) => CoreError::Conflict(msg),
            #[cfg(feature = "database")]
            other => CoreError::Store(other),
        }
    }
}

impl From<validator::ValidationErrors> for CoreError {
    fn from(err: validator::ValidationErrors) -> Self {
        let mut messages: Vec<String> = err
            .field_errors()
            .into_iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |error| {
                    error
                        .message
                        .as_ref()
                        .map(|msg| msg.to_string())
                        .unwrap_or_else(|| format!("{} 校验失败", field))
                })
            })
            .collect();
        messages.sort();

        CoreError::BadRequest(messages.join(", "))
    }
}

impl From<JsonRejection> for CoreError {
    fn from(rejection: JsonRejection) -> Self {
        CoreError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for CoreError {
    fn from(rejection: PathRejection) -> Self {
        CoreError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for CoreError {
    fn from(rejection: QueryRejection) -> Self {
        CoreError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for CoreError {
    fn into_response(self) -> Response {
        let (status, error_message, user_message) = match self {
            CoreError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            CoreError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                "认证失败，请提供有效的认证信息".to_string(),
            ),
            CoreError::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg),
            CoreError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            CoreError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg),
            CoreError::Rejected(halt) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "REJECTED",
                halt.reason,
            ),
            CoreError::Store(e) => {
                error!("Store error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_SERVER_ERROR",
                    "存储错误".to_string(),
                )
            }
            CoreError::InternalServerError(msg) => {
                error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_SERVER_ERROR",
                    msg,
                )
            }
        };

        let error_response = ErrorResponse {
            error: error_message.to_string(),
            message: user_message,
            code: status.as_u16(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        (status, axum::Json(error_response)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_errors_map_to_http_variants() {
        let err: CoreError = StoreError::NotFound {
            entity: "topic",
            id: 7,
        }
        .into();
        assert!(matches!(err, CoreError::NotFound(_)));

        let err: CoreError = StoreError::Conflict("duplicate".to_string()).into();
        assert!(matches!(err, CoreError::Conflict(_)));
    }

    #[test]
    fn test_status_codes() {
        let cases = [
            (CoreError::BadRequest("x".into()), StatusCode::BAD_REQUEST),
            (CoreError::Unauthorized, StatusCode::UNAUTHORIZED),
            (CoreError::Forbidden("x".into()), StatusCode::FORBIDDEN),
            (CoreError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (CoreError::Conflict("x".into()), StatusCode::CONFLICT),
            (
                CoreError::Rejected(Halt::new("content_guard", "x")),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }
}
