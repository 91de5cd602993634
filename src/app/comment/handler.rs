//! 评论处理器

use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
};

use super::model::{Comment, CreateCommentRequest};
use crate::app::AppState;
use crate::core::auth::CurrentUser;
use crate::core::error::CoreError;
use crate::core::extract::{AppJson, AppPath};
use crate::core::response::ApiResponse;

pub async fn list_comments(
    State(state): State<AppState>,
    AppPath(topic_id): AppPath<i64>,
) -> Result<Json<ApiResponse<Vec<Comment>>>, CoreError> {
    let comments = state.comment_service.list_comments(topic_id).await?;
    Ok(Json(ApiResponse::success(comments)))
}

pub async fn create_comment(
    State(state): State<AppState>,
    user: CurrentUser,
    AppPath(topic_id): AppPath<i64>,
    AppJson(payload): AppJson<CreateCommentRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Comment>>), CoreError> {
    let comment = state
        .comment_service
        .create_comment(topic_id, user.id, payload)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(comment))))
}
