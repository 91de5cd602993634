//! 帖子处理器

use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
};

use super::model::{
    CreateTopicRequest, LikeState, Topic, TopicDetail, TopicListItem, UpdateStatusRequest,
};
use crate::app::AppState;
use crate::core::auth::CurrentUser;
use crate::core::error::CoreError;
use crate::core::extract::{AppJson, AppPath, AppQuery};
use crate::core::response::{ApiResponse, PageQuery, PaginatedResponse};

pub async fn list_topics(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<PageQuery>,
) -> Result<Json<ApiResponse<PaginatedResponse<TopicListItem>>>, CoreError> {
    let page = state.topic_service.list_topics(query).await?;
    Ok(Json(ApiResponse::success(page)))
}

pub async fn create_topic(
    State(state): State<AppState>,
    user: CurrentUser,
    AppJson(payload): AppJson<CreateTopicRequest>,
) -> Result<(StatusCode, Json<ApiResponse<TopicDetail>>), CoreError> {
    let detail = state.topic_service.create_topic(user.id, payload).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(detail))))
}

pub async fn get_topic(
    State(state): State<AppState>,
    AppPath(id): AppPath<i64>,
) -> Result<Json<ApiResponse<TopicDetail>>, CoreError> {
    let detail = state.topic_service.get_topic(id).await?;
    Ok(Json(ApiResponse::success(detail)))
}

pub async fn update_status(
    State(state): State<AppState>,
    user: CurrentUser,
    AppPath(id): AppPath<i64>,
    AppJson(payload): AppJson<UpdateStatusRequest>,
) -> Result<Json<ApiResponse<Topic>>, CoreError> {
    let topic = state
        .topic_service
        .set_status(id, user.id, payload.status)
        .await?;
    Ok(Json(ApiResponse::success(topic)))
}

pub async fn toggle_like(
    State(state): State<AppState>,
    user: CurrentUser,
    AppPath(id): AppPath<i64>,
) -> Result<Json<ApiResponse<LikeState>>, CoreError> {
    let like = state.topic_service.toggle_like(id, user.id).await?;
    Ok(Json(ApiResponse::success(like)))
}
