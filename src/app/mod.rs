//! 应用层：帖子与评论

use axum::{
    middleware,
    routing::{get, post, put},
    Json, Router,
};
use std::{sync::Arc, time::Duration};
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::Config;
use crate::core::middleware::request_logging_middleware;
use crate::core::pipeline::PipelineBuildError;
use crate::infrastructure::store::ForumStore;

pub mod comment;
pub mod topic;

use comment::CommentService;
use topic::{middleware::create_topic_pipeline, TopicService};

#[derive(Clone)]
pub struct AppState {
    pub topic_service: TopicService,
    pub comment_service: CommentService,
}

impl AppState {
    /// 组装服务；管道顺序在这里校验
    pub fn new(store: Arc<dyn ForumStore>, config: &Config) -> Result<Self, PipelineBuildError> {
        let pipeline = create_topic_pipeline(&config.topic, store.clone())?;

        Ok(Self {
            topic_service: TopicService::new(
                store.clone(),
                Arc::new(pipeline),
                Arc::new(config.topic.clone()),
            ),
            comment_service: CommentService::new(store),
        })
    }
}

/// 创建路由
pub fn router(state: AppState, config: &Config) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route(
            "/topics",
            get(topic::handler::list_topics).post(topic::handler::create_topic),
        )
        .route("/topics/:id", get(topic::handler::get_topic))
        .route("/topics/:id/status", put(topic::handler::update_status))
        .route("/topics/:id/likes", post(topic::handler::toggle_like))
        .route(
            "/topics/:id/comments",
            get(comment::handler::list_comments).post(comment::handler::create_comment),
        )
        .layer(middleware::from_fn(request_logging_middleware))
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.timeout_seconds,
        )))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}
