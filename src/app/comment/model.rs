//! 评论数据模型

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub topic_id: i64,
    pub user_id: i64,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewComment {
    pub topic_id: i64,
    pub user_id: i64,
    pub content: String,
}

/// 创建评论请求
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateCommentRequest {
    #[validate(length(min = 1, max = 10000, message = "评论长度必须在 1 到 10000 个字符之间"))]
    pub content: String,
}
