//! 帖子数据模型

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// 帖子正文
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub user_id: i64,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TopicStatus {
    Publish,
    Lock,
}

impl TopicStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TopicStatus::Publish => "publish",
            TopicStatus::Lock => "lock",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "publish" => Some(TopicStatus::Publish),
            "lock" => Some(TopicStatus::Lock),
            _ => None,
        }
    }
}

/// 帖子
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topic {
    pub id: i64,
    pub post_id: i64,
    pub user_id: i64,
    pub title: String,
    pub tag_id: i64,
    pub status: TopicStatus,
    pub view: i64,
    pub like: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 新建帖子记录
#[derive(Debug, Clone, PartialEq)]
pub struct NewTopic {
    pub post_id: i64,
    pub user_id: i64,
    pub title: String,
    pub tag_id: i64,
}

/// 帖子附加选项，每个 post 至多一条
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostsOption {
    pub id: i64,
    pub post_id: i64,
    pub summary: Option<String>,
    pub images: Vec<String>,
    pub disable_comment: bool,
    pub created_at: DateTime<Utc>,
}

/// 选项属性更新
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OptionsPatch {
    pub summary: Option<String>,
    pub images: Option<Vec<String>>,
    pub disable_comment: Option<bool>,
}

/// 点赞状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikeState {
    pub liked: bool,
    pub likes: i64,
}

/// 创建帖子请求
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateTopicRequest {
    #[validate(length(min = 1, max = 200, message = "标题长度必须在 1 到 200 个字符之间"))]
    pub title: String,

    #[validate(length(min = 1, message = "内容不能为空"))]
    pub content: String,

    #[validate(range(min = 1, message = "标签无效"))]
    pub tag_id: i64,

    #[serde(default)]
    pub options: CreateTopicOptions,
}

/// 创建帖子时调用方可指定的选项
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateTopicOptions {
    pub summary: Option<String>,
    #[serde(default)]
    pub disable_comment: bool,
}

/// 修改帖子状态请求
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: TopicStatus,
}

/// 帖子详情
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicDetail {
    pub topic: Topic,
    pub content: String,
    pub options: Option<PostsOption>,
}

/// 帖子列表项
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicListItem {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub tag_id: i64,
    pub status: TopicStatus,
    pub view: i64,
    pub like: i64,
    pub summary: String,
    pub images: Vec<String>,
    pub created_at: DateTime<Utc>,
}
