//! 存储层
//!
//! 服务只依赖这里的 trait；内存实现用于测试和无数据库运行，
//! Postgres 实现在 `database` feature 下可用。

use async_trait::async_trait;

use crate::app::comment::model::{Comment, NewComment};
use crate::app::topic::model::{
    LikeState, NewTopic, OptionsPatch, Post, PostsOption, Topic, TopicStatus,
};

pub mod memory;
#[cfg(feature = "database")]
pub mod postgres;

pub use memory::MemoryStore;
#[cfg(feature = "database")]
pub use postgres::PgStore;

/// 存储错误类型
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{entity} {id} 不存在")]
    NotFound { entity: &'static str, id: i64 },
    #[error("数据冲突: {0}")]
    Conflict(String),
    #[cfg(feature = "database")]
    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait PostStore: Send + Sync {
    async fn create_post(&self, user_id: i64, content: &str) -> StoreResult<Post>;

    async fn find_post(&self, id: i64) -> StoreResult<Option<Post>>;

    /// 删除帖子正文，返回是否存在
    async fn delete_post(&self, id: i64) -> StoreResult<bool>;
}

#[async_trait]
pub trait PostsOptionStore: Send + Sync {
    async fn find_by_post_id(&self, post_id: i64) -> StoreResult<Option<PostsOption>>;

    /// 为 post 创建空白选项；同一 post 已存在时返回 `StoreError::Conflict`
    async fn create_options(&self, post_id: i64) -> StoreResult<PostsOption>;

    async fn update_options(&self, id: i64, patch: &OptionsPatch) -> StoreResult<PostsOption>;
}

#[async_trait]
pub trait TopicStore: Send + Sync {
    async fn create_topic(&self, topic: NewTopic) -> StoreResult<Topic>;

    async fn find_topic(&self, id: i64) -> StoreResult<Option<Topic>>;

    /// 按创建时间倒序分页，返回当前页和总数
    async fn list_topics(&self, offset: u64, limit: u32) -> StoreResult<(Vec<Topic>, i64)>;

    async fn increment_view(&self, id: i64) -> StoreResult<Topic>;

    async fn set_status(&self, id: i64, status: TopicStatus) -> StoreResult<Topic>;

    /// 切换用户对帖子的点赞
    async fn toggle_like(&self, topic_id: i64, user_id: i64) -> StoreResult<LikeState>;
}

#[async_trait]
pub trait CommentStore: Send + Sync {
    async fn create_comment(&self, comment: NewComment) -> StoreResult<Comment>;

    async fn list_comments(&self, topic_id: i64) -> StoreResult<Vec<Comment>>;
}

/// 论坛完整存储
pub trait ForumStore: PostStore + PostsOptionStore + TopicStore + CommentStore {}

impl<T> ForumStore for T where T: PostStore + PostsOptionStore + TopicStore + CommentStore {}
