//! 创建帖子的中间件管道
//!
//! 阶段在 [`create_topic_pipeline`] 中显式注册：
//! `content_guard`（最先）→ `summary` → `images` → `posts_options`（最后）。

use serde_json::{Map, Value};
use std::sync::Arc;

use crate::config::TopicConfig;
use crate::core::error::CoreError;
use crate::core::pipeline::{Pipeline, PipelineBuildError, Placement};
use crate::infrastructure::store::PostsOptionStore;

pub mod content_guard;
pub mod images;
pub mod posts_options;
pub mod summary;

pub use content_guard::ContentGuardStage;
pub use images::ImagesStage;
pub use posts_options::PostsOptionsStage;
pub use summary::SummaryStage;

/// 上下文键
pub mod keys {
    pub const POST_ID: &str = "post_id";
    pub const USER_ID: &str = "user_id";
    pub const TITLE: &str = "title";
    pub const CONTENT: &str = "content";
    pub const TAG_ID: &str = "tag_id";
    pub const DISABLE_COMMENT: &str = "disable_comment";
    pub const SUMMARY: &str = "summary";
    pub const IMAGES: &str = "images";
    pub const POSTS_OPTIONS: &str = "posts_options";
}

pub type TopicPipeline = Pipeline<TopicContext, CoreError>;

/// 单次请求的管道上下文
///
/// 阶段只能追加或覆盖键，不提供删除操作。
#[derive(Debug, Clone, PartialEq)]
pub struct TopicContext {
    post_id: i64,
    values: Map<String, Value>,
}

impl TopicContext {
    pub fn new(post_id: i64) -> Self {
        Self {
            post_id,
            values: Map::new(),
        }
    }

    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn post_id(&self) -> i64 {
        self.post_id
    }

    /// `post_id` 不可通过 insert 修改
    pub fn insert(&mut self, key: &str, value: impl Into<Value>) {
        if key != keys::POST_ID {
            self.values.insert(key.to_string(), value.into());
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        match key {
            keys::POST_ID => Some(self.post_id),
            _ => self.get(key).and_then(Value::as_i64),
        }
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(Value::as_bool)
    }

    pub fn contains(&self, key: &str) -> bool {
        key == keys::POST_ID || self.values.contains_key(key)
    }

    /// 输出为 JSON 对象，包含 `post_id`
    pub fn to_json(&self) -> Value {
        let mut object = self.values.clone();
        object.insert(keys::POST_ID.to_string(), Value::from(self.post_id));
        Value::Object(object)
    }
}

/// 注册创建帖子的全部阶段
pub fn create_topic_pipeline<S>(
    config: &TopicConfig,
    store: Arc<S>,
) -> Result<TopicPipeline, PipelineBuildError>
where
    S: PostsOptionStore + ?Sized + 'static,
{
    TopicPipeline::builder()
        .register(
            ContentGuardStage::new(&config.forbidden_words),
            Placement::first(),
        )
        .register(SummaryStage::new(config.summary_length), Placement::normal())
        .register(
            ImagesStage::new(config.max_images),
            Placement::normal().after(SummaryStage::NAME),
        )
        .register(PostsOptionsStage::new(store), Placement::last())
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::store::MemoryStore;
    use serde_json::json;

    #[test]
    fn test_context_keeps_post_id() {
        let mut ctx = TopicContext::new(42).with(keys::TITLE, "hello");
        ctx.insert(keys::POST_ID, 7);

        assert_eq!(ctx.post_id(), 42);
        assert_eq!(ctx.get_i64(keys::POST_ID), Some(42));
        assert_eq!(ctx.to_json(), json!({"post_id": 42, "title": "hello"}));
    }

    #[test]
    fn test_pipeline_order() {
        let store = Arc::new(MemoryStore::new());
        let pipeline = create_topic_pipeline(&TopicConfig::default(), store).unwrap();

        assert_eq!(
            pipeline.stage_names(),
            vec!["content_guard", "summary", "images", "posts_options"]
        );
    }
}
