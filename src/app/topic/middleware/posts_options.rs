//! 帖子选项阶段：为 post 查找或创建选项记录

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use super::{keys, TopicContext};
use crate::core::error::CoreError;
use crate::core::pipeline::{Next, Outcome, Stage};
use crate::infrastructure::store::PostsOptionStore;

pub struct PostsOptionsStage<S: ?Sized> {
    store: Arc<S>,
}

impl<S: ?Sized> PostsOptionsStage<S> {
    pub const NAME: &'static str = "posts_options";

    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl<S> Stage<TopicContext, CoreError> for PostsOptionsStage<S>
where
    S: PostsOptionStore + ?Sized + 'static,
{
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn handle(
        &self,
        mut ctx: TopicContext,
        next: Next<'_, TopicContext, CoreError>,
    ) -> Result<Outcome<TopicContext>, CoreError> {
        let post_id = ctx.post_id();

        // 查找与创建之间没有加锁，并发的重复请求可能撞上唯一约束
        let options_id = match self.store.find_by_post_id(post_id).await? {
            Some(options) => options.id,
            None => {
                let options = self.store.create_options(post_id).await?;
                debug!("Created posts options {} for post {}", options.id, post_id);
                options.id
            }
        };

        ctx.insert(keys::POSTS_OPTIONS, options_id);
        next.run(ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::pipeline::{Pipeline, Placement};
    use crate::app::topic::model::{OptionsPatch, PostsOption};
    use crate::infrastructure::store::{MemoryStore, StoreResult};
    use axum::{http::StatusCode, response::IntoResponse};
    use serde_json::json;

    fn pipeline(store: Arc<MemoryStore>) -> Pipeline<TopicContext, CoreError> {
        Pipeline::builder()
            .register(PostsOptionsStage::new(store), Placement::last())
            .build()
            .unwrap()
    }

    fn completed(outcome: Outcome<TopicContext>) -> TopicContext {
        match outcome {
            Outcome::Completed(ctx) => ctx,
            Outcome::Halted(halt) => panic!("unexpected halt: {:?}", halt),
        }
    }

    #[tokio::test]
    async fn test_creates_record_when_absent() {
        let store = Arc::new(MemoryStore::new());
        let pipeline = pipeline(store.clone());

        let ctx = completed(pipeline.run(TopicContext::new(42)).await.unwrap());

        let options = store.find_by_post_id(42).await.unwrap().unwrap();
        assert_eq!(store.options_count().await, 1);
        assert_eq!(options.post_id, 42);
        assert_eq!(
            ctx.to_json(),
            json!({"post_id": 42, "posts_options": options.id})
        );
    }

    #[tokio::test]
    async fn test_reuses_existing_record() {
        let store = Arc::new(MemoryStore::new());
        let existing = store.create_options(7).await.unwrap();
        let pipeline = pipeline(store.clone());

        let ctx = completed(pipeline.run(TopicContext::new(7)).await.unwrap());

        assert_eq!(ctx.get_i64(keys::POSTS_OPTIONS), Some(existing.id));
        assert_eq!(store.options_count().await, 1);
    }

    #[tokio::test]
    async fn test_sequential_runs_are_idempotent() {
        let store = Arc::new(MemoryStore::new());
        let pipeline = pipeline(store.clone());

        let first = completed(pipeline.run(TopicContext::new(5)).await.unwrap());
        let second = completed(pipeline.run(TopicContext::new(5)).await.unwrap());

        assert_eq!(
            first.get_i64(keys::POSTS_OPTIONS),
            second.get_i64(keys::POSTS_OPTIONS)
        );
        assert_eq!(store.options_count().await, 1);
    }

    #[tokio::test]
    async fn test_keeps_caller_fields() {
        let store = Arc::new(MemoryStore::new());
        let pipeline = pipeline(store);

        let ctx = TopicContext::new(3).with(keys::TITLE, "hello");
        let ctx = completed(pipeline.run(ctx).await.unwrap());

        assert_eq!(ctx.get_str(keys::TITLE), Some("hello"));
        assert!(ctx.contains(keys::POSTS_OPTIONS));
    }

    /// 查找总是落空，模拟另一个请求在查找之后抢先创建了记录
    struct StaleLookup(MemoryStore);

    #[async_trait]
    impl PostsOptionStore for StaleLookup {
        async fn find_by_post_id(&self, _post_id: i64) -> StoreResult<Option<PostsOption>> {
            Ok(None)
        }

        async fn create_options(&self, post_id: i64) -> StoreResult<PostsOption> {
            self.0.create_options(post_id).await
        }

        async fn update_options(&self, id: i64, patch: &OptionsPatch) -> StoreResult<PostsOption> {
            self.0.update_options(id, patch).await
        }
    }

    #[tokio::test]
    async fn test_lost_race_is_a_conflict() {
        let store = Arc::new(StaleLookup(MemoryStore::new()));
        let pipeline: Pipeline<TopicContext, CoreError> = Pipeline::builder()
            .register(PostsOptionsStage::new(store.clone()), Placement::last())
            .build()
            .unwrap();

        completed(pipeline.run(TopicContext::new(11)).await.unwrap());
        let err = pipeline.run(TopicContext::new(11)).await.unwrap_err();

        assert!(matches!(err, CoreError::Conflict(_)));
        assert_eq!(err.into_response().status(), StatusCode::CONFLICT);
        assert_eq!(store.0.options_count().await, 1);
    }
}
