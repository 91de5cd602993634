//! 帖子业务服务

use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};
use validator::Validate;

use super::middleware::{keys, summary::truncate_chars, TopicContext, TopicPipeline};
use super::model::{
    CreateTopicRequest, LikeState, NewTopic, OptionsPatch, PostsOption, Topic, TopicDetail,
    TopicListItem, TopicStatus,
};
use crate::config::TopicConfig;
use crate::core::error::CoreError;
use crate::core::pipeline::Outcome;
use crate::core::response::{PageQuery, PaginatedResponse, PaginationInfo};
use crate::infrastructure::store::{ForumStore, PostStore, PostsOptionStore, TopicStore};

#[derive(Clone)]
pub struct TopicService {
    store: Arc<dyn ForumStore>,
    pipeline: Arc<TopicPipeline>,
    config: Arc<TopicConfig>,
}

impl TopicService {
    pub fn new(
        store: Arc<dyn ForumStore>,
        pipeline: Arc<TopicPipeline>,
        config: Arc<TopicConfig>,
    ) -> Self {
        Self {
            store,
            pipeline,
            config,
        }
    }

    /// 创建帖子：写入正文，执行中间件管道，再持久化帖子和选项
    pub async fn create_topic(
        &self,
        user_id: i64,
        request: CreateTopicRequest,
    ) -> Result<TopicDetail, CoreError> {
        request.validate()?;
        if request.content.trim().is_empty() {
            return Err(CoreError::BadRequest("内容不能为空".to_string()));
        }
        let title = request.title.trim().to_string();
        if title.is_empty() {
            return Err(CoreError::BadRequest("标题不能为空".to_string()));
        }

        let post = self.store.create_post(user_id, &request.content).await?;

        let mut ctx = TopicContext::new(post.id)
            .with(keys::USER_ID, user_id)
            .with(keys::TITLE, title)
            .with(keys::CONTENT, request.content)
            .with(keys::TAG_ID, request.tag_id)
            .with(keys::DISABLE_COMMENT, request.options.disable_comment);
        if let Some(summary) = request.options.summary {
            ctx.insert(keys::SUMMARY, summary);
        }

        let ctx = match self.pipeline.run(ctx).await? {
            Outcome::Completed(ctx) => ctx,
            Outcome::Halted(halt) => {
                if let Err(e) = self.store.delete_post(post.id).await {
                    warn!("Failed to discard post {} after rejection: {}", post.id, e);
                }
                return Err(CoreError::Rejected(halt));
            }
        };

        let detail = self.persist(ctx, post.content).await?;
        info!(
            "Created topic {} (post {}) by user {}",
            detail.topic.id, detail.topic.post_id, user_id
        );
        Ok(detail)
    }

    /// 管道的终点：把上下文中收集的属性写入选项并创建帖子
    async fn persist(&self, ctx: TopicContext, content: String) -> Result<TopicDetail, CoreError> {
        let options_id = ctx.get_i64(keys::POSTS_OPTIONS).ok_or_else(|| {
            CoreError::InternalServerError("管道没有生成帖子选项".to_string())
        })?;

        let patch = OptionsPatch {
            summary: ctx.get_str(keys::SUMMARY).map(str::to_string),
            images: ctx.get(keys::IMAGES).and_then(Value::as_array).map(|images| {
                images
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            }),
            disable_comment: ctx.get_bool(keys::DISABLE_COMMENT),
        };
        let options = self.store.update_options(options_id, &patch).await?;

        let new_topic = NewTopic {
            post_id: ctx.post_id(),
            user_id: ctx.get_i64(keys::USER_ID).unwrap_or_default(),
            title: ctx.get_str(keys::TITLE).unwrap_or_default().to_string(),
            tag_id: ctx.get_i64(keys::TAG_ID).unwrap_or_default(),
        };
        let topic = self.store.create_topic(new_topic).await?;

        Ok(TopicDetail {
            topic,
            content,
            options: Some(options),
        })
    }

    /// 查看帖子，浏览数加一
    pub async fn get_topic(&self, id: i64) -> Result<TopicDetail, CoreError> {
        let topic = self.store.increment_view(id).await?;
        let post = self
            .store
            .find_post(topic.post_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("帖子 {} 的正文不存在", id)))?;
        let options = self.store.find_by_post_id(topic.post_id).await?;

        Ok(TopicDetail {
            topic,
            content: post.content,
            options,
        })
    }

    pub async fn list_topics(
        &self,
        query: PageQuery,
    ) -> Result<PaginatedResponse<TopicListItem>, CoreError> {
        let (page, limit) = query.normalize();
        let (topics, total) = self.store.list_topics(query.offset(), limit).await?;

        let mut items = Vec::with_capacity(topics.len());
        for topic in topics {
            let options = self.store.find_by_post_id(topic.post_id).await?;
            items.push(self.list_item(topic, options.as_ref()));
        }

        Ok(PaginatedResponse {
            data: items,
            pagination: PaginationInfo::new(page, limit, total),
        })
    }

    fn list_item(&self, topic: Topic, options: Option<&PostsOption>) -> TopicListItem {
        let summary = options
            .and_then(|o| o.summary.as_deref())
            .filter(|s| !s.trim().is_empty())
            .map(|s| truncate_chars(s, self.config.list_summary_length))
            .unwrap_or_else(|| self.config.summary_placeholder.clone());
        let images = options
            .map(|o| {
                o.images
                    .iter()
                    .take(self.config.list_images)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        TopicListItem {
            id: topic.id,
            user_id: topic.user_id,
            title: topic.title,
            tag_id: topic.tag_id,
            status: topic.status,
            view: topic.view,
            like: topic.like,
            summary,
            images,
            created_at: topic.created_at,
        }
    }

    /// 修改帖子状态，仅作者可操作
    pub async fn set_status(
        &self,
        id: i64,
        user_id: i64,
        status: TopicStatus,
    ) -> Result<Topic, CoreError> {
        let topic = self
            .store
            .find_topic(id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("帖子 {} 不存在", id)))?;
        if topic.user_id != user_id {
            return Err(CoreError::Forbidden("只有作者可以修改帖子状态".to_string()));
        }

        let topic = self.store.set_status(id, status).await?;
        info!("Topic {} status set to {}", id, status.as_str());
        Ok(topic)
    }

    pub async fn toggle_like(&self, id: i64, user_id: i64) -> Result<LikeState, CoreError> {
        Ok(self.store.toggle_like(id, user_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::topic::middleware::create_topic_pipeline;
    use crate::app::topic::model::CreateTopicOptions;
    use crate::infrastructure::store::MemoryStore;

    fn service_with(config: TopicConfig) -> (TopicService, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let pipeline = create_topic_pipeline(&config, store.clone()).unwrap();
        let service = TopicService::new(store.clone(), Arc::new(pipeline), Arc::new(config));
        (service, store)
    }

    fn request(title: &str, content: &str) -> CreateTopicRequest {
        CreateTopicRequest {
            title: title.to_string(),
            content: content.to_string(),
            tag_id: 1,
            options: CreateTopicOptions::default(),
        }
    }

    #[tokio::test]
    async fn test_create_topic_fills_options() {
        let (service, store) = service_with(TopicConfig::default());

        let detail = service
            .create_topic(3, request("标题", "正文 ![a](a.png) 结束"))
            .await
            .unwrap();

        assert_eq!(detail.topic.user_id, 3);
        assert_eq!(detail.topic.title, "标题");
        let options = detail.options.unwrap();
        assert_eq!(options.post_id, detail.topic.post_id);
        assert_eq!(options.summary.as_deref(), Some("正文 结束"));
        assert_eq!(options.images, vec!["a.png".to_string()]);
        assert_eq!(store.options_count().await, 1);
    }

    #[tokio::test]
    async fn test_rejected_topic_discards_post() {
        let config = TopicConfig {
            forbidden_words: vec!["spam".to_string()],
            ..TopicConfig::default()
        };
        let (service, store) = service_with(config);

        let err = service
            .create_topic(3, request("hello", "SPAM here"))
            .await
            .unwrap_err();

        assert!(matches!(err, CoreError::Rejected(ref halt) if halt.stage == "content_guard"));
        assert_eq!(store.options_count().await, 0);
        // 第一次分配的 id 是被丢弃的 post
        assert_eq!(store.find_post(1).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_invalid_request() {
        let (service, _) = service_with(TopicConfig::default());

        let err = service.create_topic(3, request("", "body")).await.unwrap_err();
        assert!(matches!(err, CoreError::BadRequest(_)));

        let err = service.create_topic(3, request("title", "   ")).await.unwrap_err();
        assert!(matches!(err, CoreError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_list_uses_placeholder_and_image_limit() {
        let config = TopicConfig {
            list_images: 2,
            ..TopicConfig::default()
        };
        let (service, _) = service_with(config.clone());

        service
            .create_topic(1, request("images", "![](1.png)![](2.png)![](3.png)"))
            .await
            .unwrap();

        let page = service.list_topics(PageQuery::default()).await.unwrap();
        assert_eq!(page.pagination.total, 1);
        let item = &page.data[0];
        assert_eq!(item.summary, config.summary_placeholder);
        assert_eq!(item.images, vec!["1.png", "2.png"]);
    }

    #[tokio::test]
    async fn test_get_topic_counts_views() {
        let (service, _) = service_with(TopicConfig::default());
        let created = service.create_topic(1, request("t", "body")).await.unwrap();

        service.get_topic(created.topic.id).await.unwrap();
        let detail = service.get_topic(created.topic.id).await.unwrap();
        assert_eq!(detail.topic.view, 2);
        assert_eq!(detail.content, "body");

        assert!(matches!(
            service.get_topic(999).await,
            Err(CoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_only_author_changes_status() {
        let (service, _) = service_with(TopicConfig::default());
        let created = service.create_topic(1, request("t", "body")).await.unwrap();

        let err = service
            .set_status(created.topic.id, 2, TopicStatus::Lock)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Forbidden(_)));

        let topic = service
            .set_status(created.topic.id, 1, TopicStatus::Lock)
            .await
            .unwrap();
        assert_eq!(topic.status, TopicStatus::Lock);
    }

    #[tokio::test]
    async fn test_list_truncates_long_summary() {
        let config = TopicConfig {
            list_summary_length: 5,
            ..TopicConfig::default()
        };
        let (service, _) = service_with(config);

        let mut long = request("长摘要", "body");
        long.options.summary = Some("一二三四五六七八".to_string());
        let created = service.create_topic(1, long).await.unwrap();
        assert_eq!(
            created.options.unwrap().summary.as_deref(),
            Some("一二三四五六七八")
        );

        let page = service.list_topics(PageQuery::default()).await.unwrap();
        assert_eq!(page.data[0].summary, "一二三四五");
    }
}
