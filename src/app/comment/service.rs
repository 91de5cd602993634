//! 评论业务服务

use std::sync::Arc;
use tracing::info;
use validator::Validate;

use super::model::{Comment, CreateCommentRequest, NewComment};
use crate::app::topic::model::TopicStatus;
use crate::core::error::CoreError;
use crate::infrastructure::store::{CommentStore, ForumStore, PostsOptionStore, TopicStore};

#[derive(Clone)]
pub struct CommentService {
    store: Arc<dyn ForumStore>,
}

impl CommentService {
    pub fn new(store: Arc<dyn ForumStore>) -> Self {
        Self { store }
    }

    /// 发表评论；锁定的帖子和关闭评论的帖子拒绝评论
    pub async fn create_comment(
        &self,
        topic_id: i64,
        user_id: i64,
        request: CreateCommentRequest,
    ) -> Result<Comment, CoreError> {
        request.validate()?;
        if request.content.trim().is_empty() {
            return Err(CoreError::BadRequest("评论内容不能为空".to_string()));
        }

        let topic = self
            .store
            .find_topic(topic_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("帖子 {} 不存在", topic_id)))?;
        if topic.status == TopicStatus::Lock {
            return Err(CoreError::Forbidden("帖子已锁定，无法评论".to_string()));
        }

        let options = self.store.find_by_post_id(topic.post_id).await?;
        if options.map_or(false, |o| o.disable_comment) {
            return Err(CoreError::Forbidden("该帖子已关闭评论".to_string()));
        }

        let comment = self
            .store
            .create_comment(NewComment {
                topic_id,
                user_id,
                content: request.content,
            })
            .await?;
        info!("Created comment {} on topic {}", comment.id, topic_id);
        Ok(comment)
    }

    pub async fn list_comments(&self, topic_id: i64) -> Result<Vec<Comment>, CoreError> {
        if self.store.find_topic(topic_id).await?.is_none() {
            return Err(CoreError::NotFound(format!("帖子 {} 不存在", topic_id)));
        }
        Ok(self.store.list_comments(topic_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::topic::model::{NewTopic, OptionsPatch};
    use crate::infrastructure::store::{MemoryStore, PostStore};

    async fn seed(store: &MemoryStore) -> (i64, i64) {
        let post = store.create_post(1, "body").await.unwrap();
        let topic = store
            .create_topic(NewTopic {
                post_id: post.id,
                user_id: 1,
                title: "title".to_string(),
                tag_id: 1,
            })
            .await
            .unwrap();
        (topic.id, post.id)
    }

    fn comment(content: &str) -> CreateCommentRequest {
        CreateCommentRequest {
            content: content.to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_and_list() {
        let store = Arc::new(MemoryStore::new());
        let (topic_id, _) = seed(&store).await;
        let service = CommentService::new(store);

        service.create_comment(topic_id, 2, comment("first")).await.unwrap();
        service.create_comment(topic_id, 3, comment("second")).await.unwrap();

        let comments = service.list_comments(topic_id).await.unwrap();
        let contents: Vec<_> = comments.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(contents, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_locked_topic_rejects_comments() {
        let store = Arc::new(MemoryStore::new());
        let (topic_id, _) = seed(&store).await;
        store.set_status(topic_id, TopicStatus::Lock).await.unwrap();
        let service = CommentService::new(store);

        let err = service
            .create_comment(topic_id, 2, comment("hi"))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_disabled_comments_rejected() {
        let store = Arc::new(MemoryStore::new());
        let (topic_id, post_id) = seed(&store).await;
        let options = store.create_options(post_id).await.unwrap();
        let patch = OptionsPatch {
            disable_comment: Some(true),
            ..OptionsPatch::default()
        };
        store.update_options(options.id, &patch).await.unwrap();
        let service = CommentService::new(store);

        let err = service
            .create_comment(topic_id, 2, comment("hi"))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_missing_topic() {
        let service = CommentService::new(Arc::new(MemoryStore::new()));
        assert!(matches!(
            service.create_comment(5, 2, comment("hi")).await,
            Err(CoreError::NotFound(_))
        ));
        assert!(matches!(
            service.list_comments(5).await,
            Err(CoreError::NotFound(_))
        ));
    }
}
