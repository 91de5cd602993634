//! 内存存储

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap, HashSet};
use tokio::sync::RwLock;

use super::{
    CommentStore, PostStore, PostsOptionStore, StoreError, StoreResult, TopicStore,
};
use crate::app::comment::model::{Comment, NewComment};
use crate::app::topic::model::{
    LikeState, NewTopic, OptionsPatch, Post, PostsOption, Topic, TopicStatus,
};

#[derive(Default)]
struct Tables {
    next_id: i64,
    posts: BTreeMap<i64, Post>,
    topics: BTreeMap<i64, Topic>,
    options: BTreeMap<i64, PostsOption>,
    options_by_post: HashMap<i64, i64>,
    likes: HashSet<(i64, i64)>,
    comments: Vec<Comment>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn topic_mut(&mut self, id: i64) -> StoreResult<&mut Topic> {
        self.topics
            .get_mut(&id)
            .ok_or(StoreError::NotFound { entity: "topic", id })
    }
}

/// 基于 `RwLock` 的内存存储
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 选项记录数量
    pub async fn options_count(&self) -> usize {
        self.tables.read().await.options.len()
    }
}

#[async_trait]
impl PostStore for MemoryStore {
    async fn create_post(&self, user_id: i64, content: &str) -> StoreResult<Post> {
        let mut tables = self.tables.write().await;
        let post = Post {
            id: tables.next_id(),
            user_id,
            content: content.to_string(),
            created_at: Utc::now(),
        };
        tables.posts.insert(post.id, post.clone());
        Ok(post)
    }

    async fn find_post(&self, id: i64) -> StoreResult<Option<Post>> {
        Ok(self.tables.read().await.posts.get(&id).cloned())
    }

    async fn delete_post(&self, id: i64) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        if let Some(options_id) = tables.options_by_post.remove(&id) {
            tables.options.remove(&options_id);
        }
        Ok(tables.posts.remove(&id).is_some())
    }
}

#[async_trait]
impl PostsOptionStore for MemoryStore {
    async fn find_by_post_id(&self, post_id: i64) -> StoreResult<Option<PostsOption>> {
        let tables = self.tables.read().await;
        Ok(tables
            .options_by_post
            .get(&post_id)
            .and_then(|id| tables.options.get(id))
            .cloned())
    }

    async fn create_options(&self, post_id: i64) -> StoreResult<PostsOption> {
        let mut tables = self.tables.write().await;
        if tables.options_by_post.contains_key(&post_id) {
            return Err(StoreError::Conflict(format!(
                "post {} 的选项已存在",
                post_id
            )));
        }

        let options = PostsOption {
            id: tables.next_id(),
            post_id,
            summary: None,
            images: Vec::new(),
            disable_comment: false,
            created_at: Utc::now(),
        };
        tables.options_by_post.insert(post_id, options.id);
        tables.options.insert(options.id, options.clone());
        Ok(options)
    }

    async fn update_options(&self, id: i64, patch: &OptionsPatch) -> StoreResult<PostsOption> {
        let mut tables = self.tables.write().await;
        let options = tables.options.get_mut(&id).ok_or(StoreError::NotFound {
            entity: "posts_option",
            id,
        })?;

        if let Some(summary) = &patch.summary {
            options.summary = Some(summary.clone());
        }
        if let Some(images) = &patch.images {
            options.images = images.clone();
        }
        if let Some(disable_comment) = patch.disable_comment {
            options.disable_comment = disable_comment;
        }
        Ok(options.clone())
    }
}

#[async_trait]
impl TopicStore for MemoryStore {
    async fn create_topic(&self, topic: NewTopic) -> StoreResult<Topic> {
        let mut tables = self.tables.write().await;
        if !tables.posts.contains_key(&topic.post_id) {
            return Err(StoreError::NotFound {
                entity: "post",
                id: topic.post_id,
            });
        }

        let now = Utc::now();
        let topic = Topic {
            id: tables.next_id(),
            post_id: topic.post_id,
            user_id: topic.user_id,
            title: topic.title,
            tag_id: topic.tag_id,
            status: TopicStatus::Publish,
            view: 0,
            like: 0,
            created_at: now,
            updated_at: now,
        };
        tables.topics.insert(topic.id, topic.clone());
        Ok(topic)
    }

    async fn find_topic(&self, id: i64) -> StoreResult<Option<Topic>> {
        Ok(self.tables.read().await.topics.get(&id).cloned())
    }

    async fn list_topics(&self, offset: u64, limit: u32) -> StoreResult<(Vec<Topic>, i64)> {
        let tables = self.tables.read().await;
        // id 单调递增，倒序即按创建时间倒序
        let page = tables
            .topics
            .values()
            .rev()
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect();
        Ok((page, tables.topics.len() as i64))
    }

    async fn increment_view(&self, id: i64) -> StoreResult<Topic> {
        let mut tables = self.tables.write().await;
        let topic = tables.topic_mut(id)?;
        topic.view += 1;
        Ok(topic.clone())
    }

    async fn set_status(&self, id: i64, status: TopicStatus) -> StoreResult<Topic> {
        let mut tables = self.tables.write().await;
        let topic = tables.topic_mut(id)?;
        topic.status = status;
        topic.updated_at = Utc::now();
        Ok(topic.clone())
    }

    async fn toggle_like(&self, topic_id: i64, user_id: i64) -> StoreResult<LikeState> {
        let mut tables = self.tables.write().await;
        tables.topic_mut(topic_id)?;

        let liked = if tables.likes.remove(&(topic_id, user_id)) {
            false
        } else {
            tables.likes.insert((topic_id, user_id));
            true
        };

        let topic = tables.topic_mut(topic_id)?;
        topic.like += if liked { 1 } else { -1 };
        Ok(LikeState {
            liked,
            likes: topic.like,
        })
    }
}

#[async_trait]
impl CommentStore for MemoryStore {
    async fn create_comment(&self, comment: NewComment) -> StoreResult<Comment> {
        let mut tables = self.tables.write().await;
        if !tables.topics.contains_key(&comment.topic_id) {
            return Err(StoreError::NotFound {
                entity: "topic",
                id: comment.topic_id,
            });
        }

        let comment = Comment {
            id: tables.next_id(),
            topic_id: comment.topic_id,
            user_id: comment.user_id,
            content: comment.content,
            created_at: Utc::now(),
        };
        tables.comments.push(comment.clone());
        Ok(comment)
    }

    async fn list_comments(&self, topic_id: i64) -> StoreResult<Vec<Comment>> {
        Ok(self
            .tables
            .read()
            .await
            .comments
            .iter()
            .filter(|c| c.topic_id == topic_id)
            .cloned()
            .collect())
    }
}
