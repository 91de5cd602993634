//! Postgres 存储

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPool, FromRow};

use super::{
    CommentStore, PostStore, PostsOptionStore, StoreError, StoreResult, TopicStore,
};
use crate::app::comment::model::{Comment, NewComment};
use crate::app::topic::model::{
    LikeState, NewTopic, OptionsPatch, Post, PostsOption, Topic, TopicStatus,
};

const UNIQUE_VIOLATION: &str = "23505";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct PostRow {
    id: i64,
    user_id: i64,
    content: String,
    created_at: DateTime<Utc>,
}

impl From<PostRow> for Post {
    fn from(row: PostRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            content: row.content,
            created_at: row.created_at,
        }
    }
}

#[derive(FromRow)]
struct TopicRow {
    id: i64,
    post_id: i64,
    user_id: i64,
    title: String,
    tag_id: i64,
    status: String,
    view: i64,
    like: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<TopicRow> for Topic {
    fn from(row: TopicRow) -> Self {
        Self {
            id: row.id,
            post_id: row.post_id,
            user_id: row.user_id,
            title: row.title,
            tag_id: row.tag_id,
            status: TopicStatus::parse(&row.status).unwrap_or(TopicStatus::Publish),
            view: row.view,
            like: row.like,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(FromRow)]
struct OptionsRow {
    id: i64,
    post_id: i64,
    summary: Option<String>,
    images: Vec<String>,
    disable_comment: bool,
    created_at: DateTime<Utc>,
}

impl From<OptionsRow> for PostsOption {
    fn from(row: OptionsRow) -> Self {
        Self {
            id: row.id,
            post_id: row.post_id,
            summary: row.summary,
            images: row.images,
            disable_comment: row.disable_comment,
            created_at: row.created_at,
        }
    }
}

#[derive(FromRow)]
struct CommentRow {
    id: i64,
    topic_id: i64,
    user_id: i64,
    content: String,
    created_at: DateTime<Utc>,
}

impl From<CommentRow> for Comment {
    fn from(row: CommentRow) -> Self {
        Self {
            id: row.id,
            topic_id: row.topic_id,
            user_id: row.user_id,
            content: row.content,
            created_at: row.created_at,
        }
    }
}

const TOPIC_COLUMNS: &str =
    r#"id, post_id, user_id, title, tag_id, status, view, "like", created_at, updated_at"#;

#[async_trait]
impl PostStore for PgStore {
    async fn create_post(&self, user_id: i64, content: &str) -> StoreResult<Post> {
        let row = sqlx::query_as::<_, PostRow>(
            "INSERT INTO posts (user_id, content) VALUES ($1, $2) RETURNING *",
        )
        .bind(user_id)
        .bind(content)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn find_post(&self, id: i64) -> StoreResult<Option<Post>> {
        let row = sqlx::query_as::<_, PostRow>("SELECT * FROM posts WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Into::into))
    }

    async fn delete_post(&self, id: i64) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl PostsOptionStore for PgStore {
    async fn find_by_post_id(&self, post_id: i64) -> StoreResult<Option<PostsOption>> {
        let row = sqlx::query_as::<_, OptionsRow>("SELECT * FROM posts_options WHERE post_id = $1")
            .bind(post_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Into::into))
    }

    async fn create_options(&self, post_id: i64) -> StoreResult<PostsOption> {
        let result = sqlx::query_as::<_, OptionsRow>(
            "INSERT INTO posts_options (post_id) VALUES ($1) RETURNING *",
        )
        .bind(post_id)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(row) => Ok(row.into()),
            Err(sqlx::Error::Database(e)) if e.code().as_deref() == Some(UNIQUE_VIOLATION) => Err(
                StoreError::Conflict(format!("post {} 的选项已存在", post_id)),
            ),
            Err(e) => Err(e.into()),
        }
    }

    async fn update_options(&self, id: i64, patch: &OptionsPatch) -> StoreResult<PostsOption> {
        let row = sqlx::query_as::<_, OptionsRow>(
            r#"
            UPDATE posts_options
            SET summary = COALESCE($2, summary),
                images = COALESCE($3, images),
                disable_comment = COALESCE($4, disable_comment)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(patch.summary.as_deref())
        .bind(patch.images.as_deref())
        .bind(patch.disable_comment)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound {
            entity: "posts_option",
            id,
        })?;
        Ok(row.into())
    }
}

#[async_trait]
impl TopicStore for PgStore {
    async fn create_topic(&self, topic: NewTopic) -> StoreResult<Topic> {
        let row = sqlx::query_as::<_, TopicRow>(&format!(
            "INSERT INTO topics (post_id, user_id, title, tag_id) VALUES ($1, $2, $3, $4) RETURNING {}",
            TOPIC_COLUMNS
        ))
        .bind(topic.post_id)
        .bind(topic.user_id)
        .bind(&topic.title)
        .bind(topic.tag_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn find_topic(&self, id: i64) -> StoreResult<Option<Topic>> {
        let row = sqlx::query_as::<_, TopicRow>(&format!(
            "SELECT {} FROM topics WHERE id = $1",
            TOPIC_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn list_topics(&self, offset: u64, limit: u32) -> StoreResult<(Vec<Topic>, i64)> {
        let rows = sqlx::query_as::<_, TopicRow>(&format!(
            "SELECT {} FROM topics ORDER BY created_at DESC, id DESC LIMIT $1 OFFSET $2",
            TOPIC_COLUMNS
        ))
        .bind(limit as i64)
        .bind(offset as i64)
        .fetch_all(&self.pool)
        .await?;

        let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM topics")
            .fetch_one(&self.pool)
            .await?;

        Ok((rows.into_iter().map(Into::into).collect(), total.0))
    }

    async fn increment_view(&self, id: i64) -> StoreResult<Topic> {
        let row = sqlx::query_as::<_, TopicRow>(&format!(
            "UPDATE topics SET view = view + 1 WHERE id = $1 RETURNING {}",
            TOPIC_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound { entity: "topic", id })?;
        Ok(row.into())
    }

    async fn set_status(&self, id: i64, status: TopicStatus) -> StoreResult<Topic> {
        let row = sqlx::query_as::<_, TopicRow>(&format!(
            "UPDATE topics SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING {}",
            TOPIC_COLUMNS
        ))
        .bind(id)
        .bind(status.as_str())
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound { entity: "topic", id })?;
        Ok(row.into())
    }

    async fn toggle_like(&self, topic_id: i64, user_id: i64) -> StoreResult<LikeState> {
        let mut tx = self.pool.begin().await?;

        let exists: Option<(i64,)> = sqlx::query_as("SELECT id FROM topics WHERE id = $1 FOR UPDATE")
            .bind(topic_id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Err(StoreError::NotFound {
                entity: "topic",
                id: topic_id,
            });
        }

        let removed = sqlx::query("DELETE FROM topic_likes WHERE topic_id = $1 AND user_id = $2")
            .bind(topic_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?
            .rows_affected()
            > 0;

        if !removed {
            sqlx::query("INSERT INTO topic_likes (topic_id, user_id) VALUES ($1, $2)")
                .bind(topic_id)
                .bind(user_id)
                .execute(&mut *tx)
                .await?;
        }

        let likes: (i64,) = sqlx::query_as(
            r#"UPDATE topics SET "like" = "like" + $2 WHERE id = $1 RETURNING "like""#,
        )
        .bind(topic_id)
        .bind(if removed { -1i64 } else { 1i64 })
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(LikeState {
            liked: !removed,
            likes: likes.0,
        })
    }
}

#[async_trait]
impl CommentStore for PgStore {
    async fn create_comment(&self, comment: NewComment) -> StoreResult<Comment> {
        let row = sqlx::query_as::<_, CommentRow>(
            "INSERT INTO comments (topic_id, user_id, content) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(comment.topic_id)
        .bind(comment.user_id)
        .bind(&comment.content)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn list_comments(&self, topic_id: i64) -> StoreResult<Vec<Comment>> {
        let rows = sqlx::query_as::<_, CommentRow>(
            "SELECT * FROM comments WHERE topic_id = $1 ORDER BY created_at, id",
        )
        .bind(topic_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }
}
