//! 内容检查阶段：标题或正文包含禁用词时终止管道

use async_trait::async_trait;
use tracing::info;

use super::{keys, TopicContext};
use crate::core::error::CoreError;
use crate::core::pipeline::{Halt, Next, Outcome, Stage};

pub struct ContentGuardStage {
    forbidden_words: Vec<String>,
}

impl ContentGuardStage {
    pub const NAME: &'static str = "content_guard";

    pub fn new(forbidden_words: &[String]) -> Self {
        Self {
            forbidden_words: forbidden_words
                .iter()
                .map(|w| w.trim().to_lowercase())
                .filter(|w| !w.is_empty())
                .collect(),
        }
    }

    /// 返回命中的第一个禁用词
    pub fn find_forbidden(&self, text: &str) -> Option<&str> {
        let text = text.to_lowercase();
        self.forbidden_words
            .iter()
            .find(|word| text.contains(word.as_str()))
            .map(String::as_str)
    }
}

#[async_trait]
impl Stage<TopicContext, CoreError> for ContentGuardStage {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn handle(
        &self,
        ctx: TopicContext,
        next: Next<'_, TopicContext, CoreError>,
    ) -> Result<Outcome<TopicContext>, CoreError> {
        for key in [keys::TITLE, keys::CONTENT] {
            if let Some(word) = ctx.get_str(key).and_then(|text| self.find_forbidden(text)) {
                info!("Rejected post {}: forbidden word in {}", ctx.post_id(), key);
                return Ok(Outcome::Halted(Halt::new(
                    Self::NAME,
                    format!("内容包含禁用词: {}", word),
                )));
            }
        }

        next.run(ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::pipeline::{Pipeline, Placement};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Count(Arc<AtomicUsize>);

    #[async_trait]
    impl Stage<TopicContext, CoreError> for Count {
        fn name(&self) -> &'static str {
            "count"
        }

        async fn handle(
            &self,
            ctx: TopicContext,
            next: Next<'_, TopicContext, CoreError>,
        ) -> Result<Outcome<TopicContext>, CoreError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            next.run(ctx).await
        }
    }

    fn pipeline(words: &[&str], counter: Arc<AtomicUsize>) -> Pipeline<TopicContext, CoreError> {
        let words: Vec<String> = words.iter().map(|w| w.to_string()).collect();
        Pipeline::builder()
            .register(Count(counter), Placement::last())
            .register(ContentGuardStage::new(&words), Placement::first())
            .build()
            .unwrap()
    }

    #[test]
    fn test_find_forbidden_case_insensitive() {
        let stage = ContentGuardStage::new(&["Spam".to_string(), " ".to_string()]);
        assert_eq!(stage.find_forbidden("buy SPAM now"), Some("spam"));
        assert_eq!(stage.find_forbidden("hello"), None);
    }

    #[tokio::test]
    async fn test_halts_before_later_stages() {
        let counter = Arc::new(AtomicUsize::new(0));
        let pipeline = pipeline(&["广告"], counter.clone());

        let ctx = TopicContext::new(1)
            .with(keys::TITLE, "正常标题")
            .with(keys::CONTENT, "这里有广告");
        let outcome = pipeline.run(ctx).await.unwrap();

        assert_eq!(
            outcome,
            Outcome::Halted(Halt::new("content_guard", "内容包含禁用词: 广告"))
        );
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_clean_content_continues() {
        let counter = Arc::new(AtomicUsize::new(0));
        let pipeline = pipeline(&["广告"], counter.clone());

        let ctx = TopicContext::new(1).with(keys::CONTENT, "正常内容");
        assert!(pipeline.run(ctx).await.unwrap().is_completed());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}
