//! 图片阶段：提取正文中的图片地址

use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;

use super::{keys, TopicContext};
use crate::core::error::CoreError;
use crate::core::pipeline::{Next, Outcome, Stage};

pub struct ImagesStage {
    max_images: usize,
    pattern: Regex,
}

impl ImagesStage {
    pub const NAME: &'static str = "images";

    pub fn new(max_images: usize) -> Self {
        let pattern = Regex::new(
            r#"!\[[^\]]*\]\(\s*<?([^\s)>]+)>?(?:\s+"[^"]*")?\s*\)|(?i:<img\b[^>]*?\bsrc\s*=\s*["']([^"']+)["'])"#,
        )
        .expect("image pattern is valid");
        Self {
            max_images,
            pattern,
        }
    }

    /// 按出现顺序去重
    pub fn extract(&self, content: &str) -> Vec<String> {
        let mut images: Vec<String> = Vec::new();
        for captures in self.pattern.captures_iter(content) {
            if images.len() >= self.max_images {
                break;
            }
            let url = captures
                .get(1)
                .or_else(|| captures.get(2))
                .map(|m| m.as_str().trim());
            if let Some(url) = url {
                if !url.is_empty() && !images.iter().any(|existing| existing == url) {
                    images.push(url.to_string());
                }
            }
        }
        images
    }
}

#[async_trait]
impl Stage<TopicContext, CoreError> for ImagesStage {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn handle(
        &self,
        mut ctx: TopicContext,
        next: Next<'_, TopicContext, CoreError>,
    ) -> Result<Outcome<TopicContext>, CoreError> {
        let images = ctx
            .get_str(keys::CONTENT)
            .map(|content| self.extract(content))
            .unwrap_or_default();

        ctx.insert(
            keys::IMAGES,
            Value::Array(images.into_iter().map(Value::String).collect()),
        );
        next.run(ctx).await
    }
}
