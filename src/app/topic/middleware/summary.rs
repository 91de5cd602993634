//! 摘要阶段：没有指定摘要时从正文生成

use async_trait::async_trait;
use regex::Regex;

use super::{keys, TopicContext};
use crate::core::error::CoreError;
use crate::core::pipeline::{Next, Outcome, Stage};

pub struct SummaryStage {
    max_chars: usize,
    markup: Regex,
}

impl SummaryStage {
    pub const NAME: &'static str = "summary";

    pub fn new(max_chars: usize) -> Self {
        // 图片、HTML 标签、链接目标、方括号和反引号，以及行首的标题和引用标记
        let markup = Regex::new(
            r"!\[[^\]]*\]\([^)]*\)|<[^>]+>|\]\([^)]*\)|[`\[\]]|(?m:^[ \t]*(?:#{1,6}|>+)[ \t]*)",
        )
        .expect("summary markup pattern is valid");
        Self { max_chars, markup }
    }

    /// 去除标记、合并空白并截断
    pub fn summarize(&self, content: &str) -> String {
        let plain = strip_delimiters(&self.markup.replace_all(content, " "));
        let collapsed = plain.split_whitespace().collect::<Vec<_>>().join(" ");
        truncate_chars(&collapsed, self.max_chars)
    }
}

/// 去掉强调、删除线和表格分隔符；两侧都是字母或数字的保留，如 `snake_case`
fn strip_delimiters(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if !matches!(c, '*' | '_' | '~' | '|') {
            out.push(c);
            i += 1;
            continue;
        }

        let start = i;
        while i < chars.len() && chars[i] == c {
            i += 1;
        }
        let inner = start > 0
            && chars[start - 1].is_alphanumeric()
            && chars.get(i).is_some_and(|next| next.is_alphanumeric());
        if inner {
            out.extend(&chars[start..i]);
        }
    }
    out
}

/// 按字符截断，不切断多字节字符
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((index, _)) => text[..index].to_string(),
        None => text.to_string(),
    }
}

#[async_trait]
impl Stage<TopicContext, CoreError> for SummaryStage {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn handle(
        &self,
        mut ctx: TopicContext,
        next: Next<'_, TopicContext, CoreError>,
    ) -> Result<Outcome<TopicContext>, CoreError> {
        let provided = ctx
            .get_str(keys::SUMMARY)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| truncate_chars(s, self.max_chars));

        let summary = match provided {
            Some(summary) => Some(summary),
            None => ctx
                .get_str(keys::CONTENT)
                .map(|content| self.summarize(content))
                .filter(|s| !s.is_empty()),
        };

        if let Some(summary) = summary {
            ctx.insert(keys::SUMMARY, summary);
        }
        next.run(ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::pipeline::{Pipeline, Placement};

    #[test]
    fn test_summarize_strips_markup() {
        let stage = SummaryStage::new(300);
        let content = "# 标题\n\n这是 **加粗** 的内容 ![图](a.png)\n<p>段落</p> [链接](http://x)";
        assert_eq!(stage.summarize(content), "标题 这是 加粗 的内容 段落 链接");
    }

    #[test]
    fn test_summarize_keeps_inner_delimiters() {
        let stage = SummaryStage::new(300);
        assert_eq!(
            stage.summarize("use snake_case and a|b, not __bold__ or ~~old~~"),
            "use snake_case and a|b, not bold or old"
        );
        assert_eq!(stage.summarize("| 列 | 值 |\n> 引用 2*3"), "列 值 引用 2*3");
    }

    #[test]
    fn test_truncate_chars_multibyte() {
        assert_eq!(truncate_chars("你好世界", 2), "你好");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("", 3), "");
    }

    #[tokio::test]
    async fn test_stage_sets_summary_from_content() {
        let pipeline: Pipeline<TopicContext, CoreError> = Pipeline::builder()
            .register(SummaryStage::new(5), Placement::normal())
            .build()
            .unwrap();

        let ctx = TopicContext::new(1).with(keys::CONTENT, "hello world");
        match pipeline.run(ctx).await.unwrap() {
            Outcome::Completed(ctx) => assert_eq!(ctx.get_str(keys::SUMMARY), Some("hello")),
            Outcome::Halted(halt) => panic!("unexpected halt: {:?}", halt),
        }
    }

    #[tokio::test]
    async fn test_stage_keeps_provided_summary() {
        let pipeline: Pipeline<TopicContext, CoreError> = Pipeline::builder()
            .register(SummaryStage::new(300), Placement::normal())
            .build()
            .unwrap();

        let ctx = TopicContext::new(1)
            .with(keys::CONTENT, "body text")
            .with(keys::SUMMARY, "  custom  ");
        match pipeline.run(ctx).await.unwrap() {
            Outcome::Completed(ctx) => assert_eq!(ctx.get_str(keys::SUMMARY), Some("custom")),
            Outcome::Halted(halt) => panic!("unexpected halt: {:?}", halt),
        }
    }
}
