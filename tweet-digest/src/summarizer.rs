use crate::config::Config;
use crate::llm_adapter::LlmAdapter;
use crate::types::{Dataset, Post};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Substituted whenever the model fails or returns something unusable.
pub const FALLBACK_SUMMARY: &str = "AI摘要暂时不可用";
/// Given to accounts without posts; the model is not called for them.
pub const NO_POSTS_SUMMARY: &str = "该账号今日暂无推文";
/// Replies shorter than this many characters are rejected.
pub const MIN_SUMMARY_CHARS: usize = 5;
pub const MAX_SUMMARY_CHARS: usize = 50;

pub struct Summarizer {
    llm: Arc<dyn LlmAdapter>,
    delay: Duration,
}

impl Summarizer {
    pub fn new(config: &Config, llm: Arc<dyn LlmAdapter>) -> Self {
        Self {
            llm,
            delay: config.llm_rate_limit_delay,
        }
    }

    /// One sentence for one account. Never fails.
    pub async fn summarize_account(&self, username: &str, posts: &[Post]) -> String {
        if posts.is_empty() {
            return NO_POSTS_SUMMARY.to_string();
        }

        let prompt = build_prompt(posts, username);
        match self.llm.generate(&prompt).await {
            Ok(reply) => {
                let summary = reply.trim();
                if summary.chars().count() < MIN_SUMMARY_CHARS {
                    warn!("Invalid summary for @{}, using fallback", username);
                    return FALLBACK_SUMMARY.to_string();
                }
                let preview: String = summary.chars().take(50).collect();
                info!("Generated summary for @{}: {}...", username, preview);
                summary.to_string()
            }
            Err(e) => {
                warn!("Summary generation failed for @{}: {}", username, e);
                FALLBACK_SUMMARY.to_string()
            }
        }
    }

    /// Fills `ai_summary` for every account in place, one model call per
    /// account with posts.
    pub async fn summarize_dataset(&self, dataset: &mut Dataset) {
        let total = dataset.accounts.len();

        for (i, account) in dataset.accounts.iter_mut().enumerate() {
            info!("Processing {}/{}: @{}", i + 1, total, account.username);

            let summary = self.summarize_account(&account.username, &account.tweets).await;
            account.ai_summary = Some(summary);

            if i + 1 < total && !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
        }
    }
}

pub fn build_prompt(posts: &[Post], username: &str) -> String {
    let posts_text = posts
        .iter()
        .enumerate()
        .map(|(i, post)| {
            format!(
                "推文 {} (发布于 {}):\n{}\n互动数据: {} 赞, {} 转发, {} 回复",
                i + 1,
                post.created_at,
                post.text,
                post.likes,
                post.retweets,
                post.replies
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "你是一位专业的科技媒体编辑，专注于人工智能、Web3和前沿科技领域。

任务：
请阅读Twitter用户 @{username} 今日发布的所有推文，生成一句话中文摘要（不超过{max}字）。

要求：
1. 用一句话概括该用户今日推文的核心主题或最重要的信息
2. 必须使用中文
3. 聚焦于实质性内容（技术进展、产品发布、观点洞察等）
4. 忽略纯粹的互动性内容（点赞、转发无内容的推文）
5. 如果推文内容零散无主题，概括最值得关注的1-2条
6. 语言风格：简洁、专业、信息密度高

推文内容：
{posts_text}

请直接输出一句话摘要，不要包含\"摘要：\"等前缀。",
        username = username,
        max = MAX_SUMMARY_CHARS,
        posts_text = posts_text,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_adapter::MockLlmAdapter;
    use crate::types::Account;
    use tokio::time::Instant;

    fn post(id: &str, text: &str) -> Post {
        Post {
            id: id.to_string(),
            text: text.to_string(),
            created_at: "2026-02-04T07:00:00Z".to_string(),
            likes: 12,
            retweets: 3,
            replies: 4,
            url: Post::status_url("alice", id),
            is_retweet: false,
            is_reply: false,
        }
    }

    fn summarizer(mock: Arc<MockLlmAdapter>) -> Summarizer {
        let mut config = Config::default();
        config.llm_rate_limit_delay = Duration::ZERO;
        Summarizer::new(&config, mock)
    }

    #[test]
    fn prompt_embeds_every_post_with_engagement() {
        let posts = [post("1", "发布了新模型"), post("2", "开源权重")];
        let prompt = build_prompt(&posts, "alice");
        assert!(prompt.contains("@alice"));
        assert!(prompt.contains("推文 1 (发布于 2026-02-04T07:00:00Z):\n发布了新模型"));
        assert!(prompt.contains("推文 2"));
        assert!(prompt.contains("互动数据: 12 赞, 3 转发, 4 回复"));
        assert!(prompt.contains("不超过50字"));
    }

    #[tokio::test]
    async fn no_posts_skips_the_model() {
        let mock = Arc::new(MockLlmAdapter::new("t".to_string()));
        let summary = summarizer(mock.clone()).summarize_account("alice", &[]).await;
        assert_eq!(summary, NO_POSTS_SUMMARY);
        assert_eq!(mock.calls(), 0);
    }

    #[tokio::test]
    async fn reply_is_trimmed() {
        let reply = "  今日发布了新的推理模型。\n";
        let mock = Arc::new(MockLlmAdapter::new("t".to_string()).then_reply(reply));
        let summary = summarizer(mock).summarize_account("alice", &[post("1", "x")]).await;
        assert_eq!(summary, "今日发布了新的推理模型。");
    }

    #[tokio::test]
    async fn short_reply_falls_back() {
        // Four characters, even though it is twelve bytes.
        let mock = Arc::new(MockLlmAdapter::new("t".to_string()).then_reply("新模型。"));
        let summary = summarizer(mock).summarize_account("alice", &[post("1", "x")]).await;
        assert_eq!(summary, FALLBACK_SUMMARY);
    }

    #[tokio::test]
    async fn five_characters_is_enough() {
        let mock = Arc::new(MockLlmAdapter::new("t".to_string()).then_reply("发布新模型"));
        let summary = summarizer(mock).summarize_account("alice", &[post("1", "x")]).await;
        assert_eq!(summary, "发布新模型");
    }

    fn account(username: &str, tweets: Vec<Post>) -> Account {
        Account {
            username: username.to_string(),
            display_name: username.to_string(),
            category: "tech".to_string(),
            ai_summary: None,
            tweets,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn model_calls_are_paced_except_after_the_last() {
        let mock = Arc::new(
            MockLlmAdapter::new("t".to_string()).with_default_reply("今日发布了新模型。"),
        );
        let mut config = Config::default();
        config.llm_rate_limit_delay = Duration::from_secs(1);
        let summarizer = Summarizer::new(&config, mock.clone());
        let mut dataset = Dataset {
            date: "2026-02-04".to_string(),
            scrape_time: "2026-02-04T08:00:00.000000".to_string(),
            accounts: vec![
                account("alice", vec![post("1", "x")]),
                account("bob", vec![post("2", "y")]),
            ],
        };

        let start = Instant::now();
        summarizer.summarize_dataset(&mut dataset).await;

        assert_eq!(start.elapsed(), Duration::from_secs(1));
        assert_eq!(mock.calls(), 2);
        assert!(dataset.accounts.iter().all(|a| a.ai_summary.is_some()));
    }

    #[tokio::test]
    async fn model_error_falls_back() {
        let mock = Arc::new(MockLlmAdapter::new("t".to_string()).then_fail("quota exceeded"));
        let summary = summarizer(mock).summarize_account("alice", &[post("1", "x")]).await;
        assert_eq!(summary, FALLBACK_SUMMARY);
    }
}
