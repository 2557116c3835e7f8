use crate::client::SocialClient;
use crate::config::Config;
use crate::retry::{retry_async, RetryPolicy};
use crate::types::{Account, AccountListEntry, Dataset, DigestError, Post, RawPost, Result};
use chrono::Local;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

pub struct Fetcher {
    client: Arc<dyn SocialClient>,
    retry: RetryPolicy,
    max_posts: usize,
    account_delay: Duration,
}

impl Fetcher {
    pub fn new(config: &Config, client: Arc<dyn SocialClient>) -> Self {
        Self {
            client,
            retry: config.retry,
            max_posts: config.max_tweets_per_account,
            account_delay: config.rate_limit_delay,
        }
    }

    /// Proves the session cookies work. Failure is fatal to the run.
    pub async fn authenticate(&self) -> Result<()> {
        match self.client.verify_session().await {
            Ok(screen_name) => {
                info!("Authenticated successfully (test fetch: @{})", screen_name);
                Ok(())
            }
            Err(e) => Err(DigestError::Authentication(format!(
                "cookie validation failed: {}. \
                 Cookies may be expired, re-export them from the browser",
                e
            ))),
        }
    }

    /// Recent posts for one account, retried on failure.
    pub async fn fetch_posts(&self, username: &str) -> Result<Vec<Post>> {
        let label = format!("user_posts(@{})", username);
        let client = self.client.as_ref();
        let max_posts = self.max_posts;
        let raw = retry_async(&self.retry, &label, move || {
            client.user_posts(username, max_posts)
        })
        .await?;

        let posts = select_posts(username, raw, self.max_posts);
        info!("Fetched {} tweets for @{}", posts.len(), username);
        Ok(posts)
    }

    /// Fetches every listed account in order. An account whose retries are
    /// exhausted is skipped; the rest of the run continues.
    pub async fn fetch_accounts(&self, entries: &[AccountListEntry]) -> Vec<Account> {
        let mut results = Vec::with_capacity(entries.len());

        for (i, entry) in entries.iter().enumerate() {
            match self.fetch_posts(&entry.username).await {
                Ok(posts) => {
                    info!("Processed @{}: {} tweets", entry.username, posts.len());
                    results.push(Account::from_entry(entry, posts));
                }
                Err(e) => {
                    warn!("Skipping @{} due to error: {}", entry.username, e);
                }
            }

            if i + 1 < entries.len() && !self.account_delay.is_zero() {
                debug!("Waiting {:?} before next account", self.account_delay);
                tokio::time::sleep(self.account_delay).await;
            }
        }

        results
    }

    pub fn build_dataset(date: &str, accounts: Vec<Account>) -> Dataset {
        Dataset {
            date: date.to_string(),
            scrape_time: Local::now().format("%Y-%m-%dT%H:%M:%S%.6f").to_string(),
            accounts,
        }
    }
}

/// Drops posts without an id or text and keeps at most `max_posts`.
pub fn select_posts(username: &str, raw: Vec<RawPost>, max_posts: usize) -> Vec<Post> {
    raw.into_iter()
        .filter_map(|post| {
            let id = post.id.filter(|id| !id.is_empty())?;
            let text = post.text.filter(|text| !text.is_empty())?;
            Some(Post {
                url: Post::status_url(username, &id),
                id,
                text,
                created_at: post.created_at,
                likes: post.likes.unwrap_or(0),
                retweets: post.retweets.unwrap_or(0),
                replies: post.replies.unwrap_or(0),
                is_retweet: post.is_retweet,
                is_reply: post.is_reply,
            })
        })
        .take(max_posts)
        .collect()
}
