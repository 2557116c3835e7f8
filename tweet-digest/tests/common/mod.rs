#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;
use tweet_digest::exporter::{SheetRow, SpreadsheetWriter};
use tweet_digest::types::{
    AccountListEntry, DigestError, FollowedAccount, FollowingPage, RawPost, Result,
};
use tweet_digest::{Config, RetryPolicy, SocialClient};

static INIT: Once = Once::new();

pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// Config rooted in `root` with a cookie file in place and no pacing delays
/// other than the retry backoff.
pub fn test_config(root: &Path) -> Config {
    let mut config = Config::with_root(root);
    config.rate_limit_delay = Duration::ZERO;
    config.resolve_delay = Duration::ZERO;
    config.llm_rate_limit_delay = Duration::ZERO;
    config.retry = RetryPolicy::new(3, Duration::from_millis(5));
    let cookies = r#"{"auth_token": "a", "ct0": "t", "twid": "u%3D99"}"#;
    std::fs::write(&config.cookie_file, cookies).unwrap();
    config
}

pub fn entry(username: &str, display_name: &str, category: &str) -> AccountListEntry {
    AccountListEntry {
        username: username.to_string(),
        display_name: display_name.to_string(),
        category: category.to_string(),
    }
}

pub fn write_accounts(config: &Config, entries: &[AccountListEntry]) {
    interfaces::state::save_account_list(&config.accounts_file, entries).unwrap();
}

pub fn raw_post(id: &str, text: &str) -> RawPost {
    RawPost {
        id: Some(id.to_string()),
        text: Some(text.to_string()),
        created_at: "2026-02-04T07:00:00Z".to_string(),
        likes: Some(10),
        retweets: Some(2),
        replies: Some(1),
        is_retweet: false,
        is_reply: false,
    }
}

/// In-memory social network.
#[derive(Default)]
pub struct FakeClient {
    pub session_ok: bool,
    pub posts: HashMap<String, Vec<RawPost>>,
    /// Failures to serve before `user_posts` succeeds; `u32::MAX` never succeeds.
    pub failures: Mutex<HashMap<String, u32>>,
    pub post_calls: Mutex<HashMap<String, u32>>,
    pub following_ids: Option<Vec<String>>,
    pub users: HashMap<String, FollowedAccount>,
    pub pages: Vec<FollowingPage>,
    pub page_requests: Mutex<Vec<Option<String>>>,
}

impl FakeClient {
    pub fn new() -> Self {
        Self {
            session_ok: true,
            ..Default::default()
        }
    }

    pub fn with_posts(mut self, username: &str, posts: Vec<RawPost>) -> Self {
        self.posts.insert(username.to_string(), posts);
        self
    }

    pub fn failing(self, username: &str, times: u32) -> Self {
        self.failures.lock().unwrap().insert(username.to_string(), times);
        self
    }

    pub fn calls_for(&self, username: &str) -> u32 {
        self.post_calls.lock().unwrap().get(username).copied().unwrap_or(0)
    }
}

#[async_trait]
impl SocialClient for FakeClient {
    async fn verify_session(&self) -> Result<String> {
        if self.session_ok {
            Ok("elonmusk".to_string())
        } else {
            Err(DigestError::Api {
                status: 401,
                message: "Could not authenticate you".to_string(),
            })
        }
    }

    async fn user_posts(&self, username: &str, _count: usize) -> Result<Vec<RawPost>> {
        *self.post_calls.lock().unwrap().entry(username.to_string()).or_insert(0) += 1;

        let mut failures = self.failures.lock().unwrap();
        if let Some(remaining) = failures.get_mut(username) {
            if *remaining > 0 {
                if *remaining != u32::MAX {
                    *remaining -= 1;
                }
                return Err(DigestError::Api {
                    status: 503,
                    message: format!("timeline for {} unavailable", username),
                });
            }
        }
        Ok(self.posts.get(username).cloned().unwrap_or_default())
    }

    async fn following_ids(&self, _user_id: &str) -> Result<Vec<String>> {
        self.following_ids
            .clone()
            .ok_or_else(|| DigestError::Api {
                status: 403,
                message: "endpoint unavailable".to_string(),
            })
    }

    async fn user_by_id(&self, id: &str) -> Result<FollowedAccount> {
        self.users
            .get(id)
            .cloned()
            .ok_or_else(|| DigestError::Api {
                status: 404,
                message: format!("user {} not found", id),
            })
    }

    async fn following_page(&self, _user_id: &str, cursor: Option<&str>) -> Result<FollowingPage> {
        self.page_requests.lock().unwrap().push(cursor.map(str::to_string));
        let index = match cursor {
            None => 0,
            Some(c) => c.parse::<usize>().unwrap_or(usize::MAX),
        };
        Ok(self.pages.get(index).cloned().unwrap_or_default())
    }
}

/// Captures rendered rows instead of writing a workbook. Clones share the
/// same record.
#[derive(Clone, Default)]
pub struct RecordingWriter {
    written: Arc<Mutex<Vec<(PathBuf, Vec<SheetRow>)>>>,
}

impl RecordingWriter {
    pub fn written(&self) -> Vec<(PathBuf, Vec<SheetRow>)> {
        self.written.lock().unwrap().clone()
    }
}

impl SpreadsheetWriter for RecordingWriter {
    fn write(&self, rows: &[SheetRow], path: &Path) -> Result<()> {
        self.written.lock().unwrap().push((path.to_path_buf(), rows.to_vec()));
        Ok(())
    }
}
