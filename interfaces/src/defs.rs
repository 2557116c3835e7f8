use serde::{Deserialize, Serialize};

/// A single post as persisted in the per-run dataset.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub text: String,
    pub created_at: String,
    pub likes: u64,
    pub retweets: u64,
    pub replies: u64,
    pub url: String,
    pub is_retweet: bool,
    pub is_reply: bool,
}

impl Post {
    /// Canonical link to a post on x.com.
    pub fn status_url(username: &str, id: &str) -> String {
        format!("https://x.com/{}/status/{}", username, id)
    }
}

/// A monitored account together with this run's posts.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub username: String,
    pub display_name: String,
    pub category: String,
    // Always serialized, `null` until the summarize stage has run.
    pub ai_summary: Option<String>,
    pub tweets: Vec<Post>,
}

impl Account {
    pub fn from_entry(entry: &AccountListEntry, tweets: Vec<Post>) -> Self {
        Self {
            username: entry.username.clone(),
            display_name: entry.display_name.clone(),
            category: entry.category.clone(),
            ai_summary: None,
            tweets,
        }
    }
}

/// Durable, user-curated record in `accounts.json`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountListEntry {
    pub username: String,
    pub display_name: String,
    pub category: String,
}

impl AccountListEntry {
    pub fn key(&self) -> String {
        self.username.to_lowercase()
    }
}

/// An account as observed in the authenticated user's follow list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowedAccount {
    pub username: String,
    pub display_name: String,
}

impl FollowedAccount {
    pub fn new(username: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            display_name: display_name.into(),
        }
    }

    pub fn key(&self) -> String {
        self.username.to_lowercase()
    }
}

/// The per-run artifact handed from fetch to summarize to export.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dataset {
    pub date: String,
    pub scrape_time: String,
    pub accounts: Vec<Account>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_summary_serializes_as_null() {
        let entry = AccountListEntry {
            username: "alice".to_owned(),
            display_name: "Alice".to_owned(),
            category: "tech".to_owned(),
        };
        let account = Account::from_entry(&entry, vec![]);
        let value = serde_json::to_value(&account).unwrap();
        assert!(value["ai_summary"].is_null());
        assert_eq!(value["tweets"], serde_json::json!([]));
    }

    #[test]
    fn dataset_reads_the_persisted_layout() {
        let raw = r#"{
            "date": "2026-02-04",
            "scrape_time": "2026-02-04T08:00:00",
            "accounts": [{
                "username": "alice",
                "display_name": "Alice",
                "category": "tech",
                "ai_summary": null,
                "tweets": [{
                    "id": "1",
                    "text": "hello",
                    "created_at": "2026-02-04T07:00:00Z",
                    "likes": 3,
                    "retweets": 1,
                    "replies": 0,
                    "url": "https://x.com/alice/status/1",
                    "is_retweet": false,
                    "is_reply": true
                }]
            }]
        }"#;
        let dataset: Dataset = serde_json::from_str(raw).unwrap();
        assert_eq!(dataset.accounts[0].ai_summary, None);
        assert!(dataset.accounts[0].tweets[0].is_reply);
        assert_eq!(
            dataset.accounts[0].tweets[0].url,
            Post::status_url("alice", "1")
        );
    }
}
