use crate::config::Config;
use crate::types::{DigestError, FollowedAccount, FollowingPage, RawPost, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::debug;

/// Account fetched to prove a session works before a run starts.
pub const PROBE_SCREEN_NAME: &str = "elonmusk";

/// Read-only access to the social network, authenticated by a cookie blob.
#[async_trait]
pub trait SocialClient: Send + Sync {
    /// Makes one cheap request and returns the screen name it read.
    async fn verify_session(&self) -> Result<String>;

    /// Recent posts of `username`, newest first, at most `count`.
    async fn user_posts(&self, username: &str, count: usize) -> Result<Vec<RawPost>>;

    /// Ids of every account `user_id` follows.
    async fn following_ids(&self, user_id: &str) -> Result<Vec<String>>;

    async fn user_by_id(&self, id: &str) -> Result<FollowedAccount>;

    /// Paginated follow list, used when the id listing is unavailable.
    async fn following_page(&self, user_id: &str, cursor: Option<&str>) -> Result<FollowingPage>;
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CookieFile {
    Map(BTreeMap<String, String>),
    // Browser extension export: [{"name": ..., "value": ...}, ...]
    List(Vec<CookieRecord>),
}

#[derive(Debug, Deserialize)]
struct CookieRecord {
    name: String,
    value: String,
}

/// Cookies exported from a logged-in browser session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CookieJar {
    cookies: BTreeMap<String, String>,
}

impl CookieJar {
    pub fn parse(raw: &str) -> Result<Self> {
        let cookies = match serde_json::from_str::<CookieFile>(raw)? {
            CookieFile::Map(map) => map,
            CookieFile::List(records) => records.into_iter().map(|r| (r.name, r.value)).collect(),
        };
        Ok(Self { cookies })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::parse(&raw)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    /// The numeric id of the session owner, taken from the `twid` cookie
    /// (`u%3D<id>`, URL-encoded).
    pub fn user_id(&self) -> Result<String> {
        let raw = self.get("twid").ok_or_else(|| {
            DigestError::MissingCredential("cookie `twid` not present".to_string())
        })?;
        let decoded = url::form_urlencoded::parse(format!("twid={}", raw).as_bytes())
            .next()
            .map(|(_, value)| value.into_owned())
            .unwrap_or_default();
        let id = decoded.trim_matches('"').trim_start_matches("u=");
        if id.is_empty() || !id.chars().all(|c| c.is_ascii_digit()) {
            return Err(DigestError::MissingCredential(format!(
                "cannot read user id from twid {:?}",
                raw
            )));
        }
        Ok(id.to_string())
    }

    pub fn header_value(&self) -> String {
        self.cookies
            .iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Deserialize)]
struct ApiEnvelope<T> {
    data: Option<T>,
    #[serde(default)]
    meta: Option<ApiMeta>,
    #[serde(default)]
    errors: Vec<ApiProblem>,
}

#[derive(Debug, Deserialize)]
struct ApiMeta {
    next_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiProblem {
    detail: Option<String>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiUser {
    id: String,
    username: String,
    name: Option<String>,
}

impl From<ApiUser> for FollowedAccount {
    fn from(user: ApiUser) -> Self {
        let display_name = user
            .name
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| user.username.clone());
        FollowedAccount::new(user.username, display_name)
    }
}

#[derive(Debug, Deserialize)]
struct ApiTweet {
    id: Option<String>,
    text: Option<String>,
    #[serde(default)]
    created_at: Option<String>,
    #[serde(default)]
    public_metrics: Option<ApiMetrics>,
    #[serde(default)]
    referenced_tweets: Vec<ApiReference>,
    #[serde(default)]
    in_reply_to_user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiMetrics {
    like_count: Option<u64>,
    retweet_count: Option<u64>,
    reply_count: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ApiReference {
    #[serde(rename = "type")]
    kind: String,
}

impl From<ApiTweet> for RawPost {
    fn from(tweet: ApiTweet) -> Self {
        let is_retweet = tweet.referenced_tweets.iter().any(|r| r.kind == "retweeted");
        let is_reply = tweet.in_reply_to_user_id.is_some()
            || tweet.referenced_tweets.iter().any(|r| r.kind == "replied_to");
        let metrics = tweet.public_metrics;
        RawPost {
            id: tweet.id,
            text: tweet.text,
            created_at: tweet.created_at.unwrap_or_default(),
            likes: metrics.as_ref().and_then(|m| m.like_count),
            retweets: metrics.as_ref().and_then(|m| m.retweet_count),
            replies: metrics.as_ref().and_then(|m| m.reply_count),
            is_retweet,
            is_reply,
        }
    }
}

#[derive(Debug, Deserialize)]
struct FriendIds {
    ids: Vec<serde_json::Value>,
}

/// `SocialClient` over the x.com HTTP API using browser session cookies.
pub struct XClient {
    client: Client,
    base_url: String,
    cookie_file: PathBuf,
    bearer_token: Option<String>,
    jar: OnceCell<CookieJar>,
}

impl XClient {
    pub fn new(config: &Config) -> Result<Self> {
        let mut builder = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_seconds))
            .gzip(true)
            .deflate(true)
            .brotli(true);
        if let Some(proxy) = &config.proxy {
            builder = builder.proxy(reqwest::Proxy::all(proxy)?);
        }

        Ok(Self {
            client: builder.build()?,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            cookie_file: config.cookie_file.clone(),
            bearer_token: config.bearer_token.clone(),
            jar: OnceCell::new(),
        })
    }

    // The cookie file may be materialized after construction, so it is read
    // on first request.
    async fn jar(&self) -> Result<&CookieJar> {
        self.jar
            .get_or_try_init(|| async {
                debug!("Loading cookies from {}", self.cookie_file.display());
                CookieJar::load(&self.cookie_file)
            })
            .await
    }

    async fn authorized(&self, request: RequestBuilder) -> Result<RequestBuilder> {
        let jar = self.jar().await?;
        let mut request = request
            .header("cookie", jar.header_value())
            .header("x-twitter-auth-type", "OAuth2Session")
            .header("x-twitter-active-user", "yes");
        if let Some(csrf) = jar.get("ct0") {
            request = request.header("x-csrf-token", csrf);
        }
        if let Some(token) = &self.bearer_token {
            request = request.bearer_auth(token);
        }
        Ok(request)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        debug!("GET {}", url);

        let request = self.authorized(self.client.get(&url).query(query)).await?;
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(api_error(status, &body));
        }
        Ok(serde_json::from_str(&body)?)
    }

    async fn get_data<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<(T, Option<ApiMeta>)> {
        let envelope: ApiEnvelope<T> = self.get_json(path, query).await?;
        match envelope.data {
            Some(data) => Ok((data, envelope.meta)),
            None => {
                let message = envelope
                    .errors
                    .into_iter()
                    .filter_map(|p| p.detail.or(p.message))
                    .collect::<Vec<_>>()
                    .join("; ");
                let message = if message.is_empty() {
                    format!("no data in response to {}", path)
                } else {
                    message
                };
                Err(DigestError::Api {
                    status: StatusCode::OK.as_u16(),
                    message,
                })
            }
        }
    }

    async fn user_by_screen_name(&self, username: &str) -> Result<ApiUser> {
        let (user, _) = self.get_data(&format!("/2/users/by/username/{}", username), &[]).await?;
        Ok(user)
    }
}

fn api_error(status: StatusCode, body: &str) -> DigestError {
    let mut message: String = body.chars().take(200).collect();
    if message.is_empty() {
        message = status.canonical_reason().unwrap_or("Unknown").to_string();
    }
    DigestError::Api {
        status: status.as_u16(),
        message,
    }
}

#[async_trait]
impl SocialClient for XClient {
    async fn verify_session(&self) -> Result<String> {
        let user = self.user_by_screen_name(PROBE_SCREEN_NAME).await?;
        Ok(user.username)
    }

    async fn user_posts(&self, username: &str, count: usize) -> Result<Vec<RawPost>> {
        let user = self.user_by_screen_name(username).await?;
        debug!("Fetched user: @{} (ID: {})", username, user.id);

        // The timeline endpoint accepts between 5 and 100 results per page.
        let max_results = count.clamp(5, 100);
        let query = [
            ("max_results", max_results.to_string()),
            (
                "tweet.fields",
                "created_at,public_metrics,referenced_tweets,in_reply_to_user_id".to_string(),
            ),
        ];
        let envelope: ApiEnvelope<Vec<ApiTweet>> = self
            .get_json(&format!("/2/users/{}/tweets", user.id), &query)
            .await?;
        // An account with no recent posts has no `data` at all.
        Ok(envelope
            .data
            .unwrap_or_default()
            .into_iter()
            .map(RawPost::from)
            .collect())
    }

    async fn following_ids(&self, user_id: &str) -> Result<Vec<String>> {
        let query = [
            ("user_id", user_id.to_string()),
            ("count", "5000".to_string()),
            ("stringify_ids", "true".to_string()),
        ];
        let friends: FriendIds = self.get_json("/1.1/friends/ids.json", &query).await?;
        Ok(friends
            .ids
            .into_iter()
            .map(|id| match id {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            })
            .collect())
    }

    async fn user_by_id(&self, id: &str) -> Result<FollowedAccount> {
        let (user, _): (ApiUser, _) = self.get_data(&format!("/2/users/{}", id), &[]).await?;
        Ok(user.into())
    }

    async fn following_page(&self, user_id: &str, cursor: Option<&str>) -> Result<FollowingPage> {
        let mut query = vec![("max_results", "100".to_string())];
        if let Some(cursor) = cursor {
            query.push(("pagination_token", cursor.to_string()));
        }
        let envelope: ApiEnvelope<Vec<ApiUser>> =
            self.get_json(&format!("/2/users/{}/following", user_id), &query).await?;
        Ok(FollowingPage {
            accounts: envelope
                .data
                .unwrap_or_default()
                .into_iter()
                .map(FollowedAccount::from)
                .collect(),
            next_cursor: envelope.meta.and_then(|m| m.next_token),
        })
    }
}
