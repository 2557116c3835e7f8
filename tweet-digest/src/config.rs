use crate::retry::RetryPolicy;
use crate::types::{DigestError, Result};
use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_API_BASE: &str = "https://api.x.com";
pub const DEFAULT_GEMINI_BASE: &str = "https://generativelanguage.googleapis.com";

/// Immutable settings, built once at startup and handed to each component.
#[derive(Debug, Clone)]
pub struct Config {
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub gemini_base_url: String,
    /// Cookie blob from the environment, materialized into `cookie_file` on first use.
    pub twitter_cookies: Option<String>,
    pub bearer_token: Option<String>,
    pub api_base_url: String,
    pub proxy: Option<String>,
    pub user_agent: String,
    pub timeout_seconds: u64,

    pub data_dir: PathBuf,
    pub output_dir: PathBuf,
    pub accounts_file: PathBuf,
    pub cookie_file: PathBuf,

    pub max_tweets_per_account: usize,
    pub rate_limit_delay: Duration,
    pub retry: RetryPolicy,
    /// Pause between follow-list id resolutions during account sync.
    pub resolve_delay: Duration,
    pub llm_rate_limit_delay: Duration,

    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self::with_root(Path::new("."))
    }
}

impl Config {
    /// Defaults with every path placed under `root`.
    pub fn with_root(root: &Path) -> Self {
        Self {
            gemini_api_key: None,
            gemini_model: DEFAULT_GEMINI_MODEL.to_string(),
            gemini_base_url: DEFAULT_GEMINI_BASE.to_string(),
            twitter_cookies: None,
            bearer_token: None,
            api_base_url: DEFAULT_API_BASE.to_string(),
            proxy: None,
            user_agent: "tweet-digest/0.1".to_string(),
            timeout_seconds: 30,
            data_dir: root.join("data"),
            output_dir: root.join("output"),
            accounts_file: root.join("accounts.json"),
            cookie_file: root.join(".twitter_cookies.json"),
            max_tweets_per_account: 20,
            rate_limit_delay: Duration::from_secs(2),
            retry: RetryPolicy::new(3, Duration::from_secs(2)),
            resolve_delay: Duration::from_millis(500),
            llm_rate_limit_delay: Duration::from_secs(1),
            log_level: "INFO".to_string(),
        }
    }

    /// Reads the process environment. `TWEET_DIGEST_ROOT` overrides `root`.
    pub fn from_env(root: &Path) -> Result<Self> {
        Self::from_lookup(root, |key| env::var(key).ok())
    }

    pub fn from_lookup<F>(root: &Path, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let root = lookup("TWEET_DIGEST_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|| root.to_path_buf());
        let mut config = Self::with_root(&root);

        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        config.gemini_api_key = non_empty("GEMINI_API_KEY");
        if let Some(model) = non_empty("GEMINI_MODEL") {
            config.gemini_model = model;
        }
        config.twitter_cookies = non_empty("TWITTER_COOKIES");
        config.bearer_token = non_empty("TWITTER_BEARER_TOKEN");
        if let Some(base) = non_empty("TWITTER_API_BASE") {
            config.api_base_url = base;
        }
        config.proxy = non_empty("https_proxy").or_else(|| non_empty("HTTPS_PROXY"));

        if let Some(raw) = non_empty("MAX_TWEETS_PER_ACCOUNT") {
            config.max_tweets_per_account = parse_var("MAX_TWEETS_PER_ACCOUNT", &raw)?;
        }
        if let Some(raw) = non_empty("RATE_LIMIT_DELAY") {
            config.rate_limit_delay = Duration::from_secs(parse_var("RATE_LIMIT_DELAY", &raw)?);
        }
        if let Some(level) = non_empty("LOG_LEVEL") {
            config.log_level = level;
        }

        Ok(config)
    }

    pub fn require_api_key(&self) -> Result<&str> {
        self.gemini_api_key.as_deref().ok_or_else(|| {
            DigestError::MissingCredential(
                "GEMINI_API_KEY environment variable not set".to_string(),
            )
        })
    }

    pub fn ensure_directories(&self) -> Result<()> {
        std::fs::create_dir_all(&self.data_dir)?;
        std::fs::create_dir_all(&self.output_dir)?;
        Ok(())
    }

    /// Writes the cookie blob from the environment to `cookie_file`, unless
    /// the file already exists.
    pub fn setup_cookies_from_env(&self) -> Result<bool> {
        match &self.twitter_cookies {
            Some(blob) if !self.cookie_file.exists() => {
                interfaces::state::write_atomic(&self.cookie_file, blob.as_bytes())?;
                info!("Cookie file written from TWITTER_COOKIES: {}", self.cookie_file.display());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    pub fn dataset_path(&self, date: &str) -> PathBuf {
        self.data_dir.join(format!("{}.json", date))
    }
}

fn parse_var<T: FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim().parse().map_err(|_| {
        DigestError::Config(format!(
            "{} must be a non-negative integer, got {:?}",
            key, raw
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_without_environment() {
        let config = Config::from_lookup(Path::new("/srv/digest"), lookup(&[])).unwrap();
        assert_eq!(config.max_tweets_per_account, 20);
        assert_eq!(config.rate_limit_delay, Duration::from_secs(2));
        assert_eq!(config.retry.max_retries(), 3);
        assert_eq!(config.gemini_model, DEFAULT_GEMINI_MODEL);
        assert_eq!(config.accounts_file, Path::new("/srv/digest/accounts.json"));
        assert!(config.require_api_key().is_err());
    }

    #[test]
    fn environment_overrides() {
        let config = Config::from_lookup(
            Path::new("."),
            lookup(&[
                ("TWEET_DIGEST_ROOT", "/tmp/td"),
                ("GEMINI_API_KEY", "secret"),
                ("MAX_TWEETS_PER_ACCOUNT", "5"),
                ("RATE_LIMIT_DELAY", "0"),
                ("HTTPS_PROXY", "http://proxy:8080"),
                ("LOG_LEVEL", "DEBUG"),
            ]),
        )
        .unwrap();
        assert_eq!(config.require_api_key().unwrap(), "secret");
        assert_eq!(config.max_tweets_per_account, 5);
        assert_eq!(config.rate_limit_delay, Duration::ZERO);
        assert_eq!(config.proxy.as_deref(), Some("http://proxy:8080"));
        assert_eq!(config.data_dir, Path::new("/tmp/td/data"));
        assert_eq!(config.log_level, "DEBUG");
    }

    #[test]
    fn malformed_number_is_a_config_error() {
        let err = Config::from_lookup(Path::new("."), lookup(&[("RATE_LIMIT_DELAY", "soon")]))
            .unwrap_err();
        assert!(matches!(err, DigestError::Config(_)));
    }

    #[test]
    fn cookie_file_is_never_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::with_root(dir.path());
        config.twitter_cookies = Some(r#"{"ct0":"new"}"#.to_string());

        std::fs::write(&config.cookie_file, r#"{"ct0":"old"}"#).unwrap();
        assert!(!config.setup_cookies_from_env().unwrap());
        assert_eq!(std::fs::read_to_string(&config.cookie_file).unwrap(), r#"{"ct0":"old"}"#);

        std::fs::remove_file(&config.cookie_file).unwrap();
        assert!(config.setup_cookies_from_env().unwrap());
        assert_eq!(std::fs::read_to_string(&config.cookie_file).unwrap(), r#"{"ct0":"new"}"#);
    }
}
