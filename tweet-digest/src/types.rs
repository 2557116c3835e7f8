use std::path::PathBuf;

// Use the interfaces crate for the persisted record types
pub use interfaces::defs::{Account, AccountListEntry, Dataset, FollowedAccount, Post};

/// A post as delivered by the social client, before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawPost {
    pub id: Option<String>,
    pub text: Option<String>,
    pub created_at: String,
    pub likes: Option<u64>,
    pub retweets: Option<u64>,
    pub replies: Option<u64>,
    pub is_retweet: bool,
    pub is_reply: bool,
}

/// One page of the fallback follow-list listing.
#[derive(Debug, Clone, Default)]
pub struct FollowingPage {
    pub accounts: Vec<FollowedAccount>,
    pub next_cursor: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum DigestError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Missing credential: {0}")]
    MissingCredential(String),

    #[error("Input file not found: {}", .0.display())]
    MissingInput(PathBuf),

    #[error("Invalid date format: {0}. Use YYYY-MM-DD")]
    InvalidDate(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Persistence error: {0:#}")]
    Persistence(#[from] anyhow::Error),

    #[error("Spreadsheet error: {0}")]
    Spreadsheet(#[from] rust_xlsxwriter::XlsxError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("General error: {0}")]
    General(String),
}

pub type Result<T> = std::result::Result<T, DigestError>;
