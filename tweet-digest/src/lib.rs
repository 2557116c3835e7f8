pub mod cli;
pub mod client;
pub mod config;
pub mod exporter;
pub mod fetcher;
pub mod llm_adapter;
pub mod pipeline;
pub mod reconcile;
pub mod retry;
pub mod summarizer;
pub mod types;

pub use client::{CookieJar, SocialClient, XClient};
pub use config::Config;
pub use exporter::{SheetRow, SpreadsheetWriter, XlsxWriter};
pub use fetcher::Fetcher;
pub use llm_adapter::{GeminiAdapter, LlmAdapter, MockLlmAdapter};
pub use pipeline::{Pipeline, RunOutput};
pub use reconcile::{reconcile, Reconciliation, DEFAULT_CATEGORY};
pub use retry::{retry_async, retry_blocking, RetryPolicy};
pub use summarizer::Summarizer;
pub use types::*;
