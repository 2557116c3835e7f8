use crate::client::SocialClient;
use crate::config::Config;
use crate::exporter::{build_rows, export_path, SpreadsheetWriter};
use crate::fetcher::Fetcher;
use crate::llm_adapter::LlmAdapter;
use crate::reconcile::{sync_accounts, Reconciliation};
use crate::summarizer::Summarizer;
use crate::types::{DigestError, Result};
use interfaces::state;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Paths produced by a full run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutput {
    pub dataset: PathBuf,
    pub spreadsheet: PathBuf,
}

/// Sequences `[sync] -> fetch -> summarize -> export`. Every stage reads and
/// writes its hand-off file, so each can be re-run on its own. The social
/// client is only needed by sync and fetch.
pub struct Pipeline {
    config: Config,
    client: Option<Arc<dyn SocialClient>>,
    llm: Option<Arc<dyn LlmAdapter>>,
    writer: Box<dyn SpreadsheetWriter>,
}

impl Pipeline {
    pub fn new(
        config: Config,
        client: Option<Arc<dyn SocialClient>>,
        llm: Option<Arc<dyn LlmAdapter>>,
        writer: Box<dyn SpreadsheetWriter>,
    ) -> Self {
        Self {
            config,
            client,
            llm,
            writer,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn client(&self) -> Result<Arc<dyn SocialClient>> {
        self.client
            .clone()
            .ok_or_else(|| DigestError::Config("no social client configured".to_string()))
    }

    pub async fn sync(&self) -> Result<Reconciliation> {
        let client = self.client()?;
        sync_accounts(&self.config, client.as_ref()).await
    }

    /// Fetches all listed accounts and writes `data/<date>.json`.
    pub async fn fetch(&self, date: &str) -> Result<PathBuf> {
        let client = self.client()?;
        self.config.setup_cookies_from_env()?;
        if !self.config.cookie_file.exists() {
            return Err(DigestError::MissingCredential(format!(
                "Cookie file not found: {}. Export your Twitter cookies and save them there.",
                self.config.cookie_file.display()
            )));
        }

        let accounts = state::load_account_list(&self.config.accounts_file)?;
        info!("Loaded {} accounts to monitor", accounts.len());

        let fetcher = Fetcher::new(&self.config, client);
        fetcher.authenticate().await?;

        let results = fetcher.fetch_accounts(&accounts).await;
        info!("Successfully scraped {} accounts", results.len());

        let dataset = Fetcher::build_dataset(date, results);
        let path = self.config.dataset_path(date);
        state::save_dataset(&path, &dataset)?;
        info!("Data saved to {}", path.display());
        Ok(path)
    }

    /// Adds AI summaries to the dataset at `path`, rewriting it in place.
    pub async fn summarize(&self, path: &Path) -> Result<()> {
        require_input(path)?;
        let llm = match &self.llm {
            Some(llm) => llm.clone(),
            None => {
                return Err(DigestError::MissingCredential(
                    "GEMINI_API_KEY environment variable not set".to_string(),
                ))
            }
        };

        let mut dataset = state::load_dataset(path)?;
        info!("Loaded data from {}", path.display());

        Summarizer::new(&self.config, llm).summarize_dataset(&mut dataset).await;
        info!("Generated summaries for {} accounts", dataset.accounts.len());

        state::save_dataset(path, &dataset)?;
        info!("Updated data saved to {}", path.display());
        Ok(())
    }

    /// Renders the dataset at `path` to `output/<stem>.xlsx`.
    pub fn export(&self, path: &Path) -> Result<PathBuf> {
        require_input(path)?;
        let dataset = state::load_dataset(path)?;
        info!("Loaded data from {}", path.display());

        let rows = build_rows(&dataset);
        let output = export_path(&self.config, path);
        self.writer.write(&rows, &output)?;
        info!(
            "Written {} accounts ({} rows) to {}",
            dataset.accounts.len(),
            rows.len(),
            output.display()
        );
        Ok(output)
    }

    /// The whole chain. A failed sync is logged and the existing account list
    /// is used; any other failure ends the run.
    pub async fn run(&self, date: &str, sync: bool) -> Result<RunOutput> {
        info!("Starting TwitterAI pipeline for {}", date);
        self.config.ensure_directories()?;

        if sync {
            info!("Syncing accounts.json with Twitter following list...");
            if let Err(e) = self.sync().await {
                warn!("Account sync failed ({}), continuing with existing accounts.json", e);
            }
        }

        info!("Step 1/3: Running Twitter scraper...");
        let dataset = self.fetch(date).await?;

        info!("Step 2/3: Generating AI summaries...");
        self.summarize(&dataset).await?;

        info!("Step 3/3: Exporting to Excel...");
        let spreadsheet = self.export(&dataset)?;

        info!("Pipeline completed successfully!");
        info!("JSON data: {}", dataset.display());
        info!("Excel file: {}", spreadsheet.display());
        Ok(RunOutput { dataset, spreadsheet })
    }
}

fn require_input(path: &Path) -> Result<()> {
    if path.exists() {
        Ok(())
    } else {
        Err(DigestError::MissingInput(path.to_path_buf()))
    }
}
