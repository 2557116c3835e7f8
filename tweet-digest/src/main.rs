use anyhow::Context;
use clap::Parser;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};
use tweet_digest::cli::{parse_log_level, resolve_date, Cli, Command};
use tweet_digest::{Config, GeminiAdapter, LlmAdapter, Pipeline, SocialClient, XClient, XlsxWriter};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let cwd = std::env::current_dir().unwrap_or_else(|_| ".".into());
    let config = match Config::from_env(&cwd) {
        Ok(config) => config,
        Err(e) => {
            tracing_subscriber::fmt().init();
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    tracing_subscriber::fmt()
        .with_max_level(parse_log_level(&config.log_level))
        .init();

    match run(cli.command, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Command, config: Config) -> anyhow::Result<()> {
    let client: Option<Arc<dyn SocialClient>> = if command.needs_social_client() {
        let client: Arc<dyn SocialClient> =
            Arc::new(XClient::new(&config).context("failed to build HTTP client")?);
        Some(client)
    } else {
        None
    };
    // A missing key surfaces in the summarize stage itself.
    let llm: Option<Arc<dyn LlmAdapter>> = if command.needs_llm() {
        GeminiAdapter::optional(&config)
            .context("failed to build Gemini client")?
            .map(|adapter| Arc::new(adapter) as Arc<dyn LlmAdapter>)
    } else {
        None
    };
    let pipeline = Pipeline::new(config, client, llm, Box::new(XlsxWriter));

    match command {
        Command::Run { date, sync } => {
            let date = resolve_date(date.as_deref())?;
            pipeline.run(&date, sync).await.context("Pipeline failed")?;
        }
        Command::Sync => {
            let result = pipeline.sync().await.context("Account sync failed")?;
            info!("Sync finished: {} accounts", result.accounts.len());
        }
        Command::Fetch { date } => {
            let date = resolve_date(date.as_deref())?;
            pipeline.config().ensure_directories()?;
            let path = pipeline.fetch(&date).await.context("Scraping failed")?;
            info!("Scraping completed successfully: {}", path.display());
        }
        Command::Summarize { input } => {
            pipeline.summarize(&input).await.context("Summarization failed")?;
        }
        Command::Export { input } => {
            pipeline.config().ensure_directories()?;
            let path = pipeline.export(&input).context("Excel export failed")?;
            info!("Excel export completed successfully: {}", path.display());
        }
    }
    Ok(())
}
