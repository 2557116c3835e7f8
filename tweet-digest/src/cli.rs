use crate::types::{DigestError, Result};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::Level;

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Parser)]
#[command(name = "tweet-digest", about = "Daily summaries of followed accounts, exported to Excel")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Full pipeline: [sync] -> fetch -> summarize -> export
    Run {
        /// Date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<String>,
        /// Sync accounts.json with the following list before fetching
        #[arg(long)]
        sync: bool,
    },
    /// Sync accounts.json with the authenticated user's following list
    Sync,
    /// Fetch recent posts into data/<date>.json
    Fetch {
        #[arg(long)]
        date: Option<String>,
    },
    /// Add AI summaries to a dataset file in place
    Summarize {
        #[arg(long)]
        input: PathBuf,
    },
    /// Export a dataset file to output/<name>.xlsx
    Export {
        #[arg(long)]
        input: PathBuf,
    },
}

impl Command {
    /// Stages that talk to the social network. Summarize and export work from
    /// files alone.
    pub fn needs_social_client(&self) -> bool {
        matches!(self, Command::Run { .. } | Command::Sync | Command::Fetch { .. })
    }

    pub fn needs_llm(&self) -> bool {
        matches!(self, Command::Run { .. } | Command::Summarize { .. })
    }
}

/// Validates an explicit `--date` or falls back to today.
pub fn resolve_date(date: Option<&str>) -> Result<String> {
    match date {
        Some(raw) => {
            // chrono accepts unpadded fields; require the canonical spelling.
            let parsed = NaiveDate::parse_from_str(raw, DATE_FORMAT)
                .map_err(|_| DigestError::InvalidDate(raw.to_string()))?;
            let canonical = parsed.format(DATE_FORMAT).to_string();
            if canonical != raw {
                return Err(DigestError::InvalidDate(raw.to_string()));
            }
            Ok(canonical)
        }
        None => Ok(Local::now().format(DATE_FORMAT).to_string()),
    }
}

pub fn parse_log_level(raw: &str) -> Level {
    match raw.trim().to_ascii_uppercase().as_str() {
        "TRACE" => Level::TRACE,
        "DEBUG" => Level::DEBUG,
        "WARN" | "WARNING" => Level::WARN,
        "ERROR" | "CRITICAL" => Level::ERROR,
        _ => Level::INFO,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn strict_dates() {
        assert_eq!(resolve_date(Some("2026-02-04")).unwrap(), "2026-02-04");
        for bad in ["2026-2-4", "2026/02/04", "2026-02-30", "04-02-2026", "yesterday", ""] {
            assert!(
                matches!(resolve_date(Some(bad)), Err(DigestError::InvalidDate(_))),
                "{} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn default_date_is_today() {
        let today = resolve_date(None).unwrap();
        assert!(NaiveDate::parse_from_str(&today, DATE_FORMAT).is_ok());
    }

    #[test]
    fn log_levels() {
        assert_eq!(parse_log_level("debug"), Level::DEBUG);
        assert_eq!(parse_log_level("WARNING"), Level::WARN);
        assert_eq!(parse_log_level("nonsense"), Level::INFO);
    }

    #[test]
    fn cli_parses_stages() {
        Cli::command().debug_assert();

        let cli = Cli::parse_from(["tweet-digest", "run", "--date", "2026-02-04", "--sync"]);
        assert!(matches!(
            cli.command,
            Command::Run { sync: true, date: Some(ref d) } if d == "2026-02-04"
        ));

        let cli = Cli::parse_from(["tweet-digest", "export", "--input", "data/2026-02-04.json"]);
        assert!(matches!(
            cli.command,
            Command::Export { ref input } if input == &PathBuf::from("data/2026-02-04.json")
        ));

        assert!(Cli::try_parse_from(["tweet-digest", "summarize"]).is_err());
    }

    #[test]
    fn only_network_stages_need_the_social_client() {
        let needs = |args: &[&str]| {
            Cli::parse_from(args.iter().copied())
                .command
                .needs_social_client()
        };
        assert!(needs(&["tweet-digest", "run"]));
        assert!(needs(&["tweet-digest", "sync"]));
        assert!(needs(&["tweet-digest", "fetch"]));
        assert!(!needs(&["tweet-digest", "summarize", "--input", "data/x.json"]));
        assert!(!needs(&["tweet-digest", "export", "--input", "data/x.json"]));
    }

    #[test]
    fn only_summarizing_stages_need_the_model() {
        let needs = |args: &[&str]| Cli::parse_from(args.iter().copied()).command.needs_llm();
        assert!(needs(&["tweet-digest", "run"]));
        assert!(needs(&["tweet-digest", "summarize", "--input", "data/x.json"]));
        assert!(!needs(&["tweet-digest", "export", "--input", "data/x.json"]));
        assert!(!needs(&["tweet-digest", "sync"]));
    }
}
