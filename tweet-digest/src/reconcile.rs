use crate::client::{CookieJar, SocialClient};
use crate::config::Config;
use crate::types::{AccountListEntry, DigestError, FollowedAccount, Result};
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::{info, warn};

/// Category given to accounts that appear in the follow list for the first time.
pub const DEFAULT_CATEGORY: &str = "uncategorized";

/// Outcome of merging a fresh follow list into the curated account list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    pub accounts: Vec<AccountListEntry>,
    /// Lowercase usernames followed now but not listed before.
    pub added: BTreeSet<String>,
    /// Lowercase usernames listed before but no longer followed.
    pub removed: BTreeSet<String>,
}

impl Reconciliation {
    pub fn is_unchanged(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }

    pub fn log_changes(&self) {
        if !self.added.is_empty() {
            info!(
                "Added {} new accounts: {}",
                self.added.len(),
                self.added.iter().cloned().collect::<Vec<_>>().join(", ")
            );
        }
        if !self.removed.is_empty() {
            info!(
                "Removed {} unfollowed accounts: {}",
                self.removed.len(),
                self.removed.iter().cloned().collect::<Vec<_>>().join(", ")
            );
        }
        if self.is_unchanged() {
            info!("No changes detected");
        }
    }
}

/// Merges `fetched` into `existing`. Output follows `fetched` order; curated
/// categories survive for accounts still followed, display names are
/// refreshed, and unfollowed accounts are dropped.
pub fn reconcile(existing: &[AccountListEntry], fetched: &[FollowedAccount]) -> Reconciliation {
    let existing_map: HashMap<String, &AccountListEntry> = existing
        .iter()
        .map(|entry| (entry.key(), entry))
        .collect();

    let mut seen = HashSet::new();
    let mut accounts = Vec::with_capacity(fetched.len());
    for followed in fetched {
        let key = followed.key();
        if !seen.insert(key.clone()) {
            continue;
        }
        let entry = match existing_map.get(&key) {
            Some(current) => AccountListEntry {
                display_name: followed.display_name.clone(),
                ..(*current).clone()
            },
            None => AccountListEntry {
                username: followed.username.clone(),
                display_name: followed.display_name.clone(),
                category: DEFAULT_CATEGORY.to_string(),
            },
        };
        accounts.push(entry);
    }

    let added = seen
        .iter()
        .filter(|key| !existing_map.contains_key(*key))
        .cloned()
        .collect();
    let removed = existing_map
        .keys()
        .filter(|key| !seen.contains(*key))
        .cloned()
        .collect();

    Reconciliation {
        accounts,
        added,
        removed,
    }
}

/// Resolves the follow list of the cookie owner. Tries the id listing first
/// and falls back to the paginated following listing if that fails.
pub async fn fetch_following(
    config: &Config,
    client: &dyn SocialClient,
    user_id: &str,
) -> Result<Vec<FollowedAccount>> {
    info!("Fetching following list...");

    let mut following = Vec::new();
    match client.following_ids(user_id).await {
        Ok(ids) => {
            info!("Found {} following IDs, resolving usernames...", ids.len());
            for id in ids {
                match client.user_by_id(&id).await {
                    Ok(account) => following.push(account),
                    Err(e) => warn!("Could not resolve user ID {}: {}", id, e),
                }
                tokio::time::sleep(config.resolve_delay).await;
            }
        }
        Err(e) => {
            warn!("Following id listing failed ({}), trying paginated following...", e);
            let mut cursor: Option<String> = None;
            loop {
                let page = client.following_page(user_id, cursor.as_deref()).await?;
                following.extend(page.accounts);
                info!("Fetched {} accounts so far...", following.len());
                match page.next_cursor {
                    Some(next) if !next.is_empty() => cursor = Some(next),
                    _ => break,
                }
                tokio::time::sleep(config.rate_limit_delay).await;
            }
        }
    }

    info!("Total following: {} accounts", following.len());
    Ok(following)
}

/// Brings `accounts.json` in line with the authenticated user's follow list.
pub async fn sync_accounts(config: &Config, client: &dyn SocialClient) -> Result<Reconciliation> {
    info!("Starting account sync...");

    config.setup_cookies_from_env()?;
    if !config.cookie_file.exists() {
        return Err(DigestError::MissingCredential(format!(
            "Cookie file not found: {}. Export your Twitter cookies first.",
            config.cookie_file.display()
        )));
    }
    let jar = CookieJar::load(&config.cookie_file)?;
    let user_id = jar.user_id()?;
    info!("User ID from cookies: {}", user_id);

    let screen_name = client
        .verify_session()
        .await
        .map_err(|e| DigestError::Authentication(e.to_string()))?;
    info!("Authenticated successfully (test fetch: @{})", screen_name);

    let fetched = fetch_following(config, client, &user_id).await?;
    if fetched.is_empty() {
        return Err(DigestError::General("No following accounts found, aborting".to_string()));
    }

    let existing = interfaces::state::load_account_list_or_default(&config.accounts_file)?;
    let reconciliation = reconcile(&existing, &fetched);
    reconciliation.log_changes();

    interfaces::state::save_account_list(&config.accounts_file, &reconciliation.accounts)?;
    info!(
        "accounts.json updated: {} accounts (was {})",
        reconciliation.accounts.len(),
        existing.len()
    );
    Ok(reconciliation)
}
