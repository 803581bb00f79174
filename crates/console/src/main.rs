//! `kitchenhub-console` entry point.
//!
//! ```text
//! kitchenhub-console login <id> [permission...]   write the identity record
//! kitchenhub-console logout                       remove the identity record
//! kitchenhub-console [check] [path...]            print the access report
//! ```

use anyhow::Context;
use tracing::{info, warn};

use kitchenhub_access::Destinations;
use kitchenhub_auth::{IdentityRecord, PermissionRecord, Registry};
use kitchenhub_console::{ConsoleConfig, HttpPermissionSource, SqliteIdentityStore, report};
use kitchenhub_session::{InitOutcome, SessionStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ConsoleConfig::from_env();
    kitchenhub_observability::init_with(
        config.log_format,
        kitchenhub_observability::tracing::DEFAULT_DIRECTIVE,
    );
    for warning in &config.warnings {
        warn!("{warning}");
    }

    let identities = SqliteIdentityStore::open(&config.db_path)
        .await
        .with_context(|| format!("failed to open identity store at {:?}", config.db_path))?;

    let mut args = std::env::args().skip(1);
    match args.next().as_deref() {
        Some("login") => {
            let id = args.next().context("usage: kitchenhub-console login <id> [permission...]")?;
            let keys: Vec<PermissionRecord> = args.map(PermissionRecord::new).collect();
            let mut record = IdentityRecord::new(id);
            if !keys.is_empty() {
                record = record.with_permissions(keys);
            }
            identities
                .put_identity(&record)
                .await
                .context("failed to write identity record")?;
            info!(identity_id = %record.id, "identity stored");
            Ok(())
        }
        Some("logout") => {
            let removed = identities
                .remove_identity()
                .await
                .context("failed to remove identity record")?;
            info!(removed, "identity removed");
            Ok(())
        }
        Some("check") => check(config, identities, args.collect()).await,
        Some(first) => {
            let paths = std::iter::once(first.to_string()).chain(args).collect();
            check(config, identities, paths).await
        }
        None => check(config, identities, Vec::new()).await,
    }
}

async fn check(
    config: ConsoleConfig,
    identities: SqliteIdentityStore,
    paths: Vec<String>,
) -> anyhow::Result<()> {
    let permissions = match &config.auth_token {
        Some(token) => HttpPermissionSource::with_token(config.api_url.as_str(), token.as_str()),
        None => HttpPermissionSource::new(config.api_url.as_str()),
    };

    let store = SessionStore::new(identities, permissions, config.session_config());
    let reconciler = store.spawn_reconciler();

    if let InitOutcome::Fetching(task) = store.initialize().await {
        if let Err(err) = task.join().await {
            warn!(error = %err, "permission fetch did not complete");
        }
    }

    let state = store.settled().await;
    let report = report::build(Registry::standard(), &Destinations::default(), &state, &paths);
    println!(
        "{}",
        serde_json::to_string_pretty(&report).context("failed to render report")?
    );

    reconciler.shutdown().await;
    Ok(())
}
