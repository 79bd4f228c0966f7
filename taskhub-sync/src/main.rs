//! # TaskHub Clerk Sync
//!
//! ```bash
//! cargo run -p taskhub-sync -- --dry-run
//! cargo run -p taskhub-sync -- --deactivate-missing
//! ```

use clap::Parser;
use taskhub_shared::db::pool;
use taskhub_shared::store::postgres::PgUserStore;
use taskhub_sync::{
    clerk::ClerkClient,
    config::SyncConfig,
    sync::{run_sync, SyncOptions},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Sync Clerk users with the local database
#[derive(Debug, Parser)]
#[command(name = "taskhub-sync", version)]
struct Args {
    /// Show what would be done without making changes
    #[arg(long)]
    dry_run: bool,

    /// Deactivate local users not found in Clerk
    #[arg(long)]
    deactivate_missing: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "taskhub_sync=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let config = SyncConfig::from_env()?;

    tracing::info!("Fetching users from Clerk...");
    let client = ClerkClient::new(&config.clerk_api_url, &config.clerk_secret_key)?;
    let users = client.fetch_all_users().await.map_err(|e| {
        tracing::error!(error = %e, "Failed to fetch Clerk users");
        e
    })?;
    tracing::info!(count = users.len(), "Fetched Clerk users");

    if args.dry_run {
        tracing::warn!("Dry run mode, no changes will be made");
    }

    let db = pool::create_pool(config.database.clone()).await?;
    let store = PgUserStore::new(db.clone());

    let options = SyncOptions {
        dry_run: args.dry_run,
        deactivate_missing: args.deactivate_missing,
    };
    let result = run_sync(&store, &users, options).await;
    pool::close_pool(db).await;

    let stats = result?;
    println!("{stats}");

    Ok(())
}
