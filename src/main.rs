use anyhow::Context;
use clap::Parser;
use ip_allowlist_sync::utils::logger;
use ip_allowlist_sync::{CliConfig, GitHubClient, SyncEngine, SyncError};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    logger::init_cli_logger(cli.verbose, cli.log_format);
    tracing::info!("Starting ip-allowlist-sync");

    let config = match cli.resolve() {
        Ok(config) => config,
        Err(e) => fail(e),
    };
    tracing::debug!("Resolved config: {:?}", config);

    let client = GitHubClient::from_config(&config).context("failed to build the GitHub API client")?;
    let engine = SyncEngine::new(client, config);

    match engine.run().await {
        Ok(report) => {
            tracing::info!(
                "✅ IP allow list is in sync ({} created, {} updated, {} unchanged)",
                report.created,
                report.updated,
                report.unchanged
            );
            Ok(())
        }
        Err(e) => fail(e),
    }
}

fn fail(e: SyncError) -> ! {
    tracing::error!("❌ IP allow list sync failed: {} (Category: {:?})", e, e.category());
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    // Surface the failure as a workflow annotation when running as an action step
    if std::env::var("GITHUB_ACTIONS").as_deref() == Ok("true") {
        println!("::error::{}", e);
    } else {
        eprintln!("❌ {}", e);
    }

    std::process::exit(e.exit_code());
}
