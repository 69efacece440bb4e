use anyhow::Result;

use feedpost_core::{storage::Database, AppConfig, Shutdown};

use super::{build_fetch_loop, build_reporter};

pub async fn run(config: &AppConfig, db: &Database) -> Result<()> {
    println!("Fetching all sources...\n");

    let fetcher = build_fetch_loop(config, db, build_reporter(config));
    let stats = fetcher.run_cycle(&Shutdown::never()).await?;

    println!(
        "\nFetch complete. {} sources, {} failed, {} new articles, {} filtered.",
        stats.sources, stats.failed, stats.inserted, stats.filtered
    );

    Ok(())
}
