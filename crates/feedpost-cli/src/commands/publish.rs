use anyhow::Result;

use feedpost_core::{scheduler::PublishOutcome, storage::Database, AppConfig, Shutdown};

use super::{build_publish_loop, build_reporter};

pub async fn run(config: &AppConfig, db: &Database) -> Result<()> {
    let publisher = build_publish_loop(config, db, build_reporter(config))?;

    match publisher.select_and_send(&Shutdown::never()).await? {
        PublishOutcome::Idle => println!("Nothing to publish."),
        PublishOutcome::Posted {
            article_id,
            summarized,
        } => {
            let note = if summarized { "" } else { " (without summary)" };
            println!("Published article {}{}.", article_id, note);
        }
    }

    Ok(())
}
