use anyhow::{bail, Result};

use feedpost_core::{
    feed::{probe_feed, NewSource, Source},
    storage::{Database, SourceRepository},
    AppConfig, Error,
};

pub async fn add(
    db: &Database,
    config: &AppConfig,
    name: &str,
    url: &str,
    priority: i64,
    insecure: bool,
) -> Result<()> {
    let repo = SourceRepository::new(db);
    if let Some(existing) = repo.find_by_url(url).await? {
        println!("Already added as '{}' (id {}).", existing.name, existing.id);
        return Ok(());
    }

    println!("Checking feed: {}", url);
    let items = match probe_feed(url, insecure, config.sync.probe_timeout()).await {
        Ok(items) => items,
        Err(e) => bail!("Feed check failed, source not added: {}", e),
    };

    let id = repo
        .add(&NewSource {
            name: name.trim().to_string(),
            feed_url: url.to_string(),
            priority,
            insecure,
        })
        .await?;

    println!("Added source '{}' (id {}), feed has {} items.", name.trim(), id, items);
    Ok(())
}

pub async fn list(db: &Database) -> Result<()> {
    let sources = SourceRepository::new(db).list_all().await?;

    if sources.is_empty() {
        println!("No sources yet.");
        println!("\nTo add a feed, run:");
        println!("  feedpost source add --name <name> --url <url>");
        return Ok(());
    }

    println!("Sources ({}):\n", sources.len());
    for source in &sources {
        print_source(source);
        println!();
    }

    Ok(())
}

pub async fn get(db: &Database, id: i64) -> Result<()> {
    match SourceRepository::new(db).find_by_id(id).await? {
        Some(source) => print_source(&source),
        None => bail!(Error::SourceNotFound(id)),
    }
    Ok(())
}

pub async fn set_priority(db: &Database, id: i64, priority: i64) -> Result<()> {
    SourceRepository::new(db).set_priority(id, priority).await?;
    println!("Source {} priority set to {}.", id, priority);
    Ok(())
}

pub async fn delete(db: &Database, id: i64) -> Result<()> {
    if !SourceRepository::new(db).delete(id).await? {
        bail!(Error::SourceNotFound(id));
    }
    println!("Source {} deleted.", id);
    Ok(())
}

fn print_source(source: &Source) {
    let insecure = if source.insecure { " [insecure TLS]" } else { "" };
    println!("  #{} {} (priority {}){}", source.id, source.name, source.priority, insecure);
    println!("    URL: {}", source.feed_url);
    println!("    Added: {}", source.created_at.format("%Y-%m-%d %H:%M"));
}
