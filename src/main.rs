mod assembler;
mod batch;
mod batcher;
mod classifier;
mod config;
mod error;
mod importer;
mod memory_store;
mod naming;
mod neo4j_store;
mod resolver;
mod schema;
mod store;
mod summary;
mod value;

use anyhow::{Context, Result};
use config::Config;
use memory_store::InMemoryStore;
use neo4j_store::Neo4jStore;
use schema::SchemaRegistry;
use std::fs;
use summary::RunSummary;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("🚀 Graph ingest starting...");

    let config = Config::load();

    // Configuration and input problems abort before any write
    let schema = SchemaRegistry::from_path(&config.schema_path).context("Failed to load schema")?;
    let batches = batch::load_batches(&config.data_dir, &config.ignored_files)
        .context("Failed to load data batches")?;
    info!("✅ Loaded {} batches from {}", batches.len(), config.data_dir.display());

    let summary = if config.dry_run {
        info!("🧪 Dry run: building graph in memory");
        let mut store = InMemoryStore::new();
        let summary = importer::run_import(&mut store, &schema, &batches)
            .await
            .context("Import failed")?;
        info!(
            "   In-memory graph holds {} nodes and {} relationships",
            store.nodes().count(),
            store.relationships().count()
        );
        summary
    } else {
        let mut store = Neo4jStore::connect_with_retry(
            &config.neo4j_uri,
            &config.neo4j_user,
            &config.neo4j_password,
            config.connect_retries,
        )
        .await
        .context("Failed to connect to Neo4j")?;
        importer::run_import(&mut store, &schema, &batches)
            .await
            .context("Import failed")?
    };

    if let Some(path) = &config.report {
        write_report(path, &summary)?;
    }

    info!("👋 Import complete");
    Ok(())
}

fn write_report(path: &std::path::Path, summary: &RunSummary) -> Result<()> {
    let json = serde_json::to_string_pretty(summary).context("Failed to serialize run summary")?;
    fs::write(path, json).with_context(|| format!("Failed to write report to {}", path.display()))?;
    info!("📝 Wrote run summary to {}", path.display());
    Ok(())
}
