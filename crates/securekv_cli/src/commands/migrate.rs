//! Migration command.

use super::Format;
use securekv_core::SecureStore;
use serde::Serialize;
use tracing::info;

/// Migration summary.
#[derive(Debug, Serialize)]
pub struct MigrateResult {
    /// Current physical store.
    pub store: String,
    /// Legacy physical store.
    pub legacy_store: String,
    /// Keys moved into the current store.
    pub migrated: Vec<String>,
    /// Stale legacy copies of keys the current store already held.
    pub superseded: Vec<String>,
    /// Entries left in the legacy store.
    pub failed: Vec<FailedEntry>,
}

/// A legacy entry that was not migrated.
#[derive(Debug, Serialize)]
pub struct FailedEntry {
    /// Physical key.
    pub key: String,
    /// Reason.
    pub error: String,
}

/// Initializes the store, which migrates legacy entries, and prints the report.
pub fn run(store: &SecureStore, format: Format) -> Result<(), Box<dyn std::error::Error>> {
    let config = store.config();
    info!(store = %config.store_name, legacy = %config.legacy_store_name, "running migration");

    store.initialize()?;
    let report = store.last_migration().unwrap_or_default();

    let result = MigrateResult {
        store: config.store_name.clone(),
        legacy_store: config.legacy_store_name.clone(),
        migrated: report.migrated,
        superseded: report.superseded,
        failed: report
            .failed
            .into_iter()
            .map(|f| FailedEntry {
                key: f.key,
                error: f.error,
            })
            .collect(),
    };

    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&result)?),
        Format::Text => print_text(&result),
    }
    Ok(())
}

fn print_text(result: &MigrateResult) {
    println!("Migration Report");
    println!("================");
    println!("  Store:        {}", result.store);
    println!("  Legacy store: {}", result.legacy_store);
    println!("  Migrated:     {}", result.migrated.len());
    println!("  Superseded:   {}", result.superseded.len());
    println!("  Failed:       {}", result.failed.len());

    if !result.failed.is_empty() {
        println!("\nLeft in legacy store:");
        for entry in &result.failed {
            println!("  {}: {}", entry.key, entry.error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use securekv_core::StorageConfig;

    #[test]
    fn run_on_empty_store() {
        let store = SecureStore::in_memory(StorageConfig::default());
        run(&store, Format::Json).unwrap();
        assert!(store.last_migration().unwrap().is_noop());
    }
}
