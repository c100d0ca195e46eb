//! Vault merge engine using the Last-Write-Wins (LWW) strategy.
//!
//! Given snapshots of the local and the server database, the engine
//! computes the list of SQL statements that bring the local syncable
//! tables in line with the merged truth. Tables are processed in the
//! registry's dependency order (parents before rows referencing them), so
//! applying the statement batch in order never violates referential
//! integrity on the target database.
//!
//! The engine is a pure function: no clock reads, no randomness, no I/O.
//! Calling it twice with identical snapshots returns byte-identical
//! output, which the cross-platform conformance suite depends on.

mod reconcile;

use serde::{Deserialize, Serialize};

use crate::error::VaultResult;
use crate::snapshot::VaultSnapshot;
use crate::statement::SqlStatement;
use crate::tables::SYNCABLE_TABLES;

/// Input payload for the merge operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeInput {
    /// Snapshot of the local database.
    pub local: VaultSnapshot,
    /// Snapshot of the authoritative server copy.
    pub server: VaultSnapshot,
}

/// Per-table merge counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "uniffi", derive(uniffi::Record))]
pub struct TableMergeStats {
    /// Table name.
    pub table: String,
    /// Rows inserted from the server.
    pub inserted: u32,
    /// Rows overwritten with the server's version.
    pub updated: u32,
    /// Rows left untouched (local wins, rows identical, or local-only).
    pub unchanged: u32,
}

impl TableMergeStats {
    fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            ..Self::default()
        }
    }
}

/// Statistics about what was merged. Diagnostic output for logging and
/// telemetry; callers must never branch on these.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "uniffi", derive(uniffi::Record))]
pub struct MergeStats {
    /// Number of registry tables present in at least one snapshot.
    pub tables_processed: u32,
    /// Total rows inserted from the server.
    pub inserted: u32,
    /// Total rows overwritten with the server's version.
    pub updated: u32,
    /// Total rows left untouched.
    pub unchanged: u32,
    /// Per-table breakdown, in registry order.
    pub tables: Vec<TableMergeStats>,
}

/// Output of the merge operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeOutput {
    /// SQL statements to execute on the local database, in order, inside
    /// one transaction.
    pub statements: Vec<SqlStatement>,
    /// Overall statistics.
    pub stats: MergeStats,
}

/// Main entry point: merge the server snapshot into the local one.
///
/// # Arguments
/// * `local` - snapshot of the database the statements will be applied to
/// * `server` - snapshot of the authoritative server copy
///
/// # Returns
/// MergeOutput with SQL statements to execute on the local database.
/// Fails with `InvalidInput` if either snapshot carries a table outside
/// the syncable registry or a row missing its bookkeeping columns.
pub fn merge_vaults(local: &VaultSnapshot, server: &VaultSnapshot) -> VaultResult<MergeOutput> {
    local.validate()?;
    server.validate()?;

    let mut statements: Vec<SqlStatement> = Vec::new();
    let mut stats = MergeStats::default();

    for config in SYNCABLE_TABLES {
        let local_table = local.table(config.name);
        let server_table = server.table(config.name);

        // Skip tables absent from both snapshots; a table absent from one
        // side is an empty row set (older-schema clients still merge).
        if local_table.is_none() && server_table.is_none() {
            continue;
        }

        let local_records = local_table.map(|t| t.records.as_slice()).unwrap_or_default();
        let server_records = server_table
            .map(|t| t.records.as_slice())
            .unwrap_or_default();

        let (table_statements, table_stats) =
            reconcile::reconcile_table(config, local_records, server_records)?;

        stats.inserted += table_stats.inserted;
        stats.updated += table_stats.updated;
        stats.unchanged += table_stats.unchanged;
        stats.tables_processed += 1;
        stats.tables.push(table_stats);
        statements.extend(table_statements);
    }

    Ok(MergeOutput { statements, stats })
}

/// Merge a JSON string input and return JSON string output.
/// Convenience function for the binding surfaces.
pub fn merge_vaults_json(input_json: &str) -> VaultResult<String> {
    let input: MergeInput = serde_json::from_str(input_json)?;
    let output = merge_vaults(&input.local, &input.server)?;
    let output_json = serde_json::to_string(&output)?;
    Ok(output_json)
}
