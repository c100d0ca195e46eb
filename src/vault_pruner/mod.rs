//! Retention pruner for expired trash rows.
//!
//! Rows a user moves to the trash keep their content (`DeletedAt` set,
//! `IsDeleted` still 0) so they can be restored. Once a row has sat in the
//! trash for longer than the retention period the pruner converts it into a
//! tombstone: one UPDATE per expired row that sets `IsDeleted = 1`, stamps
//! `UpdatedAt`, and nulls every content column. The tombstone then syncs to
//! other devices through the regular merge path, so no cascading deletes of
//! related rows are emitted here.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{VaultError, VaultResult};
use crate::record::{format_timestamp, parse_timestamp, SqlValue};
use crate::snapshot::VaultSnapshot;
use crate::statement::{tombstone_record, SqlStatement};
use crate::tables::SYNCABLE_TABLES;

/// How long trashed rows are kept before they are tombstoned.
pub const DEFAULT_RETENTION_DAYS: u32 = 30;

/// Input for the prune operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PruneInput {
    /// Current state of the local database.
    pub snapshot: VaultSnapshot,
    /// Current time in ISO 8601 format with UTC timezone
    /// (`YYYY-MM-DDTHH:MM:SS.sssZ`).
    ///
    /// Callers should use:
    /// - JavaScript: `new Date().toISOString()`
    /// - C#: `DateTime.UtcNow.ToString("yyyy-MM-ddTHH:mm:ss.fffZ")`
    /// - Swift: `ISO8601DateFormatter().string(from: Date())`
    pub current_time: String,
    /// Retention period in days (default: 30).
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
}

fn default_retention_days() -> u32 {
    DEFAULT_RETENTION_DAYS
}

/// Output of the prune operation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PruneOutput {
    /// SQL statements to execute on the local database, one per expired row.
    pub statements: Vec<SqlStatement>,
    /// Number of rows converted into tombstones.
    pub pruned_count: u32,
}

/// Scans the snapshot for trashed rows whose `DeletedAt` is strictly older
/// than `now - retention_days` and emits a tombstone UPDATE for each.
///
/// Rows that are already tombstoned and rows with no `DeletedAt` are left
/// alone. A trashed row exactly at the retention boundary is kept.
pub fn prune_vault(
    snapshot: &VaultSnapshot,
    retention_days: u32,
    now: DateTime<Utc>,
) -> VaultResult<PruneOutput> {
    snapshot.validate()?;

    let cutoff = now
        .checked_sub_signed(Duration::days(i64::from(retention_days)))
        .ok_or_else(|| {
            VaultError::InvalidInput(format!(
                "retention window of {} days is out of range",
                retention_days
            ))
        })?;
    let pruned_at = format_timestamp(&now);
    let mut statements = Vec::new();

    for config in SYNCABLE_TABLES.iter().filter(|c| c.trashable) {
        let table = match snapshot.table(config.name) {
            Some(table) => table,
            None => continue,
        };

        for record in &table.records {
            if record.is_tombstoned() {
                continue;
            }
            let deleted_at = match record.get("DeletedAt") {
                None | Some(SqlValue::Null) => continue,
                Some(SqlValue::Text(s)) => parse_timestamp(s).ok_or_else(|| {
                    VaultError::InvalidInput(format!(
                        "{} row has unparseable 'DeletedAt': '{}'",
                        config.name, s
                    ))
                })?,
                Some(_) => {
                    return Err(VaultError::InvalidInput(format!(
                        "{} row has a non-text 'DeletedAt'",
                        config.name
                    )));
                }
            };

            if deleted_at >= cutoff {
                continue;
            }

            let id = record.id().ok_or_else(|| {
                VaultError::InvalidInput(format!("{} row is missing a text 'Id'", config.name))
            })?;
            statements.push(tombstone_record(config.name, record, id, &pruned_at));
        }
    }

    let pruned_count = statements.len() as u32;
    Ok(PruneOutput {
        statements,
        pruned_count,
    })
}

/// JSON wrapper around [`prune_vault`] for FFI callers.
pub fn prune_vault_json(input_json: &str) -> VaultResult<String> {
    let input: PruneInput = serde_json::from_str(input_json)?;
    let now = parse_timestamp(&input.current_time).ok_or_else(|| {
        VaultError::InvalidInput(format!(
            "unparseable 'current_time': '{}'",
            input.current_time
        ))
    })?;
    let output = prune_vault(&input.snapshot, input.retention_days, now)?;
    Ok(serde_json::to_string(&output)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Record, SqlValue};
    use crate::snapshot::TableData;

    fn now() -> DateTime<Utc> {
        parse_timestamp("2024-02-15T12:00:00.000Z").unwrap()
    }

    fn trashed_item(id: &str, deleted_at: &str) -> Record {
        let mut record = Record::new();
        record.insert("Id", id.into());
        record.insert("Name", "old login".into());
        record.insert("CreatedAt", "2024-01-01T00:00:00.000Z".into());
        record.insert("UpdatedAt", deleted_at.into());
        record.insert("IsDeleted", 0i64.into());
        record.insert("DeletedAt", deleted_at.into());
        record
    }

    fn items_snapshot(records: Vec<Record>) -> VaultSnapshot {
        VaultSnapshot {
            tables: vec![TableData {
                name: "Items".to_string(),
                records,
            }],
        }
    }

    #[test]
    fn test_trash_older_than_retention_is_pruned() {
        // Trashed 31 days before `now`.
        let snapshot = items_snapshot(vec![trashed_item("1", "2024-01-15T11:00:00.000Z")]);

        let output = prune_vault(&snapshot, 30, now()).unwrap();

        assert_eq!(output.pruned_count, 1);
        assert_eq!(output.statements.len(), 1);
        assert_eq!(output.statements[0].table, "Items");
    }

    #[test]
    fn test_recent_trash_is_kept() {
        // Trashed 29 days before `now`.
        let snapshot = items_snapshot(vec![trashed_item("1", "2024-01-17T12:00:00.000Z")]);

        let output = prune_vault(&snapshot, 30, now()).unwrap();

        assert_eq!(output.pruned_count, 0);
        assert!(output.statements.is_empty());
    }

    #[test]
    fn test_trash_exactly_at_boundary_is_kept() {
        // DeletedAt equal to the cutoff is not strictly older.
        let snapshot = items_snapshot(vec![trashed_item("1", "2024-01-16T12:00:00.000Z")]);

        let output = prune_vault(&snapshot, 30, now()).unwrap();

        assert_eq!(output.pruned_count, 0);
    }

    #[test]
    fn test_tombstone_statement_shape() {
        let snapshot = items_snapshot(vec![trashed_item("1", "2024-01-01T00:00:00.000Z")]);

        let output = prune_vault(&snapshot, 30, now()).unwrap();
        let stmt = &output.statements[0];

        assert!(stmt.sql.starts_with("UPDATE Items SET IsDeleted = 1, UpdatedAt = ?"));
        assert!(stmt.sql.contains("Name = NULL"));
        // The tombstone keeps its bookkeeping columns, including when the
        // row was deleted.
        assert!(!stmt.sql.contains("DeletedAt"));
        assert!(!stmt.sql.contains("CreatedAt = NULL"));
        assert!(stmt.sql.ends_with("WHERE Id = ?"));
        assert_eq!(
            stmt.params,
            vec![
                SqlValue::Text("2024-02-15T12:00:00.000Z".into()),
                SqlValue::Text("1".into()),
            ]
        );
    }

    #[test]
    fn test_already_tombstoned_rows_are_skipped() {
        let mut record = trashed_item("1", "2023-06-01T00:00:00.000Z");
        record.insert("IsDeleted", 1i64.into());
        record.insert("Name", SqlValue::Null);

        let output = prune_vault(&items_snapshot(vec![record]), 30, now()).unwrap();

        assert_eq!(output.pruned_count, 0);
    }

    #[test]
    fn test_rows_not_in_trash_are_skipped() {
        let mut live = Record::new();
        live.insert("Id", "1".into());
        live.insert("Name", "active login".into());
        live.insert("UpdatedAt", "2023-06-01T00:00:00.000Z".into());
        live.insert("IsDeleted", 0i64.into());

        let mut null_deleted_at = live.clone();
        null_deleted_at.insert("Id", "2".into());
        null_deleted_at.insert("DeletedAt", SqlValue::Null);

        let output = prune_vault(&items_snapshot(vec![live, null_deleted_at]), 30, now()).unwrap();

        assert_eq!(output.pruned_count, 0);
    }

    #[test]
    fn test_only_trashable_tables_are_scanned() {
        // Folders carry no trash flow, so an old DeletedAt there is ignored.
        let snapshot = VaultSnapshot {
            tables: vec![TableData {
                name: "Folders".to_string(),
                records: vec![trashed_item("f1", "2023-01-01T00:00:00.000Z")],
            }],
        };

        let output = prune_vault(&snapshot, 30, now()).unwrap();

        assert_eq!(output.pruned_count, 0);
    }

    #[test]
    fn test_unparseable_deleted_at_fails() {
        let mut record = trashed_item("1", "2024-01-01T00:00:00.000Z");
        record.insert("DeletedAt", "a while ago".into());

        let err = prune_vault(&items_snapshot(vec![record]), 30, now()).unwrap_err();

        assert_eq!(err.kind(), "invalid_input");
        assert!(err.to_string().contains("DeletedAt"));
    }

    #[test]
    fn test_non_text_deleted_at_fails() {
        let mut record = trashed_item("1", "2024-01-01T00:00:00.000Z");
        record.insert("DeletedAt", 1704067200i64.into());

        let err = prune_vault(&items_snapshot(vec![record]), 30, now()).unwrap_err();

        assert!(err.to_string().contains("non-text 'DeletedAt'"));
    }

    #[test]
    fn test_prune_vault_json_defaults_retention_to_thirty_days() {
        let input = serde_json::json!({
            "snapshot": {
                "tables": [{
                    "name": "Items",
                    "records": [{
                        "Id": "1",
                        "Name": "old login",
                        "CreatedAt": "2024-01-01T00:00:00.000Z",
                        "UpdatedAt": "2024-01-10T00:00:00.000Z",
                        "IsDeleted": 0,
                        "DeletedAt": "2024-01-10T00:00:00.000Z"
                    }]
                }]
            },
            "current_time": "2024-02-15T12:00:00.000Z"
        });

        let output_json = prune_vault_json(&input.to_string()).unwrap();
        let output: PruneOutput = serde_json::from_str(&output_json).unwrap();

        assert_eq!(output.pruned_count, 1);
    }

    #[test]
    fn test_prune_vault_json_rejects_bad_current_time() {
        let input = serde_json::json!({
            "snapshot": { "tables": [] },
            "current_time": "not a timestamp"
        });

        let err = prune_vault_json(&input.to_string()).unwrap_err();

        assert_eq!(err.kind(), "invalid_input");
        assert!(err.to_string().contains("current_time"));
    }

    #[test]
    fn test_custom_retention_period() {
        // Trashed 10 days ago: kept at 30 days, pruned at 7.
        let snapshot = items_snapshot(vec![trashed_item("1", "2024-02-05T12:00:00.000Z")]);

        assert_eq!(prune_vault(&snapshot, 30, now()).unwrap().pruned_count, 0);
        assert_eq!(prune_vault(&snapshot, 7, now()).unwrap().pruned_count, 1);
    }

    #[test]
    fn test_retention_beyond_calendar_range_fails() {
        // Retention periods larger than the representable date range must
        // come back as a typed error, not a panic.
        let snapshot = items_snapshot(vec![trashed_item("1", "2024-01-01T00:00:00.000Z")]);

        let err = prune_vault(&snapshot, u32::MAX, now()).unwrap_err();

        assert_eq!(err.kind(), "invalid_input");
        assert!(err.to_string().contains("retention window"));
    }
}
