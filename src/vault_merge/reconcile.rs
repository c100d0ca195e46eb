//! Row-level reconciliation for a single table.
//!
//! Pure functions: given the local and server row sets of one table, decide
//! per row which side wins and emit the statements that bring the local
//! table in line with the winner. All validation failures are `InvalidInput`
//! and abort the whole merge - a malformed row indicates schema drift
//! between client versions and must not be silently ignored.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};

use crate::error::{VaultError, VaultResult};
use crate::record::{parse_timestamp, Record, SqlValue};
use crate::statement::{insert_record, update_record, SqlStatement};
use crate::tables::TableConfig;

use super::TableMergeStats;

/// Reconcile one table, dispatching on its identity scheme.
///
/// Statements come back in server-record input order, which keeps the
/// output byte-identical across calls with the same snapshots.
pub(crate) fn reconcile_table(
    config: &TableConfig,
    local_records: &[Record],
    server_records: &[Record],
) -> VaultResult<(Vec<SqlStatement>, TableMergeStats)> {
    if config.uses_composite_identity() {
        reconcile_by_identity(config, local_records, server_records)
    } else {
        reconcile_by_id(config, local_records, server_records)
    }
}

/// The validated bookkeeping columns of a row.
struct RowKey<'a> {
    id: &'a str,
    updated_at: DateTime<Utc>,
}

fn validate_row<'a>(table: &str, record: &'a Record) -> VaultResult<RowKey<'a>> {
    let id = match record.get("Id") {
        None => {
            return Err(VaultError::InvalidInput(format!(
                "{} row is missing 'Id'",
                table
            )))
        }
        Some(value) => value.as_text().ok_or_else(|| {
            VaultError::InvalidInput(format!("{} row has a non-text 'Id'", table))
        })?,
    };

    let updated_at = match record.get("UpdatedAt") {
        None => {
            return Err(VaultError::InvalidInput(format!(
                "{} row {} is missing 'UpdatedAt'",
                table, id
            )))
        }
        Some(value) => {
            let text = value.as_text().ok_or_else(|| {
                VaultError::InvalidInput(format!(
                    "{} row {} has a non-text 'UpdatedAt'",
                    table, id
                ))
            })?;
            parse_timestamp(text).ok_or_else(|| {
                VaultError::InvalidInput(format!(
                    "{} row {} has an unparseable 'UpdatedAt': '{}'",
                    table, id, text
                ))
            })?
        }
    };

    Ok(RowKey { id, updated_at })
}

/// Whole-row LWW comparison: returns true when the server row should
/// overwrite the local row.
///
/// The row with the strictly greater `UpdatedAt` wins in full. Equal
/// timestamps fall back to a rule that depends only on row content, so
/// both replicas resolve the same winner regardless of which side is
/// "local": the live row beats a tombstone; between rows with the same
/// deleted state, the bytewise-greater canonical encoding wins, compared
/// over the union of both rows' column names with absent columns reading
/// as NULL; equal encodings mean the rows hold the same content and
/// nothing needs to be written.
fn server_wins(
    server: &Record,
    server_ts: DateTime<Utc>,
    local: &Record,
    local_ts: DateTime<Utc>,
    identity_excluded: &[&str],
) -> bool {
    if server_ts != local_ts {
        return server_ts > local_ts;
    }

    match (server.is_tombstoned(), local.is_tombstoned()) {
        (false, true) => true,
        (true, false) => false,
        _ => {
            let names = union_column_names(server, local, identity_excluded);
            server.canonical_bytes_over(&names) > local.canonical_bytes_over(&names)
        }
    }
}

/// Column names of both rows combined, minus the excluded ones.
fn union_column_names<'a>(a: &'a Record, b: &'a Record, excluded: &[&str]) -> Vec<&'a str> {
    a.column_names()
        .chain(b.column_names())
        .filter(|name| !excluded.contains(name))
        .collect()
}

/// Build the UPDATE that rewrites the losing local row as the winning
/// server row. Columns only the local row carries are set to NULL, so
/// applying the statement reproduces the winner over the union of both
/// column sets instead of leaving drifted columns behind.
fn materialize_winner(
    table: &str,
    server: &Record,
    local: &Record,
    where_id: &str,
) -> SqlStatement {
    let mut winner = server.clone();
    for name in local.column_names() {
        if name != "Id" && winner.get(name).is_none() {
            winner.insert(name, SqlValue::Null);
        }
    }
    update_record(table, &winner, where_id)
}

/// Reconcile a table whose rows match on the "Id" column.
fn reconcile_by_id(
    config: &TableConfig,
    local_records: &[Record],
    server_records: &[Record],
) -> VaultResult<(Vec<SqlStatement>, TableMergeStats)> {
    let mut stats = TableMergeStats::new(config.name);
    let mut statements: Vec<SqlStatement> = Vec::new();

    let mut local_map: HashMap<&str, (&Record, DateTime<Utc>)> =
        HashMap::with_capacity(local_records.len());
    for record in local_records {
        let key = validate_row(config.name, record)?;
        if local_map.insert(key.id, (record, key.updated_at)).is_some() {
            return Err(VaultError::InvalidInput(format!(
                "{} has duplicate rows for id {}",
                config.name, key.id
            )));
        }
    }

    let mut server_ids: HashSet<&str> = HashSet::with_capacity(server_records.len());
    for server_record in server_records {
        let key = validate_row(config.name, server_record)?;
        if !server_ids.insert(key.id) {
            return Err(VaultError::InvalidInput(format!(
                "{} has duplicate rows for id {}",
                config.name, key.id
            )));
        }

        match local_map.get(key.id) {
            None => {
                // Present only on the server: bring it over in full.
                statements.push(insert_record(config.name, server_record));
                stats.inserted += 1;
            }
            Some((local_record, local_ts)) => {
                if server_wins(server_record, key.updated_at, local_record, *local_ts, &[]) {
                    statements.push(materialize_winner(
                        config.name,
                        server_record,
                        local_record,
                        key.id,
                    ));
                    stats.updated += 1;
                } else {
                    stats.unchanged += 1;
                }
            }
        }
    }

    // Rows present only locally are pending local changes and stay untouched.
    stats.unchanged += local_map
        .keys()
        .filter(|id| !server_ids.contains(*id))
        .count() as u32;

    Ok((statements, stats))
}

/// A surviving row of a composite-identity table after intra-side dedup.
struct IdentityRow<'a> {
    identity: String,
    record: &'a Record,
    id: &'a str,
    updated_at: DateTime<Utc>,
}

/// Reconcile a table whose rows match on concatenated identity columns
/// instead of "Id" (e.g. FieldValues on ItemId + FieldKey). The winning
/// server content is written over the matching local row while the local
/// row keeps its own id, so two devices that independently created the
/// same field converge on one value per identity.
fn reconcile_by_identity(
    config: &TableConfig,
    local_records: &[Record],
    server_records: &[Record],
) -> VaultResult<(Vec<SqlStatement>, TableMergeStats)> {
    let mut stats = TableMergeStats::new(config.name);
    let mut statements: Vec<SqlStatement> = Vec::new();

    let local_rows = latest_by_identity(config, local_records)?;
    let server_rows = latest_by_identity(config, server_records)?;

    let local_by_identity: HashMap<&str, &IdentityRow> = local_rows
        .iter()
        .map(|row| (row.identity.as_str(), row))
        .collect();

    let mut server_identities: HashSet<&str> = HashSet::with_capacity(server_rows.len());
    for server_row in &server_rows {
        server_identities.insert(server_row.identity.as_str());

        match local_by_identity.get(server_row.identity.as_str()) {
            None => {
                statements.push(insert_record(config.name, server_row.record));
                stats.inserted += 1;
            }
            Some(local_row) => {
                // Row identity lives in the identity columns, not "Id", so
                // content comparison skips the id each side generated.
                if server_wins(
                    server_row.record,
                    server_row.updated_at,
                    local_row.record,
                    local_row.updated_at,
                    &["Id"],
                ) {
                    statements.push(materialize_winner(
                        config.name,
                        server_row.record,
                        local_row.record,
                        local_row.id,
                    ));
                    stats.updated += 1;
                } else {
                    stats.unchanged += 1;
                }
            }
        }
    }

    stats.unchanged += local_rows
        .iter()
        .filter(|row| !server_identities.contains(row.identity.as_str()))
        .count() as u32;

    Ok((statements, stats))
}

/// Collapse one side's rows to one row per composite identity, keeping the
/// row with the latest `UpdatedAt`. The surviving row keeps the position of
/// its identity's first occurrence, so output order stays deterministic.
fn latest_by_identity<'a>(
    config: &TableConfig,
    records: &'a [Record],
) -> VaultResult<Vec<IdentityRow<'a>>> {
    let mut rows: Vec<IdentityRow<'a>> = Vec::with_capacity(records.len());
    let mut slot_by_identity: HashMap<String, usize> = HashMap::with_capacity(records.len());

    for record in records {
        let key = validate_row(config.name, record)?;
        let identity = composite_identity(config, record, key.id)?;

        match slot_by_identity.get(&identity) {
            None => {
                slot_by_identity.insert(identity.clone(), rows.len());
                rows.push(IdentityRow {
                    identity,
                    record,
                    id: key.id,
                    updated_at: key.updated_at,
                });
            }
            Some(&slot) => {
                if key.updated_at > rows[slot].updated_at {
                    rows[slot] = IdentityRow {
                        identity,
                        record,
                        id: key.id,
                        updated_at: key.updated_at,
                    };
                }
            }
        }
    }

    Ok(rows)
}

/// Concatenate the identity column values with ":" to form the match key.
fn composite_identity(config: &TableConfig, record: &Record, id: &str) -> VaultResult<String> {
    let mut parts: Vec<&str> = Vec::with_capacity(config.identity_columns.len());
    for column in config.identity_columns {
        let value = record.get(column).ok_or_else(|| {
            VaultError::InvalidInput(format!(
                "{} row {} is missing identity column '{}'",
                config.name, id, column
            ))
        })?;
        let text = value.as_text().ok_or_else(|| {
            VaultError::InvalidInput(format!(
                "{} row {} has a non-text identity column '{}'",
                config.name, id, column
            ))
        })?;
        parts.push(text);
    }
    Ok(parts.join(":"))
}
