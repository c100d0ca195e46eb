//! SQL statement generation.
//!
//! Statements are the only side-effecting output of the merge and prune
//! engines: parameterized SQL text plus positional values, tagged with the
//! owning table for diagnostics. The embedding platform applies each batch
//! inside a single transaction; the engine itself never touches a database.

use serde::{Deserialize, Serialize};

use crate::record::{Record, SqlValue};

/// Columns every syncable row carries for sync bookkeeping. These survive
/// tombstoning; everything else is user content and gets nulled.
pub const BOOKKEEPING_COLUMNS: &[&str] =
    &["Id", "CreatedAt", "UpdatedAt", "IsDeleted", "DeletedAt"];

/// A SQL statement with its parameter values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SqlStatement {
    /// Table the statement applies to.
    pub table: String,
    /// The SQL query with ? placeholders.
    pub sql: String,
    /// Parameter values in order.
    pub params: Vec<SqlValue>,
}

/// Generate an INSERT statement carrying all of the record's columns.
///
/// Uses INSERT OR REPLACE so re-applying an already-applied batch is
/// harmless. Columns keep the record's own order.
pub fn insert_record(table: &str, record: &Record) -> SqlStatement {
    let column_list = record.column_names().collect::<Vec<_>>().join(", ");
    let placeholders = record
        .column_names()
        .map(|_| "?")
        .collect::<Vec<_>>()
        .join(", ");
    let params: Vec<SqlValue> = record.iter().map(|(_, v)| v.clone()).collect();

    SqlStatement {
        table: table.to_string(),
        sql: format!(
            "INSERT OR REPLACE INTO {} ({}) VALUES ({})",
            table, column_list, placeholders
        ),
        params,
    }
}

/// Generate an UPDATE statement writing all of the record's columns except
/// `Id`, which only appears in the WHERE clause.
///
/// `where_id` is the id of the row being overwritten on the target
/// database. For composite-identity tables it is the local row's id, which
/// the winning server content is written over.
pub fn update_record(table: &str, record: &Record, where_id: &str) -> SqlStatement {
    let columns: Vec<&str> = record.column_names().filter(|c| *c != "Id").collect();

    let set_clause = columns
        .iter()
        .map(|c| format!("{} = ?", c))
        .collect::<Vec<_>>()
        .join(", ");

    let mut params: Vec<SqlValue> = record
        .iter()
        .filter(|(name, _)| *name != "Id")
        .map(|(_, v)| v.clone())
        .collect();
    params.push(SqlValue::Text(where_id.to_string()));

    SqlStatement {
        table: table.to_string(),
        sql: format!("UPDATE {} SET {} WHERE Id = ?", table, set_clause),
        params,
    }
}

/// Generate the tombstone-conversion UPDATE for an expired trashed row:
/// sets `IsDeleted = 1`, refreshes `UpdatedAt` to the prune time, and
/// clears every user-content column to NULL. Bookkeeping columns survive,
/// so the tombstone keeps only "this id was deleted at this time".
pub fn tombstone_record(table: &str, record: &Record, id: &str, pruned_at: &str) -> SqlStatement {
    let mut set_clause = String::from("IsDeleted = 1, UpdatedAt = ?");
    for name in record.column_names() {
        if !BOOKKEEPING_COLUMNS.contains(&name) {
            set_clause.push_str(", ");
            set_clause.push_str(name);
            set_clause.push_str(" = NULL");
        }
    }

    SqlStatement {
        table: table.to_string(),
        sql: format!("UPDATE {} SET {} WHERE Id = ?", table, set_clause),
        params: vec![
            SqlValue::Text(pruned_at.to_string()),
            SqlValue::Text(id.to_string()),
        ],
    }
}
