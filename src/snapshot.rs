//! Snapshot payload shape crossing the platform boundary.
//!
//! The embedding platform reads the syncable tables of a decrypted vault
//! database into a [`VaultSnapshot`] (`{ "tables": [{ "name", "records" }] }`
//! as JSON) and hands it to the merge or prune engine. The engine never
//! opens a database connection; it only ever sees this shape.

use serde::{Deserialize, Serialize};

use crate::error::{VaultError, VaultResult};
use crate::record::Record;
use crate::tables::find_table;

/// Version of the snapshot/statement contract: the payload schema plus the
/// syncable table list. Bumped on any breaking change so embedders can
/// detect a mismatch between the native core and the platform layer.
pub const CONTRACT_VERSION: u32 = 1;

/// Data for a single table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableData {
    /// Table name.
    pub name: String,
    /// All records in this table.
    pub records: Vec<Record>,
}

/// The syncable tables of one vault database.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VaultSnapshot {
    /// Tables read from the database. A registry table that is absent is
    /// treated as an empty row set (clients one schema migration behind
    /// still merge); tables outside the registry are rejected.
    pub tables: Vec<TableData>,
}

impl VaultSnapshot {
    /// Create an empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a table by name.
    pub fn table(&self, name: &str) -> Option<&TableData> {
        self.tables.iter().find(|t| t.name == name)
    }

    /// Check the snapshot's table list against the syncable-table registry.
    ///
    /// A table name outside the registry, or the same table listed twice,
    /// indicates schema drift between client versions and fails with
    /// `InvalidInput` rather than being silently ignored.
    pub fn validate(&self) -> VaultResult<()> {
        for (index, table) in self.tables.iter().enumerate() {
            if find_table(&table.name).is_none() {
                return Err(VaultError::InvalidInput(format!(
                    "'{}' is not a syncable table",
                    table.name
                )));
            }
            if self.tables[..index].iter().any(|t| t.name == table.name) {
                return Err(VaultError::InvalidInput(format!(
                    "table '{}' appears more than once in the snapshot",
                    table.name
                )));
            }
        }
        Ok(())
    }
}
