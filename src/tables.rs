//! The fixed registry of syncable tables.
//!
//! Only rows in these tables participate in cross-device reconciliation;
//! local-only configuration tables are excluded. The list is an explicitly
//! enumerated constant shared verbatim by every platform embedding the
//! engine - it is not derived from database introspection, so merge
//! semantics stay independent of schema-migration ordering. Any drift
//! between platforms breaks convergence, which is why changing this list
//! requires bumping [`CONTRACT_VERSION`](crate::snapshot::CONTRACT_VERSION).

/// Configuration for a syncable table.
#[derive(Debug, Clone)]
pub struct TableConfig {
    /// Table name in the database.
    pub name: &'static str,
    /// Columns forming the row identity for merge matching.
    /// When empty, rows match on the "Id" column.
    /// When set, these columns are concatenated to form a composite identity.
    pub identity_columns: &'static [&'static str],
    /// Tables this table references by foreign id. Every referenced table
    /// must appear earlier in [`SYNCABLE_TABLES`] so that applying merge
    /// statements in registry order never violates referential integrity.
    pub references: &'static [&'static str],
    /// Whether rows can sit in the trash (`DeletedAt` set) before being
    /// tombstoned by the retention pruner.
    pub trashable: bool,
}

impl TableConfig {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            identity_columns: &[],
            references: &[],
            trashable: false,
        }
    }

    pub const fn with_identity(mut self, columns: &'static [&'static str]) -> Self {
        self.identity_columns = columns;
        self
    }

    pub const fn with_references(mut self, tables: &'static [&'static str]) -> Self {
        self.references = tables;
        self
    }

    pub const fn trashable(mut self) -> Self {
        self.trashable = true;
        self
    }

    /// Returns true if this table matches rows by a composite identity
    /// instead of the "Id" column.
    pub const fn uses_composite_identity(&self) -> bool {
        !self.identity_columns.is_empty()
    }
}

/// All tables that participate in LWW merge, in dependency order: parent
/// entities come before the rows that reference them by foreign id.
/// FieldValues uses a composite identity (ItemId + FieldKey) for matching.
pub static SYNCABLE_TABLES: &[TableConfig] = &[
    TableConfig::new("Folders"),
    TableConfig::new("Tags"),
    TableConfig::new("FieldDefinitions"),
    TableConfig::new("Logos"),
    TableConfig::new("Items")
        .with_references(&["Folders", "Logos"])
        .trashable(),
    TableConfig::new("FieldValues")
        .with_identity(&["ItemId", "FieldKey"])
        .with_references(&["Items", "FieldDefinitions"]),
    TableConfig::new("FieldHistories").with_references(&["FieldValues"]),
    TableConfig::new("ItemTags").with_references(&["Items", "Tags"]),
    TableConfig::new("Attachments").with_references(&["Items"]),
    TableConfig::new("TotpCodes").with_references(&["Items"]),
    TableConfig::new("Passkeys").with_references(&["Items"]),
];

/// List of syncable table names in registry (dependency) order, for
/// clients to know which tables to read.
pub const SYNCABLE_TABLE_NAMES: &[&str] = &[
    "Folders",
    "Tags",
    "FieldDefinitions",
    "Logos",
    "Items",
    "FieldValues",
    "FieldHistories",
    "ItemTags",
    "Attachments",
    "TotpCodes",
    "Passkeys",
];

/// Look up a table's configuration by name.
pub fn find_table(name: &str) -> Option<&'static TableConfig> {
    SYNCABLE_TABLES.iter().find(|t| t.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_match_registry() {
        let registry: Vec<&str> = SYNCABLE_TABLES.iter().map(|t| t.name).collect();
        assert_eq!(registry, SYNCABLE_TABLE_NAMES);
    }

    #[test]
    fn test_registry_is_in_dependency_order() {
        for (index, table) in SYNCABLE_TABLES.iter().enumerate() {
            for referenced in table.references {
                let parent_index = SYNCABLE_TABLES
                    .iter()
                    .position(|t| t.name == *referenced)
                    .unwrap_or_else(|| {
                        panic!("{} references unknown table {}", table.name, referenced)
                    });
                assert!(
                    parent_index < index,
                    "{} must come after {}",
                    table.name,
                    referenced
                );
            }
        }
    }

    #[test]
    fn test_field_values_uses_composite_identity() {
        let table = find_table("FieldValues").unwrap();
        assert!(table.uses_composite_identity());
        assert_eq!(table.identity_columns, &["ItemId", "FieldKey"]);

        let items = find_table("Items").unwrap();
        assert!(!items.uses_composite_identity());
    }

    #[test]
    fn test_items_is_the_trashable_table() {
        let trashable: Vec<&str> = SYNCABLE_TABLES
            .iter()
            .filter(|t| t.trashable)
            .map(|t| t.name)
            .collect();
        assert_eq!(trashable, vec!["Items"]);
    }

    #[test]
    fn test_find_table() {
        assert!(find_table("Passkeys").is_some());
        assert!(find_table("Settings").is_none());
    }
}
