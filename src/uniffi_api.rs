//! UniFFI API module for Swift and Kotlin bindings.
//!
//! This module exposes the core vault operations via UniFFI for mobile platforms.
//! Vault snapshots and statement batches cross as JSON strings to simplify
//! cross-language marshalling; blob crypto crosses as raw byte arrays.

use crate::error::VaultError;
use crate::tables::SYNCABLE_TABLE_NAMES;
use crate::vault_blob::VaultKey;

/// Get the version of the keyfold-core library.
#[uniffi::export]
pub fn get_core_version() -> String {
    crate::core_version().to_string()
}

/// Get the snapshot contract version this library implements.
#[uniffi::export]
pub fn get_contract_version() -> u32 {
    crate::snapshot::CONTRACT_VERSION
}

/// Get the list of syncable table names.
/// These are the tables that need to be read from the database for merge/prune operations.
#[uniffi::export]
pub fn get_syncable_table_names() -> Vec<String> {
    SYNCABLE_TABLE_NAMES
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Merge local and server vaults using Last-Write-Wins strategy.
///
/// # Arguments
/// * `input_json` - JSON string with format:
///   ```json
///   {
///     "local": {"tables": [{"name": "Items", "records": [...]}]},
///     "server": {"tables": [{"name": "Items", "records": [...]}]}
///   }
///   ```
///
/// # Returns
/// JSON string with format:
///   ```json
///   {
///     "statements": [{"table": "Items", "sql": "UPDATE ...", "params": [...]}],
///     "stats": {"tables_processed": 11, "inserted": 0, "updated": 0, ...}
///   }
///   ```
#[uniffi::export]
pub fn merge_vaults_json(input_json: String) -> Result<String, VaultError> {
    crate::vault_merge::merge_vaults_json(&input_json)
}

/// Convert expired trash rows into tombstones (rows with DeletedAt older
/// than retention_days).
///
/// # Arguments
/// * `input_json` - JSON string with format:
///   ```json
///   {
///     "snapshot": {"tables": [{"name": "Items", "records": [...]}]},
///     "current_time": "2024-01-15T10:30:00.000Z",
///     "retention_days": 30
///   }
///   ```
///
/// # Returns
/// JSON string with format:
///   ```json
///   {
///     "statements": [{"table": "Items", "sql": "UPDATE ...", "params": [...]}],
///     "pruned_count": 0
///   }
///   ```
#[uniffi::export]
pub fn prune_vault_json(input_json: String) -> Result<String, VaultError> {
    crate::vault_pruner::prune_vault_json(&input_json)
}

/// Encrypt raw database bytes into the vault blob uploaded to the server.
///
/// # Arguments
/// * `db_bytes` - Raw SQLite database bytes
/// * `key` - 32-byte encryption key
///
/// # Returns
/// The base64 blob string stored by the server.
#[uniffi::export]
pub fn encrypt_vault_blob(db_bytes: Vec<u8>, key: Vec<u8>) -> Result<String, VaultError> {
    let key = VaultKey::from_bytes(&key)?;
    crate::vault_blob::encrypt_vault_blob(&db_bytes, &key)
}

/// Decrypt a vault blob back into raw database bytes.
///
/// # Arguments
/// * `blob` - The base64 blob string downloaded from the server
/// * `key` - 32-byte encryption key
#[uniffi::export]
pub fn decrypt_vault_blob(blob: String, key: Vec<u8>) -> Result<Vec<u8>, VaultError> {
    let key = VaultKey::from_bytes(&key)?;
    crate::vault_blob::decrypt_vault_blob(&blob, &key)
}
