//! WASM bindings for browser extension.

use wasm_bindgen::prelude::*;

use crate::record::parse_timestamp;
use crate::vault_blob::{decrypt_vault_blob, encrypt_vault_blob, VaultKey};
use crate::vault_merge::{merge_vaults, MergeInput, MergeOutput};
use crate::vault_pruner::{prune_vault, PruneInput, PruneOutput};

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = console)]
    pub fn log(s: &str);
}

/// Initialize panic hook for better error messages.
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

// ═══════════════════════════════════════════════════════════════════════════════
// Vault Merge WASM Bindings
// ═══════════════════════════════════════════════════════════════════════════════

/// Get the list of table names that need to be synced.
#[wasm_bindgen(js_name = getSyncableTableNames)]
pub fn get_syncable_table_names() -> Vec<String> {
    crate::tables::SYNCABLE_TABLE_NAMES
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Get the snapshot contract version this library implements.
#[wasm_bindgen(js_name = getContractVersion)]
pub fn get_contract_version() -> u32 {
    crate::snapshot::CONTRACT_VERSION
}

/// Merge vaults using LWW strategy.
///
/// Takes a JsValue (MergeInput) and returns a JsValue (MergeOutput).
#[wasm_bindgen(js_name = mergeVaults)]
pub fn merge_vaults_js(input: JsValue) -> Result<JsValue, JsValue> {
    let input: MergeInput = serde_wasm_bindgen::from_value(input)
        .map_err(|e| JsValue::from_str(&format!("Failed to parse input: {}", e)))?;

    let output: MergeOutput = merge_vaults(&input.local, &input.server)
        .map_err(|e| JsValue::from_str(&format!("Merge failed: {}", e)))?;

    serde_wasm_bindgen::to_value(&output)
        .map_err(|e| JsValue::from_str(&format!("Failed to serialize output: {}", e)))
}

/// Merge vaults using JSON strings (alternative API).
///
/// Takes a JSON string and returns a JSON string.
#[wasm_bindgen(js_name = mergeVaultsJson)]
pub fn merge_vaults_json_js(input_json: &str) -> Result<String, JsValue> {
    crate::vault_merge::merge_vaults_json(input_json)
        .map_err(|e| JsValue::from_str(&format!("Merge failed: {}", e)))
}

// ═══════════════════════════════════════════════════════════════════════════════
// Vault Pruner WASM Bindings
// ═══════════════════════════════════════════════════════════════════════════════

/// Convert expired trash rows into tombstones.
///
/// Trashed rows with DeletedAt older than retention_days get a tombstone
/// UPDATE each. Default retention is 30 days.
///
/// Takes a JsValue (PruneInput) and returns a JsValue (PruneOutput).
#[wasm_bindgen(js_name = pruneVault)]
pub fn prune_vault_js(input: JsValue) -> Result<JsValue, JsValue> {
    let input: PruneInput = serde_wasm_bindgen::from_value(input)
        .map_err(|e| JsValue::from_str(&format!("Failed to parse input: {}", e)))?;

    let now = parse_timestamp(&input.current_time).ok_or_else(|| {
        JsValue::from_str(&format!(
            "Failed to parse current_time: '{}'",
            input.current_time
        ))
    })?;

    let output: PruneOutput = prune_vault(&input.snapshot, input.retention_days, now)
        .map_err(|e| JsValue::from_str(&format!("Prune failed: {}", e)))?;

    serde_wasm_bindgen::to_value(&output)
        .map_err(|e| JsValue::from_str(&format!("Failed to serialize output: {}", e)))
}

/// Prune vault using JSON strings (alternative API).
///
/// Takes a JSON string and returns a JSON string.
#[wasm_bindgen(js_name = pruneVaultJson)]
pub fn prune_vault_json_js(input_json: &str) -> Result<String, JsValue> {
    crate::vault_pruner::prune_vault_json(input_json)
        .map_err(|e| JsValue::from_str(&format!("Prune failed: {}", e)))
}

// ═══════════════════════════════════════════════════════════════════════════════
// Vault Blob WASM Bindings
// ═══════════════════════════════════════════════════════════════════════════════

/// Encrypt raw database bytes into the blob format stored by the server.
///
/// `key` must be exactly 32 bytes. Returns the base64 blob string.
#[wasm_bindgen(js_name = encryptVaultBlob)]
pub fn encrypt_vault_blob_js(db_bytes: &[u8], key: &[u8]) -> Result<String, JsValue> {
    let key = VaultKey::from_bytes(key).map_err(|e| JsValue::from_str(&e.to_string()))?;
    encrypt_vault_blob(db_bytes, &key).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Decrypt a vault blob back into raw database bytes.
///
/// `key` must be exactly 32 bytes.
#[wasm_bindgen(js_name = decryptVaultBlob)]
pub fn decrypt_vault_blob_js(blob: &str, key: &[u8]) -> Result<Vec<u8>, JsValue> {
    let key = VaultKey::from_bytes(key).map_err(|e| JsValue::from_str(&e.to_string()))?;
    decrypt_vault_blob(blob, &key).map_err(|e| JsValue::from_str(&e.to_string()))
}
