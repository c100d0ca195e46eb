//! C FFI exports for .NET P/Invoke.
//!
//! These functions provide a C-compatible interface for calling Rust functions from C#.
//! All functions use JSON strings for input/output to simplify marshalling.
//! Failures come back as a JSON envelope:
//! `{"success": false, "error_kind": "...", "error": "..."}`.

use std::ffi::{c_char, CStr, CString};
use std::ptr;

use crate::error::{VaultError, VaultResult};
use crate::snapshot::CONTRACT_VERSION;
use crate::tables::SYNCABLE_TABLE_NAMES;
use crate::vault_blob::{decrypt_vault_blob_json, encrypt_vault_blob_json};
use crate::vault_merge::merge_vaults_json;
use crate::vault_pruner::prune_vault_json;

/// Runs one of the JSON-string core operations over C string pointers.
///
/// # Safety
///
/// `input_json` must be null or a valid null-terminated C string.
unsafe fn json_call(input_json: *const c_char, f: fn(&str) -> VaultResult<String>) -> *mut c_char {
    if input_json.is_null() {
        return ptr::null_mut();
    }

    let input = match CStr::from_ptr(input_json).to_str() {
        Ok(s) => s,
        Err(_) => return ptr::null_mut(),
    };

    match f(input) {
        Ok(json) => string_to_c_char(json),
        Err(e) => error_response(&e),
    }
}

/// Merge two vault snapshots using the LWW strategy.
///
/// # Safety
///
/// - `input_json` must be a valid null-terminated C string (MergeInput JSON)
/// - The returned pointer must be freed by calling `free_string`
///
/// # Returns
///
/// A null-terminated C string containing the JSON result (MergeOutput),
/// or an error envelope. Returns null on invalid pointers.
#[no_mangle]
pub unsafe extern "C" fn merge_vaults_ffi(input_json: *const c_char) -> *mut c_char {
    json_call(input_json, merge_vaults_json)
}

/// Convert expired trash rows into tombstones.
///
/// Trashed rows with `DeletedAt` older than `retention_days` get a
/// tombstone UPDATE each.
///
/// # Safety
///
/// - `input_json` must be a valid null-terminated C string (PruneInput JSON)
/// - The returned pointer must be freed by calling `free_string`
///
/// # Returns
///
/// A null-terminated C string containing the JSON result (PruneOutput),
/// or an error envelope. Returns null on invalid pointers.
#[no_mangle]
pub unsafe extern "C" fn prune_vault_ffi(input_json: *const c_char) -> *mut c_char {
    json_call(input_json, prune_vault_json)
}

/// Encrypt database bytes into the vault blob uploaded to the server.
///
/// # Safety
///
/// - `input_json` must be a valid null-terminated C string with
///   base64-encoded `database` and `key` fields
/// - The returned pointer must be freed by calling `free_string`
///
/// # Returns
///
/// A null-terminated C string containing `{"blob": "..."}`, or an error
/// envelope. Returns null on invalid pointers.
#[no_mangle]
pub unsafe extern "C" fn encrypt_vault_blob_ffi(input_json: *const c_char) -> *mut c_char {
    json_call(input_json, encrypt_vault_blob_json)
}

/// Decrypt a vault blob back into database bytes.
///
/// # Safety
///
/// - `input_json` must be a valid null-terminated C string with `blob`
///   and base64-encoded `key` fields
/// - The returned pointer must be freed by calling `free_string`
///
/// # Returns
///
/// A null-terminated C string containing `{"database": "..."}` with the
/// bytes base64-encoded, or an error envelope. Returns null on invalid
/// pointers.
#[no_mangle]
pub unsafe extern "C" fn decrypt_vault_blob_ffi(input_json: *const c_char) -> *mut c_char {
    json_call(input_json, decrypt_vault_blob_json)
}

/// Get the list of syncable table names as a JSON array.
///
/// # Safety
///
/// - The returned pointer must be freed by calling `free_string`
///
/// # Returns
///
/// A null-terminated C string containing a JSON array of table names.
#[no_mangle]
pub extern "C" fn get_syncable_table_names_ffi() -> *mut c_char {
    let names: Vec<&str> = SYNCABLE_TABLE_NAMES.iter().map(|s| *s).collect();
    match serde_json::to_string(&names) {
        Ok(json) => string_to_c_char(json),
        Err(_) => ptr::null_mut(),
    }
}

/// Get the snapshot contract version this library implements.
#[no_mangle]
pub extern "C" fn get_contract_version_ffi() -> u32 {
    CONTRACT_VERSION
}

/// Free a string that was allocated by Rust.
///
/// # Safety
///
/// - `s` must be a pointer that was returned by one of the FFI functions
/// - This function must only be called once per pointer
/// - After calling this function, the pointer is invalid
#[no_mangle]
pub unsafe extern "C" fn free_string(s: *mut c_char) {
    if !s.is_null() {
        drop(CString::from_raw(s));
    }
}

/// Convert a Rust string to a C string pointer.
fn string_to_c_char(s: String) -> *mut c_char {
    match CString::new(s) {
        Ok(c_string) => c_string.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

/// Create the JSON error envelope returned when an operation fails.
fn error_response(err: &VaultError) -> *mut c_char {
    let envelope = serde_json::json!({
        "success": false,
        "error_kind": err.kind(),
        "error": err.to_string(),
    });
    string_to_c_char(envelope.to_string())
}
