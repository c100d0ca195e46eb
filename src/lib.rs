//! Keyfold Core Library
//!
//! Cross-platform core functionality for Keyfold, including:
//! - **vault_merge**: deterministic vault merge using Last-Write-Wins (LWW) strategy
//! - **vault_pruner**: converts expired trash rows into tombstones (30-day retention)
//! - **vault_blob**: encrypt/decrypt of the opaque vault blob exchanged with the server
//! - **sync_state**: upload race detection and server status code classification
//!
//! This library accepts vault snapshots as JSON and returns SQL statement
//! batches as JSON. Each platform (browser, iOS, Android, .NET) handles its
//! own I/O and database access and calls this library for the core logic,
//! so every client resolves conflicts identically.
//!
//! # Example (conceptual)
//! ```ignore
//! // Merge example
//! let local = read_all_tables_as_snapshot(local_db);
//! let server = decrypt_and_read_snapshot(server_blob);
//! let output = merge_vaults(&local, &server)?;
//! apply_statements(local_db, &output.statements);
//!
//! // Prune example (tombstones rows in trash for > 30 days)
//! let output = prune_vault(&snapshot, 30, Utc::now())?;
//! ```

pub mod error;
pub mod record;
pub mod tables;
pub mod snapshot;
pub mod statement;
pub mod vault_merge;
pub mod vault_pruner;
pub mod vault_blob;
pub mod sync_state;

pub use error::{VaultError, VaultResult};
pub use record::{Record, SqlValue};
pub use snapshot::{TableData, VaultSnapshot, CONTRACT_VERSION};
pub use statement::SqlStatement;
pub use sync_state::{MutationTracker, UploadStatus, UploadToken};
pub use tables::{find_table, TableConfig, SYNCABLE_TABLES, SYNCABLE_TABLE_NAMES};
pub use vault_blob::{decrypt_vault_blob, encrypt_vault_blob, VaultKey};
pub use vault_merge::{merge_vaults, MergeInput, MergeOutput, MergeStats, TableMergeStats};
pub use vault_pruner::{prune_vault, PruneInput, PruneOutput, DEFAULT_RETENTION_DAYS};

/// Version of this library, as compiled.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

// WASM bindings
#[cfg(feature = "wasm")]
pub mod wasm;

#[cfg(feature = "wasm")]
pub use wasm::*;

// C FFI exports for .NET P/Invoke
#[cfg(feature = "ffi")]
pub mod ffi;

// UniFFI bindings for Swift/Kotlin
#[cfg(feature = "uniffi")]
pub mod uniffi_api;

#[cfg(feature = "uniffi")]
pub use uniffi_api::*;

// UniFFI scaffolding - generates the FFI glue code
#[cfg(feature = "uniffi")]
uniffi::setup_scaffolding!();
