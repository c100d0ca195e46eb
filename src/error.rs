//! Error types for the Keyfold core library.

use thiserror::Error;

/// Errors that can occur during vault operations.
///
/// This enum is exposed to Swift/Kotlin via UniFFI as a flat error type,
/// meaning the error variants are exposed as simple enum cases with string messages.
///
/// The variants map one-to-one onto the failure classes of the sync engine:
/// `InvalidInput` for malformed snapshot/request contents, `Serialization`
/// for payloads that cannot be decoded or encoded at all, `Database` for
/// statement preparation/execution failures reported by the embedding
/// platform, and `Encryption` for vault blob encrypt/decrypt failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "uniffi", derive(uniffi::Error))]
#[cfg_attr(feature = "uniffi", uniffi(flat_error))]
pub enum VaultError {
    /// Snapshot or request content is malformed: unknown table name,
    /// missing required columns, bad timestamps, wrong key length.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A boundary payload could not be decoded or encoded.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Statement preparation or execution failed on the embedding side.
    ///
    /// The core never opens a database connection; this variant exists so
    /// the platform layer applying a statement batch can surface its
    /// failure through the same error type that crosses the FFI boundary.
    #[error("Database error: {0}")]
    Database(String),

    /// Encrypting or decrypting the outer vault blob failed: wrong key
    /// or corrupted data.
    #[error("Encryption error: {0}")]
    Encryption(String),
}

impl VaultError {
    /// Stable machine-readable tag for the error class, used in the C FFI
    /// error envelope.
    pub fn kind(&self) -> &'static str {
        match self {
            VaultError::InvalidInput(_) => "invalid_input",
            VaultError::Serialization(_) => "serialization",
            VaultError::Database(_) => "database",
            VaultError::Encryption(_) => "encryption",
        }
    }
}

impl From<serde_json::Error> for VaultError {
    fn from(err: serde_json::Error) -> Self {
        VaultError::Serialization(err.to_string())
    }
}

/// Result type alias for vault operations.
pub type VaultResult<T> = Result<T, VaultError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(VaultError::InvalidInput("x".into()).kind(), "invalid_input");
        assert_eq!(VaultError::Serialization("x".into()).kind(), "serialization");
        assert_eq!(VaultError::Database("x".into()).kind(), "database");
        assert_eq!(VaultError::Encryption("x".into()).kind(), "encryption");
    }

    #[test]
    fn test_from_serde_json_error() {
        let err = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let vault_err: VaultError = err.into();
        assert_eq!(vault_err.kind(), "serialization");
    }

    #[test]
    fn test_display_includes_message() {
        let err = VaultError::InvalidInput("Items row is missing 'Id'".into());
        assert_eq!(err.to_string(), "Invalid input: Items row is missing 'Id'");
    }
}
