//! Vault blob encryption.
//!
//! The encrypted vault travels between client and server as an opaque
//! string: `base64( nonce || AES-256-GCM( base64(database bytes) ) )` with a
//! fresh 96-bit nonce per encryption. The server never sees the key; it is
//! derived on-device during authentication and handed to this module as raw
//! bytes. Key derivation itself lives outside the core.

use aes_gcm::{
    aead::{generic_array::GenericArray, Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{VaultError, VaultResult};

/// Size of the AES-256 key in bytes.
pub const KEY_SIZE: usize = 32;
/// Size of the GCM nonce in bytes.
pub const NONCE_SIZE: usize = 12;
/// Size of the GCM authentication tag in bytes.
pub const TAG_SIZE: usize = 16;

/// Symmetric key for the vault blob, zeroized when dropped.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct VaultKey {
    bytes: [u8; KEY_SIZE],
}

impl VaultKey {
    /// Generates a new random key.
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_SIZE];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self { bytes }
    }

    /// Creates a key from raw bytes. The slice must be exactly 32 bytes.
    pub fn from_bytes(bytes: &[u8]) -> VaultResult<Self> {
        if bytes.len() != KEY_SIZE {
            return Err(VaultError::InvalidInput(format!(
                "vault key must be {} bytes, got {}",
                KEY_SIZE,
                bytes.len()
            )));
        }

        let mut key_bytes = [0u8; KEY_SIZE];
        key_bytes.copy_from_slice(bytes);
        Ok(Self { bytes: key_bytes })
    }

    /// Creates a key from a base64-encoded string, as received over the
    /// JSON binding surfaces.
    pub fn from_base64(key_b64: &str) -> VaultResult<Self> {
        let bytes = BASE64
            .decode(key_b64)
            .map_err(|_| VaultError::InvalidInput("vault key is not valid base64".to_string()))?;
        Self::from_bytes(&bytes)
    }

    /// Returns the raw key bytes. Never log or serialize the result.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }
}

impl std::fmt::Debug for VaultKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Encrypts raw database bytes into the blob format the server stores.
///
/// The database bytes are base64-encoded first, then sealed with
/// AES-256-GCM under a random nonce, and the `nonce || ciphertext` payload
/// is base64-encoded again for transport.
pub fn encrypt_vault_blob(db_bytes: &[u8], key: &VaultKey) -> VaultResult<String> {
    let cipher = Aes256Gcm::new(GenericArray::from_slice(key.as_bytes()));

    let mut nonce_bytes = [0u8; NONCE_SIZE];
    rand::thread_rng().fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let inner = BASE64.encode(db_bytes);
    let ciphertext = cipher
        .encrypt(nonce, inner.as_bytes())
        .map_err(|_| VaultError::Encryption("vault blob encryption failed".to_string()))?;

    let mut payload = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    payload.extend_from_slice(&nonce_bytes);
    payload.extend(ciphertext);
    Ok(BASE64.encode(payload))
}

/// Decrypts a blob produced by [`encrypt_vault_blob`] back into raw
/// database bytes.
///
/// A wrong key, corrupted or truncated data, or broken base64 at either
/// layer is reported as an encryption error; nothing is ever returned
/// unauthenticated.
pub fn decrypt_vault_blob(blob: &str, key: &VaultKey) -> VaultResult<Vec<u8>> {
    let payload = BASE64
        .decode(blob)
        .map_err(|_| VaultError::Encryption("vault blob is not valid base64".to_string()))?;
    if payload.len() < NONCE_SIZE + TAG_SIZE {
        return Err(VaultError::Encryption(
            "vault blob is too short to contain a nonce and tag".to_string(),
        ));
    }

    let cipher = Aes256Gcm::new(GenericArray::from_slice(key.as_bytes()));
    let nonce = Nonce::from_slice(&payload[..NONCE_SIZE]);
    let inner = cipher
        .decrypt(nonce, &payload[NONCE_SIZE..])
        .map_err(|_| {
            VaultError::Encryption("vault blob decryption failed: wrong key or corrupted data".to_string())
        })?;

    let inner = String::from_utf8(inner).map_err(|_| {
        VaultError::Encryption("decrypted vault payload is not valid UTF-8".to_string())
    })?;
    BASE64.decode(inner.as_bytes()).map_err(|_| {
        VaultError::Encryption("decrypted vault payload is not valid base64".to_string())
    })
}

/// JSON request for [`encrypt_vault_blob_json`].
#[derive(Debug, Deserialize)]
struct EncryptBlobInput {
    /// Base64-encoded database bytes.
    database: String,
    /// Base64-encoded 32-byte key.
    key: String,
}

#[derive(Debug, Serialize)]
struct EncryptBlobOutput {
    blob: String,
}

/// JSON request for [`decrypt_vault_blob_json`].
#[derive(Debug, Deserialize)]
struct DecryptBlobInput {
    blob: String,
    /// Base64-encoded 32-byte key.
    key: String,
}

#[derive(Debug, Serialize)]
struct DecryptBlobOutput {
    /// Base64-encoded database bytes.
    database: String,
}

/// JSON wrapper around [`encrypt_vault_blob`] for FFI callers. Database
/// bytes and key both cross the boundary base64-encoded.
pub fn encrypt_vault_blob_json(input_json: &str) -> VaultResult<String> {
    let input: EncryptBlobInput = serde_json::from_str(input_json)?;
    let key = VaultKey::from_base64(&input.key)?;
    let database = BASE64
        .decode(input.database.as_bytes())
        .map_err(|_| VaultError::InvalidInput("'database' is not valid base64".to_string()))?;
    let blob = encrypt_vault_blob(&database, &key)?;
    Ok(serde_json::to_string(&EncryptBlobOutput { blob })?)
}

/// JSON wrapper around [`decrypt_vault_blob`] for FFI callers.
pub fn decrypt_vault_blob_json(input_json: &str) -> VaultResult<String> {
    let input: DecryptBlobInput = serde_json::from_str(input_json)?;
    let key = VaultKey::from_base64(&input.key)?;
    let database = decrypt_vault_blob(&input.blob, &key)?;
    Ok(serde_json::to_string(&DecryptBlobOutput {
        database: BASE64.encode(database),
    })?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encrypt_decrypt_round_trip() {
        let key = VaultKey::generate();
        // Not valid UTF-8, like real SQLite bytes.
        let db_bytes = vec![0x53, 0x51, 0x4c, 0x00, 0x9f, 0x92, 0x96, 0xff];

        let blob = encrypt_vault_blob(&db_bytes, &key).unwrap();
        let decrypted = decrypt_vault_blob(&blob, &key).unwrap();

        assert_eq!(decrypted, db_bytes);
    }

    #[test]
    fn test_empty_database_round_trip() {
        let key = VaultKey::generate();

        let blob = encrypt_vault_blob(&[], &key).unwrap();
        assert_eq!(decrypt_vault_blob(&blob, &key).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn test_each_encryption_uses_a_fresh_nonce() {
        let key = VaultKey::generate();
        let db_bytes = b"same bytes";

        let first = encrypt_vault_blob(db_bytes, &key).unwrap();
        let second = encrypt_vault_blob(db_bytes, &key).unwrap();

        assert_ne!(first, second);
        assert_eq!(decrypt_vault_blob(&first, &key).unwrap(), db_bytes);
        assert_eq!(decrypt_vault_blob(&second, &key).unwrap(), db_bytes);
    }

    #[test]
    fn test_wrong_key_fails() {
        let blob = encrypt_vault_blob(b"secret", &VaultKey::generate()).unwrap();

        let err = decrypt_vault_blob(&blob, &VaultKey::generate()).unwrap_err();

        assert_eq!(err.kind(), "encryption");
    }

    #[test]
    fn test_corrupted_blob_fails() {
        let key = VaultKey::generate();
        let blob = encrypt_vault_blob(b"secret", &key).unwrap();

        // Flip one character in the middle, keeping valid base64.
        let middle = blob.len() / 2;
        let original = blob.as_bytes()[middle];
        let replacement = if original == b'A' { b'B' } else { b'A' };
        let mut corrupted = blob.into_bytes();
        corrupted[middle] = replacement;
        let corrupted = String::from_utf8(corrupted).unwrap();

        assert!(decrypt_vault_blob(&corrupted, &key).is_err());
    }

    #[test]
    fn test_truncated_blob_fails() {
        let key = VaultKey::generate();

        let err = decrypt_vault_blob(&BASE64.encode([0u8; 10]), &key).unwrap_err();

        assert_eq!(err.kind(), "encryption");
        assert!(err.to_string().contains("too short"));
    }

    #[test]
    fn test_non_base64_blob_fails() {
        let err = decrypt_vault_blob("not base64 at all!!!", &VaultKey::generate()).unwrap_err();

        assert_eq!(err.kind(), "encryption");
    }

    #[test]
    fn test_key_must_be_exactly_32_bytes() {
        let err = VaultKey::from_bytes(&[0u8; 16]).unwrap_err();
        assert_eq!(err.kind(), "invalid_input");
        assert!(err.to_string().contains("32 bytes"));

        assert!(VaultKey::from_bytes(&[0u8; 32]).is_ok());
    }

    #[test]
    fn test_key_from_base64() {
        let key = VaultKey::generate();
        let restored = VaultKey::from_base64(&BASE64.encode(key.as_bytes())).unwrap();
        assert_eq!(restored.as_bytes(), key.as_bytes());

        assert!(VaultKey::from_base64("###").is_err());
    }

    #[test]
    fn test_generated_keys_differ() {
        assert_ne!(
            VaultKey::generate().as_bytes(),
            VaultKey::generate().as_bytes()
        );
    }

    #[test]
    fn test_debug_redacts_key_material() {
        let key = VaultKey::generate();
        let debug = format!("{:?}", key);
        assert!(debug.contains("REDACTED"));
    }

    #[test]
    fn test_json_wrappers_round_trip() {
        let key = VaultKey::generate();
        let key_b64 = BASE64.encode(key.as_bytes());
        let db_bytes = vec![1u8, 2, 3, 255, 0, 128];

        let encrypt_input = serde_json::json!({
            "database": BASE64.encode(&db_bytes),
            "key": key_b64,
        });
        let encrypted: serde_json::Value =
            serde_json::from_str(&encrypt_vault_blob_json(&encrypt_input.to_string()).unwrap())
                .unwrap();

        let decrypt_input = serde_json::json!({
            "blob": encrypted["blob"],
            "key": key_b64,
        });
        let decrypted: serde_json::Value =
            serde_json::from_str(&decrypt_vault_blob_json(&decrypt_input.to_string()).unwrap())
                .unwrap();

        assert_eq!(
            BASE64
                .decode(decrypted["database"].as_str().unwrap())
                .unwrap(),
            db_bytes
        );
    }

    #[test]
    fn test_json_wrapper_rejects_bad_key() {
        let input = serde_json::json!({
            "database": BASE64.encode(b"data"),
            "key": BASE64.encode(b"short"),
        });

        let err = encrypt_vault_blob_json(&input.to_string()).unwrap_err();

        assert_eq!(err.kind(), "invalid_input");
    }
}
