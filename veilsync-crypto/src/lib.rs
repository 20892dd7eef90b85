//! Cipher suite for veilsync.
//!
//! Provides authenticated symmetric encryption over opaque byte blocks:
//! - AES-256 in EAX mode for encrypt/decrypt
//! - SHA-256 for hashing and passphrase key derivation
//!
//! Every encrypted block uses one fixed wire format:
//!
//! ```text
//! nonce (16 bytes) || authentication tag (16 bytes) || ciphertext
//! ```
//!
//! The working key is the SHA-256 digest of the UTF-8 passphrase — a single
//! fast hash with no salt and no iteration count. That is a known weakness
//! (an attacker with a stored block can mount a fast offline passphrase
//! search); it is kept as-is because existing stored data depends on it.

mod cipher;
mod error;

pub use cipher::{AesEaxCipher, KEY_SIZE, NONCE_SIZE, TAG_SIZE};
pub use error::{CryptoError, CryptoResult};

/// Symmetric encrypt/decrypt/hash over byte blocks.
///
/// Implementations must produce the `nonce || tag || ciphertext` wire format
/// described at the crate level, and must fail decryption (rather than
/// return garbage) when the key is wrong or the block was tampered with.
pub trait CipherSuite: Send + Sync {
    /// Encrypts a block, emitting `nonce || tag || ciphertext`.
    fn encrypt(&self, plaintext: &[u8]) -> CryptoResult<Vec<u8>>;

    /// Decrypts a `nonce || tag || ciphertext` block.
    ///
    /// Returns [`CryptoError::Authentication`] if the tag does not verify
    /// (wrong key or tampered data).
    fn decrypt(&self, data: &[u8]) -> CryptoResult<Vec<u8>>;

    /// SHA-256 digest of `data`.
    fn hash(&self, data: &[u8]) -> Vec<u8>;
}
