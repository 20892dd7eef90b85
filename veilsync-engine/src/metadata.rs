//! Encrypted name/size side-channel codec.
//!
//! Every engine-managed remote node carries two metadata fields: the
//! original base name and the original size, each independently encrypted
//! and hex-encoded. The field keys are configurable and deliberately
//! non-descriptive ("my1"/"my2" by default); only the ciphertext length
//! leaks the approximate name/size length.

use std::sync::Arc;
use thiserror::Error;
use veilsync_connector::MetadataBag;
use veilsync_crypto::{CipherSuite, CryptoError, CryptoResult};

/// Why a metadata bag could not be decoded.
#[derive(Debug, Error)]
pub enum MetadataDecodeError {
    #[error("metadata field missing: {0}")]
    MissingField(String),

    #[error("metadata field is not valid hex: {0}")]
    Hex(#[from] hex::FromHexError),

    #[error(transparent)]
    Cipher(#[from] CryptoError),

    #[error("decrypted metadata is not valid UTF-8")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("decrypted size is not a decimal integer: {0}")]
    Size(#[from] std::num::ParseIntError),
}

impl MetadataDecodeError {
    /// True when the root cause is cipher authentication (wrong key or
    /// tampered ciphertext) rather than a structural defect.
    pub fn is_authentication(&self) -> bool {
        matches!(self, MetadataDecodeError::Cipher(CryptoError::Authentication))
    }
}

/// Encodes and decodes the encrypted name+size metadata bag.
///
/// Pure transform over byte fields; performs no I/O.
pub struct MetadataCodec {
    cipher: Arc<dyn CipherSuite>,
    name_field: String,
    size_field: String,
}

impl MetadataCodec {
    pub fn new(cipher: Arc<dyn CipherSuite>, name_field: String, size_field: String) -> Self {
        Self {
            cipher,
            name_field,
            size_field,
        }
    }

    /// Encrypts `original_name` and the decimal form of `size` into a bag.
    pub fn encode(&self, original_name: &str, size: u64) -> CryptoResult<MetadataBag> {
        let mut bag = MetadataBag::new();
        bag.insert(
            self.name_field.clone(),
            hex::encode(self.cipher.encrypt(original_name.as_bytes())?),
        );
        bag.insert(
            self.size_field.clone(),
            hex::encode(self.cipher.encrypt(size.to_string().as_bytes())?),
        );
        Ok(bag)
    }

    /// Recovers `(original_name, size)` from a bag.
    pub fn decode(&self, bag: &MetadataBag) -> Result<(String, u64), MetadataDecodeError> {
        let name = String::from_utf8(self.decode_field(bag, &self.name_field)?)?;
        let size = String::from_utf8(self.decode_field(bag, &self.size_field)?)?.parse()?;
        Ok((name, size))
    }

    fn decode_field(&self, bag: &MetadataBag, field: &str) -> Result<Vec<u8>, MetadataDecodeError> {
        let value = bag
            .get(field)
            .ok_or_else(|| MetadataDecodeError::MissingField(field.to_string()))?;
        Ok(self.cipher.decrypt(&hex::decode(value)?)?)
    }
}
