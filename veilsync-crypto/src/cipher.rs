//! AES-256-EAX implementation of [`CipherSuite`].

use crate::error::{CryptoError, CryptoResult};
use crate::CipherSuite;
use aes::Aes256;
use eax::aead::generic_array::GenericArray;
use eax::aead::{AeadInPlace, KeyInit};
use eax::Eax;
use rand::RngCore;
use sha2::{Digest, Sha256};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// AES-256 key size in bytes (= SHA-256 digest size).
pub const KEY_SIZE: usize = 32;

/// EAX nonce size in bytes (one AES block).
pub const NONCE_SIZE: usize = 16;

/// EAX authentication tag size in bytes.
pub const TAG_SIZE: usize = 16;

type Aes256Eax = Eax<Aes256>;

/// AES-256-EAX cipher keyed from a passphrase.
///
/// The working key is `SHA-256(passphrase)`. Key material is zeroized
/// when the cipher is dropped.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct AesEaxCipher {
    key: [u8; KEY_SIZE],
}

impl AesEaxCipher {
    /// Derives the working key from a UTF-8 passphrase.
    pub fn from_passphrase(passphrase: &str) -> Self {
        let digest = Sha256::digest(passphrase.as_bytes());
        let mut key = [0u8; KEY_SIZE];
        key.copy_from_slice(&digest);
        Self { key }
    }

    /// Builds a cipher from raw key bytes (tests, key escrow).
    pub fn from_key(key: [u8; KEY_SIZE]) -> Self {
        Self { key }
    }
}

impl CipherSuite for AesEaxCipher {
    fn encrypt(&self, plaintext: &[u8]) -> CryptoResult<Vec<u8>> {
        let cipher = Aes256Eax::new(GenericArray::from_slice(&self.key));

        let mut nonce = [0u8; NONCE_SIZE];
        rand::rngs::OsRng.fill_bytes(&mut nonce);

        let mut buf = plaintext.to_vec();
        let tag = cipher
            .encrypt_in_place_detached(GenericArray::from_slice(&nonce), b"", &mut buf)
            .map_err(|e| CryptoError::Encryption(e.to_string()))?;

        let mut out = Vec::with_capacity(NONCE_SIZE + TAG_SIZE + buf.len());
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&tag);
        out.extend_from_slice(&buf);
        Ok(out)
    }

    fn decrypt(&self, data: &[u8]) -> CryptoResult<Vec<u8>> {
        if data.len() < NONCE_SIZE + TAG_SIZE {
            return Err(CryptoError::Truncated { len: data.len() });
        }

        let (nonce, rest) = data.split_at(NONCE_SIZE);
        let (tag, ciphertext) = rest.split_at(TAG_SIZE);

        let cipher = Aes256Eax::new(GenericArray::from_slice(&self.key));
        let mut buf = ciphertext.to_vec();
        cipher
            .decrypt_in_place_detached(
                GenericArray::from_slice(nonce),
                b"",
                &mut buf,
                GenericArray::from_slice(tag),
            )
            .map_err(|_| CryptoError::Authentication)?;

        Ok(buf)
    }

    fn hash(&self, data: &[u8]) -> Vec<u8> {
        Sha256::digest(data).to_vec()
    }
}
