//! Chunked asymmetric codec.
//!
//! RSA can only encrypt `B - O` bytes at a time, where `B` is the modulus
//! size in bytes and `O` the padding overhead. Longer values are split into
//! consecutive plaintext blocks, each encrypted independently, and the
//! `B`-byte cipher blocks are concatenated and base64 encoded.
//!
//! ```text
//! plaintext:  [  P  ][  P  ][ <=P ]
//! ciphertext: [   B   ][   B   ][   B   ]  -> base64
//! ```

use base64::{engine::general_purpose::STANDARD, Engine as _};
use zeroize::Zeroizing;

use crate::config::EncryptionPadding;
use crate::error::{SecureStorageError, SecureStorageResult};
use crate::vault::{PrivateKeyHandle, PublicKeyHandle};

/// Block parameters derived from the key size and padding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkedCodec {
    block_size: usize,
    padding_overhead: usize,
}

impl ChunkedCodec {
    /// Codec for an RSA key of `key_size_bits` with PKCS#1 v1.5 padding.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the key size is not a positive multiple of
    /// 8 or leaves no room for data after padding.
    pub fn new(key_size_bits: u32) -> SecureStorageResult<Self> {
        Self::with_padding_overhead(key_size_bits, EncryptionPadding::RsaPkcs1.overhead())
    }

    /// Codec with an explicit padding overhead in bytes.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the key size is not a positive multiple of
    /// 8 or the block size does not exceed `padding_overhead`.
    pub fn with_padding_overhead(
        key_size_bits: u32,
        padding_overhead: usize,
    ) -> SecureStorageResult<Self> {
        if key_size_bits == 0 || key_size_bits % 8 != 0 {
            return Err(SecureStorageError::InvalidConfig(format!(
                "key size must be a positive multiple of 8, got {key_size_bits}"
            )));
        }
        let block_size = usize::try_from(key_size_bits / 8)
            .map_err(|err| SecureStorageError::InvalidConfig(err.to_string()))?;
        if block_size <= padding_overhead {
            return Err(SecureStorageError::InvalidConfig(format!(
                "block size {block_size} leaves no room after {padding_overhead} bytes of padding"
            )));
        }
        Ok(Self {
            block_size,
            padding_overhead,
        })
    }

    /// Cipher block size `B` in bytes.
    #[must_use]
    pub const fn block_size(&self) -> usize {
        self.block_size
    }

    /// Largest plaintext block `P = B - O`.
    #[must_use]
    pub const fn plaintext_block_size(&self) -> usize {
        self.block_size - self.padding_overhead
    }

    /// Encrypts `data` of any length, including empty, into base64 text.
    ///
    /// Output is randomized: encrypting the same value twice yields
    /// different text.
    ///
    /// # Errors
    ///
    /// Returns `Cipher` if the key handle rejects a block or returns a block
    /// whose length differs from [`block_size`](Self::block_size).
    pub fn encrypt(&self, key: &dyn PublicKeyHandle, data: &[u8]) -> SecureStorageResult<String> {
        let plain_block = self.plaintext_block_size();
        let block_count = data.len().div_ceil(plain_block).max(1);
        let mut ciphertext = Vec::with_capacity(block_count * self.block_size);

        if data.len() <= plain_block {
            self.encrypt_block(key, data, &mut ciphertext)?;
        } else {
            for chunk in data.chunks(plain_block) {
                self.encrypt_block(key, chunk, &mut ciphertext)?;
            }
        }

        Ok(STANDARD.encode(ciphertext))
    }

    fn encrypt_block(
        &self,
        key: &dyn PublicKeyHandle,
        chunk: &[u8],
        out: &mut Vec<u8>,
    ) -> SecureStorageResult<()> {
        let block = key.encrypt_block(chunk.to_vec())?;
        if block.len() != self.block_size {
            return Err(SecureStorageError::Cipher(format!(
                "cipher block is {} bytes, expected {}",
                block.len(),
                self.block_size
            )));
        }
        out.extend_from_slice(&block);
        Ok(())
    }

    /// Decrypts base64 text produced by [`encrypt`](Self::encrypt).
    ///
    /// `None` in gives `None` out. Line-wrapped base64 is accepted.
    ///
    /// # Errors
    ///
    /// - `Cipher` for invalid base64, empty ciphertext, a length that is not
    ///   a multiple of the block size, or a block the key rejects
    /// - `AuthenticationRequired` if the key's authentication window lapsed
    /// - `VaultUnavailable` if the vault cannot be reached
    pub fn decrypt(
        &self,
        key: &dyn PrivateKeyHandle,
        text: Option<&str>,
    ) -> SecureStorageResult<Option<Vec<u8>>> {
        let Some(text) = text else {
            return Ok(None);
        };

        let compact: String = text.chars().filter(|c| !c.is_ascii_whitespace()).collect();
        let ciphertext = STANDARD
            .decode(compact)
            .map_err(|err| SecureStorageError::Cipher(format!("invalid base64: {err}")))?;

        if ciphertext.is_empty() {
            return Err(SecureStorageError::Cipher("empty ciphertext".to_string()));
        }
        if ciphertext.len() % self.block_size != 0 {
            return Err(SecureStorageError::Cipher(format!(
                "ciphertext length {} is not a multiple of {}",
                ciphertext.len(),
                self.block_size
            )));
        }

        let mut plaintext = Zeroizing::new(Vec::with_capacity(ciphertext.len()));
        for block in ciphertext.chunks(self.block_size) {
            let decrypted = Zeroizing::new(key.decrypt_block(block.to_vec())?);
            plaintext.extend_from_slice(&decrypted);
        }

        Ok(Some(std::mem::take(&mut *plaintext)))
    }
}
