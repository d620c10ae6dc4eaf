//! Ed25519 keypairs as handed over by a wallet custodian.
//!
//! Two encodings are accepted, both Base58 text:
//! - the 64-byte Solana CLI layout `secret_seed || public_key`,
//! - a bare 32-byte secret seed.
//!
//! Decoded secret bytes are wiped as soon as the signing key is built; the
//! signing key itself is zeroized on drop by `ed25519-dalek`.

use std::fmt;

use ed25519_dalek::{Signer, SigningKey};
use zeroize::Zeroizing;

use crate::address::Address;
use crate::error::SolError;

pub struct Keypair {
    signing_key: SigningKey,
}

impl Keypair {
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(seed),
        }
    }

    /// Build from 32 seed bytes or 64 `seed || public` bytes.
    ///
    /// For the 64-byte layout the public half must match the key derived
    /// from the seed, otherwise the input is corrupt.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SolError> {
        match bytes.len() {
            32 | 64 => {}
            other => {
                return Err(SolError::InvalidKeypair(format!(
                    "expected 32 or 64 bytes, got {other}"
                )))
            }
        }

        let mut seed = Zeroizing::new([0u8; 32]);
        seed.copy_from_slice(&bytes[..32]);
        let keypair = Self::from_seed(&seed);

        if bytes.len() == 64 && keypair.address().as_bytes()[..] != bytes[32..] {
            return Err(SolError::InvalidKeypair(
                "public key half does not match secret seed".into(),
            ));
        }

        Ok(keypair)
    }

    pub fn from_base58(text: &str) -> Result<Self, SolError> {
        let bytes = Zeroizing::new(
            bs58::decode(text.trim())
                .into_vec()
                .map_err(|e| SolError::InvalidKeypair(format!("base58 decode failed: {e}")))?,
        );
        Self::from_bytes(&bytes)
    }

    pub fn address(&self) -> Address {
        Address::new(self.signing_key.verifying_key().to_bytes())
    }

    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        self.signing_key.sign(message).to_bytes()
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keypair")
            .field("address", &self.address())
            .finish_non_exhaustive()
    }
}
