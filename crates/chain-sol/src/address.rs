//! Solana addresses and program-derived addresses.
//!
//! A Solana address is the Base58 encoding of a raw 32-byte Ed25519 public
//! key. There is no hashing step (unlike Bitcoin or Ethereum). Program
//! derived addresses (PDAs) are SHA-256 outputs that deliberately fall OFF
//! the Ed25519 curve so that no private key can exist for them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

use crate::error::SolError;

/// The string appended to PDA derivation: "ProgramDerivedAddress".
const PDA_MARKER: &[u8] = b"ProgramDerivedAddress";

/// Maximum length of a single PDA seed.
const MAX_SEED_LEN: usize = 32;

/// A 32-byte ledger address, compared by byte equality.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address([u8; 32]);

/// A recent blockhash shares the address representation: 32 bytes, Base58.
pub type Blockhash = Address;

impl Address {
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub const fn to_bytes(self) -> [u8; 32] {
        self.0
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Parse a Base58 string. The decoded payload must be exactly 32 bytes.
    pub fn from_base58(text: &str) -> Result<Self, SolError> {
        let bytes = bs58::decode(text)
            .into_vec()
            .map_err(|e| SolError::InvalidAddress(format!("{text:?}: base58 decode failed: {e}")))?;

        let arr: [u8; 32] = bytes.try_into().map_err(|v: Vec<u8>| {
            SolError::InvalidAddress(format!("{text:?}: expected 32 bytes, got {}", v.len()))
        })?;

        Ok(Self(arr))
    }

    /// Decode a Base58 literal at compile time, for well-known program ids.
    ///
    /// Invalid input fails const evaluation, so a typo in a program id is a
    /// build error rather than a runtime one.
    pub const fn from_base58_const(text: &str) -> Self {
        const ALPHABET: &[u8; 58] = b"123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

        let input = text.as_bytes();
        let mut out = [0u8; 32];
        let mut i = 0;
        while i < input.len() {
            let mut digit = 58;
            let mut j = 0;
            while j < 58 {
                if ALPHABET[j] == input[i] {
                    digit = j;
                    break;
                }
                j += 1;
            }
            if digit == 58 {
                panic!("invalid base58 character");
            }

            // out = out * 58 + digit, big-endian.
            let mut carry = digit as u32;
            let mut k = 32;
            while k > 0 {
                k -= 1;
                let value = out[k] as u32 * 58 + carry;
                out[k] = (value & 0xff) as u8;
                carry = value >> 8;
            }
            if carry != 0 {
                panic!("base58 literal exceeds 32 bytes");
            }
            i += 1;
        }

        Self(out)
    }

    pub fn to_base58(&self) -> String {
        bs58::encode(self.0).into_string()
    }

    /// Whether these bytes decompress to a point on the Ed25519 curve.
    ///
    /// Wallet addresses are on the curve; PDAs never are.
    pub fn is_on_curve(&self) -> bool {
        curve25519_dalek::edwards::CompressedEdwardsY(self.0)
            .decompress()
            .is_some()
    }
}

impl From<[u8; 32]> for Address {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for Address {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl FromStr for Address {
    type Err = SolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_base58(s)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base58())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_base58())
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_base58())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Address::from_base58(&text).map_err(serde::de::Error::custom)
    }
}

/// Find a valid Program Derived Address (PDA) for the given seeds and program.
///
/// Iterates bump seeds from 255 down to 0, computing
/// `SHA-256(seed_0 || seed_1 || ... || bump || program_id || "ProgramDerivedAddress")`
/// and returning the first result that is NOT a valid Ed25519 point.
pub fn find_program_address(
    seeds: &[&[u8]],
    program_id: &Address,
) -> Result<(Address, u8), SolError> {
    if let Some(seed) = seeds.iter().find(|s| s.len() > MAX_SEED_LEN) {
        return Err(SolError::InvalidAddress(format!(
            "PDA seed of {} bytes exceeds {MAX_SEED_LEN}",
            seed.len()
        )));
    }

    for bump in (0u8..=255).rev() {
        if let Some(address) = create_program_address(seeds, bump, program_id) {
            return Ok((address, bump));
        }
    }

    Err(SolError::InvalidAddress(
        "could not find valid PDA bump seed".into(),
    ))
}

/// Returns `Some(address)` if the derived point is OFF the Ed25519 curve,
/// `None` if it falls on the curve (invalid PDA, try next bump).
fn create_program_address(seeds: &[&[u8]], bump: u8, program_id: &Address) -> Option<Address> {
    let mut hasher = Sha256::new();

    for seed in seeds {
        hasher.update(seed);
    }
    hasher.update([bump]);
    hasher.update(program_id.as_bytes());
    hasher.update(PDA_MARKER);

    let candidate = Address(hasher.finalize().into());

    if candidate.is_on_curve() {
        return None;
    }

    Some(candidate)
}
