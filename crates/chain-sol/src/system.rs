//! System program and sysvar ids, plus the one System instruction we need.

use crate::address::Address;
use crate::transaction::{AccountMeta, Instruction};

/// System Program: 32 zero bytes, `11111111111111111111111111111111`.
pub const SYSTEM_PROGRAM_ID: Address = Address::new([0u8; 32]);

pub const SYSVAR_RENT_ID: Address =
    Address::from_base58_const("SysvarRent111111111111111111111111111111111");

pub const SYSVAR_CLOCK_ID: Address =
    Address::from_base58_const("SysvarC1ock11111111111111111111111111111111");

/// System `Transfer` instruction index (u32 LE).
const TRANSFER_INDEX: u32 = 2;

/// Move `lamports` of native SOL from `from` (signer) to `to`.
///
/// Data: `[2, 0, 0, 0]` (u32 LE instruction index) + u64 LE lamports = 12 bytes.
pub fn transfer(from: &Address, to: &Address, lamports: u64) -> Instruction {
    let mut data = Vec::with_capacity(12);
    data.extend_from_slice(&TRANSFER_INDEX.to_le_bytes());
    data.extend_from_slice(&lamports.to_le_bytes());

    Instruction {
        program_id: SYSTEM_PROGRAM_ID,
        accounts: vec![AccountMeta::writable(*from, true), AccountMeta::writable(*to, false)],
        data,
    }
}
