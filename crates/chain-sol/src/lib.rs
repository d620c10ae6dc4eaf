//! Solana ledger primitives for the relay SDK.
//!
//! Addresses, token amounts, instructions, the compact transaction wire
//! format and Ed25519 signing, all implemented by hand without `solana-sdk`
//! (which drags in tokio and 200+ transitive dependencies).
//!
//! Everything in this crate is synchronous and deterministic: the same
//! instructions, blockhash and fee payer always serialize to the same bytes,
//! which is what lets independent co-signers agree on what they sign.

pub mod address;
pub mod amount;
pub mod error;
pub mod keypair;
pub mod spl_token;
pub mod system;
pub mod transaction;

// Re-export key public types for ergonomic imports.
pub use address::{find_program_address, Address, Blockhash};
pub use amount::TokenAmount;
pub use error::SolError;
pub use keypair::Keypair;
pub use spl_token::{
    derive_associated_token_address, TokenAccount, ASSOCIATED_TOKEN_PROGRAM_ID, NATIVE_MINT,
    TOKEN_PROGRAM_ID,
};
pub use system::{SYSTEM_PROGRAM_ID, SYSVAR_CLOCK_ID, SYSVAR_RENT_ID};
pub use transaction::{
    compile_message, decode_compact_u16, encode_compact_u16, sign_base58_transaction,
    sign_transaction, AccountMeta, CompiledInstruction, Instruction, Message, SignedTransaction,
    UnsignedTransaction,
};
