//! The fee-relay on-chain program: ids, derived accounts and instructions.
//!
//! The relay program holds a per-user "relay account" (a PDA funded in SOL)
//! from which the fee payer is reimbursed, so a user holding only SPL
//! tokens can still transact.

use std::fmt;
use std::str::FromStr;

use chain_sol::{
    find_program_address, AccountMeta, Address, Instruction, NATIVE_MINT, SYSTEM_PROGRAM_ID,
    SYSVAR_RENT_ID, TOKEN_PROGRAM_ID,
};

use crate::error::FeeRelayError;

pub const MAINNET_PROGRAM_ID: Address =
    Address::from_base58_const("12YKFL4mnZz6CBEGePrf293mEzueQM3h8VLPUJsKpGs9");

/// Shared by devnet and testnet deployments.
pub const DEVNET_PROGRAM_ID: Address =
    Address::from_base58_const("6xKJFyuM6UHCT8F5SBxnjGt6ZrZYjsVfnAnAeHPU775k");

/// Instruction discriminants (first data byte).
pub mod index {
    pub const TOP_UP_DIRECT: u8 = 0;
    pub const TOP_UP_TRANSITIVE: u8 = 1;
    pub const TRANSFER_SOL: u8 = 2;
    pub const CREATE_TRANSIT_TOKEN: u8 = 3;
    pub const TRANSITIVE_SWAP: u8 = 4;
}

const RELAY_SEED: &[u8] = b"relay";
const TEMPORARY_WSOL_SEED: &[u8] = b"temporary_wsol";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Network {
    Mainnet,
    Devnet,
    Testnet,
}

/// A relay program deployment, identified by its program id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayProgram {
    id: Address,
}

impl RelayProgram {
    pub fn new(id: Address) -> Self {
        Self { id }
    }

    pub fn for_network(network: Network) -> Self {
        match network {
            Network::Mainnet => Self::new(MAINNET_PROGRAM_ID),
            Network::Devnet | Network::Testnet => Self::new(DEVNET_PROGRAM_ID),
        }
    }

    pub fn id(&self) -> Address {
        self.id
    }

    /// PDA `[user, "relay"]` holding the user's SOL balance with the relay.
    pub fn user_relay_address(&self, user: &Address) -> Result<Address, FeeRelayError> {
        let (address, _) = find_program_address(&[user.as_ref(), RELAY_SEED], &self.id)?;
        Ok(address)
    }

    /// PDA `[user, "temporary_wsol"]` receiving swap output during a top-up.
    pub fn user_temporary_wsol_address(&self, user: &Address) -> Result<Address, FeeRelayError> {
        let (address, _) = find_program_address(&[user.as_ref(), TEMPORARY_WSOL_SEED], &self.id)?;
        Ok(address)
    }

    /// Pay `lamports` out of the user's relay account to `recipient`.
    ///
    /// Data: `[2]` + u64 LE lamports.
    pub fn transfer_sol(
        &self,
        user_authority: &Address,
        recipient: &Address,
        lamports: u64,
    ) -> Result<Instruction, FeeRelayError> {
        let mut data = Vec::with_capacity(9);
        data.push(index::TRANSFER_SOL);
        data.extend_from_slice(&lamports.to_le_bytes());

        Ok(Instruction {
            program_id: self.id,
            accounts: vec![
                AccountMeta::readonly(*user_authority, true),
                AccountMeta::writable(self.user_relay_address(user_authority)?, false),
                AccountMeta::writable(*recipient, false),
                AccountMeta::readonly(SYSTEM_PROGRAM_ID, false),
            ],
            data,
        })
    }

    /// Swap the user's tokens into SOL credited to their relay account.
    ///
    /// `swap_data` comes from the swap-quote service and already carries its
    /// own discriminant and pool accounts encoding; it is used verbatim as
    /// the instruction data.
    pub fn top_up_swap(
        &self,
        fee_payer: &Address,
        user_authority: &Address,
        user_source_token_account: &Address,
        swap_data: &[u8],
    ) -> Result<Instruction, FeeRelayError> {
        Ok(Instruction {
            program_id: self.id,
            accounts: vec![
                AccountMeta::readonly(NATIVE_MINT, false),
                AccountMeta::writable(*fee_payer, true),
                AccountMeta::readonly(*user_authority, true),
                AccountMeta::writable(self.user_relay_address(user_authority)?, false),
                AccountMeta::readonly(TOKEN_PROGRAM_ID, false),
                AccountMeta::writable(*user_source_token_account, false),
                AccountMeta::writable(self.user_temporary_wsol_address(user_authority)?, false),
                AccountMeta::readonly(SYSVAR_RENT_ID, false),
                AccountMeta::readonly(SYSTEM_PROGRAM_ID, false),
            ],
            data: swap_data.to_vec(),
        })
    }
}

impl Default for RelayProgram {
    fn default() -> Self {
        Self::for_network(Network::Mainnet)
    }
}

impl FromStr for RelayProgram {
    type Err = FeeRelayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let id = Address::from_base58(s.trim())
            .map_err(|e| FeeRelayError::address("relay program id", e))?;
        Ok(Self::new(id))
    }
}

impl fmt::Display for RelayProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.id, f)
    }
}
