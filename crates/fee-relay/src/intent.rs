//! Relay intents: what the caller wants done, with every address parsed.
//!
//! Intents are built from the text arguments the host passes across the
//! boundary. `needs_create_*` flags are trusted as given: the caller probes
//! the ledger before building, and nothing here re-checks account existence.

use chain_sol::{derive_associated_token_address, Address, TokenAmount};

use crate::error::FeeRelayError;
use crate::relay_program::RelayProgram;

fn parse(field: &'static str, text: &str) -> Result<Address, FeeRelayError> {
    Address::from_base58(text.trim()).map_err(|e| FeeRelayError::address(field, e))
}

// ---------------------------------------------------------------------------
// Relayed SPL transfer
// ---------------------------------------------------------------------------

/// Text arguments for a relayed token transfer, as received from the host.
#[derive(Debug, Clone, Copy)]
pub struct RelayedTransferRequest<'a> {
    pub relay_program_id: &'a str,
    pub sender_token_account: &'a str,
    pub recipient: &'a str,
    pub mint: &'a str,
    pub authority: &'a str,
    pub amount: u64,
    pub decimals: u8,
    pub fee_amount: u64,
    pub minimum_token_account_balance: u64,
    pub needs_create_recipient_token_account: bool,
    pub fee_payer: &'a str,
}

/// Move `amount` of `mint` from the sender's token account to the
/// recipient wallet's associated token account, with the fee payer covering
/// network fees and optionally the recipient account's rent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayedTransfer {
    pub relay_program: RelayProgram,
    pub sender_token_account: Address,
    /// Recipient wallet; tokens land in its associated token account.
    pub recipient: Address,
    pub mint: Address,
    /// Owner of the sender token account.
    pub authority: Address,
    pub amount: TokenAmount,
    pub fee_amount: u64,
    pub minimum_token_account_balance: u64,
    pub needs_create_recipient_token_account: bool,
    pub fee_payer: Address,
}

impl RelayedTransfer {
    pub fn recipient_token_account(&self) -> Result<Address, FeeRelayError> {
        Ok(derive_associated_token_address(&self.recipient, &self.mint)?)
    }

    /// Where the relay fee goes: the fee payer's account for the same mint.
    pub fn fee_collector_token_account(&self) -> Result<Address, FeeRelayError> {
        Ok(derive_associated_token_address(&self.fee_payer, &self.mint)?)
    }
}

impl TryFrom<&RelayedTransferRequest<'_>> for RelayedTransfer {
    type Error = FeeRelayError;

    fn try_from(req: &RelayedTransferRequest<'_>) -> Result<Self, Self::Error> {
        if req.amount == 0 {
            return Err(FeeRelayError::InvalidAmount(
                "transfer amount must be > 0".into(),
            ));
        }

        Ok(Self {
            relay_program: req.relay_program_id.parse()?,
            sender_token_account: parse("sender token account", req.sender_token_account)?,
            recipient: parse("recipient", req.recipient)?,
            mint: parse("token mint", req.mint)?,
            authority: parse("authority", req.authority)?,
            amount: TokenAmount::new(req.amount, req.decimals),
            fee_amount: req.fee_amount,
            minimum_token_account_balance: req.minimum_token_account_balance,
            needs_create_recipient_token_account: req.needs_create_recipient_token_account,
            fee_payer: parse("fee payer", req.fee_payer)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Relay top-up
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
pub struct RelayTopUpRequest<'a> {
    pub relay_program_id: &'a str,
    pub source_token_account: &'a str,
    pub source_mint: &'a str,
    pub authority: &'a str,
    /// Opaque swap instruction payload from the swap-quote service.
    pub swap_data: &'a [u8],
    pub fee_amount: u64,
    pub minimum_relay_account_balance: u64,
    pub minimum_token_account_balance: u64,
    pub needs_create_user_relay_account: bool,
    pub fee_payer: &'a str,
}

/// Swap some of the user's tokens into SOL held by their relay account, and
/// reimburse the fee payer out of that account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayTopUp {
    pub relay_program: RelayProgram,
    pub source_token_account: Address,
    pub source_mint: Address,
    pub authority: Address,
    pub swap_data: Vec<u8>,
    pub fee_amount: u64,
    pub minimum_relay_account_balance: u64,
    pub minimum_token_account_balance: u64,
    pub needs_create_user_relay_account: bool,
    pub fee_payer: Address,
}

impl TryFrom<&RelayTopUpRequest<'_>> for RelayTopUp {
    type Error = FeeRelayError;

    fn try_from(req: &RelayTopUpRequest<'_>) -> Result<Self, Self::Error> {
        let source_token_account = parse("source token account", req.source_token_account)?;
        let source_mint = parse("source token mint", req.source_mint)?;
        let fee_payer = parse("fee payer", req.fee_payer)?;

        // The relay would be swapping the fee payer's own tokens.
        if source_token_account == derive_associated_token_address(&fee_payer, &source_mint)? {
            return Err(FeeRelayError::InvalidAddress {
                field: "source token account",
                reason: "belongs to the fee payer".into(),
            });
        }

        Ok(Self {
            relay_program: req.relay_program_id.parse()?,
            source_token_account,
            source_mint,
            authority: parse("authority", req.authority)?,
            swap_data: req.swap_data.to_vec(),
            fee_amount: req.fee_amount,
            minimum_relay_account_balance: req.minimum_relay_account_balance,
            minimum_token_account_balance: req.minimum_token_account_balance,
            needs_create_user_relay_account: req.needs_create_user_relay_account,
            fee_payer,
        })
    }
}
