pub mod config;
pub mod envelope;
pub mod error;
pub mod logging;
mod queries;
pub mod runtime;

use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine as _};
use chain_sol::{derive_associated_token_address, Address, Keypair};
use error::RelayError;
use fee_relay::{BuiltTransaction, RelayTopUp, RelayTopUpRequest, RelayedTransfer, RelayedTransferRequest};
use tracing::debug;

pub use config::SdkConfig;
pub use runtime::RuntimeHandle;

// Include the UniFFI scaffolding
uniffi::include_scaffolding!("relay_core");

// ─── UniFFI-exported types ───────────────────────────────────────────

/// Unsigned transaction (base58 wire text) and what it costs the sponsor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayTransaction {
    pub transaction: String,
    pub fee_transaction: u64,
    pub fee_account_balances: u64,
}

impl TryFrom<BuiltTransaction> for RelayTransaction {
    type Error = RelayError;

    fn try_from(built: BuiltTransaction) -> Result<Self, Self::Error> {
        Ok(Self {
            transaction: built.to_base58()?,
            fee_transaction: built.fee.transaction,
            fee_account_balances: built.fee.account_balances,
        })
    }
}

// ─── UniFFI-exported functions ───────────────────────────────────────
// Note: UniFFI passes owned String/Vec<u8> across FFI, so all functions
// accept owned types (not references). None of these need a runtime.

/// Build a relayed SPL token transfer:
/// `[create recipient account?, transfer, relay fee?]`.
#[allow(clippy::too_many_arguments)]
pub fn transfer_spl_token(
    relay_program_id: String,
    sender_token_account: String,
    recipient: String,
    mint: String,
    authority: String,
    amount: u64,
    decimals: u8,
    fee_amount: u64,
    blockhash: String,
    minimum_token_account_balance: u64,
    needs_create_recipient_token_account: bool,
    fee_payer: String,
) -> Result<RelayTransaction, RelayError> {
    let intent = RelayedTransfer::try_from(&RelayedTransferRequest {
        relay_program_id: &relay_program_id,
        sender_token_account: &sender_token_account,
        recipient: &recipient,
        mint: &mint,
        authority: &authority,
        amount,
        decimals,
        fee_amount,
        minimum_token_account_balance,
        needs_create_recipient_token_account,
        fee_payer: &fee_payer,
    })?;
    let blockhash = parse_blockhash(&blockhash)?;
    fee_relay::build_relayed_transfer(&intent, &blockhash)?.try_into()
}

/// Build a relay account top-up: `[fund relay account?, swap, reimburse?]`.
/// `swap_data` is the swap-quote service's payload, base64 encoded.
#[allow(clippy::too_many_arguments)]
pub fn top_up(
    relay_program_id: String,
    source_token_account: String,
    source_mint: String,
    authority: String,
    swap_data: String,
    fee_amount: u64,
    blockhash: String,
    minimum_relay_account_balance: u64,
    minimum_token_account_balance: u64,
    needs_create_user_relay_account: bool,
    fee_payer: String,
) -> Result<RelayTransaction, RelayError> {
    let swap_data = BASE64_STANDARD
        .decode(swap_data.trim())
        .map_err(|e| RelayError::Serialization(format!("swap data is not base64: {e}")))?;

    let intent = RelayTopUp::try_from(&RelayTopUpRequest {
        relay_program_id: &relay_program_id,
        source_token_account: &source_token_account,
        source_mint: &source_mint,
        authority: &authority,
        swap_data: &swap_data,
        fee_amount,
        minimum_relay_account_balance,
        minimum_token_account_balance,
        needs_create_user_relay_account,
        fee_payer: &fee_payer,
    })?;
    let blockhash = parse_blockhash(&blockhash)?;
    fee_relay::build_relay_top_up(&intent, &blockhash)?.try_into()
}

/// Sign a base58 transaction with a base58 keypair (64-byte keypair or
/// 32-byte seed). The blockhash must match the one the transaction embeds.
pub fn sign_transaction(transaction: String, keypair: String, blockhash: String) -> Result<String, RelayError> {
    let keypair = Keypair::from_base58(&keypair)?;
    let blockhash = parse_blockhash(&blockhash)?;
    let signed = chain_sol::sign_base58_transaction(&transaction, &keypair, &blockhash)?;

    debug!(signer = %keypair.address(), fully_signed = signed.is_fully_signed(), "signed transaction");
    Ok(signed.to_base58()?)
}

/// Associated token account of `owner` for `mint`.
pub fn derive_token_account_address(owner: String, mint: String) -> Result<String, RelayError> {
    let owner = Address::from_base58(owner.trim())?;
    let mint = Address::from_base58(mint.trim())?;
    Ok(derive_associated_token_address(&owner, &mint)?.to_string())
}

/// Install the library's log subscriber. See [`logging::init`].
pub fn init_logging(filter: String) -> Result<(), RelayError> {
    logging::init(&filter)
}

fn parse_blockhash(text: &str) -> Result<Address, RelayError> {
    Address::from_base58(text.trim()).map_err(|e| RelayError::InvalidAddress(format!("blockhash: {e}")))
}
