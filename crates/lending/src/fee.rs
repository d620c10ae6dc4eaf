//! Relay fee paid by a lending transaction when the sponsor covers it.

use chain_sol::{spl_token, Address, Instruction, NATIVE_MINT};
use fee_relay::RelayProgram;
use serde::{Deserialize, Serialize};

use crate::error::LendingError;

/// Token the user pays the relay fee in, as supplied by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayFeeInToken {
    pub sender_account: Address,
    pub recipient_account: Address,
    pub mint: Address,
    pub amount: u64,
    pub decimals: u8,
}

impl PayFeeInToken {
    /// Empty text means "no fee token".
    pub fn parse(json: &str) -> Result<Option<Self>, LendingError> {
        if json.trim().is_empty() {
            return Ok(None);
        }
        serde_json::from_str(json)
            .map(Some)
            .map_err(|e| LendingError::InvalidFeeToken(e.to_string()))
    }
}

/// Whether the sponsor charges for this transaction at all.
pub fn relay_fee_applies(need_to_use_relay: bool, free_transactions_count: u32) -> bool {
    need_to_use_relay && free_transactions_count == 0
}

/// Fee instruction owed by `owner`, or `None` when nothing is charged.
///
/// Native-mint fees come out of the owner's relay account; any other mint
/// is a checked token transfer to the collector's account.
pub fn relay_fee_instruction(
    relay_program: &RelayProgram,
    owner: &Address,
    fee_payer: &Address,
    need_to_use_relay: bool,
    free_transactions_count: u32,
    pay_fee_in_token: Option<&PayFeeInToken>,
) -> Result<Option<Instruction>, LendingError> {
    if !relay_fee_applies(need_to_use_relay, free_transactions_count) {
        return Ok(None);
    }
    let token = pay_fee_in_token.ok_or_else(|| {
        LendingError::InvalidFeeToken("a fee token is required when the relay charges a fee".into())
    })?;
    if token.amount == 0 {
        return Ok(None);
    }

    let ix = if token.mint == NATIVE_MINT {
        relay_program.transfer_sol(owner, fee_payer, token.amount)?
    } else {
        spl_token::transfer_checked(
            &token.sender_account,
            &token.mint,
            &token.recipient_account,
            owner,
            token.amount,
            token.decimals,
        )?
    };
    Ok(Some(ix))
}
