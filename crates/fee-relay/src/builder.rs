//! Instruction assembly for relayed transactions.
//!
//! `assemble_*` are pure: intent in, ordered instructions and fee out.
//! `build_*` add the blockhash and fee payer to produce an unsigned
//! transaction ready for a custodian to sign.

use chain_sol::{spl_token, Blockhash, Instruction, SolError, UnsignedTransaction};
use serde::Serialize;
use tracing::debug;

use crate::error::FeeRelayError;
use crate::fee::{self, FeeAmount};
use crate::intent::{RelayTopUp, RelayedTransfer};
use crate::provisioning::ProvisioningPlan;

/// Instructions for an intent, in execution order, plus what they cost.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assembled {
    pub instructions: Vec<Instruction>,
    pub fee: FeeAmount,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltTransaction {
    pub transaction: UnsignedTransaction,
    pub fee: FeeAmount,
}

/// JSON shape returned to hosts: base58 wire text plus the fee breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuiltTransactionView {
    pub transaction: String,
    pub fee: FeeAmount,
}

impl BuiltTransaction {
    pub fn to_base58(&self) -> Result<String, SolError> {
        self.transaction.to_base58()
    }

    pub fn view(&self) -> Result<BuiltTransactionView, SolError> {
        Ok(BuiltTransactionView {
            transaction: self.to_base58()?,
            fee: self.fee,
        })
    }
}

/// `[create recipient account?, transfer, fee?]`
///
/// The transfer moves the full amount; the fee is never netted out of it.
pub fn assemble_relayed_transfer(intent: &RelayedTransfer) -> Result<Assembled, FeeRelayError> {
    let plan = ProvisioningPlan::for_transfer(intent);
    let mut instructions = plan.instructions()?;

    instructions.push(spl_token::transfer_checked(
        &intent.sender_token_account,
        &intent.mint,
        &intent.recipient_token_account()?,
        &intent.authority,
        intent.amount.amount,
        intent.amount.decimals,
    )?);

    if let Some(ix) = fee::transfer_fee_instruction(intent)? {
        instructions.push(ix);
    }

    Ok(Assembled {
        instructions,
        fee: fee::transfer_fee(intent, &plan)?,
    })
}

/// `[fund relay account?, swap, reimburse fee payer?]`
pub fn assemble_relay_top_up(intent: &RelayTopUp) -> Result<Assembled, FeeRelayError> {
    let plan = ProvisioningPlan::for_top_up(intent)?;
    let fee = fee::top_up_fee(intent, &plan)?;
    let mut instructions = plan.instructions()?;

    instructions.push(intent.relay_program.top_up_swap(
        &intent.fee_payer,
        &intent.authority,
        &intent.source_token_account,
        &intent.swap_data,
    )?);

    if let Some(ix) = fee::top_up_reimbursement(intent, &fee)? {
        instructions.push(ix);
    }

    Ok(Assembled { instructions, fee })
}

pub fn build_relayed_transfer(
    intent: &RelayedTransfer,
    blockhash: &Blockhash,
) -> Result<BuiltTransaction, FeeRelayError> {
    let assembled = assemble_relayed_transfer(intent)?;
    let transaction = UnsignedTransaction::new(&assembled.instructions, &intent.fee_payer, blockhash)?;

    debug!(
        mint = %intent.mint,
        amount = %intent.amount,
        fee = intent.fee_amount,
        create_recipient = intent.needs_create_recipient_token_account,
        instructions = assembled.instructions.len(),
        "built relayed transfer"
    );

    Ok(BuiltTransaction {
        transaction,
        fee: assembled.fee,
    })
}

pub fn build_relay_top_up(
    intent: &RelayTopUp,
    blockhash: &Blockhash,
) -> Result<BuiltTransaction, FeeRelayError> {
    let assembled = assemble_relay_top_up(intent)?;
    let transaction = UnsignedTransaction::new(&assembled.instructions, &intent.fee_payer, blockhash)?;

    debug!(
        source_mint = %intent.source_mint,
        fee = intent.fee_amount,
        create_relay_account = intent.needs_create_user_relay_account,
        swap_data_len = intent.swap_data.len(),
        "built relay top-up"
    );

    Ok(BuiltTransaction {
        transaction,
        fee: assembled.fee,
    })
}
