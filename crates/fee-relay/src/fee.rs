//! Fee extraction: what the relay charges and the instruction that collects it.
//!
//! The relay fee never reduces the amount the recipient gets. It is always a
//! separate instruction placed after the transfer or swap.

use chain_sol::{spl_token, Instruction};
use serde::{Deserialize, Serialize};

use crate::error::FeeRelayError;
use crate::intent::{RelayTopUp, RelayedTransfer};
use crate::provisioning::ProvisioningPlan;

/// Lamports a relayed transaction costs its sponsor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeAmount {
    /// Network and relay fee for the transaction itself.
    pub transaction: u64,
    /// Rent the fee payer fronts for accounts created inline.
    pub account_balances: u64,
}

impl FeeAmount {
    pub fn total(&self) -> Result<u64, FeeRelayError> {
        self.transaction
            .checked_add(self.account_balances)
            .ok_or_else(|| FeeRelayError::InvalidAmount("fee total overflows u64".into()))
    }
}

/// Fee breakdown for a relayed transfer.
///
/// Only rent for the recipient account counts as fronted balance; the relay
/// fee itself is paid in the transferred token.
pub fn transfer_fee(intent: &RelayedTransfer, plan: &ProvisioningPlan) -> Result<FeeAmount, FeeRelayError> {
    Ok(FeeAmount {
        transaction: intent.fee_amount,
        account_balances: plan.rent()?,
    })
}

/// `TransferChecked` of `fee_amount` from the sender's token account to the
/// fee payer's account for the same mint. `None` for a zero fee.
pub fn transfer_fee_instruction(intent: &RelayedTransfer) -> Result<Option<Instruction>, FeeRelayError> {
    if intent.fee_amount == 0 {
        return Ok(None);
    }

    let ix = spl_token::transfer_checked(
        &intent.sender_token_account,
        &intent.mint,
        &intent.fee_collector_token_account()?,
        &intent.authority,
        intent.fee_amount,
        intent.amount.decimals,
    )?;
    Ok(Some(ix))
}

/// Fee breakdown for a top-up.
///
/// Besides any relay-account rent, the fee payer always fronts the
/// temporary WSOL account that receives the swap output.
pub fn top_up_fee(intent: &RelayTopUp, plan: &ProvisioningPlan) -> Result<FeeAmount, FeeRelayError> {
    let account_balances = plan
        .rent()?
        .checked_add(intent.minimum_token_account_balance)
        .ok_or_else(|| FeeRelayError::InvalidAmount("fee total overflows u64".into()))?;

    Ok(FeeAmount {
        transaction: intent.fee_amount,
        account_balances,
    })
}

/// Relay `TransferSol` paying the whole fee back to the fee payer out of the
/// freshly topped-up relay account. `None` when there is nothing to repay.
pub fn top_up_reimbursement(intent: &RelayTopUp, fee: &FeeAmount) -> Result<Option<Instruction>, FeeRelayError> {
    let total = fee.total()?;
    if total == 0 {
        return Ok(None);
    }

    let ix = intent
        .relay_program
        .transfer_sol(&intent.authority, &intent.fee_payer, total)?;
    Ok(Some(ix))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intent::fixtures::*;
    use chain_sol::TOKEN_PROGRAM_ID;

    #[test]
    fn total_adds_components() {
        let fee = FeeAmount {
            transaction: 5_000,
            account_balances: 2_039_280,
        };
        assert_eq!(fee.total().unwrap(), 2_044_280);
    }

    #[test]
    fn total_overflow_is_an_error() {
        let fee = FeeAmount {
            transaction: u64::MAX,
            account_balances: 1,
        };
        assert!(matches!(fee.total(), Err(FeeRelayError::InvalidAmount(_))));
    }

    #[test]
    fn serializes_with_field_names() {
        let json = serde_json::to_value(FeeAmount {
            transaction: 1,
            account_balances: 2,
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({"transaction": 1, "account_balances": 2}));
    }

    #[test]
    fn transfer_fee_moves_exactly_the_fee() {
        let intent = RelayedTransfer::try_from(&transfer_request()).unwrap();
        let ix = transfer_fee_instruction(&intent).unwrap().unwrap();

        assert_eq!(ix.program_id, TOKEN_PROGRAM_ID);
        assert_eq!(u64::from_le_bytes(ix.data[1..9].try_into().unwrap()), 5_000);
        assert_eq!(ix.accounts[0].pubkey, intent.sender_token_account);
        assert_eq!(ix.accounts[2].pubkey, intent.fee_collector_token_account().unwrap());
    }

    #[test]
    fn zero_transfer_fee_has_no_instruction() {
        let mut intent = RelayedTransfer::try_from(&transfer_request()).unwrap();
        intent.fee_amount = 0;
        assert!(transfer_fee_instruction(&intent).unwrap().is_none());
    }

    #[test]
    fn top_up_fee_counts_relay_and_wsol_rent() {
        let intent = RelayTopUp::try_from(&top_up_request(&[0])).unwrap();
        let plan = ProvisioningPlan::for_top_up(&intent).unwrap();
        let fee = top_up_fee(&intent, &plan).unwrap();

        assert_eq!(fee.transaction, 10_000);
        assert_eq!(fee.account_balances, 890_880 + 2_039_280);
    }

    #[test]
    fn top_up_reimbursement_repays_total() {
        let intent = RelayTopUp::try_from(&top_up_request(&[0])).unwrap();
        let fee = FeeAmount {
            transaction: 10_000,
            account_balances: 100,
        };
        let ix = top_up_reimbursement(&intent, &fee).unwrap().unwrap();
        assert_eq!(u64::from_le_bytes(ix.data[1..9].try_into().unwrap()), 10_100);
        assert_eq!(ix.accounts[2].pubkey, intent.fee_payer);
    }

    #[test]
    fn nothing_to_repay_has_no_instruction() {
        let intent = RelayTopUp::try_from(&top_up_request(&[0])).unwrap();
        assert!(top_up_reimbursement(&intent, &FeeAmount::default())
            .unwrap()
            .is_none());
    }
}
