//! Which auxiliary accounts a relayed transaction must create inline.

use chain_sol::{spl_token, system, Address, Instruction};

use crate::error::FeeRelayError;
use crate::intent::{RelayTopUp, RelayedTransfer};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisioningStep {
    /// Create `wallet`'s associated token account for `mint`, rent paid by
    /// `payer`.
    CreateTokenAccount {
        payer: Address,
        wallet: Address,
        mint: Address,
        rent: u64,
    },
    /// Fund the user's relay PDA up to its rent-exempt floor.
    FundRelayAccount {
        payer: Address,
        relay_account: Address,
        rent: u64,
    },
}

impl ProvisioningStep {
    /// Lamports the fee payer fronts for this account.
    pub fn rent(&self) -> u64 {
        match self {
            ProvisioningStep::CreateTokenAccount { rent, .. }
            | ProvisioningStep::FundRelayAccount { rent, .. } => *rent,
        }
    }

    pub fn instruction(&self) -> Result<Instruction, FeeRelayError> {
        match self {
            ProvisioningStep::CreateTokenAccount {
                payer,
                wallet,
                mint,
                ..
            } => Ok(spl_token::create_associated_token_account(payer, wallet, mint)?),
            ProvisioningStep::FundRelayAccount {
                payer,
                relay_account,
                rent,
            } => Ok(system::transfer(payer, relay_account, *rent)),
        }
    }
}

/// Ordered account-creation steps, derived only from caller-supplied flags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProvisioningPlan {
    steps: Vec<ProvisioningStep>,
}

impl ProvisioningPlan {
    pub fn for_transfer(intent: &RelayedTransfer) -> Self {
        let mut steps = Vec::new();
        if intent.needs_create_recipient_token_account {
            steps.push(ProvisioningStep::CreateTokenAccount {
                payer: intent.fee_payer,
                wallet: intent.recipient,
                mint: intent.mint,
                rent: intent.minimum_token_account_balance,
            });
        }
        Self { steps }
    }

    pub fn for_top_up(intent: &RelayTopUp) -> Result<Self, FeeRelayError> {
        let mut steps = Vec::new();
        if intent.needs_create_user_relay_account {
            steps.push(ProvisioningStep::FundRelayAccount {
                payer: intent.fee_payer,
                relay_account: intent.relay_program.user_relay_address(&intent.authority)?,
                rent: intent.minimum_relay_account_balance,
            });
        }
        Ok(Self { steps })
    }

    pub fn steps(&self) -> &[ProvisioningStep] {
        &self.steps
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Total rent fronted by the fee payer across all steps.
    pub fn rent(&self) -> Result<u64, FeeRelayError> {
        self.steps.iter().try_fold(0u64, |acc, step| {
            acc.checked_add(step.rent())
                .ok_or_else(|| FeeRelayError::InvalidAmount("rent total overflows u64".into()))
        })
    }

    pub fn instructions(&self) -> Result<Vec<Instruction>, FeeRelayError> {
        self.steps.iter().map(ProvisioningStep::instruction).collect()
    }
}
