//! Deposit and withdraw transaction assembly.
//!
//! Ordering: create-idempotent destination account, wrap native SOL when
//! depositing it, refresh the reserve, deposit or redeem, unwrap, then the
//! optional relay fee.

use std::fmt;

use chain_sol::{
    derive_associated_token_address, spl_token, system, Address, Blockhash, Instruction,
    UnsignedTransaction, NATIVE_MINT,
};
use fee_relay::{Network, RelayProgram};
use tracing::debug;

use crate::config::ResolvedReserve;
use crate::environment::Environment;
use crate::error::LendingError;
use crate::fee::{relay_fee_instruction, PayFeeInToken};
use crate::instruction;
use crate::reserve::Reserve;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LendingAction {
    Deposit,
    Withdraw,
}

impl fmt::Display for LendingAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LendingAction::Deposit => "deposit",
            LendingAction::Withdraw => "withdraw",
        })
    }
}

/// Host arguments for a deposit or withdraw, as text.
#[derive(Debug, Clone)]
pub struct LendingRequest<'a> {
    /// Empty selects the relay program of the environment's network.
    pub relay_program_id: &'a str,
    /// Liquidity base units to deposit, or to receive when withdrawing.
    pub amount: u64,
    pub symbol: &'a str,
    pub owner: &'a str,
    pub environment: &'a str,
    /// Market name or address.
    pub lending_market_address: &'a str,
    pub blockhash: &'a str,
    pub free_transactions_count: u32,
    pub need_to_use_relay: bool,
    /// JSON fee token, or empty.
    pub pay_fee_in_token: &'a str,
    /// Required only when `need_to_use_relay` is set.
    pub fee_payer: &'a str,
}

/// Validated deposit or withdraw intent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LendingIntent {
    pub relay_program: RelayProgram,
    pub amount: u64,
    pub symbol: String,
    pub owner: Address,
    pub environment: Environment,
    pub market: String,
    pub blockhash: Blockhash,
    pub free_transactions_count: u32,
    pub need_to_use_relay: bool,
    pub pay_fee_in_token: Option<PayFeeInToken>,
    pub fee_payer: Address,
}

fn parse_address(field: &str, text: &str) -> Result<Address, LendingError> {
    text.trim()
        .parse()
        .map_err(|e| LendingError::InvalidAddress(format!("{field}: {e}")))
}

impl TryFrom<&LendingRequest<'_>> for LendingIntent {
    type Error = LendingError;

    fn try_from(req: &LendingRequest<'_>) -> Result<Self, Self::Error> {
        if req.amount == 0 {
            return Err(LendingError::InvalidAmount("amount must be greater than zero".into()));
        }
        if req.symbol.trim().is_empty() {
            return Err(LendingError::UnknownSymbol("empty symbol".into()));
        }

        let environment: Environment = req.environment.parse()?;
        let owner = parse_address("owner", req.owner)?;

        let relay_program = if req.relay_program_id.trim().is_empty() {
            RelayProgram::for_network(match environment {
                Environment::Devnet => Network::Devnet,
                Environment::Production | Environment::Beta => Network::Mainnet,
            })
        } else {
            RelayProgram::new(parse_address("relay program id", req.relay_program_id)?)
        };

        // The sponsor only pays when the relay is used; otherwise the owner does.
        let fee_payer = if req.need_to_use_relay {
            parse_address("fee payer", req.fee_payer)?
        } else {
            owner
        };

        Ok(Self {
            relay_program,
            amount: req.amount,
            symbol: req.symbol.trim().to_string(),
            owner,
            environment,
            market: req.lending_market_address.trim().to_string(),
            blockhash: parse_address("blockhash", req.blockhash)?,
            free_transactions_count: req.free_transactions_count,
            need_to_use_relay: req.need_to_use_relay,
            pay_fee_in_token: PayFeeInToken::parse(req.pay_fee_in_token)?,
            fee_payer,
        })
    }
}

/// Instructions for `action`, in execution order.
pub fn assemble_lending(
    action: LendingAction,
    intent: &LendingIntent,
    resolved: &ResolvedReserve,
    reserve: &Reserve,
) -> Result<Vec<Instruction>, LendingError> {
    let owner = &intent.owner;
    let payer = &intent.fee_payer;
    let mint = resolved.asset.mint_address;
    let is_native = mint == NATIVE_MINT;
    let collateral_mint = resolved.reserve.collateral_mint_address;

    let liquidity_account = derive_associated_token_address(owner, &mint)?;
    let collateral_account = derive_associated_token_address(owner, &collateral_mint)?;

    let mut instructions = Vec::new();

    match action {
        LendingAction::Deposit => {
            instructions.push(spl_token::create_associated_token_account_idempotent(
                payer,
                owner,
                &collateral_mint,
            )?);
            if is_native {
                instructions.push(spl_token::create_associated_token_account_idempotent(
                    payer, owner, &mint,
                )?);
                instructions.push(system::transfer(owner, &liquidity_account, intent.amount));
                instructions.push(spl_token::sync_native(&liquidity_account));
            }
            instructions.push(instruction::refresh_reserve(resolved, reserve));
            instructions.push(instruction::deposit_reserve_liquidity(
                resolved,
                intent.amount,
                &liquidity_account,
                &collateral_account,
                owner,
            )?);
        }
        LendingAction::Withdraw => {
            instructions.push(spl_token::create_associated_token_account_idempotent(
                payer, owner, &mint,
            )?);
            instructions.push(instruction::refresh_reserve(resolved, reserve));
            instructions.push(instruction::redeem_reserve_collateral(
                resolved,
                reserve.liquidity_to_collateral(intent.amount)?,
                &collateral_account,
                &liquidity_account,
                owner,
            )?);
        }
    }

    if is_native {
        instructions.push(spl_token::close_account(&liquidity_account, owner, owner));
    }

    if let Some(ix) = relay_fee_instruction(
        &intent.relay_program,
        owner,
        payer,
        intent.need_to_use_relay,
        intent.free_transactions_count,
        intent.pay_fee_in_token.as_ref(),
    )? {
        instructions.push(ix);
    }

    Ok(instructions)
}

pub fn build_lending_transaction(
    action: LendingAction,
    intent: &LendingIntent,
    resolved: &ResolvedReserve,
    reserve: &Reserve,
) -> Result<UnsignedTransaction, LendingError> {
    let instructions = assemble_lending(action, intent, resolved, reserve)?;
    let transaction = UnsignedTransaction::new(&instructions, &intent.fee_payer, &intent.blockhash)?;

    debug!(
        %action,
        symbol = %intent.symbol,
        amount = intent.amount,
        relay = intent.need_to_use_relay,
        instructions = instructions.len(),
        "built lending transaction"
    );
    Ok(transaction)
}
