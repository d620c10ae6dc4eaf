//! Token-lending program instructions used by deposits and withdrawals.

use chain_sol::{find_program_address, AccountMeta, Address, Instruction, SYSVAR_CLOCK_ID, TOKEN_PROGRAM_ID};

use crate::config::ResolvedReserve;
use crate::error::LendingError;
use crate::reserve::Reserve;

pub const REFRESH_RESERVE: u8 = 3;
pub const DEPOSIT_RESERVE_LIQUIDITY: u8 = 4;
pub const REDEEM_RESERVE_COLLATERAL: u8 = 5;

/// PDA `[market]` under the lending program that signs for reserve vaults.
pub fn market_authority(program_id: &Address, market: &Address) -> Result<Address, LendingError> {
    let (address, _) = find_program_address(&[market.as_ref()], program_id)?;
    Ok(address)
}

/// Bring the reserve's interest and price up to the current slot. Must
/// precede a deposit or redeem in the same transaction.
pub fn refresh_reserve(resolved: &ResolvedReserve, reserve: &Reserve) -> Instruction {
    Instruction {
        program_id: resolved.program_id,
        accounts: vec![
            AccountMeta::writable(resolved.reserve.address, false),
            AccountMeta::readonly(reserve.liquidity.pyth_oracle, false),
            AccountMeta::readonly(reserve.liquidity.switchboard_oracle, false),
            AccountMeta::readonly(SYSVAR_CLOCK_ID, false),
        ],
        data: vec![REFRESH_RESERVE],
    }
}

/// Supply `liquidity_amount` from `source_liquidity` and mint collateral
/// tokens into `destination_collateral`.
pub fn deposit_reserve_liquidity(
    resolved: &ResolvedReserve,
    liquidity_amount: u64,
    source_liquidity: &Address,
    destination_collateral: &Address,
    owner: &Address,
) -> Result<Instruction, LendingError> {
    if liquidity_amount == 0 {
        return Err(LendingError::InvalidAmount("deposit amount must be greater than zero".into()));
    }
    let authority = market_authority(&resolved.program_id, &resolved.market)?;

    Ok(Instruction {
        program_id: resolved.program_id,
        accounts: vec![
            AccountMeta::writable(*source_liquidity, false),
            AccountMeta::writable(*destination_collateral, false),
            AccountMeta::writable(resolved.reserve.address, false),
            AccountMeta::writable(resolved.reserve.liquidity_address, false),
            AccountMeta::writable(resolved.reserve.collateral_mint_address, false),
            AccountMeta::readonly(resolved.market, false),
            AccountMeta::readonly(authority, false),
            AccountMeta::readonly(*owner, true),
            AccountMeta::readonly(SYSVAR_CLOCK_ID, false),
            AccountMeta::readonly(TOKEN_PROGRAM_ID, false),
        ],
        data: amount_data(DEPOSIT_RESERVE_LIQUIDITY, liquidity_amount),
    })
}

/// Burn `collateral_amount` from `source_collateral` and return the
/// underlying liquidity to `destination_liquidity`.
pub fn redeem_reserve_collateral(
    resolved: &ResolvedReserve,
    collateral_amount: u64,
    source_collateral: &Address,
    destination_liquidity: &Address,
    owner: &Address,
) -> Result<Instruction, LendingError> {
    if collateral_amount == 0 {
        return Err(LendingError::InvalidAmount("redeem amount must be greater than zero".into()));
    }
    let authority = market_authority(&resolved.program_id, &resolved.market)?;

    Ok(Instruction {
        program_id: resolved.program_id,
        accounts: vec![
            AccountMeta::writable(*source_collateral, false),
            AccountMeta::writable(*destination_liquidity, false),
            AccountMeta::writable(resolved.reserve.address, false),
            AccountMeta::writable(resolved.reserve.collateral_mint_address, false),
            AccountMeta::writable(resolved.reserve.liquidity_address, false),
            AccountMeta::readonly(resolved.market, false),
            AccountMeta::readonly(authority, false),
            AccountMeta::readonly(*owner, true),
            AccountMeta::readonly(SYSVAR_CLOCK_ID, false),
            AccountMeta::readonly(TOKEN_PROGRAM_ID, false),
        ],
        data: amount_data(REDEEM_RESERVE_COLLATERAL, collateral_amount),
    })
}

fn amount_data(tag: u8, amount: u64) -> Vec<u8> {
    let mut data = Vec::with_capacity(9);
    data.push(tag);
    data.extend_from_slice(&amount.to_le_bytes());
    data
}
