//! On-chain reserve accounts and the market figures derived from them.

use chain_sol::{Address, TokenAmount};
use serde::{Deserialize, Serialize};

use crate::error::LendingError;

/// Fixed-point scale of `*_wads` fields.
pub const WAD: u128 = 1_000_000_000_000_000_000;

/// Approximate slots per year (400ms slots), the compounding period.
pub const SLOTS_PER_YEAR: f64 = 63_072_000.0;

/// Decoded reserve state. Rates in `config` are whole percentages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reserve {
    pub version: u8,
    pub lending_market: Address,
    pub liquidity: ReserveLiquidity,
    pub collateral: ReserveCollateral,
    pub config: ReserveRates,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReserveLiquidity {
    pub mint: Address,
    pub mint_decimals: u8,
    pub supply: Address,
    pub pyth_oracle: Address,
    pub switchboard_oracle: Address,
    pub available_amount: u64,
    pub borrowed_amount_wads: u128,
    pub market_price_wads: u128,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReserveCollateral {
    pub mint: Address,
    pub mint_total_supply: u64,
    pub supply: Address,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReserveRates {
    pub optimal_utilization_rate: u8,
    pub loan_to_value_ratio: u8,
    pub min_borrow_rate: u8,
    pub optimal_borrow_rate: u8,
    pub max_borrow_rate: u8,
    pub deposit_limit: u64,
    pub borrow_limit: u64,
    pub fee_receiver: Address,
}

/// Turns raw reserve account bytes into a [`Reserve`].
pub trait ReserveDecoder: Send + Sync {
    fn decode(&self, data: &[u8]) -> Result<Reserve, LendingError>;
}

/// The token-lending reserve account layout (version 1).
#[derive(Debug, Clone, Copy, Default)]
pub struct ReserveLayout;

impl ReserveLayout {
    /// Bytes up to and including the fee receiver; trailing padding is
    /// ignored.
    pub const MIN_LEN: usize = 371;
    pub const VERSION: u8 = 1;
}

impl ReserveDecoder for ReserveLayout {
    fn decode(&self, data: &[u8]) -> Result<Reserve, LendingError> {
        if data.len() < Self::MIN_LEN {
            return Err(LendingError::Decode(format!(
                "reserve account is {} bytes, expected at least {}",
                data.len(),
                Self::MIN_LEN
            )));
        }

        let version = data[0];
        if version != Self::VERSION {
            return Err(LendingError::Decode(format!(
                "unsupported reserve version {version}"
            )));
        }

        Ok(Reserve {
            version,
            lending_market: address_at(data, 10),
            liquidity: ReserveLiquidity {
                mint: address_at(data, 42),
                mint_decimals: data[74],
                supply: address_at(data, 75),
                pyth_oracle: address_at(data, 107),
                switchboard_oracle: address_at(data, 139),
                available_amount: u64_at(data, 171),
                borrowed_amount_wads: u128_at(data, 179),
                market_price_wads: u128_at(data, 211),
            },
            collateral: ReserveCollateral {
                mint: address_at(data, 227),
                mint_total_supply: u64_at(data, 259),
                supply: address_at(data, 267),
            },
            config: ReserveRates {
                optimal_utilization_rate: data[299],
                loan_to_value_ratio: data[300],
                min_borrow_rate: data[303],
                optimal_borrow_rate: data[304],
                max_borrow_rate: data[305],
                deposit_limit: u64_at(data, 323),
                borrow_limit: u64_at(data, 331),
                fee_receiver: address_at(data, 339),
            },
        })
    }
}

// Callers check the minimum length first, so these slices are in bounds.
fn address_at(data: &[u8], offset: usize) -> Address {
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&data[offset..offset + 32]);
    Address::new(bytes)
}

fn u64_at(data: &[u8], offset: usize) -> u64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&data[offset..offset + 8]);
    u64::from_le_bytes(bytes)
}

fn u128_at(data: &[u8], offset: usize) -> u128 {
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&data[offset..offset + 16]);
    u128::from_le_bytes(bytes)
}

// ---------------------------------------------------------------------------
// Derived figures
// ---------------------------------------------------------------------------

impl Reserve {
    pub fn borrowed_amount(&self) -> u128 {
        self.liquidity.borrowed_amount_wads / WAD
    }

    /// Available plus borrowed liquidity, in base units.
    pub fn total_liquidity(&self) -> u128 {
        self.liquidity.available_amount as u128 + self.borrowed_amount()
    }

    /// Borrowed share of total liquidity, `0.0..=1.0`.
    pub fn utilization(&self) -> f64 {
        let total = self.total_liquidity();
        if total == 0 {
            return 0.0;
        }
        self.borrowed_amount() as f64 / total as f64
    }

    /// Annual borrow rate from the kinked utilization curve.
    pub fn borrow_apr(&self) -> f64 {
        let rates = &self.config;
        let utilization = self.utilization();
        let optimal = rates.optimal_utilization_rate as f64 / 100.0;
        let min = rates.min_borrow_rate as f64 / 100.0;
        let opt = rates.optimal_borrow_rate as f64 / 100.0;
        let max = rates.max_borrow_rate as f64 / 100.0;

        if optimal >= 1.0 || utilization < optimal {
            let normalized = if optimal > 0.0 { utilization / optimal } else { 0.0 };
            min + normalized * (opt - min)
        } else {
            let normalized = (utilization - optimal) / (1.0 - optimal);
            opt + normalized * (max - opt)
        }
    }

    pub fn supply_apr(&self) -> f64 {
        self.borrow_apr() * self.utilization()
    }

    /// Supply APR compounded every slot.
    pub fn supply_apy(&self) -> f64 {
        (1.0 + self.supply_apr() / SLOTS_PER_YEAR).powf(SLOTS_PER_YEAR) - 1.0
    }

    /// Liquidity redeemable for `collateral` tokens at the current rate.
    pub fn collateral_to_liquidity(&self, collateral: u64) -> u64 {
        let supply = self.collateral.mint_total_supply as u128;
        if supply == 0 {
            return collateral;
        }
        let liquidity = collateral as u128 * self.total_liquidity() / supply;
        u64::try_from(liquidity).unwrap_or(u64::MAX)
    }

    /// Collateral tokens to redeem for at most `liquidity` base units.
    pub fn liquidity_to_collateral(&self, liquidity: u64) -> Result<u64, LendingError> {
        let total = self.total_liquidity();
        if total == 0 || self.collateral.mint_total_supply == 0 {
            return Ok(liquidity);
        }
        let collateral = liquidity as u128 * self.collateral.mint_total_supply as u128 / total;
        u64::try_from(collateral)
            .map_err(|_| LendingError::InvalidAmount(format!("{liquidity} exceeds reserve supply")))
    }

    pub fn market_info(&self) -> MarketInfo {
        let decimals = self.liquidity.mint_decimals;
        let total = u64::try_from(self.total_liquidity()).unwrap_or(u64::MAX);

        MarketInfo {
            current_supply: TokenAmount::new(total, decimals).to_ui_string(),
            deposit_limit: TokenAmount::new(self.config.deposit_limit, decimals).to_ui_string(),
            supply_interest: format!("{:.4}", self.supply_apy() * 100.0),
        }
    }
}

/// Per-asset market figures as shown to users. Amounts are whole-token
/// decimal strings, `supply_interest` is an APY percentage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketInfo {
    pub current_supply: String,
    pub deposit_limit: String,
    pub supply_interest: String,
}


#[cfg(test)]
mod tests {
    use super::fixtures::ReserveBytes;
    use super::*;

    fn reserve() -> Reserve {
        ReserveLayout.decode(&ReserveBytes::default().encode()).unwrap()
    }

    #[test]
    fn decodes_fields_at_layout_offsets() {
        let r = reserve();
        assert_eq!(r.lending_market, Address::new([0x4D; 32]));
        assert_eq!(r.liquidity.mint_decimals, 6);
        assert_eq!(r.liquidity.pyth_oracle, Address::new([0x9F; 32]));
        assert_eq!(r.liquidity.switchboard_oracle, Address::new([0x5B; 32]));
        assert_eq!(r.liquidity.available_amount, 600_000_000);
        assert_eq!(r.collateral.mint, Address::new([0xC0; 32]));
        assert_eq!(r.collateral.supply, Address::new([0xC5; 32]));
        assert_eq!(r.config.optimal_utilization_rate, 80);
        assert_eq!(r.config.deposit_limit, 10_000_000_000);
        assert_eq!(r.config.fee_receiver, Address::new([0xFE; 32]));
    }

    #[test]
    fn short_account_is_rejected() {
        let err = ReserveLayout.decode(&[1u8; 100]).unwrap_err();
        assert!(matches!(err, LendingError::Decode(_)));
    }

    #[test]
    fn wrong_version_is_rejected() {
        let mut data = ReserveBytes::default().encode();
        data[0] = 9;
        assert!(ReserveLayout.decode(&data).is_err());
    }

    #[test]
    fn utilization_and_totals() {
        let r = reserve();
        assert_eq!(r.total_liquidity(), 1_000_000_000);
        assert!((r.utilization() - 0.4).abs() < 1e-12);
    }

    #[test]
    fn borrow_rate_below_kink() {
        // 40% of an 80% optimum is halfway from 0% to 8%.
        assert!((reserve().borrow_apr() - 0.04).abs() < 1e-12);
    }

    #[test]
    fn borrow_rate_above_kink() {
        let r = ReserveLayout
            .decode(
                &ReserveBytes {
                    available: 100_000_000,
                    borrowed: 900_000_000,
                    ..Default::default()
                }
                .encode(),
            )
            .unwrap();
        // 90% is halfway between the 80% kink and 100%: 8% + (50% - 8%) / 2.
        assert!((r.borrow_apr() - 0.29).abs() < 1e-9);
    }

    #[test]
    fn idle_reserve_earns_nothing() {
        let r = ReserveLayout
            .decode(
                &ReserveBytes {
                    borrowed: 0,
                    ..Default::default()
                }
                .encode(),
            )
            .unwrap();
        assert_eq!(r.supply_apr(), 0.0);
        assert_eq!(r.market_info().supply_interest, "0.0000");
    }

    #[test]
    fn supply_apy_exceeds_apr() {
        let r = reserve();
        assert!(r.supply_apy() > r.supply_apr());
        assert!((r.supply_apr() - 0.016).abs() < 1e-12);
    }

    #[test]
    fn exchange_rate_conversions() {
        // 1_000 liquidity backs 500 collateral: 1 collateral = 2 liquidity.
        let r = reserve();
        assert_eq!(r.collateral_to_liquidity(10), 20);
        assert_eq!(r.liquidity_to_collateral(20).unwrap(), 10);
    }

    #[test]
    fn market_info_strings() {
        let info = reserve().market_info();
        assert_eq!(info.current_supply, "1000");
        assert_eq!(info.deposit_limit, "10000");
    }
}
