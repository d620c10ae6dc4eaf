//! Async lending queries and transaction construction.
//!
//! Every operation reads the lending config for an environment and, where
//! needed, reserve and token accounts from the ledger; nothing is cached.

use std::collections::HashMap;
use std::sync::Arc;

use chain_sol::spl_token::TOKEN_ACCOUNT_LEN;
use chain_sol::{derive_associated_token_address, Address, TokenAmount, NATIVE_MINT};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::assembler::{build_lending_transaction, LendingAction, LendingIntent, LendingRequest};
use crate::config::{ConfigSource, LendingConfig, ResolvedReserve};
use crate::environment::Environment;
use crate::error::LendingError;
use crate::reserve::{MarketInfo, Reserve, ReserveDecoder, ReserveLayout};
use crate::rpc::LedgerRpc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceSettings {
    /// Environment for queries that do not name one.
    pub environment: Environment,
    pub lamports_per_signature: u64,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            environment: Environment::Production,
            lamports_per_signature: 5_000,
        }
    }
}

/// A collateral token account held by a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollateralAccount {
    pub address: Address,
    pub mint: Address,
    pub symbol: String,
    pub amount: u64,
}

/// Liquidity a user could withdraw for one asset, as a whole-token string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDeposit {
    pub symbol: String,
    pub deposited_amount: String,
}

/// Lamports a deposit costs the owner. `rent` is kept by the new collateral
/// account; `reserve` is fronted for a temporary WSOL account and returned
/// when it closes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositFees {
    pub fee: u64,
    pub rent: u64,
    pub reserve: u64,
}

#[derive(Clone)]
pub struct LendingService {
    rpc: Arc<dyn LedgerRpc>,
    config_source: Arc<dyn ConfigSource>,
    decoder: Arc<dyn ReserveDecoder>,
    settings: ServiceSettings,
}

impl LendingService {
    pub fn new(rpc: Arc<dyn LedgerRpc>, config_source: Arc<dyn ConfigSource>, settings: ServiceSettings) -> Self {
        Self {
            rpc,
            config_source,
            decoder: Arc::new(ReserveLayout),
            settings,
        }
    }

    pub fn with_decoder(mut self, decoder: Arc<dyn ReserveDecoder>) -> Self {
        self.decoder = decoder;
        self
    }

    /// Same service against a different ledger endpoint.
    pub fn with_rpc(&self, rpc: Arc<dyn LedgerRpc>) -> Self {
        Self {
            rpc,
            ..self.clone()
        }
    }

    pub fn settings(&self) -> &ServiceSettings {
        &self.settings
    }

    pub async fn get_config(&self, environment: Environment) -> Result<LendingConfig, LendingError> {
        self.config_source.fetch(environment).await
    }

    /// Token accounts of `owner` holding any reserve's collateral mint.
    pub async fn get_collateral_accounts(&self, owner: &Address) -> Result<Vec<CollateralAccount>, LendingError> {
        let config = self.get_config(self.settings.environment).await?;
        let symbols: HashMap<Address, &str> = config
            .markets
            .iter()
            .flat_map(|m| m.reserves.iter())
            .map(|r| (r.collateral_mint_address, r.asset.as_str()))
            .collect();

        let accounts = self
            .rpc
            .get_token_accounts_by_owner(owner)
            .await?
            .into_iter()
            .filter_map(|(address, account)| {
                symbols.get(&account.mint).map(|symbol| CollateralAccount {
                    address,
                    mint: account.mint,
                    symbol: symbol.to_string(),
                    amount: account.amount,
                })
            })
            .collect();
        Ok(accounts)
    }

    /// Market figures per symbol, in request order.
    pub async fn get_market_info(
        &self,
        symbols: &[String],
        pool: &str,
    ) -> Result<Vec<(String, MarketInfo)>, LendingError> {
        let config = self.get_config(self.settings.environment).await?;
        let resolved = symbols
            .iter()
            .map(|symbol| config.resolve_reserve(pool, symbol))
            .collect::<Result<Vec<_>, _>>()?;
        let reserves = self.fetch_reserves(&resolved).await?;

        Ok(resolved
            .iter()
            .zip(&reserves)
            .map(|(r, reserve)| (r.asset.symbol.clone(), reserve.market_info()))
            .collect())
    }

    /// Non-zero deposits of `owner` across a market's reserves.
    pub async fn get_user_deposits(&self, owner: &Address, pool: &str) -> Result<Vec<UserDeposit>, LendingError> {
        let config = self.get_config(self.settings.environment).await?;
        let resolved = config.market_reserves(pool)?;
        let deposits = self.user_deposits(owner, &resolved).await?;
        Ok(deposits
            .into_iter()
            .filter(|(_, amount)| !amount.is_zero())
            .map(|(symbol, amount)| UserDeposit {
                symbol,
                deposited_amount: amount.to_ui_string(),
            })
            .collect())
    }

    /// The owner's deposit for one asset; `"0"` when there is none.
    pub async fn get_user_deposit_by_symbol(
        &self,
        owner: &Address,
        symbol: &str,
        pool: &str,
    ) -> Result<UserDeposit, LendingError> {
        let config = self.get_config(self.settings.environment).await?;
        let resolved = config.resolve_reserve(pool, symbol)?;
        let mut deposits = self.user_deposits(owner, std::slice::from_ref(&resolved)).await?;

        let (symbol, amount) = deposits
            .pop()
            .unwrap_or_else(|| (resolved.asset.symbol.clone(), TokenAmount::new(0, resolved.asset.decimals)));
        Ok(UserDeposit {
            symbol,
            deposited_amount: amount.to_ui_string(),
        })
    }

    pub async fn get_deposit_fees(
        &self,
        owner: &Address,
        token_amount: u64,
        token_symbol: &str,
    ) -> Result<DepositFees, LendingError> {
        if token_amount == 0 {
            return Err(LendingError::InvalidAmount("deposit amount must be greater than zero".into()));
        }
        let config = self.get_config(self.settings.environment).await?;
        let resolved = config.resolve_reserve("main", token_symbol)?;
        let is_native = resolved.asset.mint_address == NATIVE_MINT;

        let collateral_account = derive_associated_token_address(owner, &resolved.reserve.collateral_mint_address)?;
        let existing = self.rpc.get_multiple_accounts(&[collateral_account]).await?;
        let account_rent = self.rpc.get_minimum_balance_for_rent_exemption(TOKEN_ACCOUNT_LEN).await?;

        let fees = DepositFees {
            fee: self.settings.lamports_per_signature,
            rent: if existing.first().is_some_and(Option::is_some) { 0 } else { account_rent },
            reserve: if is_native { account_rent } else { 0 },
        };
        debug!(%owner, symbol = token_symbol, ?fees, "computed deposit fees");
        Ok(fees)
    }

    pub async fn create_deposit_transactions(&self, request: &LendingRequest<'_>) -> Result<Vec<String>, LendingError> {
        self.create_transactions(LendingAction::Deposit, request).await
    }

    pub async fn create_withdraw_transactions(&self, request: &LendingRequest<'_>) -> Result<Vec<String>, LendingError> {
        self.create_transactions(LendingAction::Withdraw, request).await
    }

    /// Base58 unsigned transactions; currently always exactly one.
    async fn create_transactions(
        &self,
        action: LendingAction,
        request: &LendingRequest<'_>,
    ) -> Result<Vec<String>, LendingError> {
        let intent = LendingIntent::try_from(request)?;
        let config = self.get_config(intent.environment).await?;
        let resolved = config.resolve_reserve(&intent.market, &intent.symbol)?;
        let reserve = self
            .fetch_reserves(std::slice::from_ref(&resolved))
            .await?
            .pop()
            .ok_or_else(|| LendingError::Decode(format!("reserve {} not returned", resolved.reserve.address)))?;

        let transaction = build_lending_transaction(action, &intent, &resolved, &reserve)?;
        info!(%action, symbol = %intent.symbol, environment = %intent.environment, "created lending transaction");
        Ok(vec![transaction.to_base58()?])
    }

    async fn fetch_reserves(&self, resolved: &[ResolvedReserve]) -> Result<Vec<Reserve>, LendingError> {
        let addresses: Vec<Address> = resolved.iter().map(|r| r.reserve.address).collect();
        let accounts = self.rpc.get_multiple_accounts(&addresses).await?;

        addresses
            .iter()
            .zip(accounts)
            .map(|(address, account)| {
                let account =
                    account.ok_or_else(|| LendingError::Decode(format!("reserve account {address} not found")))?;
                self.decoder.decode(&account.data)
            })
            .collect()
    }

    /// Liquidity value of the owner's collateral in each reserve.
    async fn user_deposits(
        &self,
        owner: &Address,
        resolved: &[ResolvedReserve],
    ) -> Result<Vec<(String, TokenAmount)>, LendingError> {
        let mut held: HashMap<Address, u64> = HashMap::new();
        for (_, account) in self.rpc.get_token_accounts_by_owner(owner).await? {
            *held.entry(account.mint).or_default() += account.amount;
        }

        let owned: Vec<ResolvedReserve> = resolved
            .iter()
            .filter(|r| held.contains_key(&r.reserve.collateral_mint_address))
            .cloned()
            .collect();
        if owned.is_empty() {
            return Ok(Vec::new());
        }

        let reserves = self.fetch_reserves(&owned).await?;

        Ok(owned
            .iter()
            .zip(&reserves)
            .map(|(r, reserve)| {
                let collateral = held.get(&r.reserve.collateral_mint_address).copied().unwrap_or(0);
                (
                    r.asset.symbol.clone(),
                    TokenAmount::new(reserve.collateral_to_liquidity(collateral), r.asset.decimals),
                )
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::fixtures::{request, OWNER};
    use crate::config::fixtures::{self, SOL_RESERVE, USDC_RESERVE};
    use crate::reserve::fixtures::ReserveBytes;
    use crate::rpc::AccountData;
    use async_trait::async_trait;
    use chain_sol::spl_token::TokenAccount;
    use chain_sol::UnsignedTransaction;

    struct FakeRpc {
        accounts: HashMap<Address, AccountData>,
        token_accounts: Vec<(Address, TokenAccount)>,
    }

    #[async_trait]
    impl LedgerRpc for FakeRpc {
        async fn get_multiple_accounts(&self, addresses: &[Address]) -> Result<Vec<Option<AccountData>>, LendingError> {
            Ok(addresses.iter().map(|a| self.accounts.get(a).cloned()).collect())
        }

        async fn get_token_accounts_by_owner(
            &self,
            _owner: &Address,
        ) -> Result<Vec<(Address, TokenAccount)>, LendingError> {
            Ok(self.token_accounts.clone())
        }

        async fn get_minimum_balance_for_rent_exemption(&self, data_len: usize) -> Result<u64, LendingError> {
            assert_eq!(data_len, TOKEN_ACCOUNT_LEN);
            Ok(2_039_280)
        }
    }

    struct FakeConfig;

    #[async_trait]
    impl ConfigSource for FakeConfig {
        async fn fetch(&self, _environment: Environment) -> Result<LendingConfig, LendingError> {
            Ok(fixtures::config())
        }
    }

    fn reserve_account() -> AccountData {
        AccountData {
            lamports: 1,
            owner: crate::environment::PRODUCTION_PROGRAM_ID,
            data: ReserveBytes::default().encode(),
        }
    }

    fn owner() -> Address {
        OWNER.parse().unwrap()
    }

    fn usdc_collateral_mint() -> Address {
        fixtures::config().resolve_reserve("main", "USDC").unwrap().reserve.collateral_mint_address
    }

    fn service(token_accounts: Vec<(Address, TokenAccount)>) -> LendingService {
        let mut accounts = HashMap::new();
        accounts.insert(USDC_RESERVE.parse().unwrap(), reserve_account());
        accounts.insert(SOL_RESERVE.parse().unwrap(), reserve_account());

        LendingService::new(
            Arc::new(FakeRpc { accounts, token_accounts }),
            Arc::new(FakeConfig),
            ServiceSettings::default(),
        )
    }

    fn holding(mint: Address, amount: u64) -> (Address, TokenAccount) {
        (
            Address::new([0xAC; 32]),
            TokenAccount {
                mint,
                owner: owner(),
                amount,
            },
        )
    }

    #[tokio::test]
    async fn market_info_in_request_order() {
        let symbols = vec!["USDC".to_string(), "SOL".to_string()];
        let info = service(vec![]).get_market_info(&symbols, "main").await.unwrap();

        assert_eq!(info.len(), 2);
        assert_eq!(info[0].0, "USDC");
        assert_eq!(info[1].0, "SOL");
        assert_eq!(info[0].1.current_supply, "1000");
    }

    #[tokio::test]
    async fn market_info_unknown_symbol() {
        let err = service(vec![])
            .get_market_info(&["XYZ".to_string()], "main")
            .await
            .unwrap_err();
        assert_eq!(err, LendingError::UnknownSymbol("XYZ".into()));
    }

    #[tokio::test]
    async fn collateral_accounts_filter_by_collateral_mint() {
        let svc = service(vec![holding(usdc_collateral_mint(), 50), holding(Address::new([9; 32]), 7)]);
        let accounts = svc.get_collateral_accounts(&owner()).await.unwrap();

        assert_eq!(accounts.len(), 1);
        assert_eq!(accounts[0].symbol, "USDC");
        assert_eq!(accounts[0].amount, 50);
    }

    #[tokio::test]
    async fn user_deposits_convert_collateral_to_liquidity() {
        // 5 collateral tokens at 2 liquidity each.
        let svc = service(vec![holding(usdc_collateral_mint(), 5_000_000)]);
        let deposits = svc.get_user_deposits(&owner(), "main").await.unwrap();

        assert_eq!(
            deposits,
            vec![UserDeposit {
                symbol: "USDC".into(),
                deposited_amount: "10".into(),
            }]
        );
    }

    #[tokio::test]
    async fn deposit_by_symbol_defaults_to_zero() {
        let deposit = service(vec![]).get_user_deposit_by_symbol(&owner(), "SOL", "main").await.unwrap();
        assert_eq!(deposit.deposited_amount, "0");
        assert_eq!(deposit.symbol, "SOL");
    }

    #[tokio::test]
    async fn deposit_fees_for_new_sol_position() {
        let fees = service(vec![]).get_deposit_fees(&owner(), 1_000, "SOL").await.unwrap();
        assert_eq!(
            fees,
            DepositFees {
                fee: 5_000,
                rent: 2_039_280,
                reserve: 2_039_280,
            }
        );
    }

    #[tokio::test]
    async fn deposit_fees_skip_rent_for_existing_collateral_account() {
        let mut svc = service(vec![]);
        let collateral = derive_associated_token_address(&owner(), &usdc_collateral_mint()).unwrap();
        let mut accounts = HashMap::new();
        accounts.insert(collateral, reserve_account());
        svc = svc.with_rpc(Arc::new(FakeRpc {
            accounts,
            token_accounts: vec![],
        }));

        let fees = svc.get_deposit_fees(&owner(), 1_000, "USDC").await.unwrap();
        assert_eq!(fees.rent, 0);
        assert_eq!(fees.reserve, 0);
    }

    #[tokio::test]
    async fn creates_one_deposit_transaction() {
        let txs = service(vec![]).create_deposit_transactions(&request("USDC")).await.unwrap();
        assert_eq!(txs.len(), 1);

        let tx = UnsignedTransaction::from_base58(&txs[0]).unwrap();
        assert_eq!(tx.message().fee_payer(), Some(&owner()));
    }

    #[tokio::test]
    async fn withdraw_requires_reserve_account() {
        let svc = service(vec![]).with_rpc(Arc::new(FakeRpc {
            accounts: HashMap::new(),
            token_accounts: vec![],
        }));
        let err = svc.create_withdraw_transactions(&request("USDC")).await.unwrap_err();
        assert!(matches!(err, LendingError::Decode(_)));
    }
}
