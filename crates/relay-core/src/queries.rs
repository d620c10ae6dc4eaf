//! Lending queries exposed on [`RuntimeHandle`].
//!
//! Each query returns its JSON payload as text and has a `*_json` twin that
//! wraps the outcome in the [`crate::envelope`] instead of raising.

use std::sync::Arc;

use chain_sol::Address;
use lending::{Environment, JsonRpcClient, LendingRequest, LendingService};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::envelope;
use crate::error::RelayError;
use crate::runtime::RuntimeHandle;

/// Owned arguments of a deposit or withdraw, moved onto the pool.
struct LendingArgs {
    relay_program_id: String,
    amount: u64,
    symbol: String,
    owner: String,
    environment: String,
    lending_market_address: String,
    blockhash: String,
    free_transactions_count: u32,
    need_to_use_relay: bool,
    pay_fee_in_token: String,
    fee_payer: String,
}

impl LendingArgs {
    fn request(&self) -> LendingRequest<'_> {
        LendingRequest {
            relay_program_id: &self.relay_program_id,
            amount: self.amount,
            symbol: &self.symbol,
            owner: &self.owner,
            environment: &self.environment,
            lending_market_address: &self.lending_market_address,
            blockhash: &self.blockhash,
            free_transactions_count: self.free_transactions_count,
            need_to_use_relay: self.need_to_use_relay,
            pay_fee_in_token: &self.pay_fee_in_token,
            fee_payer: &self.fee_payer,
        }
    }
}

#[derive(Clone, Copy)]
enum Direction {
    Deposit,
    Withdraw,
}

fn to_value<T: Serialize>(value: &T) -> Result<Value, RelayError> {
    serde_json::to_value(value).map_err(|e| RelayError::Serialization(e.to_string()))
}

/// `{ key: value }`
fn keyed<T: Serialize>(key: &str, value: &T) -> Result<Value, RelayError> {
    let mut map = Map::new();
    map.insert(key.to_string(), to_value(value)?);
    Ok(Value::Object(map))
}

fn parse_owner(owner: &str) -> Result<Address, RelayError> {
    Ok(Address::from_base58(owner.trim())?)
}

fn split_symbols(tokens: &str) -> Vec<String> {
    tokens
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

impl RuntimeHandle {
    /// The lending service, against `rpc_url` when it names a different node.
    fn service_for(&self, rpc_url: &str) -> LendingService {
        let rpc_url = rpc_url.trim();
        if rpc_url.is_empty() || rpc_url == self.config.rpc_url {
            return self.service.clone();
        }
        self.service.with_rpc(Arc::new(JsonRpcClient::new(
            self.http.clone(),
            rpc_url,
            self.config.retry_policy(),
        )))
    }

    // ----------------------------------------------------------------------
    // Payload builders
    // ----------------------------------------------------------------------

    fn config_value(&self, environment: String) -> Result<Value, RelayError> {
        let service = self.service.clone();
        self.block_on(async move {
            let environment: Environment = environment.parse()?;
            let config = service.get_config(environment).await?;
            keyed("config", &config)
        })
    }

    fn collateral_accounts_value(&self, rpc_url: String, owner: String) -> Result<Value, RelayError> {
        let service = self.service_for(&rpc_url);
        self.block_on(async move {
            let owner = parse_owner(&owner)?;
            let accounts = service.get_collateral_accounts(&owner).await?;
            keyed("accounts", &accounts)
        })
    }

    fn market_info_value(&self, tokens: String, pool: String) -> Result<Value, RelayError> {
        let service = self.service.clone();
        self.block_on(async move {
            let info = service.get_market_info(&split_symbols(&tokens), &pool).await?;
            keyed("market_info", &info)
        })
    }

    fn user_deposits_value(&self, owner: String, pool: String) -> Result<Value, RelayError> {
        let service = self.service.clone();
        self.block_on(async move {
            let owner = parse_owner(&owner)?;
            let deposits = service.get_user_deposits(&owner, &pool).await?;
            keyed("market_info", &deposits)
        })
    }

    fn user_deposit_by_symbol_value(&self, owner: String, symbol: String, pool: String) -> Result<Value, RelayError> {
        let service = self.service.clone();
        self.block_on(async move {
            let owner = parse_owner(&owner)?;
            let deposit = service.get_user_deposit_by_symbol(&owner, &symbol, &pool).await?;
            keyed("market_info", &deposit)
        })
    }

    fn deposit_fees_value(
        &self,
        rpc_url: String,
        owner: String,
        token_amount: u64,
        token_symbol: String,
    ) -> Result<Value, RelayError> {
        let service = self.service_for(&rpc_url);
        self.block_on(async move {
            let owner = parse_owner(&owner)?;
            let fees = service.get_deposit_fees(&owner, token_amount, &token_symbol).await?;
            to_value(&fees)
        })
    }

    fn transactions_value(&self, direction: Direction, rpc_url: String, args: LendingArgs) -> Result<Value, RelayError> {
        let service = self.service_for(&rpc_url);
        self.block_on(async move {
            let request = args.request();
            let transactions = match direction {
                Direction::Deposit => service.create_deposit_transactions(&request).await?,
                Direction::Withdraw => service.create_withdraw_transactions(&request).await?,
            };
            keyed("transactions", &transactions)
        })
    }

    // ----------------------------------------------------------------------
    // Exported queries
    // ----------------------------------------------------------------------

    pub fn get_config(&self, environment: String) -> Result<String, RelayError> {
        self.config_value(environment).map(|v| v.to_string())
    }

    pub fn get_config_json(&self, environment: String) -> String {
        envelope::render(self.config_value(environment))
    }

    pub fn get_collateral_accounts(&self, rpc_url: String, owner: String) -> Result<String, RelayError> {
        self.collateral_accounts_value(rpc_url, owner).map(|v| v.to_string())
    }

    pub fn get_collateral_accounts_json(&self, rpc_url: String, owner: String) -> String {
        envelope::render(self.collateral_accounts_value(rpc_url, owner))
    }

    /// `tokens` is a comma-separated symbol list.
    pub fn get_market_info(&self, tokens: String, pool: String) -> Result<String, RelayError> {
        self.market_info_value(tokens, pool).map(|v| v.to_string())
    }

    pub fn get_market_info_json(&self, tokens: String, pool: String) -> String {
        envelope::render(self.market_info_value(tokens, pool))
    }

    pub fn get_user_deposits(&self, owner: String, pool: String) -> Result<String, RelayError> {
        self.user_deposits_value(owner, pool).map(|v| v.to_string())
    }

    pub fn get_user_deposits_json(&self, owner: String, pool: String) -> String {
        envelope::render(self.user_deposits_value(owner, pool))
    }

    pub fn get_user_deposit_by_symbol(&self, owner: String, symbol: String, pool: String) -> Result<String, RelayError> {
        self.user_deposit_by_symbol_value(owner, symbol, pool).map(|v| v.to_string())
    }

    pub fn get_user_deposit_by_symbol_json(&self, owner: String, symbol: String, pool: String) -> String {
        envelope::render(self.user_deposit_by_symbol_value(owner, symbol, pool))
    }

    pub fn get_deposit_fees(
        &self,
        rpc_url: String,
        owner: String,
        token_amount: u64,
        token_symbol: String,
    ) -> Result<String, RelayError> {
        self.deposit_fees_value(rpc_url, owner, token_amount, token_symbol)
            .map(|v| v.to_string())
    }

    pub fn get_deposit_fees_json(&self, rpc_url: String, owner: String, token_amount: u64, token_symbol: String) -> String {
        envelope::render(self.deposit_fees_value(rpc_url, owner, token_amount, token_symbol))
    }

    #[allow(clippy::too_many_arguments)]
    pub fn create_deposit_transactions(
        &self,
        rpc_url: String,
        relay_program_id: String,
        amount: u64,
        symbol: String,
        owner: String,
        environment: String,
        lending_market_address: String,
        blockhash: String,
        free_transactions_count: u32,
        need_to_use_relay: bool,
        pay_fee_in_token: String,
        fee_payer: String,
    ) -> Result<String, RelayError> {
        let args = LendingArgs {
            relay_program_id,
            amount,
            symbol,
            owner,
            environment,
            lending_market_address,
            blockhash,
            free_transactions_count,
            need_to_use_relay,
            pay_fee_in_token,
            fee_payer,
        };
        self.transactions_value(Direction::Deposit, rpc_url, args)
            .map(|v| v.to_string())
    }

    #[allow(clippy::too_many_arguments)]
    pub fn create_deposit_transactions_json(
        &self,
        rpc_url: String,
        relay_program_id: String,
        amount: u64,
        symbol: String,
        owner: String,
        environment: String,
        lending_market_address: String,
        blockhash: String,
        free_transactions_count: u32,
        need_to_use_relay: bool,
        pay_fee_in_token: String,
        fee_payer: String,
    ) -> String {
        let args = LendingArgs {
            relay_program_id,
            amount,
            symbol,
            owner,
            environment,
            lending_market_address,
            blockhash,
            free_transactions_count,
            need_to_use_relay,
            pay_fee_in_token,
            fee_payer,
        };
        envelope::render(self.transactions_value(Direction::Deposit, rpc_url, args))
    }

    #[allow(clippy::too_many_arguments)]
    pub fn create_withdraw_transactions(
        &self,
        rpc_url: String,
        relay_program_id: String,
        amount: u64,
        symbol: String,
        owner: String,
        environment: String,
        lending_market_address: String,
        blockhash: String,
        free_transactions_count: u32,
        need_to_use_relay: bool,
        pay_fee_in_token: String,
        fee_payer: String,
    ) -> Result<String, RelayError> {
        let args = LendingArgs {
            relay_program_id,
            amount,
            symbol,
            owner,
            environment,
            lending_market_address,
            blockhash,
            free_transactions_count,
            need_to_use_relay,
            pay_fee_in_token,
            fee_payer,
        };
        self.transactions_value(Direction::Withdraw, rpc_url, args)
            .map(|v| v.to_string())
    }

    #[allow(clippy::too_many_arguments)]
    pub fn create_withdraw_transactions_json(
        &self,
        rpc_url: String,
        relay_program_id: String,
        amount: u64,
        symbol: String,
        owner: String,
        environment: String,
        lending_market_address: String,
        blockhash: String,
        free_transactions_count: u32,
        need_to_use_relay: bool,
        pay_fee_in_token: String,
        fee_payer: String,
    ) -> String {
        let args = LendingArgs {
            relay_program_id,
            amount,
            symbol,
            owner,
            environment,
            lending_market_address,
            blockhash,
            free_transactions_count,
            need_to_use_relay,
            pay_fee_in_token,
            fee_payer,
        };
        envelope::render(self.transactions_value(Direction::Withdraw, rpc_url, args))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbols_are_split_and_trimmed() {
        assert_eq!(split_symbols("SOL, USDC,,"), vec!["SOL", "USDC"]);
        assert!(split_symbols("").is_empty());
    }

    #[test]
    fn keyed_wraps_payload() {
        assert_eq!(keyed("accounts", &Vec::<u8>::new()).unwrap().to_string(), r#"{"accounts":[]}"#);
    }

    #[test]
    fn bad_owner_fails_before_any_network_call() {
        let handle = RuntimeHandle::new(1, 1).unwrap();
        let text = handle.get_user_deposits_json("not an address".into(), "main".into());
        let body = envelope::parse(&text).unwrap().into_result().unwrap_err();
        assert_eq!(body.kind, "InvalidAddress");
    }

    #[test]
    fn unknown_environment_is_reported() {
        let handle = RuntimeHandle::new(1, 1).unwrap();
        assert!(matches!(
            handle.get_config("staging".into()),
            Err(RelayError::UnknownEnvironment(_))
        ));
    }
}
