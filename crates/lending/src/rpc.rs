//! Read-only ledger queries over Solana JSON-RPC.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine as _};
use chain_sol::{spl_token::TokenAccount, Address, TOKEN_PROGRAM_ID};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::error::LendingError;
use crate::retry::{with_retry, RetryPolicy};

/// Raw account as returned by the node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountData {
    pub lamports: u64,
    pub owner: Address,
    pub data: Vec<u8>,
}

#[async_trait]
pub trait LedgerRpc: Send + Sync {
    /// One entry per requested address, `None` where the account does not
    /// exist.
    async fn get_multiple_accounts(
        &self,
        addresses: &[Address],
    ) -> Result<Vec<Option<AccountData>>, LendingError>;

    /// SPL token accounts owned by `owner`, with their addresses.
    async fn get_token_accounts_by_owner(
        &self,
        owner: &Address,
    ) -> Result<Vec<(Address, TokenAccount)>, LendingError>;

    async fn get_minimum_balance_for_rent_exemption(&self, data_len: usize) -> Result<u64, LendingError>;
}

/// [`LedgerRpc`] over HTTP POST to a JSON-RPC endpoint.
#[derive(Debug, Clone)]
pub struct JsonRpcClient {
    client: reqwest::Client,
    rpc_url: String,
    retry: RetryPolicy,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse<T> {
    result: Option<T>,
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct WithContext<T> {
    value: T,
}

#[derive(Debug, Deserialize)]
struct UiAccount {
    lamports: u64,
    owner: String,
    /// `[payload, encoding]`
    data: (String, String),
}

#[derive(Debug, Deserialize)]
struct KeyedUiAccount {
    pubkey: String,
    account: UiAccount,
}

impl UiAccount {
    fn decode(self) -> Result<AccountData, LendingError> {
        let (payload, encoding) = self.data;
        if encoding != "base64" {
            return Err(LendingError::Decode(format!("unexpected account encoding {encoding:?}")));
        }
        let data = BASE64_STANDARD
            .decode(payload)
            .map_err(|e| LendingError::Decode(format!("account data: {e}")))?;
        let owner = self
            .owner
            .parse()
            .map_err(|e| LendingError::Decode(format!("account owner: {e}")))?;

        Ok(AccountData {
            lamports: self.lamports,
            owner,
            data,
        })
    }
}

impl JsonRpcClient {
    pub fn new(client: reqwest::Client, rpc_url: impl Into<String>, retry: RetryPolicy) -> Self {
        Self {
            client,
            rpc_url: rpc_url.into(),
            retry,
        }
    }

    pub fn rpc_url(&self) -> &str {
        &self.rpc_url
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, LendingError> {
        with_retry(&self.retry, method, || self.call_once(method, params.clone())).await
    }

    async fn call_once<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, LendingError> {
        let payload = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });

        let response = self
            .client
            .post(&self.rpc_url)
            .json(&payload)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| LendingError::Transport(format!("{method}: {e}")))?;

        let body: JsonRpcResponse<T> = response
            .json()
            .await
            .map_err(|e| LendingError::Decode(format!("{method} response: {e}")))?;

        if let Some(error) = body.error {
            return Err(LendingError::Transport(format!(
                "{method}: rpc error {}: {}",
                error.code, error.message
            )));
        }
        body.result
            .ok_or_else(|| LendingError::Decode(format!("{method}: neither result nor error")))
    }
}

#[async_trait]
impl LedgerRpc for JsonRpcClient {
    async fn get_multiple_accounts(
        &self,
        addresses: &[Address],
    ) -> Result<Vec<Option<AccountData>>, LendingError> {
        let keys: Vec<String> = addresses.iter().map(Address::to_base58).collect();
        let result: WithContext<Vec<Option<UiAccount>>> = self
            .call("getMultipleAccounts", json!([keys, { "encoding": "base64" }]))
            .await?;

        if result.value.len() != addresses.len() {
            return Err(LendingError::Decode(format!(
                "getMultipleAccounts returned {} accounts for {} addresses",
                result.value.len(),
                addresses.len()
            )));
        }
        result
            .value
            .into_iter()
            .map(|account| account.map(UiAccount::decode).transpose())
            .collect()
    }

    async fn get_token_accounts_by_owner(
        &self,
        owner: &Address,
    ) -> Result<Vec<(Address, TokenAccount)>, LendingError> {
        let result: WithContext<Vec<KeyedUiAccount>> = self
            .call(
                "getTokenAccountsByOwner",
                json!([
                    owner.to_base58(),
                    { "programId": TOKEN_PROGRAM_ID.to_base58() },
                    { "encoding": "base64" }
                ]),
            )
            .await?;

        let accounts = result
            .value
            .into_iter()
            .map(|keyed| {
                let address: Address = keyed
                    .pubkey
                    .parse()
                    .map_err(|e| LendingError::Decode(format!("token account key: {e}")))?;
                let account = TokenAccount::unpack(&keyed.account.decode()?.data)?;
                Ok((address, account))
            })
            .collect::<Result<Vec<_>, LendingError>>()?;

        debug!(%owner, count = accounts.len(), "fetched token accounts");
        Ok(accounts)
    }

    async fn get_minimum_balance_for_rent_exemption(&self, data_len: usize) -> Result<u64, LendingError> {
        self.call("getMinimumBalanceForRentExemption", json!([data_len])).await
    }
}
