//! JSON-RPC and config clients against a mock HTTP server.

use std::time::Duration;

use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine as _};
use chain_sol::{Address, TOKEN_PROGRAM_ID};
use lending::{ConfigSource, Environment, HttpConfigSource, JsonRpcClient, LedgerRpc, LendingError, RetryPolicy};
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const OWNER: &str = "9WzDXwBbmkg8ZTbNMqUxvQRAyrZzDsGYdLVL9zYtAWWM";
const MINT: &str = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v";

fn quick_retry(attempts: u32) -> RetryPolicy {
    RetryPolicy {
        attempts,
        backoff: Duration::from_millis(1),
    }
}

fn rpc(server: &MockServer, attempts: u32) -> JsonRpcClient {
    JsonRpcClient::new(reqwest::Client::new(), server.uri(), quick_retry(attempts))
}

fn rpc_result(result: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "jsonrpc": "2.0", "id": 1, "result": result }))
}

fn token_account_bytes(mint: &Address, owner: &Address, amount: u64) -> Vec<u8> {
    let mut data = vec![0u8; 165];
    data[0..32].copy_from_slice(mint.as_bytes());
    data[32..64].copy_from_slice(owner.as_bytes());
    data[64..72].copy_from_slice(&amount.to_le_bytes());
    data
}

// -- JSON-RPC --

#[tokio::test]
async fn multiple_accounts_decodes_base64_and_keeps_gaps() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/"))
        .and(body_partial_json(json!({ "method": "getMultipleAccounts" })))
        .respond_with(rpc_result(json!({
            "context": { "slot": 1 },
            "value": [
                {
                    "lamports": 42,
                    "owner": TOKEN_PROGRAM_ID.to_base58(),
                    "data": [BASE64_STANDARD.encode([1u8, 2, 3]), "base64"],
                    "executable": false,
                    "rentEpoch": 0
                },
                null
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let accounts = rpc(&server, 1)
        .get_multiple_accounts(&[Address::new([1; 32]), Address::new([2; 32])])
        .await
        .unwrap();

    assert_eq!(accounts.len(), 2);
    let first = accounts[0].as_ref().unwrap();
    assert_eq!(first.lamports, 42);
    assert_eq!(first.owner, TOKEN_PROGRAM_ID);
    assert_eq!(first.data, vec![1, 2, 3]);
    assert!(accounts[1].is_none());
}

#[tokio::test]
async fn token_accounts_by_owner_unpacks_state() {
    let server = MockServer::start().await;
    let owner: Address = OWNER.parse().unwrap();
    let mint: Address = MINT.parse().unwrap();
    let data = token_account_bytes(&mint, &owner, 1_234);

    Mock::given(method("POST"))
        .and(body_partial_json(json!({
            "method": "getTokenAccountsByOwner",
            "params": [OWNER, { "programId": TOKEN_PROGRAM_ID.to_base58() }, { "encoding": "base64" }]
        })))
        .respond_with(rpc_result(json!({
            "context": { "slot": 1 },
            "value": [{
                "pubkey": "DRpbCBMxVnDK7maPM5tGv6MvB3v1sRMC86PZ8okm21hy",
                "account": {
                    "lamports": 2039280,
                    "owner": TOKEN_PROGRAM_ID.to_base58(),
                    "data": [BASE64_STANDARD.encode(&data), "base64"]
                }
            }]
        })))
        .mount(&server)
        .await;

    let accounts = rpc(&server, 1).get_token_accounts_by_owner(&owner).await.unwrap();
    assert_eq!(accounts.len(), 1);
    assert_eq!(accounts[0].1.mint, mint);
    assert_eq!(accounts[0].1.amount, 1_234);
}

#[tokio::test]
async fn rent_exemption_passes_length() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "method": "getMinimumBalanceForRentExemption", "params": [165] })))
        .respond_with(rpc_result(json!(2039280)))
        .mount(&server)
        .await;

    let rent = rpc(&server, 1).get_minimum_balance_for_rent_exemption(165).await.unwrap();
    assert_eq!(rent, 2_039_280);
}

#[tokio::test]
async fn rpc_error_object_is_transport() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "error": { "code": -32602, "message": "Invalid param" }
        })))
        .mount(&server)
        .await;

    let err = rpc(&server, 1).get_minimum_balance_for_rent_exemption(165).await.unwrap_err();
    assert!(matches!(err, LendingError::Transport(msg) if msg.contains("-32602")));
}

#[tokio::test]
async fn http_failures_are_retried_then_surfaced() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let err = rpc(&server, 3).get_minimum_balance_for_rent_exemption(165).await.unwrap_err();
    assert!(matches!(err, LendingError::Transport(_)));
}

#[tokio::test]
async fn malformed_body_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .expect(1)
        .mount(&server)
        .await;

    let err = rpc(&server, 3).get_minimum_balance_for_rent_exemption(165).await.unwrap_err();
    assert!(matches!(err, LendingError::Decode(_)));
}

// -- Config source --

fn config_document() -> serde_json::Value {
    json!({
        "programID": "ALend7Ketfx5bxh6ghsCDXAoDrhvEmsXT3cynB6aPLgx",
        "assets": [{ "name": "USD Coin", "symbol": "USDC", "decimals": 6, "mintAddress": MINT }],
        "markets": [{
            "name": "main",
            "address": "4UpD2fh7xH3VP9QQaXtsS1YY3bxzWhtfpks7FatyKvdY",
            "authorityAddress": "DdZR6zRFiUt4S5mg7AV1uKB2z1f1WzcNYCaTEEWPAuby",
            "isPrimary": true,
            "reserves": []
        }]
    })
}

#[tokio::test]
async fn config_is_fetched_per_deployment() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/config"))
        .and(query_param("deployment", "devnet"))
        .respond_with(ResponseTemplate::new(200).set_body_json(config_document()))
        .expect(1)
        .mount(&server)
        .await;

    let source = HttpConfigSource::new(reqwest::Client::new(), format!("{}/v1/", server.uri()), quick_retry(1));
    let config = source.fetch(Environment::Devnet).await.unwrap();

    assert_eq!(config.assets[0].symbol, "USDC");
    assert_eq!(config.primary_market().map(|m| m.name.as_str()), Some("main"));
}

#[tokio::test]
async fn config_not_found_is_transport() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let source = HttpConfigSource::new(reqwest::Client::new(), server.uri(), quick_retry(2));
    let err = source.fetch(Environment::Production).await.unwrap_err();
    assert!(matches!(err, LendingError::Transport(_)));
}
