//! Lending protocol support: deposit and withdraw transactions, market and
//! position queries, and the collaborators they read from (the protocol's
//! config document, reserve accounts, and a ledger RPC node).

pub mod assembler;
pub mod config;
pub mod environment;
pub mod error;
pub mod fee;
pub mod instruction;
pub mod reserve;
pub mod retry;
pub mod rpc;
pub mod service;

pub use assembler::{assemble_lending, build_lending_transaction, LendingAction, LendingIntent, LendingRequest};
pub use config::{ConfigSource, HttpConfigSource, LendingConfig, ResolvedReserve};
pub use environment::Environment;
pub use error::LendingError;
pub use fee::PayFeeInToken;
pub use reserve::{MarketInfo, Reserve, ReserveDecoder, ReserveLayout};
pub use retry::RetryPolicy;
pub use rpc::{AccountData, JsonRpcClient, LedgerRpc};
pub use service::{CollateralAccount, DepositFees, LendingService, ServiceSettings, UserDeposit};
