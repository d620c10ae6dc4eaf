//! Fee-delegated ("relayed") transactions.
//!
//! A relayed transaction is paid for by a sponsor (the fee payer) and
//! reimbursed out of the user's tokens or relay account. This crate turns a
//! relay intent into ordered instructions: inline account creation when the
//! caller says it is needed, the transfer or swap itself, then the fee.

pub mod builder;
pub mod error;
pub mod fee;
pub mod intent;
pub mod provisioning;
pub mod relay_program;

pub use builder::{
    assemble_relay_top_up, assemble_relayed_transfer, build_relay_top_up, build_relayed_transfer,
    Assembled, BuiltTransaction, BuiltTransactionView,
};
pub use error::FeeRelayError;
pub use fee::FeeAmount;
pub use intent::{RelayTopUp, RelayTopUpRequest, RelayedTransfer, RelayedTransferRequest};
pub use provisioning::{ProvisioningPlan, ProvisioningStep};
pub use relay_program::{Network, RelayProgram};
