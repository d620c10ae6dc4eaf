use chain_sol::SolError;
use fee_relay::FeeRelayError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LendingError {
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("invalid fee token: {0}")]
    InvalidFeeToken(String),

    #[error("unknown symbol: {0}")]
    UnknownSymbol(String),

    #[error("unknown environment: {0}")]
    UnknownEnvironment(String),

    /// Network failure, HTTP error status, or a JSON-RPC error object.
    #[error("transport error: {0}")]
    Transport(String),

    /// A remote response or account body did not have the expected shape.
    #[error("decode error: {0}")]
    Decode(String),

    #[error(transparent)]
    Sol(#[from] SolError),

    #[error(transparent)]
    Relay(#[from] FeeRelayError),
}

impl LendingError {
    /// Only transport failures are worth repeating; everything else is
    /// deterministic given the same input.
    pub fn is_retryable(&self) -> bool {
        matches!(self, LendingError::Transport(_))
    }
}
