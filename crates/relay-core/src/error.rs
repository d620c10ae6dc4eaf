use chain_sol::SolError;
use fee_relay::FeeRelayError;
use lending::LendingError;
use thiserror::Error;

/// Error returned across the FFI boundary. Hosts see the variant as the
/// error kind and `to_string()` as the message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RelayError {
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Invalid keypair: {0}")]
    InvalidKeypair(String),

    #[error("Invalid fee token: {0}")]
    InvalidFeeToken(String),

    #[error("Unknown symbol: {0}")]
    UnknownSymbol(String),

    #[error("Unknown environment: {0}")]
    UnknownEnvironment(String),

    #[error("Blockhash mismatch: {0}")]
    BlockhashMismatch(String),

    #[error("Not a signer: {0}")]
    NotASigner(String),

    #[error("Runtime has been shut down")]
    RuntimeShutdown,

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl RelayError {
    /// Stable kind name used in the text envelope.
    pub fn kind(&self) -> &'static str {
        match self {
            RelayError::InvalidAddress(_) => "InvalidAddress",
            RelayError::InvalidAmount(_) => "InvalidAmount",
            RelayError::InvalidKeypair(_) => "InvalidKeypair",
            RelayError::InvalidFeeToken(_) => "InvalidFeeToken",
            RelayError::UnknownSymbol(_) => "UnknownSymbol",
            RelayError::UnknownEnvironment(_) => "UnknownEnvironment",
            RelayError::BlockhashMismatch(_) => "BlockhashMismatch",
            RelayError::NotASigner(_) => "NotASigner",
            RelayError::RuntimeShutdown => "RuntimeShutdown",
            RelayError::Transport(_) => "Transport",
            RelayError::Serialization(_) => "Serialization",
            RelayError::Configuration(_) => "Configuration",
        }
    }
}

impl From<SolError> for RelayError {
    fn from(e: SolError) -> Self {
        match e {
            SolError::InvalidAddress(msg) => RelayError::InvalidAddress(msg),
            SolError::InvalidAmount(msg) => RelayError::InvalidAmount(msg),
            SolError::InvalidKeypair(msg) => RelayError::InvalidKeypair(msg),
            SolError::BlockhashMismatch { embedded, supplied } => {
                RelayError::BlockhashMismatch(format!("transaction has {embedded}, got {supplied}"))
            }
            SolError::NotASigner(address) => RelayError::NotASigner(address),
            SolError::TransactionBuildError(msg) | SolError::SerializationError(msg) => {
                RelayError::Serialization(msg)
            }
        }
    }
}

impl From<FeeRelayError> for RelayError {
    fn from(e: FeeRelayError) -> Self {
        match e {
            FeeRelayError::InvalidAddress { field, reason } => {
                RelayError::InvalidAddress(format!("{field}: {reason}"))
            }
            FeeRelayError::InvalidAmount(msg) => RelayError::InvalidAmount(msg),
            FeeRelayError::Sol(e) => e.into(),
        }
    }
}

impl From<LendingError> for RelayError {
    fn from(e: LendingError) -> Self {
        match e {
            LendingError::InvalidAddress(msg) => RelayError::InvalidAddress(msg),
            LendingError::InvalidAmount(msg) => RelayError::InvalidAmount(msg),
            LendingError::InvalidFeeToken(msg) => RelayError::InvalidFeeToken(msg),
            LendingError::UnknownSymbol(msg) => RelayError::UnknownSymbol(msg),
            LendingError::UnknownEnvironment(msg) => RelayError::UnknownEnvironment(msg),
            LendingError::Transport(msg) => RelayError::Transport(msg),
            // A malformed remote response is a collaborator failure to the host.
            LendingError::Decode(msg) => RelayError::Transport(format!("decode: {msg}")),
            LendingError::Sol(e) => e.into(),
            LendingError::Relay(e) => e.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chain_sol::Address;

    #[test]
    fn blockhash_mismatch_names_both_hashes() {
        let err: RelayError = SolError::BlockhashMismatch {
            embedded: "AAA".into(),
            supplied: "BBB".into(),
        }
        .into();
        assert_eq!(err.kind(), "BlockhashMismatch");
        assert!(err.to_string().contains("AAA"));
        assert!(err.to_string().contains("BBB"));
    }

    #[test]
    fn nested_errors_keep_their_kind() {
        let err: RelayError = LendingError::Relay(FeeRelayError::Sol(SolError::NotASigner(
            Address::new([1; 32]).to_string(),
        )))
        .into();
        assert_eq!(err.kind(), "NotASigner");
    }

    #[test]
    fn field_is_kept_for_relay_address_errors() {
        let err: RelayError = FeeRelayError::InvalidAddress {
            field: "mint",
            reason: "bad".into(),
        }
        .into();
        assert_eq!(err, RelayError::InvalidAddress("mint: bad".into()));
    }

    #[test]
    fn decode_failures_surface_as_transport() {
        let err: RelayError = LendingError::Decode("short".into()).into();
        assert_eq!(err.kind(), "Transport");
    }
}
