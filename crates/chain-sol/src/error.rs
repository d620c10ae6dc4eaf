use thiserror::Error;

/// Solana primitive and wire-format errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SolError {
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("invalid keypair: {0}")]
    InvalidKeypair(String),

    #[error("transaction build error: {0}")]
    TransactionBuildError(String),

    #[error("blockhash mismatch: transaction was built against {embedded}, caller supplied {supplied}")]
    BlockhashMismatch { embedded: String, supplied: String },

    #[error("not a signer: {0} is not among the transaction's required signers")]
    NotASigner(String),

    #[error("serialization error: {0}")]
    SerializationError(String),
}
