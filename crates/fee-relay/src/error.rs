use chain_sol::SolError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeeRelayError {
    #[error("invalid {field}: {reason}")]
    InvalidAddress { field: &'static str, reason: String },

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error(transparent)]
    Sol(#[from] SolError),
}

impl FeeRelayError {
    pub(crate) fn address(field: &'static str, err: SolError) -> Self {
        let reason = match err {
            SolError::InvalidAddress(reason) => reason,
            other => other.to_string(),
        };
        FeeRelayError::InvalidAddress { field, reason }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_error_names_the_field() {
        let err = FeeRelayError::address("recipient", SolError::InvalidAddress("bad".into()));
        assert_eq!(err.to_string(), "invalid recipient: bad");
    }

    #[test]
    fn sol_errors_pass_through() {
        let err: FeeRelayError = SolError::NotASigner("x".into()).into();
        assert_eq!(err.to_string(), SolError::NotASigner("x".into()).to_string());
    }
}
