//! Self-describing text result for hosts on the single-string contract.
//!
//! `{"success": <payload>}` or `{"error": {"kind": "...", "message": "..."}}`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::RelayError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Envelope {
    Success(Value),
    Error(ErrorBody),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub kind: String,
    pub message: String,
}

impl From<&RelayError> for ErrorBody {
    fn from(e: &RelayError) -> Self {
        ErrorBody {
            kind: e.kind().to_string(),
            message: e.to_string(),
        }
    }
}

impl Envelope {
    pub fn from_result(result: Result<Value, RelayError>) -> Self {
        match result {
            Ok(payload) => Envelope::Success(payload),
            Err(e) => Envelope::Error(ErrorBody::from(&e)),
        }
    }

    pub fn into_result(self) -> Result<Value, ErrorBody> {
        match self {
            Envelope::Success(payload) => Ok(payload),
            Envelope::Error(body) => Err(body),
        }
    }
}

/// Render a result as envelope text. Never fails.
pub fn render(result: Result<Value, RelayError>) -> String {
    let envelope = Envelope::from_result(result);
    serde_json::to_string(&envelope).unwrap_or_else(|e| {
        // Only reachable if a payload holds non-string map keys.
        serde_json::json!({ "error": { "kind": "Serialization", "message": e.to_string() } }).to_string()
    })
}

pub fn parse(text: &str) -> Result<Envelope, RelayError> {
    serde_json::from_str(text).map_err(|e| RelayError::Serialization(format!("envelope: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn success_shape() {
        let text = render(Ok(json!({ "transactions": ["abc"] })));
        assert_eq!(text, r#"{"success":{"transactions":["abc"]}}"#);
    }

    #[test]
    fn error_shape() {
        let text = render(Err(RelayError::UnknownSymbol("XYZ".into())));
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["error"]["kind"], "UnknownSymbol");
        assert_eq!(value["error"]["message"], "Unknown symbol: XYZ");
    }

    #[test]
    fn parses_back() {
        let ok = parse(&render(Ok(json!(7)))).unwrap();
        assert_eq!(ok.into_result().unwrap(), json!(7));

        let err = parse(&render(Err(RelayError::RuntimeShutdown))).unwrap();
        assert_eq!(err.into_result().unwrap_err().kind, "RuntimeShutdown");
    }

    #[test]
    fn garbage_is_a_serialization_error() {
        assert!(matches!(parse("nope"), Err(RelayError::Serialization(_))));
    }
}
