//! Fulfillment outcome normalization.
//!
//! Settlement backends have returned the transaction reference either as
//! a bare string or inside an object (`hash` or `transactionHash`). Both
//! collapse into one [`FulfillmentOutcome`]. A successful settlement with
//! no recognizable reference still counts as success and carries the
//! [`UNKNOWN_REFERENCE`] sentinel.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Sentinel reference when the backend did not report one.
pub const UNKNOWN_REFERENCE: &str = "unknown";

/// Object keys probed for a transaction reference, in order.
const REFERENCE_KEYS: &[&str] = &["hash", "transactionHash", "transaction_hash", "order_hash", "orderHash"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FulfillmentStatus {
    Success,
    Failed,
}

/// Terminal record of one settlement or order-creation call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FulfillmentOutcome {
    pub status: FulfillmentStatus,
    /// Transaction hash or other opaque identifier.
    pub transaction_reference: String,
    /// Backend response, untouched.
    pub raw_result: Value,
}

impl FulfillmentOutcome {
    /// Normalize a successful backend response.
    pub fn from_success(raw_result: Value) -> Self {
        let transaction_reference =
            extract_reference(&raw_result).unwrap_or_else(|| UNKNOWN_REFERENCE.to_string());
        Self {
            status: FulfillmentStatus::Success,
            transaction_reference,
            raw_result,
        }
    }

    /// Record a rejected settlement. The upstream message is kept verbatim.
    pub fn from_failure(message: &str) -> Self {
        Self {
            status: FulfillmentStatus::Failed,
            transaction_reference: UNKNOWN_REFERENCE.to_string(),
            raw_result: serde_json::json!({ "error": message }),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == FulfillmentStatus::Success
    }
}

fn extract_reference(raw: &Value) -> Option<String> {
    match raw {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Object(map) => REFERENCE_KEYS
            .iter()
            .filter_map(|key| map.get(*key))
            .find_map(|v| v.as_str().filter(|s| !s.is_empty()).map(str::to_string))
            .or_else(|| map.get("order").and_then(extract_reference)),
        _ => None,
    }
}
