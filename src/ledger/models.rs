use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::money::serialize_amount;
use crate::refunds::ItemRefund;

/// Lifecycle of a return event
///
/// Only `Completed` returns count toward the amount already refunded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ReturnStatus {
    Pending,
    Completed,
    Failed,
}

impl ReturnStatus {
    /// Convert status to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            ReturnStatus::Pending => "pending",
            ReturnStatus::Completed => "completed",
            ReturnStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ReturnStatus::Completed | ReturnStatus::Failed)
    }
}

impl std::str::FromStr for ReturnStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(ReturnStatus::Pending),
            "completed" => Ok(ReturnStatus::Completed),
            "failed" => Ok(ReturnStatus::Failed),
            _ => Err(format!("Invalid return status: {}", s)),
        }
    }
}

impl Default for ReturnStatus {
    fn default() -> Self {
        ReturnStatus::Pending
    }
}

impl std::fmt::Display for ReturnStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One return event recorded against an order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReturnRecord {
    pub id: Uuid,
    pub order_id: Uuid,
    pub status: ReturnStatus,
    #[serde(serialize_with = "serialize_amount")]
    pub total_refund: Decimal,
    pub item_refunds: Vec<ItemRefund>,
    /// Final amount of the order the refund was allocated against
    #[serde(serialize_with = "serialize_amount")]
    pub order_final_amount: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idempotency_key: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request DTO for moving a return to a new status
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateReturnStatusRequest {
    pub status: ReturnStatus,
}

/// Response DTO listing an order's returns
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderRefundSummary {
    pub order_id: Uuid,
    /// Sum of completed refunds only
    #[serde(serialize_with = "serialize_amount")]
    pub total_refunded: Decimal,
    pub returns: Vec<ReturnRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_status_round_trip_through_str() {
        for status in [ReturnStatus::Pending, ReturnStatus::Completed, ReturnStatus::Failed] {
            assert_eq!(ReturnStatus::from_str(status.as_str()).unwrap(), status);
        }
    }

    #[test]
    fn test_status_parse_is_case_insensitive() {
        assert_eq!(ReturnStatus::from_str("COMPLETED").unwrap(), ReturnStatus::Completed);
        assert!(ReturnStatus::from_str("refunded").is_err());
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(!ReturnStatus::Pending.is_terminal());
        assert!(ReturnStatus::Completed.is_terminal());
        assert!(ReturnStatus::Failed.is_terminal());
    }

    #[test]
    fn test_status_json() {
        let request: UpdateReturnStatusRequest =
            serde_json::from_str(r#"{"status":"completed"}"#).unwrap();
        assert_eq!(request.status, ReturnStatus::Completed);
    }
}
