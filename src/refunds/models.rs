use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::money::{serialize_amount, sum_amounts};
use crate::pricing::{OrderDraft, OrderLine};
use crate::validation::{validate_amount, validate_posted_total, validate_signed_amount};

/// Immutable snapshot of a posted order, the basis for every refund
///
/// Must come from the order detail service, never from an editable draft.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_posted_total"))]
pub struct PostedOrder {
    #[validate]
    pub lines: Vec<OrderLine>,

    #[serde(default)]
    #[validate(custom = "validate_amount")]
    pub order_discount: Decimal,

    /// Net payable total as posted; bounds the lifetime refund
    #[validate(custom = "validate_signed_amount")]
    pub final_amount: Decimal,
}

impl PostedOrder {
    pub fn new(lines: Vec<OrderLine>, order_discount: Decimal, final_amount: Decimal) -> Self {
        Self {
            lines,
            order_discount,
            final_amount,
        }
    }

    /// Snapshot a draft at the moment it is posted
    pub fn from_draft(draft: &OrderDraft) -> Self {
        let totals = draft.totals();
        Self {
            lines: draft.lines.clone(),
            order_discount: draft.order_discount,
            final_amount: totals.final_amount,
        }
    }

    /// Sum of line values after line discounts
    pub fn total_net(&self) -> Decimal {
        sum_amounts(self.lines.iter().map(OrderLine::net))
    }
}

/// Quantity of one product returned in the current return event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReturnLine {
    #[validate(length(min = 1, message = "Product id must not be empty"))]
    pub product_id: String,
    #[validate(range(max = 1000000, message = "Return quantity must be at most 1000000"))]
    pub quantity_return: u32,
}

impl ReturnLine {
    pub fn new(product_id: impl Into<String>, quantity_return: u32) -> Self {
        Self {
            product_id: product_id.into(),
            quantity_return,
        }
    }
}

/// Refund for one line of a return event
///
/// Carries the requested quantity next to the amount so nothing downstream
/// has to recover it from elsewhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ItemRefund {
    pub product_id: String,
    pub quantity_return: u32,
    #[serde(serialize_with = "serialize_amount")]
    pub refund_amount: Decimal,
}

/// Outcome of one refund allocation
///
/// `item_refunds` always sums to `total_refund` exactly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RefundResult {
    #[serde(serialize_with = "serialize_amount")]
    pub total_refund: Decimal,
    pub item_refunds: Vec<ItemRefund>,
}

impl RefundResult {
    pub fn empty() -> Self {
        Self {
            total_refund: Decimal::ZERO,
            item_refunds: Vec::new(),
        }
    }
}

/// Refundable value of a single unit of an order line
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UnitRefund {
    pub product_id: String,
    /// This line's share of the order-level discount
    pub allocated_order_discount: Decimal,
    /// Unrounded refund for returning exactly one unit
    pub unit_refund: Decimal,
}

/// Request DTO for a stateless refund allocation
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AllocateRefundRequest {
    #[validate]
    pub order: PostedOrder,

    #[validate(length(min = 1, message = "At least one return line is required"))]
    #[validate]
    pub return_lines: Vec<ReturnLine>,

    /// Sum of completed refunds for this order so far
    #[serde(default)]
    #[validate(custom = "validate_amount")]
    pub total_refunded_so_far: Decimal,
}

/// Request DTO for submitting a return event against the ledger
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReturnSubmission {
    #[validate]
    pub order: PostedOrder,

    #[validate(length(min = 1, message = "At least one return line is required"))]
    #[validate]
    pub return_lines: Vec<ReturnLine>,

    /// Client-chosen key; resubmitting with the same key returns the first record
    #[serde(default)]
    #[validate(length(min = 1, max = 128))]
    pub idempotency_key: Option<String>,
}
