use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::money::{serialize_amount, LineDiscount};
use crate::validation::{validate_amount, validate_draft_total, validate_order_line, validate_percentage};

/// One product within an order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_order_line"))]
pub struct OrderLine {
    /// Opaque identifier, unique within an order
    #[validate(length(min = 1, message = "Product id must not be empty"))]
    pub product_id: String,

    /// Price per unit at the time of the order
    #[validate(custom = "validate_amount")]
    pub unit_price: Decimal,

    #[validate(range(min = 1, max = 1000000, message = "Quantity must be between 1 and 1000000"))]
    pub quantity: u32,

    #[serde(default)]
    #[schema(value_type = Object)]
    pub discount: LineDiscount,

    /// VAT rate in percent, only charged in sale contexts
    #[serde(default)]
    #[validate(custom = "validate_percentage")]
    pub vat_rate: Decimal,

    /// Units already returned by earlier return events
    #[serde(default)]
    pub returned_quantity: u32,
}

impl OrderLine {
    pub fn new(product_id: impl Into<String>, unit_price: Decimal, quantity: u32) -> Self {
        Self {
            product_id: product_id.into(),
            unit_price,
            quantity,
            discount: LineDiscount::none(),
            vat_rate: Decimal::ZERO,
            returned_quantity: 0,
        }
    }

    pub fn with_discount(mut self, discount: LineDiscount) -> Self {
        self.discount = discount;
        self
    }

    pub fn with_vat_rate(mut self, vat_rate: Decimal) -> Self {
        self.vat_rate = vat_rate;
        self
    }

    pub fn with_returned_quantity(mut self, returned_quantity: u32) -> Self {
        self.returned_quantity = returned_quantity;
        self
    }

    /// `unit_price * quantity`, before any discount
    ///
    /// Saturates at `Decimal::MAX`; requests are bounded well below that.
    pub fn gross(&self) -> Decimal {
        self.unit_price.saturating_mul(Decimal::from(self.quantity))
    }

    /// `unit_price * quantity`, or `None` when it does not fit a `Decimal`
    pub fn checked_gross(&self) -> Option<Decimal> {
        self.unit_price.checked_mul(Decimal::from(self.quantity))
    }

    /// Absolute line discount, always derived from `discount`
    pub fn discount_amount(&self) -> Decimal {
        self.discount.resolve(self.gross())
    }

    /// Line value after its own discount, before the order-level discount
    pub fn net(&self) -> Decimal {
        self.gross().saturating_sub(self.discount_amount())
    }

    pub fn remaining_quantity(&self) -> u32 {
        self.quantity.saturating_sub(self.returned_quantity)
    }

    pub fn is_fully_returned(&self) -> bool {
        self.returned_quantity >= self.quantity
    }
}

/// Per-line breakdown inside `OrderTotals`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LineTotals {
    pub product_id: String,
    #[serde(serialize_with = "serialize_amount")]
    pub gross: Decimal,
    #[serde(serialize_with = "serialize_amount")]
    pub discount_amount: Decimal,
    #[serde(serialize_with = "serialize_amount")]
    pub net: Decimal,
    #[serde(serialize_with = "serialize_amount")]
    pub vat_amount: Decimal,
}

/// Derived totals for an order; never stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderTotals {
    pub lines: Vec<LineTotals>,
    #[serde(serialize_with = "serialize_amount")]
    pub gross: Decimal,
    #[serde(serialize_with = "serialize_amount")]
    pub item_discount_total: Decimal,
    #[serde(serialize_with = "serialize_amount")]
    pub order_discount: Decimal,
    /// `item_discount_total + order_discount`
    #[serde(serialize_with = "serialize_amount")]
    pub total_discount: Decimal,
    #[serde(serialize_with = "serialize_amount")]
    pub vat_total: Decimal,
    #[serde(serialize_with = "serialize_amount")]
    pub shipping_fee: Decimal,
    /// `gross - total_discount + vat_total + shipping_fee`, never clamped
    #[serde(serialize_with = "serialize_amount")]
    pub final_amount: Decimal,
    #[serde(serialize_with = "serialize_amount")]
    pub amount_paid: Decimal,
    /// Negative when the customer overpaid
    #[serde(serialize_with = "serialize_amount")]
    pub balance_due: Decimal,
}

impl OrderTotals {
    pub fn is_overpaid(&self) -> bool {
        self.balance_due < Decimal::ZERO
    }

    /// Change to hand back at the counter. Overpayment is only ever shown,
    /// never refunded by the engine.
    pub fn change_due(&self) -> Decimal {
        (-self.balance_due).max(Decimal::ZERO)
    }
}

/// Order draft as edited in the order form
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_draft_total"))]
pub struct OrderDraft {
    #[validate]
    pub lines: Vec<OrderLine>,

    #[serde(default)]
    #[validate(custom = "validate_amount")]
    pub order_discount: Decimal,

    #[serde(default)]
    #[validate(custom = "validate_amount")]
    pub shipping_fee: Decimal,

    #[serde(default)]
    #[validate(custom = "validate_amount")]
    pub amount_paid: Decimal,

    /// VAT is charged on sales only, never on returns
    #[serde(default)]
    pub vat_enabled: bool,
}

impl OrderDraft {
    pub fn new(lines: Vec<OrderLine>) -> Self {
        Self {
            lines,
            order_discount: Decimal::ZERO,
            shipping_fee: Decimal::ZERO,
            amount_paid: Decimal::ZERO,
            vat_enabled: false,
        }
    }

    pub fn totals(&self) -> OrderTotals {
        super::PriceCalculator::compute_totals(
            &self.lines,
            self.order_discount,
            self.shipping_fee,
            self.amount_paid,
            self.vat_enabled,
        )
    }
}
