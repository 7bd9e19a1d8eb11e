// Money helpers shared by the pricing and refund engines
// Currency rounding, line discount resolution and JSON amount encoding

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize, Serializer};

/// Decimal places kept on monetary amounts.
/// Amounts are whole units of the smallest currency denomination.
pub const CURRENCY_SCALE: u32 = 0;

/// Largest single amount accepted at the HTTP boundary (10^18)
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(0xA764_0000, 0x0DE0_B6B3, 0, false, 0);

/// Largest order gross accepted at the HTTP boundary (10^25)
pub const MAX_ORDER_TOTAL: Decimal = Decimal::from_parts(0x4A00_0000, 0x1614_0148, 0x0008_4595, false, 0);

/// Largest quantity on a line or in a return event
pub const MAX_QUANTITY: u32 = 1_000_000;

/// Round a value to the smallest currency unit (half away from zero)
pub fn round_currency(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(CURRENCY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Percentage of a base amount, rounded to the smallest currency unit
pub fn percent_of(base: Decimal, percent: Decimal) -> Decimal {
    round_currency(base.saturating_mul(percent / Decimal::ONE_HUNDRED))
}

/// Sum of amounts, saturating at the `Decimal` bounds instead of panicking
pub fn sum_amounts<I>(amounts: I) -> Decimal
where
    I: IntoIterator<Item = Decimal>,
{
    amounts
        .into_iter()
        .fold(Decimal::ZERO, |total, amount| total.saturating_add(amount))
}

/// Per-line discount
///
/// The two representations are mutually exclusive. On the wire this is
/// `{"kind": "amount", "value": 5000}` or `{"kind": "percent", "value": 10}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum LineDiscount {
    /// Fixed amount taken off the whole line
    Amount(Decimal),

    /// Percentage (0..=100) of the line's gross value
    Percent(Decimal),
}

impl LineDiscount {
    pub fn none() -> Self {
        LineDiscount::Amount(Decimal::ZERO)
    }

    /// Absolute discount for a line worth `line_gross`
    pub fn resolve(&self, line_gross: Decimal) -> Decimal {
        match self {
            LineDiscount::Amount(value) => *value,
            LineDiscount::Percent(percent) => percent_of(line_gross, *percent),
        }
    }
}

impl Default for LineDiscount {
    fn default() -> Self {
        LineDiscount::none()
    }
}

/// Serialize a monetary amount as a JSON number.
///
/// Whole amounts go out as integers, so a client never sees `88000.0` or
/// `"88000"`. Fractional amounts fall back to a float.
pub fn serialize_amount<S>(value: &Decimal, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    if value.fract().is_zero() {
        if let Some(whole) = value.to_i64() {
            return serializer.serialize_i64(whole);
        }
    }
    match value.to_f64() {
        Some(float) => serializer.serialize_f64(float),
        None => serializer.serialize_str(&value.to_string()),
    }
}
