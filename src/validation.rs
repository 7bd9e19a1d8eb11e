// Validation utilities module
// Custom validators for monetary request fields
//
// The engines trust their input. These checks run at the HTTP boundary,
// standing in for the order form's own clamping, and keep every amount
// small enough that order arithmetic stays inside `Decimal` range.

use rust_decimal::Decimal;
use validator::ValidationError;

use crate::money::{LineDiscount, MAX_AMOUNT, MAX_ORDER_TOTAL};
use crate::pricing::{OrderDraft, OrderLine};
use crate::refunds::PostedOrder;

/// Validates that an amount lies in 0..=MAX_AMOUNT
pub fn validate_amount(amount: &Decimal) -> Result<(), ValidationError> {
    if *amount < Decimal::ZERO {
        Err(ValidationError::new("amount_must_be_non_negative"))
    } else if *amount > MAX_AMOUNT {
        Err(ValidationError::new("amount_too_large"))
    } else {
        Ok(())
    }
}

/// Validates an amount that may be negative, such as a posted final amount
pub fn validate_signed_amount(amount: &Decimal) -> Result<(), ValidationError> {
    if amount.abs() > MAX_ORDER_TOTAL {
        Err(ValidationError::new("amount_too_large"))
    } else {
        Ok(())
    }
}

/// Validates that a percentage lies in 0..=100
pub fn validate_percentage(percent: &Decimal) -> Result<(), ValidationError> {
    if *percent < Decimal::ZERO || *percent > Decimal::ONE_HUNDRED {
        Err(ValidationError::new("percentage_out_of_range"))
    } else {
        Ok(())
    }
}

/// Cross-field checks for a single order line
///
/// A discount may never exceed the line it applies to, and a line can not
/// have more units returned than were sold.
pub fn validate_order_line(line: &OrderLine) -> Result<(), ValidationError> {
    let gross = match line.checked_gross() {
        Some(gross) if gross <= MAX_ORDER_TOTAL => gross,
        _ => return Err(ValidationError::new("line_total_too_large")),
    };

    match line.discount {
        LineDiscount::Amount(value) => {
            validate_amount(&value).map_err(|_| ValidationError::new("discount_amount_out_of_range"))?;
            if value > gross {
                return Err(ValidationError::new("discount_exceeds_line_total"));
            }
        }
        LineDiscount::Percent(percent) => {
            validate_percentage(&percent)
                .map_err(|_| ValidationError::new("discount_percent_out_of_range"))?;
        }
    }

    if line.returned_quantity > line.quantity {
        return Err(ValidationError::new("returned_quantity_exceeds_quantity"));
    }

    Ok(())
}

/// Validates that the lines of a draft add up to at most MAX_ORDER_TOTAL
pub fn validate_draft_total(draft: &OrderDraft) -> Result<(), ValidationError> {
    validate_lines_total(&draft.lines)
}

/// Validates that the lines of a posted order add up to at most MAX_ORDER_TOTAL
pub fn validate_posted_total(order: &PostedOrder) -> Result<(), ValidationError> {
    validate_lines_total(&order.lines)
}

fn validate_lines_total(lines: &[OrderLine]) -> Result<(), ValidationError> {
    let total = lines.iter().try_fold(Decimal::ZERO, |total, line| {
        line.checked_gross().and_then(|gross| total.checked_add(gross))
    });

    match total {
        Some(total) if total <= MAX_ORDER_TOTAL => Ok(()),
        _ => Err(ValidationError::new("order_total_too_large")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_amount_bounds() {
        assert!(validate_amount(&dec!(0)).is_ok());
        assert!(validate_amount(&dec!(1500)).is_ok());
        assert!(validate_amount(&MAX_AMOUNT).is_ok());
        assert!(validate_amount(&dec!(-1)).is_err());
        assert_eq!(
            validate_amount(&(MAX_AMOUNT + Decimal::ONE)).unwrap_err().code,
            "amount_too_large"
        );
    }

    #[test]
    fn test_signed_amount_allows_negative_final() {
        assert!(validate_signed_amount(&dec!(-5000)).is_ok());
        assert!(validate_signed_amount(&(-MAX_ORDER_TOTAL - Decimal::ONE)).is_err());
    }

    #[test]
    fn test_percentage_bounds() {
        assert!(validate_percentage(&dec!(0)).is_ok());
        assert!(validate_percentage(&dec!(100)).is_ok());
        assert!(validate_percentage(&dec!(100.01)).is_err());
        assert!(validate_percentage(&dec!(-5)).is_err());
    }

    #[test]
    fn test_amount_discount_larger_than_line_is_rejected() {
        let line = OrderLine::new("sku-1", dec!(100), 2).with_discount(LineDiscount::Amount(dec!(201)));
        let err = validate_order_line(&line).unwrap_err();
        assert_eq!(err.code, "discount_exceeds_line_total");
    }

    #[test]
    fn test_amount_discount_equal_to_line_is_accepted() {
        let line = OrderLine::new("sku-1", dec!(100), 2).with_discount(LineDiscount::Amount(dec!(200)));
        assert!(validate_order_line(&line).is_ok());
    }

    #[test]
    fn test_percent_discount_over_hundred_is_rejected() {
        let line = OrderLine::new("sku-1", dec!(100), 1).with_discount(LineDiscount::Percent(dec!(120)));
        assert!(validate_order_line(&line).is_err());
    }

    #[test]
    fn test_over_returned_line_is_rejected() {
        let line = OrderLine::new("sku-1", dec!(100), 1).with_returned_quantity(2);
        let err = validate_order_line(&line).unwrap_err();
        assert_eq!(err.code, "returned_quantity_exceeds_quantity");
    }

    #[test]
    fn test_huge_unit_price_is_rejected_without_overflow() {
        let line = OrderLine::new("sku-1", Decimal::MAX, 4_000_000_000);
        let err = validate_order_line(&line).unwrap_err();
        assert_eq!(err.code, "line_total_too_large");
    }

    #[test]
    fn test_order_total_is_bounded() {
        let big = OrderLine::new("sku-1", MAX_AMOUNT, 1_000_000);
        assert!(validate_order_line(&big).is_ok());

        let draft = OrderDraft::new(vec![big.clone(), big.clone()]);
        assert!(validate_draft_total(&draft).is_ok());

        let lines: Vec<OrderLine> = (0..11)
            .map(|index| OrderLine::new(format!("sku-{index}"), MAX_AMOUNT, 1_000_000))
            .collect();
        let err = validate_lines_total(&lines).unwrap_err();
        assert_eq!(err.code, "order_total_too_large");
    }
}
