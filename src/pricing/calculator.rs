use rust_decimal::Decimal;

use crate::money::{percent_of, sum_amounts};
use crate::pricing::{LineTotals, OrderLine, OrderTotals};

/// Service for calculating order totals
///
/// Pure and synchronous. The order form calls it on every edit, so it keeps
/// no state between calls.
pub struct PriceCalculator;

impl PriceCalculator {
    /// Calculate the breakdown for a single line
    ///
    /// # Arguments
    /// * `line` - The order line
    /// * `vat_enabled` - Whether VAT is charged (sale context)
    pub fn line_totals(line: &OrderLine, vat_enabled: bool) -> LineTotals {
        let gross = line.gross();
        let discount_amount = line.discount_amount();
        let net = gross.saturating_sub(discount_amount);
        let vat_amount = if vat_enabled {
            Self::vat_amount(net, line.vat_rate)
        } else {
            Decimal::ZERO
        };

        LineTotals {
            product_id: line.product_id.clone(),
            gross,
            discount_amount,
            net,
            vat_amount,
        }
    }

    /// VAT due on a discounted line value, rounded to the smallest unit
    pub fn vat_amount(net: Decimal, vat_rate: Decimal) -> Decimal {
        percent_of(net, vat_rate)
    }

    /// Calculate order totals from the draft state
    ///
    /// # Arguments
    /// * `lines` - Order lines; assumed already clamped by the form
    /// * `order_discount` - Flat discount on the whole order, not prorated here
    /// * `shipping_fee` - Shipping charged on the order
    /// * `amount_paid` - Amount the customer already paid
    /// * `vat_enabled` - Charge VAT (sales only, never returns)
    ///
    /// # Returns
    /// `OrderTotals` where `final_amount = gross - total_discount + vat_total + shipping_fee`.
    /// The final amount is not clamped and may be negative.
    pub fn compute_totals(
        lines: &[OrderLine],
        order_discount: Decimal,
        shipping_fee: Decimal,
        amount_paid: Decimal,
        vat_enabled: bool,
    ) -> OrderTotals {
        let line_totals: Vec<LineTotals> = lines
            .iter()
            .map(|line| Self::line_totals(line, vat_enabled))
            .collect();

        let gross = sum_amounts(line_totals.iter().map(|line| line.gross));
        let item_discount_total = sum_amounts(line_totals.iter().map(|line| line.discount_amount));
        let vat_total = sum_amounts(line_totals.iter().map(|line| line.vat_amount));

        let total_discount = item_discount_total.saturating_add(order_discount);
        let final_amount = gross
            .saturating_sub(total_discount)
            .saturating_add(vat_total)
            .saturating_add(shipping_fee);

        OrderTotals {
            lines: line_totals,
            gross,
            item_discount_total,
            order_discount,
            total_discount,
            vat_total,
            shipping_fee,
            final_amount,
            amount_paid,
            balance_due: final_amount.saturating_sub(amount_paid),
        }
    }
}
