// Refund Allocation Engine
//
// Turns a return event into refund amounts against a posted order. The
// order-level discount is prorated over lines by net value, the total is
// capped by what is left to refund, and the total is split over the returned
// lines by cumulative rounding so amounts always add up.

use rust_decimal::Decimal;
use std::collections::HashMap;

use crate::money::{round_currency, sum_amounts};
use crate::refunds::{ItemRefund, PostedOrder, RefundResult, ReturnLine, UnitRefund};

/// Refund for one matched return line before rounding
struct RawRefund {
    product_id: String,
    quantity_return: u32,
    amount: Decimal,
}

/// Service for allocating refunds over order lines
pub struct RefundAllocator;

impl RefundAllocator {
    /// Per-unit refundable value for every line of the order
    ///
    /// Returns an empty list for a degenerate order (no lines, or lines
    /// whose net values sum to zero), which has nothing to allocate.
    pub fn unit_refunds(order: &PostedOrder) -> Vec<UnitRefund> {
        let total_net = order.total_net();
        if order.lines.is_empty() || total_net.is_zero() {
            return Vec::new();
        }

        order
            .lines
            .iter()
            .map(|line| {
                let net = line.net();
                let allocated_order_discount = order.order_discount.saturating_mul(share(net, total_net));
                let unit_refund = if line.quantity == 0 {
                    Decimal::ZERO
                } else {
                    net.saturating_sub(allocated_order_discount) / Decimal::from(line.quantity)
                };
                UnitRefund {
                    product_id: line.product_id.clone(),
                    allocated_order_discount,
                    unit_refund,
                }
            })
            .collect()
    }

    /// Allocate the refund for one return event
    ///
    /// # Arguments
    /// * `order` - Posted order snapshot
    /// * `return_lines` - Quantities returned in this event only
    /// * `total_refunded_so_far` - Sum of completed refunds for the order
    ///
    /// # Returns
    /// A `RefundResult` with `0 <= total_refund <= final_amount - total_refunded_so_far`
    /// whose item refunds sum to `total_refund` exactly.
    ///
    /// Lines that match no product contribute nothing. Quantities above what
    /// is left to return are used as given; eligibility is checked elsewhere.
    pub fn allocate(
        order: &PostedOrder,
        return_lines: &[ReturnLine],
        total_refunded_so_far: Decimal,
    ) -> RefundResult {
        let units = Self::unit_refunds(order);
        if units.is_empty() {
            tracing::debug!("Order has no net value to allocate, refund is zero");
            return RefundResult::empty();
        }

        let mut raw_refunds = Vec::new();
        for return_line in return_lines {
            if return_line.quantity_return == 0 {
                continue;
            }
            match units.iter().find(|unit| unit.product_id == return_line.product_id) {
                Some(unit) => raw_refunds.push(RawRefund {
                    product_id: return_line.product_id.clone(),
                    quantity_return: return_line.quantity_return,
                    amount: unit
                        .unit_refund
                        .saturating_mul(Decimal::from(return_line.quantity_return)),
                }),
                None => {
                    tracing::debug!(
                        "Return line {} matches no order line, contributing zero",
                        return_line.product_id
                    );
                }
            }
        }

        if raw_refunds.is_empty() {
            return RefundResult::empty();
        }

        let raw_total = sum_amounts(raw_refunds.iter().map(|refund| refund.amount));
        let remaining = round_currency(
            order
                .final_amount
                .saturating_sub(total_refunded_so_far)
                .max(Decimal::ZERO),
        );
        let closes_order = Self::completes_order(order, return_lines);

        let target = if closes_order {
            // Last return settles whatever is left, including VAT, shipping
            // and proration rounding
            remaining
        } else {
            // An order discount above the lines' net value makes raw refunds
            // negative; those refund nothing until the order is closed
            round_currency(raw_total).max(Decimal::ZERO).min(remaining)
        };

        tracing::debug!(
            "Allocating refund: raw {}, remaining {}, target {}, closes order: {}",
            raw_total,
            remaining,
            target,
            closes_order
        );

        Self::distribute(raw_refunds, raw_total, target)
    }

    /// Whether this event leaves every line of the order fully returned
    pub fn completes_order(order: &PostedOrder, return_lines: &[ReturnLine]) -> bool {
        let mut requested: HashMap<&str, u64> = HashMap::new();
        for return_line in return_lines {
            *requested.entry(return_line.product_id.as_str()).or_default() +=
                u64::from(return_line.quantity_return);
        }

        !order.lines.is_empty()
            && order.lines.iter().all(|line| {
                let now = requested.get(line.product_id.as_str()).copied().unwrap_or(0);
                u64::from(line.returned_quantity) + now >= u64::from(line.quantity)
            })
    }

    /// Spread `target` over the raw refunds
    ///
    /// Each line gets the rounded share of `target` up to and including it
    /// minus the rounded share before it, so amounts never go negative and
    /// the last line closes the sum on `target`.
    fn distribute(raw_refunds: Vec<RawRefund>, raw_total: Decimal, target: Decimal) -> RefundResult {
        let last = raw_refunds.len() - 1;

        let mut running_raw = Decimal::ZERO;
        let mut assigned = Decimal::ZERO;
        let item_refunds = raw_refunds
            .into_iter()
            .enumerate()
            .map(|(index, raw)| {
                let refund_amount = if index == last {
                    target - assigned
                } else {
                    running_raw = running_raw.saturating_add(raw.amount);
                    let cumulative = if raw_total.is_zero() {
                        assigned
                    } else {
                        round_currency(target.saturating_mul(share(running_raw, raw_total)))
                            .max(assigned)
                            .min(target)
                    };
                    let amount = cumulative - assigned;
                    assigned = cumulative;
                    amount
                };
                ItemRefund {
                    product_id: raw.product_id,
                    quantity_return: raw.quantity_return,
                    refund_amount,
                }
            })
            .collect();

        RefundResult {
            total_refund: target,
            item_refunds,
        }
    }
}

/// `part / whole`, or zero when the quotient does not fit a `Decimal`
///
/// Validated orders have non-negative line nets, so shares stay within 0..=1.
fn share(part: Decimal, whole: Decimal) -> Decimal {
    part.checked_div(whole).unwrap_or(Decimal::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::LineDiscount;
    use crate::pricing::OrderLine;
    use rust_decimal_macros::dec;

    /// Line A: 100,000 x 2, line B: 50,000 x 1, order discount 30,000
    fn two_line_order() -> PostedOrder {
        PostedOrder::new(
            vec![
                OrderLine::new("A", dec!(100000), 2),
                OrderLine::new("B", dec!(50000), 1),
            ],
            dec!(30000),
            dec!(220000),
        )
    }

    fn item_sum(result: &RefundResult) -> Decimal {
        result.item_refunds.iter().map(|item| item.refund_amount).sum()
    }

    #[test]
    fn test_unit_refund_prorates_order_discount() {
        let units = RefundAllocator::unit_refunds(&two_line_order());
        assert_eq!(units.len(), 2);
        assert_eq!(units[0].allocated_order_discount, dec!(24000));
        assert_eq!(units[0].unit_refund, dec!(88000));
        assert_eq!(units[1].allocated_order_discount, dec!(6000));
        assert_eq!(units[1].unit_refund, dec!(44000));
    }

    #[test]
    fn test_single_unit_return() {
        let result = RefundAllocator::allocate(&two_line_order(), &[ReturnLine::new("A", 1)], Decimal::ZERO);

        assert_eq!(result.total_refund, dec!(88000));
        assert_eq!(result.item_refunds.len(), 1);
        assert_eq!(result.item_refunds[0].product_id, "A");
        assert_eq!(result.item_refunds[0].quantity_return, 1);
        assert_eq!(result.item_refunds[0].refund_amount, dec!(88000));
    }

    #[test]
    fn test_second_return_settles_order_exactly() {
        let first = RefundAllocator::allocate(&two_line_order(), &[ReturnLine::new("A", 1)], Decimal::ZERO);

        let mut order = two_line_order();
        order.lines[0].returned_quantity = 1;
        let second = RefundAllocator::allocate(
            &order,
            &[ReturnLine::new("A", 1), ReturnLine::new("B", 1)],
            first.total_refund,
        );

        assert_eq!(second.total_refund, dec!(132000));
        assert_eq!(second.item_refunds[0].refund_amount, dec!(88000));
        assert_eq!(second.item_refunds[1].refund_amount, dec!(44000));
        assert_eq!(first.total_refund + second.total_refund, dec!(220000));
    }

    #[test]
    fn test_refund_is_capped_by_remaining_balance() {
        let result = RefundAllocator::allocate(
            &two_line_order(),
            &[ReturnLine::new("A", 2)],
            dec!(100000),
        );

        assert_eq!(result.total_refund, dec!(120000));
        assert_eq!(item_sum(&result), dec!(120000));
    }

    #[test]
    fn test_cap_splits_total_over_lines() {
        // Raw refund 88,000 + 44,000 = 132,000 against 100,001 remaining
        let result = RefundAllocator::allocate(
            &two_line_order(),
            &[ReturnLine::new("A", 1), ReturnLine::new("B", 1)],
            dec!(119999),
        );

        assert_eq!(result.total_refund, dec!(100001));
        // 88,000 * 100,001 / 132,000 = 66,667.33
        assert_eq!(result.item_refunds[0].refund_amount, dec!(66667));
        assert_eq!(result.item_refunds[1].refund_amount, dec!(33334));
        assert_eq!(item_sum(&result), result.total_refund);
    }

    #[test]
    fn test_capped_split_never_goes_negative() {
        // Every line rounds 0.5 up when split one by one; 2 left to refund
        let lines: Vec<OrderLine> = (0..5)
            .map(|index| OrderLine::new(format!("p{index}"), dec!(100), 1))
            .collect();
        let order = PostedOrder::new(lines, Decimal::ZERO, dec!(500));
        let return_lines: Vec<ReturnLine> = (0..4).map(|index| ReturnLine::new(format!("p{index}"), 1)).collect();

        let result = RefundAllocator::allocate(&order, &return_lines, dec!(498));

        assert_eq!(result.total_refund, dec!(2));
        let amounts: Vec<Decimal> = result.item_refunds.iter().map(|item| item.refund_amount).collect();
        assert_eq!(amounts, vec![dec!(1), dec!(0), dec!(1), dec!(0)]);
        assert_eq!(item_sum(&result), result.total_refund);
    }

    #[test]
    fn test_order_discount_above_net_value() {
        // 25,000 off 20,000 of goods, shipping keeps the final amount at 25,000
        let mut order = PostedOrder::new(vec![OrderLine::new("A", dec!(10000), 2)], dec!(25000), dec!(25000));

        let partial = RefundAllocator::allocate(&order, &[ReturnLine::new("A", 1)], Decimal::ZERO);
        assert_eq!(partial.total_refund, Decimal::ZERO);
        assert_eq!(partial.item_refunds[0].refund_amount, Decimal::ZERO);

        order.lines[0].returned_quantity = 1;
        let last = RefundAllocator::allocate(&order, &[ReturnLine::new("A", 1)], partial.total_refund);
        assert_eq!(last.total_refund, dec!(25000));
    }

    #[test]
    fn test_large_amounts_prorate_without_overflow() {
        let price = Decimal::from(10i64.pow(15));
        let order = PostedOrder::new(
            vec![OrderLine::new("A", price, 1), OrderLine::new("B", price, 1)],
            Decimal::from(5 * 10i64.pow(14)),
            Decimal::from(15 * 10i64.pow(14)),
        );

        let units = RefundAllocator::unit_refunds(&order);
        assert_eq!(units[0].allocated_order_discount, Decimal::from(25 * 10i64.pow(13)));

        let result = RefundAllocator::allocate(&order, &[ReturnLine::new("A", 1)], Decimal::ZERO);
        assert_eq!(result.total_refund, Decimal::from(75 * 10i64.pow(13)));
    }

    #[test]
    fn test_fully_refunded_order_returns_zero() {
        let result = RefundAllocator::allocate(
            &two_line_order(),
            &[ReturnLine::new("A", 1)],
            dec!(220000),
        );

        assert_eq!(result.total_refund, Decimal::ZERO);
        assert!(result.item_refunds.iter().all(|item| item.refund_amount.is_zero()));
    }

    #[test]
    fn test_over_refunded_ledger_clamps_to_zero() {
        let result = RefundAllocator::allocate(
            &two_line_order(),
            &[ReturnLine::new("A", 1)],
            dec!(250000),
        );
        assert_eq!(result.total_refund, Decimal::ZERO);
    }

    #[test]
    fn test_unmatched_product_contributes_nothing() {
        let result = RefundAllocator::allocate(
            &two_line_order(),
            &[ReturnLine::new("missing", 3), ReturnLine::new("B", 1)],
            Decimal::ZERO,
        );

        assert_eq!(result.total_refund, dec!(44000));
        assert_eq!(result.item_refunds.len(), 1);
        assert_eq!(result.item_refunds[0].product_id, "B");
    }

    #[test]
    fn test_only_unmatched_products_is_empty() {
        let result = RefundAllocator::allocate(
            &two_line_order(),
            &[ReturnLine::new("missing", 1)],
            Decimal::ZERO,
        );
        assert_eq!(result, RefundResult::empty());
    }

    #[test]
    fn test_empty_order_is_degenerate() {
        let order = PostedOrder::new(vec![], Decimal::ZERO, Decimal::ZERO);
        let result = RefundAllocator::allocate(&order, &[ReturnLine::new("A", 1)], Decimal::ZERO);
        assert_eq!(result, RefundResult::empty());
    }

    #[test]
    fn test_zero_net_order_is_degenerate() {
        let order = PostedOrder::new(
            vec![OrderLine::new("gift", dec!(50000), 1).with_discount(LineDiscount::Percent(dec!(100)))],
            Decimal::ZERO,
            dec!(15000),
        );
        let result = RefundAllocator::allocate(&order, &[ReturnLine::new("gift", 1)], Decimal::ZERO);
        assert_eq!(result, RefundResult::empty());
    }

    #[test]
    fn test_zero_quantity_lines_are_skipped() {
        let result = RefundAllocator::allocate(
            &two_line_order(),
            &[ReturnLine::new("A", 0), ReturnLine::new("B", 1)],
            Decimal::ZERO,
        );
        assert_eq!(result.item_refunds.len(), 1);
        assert_eq!(result.total_refund, dec!(44000));
    }

    #[test]
    fn test_over_request_is_computed_as_given() {
        // Three units of A on a line of two; still capped by the order total
        let result = RefundAllocator::allocate(
            &two_line_order(),
            &[ReturnLine::new("A", 3)],
            Decimal::ZERO,
        );
        assert_eq!(result.total_refund, dec!(220000));
        assert_eq!(result.item_refunds[0].quantity_return, 3);
    }

    #[test]
    fn test_last_return_includes_shipping_and_vat() {
        let order = PostedOrder::new(
            vec![OrderLine::new("A", dec!(100000), 1).with_vat_rate(dec!(10))],
            Decimal::ZERO,
            // 100,000 + 10,000 VAT + 20,000 shipping
            dec!(130000),
        );

        let result = RefundAllocator::allocate(&order, &[ReturnLine::new("A", 1)], Decimal::ZERO);
        assert_eq!(result.total_refund, dec!(130000));
        assert_eq!(result.item_refunds[0].refund_amount, dec!(130000));
    }

    #[test]
    fn test_partial_return_excludes_vat_and_shipping() {
        let order = PostedOrder::new(
            vec![OrderLine::new("A", dec!(100000), 2).with_vat_rate(dec!(10))],
            Decimal::ZERO,
            dec!(240000),
        );

        let result = RefundAllocator::allocate(&order, &[ReturnLine::new("A", 1)], Decimal::ZERO);
        assert_eq!(result.total_refund, dec!(100000));
    }

    #[test]
    fn test_rounding_of_thirds_sums_exactly() {
        // Prorating 10,000 over 310,000 of net value leaves repeating decimals
        let order = PostedOrder::new(
            vec![
                OrderLine::new("A", dec!(100000), 3),
                OrderLine::new("B", dec!(10000), 1),
            ],
            dec!(10000),
            dec!(100000),
        );

        let result = RefundAllocator::allocate(
            &order,
            &[ReturnLine::new("A", 1), ReturnLine::new("B", 1)],
            Decimal::ZERO,
        );
        assert_eq!(item_sum(&result), result.total_refund);
    }

    #[test]
    fn test_completes_order_accounts_for_earlier_returns() {
        let mut order = two_line_order();
        assert!(!RefundAllocator::completes_order(&order, &[ReturnLine::new("A", 1), ReturnLine::new("B", 1)]));

        order.lines[0].returned_quantity = 1;
        assert!(RefundAllocator::completes_order(&order, &[ReturnLine::new("A", 1), ReturnLine::new("B", 1)]));
    }

    #[test]
    fn test_allocation_is_idempotent() {
        let lines = [ReturnLine::new("A", 1), ReturnLine::new("B", 1)];
        let first = RefundAllocator::allocate(&two_line_order(), &lines, dec!(5000));
        let second = RefundAllocator::allocate(&two_line_order(), &lines, dec!(5000));
        assert_eq!(first, second);
    }
}
