use uuid::Uuid;

use crate::ledger::{LedgerResult, OrderRefundSummary, RefundLedger, ReturnRecord, ReturnStatus};
use crate::metrics::EngineMetrics;
use crate::refunds::{AllocateRefundRequest, RefundAllocator, RefundResult, ReturnSubmission};

/// Service for refund business logic
///
/// Ties the stateless allocator to the return ledger, which is the only
/// source of the amount already refunded for an order.
#[derive(Clone)]
pub struct RefundService {
    ledger: RefundLedger,
    metrics: EngineMetrics,
}

impl RefundService {
    pub fn new(ledger: RefundLedger, metrics: EngineMetrics) -> Self {
        Self { ledger, metrics }
    }

    /// Allocate a refund without recording anything
    pub fn quote(&self, request: &AllocateRefundRequest) -> RefundResult {
        let _timer = self.metrics.start_refund_allocation();
        RefundAllocator::allocate(
            &request.order,
            &request.return_lines,
            request.total_refunded_so_far,
        )
    }

    /// Allocate a return event against the ledger and record it as pending
    ///
    /// # Arguments
    /// * `order_id` - ID of the posted order being returned against
    /// * `submission` - Order snapshot, return lines and optional idempotency key
    ///
    /// # Returns
    /// The newly recorded return, or the earlier one when the idempotency
    /// key was already used for this order
    pub async fn submit_return(&self, order_id: Uuid, submission: ReturnSubmission) -> ReturnRecord {
        if let Some(key) = submission.idempotency_key.as_deref() {
            if let Some(existing) = self.ledger.find_by_idempotency_key(order_id, key).await {
                tracing::info!(
                    order_id = %order_id,
                    return_id = %existing.id,
                    "Return already submitted with this idempotency key"
                );
                return existing;
            }
        }

        let _timer = self.metrics.start_return_submission();

        let total_refunded = self.ledger.total_refunded(order_id).await;
        let result = RefundAllocator::allocate(&submission.order, &submission.return_lines, total_refunded);

        tracing::debug!(
            "Allocated {} across {} lines for order {} (already refunded {})",
            result.total_refund,
            result.item_refunds.len(),
            order_id,
            total_refunded
        );

        self.ledger
            .record_pending(
                order_id,
                submission.order.final_amount,
                result,
                submission.idempotency_key,
            )
            .await
    }

    pub async fn complete_return(&self, return_id: Uuid) -> LedgerResult<ReturnRecord> {
        self.ledger.update_status(return_id, ReturnStatus::Completed).await
    }

    pub async fn fail_return(&self, return_id: Uuid) -> LedgerResult<ReturnRecord> {
        self.ledger.update_status(return_id, ReturnStatus::Failed).await
    }

    pub async fn update_status(&self, return_id: Uuid, status: ReturnStatus) -> LedgerResult<ReturnRecord> {
        self.ledger.update_status(return_id, status).await
    }

    /// All returns of an order with the completed refund total
    pub async fn order_summary(&self, order_id: Uuid) -> OrderRefundSummary {
        let returns = self.ledger.returns_for_order(order_id).await;
        let total_refunded = self.ledger.total_refunded(order_id).await;

        OrderRefundSummary {
            order_id,
            total_refunded,
            returns,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::LedgerError;
    use crate::pricing::OrderLine;
    use crate::refunds::{PostedOrder, ReturnLine};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn service() -> RefundService {
        RefundService::new(RefundLedger::new(), EngineMetrics::new())
    }

    /// Two lines worth 250,000 with 30,000 off the order, final 220,000
    fn posted_order() -> PostedOrder {
        PostedOrder::new(
            vec![
                OrderLine::new("A", dec!(100000), 2),
                OrderLine::new("B", dec!(50000), 1),
            ],
            dec!(30000),
            dec!(220000),
        )
    }

    fn submission(lines: Vec<ReturnLine>, key: Option<&str>) -> ReturnSubmission {
        ReturnSubmission {
            order: posted_order(),
            return_lines: lines,
            idempotency_key: key.map(str::to_string),
        }
    }

    #[test]
    fn test_quote_records_nothing_but_metrics() {
        let service = service();
        let request = AllocateRefundRequest {
            order: posted_order(),
            return_lines: vec![ReturnLine::new("A", 1)],
            total_refunded_so_far: Decimal::ZERO,
        };

        assert_eq!(service.quote(&request).total_refund, dec!(88000));
        assert_eq!(service.metrics.summary().refund_allocations, 1);
    }

    #[tokio::test]
    async fn test_submit_then_complete() {
        let service = service();
        let order_id = Uuid::new_v4();

        let record = service
            .submit_return(order_id, submission(vec![ReturnLine::new("A", 1)], None))
            .await;
        assert_eq!(record.status, ReturnStatus::Pending);
        assert_eq!(record.total_refund, dec!(88000));
        assert_eq!(record.order_final_amount, dec!(220000));

        service.complete_return(record.id).await.unwrap();
        let summary = service.order_summary(order_id).await;
        assert_eq!(summary.total_refunded, dec!(88000));
        assert_eq!(summary.returns.len(), 1);
    }

    #[tokio::test]
    async fn test_second_return_uses_completed_total() {
        let service = service();
        let order_id = Uuid::new_v4();

        let first = service
            .submit_return(order_id, submission(vec![ReturnLine::new("A", 1)], None))
            .await;
        service.complete_return(first.id).await.unwrap();

        let mut order = posted_order();
        order.lines[0].returned_quantity = 1;
        let second = service
            .submit_return(
                order_id,
                ReturnSubmission {
                    order,
                    return_lines: vec![ReturnLine::new("A", 1), ReturnLine::new("B", 1)],
                    idempotency_key: None,
                },
            )
            .await;
        service.complete_return(second.id).await.unwrap();

        assert_eq!(second.total_refund, dec!(132000));
        assert_eq!(service.order_summary(order_id).await.total_refunded, dec!(220000));
    }

    #[tokio::test]
    async fn test_failed_return_frees_its_amount() {
        let service = service();
        let order_id = Uuid::new_v4();

        let failed = service
            .submit_return(order_id, submission(vec![ReturnLine::new("B", 1)], None))
            .await;
        service.fail_return(failed.id).await.unwrap();

        assert_eq!(service.order_summary(order_id).await.total_refunded, Decimal::ZERO);

        let retry = service
            .submit_return(order_id, submission(vec![ReturnLine::new("B", 1)], None))
            .await;
        assert_eq!(retry.total_refund, failed.total_refund);
        assert_ne!(retry.id, failed.id);
    }

    #[tokio::test]
    async fn test_resubmission_with_same_key() {
        let service = service();
        let order_id = Uuid::new_v4();

        let first = service
            .submit_return(order_id, submission(vec![ReturnLine::new("A", 1)], Some("r-1")))
            .await;
        let again = service
            .submit_return(order_id, submission(vec![ReturnLine::new("A", 1)], Some("r-1")))
            .await;

        assert_eq!(first, again);
        assert_eq!(service.order_summary(order_id).await.returns.len(), 1);
    }

    #[tokio::test]
    async fn test_update_status_rejects_terminal_change() {
        let service = service();
        let order_id = Uuid::new_v4();

        let record = service
            .submit_return(order_id, submission(vec![ReturnLine::new("A", 1)], None))
            .await;
        service.update_status(record.id, ReturnStatus::Completed).await.unwrap();

        let result = service.update_status(record.id, ReturnStatus::Failed).await;
        assert!(matches!(result, Err(LedgerError::InvalidTransition { .. })));
    }
}
