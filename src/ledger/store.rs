// Return ledger
//
// Keeps every return event per order in memory and answers how much has
// already been refunded. Only completed returns count toward that total.

use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::ledger::{
    error::{LedgerError, LedgerResult},
    ReturnRecord, ReturnStatus, ReturnStatusMachine,
};
use crate::refunds::RefundResult;

/// In-memory store of return records, cheap to clone and share
#[derive(Clone, Default)]
pub struct RefundLedger {
    records: Arc<RwLock<HashMap<Uuid, ReturnRecord>>>,
}

impl RefundLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an allocated refund as a pending return
    ///
    /// When `idempotency_key` matches an earlier return of the same order,
    /// that record is returned unchanged and nothing new is stored.
    pub async fn record_pending(
        &self,
        order_id: Uuid,
        order_final_amount: Decimal,
        result: RefundResult,
        idempotency_key: Option<String>,
    ) -> ReturnRecord {
        let mut records = self.records.write().await;

        if let Some(key) = idempotency_key.as_deref() {
            if let Some(existing) = records
                .values()
                .find(|r| r.order_id == order_id && r.idempotency_key.as_deref() == Some(key))
            {
                tracing::debug!(return_id = %existing.id, "Idempotency key matched existing return");
                return existing.clone();
            }
        }

        let now = Utc::now();
        let record = ReturnRecord {
            id: Uuid::new_v4(),
            order_id,
            status: ReturnStatus::Pending,
            total_refund: result.total_refund,
            item_refunds: result.item_refunds,
            order_final_amount,
            idempotency_key,
            created_at: now,
            updated_at: now,
        };

        records.insert(record.id, record.clone());

        tracing::info!(
            return_id = %record.id,
            order_id = %order_id,
            total_refund = %record.total_refund,
            "Recorded pending return"
        );

        record
    }

    pub async fn find(&self, return_id: Uuid) -> Option<ReturnRecord> {
        self.records.read().await.get(&return_id).cloned()
    }

    pub async fn find_by_idempotency_key(&self, order_id: Uuid, key: &str) -> Option<ReturnRecord> {
        self.records
            .read()
            .await
            .values()
            .find(|r| r.order_id == order_id && r.idempotency_key.as_deref() == Some(key))
            .cloned()
    }

    /// All returns of an order, oldest first
    pub async fn returns_for_order(&self, order_id: Uuid) -> Vec<ReturnRecord> {
        let records = self.records.read().await;
        let mut returns: Vec<ReturnRecord> = records
            .values()
            .filter(|r| r.order_id == order_id)
            .cloned()
            .collect();
        returns.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        returns
    }

    /// Sum of completed refunds for an order
    pub async fn total_refunded(&self, order_id: Uuid) -> Decimal {
        let records = self.records.read().await;
        completed_total(&records, order_id)
    }

    /// Move a return to a new status
    ///
    /// Completing a return re-checks, under the same write lock, that the
    /// order's completed refunds stay within the final amount the return
    /// was allocated against.
    pub async fn update_status(&self, return_id: Uuid, status: ReturnStatus) -> LedgerResult<ReturnRecord> {
        let mut records = self.records.write().await;

        let (current, order_id, total_refund, order_total) = {
            let record = records
                .get(&return_id)
                .ok_or(LedgerError::ReturnNotFound(return_id))?;
            (record.status, record.order_id, record.total_refund, record.order_final_amount)
        };

        ReturnStatusMachine::transition(current, status)
            .map_err(|_| LedgerError::InvalidTransition { from: current, to: status })?;

        if current == status {
            return records
                .get(&return_id)
                .cloned()
                .ok_or(LedgerError::ReturnNotFound(return_id));
        }

        if status == ReturnStatus::Completed {
            let would_total = completed_total(&records, order_id) + total_refund;
            if would_total > order_total {
                tracing::warn!(
                    return_id = %return_id,
                    order_id = %order_id,
                    would_total = %would_total,
                    order_total = %order_total,
                    "Refusing to complete return above the order total"
                );
                return Err(LedgerError::ExceedsOrderTotal {
                    return_id,
                    would_total,
                    order_total,
                });
            }
        }

        let record = records
            .get_mut(&return_id)
            .ok_or(LedgerError::ReturnNotFound(return_id))?;
        record.status = status;
        record.updated_at = Utc::now();

        tracing::info!(
            return_id = %return_id,
            from = %current,
            to = %status,
            "Return status updated"
        );

        Ok(record.clone())
    }
}

fn completed_total(records: &HashMap<Uuid, ReturnRecord>, order_id: Uuid) -> Decimal {
    records
        .values()
        .filter(|r| r.order_id == order_id && r.status == ReturnStatus::Completed)
        .map(|r| r.total_refund)
        .sum()
}
