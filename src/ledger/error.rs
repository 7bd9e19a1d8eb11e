// Error types for the return ledger

use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

use crate::ledger::ReturnStatus;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Return not found: {0}")]
    ReturnNotFound(Uuid),

    #[error("Invalid return status transition from {from} to {to}")]
    InvalidTransition {
        from: ReturnStatus,
        to: ReturnStatus,
    },

    /// Completing the return would refund more than the order is worth
    #[error("Completing return {return_id} would bring refunds to {would_total}, above the order total {order_total}")]
    ExceedsOrderTotal {
        return_id: Uuid,
        would_total: Decimal,
        order_total: Decimal,
    },
}

pub type LedgerResult<T> = Result<T, LedgerError>;
