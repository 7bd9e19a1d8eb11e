use crate::ledger::ReturnStatus;

/// Service for managing return status transitions
pub struct ReturnStatusMachine;

impl ReturnStatusMachine {
    /// Check if a status transition is valid
    ///
    /// # Valid Transitions
    /// - Pending → Completed, Failed
    /// - Completed, Failed → (terminal)
    /// - Any status → Same status (idempotent)
    pub fn is_valid_transition(from: ReturnStatus, to: ReturnStatus) -> bool {
        if from == to {
            return true;
        }

        matches!(
            (from, to),
            (ReturnStatus::Pending, ReturnStatus::Completed)
                | (ReturnStatus::Pending, ReturnStatus::Failed)
        )
    }

    /// Attempt to transition from one status to another
    ///
    /// # Returns
    /// `Ok(to)` if the transition is valid, `Err(message)` otherwise
    pub fn transition(from: ReturnStatus, to: ReturnStatus) -> Result<ReturnStatus, String> {
        if Self::is_valid_transition(from, to) {
            Ok(to)
        } else {
            Err(format!("Invalid return status transition from {} to {}", from, to))
        }
    }
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    fn return_status_strategy() -> impl Strategy<Value = ReturnStatus> {
        prop_oneof![
            Just(ReturnStatus::Pending),
            Just(ReturnStatus::Completed),
            Just(ReturnStatus::Failed),
        ]
    }

    /// Same status transitions are always valid (idempotent)
    #[test]
    fn prop_same_status_is_valid() {
        proptest!(|(status in return_status_strategy())| {
            prop_assert!(ReturnStatusMachine::is_valid_transition(status, status));
        });
    }

    /// Terminal statuses never move
    #[test]
    fn prop_terminal_statuses_are_final() {
        proptest!(|(
            from in return_status_strategy(),
            to in return_status_strategy()
        )| {
            if from.is_terminal() && from != to {
                prop_assert!(!ReturnStatusMachine::is_valid_transition(from, to));
            }
        });
    }

    /// transition() and is_valid_transition() agree
    #[test]
    fn prop_transition_consistency() {
        proptest!(|(
            from in return_status_strategy(),
            to in return_status_strategy()
        )| {
            let is_valid = ReturnStatusMachine::is_valid_transition(from, to);
            let result = ReturnStatusMachine::transition(from, to);
            prop_assert_eq!(is_valid, result.is_ok());
        });
    }
}
