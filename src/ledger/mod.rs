pub mod error;
pub mod models;
pub mod status_machine;
pub mod store;

pub use error::{LedgerError, LedgerResult};
pub use models::*;
pub use status_machine::ReturnStatusMachine;
pub use store::RefundLedger;
