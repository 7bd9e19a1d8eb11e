pub mod allocator;
pub mod handlers;
pub mod models;
pub mod service;

pub use allocator::*;
pub use handlers::*;
pub use models::*;
pub use service::*;
