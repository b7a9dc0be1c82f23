//! Transaction types and validation

pub mod types;
pub mod validation;

pub use types::{Transaction, MAX_TRANSACTION_SIZE};
