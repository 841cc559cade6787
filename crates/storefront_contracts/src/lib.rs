#![forbid(unsafe_code)]

pub mod cart;
pub mod checkout;
pub mod common;
pub mod session;

pub use common::{ContractViolation, ReasonCodeId, SchemaVersion, Validate};
