#![forbid(unsafe_code)]

pub mod checkout;
pub mod mutation;
pub mod selection;
