#![forbid(unsafe_code)]

pub mod cart_service;
pub mod cart_session;
pub mod checkout_service;
pub mod error;
pub mod wire;

mod http;

pub use error::ClientError;
