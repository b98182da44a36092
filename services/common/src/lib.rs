//! Common primitive types and constants shared across services

pub mod constants;
pub mod types;

pub use types::{Px, Ts};
