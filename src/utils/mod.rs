//! Shared helpers.

pub mod decimal;

pub use decimal::{round_to_precision, safe_div, to_f64};
