//! Utility types and functions.
//!
//! - [`Error`] / [`Result`] - Error handling
//! - Affine helpers and math re-exports from glam

mod error;
mod math;

pub use error::*;
pub use math::*;
