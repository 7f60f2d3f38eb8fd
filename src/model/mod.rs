//! Data model for extracted catalog records
//!
//! - `Product`: the flat, CSV-compatible record produced for each product page
//! - `ExtractionFailure`: why a candidate URL produced no record

mod outcome;
mod product;

pub use outcome::{ExtractionFailure, Outcome};
pub use product::{Product, SHORT_DESCRIPTION_LIMIT};
