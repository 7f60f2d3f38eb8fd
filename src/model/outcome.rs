use crate::model::Product;
use thiserror::Error;

/// Why a candidate URL did not produce a product record
///
/// Neither variant is fatal to a run. The URL is left out of the checkpoint
/// so the next run retries it.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExtractionFailure {
    /// The page could not be fetched at all
    #[error("fetch failed after {attempts} attempt(s): {last_error}")]
    FetchFailed { attempts: u32, last_error: String },

    /// Name, price and images were all missing
    #[error("no product data found (name, price and images all empty)")]
    NotAProduct,
}

/// Terminal result for one candidate URL
pub type Outcome = std::result::Result<Product, ExtractionFailure>;
