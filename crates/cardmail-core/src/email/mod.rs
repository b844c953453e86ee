//! Transaction extraction module.

mod parser;
pub mod rules;

pub use parser::{ExtractionOutcome, ExtractionReport, TransactionExtractor};

use crate::error::ExtractionError;
use crate::models::email::RawEmail;
use crate::models::transaction::Transaction;

/// Result type for extraction operations.
pub type Result<T> = std::result::Result<T, ExtractionError>;

/// Trait for notification email extractors.
pub trait EmailExtractor {
    /// Extract a single transaction, `Ok(None)` when the email carries none.
    fn extract_transaction(&self, email: &RawEmail) -> Result<Option<Transaction>>;

    /// Whether the email is a billing-period summary rather than one charge.
    fn looks_like_statement(&self, email: &RawEmail) -> bool;
}
