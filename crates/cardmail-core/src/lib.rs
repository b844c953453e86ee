//! Core library for card transaction extraction from issuer emails.
//!
//! This crate provides:
//! - Email decoding (raw `.eml` or structured JSON input)
//! - Statement summary and issuer classification
//! - Rule-based merchant, date and amount extraction for Japanese card notices
//! - Confidence scoring and transaction assembly

pub mod email;
pub mod error;
pub mod models;

pub use email::{EmailExtractor, ExtractionOutcome, ExtractionReport, TransactionExtractor};
pub use error::{CardmailError, ExtractionError, Result};
pub use models::config::{ExtractionConfig, IssuerProfile, ScoringConfig};
pub use models::email::RawEmail;
pub use models::transaction::{
    Amount, CardDetails, ExtractionField, OccurredAt, Specificity, Transaction, Wallet,
};
pub use email::rules::Classification;
