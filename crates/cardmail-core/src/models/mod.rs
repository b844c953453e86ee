//! Data models for emails, transactions and configuration.

pub mod config;
pub mod email;
pub mod transaction;

pub use config::{ExtractionConfig, IssuerProfile, ScoringConfig, StatementConfig, SubscriptionConfig};
pub use email::RawEmail;
pub use transaction::{
    Amount, CardDetails, ExtractionField, OccurredAt, Specificity, Transaction, Wallet,
};
