//! Rule-based extractors for card notification emails.

pub mod amounts;
pub mod card;
pub mod classifier;
pub mod dates;
pub mod merchant;
pub mod normalize;
pub mod patterns;
pub mod scoring;
pub mod subscription;

pub use amounts::{extract_amount, parse_amount, AmountExtractor};
pub use card::extract_card;
pub use classifier::{classify, identify_issuer, Classification};
pub use dates::{extract_date, DateExtractor};
pub use merchant::{extract_merchant, normalize_merchant, MerchantExtractor};
pub use normalize::{normalize, normalize_digits};
pub use scoring::score;
pub use subscription::detect_subscription;

use crate::models::transaction::{ExtractionField, Specificity};

/// Trait for field extractors.
pub trait FieldExtractor {
    /// The type of value this extractor produces.
    type Output;

    /// Extract the winning value from normalized text.
    fn extract(&self, text: &str) -> ExtractionField<Self::Output>;

    /// Extract all candidates, in the order the cascade ranks them.
    fn extract_all(&self, text: &str) -> Vec<FieldMatch<Self::Output>>;
}

/// A single candidate match.
#[derive(Debug, Clone)]
pub struct FieldMatch<T> {
    /// Extracted value.
    pub value: T,
    /// Whether an issuer-specific rule produced it.
    pub specificity: Specificity,
    /// Byte range in the source text.
    pub position: Option<(usize, usize)>,
    /// 0-based line index.
    pub line: usize,
    /// Source text that was matched.
    pub source: String,
}

impl<T> FieldMatch<T> {
    pub fn new(value: T, specificity: Specificity, source: impl Into<String>) -> Self {
        Self {
            value,
            specificity,
            position: None,
            line: 0,
            source: source.into(),
        }
    }

    pub fn with_position(mut self, start: usize, end: usize) -> Self {
        self.position = Some((start, end));
        self
    }

    pub fn with_line(mut self, line: usize) -> Self {
        self.line = line;
        self
    }

    pub fn into_field(self) -> ExtractionField<T> {
        ExtractionField::present(self.value, self.specificity, self.line)
    }
}
