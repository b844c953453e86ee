//! Transaction records produced by the extraction pipeline.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// How tightly a matched pattern is tied to a known issuer format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Specificity {
    /// Pattern tailored to a known issuer layout.
    IssuerSpecific,
    /// Loose fallback shared by all issuers.
    Generic,
}

impl Specificity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::IssuerSpecific => "issuer_specific",
            Self::Generic => "generic",
        }
    }
}

/// Result of a single field extractor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExtractionField<T> {
    Present {
        value: T,
        specificity: Specificity,
        /// 0-based line index in the normalized body.
        line: usize,
    },
    Absent,
}

impl<T> ExtractionField<T> {
    pub fn present(value: T, specificity: Specificity, line: usize) -> Self {
        Self::Present {
            value,
            specificity,
            line,
        }
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Self::Present { value, .. } => Some(value),
            Self::Absent => None,
        }
    }

    pub fn specificity(&self) -> Option<Specificity> {
        match self {
            Self::Present { specificity, .. } => Some(*specificity),
            Self::Absent => None,
        }
    }

    pub fn line(&self) -> Option<usize> {
        match self {
            Self::Present { line, .. } => Some(*line),
            Self::Absent => None,
        }
    }

    pub fn is_present(&self) -> bool {
        matches!(self, Self::Present { .. })
    }

    pub fn is_issuer_specific(&self) -> bool {
        self.specificity() == Some(Specificity::IssuerSpecific)
    }

    pub fn into_value(self) -> Option<T> {
        match self {
            Self::Present { value, .. } => Some(value),
            Self::Absent => None,
        }
    }
}

/// When a transaction happened. Issuers include the time only sometimes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OccurredAt {
    DateTime(NaiveDateTime),
    Date(NaiveDate),
}

impl OccurredAt {
    pub fn date(&self) -> NaiveDate {
        match self {
            Self::DateTime(dt) => dt.date(),
            Self::Date(d) => *d,
        }
    }

    pub fn time(&self) -> Option<NaiveTime> {
        match self {
            Self::DateTime(dt) => Some(dt.time()),
            Self::Date(_) => None,
        }
    }
}

impl std::fmt::Display for OccurredAt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%dT%H:%M")),
            Self::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
        }
    }
}

/// A monetary amount as printed in the email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Amount {
    pub value: Decimal,

    /// ISO code implied by the symbol or unit next to the digits.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
}

/// Mobile wallet the card was used through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Wallet {
    ApplePay,
    GooglePay,
}

impl Wallet {
    pub fn label(&self) -> &'static str {
        match self {
            Self::ApplePay => "APPLE_PAY",
            Self::GooglePay => "GOOGLE_PAY",
        }
    }
}

/// Card and payment-instrument hints found in a notification body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub card_last4: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_last4: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub wallet: Option<Wallet>,

    /// Contactless brand such as `iD` or `QUICPay`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_hint: Option<String>,

    /// Card without a printed number, identified only by issuer.
    #[serde(default)]
    pub numberless: bool,
}

impl CardDetails {
    /// Display label for the payment instrument.
    pub fn label(&self, issuer_name: Option<&str>) -> Option<String> {
        if let Some(last4) = &self.card_last4 {
            return Some(match issuer_name {
                Some(name) => format!("{} ****{}", name, last4),
                None => format!("****{}", last4),
            });
        }

        if let Some(token) = &self.token_last4 {
            return Some(match self.wallet {
                Some(wallet) => format!("{}:{}", wallet.label(), token),
                None => token.clone(),
            });
        }

        if self.numberless {
            if let Some(name) = issuer_name {
                return Some(format!("{}ナンバーレス", name));
            }
        }

        if let Some(wallet) = self.wallet {
            return Some(wallet.label().to_string());
        }

        if let Some(hint) = &self.product_hint {
            return Some(hint.clone());
        }

        issuer_name.map(str::to_string)
    }
}

/// One card transaction extracted from a notification email.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Positive amount in currency units.
    pub amount: Decimal,

    /// ISO currency code.
    pub currency: String,

    pub occurred_at: OccurredAt,

    /// Merchant text exactly as captured, trimmed.
    pub merchant_raw: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub merchant_normalized: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub card_label: Option<String>,

    /// Carried through from the source email.
    pub message_id: String,

    pub is_subscription: bool,

    /// Trust in the extraction (0.0 - 1.0).
    pub confidence: f32,

    /// Assigned downstream, never by the extractor.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    /// Issuer profile id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub card_last4: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_last4: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub wallet: Option<Wallet>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_hint: Option<String>,
}

impl Transaction {
    /// Check record invariants, returning a list of violations.
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if self.amount <= Decimal::ZERO {
            issues.push(format!("amount must be positive, got {}", self.amount));
        }
        if !(0.0..=1.0).contains(&self.confidence) {
            issues.push(format!("confidence out of range: {}", self.confidence));
        }
        if self.message_id.trim().is_empty() {
            issues.push("message_id is empty".to_string());
        }
        if self.merchant_raw.trim().is_empty() {
            issues.push("merchant_raw is empty".to_string());
        }

        issues
    }
}
