//! Configuration structures for the extraction pipeline.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CardmailError, Result};

/// Main configuration for the cardmail pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Known card issuers, in matching order.
    pub issuers: Vec<IssuerProfile>,

    /// Statement summary detection.
    pub statement: StatementConfig,

    /// Recurring billing detection.
    pub subscription: SubscriptionConfig,

    /// Confidence weights.
    pub scoring: ScoringConfig,

    /// Body characters considered per email.
    pub max_body_chars: usize,

    /// Currency used when nothing else decides.
    pub default_currency: String,

    /// Local currency per sender top-level domain.
    pub domain_currencies: BTreeMap<String, String>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            issuers: default_issuers(),
            statement: StatementConfig::default(),
            subscription: SubscriptionConfig::default(),
            scoring: ScoringConfig::default(),
            max_body_chars: 20_000,
            default_currency: "JPY".to_string(),
            domain_currencies: [
                ("jp", "JPY"),
                ("us", "USD"),
                ("uk", "GBP"),
                ("de", "EUR"),
                ("fr", "EUR"),
            ]
            .into_iter()
            .map(|(tld, currency)| (tld.to_string(), currency.to_string()))
            .collect(),
        }
    }
}

/// A card issuer whose notification format is known.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuerProfile {
    /// Stable identifier, e.g. `smbc`.
    pub id: String,

    /// Display name used in card labels.
    pub name: String,

    /// Sender domains; subdomains match too.
    #[serde(default)]
    pub sender_domains: Vec<String>,

    /// Subject fragments that identify the issuer.
    #[serde(default)]
    pub subject_keywords: Vec<String>,

    /// Local currency of the issuer.
    #[serde(default = "default_issuer_currency")]
    pub currency: String,
}

fn default_issuer_currency() -> String {
    "JPY".to_string()
}

impl IssuerProfile {
    fn new(id: &str, name: &str, domains: &[&str], keywords: &[&str]) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            sender_domains: domains.iter().map(|d| d.to_string()).collect(),
            subject_keywords: keywords.iter().map(|k| k.to_string()).collect(),
            currency: default_issuer_currency(),
        }
    }

    /// Whether `domain` is one of ours or a subdomain of one.
    pub fn owns_domain(&self, domain: &str) -> bool {
        self.sender_domains.iter().any(|known| {
            let known = known.to_ascii_lowercase();
            domain == known
                || domain
                    .strip_suffix(known.as_str())
                    .is_some_and(|rest| rest.ends_with('.'))
        })
    }
}

fn default_issuers() -> Vec<IssuerProfile> {
    vec![
        IssuerProfile::new(
            "smbc",
            "三井住友カード",
            &["vpass.ne.jp", "smbc-card.com"],
            &["Vpass", "Ｖｐａｓｓ", "三井住友カード"],
        ),
        IssuerProfile::new(
            "mufg",
            "MUFGカード",
            &["mufg-card.com", "nicos.co.jp", "dc-card.com"],
            &["MUFGカード", "ニコス", "DCカード"],
        ),
        IssuerProfile::new(
            "epos",
            "エポスカード",
            &["eposcard.co.jp", "01epos.jp"],
            &["エポスカード"],
        ),
        IssuerProfile::new(
            "rakuten",
            "楽天カード",
            &["rakuten-card.co.jp"],
            &["楽天カード"],
        ),
    ]
}

/// Signals that an email aggregates a billing period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatementConfig {
    /// Subject fragments used by monthly statements.
    pub subject_keywords: Vec<String>,

    /// Markers of an aggregate total line.
    pub total_markers: Vec<String>,

    /// Distinct date+amount rows that make a statement.
    pub min_line_items: usize,
}

impl Default for StatementConfig {
    fn default() -> Self {
        Self {
            subject_keywords: to_strings(&[
                "ご請求金額確定",
                "ご請求額確定",
                "ご請求金額のお知らせ",
                "ご利用明細",
                "利用明細",
                "お支払い金額のご案内",
            ]),
            total_markers: to_strings(&["合計", "総額", "total"]),
            min_line_items: 2,
        }
    }
}

/// Recurring billing vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubscriptionConfig {
    /// Merchant fragments of known recurring-billing vendors (lowercase).
    pub vendor_keywords: Vec<String>,

    /// Body phrases that announce a recurring charge.
    pub recurring_markers: Vec<String>,
}

impl Default for SubscriptionConfig {
    fn default() -> Self {
        Self {
            vendor_keywords: to_strings(&[
                "netflix",
                "spotify",
                "apple com bill",
                "apple.com/bill",
                "itunes",
                "icloud",
                "amazon prime",
                "amazonプライム",
                "youtube",
                "google one",
                "google play",
                "adobe",
                "microsoft",
                "disney",
                "hulu",
                "u-next",
                "dazn",
                "abema",
                "kindle unlimited",
                "audible",
                "openai",
                "chatgpt",
                "dropbox",
            ]),
            recurring_markers: to_strings(&[
                "定期購入",
                "継続課金",
                "自動更新",
                "月額",
                "サブスク",
                "recurring",
                "subscription",
                "monthly fee",
            ]),
        }
    }
}

/// Confidence weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Score of a complete extraction using only generic patterns.
    pub base: f32,

    /// Added per issuer-specific field.
    pub specificity_bonus: f32,

    /// Added when the charge looks recurring.
    pub subscription_bonus: f32,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            base: 0.5,
            specificity_bonus: 0.2,
            subscription_bonus: 0.05,
        }
    }
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl ExtractionConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)
            .map_err(|e| CardmailError::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| CardmailError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Check weights and identifiers for consistency.
    pub fn validate(&self) -> Result<()> {
        let scoring = &self.scoring;
        if !(0.0..=1.0).contains(&scoring.base) {
            return Err(CardmailError::Config(format!(
                "scoring.base must be within [0, 1], got {}",
                scoring.base
            )));
        }
        if scoring.specificity_bonus < 0.0 || scoring.subscription_bonus < 0.0 {
            return Err(CardmailError::Config(
                "scoring bonuses must not be negative".to_string(),
            ));
        }
        if self.max_body_chars == 0 {
            return Err(CardmailError::Config(
                "max_body_chars must be greater than zero".to_string(),
            ));
        }
        if self.default_currency.trim().is_empty() {
            return Err(CardmailError::Config(
                "default_currency must not be empty".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for issuer in &self.issuers {
            if issuer.id.trim().is_empty() {
                return Err(CardmailError::Config("issuer id must not be empty".to_string()));
            }
            if !seen.insert(issuer.id.as_str()) {
                return Err(CardmailError::Config(format!(
                    "duplicate issuer id: {}",
                    issuer.id
                )));
            }
        }

        Ok(())
    }

    /// Look up an issuer profile by id.
    pub fn issuer(&self, id: &str) -> Option<&IssuerProfile> {
        self.issuers.iter().find(|issuer| issuer.id == id)
    }

    /// Local currency for a sender domain, by top-level domain.
    pub fn currency_for_domain(&self, domain: &str) -> Option<&str> {
        let tld = domain.rsplit('.').next()?;
        self.domain_currencies.get(tld).map(String::as_str)
    }
}
