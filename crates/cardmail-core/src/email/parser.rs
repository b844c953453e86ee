//! Extraction pipeline: classify, extract fields, score, assemble.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace};

use crate::models::config::{ExtractionConfig, IssuerProfile, ScoringConfig};
use crate::models::email::RawEmail;
use crate::models::transaction::{Amount, CardDetails, ExtractionField, OccurredAt, Transaction};

use super::rules::classifier::classify_normalized;
use super::rules::normalize::truncate_chars;
use super::rules::{
    classify, detect_subscription, extract_card, identify_issuer, normalize, normalize_merchant,
    score, AmountExtractor, Classification, DateExtractor, FieldExtractor, MerchantExtractor,
};
use super::{EmailExtractor, Result};

/// Terminal state of one extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExtractionOutcome {
    /// Not from a known issuer.
    Irrelevant,
    /// Billing-period summary; never turned into a transaction.
    Statement,
    /// A required field could not be resolved.
    NoMatch { missing: Vec<String> },
    Matched(Transaction),
}

impl ExtractionOutcome {
    /// Short status name used in reports and summaries.
    pub fn status(&self) -> &'static str {
        match self {
            Self::Irrelevant => "irrelevant",
            Self::Statement => "statement",
            Self::NoMatch { .. } => "no_match",
            Self::Matched(_) => "matched",
        }
    }

    pub fn transaction(&self) -> Option<&Transaction> {
        match self {
            Self::Matched(tx) => Some(tx),
            _ => None,
        }
    }

    pub fn into_transaction(self) -> Option<Transaction> {
        match self {
            Self::Matched(tx) => Some(tx),
            _ => None,
        }
    }
}

/// Everything the pipeline decided about one email.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionReport {
    pub message_id: String,
    pub classification: Classification,
    /// Issuer profile id.
    pub issuer: Option<String>,
    pub merchant: ExtractionField<String>,
    pub occurred_at: ExtractionField<OccurredAt>,
    pub amount: ExtractionField<Amount>,
    pub card: CardDetails,
    pub is_subscription: bool,
    /// Confidence before the subscription bonus.
    pub score: Option<f32>,
    pub outcome: ExtractionOutcome,
}

impl ExtractionReport {
    fn new(
        message_id: &str,
        classification: Classification,
        issuer: Option<&IssuerProfile>,
    ) -> Self {
        Self {
            message_id: message_id.to_string(),
            classification,
            issuer: issuer.map(|i| i.id.clone()),
            merchant: ExtractionField::Absent,
            occurred_at: ExtractionField::Absent,
            amount: ExtractionField::Absent,
            card: CardDetails::default(),
            is_subscription: false,
            score: None,
            outcome: match classification {
                Classification::Irrelevant => ExtractionOutcome::Irrelevant,
                Classification::StatementSummary => ExtractionOutcome::Statement,
                Classification::Transactional => ExtractionOutcome::NoMatch {
                    missing: Vec::new(),
                },
            },
        }
    }
}

/// Issuer and card context carried into the transaction record.
struct Context<'a> {
    issuer: Option<&'a IssuerProfile>,
    card: &'a CardDetails,
    sender_domain: Option<String>,
}

/// Rule-based transaction extractor.
///
/// Holds only immutable configuration, so one instance can be shared
/// across threads.
#[derive(Debug, Clone, Default)]
pub struct TransactionExtractor {
    config: ExtractionConfig,
}

impl TransactionExtractor {
    /// Create an extractor with the given configuration.
    pub fn new(config: ExtractionConfig) -> Self {
        Self { config }
    }

    /// Set the confidence weights.
    pub fn with_scoring(mut self, scoring: ScoringConfig) -> Self {
        self.config.scoring = scoring;
        self
    }

    /// Set the number of body characters considered.
    pub fn with_max_body_chars(mut self, max_body_chars: usize) -> Self {
        self.config.max_body_chars = max_body_chars;
        self
    }

    /// Set the fallback currency.
    pub fn with_default_currency(mut self, currency: impl Into<String>) -> Self {
        self.config.default_currency = currency.into();
        self
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// Classify an email without extracting fields.
    pub fn classify(&self, email: &RawEmail) -> Classification {
        classify(email, &self.config)
    }

    /// Run the whole pipeline and report every intermediate decision.
    pub fn explain(&self, email: &RawEmail) -> Result<ExtractionReport> {
        email.validate()?;
        info!(message_id = %email.message_id, "extracting transaction");

        let subject = normalize(&email.subject);
        let body = normalize(truncate_chars(&email.body, self.config.max_body_chars));

        let issuer = identify_issuer(email, &self.config);
        let classification = classify_normalized(email, &subject, &body, &self.config);
        debug!(
            ?classification,
            issuer = issuer.map(|i| i.id.as_str()).unwrap_or("-"),
            "classified"
        );

        let mut report = ExtractionReport::new(&email.message_id, classification, issuer);
        if classification != Classification::Transactional {
            return Ok(report);
        }

        let merchant = MerchantExtractor::new().extract(&body);
        let occurred_at = DateExtractor::new().extract(&body);
        let amount = AmountExtractor::new().extract(&body);
        debug!(
            merchant = ?merchant.value(),
            occurred_at = ?occurred_at.value(),
            amount = ?amount.value(),
            "fields extracted"
        );

        let merchant_normalized = merchant.value().map(|m| normalize_merchant(m));
        let is_subscription = detect_subscription(
            merchant_normalized.as_deref().unwrap_or_default(),
            &body,
            &self.config.subscription,
        );
        let card = extract_card(&body);
        trace!(?card, is_subscription, "card details");

        let confidence = score(&merchant, &occurred_at, &amount, &self.config.scoring);
        let context = Context {
            issuer,
            card: &card,
            sender_domain: email.sender_domain(),
        };

        let transaction = confidence.and_then(|confidence| {
            self.assemble(
                email,
                &merchant,
                &occurred_at,
                &amount,
                is_subscription,
                confidence,
                &context,
            )
        });

        report.outcome = match transaction {
            Some(tx) => {
                debug!(confidence = tx.confidence, "transaction matched");
                ExtractionOutcome::Matched(tx)
            }
            None => {
                let missing = missing_fields(&merchant, &occurred_at, &amount);
                debug!(?missing, "no match");
                ExtractionOutcome::NoMatch { missing }
            }
        };
        report.merchant = merchant;
        report.occurred_at = occurred_at;
        report.amount = amount;
        report.card = card;
        report.is_subscription = is_subscription;
        report.score = confidence;

        Ok(report)
    }

    #[allow(clippy::too_many_arguments)]
    fn assemble(
        &self,
        email: &RawEmail,
        merchant: &ExtractionField<String>,
        occurred_at: &ExtractionField<OccurredAt>,
        amount: &ExtractionField<Amount>,
        is_subscription: bool,
        confidence: f32,
        context: &Context<'_>,
    ) -> Option<Transaction> {
        let merchant_raw = merchant.value()?;
        let occurred_at = *occurred_at.value()?;
        let amount = amount.value()?;
        if amount.value <= Decimal::ZERO {
            return None;
        }

        let bonus = if is_subscription {
            self.config.scoring.subscription_bonus
        } else {
            0.0
        };
        let issuer_name = context.issuer.map(|i| i.name.as_str());

        Some(Transaction {
            amount: amount.value,
            currency: self.resolve_currency(amount, context),
            occurred_at,
            merchant_raw: merchant_raw.clone(),
            merchant_normalized: Some(normalize_merchant(merchant_raw)).filter(|m| !m.is_empty()),
            card_label: context.card.label(issuer_name),
            message_id: email.message_id.clone(),
            is_subscription,
            confidence: (confidence + bonus).clamp(0.0, 1.0),
            category: None,
            issuer: context.issuer.map(|i| i.id.clone()),
            card_last4: context.card.card_last4.clone(),
            token_last4: context.card.token_last4.clone(),
            wallet: context.card.wallet,
            product_hint: context.card.product_hint.clone(),
        })
    }

    /// Amount token, then issuer profile, then sender domain, then default.
    fn resolve_currency(&self, amount: &Amount, context: &Context<'_>) -> String {
        amount
            .currency
            .as_deref()
            .or_else(|| {
                context
                    .issuer
                    .map(|i| i.currency.as_str())
                    .filter(|c| !c.is_empty())
            })
            .or_else(|| {
                context
                    .sender_domain
                    .as_deref()
                    .and_then(|domain| self.config.currency_for_domain(domain))
            })
            .unwrap_or(self.config.default_currency.as_str())
            .to_string()
    }
}

impl EmailExtractor for TransactionExtractor {
    fn extract_transaction(&self, email: &RawEmail) -> Result<Option<Transaction>> {
        self.explain(email)
            .map(|report| report.outcome.into_transaction())
    }

    fn looks_like_statement(&self, email: &RawEmail) -> bool {
        self.classify(email) == Classification::StatementSummary
    }
}

fn missing_fields(
    merchant: &ExtractionField<String>,
    occurred_at: &ExtractionField<OccurredAt>,
    amount: &ExtractionField<Amount>,
) -> Vec<String> {
    [
        ("merchant", merchant.is_present()),
        ("occurred_at", occurred_at.is_present()),
        ("amount", amount.is_present()),
    ]
    .into_iter()
    .filter(|(_, present)| !present)
    .map(|(name, _)| name.to_string())
    .collect()
}
