//! Email classification: per-transaction notice, statement summary or noise.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::config::{ExtractionConfig, IssuerProfile, StatementConfig};
use crate::models::email::RawEmail;

use super::normalize::{normalize, truncate_chars};
use super::patterns::{AMOUNT_ISO, AMOUNT_SYMBOL, AMOUNT_UNIT, BILLING_CONTEXT, DATE_TOKEN};

/// Kind of email, decided before any field extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    /// Single-charge notice; proceeds to field extraction.
    Transactional,
    /// Aggregates many charges over a billing period.
    StatementSummary,
    /// Not from a known issuer.
    Irrelevant,
}

impl Classification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Transactional => "transactional",
            Self::StatementSummary => "statement_summary",
            Self::Irrelevant => "irrelevant",
        }
    }
}

/// Find the issuer profile for an email: sender domain first, subject second.
pub fn identify_issuer<'a>(
    email: &RawEmail,
    config: &'a ExtractionConfig,
) -> Option<&'a IssuerProfile> {
    if let Some(domain) = email.sender_domain() {
        if let Some(issuer) = config.issuers.iter().find(|i| i.owns_domain(&domain)) {
            return Some(issuer);
        }
    }

    let subject = normalize(&email.subject);
    config.issuers.iter().find(|issuer| {
        issuer
            .subject_keywords
            .iter()
            .any(|keyword| !keyword.is_empty() && subject.contains(&normalize(keyword)))
    })
}

/// Classify an email.
pub fn classify(email: &RawEmail, config: &ExtractionConfig) -> Classification {
    let subject = normalize(&email.subject);
    let body = normalize(truncate_chars(&email.body, config.max_body_chars));
    classify_normalized(email, &subject, &body, config)
}

/// Classify with subject and body already normalized.
pub(crate) fn classify_normalized(
    email: &RawEmail,
    subject: &str,
    body: &str,
    config: &ExtractionConfig,
) -> Classification {
    let Some(issuer) = identify_issuer(email, config) else {
        debug!(sender = %email.sender, "no issuer profile matches");
        return Classification::Irrelevant;
    };

    if is_statement(subject, body, &config.statement) {
        debug!(issuer = %issuer.id, "statement summary");
        Classification::StatementSummary
    } else {
        Classification::Transactional
    }
}

fn is_statement(subject: &str, body: &str, config: &StatementConfig) -> bool {
    if let Some(keyword) = config
        .subject_keywords
        .iter()
        .find(|k| !k.is_empty() && subject.contains(&normalize(k)))
    {
        debug!(keyword = %keyword, "statement subject keyword");
        return true;
    }

    // Billing and payment rows are not charges.
    let amount_lines: Vec<&str> = body
        .lines()
        .filter(|line| has_amount(line) && !BILLING_CONTEXT.is_match(line))
        .collect();

    let rows: HashSet<&str> = amount_lines
        .iter()
        .copied()
        .filter(|line| DATE_TOKEN.is_match(line))
        .collect();
    if config.min_line_items > 0 && rows.len() >= config.min_line_items {
        debug!(rows = rows.len(), "statement line items");
        return true;
    }

    let markers: Vec<String> = config
        .total_markers
        .iter()
        .filter(|m| !m.is_empty())
        .map(|m| m.to_lowercase())
        .collect();
    let is_total = |line: &str| {
        let line = line.to_lowercase();
        markers.iter().any(|m| line.contains(m.as_str()))
    };

    if body.lines().any(|line| is_total(line)) {
        let others = amount_lines.iter().filter(|&&line| !is_total(line)).count();
        if others >= 2 {
            debug!(others, "statement total line");
            return true;
        }
    }

    false
}

fn has_amount(line: &str) -> bool {
    AMOUNT_SYMBOL.is_match(line) || AMOUNT_UNIT.is_match(line) || AMOUNT_ISO.is_match(line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn email(subject: &str, sender: &str, body: &str) -> RawEmail {
        RawEmail::new(subject, sender, body, "msg-1")
    }

    #[test]
    fn test_identify_issuer_by_domain() {
        let config = ExtractionConfig::default();
        let mail = email("ご利用のお知らせ", "info@mail.vpass.ne.jp", "");
        assert_eq!(identify_issuer(&mail, &config).map(|i| i.id.as_str()), Some("smbc"));

        let mail = email("", "Rakuten <info@mail.rakuten-card.co.jp>", "");
        assert_eq!(
            identify_issuer(&mail, &config).map(|i| i.id.as_str()),
            Some("rakuten")
        );
    }

    #[test]
    fn test_identify_issuer_by_subject() {
        let config = ExtractionConfig::default();
        let mail = email("【エポスカード】ご利用のお知らせ", "forward@example.com", "");
        assert_eq!(identify_issuer(&mail, &config).map(|i| i.id.as_str()), Some("epos"));
    }

    #[test]
    fn test_domain_beats_subject() {
        let config = ExtractionConfig::default();
        let mail = email("楽天カードのご案内", "info@eposcard.co.jp", "");
        assert_eq!(identify_issuer(&mail, &config).map(|i| i.id.as_str()), Some("epos"));
    }

    #[test]
    fn test_unknown_sender_is_irrelevant() {
        let config = ExtractionConfig::default();
        let mail = email("セール開催中", "news@shop.example.com", "¥1,000 OFF");
        assert_eq!(classify(&mail, &config), Classification::Irrelevant);
    }

    #[test]
    fn test_single_notice_is_transactional() {
        let config = ExtractionConfig::default();
        let body = "■利用日: 2025/07/29\n■利用先: APPLE COM BILL\n■利用金額: 3,300 円";
        let mail = email("ご利用のお知らせ", "info@vpass.ne.jp", body);
        assert_eq!(classify(&mail, &config), Classification::Transactional);
    }

    #[test]
    fn test_statement_subject() {
        let config = ExtractionConfig::default();
        let mail = email("【三井住友カード】ご請求金額確定のお知らせ", "info@vpass.ne.jp", "");
        assert_eq!(classify(&mail, &config), Classification::StatementSummary);
    }

    #[test]
    fn test_statement_line_items() {
        let config = ExtractionConfig::default();
        let body = "2025/08/01 AMAZON 1,200円\n2025/08/03 STARBUCKS 650円\n";
        let mail = email("お知らせ", "info@nicos.co.jp", body);
        assert_eq!(classify(&mail, &config), Classification::StatementSummary);
    }

    #[test]
    fn test_statement_total_line() {
        let config = ExtractionConfig::default();
        let body = "ご利用明細\nAMAZON 1,200円\nSTARBUCKS 650円\n合計 1,850円";
        let mail = email("お知らせ", "info@nicos.co.jp", body);
        assert_eq!(classify(&mail, &config), Classification::StatementSummary);

        // a total marker alone does not make a statement
        let body = "ご利用先: SHOP\nご利用金額: 1,200円\n合計ポイント 12pt";
        let mail = email("お知らせ", "info@nicos.co.jp", body);
        assert_eq!(classify(&mail, &config), Classification::Transactional);
    }

    #[test]
    fn test_billing_row_is_not_a_line_item() {
        let config = ExtractionConfig::default();
        let body = "■利用日: 2025/08/02 ■利用金額: 980円\n■利用先: SHOP\nお支払日: 2025/09/10 お支払金額: 980円";
        let mail = email("ご利用のお知らせ", "info@vpass.ne.jp", body);
        assert_eq!(classify(&mail, &config), Classification::Transactional);

        // billing total next to real rows still reads as a statement
        let body = "ご請求金額合計 1,850円\n2025/08/01 AMAZON 1,200円\n2025/08/03 STARBUCKS 650円";
        let mail = email("お知らせ", "info@vpass.ne.jp", body);
        assert_eq!(classify(&mail, &config), Classification::StatementSummary);
    }
}
