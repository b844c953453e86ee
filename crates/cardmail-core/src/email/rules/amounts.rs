//! Amount extraction.

use std::str::FromStr;

use regex::{Captures, Regex};
use rust_decimal::Decimal;
use tracing::trace;

use crate::models::transaction::{Amount, ExtractionField, Specificity};

use super::normalize::normalize_digits;
use super::patterns::{
    label_context, line_of, merchant_lines, AMOUNT_ISO, AMOUNT_LABEL, AMOUNT_SYMBOL, AMOUNT_UNIT,
    BILLING_CONTEXT, YEAR_PREFIX,
};
use super::{FieldExtractor, FieldMatch};

/// Where the currency marker sits relative to the digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MarkerPosition {
    /// `(marker)(digits)(cents)`
    Prefix,
    /// `(digits)(cents)(marker)`
    Suffix,
}

/// One entry of the amount cascade.
struct AmountRule {
    name: &'static str,
    pattern: &'static Regex,
    marker: MarkerPosition,
}

fn amount_rules() -> [AmountRule; 3] {
    [
        AmountRule {
            name: "symbol",
            pattern: &AMOUNT_SYMBOL,
            marker: MarkerPosition::Prefix,
        },
        AmountRule {
            name: "unit",
            pattern: &AMOUNT_UNIT,
            marker: MarkerPosition::Suffix,
        },
        AmountRule {
            name: "iso",
            pattern: &AMOUNT_ISO,
            marker: MarkerPosition::Suffix,
        },
    ]
}

/// A candidate before selection.
struct Candidate {
    priority: usize,
    start: usize,
    end: usize,
    line: usize,
    amount: Amount,
    labeled: bool,
    billing: bool,
    source: String,
}

impl Candidate {
    fn into_match(self, specificity: Specificity) -> FieldMatch<Amount> {
        FieldMatch::new(self.amount, specificity, self.source)
            .with_position(self.start, self.end)
            .with_line(self.line)
    }
}

/// Amount field extractor.
pub struct AmountExtractor;

impl AmountExtractor {
    pub fn new() -> Self {
        Self
    }

    /// All surviving candidates ordered by cascade priority, then position.
    fn candidates(&self, text: &str) -> Vec<Candidate> {
        let mut results: Vec<Candidate> = Vec::new();

        for (priority, rule) in amount_rules().iter().enumerate() {
            for caps in rule.pattern.captures_iter(text) {
                let Some(candidate) = build_candidate(text, &caps, rule, priority) else {
                    continue;
                };
                // A higher-priority alternative already claimed these digits.
                if results
                    .iter()
                    .any(|kept| candidate.start < kept.end && kept.start < candidate.end)
                {
                    continue;
                }
                results.push(candidate);
            }
        }

        results.sort_by_key(|c| (c.priority, c.start));
        trace!(
            candidates = ?results.iter().map(|c| c.source.as_str()).collect::<Vec<_>>(),
            "amount candidates"
        );
        results
    }
}

impl Default for AmountExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor for AmountExtractor {
    type Output = Amount;

    fn extract(&self, text: &str) -> ExtractionField<Amount> {
        let mut candidates = self.candidates(text);

        if candidates.iter().any(|c| !c.billing) {
            candidates.retain(|c| !c.billing);
        }

        if let Some(idx) = candidates.iter().position(|c| c.labeled) {
            let winner = candidates.swap_remove(idx);
            return winner
                .into_match(Specificity::IssuerSpecific)
                .into_field();
        }

        let anchors = merchant_lines(text);
        let winner = if anchors.is_empty() {
            candidates.into_iter().next()
        } else {
            candidates.into_iter().min_by_key(|c| {
                let distance = anchors
                    .iter()
                    .map(|&anchor| anchor.abs_diff(c.line))
                    .min()
                    .unwrap_or(usize::MAX);
                (distance, c.priority, c.start)
            })
        };

        winner
            .map(|c| c.into_match(Specificity::Generic).into_field())
            .unwrap_or(ExtractionField::Absent)
    }

    fn extract_all(&self, text: &str) -> Vec<FieldMatch<Amount>> {
        self.candidates(text)
            .into_iter()
            .map(|c| {
                let specificity = if c.labeled {
                    Specificity::IssuerSpecific
                } else {
                    Specificity::Generic
                };
                c.into_match(specificity)
            })
            .collect()
    }
}

/// Extract the transaction amount from a normalized body.
pub fn extract_amount(body: &str) -> ExtractionField<Amount> {
    AmountExtractor::new().extract(body)
}

/// Parse a digit run such as `3,300`, `３，３００` or `12.50`.
pub fn parse_amount(s: &str) -> Option<Decimal> {
    let cleaned: String = normalize_digits(s)
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();

    if cleaned.is_empty() || cleaned.starts_with('.') || cleaned.matches('.').count() > 1 {
        return None;
    }
    Decimal::from_str(&cleaned).ok()
}

fn currency_code(marker: &str) -> Option<&'static str> {
    match marker {
        "¥" | "￥" | "円" => Some("JPY"),
        "$" | "＄" | "ドル" => Some("USD"),
        "ユーロ" => Some("EUR"),
        "JPY" => Some("JPY"),
        "USD" => Some("USD"),
        "EUR" => Some("EUR"),
        "GBP" => Some("GBP"),
        _ => None,
    }
}

fn build_candidate(
    text: &str,
    caps: &Captures,
    rule: &AmountRule,
    priority: usize,
) -> Option<Candidate> {
    let (marker, digits, cents) = match rule.marker {
        MarkerPosition::Prefix => (caps.get(1)?, caps.get(2)?, caps.get(3)),
        MarkerPosition::Suffix => (caps.get(3)?, caps.get(1)?, caps.get(2)),
    };
    let digits_end = cents.map_or(digits.end(), |c| c.end());

    if glued_before(text, digits.start()) || glued_after(text, digits_end) {
        return None;
    }
    if is_year_shaped(text, digits.as_str(), digits_end) {
        trace!(rule = rule.name, digits = digits.as_str(), "excluded year-shaped run");
        return None;
    }

    let number = match cents {
        Some(c) => format!("{}.{}", digits.as_str(), c.as_str()),
        None => digits.as_str().to_string(),
    };
    let value = parse_amount(&number)?;
    if value <= Decimal::ZERO {
        return None;
    }

    let (start, end) = match rule.marker {
        MarkerPosition::Prefix => (marker.start(), digits_end),
        MarkerPosition::Suffix => (digits.start(), marker.end()),
    };
    let context = label_context(text, start);

    Some(Candidate {
        priority,
        start,
        end,
        line: line_of(text, start),
        amount: Amount {
            value,
            currency: currency_code(marker.as_str()).map(str::to_string),
        },
        labeled: AMOUNT_LABEL.is_match(context),
        billing: BILLING_CONTEXT.is_match(context),
        source: text[start..end].to_string(),
    })
}

fn is_digit(c: char) -> bool {
    c.is_ascii_digit() || ('０'..='９').contains(&c)
}

/// The run continues a longer number to its left.
fn glued_before(text: &str, pos: usize) -> bool {
    text[..pos]
        .chars()
        .next_back()
        .is_some_and(|c| is_digit(c) || matches!(c, ',' | '，' | '.' | '．'))
}

/// The run continues into more digits, e.g. a year with no separator.
fn glued_after(text: &str, pos: usize) -> bool {
    let rest = &text[pos..];
    if YEAR_PREFIX.is_match(rest) {
        return true;
    }
    rest.chars().next().is_some_and(is_digit)
}

/// A run of more than four digits ending in `20xx` followed by a date separator.
fn is_year_shaped(text: &str, digits: &str, digits_end: usize) -> bool {
    let digits = normalize_digits(digits).replace(',', "");
    if digits.len() <= 4 {
        return false;
    }
    let tail = &digits[digits.len() - 4..];
    if !tail.starts_with("20") {
        return false;
    }
    text[digits_end..]
        .chars()
        .next()
        .is_some_and(|c| matches!(c, '/' | '／' | '-' | '.' | '．' | '年'))
}
