//! Occurrence date extraction.
//!
//! Notices often print a billing month or payment due date next to the
//! usage date. Tokens introduced by a billing label are never returned.

use chrono::{NaiveDate, NaiveTime};
use regex::Captures;

use crate::models::transaction::{ExtractionField, OccurredAt, Specificity};

use super::normalize::normalize_digits;
use super::patterns::{
    label_context, line_of, merchant_lines, AMOUNT_ISO, AMOUNT_LABEL, AMOUNT_SYMBOL, AMOUNT_UNIT,
    BILLING_CONTEXT, DATE_TOKEN, USAGE_DATE_LABEL,
};
use super::{FieldExtractor, FieldMatch};

/// Ranking of a date candidate; lower is better.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum DateRank {
    Labeled,
    NearLineItem,
    Other,
}

/// Date field extractor.
pub struct DateExtractor;

impl DateExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DateExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor for DateExtractor {
    type Output = OccurredAt;

    fn extract(&self, text: &str) -> ExtractionField<OccurredAt> {
        self.extract_all(text)
            .into_iter()
            .next()
            .map(FieldMatch::into_field)
            .unwrap_or(ExtractionField::Absent)
    }

    fn extract_all(&self, text: &str) -> Vec<FieldMatch<OccurredAt>> {
        let anchors = line_item_lines(text);
        let mut ranked = Vec::new();

        for caps in DATE_TOKEN.captures_iter(text) {
            let Some(full) = caps.get(0) else {
                continue;
            };
            if preceded_by_digit(text, full.start()) {
                continue;
            }
            let Some(occurred_at) = parse_occurrence(&caps) else {
                continue;
            };

            let context = label_context(text, full.start());
            if BILLING_CONTEXT.is_match(context) {
                continue;
            }

            let line = line_of(text, full.start());
            let rank = if USAGE_DATE_LABEL.is_match(context) {
                DateRank::Labeled
            } else if anchors.iter().any(|&anchor| anchor.abs_diff(line) <= 1) {
                DateRank::NearLineItem
            } else {
                DateRank::Other
            };
            let specificity = if rank == DateRank::Labeled {
                Specificity::IssuerSpecific
            } else {
                Specificity::Generic
            };

            ranked.push((
                rank,
                FieldMatch::new(occurred_at, specificity, full.as_str())
                    .with_position(full.start(), full.end())
                    .with_line(line),
            ));
        }

        // Stable: text order is kept within a rank.
        ranked.sort_by_key(|(rank, _)| *rank);
        ranked.into_iter().map(|(_, m)| m).collect()
    }
}

/// Extract the transaction occurrence date from a normalized body.
pub fn extract_date(body: &str) -> ExtractionField<OccurredAt> {
    DateExtractor::new().extract(body)
}

fn parse_occurrence(caps: &Captures) -> Option<OccurredAt> {
    let number = |idx: usize| -> Option<u32> {
        caps.get(idx)
            .and_then(|m| normalize_digits(m.as_str()).parse().ok())
    };

    let year = number(1)? as i32;
    let date = NaiveDate::from_ymd_opt(year, number(2)?, number(3)?)?;

    let time = match (number(4), number(5)) {
        (Some(hour), Some(minute)) => NaiveTime::from_hms_opt(hour, minute, 0),
        _ => None,
    };

    Some(match time {
        Some(time) => OccurredAt::DateTime(date.and_time(time)),
        None => OccurredAt::Date(date),
    })
}

fn preceded_by_digit(text: &str, pos: usize) -> bool {
    text[..pos]
        .chars()
        .next_back()
        .is_some_and(|c| c.is_ascii_digit() || ('０'..='９').contains(&c))
}

/// Lines carrying the merchant label or an amount.
fn line_item_lines(text: &str) -> Vec<usize> {
    let mut lines = merchant_lines(text);
    lines.extend(text.lines().enumerate().filter_map(|(i, line)| {
        let has_amount = AMOUNT_LABEL.is_match(line)
            || AMOUNT_UNIT.is_match(line)
            || AMOUNT_SYMBOL.is_match(line)
            || AMOUNT_ISO.is_match(line);
        has_amount.then_some(i)
    }));
    lines
}
