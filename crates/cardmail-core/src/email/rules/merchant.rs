//! Merchant extraction.

use lazy_static::lazy_static;
use regex::Regex;

use crate::models::transaction::{ExtractionField, Specificity};

use super::patterns::{line_of, MERCHANT_BRACKETED, MERCHANT_GENERIC, MERCHANT_MARKED};
use super::{FieldExtractor, FieldMatch};

lazy_static! {
    static ref MERCHANT_NOISE: Regex = Regex::new(r"[*#|()]").unwrap();
}

/// One entry of the merchant cascade.
pub struct MerchantRule {
    pub name: &'static str,
    pub pattern: &'static Regex,
    pub specificity: Specificity,
}

/// Merchant cascade, highest priority first.
pub fn merchant_rules() -> [MerchantRule; 3] {
    [
        MerchantRule {
            name: "bracketed",
            pattern: &MERCHANT_BRACKETED,
            specificity: Specificity::IssuerSpecific,
        },
        MerchantRule {
            name: "marked",
            pattern: &MERCHANT_MARKED,
            specificity: Specificity::IssuerSpecific,
        },
        MerchantRule {
            name: "generic",
            pattern: &MERCHANT_GENERIC,
            specificity: Specificity::Generic,
        },
    ]
}

/// Merchant field extractor.
pub struct MerchantExtractor;

impl MerchantExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for MerchantExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor for MerchantExtractor {
    type Output = String;

    /// The first rule that matches anywhere wins; later rules are not consulted.
    fn extract(&self, text: &str) -> ExtractionField<String> {
        self.extract_all(text)
            .into_iter()
            .next()
            .map(FieldMatch::into_field)
            .unwrap_or(ExtractionField::Absent)
    }

    fn extract_all(&self, text: &str) -> Vec<FieldMatch<String>> {
        let mut results = Vec::new();

        for rule in merchant_rules() {
            for caps in rule.pattern.captures_iter(text) {
                let Some(value) = caps.get(1) else {
                    continue;
                };
                let merchant = value.as_str().trim_end();
                if merchant.is_empty() {
                    continue;
                }

                results.push(
                    FieldMatch::new(merchant.to_string(), rule.specificity, merchant)
                        .with_position(value.start(), value.end())
                        .with_line(line_of(text, value.start())),
                );
            }
        }

        results
    }
}

/// Extract the merchant name from a normalized body.
pub fn extract_merchant(body: &str) -> ExtractionField<String> {
    MerchantExtractor::new().extract(body)
}

/// Canonical form of a merchant name for matching and grouping.
pub fn normalize_merchant(raw: &str) -> String {
    let lowered = raw.trim().to_lowercase();
    let cleaned = MERCHANT_NOISE.replace_all(&lowered, " ");
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_bracketed_form() {
        let field = extract_merchant("【ご利用先】 ロケツトナウ\n【ご利用金額】 159円");
        assert_eq!(field.value().map(String::as_str), Some("ロケツトナウ"));
        assert_eq!(field.specificity(), Some(Specificity::IssuerSpecific));
        assert_eq!(field.line(), Some(0));
    }

    #[test]
    fn test_marked_form() {
        let field = extract_merchant("■利用日: 2025/07/29\n■利用先: APPLE COM BILL   \n");
        assert_eq!(field.value().map(String::as_str), Some("APPLE COM BILL"));
        assert_eq!(field.specificity(), Some(Specificity::IssuerSpecific));
        assert_eq!(field.line(), Some(1));
    }

    #[test]
    fn test_generic_form_with_synonyms() {
        for (text, expected) in [
            ("ご利用先：AMAZON.CO.JP", "AMAZON.CO.JP"),
            ("ご利用店舗:ヨドバシカメラ", "ヨドバシカメラ"),
            ("加盟店名: セブン-イレブン", "セブン-イレブン"),
            ("Merchant: STARBUCKS", "STARBUCKS"),
        ] {
            let field = extract_merchant(text);
            assert_eq!(field.value().map(String::as_str), Some(expected), "{}", text);
            assert_eq!(field.specificity(), Some(Specificity::Generic));
        }
    }

    #[test]
    fn test_issuer_specific_wins_over_earlier_generic() {
        let text = "ご案内\n店舗名: 本文中の別の店\n【ご利用先】 ANA SKY SHOP\n";
        let field = extract_merchant(text);
        assert_eq!(field.value().map(String::as_str), Some("ANA SKY SHOP"));
    }

    #[test]
    fn test_capture_stops_at_newline() {
        let field = extract_merchant("ご利用先: SHOP A\nご利用金額: 100円");
        assert_eq!(field.value().map(String::as_str), Some("SHOP A"));
    }

    #[test]
    fn test_absent_when_label_has_no_value() {
        assert_eq!(extract_merchant("ご利用先:\n\n"), ExtractionField::Absent);
        assert_eq!(extract_merchant("お知らせです"), ExtractionField::Absent);
    }

    #[test]
    fn test_extract_all_orders_by_priority() {
        let all = MerchantExtractor::new().extract_all("利用先: B\n【ご利用先】A");
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].value, "A");
        assert_eq!(all[1].value, "B");
    }

    #[test]
    fn test_normalize_merchant() {
        assert_eq!(normalize_merchant("  AMAZON*Mktp (JP) #12 "), "amazon mktp jp 12");
        assert_eq!(normalize_merchant("APPLE COM BILL"), "apple com bill");
        assert_eq!(normalize_merchant("ヨドバシカメラ"), "ヨドバシカメラ");
    }
}
