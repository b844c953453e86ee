//! Card number, wallet and contactless hints.

use crate::models::transaction::{CardDetails, Wallet};

use super::patterns::{
    APPLE_PAY, CARD_LAST4_PATTERNS, GOOGLE_PAY, ID_PAYMENT, QUICPAY, TOKEN_LAST4,
};

/// Extract payment-instrument details from a normalized body.
pub fn extract_card(body: &str) -> CardDetails {
    let tokens: Vec<(usize, usize, &str)> = TOKEN_LAST4
        .captures_iter(body)
        .filter_map(|caps| caps.get(1))
        .map(|m| (m.start(), m.end(), m.as_str()))
        .collect();

    let card_last4 = CARD_LAST4_PATTERNS.iter().find_map(|pattern| {
        pattern
            .captures_iter(body)
            .filter_map(|caps| caps.get(1))
            // トークン末尾 digits are not the card number
            .find(|m| {
                !tokens
                    .iter()
                    .any(|&(start, end, _)| m.start() < end && start < m.end())
            })
            .map(|m| m.as_str().to_string())
    });

    let wallet = if APPLE_PAY.is_match(body) {
        Some(Wallet::ApplePay)
    } else if GOOGLE_PAY.is_match(body) {
        Some(Wallet::GooglePay)
    } else {
        None
    };

    let product_hint = if QUICPAY.is_match(body) {
        Some("QUICPay".to_string())
    } else if ID_PAYMENT.is_match(body) {
        Some("iD".to_string())
    } else {
        None
    };

    let numberless = card_last4.is_none() && body.contains("ナンバーレス");

    CardDetails {
        card_last4,
        token_last4: tokens.first().map(|&(_, _, digits)| digits.to_string()),
        wallet,
        product_hint,
        numberless,
    }
}
