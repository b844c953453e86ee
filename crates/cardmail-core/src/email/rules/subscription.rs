//! Recurring-billing detection.

use crate::models::config::SubscriptionConfig;

/// Whether the charge looks like a subscription.
///
/// `merchant_normalized` is the output of `normalize_merchant`; vendor
/// keywords are matched literally against it. Recurring markers are looked
/// up in the body, case-insensitive for ASCII.
pub fn detect_subscription(
    merchant_normalized: &str,
    body: &str,
    config: &SubscriptionConfig,
) -> bool {
    let vendor = config
        .vendor_keywords
        .iter()
        .filter(|k| !k.is_empty())
        .any(|keyword| merchant_normalized.contains(keyword.to_lowercase().as_str()));
    if vendor {
        return true;
    }

    let body = body.to_lowercase();
    config
        .recurring_markers
        .iter()
        .filter(|m| !m.is_empty())
        .any(|marker| body.contains(marker.to_lowercase().as_str()))
}
