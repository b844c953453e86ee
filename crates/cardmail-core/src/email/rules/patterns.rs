//! Common regex patterns for card notification emails.
//!
//! Patterns accept both half-width and full-width digits and separators so
//! that they also work on text that skipped normalization. Every repetition
//! is bounded.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Merchant patterns, highest priority first
    pub static ref MERCHANT_BRACKETED: Regex = Regex::new(
        r"[【\[［][ \t]{0,3}(?:ご利用先|ご利用店名|ご利用店舗|ご利用店|利用先|利用店名|加盟店名)[ \t]{0,3}[】\]］][ \t]{0,4}[:：]?[ \t]{0,4}(\S[^\n]{0,119})"
    ).unwrap();

    pub static ref MERCHANT_MARKED: Regex = Regex::new(
        r"(?m)^[ \t]{0,4}[■◆◇●○▼▽◎・][ \t]{0,4}(?:ご利用先|利用先|ご利用店名|利用店名|ご利用店舗|ご利用店|加盟店名)[ \t]{0,4}[:：][ \t]{0,4}(\S[^\n]{0,119})"
    ).unwrap();

    pub static ref MERCHANT_GENERIC: Regex = Regex::new(
        r"(?:ご利用先|ご利用店名|ご利用店舗|ご利用店|ご利用内容|ご利用場所|利用先|利用店名|利用場所|店舗名|加盟店名|(?i:merchant))[ \t]{0,4}[:：][ \t]{0,4}(\S[^\n]{0,119})"
    ).unwrap();

    /// Any merchant label, used to locate the merchant line.
    pub static ref MERCHANT_LABEL: Regex = Regex::new(
        r"ご利用先|ご利用店名|ご利用店舗|ご利用店|ご利用内容|ご利用場所|利用先|利用店名|利用場所|店舗名|加盟店名|(?i:merchant)"
    ).unwrap();

    // Date patterns: 2025/07/29, 2025-7-29, 2025年7月29日, optional (火) and 19:47
    pub static ref DATE_TOKEN: Regex = Regex::new(
        r"((?:19|20|１９|２０)[0-9０-９]{2})[ \t]{0,1}[/／\-.．年][ \t]{0,1}([0-9０-９]{1,2})[ \t]{0,1}[/／\-.．月][ \t]{0,1}([0-9０-９]{1,2})日?(?:[ \t]{0,3}[(（][^)）\n]{1,4}[)）])?(?:[ \t]{0,3}([0-9０-９]{1,2})[:：]([0-9０-９]{2}))?"
    ).unwrap();

    pub static ref USAGE_DATE_LABEL: Regex = Regex::new(
        r"ご利用日時|ご利用年月日|ご利用日|利用日時|利用日|お取引日|取引日|(?i:transaction\s?date)"
    ).unwrap();

    /// Billing period, payment due and statement total labels.
    pub static ref BILLING_CONTEXT: Regex = Regex::new(
        r"お支払い?(?:月|日|予定日|金額)|支払月|支払日|ご請求(?:月|予定日|予定額|金額|額)|請求月|請求金額|引き?落と?し?(?:日|金額)|お引落|口座振替日|(?i:payment\s?(?:month|date|amount)|billing|due\s?date)"
    ).unwrap();

    // Amount patterns, highest priority first
    pub static ref AMOUNT_SYMBOL: Regex = Regex::new(
        r"([¥￥$＄])[ \t]{0,2}([0-9０-９]{1,3}(?:[,，][0-9０-９]{3})+|[0-9０-９]{1,12})(?:[.．]([0-9０-９]{1,2}))?"
    ).unwrap();

    pub static ref AMOUNT_UNIT: Regex = Regex::new(
        r"([0-9０-９]{1,3}(?:[,，][0-9０-９]{3})+|[0-9０-９]{1,12})(?:[.．]([0-9０-９]{1,2}))?[ \t]{0,2}(円|ドル|ユーロ)"
    ).unwrap();

    pub static ref AMOUNT_ISO: Regex = Regex::new(
        r"([0-9０-９]{1,3}(?:[,，][0-9０-９]{3})+|[0-9０-９]{1,12})(?:[.．]([0-9０-９]{1,2}))?[ \t]{0,2}(JPY|USD|EUR|GBP)(?:[^A-Za-z]|$)"
    ).unwrap();

    pub static ref AMOUNT_LABEL: Regex = Regex::new(
        r"ご利用金額|利用金額|ご利用額|利用額|ご利用料金|金額|(?i:amount)"
    ).unwrap();

    /// A `20xx` year glued to the end of a digit run.
    pub static ref YEAR_PREFIX: Regex = Regex::new(
        r"^20[0-9０-９]{2}"
    ).unwrap();

    // Card and wallet hints
    pub static ref TOKEN_LAST4: Regex = Regex::new(
        r"トークン末尾[ \t:：]{0,3}([0-9]{4})"
    ).unwrap();

    pub static ref CARD_LAST4_PATTERNS: Vec<Regex> = vec![
        Regex::new(r"下4桁[ \t:：]{0,3}([0-9]{4})").unwrap(),
        Regex::new(r"末尾[ \t:：]{0,3}([0-9]{4})").unwrap(),
        Regex::new(r"[*＊]{4}[ \t\-]{0,2}([0-9]{4})").unwrap(),
        Regex::new(r"[XＸ]{4}[ \t\-]{0,2}([0-9]{4})").unwrap(),
        Regex::new(r"カード番号[^0-9\n]{0,24}([0-9]{4})").unwrap(),
    ];

    pub static ref APPLE_PAY: Regex = Regex::new(
        r"(?i)apple[ \t]?pay|アップルペイ"
    ).unwrap();

    pub static ref GOOGLE_PAY: Regex = Regex::new(
        r"(?i)google[ \t]?pay|グーグルペイ"
    ).unwrap();

    pub static ref QUICPAY: Regex = Regex::new(
        r"(?i)quicpay"
    ).unwrap();

    /// `iD` as a standalone token, not inside another word.
    pub static ref ID_PAYMENT: Regex = Regex::new(
        r"(?:^|[^A-Za-z])iD(?:[^A-Za-z]|$)"
    ).unwrap();
}

/// Index of the line containing byte offset `pos`.
pub fn line_of(text: &str, pos: usize) -> usize {
    text.as_bytes()[..pos.min(text.len())]
        .iter()
        .filter(|&&b| b == b'\n')
        .count()
}

/// Byte range of the line containing `pos`, newline excluded.
pub fn line_span(text: &str, pos: usize) -> (usize, usize) {
    let pos = pos.min(text.len());
    let start = text[..pos].rfind('\n').map(|i| i + 1).unwrap_or(0);
    let end = text[pos..].find('\n').map(|i| pos + i).unwrap_or(text.len());
    (start, end)
}

fn is_digit(c: char) -> bool {
    c.is_ascii_digit() || ('０'..='９').contains(&c)
}

/// Text that labels the value at `pos`.
///
/// On the value's own line this is the text after the last digit before
/// it, so a label only reaches the next value on a shared line. When the
/// value opens its line, the previous line is used if it holds no digits.
pub fn label_context(text: &str, pos: usize) -> &str {
    let (start, _) = line_span(text, pos);
    let prefix = &text[start..pos];
    if !prefix.trim().is_empty() || start == 0 {
        let cut = prefix
            .char_indices()
            .rev()
            .find(|&(_, c)| is_digit(c))
            .map_or(0, |(i, c)| i + c.len_utf8());
        return &prefix[cut..];
    }

    let (prev_start, prev_end) = line_span(text, start - 1);
    let previous = &text[prev_start..prev_end];
    if previous.chars().any(is_digit) {
        prefix
    } else {
        previous
    }
}

/// Indices of lines that carry a merchant label.
pub fn merchant_lines(text: &str) -> Vec<usize> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| MERCHANT_LABEL.is_match(line))
        .map(|(i, _)| i)
        .collect()
}
