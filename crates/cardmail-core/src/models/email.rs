//! Raw notification email as handed over by the mail retrieval layer.

use lazy_static::lazy_static;
use mailparse::{MailHeaderMap, ParsedMail};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{ExtractionError, Result};

lazy_static! {
    static ref HTML_BREAK: Regex =
        Regex::new(r"(?i)<br\s{0,4}/?>|</(?:p|div|tr|li|h[1-6])\s{0,4}>").unwrap();
    static ref HTML_CELL: Regex = Regex::new(r"(?i)</t[dh]\s{0,4}>").unwrap();
    /// A table cell holding only a field label, closed before its value cell.
    static ref HTML_LABEL_CELL: Regex = Regex::new(
        r"(?i)>\s{0,4}(ご利用先|ご利用店名|ご利用店舗|ご利用店|利用先|利用店名|加盟店名|店舗名|ご利用日時|ご利用年月日|ご利用日|利用日時|利用日|お取引日|取引日|ご利用金額|利用金額|ご利用額|利用額|お支払日|お支払金額|ご請求金額|金額)\s{0,4}[:：]?\s{0,4}((?:</[a-z]{1,10}\s{0,4}>\s{0,4}){0,4})</t[dh]\s{0,4}>"
    )
    .unwrap();
    static ref HTML_TAG: Regex = Regex::new(r"<[^>]{0,500}>").unwrap();
    static ref HTML_STYLE: Regex =
        Regex::new(r"(?is)<(?:style|script)\b[^>]{0,500}>.*?</(?:style|script)\s{0,4}>").unwrap();
}

/// One email, exactly as received.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEmail {
    /// Subject line (decoded).
    #[serde(default)]
    pub subject: String,

    /// Sender address, with or without display name.
    #[serde(default, alias = "from")]
    pub sender: String,

    /// Plain-text body.
    #[serde(default)]
    pub body: String,

    /// External dedup key. Must be non-empty.
    #[serde(alias = "messageId")]
    pub message_id: String,
}

impl RawEmail {
    pub fn new(
        subject: impl Into<String>,
        sender: impl Into<String>,
        body: impl Into<String>,
        message_id: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            sender: sender.into(),
            body: body.into(),
            message_id: message_id.into(),
        }
    }

    /// Decode a raw RFC 822 message.
    ///
    /// The first `text/plain` part becomes the body; HTML-only messages are
    /// reduced to their text content.
    pub fn from_eml(bytes: &[u8]) -> Result<Self> {
        let mail = mailparse::parse_mail(bytes)?;

        let message_id = mail
            .headers
            .get_first_value("Message-ID")
            .map(|id| id.trim().trim_start_matches('<').trim_end_matches('>').to_string())
            .unwrap_or_default();
        let sender = mail.headers.get_first_value("From").unwrap_or_default();
        let subject = mail.headers.get_first_value("Subject").unwrap_or_default();

        let body = find_part(&mail, "text/plain")
            .or_else(|| find_part(&mail, "text/html").map(|html| html_to_text(&html)))
            .unwrap_or_default();

        Ok(Self {
            subject,
            sender,
            body,
            message_id,
        })
    }

    /// Reject input that cannot be processed at all.
    pub fn validate(&self) -> std::result::Result<(), ExtractionError> {
        if self.message_id.trim().is_empty() {
            return Err(ExtractionError::invalid("message_id", "must not be empty"));
        }
        if self.body.contains('\0') {
            return Err(ExtractionError::invalid("body", "not a text body"));
        }
        Ok(())
    }

    /// Lowercased domain part of the sender address.
    pub fn sender_domain(&self) -> Option<String> {
        let address = match (self.sender.rfind('<'), self.sender.rfind('>')) {
            (Some(start), Some(end)) if start < end => &self.sender[start + 1..end],
            _ => self.sender.as_str(),
        };
        let domain = address.rsplit_once('@')?.1.trim();
        if domain.is_empty() {
            None
        } else {
            Some(domain.to_ascii_lowercase())
        }
    }
}

fn find_part(mail: &ParsedMail, mimetype: &str) -> Option<String> {
    if mail.ctype.mimetype.eq_ignore_ascii_case(mimetype) {
        if let Ok(body) = mail.get_body() {
            return Some(body);
        }
    }
    mail.subparts.iter().find_map(|part| find_part(part, mimetype))
}

fn html_to_text(html: &str) -> String {
    let text = HTML_STYLE.replace_all(html, "");
    let text = HTML_LABEL_CELL.replace_all(&text, ">${1}: ${2}");
    let text = HTML_BREAK.replace_all(&text, "\n");
    let text = HTML_CELL.replace_all(&text, " ");
    let text = HTML_TAG.replace_all(&text, "");
    text.replace("&nbsp;", " ")
        .replace("&yen;", "¥")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_sender_domain() {
        let email = RawEmail::new("", "Vpass <statement@vpass.ne.jp>", "", "id");
        assert_eq!(email.sender_domain().as_deref(), Some("vpass.ne.jp"));

        let email = RawEmail::new("", "INFO@Rakuten-Card.co.jp", "", "id");
        assert_eq!(email.sender_domain().as_deref(), Some("rakuten-card.co.jp"));

        let email = RawEmail::new("", "no address here", "", "id");
        assert_eq!(email.sender_domain(), None);
    }

    #[test]
    fn test_validate_rejects_missing_message_id() {
        let email = RawEmail::new("s", "a@b.jp", "body", "  ");
        assert!(matches!(
            email.validate(),
            Err(ExtractionError::InvalidEmail { ref field, .. }) if field == "message_id"
        ));
    }

    #[test]
    fn test_validate_rejects_binary_body() {
        let email = RawEmail::new("s", "a@b.jp", "\0\u{1}PK", "id-1");
        assert!(email.validate().is_err());
        assert!(RawEmail::new("s", "a@b.jp", "ok", "id-1").validate().is_ok());
    }

    #[test]
    fn test_deserialize_accepts_camel_case_id() {
        let email: RawEmail = serde_json::from_str(
            r#"{"subject":"s","from":"a@b.jp","body":"x","messageId":"m-1"}"#,
        )
        .unwrap();
        assert_eq!(email.message_id, "m-1");
        assert_eq!(email.sender, "a@b.jp");
    }

    #[test]
    fn test_from_eml_plain() {
        let raw = "Message-ID: <abc123@mail.example>\r\n\
                   From: Card <notice@vpass.ne.jp>\r\n\
                   Subject: test\r\n\
                   Content-Type: text/plain; charset=utf-8\r\n\
                   \r\n\
                   hello body\r\n";
        let email = RawEmail::from_eml(raw.as_bytes()).unwrap();
        assert_eq!(email.message_id, "abc123@mail.example");
        assert_eq!(email.subject, "test");
        assert!(email.sender.contains("notice@vpass.ne.jp"));
        assert!(email.body.contains("hello body"));
    }

    #[test]
    fn test_html_to_text() {
        let text = html_to_text("<style>p{}</style><p>A&amp;B</p><table><tr><td>x</td><td>y</td></tr></table>");
        assert!(text.contains("A&B"));
        assert!(text.contains("x y"));
        assert!(!text.contains('<'));
    }

    #[test]
    fn test_html_label_cells_get_a_colon() {
        let text = html_to_text(
            "<table><tr><td>ご利用先</td><td>SHOP</td></tr>\
             <tr><th><span>ご利用金額：</span></th><td>980円</td></tr></table>",
        );
        assert!(text.contains("ご利用先: SHOP"), "{}", text);
        assert!(text.contains("ご利用金額: 980円"), "{}", text);
    }
}
