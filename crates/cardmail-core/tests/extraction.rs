use cardmail_core::{
    EmailExtractor, ExtractionConfig, ExtractionOutcome, OccurredAt, RawEmail,
    TransactionExtractor, Wallet,
};
use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;

fn vpass(subject: &str, body: &str) -> RawEmail {
    RawEmail::new(
        subject,
        "三井住友カード <statement@vpass.ne.jp>",
        body,
        "CAxyz123@mail.vpass.ne.jp",
    )
}

fn nicos(body: &str) -> RawEmail {
    RawEmail::new(
        "【MUFGカード】カードご利用のお知らせ",
        "MUFG <info@cs.nicos.co.jp>",
        body,
        "20250828194700.nicos@example",
    )
}

const SCENARIO_A: &str = "\
三井住友カード をご利用いただきありがとうございます。
お客様のカードご利用内容をお知らせします。

■利用日: 2025/07/29
■利用先: APPLE COM BILL
■利用取引: 買物
■利用金額: 3,300 円
";

const SCENARIO_B: &str = "\
いつもMUFGカードをご利用いただきありがとうございます。
カードのご利用がありましたのでお知らせいたします。

【ご利用日時】
2025/08/28 19:47
【ご利用先】 ロケツトナウ
【ご利用金額】 159円
";

const SCENARIO_C: &str = "\
2025年9月お支払分のご請求金額が確定しました。
ご請求金額合計 12,480円

2025/08/01 AMAZON.CO.JP 5,980円
2025/08/12 ENEOS 4,200円
2025/08/20 NETFLIX.COM 2,300円
";

#[test]
fn scenario_a_marked_notice() {
    let extractor = TransactionExtractor::default();
    let email = vpass("ご利用のお知らせ【三井住友カード】", SCENARIO_A);

    let tx = extractor.extract_transaction(&email).unwrap().unwrap();
    assert_eq!(tx.merchant_raw, "APPLE COM BILL");
    assert_eq!(tx.amount, Decimal::from(3300));
    assert_eq!(
        tx.occurred_at,
        OccurredAt::Date(NaiveDate::from_ymd_opt(2025, 7, 29).unwrap())
    );
    assert_eq!(tx.message_id, "CAxyz123@mail.vpass.ne.jp");
    assert!(tx.confidence >= 0.7, "confidence {}", tx.confidence);
    assert!(!extractor.looks_like_statement(&email));
}

#[test]
fn scenario_b_bracketed_notice() {
    let tx = TransactionExtractor::default()
        .extract_transaction(&nicos(SCENARIO_B))
        .unwrap()
        .unwrap();

    assert_eq!(tx.merchant_raw, "ロケツトナウ");
    assert_eq!(tx.amount, Decimal::from(159));
    assert_eq!(tx.currency, "JPY");
    assert_eq!(
        tx.occurred_at,
        OccurredAt::DateTime(
            NaiveDate::from_ymd_opt(2025, 8, 28)
                .unwrap()
                .and_hms_opt(19, 47, 0)
                .unwrap()
        )
    );
    assert_eq!(tx.issuer.as_deref(), Some("mufg"));
    assert_eq!(tx.card_label.as_deref(), Some("MUFGカード"));
}

#[test]
fn scenario_c_statement_summary() {
    let extractor = TransactionExtractor::default();
    let email = vpass("ご利用代金のご案内", SCENARIO_C);

    assert!(extractor.looks_like_statement(&email));
    assert_eq!(extractor.extract_transaction(&email).unwrap(), None);
    assert_eq!(
        extractor.explain(&email).unwrap().outcome,
        ExtractionOutcome::Statement
    );
}

#[test]
fn extraction_is_idempotent() {
    let extractor = TransactionExtractor::default();
    let email = nicos(SCENARIO_B);

    let first = extractor.extract_transaction(&email).unwrap();
    let second = extractor.extract_transaction(&email).unwrap();
    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[test]
fn full_width_digits_match_half_width() {
    let half = "■利用日: 2025/07/29 12:05\n■利用先: SHOP\n■利用金額: 3,300円";
    let full = "■利用日：２０２５／０７／２９　１２：０５\n■利用先：SHOP\n■利用金額：３，３００円";
    let extractor = TransactionExtractor::default();

    let a = extractor.extract_transaction(&vpass("", half)).unwrap().unwrap();
    let b = extractor.extract_transaction(&vpass("", full)).unwrap().unwrap();
    assert_eq!(a.amount, b.amount);
    assert_eq!(a.occurred_at, b.occurred_at);
}

#[test]
fn year_is_not_read_as_amount() {
    let body = "\
【ご利用先】 ENEOS
会員番号 ¥3002025/08/28 更新
¥1,2342025年8月
【ご利用金額】 4,200円
【ご利用日】 2025/08/28
";
    let tx = TransactionExtractor::default()
        .extract_transaction(&nicos(body))
        .unwrap()
        .unwrap();
    assert_eq!(tx.amount, Decimal::from(4200));
}

#[test]
fn issuer_specific_merchant_wins() {
    let body = "\
ご利用先: 別の店
【ご利用先】 ANA SKY SHOP
【ご利用金額】 12,000円
【ご利用日】 2025/08/01
";
    let tx = TransactionExtractor::default()
        .extract_transaction(&nicos(body))
        .unwrap()
        .unwrap();
    assert_eq!(tx.merchant_raw, "ANA SKY SHOP");
}

#[test]
fn missing_message_id_is_an_error() {
    let mut email = vpass("", SCENARIO_A);
    email.message_id = String::new();
    assert!(TransactionExtractor::default().extract_transaction(&email).is_err());
}

#[test]
fn billing_month_is_never_the_occurrence_date() {
    let body = "\
お支払日: 2025/09/10
■利用先: SHOP
■利用金額: 980円
■利用日: 2025/08/02
";
    let tx = TransactionExtractor::default()
        .extract_transaction(&vpass("", body))
        .unwrap()
        .unwrap();
    assert_eq!(
        tx.occurred_at,
        OccurredAt::Date(NaiveDate::from_ymd_opt(2025, 8, 2).unwrap())
    );
}

#[test]
fn billing_and_usage_values_on_one_line() {
    let body = "\
ご請求金額: 52,000円 ご利用金額: 1,200円
お支払日: 2025/09/10 ご利用日: 2025/08/01
■利用先: SHOP
";
    let tx = TransactionExtractor::default()
        .extract_transaction(&vpass("", body))
        .unwrap()
        .unwrap();
    assert_eq!(tx.amount, Decimal::from(1200));
    assert_eq!(
        tx.occurred_at,
        OccurredAt::Date(NaiveDate::from_ymd_opt(2025, 8, 1).unwrap())
    );
}

#[test]
fn notice_with_billing_row_is_not_a_statement() {
    let body = "\
■利用日: 2025/08/02 ■利用金額: 980円
■利用先: SHOP
お支払日: 2025/09/10 お支払金額: 980円
";
    let extractor = TransactionExtractor::default();
    let email = vpass("ご利用のお知らせ", body);

    assert!(!extractor.looks_like_statement(&email));
    let tx = extractor.extract_transaction(&email).unwrap().unwrap();
    assert_eq!(tx.merchant_raw, "SHOP");
    assert_eq!(tx.amount, Decimal::from(980));
    assert_eq!(
        tx.occurred_at,
        OccurredAt::Date(NaiveDate::from_ymd_opt(2025, 8, 2).unwrap())
    );
}

#[test]
fn html_table_notice_yields_transaction() {
    let eml = "\
Message-ID: <html-1@vpass.ne.jp>\r
From: statement@vpass.ne.jp\r
Subject: =?UTF-8?B?44GU5Yip55So44Gu44GK55+l44KJ44Gb?=\r
Content-Type: text/html; charset=utf-8\r
Content-Transfer-Encoding: 8bit\r
\r
<html><body><table>\r
<tr><td>ご利用日</td><td>2025/08/02 10:00</td><td>ご利用金額</td><td>980円</td></tr>\r
<tr><td>ご利用先</td><td>SHOP</td></tr>\r
<tr><td>お支払日</td><td>2025/09/10</td><td>お支払金額</td><td>980円</td></tr>\r
</table></body></html>\r
";
    let email = RawEmail::from_eml(eml.as_bytes()).unwrap();
    let extractor = TransactionExtractor::default();

    assert!(!extractor.looks_like_statement(&email));
    let tx = extractor.extract_transaction(&email).unwrap().unwrap();
    assert_eq!(tx.merchant_raw, "SHOP");
    assert_eq!(tx.amount, Decimal::from(980));
    assert_eq!(
        tx.occurred_at,
        OccurredAt::DateTime(
            NaiveDate::from_ymd_opt(2025, 8, 2)
                .unwrap()
                .and_hms_opt(10, 0, 0)
                .unwrap()
        )
    );
    assert_eq!(tx.message_id, "html-1@vpass.ne.jp");
}

#[test]
fn footer_advertising_is_not_a_subscription() {
    let body = "\
■利用日: 2025/08/02
■利用先: ロケツトナウ
■利用金額: 980円

年会費無料のゴールドカード、定額払いのご案内
";
    let tx = TransactionExtractor::default()
        .extract_transaction(&vpass("", body))
        .unwrap()
        .unwrap();
    assert!(!tx.is_subscription);
}

#[test]
fn card_hints_surface_on_transaction() {
    let body = "\
ご利用カード: 三井住友カード ****1234
■利用日: 2025/08/02
■利用先: QUICPay加盟店
■利用金額: 680円
";
    let tx = TransactionExtractor::default()
        .extract_transaction(&vpass("", body))
        .unwrap()
        .unwrap();
    assert_eq!(tx.card_last4.as_deref(), Some("1234"));
    assert_eq!(tx.product_hint.as_deref(), Some("QUICPay"));
    assert_eq!(tx.card_label.as_deref(), Some("三井住友カード ****1234"));
    assert_eq!(tx.wallet, None::<Wallet>);
}

#[test]
fn unknown_issuer_yields_nothing() {
    let email = RawEmail::new("ご利用のお知らせ", "info@shop.example", SCENARIO_A, "id-9");
    let extractor = TransactionExtractor::new(ExtractionConfig::default());
    assert_eq!(extractor.extract_transaction(&email).unwrap(), None);
}

#[test]
fn raw_email_accepts_camel_case_message_id() {
    let json = r#"{
        "subject": "ご利用のお知らせ",
        "from": "info@vpass.ne.jp",
        "body": "■利用日: 2025/07/29\n■利用先: SHOP\n■利用金額: 100円",
        "messageId": "m-1"
    }"#;
    let email: RawEmail = serde_json::from_str(json).unwrap();
    assert_eq!(email.message_id, "m-1");

    let tx = TransactionExtractor::default()
        .extract_transaction(&email)
        .unwrap()
        .unwrap();
    assert_eq!(tx.amount, Decimal::from(100));
}

#[test]
fn eml_input_round_trips_to_transaction() {
    let eml = "\
Message-ID: <abc123@vpass.ne.jp>\r
From: =?UTF-8?B?5LiJ5LqV5L2P5Y+L44Kr44O844OJ?= <statement@vpass.ne.jp>\r
Subject: =?UTF-8?B?44GU5Yip55So44Gu44GK55+l44KJ44Gb?=\r
Content-Type: text/plain; charset=utf-8\r
Content-Transfer-Encoding: 8bit\r
\r
■利用日: 2025/07/29\r
■利用先: APPLE COM BILL\r
■利用金額: 3,300 円\r
";
    let email = RawEmail::from_eml(eml.as_bytes()).unwrap();
    assert_eq!(email.message_id, "abc123@vpass.ne.jp");
    assert_eq!(email.subject, "ご利用のお知らせ");

    let tx = TransactionExtractor::default()
        .extract_transaction(&email)
        .unwrap()
        .unwrap();
    assert_eq!(tx.merchant_raw, "APPLE COM BILL");
}
