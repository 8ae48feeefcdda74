//! 組裝最終發票文件：表頭、匿名客戶、行項、稅額彙總、尾差欄位，
//! 以及把來源訂單編號藏進備註欄的往返格式。

use crate::core::money::VAT_CLASS;
use crate::domain::model::{
    CustomerInfo, Invoice, InvoiceRecord, ReconciliationResult, SourceOrder, TaxSummaryRow,
};
use chrono::{Duration, NaiveDate};
use regex::Regex;
use std::sync::OnceLock;

/// 付款期限（天）
pub const PAYMENT_TERM_DAYS: i64 = 7;

/// 會計系統查不到既有編號時的起始號
pub const FALLBACK_START_NUMBER: u64 = 10001;

/// 零售訂單的匿名客戶占位
pub const ANONYMOUS_CUSTOMER: &str = "Jaeklient";

/// 備註格式：`"<label> \n#<orderId>\n<customerName>"`
pub fn build_comment(label: &str, order_id: u64, customer_name: &str) -> String {
    format!("{} \n#{}\n{}", label, order_id, customer_name)
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommentRef {
    pub order_id: u64,
    pub customer_name: Option<String>,
}

/// 從發票備註反解訂單編號與客戶名。
/// 訂單編號取 `#` 後第一串數字；客戶名取第二個換行之後的內容，
/// 單行備註退回 `<label> #<digits> <rest>` 的樣式。
pub fn parse_comment(comment: &str) -> Option<CommentRef> {
    static ORDER_ID_RE: OnceLock<Regex> = OnceLock::new();
    static SINGLE_LINE_RE: OnceLock<Regex> = OnceLock::new();

    let order_id_re = ORDER_ID_RE.get_or_init(|| Regex::new(r"#(\d+)").unwrap());
    let caps = order_id_re.captures(comment)?;
    let order_id: u64 = caps[1].parse().ok()?;

    let mut parts = comment.splitn(3, '\n');
    parts.next();
    parts.next();
    let customer_name = match parts.next() {
        Some(rest) if !rest.trim().is_empty() => Some(rest.trim().to_string()),
        _ => {
            let single_line_re =
                SINGLE_LINE_RE.get_or_init(|| Regex::new(r"#\d+\s+(\S.*)$").unwrap());
            single_line_re
                .captures(comment)
                .map(|c| c[1].trim().to_string())
        }
    };

    Some(CommentRef {
        order_id,
        customer_name,
    })
}

/// 最近區間內數字型發票編號的最大值；非數字編號（含占位號）一律略過
pub fn max_invoice_number(records: &[InvoiceRecord]) -> Option<u64> {
    records
        .iter()
        .filter_map(|r| r.invoice_number.as_deref())
        .filter_map(|n| n.trim().parse::<u64>().ok())
        .max()
}

/// 編號查詢本身失敗時用的占位號，確保流程不會卡死在取號上
pub fn placeholder_number(order_id: u64) -> String {
    format!("E{}", order_id)
}

pub fn build_invoice(
    order: &SourceOrder,
    reconciled: ReconciliationResult,
    invoice_number: String,
    doc_date: NaiveDate,
    store_label: &str,
    customer: Option<CustomerInfo>,
) -> Invoice {
    let customer = customer.unwrap_or_else(|| CustomerInfo {
        name: ANONYMOUS_CUSTOMER.to_string(),
        email: None,
    });

    let comment = build_comment(store_label, order.id, &order.billing.customer_name());

    Invoice {
        invoice_number,
        doc_date,
        due_date: doc_date + Duration::days(PAYMENT_TERM_DAYS),
        customer,
        currency: order.currency.clone(),
        lines: reconciled.lines,
        tax_summary: vec![TaxSummaryRow {
            tax_class: VAT_CLASS.to_string(),
            amount: reconciled.tax_amount,
        }],
        rounding: reconciled.rounding,
        total: reconciled.total,
        comment,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_comment_round_trip() {
        let comment = build_comment("Taimepood", 1542, "Mari Maasikas");
        assert_eq!(comment, "Taimepood \n#1542\nMari Maasikas");

        let parsed = parse_comment(&comment).unwrap();
        assert_eq!(parsed.order_id, 1542);
        assert_eq!(parsed.customer_name.as_deref(), Some("Mari Maasikas"));
    }

    #[test]
    fn test_parse_single_line_fallback() {
        let parsed = parse_comment("Taimepood #987 Jaan Tamm").unwrap();
        assert_eq!(parsed.order_id, 987);
        assert_eq!(parsed.customer_name.as_deref(), Some("Jaan Tamm"));
    }

    #[test]
    fn test_parse_comment_without_order_reference() {
        assert!(parse_comment("käsitsi sisestatud arve").is_none());
        assert!(parse_comment("").is_none());
    }

    #[test]
    fn test_parse_comment_without_customer_name() {
        let parsed = parse_comment("Taimepood \n#55\n").unwrap();
        assert_eq!(parsed.order_id, 55);
        assert_eq!(parsed.customer_name, None);
    }

    #[test]
    fn test_max_invoice_number_skips_non_numeric() {
        let records = vec![
            InvoiceRecord {
                invoice_number: Some("10004".to_string()),
                ..Default::default()
            },
            InvoiceRecord {
                invoice_number: Some("E1542".to_string()),
                ..Default::default()
            },
            InvoiceRecord {
                invoice_number: Some("10010".to_string()),
                ..Default::default()
            },
            InvoiceRecord::default(),
        ];
        assert_eq!(max_invoice_number(&records), Some(10010));
        assert_eq!(max_invoice_number(&[]), None);
    }

    #[test]
    fn test_placeholder_number_is_tagged() {
        assert_eq!(placeholder_number(1542), "E1542");
    }

    #[test]
    fn test_build_invoice_header() {
        use crate::domain::model::SourceOrder;

        let order = SourceOrder {
            id: 1542,
            status: "completed".to_string(),
            currency: "EUR".to_string(),
            total: d("10.00"),
            prices_include_tax: true,
            line_items: vec![],
            shipping_lines: vec![],
            coupon_lines: vec![],
            billing: Default::default(),
        };
        let reconciled = ReconciliationResult {
            lines: vec![],
            subtotal: d("8.33"),
            tax_amount: d("1.67"),
            rounding: d("0.00"),
            total: d("10.00"),
        };

        let doc_date = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        let invoice = build_invoice(
            &order,
            reconciled,
            "10011".to_string(),
            doc_date,
            "Taimepood",
            None,
        );

        assert_eq!(invoice.invoice_number, "10011");
        assert_eq!(
            invoice.due_date,
            NaiveDate::from_ymd_opt(2026, 3, 9).unwrap()
        );
        assert_eq!(invoice.customer.name, ANONYMOUS_CUSTOMER);
        assert_eq!(invoice.tax_summary.len(), 1);
        assert_eq!(invoice.tax_summary[0].amount, d("1.67"));
        // 匿名訂單的備註用 billing 的退回名稱
        assert_eq!(parse_comment(&invoice.comment).unwrap().order_id, 1542);
    }
}
