use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 來源網店的訂單（唯讀輸入）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceOrder {
    pub id: u64,
    pub status: String,
    pub currency: String,
    pub total: Decimal,
    pub prices_include_tax: bool,
    #[serde(default)]
    pub line_items: Vec<SourceLineItem>,
    #[serde(default)]
    pub shipping_lines: Vec<ShippingLine>,
    #[serde(default)]
    pub coupon_lines: Vec<CouponLine>,
    #[serde(default)]
    pub billing: BillingContact,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceLineItem {
    pub name: String,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub product_id: Option<u64>,
    pub quantity: u32,
    /// 單價（稅的包含與否依訂單的 prices_include_tax）
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub subtotal: Option<Decimal>,
    #[serde(default)]
    pub subtotal_tax: Option<Decimal>,
    #[serde(default)]
    pub total: Option<Decimal>,
    #[serde(default)]
    pub total_tax: Option<Decimal>,
}

impl SourceLineItem {
    /// 至少要有一個價格欄位，否則視為驗證錯誤
    pub fn has_any_pricing(&self) -> bool {
        self.price.is_some()
            || self.subtotal.is_some()
            || self.total.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShippingLine {
    pub method_title: String,
    pub total: Decimal,
    #[serde(default)]
    pub total_tax: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouponLine {
    pub code: String,
    pub discount: Decimal,
    #[serde(default)]
    pub discount_tax: Option<Decimal>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BillingContact {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: Option<String>,
}

impl BillingContact {
    pub fn customer_name(&self) -> String {
        let name = format!("{} {}", self.first_name, self.last_name);
        let name = name.trim().to_string();
        if name.is_empty() {
            "Klient".to_string()
        } else {
            name
        }
    }
}

/// 正規化後的發票行：稅前單價、固定稅別
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalInvoiceLine {
    pub code: String,
    pub description: String,
    pub quantity: u32,
    /// 稅前單價；除了吸收尾差的那一行之外都是兩位小數
    pub unit_price: Decimal,
    pub tax_class: String,
    pub unit: String,
    pub location_code: u32,
}

/// 對帳結果：`subtotal + tax_amount + rounding == source_total`（到分）
#[derive(Debug, Clone, PartialEq)]
pub struct ReconciliationResult {
    pub lines: Vec<CanonicalInvoiceLine>,
    pub subtotal: Decimal,
    pub tax_amount: Decimal,
    pub rounding: Decimal,
    pub total: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaxSummaryRow {
    pub tax_class: String,
    pub amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerInfo {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// 送交會計系統的發票文件；送出後不再變動
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    pub invoice_number: String,
    pub doc_date: NaiveDate,
    pub due_date: NaiveDate,
    pub customer: CustomerInfo,
    pub currency: String,
    pub lines: Vec<CanonicalInvoiceLine>,
    pub tax_summary: Vec<TaxSummaryRow>,
    pub rounding: Decimal,
    pub total: Decimal,
    /// 格式 `"<label> \n#<orderId>\n<customerName>"`，供之後反查訂單編號
    pub comment: String,
}

/// 會計系統回傳的原始發票紀錄（僅取重複檢查與編號所需欄位）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InvoiceRecord {
    #[serde(default)]
    pub invoice_number: Option<String>,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub total: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitConfirmation {
    pub assigned_invoice_number: String,
}

#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    pub statuses: Vec<String>,
    pub after: Option<DateTime<Utc>>,
    pub before: Option<DateTime<Utc>>,
}

/// 客戶反查的結果；尚未串接時回傳 NotImplemented 而不是偷偷給 null
#[derive(Debug, Clone, PartialEq)]
pub enum CustomerMatch {
    Found(CustomerInfo),
    NotFound,
    NotImplemented,
}
