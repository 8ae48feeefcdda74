use crate::domain::model::{
    CustomerMatch, Invoice, InvoiceRecord, OrderFilter, SourceOrder, SubmitConfirmation,
};
use crate::utils::error::Result;
use async_trait::async_trait;
use chrono::NaiveDate;

/// 網店訂單來源
#[async_trait]
pub trait OrderSource: Send + Sync {
    async fn fetch_orders(&self, filter: &OrderFilter) -> Result<Vec<SourceOrder>>;
    async fn fetch_order_by_id(&self, id: u64) -> Result<SourceOrder>;
}

/// 會計系統提交介面
#[async_trait]
pub trait AccountingApi: Send + Sync {
    async fn submit_invoice(&self, invoice: &Invoice) -> Result<SubmitConfirmation>;
    async fn list_invoices(
        &self,
        period_start: NaiveDate,
        period_end: NaiveDate,
        unpaid_only: bool,
    ) -> Result<Vec<InvoiceRecord>>;
    async fn get_next_invoice_number(&self) -> Result<String>;
}

/// 會計系統的客戶反查；目前的實作一律回 NotImplemented
#[async_trait]
pub trait CustomerLookup: Send + Sync {
    async fn find_customer(&self, email: &str) -> Result<CustomerMatch>;
}
