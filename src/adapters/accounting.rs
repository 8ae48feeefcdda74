//! 會計 API 的薄封裝：送發票、列發票、取下一個發票編號。

use crate::core::assembler::{max_invoice_number, FALLBACK_START_NUMBER};
use crate::domain::model::{
    CustomerMatch, Invoice, InvoiceRecord, SubmitConfirmation,
};
use crate::domain::ports::{AccountingApi, CustomerLookup};
use crate::utils::error::{Result, SyncError};
use async_trait::async_trait;
use chrono::{Duration, NaiveDate, Utc};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub struct LedgerClient {
    client: Client,
    base_url: String,
    api_id: String,
    api_key: String,
    lookback_days: i64,
}

#[derive(Serialize)]
struct RowPayload<'a> {
    #[serde(rename = "ItemCode")]
    item_code: &'a str,
    #[serde(rename = "ItemDescription")]
    item_description: &'a str,
    #[serde(rename = "Quantity")]
    quantity: u32,
    #[serde(rename = "Price")]
    price: Decimal,
    #[serde(rename = "TaxId")]
    tax_id: &'a str,
    #[serde(rename = "UnitCode")]
    unit_code: &'a str,
    #[serde(rename = "LocationCode")]
    location_code: u32,
}

#[derive(Serialize)]
struct TaxPayload<'a> {
    #[serde(rename = "TaxId")]
    tax_id: &'a str,
    #[serde(rename = "Amount")]
    amount: Decimal,
}

#[derive(Serialize)]
struct InvoicePayload<'a> {
    #[serde(rename = "InvoiceNo")]
    invoice_no: &'a str,
    #[serde(rename = "DocDate")]
    doc_date: String,
    #[serde(rename = "DueDate")]
    due_date: String,
    #[serde(rename = "CustomerName")]
    customer_name: &'a str,
    #[serde(rename = "CurrencyCode")]
    currency_code: &'a str,
    #[serde(rename = "InvoiceRow")]
    rows: Vec<RowPayload<'a>>,
    #[serde(rename = "TaxAmount")]
    taxes: Vec<TaxPayload<'a>>,
    #[serde(rename = "RoundingAmount")]
    rounding: Decimal,
    #[serde(rename = "TotalAmount")]
    total: Decimal,
    #[serde(rename = "Comment")]
    comment: &'a str,
}

#[derive(Deserialize)]
struct SubmitResponse {
    #[serde(rename = "InvoiceNo")]
    invoice_no: String,
}

#[derive(Deserialize)]
struct RawInvoice {
    #[serde(rename = "InvoiceNo", default)]
    invoice_no: Option<String>,
    #[serde(rename = "Comment", default)]
    comment: Option<String>,
    #[serde(rename = "TotalAmount", default)]
    total: Option<Decimal>,
}

impl LedgerClient {
    pub fn new(base_url: String, api_id: String, api_key: String, lookback_days: i64) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_id,
            api_key,
            lookback_days,
        }
    }

    fn auth_params(&self) -> Vec<(String, String)> {
        vec![
            ("ApiId".to_string(), self.api_id.clone()),
            ("ApiKey".to_string(), self.api_key.clone()),
        ]
    }

    fn payload<'a>(invoice: &'a Invoice) -> InvoicePayload<'a> {
        InvoicePayload {
            invoice_no: &invoice.invoice_number,
            doc_date: invoice.doc_date.to_string(),
            due_date: invoice.due_date.to_string(),
            customer_name: &invoice.customer.name,
            currency_code: &invoice.currency,
            rows: invoice
                .lines
                .iter()
                .map(|l| RowPayload {
                    item_code: &l.code,
                    item_description: &l.description,
                    quantity: l.quantity,
                    price: l.unit_price,
                    tax_id: &l.tax_class,
                    unit_code: &l.unit,
                    location_code: l.location_code,
                })
                .collect(),
            taxes: invoice
                .tax_summary
                .iter()
                .map(|t| TaxPayload {
                    tax_id: &t.tax_class,
                    amount: t.amount,
                })
                .collect(),
            rounding: invoice.rounding,
            total: invoice.total,
            comment: &invoice.comment,
        }
    }
}

#[async_trait]
impl AccountingApi for LedgerClient {
    async fn submit_invoice(&self, invoice: &Invoice) -> Result<SubmitConfirmation> {
        let url = format!("{}/sendinvoice", self.base_url);

        tracing::debug!(invoice_number = %invoice.invoice_number, "Submitting invoice to: {}", url);
        let response = self
            .client
            .post(&url)
            .query(&self.auth_params())
            .json(&Self::payload(invoice))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SyncError::ProcessingError {
                message: format!(
                    "accounting API returned HTTP {} for invoice submission",
                    response.status()
                ),
            });
        }

        let confirmation: SubmitResponse = response.json().await?;
        Ok(SubmitConfirmation {
            assigned_invoice_number: confirmation.invoice_no,
        })
    }

    async fn list_invoices(
        &self,
        period_start: NaiveDate,
        period_end: NaiveDate,
        unpaid_only: bool,
    ) -> Result<Vec<InvoiceRecord>> {
        let url = format!("{}/getinvoices", self.base_url);
        let mut params = self.auth_params();
        params.push(("periodstart".to_string(), period_start.format("%Y%m%d").to_string()));
        params.push(("periodend".to_string(), period_end.format("%Y%m%d").to_string()));
        params.push(("unpaidonly".to_string(), unpaid_only.to_string()));

        let response = self.client.get(&url).query(&params).send().await?;

        if !response.status().is_success() {
            return Err(SyncError::ProcessingError {
                message: format!(
                    "accounting API returned HTTP {} for invoice list",
                    response.status()
                ),
            });
        }

        let raw: Vec<RawInvoice> = response.json().await?;
        Ok(raw
            .into_iter()
            .map(|r| InvoiceRecord {
                invoice_number: r.invoice_no,
                comment: r.comment,
                total: r.total,
            })
            .collect())
    }

    /// 掃最近區間的發票找最大數字編號再加一；
    /// 一張都沒有時從固定起始號開始
    async fn get_next_invoice_number(&self) -> Result<String> {
        let today = Utc::now().date_naive();
        let start = today - Duration::days(self.lookback_days);

        let records = self.list_invoices(start, today, false).await?;
        let next = match max_invoice_number(&records) {
            Some(max) => max + 1,
            None => FALLBACK_START_NUMBER,
        };
        Ok(next.to_string())
    }
}

/// 客戶反查尚未串接；明說「還沒實作」而不是回 null
pub struct UnimplementedCustomerLookup;

#[async_trait]
impl CustomerLookup for UnimplementedCustomerLookup {
    async fn find_customer(&self, _email: &str) -> Result<CustomerMatch> {
        Ok(CustomerMatch::NotImplemented)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::CustomerInfo;
    use httpmock::prelude::*;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn invoice() -> Invoice {
        Invoice {
            invoice_number: "10011".to_string(),
            doc_date: NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
            due_date: NaiveDate::from_ymd_opt(2026, 3, 9).unwrap(),
            customer: CustomerInfo {
                name: "Jaeklient".to_string(),
                email: None,
            },
            currency: "EUR".to_string(),
            lines: vec![],
            tax_summary: vec![],
            rounding: d("0.02"),
            total: d("10.00"),
            comment: "Taimepood \n#1542\nMari Maasikas".to_string(),
        }
    }

    #[tokio::test]
    async fn test_submit_invoice() {
        let server = MockServer::start();
        let submit_mock = server.mock(|when, then| {
            when.method(POST)
                .path("/sendinvoice")
                .query_param("ApiId", "id")
                .json_body_partial(
                    r#"{"InvoiceNo": "10011", "RoundingAmount": "0.02", "TotalAmount": "10.00"}"#,
                );
            then.status(200)
                .json_body(serde_json::json!({"InvoiceNo": "10011"}));
        });

        let client = LedgerClient::new(server.url(""), "id".to_string(), "key".to_string(), 90);
        let confirmation = client.submit_invoice(&invoice()).await.unwrap();

        submit_mock.assert();
        assert_eq!(confirmation.assigned_invoice_number, "10011");
    }

    #[tokio::test]
    async fn test_submit_invoice_http_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/sendinvoice");
            then.status(403);
        });

        let client = LedgerClient::new(server.url(""), "id".to_string(), "key".to_string(), 90);
        let err = client.submit_invoice(&invoice()).await.unwrap_err();
        assert!(matches!(err, SyncError::ProcessingError { .. }));
    }

    #[tokio::test]
    async fn test_list_invoices_maps_records() {
        let server = MockServer::start();
        let list_mock = server.mock(|when, then| {
            when.method(GET)
                .path("/getinvoices")
                .query_param("unpaidonly", "false");
            then.status(200).json_body(serde_json::json!([
                {"InvoiceNo": "10004", "Comment": "Taimepood \n#1500\nJaan Tamm", "TotalAmount": "25.00"},
                {"InvoiceNo": null, "Comment": null}
            ]));
        });

        let client = LedgerClient::new(server.url(""), "id".to_string(), "key".to_string(), 90);
        let records = client
            .list_invoices(
                NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
                false,
            )
            .await
            .unwrap();

        list_mock.assert();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].invoice_number.as_deref(), Some("10004"));
        assert_eq!(records[0].total, Some(d("25.00")));
        assert!(records[1].invoice_number.is_none());
    }

    #[tokio::test]
    async fn test_next_invoice_number_increments_max() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/getinvoices");
            then.status(200).json_body(serde_json::json!([
                {"InvoiceNo": "10004"},
                {"InvoiceNo": "E1542"},
                {"InvoiceNo": "10010"}
            ]));
        });

        let client = LedgerClient::new(server.url(""), "id".to_string(), "key".to_string(), 90);
        assert_eq!(client.get_next_invoice_number().await.unwrap(), "10011");
    }

    #[tokio::test]
    async fn test_next_invoice_number_falls_back_to_start() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/getinvoices");
            then.status(200).json_body(serde_json::json!([]));
        });

        let client = LedgerClient::new(server.url(""), "id".to_string(), "key".to_string(), 90);
        assert_eq!(client.get_next_invoice_number().await.unwrap(), "10001");
    }

    #[tokio::test]
    async fn test_unimplemented_customer_lookup() {
        let lookup = UnimplementedCustomerLookup;
        assert_eq!(
            lookup.find_customer("mari@example.com").await.unwrap(),
            CustomerMatch::NotImplemented
        );
    }
}
