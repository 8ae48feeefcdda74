//! 網店 REST API 的薄封裝：抓訂單、抓單筆訂單。
//! 簽章與認證就是 query 上的 key/secret，沒有更多花樣。

use crate::domain::model::{OrderFilter, SourceOrder};
use crate::domain::ports::OrderSource;
use crate::utils::error::{Result, SyncError};
use async_trait::async_trait;
use reqwest::Client;

pub struct StorefrontClient {
    client: Client,
    base_url: String,
    consumer_key: String,
    consumer_secret: String,
}

impl StorefrontClient {
    pub fn new(base_url: String, consumer_key: String, consumer_secret: String) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            consumer_key,
            consumer_secret,
        }
    }

    fn auth_params(&self) -> Vec<(String, String)> {
        vec![
            ("consumer_key".to_string(), self.consumer_key.clone()),
            ("consumer_secret".to_string(), self.consumer_secret.clone()),
        ]
    }
}

#[async_trait]
impl OrderSource for StorefrontClient {
    async fn fetch_orders(&self, filter: &OrderFilter) -> Result<Vec<SourceOrder>> {
        let url = format!("{}/orders", self.base_url);
        let mut params = self.auth_params();
        params.push(("per_page".to_string(), "100".to_string()));
        if !filter.statuses.is_empty() {
            params.push(("status".to_string(), filter.statuses.join(",")));
        }
        if let Some(after) = filter.after {
            params.push(("after".to_string(), after.to_rfc3339()));
        }
        if let Some(before) = filter.before {
            params.push(("before".to_string(), before.to_rfc3339()));
        }

        tracing::debug!("Fetching orders from: {}", url);
        let response = self.client.get(&url).query(&params).send().await?;

        if !response.status().is_success() {
            return Err(SyncError::ProcessingError {
                message: format!("storefront returned HTTP {} for order list", response.status()),
            });
        }

        let orders: Vec<SourceOrder> = response.json().await?;
        tracing::debug!("Fetched {} orders", orders.len());
        Ok(orders)
    }

    async fn fetch_order_by_id(&self, id: u64) -> Result<SourceOrder> {
        let url = format!("{}/orders/{}", self.base_url, id);

        let response = self.client.get(&url).query(&self.auth_params()).send().await?;

        if !response.status().is_success() {
            return Err(SyncError::ProcessingError {
                message: format!("storefront returned HTTP {} for order {}", response.status(), id),
            });
        }

        Ok(response.json().await?)
    }
}
