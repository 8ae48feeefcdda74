//! 批次同步引擎：抓訂單、查重、對帳、開票、節流送出。
//! 同步狀態是引擎自己的欄位，不放模組層的全域變數，
//! 測試才能各開各的引擎互不污染。

use crate::core::assembler::{build_invoice, placeholder_number};
use crate::core::assembler::parse_comment;
use crate::core::catalog::Catalog;
use crate::core::normalizer::normalize_order;
use crate::core::reconciler::reconcile;
use crate::domain::model::{
    CustomerMatch, OrderFilter, SourceOrder, SubmitConfirmation,
};
use crate::domain::ports::{AccountingApi, CustomerLookup, OrderSource};
use crate::utils::error::{Result, SyncError};
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, Clone)]
pub struct SyncSettings {
    pub store_label: String,
    /// 符合條件的訂單狀態
    pub statuses: Vec<String>,
    /// 連續送出之間的固定間隔，避免打爆會計 API
    pub pacing: std::time::Duration,
    /// 查重與取號回看的天數
    pub lookback_days: i64,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            store_label: "Taimepood".to_string(),
            statuses: vec!["completed".to_string(), "processing".to_string()],
            pacing: std::time::Duration::from_millis(500),
            lookback_days: 90,
        }
    }
}

/// 同步狀態：進行中旗標、上次執行時間、本輪已處理的訂單
#[derive(Debug, Default)]
pub struct SyncState {
    in_flight: AtomicBool,
    last_run: Mutex<Option<DateTime<Utc>>>,
    processed_ids: Mutex<HashSet<u64>>,
    submitted_total: AtomicU64,
    failed_total: AtomicU64,
}

impl SyncState {
    pub async fn last_run(&self) -> Option<DateTime<Utc>> {
        *self.last_run.lock().await
    }

    /// 引擎生命週期內累計的成功送出數
    pub fn submitted_total(&self) -> u64 {
        self.submitted_total.load(Ordering::Relaxed)
    }

    /// 引擎生命週期內累計的失敗筆數
    pub fn failed_total(&self) -> u64 {
        self.failed_total.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum OrderOutcome {
    Submitted(SubmitConfirmation),
    AlreadyInvoiced,
}

#[derive(Debug, Clone, Default)]
pub struct BatchSummary {
    pub submitted: usize,
    pub skipped: usize,
    pub failed: usize,
    pub invoice_numbers: Vec<String>,
}

#[derive(Debug, Clone)]
pub enum BatchOutcome {
    Completed(BatchSummary),
    /// 已有一輪在跑；這次要求直接放掉，不排隊也不報錯
    Skipped,
}

pub struct SyncEngine<S, A, C> {
    orders: S,
    accounting: A,
    customers: C,
    catalog: Catalog,
    settings: SyncSettings,
    state: SyncState,
}

/// 確保 in-flight 旗標在任何離開路徑上都會被清掉
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl<S, A, C> SyncEngine<S, A, C>
where
    S: OrderSource,
    A: AccountingApi,
    C: CustomerLookup,
{
    pub fn new(orders: S, accounting: A, customers: C, catalog: Catalog, settings: SyncSettings) -> Self {
        Self {
            orders,
            accounting,
            customers,
            catalog,
            settings,
            state: SyncState::default(),
        }
    }

    pub fn state(&self) -> &SyncState {
        &self.state
    }

    /// 跑一輪批次同步。同一個引擎同時最多一輪；
    /// 撞上進行中的那輪時回 `Skipped`。
    pub async fn run_batch(&self, filter: &OrderFilter) -> Result<BatchOutcome> {
        if self.state.in_flight.swap(true, Ordering::SeqCst) {
            tracing::info!("sync already in flight, skipping this run");
            return Ok(BatchOutcome::Skipped);
        }
        let _guard = InFlightGuard(&self.state.in_flight);

        let summary = self.run_batch_inner(filter).await?;
        Ok(BatchOutcome::Completed(summary))
    }

    async fn run_batch_inner(&self, filter: &OrderFilter) -> Result<BatchSummary> {
        // 先確定哪些訂單已經開過票；查不到就整批停下，絕不冒險重複開票
        let existing = self.existing_order_ids().await?;

        let mut orders = self.orders.fetch_orders(filter).await?;
        orders.retain(|o| self.settings.statuses.contains(&o.status));
        // 依來源編號遞增處理，發票編號才會單調、查重才有確定性
        orders.sort_by_key(|o| o.id);

        tracing::info!(
            count = orders.len(),
            existing = existing.len(),
            "starting sync batch"
        );

        let mut summary = BatchSummary::default();

        for order in &orders {
            let already_done = {
                let processed = self.state.processed_ids.lock().await;
                existing.contains(&order.id) || processed.contains(&order.id)
            };
            if already_done {
                tracing::info!(order_id = order.id, "invoice already exists, skipping");
                summary.skipped += 1;
                continue;
            }

            if summary.submitted > 0 {
                tokio::time::sleep(self.settings.pacing).await;
            }

            match self.process_order(order).await {
                Ok(confirmation) => {
                    self.state.processed_ids.lock().await.insert(order.id);
                    summary
                        .invoice_numbers
                        .push(confirmation.assigned_invoice_number.clone());
                    summary.submitted += 1;
                }
                Err(e) => {
                    // 單筆失敗不拖垮整批
                    tracing::error!(
                        order_id = order.id,
                        severity = ?e.severity(),
                        suggestion = %e.recovery_suggestion(),
                        "order sync failed: {}",
                        e
                    );
                    summary.failed += 1;
                }
            }
        }

        *self.state.last_run.lock().await = Some(Utc::now());
        self.state
            .submitted_total
            .fetch_add(summary.submitted as u64, Ordering::Relaxed);
        self.state
            .failed_total
            .fetch_add(summary.failed as u64, Ordering::Relaxed);

        tracing::info!(
            submitted = summary.submitted,
            skipped = summary.skipped,
            failed = summary.failed,
            "sync batch finished"
        );
        Ok(summary)
    }

    /// 手動觸發單筆訂單（依編號）
    pub async fn sync_single_order(&self, order_id: u64) -> Result<OrderOutcome> {
        let existing = self.existing_order_ids().await?;
        if existing.contains(&order_id) {
            tracing::info!(order_id, "invoice already exists, not resubmitting");
            return Ok(OrderOutcome::AlreadyInvoiced);
        }

        let order = self.orders.fetch_order_by_id(order_id).await?;
        self.process_order(&order).await.map(OrderOutcome::Submitted)
    }

    /// 手動觸發單筆訂單（直接給 payload）
    pub async fn sync_order_payload(&self, order: &SourceOrder) -> Result<OrderOutcome> {
        let existing = self.existing_order_ids().await?;
        if existing.contains(&order.id) {
            return Ok(OrderOutcome::AlreadyInvoiced);
        }
        self.process_order(order).await.map(OrderOutcome::Submitted)
    }

    /// 從會計系統最近的發票備註裡反解出已開票的訂單編號
    async fn existing_order_ids(&self) -> Result<HashSet<u64>> {
        let today = Utc::now().date_naive();
        let start = today - Duration::days(self.settings.lookback_days);

        let records = self
            .accounting
            .list_invoices(start, today, false)
            .await
            .map_err(|e| SyncError::DuplicateCheckError {
                message: e.to_string(),
            })?;

        Ok(records
            .iter()
            .filter_map(|r| r.comment.as_deref())
            .filter_map(parse_comment)
            .map(|c| c.order_id)
            .collect())
    }

    async fn process_order(&self, order: &SourceOrder) -> Result<SubmitConfirmation> {
        if order.total < Decimal::ZERO {
            return Err(SyncError::OrderValidationError {
                order_id: order.id,
                message: format!("grand total {} is negative", order.total),
            });
        }

        let lines = normalize_order(&self.catalog, order)?;
        let reconciled = reconcile(order.id, order.total, lines)?;

        let customer = match order.billing.email.as_deref() {
            Some(email) => match self.customers.find_customer(email).await {
                Ok(CustomerMatch::Found(info)) => Some(info),
                Ok(_) => None,
                Err(e) => {
                    tracing::warn!(order_id = order.id, "customer lookup failed: {}", e);
                    None
                }
            },
            None => None,
        };

        // 取號失敗不能卡住整筆訂單，退回帶標記的占位號
        let invoice_number = match self.accounting.get_next_invoice_number().await {
            Ok(number) => number,
            Err(e) => {
                tracing::warn!(
                    order_id = order.id,
                    "invoice number lookup failed, using placeholder: {}",
                    e
                );
                placeholder_number(order.id)
            }
        };

        let invoice = build_invoice(
            order,
            reconciled,
            invoice_number,
            Utc::now().date_naive(),
            &self.settings.store_label,
            customer,
        );

        let confirmation = self.accounting.submit_invoice(&invoice).await?;
        tracing::info!(
            order_id = order.id,
            invoice_number = %confirmation.assigned_invoice_number,
            total = %invoice.total,
            "invoice submitted"
        );
        Ok(confirmation)
    }
}

/// 射後不理的批次觸發：任務丟上執行環境就回頭，
/// 結果只從日誌看得到。
pub fn spawn_batch<S, A, C>(
    engine: Arc<SyncEngine<S, A, C>>,
    filter: OrderFilter,
) -> tokio::task::JoinHandle<()>
where
    S: OrderSource + 'static,
    A: AccountingApi + 'static,
    C: CustomerLookup + 'static,
{
    tokio::spawn(async move {
        match engine.run_batch(&filter).await {
            Ok(BatchOutcome::Completed(summary)) => {
                tracing::info!(
                    submitted = summary.submitted,
                    failed = summary.failed,
                    "background sync batch completed"
                );
            }
            Ok(BatchOutcome::Skipped) => {
                tracing::info!("background sync batch skipped, another run in flight");
            }
            Err(e) => {
                tracing::error!("background sync batch failed: {}", e);
            }
        }
    })
}
