use chrono::{Duration, Utc};
use clap::Parser;
use shop_ledger_sync::core::sync::{BatchOutcome, OrderOutcome, SyncEngine};
use shop_ledger_sync::domain::model::OrderFilter;
use shop_ledger_sync::utils::{logger, validation::Validate};
use shop_ledger_sync::{
    Catalog, CliConfig, LedgerClient, StorefrontClient, TomlConfig, UnimplementedCustomerLookup,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = CliConfig::parse();

    // 初始化日誌
    logger::init_cli_logger(cli.verbose);

    tracing::info!("Starting shop-ledger-sync CLI");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    // 載入並驗證配置
    let config = match TomlConfig::from_file(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("❌ Failed to load config '{}': {}", cli.config, e);
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 建議: {}", e.recovery_suggestion());
            std::process::exit(1);
        }
    };

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    let settings = config.sync_settings();

    // 組裝兩側的 API 客戶端與同步引擎
    let storefront = StorefrontClient::new(
        config.store.endpoint.clone(),
        config.store.consumer_key.clone(),
        config.store.consumer_secret.clone(),
    );
    let accounting = LedgerClient::new(
        config.accounting.endpoint.clone(),
        config.accounting.api_id.clone(),
        config.accounting.api_key.clone(),
        settings.lookback_days,
    );

    let lookback_days = settings.lookback_days;
    let engine = SyncEngine::new(
        storefront,
        accounting,
        UnimplementedCustomerLookup,
        Catalog::plant_shop(),
        settings,
    );

    let result = match cli.order_id {
        Some(order_id) => {
            tracing::info!(order_id, "manual single-order sync requested");
            engine.sync_single_order(order_id).await.map(|outcome| {
                match outcome {
                    OrderOutcome::Submitted(confirmation) => {
                        println!(
                            "✅ Order {} invoiced as {}",
                            order_id, confirmation.assigned_invoice_number
                        );
                    }
                    OrderOutcome::AlreadyInvoiced => {
                        println!("✅ Order {} already invoiced, nothing to do", order_id);
                    }
                }
            })
        }
        None => {
            let filter = OrderFilter {
                after: Some(Utc::now() - Duration::days(lookback_days)),
                ..Default::default()
            };
            engine.run_batch(&filter).await.map(|outcome| match outcome {
                BatchOutcome::Completed(summary) => {
                    println!(
                        "✅ Sync batch finished: {} submitted, {} skipped, {} failed",
                        summary.submitted, summary.skipped, summary.failed
                    );
                }
                BatchOutcome::Skipped => {
                    println!("✅ Another sync run is in flight, nothing to do");
                }
            })
        }
    };

    if let Err(e) = result {
        // 記錄詳細錯誤信息
        tracing::error!("❌ Sync failed: {} (Severity: {:?})", e, e.severity());
        tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

        // 輸出用戶友好的錯誤信息
        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 建議: {}", e.recovery_suggestion());

        // 根據錯誤嚴重程度決定退出碼
        let exit_code = match e.severity() {
            shop_ledger_sync::utils::error::ErrorSeverity::Low => 0, // 警告，但成功
            shop_ledger_sync::utils::error::ErrorSeverity::Medium => 2, // 重試錯誤
            shop_ledger_sync::utils::error::ErrorSeverity::High => 1, // 處理錯誤
            shop_ledger_sync::utils::error::ErrorSeverity::Critical => 3, // 系統錯誤
        };

        if exit_code > 0 {
            std::process::exit(exit_code);
        }
    }

    Ok(())
}
