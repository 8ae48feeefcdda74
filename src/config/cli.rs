use clap::Parser;

/// 命令列參數：預設跑一輪批次同步，給 --order-id 時改成手動觸發單筆
#[derive(Parser, Debug, Clone)]
#[command(name = "shop-ledger-sync", version, about = "Sync storefront orders into the accounting system")]
pub struct CliConfig {
    /// 設定檔路徑
    #[arg(short, long, default_value = "sync.toml")]
    pub config: String,

    /// 輸出 debug 等級日誌
    #[arg(short, long)]
    pub verbose: bool,

    /// 只同步這一筆訂單（手動觸發）
    #[arg(long)]
    pub order_id: Option<u64>,
}
