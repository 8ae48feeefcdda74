pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use adapters::{LedgerClient, StorefrontClient, UnimplementedCustomerLookup};
pub use config::{CliConfig, TomlConfig};
pub use core::catalog::Catalog;
pub use core::sync::{spawn_batch, BatchOutcome, OrderOutcome, SyncEngine, SyncSettings};
pub use utils::error::{Result, SyncError};
