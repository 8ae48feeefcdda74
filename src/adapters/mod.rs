pub mod accounting;
pub mod storefront;

pub use accounting::{LedgerClient, UnimplementedCustomerLookup};
pub use storefront::StorefrontClient;
