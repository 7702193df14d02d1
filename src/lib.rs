pub mod core;
pub mod fetch;
pub mod utils;
pub mod xbrl;

// Re-exports
pub use crate::core::config::ExtractorConfig;
pub use fetch::CachedSchemaFetcher;
