//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `CrawlState`: Names, visited prefixes and request count for one variant
//! - `PrefixState`: Where a single prefix stands in the traversal

mod crawl_state;
mod prefix_state;

// Re-export main types
pub use crawl_state::CrawlState;
pub use prefix_state::{rejection_reason, PrefixState};
