pub mod config_loader;
pub mod cache;

pub use config_loader::*;
pub use cache::{CacheItem, CacheStats, TtlCache};
