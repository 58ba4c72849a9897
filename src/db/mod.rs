pub mod migrations;
pub mod pool;
pub mod queries;
pub mod reader;

pub use pool::{create_in_memory_pool, create_pool, DbPool};
pub use reader::{fetch_entries, LedgerReader};
