use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

pub type DbPool = Pool<SqliteConnectionManager>;

static MEMORY_DB_COUNTER: AtomicUsize = AtomicUsize::new(0);

pub fn create_pool(database_path: &Path) -> Result<DbPool, r2d2::Error> {
    if let Some(parent) = database_path.parent() {
        std::fs::create_dir_all(parent).ok();
    }

    let manager = SqliteConnectionManager::file(database_path).with_init(|conn| {
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
                 PRAGMA synchronous = NORMAL;
                 PRAGMA foreign_keys = ON;
                 PRAGMA busy_timeout = 5000;",
        )
    });

    Pool::builder().max_size(10).build(manager)
}

/// Pool over a private shared-cache in-memory database.
///
/// Every connection of the pool sees the same data; separate pools never do.
pub fn create_in_memory_pool() -> Result<DbPool, r2d2::Error> {
    let id = MEMORY_DB_COUNTER.fetch_add(1, Ordering::Relaxed);
    let uri = format!(
        "file:spendwise-mem-{}-{}?mode=memory&cache=shared",
        std::process::id(),
        id
    );

    let manager = SqliteConnectionManager::file(uri).with_init(|conn| {
        conn.execute_batch(
            "PRAGMA foreign_keys = ON;
                 PRAGMA busy_timeout = 5000;",
        )
    });

    Pool::builder().max_size(4).build(manager)
}
