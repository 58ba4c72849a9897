use crate::db::queries::ledger::{self, LedgerFilter};
use crate::db::DbPool;
use crate::error::AppResult;
use crate::models::LedgerEntry;

/// Read access to the ledger, as used by the analytics services.
///
/// Implementations are blocking; async callers go through [`fetch_entries`],
/// which moves each read onto the blocking thread pool so independent reads
/// of one request run concurrently.
pub trait LedgerReader: Clone + Send + Sync + 'static {
    fn entries(&self, filter: &LedgerFilter) -> AppResult<Vec<LedgerEntry>>;
}

impl LedgerReader for DbPool {
    fn entries(&self, filter: &LedgerFilter) -> AppResult<Vec<LedgerEntry>> {
        let conn = self.get()?;
        Ok(ledger::list_entries(&conn, filter)?)
    }
}

pub async fn fetch_entries<R: LedgerReader>(
    reader: &R,
    filter: LedgerFilter,
) -> AppResult<Vec<LedgerEntry>> {
    let reader = reader.clone();
    tokio::task::spawn_blocking(move || reader.entries(&filter)).await?
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;

    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    use super::*;
    use crate::error::AppError;
    use crate::models::{EntryKind, OwnerId};

    /// Ledger held in memory, filtered the same way the SQL query filters.
    #[derive(Clone, Default)]
    pub struct MemoryLedger {
        entries: Arc<Vec<LedgerEntry>>,
    }

    impl MemoryLedger {
        pub fn new(entries: Vec<LedgerEntry>) -> Self {
            Self {
                entries: Arc::new(entries),
            }
        }
    }

    impl LedgerReader for MemoryLedger {
        fn entries(&self, filter: &LedgerFilter) -> AppResult<Vec<LedgerEntry>> {
            let mut found: Vec<LedgerEntry> = self
                .entries
                .iter()
                .filter(|e| filter.matches(e))
                .cloned()
                .collect();
            found.sort_by(|a, b| b.date.cmp(&a.date).then(b.id.cmp(&a.id)));
            if let Some(limit) = filter.limit {
                found.truncate(limit.max(0) as usize);
            }
            Ok(found)
        }
    }

    /// Ledger whose every read fails, standing in for an unreachable store.
    #[derive(Clone)]
    pub struct UnreachableLedger;

    impl LedgerReader for UnreachableLedger {
        fn entries(&self, _filter: &LedgerFilter) -> AppResult<Vec<LedgerEntry>> {
            Err(AppError::Internal("ledger store unreachable".into()))
        }
    }

    pub fn owner() -> OwnerId {
        OwnerId::new("owner-1")
    }

    pub fn entry(id: i64, kind: EntryKind, label: &str, amount: &str, date: &str) -> LedgerEntry {
        LedgerEntry {
            id,
            owner_id: owner(),
            kind,
            amount: amount.parse::<Decimal>().unwrap(),
            label: label.to_string(),
            icon: None,
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            created_at: "2024-01-01 00:00:00".to_string(),
        }
    }

    pub fn income(id: i64, source: &str, amount: &str, date: &str) -> LedgerEntry {
        entry(id, EntryKind::Income, source, amount, date)
    }

    pub fn expense(id: i64, category: &str, amount: &str, date: &str) -> LedgerEntry {
        entry(id, EntryKind::Expense, category, amount, date)
    }

    pub fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }
}
