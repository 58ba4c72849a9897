use chrono::NaiveDate;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use rust_decimal::Decimal;
use tracing::{debug, trace};

use crate::date_utils::DateRange;
use crate::models::{EntryKind, LedgerEntry, NewLedgerEntry, OwnerId};

/// Selection of one owner's entries of one kind.
#[derive(Debug, Clone)]
pub struct LedgerFilter {
    pub owner_id: OwnerId,
    pub kind: EntryKind,
    pub from_date: Option<NaiveDate>,
    pub to_date: Option<NaiveDate>,
    pub limit: Option<i64>,
}

impl LedgerFilter {
    pub fn new(owner_id: &OwnerId, kind: EntryKind) -> Self {
        Self {
            owner_id: owner_id.clone(),
            kind,
            from_date: None,
            to_date: None,
            limit: None,
        }
    }

    pub fn within(mut self, range: &DateRange) -> Self {
        self.from_date = Some(range.start);
        self.to_date = Some(range.end);
        self
    }

    pub fn since(mut self, date: NaiveDate) -> Self {
        self.from_date = Some(date);
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Whether `entry` would be returned by this filter (ignoring `limit`).
    pub fn matches(&self, entry: &LedgerEntry) -> bool {
        entry.owner_id == self.owner_id
            && entry.kind == self.kind
            && self.from_date.map_or(true, |from| entry.date >= from)
            && self.to_date.map_or(true, |to| entry.date <= to)
    }
}

const ENTRY_COLUMNS: &str = "id, owner_id, kind, amount, label, icon, date, created_at";

/// Entries matching `filter`, newest first.
pub fn list_entries(conn: &Connection, filter: &LedgerFilter) -> rusqlite::Result<Vec<LedgerEntry>> {
    let mut sql = format!(
        "SELECT {} FROM ledger_entries WHERE owner_id = ? AND kind = ?",
        ENTRY_COLUMNS
    );
    let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = vec![
        Box::new(filter.owner_id.as_str().to_string()),
        Box::new(filter.kind.as_str()),
    ];

    if let Some(from_date) = filter.from_date {
        sql.push_str(" AND date >= ?");
        params_vec.push(Box::new(from_date.format("%Y-%m-%d").to_string()));
    }
    if let Some(to_date) = filter.to_date {
        sql.push_str(" AND date <= ?");
        params_vec.push(Box::new(to_date.format("%Y-%m-%d").to_string()));
    }

    sql.push_str(" ORDER BY date DESC, id DESC");

    if let Some(limit) = filter.limit {
        sql.push_str(" LIMIT ?");
        params_vec.push(Box::new(limit));
    }

    let params_refs: Vec<&dyn rusqlite::ToSql> = params_vec.iter().map(|p| p.as_ref()).collect();
    let mut stmt = conn.prepare(&sql)?;
    let entries = stmt
        .query_map(params_refs.as_slice(), entry_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    debug!(
        owner = %filter.owner_id,
        kind = filter.kind.as_str(),
        count = entries.len(),
        "Listed ledger entries"
    );
    Ok(entries)
}

pub fn get_entry(
    conn: &Connection,
    owner_id: &OwnerId,
    kind: EntryKind,
    id: i64,
) -> rusqlite::Result<Option<LedgerEntry>> {
    trace!(entry_id = id, "Fetching ledger entry");
    conn.query_row(
        &format!(
            "SELECT {} FROM ledger_entries WHERE id = ? AND owner_id = ? AND kind = ?",
            ENTRY_COLUMNS
        ),
        params![id, owner_id.as_str(), kind.as_str()],
        entry_from_row,
    )
    .optional()
}

pub fn create_entry(conn: &Connection, entry: &NewLedgerEntry) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO ledger_entries (owner_id, kind, amount, label, icon, date)
         VALUES (?, ?, ?, ?, ?, ?)",
        params![
            entry.owner_id.as_str(),
            entry.kind.as_str(),
            entry.amount.to_string(),
            entry.label,
            entry.icon,
            entry.date.format("%Y-%m-%d").to_string(),
        ],
    )?;

    let id = conn.last_insert_rowid();
    debug!(
        entry_id = id,
        owner = %entry.owner_id,
        kind = entry.kind.as_str(),
        amount = %entry.amount,
        "Created ledger entry"
    );
    Ok(id)
}

/// Delete an entry only if it belongs to `owner_id`.
pub fn delete_entry(
    conn: &Connection,
    owner_id: &OwnerId,
    kind: EntryKind,
    id: i64,
) -> rusqlite::Result<bool> {
    let rows = conn.execute(
        "DELETE FROM ledger_entries WHERE id = ? AND owner_id = ? AND kind = ?",
        params![id, owner_id.as_str(), kind.as_str()],
    )?;
    if rows > 0 {
        debug!(entry_id = id, owner = %owner_id, "Deleted ledger entry");
    }
    Ok(rows > 0)
}

fn entry_from_row(row: &Row<'_>) -> rusqlite::Result<LedgerEntry> {
    let kind_str: String = row.get(2)?;
    let kind = kind_str.parse::<EntryKind>().map_err(|_| {
        rusqlite::Error::FromSqlConversionFailure(
            2,
            Type::Text,
            format!("unknown entry kind '{}'", kind_str).into(),
        )
    })?;

    let amount_str: String = row.get(3)?;
    let amount = amount_str
        .parse::<Decimal>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(e)))?;

    let date_str: String = row.get(6)?;
    let date = NaiveDate::parse_from_str(&date_str, "%Y-%m-%d")
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(6, Type::Text, Box::new(e)))?;

    Ok(LedgerEntry {
        id: row.get(0)?,
        owner_id: OwnerId::new(row.get::<_, String>(1)?),
        kind,
        amount,
        label: row.get(4)?,
        icon: row.get(5)?,
        date,
        created_at: row.get(7)?,
    })
}
