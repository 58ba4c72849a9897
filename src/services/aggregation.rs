//! Range totals and per-category breakdowns over ledger entries.

use rust_decimal::Decimal;
use std::collections::BTreeMap;

use crate::date_utils::DateRange;
use crate::db::queries::ledger::LedgerFilter;
use crate::db::{fetch_entries, LedgerReader};
use crate::error::{AppError, AppResult};
use crate::models::{EntryKind, LedgerEntry, OwnerId};

/// Summed expense amount per category label.
///
/// Backed by a `BTreeMap`, so iteration and serialization are ordered by
/// label regardless of the order entries were accumulated in.
pub type CategoryTotals = BTreeMap<String, Decimal>;

pub(crate) fn overflow(context: &str) -> AppError {
    AppError::Internal(format!("amount overflow while computing {}", context))
}

/// Sum of `amounts`, failing instead of panicking when the total leaves the
/// representable range.
pub fn checked_sum<I>(amounts: I, context: &str) -> AppResult<Decimal>
where
    I: IntoIterator<Item = Decimal>,
{
    amounts.into_iter().try_fold(Decimal::ZERO, |total, amount| {
        total.checked_add(amount).ok_or_else(|| overflow(context))
    })
}

pub fn checked_difference(minuend: Decimal, subtrahend: Decimal, context: &str) -> AppResult<Decimal> {
    minuend
        .checked_sub(subtrahend)
        .ok_or_else(|| overflow(context))
}

/// Sum of `amount` over `entries`. An empty slice sums to exactly zero.
pub fn total_amount(entries: &[LedgerEntry]) -> AppResult<Decimal> {
    checked_sum(entries.iter().map(|e| e.amount), "entry total")
}

/// Total of one owner's entries of `kind` dated within `range`.
pub async fn sum_by_kind<R: LedgerReader>(
    reader: &R,
    owner: &OwnerId,
    kind: EntryKind,
    range: &DateRange,
) -> AppResult<Decimal> {
    let entries = fetch_entries(reader, LedgerFilter::new(owner, kind).within(range)).await?;
    total_amount(&entries)
}

pub fn breakdown_by_category(entries: &[LedgerEntry]) -> AppResult<CategoryTotals> {
    let mut totals = CategoryTotals::new();
    for entry in entries {
        let total = totals.entry(entry.label.clone()).or_insert(Decimal::ZERO);
        *total = total
            .checked_add(entry.amount)
            .ok_or_else(|| overflow("category breakdown"))?;
    }
    Ok(totals)
}
