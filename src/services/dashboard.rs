//! All-history dashboard figures for one owner.

use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::db::queries::ledger::LedgerFilter;
use crate::db::{fetch_entries, LedgerReader};
use crate::error::AppResult;
use crate::models::{EntryKind, LedgerEntry, OwnerId};
use crate::services::aggregation::{checked_difference, total_amount};

pub const EXPENSE_WINDOW_DAYS: i64 = 30;
pub const INCOME_WINDOW_DAYS: i64 = 60;
pub const RECENT_PER_KIND: usize = 5;

#[derive(Debug, Clone, Serialize)]
pub struct WindowTotals {
    #[serde(with = "rust_decimal::serde::float")]
    pub total: Decimal,
    pub transactions: Vec<LedgerEntry>,
}

impl WindowTotals {
    fn since(entries: &[LedgerEntry], start: NaiveDate) -> AppResult<Self> {
        let transactions: Vec<LedgerEntry> =
            entries.iter().filter(|e| e.date >= start).cloned().collect();
        Ok(Self {
            total: total_amount(&transactions)?,
            transactions,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    #[serde(with = "rust_decimal::serde::float")]
    pub total_income: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_expense: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_balance: Decimal,
    pub last30_days_expense: WindowTotals,
    pub last60_days_income: WindowTotals,
    pub recent_transactions: Vec<LedgerEntry>,
}

/// Newest entries of both kinds, `per_kind` of each, merged newest first.
pub fn recent_transactions(
    incomes: &[LedgerEntry],
    expenses: &[LedgerEntry],
    per_kind: usize,
) -> Vec<LedgerEntry> {
    let mut merged: Vec<LedgerEntry> = incomes
        .iter()
        .take(per_kind)
        .chain(expenses.iter().take(per_kind))
        .cloned()
        .collect();
    merged.sort_by(|a, b| b.date.cmp(&a.date).then(b.id.cmp(&a.id)));
    merged
}

pub fn summarize(
    incomes: &[LedgerEntry],
    expenses: &[LedgerEntry],
    today: NaiveDate,
) -> AppResult<DashboardSummary> {
    let total_income = total_amount(incomes)?;
    let total_expense = total_amount(expenses)?;

    Ok(DashboardSummary {
        total_income,
        total_expense,
        total_balance: checked_difference(total_income, total_expense, "dashboard balance")?,
        last30_days_expense: WindowTotals::since(
            expenses,
            today - Duration::days(EXPENSE_WINDOW_DAYS),
        )?,
        last60_days_income: WindowTotals::since(
            incomes,
            today - Duration::days(INCOME_WINDOW_DAYS),
        )?,
        recent_transactions: recent_transactions(incomes, expenses, RECENT_PER_KIND),
    })
}

/// Reads come back newest first, which the window and recency lists rely on.
pub async fn dashboard_summary<R: LedgerReader>(
    reader: &R,
    owner: &OwnerId,
    today: NaiveDate,
) -> AppResult<DashboardSummary> {
    let (incomes, expenses) = tokio::try_join!(
        fetch_entries(reader, LedgerFilter::new(owner, EntryKind::Income)),
        fetch_entries(reader, LedgerFilter::new(owner, EntryKind::Expense)),
    )?;

    tracing::debug!(
        owner = %owner,
        incomes = incomes.len(),
        expenses = expenses.len(),
        "Building dashboard summary"
    );

    summarize(&incomes, &expenses, today)
}
