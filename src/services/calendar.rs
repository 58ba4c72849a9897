//! Zero-filled calendar series (trailing week, months of a year, span of years).
//!
//! Every series is built the same way: income and expense entries are grouped
//! independently into sparse `key -> amount` maps, then [`join_sparse`] walks an
//! ordered frame of keys and emits one bucket per key, defaulting missing sides
//! to zero.

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::collections::HashMap;
use std::hash::Hash;

use crate::date_utils::{self, DateRange};
use crate::db::queries::ledger::LedgerFilter;
use crate::db::{fetch_entries, LedgerReader};
use crate::error::AppResult;
use crate::models::{EntryKind, LedgerEntry, OwnerId};
use crate::services::aggregation::{checked_difference, checked_sum, overflow};

pub const WEEK_DAYS: u32 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct BucketAmounts {
    #[serde(with = "rust_decimal::serde::float")]
    pub income: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub expense: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub savings: Decimal,
}

impl BucketAmounts {
    pub fn new(income: Decimal, expense: Decimal) -> AppResult<Self> {
        Ok(Self {
            income,
            expense,
            savings: checked_difference(income, expense, "bucket savings")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bucket {
    pub label: String,
    pub amounts: BucketAmounts,
}

/// Dense, chronologically ordered series of buckets.
///
/// Serializes as a JSON object keyed by bucket label, emitted in series order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BucketSeries {
    buckets: Vec<Bucket>,
}

impl BucketSeries {
    pub fn buckets(&self) -> &[Bucket] {
        &self.buckets
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn get(&self, label: &str) -> Option<&BucketAmounts> {
        self.buckets
            .iter()
            .find(|b| b.label == label)
            .map(|b| &b.amounts)
    }

    pub fn total_income(&self) -> AppResult<Decimal> {
        checked_sum(self.buckets.iter().map(|b| b.amounts.income), "series income")
    }

    pub fn total_expense(&self) -> AppResult<Decimal> {
        checked_sum(self.buckets.iter().map(|b| b.amounts.expense), "series expense")
    }
}

impl Serialize for BucketSeries {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.buckets.len()))?;
        for bucket in &self.buckets {
            map.serialize_entry(&bucket.label, &bucket.amounts)?;
        }
        map.end()
    }
}

/// Sum entry amounts per key.
pub fn group_amounts<K, F>(entries: &[LedgerEntry], key: F) -> AppResult<HashMap<K, Decimal>>
where
    K: Eq + Hash,
    F: Fn(&LedgerEntry) -> K,
{
    let mut grouped = HashMap::new();
    for entry in entries {
        let total = grouped.entry(key(entry)).or_insert(Decimal::ZERO);
        *total = total
            .checked_add(entry.amount)
            .ok_or_else(|| overflow("bucket total"))?;
    }
    Ok(grouped)
}

/// Join two sparse aggregates into one dense series following `frame`.
///
/// Keys absent from `frame` are dropped; frame keys absent from either
/// aggregate report zero on that side.
pub fn join_sparse<K, I>(
    frame: I,
    income: &HashMap<K, Decimal>,
    expense: &HashMap<K, Decimal>,
) -> AppResult<BucketSeries>
where
    K: Eq + Hash,
    I: IntoIterator<Item = (K, String)>,
{
    let buckets = frame
        .into_iter()
        .map(|(key, label)| {
            Ok(Bucket {
                label,
                amounts: BucketAmounts::new(
                    income.get(&key).copied().unwrap_or(Decimal::ZERO),
                    expense.get(&key).copied().unwrap_or(Decimal::ZERO),
                )?,
            })
        })
        .collect::<AppResult<Vec<_>>>()?;
    Ok(BucketSeries { buckets })
}

/// One bucket per day of `range`, labelled `YYYY-MM-DD`.
pub fn daily_series(
    range: &DateRange,
    incomes: &[LedgerEntry],
    expenses: &[LedgerEntry],
) -> AppResult<BucketSeries> {
    let by_day = |e: &LedgerEntry| e.date;
    join_sparse(
        range.days().map(|d| (d, d.format("%Y-%m-%d").to_string())),
        &group_amounts(incomes, by_day)?,
        &group_amounts(expenses, by_day)?,
    )
}

/// Twelve buckets, January through December, labelled by month name.
///
/// Entries are grouped by month number only; callers pass entries of a single year.
pub fn monthly_series(
    incomes: &[LedgerEntry],
    expenses: &[LedgerEntry],
) -> AppResult<BucketSeries> {
    let by_month = |e: &LedgerEntry| e.date.month();
    join_sparse(
        (1..=12u32).map(|m| (m, date_utils::month_name(m).to_string())),
        &group_amounts(incomes, by_month)?,
        &group_amounts(expenses, by_month)?,
    )
}

/// One bucket per year from `start_year` to `end_year` inclusive.
pub fn yearly_series(
    start_year: i32,
    end_year: i32,
    incomes: &[LedgerEntry],
    expenses: &[LedgerEntry],
) -> AppResult<BucketSeries> {
    let by_year = |e: &LedgerEntry| e.date.year();
    join_sparse(
        (start_year..=end_year).map(|y| (y, y.to_string())),
        &group_amounts(incomes, by_year)?,
        &group_amounts(expenses, by_year)?,
    )
}

/// One bucket per calendar month from the earliest to the latest entry,
/// labelled `YYYY-MM`. Empty when there are no entries at all.
pub fn month_span_series(
    incomes: &[LedgerEntry],
    expenses: &[LedgerEntry],
) -> AppResult<BucketSeries> {
    let dates = incomes.iter().chain(expenses.iter()).map(|e| e.date);
    let (Some(first), Some(last)) = (dates.clone().min(), dates.max()) else {
        return Ok(BucketSeries::default());
    };

    let frame = date_utils::months_between(
        date_utils::month_key(first),
        date_utils::month_key(last),
    )
    .into_iter()
    .map(|(y, m)| ((y, m), format!("{:04}-{:02}", y, m)));
    join_sparse(
        frame,
        &group_amounts(incomes, |e| date_utils::month_key(e.date))?,
        &group_amounts(expenses, |e| date_utils::month_key(e.date))?,
    )
}

#[derive(Debug, Clone, Serialize)]
pub struct DayTotals {
    pub date: String,
    #[serde(flatten)]
    pub amounts: BucketAmounts,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyTrend {
    pub weekly_insight: Vec<DayTotals>,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_week_income: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_week_expense: Decimal,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyComparison {
    pub monthly_comparison: BucketSeries,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YearlyComparison {
    pub yearly_comparison: BucketSeries,
}

async fn fetch_both<R: LedgerReader>(
    reader: &R,
    owner: &OwnerId,
    range: Option<&DateRange>,
) -> AppResult<(Vec<LedgerEntry>, Vec<LedgerEntry>)> {
    let filter = |kind| {
        let f = LedgerFilter::new(owner, kind);
        match range {
            Some(r) => f.within(r),
            None => f,
        }
    };
    tokio::try_join!(
        fetch_entries(reader, filter(EntryKind::Income)),
        fetch_entries(reader, filter(EntryKind::Expense)),
    )
}

/// Day-by-day totals for the seven days ending on `today`, oldest first.
pub async fn weekly_trend<R: LedgerReader>(
    reader: &R,
    owner: &OwnerId,
    today: NaiveDate,
) -> AppResult<WeeklyTrend> {
    let range = DateRange::trailing_days(today, WEEK_DAYS);
    let (incomes, expenses) = fetch_both(reader, owner, Some(&range)).await?;
    let series = daily_series(&range, &incomes, &expenses)?;

    tracing::debug!(owner = %owner, range = %range, "Computed weekly trend");

    Ok(WeeklyTrend {
        total_week_income: series.total_income()?,
        total_week_expense: series.total_expense()?,
        weekly_insight: series
            .buckets
            .into_iter()
            .map(|b| DayTotals {
                date: b.label,
                amounts: b.amounts,
            })
            .collect(),
    })
}

/// Income, expense and savings for each month of `year`.
///
/// Returns `None` when `year` is outside the supported calendar.
pub async fn monthly_comparison<R: LedgerReader>(
    reader: &R,
    owner: &OwnerId,
    year: i32,
) -> AppResult<Option<MonthlyComparison>> {
    let Some(range) = DateRange::for_year(year) else {
        return Ok(None);
    };
    let (incomes, expenses) = fetch_both(reader, owner, Some(&range)).await?;

    tracing::debug!(owner = %owner, year, "Computed monthly comparison");
    Ok(Some(MonthlyComparison {
        monthly_comparison: monthly_series(&incomes, &expenses)?,
    }))
}

/// Income, expense and savings for each year in `start_year..=end_year`.
///
/// Returns `None` when either bound is outside the supported calendar.
pub async fn yearly_trend<R: LedgerReader>(
    reader: &R,
    owner: &OwnerId,
    start_year: i32,
    end_year: i32,
) -> AppResult<Option<YearlyComparison>> {
    let Some(range) = DateRange::for_years(start_year, end_year) else {
        return Ok(None);
    };
    let (incomes, expenses) = fetch_both(reader, owner, Some(&range)).await?;

    tracing::debug!(owner = %owner, start_year, end_year, "Computed yearly trend");
    Ok(Some(YearlyComparison {
        yearly_comparison: yearly_series(start_year, end_year, &incomes, &expenses)?,
    }))
}

/// Month-by-month totals over the owner's entire history.
pub async fn history_by_month<R: LedgerReader>(
    reader: &R,
    owner: &OwnerId,
) -> AppResult<BucketSeries> {
    let (incomes, expenses) = fetch_both(reader, owner, None).await?;
    month_span_series(&incomes, &expenses)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::reader::testing::{dec, expense, income, owner, MemoryLedger, UnreachableLedger};

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_join_sparse_fills_missing_sides() {
        let income: HashMap<u32, Decimal> = [(1, dec("100")), (3, dec("50"))].into();
        let expense: HashMap<u32, Decimal> = [(2, dec("30")), (3, dec("80"))].into();
        let series = join_sparse(
            (1..=4u32).map(|k| (k, format!("k{}", k))),
            &income,
            &expense,
        )
        .unwrap();

        let labels: Vec<&str> = series.buckets().iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, vec!["k1", "k2", "k3", "k4"]);
        assert_eq!(series.get("k1"), Some(&BucketAmounts::new(dec("100"), dec("0")).unwrap()));
        assert_eq!(series.get("k2"), Some(&BucketAmounts::new(dec("0"), dec("30")).unwrap()));
        assert_eq!(series.get("k3").unwrap().savings, dec("-30"));
        assert_eq!(series.get("k4"), Some(&BucketAmounts::default()));
    }

    #[test]
    fn test_monthly_series_zero_fills_ten_months() {
        let incomes = vec![income(1, "Salary", "2000", "2024-03-01")];
        let expenses = vec![
            expense(2, "Travel", "700", "2024-07-12"),
            expense(3, "Food", "50", "2024-07-13"),
        ];
        let series = monthly_series(&incomes, &expenses).unwrap();

        assert_eq!(series.len(), 12);
        assert_eq!(series.buckets()[0].label, "January");
        assert_eq!(series.buckets()[11].label, "December");
        assert_eq!(series.get("March").unwrap().income, dec("2000"));
        assert_eq!(series.get("July").unwrap().expense, dec("750"));
        assert_eq!(series.get("July").unwrap().savings, dec("-750"));

        let empty = series
            .buckets()
            .iter()
            .filter(|b| b.amounts == BucketAmounts::default())
            .count();
        assert_eq!(empty, 10);
    }

    #[test]
    fn test_series_serializes_in_calendar_order() {
        let series = monthly_series(&[], &[]).unwrap();
        let json = serde_json::to_string(&series).unwrap();
        let january = json.find("\"January\"").unwrap();
        let february = json.find("\"February\"").unwrap();
        let december = json.find("\"December\"").unwrap();
        assert!(january < february && february < december);
        assert!(json.contains("\"April\":{\"income\":0.0,\"expense\":0.0,\"savings\":0.0}"));
    }

    #[test]
    fn test_yearly_series_reports_both_sides() {
        let incomes = vec![income(1, "Salary", "1000", "2022-05-01")];
        let expenses = vec![expense(2, "Rent", "400", "2023-05-01")];
        let series = yearly_series(2021, 2023, &incomes, &expenses).unwrap();

        assert_eq!(series.len(), 3);
        assert_eq!(series.get("2021"), Some(&BucketAmounts::default()));
        assert_eq!(series.get("2022"), Some(&BucketAmounts::new(dec("1000"), dec("0")).unwrap()));
        assert_eq!(series.get("2023"), Some(&BucketAmounts::new(dec("0"), dec("400")).unwrap()));
    }

    #[test]
    fn test_month_span_series_covers_gaps() {
        let incomes = vec![income(1, "Salary", "100", "2023-11-20")];
        let expenses = vec![expense(2, "Food", "40", "2024-02-02")];
        let series = month_span_series(&incomes, &expenses).unwrap();

        let labels: Vec<&str> = series.buckets().iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, vec!["2023-11", "2023-12", "2024-01", "2024-02"]);
        assert_eq!(series.get("2024-02").unwrap().expense, dec("40"));
        assert!(month_span_series(&[], &[]).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_weekly_trend_has_seven_ordered_days() {
        let ledger = MemoryLedger::new(vec![
            income(1, "Salary", "500", "2024-03-04"),
            expense(2, "Food", "20", "2024-03-04"),
            expense(3, "Food", "15", "2024-03-10"),
            expense(4, "Food", "99", "2024-03-03"),
            expense(5, "Food", "99", "2024-03-11"),
        ]);
        let trend = weekly_trend(&ledger, &owner(), date("2024-03-10"))
            .await
            .unwrap();

        let days: Vec<&str> = trend.weekly_insight.iter().map(|d| d.date.as_str()).collect();
        assert_eq!(
            days,
            vec![
                "2024-03-04",
                "2024-03-05",
                "2024-03-06",
                "2024-03-07",
                "2024-03-08",
                "2024-03-09",
                "2024-03-10"
            ]
        );
        assert_eq!(trend.weekly_insight[0].amounts.income, dec("500"));
        assert_eq!(trend.weekly_insight[0].amounts.expense, dec("20"));
        assert_eq!(trend.weekly_insight[3].amounts, BucketAmounts::default());
        assert_eq!(trend.total_week_income, dec("500"));
        assert_eq!(trend.total_week_expense, dec("35"));
    }

    #[tokio::test]
    async fn test_monthly_comparison_ignores_other_years() {
        let ledger = MemoryLedger::new(vec![
            income(1, "Salary", "1000", "2024-01-31"),
            income(2, "Salary", "1000", "2023-01-31"),
            expense(3, "Rent", "600", "2024-12-31"),
        ]);
        let report = monthly_comparison(&ledger, &owner(), 2024)
            .await
            .unwrap()
            .unwrap();
        let series = report.monthly_comparison;
        assert_eq!(series.get("January").unwrap().income, dec("1000"));
        assert_eq!(series.get("December").unwrap().expense, dec("600"));
        assert_eq!(series.total_income().unwrap(), dec("1000"));
    }

    #[tokio::test]
    async fn test_overflowing_bucket_is_an_error() {
        let ledger = MemoryLedger::new(vec![
            expense(1, "Rent", "50000000000000000000000000000", "2024-05-01"),
            expense(2, "Rent", "50000000000000000000000000000", "2024-05-20"),
        ]);
        let result = monthly_comparison(&ledger, &owner(), 2024).await;
        assert!(matches!(result, Err(crate::error::AppError::Internal(_))));
        assert!(history_by_month(&ledger, &owner()).await.is_err());
    }

    #[tokio::test]
    async fn test_out_of_calendar_year_is_none() {
        let ledger = MemoryLedger::default();
        assert!(monthly_comparison(&ledger, &owner(), 999_999)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_bucketing_propagates_store_failure() {
        assert!(weekly_trend(&UnreachableLedger, &owner(), date("2024-03-10"))
            .await
            .is_err());
        assert!(yearly_trend(&UnreachableLedger, &owner(), 2020, 2024)
            .await
            .is_err());
    }
}
