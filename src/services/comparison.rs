//! Two-range comparison: totals, category deltas, savings rates and anomalies.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use crate::config::AnalyticsSettings;
use crate::date_utils::DateRange;
use crate::db::queries::ledger::LedgerFilter;
use crate::db::{fetch_entries, LedgerReader};
use crate::error::AppResult;
use crate::models::{EntryKind, LedgerEntry, OwnerId};
use crate::services::aggregation::{
    breakdown_by_category, checked_difference, overflow, total_amount, CategoryTotals,
};
use crate::services::calendar::{self, BucketSeries};

const ONE_HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// Income and expense entries of one range.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RangeEntries {
    pub income: Vec<LedgerEntry>,
    pub expense: Vec<LedgerEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RangeSummary {
    #[serde(flatten)]
    pub range: DateRange,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_income: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_expense: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub balance: Decimal,
}

impl RangeSummary {
    fn new(range: DateRange, entries: &RangeEntries) -> AppResult<Self> {
        let total_income = total_amount(&entries.income)?;
        let total_expense = total_amount(&entries.expense)?;
        Ok(Self {
            range,
            total_income,
            total_expense,
            balance: checked_difference(total_income, total_expense, "range balance")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryDelta {
    #[serde(with = "rust_decimal::serde::float")]
    pub amount1: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount2: Decimal,
    pub percentage_change: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RangeDifference {
    #[serde(with = "rust_decimal::serde::float")]
    pub income_difference: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub expense_difference: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub balance_difference: Decimal,
    pub category_comparison: BTreeMap<String, CategoryDelta>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryAmount {
    pub category: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SavingsRates {
    pub range1: String,
    pub range2: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonReport {
    pub range1: RangeSummary,
    pub range2: RangeSummary,
    pub comparison: RangeDifference,
    pub top_spending_categories: Vec<CategoryAmount>,
    pub savings_rate: SavingsRates,
    /// `None` when nothing was flagged; serialized as `null`.
    pub anomalies: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RangeDetails {
    pub range1: RangeEntries,
    pub range2: RangeEntries,
}

/// Comparison report plus the entries behind it and an all-history monthly series.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailedComparison {
    #[serde(flatten)]
    pub report: ComparisonReport,
    pub details: RangeDetails,
    pub monthly_comparison: BucketSeries,
}

/// Format a percentage with exactly two decimals and a trailing `%`.
pub fn format_percent(value: Decimal) -> String {
    let rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let rounded = if rounded.is_zero() { Decimal::ZERO } else { rounded };
    format!("{:.2}%", rounded)
}

/// Relative change from `amount1` to `amount2`, in percent.
///
/// A zero baseline has no defined ratio: it reports 100% when anything was
/// spent in the second range and 0% otherwise.
pub fn percentage_change(amount1: Decimal, amount2: Decimal) -> AppResult<Decimal> {
    if amount1.is_zero() {
        return Ok(if amount2 > Decimal::ZERO {
            ONE_HUNDRED
        } else {
            Decimal::ZERO
        });
    }
    let delta = checked_difference(amount2, amount1, "percentage change")?;
    percent_of(delta, amount1, "percentage change")
}

/// Share of income left after expenses, in percent. Zero when there was no income.
pub fn savings_rate(total_income: Decimal, total_expense: Decimal) -> AppResult<Decimal> {
    if total_income.is_zero() {
        return Ok(Decimal::ZERO);
    }
    let saved = checked_difference(total_income, total_expense, "savings rate")?;
    percent_of(saved, total_income, "savings rate")
}

/// `part / whole * 100`; `whole` must be non-zero.
fn percent_of(part: Decimal, whole: Decimal, context: &str) -> AppResult<Decimal> {
    part.checked_div(whole)
        .and_then(|ratio| ratio.checked_mul(ONE_HUNDRED))
        .ok_or_else(|| overflow(context))
}

/// Per-label deltas over the union of both label sets.
pub fn category_comparison(
    totals1: &CategoryTotals,
    totals2: &CategoryTotals,
) -> AppResult<BTreeMap<String, CategoryDelta>> {
    let labels: BTreeSet<&String> = totals1.keys().chain(totals2.keys()).collect();
    labels
        .into_iter()
        .map(|label| {
            let amount1 = totals1.get(label).copied().unwrap_or(Decimal::ZERO);
            let amount2 = totals2.get(label).copied().unwrap_or(Decimal::ZERO);
            let delta = CategoryDelta {
                amount1,
                amount2,
                percentage_change: format_percent(percentage_change(amount1, amount2)?),
            };
            Ok((label.clone(), delta))
        })
        .collect()
}

/// The `count` largest categories, amount descending, ties by label ascending.
pub fn top_categories(totals: &CategoryTotals, count: usize) -> Vec<CategoryAmount> {
    let mut ranked: Vec<(&String, &Decimal)> = totals.iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
    ranked
        .into_iter()
        .take(count)
        .map(|(category, amount)| CategoryAmount {
            category: category.clone(),
            amount: *amount,
        })
        .collect()
}

/// Flag an expense spike whose relative change exceeds `threshold`.
///
/// A zero baseline cannot be evaluated and is never flagged.
pub fn detect_anomalies(
    range1: &RangeSummary,
    range2: &RangeSummary,
    threshold: Decimal,
) -> AppResult<Option<Vec<String>>> {
    let baseline = range1.total_expense;
    if baseline.is_zero() {
        return Ok(None);
    }

    let change = checked_difference(range2.total_expense, baseline, "expense change")?;
    let relative = change
        .checked_div(baseline)
        .ok_or_else(|| overflow("expense change"))?
        .abs();
    if relative <= threshold {
        return Ok(None);
    }
    let percent = relative
        .checked_mul(ONE_HUNDRED)
        .ok_or_else(|| overflow("expense change"))?;
    Ok(Some(vec![format!(
        "Expense spike detected between range 1 ({}) and range 2 ({}): expenses changed by {}.",
        range1.range,
        range2.range,
        format_percent(percent)
    )]))
}

/// Build the comparison report from already-fetched entries.
pub fn build_report(
    range1: DateRange,
    entries1: &RangeEntries,
    range2: DateRange,
    entries2: &RangeEntries,
    settings: &AnalyticsSettings,
) -> AppResult<ComparisonReport> {
    let summary1 = RangeSummary::new(range1, entries1)?;
    let summary2 = RangeSummary::new(range2, entries2)?;

    let categories1 = breakdown_by_category(&entries1.expense)?;
    let categories2 = breakdown_by_category(&entries2.expense)?;

    let comparison = RangeDifference {
        income_difference: checked_difference(
            summary2.total_income,
            summary1.total_income,
            "income difference",
        )?,
        expense_difference: checked_difference(
            summary2.total_expense,
            summary1.total_expense,
            "expense difference",
        )?,
        balance_difference: checked_difference(
            summary2.balance,
            summary1.balance,
            "balance difference",
        )?,
        category_comparison: category_comparison(&categories1, &categories2)?,
    };

    let savings_rate = SavingsRates {
        range1: format_percent(savings_rate(summary1.total_income, summary1.total_expense)?),
        range2: format_percent(savings_rate(summary2.total_income, summary2.total_expense)?),
    };

    let anomalies = detect_anomalies(&summary1, &summary2, settings.anomaly_threshold)?;

    Ok(ComparisonReport {
        top_spending_categories: top_categories(&categories2, settings.top_category_count),
        range1: summary1,
        range2: summary2,
        comparison,
        savings_rate,
        anomalies,
    })
}

async fn fetch_range<R: LedgerReader>(
    reader: &R,
    owner: &OwnerId,
    range1: &DateRange,
    range2: &DateRange,
) -> AppResult<(RangeEntries, RangeEntries)> {
    let filter =
        |kind: EntryKind, range: &DateRange| LedgerFilter::new(owner, kind).within(range);
    let (income1, expense1, income2, expense2) = tokio::try_join!(
        fetch_entries(reader, filter(EntryKind::Income, range1)),
        fetch_entries(reader, filter(EntryKind::Expense, range1)),
        fetch_entries(reader, filter(EntryKind::Income, range2)),
        fetch_entries(reader, filter(EntryKind::Expense, range2)),
    )?;
    Ok((
        RangeEntries {
            income: income1,
            expense: expense1,
        },
        RangeEntries {
            income: income2,
            expense: expense2,
        },
    ))
}

/// Compare an owner's finances over two ranges.
///
/// Ranges are positional: `range1` is the baseline whatever its dates.
/// Overlapping, reversed and empty ranges all produce a report.
pub async fn compare_ranges<R: LedgerReader>(
    reader: &R,
    owner: &OwnerId,
    range1: DateRange,
    range2: DateRange,
    settings: &AnalyticsSettings,
) -> AppResult<ComparisonReport> {
    let (entries1, entries2) = fetch_range(reader, owner, &range1, &range2).await?;
    let report = build_report(range1, &entries1, range2, &entries2, settings)?;

    tracing::debug!(
        owner = %owner,
        range1 = %range1,
        range2 = %range2,
        categories = report.comparison.category_comparison.len(),
        anomalies = report.anomalies.as_ref().map_or(0, Vec::len),
        "Compared ranges"
    );
    Ok(report)
}

/// [`compare_ranges`] plus the underlying entries and a month-by-month series
/// over the owner's whole history, independent of the two ranges.
pub async fn compare_with_history<R: LedgerReader>(
    reader: &R,
    owner: &OwnerId,
    range1: DateRange,
    range2: DateRange,
    settings: &AnalyticsSettings,
) -> AppResult<DetailedComparison> {
    let (ranges, history) = tokio::try_join!(
        fetch_range(reader, owner, &range1, &range2),
        calendar::history_by_month(reader, owner),
    )?;
    let (entries1, entries2) = ranges;
    let report = build_report(range1, &entries1, range2, &entries2, settings)?;

    tracing::debug!(
        owner = %owner,
        months = history.len(),
        "Compared ranges with monthly history"
    );
    Ok(DetailedComparison {
        report,
        details: RangeDetails {
            range1: entries1,
            range2: entries2,
        },
        monthly_comparison: history,
    })
}
