use axum::extract::State;
use axum::response::Json;
use serde::Deserialize;
use tracing::debug;

use crate::date_utils::{parse_date, DateRange};
use crate::error::{AppError, AppResult};
use crate::models::OwnerId;
use crate::services::calendar::{self, MonthlyComparison, WeeklyTrend, YearlyComparison};
use crate::services::comparison::{self, ComparisonReport};
use crate::state::AppState;

/// Widest year span the yearly trend will bucket.
pub const MAX_YEAR_SPAN: i32 = 100;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RangePairRequest {
    pub start_date1: Option<String>,
    pub end_date1: Option<String>,
    pub start_date2: Option<String>,
    pub end_date2: Option<String>,
}

impl RangePairRequest {
    /// Both ranges, or a validation error when any bound is missing or unparseable.
    pub fn ranges(&self) -> AppResult<(DateRange, DateRange)> {
        let required = |value: &Option<String>| -> AppResult<String> {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .ok_or_else(|| AppError::Validation("All date ranges are required".into()))
        };

        let start1 = required(&self.start_date1)?;
        let end1 = required(&self.end_date1)?;
        let start2 = required(&self.start_date2)?;
        let end2 = required(&self.end_date2)?;

        Ok((
            DateRange::from_dates(parse_date(&start1)?, parse_date(&end1)?),
            DateRange::from_dates(parse_date(&start2)?, parse_date(&end2)?),
        ))
    }
}

/// A year sent either as a JSON number or as a numeric string. `0` and an
/// empty string count as not sent.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum YearParam {
    Number(i64),
    Text(String),
}

impl YearParam {
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Number(n) => *n == 0,
            Self::Text(s) => s.trim().is_empty(),
        }
    }

    pub fn to_year(&self) -> AppResult<i32> {
        let parsed = match self {
            Self::Number(n) => i32::try_from(*n).ok(),
            Self::Text(s) => s.trim().parse::<i32>().ok(),
        };
        parsed.ok_or_else(|| AppError::Validation("Invalid year".into()))
    }
}

fn provided(param: &Option<YearParam>) -> Option<&YearParam> {
    param.as_ref().filter(|p| !p.is_blank())
}

#[derive(Debug, Deserialize)]
pub struct MonthlyRequest {
    pub year: Option<YearParam>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YearlyRequest {
    pub start_year: Option<YearParam>,
    pub end_year: Option<YearParam>,
}

pub async fn compare(
    State(state): State<AppState>,
    owner: OwnerId,
    Json(request): Json<RangePairRequest>,
) -> AppResult<Json<ComparisonReport>> {
    let (range1, range2) = request.ranges()?;
    debug!(owner = %owner, %range1, %range2, "Comparing date ranges");

    let report = comparison::compare_ranges(
        &state.db,
        &owner,
        range1,
        range2,
        &state.config.analytics,
    )
    .await?;
    Ok(Json(report))
}

pub async fn monthly(
    State(state): State<AppState>,
    owner: OwnerId,
    Json(request): Json<MonthlyRequest>,
) -> AppResult<Json<MonthlyComparison>> {
    let year = provided(&request.year)
        .ok_or_else(|| AppError::Validation("Year is required.".into()))?
        .to_year()?;
    debug!(owner = %owner, year, "Loading monthly comparison");

    calendar::monthly_comparison(&state.db, &owner, year)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::Validation("Invalid year".into()))
}

pub async fn yearly(
    State(state): State<AppState>,
    owner: OwnerId,
    Json(request): Json<YearlyRequest>,
) -> AppResult<Json<YearlyComparison>> {
    let (Some(start), Some(end)) = (
        provided(&request.start_year),
        provided(&request.end_year),
    ) else {
        return Err(AppError::Validation(
            "Both startYear and endYear are required.".into(),
        ));
    };
    let start_year = start.to_year()?;
    let end_year = end.to_year()?;

    if end_year < start_year {
        return Err(AppError::Validation(
            "endYear must not be before startYear.".into(),
        ));
    }
    if end_year - start_year >= MAX_YEAR_SPAN {
        return Err(AppError::Validation(format!(
            "Year span must be at most {} years.",
            MAX_YEAR_SPAN
        )));
    }
    debug!(owner = %owner, start_year, end_year, "Loading yearly trend");

    calendar::yearly_trend(&state.db, &owner, start_year, end_year)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::Validation("Invalid year".into()))
}

pub async fn weekly(State(state): State<AppState>, owner: OwnerId) -> AppResult<Json<WeeklyTrend>> {
    let today = chrono::Local::now().date_naive();
    debug!(owner = %owner, %today, "Loading weekly trend");

    Ok(Json(calendar::weekly_trend(&state.db, &owner, today).await?))
}
