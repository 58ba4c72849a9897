use axum::extract::{Path, State};
use axum::response::Json;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::date_utils::parse_date;
use crate::db::queries::ledger::{self, LedgerFilter};
use crate::error::{AppError, AppResult};
use crate::models::{EntryKind, LedgerEntry, NewLedgerEntry, OwnerId};
use crate::state::AppState;

/// Largest amount a single entry may carry. Leaves headroom for summing an
/// owner's whole history without leaving the `Decimal` range.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(2_764_472_320, 232_830, 0, false, 0);

/// Amounts are stored in cents.
pub const AMOUNT_SCALE: u32 = 2;

/// Body of an add request. Incomes carry `source`, expenses `category`.
#[derive(Debug, Deserialize)]
pub struct NewEntryRequest {
    pub source: Option<String>,
    pub category: Option<String>,
    pub amount: Option<Decimal>,
    pub date: Option<String>,
    pub icon: Option<String>,
}

impl NewEntryRequest {
    pub fn into_entry(self, owner: OwnerId, kind: EntryKind) -> AppResult<NewLedgerEntry> {
        let label = match kind {
            EntryKind::Income => self.source,
            EntryKind::Expense => self.category,
        };
        let (Some(label), Some(amount)) = (
            label.map(|l| l.trim().to_string()).filter(|l| !l.is_empty()),
            self.amount,
        ) else {
            return Err(AppError::Validation("Please enter all fields".into()));
        };

        let amount =
            amount.round_dp_with_strategy(AMOUNT_SCALE, RoundingStrategy::MidpointAwayFromZero);
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(AppError::Validation("Amount must not be negative".into()));
        }
        if amount > MAX_AMOUNT {
            return Err(AppError::Validation(format!(
                "Amount must not exceed {}",
                MAX_AMOUNT
            )));
        }

        let date = match self.date.as_deref().map(str::trim).filter(|d| !d.is_empty()) {
            Some(d) => parse_date(d)?,
            None => chrono::Local::now().date_naive(),
        };

        Ok(NewLedgerEntry {
            owner_id: owner,
            kind,
            amount,
            label,
            icon: self.icon.filter(|i| !i.trim().is_empty()),
            date,
        })
    }
}

fn kind_title(kind: EntryKind) -> &'static str {
    match kind {
        EntryKind::Income => "Income",
        EntryKind::Expense => "Expense",
    }
}

async fn add(
    state: AppState,
    owner: OwnerId,
    kind: EntryKind,
    request: NewEntryRequest,
) -> AppResult<Json<LedgerEntry>> {
    let new_entry = request.into_entry(owner, kind)?;
    let conn = state.db.get()?;

    let id = ledger::create_entry(&conn, &new_entry)?;
    info!(entry_id = id, kind = kind.as_str(), "Ledger entry added");

    let entry = ledger::get_entry(&conn, &new_entry.owner_id, kind, id)?
        .ok_or_else(|| AppError::Internal(format!("entry {} vanished after insert", id)))?;
    Ok(Json(entry))
}

async fn list(state: AppState, owner: OwnerId, kind: EntryKind) -> AppResult<Json<Vec<LedgerEntry>>> {
    let conn = state.db.get()?;
    let entries = ledger::list_entries(&conn, &LedgerFilter::new(&owner, kind))?;
    Ok(Json(entries))
}

async fn remove(state: AppState, owner: OwnerId, kind: EntryKind, id: i64) -> AppResult<Json<Value>> {
    debug!(entry_id = id, owner = %owner, kind = kind.as_str(), "Deleting ledger entry");
    let conn = state.db.get()?;

    if !ledger::delete_entry(&conn, &owner, kind, id)? {
        return Err(AppError::NotFound(format!("{} not found", kind_title(kind))));
    }
    Ok(Json(json!({
        "message": format!("{} deleted successfully", kind_title(kind))
    })))
}

pub async fn add_income(
    State(state): State<AppState>,
    owner: OwnerId,
    Json(request): Json<NewEntryRequest>,
) -> AppResult<Json<LedgerEntry>> {
    add(state, owner, EntryKind::Income, request).await
}

pub async fn add_expense(
    State(state): State<AppState>,
    owner: OwnerId,
    Json(request): Json<NewEntryRequest>,
) -> AppResult<Json<LedgerEntry>> {
    add(state, owner, EntryKind::Expense, request).await
}

pub async fn list_incomes(
    State(state): State<AppState>,
    owner: OwnerId,
) -> AppResult<Json<Vec<LedgerEntry>>> {
    list(state, owner, EntryKind::Income).await
}

pub async fn list_expenses(
    State(state): State<AppState>,
    owner: OwnerId,
) -> AppResult<Json<Vec<LedgerEntry>>> {
    list(state, owner, EntryKind::Expense).await
}

pub async fn delete_income(
    State(state): State<AppState>,
    owner: OwnerId,
    Path(id): Path<i64>,
) -> AppResult<Json<Value>> {
    remove(state, owner, EntryKind::Income, id).await
}

pub async fn delete_expense(
    State(state): State<AppState>,
    owner: OwnerId,
    Path(id): Path<i64>,
) -> AppResult<Json<Value>> {
    remove(state, owner, EntryKind::Expense, id).await
}
