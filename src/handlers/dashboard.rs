use axum::extract::State;
use axum::response::Json;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::db::queries::ledger::LedgerFilter;
use crate::db::fetch_entries;
use crate::error::{AppError, AppResult};
use crate::handlers::analytics::RangePairRequest;
use crate::models::{AiSettings, EntryKind, LedgerEntry, OwnerId};
use crate::services::comparison::{self, DetailedComparison};
use crate::services::dashboard::{self, DashboardSummary};
use crate::services::{ai_client, insights};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct InsightsResponse {
    pub insights: insights::Insights,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub user_query: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub response: String,
}

pub async fn index(State(state): State<AppState>, owner: OwnerId) -> AppResult<Json<DashboardSummary>> {
    let today = chrono::Local::now().date_naive();
    debug!(owner = %owner, %today, "Loading dashboard");

    Ok(Json(
        dashboard::dashboard_summary(&state.db, &owner, today).await?,
    ))
}

pub async fn compare(
    State(state): State<AppState>,
    owner: OwnerId,
    Json(request): Json<RangePairRequest>,
) -> AppResult<Json<DetailedComparison>> {
    let (range1, range2) = request.ranges()?;
    debug!(owner = %owner, %range1, %range2, "Comparing date ranges with history");

    let detailed = comparison::compare_with_history(
        &state.db,
        &owner,
        range1,
        range2,
        &state.config.analytics,
    )
    .await?;
    Ok(Json(detailed))
}

async fn all_entries(
    state: &AppState,
    owner: &OwnerId,
) -> AppResult<(Vec<LedgerEntry>, Vec<LedgerEntry>)> {
    tokio::try_join!(
        fetch_entries(&state.db, LedgerFilter::new(owner, EntryKind::Income)),
        fetch_entries(&state.db, LedgerFilter::new(owner, EntryKind::Expense)),
    )
}

fn ai_settings(state: &AppState) -> AppResult<&AiSettings> {
    state.config.ai.as_ref().ok_or(AppError::AiUnavailable)
}

pub async fn generate_insights(
    State(state): State<AppState>,
    owner: OwnerId,
) -> AppResult<Json<InsightsResponse>> {
    let (incomes, expenses) = all_entries(&state, &owner).await?;
    if incomes.is_empty() || expenses.is_empty() {
        return Err(AppError::Validation("Not enough data for insights.".into()));
    }

    let settings = ai_settings(&state)?;
    info!(
        owner = %owner,
        provider = settings.provider.as_str(),
        "Generating AI insights"
    );

    let prompt = insights::build_insights_prompt(&incomes, &expenses);
    let text = ai_client::generate_text(settings, insights::INSIGHTS_SYSTEM_PROMPT, &prompt).await?;

    Ok(Json(InsightsResponse {
        insights: insights::parse_insights(&text),
    }))
}

pub async fn chatbot(
    State(state): State<AppState>,
    owner: OwnerId,
    Json(request): Json<ChatRequest>,
) -> AppResult<Json<ChatResponse>> {
    let question = request
        .user_query
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .ok_or_else(|| AppError::Validation("Please provide a query.".into()))?;

    let settings = ai_settings(&state)?;
    let (incomes, expenses) = all_entries(&state, &owner).await?;
    debug!(owner = %owner, question_len = question.len(), "Answering chatbot query");

    let prompt = insights::build_chat_prompt(question, &incomes, &expenses);
    let response = ai_client::generate_text(settings, insights::CHAT_SYSTEM_PROMPT, &prompt).await?;

    Ok(Json(ChatResponse { response }))
}
