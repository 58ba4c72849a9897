pub mod analytics;
pub mod dashboard;
pub mod entries;

use axum::routing::{delete, get, post};
use axum::Router;

use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        // Period analytics
        .route("/api/v1/analytics", post(analytics::compare))
        .route("/api/v1/analytics/monthly", post(analytics::monthly))
        .route("/api/v1/analytics/yearly", post(analytics::yearly))
        .route("/api/v1/analytics/weekly", get(analytics::weekly))
        // Dashboard
        .route("/api/v1/dashboard", get(dashboard::index))
        .route("/api/v1/dashboard/compare", post(dashboard::compare))
        .route("/api/v1/dashboard/insights", get(dashboard::generate_insights))
        .route("/api/v1/dashboard/chatbot", post(dashboard::chatbot))
        // Income entries
        .route("/api/v1/income/add", post(entries::add_income))
        .route("/api/v1/income/get", get(entries::list_incomes))
        .route("/api/v1/income/:id", delete(entries::delete_income))
        // Expense entries
        .route("/api/v1/expense/add", post(entries::add_expense))
        .route("/api/v1/expense/get", get(entries::list_expenses))
        .route("/api/v1/expense/:id", delete(entries::delete_expense))
        // Health check
        .route("/health", get(health))
}

async fn health() -> &'static str {
    "OK"
}
