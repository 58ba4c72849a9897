pub mod aggregation;
pub mod ai_client;
pub mod calendar;
pub mod comparison;
pub mod dashboard;
pub mod insights;
