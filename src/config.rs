use rust_decimal::Decimal;
use std::env;
use std::path::PathBuf;

use crate::models::{AiProvider, AiSettings};

/// Relative expense change between two ranges above which an anomaly is reported.
pub const DEFAULT_ANOMALY_THRESHOLD: Decimal = Decimal::from_parts(15, 0, 0, false, 1);

pub const DEFAULT_TOP_CATEGORIES: usize = 3;

/// Tunables for the comparison engine.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyticsSettings {
    pub anomaly_threshold: Decimal,
    pub top_category_count: usize,
}

impl Default for AnalyticsSettings {
    fn default() -> Self {
        Self {
            anomaly_threshold: DEFAULT_ANOMALY_THRESHOLD,
            top_category_count: DEFAULT_TOP_CATEGORIES,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_path: PathBuf,
    pub migrations_path: PathBuf,
    pub analytics: AnalyticsSettings,
    pub ai: Option<AiSettings>,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let analytics = AnalyticsSettings {
            anomaly_threshold: env::var("SPENDWISE_ANOMALY_THRESHOLD")
                .ok()
                .and_then(|v| v.trim().parse::<Decimal>().ok())
                .filter(|v| !v.is_sign_negative())
                .unwrap_or(DEFAULT_ANOMALY_THRESHOLD),
            top_category_count: env::var("SPENDWISE_TOP_CATEGORIES")
                .ok()
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(DEFAULT_TOP_CATEGORIES),
        };

        Self {
            host: env::var("SPENDWISE_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env::var("SPENDWISE_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8000),
            database_path: env::var("SPENDWISE_DATABASE_URL")
                .map(|v| {
                    PathBuf::from(
                        v.strip_prefix("sqlite://")
                            .or_else(|| v.strip_prefix("sqlite:"))
                            .unwrap_or(&v),
                    )
                })
                .unwrap_or_else(|_| PathBuf::from("data/spendwise.db")),
            migrations_path: env::var("SPENDWISE_MIGRATIONS_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("migrations")),
            analytics,
            ai: ai_settings_from_env(),
        }
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn ai_settings_from_env() -> Option<AiSettings> {
    let raw = env::var("SPENDWISE_AI_PROVIDER").ok()?;
    let Ok(provider) = raw.parse::<AiProvider>() else {
        tracing::warn!(provider = %raw, "Unknown SPENDWISE_AI_PROVIDER, AI features disabled");
        return None;
    };

    let mut settings = AiSettings::new(provider);
    if let Ok(url) = env::var("SPENDWISE_AI_BASE_URL") {
        settings.base_url = url;
    }
    if let Ok(model) = env::var("SPENDWISE_AI_MODEL") {
        settings.model = model;
    }
    if let Ok(key) = env::var("SPENDWISE_AI_API_KEY") {
        settings.api_key = key;
    }

    if !settings.is_usable() {
        tracing::warn!(
            provider = provider.as_str(),
            "SPENDWISE_AI_API_KEY is not set, AI features disabled"
        );
        return None;
    }

    Some(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_threshold_is_one_and_a_half() {
        assert_eq!(DEFAULT_ANOMALY_THRESHOLD, "1.5".parse::<Decimal>().unwrap());
        let defaults = AnalyticsSettings::default();
        assert_eq!(defaults.top_category_count, 3);
    }
}
