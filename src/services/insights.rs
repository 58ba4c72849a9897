//! Prompt building and response parsing for AI generated insights.

use regex::Regex;
use rust_decimal::prelude::ToPrimitive;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::OnceLock;

use crate::models::LedgerEntry;

pub const INSIGHT_KEYS: [(&str, &str); 5] = [
    ("monthlySavings", "A summary of the monthly savings trend."),
    (
        "highestExpenseCategory",
        "The spending category with the largest total expense.",
    ),
    (
        "expenseReductionSuggestion",
        "A brief suggestion for reducing unnecessary expenses.",
    ),
    (
        "unusualSpending",
        "Any significant or unusual spending patterns observed.",
    ),
    (
        "nextMonthPredictedExpense",
        "A predicted expense total for the next month, based on the provided data.",
    ),
];

pub const INSIGHTS_SYSTEM_PROMPT: &str =
    "You are a personal finance analyst. Reply with a single valid JSON object and nothing else.";

pub const CHAT_SYSTEM_PROMPT: &str = "You are a financial assistant chatbot. \
     Answer the user's financial questions in one line based on their data.";

/// Parsed model output: a key/value map when the model returned JSON,
/// otherwise the cleaned-up text.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Insights {
    Structured(BTreeMap<String, String>),
    Text(String),
}

/// Entries as `{source|category, amount, date}` objects, in the given order.
pub fn insight_payload(entries: &[LedgerEntry]) -> Value {
    Value::Array(
        entries
            .iter()
            .map(|e| {
                let mut obj = serde_json::Map::new();
                obj.insert(e.kind.label_field().to_string(), json!(e.label));
                obj.insert(
                    "amount".to_string(),
                    json!(e.amount.to_f64().unwrap_or_default()),
                );
                obj.insert(
                    "date".to_string(),
                    json!(e.date.format("%Y-%m-%d").to_string()),
                );
                Value::Object(obj)
            })
            .collect(),
    )
}

pub fn build_insights_prompt(incomes: &[LedgerEntry], expenses: &[LedgerEntry]) -> String {
    let mut prompt = String::from(
        "Analyze the following income and expense data to provide concise, single-line \
         financial insights suitable for display on a dashboard.\n\n",
    );
    prompt.push_str(&format!("Income data: {}\n", insight_payload(incomes)));
    prompt.push_str(&format!("Expense data: {}\n\n", insight_payload(expenses)));
    prompt.push_str(
        "Generate a JSON object with the following keys, each holding a single-line string:\n\n",
    );
    for (key, description) in INSIGHT_KEYS {
        prompt.push_str(&format!("{}: {}\n", key, description));
    }
    prompt.push_str("\nEnsure the output is a valid JSON object that can be parsed directly.");
    prompt
}

pub fn build_chat_prompt(
    question: &str,
    incomes: &[LedgerEntry],
    expenses: &[LedgerEntry],
) -> String {
    format!(
        "User's financial data:\nIncome data: {}\nExpense data: {}\n\nUser's question: {}",
        insight_payload(incomes),
        insight_payload(expenses),
        question.trim()
    )
}

fn strip_fences(text: &str) -> String {
    text.replace("```json", "").replace("```", "").trim().to_string()
}

fn json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (start < end).then(|| &text[start..=end])
}

fn quoted_key() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#""\s*([^"]+?)\s*"\s*:"#).expect("valid regex"))
}

fn quoted_value() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#""\s*([^"]+?)\s*""#).expect("valid regex"))
}

/// Loose cleanup for output that is not valid JSON: drop fences and the
/// outer braces, then unquote keys and values.
fn clean_text(text: &str) -> String {
    let stripped = strip_fences(text);
    let stripped = stripped.strip_prefix('{').unwrap_or(&stripped);
    let stripped = stripped.strip_suffix('}').unwrap_or(stripped);
    let unquoted = quoted_key().replace_all(stripped, "$1:");
    quoted_value()
        .replace_all(&unquoted, "$1")
        .trim()
        .to_string()
}

pub fn parse_insights(text: &str) -> Insights {
    let stripped = strip_fences(text);
    let parsed = json_object(&stripped)
        .and_then(|obj| serde_json::from_str::<serde_json::Map<String, Value>>(obj).ok());

    match parsed {
        Some(map) => Insights::Structured(
            map.into_iter()
                .map(|(key, value)| {
                    let value = match value {
                        Value::String(s) => s,
                        other => other.to_string(),
                    };
                    (key, value)
                })
                .collect(),
        ),
        None => {
            tracing::warn!("AI insights were not valid JSON, falling back to text cleanup");
            Insights::Text(clean_text(text))
        }
    }
}
