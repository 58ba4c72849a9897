use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identity of the principal whose entries are being read or written.
///
/// Supplied by the upstream authentication layer and passed explicitly into
/// every query; nothing in the crate looks the owner up from ambient state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(String);

impl OwnerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    Income,
    Expense,
}

impl EntryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
        }
    }

    /// Name of the label field as submitted by clients.
    pub fn label_field(&self) -> &'static str {
        match self {
            Self::Income => "source",
            Self::Expense => "category",
        }
    }
}

impl FromStr for EntryKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "income" => Ok(Self::Income),
            "expense" => Ok(Self::Expense),
            _ => Err(()),
        }
    }
}

/// A single income or expense record.
///
/// `label` is the category for expenses and the source for incomes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    pub id: i64,
    pub owner_id: OwnerId,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub label: String,
    pub icon: Option<String>,
    pub date: NaiveDate,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct NewLedgerEntry {
    pub owner_id: OwnerId,
    pub kind: EntryKind,
    pub amount: Decimal,
    pub label: String,
    pub icon: Option<String>,
    pub date: NaiveDate,
}
