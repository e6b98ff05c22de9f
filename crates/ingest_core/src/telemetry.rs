use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TelemetryCategory {
    Ingestion,
    Query,
    Chat,
    Listing,
}

impl fmt::Display for TelemetryCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TelemetryCategory::Ingestion => "ingestion",
            TelemetryCategory::Query => "query",
            TelemetryCategory::Chat => "chat",
            TelemetryCategory::Listing => "listing",
        };
        f.write_str(name)
    }
}

/// Last captured request/response pair for one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryRecord {
    pub category: TelemetryCategory,
    pub request: Option<Value>,
    pub response: Option<Value>,
    pub captured_at: DateTime<Utc>,
}

/// Holds at most one record per category; a new record overwrites the old one.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TelemetryStore {
    records: BTreeMap<TelemetryCategory, TelemetryRecord>,
}

impl TelemetryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `record`, returning the one it replaced.
    pub fn record(&mut self, record: TelemetryRecord) -> Option<TelemetryRecord> {
        self.records.insert(record.category, record)
    }

    pub fn get(&self, category: TelemetryCategory) -> Option<&TelemetryRecord> {
        self.records.get(&category)
    }

    pub fn categories(&self) -> Vec<TelemetryCategory> {
        self.records.keys().copied().collect()
    }

    pub fn records(&self) -> impl Iterator<Item = &TelemetryRecord> {
        self.records.values()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
