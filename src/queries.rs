//! Catalog of the queries this project runs against the execution backend.

use std::collections::HashMap;

use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use serde_json::{Map, Value};

/// Named, typed parameter attached to a query before submission.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryParameter {
    Date { name: String, value: NaiveDate },
    Text { name: String, value: String },
}

impl QueryParameter {
    pub fn date(name: &str, value: NaiveDate) -> Self {
        Self::Date {
            name: name.to_string(),
            value,
        }
    }

    pub fn text(name: &str, value: &str) -> Self {
        Self::Text {
            name: name.to_string(),
            value: value.to_string(),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Date { name, .. } | Self::Text { name, .. } => name,
        }
    }

    /// Wire representation the execution API expects. Date parameters
    /// render as `YYYY-MM-DD 00:00:00`.
    pub fn to_value(&self) -> Value {
        match self {
            Self::Date { value, .. } => {
                Value::String(format!("{} 00:00:00", value.format("%Y-%m-%d")))
            }
            Self::Text { value, .. } => Value::String(value.clone()),
        }
    }
}

/// A query parameterized for one submission.
#[derive(Debug, Clone)]
pub struct Query {
    pub query_id: u32,
    pub name: String,
    pub params: Vec<QueryParameter>,
}

impl Query {
    /// The `query_parameters` object for the execution request body.
    pub fn request_parameters(&self) -> Map<String, Value> {
        self.params
            .iter()
            .map(|p| (p.name().to_string(), p.to_value()))
            .collect()
    }
}

/// Binds a human-readable name to a remote query id and the path of its
/// source definition under `queries/`. The source file is an opaque
/// reference; it is never read here.
#[derive(Debug, Clone)]
pub struct QueryData {
    pub name: String,
    pub query_id: u32,
    pub filepath: String,
}

impl QueryData {
    pub fn new(name: &str, query_id: u32, filepath: &str) -> Self {
        Self {
            name: name.to_string(),
            query_id,
            filepath: filepath.to_string(),
        }
    }

    /// Builds a fresh query carrying the given parameters. Each call
    /// returns an independent value; parameter lists are never shared
    /// between invocations.
    pub fn with_params(&self, params: Vec<QueryParameter>) -> Query {
        Query {
            query_id: self.query_id,
            name: self.name.clone(),
            params,
        }
    }
}

/// Read-only registry of every query known to this project, keyed by
/// logical name. Built once and injected into whatever fetches.
#[derive(Debug, Clone)]
pub struct QueryCatalog {
    queries: HashMap<String, QueryData>,
}

impl QueryCatalog {
    pub fn get(&self, key: &str) -> Result<&QueryData> {
        self.queries
            .get(key)
            .ok_or_else(|| anyhow!("no query registered under {key}"))
    }
}

impl Default for QueryCatalog {
    fn default() -> Self {
        let mut queries = HashMap::new();
        queries.insert(
            "TRADES".to_string(),
            QueryData::new("Trades for Token Pair", 0, "trades.sql"),
        );
        Self { queries }
    }
}
