use indexmap::{IndexMap, IndexSet};
use serde::Serialize;
use serde_json::Value;

use crate::grid::request::SortDirection;

// A single typed condition on one field
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Predicate {
    In { field: String, values: Vec<Value> },
    Eq { field: String, value: Value },
    Like { field: String, pattern: String },
    Between { field: String, low: Value, high: Value },
}

impl Predicate {
    pub fn field(&self) -> &str {
        match self {
            Predicate::In { field, .. }
            | Predicate::Eq { field, .. }
            | Predicate::Like { field, .. }
            | Predicate::Between { field, .. } => field,
        }
    }

    /// `%term%` substring match.
    pub fn contains(field: &str, term: &str) -> Self {
        Predicate::Like {
            field: field.to_string(),
            pattern: format!("%{term}%"),
        }
    }
}

// Everything a grid request compiles to, before it touches storage
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryPlan {
    // relation paths to eager-load, parents first, e.g. "author", "author.profile"
    pub relations: IndexSet<String>,
    // ANDed per-column predicates
    pub filters: Vec<Predicate>,
    // global search, ORed internally and ANDed as one group
    pub global: Vec<Predicate>,
    // field -> direction, in column order
    pub order_by: IndexMap<String, SortDirection>,
    pub limit: u64,
    pub offset: u64,
}

impl QueryPlan {
    pub fn new(limit: u64, offset: u64) -> Self {
        Self {
            relations: IndexSet::new(),
            filters: Vec::new(),
            global: Vec::new(),
            order_by: IndexMap::new(),
            limit,
            offset,
        }
    }

    /// Whether any predicate narrows the base query.
    pub fn is_filtered(&self) -> bool {
        !self.filters.is_empty() || !self.global.is_empty()
    }
}
