use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

pub const DEFAULT_DISPLAY_LENGTH: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    /// Anything but `desc` (any case) sorts ascending.
    pub fn parse(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("desc") {
            SortDirection::Desc
        } else {
            SortDirection::Asc
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// Per-column filter payload that is not valid JSON.
#[derive(Debug, Error)]
#[error("column {column}: undecodable filter {raw:?}: {source}")]
pub struct FilterDecodeError {
    pub column: usize,
    pub raw: String,
    #[source]
    pub source: serde_json::Error,
}

/// Pagination, sorting and filtering parameters of one grid request.
///
/// Column indices refer to positions in the model's list properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GridRequest {
    /// Correlation token echoed back in the response.
    pub echo: Option<String>,
    pub display_start: u64,
    /// Page size; zero or negative means the default.
    #[serde(deserialize_with = "page_length")]
    pub display_length: u64,
    pub sort_columns: Vec<(usize, SortDirection)>,
    /// Decoded per-column filter values.
    pub column_filters: BTreeMap<usize, Value>,
    pub global_filter: String,
    /// Client-side switches; a missing entry means enabled.
    pub sortable: BTreeMap<usize, bool>,
    pub searchable: BTreeMap<usize, bool>,
}

impl Default for GridRequest {
    fn default() -> Self {
        Self {
            echo: None,
            display_start: 0,
            display_length: DEFAULT_DISPLAY_LENGTH,
            sort_columns: Vec::new(),
            column_filters: BTreeMap::new(),
            global_filter: String::new(),
            sortable: BTreeMap::new(),
            searchable: BTreeMap::new(),
        }
    }
}

impl GridRequest {
    /// Reads the grid widget's query parameters (`sEcho`, `iDisplayStart`,
    /// `iDisplayLength`, `iSortingCols`, `iSortCol_<n>`, `sSortDir_<n>`,
    /// `sSearch`, `sSearch_<n>`, `bSortable_<n>`, `bSearchable_<n>`,
    /// `iColumns`).
    ///
    /// Column filters are JSON payloads; ones that fail to decode are logged
    /// and dropped. Malformed numbers fall back to their defaults.
    pub fn from_params(params: &HashMap<String, String>) -> Self {
        let int = |key: &str| params.get(key).and_then(|v| v.trim().parse::<u64>().ok());
        let flag = |key: String| params.get(&key).map(|v| parse_flag(v));

        let mut request = GridRequest {
            echo: params.get("sEcho").cloned(),
            display_start: int("iDisplayStart").unwrap_or(0),
            display_length: int("iDisplayLength")
                .filter(|n| *n > 0)
                .unwrap_or(DEFAULT_DISPLAY_LENGTH),
            global_filter: params.get("sSearch").cloned().unwrap_or_default(),
            ..GridRequest::default()
        };

        for i in 0..int("iSortingCols").unwrap_or(0) {
            let Some(column) = int(&format!("iSortCol_{i}")) else {
                continue;
            };
            let direction = params
                .get(&format!("sSortDir_{i}"))
                .map(|d| SortDirection::parse(d))
                .unwrap_or_default();
            request.sort_columns.push((column as usize, direction));
        }

        // Without iColumns, scan for every column mentioned in the params.
        let columns = int("iColumns").map(|n| n as usize).unwrap_or_else(|| highest_column(params));
        for column in 0..columns {
            if let Some(sortable) = flag(format!("bSortable_{column}")) {
                request.sortable.insert(column, sortable);
            }
            if let Some(searchable) = flag(format!("bSearchable_{column}")) {
                request.searchable.insert(column, searchable);
            }
            if let Some(raw) = params.get(&format!("sSearch_{column}")) {
                match decode_filter(column, raw) {
                    Ok(value) => {
                        request.column_filters.insert(column, value);
                    }
                    Err(err) => tracing::warn!(%err, "discarding column filter"),
                }
            }
        }

        request
    }

    pub fn with_filter(mut self, column: usize, value: Value) -> Self {
        self.column_filters.insert(column, value);
        self
    }

    pub fn with_sort(mut self, column: usize, direction: SortDirection) -> Self {
        self.sort_columns.push((column, direction));
        self
    }

    pub fn with_global(mut self, term: impl Into<String>) -> Self {
        self.global_filter = term.into();
        self
    }

    pub fn page(mut self, start: u64, length: u64) -> Self {
        self.display_start = start;
        self.display_length = if length == 0 { DEFAULT_DISPLAY_LENGTH } else { length };
        self
    }

    pub fn is_sortable(&self, column: usize) -> bool {
        self.sortable.get(&column).copied().unwrap_or(true)
    }

    pub fn is_searchable(&self, column: usize) -> bool {
        self.searchable.get(&column).copied().unwrap_or(true)
    }

    /// Filter for `column`, unless it is absent, `null`, empty or the text
    /// `"null"`.
    pub fn column_filter(&self, column: usize) -> Option<&Value> {
        self.column_filters.get(&column).filter(|value| !is_blank(value))
    }

    /// Global search term, unless it is empty or the text `"null"`.
    pub fn global(&self) -> Option<&str> {
        let term = self.global_filter.as_str();
        (!term.is_empty() && term != "null").then_some(term)
    }

    /// Requested direction for `column`; a later request for the same column
    /// wins.
    pub fn sort_for(&self, column: usize) -> Option<SortDirection> {
        self.sort_columns
            .iter()
            .rev()
            .find(|(idx, _)| *idx == column)
            .map(|(_, direction)| *direction)
    }
}

pub fn decode_filter(column: usize, raw: &str) -> Result<Value, FilterDecodeError> {
    if raw.is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(raw).map_err(|source| FilterDecodeError {
        column,
        raw: raw.to_string(),
        source,
    })
}

fn page_length<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    let length = i64::deserialize(deserializer)?;
    Ok(u64::try_from(length)
        .ok()
        .filter(|n| *n > 0)
        .unwrap_or(DEFAULT_DISPLAY_LENGTH))
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty() || s == "null",
        _ => false,
    }
}

fn parse_flag(raw: &str) -> bool {
    !matches!(raw.trim().to_ascii_lowercase().as_str(), "" | "0" | "false")
}

fn highest_column(params: &HashMap<String, String>) -> usize {
    params
        .keys()
        .filter_map(|key| {
            let (prefix, idx) = key.rsplit_once('_')?;
            matches!(prefix, "sSearch" | "bSortable" | "bSearchable")
                .then(|| idx.parse::<usize>().ok())
                .flatten()
        })
        .max()
        .map_or(0, |idx| idx + 1)
}
