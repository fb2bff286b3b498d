use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Raw configuration of one field: option name -> value (`label`, `type`,
/// `options`, `sort`, `search`, ...). Key order is preserved.
pub type Declaration = Map<String, Value>;

/// Context a subset of fields is declared for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Purpose {
    List,
    Form,
    View,
}

impl Purpose {
    pub const ALL: [Purpose; 3] = [Purpose::List, Purpose::Form, Purpose::View];

    pub fn as_str(&self) -> &'static str {
        match self {
            Purpose::List => "list",
            Purpose::Form => "form",
            Purpose::View => "view",
        }
    }
}

impl fmt::Display for Purpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declared `type` of a field, as far as filtering cares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    Text,
    Select,
    SelectMultiple,
    SelectSingle,
    Enum,
    Number,
    Range,
    Other(String),
}

impl FieldType {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "text" => FieldType::Text,
            "select" => FieldType::Select,
            "select-multiple" => FieldType::SelectMultiple,
            "select-single" => FieldType::SelectSingle,
            "enum" => FieldType::Enum,
            "number" => FieldType::Number,
            "range" => FieldType::Range,
            other => FieldType::Other(other.to_string()),
        }
    }

    /// Type of a declaration, `text` when none is declared.
    pub fn of(decl: &Declaration) -> Self {
        decl.get("type")
            .and_then(Value::as_str)
            .map(FieldType::parse)
            .unwrap_or(FieldType::Text)
    }
}

/// One entry of a purpose declaration list. A bare field name has empty
/// overrides.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyEntry {
    pub key: String,
    pub overrides: Declaration,
}

/// Ordered raw declarations for one purpose.
///
/// Deserializes from a keyed object (`{"id": {"type": "text"}}`) or from an
/// array mixing bare names and single-key objects
/// (`["name", {"description": {"type": "textarea"}}]`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawPropertyList", into = "IndexMap<String, Declaration>")]
pub struct PropertyList {
    entries: Vec<PropertyEntry>,
}

impl PropertyList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bare(mut self, key: impl Into<String>) -> Self {
        self.entries.push(PropertyEntry {
            key: key.into(),
            overrides: Declaration::new(),
        });
        self
    }

    /// Adds `key` with an override mapping; anything but a JSON object counts
    /// as no override.
    pub fn declared(mut self, key: impl Into<String>, overrides: Value) -> Self {
        self.entries.push(PropertyEntry {
            key: key.into(),
            overrides: into_declaration(overrides),
        });
        self
    }

    pub fn push(&mut self, entry: PropertyEntry) {
        self.entries.push(entry);
    }

    pub fn iter(&self) -> impl Iterator<Item = &PropertyEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawPropertyList {
    Keyed(IndexMap<String, Option<Declaration>>),
    Items(Vec<RawPropertyItem>),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawPropertyItem {
    Bare(String),
    Declared(IndexMap<String, Option<Declaration>>),
}

impl From<RawPropertyList> for PropertyList {
    fn from(raw: RawPropertyList) -> Self {
        let keyed = |map: IndexMap<String, Option<Declaration>>| {
            map.into_iter().map(|(key, overrides)| PropertyEntry {
                key,
                overrides: overrides.unwrap_or_default(),
            })
        };

        let entries = match raw {
            RawPropertyList::Keyed(map) => keyed(map).collect(),
            RawPropertyList::Items(items) => items
                .into_iter()
                .flat_map(|item| match item {
                    RawPropertyItem::Bare(key) => vec![PropertyEntry {
                        key,
                        overrides: Declaration::new(),
                    }],
                    RawPropertyItem::Declared(map) => keyed(map).collect(),
                })
                .collect(),
        };

        PropertyList { entries }
    }
}

impl From<PropertyList> for IndexMap<String, Declaration> {
    fn from(list: PropertyList) -> Self {
        list.entries
            .into_iter()
            .map(|entry| (entry.key, entry.overrides))
            .collect()
    }
}

/// Recursive merge: override keys win, nested mappings merge, everything
/// else is replaced. Base keys keep their position.
pub fn deep_merge(base: &Declaration, overrides: &Declaration) -> Declaration {
    let mut merged = base.clone();

    for (key, value) in overrides {
        if let (Some(Value::Object(existing)), Value::Object(incoming)) =
            (merged.get_mut(key), value)
        {
            *existing = deep_merge(existing, incoming);
            continue;
        }
        merged.insert(key.clone(), value.clone());
    }

    merged
}

pub fn into_declaration(value: Value) -> Declaration {
    match value {
        Value::Object(map) => map,
        _ => Declaration::new(),
    }
}

/// Loose truthiness of a declared value.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty() && s != "0",
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// Boolean switch that is on unless declared otherwise (`sort`, `search`,
/// `global`).
pub fn flag(decl: &Declaration, key: &str) -> bool {
    decl.get(key).map_or(true, is_truthy)
}

/// Text form of a scalar: strings unquoted, everything else as JSON.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn decl(value: Value) -> Declaration {
        into_declaration(value)
    }

    #[test]
    fn merge_fills_gaps_from_base() {
        let merged = deep_merge(&decl(json!({"label": "ID"})), &decl(json!({"type": "text"})));
        assert_eq!(Value::Object(merged), json!({"label": "ID", "type": "text"}));
    }

    #[test]
    fn merge_recurses_into_mappings_only() {
        let base = decl(json!({
            "attributes": {"class": "wide", "rows": 3},
            "options": [1, 2, 3],
        }));
        let overrides = decl(json!({
            "attributes": {"rows": 5},
            "options": [9],
        }));

        let merged = deep_merge(&base, &overrides);
        assert_eq!(
            Value::Object(merged),
            json!({"attributes": {"class": "wide", "rows": 5}, "options": [9]})
        );
    }

    #[test]
    fn property_list_accepts_keyed_and_mixed_forms() {
        let keyed: PropertyList =
            serde_json::from_value(json!({"id": {"type": "text"}, "name": null})).unwrap();
        let mixed: PropertyList =
            serde_json::from_value(json!(["id", {"name": {"type": "text"}}])).unwrap();

        let keys = |list: &PropertyList| list.iter().map(|e| e.key.clone()).collect::<Vec<_>>();
        assert_eq!(keys(&keyed), vec!["id", "name"]);
        assert_eq!(keys(&mixed), vec!["id", "name"]);
        assert!(mixed.iter().next().unwrap().overrides.is_empty());
        assert_eq!(keyed.iter().next().unwrap().overrides.get("type"), Some(&json!("text")));
    }

    #[test]
    fn flags_default_to_on() {
        let d = decl(json!({"sort": false, "global": 0}));
        assert!(!flag(&d, "sort"));
        assert!(!flag(&d, "global"));
        assert!(flag(&d, "search"));
    }

    #[test]
    fn field_type_defaults_to_text() {
        assert_eq!(FieldType::of(&Declaration::new()), FieldType::Text);
        assert_eq!(FieldType::of(&decl(json!({"type": "range"}))), FieldType::Range);
        assert_eq!(
            FieldType::of(&decl(json!({"type": "color"}))),
            FieldType::Other("color".into())
        );
    }
}
