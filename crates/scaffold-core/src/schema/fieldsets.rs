use indexmap::map::Entry;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ScaffoldError, ScaffoldResult};
use crate::schema::declaration::Declaration;

/// Raw fieldset declarations: name -> raw value, in declared order.
///
/// From JSON, either an array (`["dummy", {"fake": "legend"}]`) or a keyed
/// object (`{"dummy": null, "fake": "legend"}`). A bare name carries `null`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawFieldsetList", into = "IndexMap<String, Value>")]
pub struct FieldsetList {
    entries: Vec<(String, Value)>,
}

impl FieldsetList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bare(mut self, name: impl Into<String>) -> Self {
        self.entries.push((name.into(), Value::Null));
        self
    }

    pub fn declared(mut self, name: impl Into<String>, value: Value) -> Self {
        self.entries.push((name.into(), value));
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), value))
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawFieldsetList {
    Keyed(IndexMap<String, Value>),
    Items(Vec<RawFieldsetItem>),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawFieldsetItem {
    Bare(String),
    Declared(IndexMap<String, Value>),
}

impl From<RawFieldsetList> for FieldsetList {
    fn from(raw: RawFieldsetList) -> Self {
        let entries = match raw {
            RawFieldsetList::Keyed(map) => map.into_iter().collect(),
            RawFieldsetList::Items(items) => items
                .into_iter()
                .flat_map(|item| match item {
                    RawFieldsetItem::Bare(name) => vec![(name, Value::Null)],
                    RawFieldsetItem::Declared(map) => map.into_iter().collect(),
                })
                .collect(),
        };
        FieldsetList { entries }
    }
}

impl From<FieldsetList> for IndexMap<String, Value> {
    fn from(list: FieldsetList) -> Self {
        list.entries.into_iter().collect()
    }
}

/// A named group of form fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Fieldset {
    #[serde(skip)]
    pub name: String,
    #[serde(flatten)]
    pub config: Declaration,
}

impl Fieldset {
    /// Declared legend, falling back to the fieldset name.
    pub fn legend(&self) -> &str {
        self.config
            .get("legend")
            .and_then(Value::as_str)
            .unwrap_or(&self.name)
    }
}

pub type ResolvedFieldsets = IndexMap<String, Fieldset>;

/// Normalizes raw fieldset declarations: strings become the legend,
/// non-empty mappings are kept as they are, anything else gets the name as
/// legend. A name declared twice is a configuration error.
pub fn resolve_fieldsets(list: &FieldsetList) -> ScaffoldResult<ResolvedFieldsets> {
    let mut resolved = ResolvedFieldsets::new();

    for (name, value) in list.iter() {
        let config = match value {
            Value::Object(map) if !map.is_empty() => map.clone(),
            Value::String(legend) if !legend.is_empty() => legend_only(legend),
            _ => legend_only(name),
        };

        match resolved.entry(name.to_string()) {
            Entry::Occupied(_) => return Err(ScaffoldError::DuplicateIdentifier(name.to_string())),
            Entry::Vacant(slot) => {
                slot.insert(Fieldset {
                    name: name.to_string(),
                    config,
                });
            }
        }
    }

    Ok(resolved)
}

fn legend_only(legend: &str) -> Declaration {
    let mut config = Declaration::new();
    config.insert("legend".into(), Value::String(legend.to_string()));
    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn bare_string_and_mapping_entries() {
        let list: FieldsetList = serde_json::from_value(json!([
            "dummy",
            {"fake": "legend"},
            {"meta": {"legend": "Meta", "class": "x"}},
        ]))
        .unwrap();

        let resolved = resolve_fieldsets(&list).unwrap();
        let as_json = serde_json::to_value(&resolved).unwrap();
        assert_eq!(
            as_json,
            json!({
                "dummy": {"legend": "dummy"},
                "fake": {"legend": "legend"},
                "meta": {"legend": "Meta", "class": "x"},
            })
        );
        assert_eq!(resolved["fake"].legend(), "legend");
    }

    #[test]
    fn falsy_values_fall_back_to_name() {
        let list = FieldsetList::new()
            .declared("a", json!(""))
            .declared("b", json!(false))
            .declared("c", json!({}));

        let resolved = resolve_fieldsets(&list).unwrap();
        for name in ["a", "b", "c"] {
            assert_eq!(resolved[name].legend(), name);
        }
    }

    #[test]
    fn repeated_name_is_rejected() {
        let list: FieldsetList = serde_json::from_value(json!(["grp", {"grp": "Second"}])).unwrap();

        assert_eq!(
            resolve_fieldsets(&list).unwrap_err(),
            ScaffoldError::DuplicateIdentifier("grp".into())
        );
    }
}
