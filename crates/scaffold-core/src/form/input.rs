use serde::Serialize;
use serde_json::Value;

use crate::schema::declaration::{display_value, Declaration};

/// Declaration keys the compiler consumes; everything else lands in `meta`.
pub const RESERVED_KEYS: [&str; 4] = ["attributes", "label", "options", "type"];

/// Structured description of one form input or filter widget.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InputDescriptor {
    pub name: String,
    pub label: String,
    #[serde(rename = "type")]
    pub input_type: String,
    pub attributes: Declaration,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub content: Vec<ContentNode>,
    pub meta: Declaration,
}

impl InputDescriptor {
    pub fn fieldset(&self) -> Option<&str> {
        self.meta.get("fieldset").and_then(Value::as_str).filter(|name| !name.is_empty())
    }
}

/// Option tree of a choice input.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentNode {
    Option {
        value: String,
        label: String,
        content: String,
    },
    Optgroup {
        label: String,
        content: Vec<ContentNode>,
    },
}

impl ContentNode {
    fn option(value: String, label: String) -> Self {
        ContentNode::Option {
            content: label.clone(),
            value,
            label,
        }
    }
}

/// Compiles one resolved declaration into an input descriptor.
///
/// `type` defaults to `text`, `label` to the field name, `attributes` to an
/// empty mapping. Values of the wrong shape count as absent.
pub fn compile_input(field: &str, decl: &Declaration) -> InputDescriptor {
    let input_type = decl
        .get("type")
        .and_then(Value::as_str)
        .unwrap_or("text")
        .to_string();

    let label = decl
        .get("label")
        .and_then(Value::as_str)
        .unwrap_or(field)
        .to_string();

    let attributes = match decl.get("attributes") {
        Some(Value::Object(map)) => map.clone(),
        _ => Declaration::new(),
    };

    let content = decl.get("options").map(compile_options).unwrap_or_default();

    let meta = decl
        .iter()
        .filter(|(key, _)| !RESERVED_KEYS.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    InputDescriptor {
        name: field.to_string(),
        label,
        input_type,
        attributes,
        content,
        meta,
    }
}

/// Mapping entries become options, nested mappings become option groups.
/// A JSON array is keyed by position.
fn compile_options(options: &Value) -> Vec<ContentNode> {
    option_pairs(options)
        .into_iter()
        .map(|(value, entry)| match entry {
            Value::Object(_) | Value::Array(_) => ContentNode::Optgroup {
                content: option_pairs(entry)
                    .into_iter()
                    .map(|(nested, label)| ContentNode::option(nested, display_value(label)))
                    .collect(),
                label: value,
            },
            other => ContentNode::option(value, display_value(other)),
        })
        .collect()
}

pub(crate) fn option_pairs(options: &Value) -> Vec<(String, &Value)> {
    match options {
        Value::Object(map) => map.iter().map(|(key, value)| (key.clone(), value)).collect(),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(idx, value)| (idx.to_string(), value))
            .collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::declaration::into_declaration;
    use serde_json::json;

    #[test]
    fn defaults_for_bare_field() {
        let input = compile_input("slug", &Declaration::new());
        assert_eq!(input.name, "slug");
        assert_eq!(input.label, "slug");
        assert_eq!(input.input_type, "text");
        assert!(input.attributes.is_empty());
        assert!(input.content.is_empty());
        assert!(input.meta.is_empty());
    }

    #[test]
    fn meta_carries_unreserved_keys() {
        let decl = into_declaration(json!({
            "label": "Body",
            "type": "textarea",
            "attributes": {"rows": 4},
            "fieldset": "content",
            "sort": false,
            "eav": "meta",
        }));

        let input = compile_input("body", &decl);
        assert_eq!(input.label, "Body");
        assert_eq!(input.input_type, "textarea");
        assert_eq!(input.fieldset(), Some("content"));
        assert_eq!(
            Value::Object(input.meta),
            json!({"fieldset": "content", "sort": false, "eav": "meta"})
        );
    }

    #[test]
    fn options_build_groups_and_flat_entries() {
        let decl = into_declaration(json!({
            "type": "select",
            "options": {"Group": ["Value"], "2": "Value 2"},
        }));

        let input = compile_input("sel", &decl);
        assert_eq!(
            serde_json::to_value(&input.content).unwrap(),
            json!([
                {"type": "optgroup", "label": "Group", "content": [
                    {"type": "option", "value": "0", "label": "Value", "content": "Value"},
                ]},
                {"type": "option", "value": "2", "label": "Value 2", "content": "Value 2"},
            ])
        );
    }

    #[test]
    fn malformed_attributes_are_ignored() {
        let decl = into_declaration(json!({"attributes": "oops", "label": 7}));
        let input = compile_input("n", &decl);
        assert!(input.attributes.is_empty());
        assert_eq!(input.label, "n");
    }
}
