use indexmap::IndexMap;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::error::ScaffoldResult;
use crate::form::input::option_pairs;
use crate::schema::declaration::{display_value, Declaration};
use crate::schema::registry::{ResolvedPropertySet, SchemaRegistry};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum RuleViolation {
    #[error("field '{field}' is required")]
    Required { field: String },

    #[error("field '{field}' must be numeric")]
    NotNumeric { field: String },

    #[error("field '{field}' must be at least {min} characters")]
    TooShort { field: String, min: usize },

    #[error("field '{field}' must be at most {max} characters")]
    TooLong { field: String, max: usize },

    #[error("field '{field}' must be one of its declared options")]
    NotAnOption { field: String },
}

/// A validation rule, read from the `validation` key of a declaration.
///
/// Rules are written as bare names (`"required"`) or single-key mappings
/// (`{"max_length": 80}`). Unknown rules are skipped.
#[derive(Debug, Clone, PartialEq)]
pub enum Rule {
    Required,
    Numeric,
    MinLength(usize),
    MaxLength(usize),
    InOptions(Vec<String>),
}

impl Rule {
    fn parse(raw: &Value, decl: &Declaration) -> Option<Rule> {
        let (name, arg) = match raw {
            Value::String(name) => (name.as_str(), None),
            Value::Object(map) if map.len() == 1 => {
                let (name, arg) = map.iter().next()?;
                (name.as_str(), Some(arg))
            }
            _ => return None,
        };

        let length = || arg.and_then(Value::as_u64).map(|n| n as usize);

        match name {
            "required" => Some(Rule::Required),
            "numeric" => Some(Rule::Numeric),
            "min_length" => length().map(Rule::MinLength),
            "max_length" => length().map(Rule::MaxLength),
            "in_options" => {
                let options = decl.get("options")?;
                let mut allowed = Vec::new();
                for (key, entry) in option_pairs(options) {
                    match entry {
                        Value::Object(_) | Value::Array(_) => allowed
                            .extend(option_pairs(entry).into_iter().map(|(nested, _)| nested)),
                        _ => allowed.push(key),
                    }
                }
                Some(Rule::InOptions(allowed))
            }
            _ => None,
        }
    }

    fn check(&self, field: &str, value: Option<&Value>) -> Result<(), RuleViolation> {
        let text = value.map(display_value).unwrap_or_default();

        // Only `required` looks at absent or empty input.
        if text.is_empty() {
            return match self {
                Rule::Required => Err(RuleViolation::Required { field: field.to_string() }),
                _ => Ok(()),
            };
        }

        match self {
            Rule::Required => Ok(()),
            Rule::Numeric if text.trim().parse::<f64>().is_err() => {
                Err(RuleViolation::NotNumeric { field: field.to_string() })
            }
            Rule::MinLength(min) if text.chars().count() < *min => Err(RuleViolation::TooShort {
                field: field.to_string(),
                min: *min,
            }),
            Rule::MaxLength(max) if text.chars().count() > *max => Err(RuleViolation::TooLong {
                field: field.to_string(),
                max: *max,
            }),
            Rule::InOptions(allowed) if !allowed.contains(&text) => {
                Err(RuleViolation::NotAnOption { field: field.to_string() })
            }
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationResult {
    /// Submitted values of the declared fields.
    pub validated: Map<String, Value>,
    pub errors: IndexMap<String, Vec<RuleViolation>>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Per-field rules for binding submitted form data.
#[derive(Debug, Clone, Default)]
pub struct Validator {
    rules: IndexMap<String, Vec<Rule>>,
}

impl Validator {
    pub fn for_form(registry: &SchemaRegistry, model: &str) -> ScaffoldResult<Self> {
        let properties = registry.form_properties(model)?;
        Ok(Self::from_properties(&properties))
    }

    pub fn from_properties(properties: &ResolvedPropertySet) -> Self {
        let rules = properties
            .iter()
            .map(|(field, decl)| {
                let rules = match decl.get("validation") {
                    Some(Value::Array(raw)) => {
                        raw.iter().filter_map(|r| Rule::parse(r, decl)).collect()
                    }
                    Some(single) => Rule::parse(single, decl).into_iter().collect(),
                    None => Vec::new(),
                };
                (field.clone(), rules)
            })
            .collect();

        Self { rules }
    }

    pub fn rules(&self, field: &str) -> &[Rule] {
        self.rules.get(field).map(Vec::as_slice).unwrap_or_default()
    }

    /// Checks `input` against every declared field. Keys the form does not
    /// declare are left out of the validated data.
    pub fn run(&self, input: &Map<String, Value>) -> ValidationResult {
        let mut result = ValidationResult::default();

        for (field, rules) in &self.rules {
            let value = input.get(field);
            let violations = rules
                .iter()
                .filter_map(|rule| rule.check(field, value).err())
                .collect::<Vec<_>>();

            if !violations.is_empty() {
                result.errors.insert(field.clone(), violations);
            } else if let Some(value) = value {
                result.validated.insert(field.clone(), value.clone());
            }
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::declaration::into_declaration;
    use serde_json::json;

    fn properties() -> ResolvedPropertySet {
        let mut props = ResolvedPropertySet::new();
        props.insert(
            "name".into(),
            into_declaration(json!({"validation": ["required", {"max_length": 5}]})),
        );
        props.insert(
            "status".into(),
            into_declaration(json!({
                "options": {"draft": "Draft", "Live": {"published": "Published"}},
                "validation": "in_options",
            })),
        );
        props.insert("age".into(), into_declaration(json!({"validation": ["numeric"]})));
        props
    }

    #[test]
    fn valid_input_keeps_only_declared_fields() {
        let validator = Validator::from_properties(&properties());
        let input = into_declaration(json!({
            "name": "Ann",
            "status": "published",
            "age": "41",
            "admin": true,
        }));

        let result = validator.run(&input);
        assert!(result.is_valid(), "{:?}", result.errors);
        assert_eq!(
            Value::Object(result.validated),
            json!({"name": "Ann", "status": "published", "age": "41"})
        );
    }

    #[test]
    fn violations_are_collected_per_field() {
        let validator = Validator::from_properties(&properties());
        let input = into_declaration(json!({"name": "Annabel", "status": "gone", "age": "old"}));

        let result = validator.run(&input);
        assert_eq!(
            result.errors["name"],
            vec![RuleViolation::TooLong { field: "name".into(), max: 5 }]
        );
        assert_eq!(
            result.errors["status"],
            vec![RuleViolation::NotAnOption { field: "status".into() }]
        );
        assert_eq!(result.errors["age"], vec![RuleViolation::NotNumeric { field: "age".into() }]);
    }

    #[test]
    fn missing_required_field() {
        let validator = Validator::from_properties(&properties());
        let result = validator.run(&Map::new());
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors["name"][0].to_string(), "field 'name' is required");
    }
}
