use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{ScaffoldError, ScaffoldResult};
use crate::form::input::option_pairs;
use crate::grid::Row;
use crate::schema::declaration::{display_value, is_truthy};
use crate::schema::registry::ResolvedPropertySet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    View,
    Edit,
    Delete,
}

impl Action {
    pub const ALL: [Action; 3] = [Action::View, Action::Edit, Action::Delete];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::View => "view",
            Action::Edit => "edit",
            Action::Delete => "delete",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            Action::View => "glyphicon glyphicon-eye-open",
            Action::Edit => "glyphicon glyphicon-edit",
            Action::Delete => "glyphicon glyphicon-remove text-danger",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Answers whether the current user may perform `action` on `resource`.
pub trait CapabilityCheck {
    fn allows(&self, resource: &str, action: Action) -> bool;
}

impl<F> CapabilityCheck for F
where
    F: Fn(&str, Action) -> bool,
{
    fn allows(&self, resource: &str, action: Action) -> bool {
        self(resource, action)
    }
}

/// Turns a denied capability into [`ScaffoldError::CapabilityDenied`].
pub fn require(check: &dyn CapabilityCheck, resource: &str, action: Action) -> ScaffoldResult<()> {
    if check.allows(resource, action) {
        Ok(())
    } else {
        Err(ScaffoldError::CapabilityDenied {
            resource: resource.to_string(),
            action,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionLink {
    pub action: Action,
    pub url: String,
    pub icon: String,
}

pub trait ActionBuilder {
    fn build(&self, action: Action, id: &str) -> ActionLink;
}

/// Links of the form `<base>/<action>/<id>`.
#[derive(Debug, Clone)]
pub struct UrlActions {
    base_url: String,
}

impl UrlActions {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

impl ActionBuilder for UrlActions {
    fn build(&self, action: Action, id: &str) -> ActionLink {
        ActionLink {
            action,
            url: format!("{}/{}/{}", self.base_url, action, id),
            icon: action.icon().to_string(),
        }
    }
}

/// Capability check and link builder for the trailing actions cell.
#[derive(Clone, Copy)]
pub struct ActionSet<'a> {
    pub resource: &'a str,
    pub check: &'a dyn CapabilityCheck,
    pub builder: &'a dyn ActionBuilder,
}

impl<'a> ActionSet<'a> {
    pub fn new(
        resource: &'a str,
        check: &'a dyn CapabilityCheck,
        builder: &'a dyn ActionBuilder,
    ) -> Self {
        Self {
            resource,
            check,
            builder,
        }
    }

    /// Links for every action the check allows, in view/edit/delete order.
    pub fn links(&self, id: &str) -> Vec<ActionLink> {
        Action::ALL
            .into_iter()
            .filter(|action| self.check.allows(self.resource, *action))
            .map(|action| self.builder.build(action, id))
            .collect()
    }
}

/// Shapes result rows into positional grid cells.
pub struct RowTransformer<'a> {
    properties: &'a ResolvedPropertySet,
    actions: Option<ActionSet<'a>>,
}

impl<'a> RowTransformer<'a> {
    pub fn new(properties: &'a ResolvedPropertySet) -> Self {
        Self {
            properties,
            actions: None,
        }
    }

    pub fn with_actions(mut self, actions: ActionSet<'a>) -> Self {
        self.actions = Some(actions);
        self
    }

    pub fn transform(&self, row: &Row) -> Vec<Value> {
        transform_row(row, self.properties, self.actions.as_ref())
    }
}

/// One cell per list property, in declared order, plus an actions cell when
/// `actions` is given. Declared `options` replace stored values with their
/// labels; a value without a label is kept as stored.
pub fn transform_row(
    row: &Row,
    properties: &ResolvedPropertySet,
    actions: Option<&ActionSet<'_>>,
) -> Vec<Value> {
    let flat = flatten(row);

    let mut cells = properties
        .iter()
        .map(|(key, decl)| {
            let raw = flat.get(key).cloned().unwrap_or(Value::Null);
            let options = decl.get("options").filter(|options| is_truthy(options));
            match options {
                Some(options) if !raw.is_null() => {
                    option_label(options, &raw).unwrap_or_else(|| {
                        tracing::warn!(
                            field = %key,
                            value = %raw,
                            "no option label for stored value"
                        );
                        raw
                    })
                }
                _ => raw,
            }
        })
        .collect::<Vec<_>>();

    if let Some(actions) = actions {
        let id = flat.get("id").map(display_value).unwrap_or_default();
        let links = actions.links(&id);
        cells.push(serde_json::to_value(links).unwrap_or(Value::Array(Vec::new())));
    }

    cells
}

/// Label of a stored value, looked up in flat options first, then inside
/// option groups.
fn option_label(options: &Value, raw: &Value) -> Option<Value> {
    let wanted = display_value(raw);
    let pairs = option_pairs(options);

    let flat = pairs
        .iter()
        .find(|(key, entry)| *key == wanted && !entry.is_object() && !entry.is_array());
    let grouped = || {
        pairs
            .iter()
            .filter(|(_, entry)| entry.is_object() || entry.is_array())
            .flat_map(|(_, group)| option_pairs(group))
            .find(|(key, _)| *key == wanted)
    };

    match flat {
        Some((_, label)) => Some((*label).clone()),
        None => grouped().map(|(_, label)| label.clone()),
    }
}

/// Collapses nested objects into dotted keys (`author.name`). Arrays and
/// scalars are leaves.
pub fn flatten(row: &Row) -> Map<String, Value> {
    fn walk(prefix: &str, value: &Value, out: &mut Map<String, Value>) {
        match value {
            Value::Object(map) if !map.is_empty() => {
                for (key, nested) in map {
                    walk(&format!("{prefix}.{key}"), nested, out);
                }
            }
            leaf => {
                out.insert(prefix.to_string(), leaf.clone());
            }
        }
    }

    let mut out = Map::new();
    for (key, value) in row {
        walk(key, value, &mut out);
    }
    out
}
