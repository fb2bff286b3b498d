use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::schema::declaration::{into_declaration, Declaration, PropertyList, Purpose};
use crate::schema::fieldsets::FieldsetList;

/// Declarative schema of one model: the base property registry plus the
/// per-purpose declaration lists and fieldsets. Plain data, no behavior.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelSchema {
    pub model: String,
    #[serde(default)]
    pub properties: IndexMap<String, Declaration>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub list: Option<PropertyList>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form: Option<PropertyList>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub view: Option<PropertyList>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fieldsets: Option<FieldsetList>,
}

impl ModelSchema {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Self::default()
        }
    }

    /// Adds a base (cross-purpose) declaration.
    pub fn property(mut self, key: impl Into<String>, decl: Value) -> Self {
        self.properties.insert(key.into(), into_declaration(decl));
        self
    }

    pub fn purpose(mut self, purpose: Purpose, list: PropertyList) -> Self {
        *self.slot(purpose) = Some(list);
        self
    }

    pub fn fieldsets(mut self, fieldsets: FieldsetList) -> Self {
        self.fieldsets = Some(fieldsets);
        self
    }

    /// Raw declarations for `purpose`; `None` when the model declares none.
    pub fn declarations(&self, purpose: Purpose) -> Option<&PropertyList> {
        match purpose {
            Purpose::List => self.list.as_ref(),
            Purpose::Form => self.form.as_ref(),
            Purpose::View => self.view.as_ref(),
        }
    }

    pub fn declarations_mut(&mut self, purpose: Purpose) -> &mut PropertyList {
        self.slot(purpose).get_or_insert_with(PropertyList::default)
    }

    pub fn base(&self, key: &str) -> Option<&Declaration> {
        self.properties.get(key)
    }

    fn slot(&mut self, purpose: Purpose) -> &mut Option<PropertyList> {
        match purpose {
            Purpose::List => &mut self.list,
            Purpose::Form => &mut self.form,
            Purpose::View => &mut self.view,
        }
    }
}

/// Implemented by model types that declare their schema in code.
pub trait Describe {
    /// Identifier the registry files the model under.
    const MODEL: &'static str;

    fn describe() -> ModelSchema;
}
