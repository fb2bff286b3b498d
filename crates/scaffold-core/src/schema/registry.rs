use std::collections::{HashMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock};

use anyhow::Context;
use indexmap::IndexMap;

use crate::error::{ScaffoldError, ScaffoldResult};
use crate::schema::declaration::{deep_merge, Declaration, Purpose};
use crate::schema::descriptor::{Describe, ModelSchema};
use crate::schema::fieldsets::{resolve_fieldsets, ResolvedFieldsets};

/// Merged, ordered field configuration for one model and purpose.
pub type ResolvedPropertySet = IndexMap<String, Declaration>;

/// Owns model schemas and memoizes what is derived from them.
///
/// Resolved sets are computed once per (model, purpose) and kept until
/// [`SchemaRegistry::reset`]. Schemas are assumed not to change at runtime,
/// so re-registering a model does not touch the caches either.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    models: RwLock<HashMap<String, Arc<ModelSchema>>>,
    properties: RwLock<HashMap<(String, Purpose), Arc<ResolvedPropertySet>>>,
    fieldsets: RwLock<HashMap<String, Arc<ResolvedFieldsets>>>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads a catalog file: a JSON array of model schemas.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("read schema catalog: {}", path))?;
        let schemas: Vec<ModelSchema> =
            serde_json::from_str(&raw).with_context(|| format!("parse schema catalog: {}", path))?;

        let registry = Self::new();
        for schema in schemas {
            registry.register(schema);
        }
        Ok(registry)
    }

    pub fn register(&self, schema: ModelSchema) {
        let mut models = self.models.write().unwrap_or_else(PoisonError::into_inner);
        models.insert(schema.model.clone(), Arc::new(schema));
    }

    /// Registers `M` on first use and returns its identifier.
    pub fn describe<M: Describe>(&self) -> &'static str {
        let known = self
            .models
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(M::MODEL);
        if !known {
            let mut schema = M::describe();
            schema.model = M::MODEL.to_string();
            self.register(schema);
        }
        M::MODEL
    }

    pub fn schema(&self, model: &str) -> ScaffoldResult<Arc<ModelSchema>> {
        self.models
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(model)
            .cloned()
            .ok_or_else(|| ScaffoldError::UnknownModel(model.to_string()))
    }

    pub fn models(&self) -> Vec<String> {
        let mut names = self
            .models
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect::<Vec<_>>();
        names.sort();
        names
    }

    pub fn properties(
        &self,
        model: &str,
        purpose: Purpose,
    ) -> ScaffoldResult<Arc<ResolvedPropertySet>> {
        let key = (model.to_string(), purpose);
        let cached = self
            .properties
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
            .cloned();
        if let Some(hit) = cached {
            return Ok(hit);
        }

        let schema = self.schema(model)?;
        let resolved = Arc::new(compile_properties(&schema, purpose)?);
        tracing::debug!(model, %purpose, fields = resolved.len(), "resolved properties");

        // A concurrent fill computes the same set; keep whichever landed first.
        let mut cache = self.properties.write().unwrap_or_else(PoisonError::into_inner);
        Ok(Arc::clone(cache.entry(key).or_insert(resolved)))
    }

    pub fn list_properties(&self, model: &str) -> ScaffoldResult<Arc<ResolvedPropertySet>> {
        self.properties(model, Purpose::List)
    }

    pub fn form_properties(&self, model: &str) -> ScaffoldResult<Arc<ResolvedPropertySet>> {
        self.properties(model, Purpose::Form)
    }

    pub fn view_properties(&self, model: &str) -> ScaffoldResult<Arc<ResolvedPropertySet>> {
        self.properties(model, Purpose::View)
    }

    pub fn properties_of<M: Describe>(
        &self,
        purpose: Purpose,
    ) -> ScaffoldResult<Arc<ResolvedPropertySet>> {
        let model = self.describe::<M>();
        self.properties(model, purpose)
    }

    pub fn fieldsets(&self, model: &str) -> ScaffoldResult<Arc<ResolvedFieldsets>> {
        let cached = self
            .fieldsets
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(model)
            .cloned();
        if let Some(hit) = cached {
            return Ok(hit);
        }

        let schema = self.schema(model)?;
        let resolved = Arc::new(
            schema
                .fieldsets
                .as_ref()
                .map(resolve_fieldsets)
                .transpose()?
                .unwrap_or_default(),
        );
        tracing::debug!(model, fieldsets = resolved.len(), "resolved fieldsets");

        let mut cache = self.fieldsets.write().unwrap_or_else(PoisonError::into_inner);
        Ok(Arc::clone(cache.entry(model.to_string()).or_insert(resolved)))
    }

    /// Drops every cached property set and fieldset. Meant for tests.
    pub fn reset(&self) {
        self.properties.write().unwrap_or_else(PoisonError::into_inner).clear();
        self.fieldsets.write().unwrap_or_else(PoisonError::into_inner).clear();
    }
}

/// Merges a purpose's raw declarations over the base registry.
///
/// Output follows the purpose's order. List entries that end up empty are
/// dropped; form and view keep them since a bare field name is a valid
/// declaration there. A key declared twice is a configuration error.
pub fn compile_properties(
    schema: &ModelSchema,
    purpose: Purpose,
) -> ScaffoldResult<ResolvedPropertySet> {
    let Some(list) = schema.declarations(purpose) else {
        return Ok(ResolvedPropertySet::new());
    };

    let mut seen = HashSet::new();
    let mut resolved = ResolvedPropertySet::new();
    for entry in list.iter() {
        if !seen.insert(entry.key.as_str()) {
            return Err(ScaffoldError::DuplicateIdentifier(entry.key.clone()));
        }

        let merged = match schema.base(&entry.key) {
            Some(base) => deep_merge(base, &entry.overrides),
            None => entry.overrides.clone(),
        };

        if purpose == Purpose::List && merged.is_empty() {
            continue;
        }
        resolved.insert(entry.key.clone(), merged);
    }
    Ok(resolved)
}
