use indexmap::map::Entry;
use indexmap::IndexMap;
use serde::Serialize;

use crate::error::{ScaffoldError, ScaffoldResult};
use crate::form::input::{compile_input, InputDescriptor};
use crate::schema::fieldsets::ResolvedFieldsets;
use crate::schema::registry::{ResolvedPropertySet, SchemaRegistry};

/// Top-level element of a generated form.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum FormElement {
    Fieldset {
        legend: String,
        fields: IndexMap<String, InputDescriptor>,
    },
    Input(InputDescriptor),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Form {
    pub elements: IndexMap<String, FormElement>,
}

impl Form {
    /// Looks an input up at the top level or inside any fieldset.
    pub fn input(&self, name: &str) -> Option<&InputDescriptor> {
        self.elements.values().find_map(|element| match element {
            FormElement::Input(input) if input.name == name => Some(input),
            FormElement::Fieldset { fields, .. } => fields.get(name),
            FormElement::Input(_) => None,
        })
    }

    /// All inputs in display order, fieldsets expanded in place.
    pub fn inputs(&self) -> Vec<&InputDescriptor> {
        self.elements
            .values()
            .flat_map(|element| match element {
                FormElement::Input(input) => vec![input],
                FormElement::Fieldset { fields, .. } => fields.values().collect(),
            })
            .collect()
    }
}

/// Builds the form of `model` from its fieldsets and form properties.
pub fn compile_form(registry: &SchemaRegistry, model: &str) -> ScaffoldResult<Form> {
    let fieldsets = registry.fieldsets(model)?;
    let properties = registry.form_properties(model)?;
    assemble_form(&fieldsets, &properties)
}

/// Fieldsets go in first, then every field in declared order. A field naming
/// an existing fieldset is nested in it; any identifier collision aborts.
pub fn assemble_form(
    fieldsets: &ResolvedFieldsets,
    properties: &ResolvedPropertySet,
) -> ScaffoldResult<Form> {
    let mut form = Form::default();

    for (name, fieldset) in fieldsets {
        form.elements.insert(
            name.clone(),
            FormElement::Fieldset {
                legend: fieldset.legend().to_string(),
                fields: IndexMap::new(),
            },
        );
    }

    for (field, decl) in properties {
        let input = compile_input(field, decl);

        let target = match input.fieldset() {
            Some(name) => match form.elements.get_mut(name) {
                Some(FormElement::Fieldset { fields, .. }) => Some(fields),
                _ => None,
            },
            None => None,
        };

        match target {
            Some(fields) => match fields.entry(field.clone()) {
                Entry::Occupied(_) => return Err(ScaffoldError::DuplicateIdentifier(field.clone())),
                Entry::Vacant(slot) => {
                    slot.insert(input);
                }
            },
            None => match form.elements.entry(field.clone()) {
                Entry::Occupied(_) => return Err(ScaffoldError::DuplicateIdentifier(field.clone())),
                Entry::Vacant(slot) => {
                    slot.insert(FormElement::Input(input));
                }
            },
        }
    }

    Ok(form)
}

/// Filter widgets for the list view: one input per list property.
pub fn generate_filters(
    registry: &SchemaRegistry,
    model: &str,
) -> ScaffoldResult<Vec<InputDescriptor>> {
    let properties = registry.list_properties(model)?;
    Ok(properties
        .iter()
        .map(|(field, decl)| compile_input(field, decl))
        .collect())
}
