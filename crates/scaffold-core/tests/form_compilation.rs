use serde_json::json;

use scaffold_core::form::{
    compile_form, generate_filters, ContentNode, FormElement, RuleViolation, Validator,
};
use scaffold_core::schema::{FieldsetList, ModelSchema, PropertyList, Purpose, SchemaRegistry};
use scaffold_core::ScaffoldError;

mod common;
use crate::common::{fixture_path, load_schema_registry};

#[test]
fn fieldsets_lead_and_collect_their_fields() {
    let registry = load_schema_registry();
    let form = compile_form(&registry, "post").unwrap();

    assert_eq!(
        form.elements.keys().map(String::as_str).collect::<Vec<_>>(),
        vec!["publishing", "title"]
    );

    match &form.elements["publishing"] {
        FormElement::Fieldset { legend, fields } => {
            assert_eq!(legend, "Publishing");
            assert_eq!(
                fields.keys().map(String::as_str).collect::<Vec<_>>(),
                vec!["status", "featured"]
            );
        }
        other => panic!("expected fieldset, got {other:?}"),
    }

    let status = form.input("status").unwrap();
    assert_eq!(status.input_type, "select");
    assert_eq!(status.fieldset(), Some("publishing"));
    assert_eq!(
        status.content,
        vec![
            ContentNode::Option {
                value: "draft".into(),
                label: "Draft".into(),
                content: "Draft".into(),
            },
            ContentNode::Option {
                value: "live".into(),
                label: "Live".into(),
                content: "Live".into(),
            },
        ]
    );
    assert_eq!(form.inputs().len(), 3);
}

#[test]
fn duplicate_identifier_aborts_compilation() {
    let registry = SchemaRegistry::new();
    registry.register(
        ModelSchema::new("clash")
            .purpose(Purpose::Form, PropertyList::new().bare("details"))
            .fieldsets(FieldsetList::new().bare("details")),
    );

    let err = compile_form(&registry, "clash").unwrap_err();
    assert_eq!(err, ScaffoldError::DuplicateIdentifier("details".into()));
    assert!(err.is_configuration());
}

#[test]
fn repeated_field_in_form_list_is_rejected() {
    let registry = SchemaRegistry::new();
    registry.register(ModelSchema::new("twice").purpose(
        Purpose::Form,
        PropertyList::new()
            .bare("title")
            .declared("title", json!({"label": "Other"})),
    ));

    let err = compile_form(&registry, "twice").unwrap_err();
    assert_eq!(err, ScaffoldError::DuplicateIdentifier("title".into()));
}

#[test]
fn repeated_fieldset_is_rejected() {
    let registry = SchemaRegistry::new();
    registry.register(
        ModelSchema::new("twice")
            .purpose(Purpose::Form, PropertyList::new().bare("name"))
            .fieldsets(FieldsetList::new().bare("grp").declared("grp", json!("Second"))),
    );

    let err = compile_form(&registry, "twice").unwrap_err();
    assert_eq!(err, ScaffoldError::DuplicateIdentifier("grp".into()));
}

#[test]
fn repeated_identifiers_from_catalog_are_rejected() {
    let registry = SchemaRegistry::load(&fixture_path("duplicates.json")).unwrap();

    let err = compile_form(&registry, "twice_field").unwrap_err();
    assert_eq!(err, ScaffoldError::DuplicateIdentifier("title".into()));
    assert!(err.is_configuration());

    let err = compile_form(&registry, "twice_fieldset").unwrap_err();
    assert_eq!(err, ScaffoldError::DuplicateIdentifier("grp".into()));
}

#[test]
fn field_names_in_missing_fieldset_stay_top_level() {
    let registry = load_schema_registry();
    let form = compile_form(&registry, "dummy").unwrap();

    assert_eq!(form.elements.keys().map(String::as_str).collect::<Vec<_>>(), vec!["dummy", "name"]);
    assert!(matches!(form.elements["name"], FormElement::Input(_)));
}

#[test]
fn list_filters_follow_list_order() {
    let registry = load_schema_registry();
    let filters = generate_filters(&registry, "post").unwrap();

    assert_eq!(
        filters.iter().map(|f| f.name.as_str()).collect::<Vec<_>>(),
        vec!["id", "title", "status", "featured", "views", "author.name"]
    );
    assert_eq!(filters[4].input_type, "range");
    assert_eq!(filters[4].meta, json!({"global": false}).as_object().cloned().unwrap());
    assert_eq!(filters[5].label, "Author");
}

#[test]
fn validator_reports_violations_and_keeps_declared_keys() {
    let registry = load_schema_registry();
    let validator = Validator::for_form(&registry, "post").unwrap();

    let input = json!({"title": "", "status": "gone", "extra": 1});
    let result = validator.run(input.as_object().unwrap());
    assert!(!result.is_valid());
    assert_eq!(result.errors["title"], vec![RuleViolation::Required { field: "title".into() }]);
    assert_eq!(
        result.errors["status"],
        vec![RuleViolation::NotAnOption { field: "status".into() }]
    );

    let input = json!({"title": "Hi", "status": "live", "featured": "1", "extra": "x"});
    let result = validator.run(input.as_object().unwrap());
    assert!(result.is_valid());
    assert_eq!(
        result.validated.keys().map(String::as_str).collect::<Vec<_>>(),
        vec!["title", "status", "featured"]
    );
}
