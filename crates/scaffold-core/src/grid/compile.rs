use std::borrow::Cow;

use serde_json::Value;

use crate::grid::plan::{Predicate, QueryPlan};
use crate::grid::relations::{eav_path, relation_paths};
use crate::grid::request::GridRequest;
use crate::schema::declaration::{
    deep_merge, display_value, flag, is_truthy, Declaration, FieldType,
};
use crate::schema::registry::ResolvedPropertySet;

/// Compiles a grid request against the list properties of a model.
///
/// Columns are matched to request indices by position. For every column, in
/// order: dotted keys register their relation paths, an `eav` key registers
/// the EAV relation, a requested and allowed sort lands in the ORDER BY, a
/// column filter becomes a typed predicate and a global term joins the OR
/// group.
pub fn compile_grid_plan(properties: &ResolvedPropertySet, request: &GridRequest) -> QueryPlan {
    compile_grid_plan_with_defaults(properties, request, &Declaration::new())
}

/// Same as [`compile_grid_plan`], with `defaults` merged under every column.
pub fn compile_grid_plan_with_defaults(
    properties: &ResolvedPropertySet,
    request: &GridRequest,
    defaults: &Declaration,
) -> QueryPlan {
    let mut plan = QueryPlan::new(request.display_length, request.display_start);
    let global = request.global();

    for (idx, (field, decl)) in properties.iter().enumerate() {
        let decl = if defaults.is_empty() {
            Cow::Borrowed(decl)
        } else {
            Cow::Owned(deep_merge(defaults, decl))
        };

        for path in relation_paths(field) {
            plan.relations.insert(path);
        }
        if let Some(eav) = decl.get("eav").filter(|v| is_truthy(v)) {
            plan.relations.insert(eav_path(field, &display_value(eav)));
        }

        if request.is_sortable(idx) && flag(&decl, "sort") {
            if let Some(direction) = request.sort_for(idx) {
                plan.order_by.insert(field.clone(), direction);
            }
        }

        let searchable = flag(&decl, "search");

        if searchable && request.is_searchable(idx) {
            if let Some(filter) = request.column_filter(idx) {
                if let Some(predicate) = typed_predicate(field, &FieldType::of(&decl), filter) {
                    plan.filters.push(predicate);
                }
            }
        }

        if let Some(term) = global {
            if searchable && flag(&decl, "global") {
                plan.global.push(Predicate::contains(field, term));
            }
        }
    }

    tracing::debug!(
        relations = plan.relations.len(),
        filters = plan.filters.len(),
        global = plan.global.len(),
        order_by = plan.order_by.len(),
        "compiled grid plan"
    );
    plan
}

/// Predicate for a column filter by declared type; `None` for types that do
/// not filter and for values of the wrong shape.
pub fn typed_predicate(field: &str, field_type: &FieldType, filter: &Value) -> Option<Predicate> {
    let field = field.to_string();

    match field_type {
        FieldType::SelectMultiple | FieldType::Select | FieldType::Enum => {
            let values = match filter {
                Value::Array(items) => items.clone(),
                scalar => vec![scalar.clone()],
            };
            Some(Predicate::In { field, values })
        }
        FieldType::SelectSingle | FieldType::Number => Some(Predicate::Eq {
            field,
            value: filter.clone(),
        }),
        FieldType::Text => Some(Predicate::contains(&field, &display_value(filter))),
        FieldType::Range => match filter.as_array().map(Vec::as_slice) {
            Some([low, high]) => Some(Predicate::Between {
                field,
                low: low.clone(),
                high: high.clone(),
            }),
            _ => {
                tracing::warn!(%field, %filter, "range filter needs exactly two bounds");
                None
            }
        },
        FieldType::Other(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::request::SortDirection;
    use crate::schema::declaration::into_declaration;
    use serde_json::json;

    fn columns(value: Value) -> ResolvedPropertySet {
        into_declaration(value)
            .into_iter()
            .map(|(key, decl)| (key, into_declaration(decl)))
            .collect()
    }

    #[test]
    fn dotted_keys_and_eav_register_relations() {
        let props = columns(json!({
            "id": {"label": "ID"},
            "author.profile.name": {"type": "text", "eav": "meta"},
            "author.email": {"type": "text"},
        }));

        let plan = compile_grid_plan(&props, &GridRequest::default());
        assert_eq!(
            plan.relations.iter().collect::<Vec<_>>(),
            vec!["author", "author.profile", "author.profile.meta"]
        );
    }

    #[test]
    fn filter_type_dispatch() {
        let props = columns(json!({
            "price": {"type": "range"},
            "status": {"type": "select"},
            "color": {"type": "color"},
            "qty": {"type": "number"},
        }));
        let request = GridRequest::default()
            .with_filter(0, json!([1, 10]))
            .with_filter(1, json!(["a", "b"]))
            .with_filter(2, json!("red"))
            .with_filter(3, json!(4));

        let plan = compile_grid_plan(&props, &request);
        assert_eq!(
            plan.filters,
            vec![
                Predicate::Between { field: "price".into(), low: json!(1), high: json!(10) },
                Predicate::In { field: "status".into(), values: vec![json!("a"), json!("b")] },
                Predicate::Eq { field: "qty".into(), value: json!(4) },
            ]
        );
    }

    #[test]
    fn malformed_range_is_ignored() {
        let props = columns(json!({"price": {"type": "range"}}));
        let plan = compile_grid_plan(&props, &GridRequest::default().with_filter(0, json!([1])));
        assert!(plan.filters.is_empty());
    }

    #[test]
    fn sort_respects_declaration_and_client_flags() {
        let props = columns(json!({
            "id": {"label": "ID"},
            "name": {"sort": false},
            "created": {"label": "Created"},
        }));
        let mut request = GridRequest::default()
            .with_sort(2, SortDirection::Desc)
            .with_sort(1, SortDirection::Asc)
            .with_sort(0, SortDirection::Asc);
        request.sortable.insert(0, false);

        let plan = compile_grid_plan(&props, &request);
        assert_eq!(
            plan.order_by.into_iter().collect::<Vec<_>>(),
            vec![("created".to_string(), SortDirection::Desc)]
        );
    }

    #[test]
    fn global_term_spans_eligible_columns() {
        let props = columns(json!({
            "name": {"type": "text"},
            "secret": {"global": false},
            "hidden": {"search": false},
            "email": {"label": "Email"},
        }));

        let plan = compile_grid_plan(&props, &GridRequest::default().with_global("ann"));
        assert!(plan.filters.is_empty());
        assert_eq!(
            plan.global,
            vec![Predicate::contains("name", "ann"), Predicate::contains("email", "ann")]
        );
    }

    #[test]
    fn non_searchable_column_ignores_filter() {
        let props = columns(json!({"name": {"search": false}, "email": {"label": "Email"}}));
        let mut request = GridRequest::default()
            .with_filter(0, json!("ann"))
            .with_filter(1, json!("ann"));
        request.searchable.insert(1, false);

        assert!(!compile_grid_plan(&props, &request).is_filtered());
    }

    #[test]
    fn defaults_apply_under_each_column() {
        let props = columns(json!({"name": {"label": "Name"}, "code": {"sort": true}}));
        let defaults = into_declaration(json!({"sort": false}));
        let request = GridRequest::default()
            .with_sort(0, SortDirection::Asc)
            .with_sort(1, SortDirection::Desc);

        let plan = compile_grid_plan_with_defaults(&props, &request, &defaults);
        assert_eq!(plan.order_by.keys().collect::<Vec<_>>(), vec!["code"]);
    }
}
