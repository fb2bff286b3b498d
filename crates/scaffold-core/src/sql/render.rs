use serde_json::Value;

use crate::grid::plan::{Predicate, QueryPlan};
use crate::grid::relations::split_field;

/// SQL text with `$n` placeholders and the values bound to them.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedSql {
    pub sql: String,
    pub params: Vec<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountScope {
    /// Base table, no predicates.
    Total,
    /// Predicates applied, no paging.
    Filtered,
}

struct Renderer<'a> {
    table: &'a str,
    params: Vec<Value>,
}

impl<'a> Renderer<'a> {
    fn new(table: &'a str) -> Self {
        Self { table, params: Vec::new() }
    }

    fn bind(&mut self, value: Value) -> String {
        self.params.push(value);
        format!("${}", self.params.len())
    }

    fn column(&self, field: &str) -> String {
        match split_field(field) {
            (Some(relation), attribute) => format!("{}.{}", alias(relation), attribute),
            (None, attribute) => format!("{}.{}", self.table, attribute),
        }
    }

    // Relations follow the `<name>_id` foreign key convention on the parent
    fn join(&self, path: &str) -> String {
        let (parent, name) = split_field(path);
        let parent_alias = parent.map(alias).unwrap_or_else(|| self.table.to_string());
        let join_alias = alias(path);

        let target = if join_alias == name {
            name.to_string()
        } else {
            format!("{} {}", name, join_alias)
        };
        format!("LEFT JOIN {} ON {}.id = {}.{}_id", target, join_alias, parent_alias, name)
    }

    fn predicate(&mut self, predicate: &Predicate) -> String {
        let column = self.column(predicate.field());
        match predicate {
            Predicate::Eq { value, .. } => {
                let p = self.bind(value.clone());
                format!("{} = {}", column, p)
            }
            Predicate::In { values, .. } if values.is_empty() => "FALSE".to_string(),
            Predicate::In { values, .. } => {
                let list = values
                    .iter()
                    .map(|v| self.bind(v.clone()))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("{} IN ({})", column, list)
            }
            // Text form, case-insensitive
            Predicate::Like { pattern, .. } => {
                let p = self.bind(Value::String(pattern.clone()));
                format!("CAST({} AS TEXT) ILIKE {}", column, p)
            }
            Predicate::Between { low, high, .. } => {
                let lo = self.bind(low.clone());
                let hi = self.bind(high.clone());
                format!("{} BETWEEN {} AND {}", column, lo, hi)
            }
        }
    }

    fn joins(&self, plan: &QueryPlan) -> String {
        plan.relations
            .iter()
            .map(|path| format!("\n{}", self.join(path)))
            .collect()
    }

    fn where_clause(&mut self, plan: &QueryPlan) -> String {
        let mut predicates = plan
            .filters
            .iter()
            .map(|p| self.predicate(p))
            .collect::<Vec<_>>();

        if !plan.global.is_empty() {
            let any = plan
                .global
                .iter()
                .map(|p| self.predicate(p))
                .collect::<Vec<_>>()
                .join(" OR ");
            predicates.push(format!("({})", any));
        }

        if predicates.is_empty() {
            String::new()
        } else {
            format!("\nWHERE {}", predicates.join("\n  AND "))
        }
    }

    fn finish(self, sql: String) -> RenderedSql {
        RenderedSql { sql, params: self.params }
    }
}

fn alias(path: &str) -> String {
    path.replace('.', "__")
}

/// Page query for `plan` against `table`: joins, predicates, ordering in
/// column order, then LIMIT/OFFSET.
pub fn render_select(plan: &QueryPlan, table: &str) -> RenderedSql {
    let mut r = Renderer::new(table);

    let joins = r.joins(plan);
    let where_clause = r.where_clause(plan);
    let order_clause = if plan.order_by.is_empty() {
        String::new()
    } else {
        let keys = plan
            .order_by
            .iter()
            .map(|(field, direction)| format!("{} {}", r.column(field), direction.as_sql()))
            .collect::<Vec<_>>()
            .join(", ");
        format!("\nORDER BY {}", keys)
    };

    let sql = format!(
        "SELECT {table}.*\nFROM {table}{joins}{where_clause}{order_clause}\nLIMIT {limit} OFFSET {offset}",
        limit = plan.limit,
        offset = plan.offset,
    );
    r.finish(sql)
}

pub fn render_count(plan: &QueryPlan, table: &str, scope: CountScope) -> RenderedSql {
    let mut r = Renderer::new(table);

    let sql = match scope {
        CountScope::Total => format!("SELECT COUNT(*)\nFROM {}", table),
        CountScope::Filtered => {
            let joins = r.joins(plan);
            let where_clause = r.where_clause(plan);
            format!("SELECT COUNT(*)\nFROM {}{}{}", table, joins, where_clause)
        }
    };
    r.finish(sql)
}
