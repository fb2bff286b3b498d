use std::cmp::Ordering;
use std::convert::Infallible;

use indexmap::IndexMap;
use serde_json::Value;

use crate::error::{ScaffoldError, ScaffoldResult};
use crate::grid::execute::GridQuery;
use crate::grid::plan::Predicate;
use crate::grid::request::SortDirection;
use crate::grid::Row;
use crate::schema::declaration::display_value;

/// Rows of one model held in memory. Related records are nested objects,
/// so `author.name` reads `row["author"]["name"]`.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    model: String,
    rows: Vec<Row>,
}

impl MemoryStore {
    pub fn new(model: impl Into<String>, rows: Vec<Row>) -> Self {
        Self { model: model.into(), rows }
    }

    /// Builds a store from a JSON array of objects; other entries are skipped.
    pub fn from_value(model: impl Into<String>, value: Value) -> Self {
        let rows = match value {
            Value::Array(items) => items
                .into_iter()
                .filter_map(|item| match item {
                    Value::Object(row) => Some(row),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        };
        Self::new(model, rows)
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn query(&self) -> MemoryQuery<'_> {
        MemoryQuery::new(&self.rows)
    }

    pub fn find(&self, id: &Value) -> ScaffoldResult<&Row> {
        self.rows
            .iter()
            .find(|row| row.get("id").is_some_and(|own| loose_eq(own, id)))
            .ok_or_else(|| ScaffoldError::NotFound {
                model: self.model.clone(),
                id: display_value(id),
            })
    }
}

enum Clause {
    All(Predicate),
    Any(Vec<Predicate>),
}

/// Query builder over a row slice. Eager loading is a no-op since related
/// records are already embedded. An `or_where` outside a group stands alone.
pub struct MemoryQuery<'a> {
    rows: &'a [Row],
    relations: Vec<String>,
    clauses: Vec<Clause>,
    open: Option<Vec<Predicate>>,
    order: Vec<(String, SortDirection)>,
    limit: Option<u64>,
    offset: u64,
}

impl<'a> MemoryQuery<'a> {
    pub fn new(rows: &'a [Row]) -> Self {
        Self {
            rows,
            relations: Vec::new(),
            clauses: Vec::new(),
            open: None,
            order: Vec::new(),
            limit: None,
            offset: 0,
        }
    }

    pub fn relations(&self) -> &[String] {
        &self.relations
    }

    fn matching(&self) -> impl Iterator<Item = &'a Row> + '_ {
        self.rows.iter().filter(move |row| {
            self.clauses.iter().all(|clause| match clause {
                Clause::All(predicate) => matches(row, predicate),
                Clause::Any(group) => group.iter().any(|predicate| matches(row, predicate)),
            })
        })
    }
}

impl<'a> GridQuery for MemoryQuery<'a> {
    type Row = Row;
    type Error = Infallible;

    fn related(&mut self, path: &str) {
        if !self.relations.iter().any(|known| known == path) {
            self.relations.push(path.to_string());
        }
    }

    fn and_where(&mut self, predicate: &Predicate) {
        self.clauses.push(Clause::All(predicate.clone()));
    }

    fn where_open(&mut self) {
        self.open = Some(Vec::new());
    }

    fn or_where(&mut self, predicate: &Predicate) {
        match self.open.as_mut() {
            Some(group) => group.push(predicate.clone()),
            None => self.clauses.push(Clause::Any(vec![predicate.clone()])),
        }
    }

    fn where_close(&mut self) {
        if let Some(group) = self.open.take() {
            if !group.is_empty() {
                self.clauses.push(Clause::Any(group));
            }
        }
    }

    fn order_by(&mut self, order: &IndexMap<String, SortDirection>) {
        self.order
            .extend(order.iter().map(|(field, direction)| (field.clone(), *direction)));
    }

    fn limit(&mut self, limit: u64) {
        self.limit = Some(limit);
    }

    fn offset(&mut self, offset: u64) {
        self.offset = offset;
    }

    fn count(&self) -> Result<u64, Infallible> {
        Ok(self.matching().count() as u64)
    }

    fn get(&self) -> Result<Vec<Row>, Infallible> {
        let mut rows = self.matching().collect::<Vec<_>>();

        rows.sort_by(|a, b| {
            self.order
                .iter()
                .map(|(field, direction)| {
                    let ord = compare(lookup(a, field), lookup(b, field));
                    match direction {
                        SortDirection::Asc => ord,
                        SortDirection::Desc => ord.reverse(),
                    }
                })
                .find(|ord| ord.is_ne())
                .unwrap_or(Ordering::Equal)
        });

        let page = rows.into_iter().skip(self.offset as usize);
        let page: Vec<Row> = match self.limit {
            Some(limit) => page.take(limit as usize).cloned().collect(),
            None => page.cloned().collect(),
        };
        Ok(page)
    }
}

/// Reads a dotted path through nested objects, falling back to a literal
/// dotted key.
pub fn lookup<'r>(row: &'r Row, field: &str) -> Option<&'r Value> {
    let mut segments = field.split('.');
    let first = segments.next()?;
    let nested = row.get(first).and_then(|start| {
        segments.try_fold(start, |value, segment| value.as_object()?.get(segment))
    });
    nested.or_else(|| row.get(field)).filter(|value| !value.is_null())
}

fn matches(row: &Row, predicate: &Predicate) -> bool {
    let Some(value) = lookup(row, predicate.field()) else {
        return false;
    };

    match predicate {
        Predicate::Eq { value: wanted, .. } => loose_eq(value, wanted),
        Predicate::In { values, .. } => values.iter().any(|wanted| loose_eq(value, wanted)),
        Predicate::Like { pattern, .. } => like(&display_value(value), pattern),
        Predicate::Between { low, high, .. } => {
            compare(Some(value), Some(low)).is_ge() && compare(Some(value), Some(high)).is_le()
        }
    }
}

fn loose_eq(a: &Value, b: &Value) -> bool {
    match (as_number(a), as_number(b)) {
        (Some(x), Some(y)) => x == y,
        _ => display_value(a) == display_value(b),
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Missing values sort first; numbers compare numerically, everything else
/// by text.
fn compare(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => match (as_number(a), as_number(b)) {
            (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
            _ => display_value(a).cmp(&display_value(b)),
        },
    }
}

/// Case-insensitive SQL LIKE: `%` spans any run, `_` one character.
fn like(text: &str, pattern: &str) -> bool {
    let text = text.to_lowercase().chars().collect::<Vec<_>>();
    let pattern = pattern.to_lowercase().chars().collect::<Vec<_>>();

    // reachable[j]: pattern[..j] matches the text consumed so far
    let mut reachable = vec![false; pattern.len() + 1];
    reachable[0] = true;
    for j in 1..=pattern.len() {
        reachable[j] = reachable[j - 1] && pattern[j - 1] == '%';
    }

    for c in text {
        let mut next = vec![false; pattern.len() + 1];
        for j in 1..=pattern.len() {
            next[j] = match pattern[j - 1] {
                '%' => next[j - 1] || reachable[j],
                '_' => reachable[j - 1],
                p => reachable[j - 1] && p == c,
            };
        }
        reachable = next;
    }

    reachable[pattern.len()]
}
