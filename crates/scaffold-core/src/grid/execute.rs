use indexmap::IndexMap;
use thiserror::Error;

use crate::error::ScaffoldError;
use crate::grid::plan::{Predicate, QueryPlan};
use crate::grid::request::SortDirection;

/// Query builder of the storage layer.
///
/// Calls arrive in plan order: relations, ANDed predicates, one
/// `where_open`/`or_where`.../`where_close` group, ordering, then paging.
/// `count` ignores limit and offset.
pub trait GridQuery {
    type Row;
    type Error;

    fn related(&mut self, path: &str);
    fn and_where(&mut self, predicate: &Predicate);
    fn where_open(&mut self);
    fn or_where(&mut self, predicate: &Predicate);
    fn where_close(&mut self);
    fn order_by(&mut self, order: &IndexMap<String, SortDirection>);
    fn limit(&mut self, limit: u64);
    fn offset(&mut self, offset: u64);
    fn count(&self) -> Result<u64, Self::Error>;
    fn get(&self) -> Result<Vec<Self::Row>, Self::Error>;
}

/// One page of rows plus the counts a grid widget displays.
#[derive(Debug, Clone, PartialEq)]
pub struct GridPage<R> {
    pub rows: Vec<R>,
    /// Rows of the unfiltered base query.
    pub total: u64,
    /// Rows left after filtering, before paging.
    pub filtered: u64,
}

#[derive(Debug, Error)]
pub enum GridError<E> {
    #[error(transparent)]
    Schema(#[from] ScaffoldError),

    #[error("grid query failed: {0}")]
    Query(#[source] E),
}

/// Runs `plan` on `query`. The total is counted before any predicate is
/// applied; storage errors come back untouched.
pub fn run_grid_query<Q: GridQuery>(
    mut query: Q,
    plan: &QueryPlan,
) -> Result<GridPage<Q::Row>, Q::Error> {
    let total = query.count()?;

    for path in &plan.relations {
        query.related(path);
    }
    for predicate in &plan.filters {
        query.and_where(predicate);
    }
    if !plan.global.is_empty() {
        query.where_open();
        for predicate in &plan.global {
            query.or_where(predicate);
        }
        query.where_close();
    }
    query.order_by(&plan.order_by);

    let filtered = query.count()?;

    query.limit(plan.limit);
    query.offset(plan.offset);
    let rows = query.get()?;

    tracing::debug!(total, filtered, rows = rows.len(), "ran grid query");
    Ok(GridPage { rows, total, filtered })
}
