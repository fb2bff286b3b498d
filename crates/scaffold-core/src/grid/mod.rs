//! Grid data: request parsing, query compilation and execution, row shaping.

pub mod compile;
pub mod execute;
pub mod memory;
pub mod plan;
pub mod relations;
pub mod request;
pub mod response;
pub mod transform;

use serde_json::{Map, Value};

use crate::schema::registry::SchemaRegistry;

pub use compile::{compile_grid_plan, compile_grid_plan_with_defaults};
pub use execute::{run_grid_query, GridError, GridPage, GridQuery};
pub use plan::{Predicate, QueryPlan};
pub use request::{GridRequest, SortDirection};
pub use response::{GridResponse, OutputFormat};
pub use transform::{transform_row, Action, ActionSet, RowTransformer};

/// A stored record with its attributes; related records are nested objects.
pub type Row = Map<String, Value>;

/// Answers one grid request for `model`: compile the list properties against
/// the request, run the plan on `query` and shape every row.
pub fn serve<Q>(
    registry: &SchemaRegistry,
    model: &str,
    query: Q,
    request: &GridRequest,
    actions: Option<ActionSet<'_>>,
) -> Result<GridResponse, GridError<Q::Error>>
where
    Q: GridQuery<Row = Row>,
{
    let properties = registry.list_properties(model)?;
    let plan = compile_grid_plan(&properties, request);
    let page = run_grid_query(query, &plan).map_err(GridError::Query)?;

    let data = page
        .rows
        .iter()
        .map(|row| transform_row(row, &properties, actions.as_ref()))
        .collect();

    Ok(GridResponse {
        echo: request.echo.clone(),
        total_records: page.total,
        total_display_records: page.filtered,
        data,
    })
}
