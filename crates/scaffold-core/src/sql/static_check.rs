use anyhow::ensure;
use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::parser::Parser;

use crate::sql::render::RenderedSql;

/// Parses rendered SQL with the Postgres dialect; it must be one statement
/// whose highest placeholder matches the bound parameters.
pub fn parse_ok(rendered: &RenderedSql) -> anyhow::Result<()> {
    let dialect = PostgreSqlDialect {};
    let statements = Parser::parse_sql(&dialect, &rendered.sql)?;
    ensure!(statements.len() == 1, "expected one statement, got {}", statements.len());

    let highest = highest_placeholder(&rendered.sql);
    ensure!(
        highest == rendered.params.len(),
        "placeholders up to ${} but {} params bound",
        highest,
        rendered.params.len()
    );
    Ok(())
}

fn highest_placeholder(sql: &str) -> usize {
    sql.split('$')
        .skip(1)
        .filter_map(|rest| {
            let digits = rest.chars().take_while(char::is_ascii_digit).collect::<String>();
            digits.parse::<usize>().ok()
        })
        .max()
        .unwrap_or(0)
}
