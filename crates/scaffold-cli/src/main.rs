//! Scaffold CLI: answers admin grid requests from a schema catalog and a
//! JSON row dataset.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use scaffold_core::form::{compile_form, generate_filters};
use scaffold_core::grid::memory::MemoryStore;
use scaffold_core::grid::transform::UrlActions;
use scaffold_core::grid::{compile_grid_plan, serve, Action, ActionSet, GridRequest, OutputFormat};
use scaffold_core::schema::SchemaRegistry;
use scaffold_core::sql::{render_count, render_select, CountScope};

#[derive(Parser, Debug)]
#[command(name = "scaffold")]
#[command(version, long_about = None)]
#[command(about = "Admin grid and form scaffolding over a schema catalog")]
struct Cli {
    /// Schema catalog: a JSON array of model schemas
    #[arg(long, env = "SCAFFOLD_CATALOG", value_name = "PATH")]
    catalog: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List registered models
    Models,

    /// Answer one grid request
    Grid {
        model: String,

        /// Grid widget parameters, e.g. `sSearch=foo iDisplayLength=25`
        #[arg(value_parser = parse_param)]
        params: Vec<(String, String)>,

        /// Row dataset: a JSON array of objects
        #[arg(long, env = "SCAFFOLD_ROWS", value_name = "PATH")]
        rows: PathBuf,

        /// Response encoding, by extension (json or xml)
        #[arg(long, default_value = "json")]
        format: String,

        /// Base URL of the row action links; no actions cell without it
        #[arg(long, value_name = "URL")]
        actions: Option<String>,

        /// Actions to withhold from the links (view, edit, delete)
        #[arg(long, value_delimiter = ',')]
        deny: Vec<String>,
    },

    /// Print the SQL a grid request compiles to
    Sql {
        model: String,

        #[arg(value_parser = parse_param)]
        params: Vec<(String, String)>,

        /// Base table (default: the model identifier)
        #[arg(long)]
        table: Option<String>,
    },

    /// Print the compiled form of a model
    Form { model: String },

    /// Print the list filter widgets of a model
    Filters { model: String },
}

fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let catalog = cli.catalog.to_string_lossy();
    let registry = SchemaRegistry::load(&catalog)?;
    tracing::debug!(catalog = %catalog, models = registry.models().len(), "loaded schema catalog");

    match cli.command {
        Command::Models => {
            for model in registry.models() {
                println!("{model}");
            }
        }
        Command::Grid {
            model,
            params,
            rows,
            format,
            actions,
            deny,
        } => {
            let store = load_rows(&model, &rows)?;
            let request = GridRequest::from_params(&params.into_iter().collect::<HashMap<_, _>>());

            let check =
                |_: &str, action: Action| !deny.iter().any(|denied| denied == action.as_str());
            let builder = actions.map(UrlActions::new);
            let action_set = builder
                .as_ref()
                .map(|builder| ActionSet::new(&model, &check, builder));

            let response = serve(&registry, &model, store.query(), &request, action_set)
                .with_context(|| format!("grid request for {model}"))?;

            let format = OutputFormat::from_extension(&format);
            tracing::info!(
                model = %model,
                total = response.total_records,
                filtered = response.total_display_records,
                content_type = format.content_type(),
                "answered grid request"
            );
            println!("{}", format.encode(&response)?);
        }
        Command::Sql { model, params, table } => {
            let properties = registry.list_properties(&model)?;
            let request = GridRequest::from_params(&params.into_iter().collect::<HashMap<_, _>>());
            let plan = compile_grid_plan(&properties, &request);
            let table = table.unwrap_or_else(|| model.clone());

            for rendered in [
                render_count(&plan, &table, CountScope::Total),
                render_count(&plan, &table, CountScope::Filtered),
                render_select(&plan, &table),
            ] {
                println!("{};", rendered.sql);
                println!("-- params: {}\n", serde_json::to_string(&rendered.params)?);
            }
        }
        Command::Form { model } => {
            let form = compile_form(&registry, &model)?;
            println!("{}", serde_json::to_string_pretty(&form)?);
        }
        Command::Filters { model } => {
            let filters = generate_filters(&registry, &model)?;
            println!("{}", serde_json::to_string_pretty(&filters)?);
        }
    }

    Ok(())
}

fn load_rows(model: &str, path: &Path) -> anyhow::Result<MemoryStore> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("read rows: {}", path.display()))?;
    let value = serde_json::from_str(&raw)
        .with_context(|| format!("parse rows: {}", path.display()))?;
    Ok(MemoryStore::from_value(model, value))
}

fn parse_param(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .ok_or_else(|| format!("expected key=value, got '{raw}'"))
}
