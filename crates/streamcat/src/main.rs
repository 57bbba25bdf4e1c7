use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use streamcat_catalog::{CatalogContext, Settings, TableDescriptionSupplier};
use streamcat_common::SchemaTableName;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Settings file; defaults to `STREAMCAT_CONFIG_PATH` or `crates/streamcat/config/default.toml`.
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print every known table and the stream behind it.
    List,
    /// Print the fields of one table, given as `schema.table` or `table`.
    Describe { table: String },
    /// Keep polling and log each new snapshot until interrupted.
    Watch,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("streamcat=info,streamcat_catalog=info,warn")),
        )
        .init();

    let args = Args::parse();
    let settings = match &args.config {
        Some(path) => Settings::from_file(path)?,
        None => Settings::new()?,
    };

    let context = CatalogContext::start(settings).await?;
    let supplier = context.supplier();

    let result = match args.command {
        Command::List => {
            list(&supplier);
            Ok(())
        }
        Command::Describe { table } => describe(&context, &supplier, &table),
        Command::Watch => watch(&supplier).await,
    };

    context.shutdown().await;
    result
}

fn list(supplier: &TableDescriptionSupplier) {
    let snapshot = supplier.get();
    for name in supplier.table_names() {
        if let Some(description) = snapshot.get(&name) {
            println!("{} -> {}", name, description.stream_name());
        }
    }
}

fn describe(
    context: &CatalogContext,
    supplier: &TableDescriptionSupplier,
    table: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let name = SchemaTableName::parse(table, &context.settings().default_schema)?;
    let description = supplier
        .describe(&name)
        .ok_or_else(|| format!("table {} not found", name))?;

    println!("table:  {}", name);
    println!("stream: {}", description.stream_name());
    match description.message() {
        Some(message) => {
            println!("format: {}", message.data_format());
            for field in message.fields() {
                let hidden = if field.is_hidden() { " (hidden)" } else { "" };
                println!(
                    "  {} {} <- {}{}",
                    field.name(),
                    field.type_name(),
                    field.mapping().unwrap_or(field.name()),
                    hidden
                );
            }
        }
        None => println!("format: <none>"),
    }

    let schema = description.arrow_schema(context.hide_internal_columns())?;
    println!("arrow schema:");
    for field in schema.fields() {
        println!("  {}: {}", field.name(), field.data_type());
    }
    Ok(())
}

async fn watch(supplier: &TableDescriptionSupplier) -> Result<(), Box<dyn std::error::Error>> {
    let mut updates = supplier.subscribe();
    let current = updates.borrow_and_update().clone();
    info!(generation = current.generation(), tables = current.len(), "watching table descriptions");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted, shutting down");
                return Ok(());
            }
            changed = updates.changed() => {
                changed?;
                let snapshot = updates.borrow_and_update().clone();
                info!(
                    generation = snapshot.generation(),
                    origin = ?snapshot.origin(),
                    tables = snapshot.len(),
                    "table descriptions updated"
                );
            }
        }
    }
}
