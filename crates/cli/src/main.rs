use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use shelf_app::import::GenreImporter;
use shelf_app::seed::{seed_demo_data, SeedOutcome};
use shelf_app::app;
use shelf_db::Database;
use shelf_kernel::settings::Settings;

/// Shelf catalog administration
#[derive(Debug, Parser)]
#[command(name = "shelf", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP API
    Serve,
    /// Create any missing catalog tables
    InitDb,
    /// Fill an empty catalog with demo books, genres and contributors
    Seed,
    /// Upsert genres from a .csv or .json file
    ImportGenres {
        /// Path to the input file
        file: PathBuf,
        /// Records per transaction; defaults to `import.batch_size`
        #[arg(long)]
        batch_size: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = Settings::load().context("failed to load shelf settings")?;
    shelf_telemetry::init(&settings.telemetry)?;

    tracing::info!(env = ?settings.environment, command = ?cli.command, "shelf cli starting");

    match cli.command {
        Command::Serve => app::serve(&settings).await,
        Command::InitDb => {
            let db = Database::connect(&settings.database).await?;
            let registry = app::build_registry(&db);
            let applied = app::init_schema(&db, &registry).await?;
            db.close().await;
            println!("schema ready ({} migration(s) applied)", applied);
            Ok(())
        }
        Command::Seed => {
            let db = connect_ready(&settings).await?;
            let outcome = seed_demo_data(&db).await?;
            db.close().await;
            match outcome {
                SeedOutcome::Skipped => println!("catalog already contains data, nothing seeded"),
                SeedOutcome::Seeded {
                    genres,
                    contributors,
                    books,
                } => println!(
                    "seeded {} genres, {} contributors, {} books",
                    genres, contributors, books
                ),
            }
            Ok(())
        }
        Command::ImportGenres { file, batch_size } => {
            if !file.exists() {
                bail!("file not found: {}", file.display());
            }
            let db = connect_ready(&settings).await?;
            let batch_size = batch_size.unwrap_or(settings.import.batch_size);
            let stats = GenreImporter::new(&db, batch_size).import_file(&file).await?;
            db.close().await;
            println!(
                "read {}, valid {}, skipped {}, created {}, updated {}, re-keyed {}, failed {}",
                stats.read,
                stats.valid,
                stats.skipped,
                stats.created,
                stats.updated,
                stats.rekeyed,
                stats.failed
            );
            Ok(())
        }
    }
}

/// Connect and make sure the schema exists.
async fn connect_ready(settings: &Settings) -> anyhow::Result<Database> {
    let db = Database::connect(&settings.database).await?;
    let registry = app::build_registry(&db);
    app::init_schema(&db, &registry).await?;
    Ok(db)
}
