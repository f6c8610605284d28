//! Point d'entrée CLI pour gadm-geojson

use anyhow::Result;
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::{fmt, EnvFilter};

mod cli;

use cli::{Commands, PathArgs};

// Charger .env au démarrage
fn load_env() {
    // Chercher .env dans le répertoire courant ou parent
    if dotenvy::dotenv().is_err() {
        // Essayer depuis le répertoire du binaire
        if let Ok(exe) = std::env::current_exe() {
            if let Some(dir) = exe.parent() {
                let _ = dotenvy::from_path(dir.join(".env"));
            }
        }
    }
}

/// Convertir les archives Shapefile GADM en GeoJSON, puis valider et réparer
#[derive(Parser)]
#[command(name = "gadm-geojson")]
#[command(author, version)]
#[command(about = "Convert GADM Shapefile archives to GeoJSON, then validate and repair the output")]
#[command(long_about = "Extracts every archive (.zip, .tar.bz2, .tbz2) found under the input directory, converts each shapefile to a WGS84 GeoJSON file (skipping files that already exist), then validates every GeoJSON file and regenerates invalid ones from their extracted shapefile.\n\nWithout a subcommand, runs convert then validate.")]
struct Cli {
    /// Augmenter la verbosité (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Mode silencieux
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(flatten)]
    paths: PathArgs,

    /// Sous-commande (défaut: run)
    #[command(subcommand)]
    command: Option<Commands>,
}

fn main() -> Result<()> {
    load_env();

    let cli = Cli::parse();

    init_logging(cli.verbose, cli.quiet);

    let config = cli.paths.resolve()?;
    let report_path = cli.paths.report.as_deref();

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => {
            info!(input = %config.input_root.display(), output = %config.output_root.display(), "Convert + validate");
            cli::cmd_run(&config, report_path)?;
        }
        Commands::Convert => {
            info!(input = %config.input_root.display(), output = %config.output_root.display(), "Convert");
            cli::cmd_convert(&config, report_path)?;
        }
        Commands::Validate => {
            info!(output = %config.output_root.display(), "Validate");
            cli::cmd_validate(&config, report_path)?;
        }
        Commands::Countries { dir } => {
            let dir = dir.unwrap_or_else(|| config.output_root.clone());
            cli::cmd_countries(&dir)?;
        }
    }

    Ok(())
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => Level::WARN,
        (_, 0) => Level::INFO,
        (_, 1) => Level::DEBUG,
        (_, _) => Level::TRACE,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}
