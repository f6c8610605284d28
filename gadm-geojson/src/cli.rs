//! Définition et implémentation des commandes CLI
//!
//! - `run` (défaut): conversion puis validation
//! - `convert`: archives → GeoJSON
//! - `validate`: validation + réparation des GeoJSON
//! - `countries`: codes pays présents dans un dossier

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Args, Subcommand};
use tracing::info;

use gadm_geojson::config::PipelineConfig;
use gadm_geojson::{convert, countries, validate, PipelineReport};

#[derive(Subcommand)]
pub enum Commands {
    /// Convert every archive, then validate and repair the output (default)
    Run,

    /// Convert Shapefile archives to GeoJSON
    Convert,

    /// Validate GeoJSON files and regenerate invalid ones from their shapefile
    Validate,

    /// Print the ISO3 country codes found in GeoJSON file names
    Countries {
        /// Directory to scan (default: the output directory)
        #[arg(short, long)]
        dir: Option<PathBuf>,
    },
}

/// Options de chemins communes à toutes les commandes
#[derive(Args, Debug, Default)]
pub struct PathArgs {
    /// JSON config file with input_root / output_root / scratch_root
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory searched recursively for .zip, .tar.bz2 and .tbz2 archives (default: ./shapefile)
    #[arg(short, long, global = true)]
    pub input: Option<PathBuf>,

    /// GeoJSON output directory (default: ./geojson)
    #[arg(short, long, global = true)]
    pub output: Option<PathBuf>,

    /// Extraction directory, never cleaned (default: ./temp_shp)
    #[arg(short, long, global = true)]
    pub scratch: Option<PathBuf>,

    /// Save the stage report(s) as JSON
    #[arg(long, global = true)]
    pub report: Option<PathBuf>,
}

impl PathArgs {
    /// Défauts, puis fichier de config, puis drapeaux
    pub fn resolve(&self) -> Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::load(path)?,
            None => PipelineConfig::default(),
        };
        config.apply_overrides(
            self.input.clone(),
            self.output.clone(),
            self.scratch.clone(),
        );
        Ok(config)
    }
}

/// Conversion puis validation
pub fn cmd_run(config: &PipelineConfig, report_path: Option<&Path>) -> Result<()> {
    print_paths(config);

    let report = gadm_geojson::run_pipeline(config)?;
    if let Some(conversion) = &report.conversion {
        conversion.display();
    }
    if let Some(validation) = &report.validation {
        validation.display();
    }

    save_report(&report, report_path)
}

/// Conversion seule
pub fn cmd_convert(config: &PipelineConfig, report_path: Option<&Path>) -> Result<()> {
    print_paths(config);

    let conversion = convert::convert_archives(config)?;
    conversion.display();

    let report = PipelineReport {
        conversion: Some(conversion),
        validation: None,
    };
    save_report(&report, report_path)
}

/// Validation seule
pub fn cmd_validate(config: &PipelineConfig, report_path: Option<&Path>) -> Result<()> {
    println!("GeoJSON: {}", config.output_root.display());
    println!("Sources: {}", config.scratch_root.display());

    let validation = validate::validate_and_repair(config);
    validation.display();

    let report = PipelineReport {
        conversion: None,
        validation: Some(validation),
    };
    save_report(&report, report_path)
}

/// Liste des codes pays
pub fn cmd_countries(dir: &Path) -> Result<()> {
    let codes: Vec<String> = countries::collect_country_codes(dir).into_iter().collect();
    info!("{} country codes in {}", codes.len(), dir.display());
    println!("{:?}", codes);
    Ok(())
}

fn print_paths(config: &PipelineConfig) {
    println!("Input: {}", config.input_root.display());
    println!("Output: {}", config.output_root.display());
    println!("Scratch: {}", config.scratch_root.display());
}

fn save_report(report: &PipelineReport, path: Option<&Path>) -> Result<()> {
    if let Some(path) = path {
        report.save_to_file(path)?;
        info!("Report saved to {}", path.display());
    }
    Ok(())
}
