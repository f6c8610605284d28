//! # gadm-geojson
//!
//! Conversion des archives Shapefile GADM en GeoJSON, puis validation et
//! réparation des fichiers produits.
//!
//! ## Features
//!
//! - Extraction des archives (.zip, .tar.bz2) dans une zone de travail
//! - Conversion idempotente Shapefile → GeoJSON, CRS ramené en WGS84
//! - Validation (JSON, features, CRS, emprise) et régénération depuis la source
//! - Liste des codes pays présents dans un dossier de sortie
//!
//! ## Usage CLI
//!
//! ```bash
//! # Conversion puis validation avec les dossiers par défaut
//! gadm-geojson
//!
//! # Étapes séparées
//! gadm-geojson convert --input ./shapefile --output ./geojson
//! gadm-geojson validate --report validation.json
//! gadm-geojson countries --dir ./geojson
//! ```

pub mod config;
pub mod convert;
pub mod countries;
pub mod export;
pub mod report;
pub mod validate;

pub use config::PipelineConfig;
pub use report::{ConversionReport, FileState, PipelineReport, ValidationReport};

use std::path::{Path, PathBuf};

/// `*.geojson` directement sous `dir`, triés; vide si le dossier n'existe pas
pub fn list_geojson_files(dir: &Path) -> Vec<PathBuf> {
    let pattern = format!(
        "{}/*.geojson",
        glob::Pattern::escape(&dir.to_string_lossy())
    );
    let Ok(paths) = glob::glob(&pattern) else {
        return Vec::new();
    };

    let mut files: Vec<PathBuf> = paths
        .filter_map(|entry| entry.ok())
        .filter(|path| path.is_file())
        .collect();
    files.sort();
    files
}

/// Conversion puis validation, dans cet ordre
pub fn run_pipeline(config: &PipelineConfig) -> anyhow::Result<PipelineReport> {
    let conversion = convert::convert_archives(config)?;
    let validation = validate::validate_and_repair(config);

    Ok(PipelineReport {
        conversion: Some(conversion),
        validation: Some(validation),
    })
}
