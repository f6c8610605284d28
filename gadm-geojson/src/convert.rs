//! Conversion des archives de Shapefiles en GeoJSON
//!
//! Contrat d'idempotence: l'existence de `<sortie>/<base>.geojson` signifie
//! "déjà converti". Un second passage sur les mêmes archives ne réécrit rien
//! et compte chaque jeu en `AlreadyExists`. Les écritures passent par un
//! fichier temporaire, donc un GeoJSON présent est toujours complet.

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use shapezip::{archive, DatasetFiles, ShapezipError};
use tracing::{info, warn};

use crate::config::PipelineConfig;
use crate::export::geojson::export_to_geojson;
use crate::export::normalize_to_wgs84;
use crate::report::{ConversionOutcome, ConversionReport, DatasetRecord};

/// Chemin du GeoJSON correspondant à un .shp
pub fn target_path(shp_path: &Path, output_root: &Path) -> PathBuf {
    output_root.join(format!("{}.geojson", shapezip::base_name(shp_path)))
}

/// Convertit toutes les archives de `input_root`
///
/// Chaque archive est extraite dans `<scratch_root>/<nom de l'archive>/`, jamais
/// nettoyé ensuite. Une archive illisible est comptée en échec sans arrêter
/// le lot; seule la création des dossiers de sortie est fatale.
pub fn convert_archives(config: &PipelineConfig) -> Result<ConversionReport> {
    let started_at = Instant::now();
    let mut report = ConversionReport::new();

    std::fs::create_dir_all(&config.output_root).context(format!(
        "Failed to create output directory: {}",
        config.output_root.display()
    ))?;
    std::fs::create_dir_all(&config.scratch_root).context(format!(
        "Failed to create scratch directory: {}",
        config.scratch_root.display()
    ))?;

    let archives = archive::collect_archives(&config.input_root);
    if archives.is_empty() {
        warn!("No archives found in {}", config.input_root.display());
        return Ok(report);
    }

    info!("Found {} archives to convert", archives.len());

    for archive_path in &archives {
        let archive_name = archive_path
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| archive_path.display().to_string());

        let extracted = match archive::extract(archive_path, &config.scratch_root) {
            Ok(extracted) => extracted,
            Err(e) => {
                warn!("Failed to extract {}: {}", archive_path.display(), e);
                report.record_archive_failure(&archive_name, &e.to_string());
                continue;
            }
        };
        report.record_archive_success();

        for shp_path in shapezip::find_datasets(&extracted.dir) {
            let target = target_path(&shp_path, &config.output_root);
            let outcome = convert_dataset(&shp_path, &target);

            report.record(DatasetRecord {
                archive: archive_name.clone(),
                source: shp_path.display().to_string(),
                target: target.display().to_string(),
                outcome,
            });
        }
    }

    report.set_duration(started_at.elapsed());
    info!("Conversion finished: {}", report.summary());

    Ok(report)
}

/// Convertit un .shp vers `target`, sans jamais propager d'erreur
pub fn convert_dataset(shp_path: &Path, target: &Path) -> ConversionOutcome {
    if target.exists() {
        info!("Already exists, skipping: {}", target.display());
        return ConversionOutcome::AlreadyExists;
    }

    let files = match DatasetFiles::locate(shp_path) {
        Ok(files) => files,
        Err(ShapezipError::MissingFiles(missing)) => {
            let missing: Vec<String> = missing.iter().map(|p| p.display().to_string()).collect();
            warn!(
                "Missing required files: [{}], skipping {}",
                missing.join(", "),
                shp_path.display()
            );
            return ConversionOutcome::MissingFiles { missing };
        }
        Err(e) => {
            warn!("Conversion failed: {}, error: {}", shp_path.display(), e);
            return ConversionOutcome::Failed {
                error: e.to_string(),
            };
        }
    };

    match convert_files(&files, target) {
        Ok(features) => {
            info!("Converted: {} ({} features)", target.display(), features);
            ConversionOutcome::Converted { features }
        }
        Err(e) => {
            warn!("Conversion failed: {}, error: {:#}", shp_path.display(), e);
            ConversionOutcome::Failed {
                error: format!("{:#}", e),
            }
        }
    }
}

/// Relit un .shp, le ramène en WGS84 et écrit (ou réécrit) `target`
pub fn regenerate(shp_path: &Path, target: &Path) -> Result<usize> {
    let files = DatasetFiles::locate(shp_path)?;
    convert_files(&files, target)
}

fn convert_files(files: &DatasetFiles, target: &Path) -> Result<usize> {
    let dataset = shapezip::dataset::read(files)
        .with_context(|| format!("Failed to read {}", files.shp.display()))?;

    if !dataset.errors.is_empty() {
        warn!(
            "{}: {} records skipped (invalid geometry)",
            dataset.base_name,
            dataset.errors.len()
        );
    }

    let dataset = normalize_to_wgs84(dataset)?;
    export_to_geojson(&dataset, target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_target_path() {
        assert_eq!(
            target_path(
                Path::new("temp_shp/gadm41_FRA_shp/gadm41_FRA_1.shp"),
                Path::new("geojson")
            ),
            PathBuf::from("geojson/gadm41_FRA_1.geojson")
        );
    }

    #[test]
    fn test_convert_dataset_already_exists() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("gadm41_FRA_1.geojson");
        fs::write(&target, "{}").unwrap();

        let outcome = convert_dataset(&dir.path().join("gadm41_FRA_1.shp"), &target);
        assert_eq!(outcome, ConversionOutcome::AlreadyExists);
        assert_eq!(fs::read_to_string(&target).unwrap(), "{}");
    }

    #[test]
    fn test_convert_dataset_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let shp = dir.path().join("gadm41_FRA_1.shp");
        fs::write(&shp, b"").unwrap();
        fs::write(dir.path().join("gadm41_FRA_1.shx"), b"").unwrap();
        let target = dir.path().join("gadm41_FRA_1.geojson");

        match convert_dataset(&shp, &target) {
            ConversionOutcome::MissingFiles { missing } => {
                assert_eq!(missing.len(), 1);
                assert!(missing[0].ends_with("gadm41_FRA_1.dbf"));
            }
            other => panic!("Expected MissingFiles, got {:?}", other),
        }
        assert!(!target.exists());
    }

    #[test]
    fn test_convert_dataset_corrupt_source() {
        let dir = tempfile::tempdir().unwrap();
        for ext in ["shp", "shx", "dbf"] {
            fs::write(dir.path().join(format!("broken.{}", ext)), b"garbage").unwrap();
        }
        let target = dir.path().join("broken.geojson");

        let outcome = convert_dataset(&dir.path().join("broken.shp"), &target);
        assert!(matches!(outcome, ConversionOutcome::Failed { .. }));
        assert!(!target.exists());
    }

    #[test]
    fn test_convert_archives_no_input() {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfig::with_root(dir.path());

        let report = convert_archives(&config).unwrap();
        assert_eq!(report.archives_processed, 0);
        assert!(config.output_root.is_dir());
        assert!(config.scratch_root.is_dir());
    }
}
