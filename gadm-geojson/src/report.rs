//! Rapports de conversion et de validation
//!
//! Chaque étape retourne son rapport: compteurs agrégés et issue de chaque
//! fichier traité. Aucun compteur global.

use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use serde::Serialize;

/// Issue de la conversion d'un Shapefile
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ConversionOutcome {
    /// GeoJSON écrit
    Converted { features: usize },
    /// Le GeoJSON existait déjà
    AlreadyExists,
    /// .shp, .shx ou .dbf absent
    MissingFiles { missing: Vec<String> },
    /// Lecture, reprojection ou écriture en échec
    Failed { error: String },
}

/// Issue pour un Shapefile donné
#[derive(Debug, Clone, Serialize)]
pub struct DatasetRecord {
    /// Archive d'origine
    pub archive: String,
    /// Chemin du .shp
    pub source: String,
    /// Chemin du GeoJSON cible
    pub target: String,
    pub outcome: ConversionOutcome,
}

/// Archive non extraite
#[derive(Debug, Clone, Serialize)]
pub struct ArchiveFailure {
    pub archive: String,
    pub error: String,
}

/// Rapport de l'étape de conversion
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConversionReport {
    /// Durée de l'étape
    pub duration_secs: f64,

    /// Nombre d'archives traitées (y compris en échec)
    pub archives_processed: usize,
    /// Nombre d'archives dont l'extraction a échoué
    pub archives_failed: usize,

    /// GeoJSON écrits
    pub converted: usize,
    /// GeoJSON déjà présents
    pub already_exists: usize,
    /// Jeux incomplets
    pub missing_files: usize,
    /// Conversions en échec
    pub failed: usize,

    pub datasets: Vec<DatasetRecord>,
    pub archive_failures: Vec<ArchiveFailure>,
}

impl ConversionReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enregistre l'issue d'un Shapefile
    pub fn record(&mut self, record: DatasetRecord) {
        match record.outcome {
            ConversionOutcome::Converted { .. } => self.converted += 1,
            ConversionOutcome::AlreadyExists => self.already_exists += 1,
            ConversionOutcome::MissingFiles { .. } => self.missing_files += 1,
            ConversionOutcome::Failed { .. } => self.failed += 1,
        }
        self.datasets.push(record);
    }

    /// Enregistre une archive extraite
    pub fn record_archive_success(&mut self) {
        self.archives_processed += 1;
    }

    /// Enregistre une archive en échec
    pub fn record_archive_failure(&mut self, archive: &str, error: &str) {
        self.archives_processed += 1;
        self.archives_failed += 1;
        self.archive_failures.push(ArchiveFailure {
            archive: archive.to_string(),
            error: error.to_string(),
        });
    }

    pub fn set_duration(&mut self, duration: Duration) {
        self.duration_secs = duration.as_secs_f64();
    }

    /// Jeux ignorés pour une autre raison que "déjà présent"
    pub fn skipped_other(&self) -> usize {
        self.missing_files + self.failed
    }

    pub fn display(&self) {
        println!("\n{}", "=".repeat(60));
        println!("CONVERSION REPORT");
        println!("{}", "=".repeat(60));

        println!("\nDuration: {:.2}s", self.duration_secs);
        println!(
            "Archives: {} processed, {} failed",
            self.archives_processed, self.archives_failed
        );
        println!("Converted: {}", self.converted);
        println!("Skipped (already exists): {}", self.already_exists);
        println!(
            "Skipped (other): {} ({} missing files, {} failed)",
            self.skipped_other(),
            self.missing_files,
            self.failed
        );

        let problems: Vec<_> = self
            .datasets
            .iter()
            .filter(|d| {
                matches!(
                    d.outcome,
                    ConversionOutcome::MissingFiles { .. } | ConversionOutcome::Failed { .. }
                )
            })
            .collect();

        if !problems.is_empty() || !self.archive_failures.is_empty() {
            println!(
                "\n--- ERRORS ({}) ---",
                problems.len() + self.archive_failures.len()
            );
            for a in &self.archive_failures {
                println!("  [{}] {}", a.archive, a.error);
            }
            for d in problems.iter().take(20) {
                match &d.outcome {
                    ConversionOutcome::MissingFiles { missing } => {
                        println!("  [{}] missing {}", d.source, missing.join(", "))
                    }
                    ConversionOutcome::Failed { error } => println!("  [{}] {}", d.source, error),
                    _ => {}
                }
            }
            if problems.len() > 20 {
                println!("  ... and {} more", problems.len() - 20);
            }
        }

        println!("\n{}", "=".repeat(60));
    }

    pub fn summary(&self) -> String {
        format!(
            "{} archives: {} converted, {} already existed, {} skipped",
            self.archives_processed,
            self.converted,
            self.already_exists,
            self.skipped_other()
        )
    }
}

/// État final d'un GeoJSON après validation
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileState {
    /// Toutes les vérifications passent
    Valid { features: usize, crs: String },
    /// Invalide, régénéré depuis le Shapefile
    Repaired { reason: String, source: String },
    /// Invalide, aucun Shapefile source
    Unrepairable { reason: String },
    /// Invalide, la régénération a échoué
    RepairFailed { reason: String, error: String },
}

impl FileState {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid { .. })
    }

    /// Valid et Repaired comptent comme des réussites
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Unrepairable { .. } | Self::RepairFailed { .. })
    }
}

/// Issue pour un GeoJSON donné
#[derive(Debug, Clone, Serialize)]
pub struct FileRecord {
    pub file: String,
    pub state: FileState,
}

/// Rapport de l'étape de validation
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
    pub duration_secs: f64,

    /// Nombre de fichiers vérifiés
    pub checked: usize,
    pub valid: usize,
    pub repaired: usize,
    /// Irréparables + réparations en échec
    pub failed: usize,

    pub files: Vec<FileRecord>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, record: FileRecord) {
        self.checked += 1;
        match record.state {
            FileState::Valid { .. } => self.valid += 1,
            FileState::Repaired { .. } => self.repaired += 1,
            FileState::Unrepairable { .. } | FileState::RepairFailed { .. } => self.failed += 1,
        }
        self.files.push(record);
    }

    pub fn set_duration(&mut self, duration: Duration) {
        self.duration_secs = duration.as_secs_f64();
    }

    /// Retrouve l'état d'un fichier par son nom
    pub fn state_of(&self, file_name: &str) -> Option<&FileState> {
        self.files
            .iter()
            .find(|f| {
                Path::new(&f.file)
                    .file_name()
                    .map_or(false, |n| n == file_name)
            })
            .map(|f| &f.state)
    }

    pub fn display(&self) {
        println!("\n{}", "=".repeat(60));
        println!("VALIDATION REPORT");
        println!("{}", "=".repeat(60));

        println!("\nDuration: {:.2}s", self.duration_secs);
        println!("Files checked: {}", self.checked);
        println!("Valid: {}", self.valid);
        println!("Repaired: {}", self.repaired);
        println!("Failed: {}", self.failed);

        let failures: Vec<_> = self.files.iter().filter(|f| f.state.is_failure()).collect();
        if !failures.is_empty() {
            println!("\n--- FAILURES ({}) ---", failures.len());
            for f in failures.iter().take(20) {
                match &f.state {
                    FileState::Unrepairable { reason } => {
                        println!("  [{}] {} (no source shapefile)", f.file, reason)
                    }
                    FileState::RepairFailed { reason, error } => {
                        println!("  [{}] {} (repair failed: {})", f.file, reason, error)
                    }
                    _ => {}
                }
            }
            if failures.len() > 20 {
                println!("  ... and {} more", failures.len() - 20);
            }
        }

        println!("\n{}", "=".repeat(60));
    }

    pub fn summary(&self) -> String {
        format!(
            "{} files: {} valid, {} repaired, {} failed",
            self.checked, self.valid, self.repaired, self.failed
        )
    }
}

/// Rapports des deux étapes, pour la sauvegarde JSON
#[derive(Debug, Clone, Default, Serialize)]
pub struct PipelineReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversion: Option<ConversionReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationReport>,
}

impl PipelineReport {
    /// Sauvegarde le rapport en JSON
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}
