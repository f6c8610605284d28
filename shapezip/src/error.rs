//! Types d'erreurs pour le crate shapezip

use std::path::PathBuf;

use thiserror::Error;

/// Erreurs pouvant survenir lors de l'extraction ou de la lecture d'un Shapefile
#[derive(Debug, Error)]
pub enum ShapezipError {
    /// Erreur d'I/O
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Archive zip corrompue ou illisible
    #[error("Invalid zip archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Format d'archive non reconnu (extension)
    #[error("Unsupported archive format: {0}")]
    UnsupportedArchive(String),

    /// Fichiers frères manquants (.shp, .shx, .dbf)
    #[error("Missing required files: {}", display_paths(.0))]
    MissingFiles(Vec<PathBuf>),

    /// Erreur de lecture du Shapefile ou de sa table attributaire
    #[error("Shapefile error in {file}: {reason}")]
    Shapefile { file: String, reason: String },

    /// Géométrie non convertible
    #[error("Invalid geometry for record {record}: {reason}")]
    InvalidGeometry { record: usize, reason: String },
}

impl ShapezipError {
    /// Crée une erreur de lecture avec contexte
    pub fn shapefile(file: impl Into<String>, reason: impl ToString) -> Self {
        Self::Shapefile {
            file: file.into(),
            reason: reason.to_string(),
        }
    }

    /// Crée une erreur de géométrie invalide
    pub fn invalid_geometry(record: usize, reason: impl ToString) -> Self {
        Self::InvalidGeometry {
            record,
            reason: reason.to_string(),
        }
    }
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
