//! Configuration des chemins du pipeline

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_INPUT_ROOT: &str = "./shapefile";
pub const DEFAULT_OUTPUT_ROOT: &str = "./geojson";
pub const DEFAULT_SCRATCH_ROOT: &str = "./temp_shp";

/// Dossiers utilisés par les trois étapes
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Arborescence des archives à convertir
    pub input_root: PathBuf,

    /// Dossier à plat des GeoJSON produits
    pub output_root: PathBuf,

    /// Zone d'extraction des archives (jamais nettoyée)
    pub scratch_root: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input_root: PathBuf::from(DEFAULT_INPUT_ROOT),
            output_root: PathBuf::from(DEFAULT_OUTPUT_ROOT),
            scratch_root: PathBuf::from(DEFAULT_SCRATCH_ROOT),
        }
    }
}

impl PipelineConfig {
    /// Charge une configuration depuis un fichier JSON
    ///
    /// Les clés absentes gardent leur valeur par défaut.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .context(format!("Failed to read config file: {}", path.display()))?;

        serde_json::from_str(&content).context("Failed to parse config JSON")
    }

    /// Les trois dossiers par défaut, placés sous `root`
    pub fn with_root(root: &Path) -> Self {
        Self {
            input_root: root.join("shapefile"),
            output_root: root.join("geojson"),
            scratch_root: root.join("temp_shp"),
        }
    }

    /// Applique les surcharges de la ligne de commande
    pub fn apply_overrides(
        &mut self,
        input: Option<PathBuf>,
        output: Option<PathBuf>,
        scratch: Option<PathBuf>,
    ) {
        if let Some(input) = input {
            self.input_root = input;
        }
        if let Some(output) = output {
            self.output_root = output;
        }
        if let Some(scratch) = scratch {
            self.scratch_root = scratch;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.input_root, PathBuf::from("./shapefile"));
        assert_eq!(config.output_root, PathBuf::from("./geojson"));
        assert_eq!(config.scratch_root, PathBuf::from("./temp_shp"));
    }

    #[test]
    fn test_load_partial() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipeline.json");
        std::fs::write(&path, r#"{"output_root": "/data/geojson"}"#).unwrap();

        let config = PipelineConfig::load(&path).unwrap();
        assert_eq!(config.output_root, PathBuf::from("/data/geojson"));
        assert_eq!(config.input_root, PathBuf::from(DEFAULT_INPUT_ROOT));
    }

    #[test]
    fn test_load_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipeline.json");
        std::fs::write(&path, "not json").unwrap();

        assert!(PipelineConfig::load(&path).is_err());
        assert!(PipelineConfig::load(&dir.path().join("absent.json")).is_err());
    }

    #[test]
    fn test_overrides() {
        let mut config = PipelineConfig::default();
        config.apply_overrides(None, Some(PathBuf::from("out")), None);

        assert_eq!(config.output_root, PathBuf::from("out"));
        assert_eq!(config.input_root, PathBuf::from(DEFAULT_INPUT_ROOT));
    }
}
