//! # shapezip
//!
//! Extraction d'archives de Shapefiles et lecture des jeux de données ESRI
//! (.shp/.shx/.dbf/.prj), tels que distribués par GADM.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use shapezip::{archive, find_datasets, load};
//! use std::path::Path;
//!
//! let extracted = archive::extract(Path::new("gadm41_FRA_shp.zip"), Path::new("./temp_shp"))?;
//! for shp in find_datasets(&extracted.dir) {
//!     let dataset = load(&shp)?;
//!     println!("{}: {} features ({:?})", dataset.base_name, dataset.features.len(), dataset.crs);
//! }
//! ```

pub mod archive;
pub mod dataset;
pub mod error;
pub mod types;

pub use dataset::DatasetFiles;
pub use error::ShapezipError;
pub use types::{AttributeValue, Dataset, Feature, SourceCrs};

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

/// Nom de base d'un fichier (nom sans la dernière extension)
pub fn base_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Vrai si le fichier porte l'extension `.shp`
pub fn is_shp(path: &Path) -> bool {
    path.extension().map_or(false, |ext| ext == "shp")
}

/// Collecte récursivement les .shp d'un dossier, triés par chemin
pub fn find_datasets(root: &Path) -> Vec<PathBuf> {
    let mut found: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && is_shp(e.path()))
        .map(|e| e.into_path())
        .collect();
    found.sort();
    found
}

/// Cherche récursivement le premier `<base>.shp` sous `root`
pub fn find_source(root: &Path, base: &str) -> Option<PathBuf> {
    find_datasets(root)
        .into_iter()
        .find(|p| base_name(p) == base)
}

/// Charge un jeu de données depuis son .shp
///
/// # Errors
///
/// `MissingFiles` si le .shx ou le .dbf manque, sinon toute erreur de lecture.
pub fn load(shp_path: &Path) -> Result<Dataset, ShapezipError> {
    let files = DatasetFiles::locate(shp_path)?;
    dataset::read(&files)
}
