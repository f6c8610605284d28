//! Extraction des archives de Shapefiles (.zip, .tar.bz2)

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use bzip2::read::BzDecoder;
use tracing::debug;
use walkdir::WalkDir;

use crate::ShapezipError;

/// Formats d'archive reconnus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    Zip,
    TarBz2,
}

impl ArchiveFormat {
    /// Détecte le format depuis l'extension (insensible à la casse)
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?.to_ascii_lowercase();
        if name.ends_with(".zip") {
            Some(Self::Zip)
        } else if name.ends_with(".tar.bz2") || name.ends_with(".tbz2") {
            Some(Self::TarBz2)
        } else {
            None
        }
    }
}

/// Résultat de l'extraction d'une archive
#[derive(Debug, Clone)]
pub struct ExtractedArchive {
    /// Dossier de destination (`<scratch>/<nom de l'archive>`)
    pub dir: PathBuf,

    /// Nombre de fichiers écrits
    pub files_extracted: usize,
}

/// Extrait le nom de base d'une archive (sans .zip, .tar.bz2, .tbz2)
pub fn archive_basename(path: &Path) -> String {
    let name = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("unknown");

    let lower = name.to_ascii_lowercase();
    let suffix_len = [".tar.bz2", ".tbz2", ".zip"]
        .iter()
        .find(|ext| lower.ends_with(*ext))
        .map_or(0, |ext| ext.len());

    name[..name.len() - suffix_len].to_string()
}

/// Collecte récursivement les archives reconnues sous `root`, triées par chemin
pub fn collect_archives(root: &Path) -> Vec<PathBuf> {
    let mut archives: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && ArchiveFormat::from_path(e.path()).is_some())
        .map(|e| e.into_path())
        .collect();
    archives.sort();
    archives
}

/// Extrait tout le contenu d'une archive dans `<scratch_root>/<nom de base>/`
///
/// Le dossier est créé s'il n'existe pas; les fichiers déjà présents sont écrasés.
/// Une archive vide n'est pas une erreur.
pub fn extract(archive_path: &Path, scratch_root: &Path) -> Result<ExtractedArchive, ShapezipError> {
    let format = ArchiveFormat::from_path(archive_path)
        .ok_or_else(|| ShapezipError::UnsupportedArchive(archive_path.display().to_string()))?;

    let dir = scratch_root.join(archive_basename(archive_path));
    fs::create_dir_all(&dir)?;

    let files_extracted = match format {
        ArchiveFormat::Zip => extract_zip(archive_path, &dir)?,
        ArchiveFormat::TarBz2 => extract_tar_bz2(archive_path, &dir)?,
    };

    debug!(
        archive = %archive_path.display(),
        dest = %dir.display(),
        files = files_extracted,
        "Archive extracted"
    );

    Ok(ExtractedArchive {
        dir,
        files_extracted,
    })
}

fn extract_zip(archive_path: &Path, dest: &Path) -> Result<usize, ShapezipError> {
    let file = fs::File::open(archive_path)?;
    let mut archive = zip::ZipArchive::new(file)?;

    let mut count = 0;
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;

        // Chemins hors de la destination ignorés
        let Some(entry_path) = entry.enclosed_name().map(|p| p.to_path_buf()) else {
            debug!("Skipping unsafe zip entry: {}", entry.name());
            continue;
        };

        let output_path = dest.join(&entry_path);

        if entry.is_dir() {
            fs::create_dir_all(&output_path)?;
        } else {
            if let Some(parent) = output_path.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut outfile = fs::File::create(&output_path)?;
            io::copy(&mut entry, &mut outfile)?;
            count += 1;
        }
    }

    Ok(count)
}

fn extract_tar_bz2(archive_path: &Path, dest: &Path) -> Result<usize, ShapezipError> {
    let file = fs::File::open(archive_path)?;
    let mut archive = tar::Archive::new(BzDecoder::new(file));

    let mut count = 0;
    for entry in archive.entries()? {
        let mut entry = entry?;
        let is_file = entry.header().entry_type().is_file();

        // unpack_in refuse les chemins qui sortent de `dest`
        if entry.unpack_in(dest)? && is_file {
            count += 1;
        }
    }

    Ok(count)
}
