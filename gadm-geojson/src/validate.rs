//! Validation des GeoJSON produits et réparation depuis les Shapefiles extraits
//!
//! Chaque fichier passe par des vérifications successives, la première en
//! échec arrête la chaîne:
//! 1. JSON bien formé avec un membre `type`
//! 2. jeu GeoJSON lisible avec au moins une feature
//! 3. CRS déclaré
//! 4. en EPSG:4326, emprise dans [-180, 180] x [-90, 90]
//!
//! Un fichier invalide est régénéré une seule fois depuis le `<base>.shp`
//! trouvé sous la zone d'extraction.

use std::fmt;
use std::path::Path;
use std::time::Instant;

use geo::{BoundingRect, Rect};
use geojson::GeoJson;
use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::PipelineConfig;
use crate::convert::regenerate;
use crate::report::{FileRecord, FileState, ValidationReport};

/// Raisons d'invalidité d'un GeoJSON
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed JSON: {0}")]
    MalformedJson(#[from] serde_json::Error),

    #[error("Missing 'type' member")]
    MissingType,

    #[error("Unreadable GeoJSON: {0}")]
    Unreadable(String),

    #[error("Empty dataset (no features)")]
    Empty,

    #[error("No CRS")]
    MissingCrs,

    #[error("No coordinates")]
    NoCoordinates,

    #[error("Coordinates out of range: {min_x}, {min_y}, {max_x}, {max_y}")]
    OutOfBounds {
        min_x: f64,
        min_y: f64,
        max_x: f64,
        max_y: f64,
    },
}

/// CRS déclaré par le membre `crs` d'un GeoJSON
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Crs {
    Epsg(u32),
    Named(String),
}

impl Crs {
    /// Lit `crs.properties.name`
    ///
    /// Sans membre `crs` (ou `crs: null`), WGS84 comme le veut la RFC 7946.
    /// Un membre `crs` présent mais sans nom exploitable n'a pas de CRS.
    pub fn from_geojson(value: &Value) -> Option<Self> {
        let crs = match value.get("crs") {
            None | Some(Value::Null) => return Some(Self::Epsg(4326)),
            Some(crs) => crs,
        };
        let name = crs.get("properties")?.get("name")?.as_str()?.trim();
        if name.is_empty() {
            return None;
        }
        Some(Self::from_name(name))
    }

    /// `urn:ogc:def:crs:EPSG::4326`, `EPSG:4326`, `urn:ogc:def:crs:OGC:1.3:CRS84`, ...
    pub fn from_name(name: &str) -> Self {
        let upper = name.to_ascii_uppercase();
        if upper.ends_with("CRS84") {
            return Self::Epsg(4326);
        }
        if upper.contains("EPSG") {
            // Le code est toujours le dernier segment
            if let Some(Ok(epsg)) = upper.rsplit(':').next().map(str::parse::<u32>) {
                return Self::Epsg(epsg);
            }
        }
        Self::Named(name.to_string())
    }

    pub fn is_wgs84(&self) -> bool {
        matches!(self, Self::Epsg(4326))
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Epsg(code) => write!(f, "EPSG:{}", code),
            Self::Named(name) => f.write_str(name),
        }
    }
}

/// Résumé d'un fichier valide
#[derive(Debug, Clone, PartialEq)]
pub struct ValidFile {
    pub features: usize,
    pub crs: Crs,
}

/// Vérifie un fichier GeoJSON
pub fn check_file(path: &Path) -> Result<ValidFile, ValidationError> {
    let content = std::fs::read_to_string(path)?;
    check_str(&content)
}

/// Vérifie un document GeoJSON en mémoire
pub fn check_str(content: &str) -> Result<ValidFile, ValidationError> {
    // 1. JSON + type
    let value: Value = serde_json::from_str(content)?;
    if value.get("type").is_none() {
        return Err(ValidationError::MissingType);
    }
    let crs = Crs::from_geojson(&value);

    // 2. Jeu de données non vide
    let geojson =
        GeoJson::from_json_value(value).map_err(|e| ValidationError::Unreadable(e.to_string()))?;
    let (features, geometries) = split_geojson(geojson);
    if features == 0 {
        return Err(ValidationError::Empty);
    }

    // 3. CRS
    let crs = crs.ok_or(ValidationError::MissingCrs)?;

    // 4. Emprise en WGS84
    if crs.is_wgs84() {
        let bounds = total_bounds(geometries)?.ok_or(ValidationError::NoCoordinates)?;
        check_bounds(&bounds)?;
    }

    Ok(ValidFile { features, crs })
}

/// Nombre de features et géométries non nulles
fn split_geojson(geojson: GeoJson) -> (usize, Vec<geojson::Geometry>) {
    match geojson {
        GeoJson::FeatureCollection(fc) => {
            let count = fc.features.len();
            let geometries = fc.features.into_iter().filter_map(|f| f.geometry).collect();
            (count, geometries)
        }
        GeoJson::Feature(f) => (1, f.geometry.into_iter().collect()),
        GeoJson::Geometry(g) => (1, vec![g]),
    }
}

/// Emprise totale, `None` si aucune coordonnée
fn total_bounds(geometries: Vec<geojson::Geometry>) -> Result<Option<Rect>, ValidationError> {
    let mut total: Option<Rect> = None;

    for geometry in geometries {
        let geometry = geo::Geometry::<f64>::try_from(geometry)
            .map_err(|e| ValidationError::Unreadable(e.to_string()))?;
        let Some(rect) = geometry.bounding_rect() else {
            continue;
        };
        total = Some(match total {
            None => rect,
            Some(acc) => Rect::new(
                (acc.min().x.min(rect.min().x), acc.min().y.min(rect.min().y)),
                (acc.max().x.max(rect.max().x), acc.max().y.max(rect.max().y)),
            ),
        });
    }

    Ok(total)
}

fn check_bounds(bounds: &Rect) -> Result<(), ValidationError> {
    let (min, max) = (bounds.min(), bounds.max());
    let lon_ok = |x: f64| (-180.0..=180.0).contains(&x);
    let lat_ok = |y: f64| (-90.0..=90.0).contains(&y);

    if lon_ok(min.x) && lon_ok(max.x) && lat_ok(min.y) && lat_ok(max.y) {
        Ok(())
    } else {
        Err(ValidationError::OutOfBounds {
            min_x: min.x,
            min_y: min.y,
            max_x: max.x,
            max_y: max.y,
        })
    }
}

/// Valide tous les GeoJSON de `output_root`, réparant ceux qui échouent
pub fn validate_and_repair(config: &PipelineConfig) -> ValidationReport {
    let started_at = Instant::now();
    let mut report = ValidationReport::new();

    let files = crate::list_geojson_files(&config.output_root);
    if files.is_empty() {
        warn!("No GeoJSON files to validate in {}", config.output_root.display());
        return report;
    }

    info!("Validating {} GeoJSON files", files.len());

    for path in &files {
        let state = validate_file(path, &config.scratch_root);
        report.record(FileRecord {
            file: path.display().to_string(),
            state,
        });
    }

    report.set_duration(started_at.elapsed());
    info!("Validation finished: {}", report.summary());

    report
}

/// Valide un fichier puis, s'il est invalide, tente une réparation
pub fn validate_file(path: &Path, scratch_root: &Path) -> FileState {
    let file_name = path
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let reason = match check_file(path) {
        Ok(valid) => {
            info!(
                "Valid: {}, features={}, CRS={}",
                file_name, valid.features, valid.crs
            );
            return FileState::Valid {
                features: valid.features,
                crs: valid.crs.to_string(),
            };
        }
        Err(e) => e.to_string(),
    };

    warn!("Invalid: {}, reason: {}", file_name, reason);
    repair(path, scratch_root, reason)
}

fn repair(path: &Path, scratch_root: &Path, reason: String) -> FileState {
    let base = shapezip::base_name(path);

    let Some(shp_path) = shapezip::find_source(scratch_root, &base) else {
        warn!("  Source shapefile ({}) not found, cannot repair", base);
        return FileState::Unrepairable { reason };
    };

    match regenerate(&shp_path, path) {
        Ok(features) => {
            info!(
                "  Repaired: {} from {} ({} features)",
                path.display(),
                shp_path.display(),
                features
            );
            FileState::Repaired {
                reason,
                source: shp_path.display().to_string(),
            }
        }
        Err(e) => {
            warn!("  Repair failed: {}, error: {:#}", path.display(), e);
            FileState::RepairFailed {
                reason,
                error: format!("{:#}", e),
            }
        }
    }
}
