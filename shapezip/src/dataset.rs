//! Lecture d'un jeu de données Shapefile (.shp + .shx + .dbf, .prj optionnel)

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use geo::Geometry;
use shapefile::dbase::FieldValue;
use shapefile::Shape;
use tracing::{debug, warn};

use crate::types::{AttributeValue, Dataset, Feature, SourceCrs};
use crate::ShapezipError;

/// Extensions obligatoires d'un jeu de données
pub const REQUIRED_EXTENSIONS: [&str; 3] = ["shp", "shx", "dbf"];

/// Chemins des fichiers composant un jeu de données
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetFiles {
    pub shp: PathBuf,
    pub shx: PathBuf,
    pub dbf: PathBuf,
    pub prj: Option<PathBuf>,
}

impl DatasetFiles {
    /// Localise les fichiers frères d'un .shp
    ///
    /// Retourne `MissingFiles` avec la liste des fichiers absents si l'un des
    /// trois fichiers obligatoires manque.
    pub fn locate(shp_path: &Path) -> Result<Self, ShapezipError> {
        let [shp, shx, dbf] = REQUIRED_EXTENSIONS.map(|ext| shp_path.with_extension(ext));

        let missing: Vec<PathBuf> = [&shp, &shx, &dbf]
            .into_iter()
            .filter(|p| !p.is_file())
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(ShapezipError::MissingFiles(missing));
        }

        let prj = ["prj", "PRJ"]
            .iter()
            .map(|ext| shp_path.with_extension(ext))
            .find(|p| p.is_file());

        Ok(Self { shp, shx, dbf, prj })
    }

    /// Lit le système de coordonnées depuis le .prj
    pub fn read_crs(&self) -> Result<SourceCrs, ShapezipError> {
        match &self.prj {
            Some(prj) => {
                let content = std::fs::read_to_string(prj)?;
                Ok(SourceCrs::from_prj(&content))
            }
            None => Ok(SourceCrs::Undefined),
        }
    }
}

/// Lit toutes les features d'un jeu de données
pub fn read(files: &DatasetFiles) -> Result<Dataset, ShapezipError> {
    let file_label = files.shp.display().to_string();
    let base_name = crate::base_name(&files.shp);
    let crs = files.read_crs()?;

    let mut reader = shapefile::Reader::from_path(&files.shp)
        .map_err(|e| ShapezipError::shapefile(&file_label, e))?;

    let mut features = Vec::new();
    let mut errors = Vec::new();

    for (index, result) in reader.iter_shapes_and_records().enumerate() {
        let (shape, record) = result.map_err(|e| ShapezipError::shapefile(&file_label, e))?;

        let geometry = match convert_shape(shape) {
            Ok(geometry) => geometry,
            Err(reason) => {
                warn!(file = %file_label, record = index, "Unconvertible shape: {}", reason);
                errors.push(ShapezipError::invalid_geometry(index, reason));
                continue;
            }
        };

        let properties = record
            .into_iter()
            .map(|(name, value)| (name, convert_field(value)))
            .collect::<BTreeMap<_, _>>();

        features.push(Feature {
            geometry,
            properties,
        });
    }

    debug!(
        file = %file_label,
        features = features.len(),
        crs = ?crs,
        "Dataset read"
    );

    Ok(Dataset {
        base_name,
        crs,
        features,
        errors,
    })
}

/// Convertit une forme ESRI en géométrie `geo`, `None` pour un NullShape
fn convert_shape(shape: Shape) -> Result<Option<Geometry>, String> {
    if matches!(shape, Shape::NullShape) {
        return Ok(None);
    }
    Geometry::<f64>::try_from(shape)
        .map(Some)
        .map_err(|e| e.to_string())
}

fn convert_field(value: FieldValue) -> AttributeValue {
    match value {
        FieldValue::Character(Some(s)) => AttributeValue::Text(s.trim_end().to_string()),
        FieldValue::Memo(s) => AttributeValue::Text(s),
        FieldValue::Numeric(Some(n)) => number(n),
        FieldValue::Float(Some(n)) => AttributeValue::Number(f64::from(n)),
        FieldValue::Double(n) | FieldValue::Currency(n) => AttributeValue::Number(n),
        FieldValue::Integer(n) => AttributeValue::Integer(i64::from(n)),
        FieldValue::Logical(Some(b)) => AttributeValue::Bool(b),
        FieldValue::Date(Some(d)) => {
            AttributeValue::Text(format!("{:04}-{:02}-{:02}", d.year(), d.month(), d.day()))
        }
        FieldValue::Character(None)
        | FieldValue::Numeric(None)
        | FieldValue::Float(None)
        | FieldValue::Logical(None)
        | FieldValue::Date(None) => AttributeValue::Null,
        other => AttributeValue::Text(format!("{:?}", other)),
    }
}

/// Les champs N sans décimales restent des entiers
fn number(n: f64) -> AttributeValue {
    if n.fract() == 0.0 && n.abs() < 9.0e15 {
        AttributeValue::Integer(n as i64)
    } else {
        AttributeValue::Number(n)
    }
}
