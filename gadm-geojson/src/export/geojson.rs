//! Export vers GeoJSON avec geozero (streaming)

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use geozero::geojson::GeoJsonWriter;
use geozero::GeozeroGeometry;
use serde_json::{Map, Number, Value};

use shapezip::{AttributeValue, Dataset, Feature};

use super::reproject::WGS84_EPSG;

/// Exporte un jeu de données (déjà en WGS84) en GeoJSON
///
/// Le fichier est d'abord écrit à côté (`.tmp`) puis renommé: une écriture
/// interrompue ne laisse jamais de fichier partiel à la place de la cible.
/// Retourne le nombre de features écrites.
pub fn export_to_geojson(dataset: &Dataset, output_path: &Path) -> Result<usize> {
    let tmp_path = temp_path(output_path);

    let written = write_collection(dataset, &tmp_path);
    if written.is_err() {
        fs::remove_file(&tmp_path).ok();
        return written;
    }

    if let Err(e) = fs::rename(&tmp_path, output_path) {
        fs::remove_file(&tmp_path).ok();
        return Err(e).context(format!("Failed to move file into place: {}", output_path.display()));
    }

    written
}

fn temp_path(output_path: &Path) -> PathBuf {
    let mut name = output_path
        .file_name()
        .map(|s| s.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    output_path.with_file_name(name)
}

fn write_collection(dataset: &Dataset, path: &Path) -> Result<usize> {
    let file =
        File::create(path).context(format!("Failed to create file: {}", path.display()))?;
    let mut writer = BufWriter::new(file);

    // Header FeatureCollection avec CRS
    write!(
        writer,
        r#"{{"type":"FeatureCollection","name":{},"crs":{{"type":"name","properties":{{"name":"urn:ogc:def:crs:EPSG::{}"}}}},"features":["#,
        Value::String(dataset.base_name.clone()),
        WGS84_EPSG
    )?;

    for (i, feature) in dataset.features.iter().enumerate() {
        if i > 0 {
            write!(writer, ",")?;
        }
        write_feature(&mut writer, feature)?;
    }

    write!(writer, "]}}")?;
    writer.flush()?;

    Ok(dataset.features.len())
}

/// Écrit une feature en GeoJSON
fn write_feature<W: Write>(writer: &mut W, feature: &Feature) -> Result<()> {
    write!(writer, r#"{{"type":"Feature","properties":"#)?;
    serde_json::to_writer(&mut *writer, &properties_to_json(feature))?;

    write!(writer, r#","geometry":"#)?;
    match &feature.geometry {
        Some(geometry) => {
            let mut geom_buf = Vec::new();
            let mut geom_writer = GeoJsonWriter::new(&mut geom_buf);
            geometry.process_geom(&mut geom_writer)?;
            writer.write_all(&geom_buf)?;
        }
        None => write!(writer, "null")?,
    }

    write!(writer, "}}")?;
    Ok(())
}

fn properties_to_json(feature: &Feature) -> Map<String, Value> {
    feature
        .properties
        .iter()
        .map(|(key, value)| (key.clone(), attribute_to_json(value)))
        .collect()
}

fn attribute_to_json(value: &AttributeValue) -> Value {
    match value {
        AttributeValue::Text(s) => Value::String(s.clone()),
        AttributeValue::Integer(n) => Value::Number((*n).into()),
        AttributeValue::Number(n) => Number::from_f64(*n).map_or(Value::Null, Value::Number),
        AttributeValue::Bool(b) => Value::Bool(*b),
        AttributeValue::Null => Value::Null,
    }
}
