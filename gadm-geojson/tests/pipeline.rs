//! Tests de bout en bout: archives zip → GeoJSON → validation / réparation
//!
//! Les Shapefiles sont générés à la volée dans des dossiers temporaires.

use std::fs;
use std::io::Write;
use std::path::Path;

use gadm_geojson::config::PipelineConfig;
use gadm_geojson::report::{ConversionOutcome, FileState};
use gadm_geojson::{convert, countries, validate};
use shapefile::dbase::{FieldName, FieldValue, Record, TableWriterBuilder};

const WGS84_PRJ: &str = r#"GEOGCS["GCS_WGS_1984",DATUM["D_WGS_1984",SPHEROID["WGS_1984",6378137.0,298.257223563]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]]"#;

/// Écrit un Shapefile de points (+ .prj WGS84) dans `dir`
fn write_dataset(dir: &Path, base: &str, points: &[(f64, f64)]) {
    let table = TableWriterBuilder::new()
        .add_character_field(FieldName::try_from("NAME").unwrap(), 32);
    let mut writer = shapefile::Writer::from_path(dir.join(format!("{}.shp", base)), table).unwrap();
    for (i, (x, y)) in points.iter().enumerate() {
        let mut record = Record::default();
        record.insert(
            "NAME".to_string(),
            FieldValue::Character(Some(format!("{}-{}", base, i))),
        );
        writer
            .write_shape_and_record(&shapefile::Point::new(*x, *y), &record)
            .unwrap();
    }
    drop(writer);

    fs::write(dir.join(format!("{}.prj", base)), WGS84_PRJ).unwrap();
}

/// Zippe les fichiers de `src` dans `zip_path`
fn zip_dir(src: &Path, zip_path: &Path) {
    fs::create_dir_all(zip_path.parent().unwrap()).unwrap();
    let file = fs::File::create(zip_path).unwrap();
    let mut writer = zip::ZipWriter::new(file);
    let options = zip::write::SimpleFileOptions::default();

    let mut entries: Vec<_> = fs::read_dir(src)
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .collect();
    entries.sort();

    for path in entries {
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        writer.start_file(name, options).unwrap();
        writer.write_all(&fs::read(&path).unwrap()).unwrap();
    }
    writer.finish().unwrap();
}

/// Archive `gadm41_<iso>_shp.zip` avec les niveaux 0 et 1
fn write_country_archive(config: &PipelineConfig, iso: &str) {
    let staging = tempfile::tempdir().unwrap();
    write_dataset(
        staging.path(),
        &format!("gadm41_{}_0", iso),
        &[(1.5, 42.5)],
    );
    write_dataset(
        staging.path(),
        &format!("gadm41_{}_1", iso),
        &[(1.5, 42.5), (1.6, 42.6), (-1.0, 43.0)],
    );
    zip_dir(
        staging.path(),
        &config.input_root.join(format!("gadm41_{}_shp.zip", iso)),
    );
}

#[test]
fn test_convert_then_validate_roundtrip() {
    let root = tempfile::tempdir().unwrap();
    let config = PipelineConfig::with_root(root.path());
    write_country_archive(&config, "AND");

    let conversion = convert::convert_archives(&config).unwrap();
    assert_eq!(conversion.archives_processed, 1);
    assert_eq!(conversion.converted, 2);
    assert_eq!(conversion.skipped_other(), 0);
    assert!(config.scratch_root.join("gadm41_AND_shp").is_dir());

    let validation = validate::validate_and_repair(&config);
    assert_eq!(validation.checked, 2);
    assert_eq!(validation.valid, 2);
    assert_eq!(validation.repaired, 0);

    match validation.state_of("gadm41_AND_1.geojson") {
        Some(FileState::Valid { features, crs }) => {
            assert_eq!(*features, 3);
            assert_eq!(crs, "EPSG:4326");
        }
        other => panic!("Expected Valid, got {:?}", other),
    }
}

#[test]
fn test_convert_is_idempotent() {
    let root = tempfile::tempdir().unwrap();
    let config = PipelineConfig::with_root(root.path());
    write_country_archive(&config, "LIE");

    let first = convert::convert_archives(&config).unwrap();
    assert_eq!(first.converted, 2);
    let output = config.output_root.join("gadm41_LIE_1.geojson");
    let before = fs::read(&output).unwrap();

    let second = convert::convert_archives(&config).unwrap();
    assert_eq!(second.archives_processed, 1);
    assert_eq!(second.converted, 0);
    assert_eq!(second.already_exists, 2);
    assert!(second
        .datasets
        .iter()
        .all(|d| d.outcome == ConversionOutcome::AlreadyExists));

    assert_eq!(fs::read(&output).unwrap(), before);
    assert_eq!(gadm_geojson::list_geojson_files(&config.output_root).len(), 2);
}

#[test]
fn test_truncated_file_is_repaired() {
    let root = tempfile::tempdir().unwrap();
    let config = PipelineConfig::with_root(root.path());
    write_country_archive(&config, "MCO");
    convert::convert_archives(&config).unwrap();

    let target = config.output_root.join("gadm41_MCO_1.geojson");
    let original = fs::read_to_string(&target).unwrap();
    fs::write(&target, &original[..original.len() / 2]).unwrap();

    let validation = validate::validate_and_repair(&config);
    assert_eq!(validation.repaired, 1);
    assert_eq!(validation.valid, 1);
    assert!(matches!(
        validation.state_of("gadm41_MCO_1.geojson"),
        Some(FileState::Repaired { .. })
    ));

    // La sortie réparée repasse la validation
    let again = validate::validate_and_repair(&config);
    assert_eq!(again.valid, 2);
    assert_eq!(again.repaired, 0);
    assert_eq!(fs::read_to_string(&target).unwrap(), original);
}

#[test]
fn test_invalid_file_without_source_is_unrepairable() {
    let root = tempfile::tempdir().unwrap();
    let config = PipelineConfig::with_root(root.path());
    fs::create_dir_all(&config.output_root).unwrap();

    // Longitude 200 en EPSG:4326
    let content = r#"{"type":"FeatureCollection","crs":{"type":"name","properties":{"name":"urn:ogc:def:crs:EPSG::4326"}},"features":[{"type":"Feature","properties":{},"geometry":{"type":"Point","coordinates":[200.0,10.0]}}]}"#;
    let target = config.output_root.join("gadm41_ZZZ_0.geojson");
    fs::write(&target, content).unwrap();

    let validation = validate::validate_and_repair(&config);
    assert_eq!(validation.checked, 1);
    assert_eq!(validation.failed, 1);
    match validation.state_of("gadm41_ZZZ_0.geojson") {
        Some(FileState::Unrepairable { reason }) => assert!(reason.contains("out of range")),
        other => panic!("Expected Unrepairable, got {:?}", other),
    }
    assert_eq!(fs::read_to_string(&target).unwrap(), content);
}

#[test]
fn test_missing_dbf_is_skipped_not_failed() {
    let root = tempfile::tempdir().unwrap();
    let config = PipelineConfig::with_root(root.path());

    let staging = tempfile::tempdir().unwrap();
    write_dataset(staging.path(), "gadm41_SMR_0", &[(12.45, 43.94)]);
    fs::remove_file(staging.path().join("gadm41_SMR_0.dbf")).unwrap();
    zip_dir(
        staging.path(),
        &config.input_root.join("europe/gadm41_SMR_shp.zip"),
    );

    let conversion = convert::convert_archives(&config).unwrap();
    assert_eq!(conversion.archives_processed, 1);
    assert_eq!(conversion.converted, 0);
    assert_eq!(conversion.missing_files, 1);
    assert_eq!(conversion.failed, 0);
    assert_eq!(conversion.skipped_other(), 1);
    assert!(!config.output_root.join("gadm41_SMR_0.geojson").exists());
}

#[test]
fn test_corrupt_archive_does_not_stop_batch() {
    let root = tempfile::tempdir().unwrap();
    let config = PipelineConfig::with_root(root.path());
    write_country_archive(&config, "VAT");
    fs::write(config.input_root.join("aaa_broken.zip"), b"not a zip").unwrap();

    let conversion = convert::convert_archives(&config).unwrap();
    assert_eq!(conversion.archives_processed, 2);
    assert_eq!(conversion.archives_failed, 1);
    assert_eq!(conversion.converted, 2);
    assert_eq!(conversion.archive_failures[0].archive, "aaa_broken.zip");
}

#[test]
fn test_country_codes_from_output() {
    let root = tempfile::tempdir().unwrap();
    let config = PipelineConfig::with_root(root.path());
    write_country_archive(&config, "AND");
    write_country_archive(&config, "lie");

    convert::convert_archives(&config).unwrap();

    let codes: Vec<String> = countries::collect_country_codes(&config.output_root)
        .into_iter()
        .collect();
    assert_eq!(codes, vec!["AND".to_string(), "LIE".to_string()]);
}

#[test]
fn test_run_pipeline() {
    let root = tempfile::tempdir().unwrap();
    let config = PipelineConfig::with_root(root.path());
    write_country_archive(&config, "AND");

    let report = gadm_geojson::run_pipeline(&config).unwrap();
    let conversion = report.conversion.unwrap();
    let validation = report.validation.unwrap();
    assert_eq!(conversion.converted, 2);
    assert_eq!(validation.valid, 2);
}
