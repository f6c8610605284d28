//! Modules d'export (GeoJSON, reprojection)

pub mod geojson;
pub mod reproject;

pub use reproject::{normalize_to_wgs84, Reprojector};
