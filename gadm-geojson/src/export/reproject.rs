//! Normalisation du système de coordonnées vers WGS84
//!
//! La reprojection PROJ n'est disponible qu'avec le feature `reproject`.
//! Sans lui, seuls les jeux sans .prj ou déjà en WGS84 sont acceptés.

use anyhow::Result;
use shapezip::{Dataset, SourceCrs};
use tracing::{debug, warn};

/// EPSG cible de toutes les sorties
pub const WGS84_EPSG: u32 = 4326;

/// Ramène un jeu de données en WGS84
///
/// - pas de CRS: EPSG:4326 est assigné sans toucher aux coordonnées
/// - WGS84: inchangé
/// - autre: reprojection de chaque géométrie
pub fn normalize_to_wgs84(mut dataset: Dataset) -> Result<Dataset> {
    match &dataset.crs {
        SourceCrs::Undefined => {
            warn!(
                dataset = %dataset.base_name,
                "No CRS, assigning EPSG:{}", WGS84_EPSG
            );
        }
        SourceCrs::Wgs84 => {
            debug!(dataset = %dataset.base_name, "Already WGS84");
        }
        SourceCrs::Wkt(wkt) => {
            let reprojector = Reprojector::new(wkt, &format!("EPSG:{}", WGS84_EPSG))?;
            for feature in &mut dataset.features {
                if let Some(geometry) = &feature.geometry {
                    feature.geometry = Some(reprojector.transform_geometry(geometry)?);
                }
            }
            debug!(dataset = %dataset.base_name, "Reprojected to WGS84");
        }
    }

    dataset.crs = SourceCrs::Wgs84;
    Ok(dataset)
}

#[cfg(feature = "reproject")]
use anyhow::Context;
#[cfg(feature = "reproject")]
use geo::{
    Coord, Geometry, GeometryCollection, LineString, MultiLineString, MultiPoint, MultiPolygon,
    Point, Polygon,
};
#[cfg(feature = "reproject")]
use proj::Proj;

/// Reprojection de géométries entre deux systèmes de coordonnées
#[cfg(feature = "reproject")]
pub struct Reprojector {
    proj: Proj,
}

#[cfg(feature = "reproject")]
impl Reprojector {
    /// Crée un reprojector depuis deux définitions PROJ (WKT, `EPSG:xxxx`, ...)
    pub fn new(source: &str, target: &str) -> Result<Self> {
        let proj = Proj::new_known_crs(source, target, None).with_context(|| {
            format!(
                "Failed to create projection from {} to {}",
                summarize(source),
                target
            )
        })?;

        Ok(Self { proj })
    }

    /// Transforme une géométrie
    pub fn transform_geometry(&self, geom: &Geometry) -> Result<Geometry> {
        match geom {
            Geometry::Point(p) => {
                let (x, y) = self.transform_coord(p.0)?;
                Ok(Geometry::Point(Point::new(x, y)))
            }
            Geometry::LineString(ls) => {
                let transformed = self.transform_linestring(ls)?;
                Ok(Geometry::LineString(transformed))
            }
            Geometry::Polygon(p) => {
                let transformed = self.transform_polygon(p)?;
                Ok(Geometry::Polygon(transformed))
            }
            Geometry::MultiPoint(mp) => {
                let points: Result<Vec<Point>> =
                    mp.0.iter()
                        .map(|p| {
                            let (x, y) = self.transform_coord(p.0)?;
                            Ok(Point::new(x, y))
                        })
                        .collect();
                Ok(Geometry::MultiPoint(MultiPoint::new(points?)))
            }
            Geometry::MultiLineString(mls) => {
                let lines: Result<Vec<LineString>> = mls
                    .0
                    .iter()
                    .map(|ls| self.transform_linestring(ls))
                    .collect();
                Ok(Geometry::MultiLineString(MultiLineString::new(lines?)))
            }
            Geometry::MultiPolygon(mp) => {
                let polys: Result<Vec<Polygon>> =
                    mp.0.iter().map(|p| self.transform_polygon(p)).collect();
                Ok(Geometry::MultiPolygon(MultiPolygon::new(polys?)))
            }
            Geometry::GeometryCollection(gc) => {
                let geoms: Result<Vec<Geometry>> =
                    gc.0.iter().map(|g| self.transform_geometry(g)).collect();
                Ok(Geometry::GeometryCollection(GeometryCollection::from(geoms?)))
            }
            // Line, Rect, Triangle: jamais produits par un Shapefile
            _ => Ok(geom.clone()),
        }
    }

    fn transform_coord(&self, coord: Coord) -> Result<(f64, f64)> {
        self.proj
            .convert((coord.x, coord.y))
            .context("Coordinate transformation failed")
    }

    /// Transforme une LineString (conversion batch)
    fn transform_linestring(&self, ls: &LineString) -> Result<LineString> {
        let mut coords: Vec<(f64, f64)> = ls.0.iter().map(|c| (c.x, c.y)).collect();

        self.proj
            .convert_array(&mut coords)
            .context("Batch coordinate transformation failed")?;

        let result: Vec<Coord> = coords.into_iter().map(|(x, y)| Coord { x, y }).collect();
        Ok(LineString::new(result))
    }

    fn transform_polygon(&self, p: &Polygon) -> Result<Polygon> {
        let exterior = self.transform_linestring(p.exterior())?;
        let interiors: Result<Vec<LineString>> = p
            .interiors()
            .iter()
            .map(|ls| self.transform_linestring(ls))
            .collect();
        Ok(Polygon::new(exterior, interiors?))
    }
}

/// Premier segment d'une définition WKT, pour des messages lisibles
#[cfg(feature = "reproject")]
fn summarize(definition: &str) -> &str {
    definition
        .split(',')
        .next()
        .unwrap_or(definition)
}

#[cfg(not(feature = "reproject"))]
use anyhow::bail;
#[cfg(not(feature = "reproject"))]
use geo::Geometry;

/// Reprojector factice - pas de reprojection disponible
#[cfg(not(feature = "reproject"))]
pub struct Reprojector;

#[cfg(not(feature = "reproject"))]
impl Reprojector {
    /// Échoue toujours sans la feature
    pub fn new(_source: &str, target: &str) -> Result<Self> {
        bail!(
            "Reprojection to {} requires the 'reproject' feature. \
             Build with: cargo build --features reproject",
            target
        )
    }

    pub fn transform_geometry(&self, geom: &Geometry) -> Result<Geometry> {
        Ok(geom.clone())
    }
}
