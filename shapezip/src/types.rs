//! Types de données pour le crate shapezip

use std::collections::BTreeMap;

use geo::Geometry;

use crate::ShapezipError;

/// Jeu de données lu depuis un trio .shp/.shx/.dbf
#[derive(Debug)]
pub struct Dataset {
    /// Nom de base partagé par les fichiers (ex: "gadm41_FRA_1")
    pub base_name: String,

    /// Système de coordonnées déclaré dans le .prj
    pub crs: SourceCrs,

    /// Features dans l'ordre des enregistrements
    pub features: Vec<Feature>,

    /// Erreurs non fatales rencontrées pendant la lecture
    pub errors: Vec<ShapezipError>,
}

/// Une feature avec sa géométrie et ses attributs
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    /// Géométrie, `None` pour un NullShape
    pub geometry: Option<Geometry>,

    /// Attributs de la table dBASE, triés par nom de champ
    pub properties: BTreeMap<String, AttributeValue>,
}

/// Valeur d'un champ dBASE
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    Text(String),
    Number(f64),
    Integer(i64),
    Bool(bool),
    Null,
}

/// Système de coordonnées d'un jeu source
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceCrs {
    /// Pas de .prj (ou vide)
    Undefined,

    /// Géographique WGS84 (EPSG:4326)
    Wgs84,

    /// Autre système, définition WKT brute du .prj
    Wkt(String),
}

impl SourceCrs {
    /// Interprète le contenu d'un fichier .prj
    pub fn from_prj(content: &str) -> Self {
        let wkt = content.trim();
        if wkt.is_empty() {
            return Self::Undefined;
        }

        if is_wgs84_geographic(wkt) {
            Self::Wgs84
        } else {
            Self::Wkt(wkt.to_string())
        }
    }
}

/// Un GEOGCS WGS84 sans PROJCS englobant
fn is_wgs84_geographic(wkt: &str) -> bool {
    let upper = wkt.to_ascii_uppercase();
    if upper == "EPSG:4326" {
        return true;
    }
    let geographic = upper.starts_with("GEOGCS[") || upper.starts_with("GEOGCRS[");
    let wgs84 = ["WGS_1984", "WGS 84", "WGS84"]
        .iter()
        .any(|name| upper.contains(name));
    geographic && wgs84 && !upper.contains("PROJCS")
}
