//! Extraction des codes pays ISO3 depuis les noms de fichiers GADM

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;

/// `gadm41_{ISO3}_{niveau}.geojson`, insensible à la casse
fn pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)^gadm41_([a-z]{3})_\d+\.geojson$").expect("valid country code regex")
    })
}

/// Extrait le code pays d'un nom de fichier, en majuscules
pub fn extract_country_code(file_name: &str) -> Option<String> {
    pattern()
        .captures(file_name)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_ascii_uppercase())
}

/// Ensemble trié des codes pays trouvés dans un dossier
///
/// Les fichiers hors convention sont ignorés; un dossier vide ou absent
/// donne un ensemble vide.
pub fn collect_country_codes(dir: &Path) -> BTreeSet<String> {
    let codes: BTreeSet<String> = crate::list_geojson_files(dir)
        .iter()
        .filter_map(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .and_then(extract_country_code)
        })
        .collect();

    debug!("{} country codes found in {}", codes.len(), dir.display());
    codes
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_extract_country_code() {
        assert_eq!(
            extract_country_code("gadm41_FRA_1.geojson"),
            Some("FRA".to_string())
        );
        assert_eq!(
            extract_country_code("gadm41_fra_0.geojson"),
            Some("FRA".to_string())
        );
        assert_eq!(
            extract_country_code("GADM41_Kor_12.GEOJSON"),
            Some("KOR".to_string())
        );
    }

    #[test]
    fn test_extract_country_code_rejects() {
        assert_eq!(extract_country_code("gadm41_FRA.geojson"), None);
        assert_eq!(extract_country_code("gadm41_FR_1.geojson"), None);
        assert_eq!(extract_country_code("gadm41_FRAN_1.geojson"), None);
        assert_eq!(extract_country_code("gadm40_FRA_1.geojson"), None);
        assert_eq!(extract_country_code("gadm41_FRA_x.geojson"), None);
        assert_eq!(extract_country_code("gadm41_FRA_1.shp"), None);
        assert_eq!(extract_country_code("xgadm41_FRA_1.geojson"), None);
    }

    #[test]
    fn test_collect_country_codes() {
        let dir = tempfile::tempdir().unwrap();
        for name in [
            "gadm41_FRA_0.geojson",
            "gadm41_FRA_1.geojson",
            "gadm41_kor_2.geojson",
            "gadm41_DEU_0.geojson",
            "notes.geojson",
            "gadm41_ITA_0.shp",
        ] {
            fs::write(dir.path().join(name), b"{}").unwrap();
        }

        let codes = collect_country_codes(dir.path());
        assert_eq!(
            codes.into_iter().collect::<Vec<_>>(),
            vec!["DEU".to_string(), "FRA".to_string(), "KOR".to_string()]
        );
    }

    #[test]
    fn test_collect_empty_or_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert!(collect_country_codes(dir.path()).is_empty());
        assert!(collect_country_codes(&dir.path().join("absent")).is_empty());
    }
}
