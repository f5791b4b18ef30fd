use std::fs;
use std::path::Path;

use crate::catalog::manager::{CatalogData, RecipeCatalog};
use crate::error::Result;

/// Parse a catalog from JSON text.
///
/// Deduplicates recipes by id (last occurrence wins).
pub fn parse_catalog(content: &str) -> Result<RecipeCatalog> {
    let data: CatalogData = serde_json::from_str(content)?;
    Ok(RecipeCatalog::new(data))
}

/// Load a catalog from a JSON file.
pub fn load_catalog<P: AsRef<Path>>(path: P) -> Result<RecipeCatalog> {
    let content = fs::read_to_string(path)?;
    parse_catalog(&content)
}

/// Save a catalog as pretty JSON.
pub fn save_catalog<P: AsRef<Path>>(path: P, catalog: &RecipeCatalog) -> Result<()> {
    let json = serde_json::to_string_pretty(&catalog.to_data())?;
    fs::write(path, json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MealType;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const CATALOG: &str = r#"{
        "recipes": [
            {"id": "r1", "name": "Zabkása", "meal_types": ["reggeli"], "Feherje_g": 20, "Szenhidrat_g": 30, "Zsir_g": 10},
            {"id": "r2", "name": "Csirke rizzsel", "meal_types": ["ebéd", "dinner"], "Feherje_g": 40, "Szenhidrat_g": 50, "Zsir_g": 12, "Kaloria": 480,
             "ingredients": [{"ingredient_id": "rice", "quantity_g": 80, "ingredient_type": "KIEGESZITO"}]}
        ],
        "history": [{"recipe_id": "r1", "is_favorite": true}],
        "nutrition": [{"ingredient_id": "rice", "protein": 7, "carbs": 78, "fat": 1}]
    }"#;

    #[test]
    fn test_load_and_save_roundtrip() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(CATALOG.as_bytes()).unwrap();

        let catalog = load_catalog(file.path()).unwrap();
        assert_eq!(catalog.len(), 2);
        let lunch = catalog.recipe("r2").unwrap();
        assert_eq!(lunch.meal_types, vec![MealType::Ebed, MealType::Vacsora]);
        assert_eq!(lunch.macro_vector().calories, 480.0);
        assert_eq!(catalog.recipe("r1").unwrap().macro_vector().calories, 290.0);

        let out_file = NamedTempFile::new().unwrap();
        save_catalog(out_file.path(), &catalog).unwrap();

        let reloaded = load_catalog(out_file.path()).unwrap();
        assert_eq!(reloaded.len(), 2);
        assert!(reloaded.history("r1").unwrap().is_favorite);
        assert!(reloaded.has_ingredient_data());
    }

    #[test]
    fn test_deduplication() {
        let json = r#"{"recipes": [
            {"id": "r1", "name": "First", "meal_types": ["ebed"], "Feherje_g": 10, "Szenhidrat_g": 10, "Zsir_g": 10},
            {"id": "r1", "name": "Second", "meal_types": ["ebed"], "Feherje_g": 20, "Szenhidrat_g": 10, "Zsir_g": 10}
        ]}"#;

        let catalog = parse_catalog(json).unwrap();
        assert_eq!(catalog.len(), 1);
        // Last occurrence wins
        assert_eq!(catalog.recipe("r1").unwrap().name, "Second");
    }

    #[test]
    fn test_malformed_json_is_error() {
        assert!(parse_catalog("{\"recipes\": [").is_err());
    }
}
