use std::collections::HashMap;
use std::path::Path;

use countries_map_shared::CountryNameTable;

/// Load a JSON object of country code -> display name.
pub async fn load(path: &Path) -> Result<CountryNameTable, String> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| format!("failed to read {}: {e}", path.display()))?;
    let names: HashMap<String, String> = serde_json::from_str(&text)
        .map_err(|e| format!("failed to parse {}: {e}", path.display()))?;
    Ok(names.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use countries_map_shared::CountryNames;

    use super::load;

    #[tokio::test]
    async fn loads_names_case_insensitively() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("names.json");
        std::fs::write(&path, r#"{"fr": "France", "DE": "Germany"}"#).expect("write names");

        let table = load(&path).await.expect("names should load");
        assert_eq!(table.len(), 2);
        assert_eq!(table.display_name("FR"), "France");
        assert_eq!(table.display_name("de"), "Germany");
        assert_eq!(table.display_name("IT"), "IT");
    }

    #[tokio::test]
    async fn rejects_non_object_payloads() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("names.json");
        std::fs::write(&path, r#"["France"]"#).expect("write names");

        let error = load(&path).await.expect_err("array is not a name table");
        assert!(error.starts_with("failed to parse"));
    }
}
