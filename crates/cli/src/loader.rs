// Config and payload file loading
//
// Files are JSON unless the extension says YAML.

use std::path::Path;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileFormat {
    Json,
    Yaml,
}

impl FileFormat {
    fn of(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") => {
                FileFormat::Yaml
            }
            _ => FileFormat::Json,
        }
    }
}

/// Read and decode `path`
pub async fn load<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse(path, &raw)
}

/// Decode `raw` according to the extension of `path`
pub fn parse<T: DeserializeOwned>(path: &Path, raw: &str) -> Result<T> {
    match FileFormat::of(path) {
        FileFormat::Yaml => serde_yaml::from_str(raw)
            .with_context(|| format!("invalid YAML in {}", path.display())),
        FileFormat::Json => serde_json::from_str(raw)
            .with_context(|| format!("invalid JSON in {}", path.display())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use stagerun_engine::WorkflowConfig;

    #[test]
    fn test_format_by_extension() {
        assert_eq!(FileFormat::of(Path::new("flow.yaml")), FileFormat::Yaml);
        assert_eq!(FileFormat::of(Path::new("flow.YML")), FileFormat::Yaml);
        assert_eq!(FileFormat::of(Path::new("flow.json")), FileFormat::Json);
        assert_eq!(FileFormat::of(Path::new("flow")), FileFormat::Json);
    }

    #[test]
    fn test_parse_yaml_workflow() {
        let raw = r#"
owner: support-team
stages:
  - name: ingest
    mode: deterministic
    mcp_client: COMMON
    abilities: [accept_payload, parse_request_text]
"#;
        let workflow: WorkflowConfig = parse(Path::new("flow.yaml"), raw).unwrap();
        assert_eq!(workflow.owner, "support-team");
        assert_eq!(workflow.stages[0].client, "COMMON");
        assert_eq!(workflow.stages[0].abilities.len(), 2);
    }

    #[test]
    fn test_parse_error_names_file() {
        let err = parse::<Value>(Path::new("payload.json"), "{ nope").unwrap_err();
        assert!(err.to_string().contains("payload.json"));
    }

    #[tokio::test]
    async fn test_load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("payload.json");
        tokio::fs::write(&path, r#"{ "ticket_id": "T1" }"#).await.unwrap();

        let payload: Value = load(&path).await.unwrap();
        assert_eq!(payload, json!({ "ticket_id": "T1" }));
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let err = load::<Value>(Path::new("/nonexistent/payload.json"))
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("failed to read"));
    }
}
