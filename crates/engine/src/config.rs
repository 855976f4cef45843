// Workflow and engine configuration
//
// WorkflowConfig is the parsed workflow description handed to the engine by
// the caller. EngineConfig holds the knobs of the engine itself and can be
// built directly or from environment variables.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// Execution mode of a stage
///
/// Unknown mode strings are kept verbatim so the runner can reject them with
/// `UnsupportedMode` naming the offending stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum StageMode {
    /// Every ability runs, in declared order
    Deterministic,
    /// Exactly one ability runs, chosen at random
    Nondeterministic,
    /// Anything else found in the config
    Unsupported(String),
}

impl StageMode {
    pub fn as_str(&self) -> &str {
        match self {
            StageMode::Deterministic => "deterministic",
            StageMode::Nondeterministic => "nondeterministic",
            StageMode::Unsupported(raw) => raw,
        }
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, StageMode::Unsupported(_))
    }
}

impl From<String> for StageMode {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "deterministic" => StageMode::Deterministic,
            "nondeterministic" => StageMode::Nondeterministic,
            _ => StageMode::Unsupported(raw),
        }
    }
}

impl From<&str> for StageMode {
    fn from(raw: &str) -> Self {
        StageMode::from(raw.to_string())
    }
}

impl From<StageMode> for String {
    fn from(mode: StageMode) -> Self {
        mode.as_str().to_string()
    }
}

impl fmt::Display for StageMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single stage of a workflow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageDef {
    /// Unique stage name within the workflow
    pub name: String,

    /// Execution mode
    pub mode: StageMode,

    /// Label of the dispatch channel that conceptually handles this stage.
    /// Recorded in the audit log and stage results, never invoked.
    #[serde(rename = "mcp_client", alias = "client", default)]
    pub client: String,

    /// Candidate abilities, in declared order
    #[serde(default)]
    pub abilities: Vec<String>,
}

impl StageDef {
    /// Create a stage definition
    pub fn new(
        name: impl Into<String>,
        mode: impl Into<StageMode>,
        client: impl Into<String>,
        abilities: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            name: name.into(),
            mode: mode.into(),
            client: client.into(),
            abilities: abilities.into_iter().map(Into::into).collect(),
        }
    }

    /// Shorthand for a deterministic stage
    pub fn deterministic(
        name: impl Into<String>,
        client: impl Into<String>,
        abilities: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self::new(name, StageMode::Deterministic, client, abilities)
    }

    /// Shorthand for a non-deterministic stage
    pub fn nondeterministic(
        name: impl Into<String>,
        client: impl Into<String>,
        abilities: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self::new(name, StageMode::Nondeterministic, client, abilities)
    }
}

/// Parsed workflow description
///
/// Missing fields deserialize to empty values so that `validate` can report
/// them as `MalformedConfig` instead of failing inside the loader.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// Owner identifier, shown in the start audit entry
    #[serde(default)]
    pub owner: String,

    /// Stages in execution order
    #[serde(default)]
    pub stages: Vec<StageDef>,
}

impl WorkflowConfig {
    /// Create a workflow config
    pub fn new(owner: impl Into<String>, stages: Vec<StageDef>) -> Self {
        Self {
            owner: owner.into(),
            stages,
        }
    }

    /// Check the structural invariants of the config
    ///
    /// Mode and ability names are not checked here; those need the registry
    /// and are handled by `Engine::plan`.
    pub fn validate(&self, max_stages: usize) -> Result<()> {
        if self.owner.trim().is_empty() {
            return Err(EngineError::config("missing owner"));
        }
        if self.stages.is_empty() {
            return Err(EngineError::config("workflow has no stages"));
        }
        if self.stages.len() > max_stages {
            return Err(EngineError::config(format!(
                "workflow has {} stages, limit is {}",
                self.stages.len(),
                max_stages
            )));
        }

        let mut seen = HashSet::new();
        for (index, stage) in self.stages.iter().enumerate() {
            if stage.name.trim().is_empty() {
                return Err(EngineError::config(format!("stage #{index} has no name")));
            }
            if !seen.insert(stage.name.as_str()) {
                return Err(EngineError::config(format!(
                    "duplicate stage name '{}'",
                    stage.name
                )));
            }
            if stage.abilities.is_empty() {
                return Err(EngineError::config(format!(
                    "stage '{}' declares no abilities",
                    stage.name
                )));
            }
        }

        Ok(())
    }
}

fn default_max_stages() -> usize {
    1000
}

/// Configuration for the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Validate the workflow and resolve every ability before the first stage
    pub preflight: bool,

    /// Seed for the random source used by non-deterministic stages.
    /// `None` draws from OS entropy on every run.
    pub seed: Option<u64>,

    /// Upper bound on the number of stages in a workflow
    pub max_stages: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            preflight: true,
            seed: None,
            max_stages: default_max_stages(),
        }
    }
}

impl EngineConfig {
    /// Load from `STAGERUN_PREFLIGHT`, `STAGERUN_SEED` and `STAGERUN_MAX_STAGES`.
    /// Unset or unparsable variables fall back to the defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            preflight: lookup("STAGERUN_PREFLIGHT")
                .and_then(|v| parse_bool(&v))
                .unwrap_or(defaults.preflight),
            seed: lookup("STAGERUN_SEED").and_then(|v| v.trim().parse().ok()),
            max_stages: lookup("STAGERUN_MAX_STAGES")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(defaults.max_stages),
        }
    }

    /// Enable or disable preflight
    pub fn with_preflight(mut self, preflight: bool) -> Self {
        self.preflight = preflight;
        self
    }

    /// Set the random seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Set the stage limit
    pub fn with_max_stages(mut self, max_stages: usize) -> Self {
        self.max_stages = max_stages;
        self
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn stage(name: &str) -> StageDef {
        StageDef::deterministic(name, "internal", ["accept_payload"])
    }

    #[test]
    fn test_parse_wire_shape() {
        let config: WorkflowConfig = serde_json::from_value(json!({
            "owner": "support-team",
            "stages": [
                {
                    "name": "ingest",
                    "mode": "deterministic",
                    "mcp_client": "COMMON",
                    "abilities": ["accept_payload", "parse_request_text"]
                },
                {
                    "name": "clarify",
                    "mode": "nondeterministic",
                    "mcp_client": "ATLAS",
                    "abilities": ["clarify_question"]
                }
            ]
        }))
        .unwrap();

        assert_eq!(config.owner, "support-team");
        assert_eq!(config.stages[0].mode, StageMode::Deterministic);
        assert_eq!(config.stages[0].client, "COMMON");
        assert_eq!(config.stages[1].mode, StageMode::Nondeterministic);
    }

    #[test]
    fn test_unknown_mode_is_retained() {
        let stage: StageDef = serde_json::from_value(json!({
            "name": "x",
            "mode": "parallel",
            "mcp_client": "COMMON",
            "abilities": ["store_data"]
        }))
        .unwrap();

        assert_eq!(stage.mode, StageMode::Unsupported("parallel".to_string()));
        assert!(!stage.mode.is_supported());
        assert_eq!(stage.mode.to_string(), "parallel");
    }

    #[test]
    fn test_mode_serializes_as_string() {
        let stage = StageDef::nondeterministic("pick", "ATLAS", ["a", "b"]);
        let value = serde_json::to_value(&stage).unwrap();

        assert_eq!(value["mode"], "nondeterministic");
        assert_eq!(value["mcp_client"], "ATLAS");
    }

    #[test]
    fn test_missing_stages_fails_validation() {
        let config: WorkflowConfig = serde_json::from_value(json!({ "owner": "ops" })).unwrap();
        let err = config.validate(10).unwrap_err();

        assert!(matches!(err, EngineError::MalformedConfig(_)));
    }

    #[test]
    fn test_validate_rejects_missing_owner() {
        let config = WorkflowConfig::new("  ", vec![stage("ingest")]);
        assert!(matches!(
            config.validate(10),
            Err(EngineError::MalformedConfig(msg)) if msg.contains("owner")
        ));
    }

    #[test]
    fn test_validate_rejects_empty_abilities() {
        let empty: Vec<String> = Vec::new();
        let config = WorkflowConfig::new(
            "ops",
            vec![StageDef::deterministic("ingest", "COMMON", empty)],
        );

        assert!(matches!(
            config.validate(10),
            Err(EngineError::MalformedConfig(msg)) if msg.contains("ingest")
        ));
    }

    #[test]
    fn test_validate_rejects_duplicate_names() {
        let config = WorkflowConfig::new("ops", vec![stage("ingest"), stage("ingest")]);
        assert!(matches!(
            config.validate(10),
            Err(EngineError::MalformedConfig(msg)) if msg.contains("duplicate")
        ));
    }

    #[test]
    fn test_validate_enforces_stage_limit() {
        let config = WorkflowConfig::new("ops", vec![stage("a"), stage("b"), stage("c")]);

        assert!(config.validate(3).is_ok());
        assert!(config.validate(2).is_err());
    }

    #[test]
    fn test_engine_config_defaults() {
        let config = EngineConfig::default();
        assert!(config.preflight);
        assert_eq!(config.seed, None);
        assert_eq!(config.max_stages, 1000);
    }

    #[test]
    fn test_engine_config_from_lookup() {
        let config = EngineConfig::from_lookup(|key| match key {
            "STAGERUN_PREFLIGHT" => Some("off".to_string()),
            "STAGERUN_SEED" => Some("42".to_string()),
            "STAGERUN_MAX_STAGES" => Some("not-a-number".to_string()),
            _ => None,
        });

        assert!(!config.preflight);
        assert_eq!(config.seed, Some(42));
        assert_eq!(config.max_stages, 1000);
    }

    #[test]
    fn test_engine_config_builder() {
        let config = EngineConfig::default()
            .with_preflight(false)
            .with_seed(7)
            .with_max_stages(4);

        assert_eq!(
            config,
            EngineConfig {
                preflight: false,
                seed: Some(7),
                max_stages: 4,
            }
        );
    }
}
