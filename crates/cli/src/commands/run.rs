// Workflow run command

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::Value;
use stagerun_engine::{Engine, EngineConfig, RunOutput, WorkflowConfig};

use crate::loader;
use crate::output::{print_field, OutputFormat};

/// Where `--output -` sends the result
const STDOUT: &str = "-";

pub struct RunArgs {
    pub config: PathBuf,
    pub payload: PathBuf,
    pub output: String,
    pub seed: Option<u64>,
}

pub async fn run(args: RunArgs, output: OutputFormat, quiet: bool) -> Result<()> {
    let workflow: WorkflowConfig = loader::load(&args.config).await?;
    let payload: Value = loader::load(&args.payload).await?;
    let config = engine_config(EngineConfig::from_env(), args.seed);

    let result = execute(config, workflow, payload).await?;
    let rendered = output.render(&result)?;

    if args.output == STDOUT {
        println!("{}", rendered);
        return Ok(());
    }

    write_result(Path::new(&args.output), &rendered).await?;
    tracing::info!(path = %args.output, entries = result.logs.len(), "result written");

    if output.is_text() && !quiet {
        let status = result
            .final_state
            .ticket
            .get("status")
            .and_then(Value::as_str)
            .unwrap_or("-");
        print_field("Run", &result.run_id.to_string());
        print_field("Status", status);
        print_field("Log entries", &result.logs.len().to_string());
        print_field("Output", &args.output);
    }

    Ok(())
}

fn engine_config(config: EngineConfig, seed: Option<u64>) -> EngineConfig {
    match seed {
        Some(seed) => config.with_seed(seed),
        None => config,
    }
}

/// Run the engine off the async runtime; it is CPU-bound and synchronous
async fn execute(config: EngineConfig, workflow: WorkflowConfig, payload: Value) -> Result<RunOutput> {
    let engine = Engine::with_builtins().with_config(config);
    let owner = workflow.owner.clone();

    tokio::task::spawn_blocking(move || engine.run(&workflow, &payload))
        .await
        .context("workflow task panicked")?
        .with_context(|| format!("workflow run for owner '{}' failed", owner))
}

async fn write_result(path: &Path, rendered: &str) -> Result<()> {
    tokio::fs::write(path, rendered)
        .await
        .with_context(|| format!("failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_seed_flag_overrides_env_config() {
        let config = engine_config(EngineConfig::default().with_seed(1), Some(7));
        assert_eq!(config.seed, Some(7));

        let config = engine_config(EngineConfig::default().with_seed(1), None);
        assert_eq!(config.seed, Some(1));
    }

    #[tokio::test]
    async fn test_run_writes_result_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("workflow.json");
        let payload = dir.path().join("payload.json");
        let result = dir.path().join("outputLog.json");

        tokio::fs::write(
            &config,
            json!({
                "owner": "support-team",
                "stages": [{
                    "name": "ingest",
                    "mode": "deterministic",
                    "mcp_client": "COMMON",
                    "abilities": ["accept_payload", "normalize_fields", "add_flags_calculations"]
                }]
            })
            .to_string(),
        )
        .await
        .unwrap();
        tokio::fs::write(&payload, r#"{ "ticket_id": "T1", "priority": "high" }"#)
            .await
            .unwrap();

        let args = RunArgs {
            config,
            payload,
            output: result.to_string_lossy().into_owned(),
            seed: None,
        };
        run(args, OutputFormat::Json, true).await.unwrap();

        let written: Value =
            serde_json::from_str(&tokio::fs::read_to_string(&result).await.unwrap()).unwrap();
        assert_eq!(written["final_state"]["context"]["urgent"], json!(true));
        assert_eq!(written["logs"][0]["stage"], "AGENT");
        assert!(written.get("run_id").is_none());
    }

    #[tokio::test]
    async fn test_run_reports_engine_errors() {
        let workflow = WorkflowConfig::new(
            "ops",
            vec![stagerun_engine::StageDef::deterministic(
                "ingest",
                "COMMON",
                ["teleport"],
            )],
        );

        let err = execute(EngineConfig::default(), workflow, json!({ "ticket_id": "T1" }))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("owner 'ops'"));
        assert!(format!("{err:#}").contains("teleport"));
    }
}
