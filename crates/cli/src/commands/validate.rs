// Workflow validation command

use std::path::Path;

use anyhow::{Context, Result};
use serde_json::json;
use stagerun_engine::{Engine, EngineConfig, WorkflowConfig};

use crate::loader;
use crate::output::{print_table_header, print_table_row, OutputFormat};

pub async fn run(config: &Path, output: OutputFormat) -> Result<()> {
    let workflow: WorkflowConfig = loader::load(config).await?;
    check(&workflow)?;

    if output.is_text() {
        println!(
            "Workflow OK: owner '{}', {} stage(s)",
            workflow.owner,
            workflow.stages.len()
        );
        print_table_header(&[("STAGE", 20), ("MODE", 16), ("CLIENT", 10), ("ABILITIES", 9)]);
        for stage in &workflow.stages {
            print_table_row(&[
                (&stage.name, 20),
                (stage.mode.as_str(), 16),
                (&stage.client, 10),
                (&stage.abilities.len().to_string(), 9),
            ]);
        }
    } else {
        output.print_value(&json!({
            "valid": true,
            "owner": workflow.owner,
            "stages": workflow.stages.len(),
        }))?;
    }

    Ok(())
}

/// Full preflight against the built-in abilities, regardless of `STAGERUN_PREFLIGHT`
fn check(workflow: &WorkflowConfig) -> Result<()> {
    let config = EngineConfig::from_env().with_preflight(true);
    Engine::with_builtins()
        .with_config(config)
        .plan(workflow)
        .context("workflow config is invalid")
}
