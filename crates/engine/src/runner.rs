//! Stage runner
//!
//! Executes one stage definition against the workflow state:
//! - Deterministic stages run every ability in declared order
//! - Non-deterministic stages run exactly one ability picked by the
//!   injected `ChoiceSource`
//!
//! The runner holds no state across calls. All effects go through the
//! `WorkflowState` and `AuditLog` it is handed.

use serde_json::{json, Value};
use tracing::{debug, instrument, warn};

use crate::ability::{select_input, to_record, AbilityRegistry};
use crate::audit::AuditLog;
use crate::config::{StageDef, StageMode};
use crate::error::{EngineError, Result};
use crate::select::{pick, ChoiceSource};
use crate::state::{ExecutedAbility, Record, StageResult, WorkflowState};

/// Per-run inputs the runner needs besides the stage itself
pub struct StageContext<'a> {
    /// Workflow state, mutated in place
    pub state: &'a mut WorkflowState,
    /// Original run payload, handed to `accept_payload`
    pub payload: &'a Value,
    /// Audit log of the run
    pub log: &'a mut AuditLog,
    /// Random source for non-deterministic stages
    pub chooser: &'a mut dyn ChoiceSource,
}

/// Runs single stages through an ability registry
#[derive(Debug, Clone, Copy)]
pub struct StageRunner<'r> {
    registry: &'r AbilityRegistry,
}

impl<'r> StageRunner<'r> {
    pub fn new(registry: &'r AbilityRegistry) -> Self {
        Self { registry }
    }

    /// Execute `stage`
    ///
    /// Fails on an unsupported mode, an empty ability list, an unknown
    /// ability or an ability error. Nothing is retried.
    #[instrument(skip_all, fields(stage = %stage.name, mode = %stage.mode))]
    pub fn run(&self, stage: &StageDef, ctx: StageContext<'_>) -> Result<()> {
        let pick_one = match &stage.mode {
            StageMode::Deterministic => false,
            StageMode::Nondeterministic => true,
            StageMode::Unsupported(mode) => {
                warn!(mode = %mode, "unsupported stage mode");
                return Err(EngineError::UnsupportedMode {
                    stage: stage.name.clone(),
                    mode: mode.clone(),
                });
            }
        };
        if stage.abilities.is_empty() {
            return Err(EngineError::config(format!(
                "stage '{}' declares no abilities",
                stage.name
            )));
        }

        let StageContext {
            state,
            payload,
            log,
            chooser,
        } = ctx;

        log.append(
            &stage.name,
            format!("Executing stage ({}) via {} client.", stage.mode, stage.client),
            to_record(json!({ "abilities": stage.abilities })),
        );

        let mut executed = Vec::new();
        if pick_one {
            let index = pick(chooser, stage.abilities.len());
            let ability = &stage.abilities[index];
            debug!(ability = %ability, index, "non-deterministic choice");

            let result = self.invoke(stage, ability, state, payload)?;
            log.append(
                &stage.name,
                format!("Non-deterministic choice executed: {ability}"),
                entry_extra(ability, &result),
            );
            executed.push(ExecutedAbility {
                ability: ability.clone(),
                result,
            });
        } else {
            for ability in &stage.abilities {
                let result = self.invoke(stage, ability, state, payload)?;
                log.append(
                    &stage.name,
                    format!("Ability executed: {ability}"),
                    entry_extra(ability, &result),
                );
                executed.push(ExecutedAbility {
                    ability: ability.clone(),
                    result,
                });
            }
        }

        state.record_stage(
            stage.name.clone(),
            StageResult {
                executed,
                client: stage.client.clone(),
            },
        );
        Ok(())
    }

    /// Resolve and call one ability, applying the input-selection rule
    fn invoke(
        &self,
        stage: &StageDef,
        name: &str,
        state: &mut WorkflowState,
        payload: &Value,
    ) -> Result<Record> {
        let ability = self.registry.resolve(&stage.name, name)?;
        let input = select_input(name, payload, state.context());

        debug!(ability = %name, "executing ability");
        ability
            .execute(&input, &mut state.scope())
            .map_err(|source| {
                warn!(ability = %name, error = %source, "ability failed");
                EngineError::AbilityFailed {
                    stage: stage.name.clone(),
                    ability: name.to_string(),
                    source,
                }
            })
    }
}

fn entry_extra(ability: &str, result: &Record) -> Record {
    let mut extra = Record::new();
    extra.insert("ability".to_string(), Value::String(ability.to_string()));
    extra.insert("result".to_string(), Value::Object(result.clone()));
    extra
}
