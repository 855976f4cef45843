//! Workflow engine
//!
//! The `Engine` runs a workflow config against a payload:
//! - Validates the config and payload, optionally resolving every ability
//!   up front (preflight)
//! - Executes stages strictly in configured order through the `StageRunner`
//! - Builds the final `{ticket, context}` snapshot and returns it with the
//!   audit log
//!
//! A run is a small state machine:
//!
//! ```text
//! NotStarted ──► Running(0) ──► Running(1) ──► … ──► Completed
//!                    │              │
//!                    └──────────────┴──► Failed(i)
//! ```
//!
//! Any error fails the whole run. There is no partial final state.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::ability::{to_record, AbilityRegistry};
use crate::audit::{AuditEntry, AuditLog, AuditSink, TracingSink};
use crate::config::{EngineConfig, WorkflowConfig};
use crate::error::{EngineError, Result};
use crate::runner::{StageContext, StageRunner};
use crate::select::{ChoiceSource, RandomChoice};
use crate::state::{FinalState, StageResult, WorkflowState};

/// Stage name used for the run start entry
pub const START_STAGE: &str = "AGENT";

/// Stage name used for the run completion entry
pub const COMPLETE_STAGE: &str = "COMPLETE";

/// Result of a completed run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOutput {
    /// Identifier of the run (not part of the serialized output)
    #[serde(skip)]
    pub run_id: Uuid,

    /// Final ticket and context
    pub final_state: FinalState,

    /// Full audit trail, in append order
    pub logs: Vec<AuditEntry>,

    /// Per-stage results, for introspection
    #[serde(skip)]
    pub stage_results: BTreeMap<String, StageResult>,
}

/// Lifecycle of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    NotStarted,
    /// Stage `stage` is executing or was the last one executed
    Running { stage: usize },
    Completed,
    /// Stage `stage` raised an error
    Failed { stage: usize },
}

impl RunPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunPhase::Completed | RunPhase::Failed { .. })
    }
}

// ============================================================================
// Engine
// ============================================================================

/// Stage-execution engine
///
/// The engine owns a read-only ability registry and can serve any number of
/// independent runs; each run gets its own state and audit log.
///
/// # Example
///
/// ```
/// use serde_json::json;
/// use stagerun_engine::prelude::*;
///
/// let workflow = WorkflowConfig::new(
///     "support-team",
///     vec![StageDef::deterministic(
///         "ingest",
///         "COMMON",
///         ["accept_payload", "normalize_fields"],
///     )],
/// );
///
/// let engine = Engine::with_builtins().with_sink(std::sync::Arc::new(NoopSink));
/// let output = engine
///     .run(&workflow, &json!({ "ticket_id": "T1", "priority": "low" }))
///     .unwrap();
///
/// assert_eq!(output.final_state.context["priority_score"], json!(10));
/// ```
#[derive(Clone)]
pub struct Engine {
    registry: Arc<AbilityRegistry>,
    config: EngineConfig,
    sink: Arc<dyn AuditSink>,
}

impl Engine {
    /// Create an engine over `registry` with default config and a tracing sink
    pub fn new(registry: AbilityRegistry) -> Self {
        Self::from_shared(Arc::new(registry))
    }

    /// Create an engine over a shared registry
    pub fn from_shared(registry: Arc<AbilityRegistry>) -> Self {
        Self {
            registry,
            config: EngineConfig::default(),
            sink: Arc::new(TracingSink),
        }
    }

    /// Create an engine with every built-in ability
    pub fn with_builtins() -> Self {
        Self::new(AbilityRegistry::with_builtins())
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the sink that receives audit entries at emission time
    pub fn with_sink(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn registry(&self) -> &AbilityRegistry {
        &self.registry
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Validate `workflow` and resolve every mode and ability name
    ///
    /// Errors are reported for the first offending stage in config order.
    pub fn plan(&self, workflow: &WorkflowConfig) -> Result<()> {
        workflow.validate(self.config.max_stages)?;

        for stage in &workflow.stages {
            if !stage.mode.is_supported() {
                return Err(EngineError::UnsupportedMode {
                    stage: stage.name.clone(),
                    mode: stage.mode.to_string(),
                });
            }
            for ability in &stage.abilities {
                self.registry.resolve(&stage.name, ability)?;
            }
        }

        debug!(stages = workflow.stages.len(), "workflow plan resolved");
        Ok(())
    }

    /// Random source configured for this engine
    fn default_chooser(&self) -> Box<dyn ChoiceSource> {
        match self.config.seed {
            Some(seed) => Box::new(RandomChoice::seeded(seed)),
            None => Box::new(RandomChoice::from_entropy()),
        }
    }

    /// Prepare a step-wise run using the configured random source
    pub fn start<'a>(
        &'a self,
        workflow: &'a WorkflowConfig,
        payload: &'a Value,
    ) -> Result<WorkflowRun<'a>> {
        self.start_with(workflow, payload, self.default_chooser())
    }

    /// Prepare a step-wise run with an explicit random source
    pub fn start_with<'a>(
        &'a self,
        workflow: &'a WorkflowConfig,
        payload: &'a Value,
        chooser: Box<dyn ChoiceSource + 'a>,
    ) -> Result<WorkflowRun<'a>> {
        if self.config.preflight {
            self.plan(workflow)?;
        } else {
            workflow.validate(self.config.max_stages)?;
        }
        let ticket_id = ticket_id(payload)?;

        Ok(WorkflowRun {
            id: Uuid::now_v7(),
            engine: self,
            workflow,
            payload,
            ticket_id,
            state: WorkflowState::new(),
            log: AuditLog::new(self.sink.clone()),
            phase: RunPhase::NotStarted,
            next_stage: 0,
            chooser,
        })
    }

    /// Run `workflow` to completion using the configured random source
    pub fn run(&self, workflow: &WorkflowConfig, payload: &Value) -> Result<RunOutput> {
        self.start(workflow, payload)?.finish()
    }

    /// Run `workflow` to completion with an explicit random source
    pub fn run_with(
        &self,
        workflow: &WorkflowConfig,
        payload: &Value,
        chooser: &mut dyn ChoiceSource,
    ) -> Result<RunOutput> {
        self.start_with(workflow, payload, Box::new(chooser))?.finish()
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("registry", &self.registry)
            .field("config", &self.config)
            .finish()
    }
}

/// Render the payload's `ticket_id` for the start entry
fn ticket_id(payload: &Value) -> Result<String> {
    let record = payload
        .as_object()
        .ok_or_else(|| EngineError::payload("payload must be a record"))?;

    match record.get("ticket_id") {
        Some(Value::String(id)) => Ok(id.clone()),
        Some(Value::Number(id)) => Ok(id.to_string()),
        Some(_) => Err(EngineError::payload("ticket_id must be a string or number")),
        None => Err(EngineError::payload("missing ticket_id")),
    }
}

// ============================================================================
// WorkflowRun
// ============================================================================

/// A single run of a workflow, advanced one stage at a time
///
/// The run exclusively owns its state and audit log. After a failure the run
/// refuses further steps but its log stays readable for diagnostics.
pub struct WorkflowRun<'a> {
    id: Uuid,
    engine: &'a Engine,
    workflow: &'a WorkflowConfig,
    payload: &'a Value,
    ticket_id: String,
    state: WorkflowState,
    log: AuditLog,
    phase: RunPhase,
    next_stage: usize,
    chooser: Box<dyn ChoiceSource + 'a>,
}

impl<'a> WorkflowRun<'a> {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    pub fn state(&self) -> &WorkflowState {
        &self.state
    }

    pub fn log(&self) -> &AuditLog {
        &self.log
    }

    /// Number of stages not yet executed
    pub fn remaining(&self) -> usize {
        self.workflow.stages.len() - self.next_stage
    }

    /// Execute the next stage
    ///
    /// Returns `Ok(true)` if a stage ran and `Ok(false)` once every stage
    /// has run.
    #[instrument(skip_all, fields(run_id = %self.id, owner = %self.workflow.owner))]
    pub fn step(&mut self) -> Result<bool> {
        match self.phase {
            RunPhase::Completed => return Err(EngineError::RunFinished),
            RunPhase::Failed { stage } => return Err(EngineError::RunFailed(stage)),
            RunPhase::NotStarted => {
                info!(ticket_id = %self.ticket_id, "starting workflow");
                self.log.append(
                    START_STAGE,
                    format!(
                        "Starting workflow for ticket {} (owner: {})",
                        self.ticket_id, self.workflow.owner
                    ),
                    Default::default(),
                );
            }
            RunPhase::Running { .. } => {}
        }

        let Some(stage) = self.workflow.stages.get(self.next_stage) else {
            return Ok(false);
        };
        let index = self.next_stage;
        self.phase = RunPhase::Running { stage: index };

        let runner = StageRunner::new(&self.engine.registry);
        let outcome = runner.run(
            stage,
            StageContext {
                state: &mut self.state,
                payload: self.payload,
                log: &mut self.log,
                chooser: &mut *self.chooser,
            },
        );

        match outcome {
            Ok(()) => {
                self.next_stage += 1;
                Ok(true)
            }
            Err(err) => {
                warn!(stage = %stage.name, error = %err, "workflow run failed");
                self.phase = RunPhase::Failed { stage: index };
                Err(err)
            }
        }
    }

    /// Execute the remaining stages and build the output
    pub fn finish(mut self) -> Result<RunOutput> {
        while self.step()? {}

        let final_state = self.state.snapshot();
        self.log.append(
            COMPLETE_STAGE,
            "Workflow completed. Final payload produced.",
            to_record(json!({ "final": &final_state })),
        );
        self.phase = RunPhase::Completed;
        info!(run_id = %self.id, entries = self.log.len(), "workflow completed");

        let (final_state, stage_results) = self.state.into_parts();
        Ok(RunOutput {
            run_id: self.id,
            final_state,
            logs: self.log.into_entries(),
            stage_results,
        })
    }

    /// Give up the run and keep its audit entries
    pub fn into_log(self) -> Vec<AuditEntry> {
        self.log.into_entries()
    }
}

impl fmt::Debug for WorkflowRun<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkflowRun")
            .field("id", &self.id)
            .field("phase", &self.phase)
            .field("next_stage", &self.next_stage)
            .field("log", &self.log)
            .finish()
    }
}
