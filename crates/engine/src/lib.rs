//! # Stage Execution Engine
//!
//! Runs a declarative workflow, an ordered list of named stages each holding
//! a set of abilities, against an input payload. Produces the final ticket and
//! context plus an audit trail of every decision made.
//!
//! ## Features
//!
//! - **Explicit ability registry**: abilities are looked up by name; a miss is an error
//! - **Two stage modes**: deterministic (all abilities, in order) and
//!   non-deterministic (one ability, chosen at random)
//! - **Injectable randomness**: non-deterministic choices come from a `ChoiceSource`
//! - **Append-only audit log**: every stage and ability is traced and streamed to a sink
//! - **Fail fast**: any error aborts the run with no partial output
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                          Engine                              │
//! │  (validates, iterates stages in order, builds final output) │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       StageRunner                            │
//! │  (applies the stage mode, selects inputs, records results)  │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     AbilityRegistry                          │
//! │  (name → Ability, mutating ticket/context via AbilityScope) │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! The crate does no I/O. Loading the workflow and payload and persisting the
//! result are left to the caller.

pub mod ability;
pub mod audit;
pub mod config;
pub mod engine;
pub mod error;
pub mod runner;
pub mod select;
pub mod state;

/// Prelude for common imports
pub mod prelude {
    pub use crate::ability::{Ability, AbilityError, AbilityRegistry};
    pub use crate::audit::{AuditEntry, AuditSink, MemorySink, NoopSink, TracingSink};
    pub use crate::config::{EngineConfig, StageDef, StageMode, WorkflowConfig};
    pub use crate::engine::{Engine, RunOutput, RunPhase, WorkflowRun};
    pub use crate::error::{EngineError, Result};
    pub use crate::select::{ChoiceSource, RandomChoice, SequenceChoice};
    pub use crate::state::{AbilityScope, FinalState, Record, WorkflowState};
}

// Re-export key types at crate root
pub use ability::{Ability, AbilityError, AbilityRegistry};
pub use audit::{AuditEntry, AuditLog, AuditSink};
pub use config::{EngineConfig, StageDef, StageMode, WorkflowConfig};
pub use engine::{Engine, RunOutput, RunPhase, WorkflowRun};
pub use error::{EngineError, Result};
pub use runner::StageRunner;
pub use select::{ChoiceSource, RandomChoice, SequenceChoice};
pub use state::{FinalState, Record, WorkflowState};
