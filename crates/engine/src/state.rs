//! Shared workflow state
//!
//! A `WorkflowState` is created empty at the start of a run, mutated in place
//! by every ability invocation and stage, and read once at the end to build
//! the final output. It is owned by exactly one run.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A structured record: string keys to JSON values
pub type Record = Map<String, Value>;

/// One ability invocation recorded for a stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutedAbility {
    pub ability: String,
    pub result: Record,
}

/// Outcome of a stage, kept for introspection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageResult {
    pub executed: Vec<ExecutedAbility>,
    #[serde(rename = "mcp_client")]
    pub client: String,
}

/// Snapshot of the ticket and context
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalState {
    pub ticket: Record,
    pub context: Record,
}

impl FinalState {
    /// Convert to a record `{ticket, context}`
    pub fn into_record(self) -> Record {
        let mut record = Record::new();
        record.insert("ticket".to_string(), Value::Object(self.ticket));
        record.insert("context".to_string(), Value::Object(self.context));
        record
    }
}

/// Mutable state of a single run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkflowState {
    ticket: Record,
    context: Record,
    stage_results: BTreeMap<String, StageResult>,
}

impl WorkflowState {
    /// Create an empty state
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ticket(&self) -> &Record {
        &self.ticket
    }

    pub fn context(&self) -> &Record {
        &self.context
    }

    /// Borrow the parts of the state an ability may mutate
    ///
    /// The scope lives no longer than the borrow of `self`, so an ability
    /// cannot hold on to the state past its invocation.
    pub fn scope(&mut self) -> AbilityScope<'_> {
        AbilityScope {
            ticket: &mut self.ticket,
            context: &mut self.context,
        }
    }

    /// Build the `{ticket, context}` snapshot
    pub fn snapshot(&self) -> FinalState {
        FinalState {
            ticket: self.ticket.clone(),
            context: self.context.clone(),
        }
    }

    /// Record the outcome of a stage, replacing any earlier entry
    pub fn record_stage(&mut self, stage: impl Into<String>, result: StageResult) {
        self.stage_results.insert(stage.into(), result);
    }

    pub fn stage_result(&self, stage: &str) -> Option<&StageResult> {
        self.stage_results.get(stage)
    }

    pub fn stage_results(&self) -> &BTreeMap<String, StageResult> {
        &self.stage_results
    }

    pub(crate) fn into_parts(self) -> (FinalState, BTreeMap<String, StageResult>) {
        (
            FinalState {
                ticket: self.ticket,
                context: self.context,
            },
            self.stage_results,
        )
    }
}

/// Mutable view of `ticket` and `context` handed to an ability
///
/// Stage results are not reachable through a scope.
#[derive(Debug)]
pub struct AbilityScope<'a> {
    pub ticket: &'a mut Record,
    pub context: &'a mut Record,
}

impl AbilityScope<'_> {
    /// Read a context value
    pub fn context_value(&self, key: &str) -> Option<&Value> {
        self.context.get(key)
    }

    /// Write a context value
    pub fn set_context(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.context.insert(key.into(), value.into());
    }

    /// Read a ticket value
    pub fn ticket_value(&self, key: &str) -> Option<&Value> {
        self.ticket.get(key)
    }

    /// Write a ticket value
    pub fn set_ticket(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.ticket.insert(key.into(), value.into());
    }

    /// Replace the whole ticket
    pub fn replace_ticket(&mut self, ticket: Record) {
        *self.ticket = ticket;
    }

    /// Build the `{ticket, context}` snapshot
    pub fn snapshot(&self) -> FinalState {
        FinalState {
            ticket: self.ticket.clone(),
            context: self.context.clone(),
        }
    }
}
