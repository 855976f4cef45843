//! Dispatch abilities: outbound actions, notifications and the final payload
//!
//! No external system is contacted; the actions are simulated records.

use serde_json::{json, Value};

use super::is_truthy;
use crate::ability::{ids, to_record, Ability, AbilityError};
use crate::state::{AbilityScope, Record};

pub struct ExecuteApiCalls;

impl Ability for ExecuteApiCalls {
    fn name(&self) -> &str {
        ids::EXECUTE_API_CALLS
    }

    fn description(&self) -> &str {
        "Opens an issue for escalated tickets, emails the requester otherwise."
    }

    fn execute(
        &self,
        _input: &Value,
        scope: &mut AbilityScope<'_>,
    ) -> Result<Record, AbilityError> {
        let action = if is_truthy(scope.context_value("escalate")) {
            json!({ "action": "opened_jira", "id": "JIRA-789" })
        } else {
            json!({ "action": "sent_email", "id": "MSG-456" })
        };
        Ok(to_record(action))
    }
}

pub struct TriggerNotifications;

impl Ability for TriggerNotifications {
    fn name(&self) -> &str {
        ids::TRIGGER_NOTIFICATIONS
    }

    fn description(&self) -> &str {
        "Notifies the support channels."
    }

    fn execute(
        &self,
        _input: &Value,
        _scope: &mut AbilityScope<'_>,
    ) -> Result<Record, AbilityError> {
        Ok(to_record(json!({ "notified_channels": ["email", "slack"] })))
    }
}

/// Returns the `{ticket, context}` snapshot
pub struct OutputPayload;

impl Ability for OutputPayload {
    fn name(&self) -> &str {
        ids::OUTPUT_PAYLOAD
    }

    fn description(&self) -> &str {
        "Produces the current ticket and context."
    }

    fn execute(
        &self,
        _input: &Value,
        scope: &mut AbilityScope<'_>,
    ) -> Result<Record, AbilityError> {
        Ok(scope.snapshot().into_record())
    }
}
