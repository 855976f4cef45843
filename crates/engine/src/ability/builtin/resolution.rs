//! Resolution abilities: knowledge lookup, scoring, escalation and ticket updates

use chrono::{SecondsFormat, Utc};
use serde_json::{json, Value};

use super::is_truthy;
use crate::ability::{ids, to_record, Ability, AbilityError};
use crate::state::{AbilityScope, Record};

/// Solution returned by the knowledge-base stub
pub const KB_SOLUTION_ID: &str = "KB-1024";

/// Confidence returned by the knowledge-base stub
pub const KB_CONFIDENCE: f64 = 0.86;

/// Solution scores below this value escalate the ticket
pub const RESOLVE_THRESHOLD: i64 = 90;

pub const RESOLVED_MESSAGE: &str = "We have resolved your issue using solution KB-1024.";
pub const ESCALATED_MESSAGE: &str = "Your issue has been escalated to a specialist.";

pub struct KnowledgeBaseSearch;

impl Ability for KnowledgeBaseSearch {
    fn name(&self) -> &str {
        ids::KNOWLEDGE_BASE_SEARCH
    }

    fn description(&self) -> &str {
        "Finds a candidate solution and stores it as context.kb_hit."
    }

    fn execute(
        &self,
        _input: &Value,
        scope: &mut AbilityScope<'_>,
    ) -> Result<Record, AbilityError> {
        let hit = json!({ "solution_id": KB_SOLUTION_ID, "confidence": KB_CONFIDENCE });
        scope.set_context("kb_hit", hit.clone());
        Ok(to_record(hit))
    }
}

pub struct StoreData;

impl Ability for StoreData {
    fn name(&self) -> &str {
        ids::STORE_DATA
    }

    fn description(&self) -> &str {
        "Persists intermediate data."
    }

    fn execute(
        &self,
        _input: &Value,
        _scope: &mut AbilityScope<'_>,
    ) -> Result<Record, AbilityError> {
        Ok(to_record(json!({ "stored": true })))
    }
}

/// Turns the knowledge-base confidence into a 0-100 score
pub struct SolutionEvaluation;

impl SolutionEvaluation {
    /// `round(kb_hit.confidence * 100)`, with a missing confidence counted as 0
    pub fn score(context: &Record) -> i64 {
        let confidence = context
            .get("kb_hit")
            .and_then(|hit| hit.get("confidence"))
            .and_then(Value::as_f64)
            .unwrap_or(0.0);
        (confidence * 100.0).round() as i64
    }
}

impl Ability for SolutionEvaluation {
    fn name(&self) -> &str {
        ids::SOLUTION_EVALUATION
    }

    fn description(&self) -> &str {
        "Scores the knowledge-base hit and stores context.solution_score."
    }

    fn execute(
        &self,
        _input: &Value,
        scope: &mut AbilityScope<'_>,
    ) -> Result<Record, AbilityError> {
        let score = Self::score(scope.context);
        scope.set_context("solution_score", score);
        Ok(to_record(json!({ "solution_score": score })))
    }
}

/// Decides whether the ticket must be escalated
///
/// Reuses `context.solution_score` when `solution_evaluation` already ran,
/// otherwise evaluates the knowledge-base hit itself.
pub struct EscalationDecision;

impl Ability for EscalationDecision {
    fn name(&self) -> &str {
        ids::ESCALATION_DECISION
    }

    fn description(&self) -> &str {
        "Escalates when the solution score is below 90 or the ticket is urgent."
    }

    fn execute(
        &self,
        _input: &Value,
        scope: &mut AbilityScope<'_>,
    ) -> Result<Record, AbilityError> {
        let solution_score = scope
            .context_value("solution_score")
            .and_then(Value::as_i64)
            .unwrap_or_else(|| SolutionEvaluation::score(scope.context));
        let urgent = is_truthy(scope.context_value("urgent"));
        let escalate = solution_score < RESOLVE_THRESHOLD || urgent;

        scope.set_context("escalate", escalate);
        Ok(to_record(json!({
            "escalate": escalate,
            "solution_score": solution_score,
        })))
    }
}

pub struct UpdatePayload;

impl Ability for UpdatePayload {
    fn name(&self) -> &str {
        ids::UPDATE_PAYLOAD
    }

    fn description(&self) -> &str {
        "Updates the outgoing payload."
    }

    fn execute(
        &self,
        _input: &Value,
        _scope: &mut AbilityScope<'_>,
    ) -> Result<Record, AbilityError> {
        Ok(to_record(json!({ "payload_updated": true })))
    }
}

/// Sets the ticket status from the escalation decision
pub struct UpdateTicket;

impl Ability for UpdateTicket {
    fn name(&self) -> &str {
        ids::UPDATE_TICKET
    }

    fn description(&self) -> &str {
        "Marks the ticket Escalated or Resolved."
    }

    fn execute(
        &self,
        _input: &Value,
        scope: &mut AbilityScope<'_>,
    ) -> Result<Record, AbilityError> {
        let status = if is_truthy(scope.context_value("escalate")) {
            "Escalated"
        } else {
            "Resolved"
        };

        scope.set_ticket("status", status);
        Ok(to_record(json!({ "status": status })))
    }
}

pub struct CloseTicket;

impl Ability for CloseTicket {
    fn name(&self) -> &str {
        ids::CLOSE_TICKET
    }

    fn description(&self) -> &str {
        "Stamps ticket.closed_at with the current time."
    }

    fn execute(
        &self,
        _input: &Value,
        scope: &mut AbilityScope<'_>,
    ) -> Result<Record, AbilityError> {
        let closed_at = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        scope.set_ticket("closed_at", closed_at);
        Ok(to_record(json!({ "closed": true })))
    }
}

/// Picks the outbound message for the requester
pub struct ResponseGeneration;

impl Ability for ResponseGeneration {
    fn name(&self) -> &str {
        ids::RESPONSE_GENERATION
    }

    fn description(&self) -> &str {
        "Writes context.outbound_message based on the ticket status."
    }

    fn execute(
        &self,
        _input: &Value,
        scope: &mut AbilityScope<'_>,
    ) -> Result<Record, AbilityError> {
        let status = scope
            .ticket_value("status")
            .and_then(Value::as_str)
            .unwrap_or("Open");
        let message = if status == "Resolved" {
            RESOLVED_MESSAGE
        } else {
            ESCALATED_MESSAGE
        };

        scope.set_context("outbound_message", message);
        Ok(to_record(json!({ "message": message })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ability::builtin::test_support::run;
    use crate::state::WorkflowState;
    use chrono::DateTime;

    fn state_with(context: Value) -> WorkflowState {
        let mut state = WorkflowState::new();
        if let Value::Object(map) = context {
            let mut scope = state.scope();
            for (key, value) in map {
                scope.set_context(key, value);
            }
        }
        state
    }

    #[test]
    fn test_knowledge_base_search() {
        let mut state = WorkflowState::new();
        let result = run(&KnowledgeBaseSearch, &mut state).unwrap();

        assert_eq!(result["solution_id"], "KB-1024");
        assert_eq!(
            state.context()["kb_hit"],
            json!({ "solution_id": "KB-1024", "confidence": 0.86 })
        );
    }

    #[test]
    fn test_solution_evaluation_rounds_confidence() {
        let mut state = state_with(json!({ "kb_hit": { "confidence": 0.86 } }));
        let result = run(&SolutionEvaluation, &mut state).unwrap();

        assert_eq!(result["solution_score"], json!(86));
        assert_eq!(state.context()["solution_score"], json!(86));

        let mut state = state_with(json!({ "kb_hit": { "confidence": 0.905 } }));
        assert_eq!(run(&SolutionEvaluation, &mut state).unwrap()["solution_score"], json!(91));
    }

    #[test]
    fn test_solution_evaluation_without_hit() {
        let mut state = WorkflowState::new();
        let result = run(&SolutionEvaluation, &mut state).unwrap();
        assert_eq!(result["solution_score"], json!(0));
    }

    #[test]
    fn test_escalation_reuses_stored_score() {
        // kb_hit would score 86, but the stored evaluation wins
        let mut state = state_with(json!({
            "kb_hit": { "confidence": 0.86 },
            "solution_score": 95,
            "urgent": false
        }));
        let result = run(&EscalationDecision, &mut state).unwrap();

        assert_eq!(result["solution_score"], json!(95));
        assert_eq!(result["escalate"], json!(false));
    }

    #[test]
    fn test_escalation_evaluates_when_score_missing() {
        let mut state = state_with(json!({ "kb_hit": { "confidence": 0.86 } }));
        let result = run(&EscalationDecision, &mut state).unwrap();

        assert_eq!(result["solution_score"], json!(86));
        assert_eq!(result["escalate"], json!(true));
        assert_eq!(state.context()["escalate"], json!(true));
    }

    #[test]
    fn test_urgent_always_escalates() {
        let mut state = state_with(json!({ "solution_score": 99, "urgent": true }));
        let result = run(&EscalationDecision, &mut state).unwrap();
        assert_eq!(result["escalate"], json!(true));
    }

    #[test]
    fn test_status_resolved_iff_high_score_and_not_urgent() {
        for score in [0, 86, 89, 90, 100] {
            for urgent in [false, true] {
                let mut state = state_with(json!({ "solution_score": score, "urgent": urgent }));
                run(&EscalationDecision, &mut state).unwrap();
                run(&UpdateTicket, &mut state).unwrap();

                let expected = if score >= 90 && !urgent { "Resolved" } else { "Escalated" };
                assert_eq!(state.ticket()["status"], expected, "score {score} urgent {urgent}");
            }
        }
    }

    #[test]
    fn test_close_ticket_sets_timestamp() {
        let mut state = WorkflowState::new();
        let result = run(&CloseTicket, &mut state).unwrap();

        assert_eq!(result["closed"], json!(true));
        let closed_at = state.ticket()["closed_at"].as_str().unwrap();
        assert!(DateTime::parse_from_rfc3339(closed_at).is_ok());
    }

    #[test]
    fn test_response_generation() {
        let mut state = WorkflowState::new();
        state.scope().set_ticket("status", "Resolved");
        let result = run(&ResponseGeneration, &mut state).unwrap();
        assert_eq!(result["message"], RESOLVED_MESSAGE);
        assert_eq!(state.context()["outbound_message"], RESOLVED_MESSAGE);

        let mut state = WorkflowState::new();
        run(&ResponseGeneration, &mut state).unwrap();
        assert_eq!(state.context()["outbound_message"], ESCALATED_MESSAGE);
    }

    #[test]
    fn test_stubs() {
        let mut state = WorkflowState::new();
        assert_eq!(run(&StoreData, &mut state).unwrap()["stored"], json!(true));
        assert_eq!(run(&UpdatePayload, &mut state).unwrap()["payload_updated"], json!(true));
    }
}
