//! Enrichment abilities: priority scoring, customer data and flags

use serde_json::{json, Value};

use crate::ability::{ids, to_record, Ability, AbilityError};
use crate::state::{AbilityScope, Record};

/// Score used when the ticket priority is missing or unrecognised
pub const DEFAULT_PRIORITY_SCORE: i64 = 30;

/// Scores at or above this value mark a ticket as urgent
pub const URGENT_THRESHOLD: f64 = 80.0;

/// Maps the ticket priority to a numeric score
pub struct NormalizeFields;

impl NormalizeFields {
    pub fn score(priority: &str) -> i64 {
        match priority.to_lowercase().as_str() {
            "low" => 10,
            "medium" => 50,
            "high" => 90,
            _ => DEFAULT_PRIORITY_SCORE,
        }
    }
}

impl Ability for NormalizeFields {
    fn name(&self) -> &str {
        ids::NORMALIZE_FIELDS
    }

    fn description(&self) -> &str {
        "Converts the ticket priority into context.priority_score."
    }

    fn execute(
        &self,
        _input: &Value,
        scope: &mut AbilityScope<'_>,
    ) -> Result<Record, AbilityError> {
        let priority = scope
            .ticket_value("priority")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let score = Self::score(priority);

        scope.set_context("priority_score", score);
        Ok(to_record(json!({ "priority_score": score })))
    }
}

/// Attaches customer data
pub struct EnrichRecords;

impl Ability for EnrichRecords {
    fn name(&self) -> &str {
        ids::ENRICH_RECORDS
    }

    fn description(&self) -> &str {
        "Looks up the customer tier."
    }

    fn execute(
        &self,
        _input: &Value,
        scope: &mut AbilityScope<'_>,
    ) -> Result<Record, AbilityError> {
        scope.set_context("customer_tier", "GOLD");
        Ok(to_record(json!({ "customer_tier": "GOLD" })))
    }
}

/// Derives the urgency flag from the priority score
pub struct AddFlagsCalculations;

impl Ability for AddFlagsCalculations {
    fn name(&self) -> &str {
        ids::ADD_FLAGS_CALCULATIONS
    }

    fn description(&self) -> &str {
        "Sets context.urgent when the priority score is at least 80."
    }

    fn execute(
        &self,
        _input: &Value,
        scope: &mut AbilityScope<'_>,
    ) -> Result<Record, AbilityError> {
        let score = scope
            .context_value("priority_score")
            .and_then(Value::as_f64)
            .unwrap_or(0.0);
        let urgent = score >= URGENT_THRESHOLD;

        scope.set_context("urgent", urgent);
        Ok(to_record(json!({ "urgent": urgent })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ability::builtin::test_support::run;
    use crate::state::WorkflowState;

    fn state_with_priority(priority: Option<&str>) -> WorkflowState {
        let mut state = WorkflowState::new();
        if let Some(p) = priority {
            state.scope().set_ticket("priority", p);
        }
        state
    }

    #[test]
    fn test_priority_scores() {
        let cases = [
            (Some("low"), 10),
            (Some("MEDIUM"), 50),
            (Some("High"), 90),
            (Some(""), 30),
            (Some("critical"), 30),
            (None, 30),
        ];

        for (priority, expected) in cases {
            let mut state = state_with_priority(priority);
            let result = run(&NormalizeFields, &mut state).unwrap();

            assert_eq!(result["priority_score"], json!(expected), "{priority:?}");
            assert_eq!(state.context()["priority_score"], json!(expected));
        }
    }

    #[test]
    fn test_non_string_priority_uses_default() {
        let mut state = WorkflowState::new();
        state.scope().set_ticket("priority", 3);

        run(&NormalizeFields, &mut state).unwrap();
        assert_eq!(state.context()["priority_score"], json!(30));
    }

    #[test]
    fn test_enrich_records() {
        let mut state = WorkflowState::new();
        let result = run(&EnrichRecords, &mut state).unwrap();

        assert_eq!(result["customer_tier"], "GOLD");
        assert_eq!(state.context()["customer_tier"], "GOLD");
    }

    #[test]
    fn test_urgent_iff_score_at_least_80() {
        for (score, urgent) in [(10, false), (30, false), (50, false), (79, false), (80, true), (90, true)] {
            let mut state = WorkflowState::new();
            state.scope().set_context("priority_score", score);

            let result = run(&AddFlagsCalculations, &mut state).unwrap();
            assert_eq!(result["urgent"], json!(urgent), "score {score}");
            assert_eq!(state.context()["urgent"], json!(urgent));
        }
    }

    #[test]
    fn test_missing_score_is_not_urgent() {
        let mut state = WorkflowState::new();
        run(&AddFlagsCalculations, &mut state).unwrap();
        assert_eq!(state.context()["urgent"], json!(false));
    }
}
