//! Clarification stubs
//!
//! Placeholders for a question/answer loop with the requester.

use serde_json::{json, Value};

use crate::ability::{ids, to_record, Ability, AbilityError};
use crate::state::{AbilityScope, Record};

pub struct ClarifyQuestion;

impl Ability for ClarifyQuestion {
    fn name(&self) -> &str {
        ids::CLARIFY_QUESTION
    }

    fn description(&self) -> &str {
        "Decides whether the requester must be asked for more detail."
    }

    fn execute(&self, _input: &Value, _scope: &mut AbilityScope<'_>) -> Result<Record, AbilityError> {
        Ok(to_record(json!({ "clarification_needed": false })))
    }
}

pub struct ExtractAnswer;

impl Ability for ExtractAnswer {
    fn name(&self) -> &str {
        ids::EXTRACT_ANSWER
    }

    fn description(&self) -> &str {
        "Reads the requester's answer."
    }

    fn execute(&self, _input: &Value, _scope: &mut AbilityScope<'_>) -> Result<Record, AbilityError> {
        Ok(to_record(json!({ "answer_received": true })))
    }
}

pub struct StoreAnswer;

impl Ability for StoreAnswer {
    fn name(&self) -> &str {
        ids::STORE_ANSWER
    }

    fn description(&self) -> &str {
        "Keeps the requester's answer."
    }

    fn execute(&self, _input: &Value, _scope: &mut AbilityScope<'_>) -> Result<Record, AbilityError> {
        Ok(to_record(json!({ "answer_stored": true })))
    }
}
