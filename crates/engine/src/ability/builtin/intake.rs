//! Intake abilities: accept the payload and pull entities out of the request

use serde_json::{json, Value};

use crate::ability::{ids, to_record, Ability, AbilityError};
use crate::state::{AbilityScope, Record};

/// Replaces the ticket with the run payload
pub struct AcceptPayload;

impl Ability for AcceptPayload {
    fn name(&self) -> &str {
        ids::ACCEPT_PAYLOAD
    }

    fn description(&self) -> &str {
        "Seeds the ticket from the incoming payload."
    }

    fn execute(&self, input: &Value, scope: &mut AbilityScope<'_>) -> Result<Record, AbilityError> {
        let payload = input
            .as_object()
            .ok_or_else(|| AbilityError::new("payload must be a record"))?;
        scope.replace_ticket(payload.clone());
        Ok(to_record(json!({ "status": "accepted" })))
    }
}

/// Keyword-based entity detection over the request text
pub struct ParseRequestText;

impl ParseRequestText {
    fn entities(text: &str) -> Record {
        let text = text.to_lowercase();
        let mut entities = Record::new();
        if text.contains("password") {
            entities.insert("topic".to_string(), json!("authentication"));
        }
        if text.contains("dashboard") {
            entities.insert("resource".to_string(), json!("dashboard"));
        }
        entities
    }
}

impl Ability for ParseRequestText {
    fn name(&self) -> &str {
        ids::PARSE_REQUEST_TEXT
    }

    fn description(&self) -> &str {
        "Detects the request topic and resource from the query text."
    }

    fn execute(&self, input: &Value, scope: &mut AbilityScope<'_>) -> Result<Record, AbilityError> {
        // The input is the context; the query text arrives on the ticket.
        let text = input
            .get("query")
            .or_else(|| scope.ticket_value("query"))
            .and_then(Value::as_str)
            .unwrap_or_default();

        let entities = Value::Object(Self::entities(text));
        scope.set_context("entities", entities.clone());

        let mut result = Record::new();
        result.insert("entities".to_string(), entities);
        Ok(result)
    }
}

/// Passes the parsed entities through
pub struct ExtractEntities;

impl Ability for ExtractEntities {
    fn name(&self) -> &str {
        ids::EXTRACT_ENTITIES
    }

    fn description(&self) -> &str {
        "Returns the entities found by parse_request_text."
    }

    fn execute(
        &self,
        input: &Value,
        _scope: &mut AbilityScope<'_>,
    ) -> Result<Record, AbilityError> {
        let extracted = input
            .get("entities")
            .filter(|v| v.is_object())
            .cloned()
            .unwrap_or_else(|| json!({}));

        let mut result = Record::new();
        result.insert("extracted".to_string(), extracted);
        Ok(result)
    }
}
