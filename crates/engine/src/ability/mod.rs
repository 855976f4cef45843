//! Abilities
//!
//! An ability is a named operation dispatched by the stage runner. It gets an
//! input value (selected by `select_input`) and a scoped mutable view of the
//! ticket and context, and returns a result record that the engine records
//! verbatim without interpreting it.
//!
//! Design decisions:
//! - Abilities are defined via the `Ability` trait and looked up by name in an
//!   `AbilityRegistry`; a miss is an explicit error, never a silent no-op
//! - Abilities only see `ticket` and `context` through `AbilityScope`, borrowed
//!   for the duration of one call
//! - Built-in abilities are deterministic stubs grouped by workflow phase

use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::state::{AbilityScope, Record};

pub mod builtin;
mod registry;

pub use registry::{AbilityRegistry, AbilityRegistryBuilder};

// ============================================================================
// Ability names
// ============================================================================

/// Names of the built-in abilities
pub mod ids {
    pub const ACCEPT_PAYLOAD: &str = "accept_payload";
    pub const PARSE_REQUEST_TEXT: &str = "parse_request_text";
    pub const EXTRACT_ENTITIES: &str = "extract_entities";
    pub const NORMALIZE_FIELDS: &str = "normalize_fields";
    pub const ENRICH_RECORDS: &str = "enrich_records";
    pub const ADD_FLAGS_CALCULATIONS: &str = "add_flags_calculations";
    pub const CLARIFY_QUESTION: &str = "clarify_question";
    pub const EXTRACT_ANSWER: &str = "extract_answer";
    pub const STORE_ANSWER: &str = "store_answer";
    pub const KNOWLEDGE_BASE_SEARCH: &str = "knowledge_base_search";
    pub const STORE_DATA: &str = "store_data";
    pub const SOLUTION_EVALUATION: &str = "solution_evaluation";
    pub const ESCALATION_DECISION: &str = "escalation_decision";
    pub const UPDATE_PAYLOAD: &str = "update_payload";
    pub const UPDATE_TICKET: &str = "update_ticket";
    pub const CLOSE_TICKET: &str = "close_ticket";
    pub const RESPONSE_GENERATION: &str = "response_generation";
    pub const EXECUTE_API_CALLS: &str = "execute_api_calls";
    pub const TRIGGER_NOTIFICATIONS: &str = "trigger_notifications";
    pub const OUTPUT_PAYLOAD: &str = "output_payload";
}

// ============================================================================
// Input selection
// ============================================================================

/// Pick the input for an ability invocation
///
/// `accept_payload` receives the original run payload. Every other ability
/// receives a snapshot of the current context.
pub fn select_input<'a>(ability: &str, payload: &'a Value, context: &Record) -> Cow<'a, Value> {
    if ability == ids::ACCEPT_PAYLOAD {
        Cow::Borrowed(payload)
    } else {
        Cow::Owned(Value::Object(context.clone()))
    }
}

// ============================================================================
// AbilityError
// ============================================================================

/// Error returned by an ability
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AbilityError {
    /// Error message
    pub message: String,

    /// Additional error details (for debugging)
    pub details: Option<Value>,
}

impl AbilityError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            details: None,
        }
    }

    /// Add error details
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }
}

impl fmt::Display for AbilityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AbilityError {}

impl From<anyhow::Error> for AbilityError {
    fn from(err: anyhow::Error) -> Self {
        Self::new(format!("{err:#}"))
    }
}

// ============================================================================
// Ability trait
// ============================================================================

/// A named operation over the shared workflow state
///
/// # Example
///
/// ```
/// use serde_json::{json, Value};
/// use stagerun_engine::ability::{Ability, AbilityError};
/// use stagerun_engine::state::{AbilityScope, Record};
///
/// struct FlagVip;
///
/// impl Ability for FlagVip {
///     fn name(&self) -> &str {
///         "flag_vip"
///     }
///
///     fn description(&self) -> &str {
///         "Marks the context as belonging to a VIP customer"
///     }
///
///     fn execute(&self, _input: &Value, scope: &mut AbilityScope<'_>) -> Result<Record, AbilityError> {
///         scope.set_context("vip", true);
///         let mut result = Record::new();
///         result.insert("vip".to_string(), json!(true));
///         Ok(result)
///     }
/// }
/// ```
pub trait Ability: Send + Sync {
    /// Unique name used to look up the ability in a registry
    fn name(&self) -> &str;

    /// Human-readable description
    fn description(&self) -> &str {
        ""
    }

    /// Run the ability
    ///
    /// `input` is chosen by `select_input`. Side effects are limited to the
    /// ticket and context reachable through `scope`.
    fn execute(&self, input: &Value, scope: &mut AbilityScope<'_>)
        -> Result<Record, AbilityError>;
}

/// Convert a JSON value into a result record
///
/// Non-object values are wrapped as `{"value": ...}`.
pub fn to_record(value: Value) -> Record {
    match value {
        Value::Object(map) => map,
        other => {
            let mut record = Record::new();
            record.insert("value".to_string(), other);
            record
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_accept_payload_gets_payload() {
        let payload = json!({ "ticket_id": "T1" });
        let context = to_record(json!({ "urgent": true }));

        let input = select_input(ids::ACCEPT_PAYLOAD, &payload, &context);
        assert_eq!(input.as_ref(), &payload);
        assert!(matches!(input, Cow::Borrowed(_)));
    }

    #[test]
    fn test_other_abilities_get_context() {
        let payload = json!({ "ticket_id": "T1" });
        let context = to_record(json!({ "urgent": true }));

        for ability in [ids::PARSE_REQUEST_TEXT, ids::OUTPUT_PAYLOAD, "custom"] {
            let input = select_input(ability, &payload, &context);
            assert_eq!(input.as_ref(), &json!({ "urgent": true }));
        }
    }

    #[test]
    fn test_to_record_wraps_scalars() {
        assert_eq!(to_record(json!(3)), to_record(json!({ "value": 3 })));
        assert_eq!(to_record(json!({ "a": 1 }))["a"], json!(1));
    }

    #[test]
    fn test_ability_error_from_anyhow() {
        let err: AbilityError = anyhow::anyhow!("kb offline").context("search failed").into();
        assert_eq!(err.message, "search failed: kb offline");
    }

    #[test]
    fn test_ability_error_serialization() {
        let error = AbilityError::new("bad input").with_details(json!({ "field": "priority" }));

        let json = serde_json::to_string(&error).unwrap();
        let parsed: AbilityError = serde_json::from_str(&json).unwrap();

        assert_eq!(error, parsed);
    }
}
