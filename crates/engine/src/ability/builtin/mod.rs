//! Built-in abilities
//!
//! Stub implementations of a support-ticket workflow. Their outputs are fixed
//! or derived by simple rules; they exist to exercise the ability contract.
//!
//! Each workflow phase lives in its own file.

use std::sync::Arc;

use serde_json::Value;

use super::Ability;

mod clarification;
mod dispatch;
mod enrichment;
mod intake;
mod resolution;

pub use clarification::{ClarifyQuestion, ExtractAnswer, StoreAnswer};
pub use dispatch::{ExecuteApiCalls, OutputPayload, TriggerNotifications};
pub use enrichment::{AddFlagsCalculations, EnrichRecords, NormalizeFields};
pub use intake::{AcceptPayload, ExtractEntities, ParseRequestText};
pub use resolution::{
    CloseTicket, EscalationDecision, KnowledgeBaseSearch, ResponseGeneration, SolutionEvaluation,
    StoreData, UpdatePayload, UpdateTicket,
};

/// Every built-in ability
pub fn all() -> Vec<Arc<dyn Ability>> {
    vec![
        // Intake
        Arc::new(AcceptPayload),
        Arc::new(ParseRequestText),
        Arc::new(ExtractEntities),
        // Enrichment
        Arc::new(NormalizeFields),
        Arc::new(EnrichRecords),
        Arc::new(AddFlagsCalculations),
        // Clarification
        Arc::new(ClarifyQuestion),
        Arc::new(ExtractAnswer),
        Arc::new(StoreAnswer),
        // Resolution
        Arc::new(KnowledgeBaseSearch),
        Arc::new(StoreData),
        Arc::new(SolutionEvaluation),
        Arc::new(EscalationDecision),
        Arc::new(UpdatePayload),
        Arc::new(UpdateTicket),
        Arc::new(CloseTicket),
        Arc::new(ResponseGeneration),
        // Dispatch
        Arc::new(ExecuteApiCalls),
        Arc::new(TriggerNotifications),
        Arc::new(OutputPayload),
    ]
}

/// Loose truthiness of an optional JSON value
///
/// Missing, null, false, zero and empty strings are false.
pub(crate) fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashSet;

    #[test]
    fn test_all_names_are_unique() {
        let abilities = all();
        let names: HashSet<_> = abilities.iter().map(|a| a.name().to_string()).collect();
        assert_eq!(names.len(), abilities.len());
    }

    #[test]
    fn test_all_have_descriptions() {
        for ability in all() {
            assert!(!ability.description().is_empty(), "{}", ability.name());
        }
    }

    #[test]
    fn test_is_truthy() {
        assert!(!is_truthy(None));
        assert!(!is_truthy(Some(&json!(null))));
        assert!(!is_truthy(Some(&json!(false))));
        assert!(!is_truthy(Some(&json!(0))));
        assert!(!is_truthy(Some(&json!(""))));
        assert!(is_truthy(Some(&json!(true))));
        assert!(is_truthy(Some(&json!(1.5))));
        assert!(is_truthy(Some(&json!("yes"))));
        assert!(is_truthy(Some(&json!({}))));
    }
}
