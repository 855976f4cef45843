//! Ability registry
//!
//! Maps ability names to implementations. The registry is immutable once
//! handed to an engine and holds no per-run state, so a single instance can
//! be shared read-only across runs.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::{builtin, Ability};
use crate::error::{EngineError, Result};

/// Registry of ability implementations keyed by name
#[derive(Clone, Default)]
pub struct AbilityRegistry {
    abilities: HashMap<String, Arc<dyn Ability>>,
}

impl AbilityRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            abilities: HashMap::new(),
        }
    }

    /// Create a registry with every built-in ability registered
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for ability in builtin::all() {
            registry.register_arc(ability);
        }
        registry
    }

    /// Register an ability.
    ///
    /// If an ability with the same name already exists, it will be replaced.
    pub fn register(&mut self, ability: impl Ability + 'static) {
        self.abilities
            .insert(ability.name().to_string(), Arc::new(ability));
    }

    /// Register an Arc-wrapped ability
    pub fn register_arc(&mut self, ability: Arc<dyn Ability>) {
        self.abilities.insert(ability.name().to_string(), ability);
    }

    /// Get an ability by name
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Ability>> {
        self.abilities.get(name)
    }

    /// Get an ability by name, failing with `UnknownAbility` for `stage`
    pub fn resolve(&self, stage: &str, name: &str) -> Result<&Arc<dyn Ability>> {
        self.abilities
            .get(name)
            .ok_or_else(|| EngineError::unknown_ability(stage, name))
    }

    /// Check if an ability is registered
    pub fn contains(&self, name: &str) -> bool {
        self.abilities.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.abilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.abilities.is_empty()
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.abilities.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Registered abilities, sorted by name
    pub fn list(&self) -> Vec<&Arc<dyn Ability>> {
        let mut abilities: Vec<_> = self.abilities.values().collect();
        abilities.sort_by(|a, b| a.name().cmp(b.name()));
        abilities
    }

    /// Create a builder for fluent registration
    pub fn builder() -> AbilityRegistryBuilder {
        AbilityRegistryBuilder::new()
    }
}

impl fmt::Debug for AbilityRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AbilityRegistry")
            .field("abilities", &self.names())
            .finish()
    }
}

/// Builder for creating an AbilityRegistry with a fluent API
///
/// ```ignore
/// let registry = AbilityRegistry::builder()
///     .builtins()
///     .ability(FlagVip)
///     .build();
/// ```
#[derive(Default)]
pub struct AbilityRegistryBuilder {
    registry: AbilityRegistry,
}

impl AbilityRegistryBuilder {
    pub fn new() -> Self {
        Self {
            registry: AbilityRegistry::new(),
        }
    }

    /// Add every built-in ability
    pub fn builtins(mut self) -> Self {
        for ability in builtin::all() {
            self.registry.register_arc(ability);
        }
        self
    }

    /// Add an ability
    pub fn ability(mut self, ability: impl Ability + 'static) -> Self {
        self.registry.register(ability);
        self
    }

    /// Add an Arc-wrapped ability
    pub fn ability_arc(mut self, ability: Arc<dyn Ability>) -> Self {
        self.registry.register_arc(ability);
        self
    }

    pub fn build(self) -> AbilityRegistry {
        self.registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ability::{ids, AbilityError};
    use crate::state::{AbilityScope, Record};
    use serde_json::Value;

    struct Marker(&'static str);

    impl Ability for Marker {
        fn name(&self) -> &str {
            self.0
        }

        fn execute(
            &self,
            _input: &Value,
            _scope: &mut AbilityScope<'_>,
        ) -> std::result::Result<Record, AbilityError> {
            Ok(Record::new())
        }
    }

    #[test]
    fn test_builtins_are_registered() {
        let registry = AbilityRegistry::with_builtins();

        assert_eq!(registry.len(), 20);
        assert!(registry.contains(ids::ACCEPT_PAYLOAD));
        assert!(registry.contains(ids::OUTPUT_PAYLOAD));
        assert!(registry.contains(ids::ESCALATION_DECISION));
    }

    #[test]
    fn test_resolve_unknown_ability() {
        let registry = AbilityRegistry::with_builtins();
        let err = registry.resolve("ingest", "teleport").err().expect("error");

        assert!(matches!(
            err,
            EngineError::UnknownAbility { ref stage, ref ability }
                if stage == "ingest" && ability == "teleport"
        ));
    }

    #[test]
    fn test_register_replaces_same_name() {
        let mut registry = AbilityRegistry::new();
        registry.register(Marker("a"));
        registry.register(Marker("a"));

        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_names_are_sorted() {
        let registry = AbilityRegistry::builder()
            .ability(Marker("zeta"))
            .ability(Marker("alpha"))
            .ability(Marker("mu"))
            .build();

        assert_eq!(registry.names(), vec!["alpha", "mu", "zeta"]);
        let listed: Vec<_> = registry.list().iter().map(|a| a.name()).collect();
        assert_eq!(listed, vec!["alpha", "mu", "zeta"]);
    }

    #[test]
    fn test_builder_extends_builtins() {
        let registry = AbilityRegistry::builder()
            .builtins()
            .ability(Marker("custom"))
            .build();

        assert_eq!(registry.len(), 21);
        assert!(registry.get("custom").is_some());
    }

    #[test]
    fn test_registry_debug() {
        let registry = AbilityRegistry::builder().ability(Marker("custom")).build();
        assert!(format!("{registry:?}").contains("custom"));
    }
}
