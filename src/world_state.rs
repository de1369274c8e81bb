//! The current set of ground facts, plus the derived queries `Condition`
//! and the planner's reachability closure need (§4.5, §4.7).

use std::collections::{BTreeMap, BTreeSet};

use crate::fact::{Fact, FactOptional};
use crate::ontology::{Entity, Ontology};

/// The set of facts currently known to hold.
///
/// Facts are indexed by predicate name; within a predicate, the fluent
/// uniqueness invariant (§3: at most one fluent value per ground argument
/// tuple) is enforced on insertion rather than checked on read, so every
/// other query can assume it already holds.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WorldState {
    facts_by_predicate: BTreeMap<String, BTreeSet<Fact>>,
}

impl WorldState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a ground fact, replacing any previously stored fact sharing
    /// the same predicate and arguments (the fluent-uniqueness invariant).
    /// Returns `true` if this changed the world state.
    pub fn add_fact(&mut self, fact: Fact) -> bool {
        debug_assert!(fact.is_ground(), "world state facts must be ground");
        let set = self.facts_by_predicate.entry(fact.predicate_name.clone()).or_default();
        let superseded: Vec<Fact> = set.iter().filter(|existing| existing.args_match(&fact)).cloned().collect();
        let changed = superseded.first() != Some(&fact);
        for existing in superseded {
            set.remove(&existing);
        }
        set.insert(fact);
        changed
    }

    /// Removes the stored fact sharing `fact`'s predicate and arguments, if
    /// any. Returns `true` if a fact was actually removed.
    pub fn remove_fact(&mut self, fact: &Fact) -> bool {
        let Some(set) = self.facts_by_predicate.get_mut(&fact.predicate_name) else {
            return false;
        };
        let existing: Option<Fact> = set.iter().find(|stored| stored.args_match(fact)).cloned();
        match existing {
            Some(stored) => {
                set.remove(&stored);
                true
            }
            None => false,
        }
    }

    /// True iff a stored fact matches `fact` exactly, including the fluent
    /// slot (`Entity::AnyValue` acts as a wildcard on either side, per
    /// `Fact::matches`).
    pub fn has_ground_fact(&self, fact: &Fact) -> bool {
        self.facts_by_predicate
            .get(&fact.predicate_name)
            .is_some_and(|set| set.iter().any(|stored| stored.matches(fact)))
    }

    /// True iff `fo` holds: its fact is present (for a positive optional) or
    /// absent (for a negated one).
    pub fn is_optional_fact_satisfied(&self, fo: &FactOptional) -> bool {
        self.has_ground_fact(&fo.fact) != fo.is_negated
    }

    /// The fluent currently recorded for the fact sharing `fact`'s predicate
    /// and arguments, ignoring whatever placeholder value `fact` itself
    /// carries in its fluent slot.
    pub fn fluent_value(&self, fact: &Fact) -> Option<Entity> {
        self.facts_by_predicate
            .get(&fact.predicate_name)?
            .iter()
            .find(|stored| stored.args_match(fact))
            .and_then(|stored| stored.fluent_or_true().cloned())
    }

    /// Every stored ground fact whose predicate name matches `pattern` and
    /// whose ground slots (entities, not parameters) are compatible with
    /// `pattern`'s. Slots holding an unbound `Parameter` match anything.
    pub fn match_pattern(&self, pattern: &Fact) -> Vec<Fact> {
        let Some(set) = self.facts_by_predicate.get(&pattern.predicate_name) else {
            return Vec::new();
        };
        set.iter().filter(|candidate| slot_pattern_matches(pattern, candidate)).cloned().collect()
    }

    /// All facts currently stored, across every predicate.
    pub fn facts(&self) -> impl Iterator<Item = &Fact> {
        self.facts_by_predicate.values().flatten()
    }

    /// Every entity of (subtype-compatible with) `type_name` that either
    /// appears in a currently-stored fact or is declared as an ontology
    /// constant — the universe EXISTS/FORALL quantify over (§4.2). An empty
    /// `type_name` (an untyped quantified parameter) matches every entity.
    pub fn entities_of_type(&self, ontology: &Ontology, type_name: &str) -> BTreeSet<Entity> {
        let admits = |entity: &Entity| -> bool {
            type_name.is_empty() || ontology.types().is_assignable_from(type_name, entity.type_name())
        };
        let mut result = BTreeSet::new();
        for fact in self.facts() {
            for arg in &fact.args {
                if let Some(entity) = arg.as_entity() {
                    if !entity.is_any_value() && admits(entity) {
                        result.insert(entity.clone());
                    }
                }
            }
            if let Some(fluent) = fact.fluent.as_ref().and_then(|f| f.as_entity()) {
                if !fluent.is_any_value() && fluent.as_number().is_none() && admits(fluent) {
                    result.insert(fluent.clone());
                }
            }
        }
        for constant in ontology.constants() {
            if admits(constant) {
                result.insert(constant.clone());
            }
        }
        result
    }
}

fn slot_pattern_matches(pattern: &Fact, candidate: &Fact) -> bool {
    use crate::ontology::EntityOrParameter;
    if pattern.args.len() != candidate.args.len() {
        return false;
    }
    let slot_ok = |p: &EntityOrParameter, c: &EntityOrParameter| -> bool {
        match (p, c) {
            (EntityOrParameter::Parameter(_), _) => true,
            (EntityOrParameter::Entity(pe), EntityOrParameter::Entity(ce)) => pe.matches(ce),
            (EntityOrParameter::Entity(_), EntityOrParameter::Parameter(_)) => false,
        }
    };
    let args_ok = pattern.args.iter().zip(&candidate.args).all(|(p, c)| slot_ok(p, c));
    let fluent_ok = match (&pattern.fluent, &candidate.fluent) {
        (None, None) => true,
        (Some(p), Some(c)) => slot_ok(p, c),
        _ => false,
    };
    args_ok && fluent_ok
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ontology::{EntityOrParameter, Type};

    fn ontology() -> Ontology {
        let mut o = Ontology::new();
        o.declare_type(Type::root("type1")).unwrap();
        o
    }

    fn fact_a(name: &str) -> Fact {
        Fact::new("pred_a", vec![EntityOrParameter::Entity(Entity::named(name, "type1"))], None)
    }

    #[test]
    fn add_fact_replaces_same_argument_fluent() {
        let mut ws = WorldState::new();
        let with_fluent = |value: i64| {
            Fact::new(
                "count",
                vec![EntityOrParameter::Entity(Entity::named("toto", "type1"))],
                Some(EntityOrParameter::Entity(Entity::number(value))),
            )
        };
        ws.add_fact(with_fluent(1));
        ws.add_fact(with_fluent(2));
        assert_eq!(ws.fluent_value(&with_fluent(0)), Some(Entity::number(2)));
        assert_eq!(ws.facts().count(), 1);
    }

    #[test]
    fn entities_of_type_unions_world_and_constants() {
        let mut ontology = ontology();
        ontology.declare_constant("konst", "type1").unwrap();
        let mut ws = WorldState::new();
        ws.add_fact(fact_a("toto"));
        let entities = ws.entities_of_type(&ontology, "type1");
        assert_eq!(entities.len(), 2);
        assert!(entities.contains(&Entity::named("toto", "type1")));
        assert!(entities.contains(&Entity::named("konst", "type1")));
    }

    #[test]
    fn remove_fact_clears_presence() {
        let mut ws = WorldState::new();
        ws.add_fact(fact_a("toto"));
        assert!(ws.has_ground_fact(&fact_a("toto")));
        assert!(ws.remove_fact(&fact_a("toto")));
        assert!(!ws.has_ground_fact(&fact_a("toto")));
    }
}
