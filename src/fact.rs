//! Facts: the atoms of the world state (§3).

use std::fmt;

use crate::error::{PlannerError, Result};
use crate::ontology::{Entity, EntityOrParameter, Ontology, Parameter, Predicate};

/// A predicate applied to arguments, with an optional fluent value.
///
/// A `Fact` is *ground* when every slot (`args` and `fluent`) holds an
/// `Entity` rather than a `Parameter`. Construction via `Fact::new_checked`
/// enforces the admissibility invariant from §3 (arity and types must match
/// `predicate`); the plain `Fact::new` constructor is for call-sites that
/// have already validated the shape (e.g. cloning under a parameter binding)
/// and would pay to re-check on every application.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Fact {
    pub predicate_name: String,
    pub args: Vec<EntityOrParameter>,
    pub fluent: Option<EntityOrParameter>,
}

impl Fact {
    pub fn new(
        predicate_name: impl Into<String>,
        args: Vec<EntityOrParameter>,
        fluent: Option<EntityOrParameter>,
    ) -> Self {
        Self {
            predicate_name: predicate_name.into(),
            args,
            fluent,
        }
    }

    /// Builds a fact and validates it against the predicate's signature.
    pub fn new_checked(
        predicate: &Predicate,
        args: Vec<EntityOrParameter>,
        fluent: Option<EntityOrParameter>,
        ontology: &Ontology,
    ) -> Result<Self> {
        if !predicate.admits(&args, fluent.as_ref(), ontology) {
            return Err(PlannerError::TypeMismatch {
                predicate: predicate.name.clone(),
                position: usize::MAX,
            });
        }
        Ok(Self::new(predicate.name.clone(), args, fluent))
    }

    pub fn is_ground(&self) -> bool {
        self.args.iter().all(EntityOrParameter::is_ground)
            && self.fluent.as_ref().is_none_or(EntityOrParameter::is_ground)
    }

    /// The fluent's ground entity, defaulting to the boolean-true marker
    /// `Entity::named("true", "bool")` when the fact carries no explicit
    /// fluent (a plain relational fact is true by virtue of being present).
    pub fn fluent_or_true(&self) -> Option<&Entity> {
        self.fluent.as_ref().and_then(EntityOrParameter::as_entity)
    }

    /// True if every ground argument of `self` matches the corresponding
    /// argument of `other` (treating `Entity::AnyValue` as a wildcard on
    /// either side), ignoring the fluent. Used to index and look up facts by
    /// argument pattern irrespective of their fluent value.
    pub fn args_match(&self, other: &Fact) -> bool {
        self.predicate_name == other.predicate_name
            && self.args.len() == other.args.len()
            && self.args.iter().zip(&other.args).all(|(a, b)| match (a, b) {
                (EntityOrParameter::Entity(ea), EntityOrParameter::Entity(eb)) => ea.matches(eb),
                _ => a == b,
            })
    }

    /// True if `self` (used as a pattern, args and fluent may hold
    /// `Entity::AnyValue`) matches `other` (expected ground) exactly,
    /// including the fluent slot.
    pub fn matches(&self, other: &Fact) -> bool {
        if !self.args_match(other) {
            return false;
        }
        match (&self.fluent, &other.fluent) {
            (None, None) => true,
            (None, Some(_)) | (Some(_), None) => false,
            (Some(EntityOrParameter::Entity(fa)), Some(EntityOrParameter::Entity(fb))) => {
                fa.matches(fb)
            }
            _ => self.fluent == other.fluent,
        }
    }

    /// True if `self` and `other` name the same predicate and every argument
    /// position is compatible under open unification: a `Parameter` on
    /// either side is a hole that matches anything, two `Entity`s must
    /// `matches` each other (`AnyValue` wildcard included). Unlike
    /// `args_match`, neither side needs to be ground — this is what the
    /// succession cache uses to tell whether an effect leaf can satisfy a
    /// precondition leaf that still carries open parameters (§4.8).
    pub fn pattern_compatible(&self, other: &Fact) -> bool {
        self.predicate_name == other.predicate_name
            && self.args.len() == other.args.len()
            && self.args.iter().zip(&other.args).all(|(a, b)| match (a, b) {
                (EntityOrParameter::Entity(ea), EntityOrParameter::Entity(eb)) => ea.matches(eb),
                _ => true,
            })
    }

    /// Replaces every occurrence of `old` with `new` across args and fluent,
    /// used when binding parameters during effect application.
    pub fn substitute(&self, bindings: &std::collections::BTreeMap<Parameter, Entity>) -> Fact {
        let substitute_slot = |slot: &EntityOrParameter| -> EntityOrParameter {
            match slot {
                EntityOrParameter::Parameter(p) => bindings
                    .get(p)
                    .cloned()
                    .map(EntityOrParameter::Entity)
                    .unwrap_or_else(|| slot.clone()),
                EntityOrParameter::Entity(_) => slot.clone(),
            }
        };
        Fact {
            predicate_name: self.predicate_name.clone(),
            args: self.args.iter().map(substitute_slot).collect(),
            fluent: self.fluent.as_ref().map(substitute_slot),
        }
    }

    /// All parameters referenced by this fact, in first-occurrence order.
    pub fn parameters(&self) -> Vec<Parameter> {
        let mut result = Vec::new();
        for arg in self.args.iter().chain(self.fluent.iter()) {
            if let EntityOrParameter::Parameter(p) = arg {
                if !result.contains(p) {
                    result.push(p.clone());
                }
            }
        }
        result
    }
}

impl fmt::Display for Fact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.predicate_name)?;
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{arg}")?;
        }
        write!(f, ")")?;
        if let Some(fluent) = &self.fluent {
            write!(f, "={fluent}")?;
        }
        Ok(())
    }
}

/// A `Fact` paired with a negation flag (§3).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FactOptional {
    pub fact: Fact,
    pub is_negated: bool,
}

impl FactOptional {
    pub fn positive(fact: Fact) -> Self {
        Self {
            fact,
            is_negated: false,
        }
    }

    pub fn negative(fact: Fact) -> Self {
        Self {
            fact,
            is_negated: true,
        }
    }

    pub fn negate(&self) -> Self {
        Self {
            fact: self.fact.clone(),
            is_negated: !self.is_negated,
        }
    }

    pub fn substitute(&self, bindings: &std::collections::BTreeMap<Parameter, Entity>) -> FactOptional {
        FactOptional {
            fact: self.fact.substitute(bindings),
            is_negated: self.is_negated,
        }
    }
}

impl fmt::Display for FactOptional {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_negated {
            write!(f, "not({})", self.fact)
        } else {
            write!(f, "{}", self.fact)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ontology::Type;

    fn ontology() -> Ontology {
        let mut o = Ontology::new();
        o.declare_type(Type::root("type1")).unwrap();
        o
    }

    #[test]
    fn new_checked_rejects_bad_arity() {
        let ontology = ontology();
        let pred = Predicate::new("pred_a", vec!["type1".to_string()]);
        let result = Fact::new_checked(&pred, vec![], None, &ontology);
        assert!(matches!(result, Err(PlannerError::TypeMismatch { .. })));
    }

    #[test]
    fn any_value_matches_any_ground_fluent() {
        let toto = EntityOrParameter::Entity(Entity::named("toto", "type1"));
        let pattern = Fact::new("pred_b", vec![toto.clone()], Some(EntityOrParameter::Entity(Entity::any_value())));
        let ground = Fact::new("pred_b", vec![toto], Some(EntityOrParameter::Entity(Entity::number(5))));
        assert!(pattern.matches(&ground));
    }

    #[test]
    fn pattern_compatible_treats_either_side_parameter_as_a_hole() {
        let p1 = Parameter::new("e", Some("type1"));
        let p2 = Parameter::new("other_name", Some("type1"));
        let open_a = Fact::new("fact_b", vec![EntityOrParameter::Parameter(p1)], None);
        let open_b = Fact::new("fact_b", vec![EntityOrParameter::Parameter(p2)], None);
        assert!(open_a.pattern_compatible(&open_b));

        let ground = Fact::new("fact_b", vec![EntityOrParameter::Entity(Entity::named("toto", "type1"))], None);
        assert!(open_a.pattern_compatible(&ground));

        let mismatched = Fact::new("fact_b", vec![EntityOrParameter::Entity(Entity::named("titi", "type1"))], None);
        assert!(!ground.pattern_compatible(&mismatched));
    }

    #[test]
    fn substitute_replaces_parameters_only() {
        let p = Parameter::new("e", Some("type1"));
        let fact = Fact::new("pred_b", vec![EntityOrParameter::Parameter(p.clone())], None);
        let mut bindings = std::collections::BTreeMap::new();
        bindings.insert(p, Entity::named("toto", "type1"));
        let substituted = fact.substitute(&bindings);
        assert!(substituted.is_ground());
        assert_eq!(substituted.args[0], EntityOrParameter::Entity(Entity::named("toto", "type1")));
    }
}
