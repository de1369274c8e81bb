//! World state modifications: the effect tree an `Action` or `Event` applies
//! to a `WorldState` (§3, §4.3).

use std::collections::BTreeSet;

use crate::bindings::GroundBindings;
use crate::condition::Condition;
use crate::fact::{Fact, FactOptional};
use crate::ontology::{Entity, EntityOrParameter, Ontology, Parameter};
use crate::world_state::WorldState;

/// How a single leaf of a `Wsm` tree touches one fact: whether it is
/// established or retracted, reported by `for_each_leaf`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EffectKind {
    /// Establishes the fact (a plain positive leaf, or `Assign`/`Increase`/
    /// `Decrease` on a fluent, all of which leave the fact present).
    Sets,
    /// Retracts the fact.
    Removes,
}

/// An effect tree. Applying one mutates a `WorldState` in place; its shape
/// mirrors `Condition`'s but every node is a side effect rather than a
/// truth value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Wsm {
    /// Establishes or retracts a fact (a ground boolean relation, or a
    /// fluent set to a literal ground value).
    Fact(FactOptional),
    /// Sets the fluent of `Fact` to whatever `Condition` reduces to.
    Assign(Fact, Box<Condition>),
    /// Adds the reduction of `Condition` to the fluent currently recorded
    /// for `Fact` (0 if absent).
    Increase(Fact, Box<Condition>),
    /// Subtracts the reduction of `Condition` from the fluent currently
    /// recorded for `Fact` (0 if absent).
    Decrease(Fact, Box<Condition>),
    And(Box<Wsm>, Box<Wsm>),
    /// Applies `body` once per ground value of `param`'s type found in the
    /// world (or declared as an ontology constant).
    Forall(Parameter, Box<Wsm>),
}

impl Wsm {
    pub fn set(fact: Fact) -> Self {
        Wsm::Fact(FactOptional::positive(fact))
    }

    pub fn unset(fact: Fact) -> Self {
        Wsm::Fact(FactOptional::negative(fact))
    }

    pub fn and(self, other: Wsm) -> Self {
        Wsm::And(Box::new(self), Box::new(other))
    }

    pub fn for_all(param: Parameter, body: Wsm) -> Self {
        Wsm::Forall(param, Box::new(body))
    }

    /// Applies this effect to `world_state` under `ground`.
    pub fn apply_to(&self, world_state: &mut WorldState, ontology: &Ontology, ground: &GroundBindings) {
        match self {
            Wsm::Fact(fo) => {
                let substituted = substitute_fact(&fo.fact, ground);
                if fo.is_negated {
                    world_state.remove_fact(&substituted);
                } else {
                    world_state.add_fact(substituted);
                }
            }
            Wsm::Assign(fact, expr) => {
                let substituted = substitute_fact(fact, ground);
                if let Some(value) = expr.reduce_entity(world_state, ontology, ground) {
                    world_state.add_fact(with_fluent(substituted, value));
                }
            }
            Wsm::Increase(fact, expr) => {
                apply_arithmetic(fact, expr, world_state, ontology, ground, |current, delta| current + delta);
            }
            Wsm::Decrease(fact, expr) => {
                apply_arithmetic(fact, expr, world_state, ontology, ground, |current, delta| current - delta);
            }
            Wsm::And(l, r) => {
                l.apply_to(world_state, ontology, ground);
                r.apply_to(world_state, ontology, ground);
            }
            Wsm::Forall(param, body) => {
                let type_name = param.type_name.clone().unwrap_or_default();
                let candidates = world_state.entities_of_type(ontology, &type_name);
                for candidate in candidates {
                    let mut extended = ground.clone();
                    extended.insert(param.name.clone(), candidate);
                    body.apply_to(world_state, ontology, &extended);
                }
            }
        }
    }

    /// Optimistic check: could applying this effect possibly establish or
    /// help establish `objective`? Used to index actions/events by the
    /// goals they are candidates for (§4.8, §4.9.1). Conservative by design:
    /// a `false` means "definitely irrelevant", `true` means "maybe".
    pub fn can_satisfy_objective(&self, objective: &Condition) -> bool {
        let positive = objective.positive_leaf_predicates();
        let negative = objective.negative_leaf_predicates();
        let mut relevant = false;
        self.for_each_leaf(&mut |fact, kind| {
            let matches_goal = match kind {
                EffectKind::Sets => positive.contains(&fact.predicate_name),
                EffectKind::Removes => negative.contains(&fact.predicate_name),
            };
            relevant |= matches_goal;
        });
        relevant
    }

    /// Visits every leaf of this effect tree, reporting the fact it touches
    /// and whether it sets or removes it (without descending into
    /// `Forall`'s per-entity expansion).
    pub fn for_each_leaf(&self, cb: &mut dyn FnMut(&Fact, EffectKind)) {
        match self {
            Wsm::Fact(fo) => cb(&fo.fact, if fo.is_negated { EffectKind::Removes } else { EffectKind::Sets }),
            Wsm::Assign(fact, _) | Wsm::Increase(fact, _) | Wsm::Decrease(fact, _) => cb(fact, EffectKind::Sets),
            Wsm::And(l, r) => {
                l.for_each_leaf(cb);
                r.for_each_leaf(cb);
            }
            Wsm::Forall(_, body) => body.for_each_leaf(cb),
        }
    }

    /// All predicates this effect can establish or retract, by name alone
    /// (coarser than the succession cache, which matches on full fact
    /// patterns — used where only "does this touch that predicate at all"
    /// matters, e.g. `ProblemModification::affected_predicates`).
    pub fn iterate_on_successions(&self) -> BTreeSet<(String, EffectKind)> {
        let mut result = BTreeSet::new();
        self.for_each_leaf(&mut |fact, kind| {
            result.insert((fact.predicate_name.clone(), kind));
        });
        result
    }
}

impl Eq for EffectKind {}

impl PartialOrd for EffectKind {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for EffectKind {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        rank(self).cmp(&rank(other))
    }
}

fn rank(kind: &EffectKind) -> u8 {
    match kind {
        EffectKind::Sets => 0,
        EffectKind::Removes => 1,
    }
}

fn apply_arithmetic(
    fact: &Fact,
    expr: &Condition,
    world_state: &mut WorldState,
    ontology: &Ontology,
    ground: &GroundBindings,
    combine: impl Fn(i64, i64) -> i64,
) {
    let substituted = substitute_fact(fact, ground);
    let Some(delta) = expr.reduce_number(world_state, ontology, ground) else {
        return;
    };
    let current = world_state.fluent_value(&substituted).and_then(|e| e.as_number()).unwrap_or(0);
    world_state.add_fact(with_fluent(substituted, Entity::number(combine(current, delta))));
}

fn with_fluent(mut fact: Fact, value: Entity) -> Fact {
    fact.fluent = Some(EntityOrParameter::Entity(value));
    fact
}

fn substitute_fact(fact: &Fact, ground: &GroundBindings) -> Fact {
    let bindings = ground
        .iter()
        .map(|(name, entity)| (Parameter::untyped(name.clone()), entity.clone()))
        .collect();
    fact.substitute(&bindings)
}
