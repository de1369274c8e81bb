//! The bundle of effects and goal changes an `Action` or `Event` produces
//! when it fires (§3, §4.9.4).

use std::collections::BTreeMap;

use crate::bindings::GroundBindings;
use crate::fact::Fact;
use crate::goal::Goal;
use crate::ontology::{Entity, Ontology, Parameter};
use crate::world_state::WorldState;
use crate::wsm::{EffectKind, Wsm};

/// Everything that happens to a `Problem` when an action or event fires.
///
/// The three `Wsm` effects are distinguished by when they are guaranteed to
/// apply: `world_state_modification` always does, the moment the action is
/// considered done; `world_state_modification_at_start` applies immediately
/// when the action starts (before its duration elapses, for callers that
/// model actions as taking time); `potential_world_state_modification` is an
/// effect that *may* happen (used by events whose firing is conditional on
/// something outside the planner's knowledge) and is only used by the
/// reachability closure as an optimistic possibility, never actually
/// applied by `notify_action_done` (§4.5, §4.9.4).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ProblemModification {
    pub world_state_modification: Option<Wsm>,
    pub potential_world_state_modification: Option<Wsm>,
    pub world_state_modification_at_start: Option<Wsm>,
    /// Goals to push at an explicit priority.
    pub goals_to_add: BTreeMap<i32, Vec<Goal>>,
    /// Goals to push at whatever the current top-of-stack priority is.
    pub goals_to_add_in_current_priority: Vec<Goal>,
}

impl ProblemModification {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_effect(mut self, wsm: Wsm) -> Self {
        self.world_state_modification = Some(match self.world_state_modification {
            Some(existing) => existing.and(wsm),
            None => wsm,
        });
        self
    }

    pub fn with_potential_effect(mut self, wsm: Wsm) -> Self {
        self.potential_world_state_modification = Some(match self.potential_world_state_modification {
            Some(existing) => existing.and(wsm),
            None => wsm,
        });
        self
    }

    pub fn with_effect_at_start(mut self, wsm: Wsm) -> Self {
        self.world_state_modification_at_start = Some(match self.world_state_modification_at_start {
            Some(existing) => existing.and(wsm),
            None => wsm,
        });
        self
    }

    pub fn with_goal(mut self, goal: Goal) -> Self {
        self.goals_to_add.entry(goal.priority).or_default().push(goal);
        self
    }

    pub fn with_goal_in_current_priority(mut self, goal: Goal) -> Self {
        self.goals_to_add_in_current_priority.push(goal);
        self
    }

    /// Merges `other` into `self`, combining effects with `And` and
    /// concatenating goal lists (§4.9.4: an action may fire several events
    /// in sequence, whose modifications all accumulate into one bundle).
    pub fn add(mut self, other: ProblemModification) -> Self {
        self.world_state_modification = merge(self.world_state_modification, other.world_state_modification);
        self.potential_world_state_modification =
            merge(self.potential_world_state_modification, other.potential_world_state_modification);
        self.world_state_modification_at_start =
            merge(self.world_state_modification_at_start, other.world_state_modification_at_start);
        for (priority, goals) in other.goals_to_add {
            self.goals_to_add.entry(priority).or_default().extend(goals);
        }
        self.goals_to_add_in_current_priority.extend(other.goals_to_add_in_current_priority);
        self
    }

    /// Applies `world_state_modification_at_start` then
    /// `world_state_modification` to `world_state` under `ground`. The
    /// potential modification is never applied here — it exists purely for
    /// the reachability closure's optimistic reasoning (§4.5).
    pub fn apply_effects(&self, world_state: &mut WorldState, ontology: &Ontology, ground: &GroundBindings) {
        if let Some(wsm) = &self.world_state_modification_at_start {
            wsm.apply_to(world_state, ontology, ground);
        }
        if let Some(wsm) = &self.world_state_modification {
            wsm.apply_to(world_state, ontology, ground);
        }
    }

    /// True if any of this bundle's effects touches `fact`'s predicate,
    /// used by the succession cache to decide whether an action/event is a
    /// candidate for reaching a given precondition (§4.8).
    pub fn has_fact(&self, fact: &Fact) -> bool {
        [
            &self.world_state_modification,
            &self.potential_world_state_modification,
            &self.world_state_modification_at_start,
        ]
        .into_iter()
        .flatten()
        .any(|wsm| wsm.iterate_on_successions().iter().any(|(pred, _)| pred == &fact.predicate_name))
    }

    /// Visits every leaf of every `Wsm` effect in this bundle (including the
    /// potential one), reporting the fact pattern it touches and whether it
    /// sets or removes it. Used by the succession cache to build each
    /// action/event's per-effect-leaf `Successions` rollup (§4.8).
    pub fn for_each_effect_leaf(&self, cb: &mut dyn FnMut(&Fact, EffectKind)) {
        for wsm in [
            &self.world_state_modification,
            &self.potential_world_state_modification,
            &self.world_state_modification_at_start,
        ]
        .into_iter()
        .flatten()
        {
            wsm.for_each_leaf(cb);
        }
    }

    /// All predicates any effect in this bundle can set or remove.
    pub fn affected_predicates(&self) -> std::collections::BTreeSet<(String, EffectKind)> {
        let mut result = std::collections::BTreeSet::new();
        for wsm in [
            &self.world_state_modification,
            &self.potential_world_state_modification,
            &self.world_state_modification_at_start,
        ]
        .into_iter()
        .flatten()
        {
            result.extend(wsm.iterate_on_successions());
        }
        result
    }

    /// Folds `replace_argument` over every binding in `ground`, fully
    /// grounding the goals this bundle pushes (§4.9.4).
    pub fn replace_arguments(&self, ground: &GroundBindings) -> Self {
        let mut result = self.clone();
        for (name, value) in ground {
            result = result.replace_argument(&Parameter::untyped(name.clone()), value);
        }
        result
    }

    /// Replaces `param` with `value` throughout every goal this bundle
    /// pushes, used when grounding a partially-instantiated action's
    /// declared goal effects against the bindings the search chose.
    pub fn replace_argument(&self, param: &Parameter, value: &Entity) -> Self {
        let mut ground = GroundBindings::new();
        ground.insert(param.name.clone(), value.clone());
        let substitute_goal = |goal: &Goal| -> Goal {
            let mut substituted = goal.clone();
            substituted.objective = substitute_condition(&goal.objective, &ground);
            substituted
        };
        ProblemModification {
            world_state_modification: self.world_state_modification.clone(),
            potential_world_state_modification: self.potential_world_state_modification.clone(),
            world_state_modification_at_start: self.world_state_modification_at_start.clone(),
            goals_to_add: self
                .goals_to_add
                .iter()
                .map(|(priority, goals)| (*priority, goals.iter().map(substitute_goal).collect()))
                .collect(),
            goals_to_add_in_current_priority: self
                .goals_to_add_in_current_priority
                .iter()
                .map(substitute_goal)
                .collect(),
        }
    }
}

fn merge(a: Option<Wsm>, b: Option<Wsm>) -> Option<Wsm> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.and(b)),
        (Some(a), None) => Some(a),
        (None, Some(b)) => Some(b),
        (None, None) => None,
    }
}

/// Parameter substitution at the `Condition` level — goals carry a
/// `Condition` objective, not a `Wsm`, so this mirrors `Fact::substitute`
/// one level up.
fn substitute_condition(condition: &crate::condition::Condition, ground: &GroundBindings) -> crate::condition::Condition {
    use crate::condition::Condition;
    use crate::fact::FactOptional;
    use crate::ontology::EntityOrParameter;

    let bindings: std::collections::BTreeMap<Parameter, Entity> = ground
        .iter()
        .map(|(name, entity)| (Parameter::untyped(name.clone()), entity.clone()))
        .collect();
    let substitute_fo = |fo: &FactOptional| -> FactOptional {
        let mut substituted = fo.fact.substitute(&bindings);
        for arg in substituted.args.iter_mut().chain(substituted.fluent.iter_mut()) {
            if let EntityOrParameter::Parameter(p) = arg {
                if let Some(entity) = ground.get(&p.name) {
                    *arg = EntityOrParameter::Entity(entity.clone());
                }
            }
        }
        FactOptional {
            fact: substituted,
            is_negated: fo.is_negated,
        }
    };

    match condition {
        Condition::Fact(fo) => Condition::Fact(substitute_fo(fo)),
        Condition::Number(n) => Condition::Number(*n),
        Condition::And(l, r) => Condition::And(
            Box::new(substitute_condition(l, ground)),
            Box::new(substitute_condition(r, ground)),
        ),
        Condition::Or(l, r) => Condition::Or(
            Box::new(substitute_condition(l, ground)),
            Box::new(substitute_condition(r, ground)),
        ),
        Condition::Not(c) => Condition::Not(Box::new(substitute_condition(c, ground))),
        Condition::Imply(l, r) => Condition::Imply(
            Box::new(substitute_condition(l, ground)),
            Box::new(substitute_condition(r, ground)),
        ),
        Condition::Equals(l, r) => Condition::Equals(
            Box::new(substitute_condition(l, ground)),
            Box::new(substitute_condition(r, ground)),
        ),
        Condition::Different(l, r) => Condition::Different(
            Box::new(substitute_condition(l, ground)),
            Box::new(substitute_condition(r, ground)),
        ),
        Condition::Superior(l, r) => Condition::Superior(
            Box::new(substitute_condition(l, ground)),
            Box::new(substitute_condition(r, ground)),
        ),
        Condition::SuperiorOrEqual(l, r) => Condition::SuperiorOrEqual(
            Box::new(substitute_condition(l, ground)),
            Box::new(substitute_condition(r, ground)),
        ),
        Condition::Inferior(l, r) => Condition::Inferior(
            Box::new(substitute_condition(l, ground)),
            Box::new(substitute_condition(r, ground)),
        ),
        Condition::InferiorOrEqual(l, r) => Condition::InferiorOrEqual(
            Box::new(substitute_condition(l, ground)),
            Box::new(substitute_condition(r, ground)),
        ),
        Condition::Plus(l, r) => Condition::Plus(
            Box::new(substitute_condition(l, ground)),
            Box::new(substitute_condition(r, ground)),
        ),
        Condition::Minus(l, r) => Condition::Minus(
            Box::new(substitute_condition(l, ground)),
            Box::new(substitute_condition(r, ground)),
        ),
        Condition::Exists(p, body) => Condition::Exists(p.clone(), Box::new(substitute_condition(body, ground))),
        Condition::Forall(p, body) => Condition::Forall(p.clone(), Box::new(substitute_condition(body, ground))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::Condition;
    use crate::fact::FactOptional;
    use crate::ontology::EntityOrParameter;

    #[test]
    fn add_merges_effects_and_goals() {
        let fact_a = Fact::new("a", vec![], None);
        let fact_b = Fact::new("b", vec![], None);
        let left = ProblemModification::empty().with_effect(Wsm::set(fact_a.clone()));
        let right = ProblemModification::empty()
            .with_effect(Wsm::set(fact_b.clone()))
            .with_goal(Goal::new(Condition::fact(FactOptional::positive(fact_b.clone()))));
        let merged = left.add(right);
        assert!(merged.has_fact(&fact_a));
        assert!(merged.has_fact(&fact_b));
        assert_eq!(merged.goals_to_add.values().map(Vec::len).sum::<usize>(), 1);
    }

    #[test]
    fn replace_argument_substitutes_goal_objective() {
        let param = Parameter::new("who", Some("agent"));
        let fact = Fact::new(
            "greeted",
            vec![EntityOrParameter::Parameter(param.clone())],
            None,
        );
        let pm = ProblemModification::empty()
            .with_goal(Goal::new(Condition::fact(FactOptional::positive(fact))));
        let bound = pm.replace_argument(&param, &Entity::named("alice", "agent"));
        let goal = &bound.goals_to_add.values().next().unwrap()[0];
        assert_eq!(
            goal.objective.to_string(),
            Condition::fact(FactOptional::positive(Fact::new(
                "greeted",
                vec![EntityOrParameter::Entity(Entity::named("alice", "agent"))],
                None
            )))
            .to_string()
        );
    }
}
