//! Reachable-facts closure: a monotone fixpoint over which facts could ever
//! become true starting from the current world state, ignoring whether any
//! particular action is actually chosen (§4.5). Used to detect goals that
//! can never be satisfied in this domain and to prune doomed search
//! branches before they're even tried.

use std::collections::BTreeSet;

use crate::bindings::GroundBindings;
use crate::config::PlannerConfig;
use crate::domain::Domain;
use crate::error::{PlannerError, Result};
use crate::fact::Fact;
use crate::ontology::{Entity, EntityOrParameter, Ontology};
use crate::world_state::WorldState;

/// Every fact this domain could ever make true from `world_state`, including
/// the facts already true (§4.5). Grows monotonically from the precondition
/// relaxation `Condition::can_become_true`, so it always converges on a
/// finite ontology; exceeding `config.reachability_iteration_cap` without
/// converging is reported as `PlannerError::EventDivergence`, the same error
/// the event fixpoint raises for the same reason (a cap hit means the domain
/// itself is malformed, not that the search failed).
pub fn reachable_facts(world_state: &WorldState, domain: &Domain, config: &PlannerConfig) -> Result<BTreeSet<Fact>> {
    let mut reached = world_state.clone();
    let mut known: BTreeSet<Fact> = reached.facts().cloned().collect();

    for _ in 0..config.reachability_iteration_cap {
        let mut changed = false;

        for action in domain.actions() {
            for ground in parameter_universe(&action.parameters, &reached, domain.ontology()) {
                if !action.preconditions.can_become_true(&reached, domain.ontology(), &ground) {
                    continue;
                }
                changed |= apply_optimistically(&action.effect, &mut reached, domain.ontology(), &ground, &mut known);
            }
        }

        for event in domain.active_events() {
            for ground in parameter_universe(&event.parameters, &reached, domain.ontology()) {
                if !event.condition.can_become_true(&reached, domain.ontology(), &ground) {
                    continue;
                }
                changed |= apply_optimistically(&event.effect, &mut reached, domain.ontology(), &ground, &mut known);
            }
        }

        if !changed {
            return Ok(known);
        }
    }
    Err(PlannerError::EventDivergence {
        iterations: config.reachability_iteration_cap,
    })
}

/// The same closure, but with every fluent slot relaxed to the wildcard
/// `Entity::any_value()` — useful for asking "could this predicate/argument
/// combination ever hold, whatever the fluent", without caring which value
/// (§4.5).
pub fn reachable_facts_with_any_value(world_state: &WorldState, domain: &Domain, config: &PlannerConfig) -> Result<BTreeSet<Fact>> {
    let concrete = reachable_facts(world_state, domain, config)?;
    Ok(concrete
        .into_iter()
        .map(|mut fact| {
            if fact.fluent.is_some() {
                fact.fluent = Some(EntityOrParameter::Entity(Entity::any_value()));
            }
            fact
        })
        .collect())
}

/// Applies `effect`'s guaranteed and potential modifications to `reached`
/// under `ground`, recording every newly-seen fact in `known`. Returns
/// whether anything was added.
fn apply_optimistically(
    effect: &crate::problem_modification::ProblemModification,
    reached: &mut WorldState,
    ontology: &Ontology,
    ground: &GroundBindings,
    known: &mut BTreeSet<Fact>,
) -> bool {
    let mut changed = false;
    for wsm in [&effect.world_state_modification, &effect.potential_world_state_modification, &effect.world_state_modification_at_start]
        .into_iter()
        .flatten()
    {
        wsm.for_each_leaf(&mut |fact, kind| {
            if kind == crate::wsm::EffectKind::Removes {
                return;
            }
            let substituted = substitute(fact, ground);
            if substituted.is_ground() && known.insert(substituted.clone()) {
                reached.add_fact(substituted);
                changed = true;
            }
        });
    }
    changed
}

fn substitute(fact: &Fact, ground: &GroundBindings) -> Fact {
    let bindings = ground
        .iter()
        .map(|(name, entity)| (crate::ontology::Parameter::untyped(name.clone()), entity.clone()))
        .collect();
    fact.substitute(&bindings)
}

/// Every ground binding for `params`, enumerated from the type-compatible
/// entity universe currently known to `reached`, capped the same way the
/// planner's own candidate enumeration is (§4.9.1's `MAX_COMBINATIONS`
/// bound, reused here for the same reason: a brute-force cartesian product
/// over a handful of problem entities, not a general unification engine).
fn parameter_universe(params: &[crate::ontology::Parameter], reached: &WorldState, ontology: &Ontology) -> Vec<GroundBindings> {
    const MAX_COMBINATIONS: usize = 64;
    let mut combos: Vec<GroundBindings> = vec![GroundBindings::new()];
    for param in params {
        let type_name = param.type_name.clone().unwrap_or_default();
        let candidates = reached.entities_of_type(ontology, &type_name);
        if candidates.is_empty() {
            return Vec::new();
        }
        let mut next = Vec::new();
        for prefix in &combos {
            for value in &candidates {
                let mut extended = prefix.clone();
                extended.insert(param.name.clone(), value.clone());
                next.push(extended);
                if next.len() >= MAX_COMBINATIONS {
                    break;
                }
            }
            if next.len() >= MAX_COMBINATIONS {
                break;
            }
        }
        combos = next;
    }
    combos
}
