//! The planner core: candidate selection for one goal, the cost model used
//! to pick among equally-applicable candidates, the recursive plan builder,
//! and parallel-action extraction (§4.9).

use std::collections::BTreeMap;
use std::time::Instant;

use crate::action::{Action, ActionId};
use crate::bindings::{GroundBindings, ParameterBindings};
use crate::config::PlannerConfig;
use crate::domain::Domain;
use crate::goal::Goal;
use crate::goal_stack::GoalStack;
use crate::historical::Historical;
use crate::ontology::{Entity, Ontology};
use crate::problem::Problem;
use crate::world_state::WorldState;

use super::cost::PlanCost;
use super::invocation::{ActionChosen, ActionInvocation};

/// The three-way verdict `look_for_a_possible_effect` reaches for one
/// candidate action against one target fact: `Ord` is derived in
/// declaration order, so `Satisfied > SatisfiedButDoesNotModifyTheWorld >
/// NotSatisfied`, exactly the ranking §4.9.1 describes (§4.9.1).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum EffectStatus {
    NotSatisfied,
    SatisfiedButDoesNotModifyTheWorld,
    Satisfied,
}

/// One grounded candidate under consideration, before it has won the
/// ranking (§4.9.1's `PotentialNextAction`).
#[derive(Clone, Debug)]
struct PotentialNextAction {
    action_id: ActionId,
    ground: GroundBindings,
}

/// Finds the next action to advance the most important unsatisfied goal on
/// `problem`'s stack, if any (§4.9.1, §6). Does not mutate `problem`.
pub fn look_for_an_action_to_do(
    problem: &Problem,
    domain: &Domain,
    config: &PlannerConfig,
    now: Option<Instant>,
    global_historical: Option<&Historical>,
) -> Option<ActionChosen> {
    let goal = problem.goal_stack().next_goal(problem.world_state(), domain.ontology())?;
    let priority = goal.priority;
    let candidate = best_candidate_for_goal(
        goal,
        problem.world_state(),
        problem.goal_stack(),
        problem.historical(),
        domain,
        config,
        problem.entities(),
        global_historical,
        now,
        true,
    )?;
    Some(ActionChosen {
        invocation: ActionInvocation::new(candidate.action_id, candidate.ground),
        goal_id: goal.id(),
        priority,
    })
}

/// Shared engine behind `look_for_an_action_to_do` and the cost model's
/// internal lookahead: finds and ranks every applicable, goal-relevant
/// candidate for `goal`, returning the winner (§4.9.1).
#[allow(clippy::too_many_arguments)]
fn best_candidate_for_goal(
    goal: &Goal,
    world_state: &WorldState,
    goal_stack: &GoalStack,
    historical: &Historical,
    domain: &Domain,
    config: &PlannerConfig,
    entities: &BTreeMap<String, Entity>,
    global_historical: Option<&Historical>,
    now: Option<Instant>,
    allow_cost_tiebreak: bool,
) -> Option<PotentialNextAction> {
    let ontology = domain.ontology();
    let target = goal.objective.first_unsatisfied_leaf(world_state, &GroundBindings::new())?;

    let mut best: Option<(PotentialNextAction, EffectStatus)> = None;
    for action in domain.actions() {
        if !action.can_be_used_by_planner {
            continue;
        }
        for ground in candidate_grounds(action, world_state, ontology, entities) {
            if !action.is_applicable(world_state, ontology, &ground) {
                continue;
            }
            let status = effect_status(action, &ground, &target.substitute(&param_map(&ground)), world_state, domain, config, now);
            if status == EffectStatus::NotSatisfied {
                continue;
            }
            let candidate = PotentialNextAction {
                action_id: action.id.clone(),
                ground,
            };
            best = Some(match best.take() {
                None => (candidate, status),
                Some((current, current_status)) => {
                    if prefer(
                        &candidate,
                        status,
                        &current,
                        current_status,
                        world_state,
                        goal_stack,
                        historical,
                        domain,
                        config,
                        global_historical,
                        now,
                        allow_cost_tiebreak,
                    ) {
                        (candidate, status)
                    } else {
                        (current, current_status)
                    }
                }
            });
        }
    }
    best.map(|(candidate, _)| candidate)
}

fn param_map(ground: &GroundBindings) -> std::collections::BTreeMap<crate::ontology::Parameter, Entity> {
    ground
        .iter()
        .map(|(name, entity)| (crate::ontology::Parameter::untyped(name.clone()), entity.clone()))
        .collect()
}

/// Every full grounding of `action.parameters` consistent with its
/// preconditions: parameters the precondition itself binds (via
/// `Condition::is_true`'s free-parameter resolution) are solved from the
/// current facts; any parameter left over is enumerated from the
/// type-compatible entity universe, so an effect-only parameter (one that
/// appears only in the action's effect, never its precondition) can still
/// be discovered by trying each candidate and letting `effect_status`
/// decide whether it actually reaches the target (§4.9.1).
fn candidate_grounds(action: &Action, world_state: &WorldState, ontology: &Ontology, entities: &BTreeMap<String, Entity>) -> Vec<GroundBindings> {
    let mut solved = ParameterBindings::new();
    let applicable = action
        .preconditions
        .is_true(world_state, ontology, &GroundBindings::new(), Some(&mut solved));
    if !applicable {
        return Vec::new();
    }

    for param in &action.parameters {
        if solved.contains_key(&param.name) {
            continue;
        }
        let type_name = param.type_name.clone().unwrap_or_default();
        let mut candidates = world_state.entities_of_type(ontology, &type_name);
        for entity in entities.values() {
            if type_name.is_empty() || ontology.types().is_assignable_from(&type_name, entity.type_name()) {
                candidates.insert(entity.clone());
            }
        }
        if candidates.is_empty() {
            return Vec::new();
        }
        solved.insert(param.name.clone(), candidates);
    }

    const MAX_COMBINATIONS: usize = 64;
    let mut combos: Vec<GroundBindings> = vec![GroundBindings::new()];
    for param in &action.parameters {
        let Some(values) = solved.get(&param.name) else {
            continue;
        };
        let mut next = Vec::new();
        for prefix in &combos {
            for value in values {
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

/// Simulates applying `action` under `ground` (plus one event-fixpoint
/// pass) and reports whether `target` becomes satisfied: `Satisfied` if it
/// does so using the action's guaranteed effect, `SatisfiedButDoesNotModify`
/// if only the `potential_effect` reaches it (an optimistic possibility the
/// real effect does not deliver), otherwise `NotSatisfied` (§4.9.1).
fn effect_status(
    action: &Action,
    ground: &GroundBindings,
    target: &crate::fact::FactOptional,
    world_state: &WorldState,
    domain: &Domain,
    config: &PlannerConfig,
    now: Option<Instant>,
) -> EffectStatus {
    if !action.effect.has_fact(&target.fact) {
        return EffectStatus::NotSatisfied;
    }

    let mut real_only = world_state.clone();
    action.effect.apply_effects(&mut real_only, domain.ontology(), ground);
    run_probe_fixpoint(&mut real_only, domain, config);
    if real_only.is_optional_fact_satisfied(target) {
        return EffectStatus::Satisfied;
    }

    if let Some(potential) = &action.effect.potential_world_state_modification {
        let mut with_potential = real_only;
        potential.apply_to(&mut with_potential, domain.ontology(), ground);
        run_probe_fixpoint(&mut with_potential, domain, config);
        if with_potential.is_optional_fact_satisfied(target) {
            return EffectStatus::SatisfiedButDoesNotModifyTheWorld;
        }
    }
    EffectStatus::NotSatisfied
}

/// A bounded, silent event-fixpoint pass over a throwaway world state clone,
/// used only to let the search see through chained event reactions when
/// probing a candidate action (§4.7, §4.9.1). Goals an event would push are
/// irrelevant to this probe and are not tracked.
fn run_probe_fixpoint(world_state: &mut WorldState, domain: &Domain, config: &PlannerConfig) {
    for _ in 0..config.event_fixpoint_iteration_cap {
        let mut changed = false;
        for event in domain.active_events() {
            let Some(ground) = event.matching_bindings(world_state, domain.ontology()) else {
                continue;
            };
            let before = world_state.clone();
            event.effect.apply_effects(world_state, domain.ontology(), &ground);
            if *world_state != before {
                changed = true;
            }
        }
        if !changed {
            return;
        }
    }
}

/// `true` if `candidate` should replace `current` as the best-ranked action
/// for this goal (§4.9.1).
#[allow(clippy::too_many_arguments)]
fn prefer(
    candidate: &PotentialNextAction,
    candidate_status: EffectStatus,
    current: &PotentialNextAction,
    current_status: EffectStatus,
    world_state: &WorldState,
    goal_stack: &GoalStack,
    historical: &Historical,
    domain: &Domain,
    config: &PlannerConfig,
    global_historical: Option<&Historical>,
    now: Option<Instant>,
    allow_cost_tiebreak: bool,
) -> bool {
    if candidate_status != current_status {
        return candidate_status > current_status;
    }

    if allow_cost_tiebreak && config.try_to_optimise && candidate.action_id != current.action_id {
        let cost_a = evaluate_plan_cost(candidate, world_state, goal_stack, historical, domain, config, global_historical, now);
        let cost_b = evaluate_plan_cost(current, world_state, goal_stack, historical, domain, config, global_historical, now);
        if cost_a != cost_b {
            return cost_a < cost_b;
        }
    }

    is_more_important_than(candidate, current, world_state, domain, historical, global_historical)
}

/// Tie-break among candidates of equal `EffectStatus` and equal simulated
/// `PlanCost` (or when the optimisation pass is disabled): prefer actions
/// flagged important-not-to-repeat that have run less, then those whose
/// `prefer_in_context` hits more of the current world, then fewer
/// historical invocations (locally, then globally), then lexicographic
/// action id (§4.9.1).
fn is_more_important_than(
    candidate: &PotentialNextAction,
    current: &PotentialNextAction,
    world_state: &WorldState,
    domain: &Domain,
    historical: &Historical,
    global_historical: Option<&Historical>,
) -> bool {
    let ontology = domain.ontology();
    let candidate_action = domain.action(&candidate.action_id);
    let current_action = domain.action(&current.action_id);

    if let (Some(a), Some(b)) = (candidate_action, current_action) {
        if a.high_importance_of_not_repeating_it || b.high_importance_of_not_repeating_it {
            let a_count = historical.count(&candidate.action_id);
            let b_count = historical.count(&current.action_id);
            if a_count != b_count {
                return a_count < b_count;
            }
        }

        let a_hits = prefer_in_context_hits(a, world_state, ontology, &candidate.ground);
        let b_hits = prefer_in_context_hits(b, world_state, ontology, &current.ground);
        if a_hits != b_hits {
            return a_hits > b_hits;
        }
    }

    let a_local = historical.count(&candidate.action_id);
    let b_local = historical.count(&current.action_id);
    if a_local != b_local {
        return a_local < b_local;
    }

    if let Some(global) = global_historical {
        let a_global = global.count(&candidate.action_id);
        let b_global = global.count(&current.action_id);
        if a_global != b_global {
            return a_global < b_global;
        }
    }

    candidate.action_id < current.action_id
}

/// 1 if `action.prefer_in_context` holds under `ground`, else 0 — a boolean
/// "soft preference hit count" per §4.9.1 (an action either has no such
/// condition, in which case it never contributes, or it does and either
/// matches the current world or doesn't).
fn prefer_in_context_hits(action: &Action, world_state: &WorldState, ontology: &Ontology, ground: &GroundBindings) -> u32 {
    match &action.prefer_in_context {
        Some(condition) if condition.is_true(world_state, ontology, ground, None) => 1,
        _ => 0,
    }
}

/// Simulates choosing `candidate` for `goal` and then letting the
/// (non-optimising) search run to its natural end, reporting the resulting
/// `PlanCost` (§4.9.2).
#[allow(clippy::too_many_arguments)]
fn evaluate_plan_cost(
    candidate: &PotentialNextAction,
    world_state: &WorldState,
    goal_stack: &GoalStack,
    historical: &Historical,
    domain: &Domain,
    config: &PlannerConfig,
    global_historical: Option<&Historical>,
    now: Option<Instant>,
) -> PlanCost {
    let mut sim_world = world_state.clone();
    let mut sim_goals = goal_stack.clone();
    let mut sim_historical = historical.clone();

    apply_action_to_sim(&mut sim_world, &mut sim_goals, domain, &candidate.action_id, &candidate.ground, config, now);
    sim_historical.notify_action_done(&candidate.action_id);

    let tracked_goal_ids: std::collections::BTreeSet<_> = sim_goals.goals_at_current_priority().into_iter().map(Goal::id).collect();

    let mut nb_actions = 1u32;
    let mut repeats: BTreeMap<ActionId, u32> = BTreeMap::new();
    repeats.insert(candidate.action_id.clone(), 1);

    for _ in 0..config.max_action_repeats {
        let Some(goal) = sim_goals.next_goal(&sim_world, domain.ontology()).cloned() else {
            break;
        };
        let Some(next) = best_candidate_for_goal(
            &goal,
            &sim_world,
            &sim_goals,
            &sim_historical,
            domain,
            config,
            &BTreeMap::new(),
            global_historical,
            now,
            false,
        ) else {
            break;
        };
        let repeat_limit = domain
            .action(&next.action_id)
            .map(|a| if a.high_importance_of_not_repeating_it { 1 } else { config.max_same_action_repeats_in_branch })
            .unwrap_or(config.max_same_action_repeats_in_branch);
        let count = repeats.entry(next.action_id.clone()).or_insert(0);
        *count += 1;
        if *count > repeat_limit {
            break;
        }
        apply_action_to_sim(&mut sim_world, &mut sim_goals, domain, &next.action_id, &next.ground, config, now);
        sim_historical.notify_action_done(&next.action_id);
        nb_actions += 1;
    }

    let mut nb_goals_satisfied = 0u32;
    let mut nb_goals_not_satisfied = 0u32;
    for goal_id in &tracked_goal_ids {
        let still_present = sim_goals
            .goals_at_current_priority()
            .into_iter()
            .any(|g| &g.id() == goal_id && !g.is_satisfied(&sim_world, domain.ontology()));
        if still_present {
            nb_goals_not_satisfied += 1;
        } else {
            nb_goals_satisfied += 1;
        }
    }

    PlanCost {
        success: true,
        nb_goals_satisfied,
        nb_goals_not_satisfied,
        nb_actions,
    }
}

fn apply_action_to_sim(
    world_state: &mut WorldState,
    goal_stack: &mut GoalStack,
    domain: &Domain,
    action_id: &str,
    ground: &GroundBindings,
    config: &PlannerConfig,
    now: Option<Instant>,
) {
    let Some(action) = domain.action(action_id).cloned() else {
        return;
    };
    action.effect.apply_effects(world_state, domain.ontology(), ground);
    let grounded = action.effect_grounded(ground);
    for goals in grounded.goals_to_add.values() {
        for goal in goals {
            goal_stack.push(goal.clone(), now);
        }
    }
    for goal in &grounded.goals_to_add_in_current_priority {
        goal_stack.push_in_current_priority(goal.clone(), now);
    }
    run_probe_fixpoint(world_state, domain, config);
    let mut tracker = crate::observer::GoalsRemovedTracker::new();
    goal_stack.refresh(world_state, domain.ontology(), now, &mut tracker);
}

/// Builds a full sequential plan by repeatedly picking the best action for
/// whatever the most important unsatisfied goal is, applying it to an
/// internal simulated fork of `problem` (never mutating `problem` itself),
/// until the goal stack empties, no candidate remains, or
/// `PlannerConfig::max_action_repeats` actions have accumulated (§4.9.3,
/// §6).
pub fn plan_for_more_important_goal_possible(
    problem: &Problem,
    domain: &Domain,
    config: &PlannerConfig,
    try_optimise: bool,
    now: Option<Instant>,
    global_historical: Option<&Historical>,
) -> Vec<ActionInvocation> {
    let mut sim = problem.fork_for_simulation();
    let mut plan = Vec::new();
    let mut repeats: BTreeMap<ActionId, u32> = BTreeMap::new();

    for _ in 0..config.max_action_repeats {
        let Some(goal) = sim.goal_stack().next_goal(sim.world_state(), domain.ontology()).cloned() else {
            break;
        };
        let Some(next) = best_candidate_for_goal(
            &goal,
            sim.world_state(),
            sim.goal_stack(),
            sim.historical(),
            domain,
            config,
            problem.entities(),
            global_historical,
            now,
            try_optimise,
        ) else {
            break;
        };

        let repeat_limit = domain
            .action(&next.action_id)
            .map(|a| if a.high_importance_of_not_repeating_it { 1 } else { config.max_same_action_repeats_in_branch })
            .unwrap_or(config.max_same_action_repeats_in_branch);
        let count = repeats.entry(next.action_id.clone()).or_insert(0);
        *count += 1;
        if *count > repeat_limit {
            break;
        }

        sim.apply_action(domain, &next.action_id, &next.ground, config, now);
        plan.push(ActionInvocation::new(next.action_id, next.ground));
    }
    plan
}

/// Repeatedly extends the plan with `plan_for_more_important_goal_possible`
/// until it stops returning new actions, capped at
/// `PlannerConfig::max_action_repeats` total actions (§4.9.3, §6). Unlike
/// `plan_for_more_important_goal_possible` (which plans for a single most-
/// important goal and stops), this drains every priority on the stack.
pub fn plan_for_every_goals(problem: &Problem, domain: &Domain, config: &PlannerConfig, now: Option<Instant>, global_historical: Option<&Historical>) -> Vec<ActionInvocation> {
    let mut sim = problem.fork_for_simulation();
    let mut plan = Vec::new();
    let mut repeats: BTreeMap<ActionId, u32> = BTreeMap::new();

    while plan.len() < config.max_action_repeats as usize {
        if sim.goal_stack().is_empty() {
            break;
        }
        let Some(goal) = sim.goal_stack().next_goal(sim.world_state(), domain.ontology()).cloned() else {
            // Current priority is fully satisfied but lower ones may not be;
            // `next_goal` only looks at the current priority, so there is
            // nothing further this loop can do without a world-state change
            // lowering the current priority's membership. Stop here.
            break;
        };
        let Some(next) = best_candidate_for_goal(
            &goal,
            sim.world_state(),
            sim.goal_stack(),
            sim.historical(),
            domain,
            config,
            problem.entities(),
            global_historical,
            now,
            config.try_to_optimise,
        ) else {
            break;
        };

        let repeat_limit = domain
            .action(&next.action_id)
            .map(|a| if a.high_importance_of_not_repeating_it { 1 } else { config.max_same_action_repeats_in_branch })
            .unwrap_or(config.max_same_action_repeats_in_branch);
        let count = repeats.entry(next.action_id.clone()).or_insert(0);
        *count += 1;
        if *count > repeat_limit {
            break;
        }

        sim.apply_action(domain, &next.action_id, &next.ground, config, now);
        plan.push(ActionInvocation::new(next.action_id, next.ground));
    }
    plan
}

/// Extracts a maximal prefix of `plan_for_more_important_goal_possible`'s
/// sequential plan whose actions are pairwise independent — no action's
/// effect overlaps another's precondition or effect — so a caller may
/// dispatch them to concurrent executors in one tick (§4.9.5).
pub fn actions_to_do_in_parallel_now(problem: &Problem, domain: &Domain, config: &PlannerConfig, now: Option<Instant>) -> Vec<ActionInvocation> {
    let sequential = plan_for_more_important_goal_possible(problem, domain, config, config.try_to_optimise, now, None);
    let mut parallel: Vec<ActionInvocation> = Vec::new();
    let mut touched: Vec<crate::problem_modification::ProblemModification> = Vec::new();

    'next_action: for invocation in sequential {
        let Some(action) = domain.action(&invocation.action_id) else {
            continue;
        };
        let grounded_effect = action.effect_grounded(&invocation.parameters);
        for already in &touched {
            if independence_conflict(&grounded_effect, already) {
                break 'next_action;
            }
        }
        touched.push(grounded_effect);
        parallel.push(invocation);
    }
    parallel
}

/// Two action effects conflict if either touches a predicate the other's
/// precondition-relevant facts also touch (§4.9.5). Since `ProblemModification`
/// does not carry the originating action's precondition, independence here
/// is checked effect-to-effect: two actions are independent only if neither
/// sets or unsets a predicate the other also sets or unsets.
fn independence_conflict(a: &crate::problem_modification::ProblemModification, b: &crate::problem_modification::ProblemModification) -> bool {
    for (predicate, _) in a.affected_predicates() {
        let probe = crate::fact::Fact::new(predicate, Vec::new(), None);
        if b.has_fact(&probe) {
            return true;
        }
    }
    false
}

/// Applies `invocation.action_id`'s `effect_at_start` immediately, without
/// waiting for the action to be reported done (§4.9.4, §6).
pub fn notify_action_started(problem: &mut Problem, domain: &Domain, invocation: &ActionInvocation) {
    let _ = domain;
    problem.notify_action_started(&invocation.action_id, &invocation.parameters);
}

/// Applies `invocation`'s full effect, pushes whatever goals it declares,
/// runs the event fixpoint, and records it in `problem`'s `Historical`
/// (§4.9.4, §6).
pub fn notify_action_done(problem: &mut Problem, domain: &Domain, config: &PlannerConfig, invocation: &ActionInvocation, now: Option<Instant>) -> crate::error::Result<()> {
    let _ = domain;
    problem.notify_action_done(&invocation.action_id, &invocation.parameters, config, now)
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::condition::Condition;
    use crate::domain::Domain;
    use crate::event::{Event, EventSet};
    use crate::fact::{Fact, FactOptional};
    use crate::goal::Goal;
    use crate::ontology::{Entity, EntityOrParameter, Ontology, Parameter, Predicate, Type};
    use crate::problem::Problem;
    use crate::problem_modification::ProblemModification;
    use crate::wsm::Wsm;

    fn fact0(name: &str) -> Fact {
        Fact::new(name, vec![], None)
    }

    /// Scenario 1 (§8): a single action closes the only goal.
    #[test]
    fn scenario_1_simplest_plan() {
        let mut ontology = Ontology::new();
        ontology.declare_type(Type::root("type1")).unwrap();
        ontology.declare_constant("toto", "type1").unwrap();

        let p = Parameter::new("p", Some("type1"));
        let pred_a = Fact::new("pred_a", vec![EntityOrParameter::Parameter(p.clone())], None);
        let pred_b = fact0("pred_b");

        let mut domain = Domain::new(ontology);
        domain
            .add_action(
                Action::new("action1", ProblemModification::empty().with_effect(Wsm::set(pred_b.clone())))
                    .with_parameter(p.clone())
                    .with_preconditions(Condition::fact(FactOptional::positive(pred_a.clone()))),
            )
            .unwrap();

        let mut problem = Problem::new(Rc::new(domain));
        problem.add_fact(Fact::new("pred_a", vec![EntityOrParameter::Entity(Entity::named("toto", "type1"))], None));
        problem.push_goal(Goal::new(Condition::fact(FactOptional::positive(pred_b))), None);

        let config = PlannerConfig::default();
        let chosen = look_for_an_action_to_do(&problem, problem.domain(), &config, None, None).expect("an action is found");
        assert_eq!(chosen.invocation.action_id, "action1");
        assert_eq!(chosen.invocation.parameters.get("p"), Some(&Entity::named("toto", "type1")));
    }

    fn number_fact(name: &str) -> Fact {
        Fact::new(name, vec![], Some(EntityOrParameter::Entity(Entity::any_value())))
    }

    fn with_number(mut fact: Fact, value: i64) -> Fact {
        fact.fluent = Some(EntityOrParameter::Entity(Entity::number(value)));
        fact
    }

    /// Scenario 2 (§8): fluent arithmetic with an event closing the gap
    /// between "asked enough questions" and "finished asking questions".
    #[test]
    fn scenario_2_fluent_arithmetic_with_inference() {
        let mut ontology = Ontology::new();
        ontology.declare_predicate(Predicate::new("numberOfQuestion", vec![]).with_fluent("number")).unwrap();
        ontology.declare_predicate(Predicate::new("maxNumberOfQuestions", vec![]).with_fluent("number")).unwrap();

        let mut domain = Domain::new(ontology);
        let ask_all = fact0("ask_all_the_questions");
        let finished = fact0("finished_to_ask_questions");

        for (i, id) in ["ask_1", "ask_2", "ask_3"].into_iter().enumerate() {
            domain
                .add_action(
                    Action::new(
                        id,
                        ProblemModification::empty()
                            .with_effect(Wsm::Increase(number_fact("numberOfQuestion"), Box::new(Condition::Number(1))))
                            .with_potential_effect(Wsm::set(ask_all.clone())),
                    )
                    .important_not_to_repeat(),
                )
                .unwrap();
            let _ = i;
        }

        domain
            .add_action(
                Action::new("finish", ProblemModification::empty().with_effect(Wsm::set(finished.clone())))
                    .with_preconditions(Condition::fact(FactOptional::positive(ask_all.clone()))),
            )
            .unwrap();

        let mut events = EventSet::new("bookkeeping");
        events = events.with_event(Event::new(
            "all_asked",
            Condition::Equals(
                Box::new(Condition::fact(FactOptional::positive(number_fact("numberOfQuestion")))),
                Box::new(Condition::fact(FactOptional::positive(number_fact("maxNumberOfQuestions")))),
            ),
            ProblemModification::empty().with_effect(Wsm::set(ask_all.clone())),
        ));
        domain.add_event_set(events).unwrap();

        let mut problem = Problem::new(Rc::new(domain));
        problem.add_fact(with_number(number_fact("numberOfQuestion"), 0));
        problem.add_fact(with_number(number_fact("maxNumberOfQuestions"), 3));
        problem.push_goal(Goal::new(Condition::fact(FactOptional::positive(finished))), None);

        let config = PlannerConfig::default();
        let plan = plan_for_every_goals(&problem, problem.domain(), &config, None, None);
        assert_eq!(plan.len(), 4, "plan was: {}", crate::planner::plan_to_str(&plan, ", "));
        assert_eq!(plan.last().unwrap().action_id, "finish");
        let asks: Vec<_> = plan[..3].iter().map(|a| a.action_id.as_str()).collect();
        assert_eq!(asks, vec!["ask_1", "ask_2", "ask_3"]);
    }

    /// Scenario 3 (§8): cost-based optimisation prefers freeing the held
    /// object (needed by the lower-effort goal) before chasing the other
    /// goal across rooms.
    #[test]
    fn scenario_3_cost_based_optimisation_prefers_ungrab() {
        let mut ontology = Ontology::new();
        ontology.declare_type(Type::root("object")).unwrap();
        ontology.declare_constant("obj1", "object").unwrap();
        ontology.declare_constant("obj2", "object").unwrap();

        let object_param = Parameter::new("object", Some("object"));
        let held = Fact::new("held", vec![EntityOrParameter::Parameter(object_param.clone())], None);
        let in_living_room = Fact::new("in_living_room", vec![EntityOrParameter::Parameter(object_param.clone())], None);
        let in_bedroom = Fact::new("in_bedroom", vec![EntityOrParameter::Parameter(object_param.clone())], None);

        let mut domain = Domain::new(ontology);
        domain
            .add_action(
                Action::new(
                    "ungrab",
                    ProblemModification::empty()
                        .with_effect(Wsm::unset(held.clone()).and(Wsm::set(in_living_room.clone()))),
                )
                .with_parameter(object_param.clone())
                .with_preconditions(Condition::fact(FactOptional::positive(held.clone()))),
            )
            .unwrap();
        domain
            .add_action(
                Action::new(
                    "carry_to_bedroom",
                    ProblemModification::empty().with_effect(Wsm::set(in_bedroom.clone())),
                )
                .with_parameter(object_param.clone()),
            )
            .unwrap();

        let mut problem = Problem::new(Rc::new(domain));
        problem.add_fact(Fact::new("held", vec![EntityOrParameter::Entity(Entity::named("obj2", "object"))], None));

        problem.push_goal(
            Goal::new(Condition::fact(FactOptional::positive(Fact::new(
                "in_bedroom",
                vec![EntityOrParameter::Entity(Entity::named("obj1", "object"))],
                None,
            ))))
            .with_priority(10),
            None,
        );
        problem.push_goal(
            Goal::new(
                Condition::fact(FactOptional::positive(Fact::new(
                    "in_living_room",
                    vec![EntityOrParameter::Entity(Entity::named("obj2", "object"))],
                    None,
                )))
                .and(Condition::fact(FactOptional::negative(Fact::new(
                    "held",
                    vec![EntityOrParameter::Entity(Entity::named("obj2", "object"))],
                    None,
                )))),
            )
            .with_priority(10),
            None,
        );

        let config = PlannerConfig::default();
        let chosen = look_for_an_action_to_do(&problem, problem.domain(), &config, None, None).expect("an action is found");
        assert_eq!(chosen.invocation.action_id, "ungrab");
        assert_eq!(chosen.invocation.parameters.get("object"), Some(&Entity::named("obj2", "object")));
    }

    /// Scenario 4 (§8): the planner infers a parameter (`?e`) purely from
    /// an action's effect reading a fluent, then an event closes the goal.
    #[test]
    fn scenario_4_parameterised_inference() {
        let mut ontology = Ontology::new();
        ontology.declare_type(Type::root("entity")).unwrap();
        ontology.declare_type(Type::root("other_type")).unwrap();
        ontology.declare_constant("toto", "entity").unwrap();
        ontology.declare_predicate(Predicate::new("pred_a", vec![]).with_fluent("other_type")).unwrap();
        ontology
            .declare_predicate(Predicate::new("pred_b", vec!["entity".to_string()]).with_fluent("other_type"))
            .unwrap();
        ontology.declare_predicate(Predicate::new("pred_d", vec![]).with_fluent("other_type")).unwrap();

        let e = Parameter::new("e", Some("entity"));
        let pred_b_e = Fact::new(
            "pred_b",
            vec![EntityOrParameter::Parameter(e.clone())],
            Some(EntityOrParameter::Entity(Entity::any_value())),
        );
        let pred_d = Fact::new("pred_d", vec![], Some(EntityOrParameter::Entity(Entity::any_value())));

        let mut domain = Domain::new(ontology);
        domain
            .add_action(
                Action::new(
                    "action1",
                    ProblemModification::empty().with_effect(Wsm::Assign(
                        Fact::new("pred_a", vec![], None),
                        Box::new(Condition::fact(FactOptional::positive(pred_b_e.clone()))),
                    )),
                )
                .with_parameter(e.clone()),
            )
            .unwrap();

        // Event: whenever `pred_a` carries some value `?t`, propagate it onto
        // `pred_d` — `?t` is a hole `Condition::is_true` fills from the fact
        // currently in the world, not a declared action parameter.
        let t = Parameter::untyped("t");
        let pred_a_bound_to_t = Fact::new("pred_a", vec![], Some(EntityOrParameter::Parameter(t.clone())));
        let events = EventSet::new("propagation").with_event(Event::new(
            "propagate",
            Condition::fact(FactOptional::positive(pred_a_bound_to_t.clone())),
            ProblemModification::empty().with_effect(Wsm::Assign(
                Fact::new("pred_d", vec![], None),
                Box::new(Condition::fact(FactOptional::positive(pred_a_bound_to_t))),
            )),
        ));
        domain.add_event_set(events).unwrap();

        let mut problem = Problem::new(Rc::new(domain));
        problem.add_fact(Fact::new(
            "pred_b",
            vec![EntityOrParameter::Entity(Entity::named("toto", "entity"))],
            Some(EntityOrParameter::Entity(Entity::named("v", "other_type"))),
        ));
        problem.push_goal(
            Goal::new(Condition::fact(FactOptional::positive(with_fluent_value(pred_d, "v")))),
            None,
        );

        let config = PlannerConfig::default();
        let chosen = look_for_an_action_to_do(&problem, problem.domain(), &config, None, None).expect("an action is found");
        assert_eq!(chosen.invocation.action_id, "action1");
        assert_eq!(chosen.invocation.parameters.get("e"), Some(&Entity::named("toto", "entity")));
    }

    fn with_fluent_value(mut fact: Fact, value_name: &str) -> Fact {
        fact.fluent = Some(EntityOrParameter::Entity(Entity::named(value_name, "other_type")));
        fact
    }

    #[test]
    fn look_for_an_action_to_do_returns_none_on_empty_goal_stack() {
        let domain = Domain::new(Ontology::new());
        let problem = Problem::new(Rc::new(domain));
        let config = PlannerConfig::default();
        assert!(look_for_an_action_to_do(&problem, problem.domain(), &config, None, None).is_none());
    }

    #[test]
    fn actions_to_do_in_parallel_now_stops_at_first_conflict() {
        let mut domain = Domain::new(Ontology::new());
        let a = fact0("a_done");
        let b = fact0("b_done");
        domain.add_action(Action::new("do_a", ProblemModification::empty().with_effect(Wsm::set(a.clone())))).unwrap();
        domain
            .add_action(
                Action::new("do_b", ProblemModification::empty().with_effect(Wsm::set(b.clone())))
                    .with_preconditions(Condition::fact(FactOptional::positive(a.clone()))),
            )
            .unwrap();

        let mut problem = Problem::new(Rc::new(domain));
        problem.push_goal(Goal::new(Condition::fact(FactOptional::positive(a)).and(Condition::fact(FactOptional::positive(b)))).with_priority(0), None);

        let config = PlannerConfig::default();
        let parallel = actions_to_do_in_parallel_now(&problem, problem.domain(), &config, None);
        // `do_b` depends on `do_a`'s effect, so only `do_a` may run this tick.
        assert_eq!(parallel.len(), 1);
        assert_eq!(parallel[0].action_id, "do_a");
    }
}
