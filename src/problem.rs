//! A problem: a domain paired with the mutable state the planner works
//! against — the current world, the goal stack, and execution history
//! (§3, §6).

use std::collections::BTreeMap;
use std::rc::Rc;
use std::time::Instant;

use tracing::instrument;

use crate::bindings::GroundBindings;
use crate::config::PlannerConfig;
use crate::domain::Domain;
use crate::error::Result;
use crate::fact::Fact;
use crate::goal::Goal;
use crate::goal_stack::GoalStack;
use crate::historical::Historical;
use crate::observer::{GoalsRemovedTracker, Observers};
use crate::ontology::Entity;
use crate::world_state::WorldState;

/// The full state a plan is computed against: a `Domain` (shared,
/// immutable, cheaply cloned via `Rc`), the current facts, the goal stack,
/// how many times each action has already run, and problem-scoped entity
/// declarations (§3, §6).
pub struct Problem {
    domain: Rc<Domain>,
    world_state: WorldState,
    goal_stack: GoalStack,
    historical: Historical,
    entities: BTreeMap<String, Entity>,
    goals_removed_tracker: GoalsRemovedTracker,
    observers: Observers,
}

impl Problem {
    pub fn new(domain: Rc<Domain>) -> Self {
        Self {
            domain,
            world_state: WorldState::new(),
            goal_stack: GoalStack::new(),
            historical: Historical::new(),
            entities: BTreeMap::new(),
            goals_removed_tracker: GoalsRemovedTracker::new(),
            observers: Observers::new(),
        }
    }

    pub fn domain(&self) -> &Domain {
        &self.domain
    }

    pub fn world_state(&self) -> &WorldState {
        &self.world_state
    }

    pub fn goal_stack(&self) -> &GoalStack {
        &self.goal_stack
    }

    pub fn historical(&self) -> &Historical {
        &self.historical
    }

    pub fn observers_mut(&mut self) -> &mut Observers {
        &mut self.observers
    }

    pub fn goals_removed_tracker_mut(&mut self) -> &mut GoalsRemovedTracker {
        &mut self.goals_removed_tracker
    }

    pub fn declare_entity(&mut self, name: impl Into<String>, type_name: impl Into<String>) {
        let name = name.into();
        let entity = Entity::named(name.clone(), type_name);
        self.entities.insert(name, entity);
    }

    pub fn entities(&self) -> &BTreeMap<String, Entity> {
        &self.entities
    }

    /// Adds a ground fact to the world state and notifies observers.
    pub fn add_fact(&mut self, fact: Fact) {
        if self.world_state.add_fact(fact) {
            self.observers.notify_world_state_changed(&self.world_state);
        }
    }

    pub fn remove_fact(&mut self, fact: &Fact) {
        if self.world_state.remove_fact(fact) {
            self.observers.notify_world_state_changed(&self.world_state);
        }
    }

    pub fn push_goal(&mut self, goal: Goal, now: Option<Instant>) {
        self.goal_stack.push(goal, now);
        self.observers.notify_goals_changed(&self.goal_stack.goals_at_current_priority().into_iter().cloned().collect::<Vec<_>>());
    }

    /// Replaces the whole goal stack, keyed by the priority each group is
    /// pushed at (§4.6, §6).
    pub fn set_goals(&mut self, goals: BTreeMap<i32, Vec<Goal>>, now: Option<Instant>) {
        self.goal_stack.set_goals(goals, now);
        self.observers.notify_goals_changed(&self.goal_stack.goals_at_current_priority().into_iter().cloned().collect::<Vec<_>>());
    }

    /// Replaces every goal at `priority`, leaving every other priority
    /// untouched (§4.6, §6).
    pub fn set_goals_for_a_priority(&mut self, priority: i32, goals: Vec<Goal>, now: Option<Instant>) {
        self.goal_stack.set_goals_for_a_priority(priority, goals, now);
        self.observers.notify_goals_changed(&self.goal_stack.goals_at_current_priority().into_iter().cloned().collect::<Vec<_>>());
    }

    /// Pushes every goal in `goals`, each at its own declared priority
    /// (§4.6, §6).
    pub fn add_goals(&mut self, goals: Vec<Goal>, now: Option<Instant>) {
        self.goal_stack.add_goals(goals, now);
        self.observers.notify_goals_changed(&self.goal_stack.goals_at_current_priority().into_iter().cloned().collect::<Vec<_>>());
    }

    /// Reconciles the goal stack against the current world state (§4.6).
    pub fn refresh_goals(&mut self, now: Option<Instant>) {
        let changed = self.goal_stack.refresh(
            &self.world_state,
            self.domain.ontology(),
            now,
            &mut self.goals_removed_tracker,
        );
        if changed {
            self.observers
                .notify_goals_changed(&self.goal_stack.goals_at_current_priority().into_iter().cloned().collect::<Vec<_>>());
        }
    }

    /// Repeatedly fires every active event whose condition holds until the
    /// world state and goal stack stop changing, or
    /// `config.event_fixpoint_iteration_cap` iterations pass without
    /// converging (§4.7). Goals an event pushes land at their declared
    /// priority, exactly like an action's.
    #[instrument(level = "debug", skip(self, config))]
    pub fn apply_event_fixpoint(&mut self, config: &PlannerConfig, now: Option<Instant>) -> Result<()> {
        use crate::error::PlannerError;

        if run_event_fixpoint(&mut self.world_state, &mut self.goal_stack, &self.domain, config, now) {
            self.refresh_goals(now);
            return Ok(());
        }
        Err(PlannerError::EventDivergence {
            iterations: config.event_fixpoint_iteration_cap,
        })
    }

    /// Applies an action's effect (as returned by a planner search step):
    /// the world state modifications, then the goals it pushes, then an
    /// event fixpoint pass, then records the action in `historical` (§4.9.4).
    pub fn notify_action_done(&mut self, action_id: &str, ground: &GroundBindings, config: &PlannerConfig, now: Option<Instant>) -> Result<()> {
        let Some(action) = self.domain.action(action_id).cloned() else {
            return Ok(());
        };
        action.effect.apply_effects(&mut self.world_state, self.domain.ontology(), ground);
        let grounded = action.effect_grounded(ground);
        for goals in grounded.goals_to_add.values() {
            for goal in goals {
                self.goal_stack.push(goal.clone(), now);
            }
        }
        for goal in &grounded.goals_to_add_in_current_priority {
            self.goal_stack.push_in_current_priority(goal.clone(), now);
        }
        self.historical.notify_action_done(action_id);
        self.observers.notify_world_state_changed(&self.world_state);
        self.apply_event_fixpoint(config, now)
    }

    /// Applies only `world_state_modification_at_start`, the portion of an
    /// action's effect that happens the instant it begins rather than when
    /// it is reported done (§4.9.4, §5). No event fixpoint runs here — that
    /// happens once the action actually completes, via `notify_action_done`.
    pub fn notify_action_started(&mut self, action_id: &str, ground: &GroundBindings) {
        let Some(action) = self.domain.action(action_id) else {
            return;
        };
        if let Some(wsm) = &action.effect.world_state_modification_at_start {
            wsm.apply_to(&mut self.world_state, self.domain.ontology(), ground);
            self.observers.notify_world_state_changed(&self.world_state);
        }
    }

    /// A detached copy of the planning-relevant state, used by the
    /// optimiser to simulate candidate continuations without touching this
    /// `Problem` or firing its observers (§4.9.2).
    pub fn fork_for_simulation(&self) -> SimulatedProblem {
        SimulatedProblem {
            world_state: self.world_state.clone(),
            goal_stack: self.goal_stack.clone(),
            historical: self.historical.clone(),
        }
    }
}

/// See `Problem::fork_for_simulation`.
#[derive(Clone)]
pub struct SimulatedProblem {
    world_state: WorldState,
    goal_stack: GoalStack,
    historical: Historical,
}

impl SimulatedProblem {
    pub fn world_state(&self) -> &WorldState {
        &self.world_state
    }

    pub fn goal_stack(&self) -> &GoalStack {
        &self.goal_stack
    }

    pub fn historical(&self) -> &Historical {
        &self.historical
    }

    /// Applies `action_id`'s effect under `ground`, pushes whatever goals it
    /// declares, runs the event fixpoint to a fixed point (bounded, silently
    /// giving up on divergence — this is a heuristic probe, not a
    /// user-facing application), and reconciles the goal stack. Mirrors
    /// `Problem::notify_action_done` without any observer bookkeeping.
    pub fn apply_action(&mut self, domain: &Domain, action_id: &str, ground: &GroundBindings, config: &PlannerConfig, now: Option<Instant>) {
        let Some(action) = domain.action(action_id).cloned() else {
            return;
        };
        action.effect.apply_effects(&mut self.world_state, domain.ontology(), ground);
        let grounded = action.effect_grounded(ground);
        for goals in grounded.goals_to_add.values() {
            for goal in goals {
                self.goal_stack.push(goal.clone(), now);
            }
        }
        for goal in &grounded.goals_to_add_in_current_priority {
            self.goal_stack.push_in_current_priority(goal.clone(), now);
        }
        self.historical.notify_action_done(action_id);
        run_event_fixpoint(&mut self.world_state, &mut self.goal_stack, domain, config, now);
        let mut tracker = GoalsRemovedTracker::new();
        self.goal_stack.refresh(&self.world_state, domain.ontology(), now, &mut tracker);
    }
}

/// Fires every active event whose condition holds, repeatedly, until
/// nothing changes or `config.event_fixpoint_iteration_cap` iterations pass.
/// Returns whether it converged. Shared by `Problem::apply_event_fixpoint`
/// (which turns non-convergence into a `PlannerError`) and
/// `SimulatedProblem::apply_action` (which just gives up quietly) (§4.7).
///
/// A goal an event pushes is only counted as a change — and only pushed at
/// all — the first time it appears: an event whose condition stays true
/// after it fires (pushing a goal does not, by itself, falsify any world
/// state) must stop being "changed" once its goals are already present, or
/// the fixpoint would never converge.
fn run_event_fixpoint(world_state: &mut WorldState, goal_stack: &mut GoalStack, domain: &Domain, config: &PlannerConfig, now: Option<Instant>) -> bool {
    for iteration in 0..config.event_fixpoint_iteration_cap {
        let mut changed = false;
        let events: Vec<_> = domain.active_events().cloned().collect();
        for event in &events {
            let Some(ground) = event.matching_bindings(world_state, domain.ontology()) else {
                continue;
            };
            let before = world_state.clone();
            event.effect.apply_effects(world_state, domain.ontology(), &ground);
            let grounded = event.effect.replace_arguments(&ground);
            for goals in grounded.goals_to_add.values() {
                for goal in goals {
                    if goal_stack.contains(&goal.id()) {
                        continue;
                    }
                    goal_stack.push(goal.clone(), now);
                    changed = true;
                }
            }
            for goal in &grounded.goals_to_add_in_current_priority {
                if goal_stack.contains(&goal.id()) {
                    continue;
                }
                goal_stack.push_in_current_priority(goal.clone(), now);
                changed = true;
            }
            if *world_state != before {
                changed = true;
                tracing::trace!(event = %event.id, iteration, "event fired");
            }
        }
        if !changed {
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::Action;
    use crate::condition::Condition;
    use crate::fact::FactOptional;
    use crate::ontology::Ontology;
    use crate::problem_modification::ProblemModification;
    use crate::wsm::Wsm;

    #[test]
    fn notify_action_done_applies_effect_and_records_history() {
        let mut domain = Domain::new(Ontology::new());
        let fact = Fact::new("done", vec![], None);
        domain
            .add_action(Action::new("finish", ProblemModification::empty().with_effect(Wsm::set(fact.clone()))))
            .unwrap();
        let mut problem = Problem::new(Rc::new(domain));
        let config = PlannerConfig::default();
        problem.notify_action_done("finish", &GroundBindings::new(), &config, None).unwrap();
        assert!(problem.world_state().has_ground_fact(&fact));
        assert_eq!(problem.historical().count("finish"), 1);
    }

    #[test]
    fn action_goal_is_pushed_after_effect() {
        let mut domain = Domain::new(Ontology::new());
        let fact = Fact::new("step_one", vec![], None);
        let next_goal_fact = Fact::new("step_two", vec![], None);
        domain
            .add_action(Action::new(
                "advance",
                ProblemModification::empty()
                    .with_effect(Wsm::set(fact))
                    .with_goal(Goal::new(Condition::fact(FactOptional::positive(next_goal_fact)))),
            ))
            .unwrap();
        let mut problem = Problem::new(Rc::new(domain));
        let config = PlannerConfig::default();
        problem.notify_action_done("advance", &GroundBindings::new(), &config, None).unwrap();
        assert!(!problem.goal_stack().is_empty());
    }

    #[test]
    fn goal_pushing_event_with_a_standing_condition_converges() {
        use crate::event::{Event, EventSet};

        let mut domain = Domain::new(Ontology::new());
        let trigger = Fact::new("trigger", vec![], None);
        let event_set = EventSet::new("standing").with_event(Event::new(
            "keep_wanting",
            Condition::fact(FactOptional::positive(trigger.clone())),
            ProblemModification::empty().with_goal(Goal::new(Condition::fact(FactOptional::positive(Fact::new(
                "wanted",
                vec![],
                None,
            ))))),
        ));
        domain.add_event_set(event_set).unwrap();
        let mut problem = Problem::new(Rc::new(domain));
        problem.add_fact(trigger);
        let config = PlannerConfig::default();
        // The event's condition (`trigger`) is never falsified by its own
        // effect, so without the already-present check this would push the
        // same goal every iteration, never converge, and return
        // `EventDivergence`.
        problem.apply_event_fixpoint(&config, None).unwrap();
        assert_eq!(problem.goal_stack().goals_at_current_priority().len(), 1);
    }

    #[test]
    fn simulation_fork_does_not_mutate_the_real_problem() {
        let mut domain = Domain::new(Ontology::new());
        let fact = Fact::new("done", vec![], None);
        domain
            .add_action(Action::new("finish", ProblemModification::empty().with_effect(Wsm::set(fact.clone()))))
            .unwrap();
        let domain = Rc::new(domain);
        let problem = Problem::new(domain.clone());
        let config = PlannerConfig::default();
        let mut sim = problem.fork_for_simulation();
        sim.apply_action(&domain, "finish", &GroundBindings::new(), &config, None);
        assert!(sim.world_state().has_ground_fact(&fact));
        assert!(!problem.world_state().has_ground_fact(&fact));
    }
}
