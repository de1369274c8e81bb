//! Goals: a prioritised objective the planner tries to satisfy (§3, §4.6).

use std::time::Duration;

use crate::bindings::GroundBindings;
use crate::condition::Condition;
use crate::ontology::Ontology;
use crate::world_state::WorldState;

/// A goal's identity for the purposes of the `GoalStack` and
/// `GoalsRemovedTracker`: its objective's textual form. Two goals with the
/// same objective are the same goal, regardless of when either was pushed.
pub type GoalId = String;

/// A single objective the planner should try to bring about, at a given
/// priority.
///
/// Goals of a higher `priority` are always attempted before any goal of a
/// lower one (§4.6); within the same priority, goals are attempted in
/// stack order (most recently pushed first).
#[derive(Clone, Debug, PartialEq)]
pub struct Goal {
    pub objective: Condition,
    pub priority: i32,
    /// Goals sharing a `group_id` are mutually exclusive: satisfying one
    /// removes the others from the stack without the planner considering
    /// them failed (§4.6).
    pub group_id: Option<String>,
    /// A persistent goal is pushed back onto the stack if the world state
    /// later makes its objective false again, instead of being dropped once
    /// satisfied.
    pub is_persistent: bool,
    /// If set, the goal is dropped (reported via `GoalsRemovedTracker` with
    /// `GoalRemovalReason::Timeout`) once this long passes with no forward
    /// progress recorded for it — the clock resets every time the goal
    /// stack's iteration reports progress on this goal, it is not a flat
    /// time-to-live from when the goal was pushed (§4.6).
    pub max_time_to_live: Option<Duration>,
    /// A non-stackable goal may only ever have one live instance per
    /// priority: pushing a second copy while one is already present evicts
    /// the older one before the stack is next iterated (§4.6).
    pub is_stackable: bool,
}

impl Goal {
    pub fn new(objective: Condition) -> Self {
        Self {
            objective,
            priority: 0,
            group_id: None,
            is_persistent: false,
            max_time_to_live: None,
            is_stackable: true,
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_group(mut self, group_id: impl Into<String>) -> Self {
        self.group_id = Some(group_id.into());
        self
    }

    pub fn persistent(mut self) -> Self {
        self.is_persistent = true;
        self
    }

    pub fn with_max_time_to_live(mut self, duration: Duration) -> Self {
        self.max_time_to_live = Some(duration);
        self
    }

    pub fn non_stackable(mut self) -> Self {
        self.is_stackable = false;
        self
    }

    /// This goal's identity in the stack (see `GoalId`).
    pub fn id(&self) -> GoalId {
        self.objective.to_string()
    }

    /// True if `objective` currently holds in `world_state`.
    pub fn is_satisfied(&self, world_state: &WorldState, ontology: &Ontology) -> bool {
        self.objective.is_true(world_state, ontology, &GroundBindings::new(), None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fact::{Fact, FactOptional};

    #[test]
    fn id_is_stable_for_equal_objectives() {
        let fact = Fact::new("done", vec![], None);
        let a = Goal::new(Condition::fact(FactOptional::positive(fact.clone())));
        let b = Goal::new(Condition::fact(FactOptional::positive(fact))).with_priority(5);
        assert_eq!(a.id(), b.id());
    }

    #[test]
    fn satisfied_once_fact_present() {
        let ontology = Ontology::new();
        let fact = Fact::new("done", vec![], None);
        let goal = Goal::new(Condition::fact(FactOptional::positive(fact.clone())));
        let mut ws = WorldState::new();
        assert!(!goal.is_satisfied(&ws, &ontology));
        ws.add_fact(fact);
        assert!(goal.is_satisfied(&ws, &ontology));
    }
}
