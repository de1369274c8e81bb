//! Synchronous notification hooks a caller can register on a `Problem`, and
//! the removed-goal tracker the goal stack reports through (§3, §6).

use std::collections::BTreeMap;
use std::fmt;

use crate::goal::{Goal, GoalId};
use crate::world_state::WorldState;

type WorldStateObserver = Box<dyn Fn(&WorldState) + Send + Sync>;
type GoalsObserver = Box<dyn Fn(&[Goal]) + Send + Sync>;

/// Callback registries a `Problem` notifies synchronously whenever its
/// world state or goal stack changes. Calling these is the planner's only
/// side channel to the outside world — plans themselves are returned, not
/// executed, by this crate (§5).
#[derive(Default)]
pub struct Observers {
    world_state_changed: Vec<WorldStateObserver>,
    goals_changed: Vec<GoalsObserver>,
}

impl Observers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_world_state_changed(&mut self, callback: impl Fn(&WorldState) + Send + Sync + 'static) {
        self.world_state_changed.push(Box::new(callback));
    }

    pub fn on_goals_changed(&mut self, callback: impl Fn(&[Goal]) + Send + Sync + 'static) {
        self.goals_changed.push(Box::new(callback));
    }

    pub fn notify_world_state_changed(&self, world_state: &WorldState) {
        for observer in &self.world_state_changed {
            observer(world_state);
        }
    }

    pub fn notify_goals_changed(&self, goals: &[Goal]) {
        for observer in &self.goals_changed {
            observer(goals);
        }
    }
}

impl fmt::Debug for Observers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observers")
            .field("world_state_changed", &self.world_state_changed.len())
            .field("goals_changed", &self.goals_changed.len())
            .finish()
    }
}

/// Why a goal left the stack, reported alongside its id so a caller can
/// tell a completed objective from one that was merely displaced (§4.6).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum GoalRemovalReason {
    /// Its objective held and it was not persistent.
    Satisfied,
    /// Another member of its exclusivity group was satisfied first.
    GroupClosed,
    /// It went `max_time_to_live` with no forward progress recorded.
    Timeout,
    /// Explicitly removed (`GoalStack::remove_goals`, a non-stackable
    /// duplicate evicted), independent of its objective's truth.
    Removed,
}

/// Accumulates the ids of goals removed from the stack, tagged with why,
/// since it was last drained, so a caller can distinguish "this goal is
/// gone" from "this goal is still pending" without polling the stack on
/// every tick.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GoalsRemovedTracker {
    removed: BTreeMap<GoalId, GoalRemovalReason>,
}

impl GoalsRemovedTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a removal for an unspecified reason
    /// (`GoalRemovalReason::Removed`). Prefer `notify_removed_with_reason`
    /// when the cause is known.
    pub fn notify_removed(&mut self, id: GoalId) {
        self.notify_removed_with_reason(id, GoalRemovalReason::Removed);
    }

    pub fn notify_removed_with_reason(&mut self, id: GoalId, reason: GoalRemovalReason) {
        self.removed.insert(id, reason);
    }

    /// Returns the accumulated map and clears it.
    pub fn take_removed(&mut self) -> BTreeMap<GoalId, GoalRemovalReason> {
        std::mem::take(&mut self.removed)
    }

    pub fn removed(&self) -> &BTreeMap<GoalId, GoalRemovalReason> {
        &self.removed
    }
}
