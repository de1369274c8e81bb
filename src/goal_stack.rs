//! The goal stack: goals grouped by priority, most recently pushed first
//! within a priority (§3, §4.6).

use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

use crate::goal::{Goal, GoalId};
use crate::observer::{GoalRemovalReason, GoalsRemovedTracker};
use crate::ontology::Ontology;
use crate::world_state::WorldState;

#[derive(Clone)]
struct GoalEntry {
    goal: Goal,
    /// The last time forward progress was recorded for this goal — reset on
    /// push and whenever `iterate_on_goals_and_remove_non_persistent`'s
    /// callback reports progress, not a flat time-to-live from creation
    /// (§4.6).
    last_activity: Option<Instant>,
}

/// Goals the planner is trying to satisfy, ordered by priority (higher
/// first) and, within a priority, by recency (most recently pushed first).
/// Only goals at the current highest priority with at least one unsatisfied
/// member are ever offered to the search (§4.6, §4.9.1).
#[derive(Clone, Default)]
pub struct GoalStack {
    by_priority: BTreeMap<i32, Vec<GoalEntry>>,
}

impl GoalStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.by_priority.values().all(Vec::is_empty)
    }

    /// True if a goal with this id is currently on the stack, at any
    /// priority. Used by the event fixpoint to tell a genuinely new goal
    /// push from a re-push of one already delivered (§4.7).
    pub fn contains(&self, goal_id: &str) -> bool {
        self.by_priority.values().any(|entries| entries.iter().any(|entry| entry.goal.id() == goal_id))
    }

    /// The highest priority with at least one goal still on the stack.
    pub fn current_priority(&self) -> Option<i32> {
        self.by_priority.iter().rev().find(|(_, goals)| !goals.is_empty()).map(|(p, _)| *p)
    }

    /// Pushes `goal` at its own declared priority.
    pub fn push(&mut self, goal: Goal, now: Option<Instant>) {
        let priority = goal.priority;
        self.by_priority.entry(priority).or_default().push(GoalEntry { goal, last_activity: now });
    }

    /// Pushes `goal` at whatever the current highest priority is (0 if the
    /// stack is empty), overriding its own declared priority — this is how
    /// an action's `goals_to_add_in_current_priority` attaches follow-up
    /// work to the goal it was working on (§4.9.4).
    pub fn push_in_current_priority(&mut self, mut goal: Goal, now: Option<Instant>) {
        let priority = self.current_priority().unwrap_or(0);
        goal.priority = priority;
        self.push(goal, now);
    }

    /// Pushes `goal` so it is tried before any other goal already at its
    /// priority (the default `push` behaviour, made explicit for callers
    /// that distinguish the two ends of a priority's queue).
    pub fn push_front_goal(&mut self, goal: Goal, now: Option<Instant>) {
        self.push(goal, now);
    }

    /// Pushes `goal` so every goal already at its priority is tried first.
    pub fn push_back_goal(&mut self, goal: Goal, now: Option<Instant>) {
        let priority = goal.priority;
        self.by_priority
            .entry(priority)
            .or_default()
            .insert(0, GoalEntry { goal, last_activity: now });
    }

    /// Replaces the whole stack with `goals`, keyed by the priority each
    /// group is pushed at (§4.6, §6).
    pub fn set_goals(&mut self, goals: BTreeMap<i32, Vec<Goal>>, now: Option<Instant>) {
        self.by_priority.clear();
        for (priority, goals_at_priority) in goals {
            for mut goal in goals_at_priority {
                goal.priority = priority;
                self.push(goal, now);
            }
        }
    }

    /// Replaces every goal at `priority` with `goals`, leaving every other
    /// priority untouched (§4.6, §6).
    pub fn set_goals_for_a_priority(&mut self, priority: i32, goals: Vec<Goal>, now: Option<Instant>) {
        self.by_priority.insert(priority, Vec::new());
        for mut goal in goals {
            goal.priority = priority;
            self.push(goal, now);
        }
    }

    /// Pushes every goal in `goals`, each at its own declared priority — a
    /// thin convenience over repeated `push` (§4.6, §6).
    pub fn add_goals(&mut self, goals: Vec<Goal>, now: Option<Instant>) {
        for goal in goals {
            self.push(goal, now);
        }
    }

    /// Moves every goal currently at `group_id` to `priority`, preserving
    /// their relative order; `push_front_on_conflict` decides whether they
    /// land ahead of or behind goals already at the destination priority.
    pub fn set_goal_priority(&mut self, group_id: &str, priority: i32, push_front_on_conflict: bool) {
        let mut moved = Vec::new();
        for entries in self.by_priority.values_mut() {
            let mut i = 0;
            while i < entries.len() {
                if entries[i].goal.group_id.as_deref() == Some(group_id) {
                    let mut entry = entries.remove(i);
                    entry.goal.priority = priority;
                    moved.push(entry);
                } else {
                    i += 1;
                }
            }
        }
        let destination = self.by_priority.entry(priority).or_default();
        if push_front_on_conflict {
            destination.extend(moved);
        } else {
            let tail = std::mem::take(destination);
            moved.extend(tail);
            *destination = moved;
        }
    }

    /// Removes every goal sharing `group_id`, reporting each through
    /// `tracker`. Returns `true` if anything was removed.
    pub fn remove_goals(&mut self, group_id: &str, tracker: &mut GoalsRemovedTracker) -> bool {
        let mut changed = false;
        for entries in self.by_priority.values_mut() {
            entries.retain(|entry| {
                let matches = entry.goal.group_id.as_deref() == Some(group_id);
                if matches {
                    tracker.notify_removed_with_reason(entry.goal.id(), GoalRemovalReason::Removed);
                    changed = true;
                }
                !matches
            });
        }
        changed
    }

    /// All goals at the current highest priority, most recently pushed
    /// first.
    pub fn goals_at_current_priority(&self) -> Vec<&Goal> {
        match self.current_priority() {
            Some(priority) => self
                .by_priority
                .get(&priority)
                .into_iter()
                .flatten()
                .rev()
                .map(|entry| &entry.goal)
                .collect(),
            None => Vec::new(),
        }
    }

    /// The most recently pushed, not-yet-satisfied goal at the current
    /// highest priority — what the planner tries next (§4.9.1).
    pub fn next_goal(&self, world_state: &WorldState, ontology: &Ontology) -> Option<&Goal> {
        self.goals_at_current_priority()
            .into_iter()
            .find(|goal| !goal.is_satisfied(world_state, ontology))
    }

    /// Evicts non-stackable duplicates: within each priority, if the same
    /// non-stackable goal (by id) appears more than once, only the most
    /// recently pushed instance survives (§4.6).
    fn evict_non_stackable_duplicates(&mut self, tracker: &mut GoalsRemovedTracker) {
        for entries in self.by_priority.values_mut() {
            let mut seen: BTreeSet<GoalId> = BTreeSet::new();
            let mut index = entries.len();
            while index > 0 {
                index -= 1;
                if entries[index].goal.is_stackable {
                    continue;
                }
                let id = entries[index].goal.id();
                if seen.contains(&id) {
                    let removed = entries.remove(index);
                    tracker.notify_removed_with_reason(removed.goal.id(), GoalRemovalReason::Removed);
                } else {
                    seen.insert(id);
                }
            }
        }
    }

    /// Drops the satisfied *prefix* of goals, one priority group at a time:
    /// within each priority (highest first), goals are dropped from the
    /// front of the queue (the order they were pushed in, oldest first) as
    /// long as each is satisfied and not persistent, stopping at the first
    /// one that is not. Returns the id of the last goal dropped, if any
    /// (§4.6, §6).
    pub fn remove_first_goals_that_are_already_satisfied(
        &mut self,
        world_state: &WorldState,
        ontology: &Ontology,
        tracker: &mut GoalsRemovedTracker,
    ) -> Option<GoalId> {
        let mut last_dropped = None;
        for entries in self.by_priority.values_mut().rev() {
            loop {
                let Some(entry) = entries.first() else { break };
                if entry.goal.is_persistent || !entry.goal.is_satisfied(world_state, ontology) {
                    break;
                }
                let entry = entries.remove(0);
                let id = entry.goal.id();
                tracker.notify_removed_with_reason(id.clone(), GoalRemovalReason::Satisfied);
                last_dropped = Some(id);
            }
        }
        last_dropped
    }

    /// Walks every goal, highest priority first and FIFO (oldest pushed
    /// first) within a priority, after first evicting non-stackable
    /// duplicates (§4.6). A goal that already holds and is not persistent
    /// is removed and reported; otherwise `cb(goal, priority)` is invoked.
    /// Returns `true` (and stops walking) as soon as `cb` reports progress,
    /// resetting that goal's inactivity clock; returns `false` if every
    /// goal was visited (or removed) without progress.
    pub fn iterate_on_goals_and_remove_non_persistent(
        &mut self,
        world_state: &WorldState,
        ontology: &Ontology,
        now: Option<Instant>,
        tracker: &mut GoalsRemovedTracker,
        mut cb: impl FnMut(&Goal, i32) -> bool,
    ) -> bool {
        self.evict_non_stackable_duplicates(tracker);
        let priorities: Vec<i32> = self.by_priority.keys().rev().copied().collect();
        for priority in priorities {
            let mut index = 0;
            loop {
                let Some(goal) = self.by_priority.get(&priority).and_then(|e| e.get(index)).map(|e| e.goal.clone())
                else {
                    break;
                };
                if goal.is_satisfied(world_state, ontology) && !goal.is_persistent {
                    self.by_priority.get_mut(&priority).expect("priority present").remove(index);
                    tracker.notify_removed_with_reason(goal.id(), GoalRemovalReason::Satisfied);
                    continue;
                }
                if cb(&goal, priority) {
                    if let Some(entry) = self.by_priority.get_mut(&priority).and_then(|e| e.get_mut(index)) {
                        entry.last_activity = now;
                    }
                    return true;
                }
                index += 1;
            }
        }
        false
    }

    /// Reconciles the stack against the current world state: evicts
    /// non-stackable duplicates, drops non-persistent goals that are now
    /// satisfied, drops every other member of a satisfied goal's group, and
    /// drops goals that went `max_time_to_live` with no forward progress.
    /// Returns `true` if anything changed.
    pub fn refresh(
        &mut self,
        world_state: &WorldState,
        ontology: &Ontology,
        now: Option<Instant>,
        tracker: &mut GoalsRemovedTracker,
    ) -> bool {
        self.evict_non_stackable_duplicates(tracker);

        let mut satisfied_groups = Vec::new();
        for entries in self.by_priority.values() {
            for entry in entries {
                if entry.goal.is_satisfied(world_state, ontology) {
                    if let Some(group) = &entry.goal.group_id {
                        satisfied_groups.push(group.clone());
                    }
                }
            }
        }

        let mut changed = false;
        for entries in self.by_priority.values_mut() {
            entries.retain(|entry| {
                let satisfied = entry.goal.is_satisfied(world_state, ontology);
                let group_closed = entry
                    .goal
                    .group_id
                    .as_ref()
                    .is_some_and(|g| satisfied_groups.contains(g));
                let expired = match (entry.goal.max_time_to_live, entry.last_activity, now) {
                    (Some(ttl), Some(last_activity), Some(now)) => now.duration_since(last_activity) > ttl,
                    _ => false,
                };

                let kept_as_satisfied_persistent = satisfied && entry.goal.is_persistent;
                let drop = !kept_as_satisfied_persistent && (satisfied || group_closed || expired);
                if drop {
                    let reason = if satisfied {
                        GoalRemovalReason::Satisfied
                    } else if group_closed {
                        GoalRemovalReason::GroupClosed
                    } else {
                        GoalRemovalReason::Timeout
                    };
                    tracker.notify_removed_with_reason(entry.goal.id(), reason);
                    changed = true;
                }
                !drop
            });
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::Condition;
    use crate::fact::{Fact, FactOptional};
    use std::time::Duration;

    fn fact_goal(name: &str) -> Goal {
        Goal::new(Condition::fact(FactOptional::positive(Fact::new(name, vec![], None))))
    }

    #[test]
    fn higher_priority_goal_is_next() {
        let mut stack = GoalStack::new();
        stack.push(fact_goal("low"), None);
        stack.push(fact_goal("high").with_priority(5), None);
        let ontology = Ontology::new();
        let ws = WorldState::new();
        assert_eq!(stack.next_goal(&ws, &ontology).unwrap().id(), fact_goal("high").with_priority(5).id());
    }

    #[test]
    fn satisfied_non_persistent_goal_is_dropped() {
        let mut stack = GoalStack::new();
        let fact = Fact::new("done", vec![], None);
        stack.push(Goal::new(Condition::fact(FactOptional::positive(fact.clone()))), None);
        let ontology = Ontology::new();
        let mut ws = WorldState::new();
        ws.add_fact(fact);
        let mut tracker = GoalsRemovedTracker::new();
        assert!(stack.refresh(&ws, &ontology, None, &mut tracker));
        assert!(stack.is_empty());
        assert_eq!(tracker.removed().len(), 1);
    }

    #[test]
    fn satisfied_persistent_goal_is_kept() {
        let mut stack = GoalStack::new();
        let fact = Fact::new("done", vec![], None);
        stack.push(
            Goal::new(Condition::fact(FactOptional::positive(fact.clone()))).persistent(),
            None,
        );
        let ontology = Ontology::new();
        let mut ws = WorldState::new();
        ws.add_fact(fact);
        let mut tracker = GoalsRemovedTracker::new();
        stack.refresh(&ws, &ontology, None, &mut tracker);
        assert!(!stack.is_empty());
    }

    #[test]
    fn push_back_goal_is_tried_after_existing_ones() {
        let mut stack = GoalStack::new();
        stack.push_front_goal(fact_goal("first"), None);
        stack.push_back_goal(fact_goal("second"), None);
        let ws = WorldState::new();
        let ontology = Ontology::new();
        assert_eq!(stack.next_goal(&ws, &ontology).unwrap().id(), fact_goal("first").id());
    }

    #[test]
    fn remove_goals_drops_whole_group() {
        let mut stack = GoalStack::new();
        stack.push(fact_goal("a").with_group("g"), None);
        stack.push(fact_goal("b").with_group("g"), None);
        stack.push(fact_goal("c"), None);
        let mut tracker = GoalsRemovedTracker::new();
        assert!(stack.remove_goals("g", &mut tracker));
        assert_eq!(tracker.removed().len(), 2);
        assert_eq!(stack.goals_at_current_priority().len(), 1);
    }

    #[test]
    fn set_goal_priority_moves_whole_group() {
        let mut stack = GoalStack::new();
        stack.push(fact_goal("a").with_group("g").with_priority(0), None);
        stack.push(fact_goal("high").with_priority(5), None);
        stack.set_goal_priority("g", 10, true);
        let ws = WorldState::new();
        let ontology = Ontology::new();
        assert_eq!(stack.next_goal(&ws, &ontology).unwrap().id(), fact_goal("a").id());
    }

    #[test]
    fn group_exclusivity_drops_siblings() {
        let mut stack = GoalStack::new();
        let fact_a = Fact::new("option_a", vec![], None);
        let fact_b = Fact::new("option_b", vec![], None);
        stack.push(
            Goal::new(Condition::fact(FactOptional::positive(fact_a.clone()))).with_group("pick_one"),
            None,
        );
        stack.push(
            Goal::new(Condition::fact(FactOptional::positive(fact_b))).with_group("pick_one"),
            None,
        );
        let ontology = Ontology::new();
        let mut ws = WorldState::new();
        ws.add_fact(fact_a);
        let mut tracker = GoalsRemovedTracker::new();
        stack.refresh(&ws, &ontology, None, &mut tracker);
        assert!(stack.is_empty());
        assert_eq!(tracker.removed().len(), 2);
    }

    #[test]
    fn set_goals_replaces_the_whole_stack() {
        let mut stack = GoalStack::new();
        stack.push(fact_goal("stale"), None);
        let mut goals = BTreeMap::new();
        goals.insert(3, vec![fact_goal("fresh")]);
        stack.set_goals(goals, None);
        assert_eq!(stack.current_priority(), Some(3));
        assert_eq!(stack.goals_at_current_priority().len(), 1);
        assert_eq!(stack.goals_at_current_priority()[0].id(), fact_goal("fresh").id());
    }

    #[test]
    fn set_goals_for_a_priority_leaves_other_priorities_untouched() {
        let mut stack = GoalStack::new();
        stack.push(fact_goal("low"), None);
        stack.push(fact_goal("high").with_priority(5), None);
        stack.set_goals_for_a_priority(5, vec![fact_goal("replacement")], None);
        assert_eq!(stack.goals_at_current_priority().len(), 1);
        assert_eq!(stack.goals_at_current_priority()[0].id(), fact_goal("replacement").id());
        stack.set_goal_priority("nonexistent", 0, true);
        assert!(!stack.is_empty());
    }

    #[test]
    fn add_goals_pushes_each_at_its_own_priority() {
        let mut stack = GoalStack::new();
        stack.add_goals(vec![fact_goal("low"), fact_goal("high").with_priority(5)], None);
        assert_eq!(stack.current_priority(), Some(5));
    }

    #[test]
    fn remove_first_goals_that_are_already_satisfied_drops_only_the_prefix() {
        let mut stack = GoalStack::new();
        let done = Fact::new("done", vec![], None);
        let pending = Fact::new("pending", vec![], None);
        stack.push(Goal::new(Condition::fact(FactOptional::positive(done.clone()))), None);
        stack.push(Goal::new(Condition::fact(FactOptional::positive(pending))), None);
        let ontology = Ontology::new();
        let mut ws = WorldState::new();
        ws.add_fact(done);
        let mut tracker = GoalsRemovedTracker::new();
        let dropped = stack.remove_first_goals_that_are_already_satisfied(&ws, &ontology, &mut tracker);
        assert_eq!(dropped, Some(fact_goal("done").id()));
        assert_eq!(stack.goals_at_current_priority().len(), 1);
        assert_eq!(stack.goals_at_current_priority()[0].id(), fact_goal("pending").id());
    }

    #[test]
    fn iterate_on_goals_stops_at_first_progress_and_skips_satisfied() {
        let mut stack = GoalStack::new();
        let done = Fact::new("done", vec![], None);
        stack.push(Goal::new(Condition::fact(FactOptional::positive(done.clone()))), None);
        stack.push(fact_goal("first"), None);
        stack.push(fact_goal("second"), None);
        let ontology = Ontology::new();
        let mut ws = WorldState::new();
        ws.add_fact(done);
        let mut tracker = GoalsRemovedTracker::new();
        let mut visited = Vec::new();
        let progressed = stack.iterate_on_goals_and_remove_non_persistent(&ws, &ontology, None, &mut tracker, |goal, _priority| {
            visited.push(goal.id());
            goal.id() == fact_goal("second").id()
        });
        assert!(progressed);
        assert_eq!(visited, vec![fact_goal("first").id(), fact_goal("second").id()]);
        assert_eq!(tracker.removed().len(), 1);
        assert_eq!(stack.goals_at_current_priority().len(), 2);
    }

    #[test]
    fn non_stackable_duplicate_is_evicted_before_iteration() {
        let mut stack = GoalStack::new();
        stack.push(fact_goal("limited").non_stackable(), None);
        stack.push(fact_goal("limited").non_stackable(), None);
        let ontology = Ontology::new();
        let ws = WorldState::new();
        let mut tracker = GoalsRemovedTracker::new();
        stack.iterate_on_goals_and_remove_non_persistent(&ws, &ontology, None, &mut tracker, |_, _| false);
        assert_eq!(stack.goals_at_current_priority().len(), 1);
        assert_eq!(tracker.removed().len(), 1);
    }

    #[test]
    fn inactivity_timeout_drops_goal_after_no_progress() {
        let mut stack = GoalStack::new();
        let start = Instant::now();
        stack.push(fact_goal("stale").with_max_time_to_live(Duration::from_secs(10)), Some(start));
        let ontology = Ontology::new();
        let ws = WorldState::new();
        let mut tracker = GoalsRemovedTracker::new();
        let later = start + Duration::from_secs(20);
        assert!(stack.refresh(&ws, &ontology, Some(later), &mut tracker));
        assert!(stack.is_empty());
        assert_eq!(tracker.removed().get(&fact_goal("stale").id()), Some(&GoalRemovalReason::Timeout));
    }

    #[test]
    fn inactivity_timeout_resets_on_progress() {
        let mut stack = GoalStack::new();
        let start = Instant::now();
        stack.push(fact_goal("active").with_max_time_to_live(Duration::from_secs(10)), Some(start));
        let ontology = Ontology::new();
        let ws = WorldState::new();
        let mut tracker = GoalsRemovedTracker::new();
        let progress_at = start + Duration::from_secs(8);
        let progressed = stack.iterate_on_goals_and_remove_non_persistent(&ws, &ontology, Some(progress_at), &mut tracker, |_, _| true);
        assert!(progressed);
        let still_within_timeout_of_progress = progress_at + Duration::from_secs(5);
        assert!(!stack.refresh(&ws, &ontology, Some(still_within_timeout_of_progress), &mut tracker));
        assert!(!stack.is_empty());
    }
}
