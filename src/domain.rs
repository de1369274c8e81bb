//! A domain: the fixed set of actions and events a `Problem` is planned
//! against, plus the ontology they're typed over (§3, §4.7, §4.8).

use std::collections::BTreeMap;

use crate::action::{Action, ActionId};
use crate::bindings::GroundBindings;
use crate::error::{PlannerError, Result};
use crate::event::{EventSet, SetOfEventsId};
use crate::ontology::Ontology;
use crate::succession::SuccessionCache;
use crate::world_state::WorldState;

/// The planner-facing description of the problem domain: what actions
/// exist, what passive events can fire, and the types/predicates they're
/// built from.
#[derive(Clone, Debug, Default)]
pub struct Domain {
    ontology: Ontology,
    actions: BTreeMap<ActionId, Action>,
    event_sets: BTreeMap<SetOfEventsId, EventSet>,
    succession_cache: SuccessionCache,
}

impl Domain {
    pub fn new(ontology: Ontology) -> Self {
        Self {
            ontology,
            actions: BTreeMap::new(),
            event_sets: BTreeMap::new(),
            succession_cache: SuccessionCache::default(),
        }
    }

    pub fn ontology(&self) -> &Ontology {
        &self.ontology
    }

    pub fn succession_cache(&self) -> &SuccessionCache {
        &self.succession_cache
    }

    pub fn actions(&self) -> impl Iterator<Item = &Action> {
        self.actions.values()
    }

    pub fn action(&self, id: &str) -> Option<&Action> {
        self.actions.get(id)
    }

    pub fn event_sets(&self) -> impl Iterator<Item = &EventSet> {
        self.event_sets.values()
    }

    /// Adds `action`, rejecting a duplicate id or an action with no effect
    /// at all (neither a world state modification nor a goal to push) — it
    /// could never change anything, so the domain is better off without it
    /// (§4.9).
    pub fn add_action(&mut self, action: Action) -> Result<()> {
        if self.actions.contains_key(&action.id) {
            return Err(PlannerError::InvalidDomain(format!(
                "duplicate action id: {}",
                action.id
            )));
        }
        if action.effect.world_state_modification.is_none()
            && action.effect.world_state_modification_at_start.is_none()
            && action.effect.goals_to_add.is_empty()
            && action.effect.goals_to_add_in_current_priority.is_empty()
        {
            return Err(PlannerError::InvalidDomain(format!(
                "action {} has no effect",
                action.id
            )));
        }
        self.actions.insert(action.id.clone(), action);
        self.rebuild_succession_cache();
        Ok(())
    }

    pub fn remove_action(&mut self, id: &str) -> bool {
        let removed = self.actions.remove(id).is_some();
        if removed {
            self.rebuild_succession_cache();
        }
        removed
    }

    pub fn add_event_set(&mut self, event_set: EventSet) -> Result<()> {
        if self.event_sets.contains_key(&event_set.id) {
            return Err(PlannerError::InvalidDomain(format!(
                "duplicate event set id: {}",
                event_set.id
            )));
        }
        self.event_sets.insert(event_set.id.clone(), event_set);
        self.rebuild_succession_cache();
        Ok(())
    }

    pub fn remove_event_set(&mut self, id: &str) -> bool {
        let removed = self.event_sets.remove(id).is_some();
        if removed {
            self.rebuild_succession_cache();
        }
        removed
    }

    pub fn set_event_set_enabled(&mut self, id: &str, enabled: bool) -> bool {
        match self.event_sets.get_mut(id) {
            Some(set) => {
                set.enabled = enabled;
                self.rebuild_succession_cache();
                true
            }
            None => false,
        }
    }

    /// Rebuilds the succession cache from scratch and writes each action's
    /// `succ_cache` back so it stays in lockstep with what the cache reports
    /// (Invariant 2: rebuilding from scratch after any domain edit always
    /// equals what an incremental update would have produced, because there
    /// is no incremental path — every edit triggers a full rebuild) (§4.8).
    fn rebuild_succession_cache(&mut self) {
        self.succession_cache = SuccessionCache::rebuild(self.actions.values(), self.event_sets.values());
        for (id, successions) in self.succession_cache.actions_successions() {
            if let Some(action) = self.actions.get_mut(id) {
                action.succ_cache = successions.clone();
            }
        }
    }

    /// Every enabled event across every enabled event set, in a stable
    /// order. Used by `Problem::apply_event_fixpoint` to repeatedly fire
    /// events until the world (and the goal stack they may push to) settles
    /// (§4.7).
    pub fn active_events(&self) -> impl Iterator<Item = &crate::event::Event> {
        self.event_sets.values().filter(|set| set.enabled).flat_map(|set| set.events.iter())
    }

    /// True if `action`'s preconditions hold, looked up by id.
    pub fn is_action_applicable(&self, action_id: &str, world_state: &WorldState, ground: &GroundBindings) -> bool {
        self.actions
            .get(action_id)
            .is_some_and(|action| action.is_applicable(world_state, &self.ontology, ground))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::Condition;
    use crate::fact::{Fact, FactOptional};
    use crate::problem_modification::ProblemModification;
    use crate::wsm::Wsm;

    #[test]
    fn rejects_duplicate_action_id() {
        let mut domain = Domain::new(Ontology::new());
        let fact = Fact::new("done", vec![], None);
        let action = Action::new("finish", ProblemModification::empty().with_effect(Wsm::set(fact)));
        domain.add_action(action.clone()).unwrap();
        assert!(matches!(domain.add_action(action), Err(PlannerError::InvalidDomain(_))));
    }

    #[test]
    fn rejects_action_with_no_effect() {
        let mut domain = Domain::new(Ontology::new());
        let action = Action::new("noop", ProblemModification::empty());
        assert!(matches!(domain.add_action(action), Err(PlannerError::InvalidDomain(_))));
    }

    #[test]
    fn disabled_event_set_excluded_from_active_events() {
        let mut domain = Domain::new(Ontology::new());
        let trigger = Fact::new("trigger", vec![], None);
        let announced = Fact::new("announced", vec![], None);
        let event_set = EventSet::new("alerts").with_event(crate::event::Event::new(
            "announce",
            Condition::fact(FactOptional::positive(trigger)),
            ProblemModification::empty().with_effect(Wsm::set(announced)),
        ));
        domain.add_event_set(event_set).unwrap();
        assert_eq!(domain.active_events().count(), 1);
        domain.set_event_set_enabled("alerts", false);
        assert_eq!(domain.active_events().count(), 0);
    }
}
