//! The succession cache: for each action and event, which other actions and
//! events could possibly be enabled by one of its effect leaves. Built once
//! when a `Domain` is assembled (or mutated) and consulted by the planner to
//! avoid scanning every action on every search node (§4.8).

use std::collections::{BTreeMap, BTreeSet};

use crate::action::{Action, ActionId};
use crate::condition::Condition;
use crate::event::{EventId, EventSet, SetOfEventsId};
use crate::fact::Fact;
use crate::problem_modification::ProblemModification;
use crate::wsm::EffectKind;

/// The actions and events one effect leaf (or the union of several) could
/// newly enable.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Successions {
    pub actions: BTreeSet<ActionId>,
    pub events: BTreeMap<SetOfEventsId, BTreeSet<EventId>>,
}

impl Successions {
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty() && self.events.values().all(BTreeSet::is_empty)
    }

    fn merge(&mut self, other: &Successions) {
        self.actions.extend(other.actions.iter().cloned());
        for (set_id, events) in &other.events {
            self.events.entry(set_id.clone()).or_default().extend(events.iter().cloned());
        }
    }
}

/// Identifies the action or event a precondition leaf belongs to, so the
/// container-id rule (§4.8: an action/event never appears in its own
/// successor list) can be enforced and so a match can be inserted into the
/// right `Successions` bucket.
#[derive(Clone, Debug, PartialEq, Eq)]
enum ContainerId {
    Action(ActionId),
    Event(SetOfEventsId, EventId),
}

impl ContainerId {
    fn insert_into(&self, successions: &mut Successions) {
        match self {
            ContainerId::Action(id) => {
                successions.actions.insert(id.clone());
            }
            ContainerId::Event(set_id, event_id) => {
                successions.events.entry(set_id.clone()).or_default().insert(event_id.clone());
            }
        }
    }
}

/// One precondition leaf, flattened for matching: the container it guards,
/// the fact pattern it tests, and the direction that satisfies it (`Sets`
/// for a positive leaf, `Removes` for a negated one).
struct GuardLeaf {
    container: ContainerId,
    pattern: Fact,
    satisfied_by: EffectKind,
}

/// Per-action/event succession rollups, rebuilt from scratch whenever the
/// domain's actions or events change (§4.8: the cache trades a rebuild cost
/// at mutation time for O(1) lookups during every search node).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SuccessionCache {
    by_action: BTreeMap<ActionId, Successions>,
    by_event: BTreeMap<SetOfEventsId, BTreeMap<EventId, Successions>>,
}

impl SuccessionCache {
    pub fn rebuild<'a>(
        actions: impl Iterator<Item = &'a Action>,
        event_sets: impl Iterator<Item = &'a EventSet>,
    ) -> Self {
        let actions: Vec<&Action> = actions.filter(|a| a.can_be_used_by_planner).collect();
        let event_sets: Vec<&EventSet> = event_sets.filter(|set| set.enabled).collect();

        let mut guards = Vec::new();
        for action in &actions {
            index_precondition(&action.preconditions, ContainerId::Action(action.id.clone()), &mut guards);
        }
        for event_set in &event_sets {
            for event in &event_set.events {
                index_precondition(
                    &event.condition,
                    ContainerId::Event(event_set.id.clone(), event.id.clone()),
                    &mut guards,
                );
            }
        }

        let mut cache = SuccessionCache::default();
        for action in &actions {
            let successions = successions_for(&ContainerId::Action(action.id.clone()), &action.effect, &guards);
            cache.by_action.insert(action.id.clone(), successions);
        }
        for event_set in &event_sets {
            let mut per_event = BTreeMap::new();
            for event in &event_set.events {
                let container = ContainerId::Event(event_set.id.clone(), event.id.clone());
                per_event.insert(event.id.clone(), successions_for(&container, &event.effect, &guards));
            }
            cache.by_event.insert(event_set.id.clone(), per_event);
        }
        cache
    }

    /// `succ(action_id)`: the actions and events this action's effect could
    /// newly enable, by fact pattern. `None` if the action is unknown or was
    /// excluded from the cache (disabled for the planner).
    pub fn successions_for_action(&self, action_id: &str) -> Option<&Successions> {
        self.by_action.get(action_id)
    }

    /// `succ(event_id)` within `set_id`.
    pub fn successions_for_event(&self, set_id: &str, event_id: &str) -> Option<&Successions> {
        self.by_event.get(set_id)?.get(event_id)
    }

    /// Every action's freshly rebuilt `Successions`, used by `Domain` to
    /// write each action's `succ_cache` field back in sync with the cache.
    pub(crate) fn actions_successions(&self) -> impl Iterator<Item = (&ActionId, &Successions)> {
        self.by_action.iter()
    }
}

/// Flattens `condition`'s leaf fact-optionals belonging to `container` into
/// `guards`, one `GuardLeaf` per leaf (§4.8).
fn index_precondition(condition: &Condition, container: ContainerId, guards: &mut Vec<GuardLeaf>) {
    condition.for_each_leaf_fact(&mut |fo| {
        guards.push(GuardLeaf {
            container: container.clone(),
            pattern: fo.fact.clone(),
            satisfied_by: if fo.is_negated { EffectKind::Removes } else { EffectKind::Sets },
        });
    });
}

/// The union, over every leaf of `effect`, of the guards it satisfies —
/// excluding `self_id`'s own guards (the container-id rule) — grouped back
/// into one `Successions`.
fn successions_for(self_id: &ContainerId, effect: &ProblemModification, guards: &[GuardLeaf]) -> Successions {
    let mut result = Successions::default();
    effect.for_each_effect_leaf(&mut |fact, kind| {
        for guard in guards {
            if &guard.container == self_id {
                continue;
            }
            if guard.satisfied_by == kind && guard.pattern.pattern_compatible(fact) {
                guard.container.insert_into(&mut result);
            }
        }
    });
    result
}
