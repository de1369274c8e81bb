//! Events: passive rules the world state fires on its own, grouped into
//! named sets that can be enabled or disabled together (§3, §4.7).

use crate::bindings::{pick_one, GroundBindings, ParameterBindings};
use crate::condition::Condition;
use crate::ontology::{Ontology, Parameter};
use crate::problem_modification::ProblemModification;
use crate::world_state::WorldState;

pub type EventId = String;
pub type SetOfEventsId = String;

/// A passive rule: whenever `condition` becomes true, `effect` fires
/// automatically, with no planner choice involved. Unlike `Action`, an
/// `Event` is never part of a plan — it only ever appears as a side effect
/// of the event fixpoint (§4.7).
#[derive(Clone, Debug, PartialEq)]
pub struct Event {
    pub id: EventId,
    pub parameters: Vec<Parameter>,
    pub condition: Condition,
    pub effect: ProblemModification,
}

impl Event {
    pub fn new(id: impl Into<String>, condition: Condition, effect: ProblemModification) -> Self {
        Self {
            id: id.into(),
            parameters: Vec::new(),
            condition,
            effect,
        }
    }

    pub fn with_parameter(mut self, parameter: Parameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    /// Evaluates `condition` against `world_state`, returning the ground
    /// bindings it holds under, if any. When `condition` leaves parameters
    /// free, one concrete choice is picked deterministically (§4.7) — an
    /// event firing is not itself a search branch point, unlike an action.
    pub fn matching_bindings(&self, world_state: &WorldState, ontology: &Ontology) -> Option<GroundBindings> {
        let mut candidates = ParameterBindings::new();
        if !self
            .condition
            .is_true(world_state, ontology, &GroundBindings::new(), Some(&mut candidates))
        {
            return None;
        }
        if candidates.is_empty() {
            Some(GroundBindings::new())
        } else {
            pick_one(&candidates)
        }
    }
}

/// A named, independently toggleable group of events (§4.7, mirrors how
/// `Domain` groups actions by nothing but lets events be grouped so a whole
/// behavioural package can be switched on or off, e.g. "tutorial_hints").
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EventSet {
    pub id: SetOfEventsId,
    pub events: Vec<Event>,
    pub enabled: bool,
}

impl EventSet {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            events: Vec::new(),
            enabled: true,
        }
    }

    pub fn with_event(mut self, event: Event) -> Self {
        self.events.push(event);
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fact::{Fact, FactOptional};
    use crate::wsm::Wsm;

    #[test]
    fn matching_bindings_none_when_condition_false() {
        let ontology = Ontology::new();
        let ws = WorldState::new();
        let fact = Fact::new("triggered", vec![], None);
        let event = Event::new(
            "announce",
            Condition::fact(FactOptional::positive(fact.clone())),
            ProblemModification::empty().with_effect(Wsm::set(Fact::new("announced", vec![], None))),
        );
        assert!(event.matching_bindings(&ws, &ontology).is_none());
        let mut ws2 = WorldState::new();
        ws2.add_fact(fact);
        assert!(event.matching_bindings(&ws2, &ontology).is_some());
    }
}
