//! Actions: the planner-controlled operators a plan is built from (§3, §4.9).

use crate::bindings::GroundBindings;
use crate::condition::Condition;
use crate::ontology::{Ontology, Parameter};
use crate::problem_modification::ProblemModification;
use crate::succession::Successions;
use crate::world_state::WorldState;

/// The id of an action, unique within a `Domain`.
pub type ActionId = String;

/// A planner-controlled operator.
///
/// An `Action` is a template over its `parameters`; the planner binds them
/// to concrete entities during search (§4.9.1). `preconditions` must hold at
/// the instant the action is chosen; `over_all_condition` must remain true
/// for the action's whole (unmodelled) duration — violating it mid-plan
/// invalidates any plan that assumed the action completes. `prefer_in_context`
/// is not a requirement: the planner treats it as a soft tie-breaking signal
/// among otherwise-equal candidates (§4.9.1).
#[derive(Clone, Debug, PartialEq)]
pub struct Action {
    pub id: ActionId,
    pub parameters: Vec<Parameter>,
    pub preconditions: Condition,
    pub over_all_condition: Option<Condition>,
    pub prefer_in_context: Option<Condition>,
    pub effect: ProblemModification,
    /// If false, this action exists in the domain (e.g. for documentation
    /// or external execution bookkeeping) but is never proposed by the
    /// search (§4.9.1).
    pub can_be_used_by_planner: bool,
    /// Raises this action's cost contribution steeply on repetition within
    /// a branch, overriding `PlannerConfig::max_same_action_repeats_in_branch`
    /// down to one occurrence (§4.9.3).
    pub high_importance_of_not_repeating_it: bool,
    /// The other actions and events this action's effect could enable,
    /// keyed by fact pattern rather than predicate name alone. Recomputed by
    /// `Domain::rebuild_succession_cache` whenever the domain's actions or
    /// events change; empty until the action is added to a `Domain` (§4.8).
    pub succ_cache: Successions,
}

impl Action {
    pub fn new(id: impl Into<String>, effect: ProblemModification) -> Self {
        Self {
            id: id.into(),
            parameters: Vec::new(),
            preconditions: Condition::Number(1),
            over_all_condition: None,
            prefer_in_context: None,
            effect,
            can_be_used_by_planner: true,
            high_importance_of_not_repeating_it: false,
            succ_cache: Successions::default(),
        }
    }

    pub fn with_parameter(mut self, parameter: Parameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn with_preconditions(mut self, preconditions: Condition) -> Self {
        self.preconditions = preconditions;
        self
    }

    pub fn with_over_all_condition(mut self, condition: Condition) -> Self {
        self.over_all_condition = Some(condition);
        self
    }

    pub fn with_prefer_in_context(mut self, condition: Condition) -> Self {
        self.prefer_in_context = Some(condition);
        self
    }

    pub fn not_usable_by_planner(mut self) -> Self {
        self.can_be_used_by_planner = false;
        self
    }

    pub fn important_not_to_repeat(mut self) -> Self {
        self.high_importance_of_not_repeating_it = true;
        self
    }

    /// True if `preconditions` (and `over_all_condition`, if any) hold under
    /// `ground`.
    pub fn is_applicable(&self, world_state: &WorldState, ontology: &Ontology, ground: &GroundBindings) -> bool {
        if !self.preconditions.is_true(world_state, ontology, ground, None) {
            return false;
        }
        self.over_all_condition
            .as_ref()
            .is_none_or(|c| c.is_true(world_state, ontology, ground, None))
    }

    /// This action's effect bundle with every goal it pushes fully
    /// substituted under `ground` (§4.9.4). The `Wsm` effects themselves are
    /// left untouched — they carry their own parameter slots and are
    /// applied directly against `ground` by `ProblemModification::apply`.
    pub fn effect_grounded(&self, ground: &GroundBindings) -> ProblemModification {
        self.effect.replace_arguments(ground)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fact::{Fact, FactOptional};
    use crate::ontology::{Entity, EntityOrParameter};
    use crate::wsm::Wsm;

    #[test]
    fn applicable_checks_preconditions() {
        let ontology = Ontology::new();
        let fact = Fact::new("door_open", vec![], None);
        let action = Action::new("open_door", ProblemModification::empty().with_effect(Wsm::set(fact.clone())))
            .with_preconditions(Condition::fact(FactOptional::negative(fact.clone())));
        let mut ws = WorldState::new();
        let ground = GroundBindings::new();
        assert!(action.is_applicable(&ws, &ontology, &ground));
        ws.add_fact(fact);
        assert!(!action.is_applicable(&ws, &ontology, &ground));
    }

    #[test]
    fn effect_grounded_substitutes_goal_parameter() {
        use crate::goal::Goal;
        let param = Parameter::new("who", Some("agent"));
        let fact = Fact::new("greeted", vec![EntityOrParameter::Parameter(param.clone())], None);
        let action = Action::new(
            "greet",
            ProblemModification::empty().with_goal(Goal::new(Condition::fact(FactOptional::positive(fact)))),
        )
        .with_parameter(param.clone());
        let mut ground = GroundBindings::new();
        ground.insert("who".to_string(), Entity::named("alice", "agent"));
        let grounded = action.effect_grounded(&ground);
        let goal = &grounded.goals_to_add.values().next().unwrap()[0];
        assert!(goal.objective.to_string().contains("alice"));
    }
}
