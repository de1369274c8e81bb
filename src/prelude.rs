//! Common imports for users of this crate.

pub use crate::action::{Action, ActionId};
pub use crate::bindings::{GroundBindings, ParameterBindings};
pub use crate::condition::Condition;
pub use crate::config::PlannerConfig;
pub use crate::domain::Domain;
pub use crate::error::{PlannerError, Result};
pub use crate::event::{Event, EventSet};
pub use crate::fact::{Fact, FactOptional};
pub use crate::goal::{Goal, GoalId};
pub use crate::goal_stack::GoalStack;
pub use crate::historical::Historical;
pub use crate::observer::{GoalRemovalReason, GoalsRemovedTracker, Observers};
pub use crate::ontology::{Entity, EntityOrParameter, Ontology, Parameter, Predicate, Type, TypeRegistry};
pub use crate::planner::{self, ActionChosen, ActionInvocation, PlanCost};
pub use crate::problem::{Problem, SimulatedProblem};
pub use crate::problem_modification::ProblemModification;
pub use crate::reachability::{reachable_facts, reachable_facts_with_any_value};
pub use crate::succession::{Successions, SuccessionCache};
pub use crate::world_state::WorldState;
pub use crate::wsm::{EffectKind, Wsm};
