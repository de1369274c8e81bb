//! The planner core (§4.9, §6): candidate selection, plan construction, and
//! the types a caller gets back from it. Exposed at the crate root as
//! `planner`.

pub mod cost;
pub mod invocation;
pub mod search;

pub use cost::PlanCost;
pub use invocation::{plan_to_str, ActionChosen, ActionInvocation};
pub use search::{actions_to_do_in_parallel_now, look_for_an_action_to_do, notify_action_done, notify_action_started, plan_for_every_goals, plan_for_more_important_goal_possible};
