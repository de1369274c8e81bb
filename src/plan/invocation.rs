//! What the search actually hands back: a concrete action plus the
//! parameter bindings it was chosen under, and the goal/priority it was
//! chosen to advance (§4.9.1, §6).

use crate::action::ActionId;
use crate::bindings::GroundBindings;
use crate::goal::GoalId;

/// One action, fully grounded, ready to be executed or applied via
/// `Problem::notify_action_done`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActionInvocation {
    pub action_id: ActionId,
    pub parameters: GroundBindings,
}

impl ActionInvocation {
    pub fn new(action_id: impl Into<String>, parameters: GroundBindings) -> Self {
        Self {
            action_id: action_id.into(),
            parameters,
        }
    }
}

/// An `ActionInvocation` together with the goal it was picked to serve,
/// returned by `look_for_an_action_to_do` (§4.9.1).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActionChosen {
    pub invocation: ActionInvocation,
    pub goal_id: GoalId,
    pub priority: i32,
}

/// Formats a plan as `"id(p1 -> v1, p2 -> v2), id2(...)"`, joined by `sep`
/// (§6).
pub fn plan_to_str(plan: &[ActionInvocation], sep: &str) -> String {
    plan.iter().map(invocation_to_str).collect::<Vec<_>>().join(sep)
}

fn invocation_to_str(invocation: &ActionInvocation) -> String {
    if invocation.parameters.is_empty() {
        return format!("{}()", invocation.action_id);
    }
    let params = invocation
        .parameters
        .iter()
        .map(|(name, value)| format!("?{name} -> {value}"))
        .collect::<Vec<_>>()
        .join(", ");
    format!("{}({params})", invocation.action_id)
}
