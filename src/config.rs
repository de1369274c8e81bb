//! Explicit configuration for the planner, replacing the single process-wide
//! debug flag of the source implementation with a struct passed by the
//! caller. Nothing here is read from a global.

/// Tunables for the search, the event fixpoint, and tracing verbosity.
///
/// Constructed with sane defaults via `PlannerConfig::default()`; individual
/// fields are public so callers can override just the ones they need.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlannerConfig {
    /// Hard cap on event-fixpoint iterations (§4.7) before
    /// `PlannerError::EventDivergence` is raised.
    pub event_fixpoint_iteration_cap: u32,

    /// Hard cap on reachable-facts fixpoint iterations (§4.5).
    pub reachability_iteration_cap: u32,

    /// Whether `plan_for_more_important_goal_possible` should run the
    /// cost-comparing optimiser (§4.9.2) between candidate actions. Disabling
    /// this falls back to the cheaper `is_more_important_than` heuristic
    /// ordering only.
    pub try_to_optimise: bool,

    /// How many times the same concrete action invocation may appear inside
    /// a single recursive search branch (§4.9.3) before that branch is
    /// abandoned. The specification calls for "more than 1 aborts this
    /// branch", i.e. a repeat is allowed once.
    pub max_same_action_repeats_in_branch: u32,

    /// Heuristic cap on repeated action invocations across
    /// `plan_for_every_goals` (§4.9.3, Open Question (b)), guarding against
    /// livelock when goals can never be fully satisfied.
    pub max_action_repeats: u32,

    /// Mirrors the source's single process-wide debug flag. When set,
    /// additional `tracing::debug!`/`trace!` spans are emitted by the
    /// search and the event fixpoint.
    pub trace_enabled: bool,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            event_fixpoint_iteration_cap: 1000,
            reachability_iteration_cap: 1000,
            try_to_optimise: true,
            max_same_action_repeats_in_branch: 1,
            max_action_repeats: 10,
            trace_enabled: false,
        }
    }
}
