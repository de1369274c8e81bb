//! Error taxonomy for the planner core.
//!
//! Construction functions (`Domain::new`, `Fact::new_checked`, ...) surface
//! these to callers. Planning functions never return `Err` — a failure to
//! find a plan is an empty result, not an error (see `planner`).

/// Errors that can occur while building or validating planner data.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PlannerError {
    /// An expression could not be parsed. Reserved for callers that plug in
    /// their own textual front end; the core never produces this itself.
    #[error("parse error at position {position}: {excerpt}")]
    ParseError {
        /// Byte offset into the source text where parsing failed.
        position: usize,
        /// A short excerpt of the offending text.
        excerpt: String,
    },

    /// A type, predicate, entity or parameter name was referenced but never
    /// declared.
    #[error("unknown symbol: {0}")]
    UnknownSymbol(String),

    /// An argument (or fluent) does not satisfy a predicate's declared
    /// parameter types.
    #[error("type mismatch for predicate {predicate} at position {position}")]
    TypeMismatch {
        /// Name of the offending predicate.
        predicate: String,
        /// Index of the offending argument (or `usize::MAX` for the fluent).
        position: usize,
    },

    /// An action was rejected at domain-construction time: either its effect
    /// is empty and it pushes no goals, or its id collides with one already
    /// present.
    #[error("invalid domain: {0}")]
    InvalidDomain(String),

    /// The event fixpoint (§4.7) did not stabilize within
    /// `PlannerConfig::event_fixpoint_iteration_cap` iterations.
    #[error("event fixpoint did not converge after {iterations} iterations")]
    EventDivergence {
        /// Number of fixpoint iterations attempted before giving up.
        iterations: u32,
    },

    /// An invariant that should be unreachable was violated. Any test that
    /// observes this variant is a bug in the planner, not in the caller.
    #[error("internal planner invariant violated: {0}")]
    PlannerInternal(String),
}

/// Convenience alias used throughout the crate's construction-time APIs.
pub type Result<T> = std::result::Result<T, PlannerError>;
