//! The dynamic parameter map used while resolving conditions and effects.
//!
//! The source represents under-constrained parameter values as
//! `map<string, set<string>>`; we keep the same semantic (a growing set of
//! candidate values per parameter name) but key by typed `Entity` rather than
//! string, so a type mismatch is a compile-time impossibility rather than a
//! runtime string comparison (§9 Design Notes).

use std::collections::{BTreeMap, BTreeSet};

use crate::ontology::Entity;

/// `parameter name -> set of ground values it could still take`.
pub type ParameterBindings = BTreeMap<String, BTreeSet<Entity>>;

/// Records a candidate value for a parameter, creating the entry if absent.
pub fn record_candidate(bindings: &mut ParameterBindings, name: &str, value: Entity) {
    bindings.entry(name.to_string()).or_default().insert(value);
}

/// Intersects the candidate set for `name` with `values`, narrowing what the
/// parameter may still resolve to. If `name` has no prior entry, `values` is
/// adopted outright.
pub fn narrow_candidates(bindings: &mut ParameterBindings, name: &str, values: &BTreeSet<Entity>) {
    match bindings.get_mut(name) {
        Some(existing) => existing.retain(|v| values.contains(v)),
        None => {
            bindings.insert(name.to_string(), values.clone());
        }
    }
}

/// A single concrete choice out of a `ParameterBindings`, used once the
/// search has committed to specific values (e.g. to apply an effect).
pub type GroundBindings = BTreeMap<String, Entity>;

/// Picks one arbitrary concrete value per parameter (the least, by `Ord`, for
/// determinism) out of a `ParameterBindings`. Returns `None` if any parameter
/// has no candidate left.
pub fn pick_one(bindings: &ParameterBindings) -> Option<GroundBindings> {
    let mut result = GroundBindings::new();
    for (name, values) in bindings {
        let chosen = values.iter().next()?;
        result.insert(name.clone(), chosen.clone());
    }
    Some(result)
}
