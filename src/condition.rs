//! Conditions: the tree of logical nodes evaluated against a `WorldState`
//! (§3, §4.2).

use std::collections::BTreeSet;
use std::fmt;

use crate::bindings::{narrow_candidates, record_candidate, GroundBindings, ParameterBindings};
use crate::fact::{Fact, FactOptional};
use crate::ontology::{Entity, Ontology, Parameter};
use crate::world_state::WorldState;

/// A condition tree: facts, integer literals, and the logical/arithmetic
/// connectives of §3. `Box`ed children keep the enum's size small and make
/// cloning a plain structural copy (§9 Design Notes).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Condition {
    Fact(FactOptional),
    Number(i64),
    And(Box<Condition>, Box<Condition>),
    Or(Box<Condition>, Box<Condition>),
    Not(Box<Condition>),
    Imply(Box<Condition>, Box<Condition>),
    Equals(Box<Condition>, Box<Condition>),
    Different(Box<Condition>, Box<Condition>),
    Superior(Box<Condition>, Box<Condition>),
    SuperiorOrEqual(Box<Condition>, Box<Condition>),
    Inferior(Box<Condition>, Box<Condition>),
    InferiorOrEqual(Box<Condition>, Box<Condition>),
    Plus(Box<Condition>, Box<Condition>),
    Minus(Box<Condition>, Box<Condition>),
    Exists(Parameter, Box<Condition>),
    Forall(Parameter, Box<Condition>),
}

impl Condition {
    pub fn fact(fo: FactOptional) -> Self {
        Condition::Fact(fo)
    }

    pub fn and(self, other: Condition) -> Self {
        Condition::And(Box::new(self), Box::new(other))
    }

    pub fn or(self, other: Condition) -> Self {
        Condition::Or(Box::new(self), Box::new(other))
    }

    pub fn not(self) -> Self {
        Condition::Not(Box::new(self))
    }

    pub fn imply(self, then: Condition) -> Self {
        Condition::Imply(Box::new(self), Box::new(then))
    }

    pub fn exists(param: Parameter, body: Condition) -> Self {
        Condition::Exists(param, Box::new(body))
    }

    pub fn forall(param: Parameter, body: Condition) -> Self {
        Condition::Forall(param, Box::new(body))
    }

    /// Strict evaluation against `world_state`. `parameters_out`, if
    /// supplied, accumulates the ground values each free parameter in the
    /// condition could take for the condition to hold (§4.2).
    pub fn is_true(
        &self,
        world_state: &WorldState,
        ontology: &Ontology,
        ground: &GroundBindings,
        mut parameters_out: Option<&mut ParameterBindings>,
    ) -> bool {
        self.eval(world_state, ontology, ground, false, &mut parameters_out)
    }

    /// Optimistic evaluation used by the reachable-facts closure and the
    /// search's pruning step: negative literals are treated as always
    /// satisfiable regardless of whether the fact is actually removable
    /// (§4.2, §4.5).
    pub fn can_become_true(
        &self,
        world_state: &WorldState,
        ontology: &Ontology,
        ground: &GroundBindings,
    ) -> bool {
        self.eval(world_state, ontology, ground, true, &mut None)
    }

    /// True iff at least one leaf fact-optional of this condition unifies
    /// with `fo` under the given bindings (§4.2). `unify` treats parameters
    /// in `fo` absent from `ground` as holes that may bind to anything.
    pub fn contains_fact_opt(&self, fo: &FactOptional, ground: &GroundBindings) -> bool {
        match self {
            Condition::Fact(leaf) => leaf.is_negated == fo.is_negated && facts_unify(&leaf.fact, &fo.fact, ground),
            Condition::Number(_) => false,
            Condition::And(l, r)
            | Condition::Or(l, r)
            | Condition::Imply(l, r)
            | Condition::Equals(l, r)
            | Condition::Different(l, r)
            | Condition::Superior(l, r)
            | Condition::SuperiorOrEqual(l, r)
            | Condition::Inferior(l, r)
            | Condition::InferiorOrEqual(l, r)
            | Condition::Plus(l, r)
            | Condition::Minus(l, r) => l.contains_fact_opt(fo, ground) || r.contains_fact_opt(fo, ground),
            Condition::Not(c) => c.contains_fact_opt(fo, ground),
            Condition::Exists(_, body) | Condition::Forall(_, body) => body.contains_fact_opt(fo, ground),
        }
    }

    /// Iterates every leaf fact-optional of this condition, calling `cb` on
    /// each (§4.2, used to back-derive parameter values from a candidate
    /// effect).
    pub fn for_each_leaf_fact<'a>(&'a self, cb: &mut dyn FnMut(&'a FactOptional)) {
        match self {
            Condition::Fact(fo) => cb(fo),
            Condition::Number(_) => {}
            Condition::And(l, r)
            | Condition::Or(l, r)
            | Condition::Imply(l, r)
            | Condition::Equals(l, r)
            | Condition::Different(l, r)
            | Condition::Superior(l, r)
            | Condition::SuperiorOrEqual(l, r)
            | Condition::Inferior(l, r)
            | Condition::InferiorOrEqual(l, r)
            | Condition::Plus(l, r)
            | Condition::Minus(l, r) => {
                l.for_each_leaf_fact(cb);
                r.for_each_leaf_fact(cb);
            }
            Condition::Not(c) => c.for_each_leaf_fact(cb),
            Condition::Exists(_, body) | Condition::Forall(_, body) => body.for_each_leaf_fact(cb),
        }
    }

    /// All fact-optionals appearing positively (never negated) in this
    /// condition, used by the domain to index preconditions by predicate
    /// name for the succession cache (§4.8).
    pub fn positive_leaf_predicates(&self) -> BTreeSet<String> {
        let mut result = BTreeSet::new();
        self.for_each_leaf_fact(&mut |fo| {
            if !fo.is_negated {
                result.insert(fo.fact.predicate_name.clone());
            }
        });
        result
    }

    /// All fact-optionals appearing negated in this condition, indexed the
    /// same way (§4.8).
    pub fn negative_leaf_predicates(&self) -> BTreeSet<String> {
        let mut result = BTreeSet::new();
        self.for_each_leaf_fact(&mut |fo| {
            if fo.is_negated {
                result.insert(fo.fact.predicate_name.clone());
            }
        });
        result
    }

    /// The first leaf fact-optional (left-to-right, the same order
    /// `for_each_leaf_fact` visits them) that does not currently hold under
    /// `ground`, substituting any bound parameters first. This is the single
    /// fact the search picks a next action to chase (§4.9.1).
    pub fn first_unsatisfied_leaf<'a>(&'a self, world_state: &WorldState, ground: &GroundBindings) -> Option<&'a FactOptional> {
        let mut result: Option<&'a FactOptional> = None;
        self.for_each_leaf_fact(&mut |fo| {
            if result.is_some() {
                return;
            }
            let substituted = fo.substitute(&bindings_as_parameter_map(ground));
            if !world_state.is_optional_fact_satisfied(&substituted) {
                result = Some(fo);
            }
        });
        result
    }

    fn eval(
        &self,
        world_state: &WorldState,
        ontology: &Ontology,
        ground: &GroundBindings,
        optimistic: bool,
        parameters_out: &mut Option<&mut ParameterBindings>,
    ) -> bool {
        match self {
            Condition::Fact(fo) => eval_fact(fo, world_state, ontology, ground, optimistic, parameters_out),
            Condition::Number(_) => true,
            Condition::And(l, r) => {
                l.eval(world_state, ontology, ground, optimistic, parameters_out)
                    && r.eval(world_state, ontology, ground, optimistic, parameters_out)
            }
            Condition::Or(l, r) => {
                l.eval(world_state, ontology, ground, optimistic, parameters_out)
                    || r.eval(world_state, ontology, ground, optimistic, parameters_out)
            }
            Condition::Not(c) => {
                if optimistic {
                    true
                } else {
                    !c.eval(world_state, ontology, ground, optimistic, &mut None)
                }
            }
            Condition::Imply(cond, then) => {
                if !cond.eval(world_state, ontology, ground, optimistic, &mut None) {
                    true
                } else {
                    then.eval(world_state, ontology, ground, optimistic, parameters_out)
                }
            }
            Condition::Equals(l, r) => compare(l, r, world_state, ontology, ground, |a, b| a == b),
            Condition::Different(l, r) => compare(l, r, world_state, ontology, ground, |a, b| a != b),
            Condition::Superior(l, r) => compare(l, r, world_state, ontology, ground, |a, b| a > b),
            Condition::SuperiorOrEqual(l, r) => compare(l, r, world_state, ontology, ground, |a, b| a >= b),
            Condition::Inferior(l, r) => compare(l, r, world_state, ontology, ground, |a, b| a < b),
            Condition::InferiorOrEqual(l, r) => compare(l, r, world_state, ontology, ground, |a, b| a <= b),
            Condition::Plus(_, _) | Condition::Minus(_, _) => {
                // Arithmetic reductions have no boolean truth value on their
                // own outside of a comparison; a bare Plus/Minus condition
                // is vacuously true (mirrors the source treating numeric
                // nodes as always-true when evaluated directly).
                true
            }
            Condition::Exists(param, body) => {
                let type_name = param.type_name.clone().unwrap_or_default();
                let candidates = world_state.entities_of_type(ontology, &type_name);
                let mut matched = BTreeSet::new();
                for candidate in &candidates {
                    let mut extended = ground.clone();
                    extended.insert(param.name.clone(), candidate.clone());
                    if body.eval(world_state, ontology, &extended, optimistic, &mut None) {
                        matched.insert(candidate.clone());
                    }
                }
                if !matched.is_empty() {
                    if let Some(out) = parameters_out.as_deref_mut() {
                        record_candidates(out, &param.name, &matched);
                    }
                }
                !matched.is_empty()
            }
            Condition::Forall(param, body) => {
                let type_name = param.type_name.clone().unwrap_or_default();
                let candidates = world_state.entities_of_type(ontology, &type_name);
                candidates.iter().all(|candidate| {
                    let mut extended = ground.clone();
                    extended.insert(param.name.clone(), candidate.clone());
                    body.eval(world_state, ontology, &extended, optimistic, &mut None)
                })
            }
        }
    }

    /// Reduces an arithmetic/number condition node to a concrete integer, if
    /// possible, under `ground`. Used by `Plus`/`Minus` inside comparisons,
    /// and by `Wsm::Increase`/`Wsm::Decrease` to compute their delta.
    pub(crate) fn reduce_number(
        &self,
        world_state: &WorldState,
        ontology: &Ontology,
        ground: &GroundBindings,
    ) -> Option<i64> {
        match self {
            Condition::Number(n) => Some(*n),
            Condition::Plus(l, r) => Some(
                l.reduce_number(world_state, ontology, ground)?
                    + r.reduce_number(world_state, ontology, ground)?,
            ),
            Condition::Minus(l, r) => Some(
                l.reduce_number(world_state, ontology, ground)?
                    - r.reduce_number(world_state, ontology, ground)?,
            ),
            Condition::Fact(fo) => {
                let fact = substitute_fact(&fo.fact, ground);
                world_state.fluent_value(&fact)?.as_number()
            }
            _ => None,
        }
    }

    /// Reduces a fact/number condition node to the `Entity` it denotes
    /// (either the fluent value of a ground fact, or a numeric literal),
    /// used by equality/inequality comparisons that are not purely numeric.
    pub(crate) fn reduce_entity(
        &self,
        world_state: &WorldState,
        ontology: &Ontology,
        ground: &GroundBindings,
    ) -> Option<Entity> {
        match self {
            Condition::Number(n) => Some(Entity::number(*n)),
            Condition::Fact(fo) => {
                let fact = substitute_fact(&fo.fact, ground);
                if fact.fluent.is_some() {
                    world_state.fluent_value(&fact)
                } else {
                    Some(Entity::named(
                        if world_state.has_ground_fact(&fact) {
                            "true"
                        } else {
                            "false"
                        },
                        "bool",
                    ))
                }
            }
            other => other
                .reduce_number(world_state, ontology, ground)
                .map(Entity::number),
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Fact(fo) => write!(f, "{fo}"),
            Condition::Number(n) => write!(f, "{n}"),
            Condition::And(l, r) => write!(f, "({l} & {r})"),
            Condition::Or(l, r) => write!(f, "({l} | {r})"),
            Condition::Not(c) => write!(f, "!{c}"),
            Condition::Imply(l, r) => write!(f, "({l} => {r})"),
            Condition::Equals(l, r) => write!(f, "({l} == {r})"),
            Condition::Different(l, r) => write!(f, "({l} != {r})"),
            Condition::Superior(l, r) => write!(f, "({l} > {r})"),
            Condition::SuperiorOrEqual(l, r) => write!(f, "({l} >= {r})"),
            Condition::Inferior(l, r) => write!(f, "({l} < {r})"),
            Condition::InferiorOrEqual(l, r) => write!(f, "({l} <= {r})"),
            Condition::Plus(l, r) => write!(f, "({l} + {r})"),
            Condition::Minus(l, r) => write!(f, "({l} - {r})"),
            Condition::Exists(p, body) => write!(f, "exists({p}, {body})"),
            Condition::Forall(p, body) => write!(f, "forall({p}, {body})"),
        }
    }
}

fn record_candidates(out: &mut ParameterBindings, name: &str, values: &BTreeSet<Entity>) {
    narrow_candidates(out, name, values);
}

fn compare(
    l: &Condition,
    r: &Condition,
    world_state: &WorldState,
    ontology: &Ontology,
    ground: &GroundBindings,
    op: impl Fn(&Entity, &Entity) -> bool,
) -> bool {
    match (
        l.reduce_entity(world_state, ontology, ground),
        r.reduce_entity(world_state, ontology, ground),
    ) {
        (Some(a), Some(b)) => op(&a, &b),
        // A missing fluent on the left compared to a literal is false (§4.2).
        _ => false,
    }
}

fn substitute_fact(fact: &Fact, ground: &GroundBindings) -> Fact {
    fact.substitute(&bindings_as_parameter_map(ground))
}

fn bindings_as_parameter_map(ground: &GroundBindings) -> std::collections::BTreeMap<Parameter, Entity> {
    ground
        .iter()
        .map(|(name, entity)| (Parameter::untyped(name.clone()), entity.clone()))
        .collect()
}

fn eval_fact(
    fo: &FactOptional,
    world_state: &WorldState,
    ontology: &Ontology,
    ground: &GroundBindings,
    optimistic: bool,
    parameters_out: &mut Option<&mut ParameterBindings>,
) -> bool {
    let substituted = substitute_fact(&fo.fact, ground);
    if substituted.is_ground() {
        let satisfied = world_state.is_optional_fact_satisfied(&FactOptional {
            fact: substituted,
            is_negated: fo.is_negated,
        });
        return satisfied || (optimistic && fo.is_negated);
    }

    // Free parameters remain: resolve existentially against the world,
    // exactly as EXISTS would, and report the candidate bindings found.
    let free_params = substituted.parameters();
    if fo.is_negated {
        // Negative pattern with free parameters: true if some assignment
        // from the type-appropriate universe makes the fact absent.
        let mut any_match = false;
        let mut per_param: Vec<BTreeSet<Entity>> = Vec::new();
        for param in &free_params {
            let type_name = param.type_name.clone().unwrap_or_default();
            per_param.push(world_state.entities_of_type(ontology, &type_name));
        }
        for combo in cartesian(&per_param) {
            let mut extended = ground.clone();
            for (param, value) in free_params.iter().zip(combo.iter()) {
                extended.insert(param.name.clone(), value.clone());
            }
            let candidate = substitute_fact(&substituted, &extended);
            if !world_state.has_ground_fact(&candidate) {
                any_match = true;
                if let Some(out) = parameters_out.as_deref_mut() {
                    for (param, value) in free_params.iter().zip(combo.iter()) {
                        record_candidate(out, &param.name, value.clone());
                    }
                }
            }
        }
        any_match || optimistic
    } else {
        let matches = world_state.match_pattern(&substituted);
        if matches.is_empty() {
            return false;
        }
        if let Some(out) = parameters_out.as_deref_mut() {
            for found in &matches {
                for param in &free_params {
                    if let Some(value) = extract_value_for_param(&substituted, found, param) {
                        record_candidate(out, &param.name, value);
                    }
                }
            }
        }
        true
    }
}

fn extract_value_for_param(pattern: &Fact, ground_fact: &Fact, param: &Parameter) -> Option<Entity> {
    use crate::ontology::EntityOrParameter;
    for (slot, value) in pattern.args.iter().zip(&ground_fact.args) {
        if let EntityOrParameter::Parameter(p) = slot {
            if p == param {
                return value.as_entity().cloned();
            }
        }
    }
    if let (Some(EntityOrParameter::Parameter(p)), Some(value)) = (&pattern.fluent, &ground_fact.fluent) {
        if p == param {
            return value.as_entity().cloned();
        }
    }
    None
}

fn cartesian(sets: &[BTreeSet<Entity>]) -> Vec<Vec<Entity>> {
    let mut result: Vec<Vec<Entity>> = vec![Vec::new()];
    for set in sets {
        let mut next = Vec::new();
        for prefix in &result {
            for value in set {
                let mut extended = prefix.clone();
                extended.push(value.clone());
                next.push(extended);
            }
        }
        result = next;
    }
    result
}

/// Unification used by `contains_fact_opt`: `pattern` unifies with `target`
/// if, treating parameters not present in `ground` as holes, their predicate
/// names match and every ground slot is compatible.
fn facts_unify(pattern: &Fact, target: &Fact, ground: &GroundBindings) -> bool {
    use crate::ontology::EntityOrParameter;
    if pattern.predicate_name != target.predicate_name || pattern.args.len() != target.args.len() {
        return false;
    }
    let slot_compatible = |p: &EntityOrParameter, t: &EntityOrParameter| -> bool {
        match (p, t) {
            (EntityOrParameter::Entity(pe), EntityOrParameter::Entity(te)) => pe.matches(te),
            (EntityOrParameter::Parameter(pp), EntityOrParameter::Entity(te)) => {
                ground.get(&pp.name).is_none_or(|bound| bound == te)
            }
            (EntityOrParameter::Entity(_), EntityOrParameter::Parameter(_)) => true,
            (EntityOrParameter::Parameter(_), EntityOrParameter::Parameter(_)) => true,
        }
    };
    pattern
        .args
        .iter()
        .zip(&target.args)
        .all(|(p, t)| slot_compatible(p, t))
        && match (&pattern.fluent, &target.fluent) {
            (Some(p), Some(t)) => slot_compatible(p, t),
            (None, None) => true,
            _ => false,
        }
}
