use std::fmt;

use super::entity::Entity;
use super::ontology::Ontology;
use super::types::TypeName;

/// A formal parameter: a name with an optional declared type.
///
/// Parameters are *formal*; an `Entity` is *actual*. A parameter with no
/// declared type is admissible against any argument position.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Parameter {
    pub name: String,
    pub type_name: Option<TypeName>,
}

impl Parameter {
    pub fn new(name: impl Into<String>, type_name: Option<impl Into<String>>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.map(Into::into),
        }
    }

    pub fn untyped(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: None,
        }
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "?{}", self.name)
    }
}

/// Either a formal `Parameter` or an actual `Entity`, used in the slots of a
/// `Fact` (args and the optional fluent).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EntityOrParameter {
    Entity(Entity),
    Parameter(Parameter),
}

impl EntityOrParameter {
    pub fn is_ground(&self) -> bool {
        matches!(self, EntityOrParameter::Entity(_))
    }

    pub fn as_entity(&self) -> Option<&Entity> {
        match self {
            EntityOrParameter::Entity(e) => Some(e),
            EntityOrParameter::Parameter(_) => None,
        }
    }

    pub fn as_parameter(&self) -> Option<&Parameter> {
        match self {
            EntityOrParameter::Parameter(p) => Some(p),
            EntityOrParameter::Entity(_) => None,
        }
    }
}

impl fmt::Display for EntityOrParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityOrParameter::Entity(e) => write!(f, "{e}"),
            EntityOrParameter::Parameter(p) => write!(f, "{p}"),
        }
    }
}

impl From<Entity> for EntityOrParameter {
    fn from(value: Entity) -> Self {
        EntityOrParameter::Entity(value)
    }
}

impl From<Parameter> for EntityOrParameter {
    fn from(value: Parameter) -> Self {
        EntityOrParameter::Parameter(value)
    }
}

/// The signature of a predicate: its parameter types and optional fluent
/// return type.
///
/// A predicate with `fluent_type = Some(NUMBER_TYPE)` defines a numeric
/// function; one with `fluent_type = Some(other)` defines an
/// enumerated-valued function; one with `fluent_type = None` is a boolean
/// relation whose presence as a ground fact *is* its truth value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Predicate {
    pub name: String,
    pub parameter_types: Vec<TypeName>,
    pub fluent_type: Option<TypeName>,
}

impl Predicate {
    pub fn new(name: impl Into<String>, parameter_types: Vec<TypeName>) -> Self {
        Self {
            name: name.into(),
            parameter_types,
            fluent_type: None,
        }
    }

    pub fn with_fluent(mut self, fluent_type: impl Into<TypeName>) -> Self {
        self.fluent_type = Some(fluent_type.into());
        self
    }

    /// Position-wise subtype check: every argument's type (if ground) must
    /// be admissible for the corresponding parameter slot, and the fluent
    /// (if any) must be admissible for `fluent_type`.
    pub fn admits(
        &self,
        args: &[EntityOrParameter],
        fluent: Option<&EntityOrParameter>,
        ontology: &Ontology,
    ) -> bool {
        if args.len() != self.parameter_types.len() {
            return false;
        }
        for (arg, expected_type) in args.iter().zip(&self.parameter_types) {
            if let Some(entity) = arg.as_entity() {
                if entity.is_any_value() {
                    continue;
                }
                if !ontology
                    .types
                    .is_assignable_from(expected_type, entity.type_name())
                {
                    return false;
                }
            }
        }
        match (&self.fluent_type, fluent) {
            (None, None) => true,
            (None, Some(_)) => false,
            (Some(_), None) => true,
            (Some(expected), Some(value)) => match value.as_entity() {
                Some(entity) if !entity.is_any_value() => {
                    ontology.types.is_assignable_from(expected, entity.type_name())
                }
                _ => true,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ontology::types::Type;

    fn ontology_with_type1() -> Ontology {
        let mut o = Ontology::new();
        o.declare_type(Type::root("type1")).unwrap();
        o
    }

    #[test]
    fn admits_ground_args_of_right_type() {
        let ontology = ontology_with_type1();
        let pred = Predicate::new("pred_a", vec!["type1".to_string()]);
        let args = vec![EntityOrParameter::Entity(Entity::named("toto", "type1"))];
        assert!(pred.admits(&args, None, &ontology));
    }

    #[test]
    fn rejects_wrong_arity() {
        let ontology = ontology_with_type1();
        let pred = Predicate::new("pred_a", vec!["type1".to_string()]);
        assert!(!pred.admits(&[], None, &ontology));
    }

    #[test]
    fn rejects_fluent_on_non_fluent_predicate() {
        let ontology = ontology_with_type1();
        let pred = Predicate::new("pred_a", vec![]);
        let fluent = EntityOrParameter::Entity(Entity::number(1));
        assert!(!pred.admits(&[], Some(&fluent), &ontology));
    }
}
