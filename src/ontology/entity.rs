use std::fmt;

use super::types::{TypeName, NUMBER_TYPE};

/// A ground value: a named constant of a declared type, an integer literal,
/// or the reserved *any-value* wildcard used only during pattern comparisons.
///
/// `Entity` never appears partially bound — a `Fact` slot holding an `Entity`
/// is ground by definition; unresolved slots are represented by `Parameter`
/// (see `crate::ontology::predicate::Parameter`) one level up, in `Fact`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Entity {
    /// A named constant of some declared type (a problem entity or an
    /// ontology-scoped constant).
    Named { name: String, type_name: TypeName },
    /// An integer literal; its type is always `number`.
    Number(i64),
    /// The wildcard `*`, matching any ground value in pattern comparisons.
    /// Never valid as the value actually stored for a fact.
    AnyValue,
}

impl Entity {
    pub fn named(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Entity::Named {
            name: name.into(),
            type_name: type_name.into(),
        }
    }

    pub fn number(value: i64) -> Self {
        Entity::Number(value)
    }

    pub fn any_value() -> Self {
        Entity::AnyValue
    }

    pub fn is_any_value(&self) -> bool {
        matches!(self, Entity::AnyValue)
    }

    pub fn type_name(&self) -> &str {
        match self {
            Entity::Named { type_name, .. } => type_name,
            Entity::Number(_) => NUMBER_TYPE,
            Entity::AnyValue => "*",
        }
    }

    /// The integer this entity carries, if it is a number.
    pub fn as_number(&self) -> Option<i64> {
        match self {
            Entity::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Equality that treats `AnyValue` as matching anything, used when
    /// comparing a pattern fact against a ground fact.
    pub fn matches(&self, other: &Entity) -> bool {
        if self.is_any_value() || other.is_any_value() {
            return true;
        }
        self == other
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entity::Named { name, .. } => write!(f, "{name}"),
            Entity::Number(n) => write!(f, "{n}"),
            Entity::AnyValue => write!(f, "*"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn any_value_matches_everything() {
        let toto = Entity::named("toto", "type1");
        assert!(Entity::any_value().matches(&toto));
        assert!(toto.matches(&Entity::any_value()));
        assert!(!toto.matches(&Entity::named("titi", "type1")));
    }

    #[test]
    fn number_type_name_is_builtin() {
        assert_eq!(Entity::number(3).type_name(), NUMBER_TYPE);
    }
}
