use std::collections::BTreeMap;

use crate::error::{PlannerError, Result};

/// The name of a declared type, unique within an `Ontology`.
pub type TypeName = String;

/// A type in the ontology's subtype hierarchy.
///
/// `number` is always implicitly present (it is the type of fluent values
/// produced by `Predicate`s with a numeric `fluentType`, and of integer
/// literals in `Condition`/`Wsm` expressions); callers never need to declare
/// it explicitly.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Type {
    pub name: TypeName,
    pub supertype: Option<TypeName>,
}

impl Type {
    pub fn new(name: impl Into<String>, supertype: Option<impl Into<String>>) -> Self {
        Self {
            name: name.into(),
            supertype: supertype.map(Into::into),
        }
    }

    pub fn root(name: impl Into<String>) -> Self {
        Self::new(name, None::<String>)
    }
}

/// Registry of declared `Type`s plus the subtype relation derived from them.
///
/// Subtyping is reflexive and transitive: `a.is_assignable_from(a)` is always
/// true, and if `b`'s supertype chain reaches `a`, `a.is_assignable_from(b)`
/// is true.
#[derive(Clone, Debug, Default)]
pub struct TypeRegistry {
    types: BTreeMap<TypeName, Type>,
}

/// The builtin type backing numeric literals and fluent values.
pub const NUMBER_TYPE: &str = "number";

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a type. Fails with `UnknownSymbol` if its supertype has not
    /// been declared yet, and with `InvalidDomain` on a duplicate name
    /// (naming must be unique, per §3).
    pub fn declare(&mut self, ty: Type) -> Result<()> {
        if self.types.contains_key(&ty.name) || ty.name == NUMBER_TYPE {
            return Err(PlannerError::InvalidDomain(format!(
                "duplicate type declaration: {}",
                ty.name
            )));
        }
        if let Some(super_name) = &ty.supertype {
            if super_name != NUMBER_TYPE && !self.types.contains_key(super_name) {
                return Err(PlannerError::UnknownSymbol(super_name.clone()));
            }
        }
        self.types.insert(ty.name.clone(), ty);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Type> {
        self.types.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        name == NUMBER_TYPE || self.types.contains_key(name)
    }

    /// True if `other` equals `name` or is a (transitive) descendant of it.
    pub fn is_assignable_from(&self, name: &str, other: &str) -> bool {
        if name == other {
            return true;
        }
        let mut current = other;
        while let Some(ty) = self.types.get(current) {
            match &ty.supertype {
                Some(super_name) if super_name == name => return true,
                Some(super_name) => current = super_name,
                None => return false,
            }
        }
        false
    }
}
