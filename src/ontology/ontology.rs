use std::collections::BTreeMap;

use super::entity::Entity;
use super::predicate::{EntityOrParameter, Parameter, Predicate};
use super::types::{Type, TypeRegistry};
use crate::error::{PlannerError, Result};

/// Registry of `Type`s, ontology-scoped constant `Entity`s and `Predicate`
/// signatures shared by a `Domain` and every `Problem` built against it.
///
/// Problem-scoped entities (declared per-problem rather than per-domain) are
/// *not* stored here; see `Problem::entities`. `entity_from_usage` accepts
/// both so a single resolution path covers constants declared at either
/// level.
#[derive(Clone, Debug, Default)]
pub struct Ontology {
    pub(crate) types: TypeRegistry,
    constants: BTreeMap<String, Entity>,
    predicates: BTreeMap<String, Predicate>,
}

impl Ontology {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declare_type(&mut self, ty: Type) -> Result<()> {
        self.types.declare(ty)
    }

    pub fn types(&self) -> &TypeRegistry {
        &self.types
    }

    /// Declares a named constant entity, resolvable by `entity_from_usage`
    /// wherever that name appears as a token.
    pub fn declare_constant(&mut self, name: impl Into<String>, type_name: impl Into<String>) -> Result<()> {
        let name = name.into();
        let type_name = type_name.into();
        if !self.types.contains(&type_name) {
            return Err(PlannerError::UnknownSymbol(type_name));
        }
        if self.constants.contains_key(&name) {
            return Err(PlannerError::InvalidDomain(format!(
                "duplicate constant declaration: {name}"
            )));
        }
        self.constants.insert(name.clone(), Entity::named(name, type_name));
        Ok(())
    }

    pub fn constant(&self, name: &str) -> Option<&Entity> {
        self.constants.get(name)
    }

    /// All ontology-scoped constant entities, used by `WorldState::entities_of_type`
    /// to extend EXISTS/FORALL's universe beyond whatever currently appears in facts.
    pub fn constants(&self) -> impl Iterator<Item = &Entity> {
        self.constants.values()
    }

    pub fn declare_predicate(&mut self, predicate: Predicate) -> Result<()> {
        if self.predicates.contains_key(&predicate.name) {
            return Err(PlannerError::InvalidDomain(format!(
                "duplicate predicate declaration: {}",
                predicate.name
            )));
        }
        if let Some(fluent_type) = &predicate.fluent_type {
            if !self.types.contains(fluent_type) {
                return Err(PlannerError::UnknownSymbol(fluent_type.clone()));
            }
        }
        for param_type in &predicate.parameter_types {
            if !self.types.contains(param_type) {
                return Err(PlannerError::UnknownSymbol(param_type.clone()));
            }
        }
        self.predicates.insert(predicate.name.clone(), predicate);
        Ok(())
    }

    pub fn predicate(&self, name: &str) -> Option<&Predicate> {
        self.predicates.get(name)
    }

    pub fn predicates(&self) -> impl Iterator<Item = &Predicate> {
        self.predicates.values()
    }

    /// Resolves a textual token as: a constant entity, a problem entity, a
    /// parameter already in scope, or an integer literal. Fails with
    /// `UnknownSymbol` if none match (§4.1).
    pub fn entity_from_usage(
        &self,
        name: &str,
        problem_entities: &BTreeMap<String, Entity>,
        params_in_scope: &[Parameter],
    ) -> Result<EntityOrParameter> {
        if let Ok(n) = name.parse::<i64>() {
            return Ok(EntityOrParameter::Entity(Entity::number(n)));
        }
        if let Some(constant) = self.constants.get(name) {
            return Ok(EntityOrParameter::Entity(constant.clone()));
        }
        if let Some(entity) = problem_entities.get(name) {
            return Ok(EntityOrParameter::Entity(entity.clone()));
        }
        if let Some(param) = params_in_scope.iter().find(|p| p.name == name) {
            return Ok(EntityOrParameter::Parameter(param.clone()));
        }
        Err(PlannerError::UnknownSymbol(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_constants_params_and_literals() {
        let mut ontology = Ontology::new();
        ontology.declare_type(Type::root("type1")).unwrap();
        ontology.declare_constant("toto", "type1").unwrap();
        let params = vec![Parameter::new("p", Some("type1"))];
        let problem_entities = BTreeMap::new();

        assert!(matches!(
            ontology.entity_from_usage("toto", &problem_entities, &params),
            Ok(EntityOrParameter::Entity(_))
        ));
        assert!(matches!(
            ontology.entity_from_usage("p", &problem_entities, &params),
            Ok(EntityOrParameter::Parameter(_))
        ));
        assert!(matches!(
            ontology.entity_from_usage("42", &problem_entities, &params),
            Ok(EntityOrParameter::Entity(Entity::Number(42)))
        ));
        assert!(matches!(
            ontology.entity_from_usage("unknown", &problem_entities, &params),
            Err(PlannerError::UnknownSymbol(_))
        ));
    }
}
