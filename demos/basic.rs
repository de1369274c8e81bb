//! A minimal domain: get fed.

use std::rc::Rc;

use contextual_planner::prelude::*;

fn fact(name: &str) -> Fact {
    Fact::new(name, vec![], None)
}

fn main() {
    let mut domain = Domain::new(Ontology::new());

    domain
        .add_action(Action::new(
            "buy_food",
            ProblemModification::empty().with_effect(Wsm::set(fact("has_food"))),
        ))
        .unwrap();

    domain
        .add_action(
            Action::new(
                "eat",
                ProblemModification::empty()
                    .with_effect(Wsm::unset(fact("is_hungry")).and(Wsm::unset(fact("has_food")))),
            )
            .with_preconditions(Condition::fact(FactOptional::positive(fact("has_food")))),
        )
        .unwrap();

    let mut problem = Problem::new(Rc::new(domain));
    problem.add_fact(fact("is_hungry"));
    problem.push_goal(
        Goal::new(Condition::fact(FactOptional::negative(fact("is_hungry")))),
        None,
    );

    let config = PlannerConfig::default();
    let plan = planner::plan_for_every_goals(&problem, problem.domain(), &config, None, None);
    println!("{}", planner::plan_to_str(&plan, ", "));
}
