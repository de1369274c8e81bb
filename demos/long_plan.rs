//! A plan that takes several steps to reach its goal, exercising the
//! cost-optimising search over a handful of candidate actions per goal.

use std::rc::Rc;

use contextual_planner::prelude::*;

fn fluent_fact(name: &str) -> Fact {
    Fact::new(name, vec![], Some(EntityOrParameter::Entity(Entity::any_value())))
}

fn fluent_at_least(name: &str, minimum: i64) -> Condition {
    Condition::SuperiorOrEqual(
        Box::new(Condition::fact(FactOptional::positive(fluent_fact(name)))),
        Box::new(Condition::Number(minimum)),
    )
}

fn fluent_at_most(name: &str, maximum: i64) -> Condition {
    Condition::InferiorOrEqual(
        Box::new(Condition::fact(FactOptional::positive(fluent_fact(name)))),
        Box::new(Condition::Number(maximum)),
    )
}

fn main() {
    let mut domain = Domain::new(Ontology::new());

    domain
        .add_action(Action::new(
            "sleep",
            ProblemModification::empty().with_effect(Wsm::Increase(fluent_fact("energy"), Box::new(Condition::Number(10)))),
        ))
        .unwrap();

    domain
        .add_action(
            Action::new(
                "eat",
                ProblemModification::empty().with_effect(Wsm::Decrease(fluent_fact("hunger"), Box::new(Condition::Number(10)))),
            )
            .with_preconditions(fluent_at_least("energy", 26)),
        )
        .unwrap();

    domain
        .add_action(
            Action::new(
                "rob",
                ProblemModification::empty().with_effect(
                    Wsm::Increase(fluent_fact("gold"), Box::new(Condition::Number(1)))
                        .and(Wsm::Decrease(fluent_fact("energy"), Box::new(Condition::Number(5))))
                        .and(Wsm::Increase(fluent_fact("hunger"), Box::new(Condition::Number(5)))),
                ),
            )
            .with_preconditions(fluent_at_most("hunger", 50).and(fluent_at_least("energy", 50))),
        )
        .unwrap();

    let mut problem = Problem::new(Rc::new(domain));
    problem.add_fact(with_value(fluent_fact("energy"), 30));
    problem.add_fact(with_value(fluent_fact("hunger"), 70));
    problem.add_fact(with_value(fluent_fact("gold"), 0));
    problem.push_goal(
        Goal::new(Condition::Equals(
            Box::new(Condition::fact(FactOptional::positive(fluent_fact("gold")))),
            Box::new(Condition::Number(7)),
        )),
        None,
    );

    let config = PlannerConfig::default();
    let plan = planner::plan_for_every_goals(&problem, problem.domain(), &config, None, None);
    println!("{}", planner::plan_to_str(&plan, ", "));
}

fn with_value(mut fact: Fact, value: i64) -> Fact {
    fact.fluent = Some(EntityOrParameter::Entity(Entity::number(value)));
    fact
}
