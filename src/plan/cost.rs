//! `PlanCost`: the search's notion of "better plan", used to pick among
//! several candidate next actions when `PlannerConfig::try_to_optimise` is
//! set (§4.9.2).

use std::cmp::Ordering;

/// A non-lexicographic ranking over simulated continuations.
///
/// Ordering, from most to least significant:
/// 1. A plan that reaches a point where no further progress is possible
///    ("success") always beats one that doesn't.
/// 2. More goals satisfied is better.
/// 3. More goals *attempted but left unsatisfied* is also better — a
///    deliberate tie-break (Open Question (a)): a branch that made a
///    serious attempt at more of the priority stack, even unsuccessfully,
///    is preferred over one that narrowly closed fewer goals and stopped.
/// 4. Fewer actions is better.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlanCost {
    pub success: bool,
    pub nb_goals_satisfied: u32,
    pub nb_goals_not_satisfied: u32,
    pub nb_actions: u32,
}

impl PlanCost {
    pub fn zero() -> Self {
        Self {
            success: true,
            nb_goals_satisfied: 0,
            nb_goals_not_satisfied: 0,
            nb_actions: 0,
        }
    }
}

impl Default for PlanCost {
    fn default() -> Self {
        Self::zero()
    }
}

impl PartialOrd for PlanCost {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PlanCost {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.success, other.success) {
            (true, false) => return Ordering::Less,
            (false, true) => return Ordering::Greater,
            _ => {}
        }
        let by_satisfied = other.nb_goals_satisfied.cmp(&self.nb_goals_satisfied);
        if by_satisfied != Ordering::Equal {
            return by_satisfied;
        }
        let by_not_satisfied = other.nb_goals_not_satisfied.cmp(&self.nb_goals_not_satisfied);
        if by_not_satisfied != Ordering::Equal {
            return by_not_satisfied;
        }
        self.nb_actions.cmp(&other.nb_actions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_always_beats_failure() {
        let success = PlanCost {
            success: true,
            nb_goals_satisfied: 0,
            nb_goals_not_satisfied: 0,
            nb_actions: 100,
        };
        let failure = PlanCost {
            success: false,
            nb_goals_satisfied: 10,
            nb_goals_not_satisfied: 10,
            nb_actions: 1,
        };
        assert!(success < failure);
    }

    #[test]
    fn more_goals_satisfied_is_better() {
        let more = PlanCost {
            nb_goals_satisfied: 3,
            ..PlanCost::zero()
        };
        let fewer = PlanCost {
            nb_goals_satisfied: 1,
            ..PlanCost::zero()
        };
        assert!(more < fewer);
    }

    #[test]
    fn more_goals_attempted_but_unsatisfied_is_also_better() {
        let tried_more = PlanCost {
            nb_goals_not_satisfied: 2,
            ..PlanCost::zero()
        };
        let tried_less = PlanCost {
            nb_goals_not_satisfied: 0,
            ..PlanCost::zero()
        };
        assert!(tried_more < tried_less);
    }

    #[test]
    fn fewer_actions_wins_the_final_tiebreak() {
        let shorter = PlanCost {
            nb_actions: 1,
            ..PlanCost::zero()
        };
        let longer = PlanCost {
            nb_actions: 5,
            ..PlanCost::zero()
        };
        assert!(shorter < longer);
    }
}
