//! Generated critic rules.
//!
//! Each `when` is a boolean expression over run-context references and
//! `result`. Severity `Error` aborts the run; `Warn` logs and continues.

use routine_runtime::prelude::*;

/// Rules extracted from the planner's critic agents.
pub fn rules() -> Vec<CriticRule> {
    vec![
        CriticRule::new("rule-1", "Bid cap")
            .when("result.delta > 25")
            .severity(Severity::Error)
            .action("halt"),
        CriticRule::new("rule-2", "Delta noted")
            .when("result.delta > 5")
            .action("review"),
    ]
}

pub fn critic_set() -> CriticSet {
    CriticSet::new(rules())
}
