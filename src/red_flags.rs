use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::knowledge::{CanonicalSymptom, RedFlagAction, RedFlagTable};

/// Safety advisory raised for a dangerous symptom.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedFlagAlert {
    pub symptom: CanonicalSymptom,
    pub action: RedFlagAction,
}

/// Stateless red-flag lookup. Purely advisory: never blocks the triage flow.
pub struct RedFlagGuard<'a> {
    rules: &'a RedFlagTable,
}

impl<'a> RedFlagGuard<'a> {
    pub fn new(rules: &'a RedFlagTable) -> Self {
        Self { rules }
    }

    /// One alert per symptom with a rule, in set iteration order.
    pub fn check(&self, symptoms: &BTreeSet<CanonicalSymptom>) -> Vec<RedFlagAlert> {
        let alerts: Vec<RedFlagAlert> = symptoms
            .iter()
            .filter_map(|s| {
                self.rules.get(s).map(|action| RedFlagAlert {
                    symptom: s.clone(),
                    action: action.clone(),
                })
            })
            .collect();

        if !alerts.is_empty() {
            tracing::warn!(count = alerts.len(), "Red-flag symptoms present");
        }
        alerts
    }
}
