use std::collections::HashSet;

use super::journal::ResourceKind;
use crate::error::Step;

/// Failures the loopback transport injects on demand.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FaultPlan {
    /// Acquisition steps that fail every time until cleared.
    pub failing_steps: HashSet<Step>,
    pub reject_writes: bool,
    pub fail_reads: bool,
    /// Resource kinds whose destroy call fails (the resource stays live).
    pub failing_destroys: HashSet<ResourceKind>,
}

impl FaultPlan {
    pub fn fails(&self, step: Step) -> bool {
        self.failing_steps.contains(&step)
    }

    pub fn fails_destroy(&self, kind: ResourceKind) -> bool {
        self.failing_destroys.contains(&kind)
    }

    pub fn is_empty(&self) -> bool {
        *self == FaultPlan::default()
    }
}
