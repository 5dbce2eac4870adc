//! Planning Queue
//!
//! Goals ordered by priority. Among equal priorities the older goal comes
//! first, so a long-standing plan is not starved by newer ones of the same
//! weight.

use std::sync::Arc;

use agent_model::{PlanRecord, PlanStatus};

use super::clamp_score;
use crate::clock::Clock;
use crate::error::{SimError, SimResult};
use crate::ids::IdGenerator;

#[derive(Debug, Clone)]
pub struct PlanningQueue {
    clock: Arc<Clock>,
    ids: IdGenerator,
    plans: Vec<PlanRecord>,
}

impl PlanningQueue {
    pub fn new(clock: Arc<Clock>, ids: IdGenerator) -> Self {
        Self {
            clock,
            ids,
            plans: Vec::new(),
        }
    }

    /// Create an active plan. Priority outside [0, 10] is clamped.
    pub fn add(
        &mut self,
        goal: impl Into<String>,
        steps: Vec<String>,
        priority: f64,
    ) -> SimResult<PlanRecord> {
        let goal = goal.into();
        if goal.trim().is_empty() {
            return Err(SimError::InvalidArgument("plan goal must not be empty".into()));
        }

        let now = self.clock.now();
        let plan = PlanRecord {
            id: self.ids.next_id(),
            goal,
            steps,
            status: PlanStatus::Active,
            priority: clamp_score(priority),
            created_at: now,
            updated_at: now,
        };
        self.plans.push(plan.clone());
        Ok(plan)
    }

    /// Active plans, highest priority first, older first among equals
    pub fn active_plans(&self) -> Vec<PlanRecord> {
        let mut active: Vec<PlanRecord> =
            self.plans.iter().filter(|p| p.is_active()).cloned().collect();
        // Stable: equal priority and creation time keep insertion order
        active.sort_by(|a, b| {
            b.priority
                .total_cmp(&a.priority)
                .then_with(|| a.created_at.cmp(&b.created_at))
        });
        active
    }

    /// Update a plan's status. Unknown ids are ignored; returns whether a
    /// plan was updated.
    pub fn set_status(&mut self, plan_id: &str, status: PlanStatus) -> bool {
        let now = self.clock.now();
        match self.plans.iter_mut().find(|p| p.id == plan_id) {
            Some(plan) => {
                plan.status = status;
                plan.updated_at = now;
                true
            }
            None => false,
        }
    }

    /// Recompute the priority of every active plan. Identity and steps are
    /// untouched. Returns the number of plans rescored.
    pub fn reprioritize<F>(&mut self, mut new_priority: F) -> usize
    where
        F: FnMut(&PlanRecord) -> f64,
    {
        let now = self.clock.now();
        let mut updated = 0;
        for plan in self.plans.iter_mut().filter(|p| p.status == PlanStatus::Active) {
            plan.priority = clamp_score(new_priority(plan));
            plan.updated_at = now;
            updated += 1;
        }
        updated
    }

    pub fn get(&self, plan_id: &str) -> Option<PlanRecord> {
        self.plans.iter().find(|p| p.id == plan_id).cloned()
    }

    /// Every plan regardless of status, in creation order
    pub fn all(&self) -> Vec<PlanRecord> {
        self.plans.clone()
    }

    pub fn len(&self) -> usize {
        self.plans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plans.is_empty()
    }
}
