//! Agents
//!
//! An [`Agent`] is a cheap handle to one agent's cognitive state. The state
//! sits behind its own async mutex, so scheduled callbacks and direct calls
//! never touch the same agent at once while different agents proceed in
//! parallel.
//!
//! The lock is only held for synchronous bookkeeping. Oracle calls happen with
//! the lock released, so a slow oracle never blocks the tick loop's access to
//! the agent.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};

use agent_model::snapshot::{AgentSnapshot, RelationshipSnapshot};
use agent_model::{
    AgentId, AgentProfile, ConversationHistory, MemoryKind, MemoryRecord, PlanRecord,
};

use crate::clock::Clock;
use crate::components::{
    MemoryStore, PendingReflection, PlanningQueue, ReflectionScheduler, RelationshipTable,
};
use crate::config::SimConfig;
use crate::error::{SimError, SimResult};
use crate::ids::IdGenerator;
use crate::oracle::OracleClient;

/// Importance of facts the oracle extracts from a conversation
pub const SEMANTIC_KNOWLEDGE_IMPORTANCE: f64 = 7.0;

/// Mutable cognitive state of one agent
#[derive(Debug)]
pub struct AgentState {
    pub memory: MemoryStore,
    pub reflection: ReflectionScheduler,
    pub plans: PlanningQueue,
    pub relationships: RelationshipTable,
}

impl AgentState {
    pub fn new(
        clock: Arc<Clock>,
        memory_ids: IdGenerator,
        plan_ids: IdGenerator,
        config: &SimConfig,
    ) -> Self {
        Self {
            memory: MemoryStore::new(clock.clone(), memory_ids),
            reflection: ReflectionScheduler::new(
                clock.clone(),
                config.reflection.interaction_threshold,
                config.reflection.max_interval_ms,
            ),
            plans: PlanningQueue::new(clock, plan_ids),
            relationships: RelationshipTable::new(),
        }
    }
}

/// Result of asking an agent to speak
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub text: String,
    /// The reflection trigger fired; the caller decides whether to run it
    pub reflection_due: bool,
}

/// Shared handle to one agent
#[derive(Debug, Clone)]
pub struct Agent {
    profile: Arc<AgentProfile>,
    state: Arc<Mutex<AgentState>>,
    oracle: OracleClient,
    retrieval_limit: usize,
    recent_memory_window: usize,
    insight_importance: f64,
}

impl Agent {
    pub fn new(profile: AgentProfile, state: AgentState, oracle: OracleClient, config: &SimConfig) -> Self {
        Self {
            profile: Arc::new(profile),
            state: Arc::new(Mutex::new(state)),
            oracle,
            retrieval_limit: config.memory.retrieval_limit,
            recent_memory_window: config.reflection.recent_memory_window,
            insight_importance: config.reflection.insight_importance,
        }
    }

    pub fn id(&self) -> &AgentId {
        &self.profile.id
    }

    pub fn profile(&self) -> &AgentProfile {
        &self.profile
    }

    /// Exclusive access to the agent's state
    pub async fn lock(&self) -> MutexGuard<'_, AgentState> {
        self.state.lock().await
    }

    /// Exclusive access if nobody else holds it right now
    pub fn try_lock(&self) -> Option<MutexGuard<'_, AgentState>> {
        self.state.try_lock().ok()
    }

    /// Produce the agent's next line in a conversation.
    ///
    /// The latest entry of `history` is remembered as an episodic memory, any
    /// fact the oracle extracts is remembered as semantic knowledge, and the
    /// utterance is generated from the most relevant memories and the active
    /// plans. Counts as one interaction toward reflection.
    pub async fn generate_utterance(&self, history: &ConversationHistory) -> Utterance {
        let query = match history.last() {
            Some(last) => {
                let content = format!("{} said: \"{}\"", last.speaker, last.text);
                let importance = self.oracle.evaluate_importance(&content).await;
                self.lock()
                    .await
                    .memory
                    .record(MemoryKind::Episodic, content, importance);

                if let Some(knowledge) = self.oracle.extract_semantic_knowledge(history).await {
                    self.lock().await.memory.record(
                        MemoryKind::Semantic,
                        knowledge,
                        SEMANTIC_KNOWLEDGE_IMPORTANCE,
                    );
                }
                last.text.clone()
            }
            None => String::new(),
        };

        let (memories, plans) = {
            let state = self.lock().await;
            (
                state.memory.retrieve_relevant(&query, self.retrieval_limit),
                state.plans.active_plans(),
            )
        };

        let text = self
            .oracle
            .generate_utterance(&self.profile, history, memories, plans)
            .await;

        let reflection_due = self.lock().await.reflection.note_interaction();
        tracing::debug!(agent_id = %self.id(), reflection_due, "agent spoke");

        Utterance { text, reflection_due }
    }

    /// Ask the oracle how to reach `goal` and queue the resulting plan
    pub async fn create_plan(&self, goal: &str) -> SimResult<PlanRecord> {
        if goal.trim().is_empty() {
            return Err(SimError::InvalidArgument("plan goal must not be empty".into()));
        }
        let steps = self.oracle.generate_plan_steps(goal).await;
        let priority = self.oracle.evaluate_priority(goal).await;
        self.lock().await.plans.add(goal, steps, priority)
    }

    pub async fn active_plans(&self) -> Vec<PlanRecord> {
        self.lock().await.plans.active_plans()
    }

    /// Re-score every active plan through the oracle. Returns how many plans
    /// were rescored.
    pub async fn reprioritize_plans(&self) -> usize {
        let active = self.active_plans().await;
        self.rescore_plans(active).await
    }

    /// Score `plans` through the oracle, then apply the scores to whichever
    /// of them are still active
    pub async fn rescore_plans(&self, plans: Vec<PlanRecord>) -> usize {
        let mut scores = HashMap::with_capacity(plans.len());
        for plan in &plans {
            let priority = self.oracle.evaluate_priority(&plan.goal).await;
            scores.insert(plan.id.clone(), priority);
        }

        // Plans added while the oracle was busy keep their own priority
        self.lock()
            .await
            .plans
            .reprioritize(|plan| scores.get(&plan.id).copied().unwrap_or(plan.priority))
    }

    /// Rate an exchange with `target_id` and fold it into the relationship.
    /// Returns the new affinity.
    pub async fn observe_interaction(&self, target_id: &AgentId, text: &str) -> SimResult<f64> {
        let quality = self.oracle.evaluate_interaction_quality(text).await;
        self.lock().await.relationships.update(target_id, quality)
    }

    /// Reflect on the most recent episodic memories and store the insights.
    /// Always resets the reflection trigger. Returns the stored insights.
    pub async fn reflect(&self) -> Vec<MemoryRecord> {
        match self.begin_reflection().await {
            Some(pending) => self.finish_reflection(pending).await,
            None => Vec::new(),
        }
    }

    /// Run a reflection queued by the engine, unless one already ran since
    pub async fn reflect_if_scheduled(&self) -> Option<Vec<MemoryRecord>> {
        let pending = self.begin_scheduled_reflection().await?;
        Some(match pending {
            Some(pending) => self.finish_reflection(pending).await,
            None => Vec::new(),
        })
    }

    /// First half of [`reflect`](Self::reflect): pick the memories to reflect
    /// on and reset the trigger. Returns `None` when there is nothing to
    /// reflect on.
    pub async fn begin_reflection(&self) -> Option<PendingReflection> {
        let mut state = self.lock().await;
        self.select_for_reflection(&mut state)
    }

    /// [`begin_reflection`](Self::begin_reflection) for a queued reflection
    /// event. The outer `None` means no event is queued any more, so the
    /// check and the reset happen under one guard.
    pub async fn begin_scheduled_reflection(&self) -> Option<Option<PendingReflection>> {
        let mut state = self.lock().await;
        state.reflection.scheduled_event()?;
        Some(self.select_for_reflection(&mut state))
    }

    fn select_for_reflection(&self, state: &mut AgentState) -> Option<PendingReflection> {
        let recent = state
            .memory
            .recent(MemoryKind::Episodic, self.recent_memory_window);
        let pending = state.reflection.run_reflection(recent);
        if pending.is_none() {
            tracing::debug!(agent_id = %self.id(), "nothing to reflect on");
        }
        pending
    }

    /// Second half of [`reflect`](Self::reflect): ask the oracle for
    /// insights and store them. Holds no lock while the oracle works.
    pub async fn finish_reflection(&self, pending: PendingReflection) -> Vec<MemoryRecord> {
        let insights = self
            .oracle
            .generate_reflection_insights(pending.memories())
            .await;

        let stored = {
            let mut state = self.lock().await;
            pending.write_insights_at(&mut state.memory, insights, self.insight_importance)
        };
        tracing::info!(agent_id = %self.id(), insights = stored.len(), "agent reflected");
        stored
    }

    pub async fn snapshot(&self) -> AgentSnapshot {
        let state = self.lock().await;
        AgentSnapshot {
            agent_id: self.id().to_string(),
            name: self.profile.full_name(),
            occupation: self.profile.occupation.clone(),
            memory_counts: state.memory.counts(),
            interaction_count: state.reflection.interaction_count(),
            last_reflection_at: state.reflection.last_reflection_time(),
            reflection_count: state.reflection.reflection_count(),
            active_plans: state.plans.active_plans(),
            relationships: state
                .relationships
                .snapshot()
                .into_iter()
                .map(|(target, score)| RelationshipSnapshot {
                    target_id: target.0,
                    score,
                })
                .collect(),
        }
    }
}
