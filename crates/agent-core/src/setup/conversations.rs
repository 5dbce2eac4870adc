//! Conversation Seeding
//!
//! Schedules chance encounters between random pairs of agents. When one
//! fires, the speaker opens with a line, the listener replies through the
//! engine, and both sides rate the exchange. The exchange itself runs as
//! background work, since every step waits on the oracle.

use rand::rngs::SmallRng;
use rand::Rng;
use std::sync::{Arc, Weak};

use agent_model::{AgentId, ConversationEntry};

use crate::engine::SimulationEngine;
use crate::error::{EventError, SimResult};
use crate::events::{callback, kinds, EventId};

const OPENERS: &[&str] = &[
    "Hi! How are you today?",
    "Hello there, have we met before?",
    "Did you hear the cafe is closing early this week?",
    "I need to remember to water the plants, it is important.",
    "The park was lovely this morning.",
    "Thanks for your help yesterday, it was great.",
    "What are you working on these days?",
    "I think the new schedule is confusing and wrong.",
];

/// Schedule `count` conversations at random points within `horizon_ms` of
/// virtual time. Needs at least two registered agents; returns the event ids.
pub fn schedule_conversations(
    engine: &Arc<SimulationEngine>,
    count: usize,
    horizon_ms: u64,
    rng: &mut SmallRng,
) -> SimResult<Vec<EventId>> {
    let agents: Vec<AgentId> = engine.all_agents().iter().map(|a| a.id().clone()).collect();
    if agents.len() < 2 {
        return Ok(Vec::new());
    }

    let mut ids = Vec::with_capacity(count);
    for _ in 0..count {
        let speaker = rng.gen_range(0..agents.len());
        // Offset by 1..len so the listener is never the speaker
        let listener = (speaker + rng.gen_range(1..agents.len())) % agents.len();
        let opener = OPENERS[rng.gen_range(0..OPENERS.len())];
        let delay = rng.gen_range(0..horizon_ms.max(1));

        let id = schedule_conversation(
            engine,
            agents[speaker].clone(),
            agents[listener].clone(),
            opener.to_string(),
            i64::try_from(delay).unwrap_or(i64::MAX),
        )?;
        ids.push(id);
    }
    Ok(ids)
}

/// Schedule one exchange where `speaker` opens with `opener`
pub fn schedule_conversation(
    engine: &Arc<SimulationEngine>,
    speaker: AgentId,
    listener: AgentId,
    opener: String,
    delay_ms: i64,
) -> SimResult<EventId> {
    let payload = serde_json::json!({
        "speaker": speaker,
        "listener": listener,
        "opener": opener,
    });
    // Weak: the engine owns the queue that owns this callback
    let engine_ref: Weak<SimulationEngine> = Arc::downgrade(engine);

    engine.schedule(
        kinds::CONVERSATION,
        delay_ms,
        payload,
        callback(move |_payload| async move {
            let Some(engine) = engine_ref.upgrade() else {
                return Ok(());
            };
            // Unknown agents fail the event itself
            for id in [&speaker, &listener] {
                engine
                    .agent_or_err(id)
                    .map_err(|e| EventError::failed(e.to_string()))?;
            }
            engine.spawn_background(kinds::CONVERSATION, async move {
                let Some(engine) = engine_ref.upgrade() else {
                    return Ok(());
                };
                run_conversation(&engine, &speaker, &listener, &opener).await
            })
        }),
    )
}

async fn run_conversation(
    engine: &SimulationEngine,
    speaker_id: &AgentId,
    listener_id: &AgentId,
    opener: &str,
) -> Result<(), EventError> {
    let speaker = engine
        .agent_or_err(speaker_id)
        .map_err(|e| EventError::failed(e.to_string()))?;

    let history = vec![ConversationEntry::new(speaker.profile().full_name(), opener)];
    let reply = engine
        .converse(listener_id, &history)
        .await
        .map_err(|e| EventError::failed(e.to_string()))?;

    speaker
        .observe_interaction(listener_id, &reply.text)
        .await
        .map_err(|e| EventError::failed(e.to_string()))?;
    if let Some(listener) = engine.agent(listener_id) {
        listener
            .observe_interaction(speaker_id, opener)
            .await
            .map_err(|e| EventError::failed(e.to_string()))?;
    }

    tracing::debug!(speaker = %speaker_id, listener = %listener_id, "conversation held");
    Ok(())
}
