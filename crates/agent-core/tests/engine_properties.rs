//! End-to-end behaviour of the engine through its public API.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use agent_core::components::{MemoryStore, PlanningQueue, ReflectionScheduler, RelationshipTable};
use agent_core::events::{sync_callback, EventOutcome};
use agent_core::{
    AgentId, AgentProfile, Clock, ConversationEntry, EventQueue, IdGenerator, KeywordOracle,
    MemoryKind, PlanStatus, SimConfig, SimError, SimTime, SimulationEngine,
};

fn clock() -> Arc<Clock> {
    Arc::new(Clock::default())
}

fn recording_queue(clock: Arc<Clock>) -> (EventQueue, Arc<Mutex<Vec<String>>>) {
    (
        EventQueue::new(clock, IdGenerator::sequential("evt")),
        Arc::new(Mutex::new(Vec::new())),
    )
}

fn record_into(log: &Arc<Mutex<Vec<String>>>, label: &str) -> agent_core::EventCallback {
    let log = log.clone();
    let label = label.to_string();
    sync_callback(move |_| {
        log.lock().unwrap().push(label);
        Ok(())
    })
}

#[tokio::test]
async fn test_events_fire_in_time_order_with_fifo_ties() {
    let clock = clock();
    let (queue, log) = recording_queue(clock.clone());

    queue.schedule("k", 30, serde_json::Value::Null, record_into(&log, "c")).unwrap();
    queue.schedule("k", 10, serde_json::Value::Null, record_into(&log, "a1")).unwrap();
    queue.schedule("k", 20, serde_json::Value::Null, record_into(&log, "b")).unwrap();
    queue.schedule("k", 10, serde_json::Value::Null, record_into(&log, "a2")).unwrap();

    clock.advance(15);
    let first = queue.drain_due().await;
    clock.advance(100);
    let second = queue.drain_due().await;
    let third = queue.drain_due().await;

    assert_eq!(*log.lock().unwrap(), vec!["a1", "a2", "b", "c"]);
    assert_eq!(first.fired.len(), 2);
    assert_eq!(second.fired.len(), 2);
    assert!(third.is_empty());

    let ids: HashSet<_> = first.fired.iter().chain(&second.fired).map(|e| e.id.clone()).collect();
    assert_eq!(ids.len(), 4);

    let times: Vec<SimTime> = first.fired.iter().chain(&second.fired).map(|e| e.fire_time).collect();
    assert!(times.windows(2).all(|w| w[0] <= w[1]));
}

#[tokio::test]
async fn test_cancelled_event_never_runs() {
    let clock = clock();
    let (queue, log) = recording_queue(clock.clone());

    let cancelled = queue.schedule("k", 5, serde_json::Value::Null, record_into(&log, "x")).unwrap();
    let kept = queue.schedule("k", 5, serde_json::Value::Null, record_into(&log, "y")).unwrap();

    assert!(queue.cancel(&cancelled));
    assert!(!queue.cancel(&cancelled));

    clock.advance(5);
    queue.drain_due().await;
    assert_eq!(*log.lock().unwrap(), vec!["y"]);
    assert!(!queue.cancel(&kept));
    assert!(!queue.cancel("evt_never"));
}

#[tokio::test]
async fn test_failing_callback_does_not_stop_drain() {
    let clock = clock();
    let (queue, log) = recording_queue(clock.clone());

    queue
        .schedule(
            "bad",
            0,
            serde_json::Value::Null,
            sync_callback(|_| Err(agent_core::EventError::failed("boom"))),
        )
        .unwrap();
    queue.schedule("good", 0, serde_json::Value::Null, record_into(&log, "ok")).unwrap();

    let report = queue.drain_due().await;
    assert_eq!(report.failures(), 1);
    assert!(matches!(report.fired[0].outcome, EventOutcome::Failed(_)));
    assert_eq!(report.fired[1].outcome, EventOutcome::Completed);
    assert_eq!(*log.lock().unwrap(), vec!["ok"]);
}

#[test]
fn test_fresh_memory_outranks_old_important_one() {
    let clock = clock();
    let mut store = MemoryStore::new(clock.clone(), IdGenerator::sequential("mem"));

    store.record(MemoryKind::Episodic, "old but important", 10.0);
    clock.advance(5 * agent_model::MS_PER_DAY);
    store.record(MemoryKind::Episodic, "fresh", 8.0);

    let ranked = store.retrieve_relevant("anything", 10);
    assert_eq!(ranked[0].content, "fresh");
    assert_eq!(ranked[1].content, "old but important");
}

#[test]
fn test_relationship_smoothing_is_exact() {
    let mut table = RelationshipTable::new();
    let bob = AgentId::from("bob");
    assert_eq!(table.update(&bob, 10.0).unwrap(), 6.0);
    assert_eq!(table.update(&bob, 0.0).unwrap(), 4.8);
}

#[test]
fn test_reflection_due_on_tenth_interaction() {
    let clock = clock();
    let mut scheduler = ReflectionScheduler::with_defaults(clock);

    for _ in 0..9 {
        assert!(!scheduler.note_interaction());
    }
    assert!(scheduler.note_interaction());

    scheduler.run_reflection(Vec::new());
    assert_eq!(scheduler.interaction_count(), 0);
    assert!(!scheduler.is_due());
}

#[test]
fn test_active_plans_exclude_finished_and_prefer_older() {
    let clock = clock();
    let mut plans = PlanningQueue::new(clock.clone(), IdGenerator::sequential("plan"));

    let older = plans.add("older", Vec::new(), 5.0).unwrap();
    let done = plans.add("done", Vec::new(), 9.0).unwrap();
    clock.advance(1);
    let newer = plans.add("newer", Vec::new(), 5.0).unwrap();
    plans.set_status(&done.id, PlanStatus::Completed);

    let active = plans.active_plans();
    let ids: Vec<_> = active.iter().map(|p| p.id.clone()).collect();
    assert_eq!(ids, vec![older.id, newer.id]);
    assert!(active.iter().all(|p| p.status == PlanStatus::Active));
}

#[tokio::test]
async fn test_zero_delta_tick_drains_due_events_once() {
    let engine =
        SimulationEngine::new(SimConfig::default(), Arc::new(KeywordOracle::new())).unwrap();
    let log = Arc::new(Mutex::new(Vec::new()));

    engine.schedule("k", 0, serde_json::Value::Null, record_into(&log, "now")).unwrap();

    let report = engine.tick(0).await;
    assert_eq!(report.time, SimTime::ZERO);
    assert_eq!(report.drained.fired.len(), 1);
    engine.tick(0).await;
    assert_eq!(*log.lock().unwrap(), vec!["now"]);
}

#[tokio::test]
async fn test_negative_delay_rejected() {
    let engine =
        SimulationEngine::new(SimConfig::default(), Arc::new(KeywordOracle::new())).unwrap();
    let err = engine
        .schedule("k", -1, serde_json::Value::Null, sync_callback(|_| Ok(())))
        .unwrap_err();
    assert!(matches!(err, SimError::InvalidArgument(_)));
    assert_eq!(engine.pending_events(), 0);
}

#[tokio::test]
async fn test_callback_scheduling_waits_for_next_drain() {
    let engine = Arc::new(
        SimulationEngine::new(SimConfig::default(), Arc::new(KeywordOracle::new())).unwrap(),
    );
    let log = Arc::new(Mutex::new(Vec::new()));

    let inner_log = log.clone();
    let weak = Arc::downgrade(&engine);
    engine
        .schedule(
            "outer",
            0,
            serde_json::Value::Null,
            sync_callback(move |_| {
                inner_log.lock().unwrap().push("outer".to_string());
                if let Some(engine) = weak.upgrade() {
                    engine
                        .schedule("inner", 0, serde_json::Value::Null, record_into(&inner_log, "inner"))
                        .map_err(|e| agent_core::EventError::failed(e.to_string()))?;
                }
                Ok(())
            }),
        )
        .unwrap();

    engine.tick(0).await;
    assert_eq!(*log.lock().unwrap(), vec!["outer"]);
    engine.tick(0).await;
    assert_eq!(*log.lock().unwrap(), vec!["outer", "inner"]);
}

#[tokio::test]
async fn test_conversation_reflection_round_trip() {
    let mut config = SimConfig::default();
    config.reflection.interaction_threshold = 3;
    let engine = SimulationEngine::new(config, Arc::new(KeywordOracle::new())).unwrap();
    let id = AgentId::from("mary");
    engine
        .register(AgentProfile::new("mary", "Mary", "Jones"))
        .unwrap();

    let mut history = Vec::new();
    for line in ["Hello Mary", "The bakery is busy today", "Remember the urgent order"] {
        history.push(ConversationEntry::new("Bob Smith", line));
        let reply = engine.converse(&id, &history).await.unwrap();
        history.push(ConversationEntry::new("Mary Jones", reply.text));
    }
    assert_eq!(engine.pending_events(), 1);

    engine.tick(0).await;
    engine.settle().await;
    let snapshot = engine.snapshot().await;
    let mary = &snapshot.agents[0];
    assert_eq!(mary.interaction_count, 0);
    assert_eq!(mary.reflection_count, 1);
    assert_eq!(mary.memory_counts.episodic, 3);
    // Two facts extracted from the conversation, three reflection insights
    assert_eq!(mary.memory_counts.semantic, 5);
}
