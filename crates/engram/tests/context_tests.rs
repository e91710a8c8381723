//! Integration tests for end-to-end context assembly
//!
//! Tests verify that:
//! - Semantically matching conversations outrank unrelated ones
//! - maxItems bounds the conversation section
//! - Emitted conversations have access stats bumped exactly once per call
//! - Derived trend and life-event sections appear under the right conditions

use std::sync::Arc;

use engram::config::EngramConfig;
use engram::context::ContextSource;
use engram::engine::MemoryEngine;
use engram::extract::ConversationTurn;
use engram::memory::MemoryKind;
use engram::testing::MockEmbedder;

fn engine() -> MemoryEngine {
    MemoryEngine::new(EngramConfig::default(), Arc::new(MockEmbedder::new(32)))
}

fn turn(user: &str, assistant: &str) -> ConversationTurn {
    ConversationTurn {
        owner_id: "u1".to_string(),
        user_message: user.to_string(),
        assistant_message: assistant.to_string(),
    }
}

#[tokio::test]
async fn matching_conversation_outranks_unrelated_one() {
    let engine = engine();
    engine
        .record_turn(&turn("work stress is getting to me", "let's talk it through"))
        .await
        .unwrap();
    engine
        .record_turn(&turn("planning a weekend trip to the coast", "sounds fun"))
        .await
        .unwrap();

    // Recency favors the trip; a query repeating the stress digest must
    // still rank the stress conversation first on the semantic signal.
    let entries = engine
        .build_context(
            "u1",
            "user: work stress is getting to me; assistant: let's talk it through",
            None,
            5,
        )
        .await
        .unwrap();

    let first = entries
        .iter()
        .find(|e| e.source == ContextSource::Conversation)
        .expect("at least one conversation entry");
    assert!(
        first.text.contains("work stress"),
        "expected the stress conversation first, got: {}",
        first.text
    );
}

#[tokio::test]
async fn max_items_bounds_conversation_section() {
    let engine = engine();
    for i in 0..6 {
        engine
            .record_turn(&turn(&format!("note number {i}"), "ok"))
            .await
            .unwrap();
    }

    let entries = engine.build_context("u1", "note", None, 2).await.unwrap();
    let conversations = entries
        .iter()
        .filter(|e| e.source == ContextSource::Conversation)
        .count();
    assert_eq!(conversations, 2);
}

#[tokio::test]
async fn emitted_conversations_bumped_once_per_call() {
    let engine = engine();
    engine.record_turn(&turn("hello there", "hi")).await.unwrap();

    engine.build_context("u1", "hello", None, 5).await.unwrap();
    engine.build_context("u1", "hello", None, 5).await.unwrap();

    let conversations = engine
        .memories_of_kind("u1", MemoryKind::Conversation)
        .await
        .unwrap();
    assert_eq!(
        conversations[0].access_count, 2,
        "one bump per build_context call"
    );
}

#[tokio::test]
async fn trend_appears_after_enough_emotional_states() {
    let engine = engine();

    engine
        .record_turn(&turn("feeling sad about the news", "I'm sorry"))
        .await
        .unwrap();
    engine
        .record_turn(&turn("still sad today", "that's rough"))
        .await
        .unwrap();
    engine
        .record_turn(&turn("sad again, honestly", "here for you"))
        .await
        .unwrap();

    let entries = engine.build_context("u1", "how am I doing", None, 5).await.unwrap();
    let trend = entries
        .iter()
        .find(|e| e.source == ContextSource::EmotionTrend)
        .expect("trend entry after three emotional states");
    assert!(trend.text.contains("sad"));
}

#[tokio::test]
async fn life_event_surfaces_on_token_overlap() {
    let engine = engine();
    engine
        .record_turn(&turn("I got a new job at the archive", "congrats"))
        .await
        .unwrap();

    let entries = engine
        .build_context("u1", "tell me about the job", None, 5)
        .await
        .unwrap();
    assert!(
        entries.iter().any(|e| e.source == ContextSource::LifeEvent),
        "career event shares the 'job' token with the query"
    );

    let entries = engine
        .build_context("u1", "anything worth cooking tonight", None, 5)
        .await
        .unwrap();
    assert!(
        !entries.iter().any(|e| e.source == ContextSource::LifeEvent),
        "no token overlap, no life-event entry"
    );
}

#[tokio::test]
async fn repeated_calls_keep_read_only_sections_identical() {
    let engine = engine();
    engine
        .record_turn(&turn("remember that I work remotely", "noted"))
        .await
        .unwrap();

    let read_only = |entries: &[engram::ContextEntry]| -> Vec<String> {
        entries
            .iter()
            .filter(|e| {
                matches!(
                    e.source,
                    ContextSource::Fact | ContextSource::Preference
                )
            })
            .map(|e| e.text.clone())
            .collect()
    };

    let first = engine.build_context("u1", "work", None, 5).await.unwrap();
    let second = engine.build_context("u1", "work", None, 5).await.unwrap();
    assert_eq!(read_only(&first), read_only(&second));
}

#[tokio::test]
async fn older_relevant_conversation_beats_fresh_unrelated_one() {
    use chrono::{Duration, Utc};
    use engram::memory::{Memory, MemoryPayload};

    let embedder = MockEmbedder::new(32);
    let engine = MemoryEngine::new(EngramConfig::default(), Arc::new(embedder.clone()));

    let mut stress = Memory::new(
        "u1",
        MemoryKind::Conversation,
        MemoryPayload::Conversation {
            summary: "talked about work stress".to_string(),
            topics: vec!["work".to_string()],
        },
    )
    .with_embedding(embedder.embed_sync("talked about work stress"));
    stress.created_at = Utc::now() - Duration::days(3);
    stress.last_accessed = stress.created_at;

    let mut trip = Memory::new(
        "u1",
        MemoryKind::Conversation,
        MemoryPayload::Conversation {
            summary: "planned a weekend trip".to_string(),
            topics: vec!["travel".to_string()],
        },
    )
    .with_embedding(embedder.embed_sync("planned a weekend trip"));
    trip.created_at = Utc::now() - Duration::hours(1);
    trip.last_accessed = trip.created_at;

    engine.insert_memory("u1", stress).await.unwrap();
    engine.insert_memory("u1", trip).await.unwrap();
    engine
        .insert_memory(
            "u1",
            Memory::new(
                "u1",
                MemoryKind::Fact,
                MemoryPayload::Fact {
                    text: "likes tea".to_string(),
                },
            ),
        )
        .await
        .unwrap();
    engine
        .insert_memory(
            "u1",
            Memory::new(
                "u1",
                MemoryKind::Preference,
                MemoryPayload::Preference {
                    key: "music".to_string(),
                    value: "jazz".to_string(),
                },
            ),
        )
        .await
        .unwrap();

    let entries = engine
        .build_context("u1", "talked about work stress", None, 5)
        .await
        .unwrap();

    let conversations: Vec<&str> = entries
        .iter()
        .filter(|e| e.source == ContextSource::Conversation)
        .map(|e| e.text.as_str())
        .collect();
    assert_eq!(
        conversations[0], "talked about work stress",
        "semantic match outranks the fresher conversation"
    );

    assert!(entries.iter().any(|e| e.text.contains("likes tea")));
    assert!(entries.iter().any(|e| e.text.contains("jazz")));
}

#[tokio::test]
async fn profile_sections_surface_through_engine() {
    let engine = engine();
    engine
        .set_relationship("u1", "Ana", "sister")
        .await
        .unwrap();
    engine.add_goal("u1", "learn piano").await.unwrap();
    engine.add_goal("u1", "run a marathon").await.unwrap();
    assert!(engine.complete_goal("u1", "learn piano").await.unwrap());
    engine.add_interest("u1", "jazz").await.unwrap();

    let entries = engine.build_context("u1", "anything", None, 5).await.unwrap();

    let relationship = entries
        .iter()
        .find(|e| e.source == ContextSource::Relationship)
        .expect("relationship entry present");
    assert!(relationship.text.contains("Ana"));

    let goals: Vec<_> = entries
        .iter()
        .filter(|e| e.source == ContextSource::Goal)
        .collect();
    assert_eq!(goals.len(), 1, "completed goals are not emitted");
    assert!(goals[0].text.contains("marathon"));

    assert!(
        entries
            .iter()
            .any(|e| e.source == ContextSource::Interest && e.text.contains("jazz")),
        "interest entry present"
    );
}

#[tokio::test]
async fn caller_supplied_query_embedding_is_used() {
    let embedder = MockEmbedder::new(32);
    let engine = MemoryEngine::new(EngramConfig::default(), Arc::new(embedder.clone()));

    engine
        .record_turn(&turn("work stress is getting to me", "let's talk it through"))
        .await
        .unwrap();
    engine
        .record_turn(&turn("planning a weekend trip to the coast", "sounds fun"))
        .await
        .unwrap();

    // The query text itself is off-topic; the supplied embedding repeats
    // the stress digest, and must drive the ranking.
    let stress_digest =
        "user: work stress is getting to me; assistant: let's talk it through";
    let entries = engine
        .build_context(
            "u1",
            "unrelated words",
            Some(embedder.embed_sync(stress_digest)),
            5,
        )
        .await
        .unwrap();

    let first = entries
        .iter()
        .find(|e| e.source == ContextSource::Conversation)
        .expect("at least one conversation entry");
    assert!(
        first.text.contains("work stress"),
        "supplied embedding should outrank the text, got: {}",
        first.text
    );
}

#[tokio::test]
async fn empty_owner_yields_empty_context() {
    let engine = engine();
    let entries = engine.build_context("nobody", "anything", None, 5).await.unwrap();
    assert!(entries.is_empty());
}
