//! Integration tests for the suggestion database synchronizer

use async_trait::async_trait;
use enso_common::BackoffConfig;
use enso_suggestions::ls_types::{LibraryComponentGroup, SuggestionsDatabaseSnapshot, SuggestionsDatabaseUpdateNotification};
use enso_suggestions::{DatabaseState, LanguageServer, SuggestionError, SuggestionResult, Synchronizer};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Default)]
struct MockLanguageServer {
    snapshot: Value,
    snapshot_failures: AtomicU32,
    capability_fails: bool,
    load_delay: Duration,
    capability_calls: AtomicU32,
}

impl MockLanguageServer {
    fn with_snapshot(snapshot: Value) -> Self {
        Self {
            snapshot,
            ..Default::default()
        }
    }
}

#[async_trait]
impl LanguageServer for MockLanguageServer {
    async fn acquire_capability(&self, method: &str) -> SuggestionResult<()> {
        assert_eq!(method, "search/receivesSuggestionsDatabaseUpdates");
        self.capability_calls.fetch_add(1, Ordering::SeqCst);
        if self.capability_fails {
            return Err(SuggestionError::LanguageServer("capability denied".into()));
        }
        Ok(())
    }

    async fn get_suggestions_database(&self) -> SuggestionResult<SuggestionsDatabaseSnapshot> {
        tokio::time::sleep(self.load_delay).await;
        let failures = self.snapshot_failures.load(Ordering::SeqCst);
        if failures > 0 {
            self.snapshot_failures.store(failures - 1, Ordering::SeqCst);
            return Err(SuggestionError::LanguageServer("connection lost".into()));
        }
        Ok(serde_json::from_value(self.snapshot.clone())?)
    }

    async fn get_component_groups(&self) -> SuggestionResult<Vec<LibraryComponentGroup>> {
        Ok(serde_json::from_value(json!([
            {"library": "Standard.Base", "name": "Input", "color": "#ff0000", "exports": []},
            {"library": "not..valid", "name": "Broken"}
        ]))?)
    }
}

fn fast_backoff() -> BackoffConfig {
    BackoffConfig {
        max_retries: 2,
        retry_delay_ms: 1,
        retry_delay_multiplier: 2.0,
        retry_delay_max_ms: 5,
    }
}

fn function(name: &str) -> Value {
    json!({
        "type": "function", "module": "Standard.Base", "name": name, "arguments": [],
        "returnType": "Standard.Base.Any",
        "scope": {"start": {"line": 0, "character": 0}, "end": {"line": 1, "character": 0}},
        "documentation": "GROUP Input\n\nReads input."
    })
}

fn snapshot(version: u64) -> Value {
    json!({
        "currentVersion": version,
        "entries": [
            {"id": 1, "suggestion": {"type": "module", "module": "Standard.Base"}},
            {"id": 2, "suggestion": function("read")},
            {"id": 3, "suggestion": function("not a name")}
        ]
    })
}

fn notification(version: u64, updates: Value) -> SuggestionsDatabaseUpdateNotification {
    serde_json::from_value(json!({"currentVersion": version, "updates": updates})).unwrap()
}

fn start(server: MockLanguageServer) -> Synchronizer {
    Synchronizer::start(Arc::new(server), fast_backoff())
}

#[tokio::test]
async fn test_initial_load() -> anyhow::Result<()> {
    let synchronizer = start(MockLanguageServer::with_snapshot(snapshot(5)));
    synchronizer.wait_for_completion().await?;

    assert_eq!(synchronizer.state(), DatabaseState::Ready { current_version: 5 });
    let groups = synchronizer.groups();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].color.as_deref(), Some("#ff0000"));

    let entries = synchronizer.entries();
    // The entry with an invalid name is skipped.
    assert_eq!(entries.len(), 2);
    assert_eq!(entries.get(2).unwrap().group_index, Some(0));
    assert!(entries.get(3).is_none());
    Ok(())
}

#[tokio::test]
async fn test_snapshot_is_retried() -> anyhow::Result<()> {
    let server = MockLanguageServer::with_snapshot(snapshot(3));
    server.snapshot_failures.store(2, Ordering::SeqCst);
    let synchronizer = start(server);
    synchronizer.wait_for_completion().await?;

    assert_eq!(synchronizer.state(), DatabaseState::Ready { current_version: 3 });
    assert_eq!(synchronizer.entries().len(), 2);
    Ok(())
}

#[tokio::test]
async fn test_load_failure_continues_with_empty_database() -> anyhow::Result<()> {
    let server = MockLanguageServer::with_snapshot(snapshot(3));
    server.snapshot_failures.store(10, Ordering::SeqCst);
    let synchronizer = start(server);
    synchronizer.wait_for_completion().await?;

    assert_eq!(synchronizer.state(), DatabaseState::Ready { current_version: 0 });
    assert!(synchronizer.entries().is_empty());

    synchronizer.handle_update(notification(1, json!([{"type": "Add", "id": 7, "suggestion": function("late")}])))?;
    synchronizer.wait_for_completion().await?;
    assert_eq!(synchronizer.entries().len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_capability_failure_is_not_fatal() -> anyhow::Result<()> {
    let server = Arc::new(MockLanguageServer {
        capability_fails: true,
        ..MockLanguageServer::with_snapshot(snapshot(2))
    });
    let synchronizer = Synchronizer::start(server.clone(), fast_backoff());
    synchronizer.wait_for_completion().await?;

    assert_eq!(server.capability_calls.load(Ordering::SeqCst), 3);
    assert_eq!(synchronizer.state(), DatabaseState::Ready { current_version: 2 });
    assert_eq!(synchronizer.entries().len(), 2);
    Ok(())
}

#[tokio::test]
async fn test_update_versions() -> anyhow::Result<()> {
    let synchronizer = start(MockLanguageServer::with_snapshot(snapshot(5)));

    synchronizer.handle_update(notification(4, json!([{"type": "Add", "id": 10, "suggestion": function("stale")}])))?;
    synchronizer.handle_update(notification(5, json!([{"type": "Add", "id": 11, "suggestion": function("same")}])))?;
    synchronizer.wait_for_completion().await?;

    assert!(synchronizer.entries().get(10).is_none());
    assert!(synchronizer.entries().get(11).is_some());
    assert_eq!(synchronizer.state(), DatabaseState::Ready { current_version: 5 });

    synchronizer.handle_update(notification(6, json!([{"type": "Remove", "id": 11}])))?;
    synchronizer.handle_update(notification(5, json!([{"type": "Add", "id": 12, "suggestion": function("older")}])))?;
    synchronizer.wait_for_completion().await?;

    assert!(synchronizer.entries().get(11).is_none());
    assert!(synchronizer.entries().get(12).is_none());
    assert_eq!(synchronizer.state(), DatabaseState::Ready { current_version: 6 });
    Ok(())
}

#[tokio::test]
async fn test_updates_wait_for_initial_load() -> anyhow::Result<()> {
    let synchronizer = start(MockLanguageServer {
        load_delay: Duration::from_millis(20),
        ..MockLanguageServer::with_snapshot(snapshot(5))
    });
    assert_eq!(synchronizer.state(), DatabaseState::Loading);

    synchronizer.handle_update(notification(6, json!([
        {"type": "Modify", "id": 2, "returnType": {"tag": "Set", "value": "Standard.Base.Text"}}
    ])))?;
    synchronizer.wait_for_completion().await?;

    assert_eq!(synchronizer.entries().get(2).unwrap().return_type, "Standard.Base.Text");
    assert_eq!(synchronizer.state(), DatabaseState::Ready { current_version: 6 });
    Ok(())
}

#[tokio::test]
async fn test_stale_batches_do_not_change_the_database() -> anyhow::Result<()> {
    let batches = [
        notification(6, json!([{"type": "Add", "id": 20, "suggestion": function("first")}])),
        notification(7, json!([{"type": "Add", "id": 21, "suggestion": function("second")}, {"type": "Remove", "id": 1}])),
    ];
    let stale = notification(6, json!([{"type": "Remove", "id": 20}, {"type": "Remove", "id": 2}]));

    let ordered = start(MockLanguageServer::with_snapshot(snapshot(5)));
    for batch in &batches {
        ordered.handle_update(batch.clone())?;
    }
    ordered.wait_for_completion().await?;

    let with_stale = start(MockLanguageServer::with_snapshot(snapshot(5)));
    with_stale.handle_update(batches[0].clone())?;
    with_stale.handle_update(batches[1].clone())?;
    with_stale.handle_update(stale)?;
    with_stale.wait_for_completion().await?;

    let collect = |synchronizer: &Synchronizer| {
        synchronizer
            .entries()
            .iter()
            .map(|(id, entry)| (id, entry.clone()))
            .collect::<Vec<_>>()
    };
    assert_eq!(collect(&ordered), collect(&with_stale));
    assert_eq!(ordered.state(), with_stale.state());
    Ok(())
}
