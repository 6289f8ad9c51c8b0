//! Integration tests for the project store: editors, module edits and collaborators

use enso_common::{Config, Origin, TextEdit};
use enso_editor::{notification_channel, EditorError, ProjectStore, SyncState, Transaction};

fn store_with_editor(code: &str) -> anyhow::Result<ProjectStore> {
    enso_common::logging::init_for_tests();
    let mut store = ProjectStore::new(Config::default(), 0);
    store.open("Main", code)?;
    let (notifier, _notifications) = notification_channel();
    store.attach_code_editor("Main", notifier)?;
    Ok(store)
}

fn type_text(store: &mut ProjectStore, at: usize, text: &str) -> anyhow::Result<()> {
    let state = store.editor("Main").ok_or_else(|| anyhow::anyhow!("no editor"))?.state();
    let transaction = Transaction::edits(state, &[TextEdit::insertion(at, text)])?;
    store.dispatch("Main", transaction)?;
    Ok(())
}

fn graph_editor() -> Origin {
    Origin::LocalUserAction("graphEditor".to_string())
}

#[test]
fn test_typing_is_committed_on_tick() -> anyhow::Result<()> {
    let mut store = store_with_editor("main = 42")?;
    type_text(&mut store, 9, "0")?;
    type_text(&mut store, 10, "0")?;

    assert_eq!(store.module("Main").unwrap().code(), "main = 42");
    store.tick();

    assert_eq!(store.module("Main").unwrap().code(), "main = 4200");
    let editor = store.editor("Main").unwrap();
    assert_eq!(editor.commits(), 1);
    assert_eq!(editor.sync_state(), SyncState::Idle);
    assert!(!editor.has_pending());
    Ok(())
}

#[test]
fn test_module_edit_reaches_editor() -> anyhow::Result<()> {
    let mut store = store_with_editor("main = 42")?;

    let mut edit = store.start_edit("Main", &graph_editor())?;
    edit.sync_root_to_code("main = 43\nother = 1")?;
    store.commit_edit("Main", edit, graph_editor())?;

    let editor = store.editor("Main").unwrap();
    assert_eq!(editor.state().doc(), "main = 43\nother = 1");
    assert_eq!(editor.commits(), 0);
    Ok(())
}

#[test]
fn test_pending_editor_changes_go_in_before_module_edit() -> anyhow::Result<()> {
    let mut store = store_with_editor("main = 42")?;
    type_text(&mut store, 9, "0")?;

    let edit = store.start_edit("Main", &graph_editor())?;

    assert_eq!(edit.code(), "main = 420");
    assert_eq!(store.editor("Main").unwrap().commits(), 1);
    Ok(())
}

#[test]
fn test_typing_during_module_edit_survives() -> anyhow::Result<()> {
    enso_common::logging::init_for_tests();
    let mut store = ProjectStore::new(Config::default(), 0);
    store.open("Main", "main = 42\nother = 1")?;
    let (notifier, mut notifications) = notification_channel();
    store.attach_code_editor("Main", notifier)?;

    let mut edit = store.start_edit("Main", &graph_editor())?;
    type_text(&mut store, 19, "0")?;
    edit.sync_root_to_code("main = 43\nother = 1")?;
    store.commit_edit("Main", edit, graph_editor())?;
    store.tick();

    assert_eq!(store.module("Main").unwrap().code(), "main = 43\nother = 10");
    let editor = store.editor("Main").unwrap();
    assert_eq!(editor.state().doc(), "main = 43\nother = 10");
    assert_eq!(editor.commits(), 1);
    assert!(!editor.has_pending());
    assert!(notifications.try_recv().is_err());
    Ok(())
}

#[test]
fn test_remote_update_reaches_editor() -> anyhow::Result<()> {
    enso_common::logging::init_for_tests();
    let mut local = ProjectStore::new(Config::default(), 0);
    local.open("Main", "main = 42")?;
    let mut remote = ProjectStore::new(Config::default(), 1);
    remote.open_replica("Main", &local.module("Main").unwrap().encode_state_as_update())?;
    let (notifier, _notifications) = notification_channel();
    remote.attach_code_editor("Main", notifier)?;
    assert_eq!(remote.editor("Main").unwrap().state().doc(), "main = 42");

    let state_vector = remote.module("Main").unwrap().state_vector();
    let mut edit = local.start_edit("Main", &graph_editor())?;
    edit.sync_root_to_code("main = 42 + 1")?;
    local.commit_edit("Main", edit, graph_editor())?;
    let diff = local.module("Main").unwrap().encode_diff(&state_vector)?;

    let update = remote.apply_remote_update("Main", &diff)?;

    assert_eq!(update.origin, Some(Origin::Remote));
    assert_eq!(remote.module("Main").unwrap().code(), "main = 42 + 1");
    assert_eq!(remote.editor("Main").unwrap().state().doc(), "main = 42 + 1");
    Ok(())
}

#[test]
fn test_unknown_module() {
    let mut store = ProjectStore::new(Config::default(), 0);
    let result = store.start_edit("Missing", &Origin::Local);
    assert!(matches!(result, Err(EditorError::ModuleNotFound(name)) if name == "Missing"));
    assert!(!store.close("Missing"));
}

#[test]
fn test_close_module() -> anyhow::Result<()> {
    let mut store = store_with_editor("main = 42")?;
    assert_eq!(store.module_names().collect::<Vec<_>>(), vec!["Main"]);
    assert!(store.close("Main"));
    assert!(store.module("Main").is_none());
    assert!(store.editor("Main").is_none());
    Ok(())
}
