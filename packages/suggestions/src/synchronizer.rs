//! # Suggestion Database Synchronizer
//!
//! Keeps a [`SuggestionDb`] in sync with the language server.
//!
//! ```text
//!  start ──▶ load groups ──▶ acquire capability ──▶ load snapshot ──▶ Ready { v }
//!                                                                        │
//!  handle_update(batch) ──▶ AsyncQueue ──▶ batch.version <  v : skipped  │
//!                                          batch.version >= v : applied ◀┘
//! ```
//!
//! Every step runs on one [`AsyncQueue`]: the initial load is its first task,
//! so update batches received while loading wait for the snapshot, and batches
//! are applied one at a time in arrival order. Batches carrying the current
//! version are applied again, since the language server may send two batches
//! with the same version in quick succession.

use crate::db::SuggestionDb;
use crate::entry::Group;
use crate::error::SuggestionResult;
use crate::ls_types::{LibraryComponentGroup, SuggestionsDatabaseSnapshot, SuggestionsDatabaseUpdateNotification};
use crate::qualified_name::QualifiedName;
use crate::update::SuggestionUpdateProcessor;
use async_trait::async_trait;
use enso_common::{exponential_backoff, AsyncQueue, BackoffConfig};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tracing::{error, info, warn};

/// Capability required to receive `search/suggestionsDatabaseUpdates`.
pub const UPDATES_CAPABILITY: &str = "search/receivesSuggestionsDatabaseUpdates";

/// The language server calls the synchronizer depends on.
#[async_trait]
pub trait LanguageServer: Send + Sync {
    async fn acquire_capability(&self, method: &str) -> SuggestionResult<()>;

    async fn get_suggestions_database(&self) -> SuggestionResult<SuggestionsDatabaseSnapshot>;

    async fn get_component_groups(&self) -> SuggestionResult<Vec<LibraryComponentGroup>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseState {
    Loading,
    Ready { current_version: u64 },
}

struct QueueState {
    current_version: u64,
    processor: Arc<SuggestionUpdateProcessor>,
}

pub struct Synchronizer {
    entries: Arc<Mutex<SuggestionDb>>,
    groups: Arc<Mutex<Vec<Group>>>,
    state: watch::Receiver<DatabaseState>,
    state_sender: Arc<watch::Sender<DatabaseState>>,
    queue: AsyncQueue<QueueState>,
}

impl Synchronizer {
    /// Start loading the database. Must be called within a tokio runtime.
    pub fn start(language_server: Arc<dyn LanguageServer>, backoff: BackoffConfig) -> Self {
        let entries = Arc::new(Mutex::new(SuggestionDb::new()));
        let groups = Arc::new(Mutex::new(Vec::new()));
        let (state_sender, state) = watch::channel(DatabaseState::Loading);
        let state_sender = Arc::new(state_sender);

        let initial = {
            let entries = entries.clone();
            let groups = groups.clone();
            let state_sender = state_sender.clone();
            async move {
                let loaded_groups = load_groups(language_server.as_ref(), &backoff).await;
                *lock(&groups) = loaded_groups.clone();
                let processor = Arc::new(SuggestionUpdateProcessor::new(loaded_groups));

                let capability = exponential_backoff(|| language_server.acquire_capability(UPDATES_CAPABILITY), &backoff).await;
                if let Err(err) = capability {
                    warn!(error = %err, "will not receive suggestion database updates");
                }

                let current_version = load_database(&entries, language_server.as_ref(), &processor, &backoff).await;
                state_sender.send_replace(DatabaseState::Ready { current_version });
                QueueState {
                    current_version,
                    processor,
                }
            }
        };

        Self {
            entries,
            groups,
            state,
            state_sender,
            queue: AsyncQueue::new(initial),
        }
    }

    /// Queue an update batch received from the language server.
    pub fn handle_update(&self, notification: SuggestionsDatabaseUpdateNotification) -> SuggestionResult<()> {
        let entries = self.entries.clone();
        let state_sender = self.state_sender.clone();
        self.queue.push_task(move |state: QueueState| async move {
            let version = notification.current_version;
            if version == state.current_version {
                info!(version, "received multiple consecutive suggestion database updates with the same version");
            }
            if version < state.current_version {
                info!(version, current = state.current_version, "skipping suggestion database update, already applied");
                return state;
            }
            state.processor.apply_updates(&mut lock(&entries), &notification.updates);
            state_sender.send_replace(DatabaseState::Ready { current_version: version });
            QueueState {
                current_version: version,
                processor: state.processor,
            }
        })?;
        Ok(())
    }

    pub fn state(&self) -> DatabaseState {
        *self.state.borrow()
    }

    /// Resolve once every update queued so far has been handled.
    pub async fn wait_for_completion(&self) -> SuggestionResult<()> {
        self.queue.wait_for_completion().await?;
        Ok(())
    }

    pub fn entries(&self) -> MutexGuard<'_, SuggestionDb> {
        lock(&self.entries)
    }

    pub fn groups(&self) -> Vec<Group> {
        lock(&self.groups).clone()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

async fn load_groups(language_server: &dyn LanguageServer, backoff: &BackoffConfig) -> Vec<Group> {
    match exponential_backoff(|| language_server.get_component_groups(), backoff).await {
        Ok(groups) => groups
            .into_iter()
            .filter_map(|group| match QualifiedName::parse(&group.library) {
                Ok(project) => Some(Group {
                    name: group.name,
                    color: group.color,
                    project,
                }),
                Err(err) => {
                    warn!(error = %err, group = %group.name, "skipping component group");
                    None
                }
            })
            .collect(),
        Err(err) => {
            warn!(error = %err, "cannot read component groups, continuing without groups");
            Vec::new()
        }
    }
}

async fn load_database(
    entries: &Mutex<SuggestionDb>,
    language_server: &dyn LanguageServer,
    processor: &SuggestionUpdateProcessor,
    backoff: &BackoffConfig,
) -> u64 {
    let snapshot = match exponential_backoff(|| language_server.get_suggestions_database(), backoff).await {
        Ok(snapshot) => snapshot,
        Err(err) => {
            error!(error = %err, "cannot load initial suggestion database, continuing with empty suggestion database");
            return 0;
        }
    };
    let mut entries = lock(entries);
    for ls_entry in &snapshot.entries {
        match processor.entry_from_ls(&ls_entry.suggestion) {
            Ok(entry) => entries.set(ls_entry.id, entry),
            Err(err) => {
                error!(id = ls_entry.id, error = %err, "skipping entry, the suggestion database will be incomplete");
            }
        }
    }
    info!(entries = entries.len(), version = snapshot.current_version, "suggestion database loaded");
    snapshot.current_version
}
