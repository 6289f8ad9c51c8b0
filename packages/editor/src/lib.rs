//! # Enso Editor
//!
//! Keeps text editors and collaboratively edited modules consistent.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ editor: EditorState + Transactions          │
//! │  - local edits composed into a ChangeSet    │
//! └─────────────────────────────────────────────┘
//!                     ↕  SyncEngine (debounced commit, revert, reset)
//! ┌─────────────────────────────────────────────┐
//! │ ReactiveModule: Module mirrored into yrs    │
//! │  - per-node fields / metadata containers    │
//! │  - dependency-tracked effects               │
//! │  - SourceDocument (text + span index)       │
//! └─────────────────────────────────────────────┘
//!                     ↕  v1 update frames
//! ┌─────────────────────────────────────────────┐
//! │ collaborators                               │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **The module is the source of truth**: editor text is a view of it
//! 2. **One commit per tick**: bursts of keystrokes become one module edit
//! 3. **Never diverge silently**: a failed commit reverts the editor, and resets
//!    it to the module's code if needed
//!
//! ## Usage
//!
//! ```rust,ignore
//! use enso_editor::{notification_channel, ProjectStore, Transaction};
//!
//! let mut store = ProjectStore::new(Config::default(), 0);
//! store.open("Main", "main = 42")?;
//! let (notifier, notifications) = notification_channel();
//! store.attach_code_editor("Main", notifier)?;
//!
//! let state = store.editor("Main").unwrap().state();
//! let typed = Transaction::edits(state, &[TextEdit::insertion(9, "0")])?;
//! store.dispatch("Main", typed)?;
//! store.tick(); // module code is now "main = 420"
//! ```

pub mod change_set;
pub mod debounce;
pub mod diagnostics;
mod errors;
pub mod notification;
pub mod reactive;
pub mod state;
pub mod store;
pub mod sync;

pub use change_set::{Assoc, Change, ChangeSet};
pub use debounce::Debouncer;
pub use diagnostics::{diagnostics_to_ranges, Diagnostic, DiagnosticKind, EditorDiagnostic};
pub use errors::{EditorError, EditorResult};
pub use notification::{notification_channel, Notification, NotificationLevel, Notifier};
pub use reactive::{Dependency, EffectId, ReactiveModule, Tracked};
pub use state::{EditorState, Selection, Transaction};
pub use store::ProjectStore;
pub use sync::{SyncEngine, SyncState};
