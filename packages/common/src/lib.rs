//! # Enso Common
//!
//! Building blocks shared by the parser, the AST layer, the editor bridge and
//! the suggestion database:
//!
//! - [`text`]: source ranges and text edits (diffing, applying, span mapping)
//! - [`origin`]: origin tags attached to module edits
//! - [`queue`]: strictly serial async task queue
//! - [`backoff`]: exponential retry for language-server calls
//! - [`config`]: JSON configuration
//! - [`logging`]: `tracing` subscriber setup

pub mod backoff;
pub mod config;
pub mod error;
pub mod logging;
pub mod origin;
pub mod queue;
pub mod result;
pub mod text;

pub use backoff::{exponential_backoff, BackoffConfig};
pub use config::{CodeEditorConfig, Config, DEFAULT_CONFIG_NAME};
pub use error::CommonError;
pub use origin::Origin;
pub use queue::AsyncQueue;
pub use result::CommonResult;
pub use text::{SourceRange, TextEdit};
