//! # Boxy Core
//!
//! Core editor logic for the boxy structural editor.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                         Editor                            │
//! │  ┌──────────┐ ┌──────────┐ ┌─────────┐ ┌───────────────┐  │
//! │  │  Keymap  │ │  Config  │ │KillRing │ │CommandRegistry│  │
//! │  └──────────┘ └──────────┘ └─────────┘ └───────────────┘  │
//! │         │                                    │            │
//! │  ┌──────┴────────────────────────────────────┴─────────┐  │
//! │  │                     Document                        │  │
//! │  │   Tree (boxy-tree)  +  Cursor  +  Codec             │  │
//! │  │   addressing │ navigation │ mutation │ rows         │  │
//! │  └─────────────────────────────────────────────────────┘  │
//! │         │                                                 │
//! │      EventBus ──▶ DocumentChanged / CursorMoved / Alert   │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! `Document` is usable on its own: it owns a tree and its cursor and
//! exposes every navigation, mutation and query primitive. `Editor` adds the
//! kill ring, key handling, configuration and event notification around it.
//!
//! ## Learning: Module Organization
//!
//! Rust modules map to files:
//! - `mod foo;` looks for `foo.rs` or `foo/mod.rs`
//! - `pub use` re-exports items for cleaner public APIs
//! - private modules can still add `impl` blocks to public types

mod addressing;
mod mutation;
mod navigation;
mod rows;

pub mod command;
pub mod config;
pub mod document;
pub mod editor;
pub mod event;
pub mod keymap;
pub mod render;
pub mod response;

pub use command::{Command, CommandContext, CommandHandler, CommandRegistry};
pub use config::{Config, ConfigError};
pub use document::{Document, DocumentId};
pub use editor::Editor;
pub use event::{EditorEvent, EventBus, EventHandler};
pub use keymap::{Key, KeyBinding, KeyPress, Keymap, KeymapResult, Modifiers};
pub use render::View;
pub use response::{ChatMessage, Role};

pub use boxy_tree::{
    BoxFlags, BoxKind, Clip, CodecError, CursorPosition, Dialect, Fragment, Location, NodeId,
    RenderMode, TreeError,
};

/// Result type for core operations
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in core operations
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Tree error: {0}")]
    Tree(#[from] TreeError),

    #[error("Parse error: {0}")]
    Codec(#[from] CodecError),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Document has no path")]
    NoPath,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Node {0} is not a box")]
    NotABox(NodeId),

    #[error("Positions are in different boxes")]
    PositionsInDifferentBoxes,

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Command not found: {0}")]
    CommandNotFound(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Evaluator failed: {0}")]
    Evaluator(String),
}
