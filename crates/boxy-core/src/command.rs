//! Command system for editor actions.
//!
//! ## Learning: The Command Pattern
//!
//! Commands encapsulate actions as values:
//! - Key bindings map to a `Command`, not to a function pointer
//! - Config files name commands by string (`"kill-line"`)
//! - The headless CLI and tests can replay them without a keyboard
//!
//! ## Trait Objects vs Enums
//!
//! Built-in commands are an enum (exhaustive, no allocation). Extensions
//! register trait objects under a name and are invoked through
//! [`Command::Custom`].

use crate::editor::Editor;
use crate::{CoreError, CoreResult};
use boxy_tree::BoxKind;
use std::collections::HashMap;

/// Built-in editor commands.
///
/// ## Learning: Exhaustive Enums
///
/// With `#[non_exhaustive]`, we signal that new variants may be added.
/// Downstream match arms need a `_ =>` fallback.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Command {
    // Character motion
    MoveForward,
    MoveBackward,
    MoveUp,
    MoveDown,

    // Box motion
    EnterBox,
    ExitBoxLeft,
    ExitBoxRight,
    MoveToStartOfBox,
    MoveToEndOfBox,

    // Line motion
    MoveToStartOfLine,
    MoveToEndOfLine,

    // Insertion
    InsertChar(char),
    InsertText(String),
    InsertNewline,
    InsertBox { kind: BoxKind },
    QuotedInsert,

    // Deletion
    DeleteBackward,
    DeleteForward,
    KillLine,
    Yank,
    DeleteCurrentBox,
    ExplodeBox,

    // Box flags
    ShrinkBox,
    ExpandBox,
    ToggleExpand,
    FormatMarkdown,
    ShowRaw,

    // Selection
    SetMark,
    ClearMark,

    // Evaluator responses
    KillResponse,

    // File
    Save,
    Quit,

    // Custom command (name, arguments)
    Custom { name: String, args: Vec<String> },
}

impl Command {
    /// Returns the command's display name.
    pub fn display_name(&self) -> &str {
        match self {
            Command::MoveForward => "Move Forward",
            Command::MoveBackward => "Move Backward",
            Command::MoveUp => "Move Up",
            Command::MoveDown => "Move Down",
            Command::EnterBox => "Enter Box",
            Command::ExitBoxLeft => "Exit Box Left",
            Command::ExitBoxRight => "Exit Box Right",
            Command::MoveToStartOfBox => "Move to Start of Box",
            Command::MoveToEndOfBox => "Move to End of Box",
            Command::MoveToStartOfLine => "Move to Start of Line",
            Command::MoveToEndOfLine => "Move to End of Line",
            Command::InsertChar(_) => "Insert Character",
            Command::InsertText(_) => "Insert Text",
            Command::InsertNewline => "Insert Newline",
            Command::InsertBox {
                kind: BoxKind::Plain,
            } => "Insert Box",
            Command::InsertBox {
                kind: BoxKind::Code,
            } => "Insert Code Box",
            Command::InsertBox { .. } => "Insert Markdown Box",
            Command::QuotedInsert => "Quoted Insert",
            Command::DeleteBackward => "Delete Backward",
            Command::DeleteForward => "Delete Forward",
            Command::KillLine => "Kill Line",
            Command::Yank => "Yank",
            Command::DeleteCurrentBox => "Delete Current Box",
            Command::ExplodeBox => "Explode Box",
            Command::ShrinkBox => "Shrink Box",
            Command::ExpandBox => "Expand Box",
            Command::ToggleExpand => "Toggle Expand",
            Command::FormatMarkdown => "Format Markdown",
            Command::ShowRaw => "Show Raw",
            Command::SetMark => "Set Mark",
            Command::ClearMark => "Clear Mark",
            Command::KillResponse => "Kill Response",
            Command::Save => "Save",
            Command::Quit => "Quit",
            Command::Custom { name, .. } => name,
        }
    }

    /// Parses a command name as written in config files, like
    /// `"kill-line"` or `"insert-text hello"`. Unknown names become
    /// [`Command::Custom`] with the remaining words as arguments.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        let (name, rest) = match s.split_once(' ') {
            Some((name, rest)) => (name, rest),
            None => (s, ""),
        };
        let command = match name {
            "" => return None,
            "move-forward" => Command::MoveForward,
            "move-backward" => Command::MoveBackward,
            "move-up" => Command::MoveUp,
            "move-down" => Command::MoveDown,
            "enter-box" => Command::EnterBox,
            "exit-box-left" => Command::ExitBoxLeft,
            "exit-box-right" => Command::ExitBoxRight,
            "move-to-start-of-box" => Command::MoveToStartOfBox,
            "move-to-end-of-box" => Command::MoveToEndOfBox,
            "move-to-start-of-line" => Command::MoveToStartOfLine,
            "move-to-end-of-line" => Command::MoveToEndOfLine,
            "insert-char" => {
                let mut chars = rest.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Command::InsertChar(c),
                    _ => return None,
                }
            }
            "insert-text" => Command::InsertText(rest.to_string()),
            "insert-newline" => Command::InsertNewline,
            "insert-box" => Command::InsertBox {
                kind: BoxKind::Plain,
            },
            "insert-code-box" => Command::InsertBox {
                kind: BoxKind::Code,
            },
            "insert-markdown-box" => Command::InsertBox {
                kind: BoxKind::Markdown {
                    language: Some(rest.trim())
                        .filter(|l| !l.is_empty())
                        .map(str::to_string),
                },
            },
            "quoted-insert" => Command::QuotedInsert,
            "delete-backward" => Command::DeleteBackward,
            "delete-forward" => Command::DeleteForward,
            "kill-line" => Command::KillLine,
            "yank" => Command::Yank,
            "delete-current-box" => Command::DeleteCurrentBox,
            "explode-box" => Command::ExplodeBox,
            "shrink-box" => Command::ShrinkBox,
            "expand-box" => Command::ExpandBox,
            "toggle-expand" => Command::ToggleExpand,
            "format-markdown" => Command::FormatMarkdown,
            "show-raw" => Command::ShowRaw,
            "set-mark" => Command::SetMark,
            "clear-mark" => Command::ClearMark,
            "kill-response" => Command::KillResponse,
            "save" => Command::Save,
            "quit" => Command::Quit,
            other => Command::Custom {
                name: other.to_string(),
                args: rest.split_whitespace().map(str::to_string).collect(),
            },
        };
        Some(command)
    }
}

/// Context passed to command execution.
pub struct CommandContext<'a> {
    pub editor: &'a mut Editor,
}

/// Trait for custom command handlers.
///
/// ## Learning: Trait Objects
///
/// `dyn CommandHandler` allows storing different types that
/// implement this trait in the same collection. The `Send + Sync`
/// bounds ensure thread safety.
pub trait CommandHandler: Send + Sync {
    /// Returns the command name.
    fn name(&self) -> &str;

    /// Executes the command.
    fn execute(&self, ctx: &mut CommandContext, args: &[String]) -> CoreResult<()>;

    /// Returns a description for listings.
    fn description(&self) -> &str {
        self.name()
    }
}

/// Registry for commands.
///
/// ## Learning: Type Erasure
///
/// `Box<dyn CommandHandler>` erases the concrete type, allowing
/// different handler types in the same HashMap. The vtable (virtual
/// table) enables dynamic dispatch.
#[derive(Default)]
pub struct CommandRegistry {
    /// Custom command handlers
    handlers: HashMap<String, Box<dyn CommandHandler>>,
}

impl CommandRegistry {
    /// Creates a new registry.
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Registers a custom command handler.
    pub fn register(&mut self, handler: Box<dyn CommandHandler>) {
        let name = handler.name().to_string();
        self.handlers.insert(name, handler);
    }

    /// Executes a command.
    ///
    /// Motions that hit a boundary are not errors; only structural
    /// failures and unknown custom commands return `Err`.
    pub fn execute(&self, cmd: &Command, editor: &mut Editor) -> CoreResult<()> {
        let mut ctx = CommandContext { editor };
        let ed = &mut *ctx.editor;

        match cmd {
            // Motion
            Command::MoveForward => {
                ed.apply(|d| d.move_forward());
            }
            Command::MoveBackward => {
                ed.apply(|d| d.move_backward());
            }
            Command::MoveUp => {
                ed.apply(|d| d.move_up());
            }
            Command::MoveDown => {
                ed.apply(|d| d.move_down());
            }
            Command::EnterBox => {
                ed.apply(|d| d.enter_box());
            }
            Command::ExitBoxLeft => {
                ed.apply(|d| d.exit_box_left());
            }
            Command::ExitBoxRight => {
                ed.apply(|d| d.exit_box_right());
            }
            Command::MoveToStartOfBox => {
                ed.apply(|d| d.move_to_start_of_box());
            }
            Command::MoveToEndOfBox => {
                ed.apply(|d| d.move_to_end_of_box());
            }
            Command::MoveToStartOfLine => {
                ed.apply(|d| d.move_to_start_of_line());
            }
            Command::MoveToEndOfLine => {
                ed.apply(|d| d.move_to_end_of_line());
            }

            // Insertion
            Command::InsertChar(ch) => return ed.apply(|d| d.insert_char(*ch)),
            Command::InsertText(text) => return ed.apply(|d| d.insert_text(text)),
            Command::InsertNewline => return ed.apply(|d| d.insert_newline()),
            Command::InsertBox { kind } => {
                return ed
                    .apply(|d| d.insert_box_and_enter(kind.clone()))
                    .map(drop);
            }
            Command::QuotedInsert => {
                ed.quote_next();
            }

            // Deletion
            Command::DeleteBackward => return ed.delete_backward(),
            Command::DeleteForward => return ed.delete_forward(),
            Command::KillLine => return ed.kill_line(),
            Command::Yank => return ed.yank().map(drop),
            Command::DeleteCurrentBox => return ed.delete_current_box().map(drop),
            Command::ExplodeBox => return ed.apply(|d| d.explode_box()).map(drop),

            // Box flags
            Command::ShrinkBox => {
                ed.apply(|d| d.shrink_box());
            }
            Command::ExpandBox => {
                ed.apply(|d| d.expand_box());
            }
            Command::ToggleExpand => {
                ed.apply(|d| d.toggle_expand());
            }
            Command::FormatMarkdown => return ed.apply(|d| d.format_markdown_box()),
            Command::ShowRaw => {
                let current = ed.document().current_box();
                ed.apply(|d| d.show_raw(current));
            }

            // Selection
            Command::SetMark => {
                ed.apply(|d| d.set_mark());
            }
            Command::ClearMark => {
                ed.apply(|d| d.clear_mark());
            }

            Command::KillResponse => return ed.kill_response().map(drop),

            Command::Save => return ed.save(),
            Command::Quit => {
                ed.quit();
            }

            Command::Custom { name, args } => {
                return match self.handlers.get(name) {
                    Some(handler) => handler.execute(&mut ctx, args),
                    None => Err(CoreError::CommandNotFound(name.clone())),
                };
            }
        };
        Ok(())
    }

    /// Returns all registered command names.
    pub fn list(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }
}
