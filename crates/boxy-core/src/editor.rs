//! Main editor orchestration.
//!
//! ## Learning: The Facade Pattern
//!
//! `Editor` acts as a facade, providing a simple interface to
//! complex subsystems. External code only needs to interact with
//! `Editor`, not individual components: it turns key presses into
//! commands, keeps the kill ring, and reports what happened on the event
//! bus.

use std::future::Future;
use std::path::Path;

use boxy_tree::{Clip, Codec, Fragment, KillRing};

use crate::command::{Command, CommandHandler, CommandRegistry};
use crate::config::Config;
use crate::document::Document;
use crate::event::{EditorEvent, EventBus};
use crate::keymap::{KeyPress, Keymap, KeymapResult};
use crate::response::{ChatMessage, Role, chat_history};
use crate::{CoreError, CoreResult};

/// Instruction sent ahead of a single-row question.
const INFER_SYSTEM_PROMPT: &str = "Respond very briefly:";

/// The main editor state.
///
/// ## Thread Safety
///
/// `Editor` is designed to be owned by a single task. Evaluators run as
/// futures awaited by that task; the document is only touched before and
/// after the await, never while a response is pending.
pub struct Editor {
    /// The document being edited
    document: Document,

    /// Killed boxes and line spans, most recent first
    kill_ring: KillRing,

    /// Editor configuration
    config: Config,

    /// Key bindings
    keymap: Keymap,

    /// Command registry
    commands: CommandRegistry,

    /// Event bus for notifications
    event_bus: EventBus,

    /// The next key is inserted literally
    quote_pending: bool,

    /// Whether the editor should quit
    should_quit: bool,
}

impl Editor {
    /// Creates a new editor instance.
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Creates an editor with custom configuration.
    pub fn with_config(config: Config) -> Self {
        let keymap = Keymap::from_config(&config);
        let kill_ring = KillRing::new(config.editor.kill_ring_capacity);
        let mut editor = Self {
            document: Document::new(),
            kill_ring,
            config,
            keymap,
            commands: CommandRegistry::new(),
            event_bus: EventBus::new(),
            quote_pending: false,
            should_quit: false,
        };
        editor.configure_document();
        editor
    }

    // ==================== Document Operations ====================

    /// Opens a `.box` file, replacing the current document.
    pub fn open_file(&mut self, path: impl AsRef<Path>) -> CoreResult<()> {
        let document = Document::from_file_with(path, self.codec())?;
        self.set_document(document);
        Ok(())
    }

    /// Parses serialized text into a fresh document.
    pub fn open_text(&mut self, text: &str) -> CoreResult<()> {
        let document = Document::from_text_with(text, self.codec())?;
        self.set_document(document);
        Ok(())
    }

    /// Replaces the current document.
    pub fn set_document(&mut self, document: Document) {
        self.document = document;
        self.configure_document();
        self.emit_document_changed();
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Direct access to the document. Edits made this way are not announced
    /// on the event bus; prefer [`Editor::apply`].
    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    /// Saves the document to its path.
    pub fn save(&mut self) -> CoreResult<()> {
        self.document.save()?;
        self.emit(EditorEvent::DocumentSaved(self.document.id()));
        Ok(())
    }

    /// Saves the document to a new path.
    pub fn save_as(&mut self, path: impl AsRef<Path>) -> CoreResult<()> {
        self.document.save_as(path)?;
        self.emit(EditorEvent::DocumentSaved(self.document.id()));
        Ok(())
    }

    fn codec(&self) -> Codec {
        Codec::new(self.config.dialect())
    }

    fn configure_document(&mut self) {
        self.document.set_dialect(self.config.dialect());
        self.document
            .set_pad_trailing_box(self.config.editor.pad_trailing_box);
    }

    // ==================== Editing ====================

    /// Runs `f` against the document and announces the outcome: an edit
    /// emits `DocumentChanged`, a pure cursor move emits `CursorMoved`.
    pub fn apply<T>(&mut self, f: impl FnOnce(&mut Document) -> T) -> T {
        let revision = self.document.revision();
        let position = self.document.cursor_position();
        let result = f(&mut self.document);
        if self.document.revision() != revision {
            self.emit_document_changed();
        } else if self.document.cursor_position() != position {
            self.emit_cursor_moved();
        }
        result
    }

    pub fn delete_backward(&mut self) -> CoreResult<()> {
        let clip = self.apply(|d| d.delete_backward())?;
        self.kill(clip);
        Ok(())
    }

    pub fn delete_forward(&mut self) -> CoreResult<()> {
        let clip = self.apply(|d| d.delete_forward())?;
        self.kill(clip);
        Ok(())
    }

    pub fn kill_line(&mut self) -> CoreResult<()> {
        let clip = self.apply(|d| d.kill_line())?;
        self.kill(clip);
        Ok(())
    }

    /// Removes the box holding the cursor and pushes it onto the kill ring.
    pub fn delete_current_box(&mut self) -> CoreResult<Option<Fragment>> {
        let removed = self.apply(|d| d.delete_current_box())?;
        self.kill(removed.clone().map(Clip::Box));
        Ok(removed)
    }

    /// Reinserts the most recent kill before the cursor. Returns false when
    /// the kill ring is empty.
    pub fn yank(&mut self) -> CoreResult<bool> {
        let Some(clip) = self.kill_ring.pop() else {
            tracing::debug!("Kill ring is empty");
            return Ok(false);
        };
        self.emit(EditorEvent::ClipboardChanged);
        if let Err(e) = self.apply(|d| d.insert_clip(clip.clone())) {
            self.kill_ring.push(clip);
            return Err(e);
        }
        Ok(true)
    }

    pub fn kill_response(&mut self) -> CoreResult<bool> {
        self.apply(|d| d.kill_response())
    }

    pub fn kill_ring(&self) -> &KillRing {
        &self.kill_ring
    }

    fn kill(&mut self, clip: Option<Clip>) {
        if let Some(clip) = clip {
            self.kill_ring.push(clip);
            self.emit(EditorEvent::ClipboardChanged);
        }
    }

    // ==================== Commands and Keys ====================

    /// Executes a command.
    pub fn execute(&mut self, cmd: &Command) -> CoreResult<()> {
        // The registry is moved out so handlers can borrow the editor.
        let commands = std::mem::take(&mut self.commands);
        let result = commands.execute(cmd, self);
        self.commands = commands;
        result
    }

    /// Registers a custom command handler.
    pub fn register_command(&mut self, handler: Box<dyn CommandHandler>) {
        self.commands.register(handler);
    }

    pub fn commands(&self) -> &CommandRegistry {
        &self.commands
    }

    /// Makes the next key insert itself literally.
    pub fn quote_next(&mut self) {
        self.quote_pending = true;
    }

    /// Handles one key press.
    ///
    /// Bound keys run their command; errors become alerts. Unbound
    /// printable keys insert themselves. Anything else raises an
    /// "undefined" alert.
    pub fn handle_key(&mut self, key: KeyPress) {
        if std::mem::take(&mut self.quote_pending) {
            match key.literal_char() {
                Some(ch) => self.report(|ed| ed.apply(|d| d.insert_char(ch))),
                None => self.alert(format!("\"{}\" cannot be quoted", key)),
            }
            return;
        }

        match self.keymap.process(key) {
            KeymapResult::Match(cmd) => {
                tracing::debug!("Key runs {}", cmd.display_name());
                self.report(|ed| ed.execute(&cmd));
            }
            KeymapResult::Pending => {}
            KeymapResult::NoMatch(keys) => match keys.as_slice() {
                [key] if key.typed_char().is_some() => {
                    if let Some(ch) = key.typed_char() {
                        self.report(|ed| ed.apply(|d| d.insert_char(ch)));
                    }
                }
                _ => {
                    let keys: Vec<String> = keys.iter().map(|k| k.to_string()).collect();
                    self.alert(format!("\"{}\" is undefined", keys.join(" ")));
                }
            },
        }
    }

    /// Handles each key of a sequence in order.
    pub fn handle_keys(&mut self, keys: impl IntoIterator<Item = KeyPress>) {
        for key in keys {
            self.handle_key(key);
        }
    }

    fn report(&mut self, f: impl FnOnce(&mut Self) -> CoreResult<()>) {
        if let Err(e) = f(self) {
            self.alert(e.to_string());
        }
    }

    pub fn keymap(&self) -> &Keymap {
        &self.keymap
    }

    // ==================== Evaluators ====================

    /// Sends the current row to an evaluator and writes the answer after a
    /// `|` separator, replacing any previous answer.
    ///
    /// `source` receives the transcript and resolves to the response text.
    /// If it fails, or its response does not parse, the document is left
    /// exactly as it was and an alert is emitted.
    pub async fn infer_current_row<F, Fut>(&mut self, source: F) -> CoreResult<()>
    where
        F: FnOnce(Vec<ChatMessage>) -> Fut,
        Fut: Future<Output = anyhow::Result<String>>,
    {
        let messages = vec![
            ChatMessage::new(Role::System, INFER_SYSTEM_PROMPT),
            ChatMessage::new(Role::User, self.document.current_row_prompt()),
        ];
        let response = self.evaluate(source, messages).await?;
        let markdown = self.config.editor.markdown_responses;
        let applied = self.apply(|d| {
            d.kill_response()?;
            d.insert_response(&response, markdown)
        });
        self.alert_on_error(applied)
    }

    /// Sends every row of the current box as a chat transcript and appends
    /// the answer to the current row.
    pub async fn chat_current_box<F, Fut>(&mut self, source: F) -> CoreResult<()>
    where
        F: FnOnce(Vec<ChatMessage>) -> Fut,
        Fut: Future<Output = anyhow::Result<String>>,
    {
        let rows = self.document.box_rows_text(self.document.current_box());
        let response = self.evaluate(source, chat_history(&rows)).await?;
        let markdown = self.config.editor.markdown_responses;
        let applied = self.apply(|d| d.insert_response(&response, markdown));
        self.alert_on_error(applied)
    }

    /// Awaits an evaluator and checks that its answer parses.
    async fn evaluate<F, Fut>(&self, source: F, messages: Vec<ChatMessage>) -> CoreResult<String>
    where
        F: FnOnce(Vec<ChatMessage>) -> Fut,
        Fut: Future<Output = anyhow::Result<String>>,
    {
        let response = match source(messages).await {
            Ok(response) => response,
            Err(e) => {
                let err = CoreError::Evaluator(format!("{:#}", e));
                self.alert(err.to_string());
                return Err(err);
            }
        };
        let checked = self.document.deserialize(response.trim()).map(drop);
        self.alert_on_error(checked)?;
        Ok(response)
    }

    fn alert_on_error<T>(&self, result: CoreResult<T>) -> CoreResult<T> {
        if let Err(e) = &result {
            self.alert(e.to_string());
        }
        result
    }

    // ==================== Configuration ====================

    /// Returns the editor configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Updates the configuration.
    pub fn set_config(&mut self, config: Config) {
        if config.editor.kill_ring_capacity != self.kill_ring.capacity() {
            let mut ring = KillRing::new(config.editor.kill_ring_capacity);
            for clip in self.kill_ring.iter().rev() {
                ring.push(clip.clone());
            }
            self.kill_ring = ring;
        }
        self.config = config;
        self.keymap = Keymap::from_config(&self.config);
        self.configure_document();
        self.emit(EditorEvent::ConfigChanged);
    }

    // ==================== Lifecycle ====================

    /// Signals that the editor should quit.
    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    /// Returns true if the editor should quit.
    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    // ==================== Events ====================

    /// Subscribes to editor events.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<EditorEvent> {
        self.event_bus.subscribe()
    }

    /// Reports a message to the user.
    pub fn alert(&self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!("{}", message);
        self.emit(EditorEvent::Alert(message));
    }

    fn emit(&self, event: EditorEvent) {
        self.event_bus.emit(event);
    }

    fn emit_document_changed(&self) {
        self.emit(EditorEvent::DocumentChanged(self.document.id()));
    }

    fn emit_cursor_moved(&self) {
        self.emit(EditorEvent::CursorMoved(self.document.id()));
    }
}

impl Default for Editor {
    fn default() -> Self {
        Self::new()
    }
}
