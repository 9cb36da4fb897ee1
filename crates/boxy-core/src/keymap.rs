//! Keyboard mapping and input handling.
//!
//! ## Learning: State Machines
//!
//! Key handling is a small state machine:
//! - Normal state: a key either matches a binding or falls through
//! - Pending state: a key is a prefix of a chord (`ctrl+x ctrl+s`)
//!
//! Keys that match nothing are reported back as [`KeymapResult::NoMatch`];
//! the [`Editor`](crate::Editor) decides whether they self-insert or raise an
//! "undefined" alert.

use crate::command::Command;
use crate::config::Config;
use boxy_tree::BoxKind;
use std::collections::HashMap;

/// Keyboard modifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Modifiers {
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
    pub meta: bool,
}

impl Modifiers {
    /// No modifiers pressed.
    pub const NONE: Modifiers = Modifiers {
        ctrl: false,
        alt: false,
        shift: false,
        meta: false,
    };

    /// Ctrl modifier.
    pub const CTRL: Modifiers = Modifiers {
        ctrl: true,
        alt: false,
        shift: false,
        meta: false,
    };

    /// Shift modifier.
    pub const SHIFT: Modifiers = Modifiers {
        ctrl: false,
        alt: false,
        shift: true,
        meta: false,
    };

    /// Alt modifier.
    pub const ALT: Modifiers = Modifiers {
        ctrl: false,
        alt: true,
        shift: false,
        meta: false,
    };

    /// Returns true if no modifiers are pressed.
    pub fn is_empty(&self) -> bool {
        !self.ctrl && !self.alt && !self.shift && !self.meta
    }

    /// True when only shift (or nothing) is held, so a character key types.
    pub fn is_typing(&self) -> bool {
        !self.ctrl && !self.alt && !self.meta
    }

    /// Parses modifiers from a string like "ctrl+shift".
    pub fn parse(s: &str) -> Self {
        let mut mods = Modifiers::NONE;
        for part in s.split('+').map(str::trim).map(str::to_lowercase) {
            match part.as_str() {
                "ctrl" | "control" | "c" => mods.ctrl = true,
                "alt" | "option" | "m" => mods.alt = true,
                "shift" | "s" => mods.shift = true,
                "meta" | "cmd" | "super" => mods.meta = true,
                _ => {}
            }
        }
        mods
    }
}

impl std::fmt::Display for Modifiers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut parts = Vec::new();
        if self.ctrl {
            parts.push("Ctrl");
        }
        if self.alt {
            parts.push("Alt");
        }
        if self.shift {
            parts.push("Shift");
        }
        if self.meta {
            parts.push("Meta");
        }
        write!(f, "{}", parts.join("+"))
    }
}

/// A key code.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    Char(char),
    Enter,
    Tab,
    Backspace,
    Delete,
    Escape,
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    PageUp,
    PageDown,
    Insert,
    F(u8),
    Space,
}

impl Key {
    /// Parses a key from a string.
    pub fn parse(s: &str) -> Option<Self> {
        let lower = s.to_lowercase();
        match lower.as_str() {
            "enter" | "return" | "ret" => Some(Key::Enter),
            "tab" => Some(Key::Tab),
            "backspace" | "bs" => Some(Key::Backspace),
            "delete" | "del" => Some(Key::Delete),
            "escape" | "esc" => Some(Key::Escape),
            "up" => Some(Key::Up),
            "down" => Some(Key::Down),
            "left" => Some(Key::Left),
            "right" => Some(Key::Right),
            "home" => Some(Key::Home),
            "end" => Some(Key::End),
            "pageup" | "pgup" => Some(Key::PageUp),
            "pagedown" | "pgdn" => Some(Key::PageDown),
            "insert" | "ins" => Some(Key::Insert),
            "space" | "spc" => Some(Key::Space),
            _ if lower.starts_with('f') && lower.len() > 1 && lower.len() <= 3 => {
                lower[1..].parse().ok().map(Key::F)
            }
            _ => {
                let mut chars = s.chars();
                match (chars.next(), chars.next()) {
                    (Some(' '), None) => Some(Key::Space),
                    (Some(c), None) => Some(Key::Char(c)),
                    _ => None,
                }
            }
        }
    }
}

impl std::fmt::Display for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Key::Char(c) => write!(f, "{}", c),
            Key::Enter => write!(f, "Enter"),
            Key::Tab => write!(f, "Tab"),
            Key::Backspace => write!(f, "Backspace"),
            Key::Delete => write!(f, "Delete"),
            Key::Escape => write!(f, "Escape"),
            Key::Up => write!(f, "Up"),
            Key::Down => write!(f, "Down"),
            Key::Left => write!(f, "Left"),
            Key::Right => write!(f, "Right"),
            Key::Home => write!(f, "Home"),
            Key::End => write!(f, "End"),
            Key::PageUp => write!(f, "PageUp"),
            Key::PageDown => write!(f, "PageDown"),
            Key::Insert => write!(f, "Insert"),
            Key::F(n) => write!(f, "F{}", n),
            Key::Space => write!(f, "Space"),
        }
    }
}

/// A key press event.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyPress {
    pub key: Key,
    pub modifiers: Modifiers,
}

impl KeyPress {
    /// Creates a new key press.
    pub fn new(key: Key, modifiers: Modifiers) -> Self {
        Self { key, modifiers }
    }

    /// An unmodified key.
    pub fn plain(key: Key) -> Self {
        Self::new(key, Modifiers::NONE)
    }

    /// Ctrl plus a character.
    pub fn ctrl(c: char) -> Self {
        Self::new(Key::Char(c), Modifiers::CTRL)
    }

    /// Parses a single key like "ctrl+s", "ctrl++" or "[".
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if s == "+" {
            return Some(Self::plain(Key::Char('+')));
        }
        if let Some(mods) = s.strip_suffix("++") {
            return Some(Self::new(Key::Char('+'), Modifiers::parse(mods)));
        }
        let (mod_str, key_str) = match s.rsplit_once('+') {
            Some((mods, key)) => (mods, key),
            None => ("", s),
        };
        let key = Key::parse(key_str)?;
        Some(Self {
            key,
            modifiers: Modifiers::parse(mod_str),
        })
    }

    /// Parses a whitespace-separated key sequence like "ctrl+x ctrl+s".
    pub fn parse_sequence(s: &str) -> Option<Vec<Self>> {
        let keys: Option<Vec<Self>> = s.split_whitespace().map(Self::parse).collect();
        keys.filter(|k| !k.is_empty())
    }

    /// The character this key types when it self-inserts: printable ASCII,
    /// space or tab, with no command modifier held.
    pub fn typed_char(&self) -> Option<char> {
        if !self.modifiers.is_typing() {
            return None;
        }
        match self.key {
            Key::Char(c) if (' '..='~').contains(&c) => Some(c),
            Key::Space => Some(' '),
            Key::Tab => Some('\t'),
            _ => None,
        }
    }

    /// The character a quoted insert produces for this key, ignoring
    /// modifiers.
    pub fn literal_char(&self) -> Option<char> {
        match self.key {
            Key::Char(c) => Some(c),
            Key::Space => Some(' '),
            Key::Tab => Some('\t'),
            Key::Enter => Some('\n'),
            _ => None,
        }
    }
}

impl std::fmt::Display for KeyPress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.modifiers.is_empty() {
            write!(f, "{}", self.key)
        } else {
            write!(f, "{}-{}", self.modifiers, self.key)
        }
    }
}

/// A key binding maps a key sequence to a command.
#[derive(Debug, Clone)]
pub struct KeyBinding {
    /// The key sequence (more than one key for chords).
    pub keys: Vec<KeyPress>,
    /// The command to execute.
    pub command: Command,
}

impl KeyBinding {
    /// Creates a single-key binding.
    pub fn simple(key: KeyPress, command: Command) -> Self {
        Self {
            keys: vec![key],
            command,
        }
    }

    /// Returns the key sequence as a string.
    pub fn key_string(&self) -> String {
        self.keys
            .iter()
            .map(|k| k.to_string())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Keyboard mapping configuration.
pub struct Keymap {
    /// All key bindings. Later bindings shadow earlier ones.
    bindings: Vec<KeyBinding>,
    /// Index by first key for fast lookup.
    by_key: HashMap<KeyPress, Vec<usize>>,
    /// Keys typed so far in an unfinished chord.
    pending: Vec<KeyPress>,
}

impl Keymap {
    /// Creates a new keymap with default bindings.
    pub fn new() -> Self {
        let mut keymap = Self {
            bindings: Vec::new(),
            by_key: HashMap::new(),
            pending: Vec::new(),
        };
        keymap.add_default_bindings();
        keymap.rebuild_index();
        keymap
    }

    /// Creates a keymap from configuration. User bindings are layered over
    /// the defaults; unparseable entries are skipped with a warning.
    pub fn from_config(config: &Config) -> Self {
        let mut keymap = Self::new();

        let mut user: Vec<_> = config.keyboard.bindings.iter().collect();
        user.sort();
        for (key_str, cmd_str) in user {
            match (KeyPress::parse_sequence(key_str), Command::parse(cmd_str)) {
                (Some(keys), Some(command)) => keymap.bindings.push(KeyBinding { keys, command }),
                _ => tracing::warn!("Ignoring key binding {:?} = {:?}", key_str, cmd_str),
            }
        }

        keymap.rebuild_index();
        keymap
    }

    fn add_default_bindings(&mut self) {
        use crate::command::Command::*;

        let plain = KeyPress::plain;
        let ctrl = KeyPress::ctrl;
        let bindings = vec![
            // Structure
            (plain(Key::Char('[')), InsertBox { kind: BoxKind::Plain }),
            (plain(Key::Char('(')), InsertBox { kind: BoxKind::Code }),
            (plain(Key::Char(']')), ExitBoxRight),
            (plain(Key::Char(')')), ExitBoxRight),
            (ctrl('['), EnterBox),
            (ctrl('('), EnterBox),
            (ctrl(']'), ExitBoxLeft),
            (ctrl(')'), ExitBoxLeft),
            (ctrl('\\'), FormatMarkdown),
            // Motion
            (ctrl('f'), MoveForward),
            (ctrl('b'), MoveBackward),
            (ctrl('p'), MoveUp),
            (ctrl('n'), MoveDown),
            (plain(Key::Right), MoveForward),
            (plain(Key::Left), MoveBackward),
            (plain(Key::Up), MoveUp),
            (plain(Key::Down), MoveDown),
            (ctrl('a'), MoveToStartOfLine),
            (ctrl('e'), MoveToEndOfLine),
            (plain(Key::Home), MoveToStartOfLine),
            (plain(Key::End), MoveToEndOfLine),
            (ctrl(','), MoveToStartOfBox),
            (ctrl('.'), MoveToEndOfBox),
            // Editing
            (plain(Key::Backspace), DeleteBackward),
            (plain(Key::Delete), DeleteForward),
            (ctrl('d'), DeleteForward),
            (plain(Key::Enter), InsertNewline),
            (ctrl('k'), KillLine),
            (ctrl('y'), Yank),
            (ctrl('q'), QuotedInsert),
            (KeyPress::new(Key::Space, Modifiers::CTRL), SetMark),
            (ctrl('g'), ClearMark),
        ];

        for (key, command) in bindings {
            self.bindings.push(KeyBinding::simple(key, command));
        }
        self.bindings.push(KeyBinding {
            keys: vec![ctrl('x'), ctrl('s')],
            command: Save,
        });
    }

    /// Rebuilds the key index.
    fn rebuild_index(&mut self) {
        self.by_key.clear();
        for (i, binding) in self.bindings.iter().enumerate() {
            if let Some(first_key) = binding.keys.first() {
                self.by_key.entry(first_key.clone()).or_default().push(i);
            }
        }
    }

    /// Processes a key press.
    pub fn process(&mut self, key: KeyPress) -> KeymapResult {
        self.pending.push(key);

        let indices = match self.by_key.get(&self.pending[0]) {
            Some(v) => v.clone(),
            None => return KeymapResult::NoMatch(std::mem::take(&mut self.pending)),
        };

        let mut exact_match = None;
        let mut prefix_match = false;

        for i in indices {
            let binding = &self.bindings[i];
            if binding.keys == self.pending {
                exact_match = Some(binding.command.clone());
            } else if binding.keys.len() > self.pending.len()
                && binding.keys[..self.pending.len()] == self.pending[..]
            {
                prefix_match = true;
            }
        }

        if let Some(cmd) = exact_match {
            self.pending.clear();
            return KeymapResult::Match(cmd);
        }

        if prefix_match {
            return KeymapResult::Pending;
        }

        KeymapResult::NoMatch(std::mem::take(&mut self.pending))
    }

    /// Clears pending keys.
    pub fn clear_pending(&mut self) {
        self.pending.clear();
    }

    /// Returns true if waiting for more keys.
    pub fn is_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Returns all bindings.
    pub fn bindings(&self) -> &[KeyBinding] {
        &self.bindings
    }

    /// The command a single key is bound to, if any.
    pub fn lookup(&self, key: &KeyPress) -> Option<&Command> {
        self.by_key
            .get(key)?
            .iter()
            .rev()
            .map(|&i| &self.bindings[i])
            .find(|b| b.keys.len() == 1)
            .map(|b| &b.command)
    }

    /// Adds a binding.
    pub fn add_binding(&mut self, binding: KeyBinding) {
        self.bindings.push(binding);
        self.rebuild_index();
    }
}

impl Default for Keymap {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of processing a key.
#[derive(Debug, Clone)]
pub enum KeymapResult {
    /// A command was matched.
    Match(Command),
    /// Waiting for more keys.
    Pending,
    /// No binding matches; carries every key of the abandoned sequence.
    NoMatch(Vec<KeyPress>),
}
