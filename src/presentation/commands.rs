use crate::domain::keybinding::{Action, Keybind};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::collections::HashMap;
use tracing::warn;

pub struct CommandRegistry {
    display_bindings: HashMap<Action, KeyEvent>,
    input_bindings: Vec<(KeyEvent, Action)>,
}

impl Default for CommandRegistry {
    fn default() -> Self {
        let mut display_bindings = HashMap::new();
        let mut input_bindings = Vec::new();

        let mut register = |action: Action, key: KeyEvent, is_primary: bool| {
            if is_primary {
                display_bindings.insert(action, key);
            }
            input_bindings.push((key, action));
        };

        register(
            Action::Quit,
            KeyEvent::new(KeyCode::Char('q'), KeyModifiers::NONE),
            true,
        );
        register(
            Action::Quit,
            KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL),
            false,
        );
        register(
            Action::Logout,
            KeyEvent::new(KeyCode::Char('L'), KeyModifiers::SHIFT),
            true,
        );
        register(
            Action::ToggleHelp,
            KeyEvent::new(KeyCode::Char('?'), KeyModifiers::NONE),
            true,
        );
        register(
            Action::ToggleHelp,
            KeyEvent::new(KeyCode::Char('?'), KeyModifiers::SHIFT),
            false,
        );
        register(
            Action::ToggleHelp,
            KeyEvent::new(KeyCode::F(1), KeyModifiers::NONE),
            false,
        );
        register(
            Action::Refresh,
            KeyEvent::new(KeyCode::Char('r'), KeyModifiers::NONE),
            true,
        );

        register(
            Action::NavigateUp,
            KeyEvent::new(KeyCode::Up, KeyModifiers::NONE),
            true,
        );
        register(
            Action::NavigateUp,
            KeyEvent::new(KeyCode::Char('k'), KeyModifiers::NONE),
            false,
        );
        register(
            Action::NavigateDown,
            KeyEvent::new(KeyCode::Down, KeyModifiers::NONE),
            true,
        );
        register(
            Action::NavigateDown,
            KeyEvent::new(KeyCode::Char('j'), KeyModifiers::NONE),
            false,
        );
        register(
            Action::NavigateLeft,
            KeyEvent::new(KeyCode::Left, KeyModifiers::NONE),
            true,
        );
        register(
            Action::NavigateLeft,
            KeyEvent::new(KeyCode::Char('h'), KeyModifiers::NONE),
            false,
        );
        register(
            Action::NavigateRight,
            KeyEvent::new(KeyCode::Right, KeyModifiers::NONE),
            true,
        );
        register(
            Action::NavigateRight,
            KeyEvent::new(KeyCode::Char('l'), KeyModifiers::NONE),
            false,
        );
        register(
            Action::SelectFirst,
            KeyEvent::new(KeyCode::Char('g'), KeyModifiers::NONE),
            true,
        );
        register(
            Action::SelectFirst,
            KeyEvent::new(KeyCode::Home, KeyModifiers::NONE),
            false,
        );
        register(
            Action::SelectLast,
            KeyEvent::new(KeyCode::Char('G'), KeyModifiers::SHIFT),
            true,
        );
        register(
            Action::SelectLast,
            KeyEvent::new(KeyCode::End, KeyModifiers::NONE),
            false,
        );

        register(
            Action::NewTask,
            KeyEvent::new(KeyCode::Char('a'), KeyModifiers::NONE),
            true,
        );
        register(
            Action::EditTask,
            KeyEvent::new(KeyCode::Char('e'), KeyModifiers::NONE),
            true,
        );
        register(
            Action::EditTask,
            KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE),
            false,
        );
        register(
            Action::DeleteTask,
            KeyEvent::new(KeyCode::Char('d'), KeyModifiers::NONE),
            true,
        );
        register(
            Action::DeleteTask,
            KeyEvent::new(KeyCode::Delete, KeyModifiers::NONE),
            false,
        );
        register(
            Action::GrabTask,
            KeyEvent::new(KeyCode::Char(' '), KeyModifiers::NONE),
            true,
        );
        register(
            Action::DropTask,
            KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE),
            true,
        );
        register(
            Action::Cancel,
            KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE),
            true,
        );

        Self {
            display_bindings,
            input_bindings,
        }
    }
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the default registry with user overrides from the config file.
    ///
    /// Overrides take precedence over the defaults; unparseable keys are
    /// logged and skipped.
    pub fn with_overrides(overrides: &HashMap<String, Action>) -> Self {
        let mut registry = Self::default();

        let mut parsed: Vec<(KeyEvent, Action)> = overrides
            .iter()
            .filter_map(|(spec, action)| match parse_key(spec) {
                Some(key) => Some((key, *action)),
                None => {
                    warn!(key = %spec, "Ignoring unparseable keybinding");
                    None
                }
            })
            .collect();
        parsed.sort_by_key(|(key, _)| format!("{key:?}"));

        for (key, action) in parsed.into_iter().rev() {
            registry.display_bindings.insert(action, key);
            registry.input_bindings.insert(0, (key, action));
        }

        registry
    }

    pub fn get(&self, action: Action) -> Option<KeyEvent> {
        self.display_bindings.get(&action).copied()
    }

    pub fn find_action(&self, key: KeyEvent) -> Option<Action> {
        self.input_bindings
            .iter()
            .find(|(k, _)| k.code == key.code && k.modifiers == key.modifiers)
            .map(|(_, a)| *a)
    }

    /// Keybinds for the given actions, in order, skipping unbound ones.
    pub fn keybinds(&self, actions: &[Action]) -> Vec<Keybind> {
        actions
            .iter()
            .filter_map(|action| self.get(*action).map(|key| Keybind::new(key, *action)))
            .collect()
    }
}

pub trait HasCommands {
    fn get_commands(&self, registry: &CommandRegistry) -> Vec<Keybind>;
}

/// Parses key specs such as `"x"`, `"Ctrl+q"`, `"Shift+Tab"` or `"F5"`.
#[must_use]
pub fn parse_key(spec: &str) -> Option<KeyEvent> {
    let mut parts: Vec<&str> = spec.split('+').map(str::trim).collect();
    // "Ctrl++" binds the plus key.
    if spec.ends_with("++") {
        parts.truncate(parts.len().saturating_sub(2));
        parts.push("+");
    }
    let (key, modifiers) = parts.split_last()?;

    let mut mods = KeyModifiers::NONE;
    for modifier in modifiers {
        match modifier.to_ascii_lowercase().as_str() {
            "ctrl" | "control" | "c" => mods |= KeyModifiers::CONTROL,
            "alt" | "a" => mods |= KeyModifiers::ALT,
            "shift" | "s" => mods |= KeyModifiers::SHIFT,
            _ => return None,
        }
    }

    let code = match key.to_ascii_lowercase().as_str() {
        "enter" | "return" => KeyCode::Enter,
        "esc" | "escape" => KeyCode::Esc,
        "tab" => KeyCode::Tab,
        "backtab" => KeyCode::BackTab,
        "space" => KeyCode::Char(' '),
        "backspace" | "bksp" => KeyCode::Backspace,
        "delete" | "del" => KeyCode::Delete,
        "up" => KeyCode::Up,
        "down" => KeyCode::Down,
        "left" => KeyCode::Left,
        "right" => KeyCode::Right,
        "home" => KeyCode::Home,
        "end" => KeyCode::End,
        "pageup" => KeyCode::PageUp,
        "pagedown" => KeyCode::PageDown,
        lower if lower.len() > 1 && lower.starts_with('f') => {
            KeyCode::F(lower[1..].parse().ok().filter(|n| (1..=12).contains(n))?)
        }
        _ => {
            let mut chars = key.chars();
            let c = chars.next()?;
            if chars.next().is_some() {
                return None;
            }
            if c.is_ascii_uppercase() {
                mods |= KeyModifiers::SHIFT;
            }
            if mods.contains(KeyModifiers::SHIFT) && c.is_ascii_lowercase() {
                KeyCode::Char(c.to_ascii_uppercase())
            } else {
                KeyCode::Char(c)
            }
        }
    };

    Some(KeyEvent::new(code, mods))
}
