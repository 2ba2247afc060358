//! Configurable keyboard shortcuts.
//!
//! Navigation keys (arrows, `j`/`k`, PgUp/PgDn, Home/End, Enter, Esc) are
//! fixed. Everything else maps to an [`Action`] through the [`Keymap`], which
//! starts from the defaults and takes overrides from the `[keys]` config table.

use std::collections::HashMap;
use std::fmt;

use anyhow::{anyhow, bail, Result};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// A user command reachable through a shortcut.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Search,
    Refresh,
    CheckAll,
    CheckSelected,
    Add,
    Edit,
    Delete,
    FilterAll,
    FilterUp,
    FilterDown,
    FilterUnknown,
    FilterSlow,
    FilterChanged,
    ToggleCompact,
    Export,
    Logout,
    Help,
    Quit,
}

impl Action {
    /// Every action, in help-listing order.
    pub const ALL: [Action; 18] = [
        Action::Search,
        Action::Refresh,
        Action::CheckAll,
        Action::CheckSelected,
        Action::Add,
        Action::Edit,
        Action::Delete,
        Action::FilterAll,
        Action::FilterUp,
        Action::FilterDown,
        Action::FilterUnknown,
        Action::FilterSlow,
        Action::FilterChanged,
        Action::ToggleCompact,
        Action::Export,
        Action::Logout,
        Action::Help,
        Action::Quit,
    ];

    /// Name used in the `[keys]` config table.
    pub fn name(&self) -> &'static str {
        match self {
            Action::Search => "search",
            Action::Refresh => "refresh",
            Action::CheckAll => "check_all",
            Action::CheckSelected => "check_selected",
            Action::Add => "add",
            Action::Edit => "edit",
            Action::Delete => "delete",
            Action::FilterAll => "filter_all",
            Action::FilterUp => "filter_up",
            Action::FilterDown => "filter_down",
            Action::FilterUnknown => "filter_unknown",
            Action::FilterSlow => "filter_slow",
            Action::FilterChanged => "filter_changed",
            Action::ToggleCompact => "toggle_compact",
            Action::Export => "export",
            Action::Logout => "logout",
            Action::Help => "help",
            Action::Quit => "quit",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Action::Search => "Search name/host",
            Action::Refresh => "Refresh now",
            Action::CheckAll => "Check all services",
            Action::CheckSelected => "Check selected service",
            Action::Add => "Add service",
            Action::Edit => "Edit selected service",
            Action::Delete => "Delete selected service",
            Action::FilterAll => "Show all",
            Action::FilterUp => "Show up",
            Action::FilterDown => "Show down",
            Action::FilterUnknown => "Show unknown",
            Action::FilterSlow => "Show slow",
            Action::FilterChanged => "Show recently changed",
            Action::ToggleCompact => "Toggle compact rows",
            Action::Export => "Export to JSON",
            Action::Logout => "Log out",
            Action::Help => "Toggle help",
            Action::Quit => "Quit",
        }
    }

    pub fn from_name(name: &str) -> Option<Action> {
        let name = name.trim().to_ascii_lowercase();
        Self::ALL.into_iter().find(|a| a.name() == name)
    }

    fn default_keys(&self) -> &'static [&'static str] {
        match self {
            Action::Search => &["ctrl+k", "/"],
            Action::Refresh => &["r"],
            Action::CheckAll => &["a"],
            Action::CheckSelected => &["C"],
            Action::Add => &["n"],
            Action::Edit => &["e"],
            Action::Delete => &["x"],
            Action::FilterAll => &["0"],
            Action::FilterUp => &["u"],
            Action::FilterDown => &["d"],
            Action::FilterUnknown => &["?"],
            Action::FilterSlow => &["l"],
            Action::FilterChanged => &["c"],
            Action::ToggleCompact => &["m"],
            Action::Export => &["E"],
            Action::Logout => &["L"],
            Action::Help => &["h"],
            Action::Quit => &["q"],
        }
    }
}

/// A single key chord such as `r`, `ctrl+k` or `F5`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyBinding {
    code: KeyCode,
    modifiers: KeyModifiers,
}

impl KeyBinding {
    pub fn new(code: KeyCode, modifiers: KeyModifiers) -> Self {
        let (code, modifiers) = normalize(code, modifiers);
        Self { code, modifiers }
    }

    /// Parse a chord written as `[ctrl+][alt+][shift+]key`.
    ///
    /// Single characters are case-sensitive (`C` differs from `c`); named
    /// keys (`enter`, `esc`, `f1`..`f12`, ...) are not.
    pub fn parse(spec: &str) -> Result<Self> {
        let spec = spec.trim();
        if spec.is_empty() {
            bail!("Empty key binding");
        }

        let mut modifiers = KeyModifiers::NONE;
        let mut rest = spec;
        while let Some((prefix, tail)) = rest.split_once('+') {
            if tail.is_empty() {
                break;
            }
            match prefix.to_ascii_lowercase().as_str() {
                "ctrl" | "control" => modifiers |= KeyModifiers::CONTROL,
                "alt" => modifiers |= KeyModifiers::ALT,
                "shift" => modifiers |= KeyModifiers::SHIFT,
                other => bail!("Unknown modifier '{}' in '{}'", other, spec),
            }
            rest = tail;
        }

        let code = parse_code(rest).ok_or_else(|| anyhow!("Unknown key '{}' in '{}'", rest, spec))?;
        Ok(Self::new(code, modifiers))
    }

    /// Whether a terminal key event triggers this binding.
    pub fn matches(&self, key: &KeyEvent) -> bool {
        let (code, modifiers) = normalize(key.code, key.modifiers);
        self.code == code && self.modifiers == modifiers
    }
}

/// Characters carry their own case, so SHIFT is dropped for them.
fn normalize(code: KeyCode, modifiers: KeyModifiers) -> (KeyCode, KeyModifiers) {
    let mut modifiers =
        modifiers.intersection(KeyModifiers::CONTROL | KeyModifiers::ALT | KeyModifiers::SHIFT);
    if let KeyCode::Char(_) = code {
        modifiers.remove(KeyModifiers::SHIFT);
    }
    if code == KeyCode::BackTab {
        modifiers.remove(KeyModifiers::SHIFT);
    }
    (code, modifiers)
}

fn parse_code(key: &str) -> Option<KeyCode> {
    let mut chars = key.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        return Some(KeyCode::Char(c));
    }

    let lower = key.to_ascii_lowercase();
    let code = match lower.as_str() {
        "enter" | "return" => KeyCode::Enter,
        "esc" | "escape" => KeyCode::Esc,
        "tab" => KeyCode::Tab,
        "backtab" => KeyCode::BackTab,
        "backspace" => KeyCode::Backspace,
        "space" => KeyCode::Char(' '),
        "up" => KeyCode::Up,
        "down" => KeyCode::Down,
        "left" => KeyCode::Left,
        "right" => KeyCode::Right,
        "home" => KeyCode::Home,
        "end" => KeyCode::End,
        "pageup" | "pgup" => KeyCode::PageUp,
        "pagedown" | "pgdn" => KeyCode::PageDown,
        "delete" | "del" => KeyCode::Delete,
        "insert" | "ins" => KeyCode::Insert,
        _ => {
            let n: u8 = lower.strip_prefix('f')?.parse().ok()?;
            if (1..=12).contains(&n) {
                KeyCode::F(n)
            } else {
                return None;
            }
        }
    };
    Some(code)
}

impl fmt::Display for KeyBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.modifiers.contains(KeyModifiers::CONTROL) {
            f.write_str("ctrl+")?;
        }
        if self.modifiers.contains(KeyModifiers::ALT) {
            f.write_str("alt+")?;
        }
        if self.modifiers.contains(KeyModifiers::SHIFT) {
            f.write_str("shift+")?;
        }
        match self.code {
            KeyCode::Char(' ') => f.write_str("Space"),
            KeyCode::Char(c) => write!(f, "{}", c),
            KeyCode::F(n) => write!(f, "F{}", n),
            KeyCode::Enter => f.write_str("Enter"),
            KeyCode::Esc => f.write_str("Esc"),
            KeyCode::Tab => f.write_str("Tab"),
            KeyCode::BackTab => f.write_str("BackTab"),
            KeyCode::Backspace => f.write_str("Backspace"),
            KeyCode::Up => f.write_str("↑"),
            KeyCode::Down => f.write_str("↓"),
            KeyCode::Left => f.write_str("←"),
            KeyCode::Right => f.write_str("→"),
            KeyCode::Home => f.write_str("Home"),
            KeyCode::End => f.write_str("End"),
            KeyCode::PageUp => f.write_str("PgUp"),
            KeyCode::PageDown => f.write_str("PgDn"),
            KeyCode::Delete => f.write_str("Del"),
            KeyCode::Insert => f.write_str("Ins"),
            other => write!(f, "{:?}", other),
        }
    }
}

/// Shortcut table.
#[derive(Debug, Clone, PartialEq)]
pub struct Keymap {
    bindings: Vec<(KeyBinding, Action)>,
}

impl Default for Keymap {
    fn default() -> Self {
        let bindings = Action::ALL
            .iter()
            .flat_map(|action| {
                action.default_keys().iter().filter_map(move |spec| {
                    KeyBinding::parse(spec).ok().map(|binding| (binding, *action))
                })
            })
            .collect();
        Self { bindings }
    }
}

impl Keymap {
    /// Apply `[keys]` overrides on top of the defaults.
    ///
    /// Each entry maps an action name to one or more comma-separated chords,
    /// which replace that action's defaults. A chord claimed by an override
    /// is taken away from whichever action held it before.
    pub fn from_overrides(overrides: &HashMap<String, String>) -> Result<Self> {
        let mut keymap = Self::default();

        let mut names: Vec<&String> = overrides.keys().collect();
        names.sort();

        for name in names {
            let action = Action::from_name(name)
                .ok_or_else(|| anyhow!("Unknown action '{}' in [keys]", name))?;
            let chords = overrides[name]
                .split(',')
                .map(KeyBinding::parse)
                .collect::<Result<Vec<_>>>()?;

            keymap
                .bindings
                .retain(|(binding, bound)| *bound != action && !chords.contains(binding));
            keymap.bindings.extend(chords.into_iter().map(|c| (c, action)));
        }
        Ok(keymap)
    }

    /// The action bound to a key event, if any.
    pub fn action_for(&self, key: &KeyEvent) -> Option<Action> {
        self.bindings
            .iter()
            .find(|(binding, _)| binding.matches(key))
            .map(|(_, action)| *action)
    }

    pub fn keys_for(&self, action: Action) -> Vec<KeyBinding> {
        self.bindings
            .iter()
            .filter(|(_, bound)| *bound == action)
            .map(|(binding, _)| *binding)
            .collect()
    }

    /// First chord for an action, formatted for hints.
    pub fn hint(&self, action: Action) -> String {
        self.keys_for(action)
            .first()
            .map(|k| k.to_string())
            .unwrap_or_else(|| "-".to_string())
    }

    /// `(keys, description)` rows for the help overlay.
    pub fn help_entries(&self) -> Vec<(String, &'static str)> {
        Action::ALL
            .iter()
            .map(|action| {
                let keys: Vec<String> =
                    self.keys_for(*action).iter().map(|k| k.to_string()).collect();
                let keys = if keys.is_empty() {
                    "-".to_string()
                } else {
                    keys.join(" ")
                };
                (keys, action.description())
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    #[test]
    fn test_default_bindings() {
        let keymap = Keymap::default();

        assert_eq!(
            keymap.action_for(&key(KeyCode::Char('k'), KeyModifiers::CONTROL)),
            Some(Action::Search)
        );
        assert_eq!(
            keymap.action_for(&key(KeyCode::Char('/'), KeyModifiers::NONE)),
            Some(Action::Search)
        );
        assert_eq!(
            keymap.action_for(&key(KeyCode::Char('r'), KeyModifiers::NONE)),
            Some(Action::Refresh)
        );
        assert_eq!(
            keymap.action_for(&key(KeyCode::Char('0'), KeyModifiers::NONE)),
            Some(Action::FilterAll)
        );
        // Plain k is navigation, not search
        assert_eq!(keymap.action_for(&key(KeyCode::Char('k'), KeyModifiers::NONE)), None);
    }

    #[test]
    fn test_shifted_characters_match_by_case() {
        let keymap = Keymap::default();

        assert_eq!(
            keymap.action_for(&key(KeyCode::Char('C'), KeyModifiers::SHIFT)),
            Some(Action::CheckSelected)
        );
        assert_eq!(
            keymap.action_for(&key(KeyCode::Char('c'), KeyModifiers::NONE)),
            Some(Action::FilterChanged)
        );
        assert_eq!(
            keymap.action_for(&key(KeyCode::Char('?'), KeyModifiers::SHIFT)),
            Some(Action::FilterUnknown)
        );
    }

    #[test]
    fn test_parse_bindings() {
        assert_eq!(
            KeyBinding::parse("ctrl+k").unwrap(),
            KeyBinding::new(KeyCode::Char('k'), KeyModifiers::CONTROL)
        );
        assert_eq!(
            KeyBinding::parse("F5").unwrap(),
            KeyBinding::new(KeyCode::F(5), KeyModifiers::NONE)
        );
        assert_eq!(
            KeyBinding::parse("Enter").unwrap(),
            KeyBinding::new(KeyCode::Enter, KeyModifiers::NONE)
        );
        assert_eq!(
            KeyBinding::parse("+").unwrap(),
            KeyBinding::new(KeyCode::Char('+'), KeyModifiers::NONE)
        );
        assert!(KeyBinding::parse("hyper+x").is_err());
        assert!(KeyBinding::parse("f13").is_err());
        assert!(KeyBinding::parse("").is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(KeyBinding::parse("ctrl+k").unwrap().to_string(), "ctrl+k");
        assert_eq!(KeyBinding::parse("f5").unwrap().to_string(), "F5");
    }

    #[test]
    fn test_overrides_replace_and_steal() {
        let overrides: HashMap<String, String> = [
            ("refresh".to_string(), "F5, R".to_string()),
            ("quit".to_string(), "r".to_string()),
        ]
        .into_iter()
        .collect();
        let keymap = Keymap::from_overrides(&overrides).unwrap();

        assert_eq!(
            keymap.action_for(&key(KeyCode::F(5), KeyModifiers::NONE)),
            Some(Action::Refresh)
        );
        assert_eq!(
            keymap.action_for(&key(KeyCode::Char('r'), KeyModifiers::NONE)),
            Some(Action::Quit)
        );
        assert_eq!(keymap.action_for(&key(KeyCode::Char('q'), KeyModifiers::NONE)), None);
        assert_eq!(keymap.keys_for(Action::Refresh).len(), 2);
    }

    #[test]
    fn test_unknown_action_rejected() {
        let overrides: HashMap<String, String> =
            [("launch".to_string(), "z".to_string())].into_iter().collect();
        assert!(Keymap::from_overrides(&overrides).is_err());
    }

    #[test]
    fn test_help_covers_every_action() {
        let entries = Keymap::default().help_entries();
        assert_eq!(entries.len(), Action::ALL.len());
        assert_eq!(entries[0].0, "ctrl+k /");
    }
}
