//! Key bindings: arrows or vim keys move the cursor; space/enter taps.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Action from a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    CursorUp,
    CursorDown,
    CursorLeft,
    CursorRight,
    /// Tap the tile under the cursor (select / swap), or confirm on an overlay.
    Tap,
    Bomb,
    Shuffle,
    /// Ask to wipe saved progress (confirmed separately).
    Reset,
    Confirm,
    Cancel,
    Quit,
    None,
}

/// Map key event to game action. Supports both normal (arrows, space) and vim (hjkl) keys.
pub fn key_to_action(key: KeyEvent) -> Action {
    let KeyEvent { code, modifiers, .. } = key;
    if modifiers == KeyModifiers::CONTROL && code == KeyCode::Char('c') {
        return Action::Quit;
    }
    let no_mod = modifiers.is_empty() || modifiers == KeyModifiers::SHIFT;
    if !no_mod {
        return Action::None;
    }
    match code {
        KeyCode::Char('q') => Action::Quit,
        KeyCode::Esc => Action::Cancel,
        KeyCode::Up | KeyCode::Char('k') => Action::CursorUp,
        KeyCode::Down | KeyCode::Char('j') => Action::CursorDown,
        KeyCode::Left | KeyCode::Char('h') => Action::CursorLeft,
        KeyCode::Right | KeyCode::Char('l') => Action::CursorRight,
        KeyCode::Char(' ') => Action::Tap,
        KeyCode::Enter => Action::Confirm,
        KeyCode::Char('b') | KeyCode::Char('B') => Action::Bomb,
        KeyCode::Char('s') | KeyCode::Char('S') => Action::Shuffle,
        KeyCode::Char('r') | KeyCode::Char('R') => Action::Reset,
        KeyCode::Char('y') | KeyCode::Char('Y') => Action::Confirm,
        KeyCode::Char('n') | KeyCode::Char('N') => Action::Cancel,
        _ => Action::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn arrows_and_vim_keys_move_cursor() {
        assert_eq!(key_to_action(key(KeyCode::Up)), Action::CursorUp);
        assert_eq!(key_to_action(key(KeyCode::Char('k'))), Action::CursorUp);
        assert_eq!(key_to_action(key(KeyCode::Char('h'))), Action::CursorLeft);
        assert_eq!(key_to_action(key(KeyCode::Right)), Action::CursorRight);
    }

    #[test]
    fn game_keys() {
        assert_eq!(key_to_action(key(KeyCode::Char(' '))), Action::Tap);
        assert_eq!(key_to_action(key(KeyCode::Enter)), Action::Confirm);
        assert_eq!(key_to_action(key(KeyCode::Char('b'))), Action::Bomb);
        assert_eq!(key_to_action(key(KeyCode::Char('s'))), Action::Shuffle);
        assert_eq!(key_to_action(key(KeyCode::Char('r'))), Action::Reset);
        assert_eq!(key_to_action(key(KeyCode::Char('y'))), Action::Confirm);
        assert_eq!(key_to_action(key(KeyCode::Char('n'))), Action::Cancel);
    }

    #[test]
    fn ctrl_c_quits_other_chords_ignored() {
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(key_to_action(ctrl_c), Action::Quit);
        let alt_b = KeyEvent::new(KeyCode::Char('b'), KeyModifiers::ALT);
        assert_eq!(key_to_action(alt_b), Action::None);
    }
}
