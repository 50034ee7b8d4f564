//! Keyboard input handling.
//!
//! Maps terminal key events to [`App`] actions.  There are two modes: the
//! normal list mode, and search mode (entered with `/`) where printable keys
//! edit the filter.
//!
//! ## For contributors
//!
//! To add a new keybinding:
//!
//! 1. Add a method on [`App`] for the action (if one doesn't exist).
//! 2. Add a `KeyCode` match arm in [`handle_key_event`] that calls it.
//! 3. Update the help text in `ui::draw_status_bar`.

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind};

use crate::app::{Action, App};

/// Process a single key event, updating app state accordingly.
///
/// Only reacts to key-press events (ignoring release / repeat) so that each
/// physical keypress triggers exactly one action.
pub fn handle_key_event(app: &mut App, key: KeyEvent) {
    if key.kind != KeyEventKind::Press {
        return;
    }

    if app.typing {
        match key.code {
            KeyCode::Esc => app.clear_search(),
            KeyCode::Enter => app.finish_search(),
            KeyCode::Backspace => app.pop_search_char(),
            KeyCode::Down => app.select_next(),
            KeyCode::Up => app.select_previous(),
            KeyCode::Char(c) => app.push_search_char(c),
            _ => {}
        }
        return;
    }

    match key.code {
        // Esc backs out of a kept filter before it quits.
        KeyCode::Esc if app.search.is_some() => app.clear_search(),
        KeyCode::Char('q') | KeyCode::Esc => app.quit = true,
        KeyCode::Down | KeyCode::Char('j') => app.select_next(),
        KeyCode::Up | KeyCode::Char('k') => app.select_previous(),
        KeyCode::Home | KeyCode::Char('g') => app.select_first(),
        KeyCode::End | KeyCode::Char('G') => app.select_last(),
        KeyCode::Char('/') => app.begin_search(),
        KeyCode::Char('r') => app.request(Action::Refresh),
        KeyCode::Char('c') => app.request(Action::Cancel),
        KeyCode::Enter => {
            app.activate_selected();
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyEventState, KeyModifiers};

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn typed(app: &mut App, text: &str) {
        for c in text.chars() {
            handle_key_event(app, press(KeyCode::Char(c)));
        }
    }

    #[test]
    fn q_quits() {
        let mut app = App::new("Songs");
        handle_key_event(&mut app, press(KeyCode::Char('q')));
        assert!(app.quit);
    }

    #[test]
    fn release_events_are_ignored() {
        let mut app = App::new("Songs");
        let release = KeyEvent {
            code: KeyCode::Char('q'),
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Release,
            state: KeyEventState::NONE,
        };
        handle_key_event(&mut app, release);
        assert!(!app.quit);
    }

    #[test]
    fn r_and_c_request_scheduler_actions() {
        let mut app = App::new("Songs");
        handle_key_event(&mut app, press(KeyCode::Char('r')));
        assert_eq!(app.take_action(), Some(Action::Refresh));
        handle_key_event(&mut app, press(KeyCode::Char('c')));
        assert_eq!(app.take_action(), Some(Action::Cancel));
    }

    #[test]
    fn search_mode_captures_letters() {
        let mut app = App::new("Songs");
        handle_key_event(&mut app, press(KeyCode::Char('/')));
        typed(&mut app, "qr");
        assert!(!app.quit, "q is text while searching");
        assert_eq!(app.take_action(), None);
        assert_eq!(app.search.as_deref(), Some("qr"));

        handle_key_event(&mut app, press(KeyCode::Backspace));
        assert_eq!(app.search.as_deref(), Some("q"));
    }

    #[test]
    fn enter_keeps_filter_and_esc_clears_it() {
        let mut app = App::new("Songs");
        handle_key_event(&mut app, press(KeyCode::Char('/')));
        typed(&mut app, "rain");
        handle_key_event(&mut app, press(KeyCode::Enter));
        assert!(!app.typing);
        assert_eq!(app.search.as_deref(), Some("rain"));

        handle_key_event(&mut app, press(KeyCode::Esc));
        assert!(app.search.is_none());
        assert!(!app.quit);

        handle_key_event(&mut app, press(KeyCode::Esc));
        assert!(app.quit);
    }
}
