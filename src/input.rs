//! Keyboard input handling.
//!
//! Maps terminal key events to [`App`] actions.  Modal state decides who
//! gets the key first: the delete confirmation, then the source form, then
//! the date prompt, then the article detail popup, and finally the active
//! tab.
//!
//! ## For contributors
//!
//! To add a new keybinding:
//!
//! 1. Add a method on [`App`] for the action (if one doesn't exist).
//! 2. Add a `KeyCode` match arm in the handler for the right mode.
//! 3. Update the help text in [`crate::ui`] and the table in `README.md`.

use std::time::Instant;

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind};

use crate::app::{App, Tab};
use crate::filters::DateBound;

/// Process a single key event, updating app state accordingly.
///
/// Only reacts to key-press events (ignoring release / repeat) so that each
/// physical keypress triggers exactly one action.  `now` drives the debounce
/// of filter changes.
pub fn handle_key_event(app: &mut App, key: KeyEvent, now: Instant) {
    if key.kind != KeyEventKind::Press {
        return;
    }

    if app.pending_delete.is_some() {
        handle_confirm(app, key);
    } else if app.form.is_some() {
        handle_form(app, key);
    } else if app.date_prompt.is_some() {
        handle_date_prompt(app, key, now);
    } else if app.show_detail {
        if matches!(key.code, KeyCode::Esc | KeyCode::Enter | KeyCode::Char('q')) {
            app.show_detail = false;
        }
    } else {
        handle_normal(app, key, now);
    }
}

fn handle_confirm(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('y') | KeyCode::Char('Y') => app.confirm_delete(),
        KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => app.cancel_delete(),
        _ => {}
    }
}

fn handle_form(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.close_form(),
        KeyCode::Enter => app.submit_form(),
        _ => {
            let Some(form) = app.form.as_mut() else {
                return;
            };
            match key.code {
                KeyCode::Tab | KeyCode::Down => form.focus_next(),
                KeyCode::BackTab | KeyCode::Up => form.focus_previous(),
                KeyCode::Backspace => form.backspace(),
                KeyCode::Char(c) => form.push_char(c),
                _ => {}
            }
        }
    }
}

fn handle_date_prompt(app: &mut App, key: KeyEvent, now: Instant) {
    match key.code {
        KeyCode::Esc => app.date_prompt = None,
        KeyCode::Enter => app.submit_date_prompt(now),
        KeyCode::Backspace => {
            if let Some(prompt) = app.date_prompt.as_mut() {
                prompt.input.pop();
            }
        }
        KeyCode::Char(c) => {
            if let Some(prompt) = app.date_prompt.as_mut() {
                prompt.input.push(c);
            }
        }
        _ => {}
    }
}

fn handle_normal(app: &mut App, key: KeyEvent, now: Instant) {
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => app.quit = true,
        KeyCode::Tab => app.switch_tab(),
        KeyCode::Char('r') => app.refresh_all(),
        KeyCode::Char('R') => app.collect_all(),
        KeyCode::Down | KeyCode::Char('j') => app.select_next(),
        KeyCode::Up | KeyCode::Char('k') => app.select_previous(),
        KeyCode::Home | KeyCode::Char('g') => app.select_first(),
        KeyCode::End | KeyCode::Char('G') => app.select_last(),
        _ => match app.tab {
            Tab::Articles => handle_articles(app, key, now),
            Tab::Sources => handle_sources(app, key),
        },
    }
}

fn handle_articles(app: &mut App, key: KeyEvent, now: Instant) {
    match key.code {
        KeyCode::Char('s') => app.cycle_source_filter(now),
        KeyCode::Char('t') => app.cycle_tag_filter(now),
        KeyCode::Char('f') => app.open_date_prompt(DateBound::From),
        KeyCode::Char('u') => app.open_date_prompt(DateBound::To),
        KeyCode::Char('x') => app.clear_filters(now),
        KeyCode::Char('n') | KeyCode::Right => app.next_page(now),
        KeyCode::Char('p') | KeyCode::Left => app.previous_page(now),
        KeyCode::Char('+') | KeyCode::Char('=') => app.grow_page(now),
        KeyCode::Char('-') => app.shrink_page(now),
        KeyCode::Enter => app.open_detail(),
        _ => {}
    }
}

fn handle_sources(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('a') => app.open_create_form(),
        KeyCode::Char('e') | KeyCode::Enter => app.open_edit_form(),
        KeyCode::Char('d') => app.request_delete(),
        KeyCode::Char('c') => app.collect_selected_source(),
        KeyCode::Char('t') => app.probe_selected_source(),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Source;
    use crate::worker::{Outcome, Request};
    use crossterm::event::KeyModifiers;
    use std::time::Duration;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn send(app: &mut App, codes: &[KeyCode]) {
        let now = Instant::now();
        for &code in codes {
            handle_key_event(app, press(code), now);
        }
    }

    fn app_with_source() -> App {
        let mut app = App::new(20, Duration::from_millis(300));
        app.apply(Outcome::Sources(Ok(vec![Source {
            id: 1,
            name: "A".into(),
            kind: Some("rss".into()),
            url_or_config: Some("https://a/rss".into()),
            created_at: None,
        }])));
        app.take_requests();
        app
    }

    #[test]
    fn q_quits_in_normal_mode() {
        let mut app = app_with_source();
        send(&mut app, &[KeyCode::Char('q')]);
        assert!(app.quit);
    }

    #[test]
    fn release_events_are_ignored() {
        let mut app = app_with_source();
        let mut key = press(KeyCode::Char('q'));
        key.kind = KeyEventKind::Release;
        handle_key_event(&mut app, key, Instant::now());
        assert!(!app.quit);
    }

    #[test]
    fn form_captures_typed_letters() {
        let mut app = app_with_source();
        send(
            &mut app,
            &[
                KeyCode::Tab,
                KeyCode::Char('a'),
                KeyCode::Char('q'),
                KeyCode::Char('r'),
                KeyCode::Backspace,
            ],
        );
        assert!(!app.quit, "q is text inside the form");
        assert_eq!(app.form.as_ref().map(|f| f.name.as_str()), Some("q"));

        send(&mut app, &[KeyCode::Esc]);
        assert!(app.form.is_none());
        assert!(!app.quit);
    }

    #[test]
    fn delete_flow_via_keys() {
        let mut app = app_with_source();
        send(&mut app, &[KeyCode::Tab, KeyCode::Char('d'), KeyCode::Char('n')]);
        assert!(app.take_requests().is_empty());

        send(&mut app, &[KeyCode::Char('d'), KeyCode::Char('y')]);
        assert_eq!(app.take_requests(), vec![Request::DeleteSource(1)]);
    }

    #[test]
    fn t_means_tag_filter_or_probe_by_tab() {
        let mut app = app_with_source();
        send(&mut app, &[KeyCode::Char('t')]);
        assert!(app.refetch_pending());
        assert!(app.take_requests().is_empty());

        send(&mut app, &[KeyCode::Tab, KeyCode::Char('t')]);
        assert!(matches!(
            app.take_requests().as_slice(),
            [Request::Probe { source_id: 1, .. }]
        ));
    }

    #[test]
    fn date_prompt_collects_input() {
        let mut app = app_with_source();
        send(&mut app, &[KeyCode::Char('f')]);
        for c in "2024-05-01".chars() {
            send(&mut app, &[KeyCode::Char(c)]);
        }
        send(&mut app, &[KeyCode::Enter]);

        assert!(app.date_prompt.is_none());
        assert_eq!(
            app.filters.date_from().map(|d| d.to_string()),
            Some("2024-05-01".to_string())
        );
    }
}
