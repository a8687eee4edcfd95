//! Application state and event loop

use super::ui;
use crate::models::Family;
use crate::search::{SearchBackend, SearchCoordinator, SearchState};
use anyhow::Result;
use arboard::Clipboard;
use crossterm::{
    cursor::SetCursorStyle,
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, widgets::ListState, Terminal};
use std::io::{self, Stdout};
use std::time::{Duration, Instant};

/// Single-line text input with a byte-offset cursor
#[derive(Default, Clone, Debug, PartialEq, Eq)]
pub struct TextInput {
    pub text: String,
    pub cursor: usize,
}

impl TextInput {
    pub fn insert_char(&mut self, c: char) {
        self.text.insert(self.cursor, c);
        self.cursor += c.len_utf8();
    }

    pub fn delete_char_before(&mut self) {
        if self.cursor > 0 {
            let prev = self.prev_boundary();
            self.text.drain(prev..self.cursor);
            self.cursor = prev;
        }
    }

    pub fn delete_char_at(&mut self) {
        if self.cursor < self.text.len() {
            let next = self.next_boundary();
            self.text.drain(self.cursor..next);
        }
    }

    pub fn move_left(&mut self) {
        self.cursor = self.prev_boundary();
    }

    pub fn move_right(&mut self) {
        self.cursor = self.next_boundary();
    }

    /// Delete back to the previous whitespace
    pub fn delete_word_before(&mut self) {
        let head = &self.text[..self.cursor];
        let end = head.trim_end().len();
        let start = head[..end]
            .char_indices()
            .rev()
            .find(|(_, c)| c.is_whitespace())
            .map(|(i, c)| i + c.len_utf8())
            .unwrap_or(0);
        self.text.drain(start..self.cursor);
        self.cursor = start;
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.cursor = 0;
    }

    fn prev_boundary(&self) -> usize {
        self.text[..self.cursor]
            .char_indices()
            .next_back()
            .map(|(i, _)| i)
            .unwrap_or(0)
    }

    fn next_boundary(&self) -> usize {
        self.text[self.cursor..]
            .chars()
            .next()
            .map(|c| self.cursor + c.len_utf8())
            .unwrap_or(self.text.len())
    }

    /// Returns true if the key edited or moved within the input
    pub fn handle_key(&mut self, code: KeyCode, modifiers: KeyModifiers) -> bool {
        let has_ctrl = modifiers.contains(KeyModifiers::CONTROL);
        let has_alt = modifiers.contains(KeyModifiers::ALT);

        match code {
            KeyCode::Char('u') if has_ctrl => self.clear(),
            KeyCode::Char('w') if has_ctrl => self.delete_word_before(),
            KeyCode::Backspace if has_alt => self.delete_word_before(),
            KeyCode::Char('a') if has_ctrl => self.cursor = 0,
            KeyCode::Home => self.cursor = 0,
            KeyCode::Char('e') if has_ctrl => self.cursor = self.text.len(),
            KeyCode::End => self.cursor = self.text.len(),
            KeyCode::Left => self.move_left(),
            KeyCode::Right => self.move_right(),
            KeyCode::Backspace => self.delete_char_before(),
            KeyCode::Delete => self.delete_char_at(),
            KeyCode::Char(c) if !has_ctrl && !has_alt => self.insert_char(c),
            _ => return false,
        }
        true
    }
}

pub struct Toast {
    pub message: String,
    pub expires_at: Instant,
    pub is_error: bool,
}

impl Toast {
    pub fn new(message: String, duration: Duration) -> Self {
        Self {
            message,
            expires_at: Instant::now() + duration,
            is_error: false,
        }
    }

    pub fn error(message: String, duration: Duration) -> Self {
        Self {
            is_error: true,
            ..Self::new(message, duration)
        }
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

pub struct App {
    pub input: TextInput,
    pub list_state: ListState,
    pub toast: Option<Toast>,
    pub should_quit: bool,
    coordinator: SearchCoordinator,
    /// Text last handed to the coordinator
    sent_query: Option<String>,
    /// Generation whose results the selection was last reset for
    shown_generation: u64,
    clipboard: Option<Clipboard>,
}

impl App {
    pub fn new<B: SearchBackend>(backend: B, debounce: Duration) -> Self {
        Self {
            input: TextInput::default(),
            list_state: ListState::default(),
            toast: None,
            should_quit: false,
            coordinator: SearchCoordinator::new(backend, debounce),
            sent_query: None,
            shown_generation: 0,
            clipboard: Clipboard::new().ok(),
        }
    }

    pub fn results(&self) -> &[Family] {
        self.coordinator.results()
    }

    pub fn is_searching(&self) -> bool {
        self.coordinator.is_pending()
    }

    pub fn last_duration(&self) -> Duration {
        self.coordinator.last_duration()
    }

    /// Results together with the list selection, borrowed separately
    pub fn list_view(&mut self) -> (&[Family], &mut ListState) {
        (self.coordinator.results(), &mut self.list_state)
    }

    pub fn selected(&self) -> Option<&Family> {
        self.results().get(self.list_state.selected()?)
    }

    /// Forward the input to the coordinator when it changed
    pub fn sync_query(&mut self) {
        if self.sent_query.as_deref() != Some(self.input.text.as_str()) {
            self.sent_query = Some(self.input.text.clone());
            self.coordinator.input(self.input.text.clone());
        }
    }

    pub fn poll_results(&mut self) {
        for notice in self.coordinator.poll() {
            self.toast = Some(Toast::error(
                format!("Search failed: {}", notice.message),
                Duration::from_secs(5),
            ));
        }

        let generation = match self.coordinator.state() {
            SearchState::Fulfilled { generation, .. } | SearchState::Failed { generation, .. } => {
                *generation
            }
            _ => return,
        };
        if generation != self.shown_generation {
            self.shown_generation = generation;
            let first = (!self.results().is_empty()).then_some(0);
            self.list_state.select(first);
        }
    }

    fn select_prev(&mut self) {
        if let Some(current) = self.list_state.selected() {
            self.list_state.select(Some(current.saturating_sub(1)));
        }
    }

    fn select_next(&mut self) {
        let len = self.results().len();
        if let Some(current) = self.list_state.selected() {
            if current + 1 < len {
                self.list_state.select(Some(current + 1));
            }
        }
    }

    /// Copy the selected household's mobile number
    fn copy_selected(&mut self) {
        let Some(mobile) = self.selected().map(|f| f.mobile_number.clone()) else {
            return;
        };
        if mobile.is_empty() {
            self.toast = Some(Toast::error(
                "No mobile number on record".to_string(),
                Duration::from_secs(2),
            ));
            return;
        }

        self.toast = Some(match self.clipboard.as_mut() {
            Some(clipboard) => match clipboard.set_text(&mobile) {
                Ok(()) => Toast::new(format!("Copied: {mobile}"), Duration::from_secs(2)),
                Err(_) => Toast::error(
                    "Failed to copy to clipboard".to_string(),
                    Duration::from_secs(2),
                ),
            },
            None => Toast::error(
                "Clipboard not available".to_string(),
                Duration::from_secs(2),
            ),
        });
    }

    fn update_toast(&mut self) {
        if self.toast.as_ref().is_some_and(Toast::is_expired) {
            self.toast = None;
        }
    }

    pub fn handle_event(&mut self, event: Event) {
        let Event::Key(key) = event else {
            return;
        };
        if key.kind != KeyEventKind::Press {
            return;
        }
        match (key.code, key.modifiers) {
            (KeyCode::Esc, _) => self.should_quit = true,
            (KeyCode::Char('c'), KeyModifiers::CONTROL) => self.should_quit = true,
            (KeyCode::Up, _) | (KeyCode::Char('k'), KeyModifiers::CONTROL) => self.select_prev(),
            (KeyCode::Down, _) | (KeyCode::Char('j'), KeyModifiers::CONTROL) => self.select_next(),
            (KeyCode::Enter, _) => self.copy_selected(),
            (code, modifiers) => {
                self.input.handle_key(code, modifiers);
            }
        }
    }
}

/// Run the search screen until the user quits
pub fn run<B: SearchBackend>(backend: B, debounce: Duration) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, SetCursorStyle::BlinkingBar)?;
    let backend_term = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend_term)?;

    let mut app = App::new(backend, debounce);

    let result = run_loop(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        SetCursorStyle::DefaultUserShape
    )?;
    terminal.show_cursor()?;

    result
}

fn run_loop(terminal: &mut Terminal<CrosstermBackend<Stdout>>, app: &mut App) -> Result<()> {
    loop {
        app.update_toast();
        // The coordinator owns debouncing; every change is forwarded
        app.sync_query();
        app.poll_results();

        terminal.draw(|f| ui::render(f, app))?;

        if event::poll(Duration::from_millis(16))? {
            app.handle_event(event::read()?);
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn typed(s: &str) -> TextInput {
        let mut input = TextInput::default();
        for c in s.chars() {
            input.insert_char(c);
        }
        input
    }

    #[test]
    fn test_multibyte_editing() {
        let mut input = typed("राम");
        input.delete_char_before();
        assert_eq!(input.text, "रा");
        input.move_left();
        input.move_left();
        assert_eq!(input.cursor, 0);
        input.delete_char_at();
        assert_eq!(input.text, "ा");
    }

    #[test]
    fn test_delete_word_before() {
        let mut input = typed("Aarav Rampur  ");
        input.delete_word_before();
        assert_eq!(input.text, "Aarav ");
        input.delete_word_before();
        assert_eq!(input.text, "");
    }

    #[test]
    fn test_control_keys_do_not_insert() {
        let mut input = typed("abc");
        assert!(input.handle_key(KeyCode::Char('a'), KeyModifiers::CONTROL));
        assert_eq!(input.cursor, 0);
        assert!(input.handle_key(KeyCode::Char('x'), KeyModifiers::NONE));
        assert_eq!(input.text, "xabc");
        assert!(!input.handle_key(KeyCode::Char('z'), KeyModifiers::CONTROL));
        assert!(input.handle_key(KeyCode::Char('u'), KeyModifiers::CONTROL));
        assert_eq!(input.text, "");
    }
}
