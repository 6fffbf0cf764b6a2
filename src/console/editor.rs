//! Single-line editor state machine.
//!
//! Pure key handling with no terminal I/O, so every binding is testable.
//!
//! | Key                     | Action                            |
//! |-------------------------|-----------------------------------|
//! | `Enter`                 | submit the line                   |
//! | `Ctrl-C`                | interrupt                         |
//! | `Ctrl-D`                | end input on an empty line, else delete forward |
//! | `Left`/`Ctrl-B`, `Right`/`Ctrl-F` | move one character      |
//! | `Home`/`Ctrl-A`, `End`/`Ctrl-E`   | start / end of line     |
//! | `Backspace`, `Delete`   | delete back / forward             |
//! | `Ctrl-U`, `Ctrl-K`      | kill to start / end of line       |
//! | `Ctrl-W`                | delete the previous word          |
//! | `Up`/`Ctrl-P`, `Down`/`Ctrl-N` | history matching the typed prefix |

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use unicode_width::UnicodeWidthChar;

/// Result of feeding one key to the editor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditAction {
    /// Keep editing; the line may have changed.
    Continue,
    /// The user accepted this line.
    Submit(String),
    /// End of input was requested on an empty line.
    Eof,
    /// The user pressed Ctrl-C.
    Interrupt,
}

/// In-progress history search.
#[derive(Debug, Clone)]
struct Recall {
    /// Index of the shown entry.
    index: usize,
    /// Text typed before navigation started; also the search prefix.
    typed: Vec<char>,
}

/// Line buffer with a cursor.
#[derive(Debug, Clone, Default)]
pub struct LineEditor {
    buffer: Vec<char>,
    /// Cursor position in characters.
    cursor: usize,
    recall: Option<Recall>,
}

impl LineEditor {
    /// Create an empty editor with the cursor at column zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current line text.
    pub fn text(&self) -> String {
        self.buffer.iter().collect()
    }

    /// Cursor position in characters.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Display width of the text left of the cursor.
    pub fn cursor_column(&self) -> usize {
        self.buffer[..self.cursor]
            .iter()
            .map(|c| c.width().unwrap_or(0))
            .sum()
    }

    /// Apply one key press.
    pub fn handle_key(&mut self, key: KeyEvent, history: &[String]) -> EditAction {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

        match key.code {
            KeyCode::Enter => return EditAction::Submit(self.take()),
            KeyCode::Char('c') if ctrl => {
                self.take();
                return EditAction::Interrupt;
            }
            KeyCode::Char('d') if ctrl => {
                if self.buffer.is_empty() {
                    return EditAction::Eof;
                }
                self.delete_forward();
            }
            KeyCode::Up => self.recall_previous(history),
            KeyCode::Char('p') if ctrl => self.recall_previous(history),
            KeyCode::Down => self.recall_next(history),
            KeyCode::Char('n') if ctrl => self.recall_next(history),
            KeyCode::Left => self.cursor = self.cursor.saturating_sub(1),
            KeyCode::Char('b') if ctrl => self.cursor = self.cursor.saturating_sub(1),
            KeyCode::Right => self.cursor = (self.cursor + 1).min(self.buffer.len()),
            KeyCode::Char('f') if ctrl => self.cursor = (self.cursor + 1).min(self.buffer.len()),
            KeyCode::Home => self.cursor = 0,
            KeyCode::Char('a') if ctrl => self.cursor = 0,
            KeyCode::End => self.cursor = self.buffer.len(),
            KeyCode::Char('e') if ctrl => self.cursor = self.buffer.len(),
            KeyCode::Char('u') if ctrl => {
                self.buffer.drain(..self.cursor);
                self.cursor = 0;
                self.recall = None;
            }
            KeyCode::Char('k') if ctrl => {
                self.buffer.truncate(self.cursor);
                self.recall = None;
            }
            KeyCode::Char('w') if ctrl => self.delete_word_back(),
            KeyCode::Backspace => {
                if self.cursor > 0 {
                    self.cursor -= 1;
                    self.buffer.remove(self.cursor);
                    self.recall = None;
                }
            }
            KeyCode::Delete => self.delete_forward(),
            KeyCode::Tab => self.insert('\t'),
            KeyCode::Char(c) if !ctrl && !key.modifiers.contains(KeyModifiers::ALT) => {
                self.insert(c)
            }
            _ => {}
        }
        EditAction::Continue
    }

    fn take(&mut self) -> String {
        let text = self.text();
        self.buffer.clear();
        self.cursor = 0;
        self.recall = None;
        text
    }

    fn insert(&mut self, c: char) {
        self.buffer.insert(self.cursor, c);
        self.cursor += 1;
        self.recall = None;
    }

    fn delete_forward(&mut self) {
        if self.cursor < self.buffer.len() {
            self.buffer.remove(self.cursor);
            self.recall = None;
        }
    }

    fn delete_word_back(&mut self) {
        let mut start = self.cursor;
        while start > 0 && self.buffer[start - 1].is_whitespace() {
            start -= 1;
        }
        while start > 0 && !self.buffer[start - 1].is_whitespace() {
            start -= 1;
        }
        self.buffer.drain(start..self.cursor);
        self.cursor = start;
        self.recall = None;
    }

    fn recall_previous(&mut self, history: &[String]) {
        let (end, typed) = match &self.recall {
            Some(recall) => (recall.index, recall.typed.clone()),
            None => (history.len(), self.buffer.clone()),
        };
        let prefix: String = typed.iter().collect();

        if let Some(index) = history[..end.min(history.len())]
            .iter()
            .rposition(|entry| entry.starts_with(&prefix))
        {
            self.show(history[index].chars().collect());
            self.recall = Some(Recall { index, typed });
        }
    }

    fn recall_next(&mut self, history: &[String]) {
        let Some(recall) = self.recall.take() else {
            return;
        };
        let prefix: String = recall.typed.iter().collect();

        let next = history
            .iter()
            .enumerate()
            .skip(recall.index + 1)
            .find(|(_, entry)| entry.starts_with(&prefix));
        match next {
            Some((index, entry)) => {
                self.show(entry.chars().collect());
                self.recall = Some(Recall {
                    index,
                    typed: recall.typed,
                });
            }
            None => self.show(recall.typed),
        }
    }

    fn show(&mut self, text: Vec<char>) {
        self.buffer = text;
        self.cursor = self.buffer.len();
    }
}
