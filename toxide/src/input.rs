//! Wide-character line editor: cursor movement, kill/yank, word jumps
//! and a history ring. One instance lives in every window.

use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthChar;

pub const MAX_STR_SIZE: usize = 1024;
pub const HISTORY_CAPACITY: usize = 32;

/// Typed in paste mode, becomes a newline when the line is sent.
pub const PASTE_PILCROW: char = '¶';

#[derive(Debug, Default)]
pub struct InputBuffer {
    chars: Vec<char>,
    pub cursor: usize,
    /// First visible column for horizontal scrolling.
    pub vis_start: usize,
    yank: Vec<char>,
    history: Vec<String>,
    history_idx: Option<usize>,
    saved_before_history: String,
}

impl InputBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn text(&self) -> String {
        self.chars.iter().collect()
    }

    /// Display width of the text left of the cursor.
    pub fn cursor_column(&self) -> usize {
        self.chars[..self.cursor]
            .iter()
            .map(|c| UnicodeWidthChar::width(*c).unwrap_or(0))
            .sum()
    }

    pub fn set_text(&mut self, text: &str) {
        self.chars = text.chars().take(MAX_STR_SIZE).collect();
        self.cursor = self.chars.len();
    }

    pub fn insert_char(&mut self, c: char) {
        if self.chars.len() >= MAX_STR_SIZE {
            return;
        }
        self.chars.insert(self.cursor, c);
        self.cursor += 1;
    }

    pub fn insert_str(&mut self, s: &str) {
        for c in s.chars() {
            self.insert_char(c);
        }
    }

    pub fn backspace(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            self.chars.remove(self.cursor);
        }
    }

    pub fn delete(&mut self) {
        if self.cursor < self.chars.len() {
            self.chars.remove(self.cursor);
        }
    }

    /// Ctrl+U: discard everything left of the cursor.
    pub fn delete_to_start(&mut self) {
        self.chars.drain(..self.cursor);
        self.cursor = 0;
    }

    /// Ctrl+K: kill to end of line into the yank buffer.
    pub fn kill_to_end(&mut self) {
        self.yank = self.chars.split_off(self.cursor);
    }

    /// Ctrl+Y: re-insert the last killed text.
    pub fn yank(&mut self) {
        let y: String = self.yank.iter().collect();
        self.insert_str(&y);
    }

    /// Ctrl+W: delete the word before the cursor.
    pub fn delete_word_left(&mut self) {
        let start = self.prev_word_boundary();
        self.chars.drain(start..self.cursor);
        self.cursor = start;
    }

    pub fn home(&mut self) {
        self.cursor = 0;
    }

    pub fn end(&mut self) {
        self.cursor = self.chars.len();
    }

    pub fn left(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
        }
    }

    pub fn right(&mut self) {
        if self.cursor < self.chars.len() {
            self.cursor += 1;
        }
    }

    fn prev_word_boundary(&self) -> usize {
        let text: String = self.chars[..self.cursor].iter().collect();
        text.unicode_word_indices()
            .last()
            .map(|(i, _)| text[..i].chars().count())
            .unwrap_or(0)
    }

    pub fn word_left(&mut self) {
        self.cursor = self.prev_word_boundary();
    }

    pub fn word_right(&mut self) {
        let text: String = self.chars.iter().collect();
        let char_of_byte = |b: usize| text[..b].chars().count();
        let next = text
            .unicode_word_indices()
            .map(|(i, w)| (char_of_byte(i), char_of_byte(i + w.len())))
            .find(|&(start, end)| start > self.cursor || end > self.cursor)
            .map(|(_, end)| end)
            .unwrap_or(self.chars.len());
        self.cursor = next;
    }

    pub fn clear(&mut self) {
        self.chars.clear();
        self.cursor = 0;
        self.vis_start = 0;
    }

    /// The finished line: trailing spaces stripped, paste-mode
    /// pilcrows substituted with newlines. Does not clear the buffer
    /// (the blocked-word filter needs the text to survive).
    pub fn line(&self) -> String {
        let mut s: String = self
            .chars
            .iter()
            .map(|&c| if c == PASTE_PILCROW { '\n' } else { c })
            .collect();
        while s.ends_with(' ') {
            s.pop();
        }
        s
    }

    pub fn push_history(&mut self, line: String) {
        if line.is_empty() || self.history.last() == Some(&line) {
            return;
        }
        self.history.push(line);
        if self.history.len() > HISTORY_CAPACITY {
            self.history.remove(0);
        }
    }

    pub fn history_up(&mut self) {
        if self.history.is_empty() {
            return;
        }
        match self.history_idx {
            None => {
                self.saved_before_history = self.text();
                self.history_idx = Some(self.history.len() - 1);
            }
            Some(i) if i > 0 => self.history_idx = Some(i - 1),
            _ => {}
        }
        if let Some(i) = self.history_idx {
            let entry = self.history[i].clone();
            self.set_text(&entry);
        }
    }

    pub fn history_down(&mut self) {
        let Some(i) = self.history_idx else { return };
        if i + 1 < self.history.len() {
            self.history_idx = Some(i + 1);
            let entry = self.history[i + 1].clone();
            self.set_text(&entry);
        } else {
            self.history_idx = None;
            let saved = self.saved_before_history.clone();
            self.set_text(&saved);
        }
    }

    pub fn reset_history_cursor(&mut self) {
        self.history_idx = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn editing_basics() {
        let mut b = InputBuffer::new();
        b.insert_str("hello");
        b.left();
        b.left();
        b.insert_char('X');
        assert_eq!(b.text(), "helXlo");
        b.backspace();
        assert_eq!(b.text(), "hello");
        b.delete();
        assert_eq!(b.text(), "helo");
    }

    #[test]
    fn kill_and_yank() {
        let mut b = InputBuffer::new();
        b.insert_str("one two three");
        b.home();
        b.word_right();
        b.kill_to_end();
        assert_eq!(b.text(), "one");
        b.end();
        b.yank();
        assert_eq!(b.text(), "one two three");
    }

    #[test]
    fn delete_to_start_discards() {
        let mut b = InputBuffer::new();
        b.insert_str("keep this");
        b.word_left();
        b.delete_to_start();
        assert_eq!(b.text(), "this");
        // Discarded text is not yankable.
        b.yank();
        assert_eq!(b.text(), "this");
    }

    #[test]
    fn delete_word_left() {
        let mut b = InputBuffer::new();
        b.insert_str("alpha beta gamma");
        b.delete_word_left();
        assert_eq!(b.text(), "alpha beta ");
        b.delete_word_left();
        assert_eq!(b.text(), "alpha ");
    }

    #[test]
    fn word_jumps() {
        let mut b = InputBuffer::new();
        b.insert_str("foo bar baz");
        b.home();
        b.word_right();
        assert_eq!(b.cursor, 3);
        b.word_right();
        assert_eq!(b.cursor, 7);
        b.word_left();
        assert_eq!(b.cursor, 4);
    }

    #[test]
    fn bounded_length() {
        let mut b = InputBuffer::new();
        for _ in 0..MAX_STR_SIZE + 10 {
            b.insert_char('a');
        }
        assert_eq!(b.len(), MAX_STR_SIZE);
    }

    #[test]
    fn line_strips_trailing_spaces_and_substitutes_pilcrow() {
        let mut b = InputBuffer::new();
        b.insert_str("first¶second   ");
        assert_eq!(b.line(), "first\nsecond");
        // Buffer itself is untouched.
        assert_eq!(b.text(), "first¶second   ");
    }

    #[test]
    fn history_ring() {
        let mut b = InputBuffer::new();
        b.push_history("one".into());
        b.push_history("two".into());
        b.push_history("two".into()); // consecutive duplicate ignored
        b.insert_str("draft");
        b.history_up();
        assert_eq!(b.text(), "two");
        b.history_up();
        assert_eq!(b.text(), "one");
        b.history_up();
        assert_eq!(b.text(), "one");
        b.history_down();
        assert_eq!(b.text(), "two");
        b.history_down();
        assert_eq!(b.text(), "draft");
    }

    #[test]
    fn wide_char_cursor_column() {
        let mut b = InputBuffer::new();
        b.insert_str("ab你");
        assert_eq!(b.cursor_column(), 4);
    }
}
