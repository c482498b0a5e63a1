//! Append-only per-window timeline with soft wrapping and paging.
//!
//! Lines are staged through a bounded insertion queue so that a burst
//! of network callbacks can never block the render loop; `flush_one`
//! moves at most one queued line into history per call and the caller
//! loops to drain. History is bounded by the configured size and
//! evicts from the head.

use std::collections::VecDeque;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

pub const QUEUE_CAPACITY: usize = 32;
pub const DEFAULT_HISTORY_SIZE: usize = 600;
pub const MAX_LINE_TEXT: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LineId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    System,
    Prompt,
    InMessage,
    OutMessage,
    OutMessageRead,
    InAction,
    OutAction,
    OutActionRead,
    Connection,
    Disconnection,
    NameChange,
    InPrivate,
    OutPrivate,
}

impl LineKind {
    pub fn is_outgoing(self) -> bool {
        matches!(
            self,
            LineKind::OutMessage
                | LineKind::OutMessageRead
                | LineKind::OutAction
                | LineKind::OutActionRead
                | LineKind::OutPrivate
        )
    }
}

#[derive(Debug, Clone)]
pub struct Line {
    pub id: LineId,
    pub timestamp: String,
    pub name1: String,
    pub name2: String,
    pub kind: LineKind,
    pub text: String,
    /// Pre-computed display width of `text`.
    pub width: usize,
    /// Sent while the peer was offline and no read receipt yet.
    pub noread: bool,
    pub bold: bool,
    format_rows: usize,
    format_width: usize,
}

impl Line {
    fn new(
        id: LineId,
        kind: LineKind,
        timestamp: String,
        name1: String,
        name2: String,
        text: String,
    ) -> Self {
        let mut text = text;
        if text.chars().count() > MAX_LINE_TEXT {
            text = text.chars().take(MAX_LINE_TEXT).collect();
        }
        let width = text.as_str().width();
        Self {
            id,
            timestamp,
            name1,
            name2,
            kind,
            text,
            width,
            noread: false,
            bold: false,
            format_rows: 0,
            format_width: 0,
        }
    }

    /// The column prefix drawn before the message body; continuation
    /// rows are indented to its width.
    pub fn prefix(&self) -> String {
        match self.kind {
            LineKind::InMessage | LineKind::OutMessage | LineKind::OutMessageRead => {
                format!("{} {}: ", self.timestamp, self.name1)
            }
            LineKind::InPrivate | LineKind::OutPrivate => {
                format!("{} >{}< ", self.timestamp, self.name1)
            }
            LineKind::InAction | LineKind::OutAction | LineKind::OutActionRead => {
                format!("{} * {} ", self.timestamp, self.name1)
            }
            LineKind::Prompt => "$ ".to_owned(),
            _ => format!("{} ", self.timestamp),
        }
    }

    fn set_text(&mut self, text: String) {
        self.text = text;
        if self.text.chars().count() > MAX_LINE_TEXT {
            self.text = self.text.chars().take(MAX_LINE_TEXT).collect();
        }
        self.width = self.text.as_str().width();
        self.format_width = 0;
    }

    /// Number of display rows this line occupies at `width` columns.
    /// The result is cached against the width so a resize costs one
    /// recomputation per line rather than per-draw work.
    pub fn rows(&mut self, width: usize) -> usize {
        if self.format_width == width && self.format_rows > 0 {
            return self.format_rows;
        }
        let rows = self.render_rows(width).len();
        self.format_rows = rows;
        self.format_width = width;
        rows
    }

    /// Fully rendered display rows (prefix on the first, indent on
    /// continuations) each at most `width` columns wide.
    pub fn render_rows(&self, width: usize) -> Vec<String> {
        let width = width.max(2);
        let prefix = self.prefix();
        let indent = prefix.as_str().width().min(width - 1);
        let mut body = self.text.clone();
        if self.noread {
            body.push_str(" x");
        }
        let wrapped = wrap_message(&body, width, indent);
        let mut out = Vec::with_capacity(wrapped.len());
        for (i, row) in wrapped.into_iter().enumerate() {
            if i == 0 {
                out.push(format!("{}{}", prefix, row.text));
            } else if row.indented {
                out.push(format!("{}{}", " ".repeat(indent), row.text));
            } else {
                out.push(row.text);
            }
        }
        if out.is_empty() {
            out.push(prefix);
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrappedRow {
    pub text: String,
    pub indented: bool,
}

/// Word-wraps `text` into rows. The first row and soft-wrapped
/// continuations get `width - indent` columns; a row opened by an
/// explicit newline resets to the full width.
pub fn wrap_message(text: &str, width: usize, indent: usize) -> Vec<WrappedRow> {
    let narrow = width.saturating_sub(indent).max(1);
    let full = width.max(1);

    let mut rows = Vec::new();
    let chars: Vec<char> = text.chars().collect();
    let mut pos = 0;
    let mut budget = narrow;
    let mut indented = true;

    while pos < chars.len() {
        let mut used = 0;
        let mut last_space: Option<usize> = None;
        let mut end = pos;
        let mut broke = false;

        while end < chars.len() {
            let c = chars[end];
            if c == '\n' {
                rows.push(WrappedRow {
                    text: chars[pos..end].iter().collect(),
                    indented,
                });
                pos = end + 1;
                budget = full;
                indented = false;
                broke = true;
                break;
            }
            let w = UnicodeWidthChar::width(c).unwrap_or(0);
            if used + w > budget {
                let cut = match last_space {
                    Some(s) if s > pos => s,
                    _ => end.max(pos + 1),
                };
                rows.push(WrappedRow {
                    text: chars[pos..cut].iter().collect(),
                    indented,
                });
                pos = if last_space == Some(cut) { cut + 1 } else { cut };
                budget = width.saturating_sub(indent).max(1);
                indented = true;
                broke = true;
                break;
            }
            if c == ' ' {
                last_space = Some(end);
            }
            used += w;
            end += 1;
        }

        if !broke {
            rows.push(WrappedRow {
                text: chars[pos..].iter().collect(),
                indented,
            });
            break;
        }
    }

    if rows.is_empty() {
        rows.push(WrappedRow {
            text: String::new(),
            indented: true,
        });
    }
    rows
}

#[derive(Debug)]
pub struct Scrollback {
    history: VecDeque<Line>,
    queue: VecDeque<Line>,
    next_id: u64,
    pub history_size: usize,
    /// Index into `history` of the top visible line.
    pub line_start: usize,
    pub scroll_paused: bool,
}

impl Scrollback {
    pub fn new(history_size: usize) -> Self {
        Self {
            history: VecDeque::new(),
            queue: VecDeque::new(),
            next_id: 0,
            history_size: history_size.max(1),
            line_start: 0,
            scroll_paused: false,
        }
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Line> {
        self.history.iter()
    }

    /// Stages a line for insertion. Returns `None` when the insertion
    /// queue is full; the line is dropped.
    pub fn add(
        &mut self,
        kind: LineKind,
        timestamp: &str,
        name1: &str,
        name2: &str,
        text: String,
    ) -> Option<LineId> {
        if self.queue.len() >= QUEUE_CAPACITY {
            return None;
        }
        let id = LineId(self.next_id);
        self.next_id += 1;
        self.queue.push_back(Line::new(
            id,
            kind,
            timestamp.to_owned(),
            name1.to_owned(),
            name2.to_owned(),
            text,
        ));
        Some(id)
    }

    /// Moves at most one queued line into history and applies
    /// retention. Returns whether anything moved.
    pub fn flush_one(&mut self) -> bool {
        let Some(line) = self.queue.pop_front() else {
            return false;
        };
        self.history.push_back(line);
        while self.history.len() > self.history_size {
            self.history.pop_front();
            if self.line_start > 0 {
                self.line_start -= 1;
            }
        }
        true
    }

    pub fn flush_all(&mut self) {
        while self.flush_one() {}
    }

    pub fn get(&self, id: LineId) -> Option<&Line> {
        self.history
            .iter()
            .rev()
            .find(|l| l.id == id)
            .or_else(|| self.queue.iter().rev().find(|l| l.id == id))
    }

    fn get_mut(&mut self, id: LineId) -> Option<&mut Line> {
        if let Some(l) = self.history.iter_mut().rev().find(|l| l.id == id) {
            return Some(l);
        }
        self.queue.iter_mut().rev().find(|l| l.id == id)
    }

    /// Replaces the message buffer of an existing line (progress bars).
    pub fn set(&mut self, id: LineId, text: String) -> bool {
        match self.get_mut(id) {
            Some(line) => {
                line.set_text(text);
                true
            }
            None => false,
        }
    }

    pub fn set_noread(&mut self, id: LineId, noread: bool) {
        if let Some(line) = self.get_mut(id) {
            line.noread = noread;
            line.format_width = 0;
        }
    }

    /// Flips an outgoing line to its read variant and clears noread.
    pub fn mark_read(&mut self, id: LineId) {
        if let Some(line) = self.get_mut(id) {
            line.kind = match line.kind {
                LineKind::OutMessage => LineKind::OutMessageRead,
                LineKind::OutAction => LineKind::OutActionRead,
                other => other,
            };
            line.noread = false;
            line.format_width = 0;
        }
    }

    pub fn clear(&mut self) {
        self.history.clear();
        self.queue.clear();
        self.line_start = 0;
        self.scroll_paused = false;
    }

    /// The `line_start` at which the last `height` rows exactly fit.
    pub fn bottom_start(&mut self, width: usize, height: usize) -> usize {
        let mut rows = 0;
        let mut start = self.history.len();
        while start > 0 {
            let r = self.history[start - 1].rows(width);
            if rows + r > height {
                break;
            }
            rows += r;
            start -= 1;
        }
        start
    }

    /// Rewinds `line_start` so the most recent rows fit on screen.
    pub fn reset_start(&mut self, width: usize, height: usize) {
        self.line_start = self.bottom_start(width, height);
    }

    pub fn scroll_line_up(&mut self) {
        if self.line_start > 0 {
            self.line_start -= 1;
        }
        self.scroll_paused = true;
    }

    pub fn scroll_line_down(&mut self, width: usize, height: usize) {
        let bottom = self.bottom_start(width, height);
        if self.line_start >= bottom {
            // One past the end: snap to bottom and resume following.
            self.line_start = bottom;
            self.scroll_paused = false;
        } else {
            self.line_start += 1;
            if self.line_start >= bottom {
                self.scroll_paused = false;
            }
        }
    }

    pub fn scroll_half_page_up(&mut self, height: usize) {
        for _ in 0..(height / 2).max(1) {
            if self.line_start == 0 {
                break;
            }
            self.line_start -= 1;
        }
        self.scroll_paused = true;
    }

    pub fn scroll_half_page_down(&mut self, width: usize, height: usize) {
        for _ in 0..(height / 2).max(1) {
            self.scroll_line_down(width, height);
        }
    }

    pub fn jump_bottom(&mut self, width: usize, height: usize) {
        self.reset_start(width, height);
        self.scroll_paused = false;
    }

    /// Visible display rows starting at `line_start`, truncated at
    /// `height`; never renders past the bottom of the region.
    pub fn visible_rows(&mut self, width: usize, height: usize) -> Vec<(LineKind, bool, String)> {
        if !self.scroll_paused {
            self.reset_start(width, height);
        }
        let mut out = Vec::with_capacity(height);
        let start = self.line_start.min(self.history.len());
        for line in self.history.range(start..) {
            let kind = line.kind;
            let bold = line.bold;
            for row in line.render_rows(width) {
                if out.len() >= height {
                    return out;
                }
                out.push((kind, bold, row));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sb() -> Scrollback {
        Scrollback::new(DEFAULT_HISTORY_SIZE)
    }

    #[test]
    fn ids_are_monotonic() {
        let mut s = sb();
        let a = s.add(LineKind::System, "12:00", "", "", "one".into()).unwrap();
        let b = s.add(LineKind::System, "12:00", "", "", "two".into()).unwrap();
        assert!(b > a);
    }

    #[test]
    fn queue_overflow_drops_the_add() {
        let mut s = sb();
        for i in 0..QUEUE_CAPACITY {
            assert!(s.add(LineKind::System, "t", "", "", format!("{}", i)).is_some());
        }
        assert!(s.add(LineKind::System, "t", "", "", "overflow".into()).is_none());
        s.flush_one();
        assert!(s.add(LineKind::System, "t", "", "", "fits again".into()).is_some());
    }

    #[test]
    fn flush_moves_one_line_per_call() {
        let mut s = sb();
        s.add(LineKind::System, "t", "", "", "a".into());
        s.add(LineKind::System, "t", "", "", "b".into());
        assert!(s.flush_one());
        assert_eq!(s.len(), 1);
        assert_eq!(s.queued(), 1);
        s.flush_all();
        assert_eq!(s.len(), 2);
    }

    #[test]
    fn retention_evicts_from_head() {
        let mut s = Scrollback::new(10);
        for i in 0..15 {
            s.add(LineKind::System, "t", "", "", format!("line {}", i));
            s.flush_all();
        }
        assert_eq!(s.len(), 10);
        let first = s.iter().next().unwrap();
        assert_eq!(first.text, "line 5");
        // Ids keep increasing across eviction.
        let ids: Vec<u64> = s.iter().map(|l| l.id.0).collect();
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn newline_renders_as_multiple_rows() {
        let mut s = sb();
        let id = s
            .add(LineKind::System, "12:00", "", "", "first\nsecond\nthird".into())
            .unwrap();
        s.flush_all();
        let line = s.get(id).unwrap().clone();
        let mut line = line;
        assert_eq!(line.rows(80), 3);
    }

    #[test]
    fn wrap_breaks_at_last_space() {
        let rows = wrap_message("aaaa bbbb cccc", 10, 0);
        assert_eq!(rows[0].text, "aaaa bbbb");
        assert_eq!(rows[1].text, "cccc");
    }

    #[test]
    fn wrap_hard_breaks_unbroken_runs() {
        let rows = wrap_message("abcdefghij", 4, 0);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].text, "abcd");
    }

    #[test]
    fn wrap_is_wide_char_aware() {
        // Each CJK cell is two columns wide.
        let rows = wrap_message("你好你好", 4, 0);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].text, "你好");
    }

    #[test]
    fn set_updates_width_and_cache() {
        let mut s = sb();
        let id = s.add(LineKind::System, "t", "", "", "short".into()).unwrap();
        s.flush_all();
        s.set(id, "a much longer replacement text".into());
        assert_eq!(s.get(id).unwrap().text, "a much longer replacement text");
        assert_eq!(s.get(id).unwrap().width, "a much longer replacement text".len());
    }

    #[test]
    fn scroll_up_pauses_and_bottom_resumes() {
        let mut s = Scrollback::new(100);
        for i in 0..30 {
            s.add(LineKind::System, "t", "", "", format!("{}", i));
        }
        s.flush_all();
        s.reset_start(20, 10);
        assert!(!s.scroll_paused);
        s.scroll_line_up();
        assert!(s.scroll_paused);
        s.jump_bottom(20, 10);
        assert!(!s.scroll_paused);
        // One-past-the-end also unpauses.
        s.scroll_line_up();
        s.scroll_line_down(20, 10);
        s.scroll_line_down(20, 10);
        assert!(!s.scroll_paused);
    }

    #[test]
    fn visible_rows_never_overflow_height() {
        let mut s = sb();
        for _ in 0..5 {
            s.add(LineKind::System, "t", "", "", "word ".repeat(30));
        }
        s.flush_all();
        let rows = s.visible_rows(20, 7);
        assert!(rows.len() <= 7);
    }

    #[test]
    fn noread_mark_appears_and_clears() {
        let mut s = sb();
        let id = s.add(LineKind::OutMessage, "12:00", "me", "", "hi".into()).unwrap();
        s.flush_all();
        s.set_noread(id, true);
        let rendered = s.get(id).unwrap().render_rows(80).join("");
        assert!(rendered.ends_with("hi x"));
        s.mark_read(id);
        let line = s.get(id).unwrap();
        assert!(!line.noread);
        assert_eq!(line.kind, LineKind::OutMessageRead);
    }
}
