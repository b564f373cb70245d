//! Conversation history display component

use crate::events::{Message, Sender};
use crate::ui::conversation::indicator::TypingIndicator;
use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Widget},
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Read-only view over the messages in the store
pub struct ConversationHistory<'a> {
    messages: &'a [Message],
    title: &'a str,
    model: &'a str,
    awaiting: bool,
    tick: usize,
    scroll_back: usize,
}

impl<'a> ConversationHistory<'a> {
    pub fn new(messages: &'a [Message], title: &'a str, model: &'a str) -> Self {
        Self {
            messages,
            title,
            model,
            awaiting: false,
            tick: 0,
            scroll_back: 0,
        }
    }

    /// Show the typing indicator after the last message
    pub fn awaiting(mut self, awaiting: bool, tick: usize) -> Self {
        self.awaiting = awaiting;
        self.tick = tick;
        self
    }

    /// Number of lines scrolled up from the bottom
    pub fn scroll_back(mut self, lines: usize) -> Self {
        self.scroll_back = lines;
        self
    }

    /// Every line of the conversation at the given width, with alignment set
    pub fn lines(&self, width: u16) -> Vec<Line<'a>> {
        let mut all_lines = Vec::new();
        for message in self.messages {
            all_lines.extend(self.render_message(message, width));
            // spacing between messages
            all_lines.push(Line::from(""));
        }
        if self.awaiting {
            all_lines.push(TypingIndicator::new(self.tick).line());
        }
        all_lines
    }

    fn render_message(&self, message: &'a Message, width: u16) -> Vec<Line<'a>> {
        let (header, alignment, style) = match message.sender() {
            Sender::User => ("You 👤", Alignment::Right, Style::default().fg(Color::Blue)),
            Sender::Bot => ("🤖 Assistant", Alignment::Left, Style::default().fg(Color::Green)),
        };

        let mut lines = vec![
            Line::from(Span::styled(
                header,
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::BOLD),
            ))
            .alignment(alignment),
        ];

        for content_line in wrap_text(message.text(), width.saturating_sub(2) as usize) {
            let line = match alignment {
                Alignment::Right => Line::from(vec![Span::styled(content_line, style), Span::raw("  ")]),
                _ => Line::from(vec![Span::raw("  "), Span::styled(content_line, style)]),
            };
            lines.push(line.alignment(alignment));
        }

        lines
    }

    fn welcome_lines(&self) -> Vec<Line<'a>> {
        vec![
            Line::from(Span::styled(
                format!("Start a conversation with {}.", self.model),
                Style::default().fg(Color::Green),
            )),
            Line::from(""),
            Line::from(Span::styled(
                "Type below and press Enter to send. Shift+Enter adds a new line.",
                Style::default().fg(Color::Gray),
            )),
            Line::from(Span::styled(
                "PageUp/PageDown scroll, Esc quits.",
                Style::default().fg(Color::DarkGray),
            )),
        ]
    }
}

impl Widget for ConversationHistory<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title(format!("💬 {}", self.title));

        let inner_area = block.inner(area);
        block.render(area, buf);

        let all_lines = if self.messages.is_empty() && !self.awaiting {
            self.welcome_lines()
        } else {
            self.lines(inner_area.width)
        };

        // Determine the range of lines to display, counted from the bottom
        let height = inner_area.height as usize;
        let total = all_lines.len();
        let max_back = total.saturating_sub(height);
        let back = self.scroll_back.min(max_back);
        let start = total.saturating_sub(height + back);
        let end = (start + height).min(total);

        for (i, line) in all_lines[start..end].iter().enumerate() {
            let line_width = (line.width() as u16).min(inner_area.width);
            let x = match line.alignment {
                Some(Alignment::Right) => inner_area.x + inner_area.width - line_width,
                _ => inner_area.x,
            };
            let available = inner_area.width - (x - inner_area.x);
            buf.set_line(x, inner_area.y + i as u16, line, available);
        }
    }
}

/// Wrap text to fit within the given display width.
///
/// Explicit line breaks and leading indentation are kept. Words wider than
/// the line (URLs, unspaced CJK) are broken at the width limit.
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    if width == 0 {
        return vec![text.to_string()];
    }

    let mut lines = Vec::new();
    for paragraph in text.split('\n') {
        let mut current_line = String::new();
        let mut current_width = 0;
        let mut continuation = false;

        for token in split_runs(paragraph) {
            let token_width = token.width();
            let is_space = token.starts_with(char::is_whitespace);

            if is_space && current_width == 0 && continuation {
                continue;
            }
            if current_width + token_width <= width {
                current_line.push_str(token);
                current_width += token_width;
                continue;
            }
            if is_space {
                if current_width > 0 {
                    lines.push(current_line.trim_end().to_string());
                    current_line.clear();
                    current_width = 0;
                    continuation = true;
                }
                continue;
            }
            if token_width <= width && current_width > 0 {
                lines.push(current_line.trim_end().to_string());
                current_line.clear();
                current_line.push_str(token);
                current_width = token_width;
                continuation = true;
                continue;
            }

            // Hard-break a word that cannot fit on any line
            for c in token.chars() {
                let char_width = c.width().unwrap_or(0);
                if current_width + char_width > width && current_width > 0 {
                    lines.push(std::mem::take(&mut current_line));
                    current_width = 0;
                    continuation = true;
                }
                current_line.push(c);
                current_width += char_width;
            }
        }

        lines.push(current_line);
    }

    lines
}

/// Split into alternating runs of whitespace and non-whitespace
fn split_runs(text: &str) -> Vec<&str> {
    let mut runs = Vec::new();
    let mut start = 0;
    let mut in_space = None;
    for (i, c) in text.char_indices() {
        let space = c.is_whitespace();
        if in_space.is_some_and(|prev| prev != space) {
            runs.push(&text[start..i]);
            start = i;
        }
        in_space = Some(space);
    }
    if start < text.len() {
        runs.push(&text[start..]);
    }
    runs
}
