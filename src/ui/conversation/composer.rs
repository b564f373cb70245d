use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{
        Block, Borders, Widget,
        block::{Position, Title},
    },
};
use unicode_width::UnicodeWidthStr;

const CURSOR: char = '▌';

/// Result returned when the user interacts with the composer
#[derive(Debug, PartialEq, Eq)]
pub enum ComposerResult {
    /// Enter was pressed; the caller decides whether the draft is sendable
    Submit,
    None,
}

/// Line editor for the draft.
///
/// The draft text itself lives in the conversation store; the composer only
/// tracks the cursor (in characters, not bytes) and applies edits to it.
#[derive(Debug, Clone)]
pub struct ConversationComposer {
    cursor: usize,
    placeholder: String,
}

impl ConversationComposer {
    pub fn new(placeholder: impl Into<String>) -> Self {
        Self {
            cursor: 0,
            placeholder: placeholder.into(),
        }
    }

    /// Handle key input against the draft
    pub fn handle_key(&mut self, key: KeyEvent, draft: &mut String) -> ComposerResult {
        if key.kind != KeyEventKind::Press {
            return ComposerResult::None;
        }

        // The draft may have been cleared or replaced since the last key.
        let len = draft.chars().count();
        self.cursor = self.cursor.min(len);

        match key.code {
            KeyCode::Enter => {
                if key.modifiers.contains(KeyModifiers::SHIFT) {
                    self.insert_char(draft, '\n');
                } else {
                    return ComposerResult::Submit;
                }
            }
            KeyCode::Char(c)
                if !key.modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) =>
            {
                self.insert_char(draft, c);
            }
            KeyCode::Backspace => {
                if self.cursor > 0 {
                    self.cursor -= 1;
                    draft.remove(byte_index(draft, self.cursor));
                }
            }
            KeyCode::Delete => {
                if self.cursor < len {
                    draft.remove(byte_index(draft, self.cursor));
                }
            }
            KeyCode::Left => {
                self.cursor = self.cursor.saturating_sub(1);
            }
            KeyCode::Right => {
                if self.cursor < len {
                    self.cursor += 1;
                }
            }
            KeyCode::Home => {
                self.cursor = 0;
            }
            KeyCode::End => {
                self.cursor = len;
            }
            _ => {}
        }

        ComposerResult::None
    }

    /// Insert a character at the cursor position
    fn insert_char(&mut self, draft: &mut String, c: char) {
        draft.insert(byte_index(draft, self.cursor), c);
        self.cursor += 1;
    }

    /// Put the cursor back at the start, after the draft was taken
    pub fn reset(&mut self) {
        self.cursor = 0;
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Widget for the current draft
    pub fn view<'a>(&'a self, draft: &'a str, can_send: bool) -> ComposerView<'a> {
        ComposerView {
            composer: self,
            draft,
            can_send,
        }
    }
}

fn byte_index(text: &str, char_pos: usize) -> usize {
    text.char_indices()
        .nth(char_pos)
        .map(|(i, _)| i)
        .unwrap_or(text.len())
}

/// Render-time pairing of the composer with the draft it edits
pub struct ComposerView<'a> {
    composer: &'a ConversationComposer,
    draft: &'a str,
    can_send: bool,
}

impl Widget for ComposerView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let send_label = if self.can_send {
            Span::styled(" Enter to send ", Style::default().fg(Color::Green))
        } else {
            Span::styled(
                " Sending... ",
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
            )
        };

        let block = Block::default()
            .borders(Borders::ALL)
            .title("Message")
            .title(
                Title::from(Line::from(send_label))
                    .alignment(Alignment::Right)
                    .position(Position::Bottom),
            )
            .border_style(if self.can_send {
                Style::default().fg(Color::Green)
            } else {
                Style::default().fg(Color::Gray)
            });

        let inner_area = block.inner(area);
        block.render(area, buf);

        if inner_area.height == 0 {
            return;
        }

        if self.draft.is_empty() {
            let placeholder_line = Line::from(vec![Span::styled(
                self.composer.placeholder.as_str(),
                Style::default().fg(Color::DarkGray),
            )]);
            buf.set_line(inner_area.x, inner_area.y, &placeholder_line, inner_area.width);
            return;
        }

        let mut content = self.draft.to_string();
        let marker = byte_index(&content, self.composer.cursor);
        content.insert(marker, CURSOR);
        let cursor_end = marker + CURSOR.len_utf8();

        // Window of lines ending at the one holding the cursor
        let lines: Vec<&str> = content.split('\n').collect();
        let cursor_row = content[..marker].matches('\n').count();
        let cursor_line_start = content[..marker].rfind('\n').map(|p| p + 1).unwrap_or(0);
        let height = inner_area.height as usize;
        let start = (cursor_row + 1).saturating_sub(height);
        let end = (start + height).min(lines.len());

        for (i, line_text) in lines[start..end].iter().enumerate() {
            let visible = if start + i == cursor_row {
                scroll_to_cursor(line_text, cursor_end - cursor_line_start, inner_area.width as usize)
            } else {
                *line_text
            };
            let line = Line::from(vec![Span::raw(visible)]);
            buf.set_line(inner_area.x, inner_area.y + i as u16, &line, inner_area.width);
        }
    }
}

/// Drop leading characters until everything up to `cursor_end` fits in `width`
fn scroll_to_cursor(line: &str, cursor_end: usize, width: usize) -> &str {
    for (i, _) in line.char_indices() {
        if i >= cursor_end || line[i..cursor_end].width() <= width {
            return &line[i..];
        }
    }
    line
}
