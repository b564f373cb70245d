use ratatui::{
    style::{Color, Style},
    text::{Line, Span},
};

/// Transient "assistant is typing" line shown while a reply is pending.
///
/// Driven by the tick counter rather than wall-clock time so that a given
/// tick always renders the same frame.
#[derive(Debug, Clone, Copy)]
pub struct TypingIndicator {
    tick: usize,
}

impl TypingIndicator {
    pub fn new(tick: usize) -> Self {
        Self { tick }
    }

    fn dots(&self) -> &'static str {
        match self.tick % 4 {
            0 => ".",
            1 => "..",
            2 => "...",
            _ => "   ",
        }
    }

    pub fn line(&self) -> Line<'static> {
        Line::from(vec![
            Span::styled("🤖 ", Style::default().fg(Color::Green)),
            Span::styled("Assistant is typing", Style::default().fg(Color::Green)),
            Span::styled(self.dots(), Style::default().fg(Color::Yellow)),
        ])
    }
}
