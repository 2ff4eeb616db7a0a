use super::input::{InputResult, TextInput};
use super::KeyResult;
use crossterm::event::KeyEvent;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptEvent {
  Submitted(String),
  Cancelled,
}

/// Single-line question overlay, e.g. a new quantity or a file path.
#[derive(Debug, Clone, Default)]
pub struct Prompt {
  title: String,
  input: TextInput,
  error: Option<String>,
  active: bool,
}

impl Prompt {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn is_active(&self) -> bool {
    self.active
  }

  pub fn show(&mut self, title: impl Into<String>, initial: impl Into<String>) {
    self.title = title.into();
    self.input = TextInput::with_value(initial);
    self.error = None;
    self.active = true;
  }

  /// Reopen with an inline error after a rejected submission.
  pub fn reject(&mut self, value: &str, error: impl Into<String>) {
    self.input = TextInput::with_value(value);
    self.error = Some(error.into());
    self.active = true;
  }

  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult<PromptEvent> {
    if !self.active {
      return KeyResult::NotHandled;
    }

    match self.input.handle_key(key) {
      InputResult::Submitted(value) => {
        self.active = false;
        KeyResult::Event(PromptEvent::Submitted(value))
      }
      InputResult::Cancelled => {
        self.active = false;
        KeyResult::Event(PromptEvent::Cancelled)
      }
      InputResult::Consumed => {
        self.error = None;
        KeyResult::Handled
      }
      InputResult::NotHandled => KeyResult::Handled,
    }
  }

  pub fn render_overlay(&self, frame: &mut Frame, area: Rect) {
    if !self.active {
      return;
    }

    let width = 60.min(area.width.saturating_sub(4));
    let height = if self.error.is_some() { 4 } else { 3 };
    let x = area.x + area.width.saturating_sub(width) / 2;
    let y = area.y + area.height.saturating_sub(height) / 2;
    let overlay_area = Rect::new(x, y, width, height);

    frame.render_widget(Clear, overlay_area);

    let block = Block::default()
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Yellow))
      .title(format!(" {} ", self.title));

    let mut lines = vec![Line::from(vec![
      Span::raw(self.input.value()),
      Span::styled("_", Style::default().fg(Color::Yellow)),
    ])];
    if let Some(error) = &self.error {
      lines.push(Line::styled(error.as_str(), Style::default().fg(Color::Red)));
    }
    frame.render_widget(Paragraph::new(lines).block(block), overlay_area);
  }
}
