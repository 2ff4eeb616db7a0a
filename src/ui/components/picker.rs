use super::KeyResult;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph};

/// Events emitted by the picker that the parent needs to handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickerEvent<T> {
  Selected(T),
  Cancelled,
}

/// Overlay list for choosing one value, e.g. a target status or a work
/// order to assign.
#[derive(Debug, Clone)]
pub struct Picker<T> {
  active: bool,
  options: Vec<(T, String)>,
  selected: usize,
  title: String,
  empty_message: String,
}

impl<T> Default for Picker<T> {
  fn default() -> Self {
    Self {
      active: false,
      options: Vec::new(),
      selected: 0,
      title: String::new(),
      empty_message: String::new(),
    }
  }
}

impl<T: Clone> Picker<T> {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn is_active(&self) -> bool {
    self.active
  }

  /// Show the picker with `(value, label)` options.
  pub fn show(&mut self, title: impl Into<String>, options: Vec<(T, String)>) {
    self.active = true;
    self.options = options;
    self.selected = 0;
    self.title = title.into();
  }

  /// Message rendered when there is nothing to pick.
  pub fn with_empty_message(mut self, message: impl Into<String>) -> Self {
    self.empty_message = message.into();
    self
  }

  pub fn hide(&mut self) {
    self.active = false;
    self.options.clear();
    self.selected = 0;
  }

  /// Preselect the first option whose value satisfies `pred`.
  pub fn select_where(&mut self, pred: impl Fn(&T) -> bool) {
    if let Some(idx) = self.options.iter().position(|(value, _)| pred(value)) {
      self.selected = idx;
    }
  }

  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult<PickerEvent<T>> {
    if !self.active {
      return KeyResult::NotHandled;
    }

    match key.code {
      KeyCode::Esc | KeyCode::Char('q') => {
        self.hide();
        KeyResult::Event(PickerEvent::Cancelled)
      }
      KeyCode::Enter => {
        let choice = self.options.get(self.selected).map(|(value, _)| value.clone());
        self.hide();
        match choice {
          Some(value) => KeyResult::Event(PickerEvent::Selected(value)),
          None => KeyResult::Event(PickerEvent::Cancelled),
        }
      }
      KeyCode::Char('j') | KeyCode::Down => {
        if !self.options.is_empty() {
          self.selected = (self.selected + 1) % self.options.len();
        }
        KeyResult::Handled
      }
      KeyCode::Char('k') | KeyCode::Up => {
        if !self.options.is_empty() {
          self.selected = self
            .selected
            .checked_sub(1)
            .unwrap_or(self.options.len() - 1);
        }
        KeyResult::Handled
      }
      _ => KeyResult::Handled,
    }
  }

  /// Render the picker overlay if active
  pub fn render_overlay(&self, frame: &mut Frame, area: Rect) {
    if !self.active {
      return;
    }

    let longest = self
      .options
      .iter()
      .map(|(_, label)| label.chars().count())
      .chain([self.title.chars().count(), self.empty_message.chars().count()])
      .max()
      .unwrap_or(10);
    let width = (longest as u16 + 6).max(20).min(area.width.saturating_sub(4));
    let height = (self.options.len().max(1) as u16 + 2).min(area.height.saturating_sub(4)).max(3);

    // Center the overlay
    let x = area.x + area.width.saturating_sub(width) / 2;
    let y = area.y + area.height.saturating_sub(height) / 2;
    let overlay_area = Rect::new(x, y, width, height);

    frame.render_widget(Clear, overlay_area);

    let block = Block::default()
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Yellow))
      .title(format!(" {} ", self.title));

    let inner = block.inner(overlay_area);
    frame.render_widget(block, overlay_area);

    if inner.height == 0 {
      return;
    }

    if self.options.is_empty() {
      let message = Paragraph::new(self.empty_message.as_str()).style(Style::default().fg(Color::DarkGray));
      frame.render_widget(message, inner);
      return;
    }

    let items: Vec<ListItem> = self
      .options
      .iter()
      .map(|(_, label)| ListItem::new(Span::styled(label.as_str(), Style::default().fg(Color::Cyan))))
      .collect();

    let list =
      List::new(items).highlight_style(Style::default().bg(Color::DarkGray).fg(Color::White));

    let mut state = ListState::default();
    state.select(Some(self.selected));

    frame.render_stateful_widget(list, inner, &mut state);
  }
}
