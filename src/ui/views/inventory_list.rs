use crate::cmms::transport::{HttpTransport, Transport};
use crate::cmms::types::{InventoryItem, InventoryItemId};
use crate::query::{Mutations, Query, QueryState};
use crate::ui::components::{KeyResult, Prompt, PromptEvent, SearchInput, ValidationError};
use crate::ui::context::ViewContext;
use crate::ui::renderfns::{ensure_valid_selection, format_optional_currency, truncate, EMPTY};
use crate::ui::view::{Shortcut, View, ViewAction};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};

const QUANTITY: &str = "Quantity";

/// Parse an on-hand count typed by the user.
fn parse_quantity(input: &str) -> Result<i64, ValidationError> {
  match input.trim() {
    "" => Err(ValidationError::Required(QUANTITY)),
    raw => match raw.parse::<i64>() {
      Ok(n) if n < 0 => Err(ValidationError::Negative(QUANTITY)),
      Ok(n) => Ok(n),
      Err(_) => Err(ValidationError::NotInteger(QUANTITY)),
    },
  }
}

/// Spare parts with their stock levels
pub struct InventoryListView<T: Transport = HttpTransport> {
  ctx: ViewContext<T>,
  query: Query<Vec<InventoryItem>>,
  list_state: ListState,
  search: SearchInput,
  quantity_prompt: Prompt,
  /// Item the open prompt edits
  editing: Option<InventoryItemId>,
  updates: Mutations<InventoryItemId, InventoryItem>,
}

impl<T: Transport> InventoryListView<T> {
  pub fn new(ctx: ViewContext<T>) -> Self {
    let client = ctx.client.clone();
    let mut query = Query::new(move || {
      let client = client.clone();
      async move { client.inventory().await.map_err(|e| e.display_message()) }
    })
    .invalidated_by(ctx.client.cache().subscribe());

    query.fetch();

    Self {
      ctx,
      query,
      list_state: ListState::default(),
      search: SearchInput::new(),
      quantity_prompt: Prompt::new(),
      editing: None,
      updates: Mutations::new(),
    }
  }

  fn filtered(&self) -> Vec<&InventoryItem> {
    self
      .query
      .data()
      .map(|items| {
        items
          .iter()
          .filter(|i| {
            self.search.matches([
              i.part_number.as_str(),
              i.name.as_str(),
              i.location.as_deref().unwrap_or(""),
            ])
          })
          .collect()
      })
      .unwrap_or_default()
  }

  fn selected(&self) -> Option<&InventoryItem> {
    let idx = self.list_state.selected()?;
    self.filtered().get(idx).copied()
  }

  fn edit_quantity(&mut self) {
    let Some(item) = self.selected() else {
      return;
    };
    let (id, title, current) = (
      item.id,
      format!("Quantity of {}", item.part_number),
      item.quantity.to_string(),
    );
    self.quantity_prompt.show(title, current);
    self.editing = Some(id);
  }

  fn submit_quantity(&mut self, value: String) {
    let Some(id) = self.editing else {
      return;
    };
    let quantity = match parse_quantity(&value) {
      Ok(quantity) => quantity,
      Err(e) => {
        self.quantity_prompt.reject(&value, e.to_string());
        return;
      }
    };
    self.editing = None;
    let client = self.ctx.client.clone();
    self.updates.run(id, async move {
      client
        .update_inventory_item(id, quantity)
        .await
        .map_err(|e| e.display_message())
    });
  }

  fn render_list(&mut self, frame: &mut Frame, area: Rect) {
    let len = self.filtered().len();
    ensure_valid_selection(&mut self.list_state, len);

    let low = self
      .query
      .data()
      .map(|items| items.iter().filter(|i| i.needs_reorder()).count())
      .unwrap_or(0);
    let title = match self.query.state() {
      QueryState::Loading => " Inventory (loading...) ".to_string(),
      QueryState::Error(e) => format!(" Inventory (error: {}) ", e),
      _ if low > 0 => format!(" Inventory ({}, {} to reorder) ", len, low),
      _ => format!(" Inventory ({}) ", len),
    };

    let block = Block::default()
      .title(title)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    if len == 0 && !self.query.is_loading() {
      let content = if self.query.is_error() {
        "Failed to load inventory. Press 'r' to retry."
      } else {
        "No parts found."
      };
      let paragraph = Paragraph::new(content)
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
      return;
    }

    let items: Vec<ListItem> = self
      .filtered()
      .iter()
      .map(|item| {
        let quantity_color = if item.needs_reorder() {
          Color::Red
        } else {
          Color::Green
        };
        ListItem::new(Line::from(vec![
          Span::styled(
            format!("{:<14}", truncate(&item.part_number, 14)),
            Style::default().fg(Color::Cyan),
          ),
          Span::raw(" "),
          Span::raw(format!("{:<30}", truncate(&item.name, 30))),
          Span::styled(
            format!("{:>6}", item.quantity),
            Style::default().fg(quantity_color),
          ),
          Span::styled(
            format!(" / {:<6}", item.reorder_point),
            Style::default().fg(Color::DarkGray),
          ),
          Span::raw(format!("{:>12}", format_optional_currency(item.unit_cost))),
          Span::raw("  "),
          Span::styled(
            item.location.clone().unwrap_or_else(|| EMPTY.to_string()),
            Style::default().fg(Color::DarkGray),
          ),
        ]))
      })
      .collect();

    let list = List::new(items)
      .block(block)
      .highlight_style(
        Style::default()
          .bg(Color::DarkGray)
          .add_modifier(Modifier::BOLD),
      )
      .highlight_symbol("> ");

    frame.render_stateful_widget(list, area, &mut self.list_state);
  }
}

impl<T: Transport> View for InventoryListView<T> {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match self.quantity_prompt.handle_key(key) {
      KeyResult::Event(PromptEvent::Submitted(value)) => {
        self.submit_quantity(value);
        return ViewAction::None;
      }
      KeyResult::Event(PromptEvent::Cancelled) => {
        self.editing = None;
        return ViewAction::None;
      }
      KeyResult::Handled => return ViewAction::None,
      KeyResult::NotHandled => {}
    }

    if !matches!(self.search.handle_key(key), KeyResult::NotHandled) {
      self.list_state.select(Some(0));
      return ViewAction::None;
    }

    match key.code {
      KeyCode::Char('j') | KeyCode::Down => self.list_state.select_next(),
      KeyCode::Char('k') | KeyCode::Up => self.list_state.select_previous(),
      KeyCode::Char('r') => self.query.refetch(),
      KeyCode::Char('e') | KeyCode::Enter => self.edit_quantity(),
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    self.render_list(frame, area);
    self.search.render_overlay(frame, area);
    self.quantity_prompt.render_overlay(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    "Inventory".to_string()
  }

  fn tick(&mut self) {
    if self.query.poll() {
      let len = self.filtered().len();
      ensure_valid_selection(&mut self.list_state, len);
    }

    for (_, result) in self.updates.poll() {
      match result {
        Ok(item) => self.ctx.notifier.success(format!(
          "{} now has {} on hand",
          item.part_number, item.quantity
        )),
        Err(e) => self.ctx.notifier.error(e),
      }
    }
  }

  fn captures_input(&self) -> bool {
    self.search.is_active() || self.quantity_prompt.is_active()
  }

  fn is_busy(&self) -> bool {
    self.updates.is_pending()
  }

  fn shortcuts(&self) -> Vec<Shortcut> {
    vec![
      Shortcut::new(":", "command").with_priority(10),
      Shortcut::new("/", "search").with_priority(20),
      Shortcut::new("e", "edit quantity").with_priority(30),
      Shortcut::new("r", "refresh").with_priority(40),
      Shortcut::new("q", "back").with_priority(90),
    ]
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cmms::fake::FakeBackend;
  use crate::ui::context::tests::{settle, test_context};
  use crossterm::event::KeyModifiers;

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  /// Replace the prompt's prefilled value with `s` and submit.
  fn enter_quantity(view: &mut InventoryListView<FakeBackend>, s: &str) {
    view.handle_key(KeyEvent::new(KeyCode::Char('u'), KeyModifiers::CONTROL));
    for c in s.chars() {
      view.handle_key(key(KeyCode::Char(c)));
    }
    view.handle_key(key(KeyCode::Enter));
  }

  #[test]
  fn test_parse_quantity() {
    assert_eq!(parse_quantity(" 7 "), Ok(7));
    assert_eq!(parse_quantity("0"), Ok(0));
    assert_eq!(parse_quantity(""), Err(ValidationError::Required(QUANTITY)));
    assert_eq!(parse_quantity("-1"), Err(ValidationError::Negative(QUANTITY)));
    assert_eq!(parse_quantity("2.5"), Err(ValidationError::NotInteger(QUANTITY)));
  }

  #[tokio::test]
  async fn test_quantity_update_refreshes_list() {
    let backend = FakeBackend::seeded();
    let mut view = InventoryListView::new(test_context(&backend));
    settle(&mut view).await;

    view.handle_key(key(KeyCode::Char('e')));
    enter_quantity(&mut view, "3");
    settle(&mut view).await;

    let item = view.filtered()[0].clone();
    assert_eq!(item.quantity, 3);
    assert!(item.needs_reorder());
  }

  #[tokio::test]
  async fn test_invalid_quantity_is_not_sent() {
    let backend = FakeBackend::seeded();
    let mut view = InventoryListView::new(test_context(&backend));
    settle(&mut view).await;

    view.handle_key(key(KeyCode::Char('e')));
    enter_quantity(&mut view, "lots");
    settle(&mut view).await;

    assert!(view.quantity_prompt.is_active());
    assert_eq!(backend.requests("PUT /api/inventory/1"), 0);
    assert_eq!(view.filtered()[0].quantity, 12);
  }
}
