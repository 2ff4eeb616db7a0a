use crate::cmms::api_types::AssetUpdate;
use crate::cmms::transport::{HttpTransport, Transport};
use crate::cmms::types::{Asset, AssetDetail, AssetId, AssetStatus, DocumentOwner};
use crate::optimistic::{ChangeToken, OptimisticField};
use crate::query::{Mutations, Query, QueryState};
use crate::ui::components::{KeyResult, Picker, PickerEvent};
use crate::ui::context::ViewContext;
use crate::ui::renderfns::{
  asset_status_color, format_optional_currency, format_optional_date, status_label, truncate,
  work_order_status_color, EMPTY,
};
use crate::ui::view::{Shortcut, View, ViewAction};
use crate::ui::views::DocumentListView;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};

/// Detail of one asset with its work orders
pub struct AssetDetailView<T: Transport = HttpTransport> {
  id: AssetId,
  asset_number: String,
  ctx: ViewContext<T>,
  query: Query<AssetDetail>,
  status: Option<OptimisticField<AssetStatus>>,
  picker: Picker<AssetStatus>,
  updates: Mutations<ChangeToken, Asset>,
  work_orders: ListState,
}

impl<T: Transport> AssetDetailView<T> {
  pub fn new(id: AssetId, asset_number: String, ctx: ViewContext<T>) -> Self {
    let client = ctx.client.clone();
    let mut query = Query::new(move || {
      let client = client.clone();
      async move { client.asset_details(id).await.map_err(|e| e.display_message()) }
    })
    .invalidated_by(ctx.client.cache().subscribe());

    query.fetch();

    Self {
      id,
      asset_number,
      ctx,
      query,
      status: None,
      picker: Picker::new(),
      updates: Mutations::new(),
      work_orders: ListState::default(),
    }
  }

  /// Status to show: the optimistic value while a change is pending.
  fn shown_status(&self) -> Option<AssetStatus> {
    self.status.as_ref().map(|field| *field.value())
  }

  fn open_status_picker(&mut self) {
    let Some(current) = self.shown_status() else {
      return;
    };
    let options = AssetStatus::ALL
      .iter()
      .map(|s| (*s, status_label(s.as_str())))
      .collect();
    self.picker.show("Change status", options);
    self.picker.select_where(|s| *s == current);
  }

  fn change_status(&mut self, status: AssetStatus) {
    let Some(field) = self.status.as_mut() else {
      return;
    };
    if *field.value() == status {
      return;
    }
    let token = field.propose(status);
    let client = self.ctx.client.clone();
    let id = self.id;
    self.updates.run(token, async move {
      client
        .update_asset(id, &AssetUpdate::status(status))
        .await
        .map_err(|e| e.display_message())
    });
  }

  fn render_detail(&mut self, frame: &mut Frame, area: Rect) {
    let title = match self.query.state() {
      QueryState::Loading if self.query.data().is_none() => {
        format!(" {} (loading...) ", self.asset_number)
      }
      QueryState::Error(e) => format!(" {} (error: {}) ", self.asset_number, e),
      _ => format!(" {} ", self.asset_number),
    };

    let block = Block::default()
      .title(title)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let Some(detail) = self.query.data() else {
      let (text, color) = match self.query.error() {
        Some(error) => (format!("Error: {}\n\nPress 'r' to retry.", error), Color::Red),
        None => ("Loading asset details...".to_string(), Color::DarkGray),
      };
      frame.render_widget(Paragraph::new(text).style(Style::default().fg(color)), inner);
      return;
    };

    let asset = &detail.asset;
    let status = self.shown_status().unwrap_or(asset.status);
    let pending = self.status.as_ref().is_some_and(|f| f.is_pending());

    let label = |text: &'static str| Span::styled(format!("{:<20}", text), Style::default().fg(Color::DarkGray));
    let value = |text: &str| Span::raw(text.to_string());

    let mut status_spans = vec![
      label("Status"),
      Span::styled(
        status_label(status.as_str()),
        Style::default().fg(asset_status_color(status)),
      ),
    ];
    if pending {
      status_spans.push(Span::styled("  saving...", Style::default().fg(Color::Yellow)));
    }

    let parent = detail
      .parent
      .as_ref()
      .map(|p| format!("{} ({})", p.asset_number, p.description))
      .unwrap_or_else(|| EMPTY.to_string());

    let lines = vec![
      Line::from(vec![label("Description"), value(&asset.description)]),
      Line::from(status_spans),
      Line::from(vec![
        label("Type"),
        value(detail.asset_type.as_ref().map(|t| t.name.as_str()).unwrap_or(EMPTY)),
      ]),
      Line::from(vec![label("Parent"), value(&parent)]),
      Line::from(vec![label("Location"), value(asset.location.as_deref().unwrap_or(EMPTY))]),
      Line::from(vec![
        label("Manufacturer"),
        value(asset.manufacturer.as_deref().unwrap_or(EMPTY)),
      ]),
      Line::from(vec![label("Model"), value(asset.model.as_deref().unwrap_or(EMPTY))]),
      Line::from(vec![
        label("Serial number"),
        value(asset.serial_number.as_deref().unwrap_or(EMPTY)),
      ]),
      Line::from(vec![label("Installed"), value(&format_optional_date(asset.install_date))]),
      Line::from(vec![
        label("Warranty expires"),
        value(&format_optional_date(asset.warranty_expiration_date)),
      ]),
      Line::from(vec![
        label("Replacement cost"),
        value(&format_optional_currency(asset.replacement_cost)),
      ]),
    ];

    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([
        Constraint::Length(lines.len() as u16 + 1),
        Constraint::Min(3), // Work orders
      ])
      .split(inner);

    frame.render_widget(Paragraph::new(lines), chunks[0]);

    let items: Vec<ListItem> = detail
      .work_orders
      .iter()
      .map(|wo| {
        ListItem::new(Line::from(vec![
          Span::styled(format!("{:<10}", wo.work_order_number), Style::default().fg(Color::Cyan)),
          Span::raw(" "),
          Span::styled(
            format!("{:<12}", status_label(wo.status.as_str())),
            Style::default().fg(work_order_status_color(wo.status)),
          ),
          Span::raw(" "),
          Span::raw(truncate(&wo.title, 50)),
        ]))
      })
      .collect();

    let list = List::new(items)
      .block(
        Block::default()
          .title(format!(" Work orders ({}) ", detail.work_orders.len()))
          .borders(Borders::TOP)
          .border_style(Style::default().fg(Color::DarkGray)),
      )
      .highlight_style(Style::default().bg(Color::DarkGray));
    frame.render_stateful_widget(list, chunks[1], &mut self.work_orders);
  }
}

impl<T: Transport> View for AssetDetailView<T> {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match self.picker.handle_key(key) {
      KeyResult::Event(PickerEvent::Selected(status)) => {
        self.change_status(status);
        return ViewAction::None;
      }
      KeyResult::NotHandled => {}
      _ => return ViewAction::None,
    }

    match key.code {
      KeyCode::Char('s') => self.open_status_picker(),
      KeyCode::Char('j') | KeyCode::Down => self.work_orders.select_next(),
      KeyCode::Char('k') | KeyCode::Up => self.work_orders.select_previous(),
      KeyCode::Char('r') => self.query.refetch(),
      KeyCode::Char('d') => {
        return ViewAction::Push(Box::new(DocumentListView::new(
          DocumentOwner::Asset(self.id),
          self.asset_number.clone(),
          self.ctx.clone(),
        )));
      }
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    self.render_detail(frame, area);
    self.picker.render_overlay(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    self.asset_number.clone()
  }

  fn tick(&mut self) {
    // Only fresh server data; `data()` still holds the old copy mid-refetch
    if self.query.poll() && self.query.is_success() {
      if let Some(server) = self.query.data().map(|d| d.asset.status) {
        match self.status.as_mut() {
          Some(field) => field.sync(server),
          None => self.status = Some(OptimisticField::new(server)),
        }
      }
    }

    for (token, result) in self.updates.poll() {
      let Some(field) = self.status.as_mut() else {
        continue;
      };
      match result {
        Ok(asset) => {
          if field.commit(token, asset.status) {
            self.ctx.notifier.success(format!(
              "{} is now {}",
              asset.asset_number,
              status_label(asset.status.as_str())
            ));
          }
        }
        Err(e) => {
          // A superseded change failing has nothing left to undo
          if field.revert(token) {
            self.ctx.notifier.error(e);
          }
        }
      }
    }
  }

  fn is_busy(&self) -> bool {
    self.updates.is_pending()
  }

  fn shortcuts(&self) -> Vec<Shortcut> {
    vec![
      Shortcut::new(":", "command").with_priority(10),
      Shortcut::new("s", "status").with_priority(20),
      Shortcut::new("d", "documents").with_priority(30),
      Shortcut::new("r", "refresh").with_priority(40),
      Shortcut::new("q", "back").with_priority(90),
    ]
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cmms::cache::CmmsQueryKey;
  use crate::cmms::fake::FakeBackend;
  use crate::optimistic::FieldState;
  use crate::ui::context::tests::{settle, test_context};
  use crossterm::event::KeyModifiers;

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  /// Open the picker on an operational asset and pick "Maintenance Required".
  fn pick_maintenance_required(view: &mut AssetDetailView<FakeBackend>) {
    view.handle_key(key(KeyCode::Char('s')));
    view.handle_key(key(KeyCode::Char('j')));
    view.handle_key(key(KeyCode::Char('j')));
    view.handle_key(key(KeyCode::Enter));
  }

  #[tokio::test]
  async fn test_status_change_is_shown_immediately_then_committed() {
    let backend = FakeBackend::seeded();
    backend.set_latency(std::time::Duration::from_millis(20));
    let mut view = AssetDetailView::new(42, "PUMP-042".to_string(), test_context(&backend));
    settle(&mut view).await;
    settle(&mut view).await;
    assert_eq!(view.shown_status(), Some(AssetStatus::Operational));

    pick_maintenance_required(&mut view);
    assert_eq!(view.shown_status(), Some(AssetStatus::MaintenanceRequired));
    assert!(view.is_busy());

    settle(&mut view).await;
    settle(&mut view).await;
    let field = view.status.as_ref().unwrap();
    assert_eq!(field.state(), FieldState::Committed);
    assert_eq!(
      view.query.data().map(|d| d.asset.status),
      Some(AssetStatus::MaintenanceRequired)
    );
    assert_eq!(
      backend.asset(42).map(|a| a.status),
      Some(AssetStatus::MaintenanceRequired)
    );
  }

  #[tokio::test]
  async fn test_failed_status_change_reverts() {
    let backend = FakeBackend::seeded();
    let ctx = test_context(&backend);
    let notifier = ctx.notifier.clone();
    let mut view = AssetDetailView::new(42, "PUMP-042".to_string(), ctx);
    settle(&mut view).await;
    let epoch = view.ctx.client.cache().epoch();

    backend.fail_next("PUT /api/assets/42", 1, 500);
    pick_maintenance_required(&mut view);
    settle(&mut view).await;

    let field = view.status.as_ref().unwrap();
    assert_eq!(field.state(), FieldState::Reverted);
    assert_eq!(view.shown_status(), Some(AssetStatus::Operational));
    assert_eq!(notifier.visible()[0].message, "Injected failure");
    // Nothing was invalidated
    assert_eq!(view.ctx.client.cache().epoch(), epoch);
    assert!(view
      .ctx
      .client
      .cache()
      .is_cached(&CmmsQueryKey::AssetDetail { id: 42 }));
  }

  #[tokio::test]
  async fn test_picking_current_status_sends_nothing() {
    let backend = FakeBackend::seeded();
    let mut view = AssetDetailView::new(42, "PUMP-042".to_string(), test_context(&backend));
    settle(&mut view).await;

    view.handle_key(key(KeyCode::Char('s')));
    view.handle_key(key(KeyCode::Enter));
    settle(&mut view).await;
    assert_eq!(backend.requests("PUT /api/assets/42"), 0);
  }
}
