use std::collections::HashMap;

use crate::cmms::api_types::{NewWorkOrder, WorkOrderUpdate};
use crate::cmms::transport::{HttpTransport, Transport};
use crate::cmms::types::{DocumentOwner, WorkOrder, WorkOrderDetail, WorkOrderId, WorkOrderStatus};
use crate::optimistic::{ChangeToken, OptimisticField};
use crate::query::{Mutations, Query, QueryState};
use crate::ui::components::{
  FieldKind, Form, FormEvent, FormValues, KeyResult, Picker, PickerEvent, SearchInput,
};
use crate::ui::context::ViewContext;
use crate::ui::renderfns::{
  ensure_valid_selection, format_optional_date, status_label, truncate, work_order_status_color,
  EMPTY,
};
use crate::ui::view::{Shortcut, View, ViewAction};
use crate::ui::views::{AssetDetailView, DocumentListView};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};

/// View listing every work order with assignee and asset
pub struct WorkOrderListView<T: Transport = HttpTransport> {
  ctx: ViewContext<T>,
  query: Query<Vec<WorkOrderDetail>>,
  list_state: ListState,
  search: SearchInput,
  /// Status shown per row, ahead of the server while a change is in flight
  statuses: HashMap<WorkOrderId, OptimisticField<WorkOrderStatus>>,
  picker: Picker<WorkOrderStatus>,
  /// Row the open status picker is for
  picking_for: Option<WorkOrderId>,
  updates: Mutations<(WorkOrderId, ChangeToken), WorkOrder>,
  form: Form,
  create: Mutations<(), WorkOrder>,
}

fn new_work_order_form() -> Form {
  let statuses = WorkOrderStatus::ALL.iter().map(|s| s.as_str()).collect();
  Form::new("New work order")
    .field("title", "Title", FieldKind::Text)
    .required()
    .field("description", "Description", FieldKind::Text)
    .field("status", "Status", FieldKind::Choice(statuses))
    .field("assetId", "Asset id", FieldKind::Count)
    .field("scheduledDate", "Scheduled date", FieldKind::Date)
}

fn new_work_order_from(values: &FormValues) -> Option<NewWorkOrder> {
  Some(NewWorkOrder {
    title: values.text("title")?,
    description: values.text("description"),
    status: values
      .text("status")
      .and_then(|s| WorkOrderStatus::from_wire(&s))
      .unwrap_or(WorkOrderStatus::Requested),
    asset_id: values.count("assetId"),
    scheduled_date: values.date("scheduledDate"),
  })
}

impl<T: Transport> WorkOrderListView<T> {
  pub fn new(ctx: ViewContext<T>) -> Self {
    let client = ctx.client.clone();
    let mut query = Query::new(move || {
      let client = client.clone();
      async move { client.work_orders().await.map_err(|e| e.display_message()) }
    })
    .invalidated_by(ctx.client.cache().subscribe());

    query.fetch();

    Self {
      ctx,
      query,
      list_state: ListState::default(),
      search: SearchInput::new(),
      statuses: HashMap::new(),
      picker: Picker::new(),
      picking_for: None,
      updates: Mutations::new(),
      form: new_work_order_form(),
      create: Mutations::new(),
    }
  }

  fn filtered(&self) -> Vec<&WorkOrderDetail> {
    self
      .query
      .data()
      .map(|orders| {
        orders
          .iter()
          .filter(|d| {
            self.search.matches([
              d.work_order.work_order_number.as_str(),
              d.work_order.title.as_str(),
              d.asset.as_ref().map(|a| a.asset_number.as_str()).unwrap_or(""),
              d.assigned_to.as_ref().map(|u| u.full_name.as_str()).unwrap_or(""),
            ])
          })
          .collect()
      })
      .unwrap_or_default()
  }

  fn selected(&self) -> Option<&WorkOrderDetail> {
    let idx = self.list_state.selected()?;
    self.filtered().get(idx).copied()
  }

  fn shown_status(&self, order: &WorkOrder) -> WorkOrderStatus {
    self
      .statuses
      .get(&order.id)
      .map(|field| *field.value())
      .unwrap_or(order.status)
  }

  /// Take in freshly fetched statuses without clobbering pending changes.
  fn sync_statuses(&mut self) {
    let Some(orders) = self.query.data() else {
      return;
    };
    for detail in orders {
      let order = &detail.work_order;
      self
        .statuses
        .entry(order.id)
        .and_modify(|field| field.sync(order.status))
        .or_insert_with(|| OptimisticField::new(order.status));
    }
  }

  fn open_status_picker(&mut self) {
    let Some(order) = self.selected().map(|d| d.work_order.clone()) else {
      return;
    };
    let current = self.shown_status(&order);
    let options = WorkOrderStatus::ALL
      .iter()
      .map(|s| (*s, status_label(s.as_str())))
      .collect();
    self
      .picker
      .show(format!("Status of {}", order.work_order_number), options);
    self.picker.select_where(|s| *s == current);
    self.picking_for = Some(order.id);
  }

  fn change_status(&mut self, id: WorkOrderId, status: WorkOrderStatus) {
    let Some(field) = self.statuses.get_mut(&id) else {
      return;
    };
    if *field.value() == status {
      return;
    }
    let token = field.propose(status);
    let client = self.ctx.client.clone();
    self.updates.run((id, token), async move {
      client
        .update_work_order(id, &WorkOrderUpdate::status(status))
        .await
        .map_err(|e| e.display_message())
    });
  }

  fn submit(&mut self) {
    let Ok(values) = self.form.validate() else {
      return;
    };
    let Some(body) = new_work_order_from(&values) else {
      return;
    };
    self.form.set_submitting(true);
    let client = self.ctx.client.clone();
    self.create.run((), async move {
      client
        .create_work_order(&body)
        .await
        .map_err(|e| e.display_message())
    });
  }

  fn render_list(&mut self, frame: &mut Frame, area: Rect) {
    let len = self.filtered().len();
    ensure_valid_selection(&mut self.list_state, len);

    let filter = if self.search.query().is_empty() {
      String::new()
    } else {
      format!(" /{}", self.search.query())
    };
    let title = match self.query.state() {
      QueryState::Loading => format!(" Work orders{} (loading...) ", filter),
      QueryState::Error(e) => format!(" Work orders{} (error: {}) ", filter, e),
      _ => format!(" Work orders{} ({}) ", filter, len),
    };

    let block = Block::default()
      .title(title)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    if len == 0 && !self.query.is_loading() {
      let content = if self.query.is_error() {
        "Failed to load work orders. Press 'r' to retry."
      } else if !self.search.query().is_empty() {
        "No work orders match the filter."
      } else {
        "No work orders. Press 'n' to create one."
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
      .map(|detail| {
        let order = &detail.work_order;
        let status = self.shown_status(order);
        let pending = self.statuses.get(&order.id).is_some_and(|f| f.is_pending());
        let mut status_text = status_label(status.as_str());
        if pending {
          status_text.push('*');
        }
        ListItem::new(Line::from(vec![
          Span::styled(
            format!("{:<10}", order.work_order_number),
            Style::default().fg(Color::Cyan),
          ),
          Span::raw(" "),
          Span::styled(
            format!("{:<13}", status_text),
            Style::default().fg(work_order_status_color(status)),
          ),
          Span::raw(" "),
          Span::raw(format!("{:<36}", truncate(&order.title, 36))),
          Span::raw(" "),
          Span::styled(
            format!(
              "{:<12}",
              detail.asset.as_ref().map(|a| a.asset_number.as_str()).unwrap_or(EMPTY)
            ),
            Style::default().fg(Color::DarkGray),
          ),
          Span::raw(format!(
            "{:<18}",
            truncate(
              detail.assigned_to.as_ref().map(|u| u.full_name.as_str()).unwrap_or(EMPTY),
              18
            )
          )),
          Span::styled(
            format_optional_date(order.scheduled_date),
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

impl<T: Transport> View for WorkOrderListView<T> {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match self.form.handle_key(key) {
      KeyResult::Event(FormEvent::Submitted) => {
        self.submit();
        return ViewAction::None;
      }
      KeyResult::NotHandled => {}
      _ => return ViewAction::None,
    }

    match self.picker.handle_key(key) {
      KeyResult::Event(PickerEvent::Selected(status)) => {
        if let Some(id) = self.picking_for.take() {
          self.change_status(id, status);
        }
        return ViewAction::None;
      }
      KeyResult::Event(PickerEvent::Cancelled) => {
        self.picking_for = None;
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
      KeyCode::Char('s') => self.open_status_picker(),
      KeyCode::Char('n') => {
        self.form = new_work_order_form();
        self.form.show();
      }
      KeyCode::Char('d') => {
        if let Some(order) = self.selected().map(|d| &d.work_order) {
          return ViewAction::Push(Box::new(DocumentListView::new(
            DocumentOwner::WorkOrder(order.id),
            order.work_order_number.clone(),
            self.ctx.clone(),
          )));
        }
      }
      KeyCode::Enter => {
        // Jump to the asset the work is on
        if let Some(asset) = self.selected().and_then(|d| d.asset.as_ref()) {
          return ViewAction::Push(Box::new(AssetDetailView::new(
            asset.id,
            asset.asset_number.clone(),
            self.ctx.clone(),
          )));
        }
      }
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    self.render_list(frame, area);
    self.search.render_overlay(frame, area);
    self.picker.render_overlay(frame, area);
    self.form.render_overlay(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    "Work orders".to_string()
  }

  fn tick(&mut self) {
    if self.query.poll() {
      if self.query.is_success() {
        self.sync_statuses();
      }
      let len = self.filtered().len();
      ensure_valid_selection(&mut self.list_state, len);
    }

    for ((id, token), result) in self.updates.poll() {
      let Some(field) = self.statuses.get_mut(&id) else {
        continue;
      };
      match result {
        Ok(order) => {
          if field.commit(token, order.status) {
            self.ctx.notifier.success(format!(
              "{} is now {}",
              order.work_order_number,
              status_label(order.status.as_str())
            ));
          }
        }
        Err(e) => {
          if field.revert(token) {
            self.ctx.notifier.error(e);
          }
        }
      }
    }

    for ((), result) in self.create.poll() {
      match result {
        Ok(order) => {
          self.form.hide();
          self
            .ctx
            .notifier
            .success(format!("Work order {} created", order.work_order_number));
        }
        Err(e) => {
          self.form.set_submitting(false);
          self.ctx.notifier.error(e);
        }
      }
    }
  }

  fn captures_input(&self) -> bool {
    self.form.is_active() || self.search.is_active() || self.picker.is_active()
  }

  fn is_busy(&self) -> bool {
    self.updates.is_pending() || self.create.is_pending()
  }

  fn shortcuts(&self) -> Vec<Shortcut> {
    vec![
      Shortcut::new(":", "command").with_priority(10),
      Shortcut::new("/", "search").with_priority(20),
      Shortcut::new("s", "status").with_priority(30),
      Shortcut::new("n", "new").with_priority(40),
      Shortcut::new("enter", "asset").with_priority(50),
      Shortcut::new("d", "documents").with_priority(60),
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

  fn type_str(view: &mut WorkOrderListView<FakeBackend>, s: &str) {
    for c in s.chars() {
      view.handle_key(key(KeyCode::Char(c)));
    }
  }

  /// Select WO-0002 (requested) and pick "Approved".
  fn approve_second(view: &mut WorkOrderListView<FakeBackend>) {
    view.handle_key(key(KeyCode::Char('j')));
    view.handle_key(key(KeyCode::Char('s')));
    view.handle_key(key(KeyCode::Char('j')));
    view.handle_key(key(KeyCode::Enter));
  }

  #[tokio::test]
  async fn test_status_change_commits() {
    let backend = FakeBackend::seeded();
    let mut view = WorkOrderListView::new(test_context(&backend));
    settle(&mut view).await;

    approve_second(&mut view);
    assert_eq!(view.statuses[&2].state(), FieldState::Pending);
    assert_eq!(*view.statuses[&2].value(), WorkOrderStatus::Approved);

    settle(&mut view).await;
    assert_eq!(view.statuses[&2].state(), FieldState::Committed);
    assert_eq!(
      backend.work_order(2).map(|w| w.status),
      Some(WorkOrderStatus::Approved)
    );
  }

  #[tokio::test]
  async fn test_failed_status_change_reverts_row() {
    let backend = FakeBackend::seeded();
    let ctx = test_context(&backend);
    let notifier = ctx.notifier.clone();
    let mut view = WorkOrderListView::new(ctx);
    settle(&mut view).await;

    backend.fail_next("PUT /api/work-orders/2", 1, 409);
    approve_second(&mut view);
    settle(&mut view).await;

    assert_eq!(view.statuses[&2].state(), FieldState::Reverted);
    assert_eq!(*view.statuses[&2].value(), WorkOrderStatus::Requested);
    assert_eq!(notifier.visible()[0].message, "Injected failure");
  }

  #[tokio::test]
  async fn test_new_work_order_on_asset() {
    let backend = FakeBackend::seeded();
    let mut view = WorkOrderListView::new(test_context(&backend));
    settle(&mut view).await;
    view.ctx.client.asset_details(42).await.unwrap();

    view.handle_key(key(KeyCode::Char('n')));
    type_str(&mut view, "Replace seal");
    // Skip description and status
    view.handle_key(key(KeyCode::Tab));
    view.handle_key(key(KeyCode::Tab));
    view.handle_key(key(KeyCode::Tab));
    type_str(&mut view, "42");
    view.handle_key(key(KeyCode::Enter));
    settle(&mut view).await;

    assert!(!view.form.is_active());
    let created = view
      .filtered()
      .into_iter()
      .find(|d| d.work_order.title == "Replace seal")
      .cloned()
      .unwrap();
    assert_eq!(created.asset.map(|a| a.id), Some(42));
    assert!(!view
      .ctx
      .client
      .cache()
      .is_cached(&CmmsQueryKey::AssetDetail { id: 42 }));
  }

  #[tokio::test]
  async fn test_search_by_assignee() {
    let backend = FakeBackend::seeded();
    let mut view = WorkOrderListView::new(test_context(&backend));
    settle(&mut view).await;

    type_str(&mut view, "/dana");
    view.handle_key(key(KeyCode::Enter));
    let numbers: Vec<&str> = view
      .filtered()
      .iter()
      .map(|d| d.work_order.work_order_number.as_str())
      .collect();
    assert_eq!(numbers, vec!["WO-0003"]);
  }
}
