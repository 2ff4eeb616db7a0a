use crate::cmms::transport::{HttpTransport, Transport};
use crate::cmms::types::{
  assignable_work_orders, open_assignment_count, User, WorkOrder, WorkOrderDetail, WorkOrderId,
};
use crate::query::{Mutations, Query, QueryState};
use crate::ui::components::{KeyResult, Picker, PickerEvent, SearchInput};
use crate::ui::context::ViewContext;
use crate::ui::renderfns::{ensure_valid_selection, status_label, truncate};
use crate::ui::view::{Shortcut, View, ViewAction};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};

/// Users together with the work they could be given
pub struct Roster {
  pub users: Vec<User>,
  pub work_orders: Vec<WorkOrderDetail>,
}

impl Roster {
  fn orders(&self) -> impl Iterator<Item = &WorkOrder> {
    self.work_orders.iter().map(|d| &d.work_order)
  }
}

/// People who can be assigned work orders
pub struct ResourceListView<T: Transport = HttpTransport> {
  ctx: ViewContext<T>,
  query: Query<Roster>,
  list_state: ListState,
  search: SearchInput,
  picker: Picker<WorkOrderId>,
  /// User the open picker assigns to
  assigning: Option<User>,
  assignments: Mutations<String, WorkOrder>,
}

impl<T: Transport> ResourceListView<T> {
  pub fn new(ctx: ViewContext<T>) -> Self {
    let client = ctx.client.clone();
    let mut query = Query::new(move || {
      let client = client.clone();
      async move {
        let (users, work_orders) = tokio::try_join!(client.users(), client.work_orders())
          .map_err(|e| e.display_message())?;
        Ok(Roster { users, work_orders })
      }
    })
    .invalidated_by(ctx.client.cache().subscribe());

    query.fetch();

    Self {
      ctx,
      query,
      list_state: ListState::default(),
      search: SearchInput::new(),
      picker: Picker::new().with_empty_message("No unassigned open work orders"),
      assigning: None,
      assignments: Mutations::new(),
    }
  }

  fn filtered(&self) -> Vec<&User> {
    self
      .query
      .data()
      .map(|roster| {
        roster
          .users
          .iter()
          .filter(|u| self.search.matches([u.full_name.as_str(), u.email.as_str(), u.role.as_str()]))
          .collect()
      })
      .unwrap_or_default()
  }

  fn selected(&self) -> Option<&User> {
    let idx = self.list_state.selected()?;
    self.filtered().get(idx).copied()
  }

  fn open_assign_picker(&mut self) {
    let Some(user) = self.selected().cloned() else {
      return;
    };
    if !user.is_active {
      self
        .ctx
        .notifier
        .error(format!("{} is inactive and cannot be assigned work", user.full_name));
      return;
    }
    let Some(roster) = self.query.data() else {
      return;
    };
    let options = assignable_work_orders(roster.orders())
      .into_iter()
      .map(|wo| {
        let label = format!(
          "{}  {}  ({})",
          wo.work_order_number,
          truncate(&wo.title, 40),
          status_label(wo.status.as_str())
        );
        (wo.id, label)
      })
      .collect();
    self
      .picker
      .show(format!("Assign to {}", user.full_name), options);
    self.assigning = Some(user);
  }

  fn assign(&mut self, work_order: WorkOrderId, user: User) {
    let client = self.ctx.client.clone();
    self.assignments.run(user.full_name, async move {
      client
        .assign_work_order(work_order, user.id)
        .await
        .map_err(|e| e.display_message())
    });
  }

  fn render_list(&mut self, frame: &mut Frame, area: Rect) {
    let len = self.filtered().len();
    ensure_valid_selection(&mut self.list_state, len);

    let title = match self.query.state() {
      QueryState::Loading => " Resources (loading...) ".to_string(),
      QueryState::Error(e) => format!(" Resources (error: {}) ", e),
      _ => format!(" Resources ({}) ", len),
    };

    let block = Block::default()
      .title(title)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    let Some(roster) = self.query.data().filter(|_| len > 0) else {
      let content = if self.query.is_error() {
        "Failed to load users. Press 'r' to retry."
      } else if self.query.is_loading() {
        "Loading users..."
      } else {
        "No users found."
      };
      let paragraph = Paragraph::new(content)
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
      return;
    };

    let items: Vec<ListItem> = self
      .filtered()
      .iter()
      .map(|user| {
        let open = open_assignment_count(roster.orders(), user.id);
        let (state, state_color) = if user.is_active {
          ("active", Color::Green)
        } else {
          ("inactive", Color::DarkGray)
        };
        ListItem::new(Line::from(vec![
          Span::raw(format!("{:<24}", truncate(&user.full_name, 24))),
          Span::raw(" "),
          Span::styled(
            format!("{:<30}", truncate(&user.email, 30)),
            Style::default().fg(Color::DarkGray),
          ),
          Span::raw(" "),
          Span::styled(format!("{:<14}", user.role), Style::default().fg(Color::Cyan)),
          Span::styled(format!("{:<10}", state), Style::default().fg(state_color)),
          Span::raw(format!("{} open", open)),
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

impl<T: Transport> View for ResourceListView<T> {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match self.picker.handle_key(key) {
      KeyResult::Event(PickerEvent::Selected(work_order)) => {
        if let Some(user) = self.assigning.take() {
          self.assign(work_order, user);
        }
        return ViewAction::None;
      }
      KeyResult::Event(PickerEvent::Cancelled) => {
        self.assigning = None;
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
      KeyCode::Char('a') | KeyCode::Enter => self.open_assign_picker(),
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    self.render_list(frame, area);
    self.search.render_overlay(frame, area);
    self.picker.render_overlay(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    "Resources".to_string()
  }

  fn tick(&mut self) {
    if self.query.poll() {
      let len = self.filtered().len();
      ensure_valid_selection(&mut self.list_state, len);
    }

    for (name, result) in self.assignments.poll() {
      match result {
        Ok(order) => self
          .ctx
          .notifier
          .success(format!("Assigned {} to {}", order.work_order_number, name)),
        Err(e) => self.ctx.notifier.error(e),
      }
    }
  }

  fn captures_input(&self) -> bool {
    self.search.is_active() || self.picker.is_active()
  }

  fn is_busy(&self) -> bool {
    self.assignments.is_pending()
  }

  fn shortcuts(&self) -> Vec<Shortcut> {
    vec![
      Shortcut::new(":", "command").with_priority(10),
      Shortcut::new("/", "search").with_priority(20),
      Shortcut::new("a", "assign work").with_priority(30),
      Shortcut::new("r", "refresh").with_priority(40),
      Shortcut::new("q", "back").with_priority(90),
    ]
  }
}
