use crate::cmms::api_types::NewAsset;
use crate::cmms::transport::{HttpTransport, Transport};
use crate::cmms::types::{Asset, AssetStatus, DocumentOwner};
use crate::query::{Mutations, Query, QueryState};
use crate::ui::components::{FieldKind, Form, FormEvent, FormValues, KeyResult, SearchInput};
use crate::ui::context::ViewContext;
use crate::ui::renderfns::{
  asset_status_color, ensure_valid_selection, status_label, truncate, EMPTY,
};
use crate::ui::view::{Shortcut, View, ViewAction};
use crate::ui::views::{AssetDetailView, DocumentListView};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};

/// View listing every asset
pub struct AssetListView<T: Transport = HttpTransport> {
  ctx: ViewContext<T>,
  query: Query<Vec<Asset>>,
  list_state: ListState,
  search: SearchInput,
  form: Form,
  create: Mutations<(), Asset>,
}

fn new_asset_form() -> Form {
  let statuses = AssetStatus::ALL.iter().map(|s| s.as_str()).collect();
  Form::new("New asset")
    .field("assetNumber", "Asset number", FieldKind::Text)
    .required()
    .field("description", "Description", FieldKind::Text)
    .required()
    .field("status", "Status", FieldKind::Choice(statuses))
    .field("location", "Location", FieldKind::Text)
    .field("manufacturer", "Manufacturer", FieldKind::Text)
    .field("model", "Model", FieldKind::Text)
    .field("serialNumber", "Serial number", FieldKind::Text)
    .field("installDate", "Install date", FieldKind::Date)
    .field("replacementCost", "Replacement cost", FieldKind::Decimal)
    .field("parentId", "Parent asset id", FieldKind::Count)
}

/// Build the request body from a validated form.
fn new_asset_from(values: &FormValues) -> Option<NewAsset> {
  Some(NewAsset {
    asset_number: values.text("assetNumber")?,
    description: values.text("description")?,
    status: values
      .text("status")
      .and_then(|s| AssetStatus::from_wire(&s))
      .unwrap_or(AssetStatus::Operational),
    location: values.text("location"),
    manufacturer: values.text("manufacturer"),
    model: values.text("model"),
    serial_number: values.text("serialNumber"),
    install_date: values.date("installDate"),
    replacement_cost: values.decimal("replacementCost"),
    parent_id: values.count("parentId"),
  })
}

impl<T: Transport> AssetListView<T> {
  pub fn new(ctx: ViewContext<T>) -> Self {
    let client = ctx.client.clone();
    let mut query = Query::new(move || {
      let client = client.clone();
      async move { client.assets().await.map_err(|e| e.display_message()) }
    })
    .invalidated_by(ctx.client.cache().subscribe());

    // Start fetching immediately
    query.fetch();

    Self {
      ctx,
      query,
      list_state: ListState::default(),
      search: SearchInput::new(),
      form: new_asset_form(),
      create: Mutations::new(),
    }
  }

  fn filtered(&self) -> Vec<&Asset> {
    self
      .query
      .data()
      .map(|assets| {
        assets
          .iter()
          .filter(|a| {
            self.search.matches([
              a.asset_number.as_str(),
              a.description.as_str(),
              a.location.as_deref().unwrap_or(""),
            ])
          })
          .collect()
      })
      .unwrap_or_default()
  }

  fn selected(&self) -> Option<&Asset> {
    let idx = self.list_state.selected()?;
    self.filtered().get(idx).copied()
  }

  fn submit(&mut self) {
    let Ok(values) = self.form.validate() else {
      return;
    };
    let Some(body) = new_asset_from(&values) else {
      return;
    };
    self.form.set_submitting(true);
    let client = self.ctx.client.clone();
    self.create.run((), async move {
      client.create_asset(&body).await.map_err(|e| e.display_message())
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
      QueryState::Loading => format!(" Assets{} (loading...) ", filter),
      QueryState::Error(e) => format!(" Assets{} (error: {}) ", filter, e),
      _ => format!(" Assets{} ({}) ", filter, len),
    };

    let block = Block::default()
      .title(title)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    if len == 0 && !self.query.is_loading() {
      let content = if self.query.is_error() {
        "Failed to load assets. Press 'r' to retry."
      } else if !self.search.query().is_empty() {
        "No assets match the filter."
      } else {
        "No assets yet. Press 'n' to add one."
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
      .map(|asset| {
        ListItem::new(Line::from(vec![
          Span::styled(
            format!("{:<14}", truncate(&asset.asset_number, 14)),
            Style::default().fg(Color::Cyan),
          ),
          Span::raw(" "),
          Span::styled(
            format!("{:<22}", status_label(asset.status.as_str())),
            Style::default().fg(asset_status_color(asset.status)),
          ),
          Span::raw(" "),
          Span::raw(format!("{:<40}", truncate(&asset.description, 40))),
          Span::raw(" "),
          Span::styled(
            truncate(asset.location.as_deref().unwrap_or(EMPTY), 24),
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

impl<T: Transport> View for AssetListView<T> {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match self.form.handle_key(key) {
      KeyResult::Event(FormEvent::Submitted) => {
        self.submit();
        return ViewAction::None;
      }
      KeyResult::NotHandled => {}
      _ => return ViewAction::None,
    }

    if !matches!(self.search.handle_key(key), KeyResult::NotHandled) {
      self.list_state.select(Some(0));
      return ViewAction::None;
    }

    match key.code {
      KeyCode::Char('j') | KeyCode::Down => self.list_state.select_next(),
      KeyCode::Char('k') | KeyCode::Up => self.list_state.select_previous(),
      KeyCode::Char('r') => self.query.refetch(),
      KeyCode::Char('n') => {
        // Fresh form each time
        self.form = new_asset_form();
        self.form.show();
      }
      KeyCode::Char('d') => {
        if let Some(asset) = self.selected() {
          return ViewAction::Push(Box::new(DocumentListView::new(
            DocumentOwner::Asset(asset.id),
            asset.asset_number.clone(),
            self.ctx.clone(),
          )));
        }
      }
      KeyCode::Enter => {
        if let Some(asset) = self.selected() {
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
    self.form.render_overlay(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    "Assets".to_string()
  }

  fn tick(&mut self) {
    if self.query.poll() {
      let len = self.filtered().len();
      ensure_valid_selection(&mut self.list_state, len);
    }
    for ((), result) in self.create.poll() {
      match result {
        Ok(asset) => {
          self.form.hide();
          self
            .ctx
            .notifier
            .success(format!("Asset {} created", asset.asset_number));
        }
        Err(e) => {
          // Keep the typed values so the user can fix and resubmit
          self.form.set_submitting(false);
          self.ctx.notifier.error(e);
        }
      }
    }
  }

  fn captures_input(&self) -> bool {
    self.form.is_active() || self.search.is_active()
  }

  fn is_busy(&self) -> bool {
    self.create.is_pending()
  }

  fn shortcuts(&self) -> Vec<Shortcut> {
    vec![
      Shortcut::new(":", "command").with_priority(10),
      Shortcut::new("/", "search").with_priority(20),
      Shortcut::new("enter", "details").with_priority(30),
      Shortcut::new("n", "new").with_priority(40),
      Shortcut::new("d", "documents").with_priority(50),
      Shortcut::new("r", "refresh").with_priority(60),
      Shortcut::new("q", "back").with_priority(90),
    ]
  }
}
