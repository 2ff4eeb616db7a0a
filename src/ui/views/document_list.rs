use std::path::{Path, PathBuf};

use crate::cmms::transport::{FileUpload, HttpTransport, Transport};
use crate::cmms::types::{Document, DocumentOwner};
use crate::query::{Mutations, Query, QueryState};
use crate::ui::components::{ConfirmDialog, ConfirmEvent, KeyResult, Prompt, PromptEvent};
use crate::ui::context::ViewContext;
use crate::ui::renderfns::{ensure_valid_selection, format_file_size, format_optional_date, truncate, EMPTY};
use crate::ui::view::{Shortcut, View, ViewAction};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};
use tracing::info;

/// Finished file operation
enum FileOutcome {
  Uploaded(Document),
  Downloaded(PathBuf),
  Deleted(String),
}

/// Documents attached to one asset or work order
pub struct DocumentListView<T: Transport = HttpTransport> {
  owner: DocumentOwner,
  label: String,
  ctx: ViewContext<T>,
  query: Query<Vec<Document>>,
  list_state: ListState,
  upload_prompt: Prompt,
  confirm: ConfirmDialog,
  /// Document the open confirmation is about
  to_delete: Option<Document>,
  operations: Mutations<String, FileOutcome>,
}

/// Read a local file into an upload, guessing its content type from the
/// extension.
async fn read_upload(path: &Path) -> Result<FileUpload, String> {
  let bytes = tokio::fs::read(path)
    .await
    .map_err(|e| format!("Could not read {}: {}", path.display(), e))?;
  let file_name = path
    .file_name()
    .map(|n| n.to_string_lossy().into_owned())
    .ok_or_else(|| format!("{} is not a file", path.display()))?;
  let content_type = mime_guess::from_path(path)
    .first_or_octet_stream()
    .essence_str()
    .to_string();
  Ok(FileUpload {
    file_name,
    content_type,
    bytes,
  })
}

/// Where a download lands. Only the final path component of the server's
/// filename is used.
fn download_target(dir: &Path, document: &Document) -> PathBuf {
  let name = Path::new(&document.filename)
    .file_name()
    .map(|n| n.to_string_lossy().into_owned())
    .unwrap_or_else(|| format!("document-{}", document.id));
  dir.join(name)
}

impl<T: Transport> DocumentListView<T> {
  pub fn new(owner: DocumentOwner, label: String, ctx: ViewContext<T>) -> Self {
    let client = ctx.client.clone();
    let mut query = Query::new(move || {
      let client = client.clone();
      async move { client.documents(owner).await.map_err(|e| e.display_message()) }
    })
    .invalidated_by(ctx.client.cache().subscribe());

    query.fetch();

    Self {
      owner,
      label,
      ctx,
      query,
      list_state: ListState::default(),
      upload_prompt: Prompt::new(),
      confirm: ConfirmDialog::new(),
      to_delete: None,
      operations: Mutations::new(),
    }
  }

  fn documents(&self) -> &[Document] {
    self.query.data().map(|d| d.as_slice()).unwrap_or_default()
  }

  fn selected(&self) -> Option<&Document> {
    self.documents().get(self.list_state.selected()?)
  }

  fn upload(&mut self, path: String) {
    let path = PathBuf::from(path.trim());
    if !path.is_file() {
      self
        .upload_prompt
        .reject(&path.to_string_lossy(), "No such file");
      return;
    }

    let client = self.ctx.client.clone();
    let owner = self.owner;
    let key = path.to_string_lossy().into_owned();
    self.operations.run(key, async move {
      let upload = read_upload(&path).await?;
      client
        .upload_document(owner, upload)
        .await
        .map(FileOutcome::Uploaded)
        .map_err(|e| e.display_message())
    });
  }

  fn download(&mut self) {
    let Some(document) = self.selected().cloned() else {
      return;
    };
    let client = self.ctx.client.clone();
    let dir = self.ctx.downloads_dir.clone();
    self.operations.run(document.filename.clone(), async move {
      let bytes = client
        .download_document(&document)
        .await
        .map_err(|e| e.display_message())?;
      tokio::fs::create_dir_all(&dir)
        .await
        .map_err(|e| format!("Could not create {}: {}", dir.display(), e))?;
      let target = download_target(&dir, &document);
      tokio::fs::write(&target, bytes)
        .await
        .map_err(|e| format!("Could not write {}: {}", target.display(), e))?;
      info!(path = %target.display(), "document downloaded");
      Ok(FileOutcome::Downloaded(target))
    });
  }

  fn delete(&mut self, document: Document) {
    let client = self.ctx.client.clone();
    self.operations.run(document.filename.clone(), async move {
      client
        .delete_document(&document)
        .await
        .map(|()| FileOutcome::Deleted(document.filename))
        .map_err(|e| e.display_message())
    });
  }

  fn render_list(&mut self, frame: &mut Frame, area: Rect) {
    let len = self.documents().len();
    ensure_valid_selection(&mut self.list_state, len);

    let title = match self.query.state() {
      QueryState::Loading => format!(" Documents: {} (loading...) ", self.label),
      QueryState::Error(e) => format!(" Documents: {} (error: {}) ", self.label, e),
      _ => format!(" Documents: {} ({}) ", self.label, len),
    };

    let block = Block::default()
      .title(title)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    if len == 0 && !self.query.is_loading() {
      let content = if self.query.is_error() {
        "Failed to load documents. Press 'r' to retry."
      } else {
        "No documents attached. Press 'u' to upload one."
      };
      let paragraph = Paragraph::new(content)
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
      return;
    }

    let items: Vec<ListItem> = self
      .documents()
      .iter()
      .map(|doc| {
        ListItem::new(Line::from(vec![
          Span::raw(format!("{:<40}", truncate(&doc.filename, 40))),
          Span::raw(" "),
          Span::styled(
            format!("{:>10}", format_file_size(doc.size)),
            Style::default().fg(Color::Cyan),
          ),
          Span::raw("  "),
          Span::styled(
            format!("{:<13}", format_optional_date(doc.uploaded_on)),
            Style::default().fg(Color::DarkGray),
          ),
          Span::styled(
            doc.content_type.clone().unwrap_or_else(|| EMPTY.to_string()),
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

impl<T: Transport> View for DocumentListView<T> {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match self.confirm.handle_key(key) {
      KeyResult::Event(ConfirmEvent::Confirmed) => {
        if let Some(document) = self.to_delete.take() {
          self.delete(document);
        }
        return ViewAction::None;
      }
      KeyResult::Event(ConfirmEvent::Cancelled) => {
        self.to_delete = None;
        return ViewAction::None;
      }
      KeyResult::Handled => return ViewAction::None,
      KeyResult::NotHandled => {}
    }

    match self.upload_prompt.handle_key(key) {
      KeyResult::Event(PromptEvent::Submitted(path)) => {
        self.upload(path);
        return ViewAction::None;
      }
      KeyResult::NotHandled => {}
      _ => return ViewAction::None,
    }

    match key.code {
      KeyCode::Char('j') | KeyCode::Down => self.list_state.select_next(),
      KeyCode::Char('k') | KeyCode::Up => self.list_state.select_previous(),
      KeyCode::Char('r') => self.query.refetch(),
      KeyCode::Char('u') => self.upload_prompt.show("Upload file (path)", ""),
      KeyCode::Char('o') | KeyCode::Enter => self.download(),
      KeyCode::Char('x') => {
        if let Some(document) = self.selected().cloned() {
          self.confirm.show(format!("Delete {}?", document.filename));
          self.to_delete = Some(document);
        }
      }
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    self.render_list(frame, area);
    self.upload_prompt.render_overlay(frame, area);
    self.confirm.render_overlay(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    format!("{} documents", self.label)
  }

  fn tick(&mut self) {
    if self.query.poll() {
      let len = self.documents().len();
      ensure_valid_selection(&mut self.list_state, len);
    }
    for (name, result) in self.operations.poll() {
      match result {
        Ok(FileOutcome::Uploaded(document)) => {
          self
            .ctx
            .notifier
            .success(format!("Uploaded {}", document.filename));
        }
        Ok(FileOutcome::Downloaded(path)) => {
          self
            .ctx
            .notifier
            .success(format!("Saved to {}", path.display()));
        }
        Ok(FileOutcome::Deleted(filename)) => {
          self.ctx.notifier.success(format!("Deleted {}", filename));
        }
        Err(e) => self.ctx.notifier.error(format!("{}: {}", name, e)),
      }
    }
  }

  fn captures_input(&self) -> bool {
    self.upload_prompt.is_active() || self.confirm.is_active()
  }

  fn is_busy(&self) -> bool {
    self.operations.is_pending()
  }

  fn shortcuts(&self) -> Vec<Shortcut> {
    vec![
      Shortcut::new(":", "command").with_priority(10),
      Shortcut::new("u", "upload").with_priority(20),
      Shortcut::new("o", "download").with_priority(30),
      Shortcut::new("x", "delete").with_priority(40),
      Shortcut::new("r", "refresh").with_priority(50),
      Shortcut::new("q", "back").with_priority(90),
    ]
  }
}
