use crate::cmms::cached_client::CachedCmmsClient;
use crate::cmms::transport::{HttpTransport, Transport};
use crate::cmms::types::User;
use crate::config::Credentials;
use crate::query::Mutations;
use crate::ui::components::{FieldKind, Form, FormEvent, KeyResult};
use crossterm::event::KeyEvent;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

/// What the app should do after a key on the login screen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginAction {
  None,
  Quit,
}

fn login_form(prefill: &Credentials) -> Form {
  let mut form = Form::new("Sign in")
    .field("username", "Username", FieldKind::Text)
    .required()
    .field("password", "Password", FieldKind::Password)
    .required();
  form.set_value("username", &prefill.username);
  form.set_value("password", &prefill.password);
  form.show();
  form
}

/// Full-screen login shown whenever there is no session.
///
/// Not a `View`: it replaces the whole view stack rather than sitting on it.
pub struct LoginScreen<T: Transport = HttpTransport> {
  client: CachedCmmsClient<T>,
  prefill: Credentials,
  form: Form,
  attempt: Mutations<(), User>,
  message: Option<(String, Color)>,
}

impl<T: Transport> LoginScreen<T> {
  pub fn new(client: CachedCmmsClient<T>, prefill: Credentials) -> Self {
    Self {
      client,
      form: login_form(&prefill),
      prefill,
      attempt: Mutations::new(),
      message: None,
    }
  }

  /// Start over, e.g. after logout. The password is not kept.
  pub fn reset(&mut self, notice: Option<&str>) {
    let prefill = Credentials {
      username: self.prefill.username.clone(),
      password: String::new(),
    };
    self.form = login_form(&prefill);
    self.message = notice.map(|n| (n.to_string(), Color::Yellow));
  }

  pub fn is_busy(&self) -> bool {
    self.attempt.is_pending()
  }

  fn submit(&mut self) {
    let Ok(values) = self.form.validate() else {
      return;
    };
    let username = values.text("username").unwrap_or_default();
    let password = values.text("password").unwrap_or_default();
    self.form.set_submitting(true);
    self.message = None;
    let client = self.client.clone();
    self.attempt.run((), async move {
      client
        .login(&username, &password)
        .await
        .map_err(|e| e.display_message())
    });
  }

  pub fn handle_key(&mut self, key: KeyEvent) -> LoginAction {
    match self.form.handle_key(key) {
      KeyResult::Event(FormEvent::Submitted) => self.submit(),
      KeyResult::Event(FormEvent::Cancelled) => return LoginAction::Quit,
      _ => {}
    }
    LoginAction::None
  }

  /// Returns the signed-in user once a login attempt succeeds.
  pub fn tick(&mut self) -> Option<User> {
    let mut user = None;
    for ((), result) in self.attempt.poll() {
      match result {
        Ok(u) => user = Some(u),
        Err(e) => {
          self.form.set_submitting(false);
          self.message = Some((e, Color::Red));
        }
      }
    }
    user
  }

  pub fn render(&self, frame: &mut Frame, area: Rect, base_url: &str) {
    let width = 60.min(area.width.saturating_sub(4));
    let height = 12.min(area.height);
    let x = area.x + area.width.saturating_sub(width) / 2;
    let y = area.y + area.height.saturating_sub(height) / 2;
    let box_area = Rect::new(x, y, width, height);

    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([
        Constraint::Length(2), // Server
        Constraint::Min(6),    // Form
        Constraint::Length(2), // Message
      ])
      .split(box_area);

    frame.render_widget(Clear, box_area);
    frame.render_widget(
      Paragraph::new(Line::from(vec![
        Span::styled("Server ", Style::default().fg(Color::DarkGray)),
        Span::raw(base_url.to_string()),
      ]))
      .alignment(Alignment::Center),
      chunks[0],
    );

    let block = Block::default()
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue))
      .title(" m9s: sign in ")
      .title_alignment(Alignment::Center);
    self.form.render(frame, chunks[1], block);

    if let Some((message, color)) = &self.message {
      frame.render_widget(
        Paragraph::new(message.as_str())
          .style(Style::default().fg(*color))
          .alignment(Alignment::Center),
        chunks[2],
      );
    }
  }
}
