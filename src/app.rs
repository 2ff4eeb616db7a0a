use crate::auth::{AuthGate, AuthState};
use crate::cmms::cached_client::CachedCmmsClient;
use crate::cmms::error::ApiError;
use crate::cmms::transport::{HttpTransport, Transport};
use crate::cmms::types::User;
use crate::commands::CommandKind;
use crate::config::Config;
use crate::event::{Event, EventHandler};
use crate::query::Mutations;
use crate::ui;
use crate::ui::components::{CommandEvent, CommandInput, KeyResult, Notifier};
use crate::ui::context::ViewContext;
use crate::ui::view::{View, ViewAction};
use crate::ui::views::{
  AssetListView, InventoryListView, LoginAction, LoginScreen, ResourceListView, WorkOrderListView,
};
use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{
  disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use futures::FutureExt;
use ratatui::prelude::*;
use std::io::stdout;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, warn};

const SESSION_EXPIRED: &str = "Your session has expired. Please sign in again.";

/// Main application state
pub struct App<T: Transport = HttpTransport> {
  /// Navigation stack - root is always at index 0
  view_stack: Vec<Box<dyn View>>,

  /// Command input (the `:` prompt)
  command_input: CommandInput,

  /// Which of login screen or application is shown
  gate: AuthGate,

  /// Startup `GET /api/auth/me`
  probe: Option<JoinHandle<Result<User, ApiError>>>,

  login: LoginScreen<T>,

  logout: Mutations<(), ()>,

  /// Handed to every view
  ctx: ViewContext<T>,

  /// Application configuration
  config: Config,

  /// Whether to quit
  should_quit: bool,
}

impl App<HttpTransport> {
  pub fn new(config: Config) -> Result<Self> {
    let client = CachedCmmsClient::new(&config)?;
    Ok(Self::with_client(client, config))
  }
}

impl<T: Transport> App<T> {
  /// Build the app around an existing client and start probing the session.
  pub fn with_client(client: CachedCmmsClient<T>, config: Config) -> Self {
    let ctx = ViewContext::new(client.clone(), Notifier::new(), config.downloads.resolve_dir());
    let login = LoginScreen::new(client.clone(), Config::env_credentials());
    let probe = tokio::spawn(async move { client.me().await });

    Self {
      view_stack: Vec::new(),
      command_input: CommandInput::new(),
      gate: AuthGate::new(),
      probe: Some(probe),
      login,
      logout: Mutations::new(),
      ctx,
      config,
      should_quit: false,
    }
  }

  pub async fn run(&mut self) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let mut events = EventHandler::new(Duration::from_millis(250));

    // Main loop
    while !self.should_quit {
      terminal.draw(|frame| ui::draw(frame, self))?;

      match events.next().await {
        Some(Event::Key(key)) => self.handle_key(key),
        Some(Event::Tick) => {}
        None => break,
      }
      // Poll after every event so results show up while typing too
      self.tick();
    }

    // Cleanup terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    Ok(())
  }

  fn root_view(&self, kind: CommandKind) -> Option<Box<dyn View>> {
    let ctx = self.ctx.clone();
    let view: Box<dyn View> = match kind {
      CommandKind::Assets => Box::new(AssetListView::new(ctx)),
      CommandKind::WorkOrders => Box::new(WorkOrderListView::new(ctx)),
      CommandKind::Resources => Box::new(ResourceListView::new(ctx)),
      CommandKind::Inventory => Box::new(InventoryListView::new(ctx)),
      CommandKind::Logout | CommandKind::Quit => return None,
    };
    Some(view)
  }

  /// Replace the whole stack with a root view.
  fn show_root(&mut self, kind: CommandKind) {
    if let Some(view) = self.root_view(kind) {
      self.view_stack = vec![view];
    }
  }

  fn enter_app(&mut self, user: User) {
    // A 401 from before this session must not end it
    self.ctx.client.session_signal().take();
    self.gate.logged_in(user);
    self.show_root(CommandKind::Assets);
  }

  /// Back to the login screen with nothing of the old session left.
  fn leave_app(&mut self, notice: Option<&str>) {
    self.view_stack.clear();
    self.command_input = CommandInput::new();
    self.ctx.client.clear_cache();
    self.login.reset(notice);
  }

  pub fn handle_key(&mut self, key: KeyEvent) {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
      self.should_quit = true;
      return;
    }

    if self.gate.is_authenticated() {
      self.handle_app_key(key);
      return;
    }

    match self.gate.state() {
      AuthState::Checking => {
        if matches!(key.code, KeyCode::Char('q') | KeyCode::Esc) {
          self.should_quit = true;
        }
      }
      AuthState::Unauthenticated => {
        if self.login.handle_key(key) == LoginAction::Quit {
          self.should_quit = true;
        }
      }
      AuthState::Authenticated(_) => {}
    }
  }

  fn handle_app_key(&mut self, key: KeyEvent) {
    // The `:` prompt only opens when the view isn't taking text
    let view_captures = self
      .view_stack
      .last()
      .is_some_and(|view| view.captures_input());
    if self.command_input.is_active() || !view_captures {
      match self.command_input.handle_key(key) {
        KeyResult::Event(CommandEvent::Run(kind)) => {
          self.execute(kind);
          return;
        }
        KeyResult::Event(CommandEvent::Unknown(name)) => {
          if !name.is_empty() {
            self.ctx.notifier.error(format!("Unknown command: {}", name));
          }
          return;
        }
        KeyResult::Event(CommandEvent::Cancelled) | KeyResult::Handled => return,
        KeyResult::NotHandled => {}
      }
    }

    let Some(view) = self.view_stack.last_mut() else {
      return;
    };
    match view.handle_key(key) {
      ViewAction::None => {}
      ViewAction::Push(view) => self.view_stack.push(view),
      ViewAction::Pop => {
        if self.view_stack.len() > 1 {
          self.view_stack.pop();
        } else {
          self.should_quit = true;
        }
      }
    }
  }

  fn execute(&mut self, kind: CommandKind) {
    info!(?kind, "command");
    match kind {
      CommandKind::Quit => self.should_quit = true,
      CommandKind::Logout => {
        if self.logout.is_pending() {
          return;
        }
        let client = self.ctx.client.clone();
        self.logout.run((), async move {
          client.logout().await.map_err(|e| e.display_message())
        });
      }
      _ => self.show_root(kind),
    }
  }

  pub fn tick(&mut self) {
    self.ctx.notifier.expire();

    if let Some(result) = self.probe.as_mut().and_then(|handle| handle.now_or_never()) {
      self.probe = None;
      let result = result.unwrap_or_else(|e| Err(ApiError::Transport(e.to_string())));
      self.ctx.client.session_signal().take();
      self.gate.probe_finished(result);
      if let Some(user) = self.gate.user().cloned() {
        self.enter_app(user);
      }
    }

    if let Some(user) = self.login.tick() {
      self.enter_app(user);
    }

    for ((), result) in self.logout.poll() {
      if let Err(e) = result {
        // The server may already consider the session gone
        warn!(error = %e, "logout request failed");
      }
      self.gate.logged_out();
      self.leave_app(None);
    }

    if self.ctx.client.session_signal().take() && self.gate.session_rejected() {
      self.leave_app(Some(SESSION_EXPIRED));
      return;
    }

    for view in &mut self.view_stack {
      view.tick();
    }
  }

  // Accessors for UI rendering

  pub fn auth_state(&self) -> &AuthState {
    self.gate.state()
  }

  pub fn login_screen(&self) -> &LoginScreen<T> {
    &self.login
  }

  pub fn current_view_mut(&mut self) -> Option<&mut Box<dyn View>> {
    self.view_stack.last_mut()
  }

  pub fn command_input(&self) -> &CommandInput {
    &self.command_input
  }

  pub fn notifier(&self) -> &Notifier {
    &self.ctx.notifier
  }

  pub fn base_url(&self) -> &str {
    &self.config.api.base_url
  }

  /// Header title: configured title, else the API host
  pub fn title(&self) -> Option<&str> {
    self.config.title.as_deref()
  }

  pub fn user_name(&self) -> Option<&str> {
    self.gate.user().map(|u| u.full_name.as_str())
  }

  pub fn is_busy(&self) -> bool {
    self.login.is_busy()
      || self.logout.is_pending()
      || self.view_stack.iter().any(|view| view.is_busy())
  }

  pub fn view_breadcrumb(&self) -> Vec<String> {
    self
      .view_stack
      .iter()
      .map(|v| v.breadcrumb_label())
      .collect()
  }
}
