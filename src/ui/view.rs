use crossterm::event::KeyEvent;
use ratatui::prelude::*;

/// Key hint shown in the header, sorted by priority
#[derive(Debug, Clone)]
pub struct Shortcut {
  pub key: &'static str,
  pub label: &'static str,
  /// Lower is shown first
  pub priority: u8,
}

impl Shortcut {
  pub const fn new(key: &'static str, label: &'static str) -> Self {
    Self {
      key,
      label,
      priority: 100,
    }
  }

  pub const fn with_priority(mut self, priority: u8) -> Self {
    self.priority = priority;
    self
  }
}

/// Actions that a view can request in response to user input
pub enum ViewAction {
  /// No action needed
  None,
  /// Push a new view onto the stack
  Push(Box<dyn View>),
  /// Pop current view from stack (go back)
  Pop,
}

/// A screen on the app's view stack (asset list, work order list, ...).
///
/// Views own their overlays (search, forms, dialogs) and offer them keys
/// first; whatever the overlays leave is handled by the view, which returns
/// an action for the App to execute.
///
/// Views load data through `Query<T>` wired to the cache's invalidation
/// epoch and poll it in `tick()`, so a mutation made anywhere refreshes
/// every view showing the affected data.
pub trait View {
  /// Handle a key event, returning an action for App to execute
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction;

  /// Render the view to the frame
  fn render(&mut self, frame: &mut Frame, area: Rect);

  /// Get the breadcrumb label for this view
  fn breadcrumb_label(&self) -> String;

  /// Poll queries and mutations; called after every event
  fn tick(&mut self) {}

  /// True while an overlay (form, prompt, search) owns the keyboard, so
  /// the app must not intercept `:`.
  fn captures_input(&self) -> bool {
    false
  }

  /// True while a mutation issued by this view is in flight
  fn is_busy(&self) -> bool {
    false
  }

  /// Key hints for the header
  fn shortcuts(&self) -> Vec<Shortcut> {
    vec![
      Shortcut::new(":", "command").with_priority(10),
      Shortcut::new("/", "search").with_priority(20),
      Shortcut::new("q", "back").with_priority(90),
    ]
  }
}
