use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use tracing::{info, warn};

/// How long a notification stays on screen
const TOAST_TTL: Duration = Duration::from_secs(4);
const MAX_VISIBLE: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastLevel {
  Success,
  Error,
}

#[derive(Debug, Clone)]
pub struct Toast {
  pub message: String,
  pub level: ToastLevel,
  created: Instant,
}

/// Transient notifications shared by every view.
///
/// Cloning hands out another handle to the same queue, so views can report
/// outcomes without going through the app.
#[derive(Debug, Clone, Default)]
pub struct Notifier {
  queue: Arc<Mutex<VecDeque<Toast>>>,
}

impl Notifier {
  pub fn new() -> Self {
    Self::default()
  }

  fn queue(&self) -> MutexGuard<'_, VecDeque<Toast>> {
    // A panic elsewhere can't leave a half-written toast behind
    self.queue.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
  }

  fn push(&self, level: ToastLevel, message: String) {
    let mut queue = self.queue();
    queue.push_back(Toast {
      message,
      level,
      created: Instant::now(),
    });
    while queue.len() > MAX_VISIBLE {
      queue.pop_front();
    }
  }

  pub fn success(&self, message: impl Into<String>) {
    let message = message.into();
    info!(%message, "notify");
    self.push(ToastLevel::Success, message);
  }

  pub fn error(&self, message: impl Into<String>) {
    let message = message.into();
    warn!(%message, "notify");
    self.push(ToastLevel::Error, message);
  }

  /// Drop notifications older than their time to live.
  pub fn expire(&self) {
    self.queue().retain(|t| t.created.elapsed() < TOAST_TTL);
  }

  pub fn visible(&self) -> Vec<Toast> {
    self.queue().iter().cloned().collect()
  }

  pub fn clear(&self) {
    self.queue().clear();
  }

  /// Stack the visible notifications in the bottom-right corner.
  pub fn render(&self, frame: &mut Frame, area: Rect) {
    let toasts = self.visible();
    let width = 48.min(area.width);
    let mut bottom = area.y + area.height;

    for toast in toasts.iter().rev() {
      let height = 3;
      if bottom < area.y + height {
        break;
      }
      bottom -= height;
      let toast_area = Rect::new(area.x + area.width - width, bottom, width, height);

      let (color, title) = match toast.level {
        ToastLevel::Success => (Color::Green, " Done "),
        ToastLevel::Error => (Color::Red, " Error "),
      };
      let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(color))
        .title(title);

      frame.render_widget(Clear, toast_area);
      frame.render_widget(
        Paragraph::new(toast.message.as_str())
          .block(block)
          .wrap(Wrap { trim: true }),
        toast_area,
      );
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_handles_share_the_queue() {
    let notifier = Notifier::new();
    let handle = notifier.clone();
    handle.success("Asset updated");
    handle.error("Assignee must be an active user");

    let visible = notifier.visible();
    assert_eq!(visible.len(), 2);
    assert_eq!(visible[0].level, ToastLevel::Success);
    assert_eq!(visible[1].message, "Assignee must be an active user");
  }

  #[test]
  fn test_only_latest_are_kept() {
    let notifier = Notifier::new();
    for i in 0..5 {
      notifier.success(format!("saved {}", i));
    }
    let messages: Vec<String> = notifier.visible().into_iter().map(|t| t.message).collect();
    assert_eq!(messages, vec!["saved 2", "saved 3", "saved 4"]);
  }

  #[test]
  fn test_fresh_toasts_survive_expiry() {
    let notifier = Notifier::new();
    notifier.success("Document uploaded");
    notifier.expire();
    assert_eq!(notifier.visible().len(), 1);
  }
}
