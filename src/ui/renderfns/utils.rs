use ratatui::prelude::Color;
use ratatui::widgets::ListState;

use crate::cmms::types::{AssetStatus, WorkOrderStatus};

/// Truncate a string to a maximum number of characters, adding "..." if truncated
pub fn truncate(s: &str, max_len: usize) -> String {
  if s.chars().count() <= max_len {
    s.to_string()
  } else {
    let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", kept)
  }
}

pub fn asset_status_color(status: AssetStatus) -> Color {
  match status {
    AssetStatus::Operational => Color::Green,
    AssetStatus::MaintenanceRequired => Color::Yellow,
    AssetStatus::NonOperational => Color::Red,
    AssetStatus::Retired => Color::DarkGray,
  }
}

pub fn work_order_status_color(status: WorkOrderStatus) -> Color {
  match status {
    WorkOrderStatus::Completed => Color::Green,
    WorkOrderStatus::InProgress | WorkOrderStatus::Scheduled => Color::Yellow,
    WorkOrderStatus::OnHold => Color::Magenta,
    WorkOrderStatus::Cancelled => Color::DarkGray,
    WorkOrderStatus::Requested | WorkOrderStatus::Approved => Color::White,
  }
}

/// Keep a list selection inside `0..len`, selecting the first row when
/// there is one and nothing is selected.
pub fn ensure_valid_selection(state: &mut ListState, len: usize) {
  match state.selected() {
    _ if len == 0 => state.select(None),
    Some(idx) if idx >= len => state.select(Some(len - 1)),
    None => state.select(Some(0)),
    Some(_) => {}
  }
}
