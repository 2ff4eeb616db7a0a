pub mod components;
pub mod context;
pub mod renderfns;
pub mod view;
pub mod views;

use crate::app::App;
use crate::auth::AuthState;
use crate::cmms::transport::Transport;
use ratatui::prelude::*;
use ratatui::widgets::Paragraph;
use renderfns::{draw_footer, draw_header};

/// Main draw function
pub fn draw<T: Transport>(frame: &mut Frame, app: &mut App<T>) {
  let chunks = Layout::default()
    .direction(Direction::Vertical)
    .constraints([
      Constraint::Length(1), // Header
      Constraint::Min(1),    // Main content
      Constraint::Length(1), // Footer
    ])
    .split(frame.area());

  let shortcuts = app
    .current_view_mut()
    .map(|view| view.shortcuts())
    .unwrap_or_default();
  let title = app.title().unwrap_or(app.base_url());
  draw_header(frame, chunks[0], title, app.user_name(), &shortcuts);

  if app.user_name().is_some() {
    if let Some(view) = app.current_view_mut() {
      view.render(frame, chunks[1]);
    }
  } else if app.auth_state() == &AuthState::Checking {
    let paragraph = Paragraph::new("Checking session...")
      .alignment(Alignment::Center)
      .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(paragraph, chunks[1]);
  } else {
    app.login_screen().render(frame, chunks[1], app.base_url());
  }

  let breadcrumb = app.view_breadcrumb();
  draw_footer(frame, chunks[2], &breadcrumb, app.is_busy());

  // App-level overlays on top of whatever the view drew
  app.command_input().render_overlay(frame, chunks[1]);
  app.notifier().render(frame, chunks[1]);
}
