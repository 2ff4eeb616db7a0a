//! Multi-field form with validation before submission.

use std::collections::HashMap;
use std::str::FromStr;

use chrono::NaiveDate;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph};
use rust_decimal::Decimal;

use super::input::{InputResult, TextInput};
use super::KeyResult;

/// Why a field value was refused. Shown next to the field, never sent.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
  #[error("{0} is required")]
  Required(&'static str),
  #[error("{0} must be a whole number")]
  NotInteger(&'static str),
  #[error("{0} must be zero or more")]
  Negative(&'static str),
  #[error("{0} must be an amount like 1250.00")]
  NotDecimal(&'static str),
  #[error("{0} must be a date like 2024-01-05")]
  NotDate(&'static str),
}

/// What a field accepts
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
  Text,
  Password,
  /// Non-negative whole number
  Count,
  Decimal,
  Date,
  /// One of a fixed set of wire values, cycled with left/right
  Choice(Vec<&'static str>),
}

/// A validated field value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
  Empty,
  Text(String),
  Count(u64),
  Decimal(Decimal),
  Date(NaiveDate),
}

#[derive(Debug, Clone)]
struct Field {
  name: &'static str,
  label: &'static str,
  kind: FieldKind,
  required: bool,
  input: TextInput,
  choice: usize,
  error: Option<ValidationError>,
}

impl Field {
  fn raw(&self) -> &str {
    match &self.kind {
      FieldKind::Choice(options) => options.get(self.choice).copied().unwrap_or(""),
      _ => self.input.value().trim(),
    }
  }

  fn validate(&self) -> Result<FieldValue, ValidationError> {
    let raw = self.raw();
    if raw.is_empty() {
      return if self.required {
        Err(ValidationError::Required(self.label))
      } else {
        Ok(FieldValue::Empty)
      };
    }

    match &self.kind {
      FieldKind::Text | FieldKind::Password | FieldKind::Choice(_) => {
        Ok(FieldValue::Text(raw.to_string()))
      }
      FieldKind::Count => match raw.parse::<i64>() {
        Ok(n) if n < 0 => Err(ValidationError::Negative(self.label)),
        Ok(n) => Ok(FieldValue::Count(n.unsigned_abs())),
        Err(_) => Err(ValidationError::NotInteger(self.label)),
      },
      FieldKind::Decimal => Decimal::from_str(&raw.replace(',', ""))
        .map(FieldValue::Decimal)
        .map_err(|_| ValidationError::NotDecimal(self.label)),
      FieldKind::Date => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map(FieldValue::Date)
        .map_err(|_| ValidationError::NotDate(self.label)),
    }
  }
}

/// Values of a form that passed validation, looked up by field name.
#[derive(Debug, Clone, Default)]
pub struct FormValues(HashMap<&'static str, FieldValue>);

impl FormValues {
  pub fn text(&self, name: &str) -> Option<String> {
    match self.0.get(name) {
      Some(FieldValue::Text(s)) => Some(s.clone()),
      _ => None,
    }
  }

  pub fn count(&self, name: &str) -> Option<u64> {
    match self.0.get(name) {
      Some(FieldValue::Count(n)) => Some(*n),
      _ => None,
    }
  }

  pub fn decimal(&self, name: &str) -> Option<Decimal> {
    match self.0.get(name) {
      Some(FieldValue::Decimal(d)) => Some(*d),
      _ => None,
    }
  }

  pub fn date(&self, name: &str) -> Option<NaiveDate> {
    match self.0.get(name) {
      Some(FieldValue::Date(d)) => Some(*d),
      _ => None,
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FormEvent {
  Submitted,
  Cancelled,
}

/// Modal form. Tab/Shift-Tab (or up/down) move between fields, Enter
/// validates every field and only reports `Submitted` when all pass.
#[derive(Debug, Clone, Default)]
pub struct Form {
  title: String,
  fields: Vec<Field>,
  focus: usize,
  active: bool,
  submitting: bool,
}

impl Form {
  pub fn new(title: impl Into<String>) -> Self {
    Self {
      title: title.into(),
      ..Self::default()
    }
  }

  pub fn field(mut self, name: &'static str, label: &'static str, kind: FieldKind) -> Self {
    let input = if kind == FieldKind::Password {
      TextInput::masked()
    } else {
      TextInput::new()
    };
    self.fields.push(Field {
      name,
      label,
      kind,
      required: false,
      input,
      choice: 0,
      error: None,
    });
    self
  }

  /// Mark the most recently added field as required.
  pub fn required(mut self) -> Self {
    if let Some(field) = self.fields.last_mut() {
      field.required = true;
    }
    self
  }

  pub fn set_value(&mut self, name: &str, value: &str) {
    if let Some(field) = self.fields.iter_mut().find(|f| f.name == name) {
      match &field.kind {
        FieldKind::Choice(options) => {
          field.choice = options.iter().position(|o| *o == value).unwrap_or(0);
        }
        _ => field.input.set_value(value),
      }
    }
  }

  pub fn is_active(&self) -> bool {
    self.active
  }

  pub fn show(&mut self) {
    self.active = true;
    self.submitting = false;
    self.focus = 0;
    for field in &mut self.fields {
      field.error = None;
    }
  }

  pub fn hide(&mut self) {
    self.active = false;
    self.submitting = false;
  }

  /// Keep the form open but locked while the mutation is in flight.
  pub fn set_submitting(&mut self, submitting: bool) {
    self.submitting = submitting;
  }

  pub fn is_submitting(&self) -> bool {
    self.submitting
  }

  /// Validate every field, recording errors inline.
  pub fn validate(&mut self) -> Result<FormValues, Vec<ValidationError>> {
    let mut values = HashMap::new();
    let mut errors = Vec::new();
    for field in &mut self.fields {
      match field.validate() {
        Ok(value) => {
          field.error = None;
          values.insert(field.name, value);
        }
        Err(e) => {
          field.error = Some(e.clone());
          errors.push(e);
        }
      }
    }
    if errors.is_empty() {
      Ok(FormValues(values))
    } else {
      if let Some(idx) = self.fields.iter().position(|f| f.error.is_some()) {
        self.focus = idx;
      }
      Err(errors)
    }
  }

  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult<FormEvent> {
    if !self.active {
      return KeyResult::NotHandled;
    }
    if self.submitting {
      return KeyResult::Handled;
    }

    let len = self.fields.len().max(1);
    match key.code {
      KeyCode::Esc => {
        self.hide();
        return KeyResult::Event(FormEvent::Cancelled);
      }
      KeyCode::Tab | KeyCode::Down => {
        self.focus = (self.focus + 1) % len;
        return KeyResult::Handled;
      }
      KeyCode::BackTab | KeyCode::Up => {
        self.focus = self.focus.checked_sub(1).unwrap_or(len - 1);
        return KeyResult::Handled;
      }
      KeyCode::Enter => {
        return match self.validate() {
          Ok(_) => KeyResult::Event(FormEvent::Submitted),
          Err(_) => KeyResult::Handled,
        };
      }
      _ => {}
    }

    let Some(field) = self.fields.get_mut(self.focus) else {
      return KeyResult::Handled;
    };

    if let FieldKind::Choice(options) = &field.kind {
      let n = options.len().max(1);
      match key.code {
        KeyCode::Right | KeyCode::Char(' ') | KeyCode::Char('l') => field.choice = (field.choice + 1) % n,
        KeyCode::Left | KeyCode::Char('h') => field.choice = field.choice.checked_sub(1).unwrap_or(n - 1),
        _ => {}
      }
      field.error = None;
      return KeyResult::Handled;
    }

    // Ctrl-S submits from anywhere, like Enter
    if key.code == KeyCode::Char('s') && key.modifiers.contains(KeyModifiers::CONTROL) {
      return match self.validate() {
        Ok(_) => KeyResult::Event(FormEvent::Submitted),
        Err(_) => KeyResult::Handled,
      };
    }

    if let InputResult::Consumed = field.input.handle_key(key) {
      field.error = None;
    }
    KeyResult::Handled
  }

  /// Render the form as an overlay if active
  pub fn render_overlay(&self, frame: &mut Frame, area: Rect) {
    if !self.active {
      return;
    }
    let block = Block::default()
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Yellow))
      .title(format!(" {} ", self.title));
    let width = 64.min(area.width.saturating_sub(4));
    let height = (self.fields.len() as u16 * 2 + 4).min(area.height);
    let x = area.x + area.width.saturating_sub(width) / 2;
    let y = area.y + area.height.saturating_sub(height) / 2;
    let overlay_area = Rect::new(x, y, width, height);

    frame.render_widget(Clear, overlay_area);
    self.render(frame, overlay_area, block);
  }

  /// Render the form into `area` inside `block`.
  pub fn render(&self, frame: &mut Frame, area: Rect, block: Block) {
    let label_width = self
      .fields
      .iter()
      .map(|f| f.label.len() + usize::from(f.required))
      .max()
      .unwrap_or(0)
      + 2;

    let mut lines = Vec::new();
    for (idx, field) in self.fields.iter().enumerate() {
      let focused = idx == self.focus && !self.submitting;
      let marker = if field.required { "*" } else { "" };
      let label_style = if focused {
        Style::default().fg(Color::Cyan).bold()
      } else {
        Style::default().fg(Color::DarkGray)
      };

      let value = match &field.kind {
        FieldKind::Choice(_) => format!("< {} >", crate::ui::renderfns::status_label(field.raw())),
        _ => field.input.display(),
      };

      let mut spans = vec![
        Span::styled(
          format!("{:<width$}", format!("{}{}", field.label, marker), width = label_width),
          label_style,
        ),
        Span::raw(value),
      ];
      if focused && !matches!(field.kind, FieldKind::Choice(_)) {
        spans.push(Span::styled("_", Style::default().fg(Color::Yellow)));
      }
      lines.push(Line::from(spans));

      match &field.error {
        Some(error) => lines.push(Line::styled(
          format!("{:<width$}{}", "", error, width = label_width),
          Style::default().fg(Color::Red),
        )),
        None => lines.push(Line::raw("")),
      }
    }

    let hint = if self.submitting {
      Line::styled("Saving...", Style::default().fg(Color::Yellow))
    } else {
      Line::from(vec![
        Span::styled("<enter>", Style::default().fg(Color::Cyan)),
        Span::styled(" save   ", Style::default().fg(Color::DarkGray)),
        Span::styled("<tab>", Style::default().fg(Color::Cyan)),
        Span::styled(" next field   ", Style::default().fg(Color::DarkGray)),
        Span::styled("<esc>", Style::default().fg(Color::Cyan)),
        Span::styled(" cancel", Style::default().fg(Color::DarkGray)),
      ])
    };
    lines.push(hint);

    frame.render_widget(Paragraph::new(lines).block(block), area);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  fn type_str(form: &mut Form, s: &str) {
    for c in s.chars() {
      form.handle_key(key(KeyCode::Char(c)));
    }
  }

  fn asset_form() -> Form {
    let mut form = Form::new("New asset")
      .field("assetNumber", "Asset number", FieldKind::Text)
      .required()
      .field("status", "Status", FieldKind::Choice(vec!["operational", "retired"]))
      .field("replacementCost", "Replacement cost", FieldKind::Decimal)
      .field("installDate", "Install date", FieldKind::Date);
    form.show();
    form
  }

  #[test]
  fn test_required_field_blocks_submit() {
    let mut form = asset_form();
    assert_eq!(form.handle_key(key(KeyCode::Enter)), KeyResult::Handled);
    assert_eq!(
      form.fields[0].error,
      Some(ValidationError::Required("Asset number"))
    );
    assert_eq!(
      form.fields[0].error.as_ref().map(|e| e.to_string()),
      Some("Asset number is required".to_string())
    );
  }

  #[test]
  fn test_typed_values_after_validation() {
    let mut form = asset_form();
    type_str(&mut form, "PUMP-043");
    form.handle_key(key(KeyCode::Tab));
    form.handle_key(key(KeyCode::Right));
    form.handle_key(key(KeyCode::Tab));
    type_str(&mut form, "12,500.50");
    form.handle_key(key(KeyCode::Tab));
    type_str(&mut form, "2024-01-05");

    assert_eq!(
      form.handle_key(key(KeyCode::Enter)),
      KeyResult::Event(FormEvent::Submitted)
    );
    let values = form.validate().unwrap();
    assert_eq!(values.text("assetNumber").as_deref(), Some("PUMP-043"));
    assert_eq!(values.text("status").as_deref(), Some("retired"));
    assert_eq!(values.decimal("replacementCost"), Some(Decimal::new(1250050, 2)));
    assert_eq!(values.date("installDate"), NaiveDate::from_ymd_opt(2024, 1, 5));
  }

  #[test]
  fn test_malformed_values_are_reported_per_field() {
    let mut form = asset_form();
    form.set_value("assetNumber", "PUMP-043");
    form.set_value("replacementCost", "lots");
    form.set_value("installDate", "05/01/2024");

    let errors = form.validate().unwrap_err();
    assert_eq!(
      errors,
      vec![
        ValidationError::NotDecimal("Replacement cost"),
        ValidationError::NotDate("Install date"),
      ]
    );
    // Focus jumps to the first bad field
    assert_eq!(form.focus, 2);
  }

  #[test]
  fn test_count_rejects_negative_and_fractional() {
    let mut form = Form::new("Quantity").field("quantity", "Quantity", FieldKind::Count);
    form.show();
    form.set_value("quantity", "-1");
    assert_eq!(
      form.validate().unwrap_err(),
      vec![ValidationError::Negative("Quantity")]
    );
    form.set_value("quantity", "1.5");
    assert_eq!(
      form.validate().unwrap_err(),
      vec![ValidationError::NotInteger("Quantity")]
    );
    form.set_value("quantity", "7");
    assert_eq!(form.validate().unwrap().count("quantity"), Some(7));
  }

  #[test]
  fn test_submitting_form_ignores_keys() {
    let mut form = asset_form();
    form.set_submitting(true);
    form.handle_key(key(KeyCode::Char('x')));
    assert_eq!(form.handle_key(key(KeyCode::Esc)), KeyResult::Handled);
    assert!(form.is_active());
  }
}
