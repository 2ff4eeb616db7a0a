//! Display formatting for values coming from the API.

use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};

/// Placeholder for absent optional values
pub const EMPTY: &str = "-";

/// Turn a wire status like `maintenance_required` into "Maintenance Required".
pub fn status_label(raw: &str) -> String {
  raw
    .split('_')
    .filter(|word| !word.is_empty())
    .map(|word| {
      let mut chars = word.chars();
      match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
      }
    })
    .collect::<Vec<String>>()
    .join(" ")
}

/// Human-readable byte count: "500 bytes", "2.0 KB", "5.0 MB".
pub fn format_file_size(bytes: u64) -> String {
  const KB: f64 = 1024.0;
  const MB: f64 = KB * 1024.0;
  const GB: f64 = MB * 1024.0;

  let size = bytes as f64;
  if size < KB {
    format!("{} bytes", bytes)
  } else if size < MB {
    format!("{:.1} KB", size / KB)
  } else if size < GB {
    format!("{:.1} MB", size / MB)
  } else {
    format!("{:.1} GB", size / GB)
  }
}

/// Money with two decimals and thousands separators: "$12,500.50".
pub fn format_currency(amount: Decimal) -> String {
  let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
  let fixed = format!("{:.2}", rounded.abs());
  let (whole, cents) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

  let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
  for (i, digit) in whole.chars().enumerate() {
    if i > 0 && (whole.len() - i) % 3 == 0 {
      grouped.push(',');
    }
    grouped.push(digit);
  }

  let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
    "-"
  } else {
    ""
  };
  format!("{}${}.{}", sign, grouped, cents)
}

/// Calendar date as "Jan 5, 2024".
pub fn format_date(date: NaiveDate) -> String {
  date.format("%b %-d, %Y").to_string()
}

pub fn format_optional_date(date: Option<NaiveDate>) -> String {
  date.map(format_date).unwrap_or_else(|| EMPTY.to_string())
}

pub fn format_optional_currency(amount: Option<Decimal>) -> String {
  amount.map(format_currency).unwrap_or_else(|| EMPTY.to_string())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_status_labels() {
    assert_eq!(status_label("maintenance_required"), "Maintenance Required");
    assert_eq!(status_label("in_progress"), "In Progress");
    assert_eq!(status_label("operational"), "Operational");
    assert_eq!(status_label("on_hold"), "On Hold");
  }

  #[test]
  fn test_file_sizes() {
    assert_eq!(format_file_size(500), "500 bytes");
    assert_eq!(format_file_size(2048), "2.0 KB");
    assert_eq!(format_file_size(5_242_880), "5.0 MB");
    assert_eq!(format_file_size(1536), "1.5 KB");
    assert_eq!(format_file_size(0), "0 bytes");
  }

  #[test]
  fn test_currency() {
    assert_eq!(format_currency(Decimal::new(1250050, 2)), "$12,500.50");
    assert_eq!(format_currency(Decimal::new(875, 2)), "$8.75");
    assert_eq!(format_currency(Decimal::new(1_000_000, 0)), "$1,000,000.00");
    assert_eq!(format_currency(Decimal::new(-123456, 2)), "-$1,234.56");
    assert_eq!(format_currency(Decimal::new(100, 0)), "$100.00");
  }

  #[test]
  fn test_currency_rounds_to_cents() {
    assert_eq!(format_currency(Decimal::new(19999, 3)), "$20.00");
  }

  #[test]
  fn test_dates() {
    let date = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
    assert_eq!(format_date(date), "Jan 5, 2024");
    assert_eq!(format_optional_date(None), "-");
  }
}
