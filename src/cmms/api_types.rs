//! Wire-level shapes for the maintenance API.
//!
//! Request bodies live here, along with the raw document shape and the date
//! handling shared by every entity.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::types::{
  AssetId, AssetStatus, Document, DocumentOwner, UserId, WorkOrderStatus,
};

// ============================================================================
// Dates
// ============================================================================

/// Dates arrive either as `YYYY-MM-DD` or as full ISO timestamps. Only the
/// calendar day is kept. Serializes back as `YYYY-MM-DD`.
pub mod lenient_date {
  use chrono::{DateTime, NaiveDate};
  use serde::{de, Deserialize, Deserializer, Serializer};

  pub fn parse(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
      return Some(d);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
      return Some(dt.date_naive());
    }
    // Timestamps without an offset, e.g. "2024-01-05T10:00:00"
    s.get(..10)
      .filter(|_| s.as_bytes().get(10) == Some(&b'T') || s.as_bytes().get(10) == Some(&b' '))
      .and_then(|day| NaiveDate::parse_from_str(day, "%Y-%m-%d").ok())
  }

  pub fn serialize<S: Serializer>(date: &Option<NaiveDate>, serializer: S) -> Result<S::Ok, S::Error> {
    match date {
      Some(d) => serializer.serialize_str(&d.format("%Y-%m-%d").to_string()),
      None => serializer.serialize_none(),
    }
  }

  pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<NaiveDate>, D::Error> {
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
      None | Some("") => Ok(None),
      Some(s) => parse(s)
        .map(Some)
        .ok_or_else(|| de::Error::custom(format!("invalid date: {}", s))),
    }
  }
}

// ============================================================================
// Documents
// ============================================================================

/// Document as sent by the server: the owner is a loose tag/id pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiDocument {
  pub id: u64,
  #[serde(alias = "fileName", alias = "originalName")]
  pub filename: String,
  #[serde(alias = "size")]
  pub file_size: u64,
  #[serde(default, alias = "uploadedAt", alias = "createdAt", with = "lenient_date")]
  pub upload_date: Option<NaiveDate>,
  #[serde(default, alias = "mimeType")]
  pub content_type: Option<String>,
  pub entity_type: String,
  pub entity_id: u64,
}

impl TryFrom<ApiDocument> for Document {
  type Error = String;

  fn try_from(doc: ApiDocument) -> Result<Self, Self::Error> {
    let owner = DocumentOwner::from_parts(&doc.entity_type, doc.entity_id)
      .ok_or_else(|| format!("unknown document owner type '{}'", doc.entity_type))?;
    Ok(Document {
      id: doc.id,
      filename: doc.filename,
      size: doc.file_size,
      uploaded_on: doc.upload_date,
      content_type: doc.content_type,
      owner,
    })
  }
}

impl From<Document> for ApiDocument {
  fn from(doc: Document) -> Self {
    ApiDocument {
      id: doc.id,
      filename: doc.filename,
      file_size: doc.size,
      upload_date: doc.uploaded_on,
      content_type: doc.content_type,
      entity_type: doc.owner.entity_type().to_string(),
      entity_id: doc.owner.entity_id(),
    }
  }
}

// ============================================================================
// Request bodies
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
  pub username: String,
  pub password: String,
}

/// Partial asset update; absent fields are left untouched by the server.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetUpdate {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub status: Option<AssetStatus>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub location: Option<String>,
}

impl AssetUpdate {
  pub fn status(status: AssetStatus) -> Self {
    Self {
      status: Some(status),
      ..Self::default()
    }
  }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAsset {
  pub asset_number: String,
  pub description: String,
  pub status: AssetStatus,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub location: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub manufacturer: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub model: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub serial_number: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none", with = "lenient_date")]
  pub install_date: Option<NaiveDate>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub replacement_cost: Option<Decimal>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub parent_id: Option<AssetId>,
}

/// Partial work order update.
///
/// `assigned_to_id` is doubly optional: `Some(None)` clears the assignee.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkOrderUpdate {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub status: Option<WorkOrderStatus>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub assigned_to_id: Option<Option<UserId>>,
}

impl WorkOrderUpdate {
  pub fn status(status: WorkOrderStatus) -> Self {
    Self {
      status: Some(status),
      ..Self::default()
    }
  }

  pub fn assign(user: UserId) -> Self {
    Self {
      assigned_to_id: Some(Some(user)),
      ..Self::default()
    }
  }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewWorkOrder {
  pub title: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  pub status: WorkOrderStatus,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub asset_id: Option<AssetId>,
  #[serde(skip_serializing_if = "Option::is_none", with = "lenient_date")]
  pub scheduled_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InventoryUpdate {
  pub quantity: i64,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_lenient_date_formats() {
    let day = NaiveDate::from_ymd_opt(2024, 1, 5);
    assert_eq!(lenient_date::parse("2024-01-05"), day);
    assert_eq!(lenient_date::parse("2024-01-05T10:30:00Z"), day);
    assert_eq!(lenient_date::parse("2024-01-05T10:30:00.000+02:00"), day);
    assert_eq!(lenient_date::parse("2024-01-05T10:30:00"), day);
    assert_eq!(lenient_date::parse("05/01/2024"), None);
  }

  #[test]
  fn test_update_bodies_skip_absent_fields() {
    let body = serde_json::to_value(AssetUpdate::status(AssetStatus::MaintenanceRequired)).unwrap();
    assert_eq!(body, serde_json::json!({"status": "maintenance_required"}));

    let body = serde_json::to_value(WorkOrderUpdate::assign(5)).unwrap();
    assert_eq!(body, serde_json::json!({"assignedToId": 5}));

    let unassign = WorkOrderUpdate {
      assigned_to_id: Some(None),
      ..WorkOrderUpdate::default()
    };
    let body = serde_json::to_value(unassign).unwrap();
    assert_eq!(body, serde_json::json!({"assignedToId": null}));
  }

  #[test]
  fn test_new_work_order_body() {
    let body = serde_json::to_value(NewWorkOrder {
      title: "Replace belt".to_string(),
      description: None,
      status: WorkOrderStatus::Requested,
      asset_id: Some(42),
      scheduled_date: NaiveDate::from_ymd_opt(2024, 2, 1),
    })
    .unwrap();
    assert_eq!(
      body,
      serde_json::json!({
        "title": "Replace belt",
        "status": "requested",
        "assetId": 42,
        "scheduledDate": "2024-02-01"
      })
    );
  }
}
