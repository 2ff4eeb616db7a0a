//! Domain types returned by the maintenance API.
//!
//! These types double as cache payloads, so every one of them serializes back
//! to the same JSON shape it was decoded from.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::api_types::{lenient_date, ApiDocument};

pub type AssetId = u64;
pub type WorkOrderId = u64;
pub type UserId = u64;
pub type DocumentId = u64;
pub type InventoryItemId = u64;

/// Operational status of an asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetStatus {
  Operational,
  NonOperational,
  MaintenanceRequired,
  Retired,
}

impl AssetStatus {
  pub const ALL: [AssetStatus; 4] = [
    AssetStatus::Operational,
    AssetStatus::NonOperational,
    AssetStatus::MaintenanceRequired,
    AssetStatus::Retired,
  ];

  /// Wire value, e.g. `maintenance_required`
  pub fn as_str(&self) -> &'static str {
    match self {
      AssetStatus::Operational => "operational",
      AssetStatus::NonOperational => "non_operational",
      AssetStatus::MaintenanceRequired => "maintenance_required",
      AssetStatus::Retired => "retired",
    }
  }

  pub fn from_wire(value: &str) -> Option<Self> {
    Self::ALL.into_iter().find(|s| s.as_str() == value)
  }
}

/// Lifecycle status of a work order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkOrderStatus {
  Requested,
  Approved,
  Scheduled,
  InProgress,
  OnHold,
  Completed,
  Cancelled,
}

impl WorkOrderStatus {
  pub const ALL: [WorkOrderStatus; 7] = [
    WorkOrderStatus::Requested,
    WorkOrderStatus::Approved,
    WorkOrderStatus::Scheduled,
    WorkOrderStatus::InProgress,
    WorkOrderStatus::OnHold,
    WorkOrderStatus::Completed,
    WorkOrderStatus::Cancelled,
  ];

  pub fn as_str(&self) -> &'static str {
    match self {
      WorkOrderStatus::Requested => "requested",
      WorkOrderStatus::Approved => "approved",
      WorkOrderStatus::Scheduled => "scheduled",
      WorkOrderStatus::InProgress => "in_progress",
      WorkOrderStatus::OnHold => "on_hold",
      WorkOrderStatus::Completed => "completed",
      WorkOrderStatus::Cancelled => "cancelled",
    }
  }

  pub fn from_wire(value: &str) -> Option<Self> {
    Self::ALL.into_iter().find(|s| s.as_str() == value)
  }

  /// Completed and cancelled work orders accept no further work.
  pub fn is_terminal(&self) -> bool {
    matches!(self, WorkOrderStatus::Completed | WorkOrderStatus::Cancelled)
  }
}

/// A maintained asset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
  pub id: AssetId,
  pub asset_number: String,
  #[serde(default)]
  pub description: String,
  pub status: AssetStatus,
  #[serde(default)]
  pub location: Option<String>,
  #[serde(default)]
  pub manufacturer: Option<String>,
  #[serde(default)]
  pub model: Option<String>,
  #[serde(default)]
  pub serial_number: Option<String>,
  #[serde(default, with = "lenient_date")]
  pub install_date: Option<NaiveDate>,
  #[serde(default, with = "lenient_date")]
  pub warranty_expiration_date: Option<NaiveDate>,
  #[serde(default)]
  pub replacement_cost: Option<Decimal>,
  #[serde(default)]
  pub parent_id: Option<AssetId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetTypeRef {
  pub id: u64,
  pub name: String,
}

/// Lookup-only reference to another asset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetRef {
  pub id: AssetId,
  pub asset_number: String,
  #[serde(default)]
  pub description: String,
}

/// Asset with its type, parent and work orders joined in
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetDetail {
  #[serde(flatten)]
  pub asset: Asset,
  #[serde(default)]
  pub asset_type: Option<AssetTypeRef>,
  #[serde(default)]
  pub parent: Option<AssetRef>,
  #[serde(default)]
  pub work_orders: Vec<WorkOrder>,
}

/// A unit of maintenance work
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkOrder {
  pub id: WorkOrderId,
  pub work_order_number: String,
  pub title: String,
  #[serde(default)]
  pub description: Option<String>,
  pub status: WorkOrderStatus,
  #[serde(default, with = "lenient_date")]
  pub requested_date: Option<NaiveDate>,
  #[serde(default, with = "lenient_date")]
  pub scheduled_date: Option<NaiveDate>,
  #[serde(default)]
  pub assigned_to_id: Option<UserId>,
  #[serde(default)]
  pub asset_id: Option<AssetId>,
}

impl WorkOrder {
  /// Unassigned and still open.
  pub fn is_assignable(&self) -> bool {
    self.assigned_to_id.is_none() && !self.status.is_terminal()
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRef {
  pub id: UserId,
  pub full_name: String,
}

/// Work order with assignee and asset joined in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkOrderDetail {
  #[serde(flatten)]
  pub work_order: WorkOrder,
  #[serde(default)]
  pub assigned_to: Option<UserRef>,
  #[serde(default)]
  pub asset: Option<AssetRef>,
}

/// Work orders a user can newly be assigned to.
pub fn assignable_work_orders<'a, I>(orders: I) -> Vec<&'a WorkOrder>
where
  I: IntoIterator<Item = &'a WorkOrder>,
{
  orders.into_iter().filter(|wo| wo.is_assignable()).collect()
}

/// Number of open work orders currently assigned to a user.
pub fn open_assignment_count<'a, I>(orders: I, user: UserId) -> usize
where
  I: IntoIterator<Item = &'a WorkOrder>,
{
  orders
    .into_iter()
    .filter(|wo| wo.assigned_to_id == Some(user) && !wo.status.is_terminal())
    .count()
}

/// A person who can be assigned work
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
  pub id: UserId,
  pub full_name: String,
  pub email: String,
  pub role: String,
  #[serde(alias = "active")]
  pub is_active: bool,
}

/// The single entity a document is attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentOwner {
  Asset(AssetId),
  WorkOrder(WorkOrderId),
}

impl DocumentOwner {
  /// Parse the wire tag/id pair, rejecting unknown tags.
  pub fn from_parts(entity_type: &str, entity_id: u64) -> Option<Self> {
    match entity_type {
      "asset" => Some(DocumentOwner::Asset(entity_id)),
      "workorder" => Some(DocumentOwner::WorkOrder(entity_id)),
      _ => None,
    }
  }

  pub fn entity_type(&self) -> &'static str {
    match self {
      DocumentOwner::Asset(_) => "asset",
      DocumentOwner::WorkOrder(_) => "workorder",
    }
  }

  pub fn entity_id(&self) -> u64 {
    match self {
      DocumentOwner::Asset(id) | DocumentOwner::WorkOrder(id) => *id,
    }
  }
}

impl std::fmt::Display for DocumentOwner {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      DocumentOwner::Asset(id) => write!(f, "asset {}", id),
      DocumentOwner::WorkOrder(id) => write!(f, "work order {}", id),
    }
  }
}

/// An uploaded file attached to an asset or work order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ApiDocument", into = "ApiDocument")]
pub struct Document {
  pub id: DocumentId,
  pub filename: String,
  pub size: u64,
  pub uploaded_on: Option<NaiveDate>,
  pub content_type: Option<String>,
  pub owner: DocumentOwner,
}

/// A stocked spare part
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItem {
  pub id: InventoryItemId,
  pub part_number: String,
  pub name: String,
  pub quantity: i64,
  #[serde(default)]
  pub reorder_point: i64,
  #[serde(default)]
  pub unit_cost: Option<Decimal>,
  #[serde(default)]
  pub location: Option<String>,
}

impl InventoryItem {
  pub fn needs_reorder(&self) -> bool {
    self.quantity <= self.reorder_point
  }
}
