//! In-memory maintenance backend used by tests.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::{json, Value};

use super::error::ApiError;
use super::transport::{ApiRequest, ApiResponse, Method, RequestBody, Transport};
use super::types::{
  Asset, AssetDetail, AssetRef, AssetStatus, AssetTypeRef, Document, DocumentOwner,
  InventoryItem, User, UserRef, WorkOrder, WorkOrderDetail, WorkOrderStatus,
};

pub const USERNAME: &str = "dana";
pub const PASSWORD: &str = "secret";

#[derive(Default)]
struct FakeState {
  users: Vec<User>,
  assets: Vec<Asset>,
  work_orders: Vec<WorkOrder>,
  documents: Vec<(Document, Vec<u8>)>,
  inventory: Vec<InventoryItem>,
  next_id: u64,
  authenticated: bool,
  requests: HashMap<String, usize>,
  failures: HashMap<String, (usize, u16)>,
  overrides: HashMap<String, String>,
  latency: Duration,
}

#[derive(Clone, Default)]
pub struct FakeBackend {
  state: Arc<Mutex<FakeState>>,
}

fn reply(status: u16, body: impl Serialize) -> ApiResponse {
  ApiResponse {
    status,
    body: serde_json::to_vec(&body).unwrap(),
  }
}

fn message(status: u16, text: &str) -> ApiResponse {
  reply(status, json!({ "message": text }))
}

fn no_content() -> ApiResponse {
  ApiResponse {
    status: 204,
    body: Vec::new(),
  }
}

fn json_body(request: &ApiRequest) -> Value {
  match &request.body {
    RequestBody::Json(value) => value.clone(),
    _ => Value::Null,
  }
}

impl FakeBackend {
  /// Backend with a signed-in session and a small plant.
  pub fn seeded() -> Self {
    let user = |id, name: &str, active| User {
      id,
      full_name: name.to_string(),
      email: format!("{}@example.com", name.to_lowercase().replace(' ', ".")),
      role: "technician".to_string(),
      is_active: active,
    };
    let asset = |id, number: &str, status, parent_id| Asset {
      id,
      asset_number: number.to_string(),
      description: format!("{} description", number),
      status,
      location: Some("Building B".to_string()),
      manufacturer: Some("Grundfos".to_string()),
      model: None,
      serial_number: None,
      install_date: NaiveDate::from_ymd_opt(2021, 3, 4),
      warranty_expiration_date: None,
      replacement_cost: Some(Decimal::new(1250050, 2)),
      parent_id,
    };
    let work_order = |id, status, assigned_to_id, asset_id| WorkOrder {
      id,
      work_order_number: format!("WO-{:04}", id),
      title: format!("Work order {}", id),
      description: None,
      status,
      requested_date: NaiveDate::from_ymd_opt(2024, 1, 5),
      scheduled_date: None,
      assigned_to_id,
      asset_id,
    };

    let state = FakeState {
      users: vec![user(5, "Dana Reyes", true), user(6, "Lee Park", false)],
      assets: vec![
        asset(7, "LINE-007", AssetStatus::Operational, None),
        asset(42, "PUMP-042", AssetStatus::Operational, Some(7)),
      ],
      work_orders: vec![
        work_order(1, WorkOrderStatus::Completed, None, Some(42)),
        work_order(2, WorkOrderStatus::Requested, None, Some(42)),
        work_order(3, WorkOrderStatus::InProgress, Some(5), Some(7)),
      ],
      documents: vec![(
        Document {
          id: 100,
          filename: "pump-manual.pdf".to_string(),
          size: 5_242_880,
          uploaded_on: NaiveDate::from_ymd_opt(2024, 1, 5),
          content_type: Some("application/pdf".to_string()),
          owner: DocumentOwner::Asset(42),
        },
        vec![1, 2, 3],
      )],
      inventory: vec![InventoryItem {
        id: 1,
        part_number: "BRG-6204".to_string(),
        name: "Ball bearing".to_string(),
        quantity: 12,
        reorder_point: 4,
        unit_cost: Some(Decimal::new(875, 2)),
        location: Some("Stores A3".to_string()),
      }],
      next_id: 1000,
      authenticated: true,
      ..FakeState::default()
    };

    Self {
      state: Arc::new(Mutex::new(state)),
    }
  }

  fn lock(&self) -> MutexGuard<'_, FakeState> {
    self.state.lock().unwrap()
  }

  /// Number of requests seen for e.g. `"GET /api/assets"`.
  pub fn requests(&self, key: &str) -> usize {
    self.lock().requests.get(key).copied().unwrap_or(0)
  }

  /// Answer the next `times` requests for `key` with `status`.
  pub fn fail_next(&self, key: &str, times: usize, status: u16) {
    self.lock().failures.insert(key.to_string(), (times, status));
  }

  /// Answer every request for `key` with a raw 200 body.
  pub fn override_body(&self, key: &str, body: &str) {
    self.lock().overrides.insert(key.to_string(), body.to_string());
  }

  pub fn set_latency(&self, latency: Duration) {
    self.lock().latency = latency;
  }

  pub fn expire_session(&self) {
    self.lock().authenticated = false;
  }

  pub fn asset(&self, id: u64) -> Option<Asset> {
    self.lock().assets.iter().find(|a| a.id == id).cloned()
  }

  pub fn work_order(&self, id: u64) -> Option<WorkOrder> {
    self.lock().work_orders.iter().find(|w| w.id == id).cloned()
  }

  /// Change an asset behind the client's back.
  pub fn set_asset_status(&self, id: u64, status: AssetStatus) {
    if let Some(asset) = self.lock().assets.iter_mut().find(|a| a.id == id) {
      asset.status = status;
    }
  }

  fn handle(&self, request: ApiRequest) -> ApiResponse {
    let mut state = self.lock();
    let key = format!("{} {}", request.method.as_str(), request.path);
    *state.requests.entry(key.clone()).or_default() += 1;

    if let Some((remaining, status)) = state.failures.get_mut(&key) {
      if *remaining > 0 {
        *remaining -= 1;
        return message(*status, "Injected failure");
      }
    }
    if let Some(body) = state.overrides.get(&key) {
      return ApiResponse {
        status: 200,
        body: body.as_bytes().to_vec(),
      };
    }

    let segments: Vec<&str> = request.path.trim_start_matches('/').split('/').collect();

    if segments.as_slice() == ["api", "auth", "login"] && request.method == Method::Post {
      let body = json_body(&request);
      if body["username"] == USERNAME && body["password"] == PASSWORD {
        state.authenticated = true;
        return reply(200, &state.users[0]);
      }
      return message(401, "Invalid username or password");
    }
    if !state.authenticated {
      return message(401, "Not authenticated");
    }

    match (request.method, segments.as_slice()) {
      (Method::Get, ["api", "auth", "me"]) => reply(200, &state.users[0]),
      (Method::Post, ["api", "auth", "logout"]) => {
        state.authenticated = false;
        no_content()
      }
      (Method::Get, ["api", "users"]) => reply(200, &state.users),
      (Method::Get, ["api", "assets"]) => reply(200, &state.assets),
      (Method::Post, ["api", "assets"]) => {
        let body = json_body(&request);
        let mut asset: Asset = match serde_json::from_value(json!({
          "id": 0,
          "assetNumber": body["assetNumber"],
          "description": body["description"],
          "status": body["status"],
          "location": body["location"],
          "replacementCost": body["replacementCost"],
          "parentId": body["parentId"],
        })) {
          Ok(asset) => asset,
          Err(_) => return message(400, "Invalid asset"),
        };
        state.next_id += 1;
        asset.id = state.next_id;
        state.assets.push(asset.clone());
        reply(201, asset)
      }
      (Method::Get, ["api", "assets", id, "details"]) => {
        let Some(asset) = id
          .parse::<u64>()
          .ok()
          .and_then(|id| state.assets.iter().find(|a| a.id == id))
        else {
          return message(404, "Asset not found");
        };
        let parent = asset
          .parent_id
          .and_then(|pid| state.assets.iter().find(|a| a.id == pid))
          .map(|p| AssetRef {
            id: p.id,
            asset_number: p.asset_number.clone(),
            description: p.description.clone(),
          });
        let detail = AssetDetail {
          asset: asset.clone(),
          asset_type: Some(AssetTypeRef {
            id: 1,
            name: "Pump".to_string(),
          }),
          parent,
          work_orders: state
            .work_orders
            .iter()
            .filter(|w| w.asset_id == Some(asset.id))
            .cloned()
            .collect(),
        };
        reply(200, detail)
      }
      (Method::Put, ["api", "assets", id]) => {
        let body = json_body(&request);
        let Some(asset) = id
          .parse::<u64>()
          .ok()
          .and_then(|id| state.assets.iter_mut().find(|a| a.id == id))
        else {
          return message(404, "Asset not found");
        };
        if let Some(status) = body.get("status") {
          match serde_json::from_value(status.clone()) {
            Ok(status) => asset.status = status,
            Err(_) => return message(400, "Invalid status"),
          }
        }
        if let Some(description) = body.get("description").and_then(|d| d.as_str()) {
          asset.description = description.to_string();
        }
        reply(200, asset.clone())
      }
      (Method::Get, ["api", "work-orders", "details"]) => {
        let details: Vec<WorkOrderDetail> = state
          .work_orders
          .iter()
          .map(|w| WorkOrderDetail {
            work_order: w.clone(),
            assigned_to: w
              .assigned_to_id
              .and_then(|uid| state.users.iter().find(|u| u.id == uid))
              .map(|u| UserRef {
                id: u.id,
                full_name: u.full_name.clone(),
              }),
            asset: w
              .asset_id
              .and_then(|aid| state.assets.iter().find(|a| a.id == aid))
              .map(|a| AssetRef {
                id: a.id,
                asset_number: a.asset_number.clone(),
                description: a.description.clone(),
              }),
          })
          .collect();
        reply(200, details)
      }
      (Method::Post, ["api", "work-orders"]) => {
        let body = json_body(&request);
        state.next_id += 1;
        let work_order = WorkOrder {
          id: state.next_id,
          work_order_number: format!("WO-{:04}", state.next_id),
          title: body["title"].as_str().unwrap_or_default().to_string(),
          description: body["description"].as_str().map(String::from),
          status: serde_json::from_value(body["status"].clone()).unwrap_or(WorkOrderStatus::Requested),
          requested_date: NaiveDate::from_ymd_opt(2024, 2, 1),
          scheduled_date: None,
          assigned_to_id: None,
          asset_id: body["assetId"].as_u64(),
        };
        state.work_orders.push(work_order.clone());
        reply(201, work_order)
      }
      (Method::Put, ["api", "work-orders", id]) => {
        let body = json_body(&request);
        let assignee = match body.get("assignedToId") {
          None => None,
          Some(Value::Null) => Some(None),
          Some(v) => match v.as_u64() {
            Some(uid) if state.users.iter().any(|u| u.id == uid && u.is_active) => Some(Some(uid)),
            _ => return message(400, "Assignee must be an active user"),
          },
        };
        let Some(work_order) = id
          .parse::<u64>()
          .ok()
          .and_then(|id| state.work_orders.iter_mut().find(|w| w.id == id))
        else {
          return message(404, "Work order not found");
        };
        if let Some(status) = body.get("status") {
          match serde_json::from_value(status.clone()) {
            Ok(status) => work_order.status = status,
            Err(_) => return message(400, "Invalid status"),
          }
        }
        if let Some(assignee) = assignee {
          work_order.assigned_to_id = assignee;
        }
        reply(200, work_order.clone())
      }
      (Method::Get, ["api", "documents", id, "download"]) => {
        match state
          .documents
          .iter()
          .find(|(d, _)| id.parse::<u64>() == Ok(d.id))
        {
          Some((_, bytes)) => ApiResponse {
            status: 200,
            body: bytes.clone(),
          },
          None => message(404, "Document not found"),
        }
      }
      (Method::Get, ["api", "documents", entity_type, entity_id]) => {
        let Some(owner) = entity_id
          .parse()
          .ok()
          .and_then(|id| DocumentOwner::from_parts(entity_type, id))
        else {
          return message(400, "Unknown entity");
        };
        let docs: Vec<&Document> = state
          .documents
          .iter()
          .map(|(d, _)| d)
          .filter(|d| d.owner == owner)
          .collect();
        reply(200, docs)
      }
      (Method::Post, ["api", "documents", entity_type, entity_id, "upload"]) => {
        let Some(owner) = entity_id
          .parse()
          .ok()
          .and_then(|id| DocumentOwner::from_parts(entity_type, id))
        else {
          return message(400, "Unknown entity");
        };
        let RequestBody::Multipart(upload) = request.body else {
          return message(400, "No file uploaded");
        };
        state.next_id += 1;
        let doc = Document {
          id: state.next_id,
          filename: upload.file_name,
          size: upload.bytes.len() as u64,
          uploaded_on: NaiveDate::from_ymd_opt(2024, 2, 1),
          content_type: Some(upload.content_type),
          owner,
        };
        state.documents.push((doc.clone(), upload.bytes));
        reply(201, doc)
      }
      (Method::Delete, ["api", "documents", id]) => {
        let before = state.documents.len();
        state.documents.retain(|(d, _)| id.parse::<u64>() != Ok(d.id));
        if state.documents.len() == before {
          message(404, "Document not found")
        } else {
          no_content()
        }
      }
      (Method::Get, ["api", "inventory"]) => reply(200, &state.inventory),
      (Method::Put, ["api", "inventory", id]) => {
        let quantity = json_body(&request)["quantity"].as_i64();
        let Some(item) = id
          .parse::<u64>()
          .ok()
          .and_then(|id| state.inventory.iter_mut().find(|i| i.id == id))
        else {
          return message(404, "Item not found");
        };
        match quantity {
          Some(q) if q >= 0 => {
            item.quantity = q;
            reply(200, item.clone())
          }
          _ => message(400, "Quantity must be zero or more"),
        }
      }
      _ => message(404, "Not found"),
    }
  }
}

impl Transport for FakeBackend {
  fn send(&self, request: ApiRequest) -> impl Future<Output = Result<ApiResponse, ApiError>> + Send {
    let backend = self.clone();
    async move {
      let latency = backend.lock().latency;
      if !latency.is_zero() {
        tokio::time::sleep(latency).await;
      }
      Ok(backend.handle(request))
    }
  }
}
