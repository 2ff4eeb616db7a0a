use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use crate::config::ApiConfig;
use crate::cmms::api_types::{
  AssetUpdate, InventoryUpdate, LoginRequest, NewAsset, NewWorkOrder, WorkOrderUpdate,
};
use crate::cmms::error::ApiError;
use crate::cmms::transport::{
  ApiRequest, ApiResponse, FileUpload, HttpTransport, Method, RequestBody, Transport,
};
use crate::cmms::types::{
  Asset, AssetDetail, AssetId, Document, DocumentId, DocumentOwner, InventoryItem,
  InventoryItemId, User, WorkOrder, WorkOrderDetail, WorkOrderId,
};

/// Upper bound for a single retry delay
const MAX_BACKOFF: Duration = Duration::from_secs(10);

/// Timeout and retry settings applied to every request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestPolicy {
  pub timeout: Duration,
  /// Total attempts for idempotent reads (1 = no retry)
  pub max_attempts: u32,
  pub initial_backoff: Duration,
}

impl Default for RequestPolicy {
  fn default() -> Self {
    Self {
      timeout: Duration::from_secs(30),
      max_attempts: 3,
      initial_backoff: Duration::from_millis(250),
    }
  }
}

impl From<&ApiConfig> for RequestPolicy {
  fn from(config: &ApiConfig) -> Self {
    Self {
      timeout: Duration::from_secs(config.timeout_secs),
      max_attempts: config.retry.max_attempts.max(1),
      initial_backoff: Duration::from_millis(config.retry.initial_backoff_ms),
    }
  }
}

impl RequestPolicy {
  /// Delay before retry number `attempt` (1-based), doubling each time.
  pub fn backoff(&self, attempt: u32) -> Duration {
    let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
    self.initial_backoff.saturating_mul(factor).min(MAX_BACKOFF)
  }
}

/// Raised whenever the server answers 401; consumed by the auth gate.
#[derive(Debug, Clone, Default)]
pub struct SessionSignal(Arc<AtomicBool>);

impl SessionSignal {
  fn raise(&self) {
    self.0.store(true, Ordering::SeqCst);
  }

  /// Returns whether the signal was raised since the last call, clearing it.
  pub fn take(&self) -> bool {
    self.0.swap(false, Ordering::SeqCst)
  }
}

/// Maintenance API client
#[derive(Clone)]
pub struct CmmsClient<T: Transport = HttpTransport> {
  transport: T,
  policy: RequestPolicy,
  session: SessionSignal,
}

impl CmmsClient<HttpTransport> {
  pub fn new(config: &ApiConfig) -> color_eyre::Result<Self> {
    let transport = HttpTransport::new(&config.base_url)?;
    Ok(Self::with_transport(transport, RequestPolicy::from(config)))
  }
}

impl<T: Transport> CmmsClient<T> {
  pub fn with_transport(transport: T, policy: RequestPolicy) -> Self {
    Self {
      transport,
      policy,
      session: SessionSignal::default(),
    }
  }

  pub fn session_signal(&self) -> &SessionSignal {
    &self.session
  }

  // ==========================================================================
  // Request plumbing
  // ==========================================================================

  /// Send a request with timeout, status mapping and (for GET) bounded retry.
  async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
    let attempts = if request.method.is_idempotent_read() {
      self.policy.max_attempts.max(1)
    } else {
      1
    };

    let mut attempt = 0;
    loop {
      attempt += 1;
      debug!(method = request.method.as_str(), path = %request.path, attempt, "sending request");

      let result = match tokio::time::timeout(self.policy.timeout, self.transport.send(request.clone())).await {
        Ok(result) => result,
        Err(_) => Err(ApiError::Timeout(self.policy.timeout)),
      };

      let result = result.and_then(|response| {
        if response.is_success() {
          Ok(response)
        } else {
          Err(ApiError::from_response(response.status, &response.body))
        }
      });

      match result {
        Ok(response) => return Ok(response),
        Err(e) if attempt < attempts && e.is_transient() => {
          let delay = self.policy.backoff(attempt);
          warn!(path = %request.path, attempt, ?delay, error = %e, "request failed, retrying");
          tokio::time::sleep(delay).await;
        }
        Err(e) => {
          if e.is_unauthorized() {
            self.session.raise();
          }
          warn!(method = request.method.as_str(), path = %request.path, error = %e, "request failed");
          return Err(e);
        }
      }
    }
  }

  fn decode<R: DeserializeOwned>(path: &str, body: &[u8]) -> Result<R, ApiError> {
    serde_json::from_slice(body).map_err(|e| ApiError::Decode {
      path: path.to_string(),
      reason: e.to_string(),
    })
  }

  async fn get<R: DeserializeOwned>(&self, path: String) -> Result<R, ApiError> {
    let response = self
      .execute(ApiRequest {
        method: Method::Get,
        path: path.clone(),
        body: RequestBody::Empty,
      })
      .await?;
    Self::decode(&path, &response.body)
  }

  async fn send_json<B: Serialize, R: DeserializeOwned>(
    &self,
    method: Method,
    path: String,
    body: &B,
  ) -> Result<R, ApiError> {
    let body = serde_json::to_value(body).map_err(|e| ApiError::Decode {
      path: path.clone(),
      reason: format!("failed to encode request: {}", e),
    })?;
    let response = self
      .execute(ApiRequest {
        method,
        path: path.clone(),
        body: RequestBody::Json(body),
      })
      .await?;
    Self::decode(&path, &response.body)
  }

  // ==========================================================================
  // Session
  // ==========================================================================

  /// Probe the current session
  pub async fn me(&self) -> Result<User, ApiError> {
    self.get("/api/auth/me".to_string()).await
  }

  pub async fn login(&self, username: &str, password: &str) -> Result<User, ApiError> {
    let body = LoginRequest {
      username: username.to_string(),
      password: password.to_string(),
    };
    self
      .send_json(Method::Post, "/api/auth/login".to_string(), &body)
      .await
  }

  pub async fn logout(&self) -> Result<(), ApiError> {
    self
      .execute(ApiRequest {
        method: Method::Post,
        path: "/api/auth/logout".to_string(),
        body: RequestBody::Empty,
      })
      .await?;
    Ok(())
  }

  // ==========================================================================
  // Reads
  // ==========================================================================

  pub async fn list_users(&self) -> Result<Vec<User>, ApiError> {
    self.get("/api/users".to_string()).await
  }

  pub async fn list_assets(&self) -> Result<Vec<Asset>, ApiError> {
    self.get("/api/assets".to_string()).await
  }

  pub async fn get_asset_details(&self, id: AssetId) -> Result<AssetDetail, ApiError> {
    self.get(format!("/api/assets/{}/details", id)).await
  }

  pub async fn list_work_orders_with_details(&self) -> Result<Vec<WorkOrderDetail>, ApiError> {
    self.get("/api/work-orders/details".to_string()).await
  }

  pub async fn list_documents(&self, owner: DocumentOwner) -> Result<Vec<Document>, ApiError> {
    self
      .get(format!(
        "/api/documents/{}/{}",
        owner.entity_type(),
        owner.entity_id()
      ))
      .await
  }

  pub async fn download_document(&self, id: DocumentId) -> Result<Vec<u8>, ApiError> {
    let response = self
      .execute(ApiRequest {
        method: Method::Get,
        path: format!("/api/documents/{}/download", id),
        body: RequestBody::Empty,
      })
      .await?;
    Ok(response.body)
  }

  pub async fn list_inventory(&self) -> Result<Vec<InventoryItem>, ApiError> {
    self.get("/api/inventory".to_string()).await
  }

  // ==========================================================================
  // Mutations
  // ==========================================================================

  pub async fn create_asset(&self, asset: &NewAsset) -> Result<Asset, ApiError> {
    self
      .send_json(Method::Post, "/api/assets".to_string(), asset)
      .await
  }

  pub async fn update_asset(&self, id: AssetId, update: &AssetUpdate) -> Result<Asset, ApiError> {
    self
      .send_json(Method::Put, format!("/api/assets/{}", id), update)
      .await
  }

  pub async fn create_work_order(&self, work_order: &NewWorkOrder) -> Result<WorkOrder, ApiError> {
    self
      .send_json(Method::Post, "/api/work-orders".to_string(), work_order)
      .await
  }

  pub async fn update_work_order(
    &self,
    id: WorkOrderId,
    update: &WorkOrderUpdate,
  ) -> Result<WorkOrder, ApiError> {
    self
      .send_json(Method::Put, format!("/api/work-orders/{}", id), update)
      .await
  }

  pub async fn upload_document(
    &self,
    owner: DocumentOwner,
    upload: FileUpload,
  ) -> Result<Document, ApiError> {
    let path = format!(
      "/api/documents/{}/{}/upload",
      owner.entity_type(),
      owner.entity_id()
    );
    let response = self
      .execute(ApiRequest {
        method: Method::Post,
        path: path.clone(),
        body: RequestBody::Multipart(upload),
      })
      .await?;
    Self::decode(&path, &response.body)
  }

  pub async fn delete_document(&self, id: DocumentId) -> Result<(), ApiError> {
    self
      .execute(ApiRequest {
        method: Method::Delete,
        path: format!("/api/documents/{}", id),
        body: RequestBody::Empty,
      })
      .await?;
    Ok(())
  }

  pub async fn update_inventory_item(
    &self,
    id: InventoryItemId,
    update: &InventoryUpdate,
  ) -> Result<InventoryItem, ApiError> {
    self
      .send_json(Method::Put, format!("/api/inventory/{}", id), update)
      .await
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cmms::fake::FakeBackend;
  use crate::cmms::types::AssetStatus;

  fn client(backend: &FakeBackend) -> CmmsClient<FakeBackend> {
    CmmsClient::with_transport(
      backend.clone(),
      RequestPolicy {
        timeout: Duration::from_millis(200),
        max_attempts: 3,
        initial_backoff: Duration::ZERO,
      },
    )
  }

  #[test]
  fn test_backoff_doubles_and_caps() {
    let policy = RequestPolicy {
      initial_backoff: Duration::from_millis(250),
      ..RequestPolicy::default()
    };
    assert_eq!(policy.backoff(1), Duration::from_millis(250));
    assert_eq!(policy.backoff(2), Duration::from_millis(500));
    assert_eq!(policy.backoff(3), Duration::from_millis(1000));
    assert_eq!(policy.backoff(20), MAX_BACKOFF);
  }

  #[tokio::test]
  async fn test_get_decodes_payload() {
    let backend = FakeBackend::seeded();
    let detail = client(&backend).get_asset_details(42).await.unwrap();
    assert_eq!(detail.asset.asset_number, "PUMP-042");
    assert_eq!(backend.requests("GET /api/assets/42/details"), 1);
  }

  #[tokio::test]
  async fn test_error_message_from_body() {
    let backend = FakeBackend::seeded();
    let err = client(&backend).get_asset_details(999).await.unwrap_err();
    assert_eq!(err.display_message(), "Asset not found");
    assert!(matches!(err, ApiError::Status { status: 404, .. }));
    // 404 is not transient
    assert_eq!(backend.requests("GET /api/assets/999/details"), 1);
  }

  #[tokio::test]
  async fn test_get_retries_transient_failures() {
    let backend = FakeBackend::seeded();
    backend.fail_next("GET /api/assets", 2, 503);
    let assets = client(&backend).list_assets().await.unwrap();
    assert!(!assets.is_empty());
    assert_eq!(backend.requests("GET /api/assets"), 3);
  }

  #[tokio::test]
  async fn test_get_retry_is_bounded() {
    let backend = FakeBackend::seeded();
    backend.fail_next("GET /api/assets", 10, 500);
    let err = client(&backend).list_assets().await.unwrap_err();
    assert!(matches!(err, ApiError::Status { status: 500, .. }));
    assert_eq!(backend.requests("GET /api/assets"), 3);
  }

  #[tokio::test]
  async fn test_mutations_are_never_retried() {
    let backend = FakeBackend::seeded();
    backend.fail_next("PUT /api/assets/42", 1, 503);
    let err = client(&backend)
      .update_asset(42, &AssetUpdate::status(AssetStatus::Retired))
      .await
      .unwrap_err();
    assert!(err.is_transient());
    assert_eq!(backend.requests("PUT /api/assets/42"), 1);
  }

  #[tokio::test]
  async fn test_timeout_is_enforced() {
    let backend = FakeBackend::seeded();
    backend.set_latency(Duration::from_secs(5));
    let client = CmmsClient::with_transport(
      backend.clone(),
      RequestPolicy {
        timeout: Duration::from_millis(20),
        max_attempts: 1,
        initial_backoff: Duration::ZERO,
      },
    );
    let err = client.list_users().await.unwrap_err();
    assert_eq!(err, ApiError::Timeout(Duration::from_millis(20)));
  }

  #[tokio::test]
  async fn test_unauthorized_raises_session_signal() {
    let backend = FakeBackend::seeded();
    backend.expire_session();
    let client = client(&backend);
    assert!(client.list_users().await.unwrap_err().is_unauthorized());
    assert!(client.session_signal().take());
    assert!(!client.session_signal().take());
  }

  #[tokio::test]
  async fn test_malformed_payload_is_decode_error() {
    let backend = FakeBackend::seeded();
    backend.override_body("GET /api/users", r#"[{"id":"five"}]"#);
    let err = client(&backend).list_users().await.unwrap_err();
    assert!(matches!(err, ApiError::Decode { ref path, .. } if path == "/api/users"));
  }

  #[tokio::test]
  async fn test_upload_and_delete_document() {
    let backend = FakeBackend::seeded();
    let client = client(&backend);
    let owner = DocumentOwner::Asset(42);

    let doc = client
      .upload_document(
        owner,
        FileUpload {
          file_name: "manual.pdf".to_string(),
          content_type: "application/pdf".to_string(),
          bytes: vec![0u8; 2048],
        },
      )
      .await
      .unwrap();
    assert_eq!(doc.owner, owner);
    assert_eq!(doc.size, 2048);

    let bytes = client.download_document(doc.id).await.unwrap();
    assert_eq!(bytes.len(), 2048);

    client.delete_document(doc.id).await.unwrap();
    let remaining = client.list_documents(owner).await.unwrap();
    assert!(remaining.iter().all(|d| d.id != doc.id));
  }
}
