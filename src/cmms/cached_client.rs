//! Cached maintenance client that wraps CmmsClient with transparent caching.

use chrono::Duration;
use color_eyre::{eyre::eyre, Result};
use tracing::{info, warn};

use crate::cache::{CacheLayer, CacheStorage, MemoryStorage, SqliteStorage};
use crate::config::Config;

use super::api_types::{AssetUpdate, InventoryUpdate, NewAsset, NewWorkOrder, WorkOrderUpdate};
use super::cache::{CmmsQueryKey, Mutation};
use super::client::{CmmsClient, SessionSignal};
use super::error::ApiError;
use super::transport::{FileUpload, HttpTransport, Transport};
use super::types::{
  Asset, AssetDetail, AssetId, Document, DocumentOwner, InventoryItem, InventoryItemId, User,
  UserId, WorkOrder, WorkOrderDetail, WorkOrderId,
};

pub type DynStorage = Box<dyn CacheStorage>;

const ASSIGNEE_NOT_ACTIVE: &str = "Assignee must be an active user";

/// Maintenance client with transparent caching support.
///
/// Reads go through the cache; every successful write invalidates the keys
/// holding a copy of what it changed. Failed writes leave the cache alone.
#[derive(Clone)]
pub struct CachedCmmsClient<T: Transport = HttpTransport> {
  inner: CmmsClient<T>,
  cache: CacheLayer<DynStorage>,
}

impl CachedCmmsClient<HttpTransport> {
  pub fn new(config: &Config) -> Result<Self> {
    let stale_time = Duration::try_seconds(config.cache.stale_secs)
      .filter(|d| *d >= Duration::zero())
      .ok_or_else(|| eyre!("Invalid cache stale time: {}s", config.cache.stale_secs))?;
    let inner = CmmsClient::new(&config.api)?;

    let storage: DynStorage = if config.cache.persist {
      match SqliteStorage::open_default(&config.api.origin()?) {
        Ok(storage) => Box::new(storage),
        Err(e) => {
          warn!(error = %e, "persistent cache unavailable, using memory");
          Box::new(MemoryStorage::new())
        }
      }
    } else {
      Box::new(MemoryStorage::new())
    };

    let cache = CacheLayer::new(storage).with_stale_time(stale_time);
    Ok(Self::with_parts(inner, cache))
  }
}

impl<T: Transport> CachedCmmsClient<T> {
  pub fn with_parts(inner: CmmsClient<T>, cache: CacheLayer<DynStorage>) -> Self {
    Self { inner, cache }
  }

  pub fn cache(&self) -> &CacheLayer<DynStorage> {
    &self.cache
  }

  pub fn session_signal(&self) -> &SessionSignal {
    self.inner.session_signal()
  }

  fn applied(&self, mutation: Mutation) {
    info!(?mutation, "mutation succeeded");
    self.cache.invalidate(&mutation.invalidations());
  }

  // ==========================================================================
  // Session (never cached)
  // ==========================================================================

  pub async fn me(&self) -> Result<User, ApiError> {
    self.inner.me().await
  }

  pub async fn login(&self, username: &str, password: &str) -> Result<User, ApiError> {
    let user = self.inner.login(username, password).await?;
    // Whatever was cached belonged to the previous session
    self.cache.clear();
    Ok(user)
  }

  pub async fn logout(&self) -> Result<(), ApiError> {
    let result = self.inner.logout().await;
    self.cache.clear();
    result
  }

  /// Forget everything cached, e.g. after the server rejected the session.
  pub fn clear_cache(&self) {
    self.cache.clear();
  }

  // ==========================================================================
  // Reads
  // ==========================================================================

  pub async fn users(&self) -> Result<Vec<User>, ApiError> {
    let result = self
      .cache
      .fetch(&CmmsQueryKey::Users, || self.inner.list_users())
      .await?;
    Ok(result.data)
  }

  pub async fn assets(&self) -> Result<Vec<Asset>, ApiError> {
    let result = self
      .cache
      .fetch(&CmmsQueryKey::Assets, || self.inner.list_assets())
      .await?;
    Ok(result.data)
  }

  pub async fn asset_details(&self, id: AssetId) -> Result<AssetDetail, ApiError> {
    let result = self
      .cache
      .fetch(&CmmsQueryKey::AssetDetail { id }, || {
        self.inner.get_asset_details(id)
      })
      .await?;
    Ok(result.data)
  }

  pub async fn work_orders(&self) -> Result<Vec<WorkOrderDetail>, ApiError> {
    let result = self
      .cache
      .fetch(&CmmsQueryKey::WorkOrderDetails, || {
        self.inner.list_work_orders_with_details()
      })
      .await?;
    Ok(result.data)
  }

  pub async fn documents(&self, owner: DocumentOwner) -> Result<Vec<Document>, ApiError> {
    let result = self
      .cache
      .fetch(&CmmsQueryKey::Documents { owner }, || {
        self.inner.list_documents(owner)
      })
      .await?;
    Ok(result.data)
  }

  pub async fn inventory(&self) -> Result<Vec<InventoryItem>, ApiError> {
    let result = self
      .cache
      .fetch(&CmmsQueryKey::Inventory, || self.inner.list_inventory())
      .await?;
    Ok(result.data)
  }

  /// Document contents (not cached - binary and potentially large).
  pub async fn download_document(&self, document: &Document) -> Result<Vec<u8>, ApiError> {
    self.inner.download_document(document.id).await
  }

  // ==========================================================================
  // Mutations
  // ==========================================================================

  pub async fn create_asset(&self, asset: &NewAsset) -> Result<Asset, ApiError> {
    let created = self.inner.create_asset(asset).await?;
    self.applied(Mutation::AssetCreated { id: created.id });
    Ok(created)
  }

  pub async fn update_asset(&self, id: AssetId, update: &AssetUpdate) -> Result<Asset, ApiError> {
    let updated = self.inner.update_asset(id, update).await?;
    self.applied(Mutation::AssetUpdated { id });
    Ok(updated)
  }

  pub async fn create_work_order(&self, work_order: &NewWorkOrder) -> Result<WorkOrder, ApiError> {
    let created = self.inner.create_work_order(work_order).await?;
    self.applied(Mutation::WorkOrderCreated {
      id: created.id,
      asset_id: created.asset_id,
    });
    Ok(created)
  }

  pub async fn update_work_order(
    &self,
    id: WorkOrderId,
    update: &WorkOrderUpdate,
  ) -> Result<WorkOrder, ApiError> {
    let updated = self.inner.update_work_order(id, update).await?;
    self.applied(Mutation::WorkOrderUpdated {
      id,
      asset_id: updated.asset_id,
    });
    Ok(updated)
  }

  /// Assign a work order. Unknown and inactive users are refused before
  /// any request is made.
  pub async fn assign_work_order(&self, id: WorkOrderId, user: UserId) -> Result<WorkOrder, ApiError> {
    let users = self.users().await?;
    if !users.iter().any(|u| u.id == user && u.is_active) {
      warn!(work_order = id, user, "refusing assignment to inactive or unknown user");
      return Err(ApiError::Invalid(ASSIGNEE_NOT_ACTIVE.to_string()));
    }
    self.update_work_order(id, &WorkOrderUpdate::assign(user)).await
  }

  pub async fn upload_document(
    &self,
    owner: DocumentOwner,
    upload: FileUpload,
  ) -> Result<Document, ApiError> {
    let document = self.inner.upload_document(owner, upload).await?;
    self.applied(Mutation::DocumentsChanged { owner });
    Ok(document)
  }

  pub async fn delete_document(&self, document: &Document) -> Result<(), ApiError> {
    self.inner.delete_document(document.id).await?;
    self.applied(Mutation::DocumentsChanged {
      owner: document.owner,
    });
    Ok(())
  }

  pub async fn update_inventory_item(
    &self,
    id: InventoryItemId,
    quantity: i64,
  ) -> Result<InventoryItem, ApiError> {
    let item = self
      .inner
      .update_inventory_item(id, &InventoryUpdate { quantity })
      .await?;
    self.applied(Mutation::InventoryUpdated { id });
    Ok(item)
  }
}

#[cfg(test)]
pub(crate) mod tests {
  use super::*;
  use crate::cmms::client::RequestPolicy;
  use crate::cmms::fake::FakeBackend;
  use crate::cmms::types::{AssetStatus, WorkOrderStatus};

  pub(crate) fn cached_client(backend: &FakeBackend) -> CachedCmmsClient<FakeBackend> {
    client_with_storage(backend, Box::new(MemoryStorage::new()))
  }

  fn client_with_storage(backend: &FakeBackend, storage: DynStorage) -> CachedCmmsClient<FakeBackend> {
    let inner = CmmsClient::with_transport(
      backend.clone(),
      RequestPolicy {
        timeout: std::time::Duration::from_secs(1),
        max_attempts: 1,
        initial_backoff: std::time::Duration::ZERO,
      },
    );
    CachedCmmsClient::with_parts(inner, CacheLayer::new(storage))
  }

  #[tokio::test]
  async fn test_asset_status_update_refreshes_detail_and_list() {
    let backend = FakeBackend::seeded();
    let client = cached_client(&backend);

    // Warm both views
    let detail = client.asset_details(42).await.unwrap();
    assert_eq!(detail.asset.status, AssetStatus::Operational);
    client.assets().await.unwrap();

    client
      .update_asset(42, &AssetUpdate::status(AssetStatus::MaintenanceRequired))
      .await
      .unwrap();

    let detail = client.asset_details(42).await.unwrap();
    assert_eq!(detail.asset.status, AssetStatus::MaintenanceRequired);
    let list = client.assets().await.unwrap();
    let listed = list.iter().find(|a| a.id == 42).unwrap();
    assert_eq!(listed.status, AssetStatus::MaintenanceRequired);

    assert_eq!(backend.requests("GET /api/assets/42/details"), 2);
    assert_eq!(backend.requests("GET /api/assets"), 2);
  }

  #[tokio::test]
  async fn test_reads_are_cached_until_invalidated() {
    let backend = FakeBackend::seeded();
    let client = cached_client(&backend);

    let first = client.asset_details(42).await.unwrap();
    // Server-side change without a client mutation is not observed
    backend.set_asset_status(42, AssetStatus::Retired);
    let second = client.asset_details(42).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(backend.requests("GET /api/assets/42/details"), 1);
  }

  #[tokio::test]
  async fn test_failed_mutation_leaves_cache_untouched() {
    let backend = FakeBackend::seeded();
    let client = cached_client(&backend);
    client.assets().await.unwrap();
    let epoch = client.cache().epoch();

    backend.fail_next("PUT /api/assets/42", 1, 500);
    let err = client
      .update_asset(42, &AssetUpdate::status(AssetStatus::Retired))
      .await
      .unwrap_err();
    assert_eq!(err.display_message(), "Injected failure");

    assert_eq!(client.cache().epoch(), epoch);
    assert!(client.cache().is_cached(&CmmsQueryKey::Assets));
    client.assets().await.unwrap();
    assert_eq!(backend.requests("GET /api/assets"), 1);
  }

  #[tokio::test]
  async fn test_assignment_invalidates_work_orders_and_owning_asset() {
    let backend = FakeBackend::seeded();
    let client = cached_client(&backend);
    client.work_orders().await.unwrap();
    client.asset_details(42).await.unwrap();
    client.asset_details(7).await.unwrap();

    let updated = client.assign_work_order(2, 5).await.unwrap();
    assert_eq!(updated.assigned_to_id, Some(5));

    assert!(!client.cache().is_cached(&CmmsQueryKey::WorkOrderDetails));
    assert!(!client.cache().is_cached(&CmmsQueryKey::AssetDetail { id: 42 }));
    assert!(client.cache().is_cached(&CmmsQueryKey::AssetDetail { id: 7 }));

    let orders = client.work_orders().await.unwrap();
    let wo = orders.iter().find(|w| w.work_order.id == 2).unwrap();
    assert_eq!(wo.assigned_to.as_ref().unwrap().full_name, "Dana Reyes");
  }

  #[tokio::test]
  async fn test_assigning_inactive_user_is_rejected() {
    let backend = FakeBackend::seeded();
    let client = cached_client(&backend);
    client.work_orders().await.unwrap();

    let err = client.assign_work_order(2, 6).await.unwrap_err();
    assert_eq!(err, ApiError::Invalid("Assignee must be an active user".to_string()));
    assert!(client.cache().is_cached(&CmmsQueryKey::WorkOrderDetails));
    assert_eq!(backend.work_order(2).unwrap().assigned_to_id, None);
    assert_eq!(backend.requests("PUT /api/work-orders/2"), 0);

    // Unknown users are refused the same way
    let err = client.assign_work_order(2, 999).await.unwrap_err();
    assert_eq!(err.display_message(), "Assignee must be an active user");
    assert_eq!(backend.requests("PUT /api/work-orders/2"), 0);
  }

  #[tokio::test]
  async fn test_document_upload_refreshes_owner_list() {
    let backend = FakeBackend::seeded();
    let client = cached_client(&backend);
    let owner = DocumentOwner::Asset(42);
    assert_eq!(client.documents(owner).await.unwrap().len(), 1);

    client
      .upload_document(
        owner,
        FileUpload {
          file_name: "photo.jpg".to_string(),
          content_type: "image/jpeg".to_string(),
          bytes: vec![0; 500],
        },
      )
      .await
      .unwrap();

    let docs = client.documents(owner).await.unwrap();
    assert_eq!(docs.len(), 2);

    client.delete_document(&docs[0]).await.unwrap();
    assert_eq!(client.documents(owner).await.unwrap().len(), 1);
  }

  #[tokio::test]
  async fn test_new_work_order_shows_up_on_asset() {
    let backend = FakeBackend::seeded();
    let client = cached_client(&backend);
    let before = client.asset_details(42).await.unwrap().work_orders.len();

    client
      .create_work_order(&NewWorkOrder {
        title: "Replace seal".to_string(),
        description: None,
        status: WorkOrderStatus::Requested,
        asset_id: Some(42),
        scheduled_date: None,
      })
      .await
      .unwrap();

    let after = client.asset_details(42).await.unwrap().work_orders.len();
    assert_eq!(after, before + 1);
  }

  #[tokio::test]
  async fn test_persisted_cache_is_not_shared_between_servers() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cache.db");

    let plant_a = FakeBackend::seeded();
    let client = client_with_storage(
      &plant_a,
      Box::new(SqliteStorage::open(&path, "https://plant-a.example.com").unwrap()),
    );
    let detail = client.asset_details(42).await.unwrap();
    assert_eq!(detail.asset.status, AssetStatus::Operational);
    drop(client);

    let plant_b = FakeBackend::seeded();
    plant_b.set_asset_status(42, AssetStatus::Retired);
    let client = client_with_storage(
      &plant_b,
      Box::new(SqliteStorage::open(&path, "https://plant-b.example.com").unwrap()),
    );
    let detail = client.asset_details(42).await.unwrap();
    assert_eq!(detail.asset.status, AssetStatus::Retired);
    assert_eq!(plant_b.requests("GET /api/assets/42/details"), 1);

    // Going back to the first server still reads its own persisted entry
    let client = client_with_storage(
      &plant_a,
      Box::new(SqliteStorage::open(&path, "https://plant-a.example.com").unwrap()),
    );
    let detail = client.asset_details(42).await.unwrap();
    assert_eq!(detail.asset.status, AssetStatus::Operational);
    assert_eq!(plant_a.requests("GET /api/assets/42/details"), 1);
  }

  #[test]
  fn test_negative_stale_time_is_rejected() {
    let mut config = Config::from_base_url("http://localhost:5000".to_string());
    config.cache.persist = false;
    config.cache.stale_secs = -5;
    assert!(CachedCmmsClient::new(&config).is_err());
  }

  #[tokio::test]
  async fn test_logout_clears_cache() {
    let backend = FakeBackend::seeded();
    let client = cached_client(&backend);
    client.users().await.unwrap();
    client.logout().await.unwrap();
    assert!(!client.cache().is_cached(&CmmsQueryKey::Users));
  }
}
