//! Cache keys for maintenance API reads and the invalidation rules for
//! every mutation.

use crate::cache::{Invalidation, QueryKey};

use super::types::{AssetId, DocumentOwner, InventoryItemId, WorkOrderId};

/// Prefix shared by every asset detail key (and nothing else)
const ASSET_DETAIL_PREFIX: &str = "/api/assets/";

/// Cacheable reads, keyed by resource path.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum CmmsQueryKey {
  Users,
  Assets,
  AssetDetail { id: AssetId },
  WorkOrderDetails,
  Documents { owner: DocumentOwner },
  Inventory,
}

impl QueryKey for CmmsQueryKey {
  fn cache_key(&self) -> String {
    match self {
      Self::Users => "/api/users".to_string(),
      Self::Assets => "/api/assets".to_string(),
      Self::AssetDetail { id } => format!("{}{}/details", ASSET_DETAIL_PREFIX, id),
      Self::WorkOrderDetails => "/api/work-orders/details".to_string(),
      Self::Documents { owner } => {
        format!("/api/documents/{}/{}", owner.entity_type(), owner.entity_id())
      }
      Self::Inventory => "/api/inventory".to_string(),
    }
  }

  fn description(&self) -> String {
    match self {
      Self::Users => "users".to_string(),
      Self::Assets => "asset list".to_string(),
      Self::AssetDetail { id } => format!("asset {} details", id),
      Self::WorkOrderDetails => "work orders with details".to_string(),
      Self::Documents { owner } => format!("documents for {}", owner),
      Self::Inventory => "inventory".to_string(),
    }
  }
}

/// A successful write, described by what it touched.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Mutation {
  AssetCreated { id: AssetId },
  AssetUpdated { id: AssetId },
  WorkOrderCreated { id: WorkOrderId, asset_id: Option<AssetId> },
  WorkOrderUpdated { id: WorkOrderId, asset_id: Option<AssetId> },
  DocumentsChanged { owner: DocumentOwner },
  InventoryUpdated { id: InventoryItemId },
}

impl Mutation {
  /// Every key holding a copy of the changed entity.
  pub fn invalidations(&self) -> Vec<Invalidation> {
    match self {
      // Children embed their parent's summary and work orders embed the
      // asset's, so every asset detail and the work order list go too.
      Mutation::AssetCreated { .. } | Mutation::AssetUpdated { .. } => vec![
        Invalidation::key(&CmmsQueryKey::Assets),
        Invalidation::Prefix(ASSET_DETAIL_PREFIX.to_string()),
        Invalidation::key(&CmmsQueryKey::WorkOrderDetails),
      ],
      Mutation::WorkOrderCreated { asset_id, .. } | Mutation::WorkOrderUpdated { asset_id, .. } => {
        let asset = match asset_id {
          Some(id) => Invalidation::key(&CmmsQueryKey::AssetDetail { id: *id }),
          None => Invalidation::Prefix(ASSET_DETAIL_PREFIX.to_string()),
        };
        vec![Invalidation::key(&CmmsQueryKey::WorkOrderDetails), asset]
      }
      Mutation::DocumentsChanged { owner } => {
        vec![Invalidation::key(&CmmsQueryKey::Documents { owner: *owner })]
      }
      Mutation::InventoryUpdated { .. } => vec![Invalidation::key(&CmmsQueryKey::Inventory)],
    }
  }
}
