mod asset_detail;
mod asset_list;
mod document_list;
mod inventory_list;
mod login;
mod resource_list;
mod work_order_list;

pub use asset_detail::AssetDetailView;
pub use asset_list::AssetListView;
pub use document_list::DocumentListView;
pub use inventory_list::InventoryListView;
pub use login::{LoginAction, LoginScreen};
pub use resource_list::ResourceListView;
pub use work_order_list::WorkOrderListView;
