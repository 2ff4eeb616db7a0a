pub mod footer;
pub mod format;
pub mod header;
pub mod utils;

pub use footer::draw_footer;
pub use format::{
  format_file_size, format_optional_currency, format_optional_date, status_label, EMPTY,
};
pub use header::draw_header;
pub use utils::{asset_status_color, ensure_valid_selection, truncate, work_order_status_color};
