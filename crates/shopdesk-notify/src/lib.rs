pub mod broadcast;
pub mod labels;
pub mod notifier;
pub mod reload;

pub use broadcast::{BroadcastReport, Broadcaster};
pub use labels::{
    admin_status_text, category_added_text, customer_status_text, escape_html, new_product_text,
    post_text, status_label,
};
pub use notifier::{NotifyOutcome, StatusNotifier};
pub use reload::CatalogReloader;
