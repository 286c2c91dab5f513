pub mod alert_store;
pub mod timeline_store;

pub use alert_store::AlertStore;
pub use timeline_store::TimelineStore;
