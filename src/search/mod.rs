pub mod sidebar;

pub use sidebar::{filter_count, prune_empty_buckets, SidebarRequest, SidebarResponse};
