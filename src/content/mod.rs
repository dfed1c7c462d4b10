//! Content ingestion and the page hierarchy.

pub mod hierarchy;
pub mod page;

pub use hierarchy::ContentHierarchy;
pub use page::{FrontMatter, IndexMeta, Page};
