//! PDF manipulation module

pub mod letterhead;
pub mod metadata;
pub mod stamp;
mod objects;

// Re-export commonly used items
pub use letterhead::Letterhead;
pub use metadata::page_count;
pub use stamp::{stamp_document, Transform};
