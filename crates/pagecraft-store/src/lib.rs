//! Ordered block store for pagecraft pages.
//!
//! A page is an ordered collection of typed blocks. [`BlockStore`] owns the
//! blocks of one page and enforces its invariants:
//!
//! - block IDs are unique within the page and never reused after removal
//! - order keys are unique, so document order is total
//! - every stored block's content conforms to its kind's schema
//! - a block's kind never changes, only its content
//!
//! The store is synchronous and single-owner; sharing and events are layered
//! on top by `pagecraft-kernel`.

mod block_store;
mod error;

pub use block_store::{BlockStore, PageSnapshot, Position};
pub use error::StoreError;

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
