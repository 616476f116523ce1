//! Shared identity and block types for pagecraft.
//!
//! This crate is the foundation of the page model: typed IDs, the closed set
//! of block kinds with their content schemas, fractional order keys, and
//! schema validation. It has **no internal pagecraft dependencies**, a pure
//! leaf crate that the store and kernel build on.
//!
//! # Key Types
//!
//! |-------------------|----------------------------------------------|
//! | Type              | Purpose                                      |
//! |-------------------|----------------------------------------------|
//! | [`BlockId`]       | Stable block identity (UUIDv7)               |
//! | [`PageId`]        | Which page (= document)                      |
//! | [`BlockKind`]     | Section type (hero, about, ..., generic)     |
//! | [`BlockContent`]  | Content sum type keyed by kind               |
//! | [`OrderKey`]      | Fractional rank among a page's blocks        |
//! | [`Block`]         | Stored block (id + order + content + meta)   |
//! | [`NewBlock`]      | Block about to be inserted                   |
//! |-------------------|----------------------------------------------|

pub mod block;
pub mod ids;
pub mod order;
pub mod schema;

pub use block::{
    AboutContent, Block, BlockContent, BlockKind, ContactContent, CtaContent, GenericContent,
    HeroContent, NewBlock, Provenance, ServiceItem, ServicesContent,
};
pub use ids::{BlockId, PageId};
pub use order::{InvalidOrderKey, OrderKey};
pub use schema::ValidationError;

/// Current time as Unix milliseconds.
pub fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
