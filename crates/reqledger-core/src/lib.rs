//! # reqledger-core
//!
//! State-and-event engine for requirement assets.
//!
//! An asset is stored as three ledger records: the asset itself, its text
//! ([`Content`]) and its outgoing edges ([`DependencySet`]). Operations take a
//! [`TxContext`] carrying the ledger, event sink, clock and key allocator for
//! one invocation, write first and emit last.
//!
//! ## Operations
//!
//! - lifecycle: [`create_asset`], [`share_asset`], [`share_assets_bulk`],
//!   [`update_value`], [`read_asset`], [`get_asset`], [`get_content`]
//! - graph: [`create_dependent`], [`link_dependent`], [`trace_dependencies`]

pub mod context;
pub mod error;
pub mod graph;
pub mod lifecycle;
pub mod model;
pub mod payload;
pub mod records;

#[cfg(test)]
mod test_support;

pub use context::TxContext;
pub use error::LifecycleError;
pub use graph::{
    DependencyEdge, DependencyTrace, create_dependent, link_dependent, trace_dependencies,
};
pub use lifecycle::{
    create_asset, get_asset, get_content, read_asset, share_asset, share_assets_bulk,
    update_value,
};
pub use model::{Asset, AssetStatus, Content, DependencySet, Owner};
pub use payload::{
    AssetAccessedPayload, AssetModifiedPayload, AssetSharedPayload, EventName, EventPayload,
    NewAssetPayload,
};
pub use records::{ContentStore, DependencySetStore, load_asset};
