//! Typed access to the three record families.
//!
//! Assets, contents and dependency sets share one key namespace; each
//! helper only knows which shape to expect at a key.

use crate::context::TxContext;
use crate::error::LifecycleError;
use crate::model::{Asset, Content, DependencySet};
use reqledger_ledger::RecordKind;

pub(crate) const ASSET: &str = "asset";
pub(crate) const CONTENT: &str = "content";
pub(crate) const DEPENDENCY_SET: &str = "dependency set";

pub fn load_asset(ctx: &TxContext<'_>, id: &str) -> Result<Asset, LifecycleError> {
    ctx.read_record(ASSET, id)
}

pub(crate) fn store_asset(ctx: &mut TxContext<'_>, asset: &Asset) -> Result<(), LifecycleError> {
    ctx.write_record(ASSET, &asset.id, asset)
}

/// ContentStore: text bodies keyed by content id.
pub struct ContentStore;

impl ContentStore {
    pub fn allocate(ctx: &mut TxContext<'_>, text: impl Into<String>) -> Content {
        Content {
            content_id: ctx.next_id(RecordKind::Content),
            text: text.into(),
        }
    }

    pub fn load(ctx: &TxContext<'_>, content_id: &str) -> Result<Content, LifecycleError> {
        ctx.read_record(CONTENT, content_id)
    }

    pub fn store(ctx: &mut TxContext<'_>, content: &Content) -> Result<(), LifecycleError> {
        ctx.write_record(CONTENT, &content.content_id, content)
    }
}

/// DependencySetStore: dependent-id lists keyed by dependency-set id.
pub struct DependencySetStore;

impl DependencySetStore {
    pub fn allocate(ctx: &mut TxContext<'_>, dep_ids: Vec<String>) -> DependencySet {
        DependencySet {
            dep_id: ctx.next_id(RecordKind::DependencySet),
            dep_ids,
        }
    }

    pub fn load(ctx: &TxContext<'_>, dep_id: &str) -> Result<DependencySet, LifecycleError> {
        ctx.read_record(DEPENDENCY_SET, dep_id)
    }

    pub fn store(ctx: &mut TxContext<'_>, set: &DependencySet) -> Result<(), LifecycleError> {
        ctx.write_record(DEPENDENCY_SET, &set.dep_id, set)
    }

    /// Current dependents of an asset, via its `dep_id`.
    pub fn dependents_of(
        ctx: &TxContext<'_>,
        asset: &Asset,
    ) -> Result<Vec<String>, LifecycleError> {
        Ok(Self::load(ctx, &asset.dep_id)?.dep_ids)
    }
}
