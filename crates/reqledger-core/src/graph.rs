//! Dependency graph wiring and traversal.

use std::collections::{BTreeSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::context::TxContext;
use crate::error::LifecycleError;
use crate::model::Asset;
use crate::records::{DependencySetStore, load_asset, store_asset};

/// Replace `from_id`'s outgoing edges with `to_ids`, in order.
///
/// A new dependency set is always allocated; the previous one stays in the
/// ledger unreferenced. Targets are not checked for existence.
pub fn create_dependent(
    ctx: &mut TxContext<'_>,
    from_id: &str,
    to_ids: Vec<String>,
) -> Result<Asset, LifecycleError> {
    let mut asset = load_asset(ctx, from_id)?;
    let set = DependencySetStore::allocate(ctx, to_ids);
    DependencySetStore::store(ctx, &set)?;

    let previous = std::mem::replace(&mut asset.dep_id, set.dep_id.clone());
    store_asset(ctx, &asset)?;
    tracing::debug!(
        asset = from_id,
        deps = %set.dep_id,
        orphaned = %previous,
        count = set.dep_ids.len(),
        "dependency set replaced"
    );
    Ok(asset)
}

/// Single-target form of [`create_dependent`]; `to_id` must be an asset.
pub fn link_dependent(
    ctx: &mut TxContext<'_>,
    from_id: &str,
    to_id: &str,
) -> Result<Asset, LifecycleError> {
    load_asset(ctx, from_id)?;
    load_asset(ctx, to_id)?;
    create_dependent(ctx, from_id, vec![to_id.to_string()])
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyEdge {
    pub from: String,
    pub to: String,
}

/// Result of a breadth-first walk over current dependency sets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyTrace {
    pub root: String,
    /// Assets reached, root first, in discovery order.
    pub visited: Vec<String>,
    pub edges: Vec<DependencyEdge>,
    /// Referenced ids with no ledger record.
    pub dangling: Vec<String>,
}

/// Walk dependency sets breadth-first from `root_id`, visiting each asset once.
///
/// Ids with no ledger record are collected in `dangling`. An id whose record
/// exists but does not decode as an asset (a content or dependency-set key,
/// say) stops the walk with `CorruptRecord`.
pub fn trace_dependencies(
    ctx: &TxContext<'_>,
    root_id: &str,
) -> Result<DependencyTrace, LifecycleError> {
    let root = load_asset(ctx, root_id)?;

    let mut trace = DependencyTrace {
        root: root_id.to_string(),
        visited: vec![root_id.to_string()],
        edges: Vec::new(),
        dangling: Vec::new(),
    };
    let mut seen: BTreeSet<String> = BTreeSet::from([root_id.to_string()]);
    let mut queue: VecDeque<Asset> = VecDeque::from([root]);

    while let Some(asset) = queue.pop_front() {
        for target in DependencySetStore::dependents_of(ctx, &asset)? {
            trace.edges.push(DependencyEdge {
                from: asset.id.clone(),
                to: target.clone(),
            });
            if !seen.insert(target.clone()) {
                continue;
            }
            if !ctx.exists(&target)? {
                trace.dangling.push(target);
                continue;
            }
            queue.push_back(load_asset(ctx, &target)?);
            trace.visited.push(target);
        }
    }

    tracing::debug!(
        root = root_id,
        visited = trace.visited.len(),
        dangling = trace.dangling.len(),
        "dependency trace complete"
    );
    Ok(trace)
}
