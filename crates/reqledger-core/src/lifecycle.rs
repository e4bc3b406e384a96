//! Asset lifecycle: create, share, update content, read.
//!
//! Per asset the state is `{Created, Shared} × {NotAccessed, Accessed}`.
//! Sharing is idempotent in status; the first `read_asset` latches access
//! and is the only call that emits `assetAccessed`. Nothing reverts.
//!
//! Every operation performs its ledger writes first and emits last. An
//! emission failure is reported but the writes stand.

use crate::context::TxContext;
use crate::error::LifecycleError;
use crate::model::{Asset, Content, Owner};
use crate::payload::{
    AssetAccessedPayload, AssetModifiedPayload, AssetSharedPayload, NewAssetPayload,
};
use crate::records::{ContentStore, DependencySetStore, load_asset, store_asset};

/// Create an asset with its content record and an empty dependency set.
///
/// Fails with `AlreadyExists` before any write when `id` is taken.
pub fn create_asset(
    ctx: &mut TxContext<'_>,
    id: &str,
    owner: Owner,
    text: &str,
) -> Result<(), LifecycleError> {
    if ctx.exists(id)? {
        return Err(LifecycleError::AlreadyExists(id.to_string()));
    }

    let content = ContentStore::allocate(ctx, text);
    let dependents = DependencySetStore::allocate(ctx, Vec::new());
    let create_time = ctx.now();
    let asset = Asset::new(
        id,
        owner,
        &content.content_id,
        &dependents.dep_id,
        &create_time,
    );

    ContentStore::store(ctx, &content)?;
    DependencySetStore::store(ctx, &dependents)?;
    store_asset(ctx, &asset)?;
    tracing::debug!(
        asset = id,
        content = %content.content_id,
        deps = %dependents.dep_id,
        "asset created"
    );

    ctx.emit(&NewAssetPayload {
        asset_id: id.to_string(),
        create_time,
    })
}

/// Share one asset and return its current dependents. Emits nothing.
pub fn share_asset(
    ctx: &mut TxContext<'_>,
    asset_id: &str,
    owner: Owner,
) -> Result<Vec<String>, LifecycleError> {
    share_one(ctx, asset_id, owner).map(|(_, dependents)| dependents)
}

fn share_one(
    ctx: &mut TxContext<'_>,
    asset_id: &str,
    owner: Owner,
) -> Result<(Asset, Vec<String>), LifecycleError> {
    let mut asset = load_asset(ctx, asset_id)?;
    let now = ctx.now();
    asset.share(owner, now);
    store_asset(ctx, &asset)?;
    tracing::debug!(asset = asset_id, share_time = %asset.share_time, "asset shared");

    let dependents = DependencySetStore::dependents_of(ctx, &asset)?;
    Ok((asset, dependents))
}

/// Share each id in order, emitting `assetShared` after each one.
///
/// Not atomic across items: the first failure aborts the batch and earlier
/// items stay shared.
pub fn share_assets_bulk(
    ctx: &mut TxContext<'_>,
    ids: &[String],
    owner: &Owner,
) -> Result<(), LifecycleError> {
    for (index, id) in ids.iter().enumerate() {
        let (asset, dependents) = share_one(ctx, id, owner.clone()).map_err(|err| {
            tracing::warn!(
                asset = %id,
                index,
                total = ids.len(),
                error = %err,
                "bulk share aborted"
            );
            err
        })?;

        ctx.emit(&AssetSharedPayload {
            asset_id: asset.id,
            share_time: asset.share_time,
            dependents,
        })?;
    }
    Ok(())
}

/// Replace an asset's text. The asset record itself is not rewritten.
pub fn update_value(
    ctx: &mut TxContext<'_>,
    id: &str,
    new_text: &str,
) -> Result<(), LifecycleError> {
    let asset = load_asset(ctx, id)?;
    let mut content = ContentStore::load(ctx, &asset.content_id)?;
    content.text = new_text.to_string();
    ContentStore::store(ctx, &content)?;
    tracing::debug!(asset = id, content = %content.content_id, "asset content updated");

    let dependents = DependencySetStore::dependents_of(ctx, &asset)?;
    ctx.emit(&AssetModifiedPayload {
        source_id: asset.id,
        dependents,
    })
}

/// Read an asset, latching first access.
///
/// The first call persists `is_accessed = true` and emits `assetAccessed`;
/// later calls are pure reads.
pub fn read_asset(ctx: &mut TxContext<'_>, id: &str) -> Result<Asset, LifecycleError> {
    let mut asset = load_asset(ctx, id)?;
    let now = ctx.now();
    if !asset.mark_accessed(&now) {
        return Ok(asset);
    }

    store_asset(ctx, &asset)?;
    tracing::debug!(asset = id, read_time = %now, "first access recorded");
    ctx.emit(&AssetAccessedPayload {
        asset_id: asset.id.clone(),
        share_time: asset.share_time.clone(),
        read_time: now,
    })?;
    Ok(asset)
}

/// Pure read. Never writes, never emits.
pub fn get_asset(ctx: &TxContext<'_>, id: &str) -> Result<Asset, LifecycleError> {
    load_asset(ctx, id)
}

/// Pure read of the asset's current content record.
pub fn get_content(ctx: &TxContext<'_>, id: &str) -> Result<Content, LifecycleError> {
    let asset = load_asset(ctx, id)?;
    ContentStore::load(ctx, &asset.content_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AssetStatus;
    use crate::test_support::{FailingLedger, Harness, owner};
    use reqledger_ledger::{KeyValueLedger, MemoryEventSink, SequenceIdSource, StepClock};

    #[test]
    fn create_then_get_returns_fresh_asset() {
        let mut h = Harness::new();
        create_asset(&mut h.ctx(), "req-1", owner("Ada", "Lovelace"), "brake within 50ms")
            .expect("create should succeed");

        let asset = get_asset(&h.ctx(), "req-1").expect("asset should exist");
        assert_eq!(asset.status, AssetStatus::Created);
        assert!(!asset.is_accessed);
        assert_eq!(asset.owner, owner("Ada", "Lovelace"));
        assert_eq!(asset.create_time, "1000");
        assert_eq!(asset.share_time, "");

        let content = get_content(&h.ctx(), "req-1").expect("content should exist");
        assert_eq!(content.text, "brake within 50ms");
        assert_eq!(content.content_id, asset.content_id);

        assert_eq!(h.events.names(), vec!["newAsset"]);
        let payload = h.events.events()[0].payload_json().expect("payload is json");
        assert_eq!(payload["assetid"], "req-1");
        assert_eq!(payload["createtime"], "1000");
    }

    #[test]
    fn create_allocates_distinct_sub_records() {
        let mut h = Harness::new();
        create_asset(&mut h.ctx(), "req-1", owner("A", "B"), "text").expect("create");

        let asset = get_asset(&h.ctx(), "req-1").expect("asset");
        assert_ne!(asset.content_id, asset.dep_id);
        assert!(h.ledger.contains_key(&asset.content_id));
        assert!(h.ledger.contains_key(&asset.dep_id));
        let deps = DependencySetStore::load(&h.ctx(), &asset.dep_id).expect("deps");
        assert!(deps.dep_ids.is_empty());
    }

    #[test]
    fn create_on_existing_id_fails_without_writes() {
        let mut h = Harness::new();
        create_asset(&mut h.ctx(), "req-1", owner("A", "B"), "first").expect("create");
        let writes_before = h.ledger.write_count();
        let snapshot_before = h.ledger.snapshot_ref();

        let err = create_asset(&mut h.ctx(), "req-1", owner("C", "D"), "second")
            .expect_err("duplicate create must fail");
        assert_eq!(err, LifecycleError::AlreadyExists("req-1".to_string()));
        assert_eq!(h.ledger.write_count(), writes_before);
        assert_eq!(h.ledger.snapshot_ref(), snapshot_before);
        assert_eq!(h.events.count("newAsset"), 1);
    }

    #[test]
    fn first_read_latches_access_once() {
        let mut h = Harness::new();
        create_asset(&mut h.ctx(), "req-1", owner("A", "B"), "t").expect("create");
        share_asset(&mut h.ctx(), "req-1", owner("A", "B")).expect("share");

        let first = read_asset(&mut h.ctx(), "req-1").expect("first read");
        assert!(first.is_accessed);
        let writes_after_first = h.ledger.write_count();

        let second = read_asset(&mut h.ctx(), "req-1").expect("second read");
        let third = read_asset(&mut h.ctx(), "req-1").expect("third read");
        assert!(second.is_accessed && third.is_accessed);
        assert_eq!(second.access_time, first.access_time);
        assert_eq!(h.ledger.write_count(), writes_after_first);
        assert_eq!(h.events.count("assetAccessed"), 1);

        let accessed = h
            .events
            .events()
            .iter()
            .find(|event| event.name == "assetAccessed")
            .expect("access event")
            .payload_json()
            .expect("payload is json");
        assert_eq!(accessed["assetid"], "req-1");
        assert_eq!(accessed["sharetime"], first.share_time.as_str());
        assert_eq!(accessed["readtime"], first.access_time.as_str());
    }

    #[test]
    fn get_asset_never_latches_access() {
        let mut h = Harness::new();
        create_asset(&mut h.ctx(), "req-1", owner("A", "B"), "t").expect("create");
        let writes = h.ledger.write_count();

        for _ in 0..3 {
            let asset = get_asset(&h.ctx(), "req-1").expect("get");
            assert!(!asset.is_accessed);
        }
        assert_eq!(h.ledger.write_count(), writes);
        assert_eq!(h.events.count("assetAccessed"), 0);
    }

    #[test]
    fn share_keeps_status_but_refreshes_time_and_owner() {
        let mut h = Harness::new();
        create_asset(&mut h.ctx(), "req-1", owner("A", "B"), "t").expect("create");

        share_asset(&mut h.ctx(), "req-1", owner("Grace", "Hopper")).expect("share");
        let first = get_asset(&h.ctx(), "req-1").expect("get");
        share_asset(&mut h.ctx(), "req-1", owner("Alan", "Turing")).expect("share again");
        let second = get_asset(&h.ctx(), "req-1").expect("get");

        assert_eq!(first.status, AssetStatus::Shared);
        assert_eq!(second.status, AssetStatus::Shared);
        assert_ne!(first.share_time, second.share_time);
        assert_eq!(second.owner, owner("Alan", "Turing"));
        assert!(h.events.events().iter().all(|e| e.name != "assetShared"));
    }

    #[test]
    fn share_missing_asset_is_not_found() {
        let mut h = Harness::new();
        let err = share_asset(&mut h.ctx(), "ghost", owner("A", "B")).expect_err("must fail");
        assert!(matches!(err, LifecycleError::NotFound { key, .. } if key == "ghost"));
        assert_eq!(h.ledger.write_count(), 0);
    }

    #[test]
    fn update_value_rewrites_content_only() {
        let mut h = Harness::new();
        create_asset(&mut h.ctx(), "req-1", owner("A", "B"), "old").expect("create");
        share_asset(&mut h.ctx(), "req-1", owner("A", "B")).expect("share");
        read_asset(&mut h.ctx(), "req-1").expect("read");
        let before = get_asset(&h.ctx(), "req-1").expect("get");

        update_value(&mut h.ctx(), "req-1", "new").expect("update");

        let after = get_asset(&h.ctx(), "req-1").expect("get");
        assert_eq!(after, before);
        assert_eq!(get_content(&h.ctx(), "req-1").expect("content").text, "new");
        assert_eq!(h.events.count("assetModified"), 1);
        let payload = h.events.events().last().expect("event").payload_json().expect("json");
        assert_eq!(payload["source"], "req-1");
        assert_eq!(payload["dependents"], serde_json::json!([]));
    }

    #[test]
    fn update_value_on_missing_asset_is_not_found() {
        let mut h = Harness::new();
        let err = update_value(&mut h.ctx(), "ghost", "x").expect_err("must fail");
        assert_eq!(err.failure_class(), "not_found");
        assert!(h.events.events().is_empty());
    }

    #[test]
    fn corrupt_asset_bytes_are_rejected() {
        let mut h = Harness::new();
        h.ledger.put("req-1", b"{\"id\":\"req-1\"}".to_vec()).expect("seed");

        let err = get_asset(&h.ctx(), "req-1").expect_err("must not decode");
        assert!(matches!(err, LifecycleError::CorruptRecord { kind: "asset", .. }));
        let err = read_asset(&mut h.ctx(), "req-1").expect_err("must not decode");
        assert_eq!(err.failure_class(), "corrupt_record");
    }

    #[test]
    fn emission_failure_keeps_committed_state() {
        let mut ledger = reqledger_ledger::MemoryLedger::new();
        let mut events = MemoryEventSink::rejecting("newAsset");
        let clock = StepClock::new(1000, 10);
        let mut ids = SequenceIdSource::new();

        let mut ctx = TxContext::new(&mut ledger, &mut events, &clock, &mut ids);
        let err = create_asset(&mut ctx, "req-1", owner("A", "B"), "t").expect_err("emit fails");
        assert!(matches!(
            err,
            LifecycleError::EventDeliveryFailed { ref event, .. } if event == "newAsset"
        ));

        let asset = get_asset(&ctx, "req-1").expect("asset should be committed");
        assert_eq!(asset.status, AssetStatus::Created);
        drop(ctx);
        assert!(events.events().is_empty());
    }

    #[test]
    fn storage_failure_aborts_immediately() {
        let mut ledger = FailingLedger::failing_puts_after(1);
        let mut events = MemoryEventSink::new();
        let clock = StepClock::new(1000, 10);
        let mut ids = SequenceIdSource::new();

        let mut ctx = TxContext::new(&mut ledger, &mut events, &clock, &mut ids);
        let err = create_asset(&mut ctx, "req-1", owner("A", "B"), "t").expect_err("must fail");
        assert_eq!(err.failure_class(), "storage_unavailable");
        drop(ctx);
        assert!(events.events().is_empty());
        assert_eq!(ledger.inner.len(), 1);
    }
}
