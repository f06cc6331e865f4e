//! Lifecycle properties of the resource manager and its wrappers.

use std::collections::HashSet;

use engine_assets::prelude::*;
use engine_tests::{counting_cache, counting_manager, init_tracing};

#[test]
fn live_handles_are_unique() {
    init_tracing();
    let (mut manager, _calls) = counting_manager();
    let mut live = HashSet::new();
    for round in 0..4 {
        for i in 0..16 {
            let handle = manager.load(&format!("r{}/m{}.model", round, i)).unwrap();
            assert!(live.insert(handle), "handle {} issued twice", handle);
        }
        // Free every other handle so later rounds run with gaps.
        let to_free: Vec<ResourceHandle> = live.iter().copied().step_by(2).collect();
        for handle in to_free {
            manager.unload(handle).unwrap();
            live.remove(&handle);
        }
    }
    assert_eq!(manager.len(), live.len());
}

#[test]
fn repeated_load_is_deduplicated() {
    let (mut manager, calls) = counting_manager();
    let first = manager.load("props/barrel.model").unwrap();
    let second = manager.load("props/barrel.model").unwrap();
    assert_eq!(first, second);
    assert_eq!(calls.loads(), 1);
    assert_eq!(manager.ref_count(first), Some(2));
}

#[test]
fn unloader_runs_once_after_last_release() {
    let (mut manager, calls) = counting_manager();
    let h = manager.load("p.model").unwrap();
    manager.load("p.model").unwrap();

    manager.unload(h).unwrap();
    assert!(manager.get(h).is_some());
    assert_eq!(calls.unloads(), 0);

    manager.unload(h).unwrap();
    assert!(manager.get(h).is_none());
    assert_eq!(calls.unloads(), 1);

    // A third release must not double-free.
    assert_eq!(manager.unload(h), Err(ResourceError::InvalidHandle(h)));
    assert_eq!(calls.unloads(), 1);
}

#[test]
fn unknown_extension_creates_no_record() {
    let (mut manager, calls) = counting_manager();
    let err = manager.load("asset.unknownext").unwrap_err();
    assert_eq!(
        err,
        ResourceError::UnsupportedFormat {
            path: "asset.unknownext".into(),
            extension: "unknownext".into(),
        }
    );
    assert!(manager.is_empty());
    assert_eq!(calls.loads(), 0);
}

#[test]
fn failing_loader_creates_no_record() {
    let (mut manager, calls) = counting_manager();
    let err = manager.load("missing.model").unwrap_err();
    assert!(matches!(err, ResourceError::LoadFailed { ref path, .. } if path == "missing.model"));
    assert!(manager.is_empty());
    assert_eq!(calls.loads(), 1);

    // A failed load leaves nothing behind to dedup against.
    assert!(manager.load("missing.model").is_err());
    assert_eq!(calls.loads(), 2);
}

#[test]
fn get_on_unknown_handle_is_none() {
    let (manager, _calls) = counting_manager();
    let handle = ResourceHandle::from_raw(42).unwrap();
    assert!(manager.get(handle).is_none());
    assert!(!manager.contains(handle));
}

#[test]
fn wrapper_release_is_idempotent() {
    let (cache, calls) = counting_cache();
    let mut wrapper = load_resource::<Model>(&cache, "crate.model").unwrap();
    let before = cache.stats().unload_calls;

    wrapper.release();
    wrapper.release();
    drop(wrapper);

    assert_eq!(cache.stats().unload_calls, before + 1);
    assert_eq!(calls.unloads(), 1);
}

#[test]
fn wrapper_releases_on_early_return() {
    fn use_then_bail(cache: &ResourceCache) -> Result<(), ResourceError> {
        let _model = load_resource::<Model>(cache, "crate.model")?;
        let _other = load_resource::<Model>(cache, "missing.model")?;
        Ok(())
    }

    let (cache, calls) = counting_cache();
    assert!(use_then_bail(&cache).is_err());
    assert!(cache.is_empty());
    assert_eq!(calls.unloads(), 1);
}

#[test]
fn shutdown_sweeps_leaked_handles() {
    init_tracing();
    let (mut manager, calls) = counting_manager();
    manager.load("a.model").unwrap();
    manager.load("b.model").unwrap();
    manager.load("c.model").unwrap();

    assert_eq!(manager.shutdown(), 3);
    assert_eq!(calls.unloads(), 3);
    assert!(manager.is_empty());
    assert!(manager.records().is_empty());
}

#[test]
fn dropping_the_manager_sweeps_too() {
    let (mut manager, calls) = counting_manager();
    manager.load("a.model").unwrap();
    manager.load("b.model").unwrap();
    manager.load("c.model").unwrap();
    drop(manager);
    assert_eq!(calls.unloads(), 3);
}

#[test]
fn wrapper_outliving_cache_is_harmless() {
    let (cache, calls) = counting_cache();
    let wrapper = load_resource::<Model>(&cache, "crate.model").unwrap();
    drop(cache);
    assert_eq!(calls.unloads(), 1);
    assert!(wrapper.is_live());
    drop(wrapper);
    assert_eq!(calls.unloads(), 1);
}
