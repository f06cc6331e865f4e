//! Resource management system.
//!
//! `ResourceManager` owns every loaded asset and hands out
//! [`ResourceHandle`]s as the external currency. Loads are deduplicated by
//! normalized path and reference counted; the registered unloader runs when
//! the last reference is released, or at shutdown for anything leaked.
//!
//! The manager itself is single-threaded (`&mut self` for every mutation).
//! Wrap it in a [`ResourceCache`](crate::cache::ResourceCache) to share it
//! across threads or to hand out auto-releasing wrappers.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::asset::{Asset, AssetKind};
use crate::config::EngineConfig;
use crate::dispatch::{DispatchTable, FnLoader, LoadContext, ResourceLoader};
use crate::error::ResourceError;
use crate::loaders::register_default_loaders;
use crate::path::{extension_of, normalize_path};
use crate::record::{ManagedResource, ResourceHandle, ResourceInfo};

/// Running counters, mostly for diagnostics and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Times a loader strategy was invoked (successfully or not).
    pub loader_calls: u64,
    /// Loads satisfied by an existing record.
    pub dedup_hits: u64,
    /// Calls to `unload`, including rejected ones.
    pub unload_calls: u64,
    /// Times an unloader strategy was invoked.
    pub unloader_calls: u64,
    /// Records force-released at shutdown.
    pub leaked: u64,
}

/// Bootstrap-time configuration of a [`ResourceManager`].
///
/// Extension registration is only possible here; the dispatch table is
/// frozen once [`build`](Self::build) runs.
pub struct ResourceManagerBuilder {
    data_root: PathBuf,
    dispatch: DispatchTable,
}

impl ResourceManagerBuilder {
    pub fn new(data_root: impl Into<PathBuf>) -> Self {
        Self {
            data_root: data_root.into(),
            dispatch: DispatchTable::new(),
        }
    }

    /// Registers a loader strategy for `extension`.
    pub fn with_loader(
        self,
        extension: &str,
        loader: impl ResourceLoader + 'static,
    ) -> Result<Self, ResourceError> {
        self.with_shared_loader(extension, Arc::new(loader))
    }

    /// Registers a loader shared between several extensions.
    pub fn with_shared_loader(
        mut self,
        extension: &str,
        loader: Arc<dyn ResourceLoader>,
    ) -> Result<Self, ResourceError> {
        self.dispatch.register(extension, loader)?;
        Ok(self)
    }

    /// Registers a load/unload closure pair.
    pub fn with_fns<L, U>(self, extension: &str, load: L, unload: U) -> Result<Self, ResourceError>
    where
        L: Fn(&LoadContext<'_>, &Path) -> anyhow::Result<Asset> + Send + Sync + 'static,
        U: Fn(Asset) + Send + Sync + 'static,
    {
        self.with_loader(extension, FnLoader::new(load, unload))
    }

    /// Registers the built-in model and texture loaders.
    pub fn with_default_loaders(mut self) -> Result<Self, ResourceError> {
        register_default_loaders(&mut self.dispatch)?;
        Ok(self)
    }

    pub fn build(self) -> ResourceManager {
        debug!(
            data_root = %self.data_root.display(),
            extensions = ?self.dispatch.extensions(),
            "Resource manager ready"
        );
        ResourceManager {
            data_root: self.data_root,
            dispatch: self.dispatch,
            records: HashMap::new(),
            by_path: HashMap::new(),
            next_handle: 0,
            stats: CacheStats::default(),
        }
    }
}

/// Handle-indexed, reference-counted asset cache.
pub struct ResourceManager {
    data_root: PathBuf,
    dispatch: DispatchTable,
    records: HashMap<ResourceHandle, ManagedResource>,
    /// Normalized path -> handle; mirrors `records` exactly.
    by_path: HashMap<String, ResourceHandle>,
    next_handle: u32,
    stats: CacheStats,
}

impl ResourceManager {
    pub fn builder(data_root: impl Into<PathBuf>) -> ResourceManagerBuilder {
        ResourceManagerBuilder::new(data_root)
    }

    /// Manager with the built-in loaders, rooted at the configured data root.
    pub fn from_config(cfg: &EngineConfig) -> Result<Self, ResourceError> {
        Ok(Self::builder(&cfg.data_root).with_default_loaders()?.build())
    }

    /// Loads `path` (relative to the data root) or takes another reference to
    /// it if it is already loaded.
    pub fn load(&mut self, path: &str) -> Result<ResourceHandle, ResourceError> {
        let normalized = normalize_path(path);

        if let Some(&handle) = self.by_path.get(&normalized) {
            if let Some(record) = self.records.get_mut(&handle) {
                let Some(refs) = record.ref_count.checked_add(1) else {
                    warn!(%handle, path = %normalized, "Reference count saturated, refusing load");
                    return Err(ResourceError::RefCountOverflow(handle));
                };
                record.ref_count = refs;
                self.stats.dedup_hits += 1;
                debug!(%handle, path = %normalized, refs = record.ref_count, "Resource cache hit");
                return Ok(handle);
            }
            self.by_path.remove(&normalized);
        }

        let extension = extension_of(&normalized);
        let loader = self.dispatch.resolve(&normalized, &extension)?;
        let disk_path = self.data_root.join(&normalized);
        let ctx = LoadContext {
            data_root: &self.data_root,
            asset_path: &normalized,
            extension: &extension,
        };

        self.stats.loader_calls += 1;
        let payload = loader.load(&ctx, &disk_path).map_err(|err| {
            debug!(path = %normalized, error = %format!("{:#}", err), "Loader failed");
            ResourceError::LoadFailed {
                path: normalized.clone(),
                reason: format!("{:#}", err),
            }
        })?;

        let handle = self.allocate_handle();
        info!(
            %handle,
            path = %normalized,
            kind = %payload.kind(),
            bytes = payload.memory_bytes(),
            "Loaded resource"
        );
        self.by_path.insert(normalized.clone(), handle);
        self.records
            .insert(handle, ManagedResource::new(handle, normalized, extension, payload));
        Ok(handle)
    }

    /// Releases one reference; the unloader runs when the count reaches zero.
    pub fn unload(&mut self, handle: ResourceHandle) -> Result<(), ResourceError> {
        if let Some(pending) = self.release(handle)? {
            pending.run();
        }
        Ok(())
    }

    /// Releases one reference without running the unloader. At zero the
    /// record is removed and returned for the caller to finish.
    pub(crate) fn release(
        &mut self,
        handle: ResourceHandle,
    ) -> Result<Option<PendingUnload>, ResourceError> {
        self.stats.unload_calls += 1;
        let mut entry = match self.records.entry(handle) {
            Entry::Occupied(entry) => entry,
            Entry::Vacant(_) => {
                debug!(%handle, "Unload of unknown handle");
                return Err(ResourceError::InvalidHandle(handle));
            }
        };

        let record = entry.get_mut();
        record.ref_count -= 1;
        if record.ref_count > 0 {
            debug!(%handle, path = %record.path, refs = record.ref_count, "Released resource reference");
            return Ok(None);
        }

        let record = entry.remove();
        self.by_path.remove(&record.path);
        info!(%handle, path = %record.path, "Unloading resource");
        Ok(Some(self.detach(record)))
    }

    /// Payload for `handle`, or `None` if nothing is loaded under it.
    pub fn get(&self, handle: ResourceHandle) -> Option<&Asset> {
        self.records.get(&handle).map(|r| &r.payload)
    }

    /// Typed payload for `handle`.
    pub fn get_as<T: AssetKind>(&self, handle: ResourceHandle) -> Result<Arc<T>, ResourceError> {
        let asset = self
            .get(handle)
            .ok_or(ResourceError::InvalidHandle(handle))?;
        T::from_asset(asset).ok_or(ResourceError::WrongKind {
            handle,
            expected: T::TAG,
            found: asset.kind(),
        })
    }

    pub fn contains(&self, handle: ResourceHandle) -> bool {
        self.records.contains_key(&handle)
    }

    pub fn ref_count(&self, handle: ResourceHandle) -> Option<u32> {
        self.records.get(&handle).map(|r| r.ref_count)
    }

    pub fn path_of(&self, handle: ResourceHandle) -> Option<&str> {
        self.records.get(&handle).map(|r| r.path.as_str())
    }

    /// Handle currently loaded for `path`, if any. Does not take a reference.
    pub fn handle_of(&self, path: &str) -> Option<ResourceHandle> {
        self.by_path.get(&normalize_path(path)).copied()
    }

    /// Snapshot of all live records, ordered by handle.
    pub fn records(&self) -> Vec<ResourceInfo> {
        let mut infos: Vec<ResourceInfo> = self.records.values().map(ManagedResource::info).collect();
        infos.sort_by_key(|info| info.handle);
        infos
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    pub fn extensions(&self) -> Vec<&str> {
        self.dispatch.extensions()
    }

    /// Force-releases every remaining record, in handle order, regardless of
    /// its reference count. Returns how many records were leaked.
    pub fn shutdown(&mut self) -> usize {
        let pending = self.drain();
        let leaked = pending.len();
        pending.into_iter().for_each(PendingUnload::run);
        leaked
    }

    /// Removes every record for [`shutdown`](Self::shutdown), leaving the
    /// unloaders to the caller.
    pub(crate) fn drain(&mut self) -> Vec<PendingUnload> {
        if self.records.is_empty() {
            return Vec::new();
        }
        let mut handles: Vec<ResourceHandle> = self.records.keys().copied().collect();
        handles.sort_unstable();

        let mut pending = Vec::with_capacity(handles.len());
        for handle in handles {
            if let Some(record) = self.records.remove(&handle) {
                warn!(
                    %handle,
                    path = %record.path,
                    refs = record.ref_count,
                    "Resource still referenced at shutdown, forcing release"
                );
                pending.push(self.detach(record));
            }
        }
        self.by_path.clear();
        self.stats.leaked += pending.len() as u64;
        warn!(leaked = pending.len(), "Resource manager shut down with leaks");
        pending
    }

    fn allocate_handle(&mut self) -> ResourceHandle {
        loop {
            self.next_handle = self.next_handle.wrapping_add(1);
            if let Some(handle) = ResourceHandle::from_raw(self.next_handle) {
                if !self.records.contains_key(&handle) {
                    return handle;
                }
            }
        }
    }

    fn detach(&mut self, record: ManagedResource) -> PendingUnload {
        self.stats.unloader_calls += 1;
        PendingUnload {
            loader: self.dispatch.get(&record.extension).cloned(),
            payload: record.payload,
        }
    }
}

/// A record already removed from the table whose unloader has not run.
///
/// The cache finishes these after dropping its lock, so unloaders may call
/// back into it.
pub(crate) struct PendingUnload {
    loader: Option<Arc<dyn ResourceLoader>>,
    payload: Asset,
}

impl PendingUnload {
    pub(crate) fn run(self) {
        match self.loader {
            Some(loader) => loader.unload(self.payload),
            None => drop(self.payload),
        }
    }
}

impl Drop for ResourceManager {
    fn drop(&mut self) {
        self.shutdown();
    }
}
