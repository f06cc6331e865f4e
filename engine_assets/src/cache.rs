//! Shared, thread-safe front of the resource manager.
//!
//! Every operation takes the single manager lock for its whole duration, so
//! handle allocation and record insertion are never observed separately and
//! loaders run one at a time. Unloaders are the exception: they run after
//! the lock is released, so they may call back into the cache. Loaders are
//! blocking; `load_async` moves them onto tokio's blocking pool so async
//! callers are not stalled.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tracing::debug;

use crate::asset::{Asset, AssetKind};
use crate::config::EngineConfig;
use crate::error::ResourceError;
use crate::record::{ResourceHandle, ResourceInfo};
use crate::resources::{CacheStats, PendingUnload, ResourceManager};
use crate::wrapper::{load_resource, ResourceWrapper};

/// Cheaply clonable handle to one [`ResourceManager`].
///
/// The manager shuts down (force-releasing leaks) when the last clone drops.
#[derive(Clone)]
pub struct ResourceCache {
    inner: Arc<Mutex<ResourceManager>>,
}

impl ResourceCache {
    pub fn new(manager: ResourceManager) -> Self {
        Self {
            inner: Arc::new(Mutex::new(manager)),
        }
    }

    pub fn from_config(cfg: &EngineConfig) -> Result<Self, ResourceError> {
        Ok(Self::new(ResourceManager::from_config(cfg)?))
    }

    /// The table is consistent between statements, so a panic in a loader
    /// does not invalidate it.
    pub(crate) fn lock(&self) -> MutexGuard<'_, ResourceManager> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn downgrade(&self) -> Weak<Mutex<ResourceManager>> {
        Arc::downgrade(&self.inner)
    }

    pub(crate) fn upgrade(weak: &Weak<Mutex<ResourceManager>>) -> Option<Self> {
        weak.upgrade().map(|inner| Self { inner })
    }

    pub fn load(&self, path: &str) -> Result<ResourceHandle, ResourceError> {
        self.lock().load(path)
    }

    pub fn unload(&self, handle: ResourceHandle) -> Result<(), ResourceError> {
        let pending = self.lock().release(handle)?;
        if let Some(pending) = pending {
            pending.run();
        }
        Ok(())
    }

    /// Shared payload for `handle`; `None` if it is not loaded.
    pub fn get(&self, handle: ResourceHandle) -> Option<Asset> {
        self.lock().get(handle).cloned()
    }

    pub fn get_as<T: AssetKind>(&self, handle: ResourceHandle) -> Result<Arc<T>, ResourceError> {
        self.lock().get_as(handle)
    }

    /// Loads `path` and wraps it in an auto-releasing [`ResourceWrapper`].
    pub fn load_wrapped<T: AssetKind>(&self, path: &str) -> Result<ResourceWrapper<T>, ResourceError> {
        load_resource(self, path)
    }

    /// Runs the blocking load on tokio's blocking pool.
    pub async fn load_async(&self, path: impl Into<String>) -> Result<ResourceHandle, ResourceError> {
        let path = path.into();
        let cache = self.clone();
        let task_path = path.clone();
        tokio::task::spawn_blocking(move || cache.load(&task_path))
            .await
            .map_err(|err| ResourceError::LoadFailed {
                path,
                reason: format!("load task failed: {}", err),
            })?
    }

    /// Loads many paths concurrently; results come back in input order.
    pub async fn preload<I, S>(&self, paths: I) -> Vec<Result<ResourceHandle, ResourceError>>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tasks: Vec<_> = paths
            .into_iter()
            .map(|path| {
                let cache = self.clone();
                let path: String = path.into();
                let task_path = path.clone();
                (path, tokio::spawn(async move { cache.load_async(task_path).await }))
            })
            .collect();

        let mut results = Vec::with_capacity(tasks.len());
        for (path, task) in tasks {
            results.push(match task.await {
                Ok(result) => result,
                Err(err) => Err(ResourceError::LoadFailed {
                    path,
                    reason: format!("preload task failed: {}", err),
                }),
            });
        }
        debug!(count = results.len(), "Preload finished");
        results
    }

    pub fn contains(&self, handle: ResourceHandle) -> bool {
        self.lock().contains(handle)
    }

    pub fn ref_count(&self, handle: ResourceHandle) -> Option<u32> {
        self.lock().ref_count(handle)
    }

    pub fn handle_of(&self, path: &str) -> Option<ResourceHandle> {
        self.lock().handle_of(path)
    }

    pub fn records(&self) -> Vec<ResourceInfo> {
        self.lock().records()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.lock().stats()
    }

    /// Force-releases everything still loaded. See [`ResourceManager::shutdown`].
    pub fn shutdown(&self) -> usize {
        let pending = self.lock().drain();
        let leaked = pending.len();
        pending.into_iter().for_each(PendingUnload::run);
        leaked
    }
}
