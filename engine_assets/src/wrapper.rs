//! Scoped ownership of one resource reference.

use std::fmt;
use std::sync::{Arc, Mutex, Weak};

use tracing::{debug, warn};

use crate::asset::AssetKind;
use crate::cache::ResourceCache;
use crate::error::ResourceError;
use crate::record::ResourceHandle;
use crate::resources::ResourceManager;

/// Holds one reference to a loaded resource and releases it exactly once,
/// on [`release`](Self::release) or when dropped.
///
/// The back-reference to the cache is weak: a wrapper never keeps the cache
/// alive, and releasing after the cache shut down is a no-op.
pub struct ResourceWrapper<T: AssetKind> {
    cache: Weak<Mutex<ResourceManager>>,
    handle: Option<ResourceHandle>,
    asset: Option<Arc<T>>,
}

impl<T: AssetKind> ResourceWrapper<T> {
    /// Takes over one already-acquired reference to `handle`. Performs no
    /// I/O; if `asset` is `None` the payload is looked up in the cache.
    pub fn new(cache: &ResourceCache, handle: ResourceHandle, asset: Option<Arc<T>>) -> Self {
        let asset = asset.or_else(|| cache.get_as::<T>(handle).ok());
        Self {
            cache: cache.downgrade(),
            handle: Some(handle),
            asset,
        }
    }

    /// The payload, or `None` once released.
    pub fn get(&self) -> Option<&T> {
        self.asset.as_deref()
    }

    /// Shared payload for callers that need to hold it past a borrow.
    pub fn asset(&self) -> Option<Arc<T>> {
        self.asset.clone()
    }

    pub fn handle(&self) -> Option<ResourceHandle> {
        self.handle
    }

    pub fn is_live(&self) -> bool {
        self.handle.is_some()
    }

    /// Releases the reference. Only the first call reaches the cache.
    pub fn release(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        self.asset = None;
        let weak = std::mem::take(&mut self.cache);
        match ResourceCache::upgrade(&weak) {
            Some(cache) => {
                if let Err(err) = cache.unload(handle) {
                    warn!(%handle, error = %err, "Wrapper release failed");
                }
            }
            None => debug!(%handle, "Cache gone before wrapper release"),
        }
    }
}

impl<T: AssetKind> Drop for ResourceWrapper<T> {
    fn drop(&mut self) {
        self.release();
    }
}

impl<T: AssetKind> fmt::Debug for ResourceWrapper<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceWrapper")
            .field("kind", &T::TAG)
            .field("handle", &self.handle)
            .finish()
    }
}

/// Loads `path` and returns a wrapper over it, or an error and no wrapper.
///
/// Load and typed lookup happen under one lock. If the asset turns out to
/// be of another kind, the reference taken by the load is given back before
/// the error is returned; its unloader, if due, runs after the lock drops.
pub fn load_resource<T: AssetKind>(
    cache: &ResourceCache,
    path: &str,
) -> Result<ResourceWrapper<T>, ResourceError> {
    let (acquired, pending) = {
        let mut manager = cache.lock();
        match manager.load(path) {
            Ok(handle) => match manager.get_as::<T>(handle) {
                Ok(asset) => (Ok((handle, asset)), None),
                Err(err) => match manager.release(handle) {
                    Ok(pending) => (Err(err), pending),
                    Err(release_err) => {
                        warn!(%handle, error = %release_err, "Failed to give back mistyped resource");
                        (Err(err), None)
                    }
                },
            },
            Err(err) => (Err(err), None),
        }
    };
    if let Some(pending) = pending {
        pending.run();
    }

    match acquired {
        Ok((handle, asset)) => Ok(ResourceWrapper::new(cache, handle, Some(asset))),
        Err(err) => {
            warn!(path, error = %err, "Resource unavailable");
            Err(err)
        }
    }
}
