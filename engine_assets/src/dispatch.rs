//! Extension dispatch table.
//!
//! Maps a lower-cased file extension to the strategy that loads and unloads
//! assets of that format. Registration happens once, at bootstrap; a second
//! registration for the same key is rejected rather than overwritten.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::asset::Asset;
use crate::error::ResourceError;
use crate::path::{normalize_extension, normalize_path};

/// What a loader knows about the request it is serving.
#[derive(Debug, Clone, Copy)]
pub struct LoadContext<'a> {
    /// Root directory all asset paths are relative to.
    pub data_root: &'a Path,
    /// Normalized, root-relative path of the requested asset.
    pub asset_path: &'a str,
    /// Lower-cased extension that selected the loader.
    pub extension: &'a str,
}

impl LoadContext<'_> {
    /// Resolves a path referenced from inside the asset (e.g. a cube-map
    /// face) relative to the asset's own directory.
    pub fn resolve_sibling(&self, relative: &str) -> PathBuf {
        let dir = match self.asset_path.rfind('/') {
            Some(idx) => &self.asset_path[..idx],
            None => "",
        };
        let joined = if dir.is_empty() {
            normalize_path(relative)
        } else {
            normalize_path(&format!("{}/{}", dir, relative))
        };
        self.data_root.join(joined)
    }
}

/// Load/unload strategy for one or more extensions.
pub trait ResourceLoader: Send + Sync {
    /// Produces the in-memory asset for `disk_path`.
    ///
    /// Runs while a [`ResourceCache`](crate::cache::ResourceCache) holds its
    /// lock; calling back into the same cache from here deadlocks.
    fn load(&self, ctx: &LoadContext<'_>, disk_path: &Path) -> anyhow::Result<Asset>;

    /// Tears down an asset whose last reference was released.
    ///
    /// A cache runs this after releasing its lock, so it may use the cache
    /// or drop wrappers.
    fn unload(&self, asset: Asset) {
        drop(asset);
    }
}

type LoadFn = dyn Fn(&LoadContext<'_>, &Path) -> anyhow::Result<Asset> + Send + Sync;
type UnloadFn = dyn Fn(Asset) + Send + Sync;

/// Closure pair adapted to [`ResourceLoader`].
pub struct FnLoader {
    load: Box<LoadFn>,
    unload: Box<UnloadFn>,
}

impl FnLoader {
    pub fn new<L, U>(load: L, unload: U) -> Self
    where
        L: Fn(&LoadContext<'_>, &Path) -> anyhow::Result<Asset> + Send + Sync + 'static,
        U: Fn(Asset) + Send + Sync + 'static,
    {
        Self {
            load: Box::new(load),
            unload: Box::new(unload),
        }
    }
}

impl ResourceLoader for FnLoader {
    fn load(&self, ctx: &LoadContext<'_>, disk_path: &Path) -> anyhow::Result<Asset> {
        (self.load)(ctx, disk_path)
    }

    fn unload(&self, asset: Asset) {
        (self.unload)(asset)
    }
}

/// Extension-keyed registry of loader strategies.
#[derive(Default, Clone)]
pub struct DispatchTable {
    entries: HashMap<String, Arc<dyn ResourceLoader>>,
}

impl DispatchTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `loader` for `extension` (case-insensitive, leading dot
    /// optional).
    pub fn register(
        &mut self,
        extension: &str,
        loader: Arc<dyn ResourceLoader>,
    ) -> Result<(), ResourceError> {
        let key = normalize_extension(extension)
            .ok_or_else(|| ResourceError::InvalidExtension(extension.to_string()))?;
        if self.entries.contains_key(&key) {
            return Err(ResourceError::DuplicateExtension(key));
        }
        self.entries.insert(key, loader);
        Ok(())
    }

    /// Looks up the loader for an already lower-cased extension.
    pub fn get(&self, extension: &str) -> Option<&Arc<dyn ResourceLoader>> {
        self.entries.get(extension)
    }

    /// Like [`get`](Self::get), failing with `UnsupportedFormat` for `path`.
    pub fn resolve(&self, path: &str, extension: &str) -> Result<Arc<dyn ResourceLoader>, ResourceError> {
        self.get(extension)
            .cloned()
            .ok_or_else(|| ResourceError::UnsupportedFormat {
                path: path.to_string(),
                extension: extension.to_string(),
            })
    }

    pub fn contains(&self, extension: &str) -> bool {
        normalize_extension(extension).map_or(false, |key| self.entries.contains_key(&key))
    }

    /// Registered extensions, sorted.
    pub fn extensions(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for DispatchTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchTable")
            .field("extensions", &self.extensions())
            .finish()
    }
}
