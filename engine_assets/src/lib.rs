//! `engine_assets`
//!
//! Resource lifecycle and caching shared by every demo.
//!
//! Design goals:
//! - Handles, not pointers, as the external currency.
//! - One record per normalized path, reference counted.
//! - Per-extension loader strategies registered once, at bootstrap.
//! - Typed access that fails at the kind boundary instead of trusting the caller.
//! - No `unsafe`.

pub mod asset;
pub mod cache;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod formats;
pub mod loaders;
pub mod path;
pub mod record;
pub mod resources;
pub mod wrapper;

pub mod prelude {
    //! Commonly used exports.

    pub use crate::asset::*;
    pub use crate::cache::ResourceCache;
    pub use crate::config::EngineConfig;
    pub use crate::dispatch::{FnLoader, LoadContext, ResourceLoader};
    pub use crate::error::ResourceError;
    pub use crate::record::{ResourceHandle, ResourceInfo};
    pub use crate::resources::{CacheStats, ResourceManager, ResourceManagerBuilder};
    pub use crate::wrapper::{load_resource, ResourceWrapper};
}
