//! `engine_demo`
//!
//! Demo-side systems:
//! - Scene files describing entities and their assets
//! - Entities holding models/textures through auto-releasing wrappers
//! - A headless frame walk that skips entities with missing assets

pub mod scene;

pub use scene::{Entity, EntityDesc, FrameStats, Scene, SceneManifest};
