//! Shared fixtures for the integration tests.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::bail;
use engine_assets::prelude::*;
use tempfile::TempDir;

/// Installs a test-friendly subscriber once per process.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("debug")
        .with_test_writer()
        .try_init();
}

/// Loader/unloader invocation counts.
#[derive(Debug, Default)]
pub struct Calls {
    loads: AtomicUsize,
    unloads: AtomicUsize,
}

impl Calls {
    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn unloads(&self) -> usize {
        self.unloads.load(Ordering::SeqCst)
    }
}

/// Manager with a counting `.model` loader that fails for any path
/// containing `missing`.
pub fn counting_manager() -> (ResourceManager, Arc<Calls>) {
    let calls = Arc::new(Calls::default());
    let (l, u) = (Arc::clone(&calls), Arc::clone(&calls));
    let manager = ResourceManager::builder("/virtual")
        .with_fns(
            "model",
            move |_, path: &Path| {
                l.loads.fetch_add(1, Ordering::SeqCst);
                if path.to_string_lossy().contains("missing") {
                    bail!("no such file: {}", path.display());
                }
                Ok(Model::default().into())
            },
            move |_| {
                u.unloads.fetch_add(1, Ordering::SeqCst);
            },
        )
        .expect("fresh table accepts .model")
        .build();
    (manager, calls)
}

pub fn counting_cache() -> (ResourceCache, Arc<Calls>) {
    let (manager, calls) = counting_manager();
    (ResourceCache::new(manager), calls)
}

pub const QUAD_OBJ: &str = "\
v -1 -1 0
v 1 -1 0
v 1 1 0
v -1 1 0
vt 0 0
vt 1 0
vt 1 1
vt 0 1
f 1/1 2/2 3/3 4/4
";

/// A black 24-bit BMP with the given square edge.
pub fn bmp_bytes(edge: u32) -> anyhow::Result<Vec<u8>> {
    let mut bytes = Vec::new();
    image::RgbImage::new(edge, edge)
        .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Bmp)?;
    Ok(bytes)
}

/// A temporary data root populated with one asset of each built-in kind:
/// - `models/quad.obj`
/// - `textures/brick.bmp`
/// - `sky/day.cube` (+ six faces)
/// - `fx/fire.anim` (+ two frames)
pub fn populated_data_root() -> anyhow::Result<TempDir> {
    let dir = tempfile::tempdir()?;
    let root = dir.path();
    for sub in ["models", "textures", "sky", "fx"] {
        std::fs::create_dir_all(root.join(sub))?;
    }
    std::fs::write(root.join("models/quad.obj"), QUAD_OBJ)?;
    std::fs::write(root.join("textures/brick.bmp"), bmp_bytes(32)?)?;

    let faces = ["px", "nx", "py", "ny", "pz", "nz"];
    for face in faces {
        std::fs::write(root.join(format!("sky/{}.bmp", face)), bmp_bytes(64)?)?;
    }
    let face_list: Vec<String> = faces.iter().map(|f| format!("\"{}.bmp\"", f)).collect();
    std::fs::write(
        root.join("sky/day.cube"),
        format!("{{ \"faces\": [{}] }}", face_list.join(", ")),
    )?;

    let frame = bmp_bytes(16)?;
    std::fs::write(root.join("fx/f0.bmp"), &frame)?;
    std::fs::write(root.join("fx/f1.bmp"), &frame)?;
    std::fs::write(
        root.join("fx/fire.anim"),
        r#"{ "frames": ["f0.bmp", "f1.bmp"], "fps": 12.0, "looping": false }"#,
    )?;

    Ok(dir)
}

/// Cache with the built-in loaders rooted at `root`.
pub fn default_cache(root: &Path) -> ResourceCache {
    let cfg = EngineConfig {
        data_root: root.to_string_lossy().into_owned(),
        ..EngineConfig::default()
    };
    ResourceCache::from_config(&cfg).expect("built-in loaders register cleanly")
}
