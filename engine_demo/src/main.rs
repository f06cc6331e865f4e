//! Standalone demo binary.
//!
//! Usage:
//!   cargo run -p engine_demo -- [--config demo.json] [--data-root data]
//!       [--scene scene.json] [--preload sky/day.cube]... [--frames 60] [asset...]
//!
//! The demo builds the resource cache, preloads the configured assets in the
//! background, loads the scene's entities, walks a few frames and shuts the
//! cache down, reporting anything still referenced.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context};
use engine_assets::prelude::*;
use engine_demo::scene::{EntityDesc, Scene, SceneManifest};
use tracing::{info, warn};

struct DemoArgs {
    cfg: EngineConfig,
    scene: Option<PathBuf>,
    frames: u64,
    assets: Vec<String>,
}

fn parse_args() -> anyhow::Result<DemoArgs> {
    let args: Vec<String> = env::args().collect();

    // The config file is the base layer; flags override it.
    let mut cfg = match args.iter().position(|a| a == "--config") {
        Some(i) if i + 1 < args.len() => EngineConfig::from_file(&args[i + 1])?,
        _ => EngineConfig::default(),
    };
    let mut scene = None;
    let mut frames = 3;
    let mut assets = Vec::new();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" if i + 1 < args.len() => i += 2,
            "--data-root" if i + 1 < args.len() => {
                cfg.data_root = args[i + 1].clone();
                i += 2;
            }
            "--preload" if i + 1 < args.len() => {
                cfg.preload.push(args[i + 1].clone());
                i += 2;
            }
            "--scene" if i + 1 < args.len() => {
                scene = Some(PathBuf::from(&args[i + 1]));
                i += 2;
            }
            "--frames" if i + 1 < args.len() => {
                frames = args[i + 1].parse().unwrap_or(3);
                i += 2;
            }
            other if !other.starts_with("--") => {
                assets.push(other.to_string());
                i += 1;
            }
            _ => i += 1,
        }
    }
    Ok(DemoArgs {
        cfg,
        scene,
        frames,
        assets,
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = parse_args()?;
    let cfg = args.cfg;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| cfg.log_filter.as_str().into()),
        )
        .init();

    info!(data_root = %cfg.data_root, preload = cfg.preload.len(), "Starting demo");
    let cache = ResourceCache::from_config(&cfg).context("bootstrap resource cache")?;

    // Preloaded assets are held by raw handle for the whole run.
    let mut held = Vec::new();
    for (path, result) in cfg.preload.iter().zip(cache.preload(cfg.preload.clone()).await) {
        match result {
            Ok(handle) => held.push(handle),
            Err(err) => warn!(%path, error = %err, "Preload failed"),
        }
    }

    let manifest = match &args.scene {
        Some(path) => SceneManifest::from_file(path)?,
        None => SceneManifest::default(),
    };
    let mut scene = Scene::from_manifest(&cache, &manifest);

    // Positional assets become one entity each.
    for (n, asset) in args.assets.iter().enumerate() {
        let desc = EntityDesc {
            name: format!("entity{}", n),
            model: Some(asset.clone()),
            texture: None,
        };
        if !scene.spawn(&cache, &desc).is_drawable() {
            warn!(entity = %desc.name, %asset, "Spawned entity has nothing to draw");
        }
    }
    for record in cache.records() {
        println!(
            "  {:>4}  {:<16} refs={:<3} {}",
            record.handle.as_u32(),
            record.kind.to_string(),
            record.ref_count,
            record.path
        );
    }

    let mut ticker = tokio::time::interval(Duration::from_millis(16));
    for _ in 0..args.frames {
        ticker.tick().await;
        let stats = scene.render_frame();
        info!(
            frame = stats.frame,
            drawn = stats.drawn,
            skipped = stats.skipped,
            triangles = stats.triangles,
            "Frame"
        );
    }

    scene.clear();
    for handle in held {
        if let Err(err) = cache.unload(handle) {
            warn!(%handle, error = %err, "Failed to release preloaded asset");
        }
    }

    let leaked = cache.shutdown();
    let stats = cache.stats();
    println!("{}", serde_json::to_string_pretty(&stats)?);
    if leaked > 0 && cfg.strict_shutdown {
        bail!("{} resource(s) still referenced at shutdown", leaked);
    }
    Ok(())
}
