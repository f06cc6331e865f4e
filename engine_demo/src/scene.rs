//! Demo scene: entities that hold their assets through wrappers.
//!
//! An entity whose model cannot be loaded stays in the scene but is skipped
//! by the frame loop. Nothing here renders; `render_frame` only walks what a
//! rasterizer would be fed.

use anyhow::Context;
use engine_assets::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// One entity in a scene file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityDesc {
    pub name: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub texture: Option<String>,
}

/// JSON scene description.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneManifest {
    #[serde(default)]
    pub skybox: Option<String>,
    #[serde(default)]
    pub entities: Vec<EntityDesc>,
}

impl SceneManifest {
    pub fn from_json_str(s: &str) -> serde_json::Result<Self> {
        serde_json::from_str(s)
    }

    pub fn from_file(path: &std::path::Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read scene {}", path.display()))?;
        Self::from_json_str(&text).with_context(|| format!("parse scene {}", path.display()))
    }
}

/// A named thing with an optional mesh and surface texture.
#[derive(Debug)]
pub struct Entity {
    pub name: String,
    pub model: Option<ResourceWrapper<Model>>,
    pub texture: Option<ResourceWrapper<Texture>>,
}

impl Entity {
    /// Acquires the entity's assets; failures leave the slot empty.
    pub fn spawn(cache: &ResourceCache, desc: &EntityDesc) -> Self {
        let model: Option<ResourceWrapper<Model>> = desc
            .model
            .as_deref()
            .and_then(|path| acquire(cache, &desc.name, path));
        let texture: Option<ResourceWrapper<Texture>> = desc
            .texture
            .as_deref()
            .and_then(|path| acquire(cache, &desc.name, path));
        debug!(
            entity = %desc.name,
            has_model = model.is_some(),
            has_texture = texture.is_some(),
            "Spawned entity"
        );
        Self {
            name: desc.name.clone(),
            model,
            texture,
        }
    }

    pub fn is_drawable(&self) -> bool {
        self.model.as_ref().map_or(false, |m| m.get().is_some())
    }
}

fn acquire<T: AssetKind>(cache: &ResourceCache, entity: &str, path: &str) -> Option<ResourceWrapper<T>> {
    match load_resource::<T>(cache, path) {
        Ok(wrapper) => Some(wrapper),
        Err(err) => {
            warn!(%entity, %path, error = %err, "Entity asset missing, entity will be skipped");
            None
        }
    }
}

/// Per-frame summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FrameStats {
    pub frame: u64,
    pub drawn: usize,
    pub skipped: usize,
    pub triangles: usize,
    pub textured: usize,
    pub skybox: bool,
}

/// Entities plus an optional sky cube map.
#[derive(Debug, Default)]
pub struct Scene {
    entities: Vec<Entity>,
    skybox: Option<ResourceWrapper<CubeTexture>>,
    frame: u64,
}

impl Scene {
    pub fn from_manifest(cache: &ResourceCache, manifest: &SceneManifest) -> Self {
        let skybox: Option<ResourceWrapper<CubeTexture>> = manifest
            .skybox
            .as_deref()
            .and_then(|path| acquire(cache, "skybox", path));
        let entities: Vec<Entity> = manifest
            .entities
            .iter()
            .map(|desc| Entity::spawn(cache, desc))
            .collect();
        info!(
            entities = entities.len(),
            drawable = entities.iter().filter(|e| e.is_drawable()).count(),
            skybox = skybox.is_some(),
            "Scene loaded"
        );
        Self {
            entities,
            skybox,
            frame: 0,
        }
    }

    pub fn spawn(&mut self, cache: &ResourceCache, desc: &EntityDesc) -> &Entity {
        self.entities.push(Entity::spawn(cache, desc));
        &self.entities[self.entities.len() - 1]
    }

    /// Removes the first entity called `name`, releasing its assets.
    pub fn despawn(&mut self, name: &str) -> bool {
        match self.entities.iter().position(|e| e.name == name) {
            Some(idx) => {
                self.entities.remove(idx);
                true
            }
            None => false,
        }
    }

    pub fn entity(&self, name: &str) -> Option<&Entity> {
        self.entities.iter().find(|e| e.name == name)
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    /// Walks the scene once, skipping entities without a usable model.
    pub fn render_frame(&mut self) -> FrameStats {
        self.frame += 1;
        let mut stats = FrameStats {
            frame: self.frame,
            skybox: self.skybox.as_ref().map_or(false, |s| s.get().is_some()),
            ..FrameStats::default()
        };
        for entity in &self.entities {
            let Some(model) = entity.model.as_ref().and_then(|m| m.get()) else {
                stats.skipped += 1;
                continue;
            };
            stats.drawn += 1;
            stats.triangles += model.triangle_count();
            if entity.texture.as_ref().map_or(false, |t| t.get().is_some()) {
                stats.textured += 1;
            }
        }
        stats
    }

    /// Drops every entity and the skybox, releasing all wrappers.
    pub fn clear(&mut self) {
        self.entities.clear();
        self.skybox = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUAD: &str = "v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nf 1 2 3 4\n";

    fn bmp(edge: u32) -> Vec<u8> {
        let mut bytes = Vec::new();
        image::RgbImage::new(edge, edge)
            .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Bmp)
            .unwrap();
        bytes
    }

    fn cache_in(dir: &std::path::Path) -> ResourceCache {
        ResourceCache::new(
            ResourceManager::builder(dir)
                .with_default_loaders()
                .unwrap()
                .build(),
        )
    }

    fn desc(name: &str, model: Option<&str>, texture: Option<&str>) -> EntityDesc {
        EntityDesc {
            name: name.to_string(),
            model: model.map(str::to_string),
            texture: texture.map(str::to_string),
        }
    }

    #[test]
    fn missing_assets_skip_entities() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("quad.obj"), QUAD).unwrap();
        std::fs::write(dir.path().join("brick.bmp"), bmp(8)).unwrap();
        let cache = cache_in(dir.path());

        let manifest = SceneManifest {
            skybox: None,
            entities: vec![
                desc("a", Some("quad.obj"), Some("brick.bmp")),
                desc("b", Some("quad.obj"), None),
                desc("ghost", Some("missing.obj"), Some("brick.bmp")),
            ],
        };
        let mut scene = Scene::from_manifest(&cache, &manifest);
        let stats = scene.render_frame();
        assert_eq!((stats.drawn, stats.skipped, stats.textured), (2, 1, 1));
        assert_eq!(stats.triangles, 4);
        assert!(!stats.skybox);

        let quad = cache.handle_of("quad.obj").unwrap();
        assert_eq!(cache.ref_count(quad), Some(2));
        assert!(scene.despawn("a"));
        assert_eq!(cache.ref_count(quad), Some(1));

        scene.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn spawning_into_a_running_scene_shares_assets() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("quad.obj"), QUAD).unwrap();
        let cache = cache_in(dir.path());
        let manifest = SceneManifest {
            skybox: None,
            entities: vec![desc("a", Some("quad.obj"), None)],
        };
        let mut scene = Scene::from_manifest(&cache, &manifest);
        let quad = cache.handle_of("quad.obj").unwrap();
        assert_eq!(cache.ref_count(quad), Some(1));

        assert!(scene.spawn(&cache, &desc("b", Some("quad.obj"), None)).is_drawable());
        assert_eq!(cache.ref_count(quad), Some(2));
        assert_eq!(cache.stats().loader_calls, 1);
        assert!(scene.entity("b").is_some());
        assert!(scene.entity("c").is_none());
        assert_eq!(scene.render_frame().drawn, 2);

        assert!(scene.despawn("b"));
        assert_eq!(cache.ref_count(quad), Some(1));
    }

    #[test]
    fn manifest_fields_are_optional() {
        let manifest = SceneManifest::from_json_str(r#"{ "entities": [{ "name": "e" }] }"#).unwrap();
        assert_eq!(manifest.entities[0], desc("e", None, None));
        assert_eq!(manifest.skybox, None);
    }
}
