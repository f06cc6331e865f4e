//! Built-in loader strategies.
//!
//! | extension                  | loader                    | asset             |
//! |----------------------------|---------------------------|-------------------|
//! | `obj`                      | [`ObjLoader`]             | `Model`           |
//! | `bmp`, `png`, `tga`, `hdr` | [`TextureLoader`]         | `Texture2D`       |
//! | `cube`                     | [`CubeMapLoader`]         | `TextureCube`     |
//! | `anim`                     | [`AnimatedTextureLoader`] | `AnimatedTexture` |
//!
//! `cube` and `anim` files are small JSON manifests naming image files
//! relative to the manifest's own directory.

use std::path::Path;
use std::sync::Arc;

use anyhow::{ensure, Context};
use serde::{Deserialize, Serialize};

use crate::asset::{AnimatedTexture, Asset, CubeTexture, Texture};
use crate::dispatch::{DispatchTable, LoadContext, ResourceLoader};
use crate::error::ResourceError;
use crate::formats::{decode_texture, parse_obj, read_texture, texture_format_for};

/// Wavefront OBJ meshes.
#[derive(Debug, Default)]
pub struct ObjLoader;

impl ResourceLoader for ObjLoader {
    fn load(&self, _ctx: &LoadContext<'_>, disk_path: &Path) -> anyhow::Result<Asset> {
        let text = std::fs::read_to_string(disk_path)
            .with_context(|| format!("read {}", disk_path.display()))?;
        let model = parse_obj(&text)?;
        Ok(model.into())
    }
}

/// Single images; the container comes from the request's extension.
#[derive(Debug, Default)]
pub struct TextureLoader;

impl ResourceLoader for TextureLoader {
    fn load(&self, ctx: &LoadContext<'_>, disk_path: &Path) -> anyhow::Result<Asset> {
        let format = texture_format_for(ctx.extension)
            .with_context(|| format!("no texture container for '.{}'", ctx.extension))?;
        let bytes = std::fs::read(disk_path).with_context(|| format!("read {}", disk_path.display()))?;
        Ok(decode_texture(format, bytes)?.into())
    }
}

/// `.cube` manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CubeManifest {
    /// Face images in `+X, -X, +Y, -Y, +Z, -Z` order.
    pub faces: Vec<String>,
}

/// Cube maps assembled from six face images.
#[derive(Debug, Default)]
pub struct CubeMapLoader;

impl ResourceLoader for CubeMapLoader {
    fn load(&self, ctx: &LoadContext<'_>, disk_path: &Path) -> anyhow::Result<Asset> {
        let manifest: CubeManifest = read_manifest(disk_path)?;
        ensure!(
            manifest.faces.len() == 6,
            "cube map needs 6 faces, got {}",
            manifest.faces.len()
        );
        let faces = manifest
            .faces
            .iter()
            .map(|face| read_texture(&ctx.resolve_sibling(face)).map(Arc::new))
            .collect::<anyhow::Result<Vec<Arc<Texture>>>>()?;
        let edge = faces[0].width;
        for (i, face) in faces.iter().enumerate() {
            ensure!(
                face.width == edge && face.height == edge,
                "face {} is {}x{}, expected {}x{}",
                i,
                face.width,
                face.height,
                edge,
                edge
            );
        }
        let faces: [Arc<Texture>; 6] = faces
            .try_into()
            .map_err(|_| anyhow::anyhow!("cube map face count changed"))?;
        Ok(CubeTexture { faces }.into())
    }
}

fn default_looping() -> bool {
    true
}

/// `.anim` manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnimationManifest {
    pub frames: Vec<String>,
    pub fps: f32,
    #[serde(default = "default_looping")]
    pub looping: bool,
}

/// Flip-book textures.
#[derive(Debug, Default)]
pub struct AnimatedTextureLoader;

impl ResourceLoader for AnimatedTextureLoader {
    fn load(&self, ctx: &LoadContext<'_>, disk_path: &Path) -> anyhow::Result<Asset> {
        let manifest: AnimationManifest = read_manifest(disk_path)?;
        ensure!(!manifest.frames.is_empty(), "animation has no frames");
        ensure!(
            manifest.fps.is_finite() && manifest.fps > 0.0,
            "invalid frame rate {}",
            manifest.fps
        );
        let frames = manifest
            .frames
            .iter()
            .map(|frame| read_texture(&ctx.resolve_sibling(frame)).map(Arc::new))
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok(AnimatedTexture {
            frames,
            frames_per_second: manifest.fps,
            looping: manifest.looping,
        }
        .into())
    }
}

fn read_manifest<T: for<'de> Deserialize<'de>>(disk_path: &Path) -> anyhow::Result<T> {
    let text = std::fs::read_to_string(disk_path)
        .with_context(|| format!("read {}", disk_path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parse manifest {}", disk_path.display()))
}

/// Registers every built-in loader.
pub fn register_default_loaders(table: &mut DispatchTable) -> Result<(), ResourceError> {
    let textures: Arc<dyn ResourceLoader> = Arc::new(TextureLoader);
    for ext in ["bmp", "png", "tga", "hdr"] {
        table.register(ext, Arc::clone(&textures))?;
    }
    table.register("obj", Arc::new(ObjLoader))?;
    table.register("cube", Arc::new(CubeMapLoader))?;
    table.register("anim", Arc::new(AnimatedTextureLoader))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::AssetKindTag;

    fn bmp(edge: u32) -> Vec<u8> {
        let mut bytes = Vec::new();
        image::RgbImage::new(edge, edge)
            .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Bmp)
            .unwrap();
        bytes
    }

    fn ctx<'a>(root: &'a Path, asset_path: &'a str, extension: &'a str) -> LoadContext<'a> {
        LoadContext {
            data_root: root,
            asset_path,
            extension,
        }
    }

    #[test]
    fn defaults_cover_all_formats() {
        let mut table = DispatchTable::new();
        register_default_loaders(&mut table).unwrap();
        assert_eq!(
            table.extensions(),
            vec!["anim", "bmp", "cube", "hdr", "obj", "png", "tga"]
        );
        assert!(register_default_loaders(&mut table).is_err());
    }

    #[test]
    fn cube_map_from_manifest() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("sky")).unwrap();
        let mut faces = Vec::new();
        for name in ["px", "nx", "py", "ny", "pz", "nz"] {
            let file = format!("{}.bmp", name);
            std::fs::write(dir.path().join("sky").join(&file), bmp(16)).unwrap();
            faces.push(file);
        }
        let manifest = serde_json::to_string(&CubeManifest { faces }).unwrap();
        let disk = dir.path().join("sky/day.cube");
        std::fs::write(&disk, manifest).unwrap();

        let asset = CubeMapLoader
            .load(&ctx(dir.path(), "sky/day.cube", "cube"), &disk)
            .unwrap();
        assert_eq!(asset.kind(), AssetKindTag::TextureCube);
        match asset {
            Asset::TextureCube(cube) => assert_eq!(cube.edge(), 16),
            _ => unreachable!(),
        }
    }

    #[test]
    fn cube_map_rejects_mismatched_faces() {
        let dir = tempfile::tempdir().unwrap();
        let mut faces = Vec::new();
        for (i, name) in ["px", "nx", "py", "ny", "pz", "nz"].iter().enumerate() {
            let file = format!("{}.bmp", name);
            let edge = if i == 3 { 8 } else { 16 };
            std::fs::write(dir.path().join(&file), bmp(edge)).unwrap();
            faces.push(file);
        }
        let disk = dir.path().join("bad.cube");
        std::fs::write(&disk, serde_json::to_string(&CubeManifest { faces }).unwrap()).unwrap();
        let err = CubeMapLoader
            .load(&ctx(dir.path(), "bad.cube", "cube"), &disk)
            .unwrap_err();
        assert!(err.to_string().contains("face 3"));
    }

    #[test]
    fn animation_manifest_defaults_to_looping() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("f0.bmp"), bmp(4)).unwrap();
        std::fs::write(dir.path().join("f1.bmp"), bmp(4)).unwrap();
        let disk = dir.path().join("fire.anim");
        std::fs::write(&disk, r#"{ "frames": ["f0.bmp", "f1.bmp"], "fps": 8 }"#).unwrap();

        let asset = AnimatedTextureLoader
            .load(&ctx(dir.path(), "fire.anim", "anim"), &disk)
            .unwrap();
        match asset {
            Asset::AnimatedTexture(anim) => {
                assert_eq!(anim.frames.len(), 2);
                assert!(anim.looping);
            }
            other => panic!("unexpected {:?}", other.kind()),
        }
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let disk = dir.path().join("nope.obj");
        assert!(ObjLoader.load(&ctx(dir.path(), "nope.obj", "obj"), &disk).is_err());
    }
}
