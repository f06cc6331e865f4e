//! Image and mesh decoding for the built-in loaders.
//!
//! Images go through the `image` crate, meshes through `tobj`. A decoded
//! texture only keeps its metadata next to the encoded bytes; the sampler
//! decodes again when it needs pixels.

use std::io::Cursor;
use std::path::Path;

use anyhow::{ensure, Context};
use image::ImageFormat;

use crate::asset::{Model, Texture, TextureFormat, Vertex};

/// Texture container for a lower-cased extension.
pub fn texture_format_for(extension: &str) -> Option<TextureFormat> {
    match extension {
        "bmp" => Some(TextureFormat::Bmp),
        "png" => Some(TextureFormat::Png),
        "tga" => Some(TextureFormat::Tga),
        "hdr" => Some(TextureFormat::Hdr),
        _ => None,
    }
}

fn image_format(format: TextureFormat) -> ImageFormat {
    match format {
        TextureFormat::Bmp => ImageFormat::Bmp,
        TextureFormat::Png => ImageFormat::Png,
        TextureFormat::Tga => ImageFormat::Tga,
        TextureFormat::Hdr => ImageFormat::Hdr,
    }
}

/// Reads a texture file, picking the container from its extension.
pub fn read_texture(path: &Path) -> anyhow::Result<Texture> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    let format = texture_format_for(&extension)
        .with_context(|| format!("'{}' is not a texture", path.display()))?;
    let bytes = std::fs::read(path).with_context(|| format!("read {}", path.display()))?;
    decode_texture(format, bytes).with_context(|| format!("decode {}", path.display()))
}

/// Decodes `bytes` as `format` and wraps them in a [`Texture`].
pub fn decode_texture(format: TextureFormat, bytes: Vec<u8>) -> anyhow::Result<Texture> {
    let decoded = image::load_from_memory_with_format(&bytes, image_format(format))
        .with_context(|| format!("invalid {:?} image", format))?;
    let (width, height) = (decoded.width(), decoded.height());
    ensure!(width > 0 && height > 0, "empty image ({}x{})", width, height);
    Ok(Texture {
        width,
        height,
        bits_per_pixel: decoded.color().bits_per_pixel(),
        format,
        encoded: bytes,
    })
}

/// Parses a Wavefront OBJ mesh.
///
/// Polygons are triangulated and every unique position/uv/normal triple
/// becomes one vertex. All objects in the file are merged into one model.
pub fn parse_obj(text: &str) -> anyhow::Result<Model> {
    let options = tobj::LoadOptions {
        triangulate: true,
        single_index: true,
        ..Default::default()
    };
    // Materials are not part of a Model.
    let (meshes, _materials) = tobj::load_obj_buf(&mut Cursor::new(text), &options, |_| {
        Err(tobj::LoadError::OpenFileFailed)
    })
    .context("parse OBJ")?;

    let mut model = Model::default();
    for mesh in meshes.iter().map(|m| &m.mesh) {
        let base = u32::try_from(model.vertices.len()).context("too many vertices")?;
        for (i, p) in mesh.positions.chunks_exact(3).enumerate() {
            model.vertices.push(Vertex {
                position: [p[0], p[1], p[2]],
                tex_coord: mesh
                    .texcoords
                    .get(i * 2..i * 2 + 2)
                    .map_or([0.0; 2], |t| [t[0], t[1]]),
                normal: mesh
                    .normals
                    .get(i * 3..i * 3 + 3)
                    .map_or([0.0; 3], |n| [n[0], n[1], n[2]]),
            });
        }
        model.indices.extend(mesh.indices.iter().map(|i| base + i));
    }
    ensure!(!model.indices.is_empty(), "model has no faces");
    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, RgbImage, RgbaImage};

    fn encode(img: DynamicImage, format: ImageFormat) -> Vec<u8> {
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), format).unwrap();
        bytes
    }

    #[test]
    fn bmp_dimensions() {
        let b = encode(DynamicImage::ImageRgb8(RgbImage::new(8, 4)), ImageFormat::Bmp);
        let tex = decode_texture(TextureFormat::Bmp, b).unwrap();
        assert_eq!((tex.width, tex.height, tex.bits_per_pixel), (8, 4, 24));
        assert!(decode_texture(TextureFormat::Bmp, b"XX".to_vec()).is_err());
    }

    #[test]
    fn png_dimensions() {
        let b = encode(DynamicImage::ImageRgba8(RgbaImage::new(64, 48)), ImageFormat::Png);
        let tex = decode_texture(TextureFormat::Png, b.clone()).unwrap();
        assert_eq!((tex.width, tex.height, tex.bits_per_pixel), (64, 48, 32));
        assert_eq!(tex.encoded, b);
    }

    #[test]
    fn tga_dimensions() {
        let b = encode(DynamicImage::ImageRgba8(RgbaImage::new(16, 32)), ImageFormat::Tga);
        let tex = decode_texture(TextureFormat::Tga, b).unwrap();
        assert_eq!((tex.width, tex.height, tex.bits_per_pixel), (16, 32, 32));
    }

    #[test]
    fn hdr_dimensions() {
        let mut b = b"#?RADIANCE\nFORMAT=32-bit_rle_rgbe\n\n-Y 2 +X 4\n".to_vec();
        b.extend_from_slice(&[0u8; 2 * 4 * 4]);
        let tex = decode_texture(TextureFormat::Hdr, b).unwrap();
        assert_eq!((tex.width, tex.height), (4, 2));
    }

    #[test]
    fn container_must_match_extension() {
        let png = encode(DynamicImage::ImageRgb8(RgbImage::new(4, 4)), ImageFormat::Png);
        assert!(decode_texture(TextureFormat::Bmp, png).is_err());
    }

    #[test]
    fn obj_quad_is_triangulated() {
        let text = "\
# quad
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
vt 0 0
vn 0 0 1
f 1/1/1 2/1/1 3/1/1 4/1/1
";
        let model = parse_obj(text).unwrap();
        assert_eq!(model.vertices.len(), 4);
        assert_eq!(model.triangle_count(), 2);
        assert!(model.vertices.iter().all(|v| v.normal == [0.0, 0.0, 1.0]));
    }

    #[test]
    fn obj_negative_indices_and_shared_vertices() {
        let text = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf -3 -2 -1\nf 1 2 3\n";
        let model = parse_obj(text).unwrap();
        assert_eq!(model.vertices.len(), 3);
        assert_eq!(model.triangle_count(), 2);
    }

    #[test]
    fn obj_line_continuation() {
        let text = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 \\\n3\n";
        let model = parse_obj(text).unwrap();
        assert_eq!(model.triangle_count(), 1);
    }

    #[test]
    fn obj_rejects_garbage_and_empty_meshes() {
        assert!(parse_obj("v x y z\nf 1 1 1\n").is_err());
        assert!(parse_obj("v 0 0 0\n").is_err());
    }
}
