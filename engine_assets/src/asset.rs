//! Loaded asset payloads.
//!
//! The cache stores one [`Asset`] per record. Each variant holds its payload
//! behind an `Arc` so typed access hands out shared references without
//! copying pixel or vertex data, and without trusting the caller about what
//! a handle points at.

use std::fmt;
use std::sync::Arc;

/// Discriminant of an [`Asset`], used in diagnostics and `WrongKind` errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetKindTag {
    Model,
    Texture2D,
    TextureCube,
    AnimatedTexture,
}

impl fmt::Display for AssetKindTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AssetKindTag::Model => "model",
            AssetKindTag::Texture2D => "2D texture",
            AssetKindTag::TextureCube => "cube texture",
            AssetKindTag::AnimatedTexture => "animated texture",
        };
        f.write_str(name)
    }
}

/// Closed set of asset kinds the cache can own.
#[derive(Debug, Clone)]
pub enum Asset {
    Model(Arc<Model>),
    Texture2D(Arc<Texture>),
    TextureCube(Arc<CubeTexture>),
    AnimatedTexture(Arc<AnimatedTexture>),
}

impl Asset {
    pub fn kind(&self) -> AssetKindTag {
        match self {
            Asset::Model(_) => AssetKindTag::Model,
            Asset::Texture2D(_) => AssetKindTag::Texture2D,
            Asset::TextureCube(_) => AssetKindTag::TextureCube,
            Asset::AnimatedTexture(_) => AssetKindTag::AnimatedTexture,
        }
    }

    /// Approximate CPU memory held by the payload.
    pub fn memory_bytes(&self) -> usize {
        match self {
            Asset::Model(m) => m.memory_bytes(),
            Asset::Texture2D(t) => t.encoded.len(),
            Asset::TextureCube(c) => c.faces.iter().map(|t| t.encoded.len()).sum(),
            Asset::AnimatedTexture(a) => a.frames.iter().map(|t| t.encoded.len()).sum(),
        }
    }
}

impl From<Model> for Asset {
    fn from(m: Model) -> Self {
        Asset::Model(Arc::new(m))
    }
}

impl From<Texture> for Asset {
    fn from(t: Texture) -> Self {
        Asset::Texture2D(Arc::new(t))
    }
}

impl From<CubeTexture> for Asset {
    fn from(c: CubeTexture) -> Self {
        Asset::TextureCube(Arc::new(c))
    }
}

impl From<AnimatedTexture> for Asset {
    fn from(a: AnimatedTexture) -> Self {
        Asset::AnimatedTexture(Arc::new(a))
    }
}

/// A payload type that can be extracted from an [`Asset`].
pub trait AssetKind: Send + Sync + 'static {
    const TAG: AssetKindTag;

    /// Returns the payload if `asset` is of this kind.
    fn from_asset(asset: &Asset) -> Option<Arc<Self>>;
}

macro_rules! impl_asset_kind {
    ($ty:ty, $variant:ident) => {
        impl AssetKind for $ty {
            const TAG: AssetKindTag = AssetKindTag::$variant;

            fn from_asset(asset: &Asset) -> Option<Arc<Self>> {
                match asset {
                    Asset::$variant(inner) => Some(Arc::clone(inner)),
                    _ => None,
                }
            }
        }
    };
}

impl_asset_kind!(Model, Model);
impl_asset_kind!(Texture, Texture2D);
impl_asset_kind!(CubeTexture, TextureCube);
impl_asset_kind!(AnimatedTexture, AnimatedTexture);

/// One model vertex.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vertex {
    pub position: [f32; 3],
    pub tex_coord: [f32; 2],
    pub normal: [f32; 3],
}

/// Triangle mesh.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Model {
    pub vertices: Vec<Vertex>,
    /// Triangle list, three indices per face.
    pub indices: Vec<u32>,
}

impl Model {
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    fn memory_bytes(&self) -> usize {
        self.vertices.len() * std::mem::size_of::<Vertex>()
            + self.indices.len() * std::mem::size_of::<u32>()
    }
}

/// Source container of a texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureFormat {
    Bmp,
    Png,
    Tga,
    /// Radiance RGBE.
    Hdr,
}

/// A 2D image. Pixels stay in their encoded form; decoding happens in the
/// rasterizer's sampler setup.
#[derive(Debug, Clone, PartialEq)]
pub struct Texture {
    pub width: u32,
    pub height: u32,
    pub bits_per_pixel: u16,
    pub format: TextureFormat,
    pub encoded: Vec<u8>,
}

/// Cube map faces in `+X, -X, +Y, -Y, +Z, -Z` order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CubeFace {
    PositiveX = 0,
    NegativeX = 1,
    PositiveY = 2,
    NegativeY = 3,
    PositiveZ = 4,
    NegativeZ = 5,
}

/// Six square faces of equal size.
#[derive(Debug, Clone)]
pub struct CubeTexture {
    pub faces: [Arc<Texture>; 6],
}

impl CubeTexture {
    pub fn face(&self, face: CubeFace) -> &Texture {
        &self.faces[face as usize]
    }

    pub fn edge(&self) -> u32 {
        self.faces[0].width
    }
}

/// Flip-book texture.
#[derive(Debug, Clone)]
pub struct AnimatedTexture {
    pub frames: Vec<Arc<Texture>>,
    pub frames_per_second: f32,
    pub looping: bool,
}

impl AnimatedTexture {
    /// Frame index shown at `time` seconds after the animation started.
    pub fn frame_index_at(&self, time: f32) -> usize {
        let count = self.frames.len();
        if count <= 1 || self.frames_per_second <= 0.0 || time <= 0.0 {
            return 0;
        }
        let frame = (time * self.frames_per_second).floor() as usize;
        if self.looping {
            frame % count
        } else {
            frame.min(count - 1)
        }
    }

    pub fn frame_at(&self, time: f32) -> Option<&Texture> {
        self.frames.get(self.frame_index_at(time)).map(|t| t.as_ref())
    }
}
