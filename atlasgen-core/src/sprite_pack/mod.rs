//! Uniform-grid atlas packing.
//!
//! Every image in a pack call must be square and the same size. Images are
//! laid out left to right, top to bottom in input order on a `d x d` grid
//! with the smallest `d` that fits, then the canvas is flipped vertically.

pub mod frame;

use std::path::{Path, PathBuf};

use image::{imageops, RgbaImage};
use thiserror::Error;

pub use frame::{AtlasResult, Frame, FrameMap, Grid, Rect, Size};

use crate::asset_catalog::bundle_name;

/// Largest atlas edge the target GPUs accept.
pub const MAX_ATLAS_EDGE: u32 = 4096;

#[derive(Debug, Error)]
pub enum PackError {
    #[error("no image data: {0}")]
    NoImageData(String),
    #[error("{name} is {width}x{height}, expected {expected}x{expected}")]
    SizeMismatch { name: String, width: u32, height: u32, expected: u32 },
    #[error("atlas too large: {edge}px exceeds the {max}px limit")]
    AtlasTooLarge { edge: u64, max: u32 },
}

/// A located source image and its measured dimensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    pub name: String,
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
}

impl ImageRef {
    /// Reads only the file header to get the dimensions.
    pub fn read_header<P: AsRef<Path>>(path: P) -> Result<Self, PackError> {
        let path = path.as_ref();
        let (width, height) = image::image_dimensions(path)
            .map_err(|e| PackError::NoImageData(format!("{}: {}", path.display(), e)))?;
        Ok(Self { name: image_name(path), path: path.to_path_buf(), width, height })
    }

    pub fn load(&self) -> Result<Tile, PackError> {
        let pixels = image::open(&self.path)
            .map_err(|e| PackError::NoImageData(format!("{}: {}", self.path.display(), e)))?
            .to_rgba8();
        Ok(Tile { name: self.name.clone(), pixels })
    }
}

/// A decoded image ready to paste.
#[derive(Debug, Clone)]
pub struct Tile {
    pub name: String,
    pub pixels: RgbaImage,
}

impl Tile {
    pub fn new(name: impl Into<String>, pixels: RgbaImage) -> Self {
        Self { name: name.into(), pixels }
    }
}

/// Frame-map name for an image path; falls back to the file stem when the
/// path is not inside a bundle.
pub fn image_name(path: &Path) -> String {
    bundle_name(path).unwrap_or_else(|| {
        path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default()
    })
}

/// Smallest `d >= 1` with `d * d >= count`.
pub fn grid_side(count: usize) -> u32 {
    let mut d: u64 = 1;
    while d * d < count as u64 {
        d += 1;
    }
    d as u32
}

/// Common square edge of `sizes`, or the first offender.
pub fn uniform_edge<'a, I>(sizes: I) -> Result<u32, PackError>
where
    I: IntoIterator<Item = (&'a str, u32, u32)>,
{
    let mut expected = None;
    for (name, width, height) in sizes {
        let edge = *expected.get_or_insert(width);
        if width != height || width != edge {
            return Err(PackError::SizeMismatch { name: name.to_string(), width, height, expected: edge });
        }
    }
    expected.ok_or_else(|| PackError::NoImageData("no images to pack".to_string()))
}

#[derive(Debug, Clone, Copy)]
pub struct AtlasPacker {
    pub max_edge: u32,
}

impl Default for AtlasPacker {
    fn default() -> Self { Self { max_edge: MAX_ATLAS_EDGE } }
}

impl AtlasPacker {
    pub fn new(max_edge: u32) -> Self {
        Self { max_edge }
    }

    pub fn grid(&self, count: usize, cell: u32) -> Result<Grid, PackError> {
        let grid = Grid { side: grid_side(count), cell };
        if grid.edge() > self.max_edge as u64 {
            return Err(PackError::AtlasTooLarge { edge: grid.edge(), max: self.max_edge });
        }
        Ok(grid)
    }

    /// Reads headers, validates and decodes `paths`, then packs them. Sizes are
    /// checked from headers before anything is decoded.
    pub fn pack_paths(&self, paths: &[PathBuf]) -> Result<AtlasResult, PackError> {
        let refs = paths.iter().map(ImageRef::read_header).collect::<Result<Vec<_>, _>>()?;
        let edge = uniform_edge(refs.iter().map(|r| (r.name.as_str(), r.width, r.height)))?;
        self.grid(refs.len(), edge)?;
        let tiles = refs.iter().map(ImageRef::load).collect::<Result<Vec<_>, _>>()?;
        self.pack(&tiles)
    }

    /// Packs decoded tiles. Pure: same input, same bytes out.
    pub fn pack(&self, tiles: &[Tile]) -> Result<AtlasResult, PackError> {
        if tiles.is_empty() {
            return Err(PackError::NoImageData("no images to pack".to_string()));
        }
        let s = uniform_edge(tiles.iter().map(|t| (t.name.as_str(), t.pixels.width(), t.pixels.height())))?;
        let grid = self.grid(tiles.len(), s)?;
        let edge = grid.edge() as u32;

        let mut canvas = RgbaImage::new(edge, edge);
        let mut frames = FrameMap::with_capacity(tiles.len());
        let (mut col, mut row) = (0u32, 0u32);
        for tile in tiles {
            if col * s >= edge {
                col = 0;
                row += 1;
            }
            let (x, y) = (col * s, row * s);
            imageops::replace(&mut canvas, &tile.pixels, x as i64, y as i64);
            // duplicate names: last one wins
            frames.insert(tile.name.clone(), Frame::cell(x, y, s));
            col += 1;
        }
        imageops::flip_vertical_in_place(&mut canvas);

        log::debug!("packed {} images into {}x{} ({}x{} grid)", tiles.len(), edge, edge, grid.side, grid.side);
        Ok(AtlasResult { image: canvas, frames, grid })
    }
}
