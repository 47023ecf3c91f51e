use image::{imageops, RgbaImage};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Where one source image lives inside an atlas.
///
/// `frame` is measured from the bottom-left corner of the written (flipped)
/// atlas, which is the same number as the top-left offset of the cell
/// before the flip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    pub size: Size,
    pub frame: Rect,
}

impl Frame {
    pub fn cell(x: u32, y: u32, edge: u32) -> Self {
        Self {
            size: Size { width: edge, height: edge },
            frame: Rect { x, y, width: edge, height: edge },
        }
    }
}

/// Square grid: `side` cells per row and column, each `cell` pixels wide.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Grid {
    pub side: u32,
    pub cell: u32,
}

impl Grid {
    pub fn edge(&self) -> u64 {
        self.side as u64 * self.cell as u64
    }
}

pub type FrameMap = IndexMap<String, Frame>;

/// A packed atlas and the frame of every image in it, keyed by image name in
/// placement order.
#[derive(Debug, Clone)]
pub struct AtlasResult {
    pub image: RgbaImage,
    pub frames: FrameMap,
    pub grid: Grid,
}

impl AtlasResult {
    /// Cuts the named image back out of the flipped atlas, upright.
    pub fn extract(&self, name: &str) -> Option<RgbaImage> {
        let r = self.frames.get(name)?.frame;
        let top = self.image.height().checked_sub(r.y + r.height)?;
        let mut tile = imageops::crop_imm(&self.image, r.x, top, r.width, r.height).to_image();
        imageops::flip_vertical_in_place(&mut tile);
        Some(tile)
    }

    pub fn frames_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.frames)
    }
}
