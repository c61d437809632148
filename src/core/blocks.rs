//! Raw layout blocks and the immutable page container.
//!
//! Blocks are the atomic primitives produced by the PDF extractor: text
//! spans, raster images, and vector drawings. Each block carries a stable
//! integer id unique within its page. The classification core never opens
//! PDFs; it consumes already-extracted [`PageData`] values.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::core::geometry::BBox;

/// Stable identifier of a block within one page.
pub type BlockId = u32;

/// An RGB color with components in `[0, 1]`, as reported by the extractor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

impl Color {
    /// Creates a color from components.
    pub fn new(r: f64, g: f64, b: f64) -> Self {
        Self { r, g, b }
    }

    /// Perceived luminance in `[0, 1]`. Light fills (sub-assembly callouts,
    /// backgrounds) sit near 1.0.
    pub fn luminance(&self) -> f64 {
        0.2126 * self.r + 0.7152 * self.g + 0.0722 * self.b
    }
}

/// An atomic layout primitive extracted from one page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Block {
    /// A text span with normalized whitespace.
    Text {
        id: BlockId,
        bbox: BBox,
        text: String,
        /// Font size in points, when the extractor reported one.
        font_size: Option<f64>,
        font_name: Option<String>,
    },
    /// A raster image placement.
    Image {
        id: BlockId,
        bbox: BBox,
        /// Extractor-assigned image identifier (stable across pages for
        /// repeated images).
        image_id: Option<String>,
    },
    /// A vector drawing.
    Drawing {
        id: BlockId,
        bbox: BBox,
        /// The pre-clipping bounding box, when the visible bbox was clipped.
        original_bbox: Option<BBox>,
        fill_color: Option<Color>,
        stroke_color: Option<Color>,
        /// Stroke width in points.
        thickness: Option<f64>,
        /// Number of path segments in the drawing.
        path_count: Option<u32>,
    },
}

impl Block {
    /// Returns the stable id of this block.
    pub fn id(&self) -> BlockId {
        match self {
            Block::Text { id, .. } | Block::Image { id, .. } | Block::Drawing { id, .. } => *id,
        }
    }

    /// Returns the bounding box of this block.
    pub fn bbox(&self) -> BBox {
        match self {
            Block::Text { bbox, .. } | Block::Image { bbox, .. } | Block::Drawing { bbox, .. } => {
                *bbox
            }
        }
    }

    /// Returns the text content for text blocks.
    pub fn text(&self) -> Option<&str> {
        match self {
            Block::Text { text, .. } => Some(text),
            _ => None,
        }
    }

    /// Returns the font size for text blocks that carry one.
    pub fn font_size(&self) -> Option<f64> {
        match self {
            Block::Text { font_size, .. } => *font_size,
            _ => None,
        }
    }

    /// Returns the fill color for drawing blocks.
    pub fn fill_color(&self) -> Option<Color> {
        match self {
            Block::Drawing { fill_color, .. } => *fill_color,
            _ => None,
        }
    }

    /// Returns the unclipped bounding box for drawings, falling back to the
    /// visible bbox.
    pub fn unclipped_bbox(&self) -> BBox {
        match self {
            Block::Drawing {
                bbox,
                original_bbox,
                ..
            } => original_bbox.unwrap_or(*bbox),
            other => other.bbox(),
        }
    }

    /// A short kind tag for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Block::Text { .. } => "text",
            Block::Image { .. } => "image",
            Block::Drawing { .. } => "drawing",
        }
    }
}

/// One extracted page, frozen after construction.
///
/// Block order is the extractor's order and is preserved; classifier
/// iteration order over blocks follows it, which keeps candidate creation
/// deterministic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageData {
    /// 1-based page index within the source document.
    page_index: u32,
    /// Page width in points.
    width: f64,
    /// Page height in points.
    height: f64,
    blocks: Vec<Block>,
}

impl PageData {
    /// Creates a page from extractor output.
    ///
    /// Blocks with duplicate ids are rejected with an error;
    /// [`PageData::from_raw_blocks`] is the lenient entry point that drops
    /// offending blocks with a warning instead.
    pub fn new(
        page_index: u32,
        width: f64,
        height: f64,
        blocks: Vec<Block>,
    ) -> Result<Self, crate::core::errors::ClassifyError> {
        let mut seen = std::collections::BTreeSet::new();
        for block in &blocks {
            if !seen.insert(block.id()) {
                return Err(crate::core::errors::ClassifyError::invalid_input(format!(
                    "duplicate block id {} on page {}",
                    block.id(),
                    page_index
                )));
            }
        }
        Ok(Self {
            page_index,
            width,
            height,
            blocks,
        })
    }

    /// Creates a page from raw extractor records, dropping blocks with
    /// invalid geometry or duplicate ids.
    ///
    /// Each dropped block produces a warning string returned alongside the
    /// page so the caller can attach it to the classification report.
    pub fn from_raw_blocks(
        page_index: u32,
        width: f64,
        height: f64,
        blocks: Vec<Block>,
    ) -> (Self, Vec<String>) {
        let mut warnings = Vec::new();
        let mut kept = Vec::with_capacity(blocks.len());
        let mut seen = std::collections::BTreeSet::new();
        for block in blocks {
            let b = block.bbox();
            let finite =
                b.x0.is_finite() && b.y0.is_finite() && b.x1.is_finite() && b.y1.is_finite();
            if b.x0 > b.x1 || b.y0 > b.y1 || !finite {
                let msg = format!(
                    "page {}: dropped {} block {} with invalid bbox {}",
                    page_index,
                    block.kind(),
                    block.id(),
                    b
                );
                warn!("{}", msg);
                warnings.push(msg);
                continue;
            }
            if !seen.insert(block.id()) {
                let msg = format!(
                    "page {}: dropped {} block with duplicate id {}",
                    page_index,
                    block.kind(),
                    block.id()
                );
                warn!("{}", msg);
                warnings.push(msg);
                continue;
            }
            kept.push(block);
        }
        (
            Self {
                page_index,
                width,
                height,
                blocks: kept,
            },
            warnings,
        )
    }

    /// 1-based page index.
    pub fn page_index(&self) -> u32 {
        self.page_index
    }

    /// Page width in points.
    pub fn width(&self) -> f64 {
        self.width
    }

    /// Page height in points.
    pub fn height(&self) -> f64 {
        self.height
    }

    /// The page bounds as a bounding box.
    pub fn bbox(&self) -> BBox {
        BBox {
            x0: 0.0,
            y0: 0.0,
            x1: self.width,
            y1: self.height,
        }
    }

    /// The extracted blocks in extractor order.
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Looks up a block by id.
    pub fn block(&self, id: BlockId) -> Option<&Block> {
        self.blocks.iter().find(|b| b.id() == id)
    }

    /// Iterates over text blocks only.
    pub fn text_blocks(&self) -> impl Iterator<Item = &Block> {
        self.blocks.iter().filter(|b| matches!(b, Block::Text { .. }))
    }

    /// Iterates over image blocks only.
    pub fn image_blocks(&self) -> impl Iterator<Item = &Block> {
        self.blocks
            .iter()
            .filter(|b| matches!(b, Block::Image { .. }))
    }

    /// Iterates over drawing blocks only.
    pub fn drawing_blocks(&self) -> impl Iterator<Item = &Block> {
        self.blocks
            .iter()
            .filter(|b| matches!(b, Block::Drawing { .. }))
    }
}

/// Convenience constructors used by tests and fixtures.
impl Block {
    /// Creates a text block with just the commonly needed fields.
    pub fn text_block(id: BlockId, bbox: BBox, text: impl Into<String>, font_size: f64) -> Self {
        Block::Text {
            id,
            bbox,
            text: text.into(),
            font_size: Some(font_size),
            font_name: None,
        }
    }

    /// Creates an image block.
    pub fn image(id: BlockId, bbox: BBox) -> Self {
        Block::Image {
            id,
            bbox,
            image_id: None,
        }
    }

    /// Creates a drawing block with a fill color.
    pub fn drawing(id: BlockId, bbox: BBox, fill: Option<Color>) -> Self {
        Block::Drawing {
            id,
            bbox,
            original_bbox: None,
            fill_color: fill,
            stroke_color: None,
            thickness: None,
            path_count: None,
        }
    }
}
