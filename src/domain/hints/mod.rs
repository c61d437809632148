//! Document-level hints computed once and shared read-only.
//!
//! Hints aggregate statistics across every page of one source document:
//! font-size histograms, modal sizes per text role, and page-type
//! confidences. Classifiers read them to calibrate scores; nothing in the
//! core mutates them after construction.

pub mod font_sizes;
pub mod histogram;
pub mod page_types;

use serde::{Deserialize, Serialize};

use crate::core::blocks::PageData;
pub use font_sizes::FontSizeHints;
pub use histogram::{FontSizeKey, TextHistogram};
pub use page_types::{PageHint, PageType, PageTypeHints};

/// Read-only aggregate over all pages of one document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentHints {
    /// Combined font-size histogram over all pages.
    pub histogram: TextHistogram,
    /// Modal font sizes per text role.
    pub font_sizes: FontSizeHints,
    /// Page-type confidences per page.
    pub page_types: PageTypeHints,
}

impl DocumentHints {
    /// Hints with no information, used for single-page ad-hoc runs.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Computes hints from all pages of a document.
    pub fn from_pages(pages: &[PageData]) -> Self {
        let mut histogram = TextHistogram::empty();
        for page in pages {
            histogram.update(&TextHistogram::from_page(page));
        }
        Self {
            histogram,
            font_sizes: FontSizeHints::from_pages(pages),
            page_types: PageTypeHints::from_pages(pages),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::blocks::Block;
    use crate::core::geometry::BBox;

    #[test]
    fn test_from_pages_populates_all_sections() {
        let bb = BBox::new(0.0, 0.0, 10.0, 10.0).unwrap();
        let blocks = vec![
            Block::text_block(0, bb, "2x", 9.0),
            Block::text_block(1, bb, "3x", 9.0),
            Block::text_block(2, bb, "4x", 9.0),
        ];
        let pages = vec![PageData::new(1, 600.0, 840.0, blocks).unwrap()];
        let hints = DocumentHints::from_pages(&pages);
        assert_eq!(hints.histogram.part_count_count(), 3);
        assert_eq!(hints.font_sizes.part_count_size, Some(9.0));
        assert!(hints.page_types.get(1).is_some());
    }

    #[test]
    fn test_empty_hints() {
        let hints = DocumentHints::empty();
        assert_eq!(hints.histogram, TextHistogram::empty());
        assert_eq!(hints.font_sizes, FontSizeHints::empty());
    }
}
