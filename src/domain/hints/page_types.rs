//! Page-role hints: instruction, catalog, or info pages.
//!
//! A light pre-pass over each page's text patterns, used by classifiers to
//! adapt (the parts classifier treats catalog pages differently) and by
//! hosts to skip non-instruction pages.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::blocks::PageData;
use crate::domain::hints::font_sizes::CATALOG_ELEMENT_ID_THRESHOLD;
use crate::domain::hints::histogram::{most_common, TextHistogram};

/// The role of a page within the instruction booklet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageType {
    /// Build steps with parts lists and diagrams.
    Instruction,
    /// The parts catalog at the back of the booklet.
    Catalog,
    /// Covers, legal text, advertisements.
    Info,
}

/// Hint about a single page's type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageHint {
    pub page_index: u32,
    /// Confidence per page type, each in [0.0, 1.0].
    pub confidences: BTreeMap<PageType, f64>,
    pub part_number_count: u32,
    pub part_count_count: u32,
    pub step_number_count: u32,
}

impl PageHint {
    /// The most likely page type.
    pub fn page_type(&self) -> PageType {
        self.confidences
            .iter()
            .max_by(|a, b| a.1.total_cmp(b.1).then(b.0.cmp(a.0)))
            .map(|(ty, _)| *ty)
            .unwrap_or(PageType::Info)
    }

    /// Confidence of the most likely page type.
    pub fn confidence(&self) -> f64 {
        self.confidences
            .values()
            .fold(0.0f64, |acc, v| acc.max(*v))
    }
}

/// Page-type hints for all pages of one document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageTypeHints {
    /// Hints keyed by 1-based page index.
    pub hints: BTreeMap<u32, PageHint>,
}

impl PageTypeHints {
    /// Hints with no information.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Analyzes all pages and derives a hint for each.
    pub fn from_pages(pages: &[PageData]) -> Self {
        let mut hints = BTreeMap::new();
        for page in pages {
            let histogram = TextHistogram::from_page(page);
            let part_number_count = histogram.element_id_count();
            let part_count_count = histogram.part_count_count();

            // Step numbers are hard to isolate in a pre-pass; a small
            // runner-up cluster in the count-like sizes is the signal.
            let mut step_number_count = 0;
            if part_count_count > 0 {
                let ranked = most_common(&histogram.part_count_font_sizes);
                if let Some((_, count)) = ranked.get(1) {
                    if (1..=5).contains(count) {
                        step_number_count = *count;
                    }
                }
            }

            let mut confidences = BTreeMap::new();
            confidences.insert(
                PageType::Catalog,
                if part_number_count > CATALOG_ELEMENT_ID_THRESHOLD {
                    (0.6 + part_number_count as f64 / 100.0).min(0.95)
                } else if part_number_count > 0 {
                    (0.2 + part_number_count as f64 / 50.0).min(0.5)
                } else {
                    0.0
                },
            );
            confidences.insert(
                PageType::Instruction,
                if step_number_count > 0 && part_count_count > 0 {
                    0.9
                } else if step_number_count > 0 {
                    0.8
                } else if part_count_count > 5 && part_number_count < 10 {
                    0.7
                } else if part_count_count > 0 && part_number_count == 0 {
                    0.6
                } else {
                    0.0
                },
            );
            confidences.insert(
                PageType::Info,
                if part_count_count == 0 && part_number_count == 0 {
                    0.8
                } else if part_count_count < 3 && part_number_count < 3 {
                    0.5
                } else {
                    0.0
                },
            );

            let hint = PageHint {
                page_index: page.page_index(),
                confidences,
                part_number_count,
                part_count_count,
                step_number_count,
            };
            debug!(
                page = page.page_index(),
                page_type = ?hint.page_type(),
                confidence = hint.confidence(),
                "page type hint"
            );
            hints.insert(page.page_index(), hint);
        }
        Self { hints }
    }

    /// The hint for a page, when one exists.
    pub fn get(&self, page_index: u32) -> Option<&PageHint> {
        self.hints.get(&page_index)
    }

    /// Checks whether a page is a catalog page with reasonable confidence.
    pub fn is_catalog_page(&self, page_index: u32) -> bool {
        self.get(page_index)
            .map(|h| h.page_type() == PageType::Catalog && h.confidence() >= 0.5)
            .unwrap_or(false)
    }

    /// Checks whether a page is an instruction page with reasonable
    /// confidence.
    pub fn is_instruction_page(&self, page_index: u32) -> bool {
        self.get(page_index)
            .map(|h| h.page_type() == PageType::Instruction && h.confidence() >= 0.5)
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::blocks::Block;
    use crate::core::geometry::BBox;

    fn bb() -> BBox {
        BBox::new(0.0, 0.0, 10.0, 10.0).unwrap()
    }

    fn page_of(index: u32, texts: &[(&str, f64)]) -> PageData {
        let blocks = texts
            .iter()
            .enumerate()
            .map(|(i, (text, size))| Block::text_block(i as u32, bb(), *text, *size))
            .collect();
        PageData::new(index, 600.0, 840.0, blocks).unwrap()
    }

    #[test]
    fn test_catalog_page_detection() {
        let texts: Vec<(&str, f64)> = vec![
            ("6143943", 6.5),
            ("6143944", 6.5),
            ("6143945", 6.5),
            ("6143946", 6.5),
            ("6143947", 6.5),
        ];
        let hints = PageTypeHints::from_pages(&[page_of(7, &texts)]);
        assert!(hints.is_catalog_page(7));
        assert!(!hints.is_instruction_page(7));
    }

    #[test]
    fn test_instruction_page_detection() {
        let texts: Vec<(&str, f64)> = vec![
            ("2x", 9.0),
            ("3x", 9.0),
            ("1x", 9.0),
            ("2x", 9.0),
            ("4x", 9.0),
            ("6x", 9.0),
            ("2", 20.0),
            ("3", 20.0),
        ];
        let hints = PageTypeHints::from_pages(&[page_of(3, &texts)]);
        assert!(hints.is_instruction_page(3));
    }

    #[test]
    fn test_info_page_detection() {
        let hints = PageTypeHints::from_pages(&[page_of(1, &[("WARNING", 8.0)])]);
        let hint = hints.get(1).unwrap();
        assert_eq!(hint.page_type(), PageType::Info);
    }

    #[test]
    fn test_missing_page_defaults_false() {
        let hints = PageTypeHints::empty();
        assert!(!hints.is_catalog_page(9));
        assert!(!hints.is_instruction_page(9));
    }
}
