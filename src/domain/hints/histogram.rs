//! Font-size histograms over pattern-filtered text classes.
//!
//! Font sizes are floats; to make them usable as histogram keys they are
//! quantized to tenths of a point.

use std::collections::BTreeMap;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::core::blocks::PageData;
use crate::utils::text::{
    extract_element_id, extract_page_number_value, extract_part_count_value,
};

/// A font size quantized to tenths of a point, usable as a map key.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct FontSizeKey(pub u32);

impl FontSizeKey {
    /// Quantizes a font size in points.
    pub fn from_points(size: f64) -> Self {
        Self((size * 10.0).round() as u32)
    }

    /// The size in points this key represents.
    pub fn points(&self) -> f64 {
        self.0 as f64 / 10.0
    }
}

/// Counter over quantized font sizes.
pub type FontSizeCounter = BTreeMap<FontSizeKey, u32>;

/// Histograms of observed font sizes, split by text-pattern class.
///
/// Built per page, then merged across the document. Classes overlap on
/// purpose: a bare "7" counts as both page-number-like and
/// step-number-like; disambiguation happens downstream in the hints.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextHistogram {
    /// Every text block with a font size.
    pub all_font_sizes: FontSizeCounter,
    /// Texts matching the part-count pattern ("2x").
    pub part_count_font_sizes: FontSizeCounter,
    /// Texts matching the page-number pattern (small integers).
    pub page_number_font_sizes: FontSizeCounter,
    /// Texts matching the element-id pattern (4-8 digit catalog numbers).
    pub element_id_font_sizes: FontSizeCounter,
    /// Sizes not claimed by any pattern class.
    pub remaining_font_sizes: FontSizeCounter,
}

fn bump(counter: &mut FontSizeCounter, key: FontSizeKey) {
    *counter.entry(key).or_insert(0) += 1;
}

impl TextHistogram {
    /// An empty histogram.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds the histogram for a single page.
    pub fn from_page(page: &PageData) -> Self {
        let mut histogram = Self::default();
        for block in page.text_blocks() {
            let (Some(text), Some(size)) = (block.text(), block.font_size()) else {
                continue;
            };
            let key = FontSizeKey::from_points(size);
            bump(&mut histogram.all_font_sizes, key);

            let mut claimed = false;
            if extract_part_count_value(text).is_some() {
                bump(&mut histogram.part_count_font_sizes, key);
                claimed = true;
            }
            if extract_page_number_value(text).is_some() {
                bump(&mut histogram.page_number_font_sizes, key);
                claimed = true;
            }
            if extract_element_id(text).is_some() {
                bump(&mut histogram.element_id_font_sizes, key);
                claimed = true;
            }
            if !claimed {
                bump(&mut histogram.remaining_font_sizes, key);
            }
        }
        histogram
    }

    /// Merges another histogram into this one.
    pub fn update(&mut self, other: &TextHistogram) {
        for (dst, src) in [
            (&mut self.all_font_sizes, &other.all_font_sizes),
            (&mut self.part_count_font_sizes, &other.part_count_font_sizes),
            (&mut self.page_number_font_sizes, &other.page_number_font_sizes),
            (&mut self.element_id_font_sizes, &other.element_id_font_sizes),
            (&mut self.remaining_font_sizes, &other.remaining_font_sizes),
        ] {
            for (key, count) in src {
                *dst.entry(*key).or_insert(0) += count;
            }
        }
    }

    /// Total observations in the element-id class.
    pub fn element_id_count(&self) -> u32 {
        self.element_id_font_sizes.values().sum()
    }

    /// Total observations in the part-count class.
    pub fn part_count_count(&self) -> u32 {
        self.part_count_font_sizes.values().sum()
    }
}

/// Returns the `(size, count)` entries of a counter ordered by descending
/// count, with smaller sizes first on ties.
///
/// The tie order makes modal-size extraction deterministic.
pub fn most_common(counter: &FontSizeCounter) -> Vec<(FontSizeKey, u32)> {
    counter
        .iter()
        .map(|(k, v)| (*k, *v))
        .sorted_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::blocks::Block;
    use crate::core::geometry::BBox;

    fn bb() -> BBox {
        BBox::new(0.0, 0.0, 10.0, 10.0).unwrap()
    }

    fn page(texts: &[(&str, f64)]) -> PageData {
        let blocks = texts
            .iter()
            .enumerate()
            .map(|(i, (text, size))| Block::text_block(i as u32, bb(), *text, *size))
            .collect();
        PageData::new(1, 600.0, 840.0, blocks).unwrap()
    }

    #[test]
    fn test_pattern_classes() {
        let page = page(&[
            ("2x", 9.0),
            ("3x", 9.0),
            ("12", 12.0),
            ("6143943", 7.0),
            ("hello", 10.0),
        ]);
        let h = TextHistogram::from_page(&page);
        assert_eq!(h.part_count_count(), 2);
        assert_eq!(h.element_id_count(), 1);
        assert_eq!(
            h.page_number_font_sizes
                .get(&FontSizeKey::from_points(12.0)),
            Some(&1)
        );
        assert_eq!(
            h.remaining_font_sizes.get(&FontSizeKey::from_points(10.0)),
            Some(&1)
        );
        assert_eq!(h.all_font_sizes.values().sum::<u32>(), 5);
    }

    #[test]
    fn test_update_merges_counts() {
        let a = TextHistogram::from_page(&page(&[("2x", 9.0)]));
        let mut b = TextHistogram::from_page(&page(&[("4x", 9.0), ("1x", 8.0)]));
        b.update(&a);
        assert_eq!(b.part_count_count(), 3);
        assert_eq!(
            b.part_count_font_sizes.get(&FontSizeKey::from_points(9.0)),
            Some(&2)
        );
    }

    #[test]
    fn test_most_common_orders_deterministically() {
        let mut counter = FontSizeCounter::new();
        counter.insert(FontSizeKey::from_points(9.0), 3);
        counter.insert(FontSizeKey::from_points(12.0), 3);
        counter.insert(FontSizeKey::from_points(7.0), 5);
        let ranked = most_common(&counter);
        assert_eq!(ranked[0].0.points(), 7.0);
        // Equal counts break ties toward the smaller size.
        assert_eq!(ranked[1].0.points(), 9.0);
        assert_eq!(ranked[2].0.points(), 12.0);
    }

    #[test]
    fn test_font_size_key_quantization() {
        assert_eq!(FontSizeKey::from_points(9.04), FontSizeKey::from_points(9.0));
        assert_ne!(FontSizeKey::from_points(9.1), FontSizeKey::from_points(9.0));
        assert_eq!(FontSizeKey::from_points(9.1).points(), 9.1);
    }
}
