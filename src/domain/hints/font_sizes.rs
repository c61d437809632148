//! Modal font-size estimates for the well-known text roles.
//!
//! Pages are split into instruction pages and catalog pages (a page with
//! many element-id texts is a catalog page), then the dominant sizes per
//! role are extracted with a minimum-sample threshold so a single odd text
//! cannot set a hint.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::core::blocks::PageData;
use crate::domain::hints::histogram::{most_common, FontSizeCounter, TextHistogram};

/// Minimum occurrences required before a size becomes a hint.
const MIN_SAMPLES: u32 = 3;

/// Pages with more element-id texts than this are catalog pages.
pub const CATALOG_ELEMENT_ID_THRESHOLD: u32 = 3;

/// Font-size hints derived from the document-wide text histogram.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FontSizeHints {
    /// Dominant size of part counts ("2x") on instruction pages.
    pub part_count_size: Option<f64>,
    /// Dominant size of part counts on catalog pages.
    pub catalog_part_count_size: Option<f64>,
    /// Dominant size of element ids on catalog pages.
    pub part_number_size: Option<f64>,
    /// Dominant size of step numbers.
    ///
    /// Step numbers share the small-integer pattern with part counts; the
    /// second most common count-like size on instruction pages is the step
    /// number size.
    pub step_number_size: Option<f64>,
    /// Dominant size of page numbers.
    pub page_number_size: Option<f64>,
}

impl FontSizeHints {
    /// Hints with no information, used when no pages are available.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Extracts hints from all pages of one document.
    pub fn from_pages(pages: &[PageData]) -> Self {
        if pages.is_empty() {
            return Self::empty();
        }

        let mut instruction = TextHistogram::empty();
        let mut catalog = TextHistogram::empty();
        let mut all = TextHistogram::empty();
        let mut catalog_pages = 0u32;
        let mut instruction_pages = 0u32;

        for page in pages {
            let histogram = TextHistogram::from_page(page);
            all.update(&histogram);
            if histogram.element_id_count() > CATALOG_ELEMENT_ID_THRESHOLD {
                catalog.update(&histogram);
                catalog_pages += 1;
            } else {
                instruction.update(&histogram);
                instruction_pages += 1;
            }
        }
        debug!(
            instruction_pages,
            catalog_pages, "split pages for font size analysis"
        );

        let part_count_size = modal_size(&instruction.part_count_font_sizes);
        // The count-like class on instruction pages mixes real part counts
        // with step numbers; the runner-up size is the step number size.
        let step_number_size = nth_size(&instruction.part_count_font_sizes, 1)
            .or_else(|| nth_size(&instruction.page_number_font_sizes, 1));

        let catalog_part_count_size = modal_size(&catalog.part_count_font_sizes);
        if let (Some(catalog_size), Some(instruction_size)) =
            (catalog_part_count_size, part_count_size)
        {
            if catalog_size > instruction_size {
                warn!(
                    catalog_size,
                    instruction_size,
                    "catalog part count size exceeds instruction size; possible misidentification"
                );
            }
        }
        let part_number_size = modal_size(&catalog.element_id_font_sizes);
        let page_number_size = modal_size(&all.page_number_font_sizes);

        let hints = Self {
            part_count_size,
            catalog_part_count_size,
            part_number_size,
            step_number_size,
            page_number_size,
        };
        info!(
            part_count = ?hints.part_count_size,
            step_number = ?hints.step_number_size,
            page_number = ?hints.page_number_size,
            part_number = ?hints.part_number_size,
            "font size hints extracted"
        );
        hints
    }
}

/// The most common size in a counter, when it has enough samples.
fn modal_size(counter: &FontSizeCounter) -> Option<f64> {
    nth_size(counter, 0)
}

/// The nth most common size in a counter, when it has enough samples.
fn nth_size(counter: &FontSizeCounter, n: usize) -> Option<f64> {
    let ranked = most_common(counter);
    let (size, count) = ranked.get(n)?;
    if *count < MIN_SAMPLES {
        debug!(size = size.points(), count, "insufficient samples for hint");
        return None;
    }
    Some(size.points())
}
