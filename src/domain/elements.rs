//! The structured element model for instruction pages.
//!
//! Elements form a tree rooted at [`Page`]. Leaf elements wrap a single
//! source block (a page number text, a part image); composites own their
//! typed children (a part owns its count and image). Every element carries
//! exactly one bounding box in page coordinates.

use serde::{Deserialize, Serialize};

use crate::core::blocks::BlockId;
use crate::core::geometry::BBox;

/// The page number, usually a small integer near a bottom corner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageNumber {
    pub bbox: BBox,
    pub value: u32,
}

/// A step number label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepNumber {
    pub bbox: BBox,
    pub value: u32,
}

/// A repeat-count label inside a sub-assembly callout (e.g. "2x").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubstepNumber {
    pub bbox: BBox,
    pub value: u32,
}

/// The count label of a parts-list entry (e.g. "2x").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartCount {
    pub bbox: BBox,
    pub count: u32,
}

/// The rendered image of a part.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartImage {
    pub bbox: BBox,
}

/// A LEGO element id (catalog part number).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartNumber {
    pub bbox: BBox,
    pub value: String,
}

/// The measurement label inside a 1:1 piece-length circle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PieceLength {
    pub bbox: BBox,
    pub length: u32,
}

/// A single entry in a parts list: an image with its count and optional
/// catalog metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Part {
    pub bbox: BBox,
    pub count: PartCount,
    pub image: PartImage,
    pub number: Option<PartNumber>,
    pub length: Option<PieceLength>,
}

/// The boxed list of parts needed for a step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartsList {
    pub bbox: BBox,
    pub parts: Vec<Part>,
}

impl PartsList {
    /// Total number of physical pieces, accounting for counts.
    pub fn total_items(&self) -> u32 {
        self.parts.iter().map(|p| p.count.count).sum()
    }
}

/// The main instruction graphic of a step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagram {
    pub bbox: BBox,
}

/// A callout arrow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Arrow {
    pub bbox: BBox,
}

/// The "rotate the model" symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RotationSymbol {
    pub bbox: BBox,
}

/// One numbered step inside a sub-assembly callout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubStep {
    pub bbox: BBox,
    pub number: SubstepNumber,
}

/// A boxed sub-assembly callout, optionally repeated (e.g. "2x").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubAssembly {
    pub bbox: BBox,
    pub repeat: Option<SubstepNumber>,
    pub sub_steps: Vec<SubStep>,
}

/// The bag number, a small integer marking a new bag section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BagNumber {
    pub bbox: BBox,
    pub value: u32,
}

/// The circular "open the bag" glyph, paired with its bag number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenBag {
    pub bbox: BBox,
    pub bag_number: Option<BagNumber>,
}

/// The page-bottom progress bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressBar {
    pub bbox: BBox,
    pub indicator: Option<ProgressBarIndicator>,
}

/// The position marker on the progress bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressBarIndicator {
    pub bbox: BBox,
}

/// A thin separator line between page regions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Divider {
    pub bbox: BBox,
}

/// A page-covering background drawing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Background {
    pub bbox: BBox,
}

/// The "loose part" symbol shown next to parts that ship outside bags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoosePartSymbol {
    pub bbox: BBox,
}

/// The sparkle decoration over new or shiny parts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shine {
    pub bbox: BBox,
}

/// A single instruction step: its number, parts, and graphics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub bbox: BBox,
    pub step_number: StepNumber,
    pub parts_list: Option<PartsList>,
    pub diagram: Option<Diagram>,
    pub rotation_symbol: Option<RotationSymbol>,
    pub arrows: Vec<Arrow>,
    pub sub_assemblies: Vec<SubAssembly>,
}

/// The root element: everything recognized on one page.
///
/// `unprocessed_blocks` lists the block ids no selected element consumed;
/// together with the consumed set it partitions the page's blocks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Page {
    pub bbox: BBox,
    pub page_number: Option<PageNumber>,
    pub steps: Vec<Step>,
    /// Parts lists not attached to any step.
    pub parts_lists: Vec<PartsList>,
    pub open_bags: Vec<OpenBag>,
    pub progress_bar: Option<ProgressBar>,
    pub background: Option<Background>,
    pub dividers: Vec<Divider>,
    /// Arrows no step claimed during spatial assignment.
    pub standalone_arrows: Vec<Arrow>,
    /// Diagrams no step claimed during spatial assignment.
    pub standalone_diagrams: Vec<Diagram>,
    pub loose_part_symbols: Vec<LoosePartSymbol>,
    pub shines: Vec<Shine>,
    /// Built elements whose parent slot could not be filled (e.g. a
    /// rotation symbol when every nearby step already has one).
    pub unplaced: Vec<PageElement>,
    pub warnings: Vec<String>,
    pub unprocessed_blocks: Vec<BlockId>,
}

/// Tagged union over every element variant.
///
/// Built candidates are stored as `PageElement` values inside the
/// classification result; the driver downcasts them through the `into_*`
/// accessors when assembling the page tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "element")]
pub enum PageElement {
    Page(Page),
    PageNumber(PageNumber),
    Step(Step),
    StepNumber(StepNumber),
    SubstepNumber(SubstepNumber),
    PartsList(PartsList),
    Part(Part),
    PartCount(PartCount),
    PartImage(PartImage),
    PartNumber(PartNumber),
    PieceLength(PieceLength),
    Diagram(Diagram),
    Arrow(Arrow),
    RotationSymbol(RotationSymbol),
    SubAssembly(SubAssembly),
    SubStep(SubStep),
    BagNumber(BagNumber),
    OpenBag(OpenBag),
    ProgressBar(ProgressBar),
    ProgressBarIndicator(ProgressBarIndicator),
    Divider(Divider),
    Background(Background),
    LoosePartSymbol(LoosePartSymbol),
    Shine(Shine),
}

macro_rules! element_accessors {
    ($($variant:ident => $ty:ty, $into:ident, $as:ident;)*) => {
        impl PageElement {
            /// Returns the bounding box of the wrapped element.
            pub fn bbox(&self) -> BBox {
                match self {
                    $(PageElement::$variant(e) => e.bbox,)*
                }
            }

            /// Returns the element type tag of the wrapped element.
            pub fn element_type(&self) -> crate::domain::schema::ElementType {
                match self {
                    $(PageElement::$variant(_) => crate::domain::schema::ElementType::$variant,)*
                }
            }
        }

        $(
            impl PageElement {
                /// Consumes the union, returning the wrapped value when the
                /// variant matches.
                pub fn $into(self) -> Option<$ty> {
                    match self {
                        PageElement::$variant(e) => Some(e),
                        _ => None,
                    }
                }

                /// Borrows the wrapped value when the variant matches.
                pub fn $as(&self) -> Option<&$ty> {
                    match self {
                        PageElement::$variant(e) => Some(e),
                        _ => None,
                    }
                }
            }

            impl From<$ty> for PageElement {
                fn from(e: $ty) -> Self {
                    PageElement::$variant(e)
                }
            }
        )*
    };
}

element_accessors! {
    Page => Page, into_page, as_page;
    PageNumber => PageNumber, into_page_number, as_page_number;
    Step => Step, into_step, as_step;
    StepNumber => StepNumber, into_step_number, as_step_number;
    SubstepNumber => SubstepNumber, into_substep_number, as_substep_number;
    PartsList => PartsList, into_parts_list, as_parts_list;
    Part => Part, into_part, as_part;
    PartCount => PartCount, into_part_count, as_part_count;
    PartImage => PartImage, into_part_image, as_part_image;
    PartNumber => PartNumber, into_part_number, as_part_number;
    PieceLength => PieceLength, into_piece_length, as_piece_length;
    Diagram => Diagram, into_diagram, as_diagram;
    Arrow => Arrow, into_arrow, as_arrow;
    RotationSymbol => RotationSymbol, into_rotation_symbol, as_rotation_symbol;
    SubAssembly => SubAssembly, into_sub_assembly, as_sub_assembly;
    SubStep => SubStep, into_sub_step, as_sub_step;
    BagNumber => BagNumber, into_bag_number, as_bag_number;
    OpenBag => OpenBag, into_open_bag, as_open_bag;
    ProgressBar => ProgressBar, into_progress_bar, as_progress_bar;
    ProgressBarIndicator => ProgressBarIndicator, into_progress_bar_indicator, as_progress_bar_indicator;
    Divider => Divider, into_divider, as_divider;
    Background => Background, into_background, as_background;
    LoosePartSymbol => LoosePartSymbol, into_loose_part_symbol, as_loose_part_symbol;
    Shine => Shine, into_shine, as_shine;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::schema::ElementType;

    fn bb(x0: f64, y0: f64, x1: f64, y1: f64) -> BBox {
        BBox::new(x0, y0, x1, y1).unwrap()
    }

    #[test]
    fn test_parts_list_total_items() {
        let part = |count| Part {
            bbox: bb(0.0, 0.0, 10.0, 10.0),
            count: PartCount {
                bbox: bb(0.0, 8.0, 4.0, 10.0),
                count,
            },
            image: PartImage {
                bbox: bb(0.0, 0.0, 10.0, 8.0),
            },
            number: None,
            length: None,
        };
        let list = PartsList {
            bbox: bb(0.0, 0.0, 30.0, 12.0),
            parts: vec![part(2), part(5)],
        };
        assert_eq!(list.total_items(), 7);
    }

    #[test]
    fn test_element_union_accessors() {
        let e: PageElement = StepNumber {
            bbox: bb(1.0, 2.0, 3.0, 4.0),
            value: 9,
        }
        .into();
        assert_eq!(e.element_type(), ElementType::StepNumber);
        assert_eq!(e.bbox(), bb(1.0, 2.0, 3.0, 4.0));
        assert_eq!(e.as_step_number().map(|s| s.value), Some(9));
        assert!(e.as_diagram().is_none());
        assert_eq!(e.into_step_number().map(|s| s.value), Some(9));
    }

    #[test]
    fn test_page_element_serde_round_trip() {
        let e: PageElement = OpenBag {
            bbox: bb(0.0, 0.0, 40.0, 40.0),
            bag_number: Some(BagNumber {
                bbox: bb(5.0, 5.0, 15.0, 15.0),
                value: 3,
            }),
        }
        .into();
        let json = serde_json::to_string(&e).unwrap();
        assert!(json.contains("\"element\":\"OpenBag\""));
        let back: PageElement = serde_json::from_str(&json).unwrap();
        assert_eq!(e, back);
    }

    #[test]
    fn test_page_serde_round_trip() {
        let page = Page {
            bbox: bb(0.0, 0.0, 600.0, 840.0),
            page_number: Some(PageNumber {
                bbox: bb(10.0, 820.0, 25.0, 835.0),
                value: 5,
            }),
            warnings: vec!["missing step".into()],
            unprocessed_blocks: vec![3, 7],
            ..Page::default()
        };
        let json = serde_json::to_string(&page).unwrap();
        let back: Page = serde_json::from_str(&json).unwrap();
        assert_eq!(page, back);
    }
}
