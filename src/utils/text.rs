//! Text value extraction shared between scoring and building.
//!
//! These helpers are the single source of truth for parsing the small
//! numeric texts that appear on instruction pages. Classifiers use them for
//! pattern scoring and builders use them when constructing elements, so a
//! candidate that scored as a part count can always be parsed as one at
//! build time.
//!
//! All functions are pure and return `None` on any parse failure.

use once_cell::sync::Lazy;
use regex::Regex;

static PAGE_NUMBER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^0*(\d{1,3})$").expect("static regex"));
static PAGE_NUMBER_PREFIXED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(?:page|p\.?)\s*0*(\d{1,3})$").expect("static regex"));
static STEP_NUMBER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[1-9]\d{0,3}$").expect("static regex"));
static PART_COUNT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(\d{1,3})\s*[x×]$").expect("static regex"));
static BAG_NUMBER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[1-9]\d?$").expect("static regex"));
static SUBSTEP_NUMBER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,2})\s*[x×]$").expect("static regex"));

/// Extracts a page number from text.
///
/// Accepts plain numbers with optional leading zeros ("42", "007") and a
/// `page` / `p.` prefix ("page 12", "P. 5").
pub fn extract_page_number_value(text: &str) -> Option<u32> {
    let t = text.trim();
    if let Some(caps) = PAGE_NUMBER_RE.captures(t) {
        return caps[1].parse().ok();
    }
    if let Some(caps) = PAGE_NUMBER_PREFIXED_RE.captures(t) {
        return caps[1].parse().ok();
    }
    None
}

/// Extracts a step number from text.
///
/// Step numbers are plain integers 1-9999 without leading zeros.
pub fn extract_step_number_value(text: &str) -> Option<u32> {
    let t = text.trim();
    if STEP_NUMBER_RE.is_match(t) {
        return t.parse().ok();
    }
    None
}

/// Extracts a part count from text like "2x", "3X" or "5×".
pub fn extract_part_count_value(text: &str) -> Option<u32> {
    let t = text.trim();
    PART_COUNT_RE
        .captures(t)
        .and_then(|caps| caps[1].parse().ok())
}

/// Extracts a bag number from text.
///
/// Bag numbers are small positive integers (1-99).
pub fn extract_bag_number_value(text: &str) -> Option<u32> {
    let t = text.trim();
    if BAG_NUMBER_RE.is_match(t) {
        return t.parse().ok();
    }
    None
}

/// Extracts a sub-assembly repeat count from text like "2x".
///
/// The repeat marker on a sub-assembly callout uses the same `Nx` shape as
/// part counts but stays small (1-99).
pub fn extract_substep_repeat_value(text: &str) -> Option<u32> {
    let t = text.trim();
    SUBSTEP_NUMBER_RE
        .captures(t)
        .and_then(|caps| caps[1].parse().ok())
        .filter(|v| *v >= 1)
}

/// Extracts a LEGO element id from text.
///
/// Element ids are 4-8 digit numbers that never start with zero; seven
/// digits is by far the most common length in practice.
pub fn extract_element_id(text: &str) -> Option<&str> {
    let t = text.trim();
    if !t.chars().all(|c| c.is_ascii_digit()) || t.is_empty() {
        return None;
    }
    if t.starts_with('0') {
        return None;
    }
    if (4..=8).contains(&t.len()) {
        return Some(t);
    }
    None
}

/// Extracts a piece length value from text.
///
/// Piece lengths are the small integers printed inside 1:1 measurement
/// circles, typically 1-32 studs.
pub fn extract_piece_length_value(text: &str) -> Option<u32> {
    let t = text.trim();
    if !STEP_NUMBER_RE.is_match(t) {
        return None;
    }
    let value: u32 = t.parse().ok()?;
    if (1..=32).contains(&value) {
        Some(value)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_page_number_value() {
        assert_eq!(extract_page_number_value("42"), Some(42));
        assert_eq!(extract_page_number_value("007"), Some(7));
        assert_eq!(extract_page_number_value("page 12"), Some(12));
        assert_eq!(extract_page_number_value("P. 5"), Some(5));
        assert_eq!(extract_page_number_value(" 8 "), Some(8));
        assert_eq!(extract_page_number_value("abc"), None);
        assert_eq!(extract_page_number_value("1234"), None);
        assert_eq!(extract_page_number_value(""), None);
    }

    #[test]
    fn test_extract_step_number_value() {
        assert_eq!(extract_step_number_value("1"), Some(1));
        assert_eq!(extract_step_number_value("42"), Some(42));
        assert_eq!(extract_step_number_value("1234"), Some(1234));
        assert_eq!(extract_step_number_value("0"), None);
        assert_eq!(extract_step_number_value("012"), None);
        assert_eq!(extract_step_number_value("12345"), None);
        assert_eq!(extract_step_number_value("abc"), None);
    }

    #[test]
    fn test_extract_part_count_value() {
        assert_eq!(extract_part_count_value("2x"), Some(2));
        assert_eq!(extract_part_count_value("3X"), Some(3));
        assert_eq!(extract_part_count_value("5×"), Some(5));
        assert_eq!(extract_part_count_value("12 x"), Some(12));
        assert_eq!(extract_part_count_value("x"), None);
        assert_eq!(extract_part_count_value("2"), None);
        assert_eq!(extract_part_count_value("abc"), None);
    }

    #[test]
    fn test_extract_bag_number_value() {
        assert_eq!(extract_bag_number_value("1"), Some(1));
        assert_eq!(extract_bag_number_value("10"), Some(10));
        assert_eq!(extract_bag_number_value("99"), Some(99));
        assert_eq!(extract_bag_number_value("0"), None);
        assert_eq!(extract_bag_number_value("100"), None);
        assert_eq!(extract_bag_number_value("abc"), None);
    }

    #[test]
    fn test_extract_element_id() {
        assert_eq!(extract_element_id("300121"), Some("300121"));
        assert_eq!(extract_element_id("6143943"), Some("6143943"));
        assert_eq!(extract_element_id("123"), None);
        assert_eq!(extract_element_id("012345"), None);
        assert_eq!(extract_element_id("123456789"), None);
        assert_eq!(extract_element_id("12a4567"), None);
    }

    #[test]
    fn test_extract_piece_length_value() {
        assert_eq!(extract_piece_length_value("4"), Some(4));
        assert_eq!(extract_piece_length_value("32"), Some(32));
        assert_eq!(extract_piece_length_value("33"), None);
        assert_eq!(extract_piece_length_value("0"), None);
        assert_eq!(extract_piece_length_value("4x"), None);
    }

    #[test]
    fn test_extract_substep_repeat_value() {
        assert_eq!(extract_substep_repeat_value("2x"), Some(2));
        assert_eq!(extract_substep_repeat_value("10×"), Some(10));
        assert_eq!(extract_substep_repeat_value("100x"), None);
        assert_eq!(extract_substep_repeat_value("2"), None);
    }
}
