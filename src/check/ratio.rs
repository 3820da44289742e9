//! Ratio extraction
//!
//! Cards often carry more than one `N/M` value (battery counts, inverter
//! counts, pages of a carousel). Only a ratio whose denominator equals the
//! site's expected total is ever accepted; there is no fallback to a
//! different denominator.

use std::num::NonZeroU32;
use std::sync::OnceLock;

use regex::Regex;

use crate::domain::ExtractedRatio;

static RATIO_RE: OnceLock<Regex> = OnceLock::new();

fn ratio_re() -> &'static Regex {
    RATIO_RE.get_or_init(|| Regex::new(r"\b(\d+)\s*/\s*(\d+)\b").expect("ratio pattern is valid"))
}

/// Every `N/M` pair in `text`, in order of appearance.
///
/// Pairs whose numbers do not fit in a `u32` are skipped.
pub fn ratio_pairs(text: &str) -> Vec<(u32, u32)> {
    ratio_re()
        .captures_iter(text)
        .filter_map(|caps| {
            let n = caps.get(1)?.as_str().parse().ok()?;
            let d = caps.get(2)?.as_str().parse().ok()?;
            Some((n, d))
        })
        .collect()
}

/// Extract the ratio for a site whose expected total is known.
///
/// Among the pairs whose denominator equals `expected_total`, the largest
/// numerator not exceeding the total wins. When every such numerator is out
/// of range (a garbled read), the largest one is returned anyway.
pub fn extract_exact_ratio(text: &str, expected_total: NonZeroU32) -> Option<ExtractedRatio> {
    let total = expected_total.get();
    let exact: Vec<u32> = ratio_pairs(text)
        .into_iter()
        .filter(|&(_, d)| d == total)
        .map(|(n, _)| n)
        .collect();

    let sane = exact.iter().copied().filter(|&n| n <= total).max();
    let numerator = sane.or_else(|| exact.iter().copied().max())?;
    Some(ExtractedRatio::new(numerator, total))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn total(n: u32) -> NonZeroU32 {
        NonZeroU32::new(n).unwrap()
    }

    #[test]
    fn test_picks_matching_denominator() {
        let r = extract_exact_ratio("65/66 connected, see also 40/40", total(66));
        assert_eq!(r, Some(ExtractedRatio::new(65, 66)));
    }

    #[test]
    fn test_never_falls_back_to_other_denominator() {
        assert_eq!(extract_exact_ratio("40/40", total(66)), None);
        assert_eq!(extract_exact_ratio("Batteries 12/13", total(12)), None);
    }

    #[test]
    fn test_prefers_sane_numerator() {
        let r = extract_exact_ratio("99/66 66/66", total(66));
        assert_eq!(r, Some(ExtractedRatio::new(66, 66)));
    }

    #[test]
    fn test_max_sane_numerator() {
        let r = extract_exact_ratio("0/66 inverters, 64/66 batteries", total(66));
        assert_eq!(r, Some(ExtractedRatio::new(64, 66)));
    }

    #[test]
    fn test_insane_only_falls_back_to_max() {
        let r = extract_exact_ratio("99/66 and 70/66", total(66));
        assert_eq!(r, Some(ExtractedRatio::new(99, 66)));
    }

    #[test]
    fn test_whitespace_around_slash() {
        let r = extract_exact_ratio("12 / 12", total(12));
        assert_eq!(r, Some(ExtractedRatio::new(12, 12)));
    }

    #[test]
    fn test_denominator_prefix_not_confused() {
        // "/660" must not satisfy an expected total of 66
        assert_eq!(extract_exact_ratio("600/660", total(66)), None);
    }

    #[test]
    fn test_empty_text() {
        assert_eq!(extract_exact_ratio("", total(1)), None);
        assert_eq!(extract_exact_ratio("", total(66)), None);
    }

    #[test]
    fn test_zero_total_unrepresentable() {
        assert!(NonZeroU32::new(0).is_none());
    }

    #[test]
    fn test_overflowing_numbers_skipped() {
        assert!(ratio_pairs("99999999999/66").is_empty());
        assert_eq!(extract_exact_ratio("99999999999/66 5/66", total(66)), Some(ExtractedRatio::new(5, 66)));
    }

    #[test]
    fn test_denominator_always_matches() {
        let texts = [
            "65/66",
            "1/2 3/4 65/66 66/66 67/66",
            "abc 10/10 x/66 66/ 66",
            "garbage",
            "7/7/7",
            "100 / 66 and 0/66",
        ];
        for text in texts {
            for t in [1, 2, 7, 10, 66] {
                if let Some(r) = extract_exact_ratio(text, total(t)) {
                    assert_eq!(r.denominator, t, "text {:?}", text);
                }
            }
        }
    }

    #[test]
    fn test_pure() {
        let text = "Site A 65/66 | 12/12";
        assert_eq!(
            extract_exact_ratio(text, total(66)),
            extract_exact_ratio(text, total(66))
        );
    }
}
