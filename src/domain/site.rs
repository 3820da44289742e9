//! Site descriptors
//!
//! A SiteSpec names one dashboard card and the number of batteries
//! expected behind it. Specs are validated on construction and never
//! change for the lifetime of the process.

use std::fmt;
use std::num::NonZeroU32;

use serde::{Deserialize, Serialize};

use crate::error::{Result, WatchError};

/// One monitored site: its card label and expected battery total
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawSite")]
pub struct SiteSpec {
    /// Title text shown on the site's card
    pub label: String,
    /// Denominator every reported ratio must carry
    pub expected_total: NonZeroU32,
}

#[derive(Deserialize)]
struct RawSite {
    label: String,
    expected_total: u32,
}

impl TryFrom<RawSite> for SiteSpec {
    type Error = WatchError;

    fn try_from(raw: RawSite) -> Result<Self> {
        SiteSpec::new(raw.label, raw.expected_total)
    }
}

impl SiteSpec {
    /// Create a validated site spec.
    ///
    /// The label is trimmed and must not be empty; the total must be positive.
    pub fn new(label: impl Into<String>, expected_total: u32) -> Result<Self> {
        let label = label.into().trim().to_string();
        if label.is_empty() {
            return Err(WatchError::InvalidSite("label must not be empty".to_string()));
        }
        let expected_total = NonZeroU32::new(expected_total).ok_or_else(|| {
            WatchError::InvalidSite(format!("{}: expected_total must be greater than 0", label))
        })?;
        Ok(Self {
            label,
            expected_total,
        })
    }

    /// Expected total as a plain integer
    pub fn total(&self) -> u32 {
        self.expected_total.get()
    }
}

impl fmt::Display for SiteSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (expected {})", self.label, self.expected_total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_site() {
        let site = SiteSpec::new("Warburg3", 66).unwrap();
        assert_eq!(site.label, "Warburg3");
        assert_eq!(site.total(), 66);
    }

    #[test]
    fn test_label_is_trimmed() {
        let site = SiteSpec::new("  Dimona 2 ", 12).unwrap();
        assert_eq!(site.label, "Dimona 2");
    }

    #[test]
    fn test_empty_label_rejected() {
        let err = SiteSpec::new("   ", 12).unwrap_err();
        assert!(matches!(err, WatchError::InvalidSite(_)));
    }

    #[test]
    fn test_zero_total_rejected() {
        let err = SiteSpec::new("Warburg3", 0).unwrap_err();
        assert!(err.to_string().contains("greater than 0"));
    }

    #[test]
    fn test_deserialize_validates() {
        let site: SiteSpec =
            serde_json::from_str(r#"{"label": "Warburg3", "expected_total": 66}"#).unwrap();
        assert_eq!(site.total(), 66);

        let bad = serde_json::from_str::<SiteSpec>(r#"{"label": "Warburg3", "expected_total": 0}"#);
        assert!(bad.is_err());
    }

    #[test]
    fn test_display() {
        let site = SiteSpec::new("Warburg3", 66).unwrap();
        assert_eq!(site.to_string(), "Warburg3 (expected 66)");
    }
}
