//! Site checking
//!
//! - ratio: text → N/M extraction with exact-denominator policy
//! - locator: site label → enclosing card
//! - site: widening search composing the two

pub mod locator;
pub mod ratio;
pub mod site;

pub use locator::{CardLocator, ClassKeyword, ContainerRule, LabelMatch, MinSize};
pub use ratio::{extract_exact_ratio, ratio_pairs};
pub use site::SiteChecker;
