//! Document capabilities
//!
//! The monitor never drives a browser itself. It is handed a
//! `DocumentHandle` for the rendered dashboard and queries it through the
//! traits below. Element handles may go stale at any await point if the
//! page re-renders; every read can therefore fail with
//! `WatchError::StaleReference`.

pub mod snapshot;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

pub use snapshot::{SnapshotDocument, SnapshotNode, SnapshotSession};

/// Shared handle to an element
pub type Element = Arc<dyn ElementHandle>;

/// Rendered size of an element in CSS pixels
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Strictly larger than the given size in both dimensions
    pub fn exceeds(&self, width: f64, height: f64) -> bool {
        self.width > width && self.height > height
    }
}

/// How a query compares an element's own text against its needle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextMatch {
    /// Normalized text equals the needle
    Equals,
    /// Text contains the needle
    Contains,
    /// Text contains the needle, ignoring case
    ContainsIgnoreCase,
}

/// Predicate over an element's own (direct) text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextQuery {
    pub needle: String,
    pub mode: TextMatch,
}

impl TextQuery {
    pub fn equals(needle: impl Into<String>) -> Self {
        Self {
            needle: normalize_text(&needle.into()),
            mode: TextMatch::Equals,
        }
    }

    pub fn contains(needle: impl Into<String>) -> Self {
        Self {
            needle: needle.into(),
            mode: TextMatch::Contains,
        }
    }

    pub fn contains_ignore_case(needle: impl Into<String>) -> Self {
        Self {
            needle: needle.into().to_lowercase(),
            mode: TextMatch::ContainsIgnoreCase,
        }
    }

    /// Evaluate the query against raw element text
    pub fn matches(&self, text: &str) -> bool {
        let text = normalize_text(text);
        if text.is_empty() {
            return false;
        }
        match self.mode {
            TextMatch::Equals => text == self.needle,
            TextMatch::Contains => text.contains(&self.needle),
            TextMatch::ContainsIgnoreCase => text.to_lowercase().contains(&self.needle),
        }
    }
}

impl fmt::Display for TextQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.mode {
            TextMatch::Equals => write!(f, "text = '{}'", self.needle),
            TextMatch::Contains => write!(f, "text contains '{}'", self.needle),
            TextMatch::ContainsIgnoreCase => write!(f, "text contains '{}' (any case)", self.needle),
        }
    }
}

/// Collapse runs of whitespace and trim, like XPath `normalize-space`
pub fn normalize_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// A node in the rendered document
#[async_trait]
pub trait ElementHandle: Send + Sync + fmt::Debug {
    /// Visible text of the element and its descendants, normalized
    async fn text(&self) -> Result<String>;

    /// Rendered bounding size
    async fn rect(&self) -> Result<Rect>;

    /// Attribute value, e.g. `class` or `role`
    async fn attribute(&self, name: &str) -> Result<Option<String>>;

    /// Parent element, `None` at the document root
    async fn parent(&self) -> Result<Option<Element>>;

    /// Descendants whose own text matches, in document order
    async fn descendants(&self, query: &TextQuery) -> Result<Vec<Element>>;
}

/// The authenticated, rendered dashboard page
#[async_trait]
pub trait DocumentHandle: Send + Sync {
    /// Elements whose own text matches, in document order
    async fn find_all(&self, query: &TextQuery) -> Result<Vec<Element>>;

    /// Release the underlying session
    async fn close(&self) -> Result<()> {
        Ok(())
    }
}
