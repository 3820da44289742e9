//! Card location
//!
//! The dashboard exposes no stable identifiers, so a site's card is found
//! in two moves: match the site label by its visible text, then climb the
//! ancestor chain to the first element that looks like a card. What
//! "looks like a card" is decided by an ordered list of `ContainerRule`s.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::debug;

use crate::clock::Clock;
use crate::dom::{DocumentHandle, Element, ElementHandle, TextQuery};
use crate::error::{Result, WatchError};
use crate::wait::poll_until;

/// How a site label is matched against element text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelMatch {
    /// Normalized text equals the label, case-sensitive
    Exact,
    /// Text contains the label, case-insensitive
    Loose,
}

impl LabelMatch {
    pub fn query(&self, label: &str) -> TextQuery {
        match self {
            LabelMatch::Exact => TextQuery::equals(label),
            LabelMatch::Loose => TextQuery::contains_ignore_case(label),
        }
    }
}

/// Decides whether an ancestor of a label is the card container
#[async_trait]
pub trait ContainerRule: Send + Sync {
    async fn qualifies(&self, element: &dyn ElementHandle) -> Result<bool>;

    /// Short name for logs
    fn name(&self) -> &str;
}

/// Geometry heuristic: big enough to be a card, not a line of text
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MinSize {
    pub width: f64,
    pub height: f64,
}

impl Default for MinSize {
    fn default() -> Self {
        Self {
            width: 220.0,
            height: 140.0,
        }
    }
}

#[async_trait]
impl ContainerRule for MinSize {
    async fn qualifies(&self, element: &dyn ElementHandle) -> Result<bool> {
        Ok(element.rect().await?.exceeds(self.width, self.height))
    }

    fn name(&self) -> &str {
        "min-size"
    }
}

/// Attribute heuristic: class or role names a container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassKeyword {
    pub keywords: Vec<String>,
}

impl Default for ClassKeyword {
    fn default() -> Self {
        Self::new(["container", "card", "box"])
    }
}

impl ClassKeyword {
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keywords: keywords.into_iter().map(|k| k.into().to_lowercase()).collect(),
        }
    }
}

#[async_trait]
impl ContainerRule for ClassKeyword {
    async fn qualifies(&self, element: &dyn ElementHandle) -> Result<bool> {
        for attr in ["class", "role"] {
            if let Some(value) = element.attribute(attr).await? {
                let value = value.to_lowercase();
                if self.keywords.iter().any(|k| value.contains(k.as_str())) {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    fn name(&self) -> &str {
        "class-keyword"
    }
}

/// Maps a site label to the card that contains it
pub struct CardLocator {
    clock: Arc<dyn Clock>,
    rules: Vec<Box<dyn ContainerRule>>,
    max_climb: usize,
    poll_interval: Duration,
}

impl CardLocator {
    /// Locator with the default geometry and class rules
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            rules: vec![Box::new(MinSize::default()), Box::new(ClassKeyword::default())],
            max_climb: 10,
            poll_interval: Duration::from_millis(100),
        }
    }

    /// Replace the container rules (tried in order on each ancestor)
    pub fn with_rules(mut self, rules: Vec<Box<dyn ContainerRule>>) -> Self {
        self.rules = rules;
        self
    }

    /// Set the maximum number of ancestors to climb
    pub fn with_max_climb(mut self, max_climb: usize) -> Self {
        self.max_climb = max_climb;
        self
    }

    /// Set the poll interval used while waiting for a label
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Wait up to `timeout` for the label and return its card.
    ///
    /// Stale references met while climbing cause a fresh query.
    pub async fn locate(
        &self,
        doc: &dyn DocumentHandle,
        label: &str,
        mode: LabelMatch,
        timeout: Duration,
    ) -> Result<Element> {
        let deadline = self.clock.now() + timeout;
        let found = poll_until(self.clock.as_ref(), deadline, self.poll_interval, || {
            self.locate_once(doc, label, mode)
        })
        .await?;
        found.ok_or_else(|| {
            WatchError::NotFound(format!("no element with text '{}' within {:?}", label, timeout))
        })
    }

    /// Single query: the card of the first matching label, if any
    pub async fn locate_once(
        &self,
        doc: &dyn DocumentHandle,
        label: &str,
        mode: LabelMatch,
    ) -> Result<Option<Element>> {
        let labels = doc.find_all(&mode.query(label)).await?;
        match labels.into_iter().next() {
            Some(first) => Ok(Some(self.enclosing_card(first).await?)),
            None => Ok(None),
        }
    }

    /// Single query: cards of every matching label, in document order
    pub async fn locate_all(
        &self,
        doc: &dyn DocumentHandle,
        label: &str,
        mode: LabelMatch,
    ) -> Result<Vec<Element>> {
        let labels = doc.find_all(&mode.query(label)).await?;
        let mut cards = Vec::with_capacity(labels.len());
        for found in labels {
            cards.push(self.enclosing_card(found).await?);
        }
        Ok(cards)
    }

    /// Climb from a label to the first ancestor any rule accepts.
    ///
    /// Falls back to the immediate parent, or the label itself at the root.
    pub async fn enclosing_card(&self, label: Element) -> Result<Element> {
        let parent = match label.parent().await? {
            Some(parent) => parent,
            None => return Ok(label),
        };

        let mut current = Arc::clone(&parent);
        for hop in 1..=self.max_climb {
            for rule in &self.rules {
                if rule.qualifies(current.as_ref()).await? {
                    debug!("Card found {} hop(s) above label via {}", hop, rule.name());
                    return Ok(current);
                }
            }
            match current.parent().await? {
                Some(next) => current = next,
                None => break,
            }
        }

        debug!("No ancestor qualified as a card, using the label's parent");
        Ok(parent)
    }
}
