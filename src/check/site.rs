//! Site checking
//!
//! Composes the card locator and the ratio parser. Each step widens the
//! search scope and only runs once the narrower steps have come up empty:
//!
//! 1. exact label, full card text
//! 2. exact label, slash-bearing card descendants
//! 3. loose label, steps 1-2 on each widened card
//! 4. whole-document scan for `/{expected_total}` (low confidence)

use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use super::locator::{CardLocator, LabelMatch};
use super::ratio::extract_exact_ratio;
use crate::clock::Clock;
use crate::dom::{DocumentHandle, ElementHandle, TextQuery};
use crate::domain::{ExtractedRatio, RatioSource, SiteCheckResult, SiteSpec};
use crate::error::{Result, WatchError};
use crate::wait::{Settle, poll_until};

/// Where inside a card a ratio was read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CardHit {
    Text,
    Descendant,
}

/// Result of one pass over the loosely matching cards
enum LooseHit {
    Ratio(ExtractedRatio),
    /// Cards matched but none carried the ratio
    Cards,
    Nothing,
}

/// Runs the widening search for one site
pub struct SiteChecker {
    clock: Arc<dyn Clock>,
    locator: CardLocator,
    settle: Settle,
}

impl SiteChecker {
    pub fn new(clock: Arc<dyn Clock>, locator: CardLocator) -> Self {
        Self {
            clock,
            locator,
            settle: Settle::default(),
        }
    }

    /// Set the settle window used while a located card renders its ratio
    pub fn with_settle(mut self, settle: Settle) -> Self {
        self.settle = settle;
        self
    }

    pub fn settle(&self) -> Settle {
        self.settle
    }

    /// Check one site. Never fails: errors become a `Failure` outcome.
    pub async fn check_site(
        &self,
        doc: &dyn DocumentHandle,
        site: &SiteSpec,
        budget: Duration,
    ) -> SiteCheckResult {
        let started = self.clock.now();
        let deadline = started + budget;

        let result = match self.search(doc, site, deadline).await {
            Ok((ratio, source)) => {
                if !source.is_card_scoped() {
                    warn!(
                        "{}: {} read from a whole-document scan, card attribution is uncertain",
                        site.label, ratio
                    );
                }
                SiteCheckResult::success(site.clone(), ratio, source)
            }
            Err(e) => SiteCheckResult::failure(site.clone(), e.kind(), e.to_string()),
        };

        let elapsed = self.clock.now().saturating_duration_since(started);
        result.with_elapsed_ms(elapsed.as_millis() as u64)
    }

    async fn search(
        &self,
        doc: &dyn DocumentHandle,
        site: &SiteSpec,
        deadline: Instant,
    ) -> Result<(ExtractedRatio, RatioSource)> {
        let label = site.label.as_str();
        let mut card_seen = false;

        // 1-2: exact label, re-located on every settle poll
        let remaining = self.clock.remaining(deadline);
        match self.locator.locate(doc, label, LabelMatch::Exact, remaining).await {
            Ok(_) => {
                card_seen = true;
                let settle_deadline = self.settle.deadline(self.clock.as_ref(), deadline);
                let hit = poll_until(self.clock.as_ref(), settle_deadline, self.settle.interval, || {
                    self.probe_exact_card(doc, site)
                })
                .await;
                match hit {
                    Ok(Some((ratio, CardHit::Text))) => return Ok((ratio, RatioSource::CardText)),
                    Ok(Some((ratio, CardHit::Descendant))) => {
                        return Ok((ratio, RatioSource::CardDescendant));
                    }
                    Ok(None) => debug!("{}: no N/{} in exact card", label, site.expected_total),
                    Err(e) => warn!("{}: reading exact card failed: {}", label, e),
                }
            }
            Err(WatchError::NotFound(_)) => debug!("{}: exact label not found", label),
            Err(e) => warn!("{}: exact lookup failed: {}", label, e),
        }

        // 3: loose label; a stale card re-runs the whole query
        let stale_deadline = self.clock.now() + self.settle.window;
        let loose = poll_until(self.clock.as_ref(), stale_deadline, self.settle.interval, || {
            self.probe_loose_cards(doc, site)
        })
        .await;
        match loose {
            Ok(Some(LooseHit::Ratio(ratio))) => {
                info!("{}: matched through a partial label", label);
                return Ok((ratio, RatioSource::WidenedCard));
            }
            Ok(Some(LooseHit::Cards)) => card_seen = true,
            Ok(Some(LooseHit::Nothing)) => {}
            Ok(None) => debug!("{}: loose matches kept going stale", label),
            Err(e) => debug!("{}: loose lookup failed: {}", label, e),
        }

        // 4: anywhere in the document
        if let Some(ratio) = self.scan_document(doc, site).await? {
            return Ok((ratio, RatioSource::DocumentScan));
        }

        if card_seen {
            Err(WatchError::Timeout(format!(
                "{}: could not find N/{} in its card",
                label, site.expected_total
            )))
        } else {
            Err(WatchError::NotFound(format!("{}: label not found", label)))
        }
    }

    /// Re-locate the exact card and read it
    async fn probe_exact_card(
        &self,
        doc: &dyn DocumentHandle,
        site: &SiteSpec,
    ) -> Result<Option<(ExtractedRatio, CardHit)>> {
        match self.locator.locate_once(doc, &site.label, LabelMatch::Exact).await? {
            Some(card) => self.read_card(card.as_ref(), site).await,
            None => Ok(None),
        }
    }

    /// Every loosely matching card, read in document order.
    ///
    /// Stale references propagate so the caller re-queries from scratch.
    async fn probe_loose_cards(
        &self,
        doc: &dyn DocumentHandle,
        site: &SiteSpec,
    ) -> Result<Option<LooseHit>> {
        let cards = self.locator.locate_all(doc, &site.label, LabelMatch::Loose).await?;
        if cards.is_empty() {
            return Ok(Some(LooseHit::Nothing));
        }
        for card in cards {
            if let Some((ratio, _)) = self.read_card(card.as_ref(), site).await? {
                return Ok(Some(LooseHit::Ratio(ratio)));
            }
        }
        Ok(Some(LooseHit::Cards))
    }

    /// Full card text first, then each slash-bearing descendant in order
    async fn read_card(
        &self,
        card: &dyn ElementHandle,
        site: &SiteSpec,
    ) -> Result<Option<(ExtractedRatio, CardHit)>> {
        let text = card.text().await?;
        if let Some(ratio) = extract_exact_ratio(&text, site.expected_total) {
            return Ok(Some((ratio, CardHit::Text)));
        }

        for element in card.descendants(&TextQuery::contains("/")).await? {
            let text = match element.text().await {
                Ok(text) => text,
                Err(e) if e.is_stale() => continue,
                Err(e) => return Err(e),
            };
            if let Some(ratio) = extract_exact_ratio(&text, site.expected_total) {
                return Ok(Some((ratio, CardHit::Descendant)));
            }
        }
        Ok(None)
    }

    async fn scan_document(
        &self,
        doc: &dyn DocumentHandle,
        site: &SiteSpec,
    ) -> Result<Option<ExtractedRatio>> {
        let query = TextQuery::contains(format!("/{}", site.expected_total));
        let elements = match doc.find_all(&query).await {
            Ok(elements) => elements,
            Err(e) if e.is_stale() => return Ok(None),
            Err(e) => return Err(e),
        };
        for element in elements {
            match element.text().await {
                Ok(text) => {
                    if let Some(ratio) = extract_exact_ratio(&text, site.expected_total) {
                        return Ok(Some(ratio));
                    }
                }
                Err(e) if e.is_stale() => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(None)
    }
}
