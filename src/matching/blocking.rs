use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::info;

use crate::domain::{Market, MarketPair};

/// Composite blocking key used to cheaply reject obviously-unrelated
/// market pairs before the LLM similarity pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockingKey {
    pub category: Option<String>,
    pub entities: BTreeSet<String>,
    pub date_tokens: BTreeSet<String>,
    pub numeric_thresholds: BTreeSet<String>,
}

static UPPERCASE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b[A-Z]{2,}\b").unwrap());
static NUMBER_WITH_UNIT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[$€£¥]?\d+\.?\d*%?").unwrap());
static CAPITALIZED_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b[A-Z][a-z]+(?:\s+[A-Z][a-z]+)*\b").unwrap());
static MONTH_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\b").unwrap());
static YEAR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b20\d{2}\b").unwrap());
static QUARTER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bq[1-4]\b").unwrap());
static THRESHOLD_RES: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"(?:above|over|exceed[s]?|≥|>=)\s*[$€£¥]?\d+\.?\d*%?").unwrap(),
        Regex::new(r"(?:below|under|less than|≤|<=)\s*[$€£¥]?\d+\.?\d*%?").unwrap(),
        Regex::new(r"[$€£¥]?\d+\.?\d*%?\s*(?:or more|or less|and above|and below)").unwrap(),
    ]
});

fn extract_entities(text: &str) -> BTreeSet<String> {
    let mut entities = BTreeSet::new();
    for m in UPPERCASE_RE.find_iter(text) {
        entities.insert(m.as_str().to_lowercase());
    }
    for m in NUMBER_WITH_UNIT_RE.find_iter(text) {
        entities.insert(m.as_str().to_string());
    }
    for m in CAPITALIZED_RE.find_iter(text) {
        if m.as_str().len() > 3 {
            entities.insert(m.as_str().to_lowercase());
        }
    }
    entities
}

fn extract_dates(text: &str) -> BTreeSet<String> {
    let lower = text.to_lowercase();
    let mut dates = BTreeSet::new();
    for m in MONTH_RE.find_iter(&lower) {
        dates.insert(m.as_str().to_string());
    }
    for m in YEAR_RE.find_iter(text) {
        dates.insert(m.as_str().to_string());
    }
    for m in QUARTER_RE.find_iter(&lower) {
        dates.insert(m.as_str().to_string());
    }
    dates
}

fn extract_numeric_thresholds(text: &str) -> BTreeSet<String> {
    let lower = text.to_lowercase();
    let mut thresholds = BTreeSet::new();
    for re in THRESHOLD_RES.iter() {
        for m in re.find_iter(&lower) {
            thresholds.insert(m.as_str().to_string());
        }
    }
    thresholds
}

fn jaccard_similarity(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.union(b).count();
    if union == 0 {
        0.0
    } else {
        intersection as f64 / union as f64
    }
}

/// Generates candidate market pairs across two venues using lexical and
/// entity-based blocking, reducing the O(n*m) candidate space before the
/// more expensive LLM similarity pass.
pub struct CandidateGenerator {
    min_jaccard: f64,
}

impl Default for CandidateGenerator {
    fn default() -> Self {
        Self { min_jaccard: 0.3 }
    }
}

impl CandidateGenerator {
    #[must_use]
    pub fn new(min_jaccard: f64) -> Self {
        Self { min_jaccard }
    }

    fn blocking_key(market: &Market) -> BlockingKey {
        let full_text = format!("{} {}", market.title, market.resolution_source);
        BlockingKey {
            category: Some(market.category.to_lowercase()).filter(|c| !c.is_empty()),
            entities: extract_entities(&full_text),
            date_tokens: extract_dates(&full_text),
            numeric_thresholds: extract_numeric_thresholds(&full_text),
        }
    }

    fn is_candidate_pair(&self, key_a: &BlockingKey, key_b: &BlockingKey) -> bool {
        if let (Some(a), Some(b)) = (&key_a.category, &key_b.category) {
            if a != b {
                return false;
            }
        }

        let date_jaccard = jaccard_similarity(&key_a.date_tokens, &key_b.date_tokens);
        if date_jaccard < 0.5 && (!key_a.date_tokens.is_empty() || !key_b.date_tokens.is_empty()) {
            return false;
        }

        jaccard_similarity(&key_a.entities, &key_b.entities) >= self.min_jaccard
    }

    /// Generates candidate pairs between markets on venue A and venue B.
    pub fn generate(&self, venue_a_markets: &[Market], venue_b_markets: &[Market]) -> Vec<MarketPair> {
        let keys_a: Vec<BlockingKey> = venue_a_markets.iter().map(Self::blocking_key).collect();
        let keys_b: Vec<BlockingKey> = venue_b_markets.iter().map(Self::blocking_key).collect();

        let mut pairs = Vec::new();
        let mut blocked_count = 0usize;

        for (i, market_a) in venue_a_markets.iter().enumerate() {
            for (j, market_b) in venue_b_markets.iter().enumerate() {
                if !self.is_candidate_pair(&keys_a[i], &keys_b[j]) {
                    blocked_count += 1;
                    continue;
                }

                let entity_jaccard = jaccard_similarity(&keys_a[i].entities, &keys_b[j].entities);
                pairs.push(MarketPair::new(
                    format!("{}:{}", market_a.market_ref.market_id, market_b.market_ref.market_id),
                    market_a.market_ref.clone(),
                    market_b.market_ref.clone(),
                    entity_jaccard,
                ));
            }
        }

        let total = pairs.len() + blocked_count;
        info!(
            candidates = pairs.len(),
            blocked = blocked_count,
            reduction_pct = if total > 0 { 100.0 * blocked_count as f64 / total as f64 } else { 0.0 },
            "candidate_generation_complete"
        );

        pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{MarketRef, Venue};
    use chrono::Utc;

    fn market(venue: Venue, id: &str, title: &str, category: &str) -> Market {
        Market {
            market_ref: MarketRef::new(venue, id, title),
            title: title.to_string(),
            category: category.to_string(),
            resolution_source: "AP".into(),
            open_time: Utc::now() - chrono::Duration::days(7),
            closes_at: Utc::now(),
            threshold_operator: None,
            threshold_value: None,
        }
    }

    #[test]
    fn blocks_pairs_with_mismatched_categories() {
        let generator = CandidateGenerator::default();
        let a = vec![market(Venue::Polymarket, "1", "Will Biden win in November 2024", "politics")];
        let b = vec![market(Venue::Kalshi, "2", "Will Biden win in November 2024", "sports")];
        assert!(generator.generate(&a, &b).is_empty());
    }

    #[test]
    fn admits_pairs_with_overlapping_entities_and_dates() {
        let generator = CandidateGenerator::default();
        let a = vec![market(Venue::Polymarket, "1", "Will Trump win the November 2024 election", "politics")];
        let b = vec![market(Venue::Kalshi, "2", "Will Trump win the November 2024 election", "politics")];
        let pairs = generator.generate(&a, &b);
        assert_eq!(pairs.len(), 1);
    }
}
