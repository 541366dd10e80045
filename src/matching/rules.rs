use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::prelude::ToPrimitive;

use crate::domain::Market;

/// Outcome of a hard-rules check: a pass/fail plus a human-readable
/// explanation when it fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    pub passed: bool,
    pub reason: Option<String>,
}

impl ValidationResult {
    fn pass() -> Self {
        Self { passed: true, reason: None }
    }

    fn fail(reason: impl Into<String>) -> Self {
        Self { passed: false, reason: Some(reason.into()) }
    }
}

const RESOLUTION_SYNONYMS: &[(&str, &str)] = &[
    ("official", "official_data"),
    ("bureau of labor statistics", "bls"),
    ("federal reserve", "fed"),
    ("new york times", "nyt"),
    ("associated press", "ap"),
];

static THRESHOLD_GE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?:>=|≥|at least)\s*(\d+\.?\d*)").unwrap());
static THRESHOLD_GT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?:>|above|over|exceed[s]?)\s*(\d+\.?\d*)").unwrap());
static THRESHOLD_LE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?:<=|≤|at most)\s*(\d+\.?\d*)").unwrap());
static THRESHOLD_LT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?:<|below|under|less than)\s*(\d+\.?\d*)").unwrap());

fn normalize_resolution_source(source: &str) -> String {
    let mut normalized = source.to_lowercase();
    for (pattern, replacement) in RESOLUTION_SYNONYMS {
        if normalized.contains(pattern) {
            normalized = replacement.to_string();
            break;
        }
    }
    normalized
}

fn extract_numeric_threshold(text: &str) -> Option<(&'static str, f64)> {
    let lower = text.to_lowercase();
    if let Some(caps) = THRESHOLD_GE_RE.captures(&lower) {
        return Some((">=", caps[1].parse().ok()?));
    }
    if let Some(caps) = THRESHOLD_GT_RE.captures(&lower) {
        return Some((">", caps[1].parse().ok()?));
    }
    if let Some(caps) = THRESHOLD_LE_RE.captures(&lower) {
        return Some(("<=", caps[1].parse().ok()?));
    }
    if let Some(caps) = THRESHOLD_LT_RE.captures(&lower) {
        return Some(("<", caps[1].parse().ok()?));
    }
    None
}

const MIN_TRADING_WINDOW_HOURS: i64 = 1;

/// Deterministic, pre-LLM validation: checks a candidate pair cannot be
/// rejected on hard factual grounds (closing-time window, explicit
/// threshold mismatch) before spending an LLM call on it.
pub struct HardRulesValidator {
    time_window_tolerance_hours: i64,
    allowed_resolution_mismatches: Vec<(String, String)>,
}

impl Default for HardRulesValidator {
    fn default() -> Self {
        Self { time_window_tolerance_hours: 24, allowed_resolution_mismatches: Vec::new() }
    }
}

impl HardRulesValidator {
    #[must_use]
    pub fn new(time_window_tolerance_hours: i64, allowed_resolution_mismatches: Vec<(String, String)>) -> Self {
        Self { time_window_tolerance_hours, allowed_resolution_mismatches }
    }

    fn resolution_mismatch_allowed(&self, source_a: &str, source_b: &str) -> bool {
        self.allowed_resolution_mismatches
            .iter()
            .any(|(a, b)| (a == source_a && b == source_b) || (a == source_b && b == source_a))
    }

    fn check_time_window_alignment(&self, market_a: &Market, market_b: &Market) -> ValidationResult {
        let diff = (market_a.closes_at - market_b.closes_at).num_seconds().abs();
        if diff > self.time_window_tolerance_hours * 3600 {
            return ValidationResult::fail(format!(
                "closing times differ by {diff}s, exceeding tolerance of {}h",
                self.time_window_tolerance_hours
            ));
        }

        for (label, market) in [("a", market_a), ("b", market_b)] {
            let window_hours = market.trading_window().num_seconds() as f64 / 3600.0;
            if window_hours < MIN_TRADING_WINDOW_HOURS as f64 {
                return ValidationResult::fail(format!("market {label} trading window of {window_hours:.2}h is below the {MIN_TRADING_WINDOW_HOURS}h minimum"));
            }
        }

        ValidationResult::pass()
    }

    fn check_threshold_alignment(&self, market_a: &Market, market_b: &Market) -> ValidationResult {
        let explicit_a = market_a
            .threshold_operator
            .as_deref()
            .zip(market_a.threshold_value)
            .map(|(op, v)| (op.to_string(), v.to_f64().unwrap_or(0.0)));
        let explicit_b = market_b
            .threshold_operator
            .as_deref()
            .zip(market_b.threshold_value)
            .map(|(op, v)| (op.to_string(), v.to_f64().unwrap_or(0.0)));

        let threshold_a = explicit_a.or_else(|| extract_numeric_threshold(&market_a.title).map(|(op, v)| (op.to_string(), v)));
        let threshold_b = explicit_b.or_else(|| extract_numeric_threshold(&market_b.title).map(|(op, v)| (op.to_string(), v)));

        match (threshold_a, threshold_b) {
            (None, None) => ValidationResult::pass(),
            (Some(_), None) | (None, Some(_)) => ValidationResult::fail("only one market specifies a numeric threshold"),
            (Some((op_a, val_a)), Some((op_b, val_b))) => {
                if op_a != op_b {
                    return ValidationResult::fail(format!("threshold operators differ: {op_a} vs {op_b}"));
                }
                if (val_a - val_b).abs() > 0.01 {
                    return ValidationResult::fail(format!("threshold values differ: {val_a} vs {val_b}"));
                }
                ValidationResult::pass()
            }
        }
    }

    /// Runs all hard-rules checks, short-circuiting on the first failure.
    pub fn validate(&self, market_a: &Market, market_b: &Market) -> ValidationResult {
        let time_check = self.check_time_window_alignment(market_a, market_b);
        if !time_check.passed {
            return time_check;
        }

        let threshold_check = self.check_threshold_alignment(market_a, market_b);
        if !threshold_check.passed {
            return threshold_check;
        }

        let source_a = normalize_resolution_source(&market_a.resolution_source);
        let source_b = normalize_resolution_source(&market_b.resolution_source);
        if source_a != source_b && !source_a.is_empty() && !source_b.is_empty() {
            if self.resolution_mismatch_allowed(&source_a, &source_b) {
                tracing::debug!(%source_a, %source_b, "resolution_source_mismatch_allowed");
            } else {
                return ValidationResult::fail(format!("resolution sources differ: {source_a} vs {source_b}"));
            }
        }

        ValidationResult::pass()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{MarketRef, Venue};
    use chrono::{Duration, Utc};
    use rust_decimal_macros::dec;

    fn market(closes_at: chrono::DateTime<Utc>, op: Option<&str>, val: Option<rust_decimal::Decimal>) -> Market {
        Market {
            market_ref: MarketRef::new(Venue::Polymarket, "1", "a"),
            title: "Will inflation exceed 3%".into(),
            category: "economics".into(),
            resolution_source: "Bureau of Labor Statistics".into(),
            open_time: closes_at - Duration::days(30),
            closes_at,
            threshold_operator: op.map(String::from),
            threshold_value: val,
        }
    }

    #[test]
    fn rejects_pairs_with_distant_closing_times() {
        let validator = HardRulesValidator::default();
        let now = Utc::now();
        let a = market(now, None, None);
        let b = market(now + Duration::hours(48), None, None);
        let result = validator.validate(&a, &b);
        assert!(!result.passed);
    }

    #[test]
    fn rejects_mismatched_explicit_thresholds() {
        let validator = HardRulesValidator::default();
        let now = Utc::now();
        let a = market(now, Some(">="), Some(dec!(3.0)));
        let b = market(now, Some(">="), Some(dec!(4.0)));
        let result = validator.validate(&a, &b);
        assert!(!result.passed);
    }

    #[test]
    fn rejects_threshold_mismatch_parsed_from_titles() {
        let validator = HardRulesValidator::default();
        let now = Utc::now();
        let mut a = market(now, None, None);
        a.title = "CPI \u{2265} 3.0% Dec 2024".into();
        let mut b = market(now, None, None);
        b.title = "CPI \u{2265} 3.5% Dec 2024".into();

        let result = validator.validate(&a, &b);
        assert!(!result.passed);
        assert!(result.reason.unwrap().contains("threshold"));
    }

    #[test]
    fn accepts_matching_thresholds_within_tolerance() {
        let validator = HardRulesValidator::default();
        let now = Utc::now();
        let a = market(now, Some(">="), Some(dec!(3.00)));
        let b = market(now, Some(">="), Some(dec!(3.005)));
        let result = validator.validate(&a, &b);
        assert!(result.passed);
    }

    #[test]
    fn rejects_market_open_for_less_than_an_hour() {
        let validator = HardRulesValidator::default();
        let now = Utc::now();
        let mut a = market(now, None, None);
        a.open_time = now - Duration::minutes(30);
        let b = market(now, None, None);
        let result = validator.validate(&a, &b);
        assert!(!result.passed);
        assert!(result.reason.unwrap().contains("trading window"));
    }

    #[test]
    fn rejects_resolution_source_mismatch_by_default() {
        let validator = HardRulesValidator::default();
        let now = Utc::now();
        let mut a = market(now, None, None);
        a.resolution_source = "Bureau of Labor Statistics".into();
        let mut b = market(now, None, None);
        b.resolution_source = "Reuters".into();
        let result = validator.validate(&a, &b);
        assert!(!result.passed);
        assert!(result.reason.unwrap().contains("resolution sources"));
    }

    #[test]
    fn allows_resolution_source_mismatch_when_allow_listed() {
        let validator = HardRulesValidator::new(24, vec![("bls".into(), "reuters".into())]);
        let now = Utc::now();
        let mut a = market(now, None, None);
        a.resolution_source = "Bureau of Labor Statistics".into();
        let mut b = market(now, None, None);
        b.resolution_source = "Reuters".into();
        let result = validator.validate(&a, &b);
        assert!(result.passed);
    }
}
