//! Merges raw check output into the final, ordered finding set.

use crate::types::{Finding, RawFinding, Severity, SkipMarker};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SeverityPolicy {
    /// Weighted confidence above which an info finding becomes a warning
    pub high_confidence_cutoff: f64,
}

impl Default for SeverityPolicy {
    fn default() -> Self {
        Self {
            high_confidence_cutoff: 0.9,
        }
    }
}

impl SeverityPolicy {
    pub fn severity_for(&self, raw: &RawFinding) -> Severity {
        let base = raw.category.base_severity();
        if raw.category.is_promotable() && raw.confidence * raw.severity_weight > self.high_confidence_cutoff {
            Severity::Warning
        } else {
            base
        }
    }
}

/// Findings plus the markers of checks that did not produce results. The two
/// channels stay separate so "no issues" is distinguishable from "did not run".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FindingSet {
    pub findings: Vec<Finding>,
    pub skipped: Vec<SkipMarker>,
}

#[derive(Debug, Clone, Default)]
pub struct Aggregator {
    policy: SeverityPolicy,
}

impl Aggregator {
    pub fn new(policy: SeverityPolicy) -> Self {
        Self { policy }
    }

    /// Assign severities, drop exact duplicates and sort.
    ///
    /// Only exact `(check_id, location, span, message)` duplicates are removed;
    /// every other finding survives.
    pub fn aggregate(&self, raw: Vec<RawFinding>, mut skipped: Vec<SkipMarker>) -> FindingSet {
        let mut findings: Vec<Finding> = raw
            .into_iter()
            .map(|r| {
                let severity = self.policy.severity_for(&r);
                Finding::from_raw(r, severity)
            })
            .collect();

        sort_findings(&mut findings);
        let mut seen = HashSet::new();
        findings.retain(|f| {
            seen.insert((
                f.check_id,
                f.segment_location,
                f.span,
                f.message.clone(),
            ))
        });

        skipped.sort_by(|a, b| {
            (a.language, a.check_id.as_str(), a.detail.as_str())
                .cmp(&(b.language, b.check_id.as_str(), b.detail.as_str()))
        });
        skipped.dedup();

        FindingSet { findings, skipped }
    }
}

fn compare(a: &Finding, b: &Finding) -> Ordering {
    a.segment_location
        .cmp(&b.segment_location)
        .then(a.span.start.cmp(&b.span.start))
        .then(b.severity.cmp(&a.severity))
        .then_with(|| a.check_id.as_str().cmp(b.check_id.as_str()))
        .then(a.span.end.cmp(&b.span.end))
        .then_with(|| a.message.cmp(&b.message))
        .then_with(|| b.confidence.total_cmp(&a.confidence))
}

/// Document order, then span start, severity (most serious first) and check id.
/// Applying it to an already sorted slice leaves the order unchanged.
pub fn sort_findings(findings: &mut [Finding]) {
    findings.sort_by(compare);
}

pub fn count_by_severity(findings: &[Finding]) -> BTreeMap<Severity, usize> {
    let mut counts = BTreeMap::new();
    for finding in findings {
        *counts.entry(finding.severity).or_insert(0) += 1;
    }
    counts
}

/// Findings at or above `min`, in their existing order.
pub fn filter_min_severity(findings: &[Finding], min: Severity) -> Vec<Finding> {
    findings
        .iter()
        .filter(|f| f.severity >= min)
        .cloned()
        .collect()
}
