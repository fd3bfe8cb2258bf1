use super::Check;
use crate::config::{CheckBase, RepetitionConfig};
use crate::errors::CheckFailure;
use crate::segments::Segment;
use crate::text::word_spans;
use crate::types::{CheckId, RawFinding, Span};
use std::collections::{HashMap, HashSet};

/// Document-wide word frequency check.
///
/// A token is reported when its rate per 1000 words is strictly greater than the
/// threshold. The finding sits at the token's first occurrence.
pub struct RepetitionCheck {
    base: CheckBase,
    threshold: f64,
    min_token_length: usize,
    stopwords: HashSet<String>,
    max_findings: usize,
    min_document_words: usize,
}

struct TokenStats {
    count: usize,
    /// (segment index, span) of the first occurrence
    first: (usize, Span),
}

impl RepetitionCheck {
    pub fn new(config: &RepetitionConfig) -> Self {
        Self {
            base: config.base.clone(),
            threshold: config.threshold,
            min_token_length: config.min_token_length,
            stopwords: config.stopwords.iter().map(|s| s.to_lowercase()).collect(),
            max_findings: config.max_findings,
            min_document_words: config.min_document_words,
        }
    }

    fn counts(&self, segments: &[Segment]) -> (usize, Vec<(String, TokenStats)>) {
        let mut total_words = 0usize;
        let mut order: Vec<String> = Vec::new();
        let mut stats: HashMap<String, TokenStats> = HashMap::new();

        for (index, segment) in segments.iter().enumerate() {
            for (start, end) in word_spans(&segment.text) {
                total_words += 1;
                let token = segment.text[start..end].to_lowercase();
                if token.chars().count() < self.min_token_length
                    || self.stopwords.contains(&token)
                    || self.base.is_ignored(&token)
                {
                    continue;
                }
                match stats.get_mut(&token) {
                    Some(entry) => entry.count += 1,
                    None => {
                        order.push(token.clone());
                        stats.insert(
                            token,
                            TokenStats {
                                count: 1,
                                first: (index, Span::new(start, end)),
                            },
                        );
                    }
                }
            }
        }

        let ordered = order
            .into_iter()
            .filter_map(|token| stats.remove(&token).map(|s| (token, s)))
            .collect();
        (total_words, ordered)
    }
}

impl Check for RepetitionCheck {
    fn id(&self) -> CheckId {
        CheckId::Repetition
    }

    fn run(&self, segments: &[Segment]) -> Result<Vec<RawFinding>, CheckFailure> {
        let (total_words, tokens) = self.counts(segments);
        if total_words == 0 || total_words < self.min_document_words {
            return Ok(Vec::new());
        }

        // tokens are in first-occurrence order
        let mut over: Vec<(usize, String, TokenStats, f64)> = tokens
            .into_iter()
            .enumerate()
            .filter_map(|(rank, (token, stats))| {
                let per_thousand = stats.count as f64 * 1000.0 / total_words as f64;
                (per_thousand > self.threshold).then_some((rank, token, stats, per_thousand))
            })
            .collect();

        if over.len() > self.max_findings {
            // keep the most frequent, then restore first-occurrence order
            over.sort_by(|a, b| b.2.count.cmp(&a.2.count).then(a.0.cmp(&b.0)));
            over.truncate(self.max_findings);
            over.sort_by_key(|entry| entry.0);
        }

        let weight = self.base.weight_for(self.id());
        Ok(over
            .into_iter()
            .map(|(_, token, stats, per_thousand)| {
                let (segment_index, span) = stats.first;
                RawFinding::new(
                    self.id(),
                    &segments[segment_index],
                    span,
                    format!(
                        "\"{token}\" is repeated {} times ({per_thousand:.1} per 1000 words, limit {:.1})",
                        stats.count, self.threshold
                    ),
                )
                .with_severity_weight(weight)
            })
            .collect())
    }
}
