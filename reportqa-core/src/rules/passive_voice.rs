use super::Check;
use crate::config::{CheckBase, PassiveVoiceConfig};
use crate::errors::CheckFailure;
use crate::segments::Segment;
use crate::text::sentence_spans;
use crate::types::{CheckId, RawFinding, Span};
use regex::{Regex, RegexBuilder};

/// Auxiliary + past participle heuristic ("was inspected", "is known").
///
/// Per segment, the ratio of passive matches to sentences is compared against the
/// configured threshold; only segments strictly above it are reported.
pub struct PassiveVoiceCheck {
    base: CheckBase,
    pattern: Regex,
    threshold: f64,
    min_sentences: usize,
}

impl PassiveVoiceCheck {
    pub fn new(config: &PassiveVoiceConfig) -> Result<Self, CheckFailure> {
        let pattern = build_pattern(config).map_err(|e| {
            CheckFailure::new(CheckId::PassiveVoice.as_str(), format!("invalid passive pattern: {e}"))
        })?;
        Ok(Self {
            base: config.base.clone(),
            pattern,
            threshold: config.threshold,
            min_sentences: config.min_sentences.max(1),
        })
    }

    /// Passive matches in `text` as byte spans.
    pub fn matches(&self, text: &str) -> Vec<Span> {
        self.pattern
            .find_iter(text)
            .filter(|m| !self.base.is_ignored(m.as_str()))
            .map(|m| Span::new(m.start(), m.end()))
            .collect()
    }
}

fn alternation(words: &[String]) -> String {
    let mut escaped: Vec<String> = words
        .iter()
        .map(|w| w.trim())
        .filter(|w| !w.is_empty())
        .map(regex::escape)
        .collect();
    // longest first so "been" wins over "be"
    escaped.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
    escaped.join("|")
}

fn build_pattern(config: &PassiveVoiceConfig) -> Result<Regex, regex::Error> {
    let auxiliaries = alternation(&config.auxiliaries);
    let suffixes = alternation(&config.participle_suffixes);
    let irregular = alternation(&config.irregular_participles);

    let mut participle = Vec::new();
    if !suffixes.is_empty() {
        participle.push(format!(r"\w+(?:{suffixes})"));
    }
    if !irregular.is_empty() {
        participle.push(format!("(?:{irregular})"));
    }
    // never matches when no participle forms are configured
    let participle = if participle.is_empty() {
        r"\b\B".to_string()
    } else {
        participle.join("|")
    };

    RegexBuilder::new(&format!(r"\b(?:{auxiliaries})\s+(?:{participle})\b"))
        .case_insensitive(true)
        .build()
}

impl Check for PassiveVoiceCheck {
    fn id(&self) -> CheckId {
        CheckId::PassiveVoice
    }

    fn run(&self, segments: &[Segment]) -> Result<Vec<RawFinding>, CheckFailure> {
        let weight = self.base.weight_for(self.id());
        let mut findings = Vec::new();

        for segment in segments {
            let sentences = sentence_spans(&segment.text).len();
            if sentences < self.min_sentences {
                continue;
            }
            let matches = self.matches(&segment.text);
            let Some(first) = matches.first() else {
                continue;
            };
            let ratio = matches.len() as f64 / sentences as f64;
            if ratio > self.threshold {
                findings.push(
                    RawFinding::new(
                        self.id(),
                        segment,
                        *first,
                        format!(
                            "Passive voice: {} construction(s) in {} sentence(s) (ratio {:.2} > {:.2})",
                            matches.len(),
                            sentences,
                            ratio,
                            self.threshold
                        ),
                    )
                    .with_severity_weight(weight),
                );
            }
        }
        Ok(findings)
    }
}
