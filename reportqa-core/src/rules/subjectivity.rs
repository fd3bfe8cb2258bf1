use super::Check;
use crate::classifier::ClassifierModel;
use crate::config::{CheckBase, SubjectivityConfig};
use crate::errors::CheckFailure;
use crate::segments::Segment;
use crate::text::snippet;
use crate::types::{CheckId, RawFinding, Span};
use std::sync::Arc;

const SNIPPET_CHARS: usize = 60;

/// Classifier-backed check: one finding per segment whose posterior reaches the
/// configured threshold, carrying the posterior as its confidence.
pub struct SubjectivityCheck {
    base: CheckBase,
    model: Arc<ClassifierModel>,
    threshold: f64,
    min_words: usize,
}

impl SubjectivityCheck {
    pub fn new(config: &SubjectivityConfig, model: Arc<ClassifierModel>) -> Self {
        Self {
            base: config.base.clone(),
            model,
            threshold: config.decision_threshold,
            min_words: config.min_words,
        }
    }
}

impl Check for SubjectivityCheck {
    fn id(&self) -> CheckId {
        CheckId::Subjectivity
    }

    fn run(&self, segments: &[Segment]) -> Result<Vec<RawFinding>, CheckFailure> {
        let weight = self.base.weight_for(self.id());
        let mut findings = Vec::new();

        for segment in segments {
            if segment.word_count() < self.min_words {
                continue;
            }
            let posterior = self.model.classify(&segment.text);
            if posterior >= self.threshold {
                let trimmed = segment.text.trim_end();
                let start = trimmed.len() - trimmed.trim_start().len();
                findings.push(
                    RawFinding::new(
                        self.id(),
                        segment,
                        Span::new(start, trimmed.len()),
                        format!(
                            "Subjective or evaluative language (p = {posterior:.2}): \"{}\"",
                            snippet(&segment.text, start, trimmed.len(), SNIPPET_CHARS)
                        ),
                    )
                    .with_confidence(posterior)
                    .with_severity_weight(weight),
                );
            }
        }
        Ok(findings)
    }
}
