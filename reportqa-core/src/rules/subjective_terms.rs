use super::{compile_lexicon, lexicon_findings, Check};
use crate::config::{CheckBase, SubjectiveTermsConfig};
use crate::errors::CheckFailure;
use crate::segments::Segment;
use crate::text::PhraseMatcher;
use crate::types::{CheckId, RawFinding};

/// Lexicon check for evaluative wording and sweeping absolutes. Complements the
/// statistical classifier with exact, explainable hits.
pub struct SubjectiveTermsCheck {
    base: CheckBase,
    terms: Vec<PhraseMatcher>,
    absolutes: Vec<PhraseMatcher>,
}

impl SubjectiveTermsCheck {
    pub fn new(config: &SubjectiveTermsConfig) -> Result<Self, CheckFailure> {
        Ok(Self {
            base: config.base.clone(),
            terms: compile_lexicon(CheckId::SubjectiveTerms, &config.terms, &config.base)?,
            absolutes: compile_lexicon(CheckId::SubjectiveTerms, &config.absolutes, &config.base)?,
        })
    }
}

impl Check for SubjectiveTermsCheck {
    fn id(&self) -> CheckId {
        CheckId::SubjectiveTerms
    }

    fn run(&self, segments: &[Segment]) -> Result<Vec<RawFinding>, CheckFailure> {
        let mut findings = lexicon_findings(self.id(), segments, &self.terms, &self.base, |_, matched, _| {
            format!("Subjective term \"{matched}\"; state the evidence instead")
        });
        findings.extend(lexicon_findings(
            self.id(),
            segments,
            &self.absolutes,
            &self.base,
            |_, matched, _| format!("Absolute claim \"{matched}\" may overstate the evidence"),
        ));
        Ok(findings)
    }
}
