// Check modules and the engine that runs them.
// - engine.rs: RuleEngine orchestrator, worker pool and AnalysisRun
// - one file per check family; each exposes a struct implementing `Check`

pub mod engine;
pub mod grammar;
pub mod passive_voice;
pub mod repetition;
pub mod required_section;
pub mod semantic;
pub mod spelling;
pub mod subjective_terms;
pub mod subjectivity;
pub mod vagueness;

pub use engine::*;

use crate::classifier::ClassifierModel;
use crate::config::{CheckBase, LanguageRules};
use crate::errors::CheckFailure;
use crate::segments::Segment;
use crate::text::PhraseMatcher;
use crate::types::{CheckId, RawFinding};
use std::sync::Arc;

/// A detection strategy over one language's segments.
///
/// Implementations must not mutate their inputs, must return in bounded time and
/// must attribute every finding to one of the segments they were given.
pub trait Check: Send + Sync {
    fn id(&self) -> CheckId;
    fn run(&self, segments: &[Segment]) -> Result<Vec<RawFinding>, CheckFailure>;
}

impl CheckId {
    /// Build the check from its settings block.
    ///
    /// `Ok(None)` means the check is unconfigured, disabled, or (for the remote
    /// check) lacks the endpoint/credentials it needs to run at all.
    pub fn instantiate(
        &self,
        rules: &LanguageRules,
        model: Option<Arc<ClassifierModel>>,
    ) -> Result<Option<Box<dyn Check>>, CheckFailure> {
        if !rules.is_enabled(*self) {
            return Ok(None);
        }
        let language = rules.language;

        let check: Box<dyn Check> = match self {
            CheckId::Spelling => match &rules.spelling {
                Some(cfg) => Box::new(spelling::SpellingCheck::new(cfg)?),
                None => return Ok(None),
            },
            CheckId::FirstPerson => match &rules.first_person {
                Some(cfg) => Box::new(grammar::FirstPersonCheck::new(cfg)?),
                None => return Ok(None),
            },
            CheckId::ForbiddenPhrases => match &rules.forbidden_phrases {
                Some(cfg) => Box::new(grammar::ForbiddenPhrasesCheck::new(cfg)?),
                None => return Ok(None),
            },
            CheckId::SubjectiveTerms => match &rules.subjective_terms {
                Some(cfg) => Box::new(subjective_terms::SubjectiveTermsCheck::new(cfg)?),
                None => return Ok(None),
            },
            CheckId::PassiveVoice => match &rules.passive_voice {
                Some(cfg) => Box::new(passive_voice::PassiveVoiceCheck::new(cfg)?),
                None => return Ok(None),
            },
            CheckId::Repetition => match &rules.repetition {
                Some(cfg) => Box::new(repetition::RepetitionCheck::new(cfg)),
                None => return Ok(None),
            },
            CheckId::RequiredSection => match &rules.required_section {
                Some(cfg) => Box::new(required_section::RequiredSectionCheck::new(cfg)?),
                None => return Ok(None),
            },
            CheckId::Vagueness => match &rules.vagueness {
                Some(cfg) => Box::new(vagueness::VaguenessCheck::new(cfg)?),
                None => return Ok(None),
            },
            CheckId::ImageCaptions => match &rules.image_captions {
                Some(cfg) => Box::new(vagueness::ImageCaptionCheck::new(cfg)?),
                None => return Ok(None),
            },
            CheckId::Subjectivity => match (&rules.subjectivity, model) {
                (Some(cfg), Some(model)) => Box::new(subjectivity::SubjectivityCheck::new(cfg, model)),
                (Some(_), None) => {
                    return Err(CheckFailure::new(self.as_str(), "no classifier model available"))
                }
                (None, _) => return Ok(None),
            },
            CheckId::Semantic => match &rules.semantic {
                Some(cfg) => match semantic::SemanticCheck::new(cfg, language) {
                    Some(check) => Box::new(check),
                    None => return Ok(None),
                },
                None => return Ok(None),
            },
        };
        Ok(Some(check))
    }
}

/// Compile a lexicon, dropping blank entries and anything on the ignore list.
pub(crate) fn compile_lexicon(
    id: CheckId,
    phrases: &[String],
    base: &CheckBase,
) -> Result<Vec<PhraseMatcher>, CheckFailure> {
    phrases
        .iter()
        .filter(|p| !p.trim().is_empty() && !base.is_ignored(p.trim()))
        .map(|p| {
            PhraseMatcher::new(p)
                .map_err(|e| CheckFailure::new(id.as_str(), format!("invalid phrase '{p}': {e}")))
        })
        .collect()
}

/// Run every matcher over every segment, in document order, reporting each matched
/// span once even when several lexicon entries cover it.
pub(crate) fn lexicon_findings(
    id: CheckId,
    segments: &[Segment],
    matchers: &[PhraseMatcher],
    base: &CheckBase,
    message: impl Fn(&PhraseMatcher, &str, bool) -> String,
) -> Vec<RawFinding> {
    let weight = base.weight_for(id);
    let mut findings = Vec::new();

    for segment in segments {
        let mut seen = std::collections::HashSet::new();
        for matcher in matchers {
            for m in matcher.find_iter(&segment.text) {
                let matched = &segment.text[m.start..m.end];
                if base.is_ignored(matched) || !seen.insert((m.start, m.end)) {
                    continue;
                }
                findings.push(
                    RawFinding::new(
                        id,
                        segment,
                        crate::types::Span::new(m.start, m.end),
                        message(matcher, matched, m.exact),
                    )
                    .with_severity_weight(weight),
                );
            }
        }
    }
    findings
}
