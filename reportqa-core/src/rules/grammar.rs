use super::{compile_lexicon, lexicon_findings, Check};
use crate::config::{CheckBase, FirstPersonConfig, ForbiddenPhrasesConfig};
use crate::errors::CheckFailure;
use crate::segments::Segment;
use crate::text::PhraseMatcher;
use crate::types::{CheckId, RawFinding};

// FirstPersonCheck - reports personal pronouns in a register that expects impersonal prose
pub struct FirstPersonCheck {
    base: CheckBase,
    matchers: Vec<PhraseMatcher>,
}

impl FirstPersonCheck {
    pub fn new(config: &FirstPersonConfig) -> Result<Self, CheckFailure> {
        Ok(Self {
            base: config.base.clone(),
            matchers: compile_lexicon(CheckId::FirstPerson, &config.pronouns, &config.base)?,
        })
    }
}

impl Check for FirstPersonCheck {
    fn id(&self) -> CheckId {
        CheckId::FirstPerson
    }

    fn run(&self, segments: &[Segment]) -> Result<Vec<RawFinding>, CheckFailure> {
        Ok(lexicon_findings(
            self.id(),
            segments,
            &self.matchers,
            &self.base,
            |_, matched, _| format!("First-person pronoun \"{matched}\"; prefer impersonal phrasing"),
        ))
    }
}

// ForbiddenPhrasesCheck - phrases the style guide bans outright
pub struct ForbiddenPhrasesCheck {
    base: CheckBase,
    matchers: Vec<PhraseMatcher>,
}

impl ForbiddenPhrasesCheck {
    pub fn new(config: &ForbiddenPhrasesConfig) -> Result<Self, CheckFailure> {
        Ok(Self {
            base: config.base.clone(),
            matchers: compile_lexicon(CheckId::ForbiddenPhrases, &config.phrases, &config.base)?,
        })
    }
}

impl Check for ForbiddenPhrasesCheck {
    fn id(&self) -> CheckId {
        CheckId::ForbiddenPhrases
    }

    fn run(&self, segments: &[Segment]) -> Result<Vec<RawFinding>, CheckFailure> {
        Ok(lexicon_findings(
            self.id(),
            segments,
            &self.matchers,
            &self.base,
            |matcher, _, _| format!("Forbidden phrase \"{}\"", matcher.phrase()),
        ))
    }
}
