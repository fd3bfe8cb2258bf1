use super::Check;
use crate::config::{CheckBase, RequiredSectionConfig};
use crate::errors::CheckFailure;
use crate::segments::Segment;
use crate::types::{CheckId, RawFinding, Span};
use regex::Regex;

struct CompiledSection {
    name: String,
    pattern: Regex,
}

/// Structural check: every configured section must have a matching heading.
/// One finding per missing section, anchored at the start of the document.
pub struct RequiredSectionCheck {
    base: CheckBase,
    sections: Vec<CompiledSection>,
    headings_only: bool,
    max_heading_words: usize,
    max_heading_chars: usize,
}

impl RequiredSectionCheck {
    pub fn new(config: &RequiredSectionConfig) -> Result<Self, CheckFailure> {
        let sections = config
            .sections
            .iter()
            .filter(|s| !config.base.is_ignored(&s.name))
            .map(|s| {
                s.compile()
                    .map(|pattern| CompiledSection {
                        name: s.name.clone(),
                        pattern,
                    })
                    .map_err(|e| {
                        CheckFailure::new(
                            CheckId::RequiredSection.as_str(),
                            format!("invalid pattern for section '{}': {e}", s.name),
                        )
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            base: config.base.clone(),
            sections,
            headings_only: config.headings_only,
            max_heading_words: config.max_heading_words,
            max_heading_chars: config.max_heading_chars,
        })
    }

    fn is_candidate(&self, segment: &Segment) -> bool {
        !self.headings_only || segment.is_heading(self.max_heading_words, self.max_heading_chars)
    }
}

impl Check for RequiredSectionCheck {
    fn id(&self) -> CheckId {
        CheckId::RequiredSection
    }

    fn run(&self, segments: &[Segment]) -> Result<Vec<RawFinding>, CheckFailure> {
        let Some(anchor) = segments.first() else {
            return Ok(Vec::new());
        };
        let headings: Vec<&Segment> = segments.iter().filter(|s| self.is_candidate(s)).collect();
        let weight = self.base.weight_for(self.id());

        Ok(self
            .sections
            .iter()
            .filter(|section| !headings.iter().any(|h| section.pattern.is_match(&h.text)))
            .map(|section| {
                RawFinding::new(
                    self.id(),
                    anchor,
                    Span::empty(),
                    format!("Missing required section \"{}\"", section.name),
                )
                .with_severity_weight(weight)
            })
            .collect())
    }
}
