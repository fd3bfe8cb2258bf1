use super::{compile_lexicon, Check};
use crate::config::{CheckBase, ImageCaptionConfig, VaguenessConfig};
use crate::errors::CheckFailure;
use crate::segments::Segment;
use crate::text::{sentence_spans, PhraseMatcher};
use crate::types::{CheckId, RawFinding, Span};
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;

lazy_static! {
    static ref FIGURE_NUMBER: Regex = Regex::new(r"(?i)\bfig(?:ure)?\.?\s*\d+").unwrap();
}

/// Placeholders left in a draft and phrases that avoid committing to a fact.
pub struct VaguenessCheck {
    base: CheckBase,
    placeholders: Vec<PhraseMatcher>,
    vague_phrases: Vec<PhraseMatcher>,
}

impl VaguenessCheck {
    pub fn new(config: &VaguenessConfig) -> Result<Self, CheckFailure> {
        Ok(Self {
            base: config.base.clone(),
            placeholders: compile_lexicon(CheckId::Vagueness, &config.placeholders, &config.base)?,
            vague_phrases: compile_lexicon(CheckId::Vagueness, &config.vague_phrases, &config.base)?,
        })
    }
}

fn describe(kind: &str, matcher: &PhraseMatcher, matched: &str, exact: bool) -> String {
    if exact {
        format!("{kind} \"{matched}\" (exact match)")
    } else {
        format!(
            "{kind} \"{matched}\" (case-insensitive match for \"{}\")",
            matcher.phrase()
        )
    }
}

impl Check for VaguenessCheck {
    fn id(&self) -> CheckId {
        CheckId::Vagueness
    }

    fn run(&self, segments: &[Segment]) -> Result<Vec<RawFinding>, CheckFailure> {
        let weight = self.base.weight_for(self.id());
        let mut findings = Vec::new();

        for segment in segments {
            // a span matched by a placeholder is not reported again as a vague phrase
            let mut seen: HashSet<(usize, usize)> = HashSet::new();
            let groups = [
                ("Placeholder", &self.placeholders),
                ("Vague phrase", &self.vague_phrases),
            ];
            for (kind, matchers) in groups {
                for matcher in matchers.iter() {
                    for m in matcher.find_iter(&segment.text) {
                        let matched = &segment.text[m.start..m.end];
                        if self.base.is_ignored(matched) || !seen.insert((m.start, m.end)) {
                            continue;
                        }
                        findings.push(
                            RawFinding::new(
                                self.id(),
                                segment,
                                Span::new(m.start, m.end),
                                describe(kind, matcher, matched, m.exact),
                            )
                            .with_severity_weight(weight),
                        );
                    }
                }
            }
        }
        Ok(findings)
    }
}

/// Sentences that reference an image without a caption or figure number nearby.
/// The sentence itself and its neighbours are searched for a caption marker.
pub struct ImageCaptionCheck {
    base: CheckBase,
    image_terms: Vec<PhraseMatcher>,
    caption_indicators: Vec<PhraseMatcher>,
}

impl ImageCaptionCheck {
    pub fn new(config: &ImageCaptionConfig) -> Result<Self, CheckFailure> {
        Ok(Self {
            base: config.base.clone(),
            image_terms: compile_lexicon(CheckId::ImageCaptions, &config.image_terms, &config.base)?,
            caption_indicators: compile_lexicon(
                CheckId::ImageCaptions,
                &config.caption_indicators,
                &config.base,
            )?,
        })
    }

    fn has_caption(&self, sentence: &str) -> bool {
        self.caption_indicators.iter().any(|c| c.is_match(sentence))
    }
}

impl Check for ImageCaptionCheck {
    fn id(&self) -> CheckId {
        CheckId::ImageCaptions
    }

    fn run(&self, segments: &[Segment]) -> Result<Vec<RawFinding>, CheckFailure> {
        let weight = self.base.weight_for(self.id());

        // (segment, sentence start, sentence end) in document order
        let sentences: Vec<(&Segment, usize, usize)> = segments
            .iter()
            .flat_map(|segment| {
                sentence_spans(&segment.text)
                    .into_iter()
                    .map(move |(start, end)| (segment, start, end))
            })
            .collect();
        let captioned: Vec<bool> = sentences
            .iter()
            .map(|(segment, start, end)| {
                // "Fig. 2" straddles a sentence break, so figure numbers are matched on the segment
                self.has_caption(&segment.text[*start..*end])
                    || FIGURE_NUMBER
                        .find_iter(&segment.text)
                        .any(|f| f.start() < *end && f.end() > *start)
            })
            .collect();

        let mut findings = Vec::new();
        for (i, (segment, start, end)) in sentences.iter().enumerate() {
            let sentence = &segment.text[*start..*end];
            let Some(m) = self
                .image_terms
                .iter()
                .filter_map(|term| term.find_iter(sentence).next())
                .min_by_key(|m| m.start)
            else {
                continue;
            };

            let near_caption = captioned[i]
                || (i > 0 && captioned[i - 1])
                || captioned.get(i + 1).copied().unwrap_or(false);
            if near_caption {
                continue;
            }

            let term = &sentence[m.start..m.end];
            findings.push(
                RawFinding::new(
                    self.id(),
                    segment,
                    Span::new(start + m.start, start + m.end),
                    format!("Reference to \"{term}\" has no caption or figure number"),
                )
                .with_severity_weight(weight),
            );
        }
        Ok(findings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::test_support::segments;
    use crate::segments::Language;

    fn vagueness() -> VaguenessCheck {
        VaguenessCheck::new(&VaguenessConfig {
            base: CheckBase::enabled(),
            placeholders: vec!["TBD".into(), "to be confirmed".into()],
            vague_phrases: vec!["somewhat".into(), "tbd".into()],
        })
        .unwrap()
    }

    #[test]
    fn test_exact_and_case_insensitive_variants() {
        let segs = segments(&["Budget TBD, owner tbd, scope somewhat unclear."], Language::En);
        let findings = vagueness().run(&segs).unwrap();
        assert_eq!(findings.len(), 3);
        assert_eq!(findings[0].message, "Placeholder \"TBD\" (exact match)");
        assert_eq!(
            findings[1].message,
            "Placeholder \"tbd\" (case-insensitive match for \"TBD\")"
        );
        assert!(findings[2].message.starts_with("Vague phrase \"somewhat\""));
    }

    #[test]
    fn test_each_occurrence_reported_once() {
        let segs = segments(&["TBD"], Language::En);
        assert_eq!(vagueness().run(&segs).unwrap().len(), 1);
    }

    fn captions() -> ImageCaptionCheck {
        ImageCaptionCheck::new(&ImageCaptionConfig {
            base: CheckBase::enabled(),
            image_terms: vec!["photo".into(), "image".into()],
            caption_indicators: vec!["caption".into()],
        })
        .unwrap()
    }

    #[test]
    fn test_uncaptioned_image_reference() {
        let segs = segments(&["See the photo below for damage."], Language::En);
        let findings = captions().run(&segs).unwrap();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].span, Span::new(8, 13));
    }

    #[test]
    fn test_figure_number_counts_as_caption() {
        let segs = segments(
            &["Figure 3: Corroded flange.", "The photo shows pitting."],
            Language::En,
        );
        assert!(captions().run(&segs).unwrap().is_empty());

        let inline = segments(&["The image in Fig. 2 shows pitting."], Language::En);
        assert!(captions().run(&inline).unwrap().is_empty());
    }
}
