use super::Check;
use crate::config::{CheckBase, SpellingConfig};
use crate::errors::CheckFailure;
use crate::segments::Segment;
use crate::text::word_spans;
use crate::types::{CheckId, RawFinding, Span};
use std::collections::HashSet;
use std::fs;

/// Dictionary lookup for every word token. Without a dictionary the check cannot
/// tell right from wrong, so construction fails rather than flagging everything.
pub struct SpellingCheck {
    base: CheckBase,
    dictionary: HashSet<String>,
    min_word_length: usize,
    skip_capitalized: bool,
}

impl SpellingCheck {
    pub fn new(config: &SpellingConfig) -> Result<Self, CheckFailure> {
        let id = CheckId::Spelling.as_str();
        let mut dictionary: HashSet<String> = config
            .dictionary
            .iter()
            .map(|w| w.trim().to_lowercase())
            .filter(|w| !w.is_empty())
            .collect();

        if let Some(path) = &config.dictionary_path {
            let content = fs::read_to_string(path).map_err(|e| {
                CheckFailure::new(id, format!("cannot read dictionary {}: {e}", path.display()))
            })?;
            dictionary.extend(
                content
                    .lines()
                    .map(|l| l.trim().to_lowercase())
                    .filter(|l| !l.is_empty() && !l.starts_with('#')),
            );
        }

        if dictionary.is_empty() {
            return Err(CheckFailure::new(id, "no dictionary configured"));
        }

        Ok(Self {
            base: config.base.clone(),
            dictionary,
            min_word_length: config.min_word_length,
            skip_capitalized: config.skip_capitalized,
        })
    }

    fn is_known(&self, word: &str) -> bool {
        let lower = word.to_lowercase();
        if self.dictionary.contains(&lower) {
            return true;
        }
        // possessives: "team's" is fine when "team" is
        ["'s", "’s"]
            .iter()
            .any(|suffix| lower.strip_suffix(suffix).is_some_and(|stem| self.dictionary.contains(stem)))
    }
}

impl Check for SpellingCheck {
    fn id(&self) -> CheckId {
        CheckId::Spelling
    }

    fn run(&self, segments: &[Segment]) -> Result<Vec<RawFinding>, CheckFailure> {
        let weight = self.base.weight_for(self.id());
        let mut findings = Vec::new();

        for segment in segments {
            for (start, end) in word_spans(&segment.text) {
                let word = &segment.text[start..end];
                if word.chars().count() < self.min_word_length || self.base.is_ignored(word) {
                    continue;
                }
                if self.skip_capitalized && word.chars().next().is_some_and(char::is_uppercase) {
                    continue;
                }
                if !self.is_known(word) {
                    findings.push(
                        RawFinding::new(
                            self.id(),
                            segment,
                            Span::new(start, end),
                            format!("Unknown word \"{word}\""),
                        )
                        .with_severity_weight(weight),
                    );
                }
            }
        }
        Ok(findings)
    }
}
