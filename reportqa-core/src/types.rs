use crate::segments::{Language, Location, Segment};
use serde::{Deserialize, Serialize};
use std::fmt;

// ===== CHECK IDENTIFIERS =====
// The closed set of checks the engine knows how to build. Config blocks, findings
// and skip markers all refer to checks through this enum.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckId {
    Spelling,
    FirstPerson,
    ForbiddenPhrases,
    SubjectiveTerms,
    PassiveVoice,
    Repetition,
    RequiredSection,
    Vagueness,
    ImageCaptions,
    Subjectivity,
    Semantic,
}

impl CheckId {
    pub const ALL: [CheckId; 11] = [
        CheckId::Spelling,
        CheckId::FirstPerson,
        CheckId::ForbiddenPhrases,
        CheckId::SubjectiveTerms,
        CheckId::PassiveVoice,
        CheckId::Repetition,
        CheckId::RequiredSection,
        CheckId::Vagueness,
        CheckId::ImageCaptions,
        CheckId::Subjectivity,
        CheckId::Semantic,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CheckId::Spelling => "spelling",
            CheckId::FirstPerson => "first_person",
            CheckId::ForbiddenPhrases => "forbidden_phrases",
            CheckId::SubjectiveTerms => "subjective_terms",
            CheckId::PassiveVoice => "passive_voice",
            CheckId::Repetition => "repetition",
            CheckId::RequiredSection => "required_section",
            CheckId::Vagueness => "vagueness",
            CheckId::ImageCaptions => "image_captions",
            CheckId::Subjectivity => "subjectivity",
            CheckId::Semantic => "semantic",
        }
    }

    pub fn category(&self) -> Category {
        match self {
            CheckId::Spelling => Category::Spelling,
            CheckId::FirstPerson | CheckId::ForbiddenPhrases => Category::Grammar,
            CheckId::SubjectiveTerms | CheckId::Subjectivity => Category::Subjectivity,
            CheckId::PassiveVoice => Category::PassiveVoice,
            CheckId::Repetition => Category::Repetition,
            CheckId::RequiredSection => Category::RequiredSection,
            CheckId::Vagueness | CheckId::ImageCaptions => Category::Vagueness,
            CheckId::Semantic => Category::Semantic,
        }
    }

    /// Only the remote semantic check performs I/O.
    pub fn is_remote(&self) -> bool {
        matches!(self, CheckId::Semantic)
    }
}

impl fmt::Display for CheckId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Spelling,
    Grammar,
    Subjectivity,
    PassiveVoice,
    Repetition,
    RequiredSection,
    Vagueness,
    Semantic,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Spelling => "spelling",
            Category::Grammar => "grammar",
            Category::Subjectivity => "subjectivity",
            Category::PassiveVoice => "passive_voice",
            Category::Repetition => "repetition",
            Category::RequiredSection => "required_section",
            Category::Vagueness => "vagueness",
            Category::Semantic => "semantic",
        }
    }

    /// Severity before any confidence-based promotion.
    pub fn base_severity(&self) -> Severity {
        match self {
            Category::Spelling | Category::Grammar => Severity::Warning,
            Category::RequiredSection => Severity::Critical,
            Category::Subjectivity
            | Category::PassiveVoice
            | Category::Repetition
            | Category::Vagueness
            | Category::Semantic => Severity::Info,
        }
    }

    /// Categories whose severity may be raised by a confident finding.
    pub fn is_promotable(&self) -> bool {
        self.base_severity() == Severity::Info
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered from least to most serious.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "info" => Ok(Severity::Info),
            "warning" => Ok(Severity::Warning),
            "critical" => Ok(Severity::Critical),
            other => Err(format!("unknown severity '{other}'")),
        }
    }
}

/// Byte range within a segment's text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self {
            start,
            end: end.max(start),
        }
    }

    pub fn empty() -> Self {
        Self { start: 0, end: 0 }
    }

    pub fn whole(text: &str) -> Self {
        Self::new(0, text.len())
    }
}

// ===== FINDINGS =====

/// What a check emits. Severity is not known yet; the aggregator assigns it once
/// when it creates the final [`Finding`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawFinding {
    pub check_id: CheckId,
    pub category: Category,
    pub location: Location,
    pub language: Language,
    pub span: Span,
    pub message: String,
    pub confidence: f64,
    pub severity_weight: f64,
}

impl RawFinding {
    /// Deterministic finding at `span` of `segment` with confidence 1.0.
    pub fn new(check_id: CheckId, segment: &Segment, span: Span, message: impl Into<String>) -> Self {
        Self {
            check_id,
            category: check_id.category(),
            location: segment.location,
            language: segment.language,
            span,
            message: message.into(),
            confidence: 1.0,
            severity_weight: 1.0,
        }
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = if confidence.is_nan() {
            0.0
        } else {
            confidence.clamp(0.0, 1.0)
        };
        self
    }

    pub fn with_severity_weight(mut self, weight: f64) -> Self {
        self.severity_weight = weight;
        self
    }
}

/// A reported issue. Created once by the aggregator and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub check_id: CheckId,
    pub category: Category,
    pub segment_location: Location,
    pub language: Language,
    pub span: Span,
    pub message: String,
    pub confidence: f64,
    pub severity: Severity,
}

impl Finding {
    pub fn from_raw(raw: RawFinding, severity: Severity) -> Self {
        Self {
            check_id: raw.check_id,
            category: raw.category,
            segment_location: raw.location,
            language: raw.language,
            span: raw.span,
            message: raw.message,
            confidence: raw.confidence,
            severity,
        }
    }
}

// ===== SKIP MARKERS =====

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The check returned a `CheckFailure`
    Failed,
    /// The check panicked; the fault was contained
    Panicked,
    /// The classifier artifact could not be loaded
    ModelUnavailable,
    /// The whole-run timeout expired before the check finished
    Timeout,
}

/// A configured check that did not produce results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkipMarker {
    pub check_id: CheckId,
    pub language: Language,
    pub reason: SkipReason,
    pub detail: String,
}

impl SkipMarker {
    pub fn new(check_id: CheckId, language: Language, reason: SkipReason, detail: impl Into<String>) -> Self {
        Self {
            check_id,
            language,
            reason,
            detail: detail.into(),
        }
    }
}

impl fmt::Display for SkipMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}] skipped ({:?}): {}",
            self.check_id, self.language, self.reason, self.detail
        )
    }
}
