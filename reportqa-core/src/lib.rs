// ReportQA Core Library
//
// Rule engine for business-report quality checks. Pattern checks, a trained
// subjectivity classifier and an optional remote semantic check run over the same
// segment model; their output is merged into one ordered finding set.

pub mod aggregate;
pub mod classifier;
pub mod config;
pub mod errors;
pub mod export;
pub mod rules;
pub mod segments;
pub mod text;
pub mod types;

// Re-export main types for easy use
pub use aggregate::{count_by_severity, filter_min_severity, sort_findings, Aggregator, FindingSet, SeverityPolicy};
pub use classifier::{ClassifierModel, Label, TrainingExample, TrainingOptions};
pub use config::{ConfigManager, EngineSettings, LanguageRules, RuleConfig};
pub use errors::{CheckFailure, ConfigError, EngineError, ModelLoadError, ParseError, RemoteServiceError};
pub use rules::{AnalysisRun, Check, RuleEngine};
pub use segments::{Language, Location, Segment, SegmentModel};
pub use types::{Category, CheckId, Finding, RawFinding, Severity, SkipMarker, SkipReason, Span};
