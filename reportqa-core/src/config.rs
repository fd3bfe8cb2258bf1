use crate::errors::ConfigError;
use crate::segments::Language;
use crate::types::CheckId;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

// Default value functions for serde
fn default_true() -> bool {
    true
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Complete configuration for one analysis run: engine settings plus one rule set
/// per language. Loaded once and read-only for the duration of the run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleConfig {
    #[serde(default)]
    pub engine: EngineSettings,
    /// Rule sets keyed by language. A language without an entry runs no checks.
    #[serde(default)]
    pub languages: BTreeMap<Language, LanguageRules>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Worker threads for running checks (0 = available cores)
    #[serde(default)]
    pub max_workers: usize,
    /// Whole-run timeout; on expiry the run returns partial results
    #[serde(default)]
    pub run_timeout_ms: Option<u64>,
    /// Info-level findings whose weighted confidence exceeds this become warnings
    #[serde(default = "default_high_confidence_cutoff")]
    pub high_confidence_cutoff: f64,
    /// Required sections are checked for the most common language and for any
    /// other language holding at least this share of segments
    #[serde(default = "default_section_language_share")]
    pub section_language_share: f64,
}

fn default_high_confidence_cutoff() -> f64 {
    0.9
}

fn default_section_language_share() -> f64 {
    0.3
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            max_workers: 0,
            run_timeout_ms: None,
            high_confidence_cutoff: default_high_confidence_cutoff(),
            section_language_share: default_section_language_share(),
        }
    }
}

/// Settings shared by every check block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckBase {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Multiplies a finding's confidence before the promotion cutoff is applied.
    /// When absent the check's own default applies (see `CheckBase::weight_for`).
    #[serde(default)]
    pub severity_weight: Option<f64>,
    /// Tokens/phrases this check must never report (case-insensitive)
    #[serde(default)]
    pub ignore: BTreeSet<String>,
}

impl CheckBase {
    pub fn enabled() -> Self {
        Self {
            enabled: true,
            severity_weight: None,
            ignore: BTreeSet::new(),
        }
    }

    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::enabled()
        }
    }

    /// Deterministic heuristics stay informational unless a config raises their
    /// weight; probabilistic checks pass their confidence through unchanged.
    pub fn weight_for(&self, id: CheckId) -> f64 {
        self.severity_weight.unwrap_or(match id {
            CheckId::Subjectivity | CheckId::Semantic => 1.0,
            _ => 0.5,
        })
    }

    pub fn is_ignored(&self, token: &str) -> bool {
        let token = token.to_lowercase();
        self.ignore.iter().any(|i| i.to_lowercase() == token)
    }
}

/// Rule set for one language. Every check has an optional block; a missing block
/// means the check is unconfigured for this language and is skipped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LanguageRules {
    pub language: Language,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spelling: Option<SpellingConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_person: Option<FirstPersonConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forbidden_phrases: Option<ForbiddenPhrasesConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subjective_terms: Option<SubjectiveTermsConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passive_voice: Option<PassiveVoiceConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repetition: Option<RepetitionConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_section: Option<RequiredSectionConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vagueness: Option<VaguenessConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_captions: Option<ImageCaptionConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subjectivity: Option<SubjectivityConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub semantic: Option<SemanticConfig>,
}

impl LanguageRules {
    /// A rule set with no checks configured.
    pub fn empty(language: Language) -> Self {
        Self {
            language,
            spelling: None,
            first_person: None,
            forbidden_phrases: None,
            subjective_terms: None,
            passive_voice: None,
            repetition: None,
            required_section: None,
            vagueness: None,
            image_captions: None,
            subjectivity: None,
            semantic: None,
        }
    }

    /// The common settings of a check, if that check is configured.
    pub fn base(&self, id: CheckId) -> Option<&CheckBase> {
        match id {
            CheckId::Spelling => self.spelling.as_ref().map(|c| &c.base),
            CheckId::FirstPerson => self.first_person.as_ref().map(|c| &c.base),
            CheckId::ForbiddenPhrases => self.forbidden_phrases.as_ref().map(|c| &c.base),
            CheckId::SubjectiveTerms => self.subjective_terms.as_ref().map(|c| &c.base),
            CheckId::PassiveVoice => self.passive_voice.as_ref().map(|c| &c.base),
            CheckId::Repetition => self.repetition.as_ref().map(|c| &c.base),
            CheckId::RequiredSection => self.required_section.as_ref().map(|c| &c.base),
            CheckId::Vagueness => self.vagueness.as_ref().map(|c| &c.base),
            CheckId::ImageCaptions => self.image_captions.as_ref().map(|c| &c.base),
            CheckId::Subjectivity => self.subjectivity.as_ref().map(|c| &c.base),
            CheckId::Semantic => self.semantic.as_ref().map(|c| &c.base),
        }
    }

    pub fn is_enabled(&self, id: CheckId) -> bool {
        self.base(id).is_some_and(|b| b.enabled)
    }

    /// Enabled checks in their canonical order.
    pub fn enabled_checks(&self) -> Vec<CheckId> {
        CheckId::ALL
            .into_iter()
            .filter(|id| self.is_enabled(*id))
            .collect()
    }
}

// ===== PER-CHECK SETTINGS =====

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpellingConfig {
    #[serde(flatten)]
    pub base: CheckBase,
    /// Known-good words
    #[serde(default)]
    pub dictionary: Vec<String>,
    /// Optional word list, one word per line
    #[serde(default)]
    pub dictionary_path: Option<PathBuf>,
    /// Shorter tokens are never checked
    #[serde(default = "default_min_word_length")]
    pub min_word_length: usize,
    /// Capitalised tokens are treated as proper nouns and skipped
    #[serde(default = "default_true")]
    pub skip_capitalized: bool,
}

fn default_min_word_length() -> usize {
    3
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FirstPersonConfig {
    #[serde(flatten)]
    pub base: CheckBase,
    #[serde(default)]
    pub pronouns: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForbiddenPhrasesConfig {
    #[serde(flatten)]
    pub base: CheckBase,
    #[serde(default)]
    pub phrases: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubjectiveTermsConfig {
    #[serde(flatten)]
    pub base: CheckBase,
    /// Evaluative adjectives and adverbs ("excellent", "clearly")
    #[serde(default)]
    pub terms: Vec<String>,
    /// Absolute claims ("always", "never")
    #[serde(default)]
    pub absolutes: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PassiveVoiceConfig {
    #[serde(flatten)]
    pub base: CheckBase,
    /// Maximum share of sentences with a passive construction before a segment is flagged
    #[serde(default = "default_passive_threshold")]
    pub threshold: f64,
    #[serde(default = "default_auxiliaries")]
    pub auxiliaries: Vec<String>,
    #[serde(default = "default_participle_suffixes")]
    pub participle_suffixes: Vec<String>,
    #[serde(default = "default_irregular_participles")]
    pub irregular_participles: Vec<String>,
    /// Segments with fewer sentences are not rated
    #[serde(default = "default_min_sentences")]
    pub min_sentences: usize,
}

fn default_passive_threshold() -> f64 {
    0.5
}

fn default_auxiliaries() -> Vec<String> {
    strings(&["am", "is", "are", "was", "were", "be", "been", "being"])
}

fn default_participle_suffixes() -> Vec<String> {
    strings(&["ed", "en"])
}

fn default_irregular_participles() -> Vec<String> {
    strings(&[
        "built", "bought", "brought", "caught", "done", "found", "held", "kept", "known",
        "left", "lost", "made", "meant", "met", "paid", "put", "read", "run", "said",
        "seen", "sent", "set", "shown", "sold", "spent", "taught", "told", "thought",
        "understood", "won", "written",
    ])
}

fn default_min_sentences() -> usize {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepetitionConfig {
    #[serde(flatten)]
    pub base: CheckBase,
    /// Occurrences per 1000 words above which a token is reported (strictly greater)
    #[serde(default = "default_repetition_threshold")]
    pub threshold: f64,
    #[serde(default = "default_min_token_length")]
    pub min_token_length: usize,
    #[serde(default)]
    pub stopwords: Vec<String>,
    /// Upper bound on reported tokens per document
    #[serde(default = "default_max_findings")]
    pub max_findings: usize,
    /// Documents with fewer words are not rated (0 rates every document)
    #[serde(default)]
    pub min_document_words: usize,
}

fn default_repetition_threshold() -> f64 {
    25.0
}

fn default_min_token_length() -> usize {
    3
}

fn default_max_findings() -> usize {
    50
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequiredSection {
    pub name: String,
    /// Regex matched case-insensitively against heading text. Defaults to the name
    /// as a whole word.
    #[serde(default)]
    pub pattern: Option<String>,
}

impl RequiredSection {
    pub fn new(name: &str, pattern: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            pattern: pattern.map(|p| p.to_string()),
        }
    }

    pub fn effective_pattern(&self) -> String {
        match &self.pattern {
            Some(p) => p.clone(),
            None => format!(r"\b{}\b", regex::escape(self.name.trim())),
        }
    }

    pub fn compile(&self) -> Result<Regex, regex::Error> {
        regex::RegexBuilder::new(&self.effective_pattern())
            .case_insensitive(true)
            .build()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequiredSectionConfig {
    #[serde(flatten)]
    pub base: CheckBase,
    #[serde(default)]
    pub sections: Vec<RequiredSection>,
    /// Only segments classified as headings can satisfy a section
    #[serde(default = "default_true")]
    pub headings_only: bool,
    #[serde(default = "default_max_heading_words")]
    pub max_heading_words: usize,
    #[serde(default = "default_max_heading_chars")]
    pub max_heading_chars: usize,
}

fn default_max_heading_words() -> usize {
    8
}

fn default_max_heading_chars() -> usize {
    120
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaguenessConfig {
    #[serde(flatten)]
    pub base: CheckBase,
    /// Unfinished-content markers ("TBD", "to be confirmed")
    #[serde(default)]
    pub placeholders: Vec<String>,
    #[serde(default)]
    pub vague_phrases: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageCaptionConfig {
    #[serde(flatten)]
    pub base: CheckBase,
    #[serde(default)]
    pub image_terms: Vec<String>,
    #[serde(default)]
    pub caption_indicators: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubjectivityConfig {
    #[serde(flatten)]
    pub base: CheckBase,
    /// Posterior at or above which a segment is reported as subjective
    #[serde(default = "default_decision_threshold")]
    pub decision_threshold: f64,
    /// Segments with fewer words are not classified
    #[serde(default = "default_min_words")]
    pub min_words: usize,
}

fn default_decision_threshold() -> f64 {
    0.5
}

fn default_min_words() -> usize {
    3
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SemanticConfig {
    #[serde(flatten)]
    pub base: CheckBase,
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Inline credential; takes precedence over `api_key_env`
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default)]
    pub model: Option<String>,
    /// Hard per-request timeout
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Retries after the first attempt
    #[serde(default = "default_retry_budget")]
    pub retry_budget: u32,
    /// First backoff delay; doubles on every retry
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,
    #[serde(default = "default_max_excerpt_chars")]
    pub max_excerpt_chars: usize,
    /// Remote findings below this confidence are dropped by the check
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f64,
}

fn default_api_key_env() -> String {
    "REPORTQA_API_KEY".to_string()
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_retry_budget() -> u32 {
    2
}

fn default_backoff_base_ms() -> u64 {
    500
}

fn default_max_excerpt_chars() -> usize {
    6_000
}

fn default_min_confidence() -> f64 {
    0.5
}

impl SemanticConfig {
    /// Credential from config or environment; `None` when neither is set.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var(&self.api_key_env).ok())
            .filter(|k| !k.trim().is_empty())
    }
}

impl Default for SemanticConfig {
    fn default() -> Self {
        Self {
            base: CheckBase::disabled(),
            endpoint: None,
            api_key: None,
            api_key_env: default_api_key_env(),
            model: None,
            timeout_ms: default_timeout_ms(),
            retry_budget: default_retry_budget(),
            backoff_base_ms: default_backoff_base_ms(),
            max_excerpt_chars: default_max_excerpt_chars(),
            min_confidence: default_min_confidence(),
        }
    }
}

// ===== VALIDATION =====

fn invalid(language: Language, check: CheckId, field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        language: language.to_string(),
        check: check.to_string(),
        field: field.to_string(),
        reason: reason.into(),
    }
}

fn check_non_negative(language: Language, check: CheckId, field: &str, value: f64) -> Result<(), ConfigError> {
    if !value.is_finite() || value < 0.0 {
        return Err(invalid(language, check, field, format!("{value} must be a finite, non-negative number")));
    }
    Ok(())
}

fn check_probability(language: Language, check: CheckId, field: &str, value: f64) -> Result<(), ConfigError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(invalid(language, check, field, format!("{value} must lie in [0, 1]")));
    }
    Ok(())
}

impl RuleConfig {
    /// Built-in English and Arabic rule sets.
    pub fn builtin() -> Self {
        ConfigManager::new().into_rule_config()
    }

    /// Load a combined config (engine settings + all languages) from YAML.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: RuleConfig = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn rules_for(&self, language: Language) -> Option<&LanguageRules> {
        self.languages.get(&language)
    }

    /// Reject settings that cannot be applied safely. Runs before any check executes.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let cutoff = self.engine.high_confidence_cutoff;
        if !(0.0..=1.0).contains(&cutoff) {
            return Err(ConfigError::InvalidEngineSetting {
                field: "high_confidence_cutoff".to_string(),
                reason: format!("{cutoff} must lie in [0, 1]"),
            });
        }
        let share = self.engine.section_language_share;
        if !(0.0..=1.0).contains(&share) {
            return Err(ConfigError::InvalidEngineSetting {
                field: "section_language_share".to_string(),
                reason: format!("{share} must lie in [0, 1]"),
            });
        }
        if self.engine.run_timeout_ms == Some(0) {
            return Err(ConfigError::InvalidEngineSetting {
                field: "run_timeout_ms".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }

        for (key, rules) in &self.languages {
            if *key != rules.language {
                return Err(ConfigError::InvalidEngineSetting {
                    field: format!("languages.{key}"),
                    reason: format!("rule set declares language '{}'", rules.language),
                });
            }
            rules.validate()?;
        }
        Ok(())
    }

    /// SHA-256 over the canonical JSON form; identical configs share a fingerprint.
    pub fn fingerprint(&self) -> String {
        let json = serde_json::to_string(self).unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(json.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

impl LanguageRules {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let lang = self.language;

        for id in CheckId::ALL {
            if let Some(base) = self.base(id) {
                if let Some(weight) = base.severity_weight {
                    check_non_negative(lang, id, "severity_weight", weight)?;
                }
            }
        }

        if let Some(cfg) = &self.passive_voice {
            check_non_negative(lang, CheckId::PassiveVoice, "threshold", cfg.threshold)?;
            if cfg.base.enabled && cfg.auxiliaries.is_empty() {
                return Err(invalid(lang, CheckId::PassiveVoice, "auxiliaries", "must not be empty"));
            }
        }

        if let Some(cfg) = &self.repetition {
            check_non_negative(lang, CheckId::Repetition, "threshold", cfg.threshold)?;
        }

        if let Some(cfg) = &self.required_section {
            if cfg.base.enabled && cfg.sections.is_empty() {
                return Err(invalid(
                    lang,
                    CheckId::RequiredSection,
                    "sections",
                    "an enabled required-section check needs at least one section",
                ));
            }
            for section in &cfg.sections {
                if section.name.trim().is_empty() {
                    return Err(invalid(lang, CheckId::RequiredSection, "sections.name", "must not be blank"));
                }
                section.compile().map_err(|source| ConfigError::InvalidPattern {
                    language: lang.to_string(),
                    check: CheckId::RequiredSection.to_string(),
                    source,
                })?;
            }
        }

        if let Some(cfg) = &self.subjectivity {
            check_probability(lang, CheckId::Subjectivity, "decision_threshold", cfg.decision_threshold)?;
        }

        if let Some(cfg) = &self.semantic {
            check_probability(lang, CheckId::Semantic, "min_confidence", cfg.min_confidence)?;
            if cfg.timeout_ms == 0 {
                return Err(invalid(lang, CheckId::Semantic, "timeout_ms", "must be greater than zero"));
            }
            if let Some(endpoint) = &cfg.endpoint {
                if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
                    return Err(invalid(lang, CheckId::Semantic, "endpoint", format!("'{endpoint}' is not an http(s) URL")));
                }
            }
        }

        Ok(())
    }
}

// ===== CONFIG MANAGER =====

/// Holds one rule set per language, starting from the built-ins, and lets callers
/// overlay per-language YAML documents.
#[derive(Debug, Clone)]
pub struct ConfigManager {
    configs: BTreeMap<Language, LanguageRules>,
    engine: EngineSettings,
}

impl ConfigManager {
    pub fn new() -> Self {
        let mut manager = Self {
            configs: BTreeMap::new(),
            engine: EngineSettings::default(),
        };
        manager.load_builtin_configs();
        manager
    }

    pub fn get_config(&self, language: Language) -> Option<&LanguageRules> {
        self.configs.get(&language)
    }

    pub fn set_engine_settings(&mut self, engine: EngineSettings) {
        self.engine = engine;
    }

    pub fn engine_settings_mut(&mut self) -> &mut EngineSettings {
        &mut self.engine
    }

    /// Replace the rule set for the language named in a per-language YAML document.
    pub fn load_config_from_file(&mut self, path: impl AsRef<Path>) -> Result<Language, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.load_config_from_str(&content)
    }

    pub fn load_config_from_str(&mut self, content: &str) -> Result<Language, ConfigError> {
        let rules: LanguageRules = serde_yaml::from_str(content)?;
        rules.validate()?;
        let language = rules.language;
        self.configs.insert(language, rules);
        Ok(language)
    }

    /// Overlay every language of a combined document. Its engine settings replace
    /// the current ones.
    pub fn merge_rule_config(&mut self, config: RuleConfig) {
        self.engine = config.engine;
        self.configs.extend(config.languages);
    }

    pub fn into_rule_config(self) -> RuleConfig {
        RuleConfig {
            engine: self.engine,
            languages: self.configs,
        }
    }

    fn load_builtin_configs(&mut self) {
        self.configs.insert(Language::En, Self::create_english_config());
        self.configs.insert(Language::Ar, Self::create_arabic_config());
    }

    fn create_english_config() -> LanguageRules {
        LanguageRules {
            language: Language::En,
            spelling: Some(SpellingConfig {
                base: CheckBase::disabled(), // needs a dictionary before it can run
                dictionary: Vec::new(),
                dictionary_path: None,
                min_word_length: default_min_word_length(),
                skip_capitalized: true,
            }),
            first_person: Some(FirstPersonConfig {
                base: CheckBase::enabled(),
                pronouns: strings(&["I", "me", "my", "mine", "we", "us", "our", "ours"]),
            }),
            forbidden_phrases: Some(ForbiddenPhrasesConfig {
                base: CheckBase::enabled(),
                phrases: strings(&[
                    "needless to say",
                    "it goes without saying",
                    "as everyone knows",
                    "at the end of the day",
                ]),
            }),
            subjective_terms: Some(SubjectiveTermsConfig {
                base: CheckBase::enabled(),
                terms: strings(&[
                    "excellent", "amazing", "outstanding", "wonderful", "terrible", "awful",
                    "superior", "perfect", "fantastic", "great", "obviously", "clearly",
                    "unfortunately",
                ]),
                absolutes: strings(&["always", "never", "everyone", "nobody", "all of them", "none of them"]),
            }),
            passive_voice: Some(PassiveVoiceConfig {
                base: CheckBase::enabled(),
                threshold: default_passive_threshold(),
                auxiliaries: default_auxiliaries(),
                participle_suffixes: default_participle_suffixes(),
                irregular_participles: default_irregular_participles(),
                min_sentences: default_min_sentences(),
            }),
            repetition: Some(RepetitionConfig {
                base: CheckBase::enabled(),
                threshold: default_repetition_threshold(),
                min_token_length: default_min_token_length(),
                stopwords: strings(&[
                    "the", "and", "or", "a", "an", "in", "on", "for", "to", "of", "with", "by",
                    "is", "are", "was", "were", "it", "as", "at", "be", "that", "this", "these",
                    "those", "from", "we", "our", "you", "your", "their", "they", "he", "she",
                    "i", "my", "me", "us", "not", "has", "have", "had", "which", "will",
                ]),
                max_findings: default_max_findings(),
                min_document_words: 0,
            }),
            required_section: Some(RequiredSectionConfig {
                base: CheckBase::enabled(),
                sections: vec![
                    RequiredSection::new("Executive Summary", Some(r"\b(executive\s+)?summary\b")),
                    RequiredSection::new("Introduction", Some(r"\b(introduction|background)\b")),
                    RequiredSection::new("Findings", Some(r"\b(findings|results|observations)\b")),
                    RequiredSection::new("Recommendations", Some(r"\brecommendations?\b")),
                    RequiredSection::new("Conclusion", Some(r"\bconclusions?\b")),
                ],
                headings_only: true,
                max_heading_words: default_max_heading_words(),
                max_heading_chars: default_max_heading_chars(),
            }),
            vagueness: Some(VaguenessConfig {
                base: CheckBase::enabled(),
                placeholders: strings(&["TBD", "TBC", "to be confirmed", "to be determined", "N/A", "not sure", "XXX"]),
                vague_phrases: strings(&[
                    "it seems", "it appears", "somewhat", "some issues", "various reasons",
                    "a number of", "in some cases", "etc", "and so on", "not clear",
                ]),
            }),
            image_captions: Some(ImageCaptionConfig {
                base: CheckBase::enabled(),
                image_terms: strings(&["picture", "photo", "photograph", "image", "diagram", "chart"]),
                caption_indicators: strings(&["caption", "figure", "fig.", "source:"]),
            }),
            subjectivity: Some(SubjectivityConfig {
                base: CheckBase::enabled(),
                decision_threshold: default_decision_threshold(),
                min_words: default_min_words(),
            }),
            semantic: Some(SemanticConfig::default()),
        }
    }

    fn create_arabic_config() -> LanguageRules {
        LanguageRules {
            language: Language::Ar,
            spelling: None,
            first_person: Some(FirstPersonConfig {
                base: CheckBase::enabled(),
                pronouns: strings(&["أنا", "نحن", "لي", "لنا"]),
            }),
            forbidden_phrases: Some(ForbiddenPhrasesConfig {
                base: CheckBase::enabled(),
                phrases: strings(&["غني عن القول", "كما يعلم الجميع"]),
            }),
            subjective_terms: Some(SubjectiveTermsConfig {
                base: CheckBase::enabled(),
                terms: strings(&["ممتاز", "رائع", "سيء", "مذهل", "للأسف", "بوضوح"]),
                absolutes: strings(&["دائما", "أبدا", "الجميع"]),
            }),
            // The auxiliary + participle heuristic is English-specific
            passive_voice: None,
            repetition: Some(RepetitionConfig {
                base: CheckBase::enabled(),
                threshold: default_repetition_threshold(),
                min_token_length: 2,
                stopwords: strings(&[
                    "في", "من", "على", "إلى", "عن", "مع", "أن", "إن", "التي", "الذي", "هذا",
                    "هذه", "ذلك", "تلك", "كان", "كانت", "قد", "لا", "ما", "هو", "هي", "و",
                ]),
                max_findings: default_max_findings(),
                min_document_words: 0,
            }),
            required_section: Some(RequiredSectionConfig {
                base: CheckBase::enabled(),
                sections: vec![
                    RequiredSection::new("الملخص التنفيذي", Some(r"الملخص|ملخص")),
                    RequiredSection::new("المقدمة", Some(r"المقدمة|مقدمة")),
                    RequiredSection::new("النتائج", Some(r"النتائج")),
                    RequiredSection::new("التوصيات", Some(r"التوصيات")),
                    RequiredSection::new("الخاتمة", Some(r"الخاتمة|خاتمة")),
                ],
                headings_only: true,
                max_heading_words: default_max_heading_words(),
                max_heading_chars: default_max_heading_chars(),
            }),
            vagueness: Some(VaguenessConfig {
                base: CheckBase::enabled(),
                placeholders: strings(&["يحدد لاحقا", "غير معروف", "قيد التأكيد"]),
                vague_phrases: strings(&["يبدو أن", "ربما", "بعض المشاكل", "إلى حد ما"]),
            }),
            image_captions: Some(ImageCaptionConfig {
                base: CheckBase::enabled(),
                image_terms: strings(&["صورة", "الصورة", "مخطط", "رسم"]),
                caption_indicators: strings(&["الشكل", "شكل", "المصدر"]),
            }),
            // The built-in classifier corpus is English only
            subjectivity: None,
            semantic: Some(SemanticConfig::default()),
        }
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_config_validates() {
        let config = RuleConfig::builtin();
        config.validate().unwrap();
        assert!(config.rules_for(Language::En).is_some());
        assert!(config.rules_for(Language::Ar).is_some());
    }

    #[test]
    fn test_builtin_enabled_set() {
        let config = RuleConfig::builtin();
        let en = config.rules_for(Language::En).unwrap().enabled_checks();
        assert!(en.contains(&CheckId::Repetition));
        assert!(en.contains(&CheckId::Subjectivity));
        assert!(!en.contains(&CheckId::Spelling));
        assert!(!en.contains(&CheckId::Semantic));

        let ar = config.rules_for(Language::Ar).unwrap().enabled_checks();
        assert!(!ar.contains(&CheckId::PassiveVoice));
    }

    #[test]
    fn test_yaml_round_trip_preserves_fingerprint() {
        let config = RuleConfig::builtin();
        let yaml = config.to_yaml().unwrap();
        let reloaded = RuleConfig::from_yaml(&yaml).unwrap();
        assert_eq!(config.fingerprint(), reloaded.fingerprint());
    }

    #[test]
    fn test_unknown_checks_are_ignored() {
        let yaml = r#"
language: en
grammar_police:
  enabled: true
repetition:
  threshold: 10
"#;
        let mut manager = ConfigManager::new();
        let lang = manager.load_config_from_str(yaml).unwrap();
        assert_eq!(lang, Language::En);
        let rules = manager.get_config(Language::En).unwrap();
        assert_eq!(rules.enabled_checks(), vec![CheckId::Repetition]);
        assert_eq!(rules.repetition.as_ref().unwrap().threshold, 10.0);
        assert_eq!(rules.repetition.as_ref().unwrap().min_token_length, 3);
    }

    #[test]
    fn test_rejects_invalid_threshold() {
        let yaml = "language: en\nsubjectivity:\n  decision_threshold: 1.5\n";
        let err = ConfigManager::new().load_config_from_str(yaml).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_rejects_negative_repetition_threshold() {
        let yaml = "language: en\nrepetition:\n  threshold: -1\n";
        assert!(ConfigManager::new().load_config_from_str(yaml).is_err());
    }

    #[test]
    fn test_rejects_bad_section_pattern() {
        let yaml = r#"
language: en
required_section:
  sections:
    - name: Conclusion
      pattern: "(unclosed"
"#;
        let err = ConfigManager::new().load_config_from_str(yaml).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPattern { .. }));
    }

    #[test]
    fn test_rejects_enabled_required_section_without_sections() {
        let yaml = "language: en\nrequired_section:\n  enabled: true\n";
        assert!(ConfigManager::new().load_config_from_str(yaml).is_err());
    }

    #[test]
    fn test_rejects_section_language_share_outside_unit_range() {
        let err = RuleConfig::from_yaml("engine:\n  section_language_share: 1.5\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEngineSetting { ref field, .. } if field == "section_language_share"));
        assert_eq!(RuleConfig::builtin().engine.section_language_share, 0.3);
    }

    #[test]
    fn test_rejects_malformed_yaml() {
        let err = RuleConfig::from_yaml("engine: [not, a, map").unwrap_err();
        assert!(matches!(err, ConfigError::Yaml(_)));
    }

    #[test]
    fn test_rejects_mismatched_language_key() {
        let yaml = "languages:\n  ar:\n    language: en\n";
        assert!(RuleConfig::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_merge_combined_document() {
        let yaml = "engine:\n  max_workers: 2\nlanguages:\n  ar:\n    language: ar\n    first_person:\n      pronouns: [نحن]\n";
        let mut manager = ConfigManager::new();
        manager.merge_rule_config(RuleConfig::from_yaml(yaml).unwrap());
        let config = manager.into_rule_config();
        assert_eq!(config.engine.max_workers, 2);
        assert_eq!(config.rules_for(Language::Ar).unwrap().enabled_checks(), vec![CheckId::FirstPerson]);
        // English keeps the built-in set
        assert!(config.rules_for(Language::En).unwrap().is_enabled(CheckId::Repetition));
    }

    #[test]
    fn test_default_section_pattern_is_whole_word() {
        let section = RequiredSection::new("Conclusion", None);
        let re = section.compile().unwrap();
        assert!(re.is_match("CONCLUSION"));
        assert!(!re.is_match("Conclusions drawn"));
    }

    #[test]
    fn test_severity_weight_defaults() {
        let base = CheckBase::enabled();
        assert_eq!(base.weight_for(CheckId::Subjectivity), 1.0);
        assert_eq!(base.weight_for(CheckId::Repetition), 0.5);
        let custom = CheckBase {
            severity_weight: Some(2.0),
            ..CheckBase::enabled()
        };
        assert_eq!(custom.weight_for(CheckId::Repetition), 2.0);
    }
}
