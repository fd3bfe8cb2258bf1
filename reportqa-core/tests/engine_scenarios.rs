//! End-to-end engine scenarios.
//!
//! These tests drive `RuleEngine::analyze` over documents in `test_fixtures/`
//! and over small inline reports, and assert the contracts callers rely on:
//!
//! - Check isolation: a failing or unreachable check never changes what the
//!   other checks report
//! - Determinism: the same document, config and model give the same findings
//! - Thresholds: the repetition rate limit and the required-section rule
//! - Classifier behaviour over a small calibration set
//!
//! No network access is needed; the remote check is pointed at a closed port.

use reportqa_core::classifier::{builtin_examples, train};
use reportqa_core::config::{CheckBase, RepetitionConfig, SemanticConfig};
use reportqa_core::*;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

// ============================================================================
// Fixture helpers
// ============================================================================

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("test_fixtures")
}

fn load_report(name: &str) -> SegmentModel {
    let path = fixtures_dir().join("reports").join(name);
    let contents = std::fs::read_to_string(&path)
        .unwrap_or_else(|_| panic!("Missing fixture: {}", path.display()));
    if name.ends_with(".json") {
        let segments: Vec<Segment> = serde_json::from_str(&contents).expect("Invalid segment JSON");
        SegmentModel::new(segments).expect("Fixture segments out of order")
    } else {
        SegmentModel::from_plain_text(&contents).expect("Empty fixture")
    }
}

fn model() -> Arc<ClassifierModel> {
    Arc::new(train(&builtin_examples(), &TrainingOptions::default()).expect("training failed"))
}

fn engine(config: RuleConfig) -> RuleEngine {
    RuleEngine::new(config).expect("config rejected").with_model(model())
}

fn of_check(run: &AnalysisRun, id: CheckId) -> Vec<&Finding> {
    run.findings.iter().filter(|f| f.check_id == id).collect()
}

fn without_check(run: &AnalysisRun, id: CheckId) -> Vec<Finding> {
    run.findings.iter().filter(|f| f.check_id != id).cloned().collect()
}

fn english_mut(config: &mut RuleConfig) -> &mut LanguageRules {
    config.languages.get_mut(&Language::En).expect("built-in English rules")
}

const SUBJECTIVE_REPORT: &str = "Introduction\n\n\
It is believed that the results are clearly excellent.\n\n\
We replaced the valve on site.\n\n\
Executive Summary\n\nFindings\n\nRecommendations\n\nConclusion";

// ============================================================================
// Fixture documents
// ============================================================================

mod fixture_documents {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn site_inspection_runs_clean_of_structure_findings() {
        let doc = load_report("site_inspection.txt");
        let run = engine(RuleConfig::builtin()).analyze(&doc).unwrap();

        assert!(run.is_complete(), "unexpected skips: {:?}", run.skipped);
        assert!(of_check(&run, CheckId::RequiredSection).is_empty());
        assert_eq!(run.segment_count, doc.len());
        assert!(run.model_version.is_some());
    }

    #[test]
    fn site_inspection_flags_placeholder_and_uncaptioned_photo() {
        let doc = load_report("site_inspection.txt");
        let run = engine(RuleConfig::builtin()).analyze(&doc).unwrap();

        let vague = of_check(&run, CheckId::Vagueness);
        assert!(vague.iter().any(|f| f.message.contains("\"TBD\"")));

        let images = of_check(&run, CheckId::ImageCaptions);
        assert_eq!(images.len(), 1);
        let segment = doc
            .iter()
            .find(|s| s.location == images[0].segment_location)
            .unwrap();
        assert_eq!(&segment.text[images[0].span.start..images[0].span.end], "photo");
    }

    #[test]
    fn findings_are_in_document_order() {
        let run = engine(RuleConfig::builtin())
            .analyze(&load_report("site_inspection.txt"))
            .unwrap();
        let locations: Vec<_> = run.findings.iter().map(|f| f.segment_location).collect();
        let mut sorted = locations.clone();
        sorted.sort();
        assert_eq!(locations, sorted);
    }

    #[test]
    fn mixed_language_segments_use_their_own_rules() {
        let run = engine(RuleConfig::builtin())
            .analyze(&load_report("segments.json"))
            .unwrap();

        let first_person = of_check(&run, CheckId::FirstPerson);
        assert!(first_person.iter().any(|f| f.language == Language::En));
        assert!(first_person.iter().any(|f| f.language == Language::Ar));

        // Arabic has no classifier corpus, so subjectivity never runs there
        assert!(of_check(&run, CheckId::Subjectivity)
            .iter()
            .all(|f| f.language == Language::En));
        assert!(run.skipped.is_empty());
    }

    #[test]
    fn out_of_order_segments_are_rejected() {
        let path = fixtures_dir().join("reports/out_of_order.json");
        let segments: Vec<Segment> =
            serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert!(matches!(
            SegmentModel::new(segments),
            Err(ParseError::NonMonotonic { index: 1, .. })
        ));
    }
}

// ============================================================================
// Rule files
// ============================================================================

mod rule_files {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn strict_rules_overlay_the_builtin_english_set() {
        let mut manager = ConfigManager::new();
        let language = manager
            .load_config_from_file(fixtures_dir().join("rules/strict_en.yaml"))
            .unwrap();
        assert_eq!(language, Language::En);

        let rules = manager.get_config(Language::En).unwrap();
        assert!(rules.is_enabled(CheckId::Spelling));
        assert!(!rules.is_enabled(CheckId::ImageCaptions), "omitted checks are not configured");
        assert_eq!(rules.repetition.as_ref().unwrap().threshold, 20.0);
        // Arabic keeps its built-in rules
        assert!(manager.get_config(Language::Ar).unwrap().is_enabled(CheckId::FirstPerson));
    }

    #[test]
    fn weighted_placeholder_is_promoted_to_warning() {
        let mut manager = ConfigManager::new();
        manager
            .load_config_from_file(fixtures_dir().join("rules/strict_en.yaml"))
            .unwrap();
        let run = engine(manager.into_rule_config())
            .analyze(&load_report("site_inspection.txt"))
            .unwrap();

        let tbd: Vec<_> = of_check(&run, CheckId::Vagueness)
            .into_iter()
            .filter(|f| f.message.contains("\"TBD\""))
            .collect();
        assert_eq!(tbd.len(), 1);
        assert_eq!(tbd[0].severity, Severity::Warning);
    }

    #[test]
    fn invalid_threshold_file_is_a_config_error() {
        let mut manager = ConfigManager::new();
        let err = manager
            .load_config_from_file(fixtures_dir().join("rules/invalid_threshold.yaml"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "decision_threshold"));
    }
}

// ============================================================================
// Core scenarios
// ============================================================================

mod scenarios {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn evaluative_sentence_is_flagged_by_the_classifier() {
        let doc =
            SegmentModel::from_plain_text("It is believed that the results are clearly excellent.").unwrap();
        let run = engine(RuleConfig::builtin()).analyze(&doc).unwrap();

        let hits = of_check(&run, CheckId::Subjectivity);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].segment_location, doc.segments()[0].location);
        assert!(hits[0].confidence >= 0.5);
        assert_eq!(hits[0].category, Category::Subjectivity);
    }

    #[test]
    fn missing_conclusion_is_one_critical_finding() {
        let run = engine(RuleConfig::builtin())
            .analyze(&load_report("segments.json"))
            .unwrap();

        // the two Arabic paragraphs are too few for Arabic sections to be required
        let missing = of_check(&run, CheckId::RequiredSection);
        assert_eq!(missing.len(), 1);
        assert_eq!(missing[0].language, Language::En);
        assert_eq!(missing[0].severity, Severity::Critical);
        assert!(missing[0].message.contains("Conclusion"));
    }

    #[test]
    fn stray_foreign_paragraph_does_not_require_its_sections() {
        let path = fixtures_dir().join("reports/site_inspection.txt");
        let mut text = std::fs::read_to_string(path).unwrap();
        text.push_str("\n\nنحن نرى أن الأداء ممتاز هذا العام.\n");
        let doc = SegmentModel::from_plain_text(&text).unwrap();
        assert!(doc.languages().contains(&Language::Ar));

        let run = engine(RuleConfig::builtin()).analyze(&doc).unwrap();
        assert!(of_check(&run, CheckId::RequiredSection).is_empty(), "{:?}", run.findings);
        assert!(of_check(&run, CheckId::FirstPerson)
            .iter()
            .any(|f| f.language == Language::Ar));
    }

    #[test]
    fn unreachable_semantic_service_is_skipped_without_side_effects() {
        let doc = SegmentModel::from_plain_text(SUBJECTIVE_REPORT).unwrap();
        let baseline = engine(RuleConfig::builtin()).analyze(&doc).unwrap();

        let mut config = RuleConfig::builtin();
        english_mut(&mut config).semantic = Some(SemanticConfig {
            base: CheckBase::enabled(),
            endpoint: Some("http://127.0.0.1:9/review".to_string()),
            api_key: Some("test-key".to_string()),
            timeout_ms: 500,
            retry_budget: 2,
            backoff_base_ms: 10,
            ..SemanticConfig::default()
        });
        let run = engine(config).analyze(&doc).unwrap();

        assert!(of_check(&run, CheckId::Semantic).is_empty());
        assert_eq!(run.skipped.len(), 1);
        assert_eq!(run.skipped[0].check_id, CheckId::Semantic);
        assert_eq!(run.skipped[0].reason, SkipReason::Failed);
        assert!(run.skipped[0].detail.contains("3 attempts"), "{}", run.skipped[0].detail);

        assert_eq!(run.findings, baseline.findings);
        assert_eq!(run.checks_attempted, baseline.checks_attempted + 1);
        assert_eq!(run.checks_completed, baseline.checks_completed);
    }
}

// ============================================================================
// Engine contracts
// ============================================================================

mod engine_contracts {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn repeated_runs_give_identical_findings() {
        let doc = load_report("site_inspection.txt");
        let engine = engine(RuleConfig::builtin());
        let first = engine.analyze(&doc).unwrap();
        let second = engine.analyze(&doc).unwrap();

        assert_eq!(first.findings, second.findings);
        assert_eq!(first.skipped, second.skipped);
        assert_eq!(first.config_fingerprint, second.config_fingerprint);
    }

    #[test]
    fn failing_check_does_not_change_other_findings() {
        let doc = load_report("site_inspection.txt");
        let baseline = engine(RuleConfig::builtin()).analyze(&doc).unwrap();

        // spelling with no dictionary cannot run
        let mut config = RuleConfig::builtin();
        english_mut(&mut config)
            .spelling
            .as_mut()
            .unwrap()
            .base
            .enabled = true;
        let run = engine(config).analyze(&doc).unwrap();

        assert_eq!(run.skipped.len(), 1);
        assert_eq!(run.skipped[0].check_id, CheckId::Spelling);
        assert_eq!(run.skipped[0].reason, SkipReason::Failed);
        assert_eq!(without_check(&run, CheckId::Spelling), baseline.findings);
        assert_eq!(run.checks_completed, baseline.checks_completed);
    }

    #[test]
    fn missing_model_only_skips_subjectivity() {
        let doc = SegmentModel::from_plain_text(SUBJECTIVE_REPORT).unwrap();
        let with_model = engine(RuleConfig::builtin()).analyze(&doc).unwrap();
        let run = RuleEngine::new(RuleConfig::builtin())
            .unwrap()
            .with_model_path(fixtures_dir().join("models/does_not_exist.json"))
            .analyze(&doc)
            .unwrap();

        assert_eq!(run.skipped.len(), 1);
        assert_eq!(run.skipped[0].reason, SkipReason::ModelUnavailable);
        assert!(run.model_version.is_none());
        assert_eq!(run.findings, without_check(&with_model, CheckId::Subjectivity));
    }

    #[test]
    fn blank_document_is_fatal() {
        assert!(matches!(
            SegmentModel::from_plain_text("\n\n   \n"),
            Err(ParseError::Empty)
        ));
    }

    #[test]
    fn csv_export_has_one_row_per_finding() {
        let run = engine(RuleConfig::builtin())
            .analyze(&load_report("segments.json"))
            .unwrap();
        let csv = export::to_csv(&run.findings);
        let rows = csv.split("\r\n").filter(|line| !line.is_empty()).count();
        assert_eq!(rows, run.findings.len() + 1);
    }
}

// ============================================================================
// Repetition rate boundary
// ============================================================================

mod repetition_boundary {
    use super::*;
    use pretty_assertions::assert_eq;

    const TOTAL_WORDS: usize = 1000;

    /// Distinct alphabetic filler words ("qzaaa", "qzaab", ...).
    fn filler(index: usize) -> String {
        let letters: Vec<char> = ('a'..='z').collect();
        let mut word = String::from("qz");
        let mut n = index;
        let mut suffix = Vec::new();
        for _ in 0..3 {
            suffix.push(letters[n % 26]);
            n /= 26;
        }
        word.extend(suffix.into_iter().rev());
        word
    }

    fn document(repeats: usize) -> SegmentModel {
        let mut words: Vec<String> = (0..TOTAL_WORDS - repeats).map(filler).collect();
        // spread the repeated token through the text
        for i in 0..repeats {
            words.insert(i * 30, "pump".to_string());
        }
        assert_eq!(words.len(), TOTAL_WORDS);
        SegmentModel::from_plain_text(&words.join(" ")).unwrap()
    }

    fn repetition_only() -> RuleConfig {
        let mut rules = LanguageRules::empty(Language::En);
        rules.repetition = Some(RepetitionConfig {
            base: CheckBase::enabled(),
            threshold: 25.0,
            min_token_length: 3,
            stopwords: Vec::new(),
            max_findings: 50,
            min_document_words: 100,
        });
        RuleConfig {
            engine: EngineSettings::default(),
            languages: BTreeMap::from([(Language::En, rules)]),
        }
    }

    #[test]
    fn rate_at_the_limit_is_not_reported() {
        let run = RuleEngine::new(repetition_only())
            .unwrap()
            .analyze(&document(25))
            .unwrap();
        assert!(run.findings.is_empty(), "{:?}", run.findings);
        assert_eq!(run.checks_completed, 1);
    }

    #[test]
    fn rate_above_the_limit_is_reported_once() {
        let run = RuleEngine::new(repetition_only())
            .unwrap()
            .analyze(&document(26))
            .unwrap();
        assert_eq!(run.findings.len(), 1);
        assert!(run.findings[0].message.starts_with("\"pump\" is repeated 26 times"));
        assert_eq!(run.findings[0].span, Span::new(0, 4));
    }
}

// ============================================================================
// Classifier calibration
// ============================================================================

mod classifier_calibration {
    use super::*;

    const EVALUATIVE: [&str; 5] = [
        "The results are clearly excellent and truly impressive.",
        "It is believed that the vendor is clearly the best.",
        "This superb team did an amazing and wonderful job.",
        "Obviously the new design is superior and excellent.",
        "Unfortunately the outcome was terrible and disappointing.",
    ];

    const FACTUAL: [&str; 5] = [
        "The results are listed in table four.",
        "The supplier delivered 40 units in March.",
        "Inspectors checked six valves at the site office.",
        "Each flange measured 12 millimetres across.",
        "Readings were recorded after 30 hours of operation.",
    ];

    fn mean(model: &ClassifierModel, texts: &[&str]) -> f64 {
        texts.iter().map(|t| model.classify(t)).sum::<f64>() / texts.len() as f64
    }

    #[test]
    fn evaluative_text_scores_higher_on_average() {
        let model = model();
        assert!(mean(&model, &EVALUATIVE) > mean(&model, &FACTUAL));
    }

    #[test]
    fn most_pairs_are_ranked_correctly() {
        let model = model();
        let mut correct = 0;
        for evaluative in EVALUATIVE {
            for factual in FACTUAL {
                if model.classify(evaluative) >= model.classify(factual) {
                    correct += 1;
                }
            }
        }
        assert!(correct * 4 >= EVALUATIVE.len() * FACTUAL.len() * 3, "only {correct} of 25 pairs");
    }
}
