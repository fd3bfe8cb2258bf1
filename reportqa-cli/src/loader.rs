//! Turning command-line paths into engine inputs: documents, rule sets and the
//! subjectivity model.

use anyhow::{Context, Result};
use reportqa_core::classifier::{builtin_examples, train};
use reportqa_core::{ClassifierModel, ConfigManager, Language, RuleConfig, SegmentModel, Segment, TrainingOptions};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Where the model used for a run comes from.
pub enum ModelChoice {
    /// Artifact on disk, loaded lazily by the engine
    Artifact(PathBuf),
    /// Trained in memory on the built-in corpus
    InMemory(Arc<ClassifierModel>),
}

/// Read a document: `.json` files hold parser segments, anything else is plain text.
///
/// `language` overrides per-segment language detection.
pub fn load_document(path: &Path, language: Option<Language>) -> Result<SegmentModel> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read document: {}", path.display()))?;

    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));

    let model = if is_json {
        let segments: Vec<Segment> = serde_json::from_str(&content)
            .with_context(|| format!("Invalid segment JSON in {}", path.display()))?;
        SegmentModel::new(segments)?
    } else {
        SegmentModel::from_plain_text(&content)?
    };

    match language {
        Some(language) => {
            let segments = model
                .iter()
                .cloned()
                .map(|mut segment| {
                    segment.language = language;
                    segment
                })
                .collect();
            Ok(SegmentModel::new(segments)?)
        }
        None => Ok(model),
    }
}

/// Built-in rules overlaid with each file in order.
///
/// A file with a top-level `languages` key is a combined document; anything else
/// is a single-language rule set.
pub fn load_rules(paths: &[PathBuf]) -> Result<RuleConfig> {
    let mut manager = ConfigManager::new();
    for path in paths {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read rules: {}", path.display()))?;
        if is_combined(&content) {
            let config = RuleConfig::from_yaml(&content)?;
            info!(
                "📋 Loaded combined rules ({} language(s)) from: {}",
                config.languages.len(),
                path.display()
            );
            manager.merge_rule_config(config);
        } else {
            let language = manager.load_config_from_str(&content)?;
            info!("📋 Loaded {language} rules from: {}", path.display());
        }
    }
    Ok(manager.into_rule_config())
}

fn is_combined(content: &str) -> bool {
    serde_yaml::from_str::<serde_yaml::Value>(content)
        .ok()
        .and_then(|value| value.get("languages").cloned())
        .is_some()
}

/// An explicit path always wins, even if it does not exist: the engine then reports
/// the subjectivity check as skipped. Without one, the default artifact is used when
/// present, else a model is trained on the built-in corpus.
pub fn resolve_model(explicit: Option<&Path>, default_path: &Path) -> Result<ModelChoice> {
    if let Some(path) = explicit {
        return Ok(ModelChoice::Artifact(path.to_path_buf()));
    }
    if default_path.exists() {
        return Ok(ModelChoice::Artifact(default_path.to_path_buf()));
    }
    warn!(
        "⚠️  No model at {}; training on the built-in corpus",
        default_path.display()
    );
    let model = train(&builtin_examples(), &TrainingOptions::default())
        .context("Failed to train the built-in subjectivity model")?;
    Ok(ModelChoice::InMemory(Arc::new(model)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use reportqa_core::CheckId;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_plain_text_document() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "report.txt", "Introduction\n\nThe pump failed.\n\x0CFindings");
        let doc = load_document(&path, None).unwrap();
        assert_eq!(doc.len(), 3);
        assert_eq!(doc.page_count(), 2);
    }

    #[test]
    fn test_json_document_with_language_override() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "segments.json",
            r#"[{"text": "Introduction", "page": 1, "paragraph_index": 0, "char_offset": 0, "language": "en"}]"#,
        );
        let doc = load_document(&path, Some(Language::Ar)).unwrap();
        assert_eq!(doc.segments()[0].language, Language::Ar);
    }

    #[test]
    fn test_blank_document_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "blank.txt", "  \n\n ");
        assert!(load_document(&path, None).is_err());
    }

    #[test]
    fn test_rules_files_are_layered() {
        let dir = TempDir::new().unwrap();
        let single = write(&dir, "en.yaml", "language: en\nrepetition:\n  threshold: 10\n");
        let combined = write(
            &dir,
            "all.yaml",
            "engine:\n  run_timeout_ms: 5000\nlanguages:\n  ar:\n    language: ar\n",
        );
        let config = load_rules(&[single, combined]).unwrap();
        assert_eq!(config.engine.run_timeout_ms, Some(5000));
        assert_eq!(
            config.rules_for(Language::En).unwrap().enabled_checks(),
            vec![CheckId::Repetition]
        );
        assert!(config.rules_for(Language::Ar).unwrap().enabled_checks().is_empty());
    }

    #[test]
    fn test_invalid_rules_are_an_error() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "bad.yaml", "language: en\nsubjectivity:\n  decision_threshold: 2\n");
        assert!(load_rules(&[path]).is_err());
    }

    #[test]
    fn test_model_resolution_order() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing.json");
        let explicit = dir.path().join("explicit.json");

        assert!(matches!(
            resolve_model(Some(&explicit), &missing).unwrap(),
            ModelChoice::Artifact(p) if p == explicit
        ));
        assert!(matches!(
            resolve_model(None, &missing).unwrap(),
            ModelChoice::InMemory(_)
        ));

        let default = write(&dir, "default.json", "{}");
        assert!(matches!(
            resolve_model(None, &default).unwrap(),
            ModelChoice::Artifact(p) if p == default
        ));
    }
}
