use super::vectorizer::TfidfVectorizer;
use crate::errors::ModelLoadError;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;

/// Bumped whenever the artifact layout changes.
pub const MODEL_FORMAT_VERSION: u32 = 1;

/// Trained subjectivity classifier: TF-IDF features into a logistic regression.
///
/// Immutable once built or loaded. Share it as `Arc<ClassifierModel>`; inference
/// takes `&self` only, so concurrent callers need no synchronisation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierModel {
    format_version: u32,
    /// SHA-256 over the learned parameters
    version: String,
    vectorizer: TfidfVectorizer,
    weights: Vec<f64>,
    bias: f64,
    decision_threshold: f64,
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

fn parameter_digest(vectorizer: &TfidfVectorizer, weights: &[f64], bias: f64, decision_threshold: f64) -> String {
    let mut hasher = Sha256::new();
    vectorizer.update_digest(&mut hasher);
    hasher.update((weights.len() as u64).to_le_bytes());
    for w in weights {
        hasher.update(w.to_bits().to_le_bytes());
    }
    hasher.update(bias.to_bits().to_le_bytes());
    hasher.update(decision_threshold.to_bits().to_le_bytes());
    format!("{:x}", hasher.finalize())
}

impl ClassifierModel {
    pub(crate) fn from_parts(
        vectorizer: TfidfVectorizer,
        weights: Vec<f64>,
        bias: f64,
        decision_threshold: f64,
    ) -> Self {
        let version = parameter_digest(&vectorizer, &weights, bias, decision_threshold);
        Self {
            format_version: MODEL_FORMAT_VERSION,
            version,
            vectorizer,
            weights,
            bias,
            decision_threshold,
        }
    }

    /// Probability that `text` is subjective. Unknown words contribute nothing;
    /// a text with no known terms scores `sigmoid(bias)`.
    pub fn classify(&self, text: &str) -> f64 {
        let z = self
            .vectorizer
            .transform(text)
            .into_iter()
            .map(|(i, x)| self.weights[i] * x)
            .sum::<f64>()
            + self.bias;
        sigmoid(z)
    }

    pub fn is_subjective(&self, text: &str, threshold: f64) -> bool {
        self.classify(text) >= threshold
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn decision_threshold(&self) -> f64 {
        self.decision_threshold
    }

    pub fn vectorizer(&self) -> &TfidfVectorizer {
        &self.vectorizer
    }

    pub fn feature_count(&self) -> usize {
        self.weights.len()
    }

    /// Weight learned for one vocabulary term, if present.
    pub fn term_weight(&self, term: &str) -> Option<f64> {
        self.vectorizer.index_of(term).map(|i| self.weights[i])
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize classifier model")
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create model directory: {}", parent.display()))?;
        }
        fs::write(path, self.to_json()?)
            .with_context(|| format!("Failed to write model artifact: {}", path.display()))?;
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ModelLoadError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ModelLoadError::NotFound(path.to_path_buf()));
        }
        let content = fs::read_to_string(path).map_err(|source| ModelLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, ModelLoadError> {
        let value: serde_json::Value =
            serde_json::from_str(content).map_err(|e| ModelLoadError::Corrupt(e.to_string()))?;

        // check the version before the full shape so old artifacts get a clear error
        let found = value
            .get("format_version")
            .and_then(|v| v.as_u64())
            .ok_or_else(|| ModelLoadError::Corrupt("missing format_version".to_string()))?;
        if found != MODEL_FORMAT_VERSION as u64 {
            return Err(ModelLoadError::UnsupportedVersion {
                found: found as u32,
                expected: MODEL_FORMAT_VERSION,
            });
        }

        let model: ClassifierModel =
            serde_json::from_value(value).map_err(|e| ModelLoadError::Corrupt(e.to_string()))?;
        model.validate()?;
        Ok(model)
    }

    fn validate(&self) -> Result<(), ModelLoadError> {
        self.vectorizer
            .check_consistency()
            .map_err(ModelLoadError::Corrupt)?;
        if self.weights.len() != self.vectorizer.len() {
            return Err(ModelLoadError::Corrupt(format!(
                "{} weights for {} features",
                self.weights.len(),
                self.vectorizer.len()
            )));
        }
        if !self.bias.is_finite() || self.weights.iter().any(|w| !w.is_finite()) {
            return Err(ModelLoadError::Corrupt("non-finite parameter".to_string()));
        }
        if !(0.0..=1.0).contains(&self.decision_threshold) {
            return Err(ModelLoadError::Corrupt(format!(
                "decision threshold {} outside [0, 1]",
                self.decision_threshold
            )));
        }
        let digest = parameter_digest(&self.vectorizer, &self.weights, self.bias, self.decision_threshold);
        if digest != self.version {
            return Err(ModelLoadError::Corrupt("parameter checksum mismatch".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny_model() -> ClassifierModel {
        let vectorizer = TfidfVectorizer::fit(&["great work", "pump failed"], 10, 1);
        let weights: Vec<f64> = ["failed", "great", "pump", "work"]
            .iter()
            .map(|t| if *t == "great" { 3.0 } else { 0.0 })
            .collect();
        ClassifierModel::from_parts(vectorizer, weights, 0.0, 0.5)
    }

    #[test]
    fn test_classify_uses_weights_and_handles_oov() {
        let model = tiny_model();
        assert!(model.classify("great") > 0.9);
        assert_eq!(model.classify("entirely unknown words"), 0.5);
        assert_eq!(model.classify(""), 0.5);
        assert!(model.is_subjective("great", 0.5));
    }

    #[test]
    fn test_save_and_load_preserve_version() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("models").join("subjectivity.json");
        let model = tiny_model();
        model.save(&path).unwrap();
        let loaded = ClassifierModel::load(&path).unwrap();
        assert_eq!(loaded.version(), model.version());
        assert_eq!(loaded, model);
    }

    #[test]
    fn test_trained_model_survives_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let examples = crate::classifier::builtin_examples();
        for seed in [0, 7, 42, 1234] {
            let options = crate::classifier::TrainingOptions {
                seed,
                ..Default::default()
            };
            let model = crate::classifier::train(&examples, &options).unwrap();
            let path = dir.path().join(format!("model-{seed}.json"));
            model.save(&path).unwrap();

            let loaded = ClassifierModel::load(&path).unwrap();
            assert_eq!(loaded.version(), model.version(), "seed {seed}");
            assert_eq!(loaded, model, "seed {seed}");
        }
    }

    #[test]
    fn test_load_missing_artifact() {
        let err = ClassifierModel::load("/nonexistent/model.json").unwrap_err();
        assert!(matches!(err, ModelLoadError::NotFound(_)));
    }

    #[test]
    fn test_load_corrupt_artifact() {
        assert!(matches!(
            ClassifierModel::from_json("{not json"),
            Err(ModelLoadError::Corrupt(_))
        ));

        let mut value = serde_json::to_value(tiny_model()).unwrap();
        value["bias"] = serde_json::json!(4.0);
        let tampered = serde_json::to_string(&value).unwrap();
        assert!(matches!(
            ClassifierModel::from_json(&tampered),
            Err(ModelLoadError::Corrupt(_))
        ));
    }

    #[test]
    fn test_load_rejects_other_format_versions() {
        let mut value = serde_json::to_value(tiny_model()).unwrap();
        value["format_version"] = serde_json::json!(99);
        let err = ClassifierModel::from_json(&value.to_string()).unwrap_err();
        assert!(matches!(
            err,
            ModelLoadError::UnsupportedVersion { found: 99, expected: 1 }
        ));
    }
}
