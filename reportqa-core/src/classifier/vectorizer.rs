use crate::text::word_spans;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Sparse feature vector: (feature index, value), sorted by index.
pub type SparseVector = Vec<(usize, f64)>;

/// TF-IDF over lowercase word n-grams with a fixed vocabulary.
///
/// The vocabulary keeps the `max_features` terms with the highest document
/// frequency (ties broken alphabetically) and assigns feature indexes in
/// alphabetical order, so fitting the same corpus always yields the same space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TfidfVectorizer {
    max_ngram: usize,
    vocabulary: BTreeMap<String, usize>,
    idf: Vec<f64>,
}

/// Lowercase word tokens of `text`.
pub fn tokenize(text: &str) -> Vec<String> {
    word_spans(text)
        .into_iter()
        .map(|(s, e)| text[s..e].to_lowercase())
        .collect()
}

/// Unigrams through `max_ngram`-grams, joined by a single space.
pub fn ngrams(tokens: &[String], max_ngram: usize) -> Vec<String> {
    let mut terms = Vec::new();
    for n in 1..=max_ngram.max(1) {
        if tokens.len() < n {
            break;
        }
        terms.extend(tokens.windows(n).map(|w| w.join(" ")));
    }
    terms
}

impl TfidfVectorizer {
    pub fn fit<S: AsRef<str>>(documents: &[S], max_features: usize, max_ngram: usize) -> Self {
        let n_docs = documents.len();
        let mut df: HashMap<String, usize> = HashMap::new();
        for doc in documents {
            let unique: BTreeSet<String> = ngrams(&tokenize(doc.as_ref()), max_ngram).into_iter().collect();
            for term in unique {
                *df.entry(term).or_insert(0) += 1;
            }
        }

        let mut ranked: Vec<(String, usize)> = df.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked.truncate(max_features);
        ranked.sort_by(|a, b| a.0.cmp(&b.0));

        let mut vocabulary = BTreeMap::new();
        let mut idf = Vec::with_capacity(ranked.len());
        for (index, (term, freq)) in ranked.into_iter().enumerate() {
            idf.push(((1.0 + n_docs as f64) / (1.0 + freq as f64)).ln() + 1.0);
            vocabulary.insert(term, index);
        }

        Self {
            max_ngram: max_ngram.max(1),
            vocabulary,
            idf,
        }
    }

    pub fn len(&self) -> usize {
        self.idf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.idf.is_empty()
    }

    pub fn max_ngram(&self) -> usize {
        self.max_ngram
    }

    pub fn index_of(&self, term: &str) -> Option<usize> {
        self.vocabulary.get(term).copied()
    }

    /// L2-normalised TF-IDF vector. Out-of-vocabulary terms are dropped, so an
    /// entirely unknown text maps to the empty vector.
    pub fn transform(&self, text: &str) -> SparseVector {
        let mut counts: BTreeMap<usize, f64> = BTreeMap::new();
        for term in ngrams(&tokenize(text), self.max_ngram) {
            if let Some(&index) = self.vocabulary.get(&term) {
                *counts.entry(index).or_insert(0.0) += 1.0;
            }
        }

        let mut vector: SparseVector = counts
            .into_iter()
            .map(|(index, tf)| (index, tf * self.idf[index]))
            .collect();
        let norm = vector.iter().map(|(_, v)| v * v).sum::<f64>().sqrt();
        if norm > 0.0 {
            for (_, v) in vector.iter_mut() {
                *v /= norm;
            }
        }
        vector
    }

    /// Feeds the fitted state into `hasher`. Floats go in bit for bit so the digest
    /// does not depend on how they were printed.
    pub(crate) fn update_digest(&self, hasher: &mut Sha256) {
        hasher.update((self.max_ngram as u64).to_le_bytes());
        for (term, index) in &self.vocabulary {
            hasher.update((term.len() as u64).to_le_bytes());
            hasher.update(term.as_bytes());
            hasher.update((*index as u64).to_le_bytes());
        }
        for value in &self.idf {
            hasher.update(value.to_bits().to_le_bytes());
        }
    }

    /// Structural consistency after deserialisation.
    pub(crate) fn check_consistency(&self) -> Result<(), String> {
        if self.vocabulary.len() != self.idf.len() {
            return Err(format!(
                "vocabulary has {} terms but {} idf values",
                self.vocabulary.len(),
                self.idf.len()
            ));
        }
        if self.vocabulary.values().any(|&i| i >= self.idf.len()) {
            return Err("vocabulary index out of range".to_string());
        }
        if self.idf.iter().any(|v| !v.is_finite()) {
            return Err("non-finite idf value".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ngrams() {
        let tokens = tokenize("Clearly the best");
        assert_eq!(
            ngrams(&tokens, 2),
            vec!["clearly", "the", "best", "clearly the", "the best"]
        );
    }

    #[test]
    fn test_vocabulary_is_limited_by_document_frequency() {
        let docs = ["alpha beta", "alpha gamma", "alpha beta delta"];
        let vectorizer = TfidfVectorizer::fit(&docs, 2, 1);
        assert_eq!(vectorizer.len(), 2);
        assert!(vectorizer.index_of("alpha").is_some());
        assert!(vectorizer.index_of("beta").is_some());
        assert!(vectorizer.index_of("gamma").is_none());
    }

    #[test]
    fn test_transform_is_normalised_and_ignores_unknown_terms() {
        let docs = ["pump failed", "valve failed"];
        let vectorizer = TfidfVectorizer::fit(&docs, 100, 2);
        let v = vectorizer.transform("Pump failed unexpectedly");
        let norm: f64 = v.iter().map(|(_, x)| x * x).sum();
        assert!((norm - 1.0).abs() < 1e-9);
        assert!(vectorizer.transform("zzz qqq").is_empty());
    }

    #[test]
    fn test_fit_is_deterministic() {
        let docs = ["b a", "c a", "a d"];
        assert_eq!(
            TfidfVectorizer::fit(&docs, 10, 2),
            TfidfVectorizer::fit(&docs, 10, 2)
        );
    }
}
