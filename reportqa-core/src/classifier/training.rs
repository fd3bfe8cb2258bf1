use super::model::ClassifierModel;
use super::vectorizer::{SparseVector, TfidfVectorizer};
use anyhow::{bail, Context, Result};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    Subjective,
    Objective,
}

impl Label {
    fn target(&self) -> f64 {
        match self {
            Label::Subjective => 1.0,
            Label::Objective => 0.0,
        }
    }
}

impl std::str::FromStr for Label {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "1" | "subjective" => Ok(Label::Subjective),
            "0" | "objective" => Ok(Label::Objective),
            other => Err(format!("unknown label '{other}' (expected 1, 0, subjective or objective)")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingExample {
    pub text: String,
    pub label: Label,
}

impl TrainingExample {
    pub fn new(text: impl Into<String>, label: Label) -> Self {
        Self {
            text: text.into(),
            label,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingOptions {
    pub max_features: usize,
    pub max_ngram: usize,
    pub epochs: usize,
    pub learning_rate: f64,
    /// L2 penalty applied as weight decay once per epoch
    pub l2: f64,
    pub seed: u64,
    pub decision_threshold: f64,
}

impl Default for TrainingOptions {
    fn default() -> Self {
        Self {
            max_features: 2000,
            max_ngram: 2,
            epochs: 300,
            learning_rate: 0.5,
            l2: 1e-4,
            seed: 42,
            decision_threshold: 0.5,
        }
    }
}

/// Fit a logistic regression on TF-IDF features with seeded SGD.
///
/// The example order is shuffled each epoch with a ChaCha8 stream seeded from
/// `options.seed`, so identical inputs produce an identical artifact.
pub fn train(examples: &[TrainingExample], options: &TrainingOptions) -> Result<ClassifierModel> {
    if examples.is_empty() {
        bail!("training corpus is empty");
    }
    let positives = examples.iter().filter(|e| e.label == Label::Subjective).count();
    if positives == 0 || positives == examples.len() {
        bail!("training corpus needs both subjective and objective examples");
    }
    if !(0.0..=1.0).contains(&options.decision_threshold) {
        bail!("decision threshold {} outside [0, 1]", options.decision_threshold);
    }

    let texts: Vec<&str> = examples.iter().map(|e| e.text.as_str()).collect();
    let vectorizer = TfidfVectorizer::fit(&texts, options.max_features, options.max_ngram);
    if vectorizer.is_empty() {
        bail!("training corpus has no word tokens");
    }

    let features: Vec<SparseVector> = texts.iter().map(|t| vectorizer.transform(t)).collect();
    let targets: Vec<f64> = examples.iter().map(|e| e.label.target()).collect();

    info!(
        "🧠 Training subjectivity model: {} examples ({} subjective), {} features",
        examples.len(),
        positives,
        vectorizer.len()
    );

    let mut weights = vec![0.0; vectorizer.len()];
    let mut bias = 0.0;
    let mut rng = ChaCha8Rng::seed_from_u64(options.seed);
    let mut order: Vec<usize> = (0..examples.len()).collect();

    for epoch in 0..options.epochs {
        order.shuffle(&mut rng);
        let mut loss = 0.0;

        for &i in &order {
            let z: f64 = features[i].iter().map(|(j, x)| weights[*j] * x).sum::<f64>() + bias;
            let p = 1.0 / (1.0 + (-z).exp());
            let gradient = p - targets[i];
            for (j, x) in &features[i] {
                weights[*j] -= options.learning_rate * gradient * x;
            }
            bias -= options.learning_rate * gradient;
            loss -= targets[i] * p.max(1e-12).ln() + (1.0 - targets[i]) * (1.0 - p).max(1e-12).ln();
        }

        let decay = 1.0 - options.learning_rate * options.l2;
        for w in weights.iter_mut() {
            *w *= decay;
        }

        if epoch % 50 == 0 || epoch + 1 == options.epochs {
            debug!("epoch {epoch}: mean log-loss {:.4}", loss / examples.len() as f64);
        }
    }

    let model = ClassifierModel::from_parts(vectorizer, weights, bias, options.decision_threshold);
    info!("✅ Trained model version {}", &model.version()[..12]);
    Ok(model)
}

/// Small built-in corpus: hedging and evaluative sentences against factual ones.
pub fn builtin_examples() -> Vec<TrainingExample> {
    const SUBJECTIVE: &[&str] = &[
        "We believe the results are excellent",
        "I think this method is the best",
        "It is clear that the system performed wonderfully",
        "Obviously, this approach is superior",
        "Our great team achieved outstanding outcomes",
        "Unfortunately",
        "It seems",
        "It is our understanding",
        "It is believed that the new design is clearly better",
        "The outcome was clearly excellent and impressive",
        "It is widely believed that this vendor is the best choice",
        "The team did an excellent job and the work is clearly superb",
        "Clearly this is the most impressive result we have seen",
        "It is believed that the proposal will be a great success",
        "The presentation was excellent and truly inspiring",
        "This is arguably the finest solution available",
        "The staff are clearly very talented and amazing",
        "It is generally believed that the old process was terrible",
        "The quality is excellent and the service is wonderful",
        "Sadly the results are disappointing and poor",
    ];
    const OBJECTIVE: &[&str] = &[
        "Tests were conducted at 30 degrees Celsius",
        "Measurements were recorded using a digital meter",
        "The sample failed after 12 hours of exposure",
        "Data were collected from three independent trials",
        "The procedure followed ISO 31000 standards",
        "The pump operated for 400 hours before inspection",
        "Pressure was measured at the inlet and outlet valves",
        "The report covers the period from January to March",
        "Samples were stored at four degrees in sealed containers",
        "The inspection found corrosion on two of the six flanges",
        "Revenue for the quarter was 2.4 million dollars",
        "The survey received 312 responses from field staff",
        "Results are listed in the table in section four",
        "The contractor replaced the gasket on 14 May",
        "The audit sampled 50 invoices from the ledger",
        "Water flow was reduced by 15 percent after the change",
        "The results show a mean deviation of 0.3 millimetres",
        "Three of the five units passed the load test",
        "The meeting was held at the site office",
        "The system logs events every ten seconds",
    ];

    SUBJECTIVE
        .iter()
        .map(|t| TrainingExample::new(*t, Label::Subjective))
        .chain(OBJECTIVE.iter().map(|t| TrainingExample::new(*t, Label::Objective)))
        .collect()
}

/// Load labelled examples from a CSV file with `text` and `label` columns.
pub fn load_examples_csv(path: impl AsRef<Path>) -> Result<Vec<TrainingExample>> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read training data: {}", path.display()))?;
    parse_examples_csv(&content).with_context(|| format!("Invalid training data in {}", path.display()))
}

pub fn parse_examples_csv(content: &str) -> Result<Vec<TrainingExample>> {
    let mut records = parse_csv(content)?.into_iter();
    let Some(header) = records.next() else {
        bail!("CSV is empty");
    };
    let column = |name: &str| header.iter().position(|h| h.trim().eq_ignore_ascii_case(name));
    let (Some(text_col), Some(label_col)) = (column("text"), column("label")) else {
        bail!("CSV must contain `text` and `label` columns");
    };

    let mut examples = Vec::new();
    for (row, record) in records.enumerate() {
        let line = row + 2;
        let text = record
            .get(text_col)
            .with_context(|| format!("row {line}: missing text column"))?;
        let label = record
            .get(label_col)
            .with_context(|| format!("row {line}: missing label column"))?;
        let label: Label = label
            .parse()
            .map_err(|e: String| anyhow::anyhow!("row {line}: {e}"))?;
        examples.push(TrainingExample::new(text.clone(), label));
    }
    Ok(examples)
}

/// Minimal RFC 4180 reader: quoted fields, doubled quotes, CRLF, embedded newlines.
/// Blank lines are skipped.
fn parse_csv(content: &str) -> Result<Vec<Vec<String>>> {
    let mut records = Vec::new();
    let mut record: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = content.trim_start_matches('\u{feff}').chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = false,
                _ => field.push(c),
            }
            continue;
        }
        match c {
            '"' if field.is_empty() => in_quotes = true,
            ',' => record.push(std::mem::take(&mut field)),
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' => {
                record.push(std::mem::take(&mut field));
                if !(record.len() == 1 && record[0].is_empty()) {
                    records.push(std::mem::take(&mut record));
                } else {
                    record.clear();
                }
            }
            _ => field.push(c),
        }
    }
    if in_quotes {
        bail!("unterminated quoted field");
    }
    if !field.is_empty() || !record.is_empty() {
        record.push(field);
        records.push(record);
    }
    Ok(records)
}
