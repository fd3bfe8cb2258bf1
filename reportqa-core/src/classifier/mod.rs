//! Subjectivity classifier: offline training and shared, read-only inference.

pub mod model;
pub mod training;
pub mod vectorizer;

pub use model::{ClassifierModel, MODEL_FORMAT_VERSION};
pub use training::{
    builtin_examples, load_examples_csv, parse_examples_csv, train, Label, TrainingExample,
    TrainingOptions,
};
pub use vectorizer::TfidfVectorizer;
