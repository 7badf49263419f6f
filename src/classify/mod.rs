//! Spam classification: verdict types, classifier abstraction, DistilBERT backend.

pub mod classifier;
pub mod distilbert;

pub use classifier::{Classifier, MockClassifier, Verdict, VerdictLabel};
pub use distilbert::DistilBertClassifier;
