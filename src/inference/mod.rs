//! Inference module
//!
//! Serves predictions from a previously fitted model pipeline:
//! - JSON artifact loading and validation
//! - Feature schema derivation from the fitted preprocessor
//! - Capability-tagged classifiers (probabilistic, scoring, label-only)
//! - Single-record and batch CSV prediction
//! - A shared service that loads the model once on first use

mod artifact;
mod classifier;
mod config;
mod engine;
mod schema;
mod service;

pub use artifact::{ModelArtifact, PipelineStep, Stage, DEFAULT_TARGET, PREPROCESSOR_STEP};
pub use classifier::{
    sigmoid, Classifier, ClassifierSpec, FittedModel, LinearSvc, LogisticRegression,
    NearestCentroid, ProbabilisticClassifier, Scored, ScoringClassifier,
};
pub use config::InferenceConfig;
pub use engine::{BatchResult, InferenceEngine, PredictionResult, PRED_COLUMN, PROBA_COLUMN};
pub use schema::FeatureSchema;
pub use service::PredictionService;
