//! Satisfaction Serve - prediction service for a pre-trained classifier
//!
//! This crate serves a binary passenger satisfaction model stored as a
//! JSON pipeline artifact:
//! - Column-wise preprocessing (imputation, scaling, one-hot encoding)
//! - Linear and centroid classifiers with optional probability output
//! - A lazily-loaded prediction service shared across requests
//! - HTTP and command-line interfaces
//!
//! # Modules
//!
//! - [`preprocessing`] - Fitted column transformers and value clipping
//! - [`inference`] - Artifact format, classifiers and the prediction engine
//! - [`dataset`] - Cleaning, encoding and splitting raw training data
//! - [`server`] - HTTP server with REST API
//! - [`cli`] - Command-line interface
//! - [`utils`] - CSV loading and saving

// Core error handling
pub mod error;

// Core ML modules
pub mod preprocessing;
pub mod inference;

// Data processing
pub mod dataset;

// Utilities
pub mod utils;

// Services
pub mod server;
pub mod cli;

pub use error::{Result, ServeError};

/// Re-export commonly used types
pub mod prelude {
    // Error handling
    pub use crate::error::{Result, ServeError};

    // Preprocessing
    pub use crate::preprocessing::{
        Clipper, ColumnGroup, ColumnTransformer, ImputeStrategy, Imputer, OneHotEncoder, Scaler,
        ScalerType,
    };

    // Inference
    pub use crate::inference::{
        ClassifierSpec, FeatureSchema, FittedModel, InferenceConfig, InferenceEngine,
        ModelArtifact, PipelineStep, PredictionResult, PredictionService, Stage,
    };

    // Data preparation
    pub use crate::dataset::{train_test_split, SplitConfig, TrainTestSplit};

    // Server
    pub use crate::server::{create_router, AppState, ServerConfig};
}
