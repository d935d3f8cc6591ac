//! On-disk model artifact: a named, ordered pipeline of fitted stages

use crate::error::{Result, ServeError};
use crate::preprocessing::{Clipper, ColumnTransformer};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

use super::classifier::ClassifierSpec;

/// Name of the column transformer stage the input schema is read from
pub const PREPROCESSOR_STEP: &str = "preprocessor";

/// Target label reported when the artifact does not name one
pub const DEFAULT_TARGET: &str = "satisfaction";

fn default_target() -> String {
    DEFAULT_TARGET.to_string()
}

/// A fitted stage, tagged by `kind`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Stage {
    ColumnTransformer(ColumnTransformer),
    Clip(Clipper),
    Classifier { model: ClassifierSpec },
}

impl Stage {
    pub fn kind(&self) -> &'static str {
        match self {
            Stage::ColumnTransformer(_) => "column_transformer",
            Stage::Clip(_) => "clip",
            Stage::Classifier { .. } => "classifier",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineStep {
    pub name: String,
    #[serde(flatten)]
    pub stage: Stage,
}

impl PipelineStep {
    pub fn new(name: impl Into<String>, stage: Stage) -> Self {
        Self {
            name: name.into(),
            stage,
        }
    }
}

/// Serialized model pipeline
///
/// ```json
/// { "target": "satisfaction",
///   "steps": [ { "name": "preprocessor", "kind": "column_transformer", ... },
///              { "name": "clip", "kind": "clip", "cap": 8.0 },
///              { "name": "clf", "kind": "classifier", "model": { "type": "logistic_regression", ... } } ] }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    #[serde(default = "default_target")]
    pub target: String,
    pub steps: Vec<PipelineStep>,
}

impl ModelArtifact {
    pub fn new(steps: Vec<PipelineStep>) -> Self {
        Self {
            target: default_target(),
            steps,
        }
    }

    /// Look up a step by name
    pub fn step(&self, name: &str) -> Option<&PipelineStep> {
        self.steps.iter().find(|s| s.name == name)
    }

    /// Read an artifact from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ServeError::ArtifactNotFound(path.to_path_buf()));
        }

        let json = std::fs::read_to_string(path)?;
        let artifact: ModelArtifact = serde_json::from_str(&json).map_err(|e| {
            ServeError::InvalidArtifact(format!("{}: {}", path.display(), e))
        })?;
        debug!(
            path = %path.display(),
            steps = artifact.steps.len(),
            "Model artifact read"
        );
        Ok(artifact)
    }

    /// Write the artifact as pretty JSON
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::classifier::LogisticRegression;
    use crate::preprocessing::ColumnGroup;

    fn artifact() -> ModelArtifact {
        ModelArtifact::new(vec![
            PipelineStep::new(
                PREPROCESSOR_STEP,
                Stage::ColumnTransformer(ColumnTransformer::new(vec![
                    ColumnGroup::new("num", &["Age"]),
                    ColumnGroup::new("cat", &[]),
                ])),
            ),
            PipelineStep::new("clip", Stage::Clip(Clipper::default())),
            PipelineStep::new(
                "clf",
                Stage::Classifier {
                    model: ClassifierSpec::LogisticRegression(LogisticRegression::new(
                        vec![0.1],
                        0.0,
                    )),
                },
            ),
        ])
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        artifact().save(&path).unwrap();

        let loaded = ModelArtifact::load(&path).unwrap();
        assert_eq!(loaded.target, "satisfaction");
        let kinds: Vec<_> = loaded.steps.iter().map(|s| s.stage.kind()).collect();
        assert_eq!(kinds, vec!["column_transformer", "clip", "classifier"]);
        assert!(loaded.step(PREPROCESSOR_STEP).is_some());
    }

    #[test]
    fn test_missing_file() {
        let err = ModelArtifact::load("/nonexistent/model.json").unwrap_err();
        assert!(matches!(err, ServeError::ArtifactNotFound(_)));
        assert!(!err.is_client_error());
    }

    #[test]
    fn test_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        std::fs::write(&path, "{\"steps\": 3}").unwrap();
        assert!(matches!(
            ModelArtifact::load(&path),
            Err(ServeError::InvalidArtifact(_))
        ));
    }

    #[test]
    fn test_step_wire_format() {
        let step: PipelineStep =
            serde_json::from_str(r#"{"name": "clip", "kind": "clip", "cap": 3.0}"#).unwrap();
        assert!(matches!(step.stage, Stage::Clip(ref c) if c.cap() == 3.0));
    }
}
