//! Input feature schema derived from the fitted preprocessor

use crate::error::{Result, ServeError};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::artifact::{ModelArtifact, Stage, PREPROCESSOR_STEP};

/// Ordered input feature names, split by kind
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSchema {
    pub numerical: Vec<String>,
    pub categorical: Vec<String>,
}

impl FeatureSchema {
    pub fn new(numerical: Vec<String>, categorical: Vec<String>) -> Self {
        Self {
            numerical,
            categorical,
        }
    }

    /// No feature names at all; payload keys are used instead
    pub fn is_empty(&self) -> bool {
        self.numerical.is_empty() && self.categorical.is_empty()
    }

    /// Numerical names followed by categorical names
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.numerical
            .iter()
            .chain(self.categorical.iter())
            .map(String::as_str)
    }

    /// Read the schema from the `preprocessor` stage: the first sub-transformer
    /// lists the numerical columns, the second the categorical ones.
    pub fn derive(artifact: &ModelArtifact) -> Result<Self> {
        let step = artifact.step(PREPROCESSOR_STEP).ok_or_else(|| {
            ServeError::SchemaDerivation(format!("no '{}' step in pipeline", PREPROCESSOR_STEP))
        })?;

        let transformer = match &step.stage {
            Stage::ColumnTransformer(t) => t,
            other => {
                return Err(ServeError::SchemaDerivation(format!(
                    "'{}' step is a {}, not a column transformer",
                    PREPROCESSOR_STEP,
                    other.kind()
                )))
            }
        };

        match transformer.transformers() {
            [numerical, categorical, ..] => Ok(Self::new(
                numerical.columns.clone(),
                categorical.columns.clone(),
            )),
            groups => Err(ServeError::SchemaDerivation(format!(
                "expected at least 2 transformers in '{}', found {}",
                PREPROCESSOR_STEP,
                groups.len()
            ))),
        }
    }

    /// Like [`FeatureSchema::derive`], falling back to an empty schema
    pub fn derive_or_empty(artifact: &ModelArtifact) -> Self {
        Self::derive(artifact).unwrap_or_else(|e| {
            warn!(error = %e, "Falling back to an empty feature schema");
            Self::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::artifact::PipelineStep;
    use crate::preprocessing::{Clipper, ColumnGroup, ColumnTransformer};

    fn with_groups(groups: Vec<ColumnGroup>) -> ModelArtifact {
        ModelArtifact::new(vec![PipelineStep::new(
            PREPROCESSOR_STEP,
            Stage::ColumnTransformer(ColumnTransformer::new(groups)),
        )])
    }

    #[test]
    fn test_derive_in_order() {
        let artifact = with_groups(vec![
            ColumnGroup::new("num", &["Age", "Flight Distance"]),
            ColumnGroup::new("cat", &["Gender", "Class"]),
        ]);
        let schema = FeatureSchema::derive(&artifact).unwrap();
        assert_eq!(schema.numerical, vec!["Age", "Flight Distance"]);
        assert_eq!(schema.categorical, vec!["Gender", "Class"]);
        assert_eq!(
            schema.columns().collect::<Vec<_>>(),
            vec!["Age", "Flight Distance", "Gender", "Class"]
        );
    }

    #[test]
    fn test_extra_transformers_ignored() {
        let artifact = with_groups(vec![
            ColumnGroup::new("num", &["Age"]),
            ColumnGroup::new("cat", &["Class"]),
            ColumnGroup::new("rest", &["id"]),
        ]);
        let schema = FeatureSchema::derive(&artifact).unwrap();
        assert_eq!(schema.columns().count(), 2);
    }

    #[test]
    fn test_single_transformer_falls_back() {
        let artifact = with_groups(vec![ColumnGroup::new("num", &["Age"])]);
        assert!(matches!(
            FeatureSchema::derive(&artifact),
            Err(ServeError::SchemaDerivation(_))
        ));
        assert!(FeatureSchema::derive_or_empty(&artifact).is_empty());
    }

    #[test]
    fn test_wrong_stage_kind_falls_back() {
        let artifact = ModelArtifact::new(vec![PipelineStep::new(
            PREPROCESSOR_STEP,
            Stage::Clip(Clipper::default()),
        )]);
        assert_eq!(FeatureSchema::derive_or_empty(&artifact), FeatureSchema::default());
    }

    #[test]
    fn test_missing_step_falls_back() {
        let artifact = ModelArtifact::new(vec![]);
        assert!(FeatureSchema::derive_or_empty(&artifact).is_empty());
    }
}
