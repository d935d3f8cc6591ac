//! Fitted binary classifiers and their capabilities
//!
//! A model is loaded once into a [`FittedModel`] variant that records what it
//! can produce: class probabilities, a raw decision score, or only a label.
//! The positive-class probability is derived from that variant:
//! probabilistic models report it natively, scoring models are squashed
//! through a sigmoid, label-only models report none.

use crate::error::{Result, ServeError};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Logistic function
pub fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Anything that maps feature rows to class labels
pub trait Classifier: Send + Sync + Debug {
    /// Number of input features the model was fitted on
    fn n_features(&self) -> usize;

    fn predict(&self, x: &ArrayView2<f64>) -> Result<Array1<i64>>;
}

/// Classifiers exposing class probabilities, columns `[P(0), P(1)]`
pub trait ProbabilisticClassifier: Classifier {
    fn predict_proba(&self, x: &ArrayView2<f64>) -> Result<Array2<f64>>;
}

/// Classifiers exposing a signed decision score; positive means class 1
pub trait ScoringClassifier: Classifier {
    fn decision_function(&self, x: &ArrayView2<f64>) -> Result<Array1<f64>>;
}

/// Labels plus positive-class probabilities when the model can give them
#[derive(Debug, Clone, PartialEq)]
pub struct Scored {
    pub labels: Array1<i64>,
    pub probabilities: Option<Array1<f64>>,
}

/// A loaded classifier, tagged by capability
#[derive(Debug)]
pub enum FittedModel {
    Probabilistic(Box<dyn ProbabilisticClassifier>),
    Scoring(Box<dyn ScoringClassifier>),
    LabelOnly(Box<dyn Classifier>),
}

impl FittedModel {
    pub fn n_features(&self) -> usize {
        match self {
            FittedModel::Probabilistic(m) => m.n_features(),
            FittedModel::Scoring(m) => m.n_features(),
            FittedModel::LabelOnly(m) => m.n_features(),
        }
    }

    /// Whether predictions carry a probability
    pub fn has_probability(&self) -> bool {
        !matches!(self, FittedModel::LabelOnly(_))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            FittedModel::Probabilistic(_) => "probabilistic",
            FittedModel::Scoring(_) => "scoring",
            FittedModel::LabelOnly(_) => "label_only",
        }
    }

    pub fn predict(&self, x: &ArrayView2<f64>) -> Result<Array1<i64>> {
        match self {
            FittedModel::Probabilistic(m) => m.predict(x),
            FittedModel::Scoring(m) => m.predict(x),
            FittedModel::LabelOnly(m) => m.predict(x),
        }
    }

    /// Positive-class probability per row, `None` for label-only models
    pub fn positive_probability(&self, x: &ArrayView2<f64>) -> Result<Option<Array1<f64>>> {
        match self {
            FittedModel::Probabilistic(m) => {
                let proba = m.predict_proba(x)?;
                if proba.ncols() < 2 {
                    return Err(ServeError::InferenceError(format!(
                        "expected 2 probability columns, got {}",
                        proba.ncols()
                    )));
                }
                Ok(Some(proba.column(1).to_owned()))
            }
            FittedModel::Scoring(m) => Ok(Some(m.decision_function(x)?.mapv(sigmoid))),
            FittedModel::LabelOnly(_) => Ok(None),
        }
    }

    /// Labels and probabilities in one pass
    pub fn score(&self, x: &ArrayView2<f64>) -> Result<Scored> {
        Ok(Scored {
            labels: self.predict(x)?,
            probabilities: self.positive_probability(x)?,
        })
    }
}

/// Serialized classifier parameters, tagged by `type`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClassifierSpec {
    LogisticRegression(LogisticRegression),
    LinearSvc(LinearSvc),
    NearestCentroid(NearestCentroid),
}

impl ClassifierSpec {
    /// Validate parameters and fix the capability of the model
    pub fn into_model(self) -> Result<FittedModel> {
        Ok(match self {
            ClassifierSpec::LogisticRegression(m) => {
                m.validate()?;
                FittedModel::Probabilistic(Box::new(m))
            }
            ClassifierSpec::LinearSvc(m) => {
                m.validate()?;
                FittedModel::Scoring(Box::new(m))
            }
            ClassifierSpec::NearestCentroid(m) => {
                m.validate()?;
                FittedModel::LabelOnly(Box::new(m))
            }
        })
    }
}

fn check_width(x: &ArrayView2<f64>, n_features: usize) -> Result<()> {
    if x.ncols() != n_features {
        return Err(ServeError::ShapeError {
            expected: format!("{} features", n_features),
            actual: format!("{} features", x.ncols()),
        });
    }
    Ok(())
}

fn check_finite(name: &str, values: &[f64]) -> Result<()> {
    if values.iter().any(|v| !v.is_finite()) {
        return Err(ServeError::InvalidArtifact(format!(
            "{} parameters must be finite",
            name
        )));
    }
    Ok(())
}

fn linear_decision(x: &ArrayView2<f64>, coefficients: &[f64], intercept: f64) -> Result<Array1<f64>> {
    check_width(x, coefficients.len())?;
    Ok(x.dot(&ArrayView1::from(coefficients)) + intercept)
}

/// Fitted logistic regression for binary classification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticRegression {
    /// Fitted coefficients, one per transformed feature
    pub coefficients: Vec<f64>,
    /// Fitted intercept
    #[serde(default)]
    pub intercept: f64,
}

impl LogisticRegression {
    pub fn new(coefficients: Vec<f64>, intercept: f64) -> Self {
        Self {
            coefficients,
            intercept,
        }
    }

    fn validate(&self) -> Result<()> {
        check_finite("logistic_regression", &self.coefficients)?;
        check_finite("logistic_regression", &[self.intercept])
    }
}

impl Classifier for LogisticRegression {
    fn n_features(&self) -> usize {
        self.coefficients.len()
    }

    fn predict(&self, x: &ArrayView2<f64>) -> Result<Array1<i64>> {
        let z = linear_decision(x, &self.coefficients, self.intercept)?;
        Ok(z.mapv(|v| i64::from(v > 0.0)))
    }
}

impl ProbabilisticClassifier for LogisticRegression {
    fn predict_proba(&self, x: &ArrayView2<f64>) -> Result<Array2<f64>> {
        let p = linear_decision(x, &self.coefficients, self.intercept)?.mapv(sigmoid);
        let mut proba = Array2::zeros((p.len(), 2));
        proba.column_mut(0).assign(&p.mapv(|v| 1.0 - v));
        proba.column_mut(1).assign(&p);
        Ok(proba)
    }
}

/// Fitted linear support vector classifier; exposes a margin, not a probability
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearSvc {
    pub coefficients: Vec<f64>,
    #[serde(default)]
    pub intercept: f64,
}

impl LinearSvc {
    pub fn new(coefficients: Vec<f64>, intercept: f64) -> Self {
        Self {
            coefficients,
            intercept,
        }
    }

    fn validate(&self) -> Result<()> {
        check_finite("linear_svc", &self.coefficients)?;
        check_finite("linear_svc", &[self.intercept])
    }
}

impl Classifier for LinearSvc {
    fn n_features(&self) -> usize {
        self.coefficients.len()
    }

    fn predict(&self, x: &ArrayView2<f64>) -> Result<Array1<i64>> {
        Ok(self.decision_function(x)?.mapv(|v| i64::from(v > 0.0)))
    }
}

impl ScoringClassifier for LinearSvc {
    fn decision_function(&self, x: &ArrayView2<f64>) -> Result<Array1<f64>> {
        linear_decision(x, &self.coefficients, self.intercept)
    }
}

/// Nearest-centroid classifier; predicts the label of the closest centroid
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NearestCentroid {
    pub classes: Vec<i64>,
    pub centroids: Vec<Vec<f64>>,
}

impl NearestCentroid {
    pub fn new(classes: Vec<i64>, centroids: Vec<Vec<f64>>) -> Self {
        Self { classes, centroids }
    }

    fn validate(&self) -> Result<()> {
        if self.centroids.is_empty() || self.classes.len() != self.centroids.len() {
            return Err(ServeError::InvalidArtifact(format!(
                "nearest_centroid needs one class per centroid, got {} classes and {} centroids",
                self.classes.len(),
                self.centroids.len()
            )));
        }
        let width = self.n_features();
        if self.centroids.iter().any(|c| c.len() != width) {
            return Err(ServeError::InvalidArtifact(
                "nearest_centroid centroids differ in width".to_string(),
            ));
        }
        for centroid in &self.centroids {
            check_finite("nearest_centroid", centroid)?;
        }
        Ok(())
    }
}

impl Classifier for NearestCentroid {
    fn n_features(&self) -> usize {
        self.centroids.first().map_or(0, Vec::len)
    }

    fn predict(&self, x: &ArrayView2<f64>) -> Result<Array1<i64>> {
        check_width(x, self.n_features())?;
        let labels = x
            .axis_iter(Axis(0))
            .map(|row| {
                let (best, _) = self.centroids.iter().enumerate().fold(
                    (0, f64::INFINITY),
                    |(best, best_dist), (i, centroid)| {
                        let dist: f64 = row
                            .iter()
                            .zip(centroid)
                            .map(|(a, b)| (a - b).powi(2))
                            .sum();
                        if dist < best_dist {
                            (i, dist)
                        } else {
                            (best, best_dist)
                        }
                    },
                );
                self.classes[best]
            })
            .collect();
        Ok(labels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_sigmoid() {
        assert_eq!(sigmoid(0.0), 0.5);
        assert!((sigmoid(2.0) - 0.8807970779778823).abs() < 1e-12);
        assert!(sigmoid(-40.0) < 1e-15);
    }

    #[test]
    fn test_logistic_probability_and_label() {
        let model = ClassifierSpec::LogisticRegression(LogisticRegression::new(vec![1.0, -1.0], 0.5))
            .into_model()
            .unwrap();
        let x = array![[2.0, 0.0], [0.0, 3.0]];

        let scored = model.score(&x.view()).unwrap();
        assert_eq!(scored.labels, array![1, 0]);
        let proba = scored.probabilities.unwrap();
        assert!((proba[0] - sigmoid(2.5)).abs() < 1e-12);
        assert!((proba[1] - sigmoid(-2.5)).abs() < 1e-12);
    }

    #[test]
    fn test_scoring_model_uses_sigmoid_of_margin() {
        let model = ClassifierSpec::LinearSvc(LinearSvc::new(vec![0.5, 0.5], 1.0))
            .into_model()
            .unwrap();
        assert_eq!(model.kind(), "scoring");

        let x = array![[1.0, 1.0]];
        let proba = model.positive_probability(&x.view()).unwrap().unwrap();
        assert!((proba[0] - 1.0 / (1.0 + (-2.0f64).exp())).abs() < 1e-12);
    }

    #[test]
    fn test_label_only_model_has_no_probability() {
        let model = ClassifierSpec::NearestCentroid(NearestCentroid::new(
            vec![0, 1],
            vec![vec![0.0, 0.0], vec![5.0, 5.0]],
        ))
        .into_model()
        .unwrap();
        assert!(!model.has_probability());

        let x = array![[0.5, 1.0], [4.0, 6.0]];
        let scored = model.score(&x.view()).unwrap();
        assert_eq!(scored.labels, array![0, 1]);
        assert!(scored.probabilities.is_none());
    }

    #[test]
    fn test_width_mismatch() {
        let model = LogisticRegression::new(vec![1.0, 2.0, 3.0], 0.0);
        let err = model.predict(&array![[1.0, 2.0]].view()).unwrap_err();
        assert!(matches!(err, ServeError::ShapeError { .. }));
        assert!(err.is_client_error());
    }

    #[test]
    fn test_invalid_centroids_rejected() {
        let spec = ClassifierSpec::NearestCentroid(NearestCentroid::new(vec![0], vec![]));
        assert!(matches!(spec.into_model(), Err(ServeError::InvalidArtifact(_))));
    }

    #[test]
    fn test_spec_is_tagged_by_type() {
        let spec: ClassifierSpec = serde_json::from_str(
            r#"{"type": "linear_svc", "coefficients": [0.1, 0.2], "intercept": -0.3}"#,
        )
        .unwrap();
        assert!(matches!(spec, ClassifierSpec::LinearSvc(ref m) if m.coefficients.len() == 2));
    }
}
