//! services/api/src/adapters/risk_model.rs
//!
//! This module contains the adapter for the pre-trained vehicle risk model.
//! It implements the `RiskScoringService` port from the `core` crate.
//!
//! The model is a logistic regression trained offline; its coefficients and
//! intercept are serialized to a JSON artifact that is loaded exactly once at
//! process start. A missing or malformed artifact aborts startup.

use fleet_maintenance_core::domain::{RiskAssessment, RiskLevel, VehicleFeatures};
use fleet_maintenance_core::ports::RiskScoringService;
use serde::Deserialize;
use std::path::Path;

/// The feature row order the artifact was trained with.
pub const FEATURE_NAMES: [&str; 4] = ["age", "mileage", "engine_temp", "error_count"];

/// The canonical classification threshold on the positive-class probability.
pub const DEFAULT_RISK_THRESHOLD: f64 = 0.6;

/// Errors raised while loading the model artifact at startup.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("Failed to read model artifact at {0}: {1}")]
    Read(String, std::io::Error),
    #[error("Malformed model artifact: {0}")]
    Malformed(String),
}

/// The on-disk shape of the trained model.
#[derive(Deserialize)]
struct ModelArtifact {
    feature_order: Vec<String>,
    coefficients: Vec<f64>,
    intercept: f64,
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements the `RiskScoringService` port with a logistic
/// regression loaded from a JSON artifact. Read-only after construction.
#[derive(Debug, Clone)]
pub struct LogisticRiskModel {
    coefficients: [f64; 4],
    intercept: f64,
    threshold: f64,
}

impl LogisticRiskModel {
    /// Loads and validates the artifact at `path`.
    pub fn from_path(path: &Path, threshold: f64) -> Result<Self, ModelError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ModelError::Read(path.display().to_string(), e))?;
        Self::from_artifact_json(&raw, threshold)
    }

    /// Parses an artifact from its JSON text and validates its shape.
    pub fn from_artifact_json(raw: &str, threshold: f64) -> Result<Self, ModelError> {
        let artifact: ModelArtifact =
            serde_json::from_str(raw).map_err(|e| ModelError::Malformed(e.to_string()))?;

        if artifact.feature_order != FEATURE_NAMES {
            return Err(ModelError::Malformed(format!(
                "feature order {:?} does not match expected {:?}",
                artifact.feature_order, FEATURE_NAMES
            )));
        }
        if artifact.coefficients.len() != FEATURE_NAMES.len() {
            return Err(ModelError::Malformed(format!(
                "expected {} coefficients, found {}",
                FEATURE_NAMES.len(),
                artifact.coefficients.len()
            )));
        }

        let mut coefficients = [0.0; 4];
        coefficients.copy_from_slice(&artifact.coefficients);

        Ok(Self {
            coefficients,
            intercept: artifact.intercept,
            threshold,
        })
    }

    /// Builds a model directly from its parameters.
    pub fn new(coefficients: [f64; 4], intercept: f64, threshold: f64) -> Self {
        Self {
            coefficients,
            intercept,
            threshold,
        }
    }

    /// The positive-class (failure) probability for one feature row.
    pub fn probability_of_failure(&self, features: &VehicleFeatures) -> f64 {
        let x = [
            features.age,
            features.mileage,
            features.engine_temp,
            features.error_count,
        ];
        let z: f64 = self
            .coefficients
            .iter()
            .zip(x.iter())
            .map(|(w, v)| w * v)
            .sum::<f64>()
            + self.intercept;
        sigmoid(z)
    }
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

/// Rounds to two decimal places.
fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

//=========================================================================================
// `RiskScoringService` Trait Implementation
//=========================================================================================

impl RiskScoringService for LogisticRiskModel {
    fn score(&self, features: &VehicleFeatures) -> RiskAssessment {
        let p = self.probability_of_failure(features);
        let risk_score = round2(p * 100.0);
        // Classify on the rounded score so that High holds exactly when the
        // reported score exceeds threshold * 100.
        let risk = if risk_score > self.threshold * 100.0 {
            RiskLevel::High
        } else {
            RiskLevel::Low
        };
        RiskAssessment { risk, risk_score }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> LogisticRiskModel {
        LogisticRiskModel::new(
            [0.12, 0.000021, 0.045, 0.68],
            -9.0,
            DEFAULT_RISK_THRESHOLD,
        )
    }

    fn features(age: f64, mileage: f64, engine_temp: f64, error_count: f64) -> VehicleFeatures {
        VehicleFeatures {
            age,
            mileage,
            engine_temp,
            error_count,
        }
    }

    #[test]
    fn scoring_is_deterministic_for_identical_features() {
        let m = model();
        let f = features(7.0, 120_000.0, 101.5, 3.0);
        let first = m.score(&f);
        let second = m.score(&f);
        assert_eq!(first, second);
    }

    #[test]
    fn worn_vehicle_classifies_high() {
        let assessment = model().score(&features(10.0, 150_000.0, 110.0, 8.0));
        assert_eq!(assessment.risk, RiskLevel::High);
        assert!(assessment.risk_score > 60.0);
    }

    #[test]
    fn healthy_vehicle_classifies_low() {
        let assessment = model().score(&features(2.0, 20_000.0, 85.0, 0.0));
        assert_eq!(assessment.risk, RiskLevel::Low);
        assert!(assessment.risk_score < 60.0);
    }

    #[test]
    fn high_exactly_when_score_exceeds_sixty() {
        // Intercept chosen so the probability lands exactly on the threshold.
        let at_threshold =
            LogisticRiskModel::new([0.0; 4], (0.6f64 / 0.4).ln(), DEFAULT_RISK_THRESHOLD);
        let assessment = at_threshold.score(&VehicleFeatures::default());
        assert_eq!(assessment.risk_score, 60.0);
        assert_eq!(assessment.risk, RiskLevel::Low);

        let above = LogisticRiskModel::new([0.0; 4], 0.5, DEFAULT_RISK_THRESHOLD);
        let assessment = above.score(&VehicleFeatures::default());
        assert!(assessment.risk_score > 60.0);
        assert_eq!(assessment.risk, RiskLevel::High);
    }

    #[test]
    fn score_is_rounded_to_two_decimals() {
        let assessment = model().score(&features(7.0, 120_000.0, 101.5, 3.0));
        let rescaled = assessment.risk_score * 100.0;
        assert!((rescaled - rescaled.round()).abs() < 1e-9);
        assert!((0.0..=100.0).contains(&assessment.risk_score));
    }

    #[test]
    fn missing_features_score_as_zeros() {
        let m = model();
        let defaulted = m.score(&VehicleFeatures::default());
        let explicit = m.score(&features(0.0, 0.0, 0.0, 0.0));
        assert_eq!(defaulted, explicit);
    }

    #[test]
    fn artifact_round_trips_from_json() {
        let raw = r#"{
            "feature_order": ["age", "mileage", "engine_temp", "error_count"],
            "coefficients": [0.12, 0.000021, 0.045, 0.68],
            "intercept": -9.0
        }"#;
        let loaded = LogisticRiskModel::from_artifact_json(raw, DEFAULT_RISK_THRESHOLD).unwrap();
        let f = features(10.0, 150_000.0, 110.0, 8.0);
        assert_eq!(loaded.score(&f), model().score(&f));
    }

    #[test]
    fn artifact_with_wrong_coefficient_count_is_rejected() {
        let raw = r#"{
            "feature_order": ["age", "mileage", "engine_temp", "error_count"],
            "coefficients": [0.12, 0.000021],
            "intercept": -9.0
        }"#;
        let err = LogisticRiskModel::from_artifact_json(raw, DEFAULT_RISK_THRESHOLD).unwrap_err();
        assert!(matches!(err, ModelError::Malformed(_)));
    }

    #[test]
    fn artifact_with_unexpected_feature_order_is_rejected() {
        let raw = r#"{
            "feature_order": ["mileage", "age", "engine_temp", "error_count"],
            "coefficients": [0.12, 0.000021, 0.045, 0.68],
            "intercept": -9.0
        }"#;
        let err = LogisticRiskModel::from_artifact_json(raw, DEFAULT_RISK_THRESHOLD).unwrap_err();
        assert!(matches!(err, ModelError::Malformed(_)));
    }

    #[test]
    fn invalid_json_is_rejected() {
        let err = LogisticRiskModel::from_artifact_json("not json", DEFAULT_RISK_THRESHOLD)
            .unwrap_err();
        assert!(matches!(err, ModelError::Malformed(_)));
    }
}
