//! Regression models for conversion rate and margin.
//!
//! Models are trained offline and shipped as JSON. Two estimator families are supported:
//! - `linear`: intercept, numeric coefficients and one-hot weights for categorical levels
//! - `tree_ensemble`: regression trees averaged (forest) or summed onto a base score (boosting)
//!
//! Every model declares the feature columns it was trained on and, optionally, the
//! categorical levels seen during training. Rows outside that schema are rejected instead of
//! being silently scored.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::optimizer::features::{
    column_kind, FeatureKind, FeatureRecord, FeatureValue, FEATURE_COLUMNS,
};
use crate::optimizer::predictor::{PredictionError, Regressor};

#[derive(Debug, Error)]
pub enum ModelLoadError {
    #[error("could not read model file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse model file `{path}`: {source}")]
    Parse { path: PathBuf, source: serde_json::Error },
    #[error("invalid model `{name}`: {detail}")]
    Invalid { name: String, detail: String },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RegressionModel {
    pub name: String,
    pub version: String,
    pub trained_at: DateTime<Utc>,
    /// Columns the model was trained on.
    pub features: Vec<String>,
    /// Training-time levels per categorical column; columns absent here accept any value.
    #[serde(default)]
    pub categories: BTreeMap<String, BTreeSet<String>>,
    pub estimator: Estimator,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Estimator {
    Linear(LinearEstimator),
    TreeEnsemble(TreeEnsemble),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LinearEstimator {
    pub intercept: f64,
    #[serde(default)]
    pub coefficients: BTreeMap<String, f64>,
    /// One-hot weights; a level without a weight contributes zero.
    #[serde(default)]
    pub levels: BTreeMap<String, BTreeMap<String, f64>>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregation {
    Mean,
    Sum,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TreeEnsemble {
    #[serde(default)]
    pub base_score: f64,
    pub aggregation: Aggregation,
    pub trees: Vec<RegressionTree>,
}

/// Flat node list; evaluation starts at node 0.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    pub nodes: Vec<TreeNode>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TreeNode {
    /// `value < threshold` goes left.
    Numeric { feature: String, threshold: f64, left: usize, right: usize },
    /// Membership in `categories` goes left.
    Categorical { feature: String, categories: BTreeSet<String>, left: usize, right: usize },
    Leaf { value: f64 },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ModelSummary {
    pub name: String,
    pub version: String,
    pub trained_at: DateTime<Utc>,
    pub estimator: &'static str,
}

impl RegressionModel {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ModelLoadError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .map_err(|source| ModelLoadError::ReadFile { path: path.to_path_buf(), source })?;
        let model: Self = serde_json::from_str(&raw)
            .map_err(|source| ModelLoadError::Parse { path: path.to_path_buf(), source })?;
        model.validate()?;
        Ok(model)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn summary(&self) -> ModelSummary {
        ModelSummary {
            name: self.name.clone(),
            version: self.version.clone(),
            trained_at: self.trained_at,
            estimator: match self.estimator {
                Estimator::Linear(_) => "linear",
                Estimator::TreeEnsemble(_) => "tree_ensemble",
            },
        }
    }

    /// Structural checks that do not depend on the input rows.
    pub fn validate(&self) -> Result<(), ModelLoadError> {
        let invalid = |detail: String| ModelLoadError::Invalid { name: self.name.clone(), detail };

        if self.features.is_empty() {
            return Err(invalid("declares no features".to_string()));
        }
        let declared: BTreeSet<&str> = self.features.iter().map(String::as_str).collect();
        let require_declared = |feature: &str| {
            if declared.contains(feature) {
                Ok(())
            } else {
                Err(invalid(format!("uses undeclared feature `{feature}`")))
            }
        };

        for column in self.categories.keys() {
            require_declared(column.as_str())?;
        }

        match &self.estimator {
            Estimator::Linear(linear) => {
                for feature in linear.coefficients.keys().chain(linear.levels.keys()) {
                    require_declared(feature.as_str())?;
                }
            }
            Estimator::TreeEnsemble(ensemble) => {
                if ensemble.trees.is_empty() {
                    return Err(invalid("tree ensemble has no trees".to_string()));
                }
                for (tree_index, tree) in ensemble.trees.iter().enumerate() {
                    if tree.nodes.is_empty() {
                        return Err(invalid(format!("tree {tree_index} has no nodes")));
                    }
                    for node in &tree.nodes {
                        let (feature, left, right) = match node {
                            TreeNode::Numeric { feature, left, right, .. }
                            | TreeNode::Categorical { feature, left, right, .. } => {
                                (feature, *left, *right)
                            }
                            TreeNode::Leaf { .. } => continue,
                        };
                        require_declared(feature.as_str())?;
                        if left >= tree.nodes.len() || right >= tree.nodes.len() {
                            return Err(invalid(format!(
                                "tree {tree_index} references a node outside 0..{}",
                                tree.nodes.len()
                            )));
                        }
                    }
                }
            }
        }

        Ok(())
    }

    /// Declared features must be exactly the assembled feature columns.
    pub fn check_schema(&self) -> Result<(), PredictionError> {
        let declared: BTreeSet<&str> = self.features.iter().map(String::as_str).collect();
        let expected: BTreeSet<&str> = FEATURE_COLUMNS.into_iter().collect();

        let missing: Vec<&str> = expected.difference(&declared).copied().collect();
        let unexpected: Vec<&str> = declared.difference(&expected).copied().collect();
        if missing.is_empty() && unexpected.is_empty() {
            return Ok(());
        }

        Err(PredictionError::FeatureMismatch(format!(
            "model features differ from the assembled columns (missing: [{}], unexpected: [{}])",
            missing.join(", "),
            unexpected.join(", ")
        )))
    }

    fn check_domains(&self, row: &FeatureRecord<'_>) -> Result<(), PredictionError> {
        for (column, domain) in &self.categories {
            let value = categorical(row, column)?;
            if !domain.contains(value) {
                return Err(PredictionError::FeatureMismatch(format!(
                    "`{column}` value `{value}` was not seen during training"
                )));
            }
        }
        Ok(())
    }

    fn predict_row(&self, row: &FeatureRecord<'_>) -> Result<f64, PredictionError> {
        self.check_domains(row)?;
        match &self.estimator {
            Estimator::Linear(linear) => linear.predict_row(row),
            Estimator::TreeEnsemble(ensemble) => ensemble.predict_row(row),
        }
    }
}

impl Regressor for RegressionModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn predict(&self, batch: &[FeatureRecord<'_>]) -> Result<Vec<f64>, PredictionError> {
        self.check_schema()?;
        batch.iter().map(|row| self.predict_row(row)).collect()
    }
}

impl LinearEstimator {
    fn predict_row(&self, row: &FeatureRecord<'_>) -> Result<f64, PredictionError> {
        let mut total = self.intercept;
        for (feature, weight) in &self.coefficients {
            total += weight * numeric(row, feature)?;
        }
        for (feature, weights) in &self.levels {
            let level = categorical(row, feature)?;
            total += weights.get(level).copied().unwrap_or(0.0);
        }
        Ok(total)
    }
}

impl TreeEnsemble {
    fn predict_row(&self, row: &FeatureRecord<'_>) -> Result<f64, PredictionError> {
        if self.trees.is_empty() {
            return Err(PredictionError::Inference("tree ensemble has no trees".to_string()));
        }

        let mut sum = 0.0;
        for (index, tree) in self.trees.iter().enumerate() {
            sum += tree.evaluate(row).map_err(|detail| {
                PredictionError::Inference(format!("tree {index}: {detail}"))
            })??;
        }

        let aggregate = match self.aggregation {
            Aggregation::Mean => sum / self.trees.len() as f64,
            Aggregation::Sum => sum,
        };
        Ok(self.base_score + aggregate)
    }
}

impl RegressionTree {
    /// Outer error: the tree itself is malformed. Inner error: the row does not fit the tree.
    fn evaluate(&self, row: &FeatureRecord<'_>) -> Result<Result<f64, PredictionError>, String> {
        let mut index = 0;
        // a well-formed tree reaches a leaf in at most `nodes.len()` hops
        for _ in 0..=self.nodes.len() {
            let Some(node) = self.nodes.get(index) else {
                return Err(format!("node {index} does not exist"));
            };
            index = match node {
                TreeNode::Leaf { value } => return Ok(Ok(*value)),
                TreeNode::Numeric { feature, threshold, left, right } => {
                    match numeric(row, feature) {
                        Ok(value) if value < *threshold => *left,
                        Ok(_) => *right,
                        Err(error) => return Ok(Err(error)),
                    }
                }
                TreeNode::Categorical { feature, categories, left, right } => {
                    match categorical(row, feature) {
                        Ok(value) if categories.contains(value) => *left,
                        Ok(_) => *right,
                        Err(error) => return Ok(Err(error)),
                    }
                }
            };
        }
        Err("no leaf reached; the tree contains a cycle".to_string())
    }
}

fn numeric(row: &FeatureRecord<'_>, feature: &str) -> Result<f64, PredictionError> {
    match (column_kind(feature), row.value(feature)) {
        (Some(FeatureKind::Numeric), Some(FeatureValue::Numeric(value))) => Ok(value),
        (None, _) | (_, None) => {
            Err(PredictionError::FeatureMismatch(format!("unknown feature `{feature}`")))
        }
        _ => Err(PredictionError::FeatureMismatch(format!(
            "feature `{feature}` is categorical but the model expects a number"
        ))),
    }
}

fn categorical<'a>(row: &FeatureRecord<'a>, feature: &str) -> Result<&'a str, PredictionError> {
    match row.value(feature) {
        Some(FeatureValue::Categorical(value)) => Ok(value),
        Some(FeatureValue::Numeric(_)) => Err(PredictionError::FeatureMismatch(format!(
            "feature `{feature}` is numeric but the model expects a category"
        ))),
        None => Err(PredictionError::FeatureMismatch(format!("unknown feature `{feature}`"))),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use rust_decimal::Decimal;
    use serde_json::{json, Value};

    use super::{ModelLoadError, RegressionModel};
    use crate::domain::quote::fixtures::quote_request;
    use crate::history::fixtures::record;
    use crate::optimizer::candidates::CandidateSpace;
    use crate::optimizer::features::{assemble, FEATURE_COLUMNS};
    use crate::optimizer::predictor::{PredictionError, Regressor};

    fn model(estimator: Value) -> RegressionModel {
        model_with(FEATURE_COLUMNS.to_vec(), json!({}), estimator)
    }

    fn model_with(features: Vec<&str>, categories: Value, estimator: Value) -> RegressionModel {
        let model: RegressionModel = serde_json::from_value(json!({
            "name": "conversion",
            "version": "2025.06",
            "trained_at": "2025-06-01T00:00:00Z",
            "features": features,
            "categories": categories,
            "estimator": estimator,
        }))
        .expect("model json");
        model.validate().expect("valid model");
        model
    }

    fn predict_at(model: &RegressionModel, discounts: [i64; 2]) -> Result<Vec<f64>, PredictionError> {
        let request = quote_request("TUBO CONDUCAO");
        let reference = record("TUBO CONDUCAO", 10.0, 20.0, 50.0);
        let space = CandidateSpace::new(
            Decimal::new(discounts[0], 0),
            Decimal::new(discounts[1] + 1, 0),
            Decimal::new(discounts[1] - discounts[0], 0),
        )
        .expect("space");
        let batch = assemble(&request, &reference, &space).expect("batch");
        model.predict(&batch)
    }

    #[test]
    fn linear_model_adds_coefficients_and_level_weights() {
        let model = model(json!({
            "kind": "linear",
            "intercept": 10.0,
            "coefficients": { "Desconto": 1.5 },
            "levels": { "Canal": { "INSIDE SALES": 2.0, "VAREJO": -3.0 } },
        }));

        assert_eq!(predict_at(&model, [0, 10]), Ok(vec![12.0, 27.0]));
    }

    #[test]
    fn unlisted_level_contributes_nothing() {
        let model = model(json!({
            "kind": "linear",
            "intercept": 4.0,
            "levels": { "Canal": { "VAREJO": 9.0 } },
        }));

        assert_eq!(predict_at(&model, [0, 10]), Ok(vec![4.0, 4.0]));
    }

    #[test]
    fn tree_ensemble_averages_trees_onto_the_base_score() {
        let model = model(json!({
            "kind": "tree_ensemble",
            "base_score": 1.0,
            "aggregation": "mean",
            "trees": [
                { "nodes": [
                    { "type": "numeric", "feature": "Desconto", "threshold": 5.0, "left": 1, "right": 2 },
                    { "type": "leaf", "value": 10.0 },
                    { "type": "leaf", "value": 20.0 },
                ]},
                { "nodes": [
                    { "type": "categorical", "feature": "Canal", "categories": ["INSIDE SALES"], "left": 1, "right": 2 },
                    { "type": "leaf", "value": 4.0 },
                    { "type": "leaf", "value": 0.0 },
                ]},
            ],
        }));

        assert_eq!(predict_at(&model, [0, 10]), Ok(vec![8.0, 13.0]));
        assert_eq!(model.summary().estimator, "tree_ensemble");
    }

    #[test]
    fn summed_ensemble_treats_threshold_as_going_right() {
        let model = model(json!({
            "kind": "tree_ensemble",
            "aggregation": "sum",
            "trees": [
                { "nodes": [
                    { "type": "numeric", "feature": "Desconto", "threshold": 5.0, "left": 1, "right": 2 },
                    { "type": "leaf", "value": 1.0 },
                    { "type": "leaf", "value": 2.0 },
                ]},
                { "nodes": [{ "type": "leaf", "value": 0.5 }] },
            ],
        }));

        assert_eq!(predict_at(&model, [4, 5]), Ok(vec![1.5, 2.5]));
    }

    #[test]
    fn declared_features_must_match_the_assembled_columns() {
        let features: Vec<&str> =
            FEATURE_COLUMNS.into_iter().filter(|column| *column != "Desconto").collect();
        let model = model_with(features, json!({}), json!({ "kind": "linear", "intercept": 1.0 }));

        assert!(matches!(
            predict_at(&model, [0, 10]),
            Err(PredictionError::FeatureMismatch(detail)) if detail.contains("missing: [Desconto]")
        ));
    }

    #[test]
    fn category_outside_the_training_domain_is_rejected() {
        let model = model_with(
            FEATURE_COLUMNS.to_vec(),
            json!({ "Canal": ["VAREJO", "DISTRIBUICAO"] }),
            json!({ "kind": "linear", "intercept": 1.0 }),
        );

        assert!(matches!(
            predict_at(&model, [0, 10]),
            Err(PredictionError::FeatureMismatch(detail)) if detail.contains("INSIDE SALES")
        ));
    }

    #[test]
    fn cyclic_tree_is_an_inference_error() {
        let model = model(json!({
            "kind": "tree_ensemble",
            "aggregation": "mean",
            "trees": [{ "nodes": [
                { "type": "numeric", "feature": "Desconto", "threshold": 100.0, "left": 0, "right": 0 },
            ]}],
        }));

        assert!(matches!(
            predict_at(&model, [0, 10]),
            Err(PredictionError::Inference(detail)) if detail.contains("cycle")
        ));
    }

    #[test]
    fn validate_rejects_dangling_children_and_undeclared_features() {
        let dangling: RegressionModel = serde_json::from_value(json!({
            "name": "margin",
            "version": "1",
            "trained_at": "2025-06-01T00:00:00Z",
            "features": FEATURE_COLUMNS,
            "estimator": { "kind": "tree_ensemble", "aggregation": "mean", "trees": [{ "nodes": [
                { "type": "numeric", "feature": "Desconto", "threshold": 1.0, "left": 1, "right": 7 },
                { "type": "leaf", "value": 1.0 },
            ]}]},
        }))
        .expect("parses");
        assert!(matches!(dangling.validate(), Err(ModelLoadError::Invalid { .. })));

        let undeclared: RegressionModel = serde_json::from_value(json!({
            "name": "margin",
            "version": "1",
            "trained_at": "2025-06-01T00:00:00Z",
            "features": ["Desconto"],
            "estimator": { "kind": "linear", "intercept": 0.0, "coefficients": { "Peso": 1.0 } },
        }))
        .expect("parses");
        assert!(matches!(
            undeclared.validate(),
            Err(ModelLoadError::Invalid { detail, .. }) if detail.contains("Peso")
        ));
    }

    #[test]
    fn load_reads_and_validates_a_model_file() {
        let expected = model(json!({ "kind": "linear", "intercept": 3.0 }));
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(expected.to_json().expect("serializes").as_bytes()).expect("write");

        assert_eq!(RegressionModel::load(file.path()).expect("loads"), expected);

        let mut broken = tempfile::NamedTempFile::new().expect("temp file");
        broken.write_all(b"{ not json").expect("write");
        assert!(matches!(RegressionModel::load(broken.path()), Err(ModelLoadError::Parse { .. })));
        assert!(matches!(
            RegressionModel::load("does/not/exist.json"),
            Err(ModelLoadError::ReadFile { .. })
        ));
    }
}
