use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{Classifier, ClassifierError, ACCURACY_KEYS};

/// Random forest exported to JSON by the training pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestClassifier {
    #[serde(rename = "type", default = "default_kind")]
    pub kind: String,
    pub classes: Vec<String>,
    pub n_features: usize,
    pub trees: Vec<DecisionTree>,
    #[serde(default)]
    pub feature_importances: Vec<f64>,
    #[serde(default)]
    pub metadata: BTreeMap<String, Value>,
}

fn default_kind() -> String {
    "RandomForest".to_string()
}

/// Flat node list; node 0 is the root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    pub nodes: Vec<TreeNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TreeNode {
    /// `features[feature] <= threshold` descends left, otherwise right.
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    /// Per-class sample weights, aligned with the forest's `classes`.
    Leaf { distribution: Vec<f64> },
}

impl ForestClassifier {
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// Structural checks run at load time so inference failures stay exceptional.
    pub fn validate(&self) -> Result<(), ClassifierError> {
        if self.classes.is_empty() {
            return Err(ClassifierError::Corrupted("forest has no classes".to_string()));
        }
        if self.trees.is_empty() {
            return Err(ClassifierError::Corrupted("forest has no trees".to_string()));
        }

        for (tree_index, tree) in self.trees.iter().enumerate() {
            if tree.nodes.is_empty() {
                return Err(ClassifierError::Corrupted(format!(
                    "tree {tree_index} has no nodes"
                )));
            }
            for node in &tree.nodes {
                match node {
                    TreeNode::Split {
                        feature,
                        left,
                        right,
                        ..
                    } => {
                        if *feature >= self.n_features {
                            return Err(ClassifierError::Corrupted(format!(
                                "tree {tree_index} splits on feature {feature} of {}",
                                self.n_features
                            )));
                        }
                        if *left >= tree.nodes.len() || *right >= tree.nodes.len() {
                            return Err(ClassifierError::Corrupted(format!(
                                "tree {tree_index} references a missing child node"
                            )));
                        }
                    }
                    TreeNode::Leaf { distribution } => {
                        if distribution.len() != self.classes.len() {
                            return Err(ClassifierError::Corrupted(format!(
                                "tree {tree_index} leaf has {} weights for {} classes",
                                distribution.len(),
                                self.classes.len()
                            )));
                        }
                    }
                }
            }
        }

        Ok(())
    }

    fn leaf_distribution<'a>(
        &self,
        tree: &'a DecisionTree,
        features: &[f64],
    ) -> Result<&'a [f64], ClassifierError> {
        let mut index = 0;
        // A well-formed tree reaches a leaf in fewer steps than it has nodes.
        for _ in 0..tree.nodes.len() {
            match tree.nodes.get(index) {
                Some(TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                }) => {
                    let value = features.get(*feature).copied().ok_or_else(|| {
                        ClassifierError::Corrupted(format!("split on missing feature {feature}"))
                    })?;
                    index = if value <= *threshold { *left } else { *right };
                }
                Some(TreeNode::Leaf { distribution }) => return Ok(distribution.as_slice()),
                None => {
                    return Err(ClassifierError::Corrupted(format!(
                        "node {index} does not exist"
                    )))
                }
            }
        }

        Err(ClassifierError::Corrupted(
            "tree traversal did not reach a leaf".to_string(),
        ))
    }
}

impl Classifier for ForestClassifier {
    fn kind(&self) -> &str {
        &self.kind
    }

    fn classes(&self) -> &[String] {
        &self.classes
    }

    fn n_features(&self) -> usize {
        self.n_features
    }

    fn predict_proba(&self, features: &[f64]) -> Result<Vec<f64>, ClassifierError> {
        if features.len() != self.n_features {
            return Err(ClassifierError::ShapeMismatch {
                expected: self.n_features,
                actual: features.len(),
            });
        }
        if self.trees.is_empty() {
            return Err(ClassifierError::Corrupted("forest has no trees".to_string()));
        }

        let mut totals = vec![0.0; self.classes.len()];
        for tree in &self.trees {
            let distribution = self.leaf_distribution(tree, features)?;
            if distribution.len() != totals.len() {
                return Err(ClassifierError::Corrupted(
                    "leaf distribution does not match class count".to_string(),
                ));
            }
            let weight: f64 = distribution.iter().sum();
            if !weight.is_finite() || weight <= 0.0 {
                return Err(ClassifierError::Corrupted(
                    "leaf distribution carries no weight".to_string(),
                ));
            }
            for (total, value) in totals.iter_mut().zip(distribution) {
                *total += value / weight;
            }
        }

        let tree_count = self.trees.len() as f64;
        Ok(totals.into_iter().map(|total| total / tree_count).collect())
    }

    fn feature_importances(&self) -> &[f64] {
        &self.feature_importances
    }

    fn n_estimators(&self) -> Option<usize> {
        Some(self.trees.len())
    }

    fn accuracy(&self) -> Option<f64> {
        ACCURACY_KEYS
            .iter()
            .find_map(|key| self.metadata.get(*key).and_then(Value::as_f64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn stump(threshold: f64, low: Vec<f64>, high: Vec<f64>) -> DecisionTree {
        DecisionTree {
            nodes: vec![
                TreeNode::Split {
                    feature: 5,
                    threshold,
                    left: 1,
                    right: 2,
                },
                TreeNode::Leaf { distribution: low },
                TreeNode::Leaf { distribution: high },
            ],
        }
    }

    fn forest() -> ForestClassifier {
        ForestClassifier {
            kind: "RandomForest".to_string(),
            classes: vec!["at_risk".to_string(), "satisfactory".to_string()],
            n_features: 6,
            trees: vec![
                stump(60.0, vec![8.0, 2.0], vec![0.0, 10.0]),
                stump(50.0, vec![10.0, 0.0], vec![4.0, 6.0]),
            ],
            feature_importances: vec![0.0, 0.0, 0.0, 0.0, 0.1, 0.9],
            metadata: BTreeMap::from([("test_accuracy".to_string(), json!(0.93))]),
        }
    }

    #[test]
    fn averages_normalized_leaf_distributions() {
        let proba = forest()
            .predict_proba(&[1.0, 3.0, 2.0, 1.0, 80.0, 55.0])
            .expect("inference succeeds");

        // tree one: [0.8, 0.2]; tree two: [0.4, 0.6]
        assert!((proba[0] - 0.6).abs() < 1e-9);
        assert!((proba[1] - 0.4).abs() < 1e-9);
    }

    #[test]
    fn rejects_wrong_feature_count() {
        match forest().predict_proba(&[1.0, 2.0]) {
            Err(ClassifierError::ShapeMismatch {
                expected: 6,
                actual: 2,
            }) => {}
            other => panic!("expected shape mismatch, got {other:?}"),
        }
    }

    #[test]
    fn validate_flags_dangling_children() {
        let mut broken = forest();
        broken.trees[0].nodes[0] = TreeNode::Split {
            feature: 5,
            threshold: 60.0,
            left: 1,
            right: 9,
        };
        assert!(matches!(
            broken.validate(),
            Err(ClassifierError::Corrupted(_))
        ));
    }

    #[test]
    fn cyclic_tree_fails_instead_of_looping() {
        let mut cyclic = forest();
        cyclic.trees[0].nodes[0] = TreeNode::Split {
            feature: 5,
            threshold: 60.0,
            left: 0,
            right: 0,
        };
        assert!(cyclic.predict_proba(&[0.0; 6]).is_err());
    }

    #[test]
    fn accuracy_comes_from_first_known_metadata_key() {
        assert_eq!(forest().accuracy(), Some(0.93));
        assert_eq!(forest().n_estimators(), Some(2));
    }

    #[test]
    fn parses_exported_json() {
        let raw = json!({
            "classes": ["at_risk", "high_achiever", "satisfactory"],
            "n_features": 6,
            "trees": [{
                "nodes": [
                    { "kind": "leaf", "distribution": [1.0, 1.0, 2.0] }
                ]
            }]
        })
        .to_string();

        let parsed = ForestClassifier::from_json(&raw).expect("parses");
        assert_eq!(parsed.kind, "RandomForest");
        assert!(parsed.validate().is_ok());
        assert_eq!(
            parsed.predict_proba(&[0.0; 6]).expect("inference"),
            vec![0.25, 0.25, 0.5]
        );
    }
}
