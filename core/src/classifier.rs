//! Classifier collaborator seam plus a small tree-ensemble evaluator for
//! boosted-tree exports.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{from_json_str, PipelineError, Result};
use crate::models::{ClassifierOutput, NUM_CLASSES};
use crate::types::{FeatureVector, FEATURE_COUNT};

/// Inference backend consumed by the coordinator.
pub trait Classifier {
    /// False while the model is unloaded; the coordinator then answers stage 0.
    fn is_ready(&self) -> bool {
        true
    }

    fn infer(&mut self, features: &FeatureVector) -> Result<ClassifierOutput>;
}

impl<C: Classifier + ?Sized> Classifier for Box<C> {
    fn is_ready(&self) -> bool {
        (**self).is_ready()
    }

    fn infer(&mut self, features: &FeatureVector) -> Result<ClassifierOutput> {
        (**self).infer(features)
    }
}

/// Placeholder for "no model loaded".
#[derive(Debug, Default, Clone, Copy)]
pub struct Unloaded;

impl Classifier for Unloaded {
    fn is_ready(&self) -> bool {
        false
    }

    fn infer(&mut self, _features: &FeatureVector) -> Result<ClassifierOutput> {
        Err(PipelineError::Classifier("model not loaded".into()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Node {
    Split {
        feature: usize,
        threshold: f32,
        left: usize,
        right: usize,
    },
    Leaf {
        leaf: f32,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    pub class: usize,
    pub nodes: Vec<Node>,
}

impl Tree {
    fn evaluate(&self, x: &[f32]) -> f32 {
        let mut idx = 0;
        while let Some(node) = self.nodes.get(idx) {
            match node {
                // NaN compares false and goes right
                Node::Split { feature, threshold, left, right } => {
                    idx = if x[*feature] <= *threshold { *left } else { *right };
                }
                Node::Leaf { leaf } => return *leaf,
            }
        }
        0.0
    }
}

/// Multiclass boosted trees: per-class raw score = base + sum of leaves, softmaxed.
///
/// Only constructible through validation ([`TreeEnsemble::new`],
/// [`TreeEnsemble::from_json_str`] or serde), so evaluation never indexes out
/// of range and always terminates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "EnsembleDocument")]
pub struct TreeEnsemble {
    num_classes: usize,
    num_features: usize,
    base_score: Vec<f32>,
    trees: Vec<Tree>,
}

// Unchecked wire shape.
#[derive(Debug, Deserialize)]
struct EnsembleDocument {
    num_classes: usize,
    num_features: usize,
    #[serde(default)]
    base_score: Vec<f32>,
    trees: Vec<Tree>,
}

impl TryFrom<EnsembleDocument> for TreeEnsemble {
    type Error = PipelineError;

    fn try_from(doc: EnsembleDocument) -> Result<Self> {
        let model = TreeEnsemble {
            num_classes: doc.num_classes,
            num_features: doc.num_features,
            base_score: doc.base_score,
            trees: doc.trees,
        };
        model.validate()?;
        Ok(model)
    }
}

impl TreeEnsemble {
    /// Four classes over the 36 features; `base_score` may be empty.
    pub fn new(base_score: Vec<f32>, trees: Vec<Tree>) -> Result<Self> {
        TreeEnsemble::try_from(EnsembleDocument {
            num_classes: NUM_CLASSES,
            num_features: FEATURE_COUNT,
            base_score,
            trees,
        })
    }

    pub fn from_json_str(txt: &str) -> Result<Self> {
        let doc: EnsembleDocument = from_json_str(txt)?;
        TreeEnsemble::try_from(doc)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let txt = std::fs::read_to_string(path)?;
        let model = Self::from_json_str(&txt)?;
        log::info!("tree ensemble loaded from {} ({} trees)", path.display(), model.trees.len());
        Ok(model)
    }

    pub fn trees(&self) -> &[Tree] {
        &self.trees
    }

    pub fn base_score(&self) -> &[f32] {
        &self.base_score
    }

    fn validate(&self) -> Result<()> {
        if self.num_classes != NUM_CLASSES {
            return Err(PipelineError::Model(format!(
                "num_classes {} != {NUM_CLASSES}",
                self.num_classes
            )));
        }
        if self.num_features != FEATURE_COUNT {
            return Err(PipelineError::Model(format!(
                "num_features {} != {FEATURE_COUNT}",
                self.num_features
            )));
        }
        if !self.base_score.is_empty() && self.base_score.len() != self.num_classes {
            return Err(PipelineError::Model(format!(
                "base_score has {} entries",
                self.base_score.len()
            )));
        }
        for (t, tree) in self.trees.iter().enumerate() {
            if tree.class >= self.num_classes {
                return Err(PipelineError::Model(format!("tree {t}: class {} out of range", tree.class)));
            }
            if tree.nodes.is_empty() {
                return Err(PipelineError::Model(format!("tree {t}: no nodes")));
            }
            for (i, node) in tree.nodes.iter().enumerate() {
                match node {
                    Node::Split { feature, threshold, left, right } => {
                        if *feature >= self.num_features {
                            return Err(PipelineError::Model(format!(
                                "tree {t} node {i}: feature {feature} out of range"
                            )));
                        }
                        if !threshold.is_finite() {
                            return Err(PipelineError::Model(format!(
                                "tree {t} node {i}: non-finite threshold"
                            )));
                        }
                        // children strictly after the parent, so evaluation terminates
                        for child in [*left, *right] {
                            if child <= i || child >= tree.nodes.len() {
                                return Err(PipelineError::Model(format!(
                                    "tree {t} node {i}: bad child index {child}"
                                )));
                            }
                        }
                    }
                    Node::Leaf { leaf } if !leaf.is_finite() => {
                        return Err(PipelineError::Model(format!("tree {t} node {i}: non-finite leaf")));
                    }
                    Node::Leaf { .. } => {}
                }
            }
        }
        Ok(())
    }

    pub fn raw_scores(&self, features: &FeatureVector) -> [f32; NUM_CLASSES] {
        let mut scores = [0.0f32; NUM_CLASSES];
        for (s, b) in scores.iter_mut().zip(self.base_score.iter()) {
            *s = *b;
        }
        let x = features.as_slice();
        for tree in &self.trees {
            scores[tree.class] += tree.evaluate(x);
        }
        scores
    }

    pub fn predict_proba(&self, features: &FeatureVector) -> Vec<f32> {
        softmax(&self.raw_scores(features))
    }
}

impl Classifier for TreeEnsemble {
    fn infer(&mut self, features: &FeatureVector) -> Result<ClassifierOutput> {
        Ok(ClassifierOutput::Probabilities(self.predict_proba(features)))
    }
}

fn softmax(scores: &[f32]) -> Vec<f32> {
    let max = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max) as f64;
    let exps: Vec<f64> = scores.iter().map(|&s| (s as f64 - max).exp()).collect();
    let sum: f64 = exps.iter().sum();
    exps.iter().map(|e| (e / sum) as f32).collect()
}
