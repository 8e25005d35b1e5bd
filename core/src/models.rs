use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

/// Classes the exported model predicts.
pub const NUM_CLASSES: usize = 4;

/// Confidence synthesized for a class-only classifier answer.
pub const CLASS_ONLY_CONFIDENCE: f32 = 0.95;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    Wake = 0,
    Light = 1,
    Deep = 2,
    Rem = 3,
}

impl Stage {
    pub const ALL: [Stage; NUM_CLASSES] = [Stage::Wake, Stage::Light, Stage::Deep, Stage::Rem];

    pub fn from_index(index: usize) -> Option<Stage> {
        Self::ALL.get(index).copied()
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Stage::Wake => "Wake",
            Stage::Light => "Light",
            Stage::Deep => "Deep",
            Stage::Rem => "REM",
        }
    }
}

/// Raw answer from a classifier collaborator, before resolution.
#[derive(Debug, Clone, PartialEq)]
pub enum ClassifierOutput {
    /// One probability per class.
    Probabilities(Vec<f32>),
    /// Resolved class without a distribution.
    ClassOnly(i64),
}

impl ClassifierOutput {
    /// Batched `[[p0, p1, p2, p3]]` output: only the first row is ours.
    pub fn from_rows(rows: Vec<Vec<f32>>) -> Result<Self> {
        rows.into_iter()
            .next()
            .map(ClassifierOutput::Probabilities)
            .ok_or_else(|| PipelineError::Classifier("empty output batch".into()))
    }

    /// Collapse either shape into a class, its confidence and a full distribution.
    pub fn resolve(self) -> Result<Inference> {
        match self {
            ClassifierOutput::Probabilities(p) => {
                if p.len() != NUM_CLASSES {
                    return Err(PipelineError::Classifier(format!(
                        "expected {NUM_CLASSES} probabilities, got {}",
                        p.len()
                    )));
                }
                if let Some(bad) = p.iter().find(|v| !v.is_finite()) {
                    return Err(PipelineError::Classifier(format!("non-finite probability {bad}")));
                }
                // first maximum wins on ties
                let (class, _) = p
                    .iter()
                    .enumerate()
                    .rev()
                    .max_by_key(|(_, v)| OrderedFloat(**v))
                    .ok_or_else(|| PipelineError::Classifier("empty probability vector".into()))?;
                let mut probabilities = [0.0f32; NUM_CLASSES];
                probabilities.copy_from_slice(&p);
                Ok(Inference {
                    class,
                    confidence: probabilities[class],
                    probabilities,
                })
            }
            ClassifierOutput::ClassOnly(raw) => {
                let class = usize::try_from(raw)
                    .ok()
                    .filter(|c| *c < NUM_CLASSES)
                    .ok_or_else(|| PipelineError::Classifier(format!("class {raw} out of range")))?;
                log::debug!("classifier returned class directly: {class}");
                let rest = (1.0 - CLASS_ONLY_CONFIDENCE) / (NUM_CLASSES - 1) as f32;
                let mut probabilities = [rest; NUM_CLASSES];
                probabilities[class] = CLASS_ONLY_CONFIDENCE;
                Ok(Inference {
                    class,
                    confidence: CLASS_ONLY_CONFIDENCE,
                    probabilities,
                })
            }
        }
    }
}

/// Normalized classifier answer handed to the coordinator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Inference {
    pub class: usize,
    pub confidence: f32,
    pub probabilities: [f32; NUM_CLASSES],
}

impl Inference {
    pub fn stage(&self) -> Option<Stage> {
        Stage::from_index(self.class)
    }
}
