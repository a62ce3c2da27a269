use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CategoricalField, PredictError, PredictResult};
use crate::features::{Feature, FeatureValue, FeatureVector};
use crate::resolver::normalize_team_name;

/// Fitted name <-> code mapping. The code of a class is its position in `classes`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct LabelEncoder {
    classes: Vec<String>,
    index: HashMap<String, usize>,
}

impl LabelEncoder {
    pub fn new(classes: Vec<String>) -> Self {
        let mut index = HashMap::with_capacity(classes.len());
        for (code, class) in classes.iter().enumerate() {
            // First occurrence wins, matching the code order.
            index.entry(normalize_team_name(class)).or_insert(code);
        }
        Self { classes, index }
    }

    pub fn code(&self, name: &str) -> Option<usize> {
        self.index.get(&normalize_team_name(name)).copied()
    }

    /// Class name as fitted for an already-normalised lookup key.
    pub fn canonical(&self, name_norm: &str) -> Option<&str> {
        let code = *self.index.get(name_norm)?;
        self.classes.get(code).map(String::as_str)
    }

    pub fn name(&self, code: usize) -> Option<&str> {
        self.classes.get(code).map(String::as_str)
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

impl From<Vec<String>> for LabelEncoder {
    fn from(classes: Vec<String>) -> Self {
        LabelEncoder::new(classes)
    }
}

impl From<LabelEncoder> for Vec<String> {
    fn from(enc: LabelEncoder) -> Self {
        enc.classes
    }
}

#[derive(Debug, Clone, Default)]
pub struct Encoders {
    by_field: HashMap<CategoricalField, LabelEncoder>,
}

impl Encoders {
    pub fn insert(&mut self, field: CategoricalField, encoder: LabelEncoder) {
        self.by_field.insert(field, encoder);
    }

    pub fn get(&self, field: CategoricalField) -> Option<&LabelEncoder> {
        self.by_field.get(&field)
    }

    pub fn encode(&self, field: CategoricalField, value: &str) -> PredictResult<usize> {
        self.get(field)
            .and_then(|enc| enc.code(value))
            .ok_or_else(|| PredictError::UnknownCategory {
                field,
                value: value.trim().to_string(),
            })
    }
}

/// Mean/variance normaliser fitted alongside the models.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub means: Vec<f64>,
    pub scales: Vec<f64>,
}

impl StandardScaler {
    pub fn width(&self) -> usize {
        self.means.len()
    }

    pub fn transform(&self, raw: &[f64]) -> PredictResult<Vec<f64>> {
        if raw.len() != self.means.len() || raw.len() != self.scales.len() {
            return Err(PredictError::Model(format!(
                "scaler expects {} features, got {}",
                self.means.len(),
                raw.len()
            )));
        }
        Ok(raw
            .iter()
            .zip(&self.means)
            .zip(&self.scales)
            .map(|((x, mean), scale)| (x - mean) / effective_scale(*scale))
            .collect())
    }
}

// Constant columns are fitted with a zero scale; they pass through centred.
fn effective_scale(scale: f64) -> f64 {
    if scale.abs() < f64::EPSILON { 1.0 } else { scale }
}

/// Normalised vector in the exact column order the models were fitted on.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelInput(pub Vec<f64>);

impl ModelInput {
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Encodes categoricals, orders columns as `layout`, and scales.
pub fn encode_and_scale(
    features: &FeatureVector,
    layout: &[Feature],
    encoders: &Encoders,
    scaler: &StandardScaler,
) -> PredictResult<ModelInput> {
    if layout.len() != scaler.width() {
        return Err(PredictError::Model(format!(
            "feature layout has {} columns but scaler was fitted on {}",
            layout.len(),
            scaler.width()
        )));
    }

    let mut raw = Vec::with_capacity(layout.len());
    for (col, feature) in layout.iter().enumerate() {
        let value = match features.get(*feature) {
            Some(FeatureValue::Number(x)) => *x,
            Some(FeatureValue::Category(name)) => {
                let field = feature.categorical_field().ok_or_else(|| {
                    PredictError::Model(format!("{} is not a categorical column", feature.name()))
                })?;
                encoders.encode(field, name)? as f64
            }
            None => {
                // Absent columns sit at the fitted mean, i.e. scale to 0.
                debug!(feature = feature.name(), "feature missing, defaulting to scaler mean");
                scaler.means[col]
            }
        };
        raw.push(value);
    }

    scaler.transform(&raw).map(ModelInput)
}
