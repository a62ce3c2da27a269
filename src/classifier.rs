use std::fmt;

use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::encoding::{LabelEncoder, ModelInput};
use crate::error::{PredictError, PredictResult};

// Sums within this of 1 are returned as the model produced them.
const PROB_RENORMALISE_ABOVE: f64 = 1e-7;
// Drift beyond this is a broken model, not rounding.
const PROB_DRIFT_LIMIT: f64 = 1e-3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Outcome {
    Home,
    Draw,
    Away,
}

impl Outcome {
    pub const ALL: [Outcome; 3] = [Outcome::Home, Outcome::Draw, Outcome::Away];

    /// Accepts the label spellings found in fitted outcome encoders.
    pub fn from_label(raw: &str) -> Option<Outcome> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "H" | "HOME" | "HOME_WIN" | "1" => Some(Outcome::Home),
            "D" | "DRAW" | "X" => Some(Outcome::Draw),
            "A" | "AWAY" | "AWAY_WIN" | "2" => Some(Outcome::Away),
            _ => None,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Outcome::Home => "H",
            Outcome::Draw => "D",
            Outcome::Away => "A",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Home => f.write_str("HOME"),
            Outcome::Draw => f.write_str("DRAW"),
            Outcome::Away => f.write_str("AWAY"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prob3 {
    #[serde(rename = "HOME")]
    pub home: f64,
    #[serde(rename = "DRAW")]
    pub draw: f64,
    #[serde(rename = "AWAY")]
    pub away: f64,
}

impl Prob3 {
    pub fn uniform() -> Self {
        Self {
            home: 1.0 / 3.0,
            draw: 1.0 / 3.0,
            away: 1.0 / 3.0,
        }
    }

    pub fn get(&self, outcome: Outcome) -> f64 {
        match outcome {
            Outcome::Home => self.home,
            Outcome::Draw => self.draw,
            Outcome::Away => self.away,
        }
    }

    fn slot(&mut self, outcome: Outcome) -> &mut f64 {
        match outcome {
            Outcome::Home => &mut self.home,
            Outcome::Draw => &mut self.draw,
            Outcome::Away => &mut self.away,
        }
    }

    pub fn sum(&self) -> f64 {
        self.home + self.draw + self.away
    }

    pub fn max(&self) -> f64 {
        self.home.max(self.draw).max(self.away)
    }

    /// First maximum in `order` wins ties.
    pub fn argmax_in(&self, order: &[Outcome]) -> Outcome {
        let mut best = order.first().copied().unwrap_or(Outcome::Home);
        for outcome in order.iter().copied() {
            if self.get(outcome) > self.get(best) {
                best = outcome;
            }
        }
        best
    }
}

/// A fitted multi-class model over the fixed-order input vector.
pub trait OutcomeModel: Send + Sync {
    /// Codes into the outcome encoder, in the model's output order.
    fn classes(&self) -> &[usize];

    /// One probability per entry of `classes()`.
    fn predict_proba(&self, input: &ModelInput) -> PredictResult<Vec<f64>>;
}

/// Multinomial logistic regression (softmax over linear scores).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticClassifier {
    pub classes: Vec<usize>,
    pub coefficients: Vec<Vec<f64>>,
    pub intercepts: Vec<f64>,
}

impl LogisticClassifier {
    pub fn validate(&self, width: usize) -> Result<()> {
        if self.classes.is_empty() {
            return Err(anyhow!("classifier has no classes"));
        }
        if self.coefficients.len() != self.classes.len()
            || self.intercepts.len() != self.classes.len()
        {
            return Err(anyhow!(
                "classifier shape mismatch: {} classes, {} coefficient rows, {} intercepts",
                self.classes.len(),
                self.coefficients.len(),
                self.intercepts.len()
            ));
        }
        if let Some(row) = self.coefficients.iter().find(|row| row.len() != width) {
            return Err(anyhow!(
                "classifier coefficient row has {} weights, expected {width}",
                row.len()
            ));
        }
        Ok(())
    }
}

impl OutcomeModel for LogisticClassifier {
    fn classes(&self) -> &[usize] {
        &self.classes
    }

    fn predict_proba(&self, input: &ModelInput) -> PredictResult<Vec<f64>> {
        let x = input.as_slice();
        let mut scores = Vec::with_capacity(self.classes.len());
        for (row, b) in self.coefficients.iter().zip(&self.intercepts) {
            if row.len() != x.len() {
                return Err(PredictError::Model(format!(
                    "classifier expects {} features, got {}",
                    row.len(),
                    x.len()
                )));
            }
            scores.push(row.iter().zip(x).map(|(w, v)| w * v).sum::<f64>() + b);
        }
        Ok(softmax(&scores))
    }
}

fn softmax(scores: &[f64]) -> Vec<f64> {
    let mx = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = scores.iter().map(|s| (s - mx).exp()).collect();
    let den = exps.iter().sum::<f64>().max(1e-300);
    exps.into_iter().map(|e| e / den).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Classification {
    pub outcome: Outcome,
    pub probabilities: Prob3,
    pub confidence: f64,
}

/// Relabels a model's class indices to outcomes via the outcome encoder.
pub struct OutcomeClassifier {
    model: Box<dyn OutcomeModel>,
    order: Vec<Outcome>,
}

impl OutcomeClassifier {
    pub fn new(model: Box<dyn OutcomeModel>, outcome_encoder: &LabelEncoder) -> Result<Self> {
        let mut order = Vec::with_capacity(model.classes().len());
        for code in model.classes() {
            let label = outcome_encoder
                .name(*code)
                .ok_or_else(|| anyhow!("classifier class {code} missing from outcome encoder"))?;
            let outcome = Outcome::from_label(label)
                .ok_or_else(|| anyhow!("unrecognised outcome label {label:?}"))?;
            if order.contains(&outcome) {
                return Err(anyhow!("outcome {outcome} appears twice in classifier classes"));
            }
            order.push(outcome);
        }
        if let Some(missing) = Outcome::ALL.iter().find(|o| !order.contains(o)) {
            return Err(anyhow!("classifier cannot predict {missing}"));
        }
        Ok(Self { model, order })
    }

    /// Outcomes in encoder-defined class order.
    pub fn class_order(&self) -> &[Outcome] {
        &self.order
    }

    pub fn classify(&self, input: &ModelInput) -> PredictResult<Classification> {
        let raw = self.model.predict_proba(input)?;
        if raw.len() != self.order.len() {
            return Err(PredictError::Model(format!(
                "classifier returned {} probabilities for {} classes",
                raw.len(),
                self.order.len()
            )));
        }
        if raw.iter().any(|p| !p.is_finite() || *p < 0.0) {
            return Err(PredictError::Model(
                "classifier returned a non-finite or negative probability".to_string(),
            ));
        }

        let mut probs = Prob3 {
            home: 0.0,
            draw: 0.0,
            away: 0.0,
        };
        for (outcome, p) in self.order.iter().zip(&raw) {
            *probs.slot(*outcome) = *p;
        }

        let sum = probs.sum();
        if (sum - 1.0).abs() > PROB_DRIFT_LIMIT {
            return Err(PredictError::Model(format!(
                "classifier probabilities sum to {sum:.6}"
            )));
        }
        if (sum - 1.0).abs() > PROB_RENORMALISE_ABOVE {
            probs.home /= sum;
            probs.draw /= sum;
            probs.away /= sum;
        }

        Ok(Classification {
            outcome: probs.argmax_in(&self.order),
            probabilities: probs,
            confidence: probs.max(),
        })
    }
}
