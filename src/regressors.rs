use std::collections::HashMap;
use std::fmt;

use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::encoding::ModelInput;
use crate::error::{PredictError, PredictResult};

/// Statistic a dedicated regressor is trained for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatTarget {
    HomeGoals,
    AwayGoals,
    Corners,
    YellowCards,
    RedCards,
}

impl StatTarget {
    pub const ALL: [StatTarget; 5] = [
        StatTarget::HomeGoals,
        StatTarget::AwayGoals,
        StatTarget::Corners,
        StatTarget::YellowCards,
        StatTarget::RedCards,
    ];

    pub fn key(self) -> &'static str {
        match self {
            StatTarget::HomeGoals => "home_goals",
            StatTarget::AwayGoals => "away_goals",
            StatTarget::Corners => "corners",
            StatTarget::YellowCards => "yellow_cards",
            StatTarget::RedCards => "red_cards",
        }
    }

    pub fn from_key(raw: &str) -> Option<StatTarget> {
        let want = raw.trim().to_ascii_lowercase();
        StatTarget::ALL.into_iter().find(|t| t.key() == want)
    }
}

impl fmt::Display for StatTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

pub trait StatRegressor: Send + Sync {
    fn predict(&self, input: &ModelInput) -> PredictResult<f64>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetTransform {
    /// Fitted directly on non-negative counts; output clamped at zero.
    #[default]
    Identity,
    /// Fitted on ln(max(y, 0.1)); output is exponentiated.
    Log,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearRegressor {
    pub coefficients: Vec<f64>,
    pub intercept: f64,
    #[serde(default)]
    pub target_transform: TargetTransform,
}

impl LinearRegressor {
    pub fn validate(&self, width: usize) -> Result<()> {
        if self.coefficients.len() != width {
            return Err(anyhow!(
                "regressor has {} weights, expected {width}",
                self.coefficients.len()
            ));
        }
        Ok(())
    }
}

impl StatRegressor for LinearRegressor {
    fn predict(&self, input: &ModelInput) -> PredictResult<f64> {
        let x = input.as_slice();
        if x.len() != self.coefficients.len() {
            return Err(PredictError::Model(format!(
                "regressor expects {} features, got {}",
                self.coefficients.len(),
                x.len()
            )));
        }
        let score = self
            .coefficients
            .iter()
            .zip(x)
            .map(|(w, v)| w * v)
            .sum::<f64>()
            + self.intercept;
        let value = match self.target_transform {
            TargetTransform::Identity => score.max(0.0),
            TargetTransform::Log => score.exp(),
        };
        if !value.is_finite() {
            return Err(PredictError::Model(format!(
                "regressor produced non-finite value from score {score}"
            )));
        }
        Ok(value)
    }
}

/// Continuous regressor outputs; `None` means no regressor for that target.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct StatPredictions {
    pub home_goals: Option<f64>,
    pub away_goals: Option<f64>,
    pub corners: Option<f64>,
    pub yellow_cards: Option<f64>,
    pub red_cards: Option<f64>,
}

impl StatPredictions {
    pub fn get(&self, target: StatTarget) -> Option<f64> {
        match target {
            StatTarget::HomeGoals => self.home_goals,
            StatTarget::AwayGoals => self.away_goals,
            StatTarget::Corners => self.corners,
            StatTarget::YellowCards => self.yellow_cards,
            StatTarget::RedCards => self.red_cards,
        }
    }

    pub fn set(&mut self, target: StatTarget, value: f64) {
        let slot = match target {
            StatTarget::HomeGoals => &mut self.home_goals,
            StatTarget::AwayGoals => &mut self.away_goals,
            StatTarget::Corners => &mut self.corners,
            StatTarget::YellowCards => &mut self.yellow_cards,
            StatTarget::RedCards => &mut self.red_cards,
        };
        *slot = Some(value);
    }
}

#[derive(Default)]
pub struct RegressorSet {
    by_target: HashMap<StatTarget, Box<dyn StatRegressor>>,
}

impl RegressorSet {
    pub fn insert(&mut self, target: StatTarget, regressor: Box<dyn StatRegressor>) {
        self.by_target.insert(target, regressor);
    }

    pub fn contains(&self, target: StatTarget) -> bool {
        self.by_target.contains_key(&target)
    }

    pub fn missing_targets(&self) -> Vec<StatTarget> {
        StatTarget::ALL
            .into_iter()
            .filter(|t| !self.contains(*t))
            .collect()
    }

    /// Runs every available regressor on the same input.
    pub fn predict_all(&self, input: &ModelInput) -> PredictResult<StatPredictions> {
        let mut out = StatPredictions::default();
        for target in StatTarget::ALL {
            if let Some(regressor) = self.by_target.get(&target) {
                let value = regressor.predict(input).map_err(|err| match err {
                    PredictError::Model(msg) => PredictError::Model(format!("{target}: {msg}")),
                    other => other,
                })?;
                out.set(target, value);
            }
        }
        Ok(out)
    }
}
