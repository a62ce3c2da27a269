use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::classifier::{Outcome, Prob3};
use crate::predictor::{MatchRequest, Predictor};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Metrics {
    pub samples: usize,
    pub brier: f64,
    pub log_loss: f64,
    pub accuracy: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CalibrationBin {
    pub bucket_start: f64,
    pub bucket_end: f64,
    pub count: usize,
    pub avg_pred: f64,
    pub actual_rate: f64,
}

/// A played match with its final score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvalFixture {
    pub home_team: String,
    pub away_team: String,
    pub season: i32,
    pub home_goals: u32,
    pub away_goals: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct SkippedFixture {
    pub index: usize,
    pub home_team: String,
    pub away_team: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct EvaluationReport {
    pub metrics: Metrics,
    pub home_bins: Vec<CalibrationBin>,
    pub draw_bins: Vec<CalibrationBin>,
    pub away_bins: Vec<CalibrationBin>,
    pub skipped: Vec<SkippedFixture>,
}

pub fn classify_outcome(home_goals: u32, away_goals: u32) -> Outcome {
    if home_goals > away_goals {
        Outcome::Home
    } else if home_goals < away_goals {
        Outcome::Away
    } else {
        Outcome::Draw
    }
}

pub fn evaluate_probs(predictions: &[Prob3], outcomes: &[Outcome]) -> Metrics {
    if predictions.is_empty() || outcomes.is_empty() || predictions.len() != outcomes.len() {
        return Metrics {
            samples: 0,
            brier: 0.0,
            log_loss: 0.0,
            accuracy: 0.0,
        };
    }

    let mut brier_sum = 0.0_f64;
    let mut log_loss_sum = 0.0_f64;
    let mut correct = 0usize;

    for (p, outcome) in predictions.iter().zip(outcomes) {
        let y = one_hot(*outcome);
        brier_sum +=
            (p.home - y.home).powi(2) + (p.draw - y.draw).powi(2) + (p.away - y.away).powi(2);
        log_loss_sum += -p.get(*outcome).clamp(1e-12, 1.0).ln();
        if p.argmax_in(&Outcome::ALL) == *outcome {
            correct += 1;
        }
    }

    let n = predictions.len() as f64;
    Metrics {
        samples: predictions.len(),
        brier: brier_sum / n,
        log_loss: log_loss_sum / n,
        accuracy: correct as f64 / n,
    }
}

pub fn calibration_bins(
    predictions: &[Prob3],
    outcomes: &[Outcome],
    class: Outcome,
    bins: usize,
) -> Vec<CalibrationBin> {
    let bins = bins.max(2);
    let mut counts = vec![0usize; bins];
    let mut pred_sum = vec![0.0_f64; bins];
    let mut actual_sum = vec![0.0_f64; bins];

    for (p, outcome) in predictions.iter().zip(outcomes) {
        let class_prob = p.get(class).clamp(0.0, 1.0);
        let idx = ((class_prob * bins as f64).floor() as usize).min(bins - 1);
        counts[idx] += 1;
        pred_sum[idx] += class_prob;
        if *outcome == class {
            actual_sum[idx] += 1.0;
        }
    }

    (0..bins)
        .map(|i| {
            let count = counts[i];
            let (avg_pred, actual_rate) = if count > 0 {
                (pred_sum[i] / count as f64, actual_sum[i] / count as f64)
            } else {
                (0.0, 0.0)
            };
            CalibrationBin {
                bucket_start: i as f64 / bins as f64,
                bucket_end: (i + 1) as f64 / bins as f64,
                count,
                avg_pred,
                actual_rate,
            }
        })
        .collect()
}

/// Scores the classifier against played fixtures. Fixtures that cannot be predicted are skipped.
pub fn evaluate_fixtures(predictor: &Predictor, fixtures: &[EvalFixture], bins: usize) -> EvaluationReport {
    let results: Vec<Result<(Prob3, Outcome), SkippedFixture>> = fixtures
        .par_iter()
        .enumerate()
        .map(|(index, fx)| {
            let request = MatchRequest {
                home_team: fx.home_team.clone(),
                away_team: fx.away_team.clone(),
                season: fx.season,
            };
            predictor
                .classify(&request)
                .map(|c| (c.probabilities, classify_outcome(fx.home_goals, fx.away_goals)))
                .map_err(|err| SkippedFixture {
                    index,
                    home_team: fx.home_team.clone(),
                    away_team: fx.away_team.clone(),
                    reason: err.to_string(),
                })
        })
        .collect();

    let mut predictions = Vec::with_capacity(results.len());
    let mut outcomes = Vec::with_capacity(results.len());
    let mut skipped = Vec::new();
    for result in results {
        match result {
            Ok((p, o)) => {
                predictions.push(p);
                outcomes.push(o);
            }
            Err(skip) => skipped.push(skip),
        }
    }

    EvaluationReport {
        metrics: evaluate_probs(&predictions, &outcomes),
        home_bins: calibration_bins(&predictions, &outcomes, Outcome::Home, bins),
        draw_bins: calibration_bins(&predictions, &outcomes, Outcome::Draw, bins),
        away_bins: calibration_bins(&predictions, &outcomes, Outcome::Away, bins),
        skipped,
    }
}

fn one_hot(outcome: Outcome) -> Prob3 {
    match outcome {
        Outcome::Home => Prob3 {
            home: 1.0,
            draw: 0.0,
            away: 0.0,
        },
        Outcome::Draw => Prob3 {
            home: 0.0,
            draw: 1.0,
            away: 0.0,
        },
        Outcome::Away => Prob3 {
            home: 0.0,
            draw: 0.0,
            away: 1.0,
        },
    }
}
