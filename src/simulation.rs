use rand::Rng;
use rand_distr::{Distribution, Normal, Poisson};
use serde::Serialize;
use tracing::trace;

use crate::classifier::Outcome;
use crate::error::{PredictError, PredictResult};
use crate::regressors::{StatPredictions, StatTarget};

/// Lowest Poisson rate used for goal sampling.
pub const GOAL_RATE_FLOOR: f64 = 0.1;
/// Highest goal rate accepted from a regressor; anything above is a broken model.
pub const GOAL_RATE_CEILING: f64 = 20.0;
/// Card/corner regressors were trained on aggregated totals; this maps them to per-match scale.
pub const AUX_DESCALE: f64 = 10.0;
pub const YELLOW_CARDS_SD: f64 = 1.0;
pub const RED_CARDS_SD: f64 = 0.5;
pub const CORNERS_SD: f64 = 1.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct SimulatedStats {
    pub home_goals: u32,
    pub away_goals: u32,
    pub yellow_cards: u32,
    pub red_cards: u32,
    pub corners: u32,
}

/// Continuous values before discretisation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ExpectedStats {
    pub home_goals: f64,
    pub away_goals: f64,
    pub yellow_cards: f64,
    pub red_cards: f64,
    pub corners: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SimState {
    DrawShortcut,
    HomeWinAdjust,
    AwayWinAdjust,
    Finalize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationOutput {
    pub stats: SimulatedStats,
    /// Present only when every regressor produced a value.
    pub expected: Option<ExpectedStats>,
    /// States visited, ending in `Finalize`.
    pub path: Vec<SimState>,
}

pub fn entry_state(outcome: Outcome) -> SimState {
    match outcome {
        Outcome::Draw => SimState::DrawShortcut,
        Outcome::Home => SimState::HomeWinAdjust,
        Outcome::Away => SimState::AwayWinAdjust,
    }
}

/// Turns regressor expectations into counts consistent with `outcome`.
pub fn simulate<R: Rng + ?Sized>(
    outcome: Outcome,
    predictions: &StatPredictions,
    rng: &mut R,
) -> PredictResult<SimulationOutput> {
    let expected = expected_stats(predictions);
    let mut stats = SimulatedStats::default();
    let mut path = Vec::with_capacity(2);

    let mut state = entry_state(outcome);
    loop {
        path.push(state);
        state = match state {
            SimState::DrawShortcut => SimState::Finalize,
            SimState::HomeWinAdjust => {
                let (winner, loser) = sample_decided_goals(
                    goal_rate(predictions, StatTarget::HomeGoals)?,
                    goal_rate(predictions, StatTarget::AwayGoals)?,
                    rng,
                )?;
                stats.home_goals = winner;
                stats.away_goals = loser;
                sample_aux_stats(predictions, &mut stats, rng)?;
                SimState::Finalize
            }
            SimState::AwayWinAdjust => {
                let (winner, loser) = sample_decided_goals(
                    goal_rate(predictions, StatTarget::AwayGoals)?,
                    goal_rate(predictions, StatTarget::HomeGoals)?,
                    rng,
                )?;
                stats.away_goals = winner;
                stats.home_goals = loser;
                sample_aux_stats(predictions, &mut stats, rng)?;
                SimState::Finalize
            }
            SimState::Finalize => break,
        };
    }

    trace!(?outcome, ?stats, "simulation finished");
    Ok(SimulationOutput {
        stats,
        expected,
        path,
    })
}

fn goal_rate(predictions: &StatPredictions, target: StatTarget) -> PredictResult<f64> {
    let rate = predictions.get(target).unwrap_or(GOAL_RATE_FLOOR);
    if !rate.is_finite() || rate > GOAL_RATE_CEILING {
        return Err(PredictError::Model(format!(
            "{target} rate {rate} is unusable (ceiling {GOAL_RATE_CEILING})"
        )));
    }
    Ok(rate.max(GOAL_RATE_FLOOR))
}

/// Samples (winner, loser) goals; the winner always ends strictly ahead.
fn sample_decided_goals<R: Rng + ?Sized>(
    winner_rate: f64,
    loser_rate: f64,
    rng: &mut R,
) -> PredictResult<(u32, u32)> {
    let mut winner = sample_poisson(winner_rate, rng)?;
    let loser = sample_poisson(loser_rate, rng)?;
    if winner <= loser {
        winner = loser.saturating_add(rng.gen_range(1..=2));
    }
    Ok((winner, loser))
}

fn sample_poisson<R: Rng + ?Sized>(rate: f64, rng: &mut R) -> PredictResult<u32> {
    let dist = Poisson::new(rate)
        .map_err(|err| PredictError::Model(format!("invalid goal rate {rate}: {err}")))?;
    let draw: f64 = dist.sample(rng);
    Ok(draw as u32)
}

fn sample_aux_stats<R: Rng + ?Sized>(
    predictions: &StatPredictions,
    stats: &mut SimulatedStats,
    rng: &mut R,
) -> PredictResult<()> {
    stats.yellow_cards = sample_count(predictions.yellow_cards, YELLOW_CARDS_SD, rng)?;
    stats.red_cards = sample_count(predictions.red_cards, RED_CARDS_SD, rng)?;
    stats.corners = sample_count(predictions.corners, CORNERS_SD, rng)?;
    Ok(())
}

// No regressor means no signal to sample around; the count stays at zero.
fn sample_count<R: Rng + ?Sized>(prediction: Option<f64>, sd: f64, rng: &mut R) -> PredictResult<u32> {
    let Some(raw) = prediction else {
        return Ok(0);
    };
    let mean = raw / AUX_DESCALE;
    let dist = Normal::new(mean, sd)
        .map_err(|err| PredictError::Model(format!("invalid normal({mean}, {sd}): {err}")))?;
    let draw: f64 = dist.sample(rng);
    Ok(draw.max(0.0).round() as u32)
}

fn expected_stats(predictions: &StatPredictions) -> Option<ExpectedStats> {
    Some(ExpectedStats {
        home_goals: predictions.home_goals?,
        away_goals: predictions.away_goals?,
        yellow_cards: predictions.yellow_cards? / AUX_DESCALE,
        red_cards: predictions.red_cards? / AUX_DESCALE,
        corners: predictions.corners? / AUX_DESCALE,
    })
}
