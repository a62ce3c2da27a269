//! Transport-independent request/response contract.
//!
//! Everything here is plain serde data; the CLI `serve` loop speaks it as JSON lines,
//! and any other transport can reuse the same shapes.

use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::artifact::short_fingerprint;
use crate::classifier::{Outcome, Prob3};
use crate::config::Settings;
use crate::error::{ErrorCategory, PredictError};
use crate::predictor::{MatchRequest, Prediction, PredictionQuality, Predictor};
use crate::simulation::ExpectedStats;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PredictRequest {
    #[serde(default)]
    pub home_team: Option<String>,
    #[serde(default)]
    pub away_team: Option<String>,
    #[serde(default)]
    pub season: Option<i32>,
    /// Fixes the simulation for this request only.
    #[serde(default)]
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PredictResponse {
    pub success: bool,
    pub home_team: String,
    pub away_team: String,
    pub winner: Option<String>,
    pub league: String,
    pub season: i32,
    pub outcome: Outcome,
    pub probabilities: Prob3,
    pub confidence: f64,
    pub home_goals: u32,
    pub away_goals: u32,
    pub yellow_cards: u32,
    pub red_cards: u32,
    pub corners: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected: Option<ExpectedStats>,
    pub quality: PredictionQuality,
    pub model: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub category: ErrorCategory,
}

#[derive(Debug, Clone, Serialize)]
pub struct TeamsResponse {
    pub success: bool,
    pub teams: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub success: bool,
    pub model: String,
    pub generated_at: String,
    pub teams: usize,
    pub rows: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ApiResponse {
    Prediction(Box<PredictResponse>),
    Teams(TeamsResponse),
    Health(HealthResponse),
    Error(ErrorResponse),
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        !matches!(self, ApiResponse::Error(_))
    }
}

impl ErrorResponse {
    pub fn from_error(err: &PredictError) -> Self {
        let error = match err.category() {
            ErrorCategory::InvalidInput => err.to_string(),
            ErrorCategory::UnknownTeam => match err {
                PredictError::UnknownTeam { name, .. } => format!("team not recognised: {name}"),
                other => other.to_string(),
            },
            ErrorCategory::UnknownCategory => err.to_string(),
            // Details stay in the logs.
            ErrorCategory::Internal => "internal error while predicting".to_string(),
        };
        Self {
            success: false,
            error,
            category: err.category(),
        }
    }

    fn invalid(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: message.into(),
            category: ErrorCategory::InvalidInput,
        }
    }
}

pub fn predict(predictor: &Predictor, settings: &Settings, request: PredictRequest) -> ApiResponse {
    let match_request = MatchRequest {
        home_team: request.home_team.unwrap_or_default(),
        away_team: request.away_team.unwrap_or_default(),
        season: request.season.unwrap_or(settings.default_season),
    };
    let mut rng = match request.seed.or(settings.seed) {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    match predictor.predict(&match_request, &mut rng) {
        Ok(prediction) => ApiResponse::Prediction(Box::new(to_response(
            prediction,
            short_fingerprint(&predictor.models().fingerprint),
        ))),
        Err(err) => {
            if err.is_user_facing() {
                warn!(error = %err, "prediction rejected");
            } else {
                warn!(error = %err, home = %match_request.home_team, away = %match_request.away_team, "prediction failed");
            }
            ApiResponse::Error(ErrorResponse::from_error(&err))
        }
    }
}

pub fn teams(predictor: &Predictor) -> ApiResponse {
    ApiResponse::Teams(TeamsResponse {
        success: true,
        teams: predictor.known_teams(),
    })
}

pub fn health(predictor: &Predictor) -> ApiResponse {
    let models = predictor.models();
    ApiResponse::Health(HealthResponse {
        success: true,
        model: short_fingerprint(&models.fingerprint).to_string(),
        generated_at: models.generated_at.clone(),
        teams: predictor.known_teams().len(),
        rows: predictor.dataset().len(),
    })
}

/// Dispatches one JSON message; `op` selects `predict` (default), `teams` or `health`.
pub fn handle_json(predictor: &Predictor, settings: &Settings, body: &str) -> ApiResponse {
    let value = match serde_json::from_str::<Value>(body.trim()) {
        Ok(value) => value,
        Err(err) => return ApiResponse::Error(ErrorResponse::invalid(format!("malformed json: {err}"))),
    };
    let op = value
        .get("op")
        .and_then(|v| v.as_str())
        .unwrap_or("predict")
        .trim()
        .to_ascii_lowercase();

    match op.as_str() {
        "predict" => match serde_json::from_value::<PredictRequest>(value) {
            Ok(request) => predict(predictor, settings, request),
            Err(err) => ApiResponse::Error(ErrorResponse::invalid(format!("bad request: {err}"))),
        },
        "teams" => teams(predictor),
        "health" => health(predictor),
        other => ApiResponse::Error(ErrorResponse::invalid(format!("unknown op {other:?}"))),
    }
}

fn to_response(prediction: Prediction, model: &str) -> PredictResponse {
    PredictResponse {
        success: true,
        winner: prediction.winner().map(str::to_string),
        home_team: prediction.home_team,
        away_team: prediction.away_team,
        league: prediction.league,
        season: prediction.season,
        outcome: prediction.outcome,
        probabilities: prediction.probabilities,
        confidence: prediction.confidence,
        home_goals: prediction.stats.home_goals,
        away_goals: prediction.stats.away_goals,
        yellow_cards: prediction.stats.yellow_cards,
        red_cards: prediction.stats.red_cards,
        corners: prediction.stats.corners,
        expected: prediction.expected,
        quality: prediction.quality,
        model: model.to_string(),
    }
}
