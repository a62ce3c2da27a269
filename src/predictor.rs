use anyhow::{Context, Result, anyhow};
use rand::Rng;
use serde::Serialize;
use tracing::{debug, info};

use crate::artifact::{self, ModelBundle};
use crate::classifier::{Classification, Outcome, Prob3};
use crate::config::Settings;
use crate::dataset::{self, HistoricalDataset};
use crate::encoding::{ModelInput, encode_and_scale};
use crate::error::{CategoricalField, PredictError, PredictResult};
use crate::features::{FeatureVector, build_features};
use crate::regressors::StatTarget;
use crate::resolver::{ResolutionSource, ResolvedTeam, Role, normalize_team_name, resolve_team};
use crate::simulation::{self, ExpectedStats, SimulatedStats};

#[derive(Debug, Clone, PartialEq)]
pub struct MatchRequest {
    pub home_team: String,
    pub away_team: String,
    pub season: i32,
}

/// Why a prediction ran on weaker inputs than usual.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Degradation {
    RoleSwap { team: String, role: Role },
    DefaultStats { team: String, role: Role },
    LeagueDefaulted { league: String },
    MissingRegressor { target: StatTarget },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "reasons", rename_all = "snake_case")]
pub enum PredictionQuality {
    Full,
    Degraded(Vec<Degradation>),
}

impl PredictionQuality {
    fn from_reasons(reasons: Vec<Degradation>) -> Self {
        if reasons.is_empty() {
            PredictionQuality::Full
        } else {
            PredictionQuality::Degraded(reasons)
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, PredictionQuality::Degraded(_))
    }
}

/// Deterministic part of the pipeline: everything before the models run.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedMatch {
    pub home: ResolvedTeam,
    pub away: ResolvedTeam,
    pub league: String,
    pub season: i32,
    pub features: FeatureVector,
    pub input: ModelInput,
    pub degradations: Vec<Degradation>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub home_team: String,
    pub away_team: String,
    pub league: String,
    pub season: i32,
    pub outcome: Outcome,
    pub probabilities: Prob3,
    pub confidence: f64,
    pub stats: SimulatedStats,
    pub expected: Option<ExpectedStats>,
    pub quality: PredictionQuality,
}

impl Prediction {
    /// Name of the winning side, `None` for a draw.
    pub fn winner(&self) -> Option<&str> {
        match self.outcome {
            Outcome::Home => Some(&self.home_team),
            Outcome::Away => Some(&self.away_team),
            Outcome::Draw => None,
        }
    }
}

/// Fitted models plus historical data, built once and shared read-only.
pub struct Predictor {
    models: ModelBundle,
    dataset: HistoricalDataset,
}

impl Predictor {
    pub fn new(models: ModelBundle, dataset: HistoricalDataset) -> Self {
        Self { models, dataset }
    }

    /// Loads bundle and dataset; either both load or startup fails.
    pub fn load(settings: &Settings) -> Result<Self> {
        let bundle_path = artifact::resolve_bundle_path(settings.model_path.as_deref())
            .ok_or_else(|| anyhow!("no model bundle found; set MATCHDAY_MODEL_PATH or --model"))?;
        let models = artifact::load_bundle(&bundle_path)?;

        let db_path = settings
            .db_path
            .clone()
            .or_else(dataset::default_db_path)
            .context("unable to resolve dataset path")?;
        let dataset = HistoricalDataset::load(&db_path)
            .with_context(|| format!("load historical dataset {}", db_path.display()))?;
        info!(
            db = %db_path.display(),
            rows = dataset.len(),
            "historical dataset loaded"
        );

        Ok(Self::new(models, dataset))
    }

    pub fn models(&self) -> &ModelBundle {
        &self.models
    }

    pub fn dataset(&self) -> &HistoricalDataset {
        &self.dataset
    }

    pub fn known_teams(&self) -> Vec<String> {
        self.models.known_teams()
    }

    /// Rejects requests before any lookup or model call.
    pub fn validate(request: &MatchRequest) -> PredictResult<()> {
        let home = normalize_team_name(&request.home_team);
        let away = normalize_team_name(&request.away_team);
        if home.is_empty() {
            return Err(PredictError::InvalidInput("home_team is required".to_string()));
        }
        if away.is_empty() {
            return Err(PredictError::InvalidInput("away_team is required".to_string()));
        }
        if home == away {
            return Err(PredictError::InvalidInput(
                "home_team and away_team must be different".to_string(),
            ));
        }
        Ok(())
    }

    pub fn prepare(&self, request: &MatchRequest) -> PredictResult<PreparedMatch> {
        Self::validate(request)?;

        let encoders = &self.models.encoders;
        let home = resolve_team(&self.dataset, encoders, &request.home_team, Role::Home)?;
        let away = resolve_team(&self.dataset, encoders, &request.away_team, Role::Away)?;

        let mut degradations = Vec::new();
        for team in [&home, &away] {
            match team.source {
                ResolutionSource::Direct => {}
                ResolutionSource::Swapped => degradations.push(Degradation::RoleSwap {
                    team: team.name.clone(),
                    role: team.role,
                }),
                ResolutionSource::Defaulted => degradations.push(Degradation::DefaultStats {
                    team: team.name.clone(),
                    role: team.role,
                }),
            }
        }

        let league = match home.league.clone().or_else(|| away.league.clone()) {
            Some(league) => league,
            None => {
                let fallback = encoders
                    .get(CategoricalField::League)
                    .and_then(|enc| enc.name(0))
                    .ok_or_else(|| PredictError::Model("league encoder is empty".to_string()))?
                    .to_string();
                degradations.push(Degradation::LeagueDefaulted {
                    league: fallback.clone(),
                });
                fallback
            }
        };

        let features = build_features(&home, &away, &league, request.season);
        let input = encode_and_scale(
            &features,
            &self.models.feature_layout,
            encoders,
            &self.models.scaler,
        )?;

        Ok(PreparedMatch {
            home,
            away,
            league,
            season: request.season,
            features,
            input,
            degradations,
        })
    }

    /// Outcome distribution only; no simulation, no randomness.
    pub fn classify(&self, request: &MatchRequest) -> PredictResult<Classification> {
        let prepared = self.prepare(request)?;
        self.models.classifier.classify(&prepared.input)
    }

    pub fn predict<R: Rng + ?Sized>(
        &self,
        request: &MatchRequest,
        rng: &mut R,
    ) -> PredictResult<Prediction> {
        let prepared = self.prepare(request)?;

        let classification = self.models.classifier.classify(&prepared.input)?;
        let stats = self.models.regressors.predict_all(&prepared.input)?;
        let sim = simulation::simulate(classification.outcome, &stats, rng)?;

        let mut reasons = prepared.degradations;
        for target in self.models.regressors.missing_targets() {
            reasons.push(Degradation::MissingRegressor { target });
        }

        debug!(
            home = %prepared.home.name,
            away = %prepared.away.name,
            season = prepared.season,
            outcome = %classification.outcome,
            confidence = classification.confidence,
            home_goals = sim.stats.home_goals,
            away_goals = sim.stats.away_goals,
            degraded = !reasons.is_empty(),
            "prediction"
        );

        Ok(Prediction {
            home_team: prepared.home.name,
            away_team: prepared.away.name,
            league: prepared.league,
            season: prepared.season,
            outcome: classification.outcome,
            probabilities: classification.probabilities,
            confidence: classification.confidence,
            stats: sim.stats,
            expected: sim.expected,
            quality: PredictionQuality::from_reasons(reasons),
        })
    }
}
