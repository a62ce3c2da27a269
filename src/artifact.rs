use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use crate::classifier::{LogisticClassifier, OutcomeClassifier};
use crate::config::app_cache_dir;
use crate::encoding::{Encoders, LabelEncoder, StandardScaler};
use crate::error::CategoricalField;
use crate::features::Feature;
use crate::regressors::{LinearRegressor, RegressorSet, StatTarget};

pub const BUNDLE_FILE: &str = "model_bundle.json";
pub const ASSETS_BUNDLE_PATH: &str = "assets/model_bundle.json";
pub const SUPPORTED_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncodersArtifact {
    pub home_team: LabelEncoder,
    pub away_team: LabelEncoder,
    pub league: LabelEncoder,
    pub outcome: LabelEncoder,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelBundleArtifact {
    pub version: u32,
    pub generated_at: String,
    #[serde(default)]
    pub source: Option<String>,
    pub feature_names: Vec<String>,
    pub encoders: EncodersArtifact,
    pub scaler: StandardScaler,
    pub classifier: LogisticClassifier,
    #[serde(default)]
    pub regressors: HashMap<String, LinearRegressor>,
}

/// Everything fitted offline, validated and ready to serve. Never mutated after load.
pub struct ModelBundle {
    pub feature_layout: Vec<Feature>,
    pub encoders: Encoders,
    pub scaler: StandardScaler,
    pub classifier: OutcomeClassifier,
    pub regressors: RegressorSet,
    pub fingerprint: String,
    pub generated_at: String,
}

impl ModelBundle {
    pub fn from_artifact(artifact: ModelBundleArtifact, fingerprint: String) -> Result<Self> {
        if artifact.version != SUPPORTED_VERSION {
            return Err(anyhow!(
                "unsupported model bundle version {} (expected {SUPPORTED_VERSION})",
                artifact.version
            ));
        }

        let mut feature_layout = Vec::with_capacity(artifact.feature_names.len());
        for name in &artifact.feature_names {
            let feature =
                Feature::from_name(name).ok_or_else(|| anyhow!("unknown feature name {name:?}"))?;
            if feature_layout.contains(&feature) {
                return Err(anyhow!("feature {name:?} listed twice"));
            }
            feature_layout.push(feature);
        }
        let width = feature_layout.len();
        if width == 0 {
            return Err(anyhow!("model bundle declares no features"));
        }
        if artifact.scaler.means.len() != width || artifact.scaler.scales.len() != width {
            return Err(anyhow!(
                "scaler fitted on {}/{} columns, layout has {width}",
                artifact.scaler.means.len(),
                artifact.scaler.scales.len()
            ));
        }

        let EncodersArtifact {
            home_team,
            away_team,
            league,
            outcome,
        } = artifact.encoders;
        for (field, enc) in [
            (CategoricalField::HomeTeam, &home_team),
            (CategoricalField::AwayTeam, &away_team),
            (CategoricalField::League, &league),
            (CategoricalField::Outcome, &outcome),
        ] {
            if enc.is_empty() {
                return Err(anyhow!("encoder {field} has no classes"));
            }
        }

        artifact
            .classifier
            .validate(width)
            .context("validate classifier")?;
        let classifier = OutcomeClassifier::new(Box::new(artifact.classifier), &outcome)
            .context("map classifier classes")?;

        let mut regressors = RegressorSet::default();
        for (key, model) in artifact.regressors {
            let target = StatTarget::from_key(&key)
                .ok_or_else(|| anyhow!("unknown regressor target {key:?}"))?;
            model
                .validate(width)
                .with_context(|| format!("validate regressor {key}"))?;
            regressors.insert(target, Box::new(model));
        }
        let missing = regressors.missing_targets();
        if !missing.is_empty() {
            warn!(?missing, "model bundle has no regressor for some targets");
        }

        let mut encoders = Encoders::default();
        encoders.insert(CategoricalField::HomeTeam, home_team);
        encoders.insert(CategoricalField::AwayTeam, away_team);
        encoders.insert(CategoricalField::League, league);
        encoders.insert(CategoricalField::Outcome, outcome);

        Ok(Self {
            feature_layout,
            encoders,
            scaler: artifact.scaler,
            classifier,
            regressors,
            fingerprint,
            generated_at: artifact.generated_at,
        })
    }

    /// Sorted union of team names known to either team encoder.
    pub fn known_teams(&self) -> Vec<String> {
        let mut out: Vec<String> = [CategoricalField::HomeTeam, CategoricalField::AwayTeam]
            .into_iter()
            .filter_map(|field| self.encoders.get(field))
            .flat_map(|enc| enc.classes().iter().cloned())
            .collect();
        out.sort_by_key(|name| name.to_lowercase());
        out.dedup_by(|a, b| a.eq_ignore_ascii_case(b));
        out
    }
}

pub fn parse_bundle(raw: &str) -> Result<ModelBundle> {
    let artifact =
        serde_json::from_str::<ModelBundleArtifact>(raw).context("parse model bundle json")?;
    ModelBundle::from_artifact(artifact, fingerprint(raw.as_bytes()))
}

pub fn load_bundle(path: &Path) -> Result<ModelBundle> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("read model bundle {}", path.display()))?;
    let bundle =
        parse_bundle(&raw).with_context(|| format!("load model bundle {}", path.display()))?;
    info!(
        path = %path.display(),
        fingerprint = %short_fingerprint(&bundle.fingerprint),
        generated_at = %bundle.generated_at,
        features = bundle.feature_layout.len(),
        "model bundle loaded"
    );
    Ok(bundle)
}

/// Explicit override first, then the cache dir, then the checked-in assets.
pub fn resolve_bundle_path(override_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = override_path {
        return Some(path.to_path_buf());
    }
    if let Some(path) = default_bundle_cache_path()
        && path.exists()
    {
        return Some(path);
    }
    let assets = PathBuf::from(ASSETS_BUNDLE_PATH);
    assets.exists().then_some(assets)
}

pub fn default_bundle_cache_path() -> Option<PathBuf> {
    app_cache_dir().map(|dir| dir.join(BUNDLE_FILE))
}

pub fn fingerprint(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

pub fn short_fingerprint(full: &str) -> &str {
    full.get(..12).unwrap_or(full)
}
