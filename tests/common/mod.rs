#![allow(dead_code)]

use serde_json::{Value, json};

use matchday::Predictor;
use matchday::artifact::{ModelBundle, parse_bundle};
use matchday::dataset::{HistoricalDataset, HistoricalRow};
use matchday::features::Feature;

pub const TEAMS: [&str; 5] = [
    "Alpha FC",
    "Beta United",
    "Delta Town",
    "Epsilon Athletic",
    "Gamma City",
];

/// Only the away encoder knows this side.
pub const AWAY_ONLY: &str = "Omega Rovers";

pub fn row(home: &str, away: &str, league: &str, season: i32, h: [f64; 3], a: [f64; 3]) -> HistoricalRow {
    HistoricalRow {
        home_team: home.to_string(),
        away_team: away.to_string(),
        league: league.to_string(),
        season,
        home_avg_corners: h[0],
        home_avg_yellow_cards: h[1],
        home_avg_red_cards: h[2],
        away_avg_corners: a[0],
        away_avg_yellow_cards: a[1],
        away_avg_red_cards: a[2],
    }
}

/// Alpha has home and away rows, Beta only away rows, Gamma only home rows,
/// Delta and Epsilon none at all.
pub fn dataset() -> HistoricalDataset {
    HistoricalDataset::from_rows(vec![
        row("Alpha FC", "Beta United", "League Two", 2023, [50.0, 18.0, 1.0], [42.0, 22.0, 2.0]),
        row("Alpha FC", "Beta United", "League Two", 2024, [54.0, 16.0, 0.0], [40.0, 24.0, 1.0]),
        row("Gamma City", "Alpha FC", "League Two", 2024, [44.0, 21.0, 1.0], [48.0, 19.0, 1.0]),
        row("Gamma City", "Omega Rovers", "League One", 2024, [46.0, 20.0, 2.0], [38.0, 26.0, 3.0]),
    ])
}

fn zeros() -> Vec<f64> {
    vec![0.0; Feature::ALL.len()]
}

/// Bundle JSON with constant class scores; `intercepts` follow the outcome
/// encoder order `A, D, H`.
pub fn bundle_json(intercepts: [f64; 3]) -> Value {
    let width = Feature::ALL.len();
    let mut away_teams: Vec<&str> = TEAMS.to_vec();
    away_teams.push(AWAY_ONLY);
    away_teams.sort();

    json!({
        "version": 1,
        "generated_at": "2025-08-01T00:00:00Z",
        "feature_names": Feature::ALL.iter().map(|f| f.name()).collect::<Vec<_>>(),
        "encoders": {
            "home_team": TEAMS,
            "away_team": away_teams,
            "league": ["League One", "League Two"],
            "outcome": ["A", "D", "H"],
        },
        "scaler": {
            "means": [2.0, 2.5, 0.5, 2022.0, 45.0, 20.0, 1.0, 45.0, 20.0, 1.0, 45.0, 20.0, 1.0],
            "scales": vec![1.0; width],
        },
        "classifier": {
            "classes": [0, 1, 2],
            "coefficients": [zeros(), zeros(), zeros()],
            "intercepts": intercepts,
        },
        "regressors": {
            "home_goals": { "coefficients": zeros(), "intercept": 1.4_f64.ln(), "target_transform": "log" },
            "away_goals": { "coefficients": zeros(), "intercept": 1.1_f64.ln(), "target_transform": "log" },
            "corners": { "coefficients": zeros(), "intercept": 95.0 },
            "yellow_cards": { "coefficients": zeros(), "intercept": 40.0 },
            "red_cards": { "coefficients": zeros(), "intercept": 2.0 },
        },
    })
}

pub fn bundle_from(value: &Value) -> ModelBundle {
    parse_bundle(&value.to_string()).expect("fixture bundle is valid")
}

pub const HOME_FAVOURED: [f64; 3] = [0.0, 0.2, 1.5];
pub const DRAW_FAVOURED: [f64; 3] = [0.0, 1.5, 0.2];
pub const AWAY_FAVOURED: [f64; 3] = [1.5, 0.2, 0.0];

pub fn predictor(intercepts: [f64; 3]) -> Predictor {
    Predictor::new(bundle_from(&bundle_json(intercepts)), dataset())
}
