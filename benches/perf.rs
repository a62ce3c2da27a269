use criterion::{Criterion, criterion_group, criterion_main};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::hint::black_box;

use matchday::Predictor;
use matchday::api::{self, PredictRequest};
use matchday::artifact::parse_bundle;
use matchday::config::Settings;
use matchday::dataset::{HistoricalDataset, HistoricalRow};
use matchday::{MatchRequest, evaluation};
use matchday::evaluation::EvalFixture;

const BUNDLE_JSON: &str = include_str!("../assets/model_bundle.json");

fn sample_dataset() -> HistoricalDataset {
    let teams = [
        ("Arsenal", "Premier League"),
        ("Chelsea", "Premier League"),
        ("Liverpool", "Premier League"),
        ("Manchester City", "Premier League"),
        ("Barcelona", "La Liga"),
        ("Real Madrid", "La Liga"),
        ("Sevilla", "La Liga"),
        ("Valencia", "La Liga"),
    ];
    let mut rows = Vec::new();
    for season in 2019..2025 {
        for (i, (home, league)) in teams.iter().enumerate() {
            let (away, _) = teams[(i + 1 + season as usize % 3) % teams.len()];
            if away == *home {
                continue;
            }
            rows.push(HistoricalRow {
                home_team: home.to_string(),
                away_team: away.to_string(),
                league: league.to_string(),
                season,
                home_avg_corners: 40.0 + i as f64,
                home_avg_yellow_cards: 18.0 + (i % 4) as f64,
                home_avg_red_cards: 1.0,
                away_avg_corners: 44.0 - i as f64 * 0.5,
                away_avg_yellow_cards: 21.0,
                away_avg_red_cards: 1.2,
            });
        }
    }
    HistoricalDataset::from_rows(rows)
}

fn sample_predictor() -> Predictor {
    let bundle = parse_bundle(BUNDLE_JSON).expect("bundled model is valid");
    Predictor::new(bundle, sample_dataset())
}

fn bench_predict(c: &mut Criterion) {
    let predictor = sample_predictor();
    let request = MatchRequest {
        home_team: "Arsenal".to_string(),
        away_team: "Chelsea".to_string(),
        season: 2025,
    };
    let mut rng = StdRng::seed_from_u64(7);

    c.bench_function("predict", |b| {
        b.iter(|| {
            let p = predictor.predict(black_box(&request), &mut rng).unwrap();
            black_box(p.stats.home_goals);
        })
    });
}

fn bench_handle_json(c: &mut Criterion) {
    let predictor = sample_predictor();
    let settings = Settings {
        seed: Some(1),
        ..Settings::default()
    };
    let body = r#"{"home_team": "Real Madrid", "away_team": "Barcelona", "season": 2025}"#;

    c.bench_function("handle_json_predict", |b| {
        b.iter(|| {
            let response = api::handle_json(&predictor, &settings, black_box(body));
            black_box(response.is_success());
        })
    });

    c.bench_function("predict_request_default_season", |b| {
        b.iter(|| {
            let request = PredictRequest {
                home_team: Some("Sevilla".to_string()),
                away_team: Some("Valencia".to_string()),
                ..PredictRequest::default()
            };
            black_box(api::predict(&predictor, &settings, request).is_success());
        })
    });
}

fn bench_evaluate(c: &mut Criterion) {
    let predictor = sample_predictor();
    let names = ["Arsenal", "Chelsea", "Liverpool", "Manchester City"];
    let fixtures: Vec<EvalFixture> = (0..400)
        .map(|i| EvalFixture {
            home_team: names[i % 4].to_string(),
            away_team: names[(i + 1) % 4].to_string(),
            season: 2024,
            home_goals: (i % 3) as u32,
            away_goals: (i % 2) as u32,
        })
        .collect();

    c.bench_function("evaluate_400_fixtures", |b| {
        b.iter(|| {
            let report = evaluation::evaluate_fixtures(&predictor, black_box(&fixtures), 10);
            black_box(report.metrics.brier);
        })
    });
}

criterion_group!(benches, bench_predict, bench_handle_json, bench_evaluate);
criterion_main!(benches);
