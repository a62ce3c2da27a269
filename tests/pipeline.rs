mod common;

use rand::SeedableRng;
use rand::rngs::StdRng;

use matchday::classifier::Outcome;
use matchday::predictor::{Degradation, PredictionQuality};
use matchday::regressors::StatTarget;
use matchday::resolver::{ResolutionSource, Role};
use matchday::{ErrorCategory, MatchRequest, Predictor};

use common::{AWAY_FAVOURED, AWAY_ONLY, DRAW_FAVOURED, HOME_FAVOURED};

fn request(home: &str, away: &str) -> MatchRequest {
    MatchRequest {
        home_team: home.to_string(),
        away_team: away.to_string(),
        season: 2025,
    }
}

#[test]
fn probabilities_sum_to_one_and_outcome_is_argmax() {
    let predictor = common::predictor(HOME_FAVOURED);
    for seed in 0..50 {
        let mut rng = StdRng::seed_from_u64(seed);
        let p = predictor
            .predict(&request("Alpha FC", "Beta United"), &mut rng)
            .unwrap();
        let probs = p.probabilities;
        assert!((probs.sum() - 1.0).abs() < 1e-6);
        assert_eq!(p.outcome, Outcome::Home);
        assert!(probs.home >= probs.draw && probs.home >= probs.away);
        assert!((p.confidence - probs.home).abs() < 1e-12);
    }
}

#[test]
fn home_win_always_has_home_ahead() {
    let predictor = common::predictor(HOME_FAVOURED);
    for seed in 0..300 {
        let mut rng = StdRng::seed_from_u64(seed);
        let p = predictor
            .predict(&request("Alpha FC", "Beta United"), &mut rng)
            .unwrap();
        assert!(p.stats.home_goals > p.stats.away_goals, "seed {seed}: {:?}", p.stats);
        assert_eq!(p.winner(), Some("Alpha FC"));
    }
}

#[test]
fn away_win_always_has_away_ahead() {
    let predictor = common::predictor(AWAY_FAVOURED);
    for seed in 0..300 {
        let mut rng = StdRng::seed_from_u64(seed);
        let p = predictor
            .predict(&request("Alpha FC", "Beta United"), &mut rng)
            .unwrap();
        assert_eq!(p.outcome, Outcome::Away);
        assert!(p.stats.away_goals > p.stats.home_goals, "seed {seed}: {:?}", p.stats);
        assert_eq!(p.winner(), Some("Beta United"));
    }
}

#[test]
fn draw_reports_zeroed_stats_but_keeps_expectations() {
    let predictor = common::predictor(DRAW_FAVOURED);
    let mut rng = StdRng::seed_from_u64(11);
    let p = predictor
        .predict(&request("Alpha FC", "Beta United"), &mut rng)
        .unwrap();
    assert_eq!(p.outcome, Outcome::Draw);
    assert_eq!(p.winner(), None);
    assert_eq!(p.stats.home_goals, 0);
    assert_eq!(p.stats.away_goals, 0);
    assert_eq!(p.stats.corners, 0);
    assert_eq!(p.stats.yellow_cards, 0);
    assert_eq!(p.stats.red_cards, 0);

    let expected = p.expected.expect("all regressors present");
    assert!((expected.home_goals - 1.4).abs() < 1e-9);
    assert!((expected.corners - 9.5).abs() < 1e-9);
    assert!((expected.yellow_cards - 4.0).abs() < 1e-9);
}

#[test]
fn same_seed_gives_same_prediction() {
    let predictor = common::predictor(HOME_FAVOURED);
    let req = request("alpha fc", "  BETA   united ");
    let a = predictor.predict(&req, &mut StdRng::seed_from_u64(42)).unwrap();
    let b = predictor.predict(&req, &mut StdRng::seed_from_u64(42)).unwrap();
    assert_eq!(a, b);
    assert_eq!(a.home_team, "Alpha FC");
    assert_eq!(a.away_team, "Beta United");
}

#[test]
fn preparation_is_repeatable() {
    let predictor = common::predictor(HOME_FAVOURED);
    let req = request("Gamma City", "Alpha FC");
    let first = predictor.prepare(&req).unwrap();
    let second = predictor.prepare(&req).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.input.len(), 13);
}

#[test]
fn direct_rows_give_full_quality() {
    let predictor = common::predictor(HOME_FAVOURED);
    let mut rng = StdRng::seed_from_u64(3);
    let p = predictor
        .predict(&request("Alpha FC", "Beta United"), &mut rng)
        .unwrap();
    assert_eq!(p.quality, PredictionQuality::Full);
    assert_eq!(p.league, "League Two");

    let prepared = predictor.prepare(&request("Alpha FC", "Beta United")).unwrap();
    assert_eq!(prepared.home.rows_matched, 2);
    assert!((prepared.home.means.corners - 52.0).abs() < 1e-9);
    assert!((prepared.away.means.yellow_cards - 23.0).abs() < 1e-9);
}

#[test]
fn opposite_role_rows_are_used_and_flagged() {
    let predictor = common::predictor(HOME_FAVOURED);
    // Beta United never played at home.
    let prepared = predictor.prepare(&request("Beta United", "Alpha FC")).unwrap();
    assert_eq!(prepared.home.source, ResolutionSource::Swapped);
    assert!((prepared.home.means.corners - 41.0).abs() < 1e-9);
    assert!(prepared.degradations.contains(&Degradation::RoleSwap {
        team: "Beta United".to_string(),
        role: Role::Home,
    }));
}

#[test]
fn teams_without_rows_fall_back_to_defaults() {
    let predictor = common::predictor(HOME_FAVOURED);
    let mut rng = StdRng::seed_from_u64(5);
    let p = predictor
        .predict(&request("Delta Town", "Epsilon Athletic"), &mut rng)
        .unwrap();
    let PredictionQuality::Degraded(reasons) = &p.quality else {
        panic!("expected degraded quality, got {:?}", p.quality);
    };
    assert!(reasons.contains(&Degradation::DefaultStats {
        team: "Delta Town".to_string(),
        role: Role::Home,
    }));
    assert!(reasons.contains(&Degradation::DefaultStats {
        team: "Epsilon Athletic".to_string(),
        role: Role::Away,
    }));
    assert!(reasons.contains(&Degradation::LeagueDefaulted {
        league: "League One".to_string(),
    }));
}

#[test]
fn league_comes_from_the_away_side_when_home_has_none() {
    let predictor = common::predictor(HOME_FAVOURED);
    let prepared = predictor.prepare(&request("Delta Town", "Beta United")).unwrap();
    assert_eq!(prepared.league, "League Two");
    assert!(
        !prepared
            .degradations
            .iter()
            .any(|d| matches!(d, Degradation::LeagueDefaulted { .. }))
    );
}

#[test]
fn unknown_team_is_reported_by_role() {
    let predictor = common::predictor(HOME_FAVOURED);
    let mut rng = StdRng::seed_from_u64(1);
    let err = predictor
        .predict(&request("Zzyzx FC", "Beta United"), &mut rng)
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::UnknownTeam);

    // Known to the away encoder only.
    let err = predictor
        .predict(&request(AWAY_ONLY, "Beta United"), &mut rng)
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::UnknownTeam);
    assert!(
        predictor
            .predict(&request("Gamma City", AWAY_ONLY), &mut rng)
            .is_ok()
    );
}

#[test]
fn invalid_requests_are_rejected_before_lookup() {
    for (home, away) in [("", "Beta United"), ("Alpha FC", "   "), ("Alpha FC", " alpha  fc")] {
        let err = Predictor::validate(&request(home, away)).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::InvalidInput, "{home:?} vs {away:?}");
    }
}

#[test]
fn missing_regressors_degrade_instead_of_failing() {
    let mut value = common::bundle_json(HOME_FAVOURED);
    let regs = value["regressors"].as_object_mut().unwrap();
    regs.remove("corners");
    regs.remove("away_goals");
    let predictor = Predictor::new(common::bundle_from(&value), common::dataset());

    for seed in 0..100 {
        let mut rng = StdRng::seed_from_u64(seed);
        let p = predictor
            .predict(&request("Alpha FC", "Beta United"), &mut rng)
            .unwrap();
        assert!(p.stats.home_goals > p.stats.away_goals);
        assert_eq!(p.stats.corners, 0);
        assert!(p.expected.is_none());
        let PredictionQuality::Degraded(reasons) = &p.quality else {
            panic!("expected degraded quality");
        };
        assert!(reasons.contains(&Degradation::MissingRegressor {
            target: StatTarget::Corners
        }));
        assert!(reasons.contains(&Degradation::MissingRegressor {
            target: StatTarget::AwayGoals
        }));
    }
}

#[test]
fn classify_is_deterministic_and_needs_no_rng() {
    let predictor = common::predictor(DRAW_FAVOURED);
    let a = predictor.classify(&request("Gamma City", "Alpha FC")).unwrap();
    let b = predictor.classify(&request("Gamma City", "Alpha FC")).unwrap();
    assert_eq!(a, b);
    assert_eq!(a.outcome, Outcome::Draw);
}

#[test]
fn runaway_goal_regressor_is_an_internal_error() {
    let mut value = common::bundle_json(HOME_FAVOURED);
    value["regressors"]["away_goals"]["intercept"] = serde_json::json!(40.0);
    let predictor = Predictor::new(common::bundle_from(&value), common::dataset());

    let mut rng = StdRng::seed_from_u64(1);
    let err = predictor
        .predict(&request("Alpha FC", "Beta United"), &mut rng)
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Internal);
}
