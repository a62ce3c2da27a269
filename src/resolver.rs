use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::dataset::{HistoricalDataset, HistoricalRow, SideStats};
use crate::encoding::Encoders;
use crate::error::{CategoricalField, PredictError, PredictResult};

/// Per-field fallback when a team has no rows in either role.
pub const DEFAULT_SIDE_STATS: SideStats = SideStats {
    corners: 45.0,
    yellow_cards: 20.0,
    red_cards: 1.0,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Home,
    Away,
}

impl Role {
    pub fn opposite(self) -> Role {
        match self {
            Role::Home => Role::Away,
            Role::Away => Role::Home,
        }
    }

    pub fn encoder_field(self) -> CategoricalField {
        match self {
            Role::Home => CategoricalField::HomeTeam,
            Role::Away => CategoricalField::AwayTeam,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Home => f.write_str("home"),
            Role::Away => f.write_str("away"),
        }
    }
}

/// Where the statistics of a resolved team came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionSource {
    Direct,
    /// Rows from the opposite role, read through that role's columns.
    Swapped,
    Defaulted,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedTeam {
    /// Name as the encoder knows it.
    pub name: String,
    pub role: Role,
    pub source: ResolutionSource,
    pub rows_matched: usize,
    pub means: SideStats,
    /// Most frequent league among the matched rows.
    pub league: Option<String>,
}

pub fn normalize_team_name(input: &str) -> String {
    input
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

pub fn resolve_team(
    dataset: &HistoricalDataset,
    encoders: &Encoders,
    name: &str,
    role: Role,
) -> PredictResult<ResolvedTeam> {
    let name_norm = normalize_team_name(name);
    if name_norm.is_empty() {
        return Err(PredictError::InvalidInput(format!("{role} team name is empty")));
    }

    let canonical = encoders
        .get(role.encoder_field())
        .and_then(|enc| enc.canonical(&name_norm))
        .ok_or_else(|| PredictError::UnknownTeam {
            name: name.trim().to_string(),
            role,
        })?
        .to_string();

    let direct = dataset.rows_for(&name_norm, role);
    if !direct.is_empty() {
        return Ok(summarize(canonical, role, ResolutionSource::Direct, &direct, role));
    }

    let swapped_role = role.opposite();
    let swapped = dataset.rows_for(&name_norm, swapped_role);
    if !swapped.is_empty() {
        warn!(
            team = %canonical,
            %role,
            rows = swapped.len(),
            "no rows in requested role, using opposite-role statistics"
        );
        return Ok(summarize(
            canonical,
            role,
            ResolutionSource::Swapped,
            &swapped,
            swapped_role,
        ));
    }

    warn!(team = %canonical, %role, "no historical rows, using default statistics");
    Ok(ResolvedTeam {
        name: canonical,
        role,
        source: ResolutionSource::Defaulted,
        rows_matched: 0,
        means: DEFAULT_SIDE_STATS,
        league: None,
    })
}

fn summarize(
    name: String,
    role: Role,
    source: ResolutionSource,
    rows: &[&HistoricalRow],
    columns: Role,
) -> ResolvedTeam {
    ResolvedTeam {
        name,
        role,
        source,
        rows_matched: rows.len(),
        means: mean_side_stats(rows, columns),
        league: dominant_league(rows),
    }
}

fn mean_side_stats(rows: &[&HistoricalRow], columns: Role) -> SideStats {
    if rows.is_empty() {
        return DEFAULT_SIDE_STATS;
    }
    let mut sum = SideStats::default();
    for row in rows {
        let side = row.side(columns);
        sum.corners += side.corners;
        sum.yellow_cards += side.yellow_cards;
        sum.red_cards += side.red_cards;
    }
    let n = rows.len() as f64;
    SideStats {
        corners: sum.corners / n,
        yellow_cards: sum.yellow_cards / n,
        red_cards: sum.red_cards / n,
    }
}

// Ties go to the lexicographically smallest league so repeated calls agree.
fn dominant_league(rows: &[&HistoricalRow]) -> Option<String> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for row in rows {
        let league = row.league.trim();
        if !league.is_empty() {
            *counts.entry(league).or_insert(0) += 1;
        }
    }
    let mut best: Option<(&str, usize)> = None;
    for (league, count) in counts {
        if best.is_none_or(|(_, c)| count > c) {
            best = Some((league, count));
        }
    }
    best.map(|(league, _)| league.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::LabelEncoder;

    fn row(home: &str, away: &str, league: &str, home_corners: f64, away_corners: f64) -> HistoricalRow {
        HistoricalRow {
            home_team: home.to_string(),
            away_team: away.to_string(),
            league: league.to_string(),
            season: 2024,
            home_avg_corners: home_corners,
            home_avg_yellow_cards: 20.0,
            home_avg_red_cards: 1.0,
            away_avg_corners: away_corners,
            away_avg_yellow_cards: 30.0,
            away_avg_red_cards: 3.0,
        }
    }

    fn encoders(teams: &[&str]) -> Encoders {
        let classes: Vec<String> = teams.iter().map(|t| t.to_string()).collect();
        let mut enc = Encoders::default();
        enc.insert(CategoricalField::HomeTeam, LabelEncoder::new(classes.clone()));
        enc.insert(CategoricalField::AwayTeam, LabelEncoder::new(classes));
        enc
    }

    #[test]
    fn normalize_trims_lowercases_and_collapses_spaces() {
        assert_eq!(normalize_team_name("  Real   Madrid "), "real madrid");
        assert_eq!(normalize_team_name("\tBETIS\n"), "betis");
    }

    #[test]
    fn direct_rows_are_averaged() {
        let ds = HistoricalDataset::from_rows(vec![
            row("Alpha", "Beta", "L1", 50.0, 10.0),
            row("alpha", "Gamma", "L1", 60.0, 10.0),
        ]);
        let enc = encoders(&["Alpha", "Beta", "Gamma"]);
        let r = resolve_team(&ds, &enc, " ALPHA ", Role::Home).unwrap();
        assert_eq!(r.source, ResolutionSource::Direct);
        assert_eq!(r.rows_matched, 2);
        assert_eq!(r.means.corners, 55.0);
        assert_eq!(r.name, "Alpha");
        assert_eq!(r.league.as_deref(), Some("L1"));
    }

    #[test]
    fn missing_role_falls_back_to_opposite_columns() {
        let ds = HistoricalDataset::from_rows(vec![row("Alpha", "Beta", "L1", 50.0, 12.0)]);
        let enc = encoders(&["Alpha", "Beta"]);
        let r = resolve_team(&ds, &enc, "Beta", Role::Home).unwrap();
        assert_eq!(r.source, ResolutionSource::Swapped);
        assert_eq!(r.means.corners, 12.0);
        assert_eq!(r.means.yellow_cards, 30.0);
    }

    #[test]
    fn no_rows_anywhere_uses_defaults() {
        let ds = HistoricalDataset::from_rows(vec![row("Alpha", "Beta", "L1", 50.0, 12.0)]);
        let enc = encoders(&["Alpha", "Beta", "Delta"]);
        let r = resolve_team(&ds, &enc, "Delta", Role::Away).unwrap();
        assert_eq!(r.source, ResolutionSource::Defaulted);
        assert_eq!(r.means, DEFAULT_SIDE_STATS);
        assert!(r.league.is_none());
    }

    #[test]
    fn name_without_encoding_is_unknown_team() {
        let ds = HistoricalDataset::from_rows(vec![row("Alpha", "Beta", "L1", 50.0, 12.0)]);
        let enc = encoders(&["Alpha", "Beta"]);
        let err = resolve_team(&ds, &enc, "Zzyzx FC", Role::Home).unwrap_err();
        assert!(matches!(err, PredictError::UnknownTeam { role: Role::Home, .. }));
    }

    #[test]
    fn dominant_league_breaks_ties_alphabetically() {
        let rows = [
            row("A", "B", "Serie A", 1.0, 1.0),
            row("A", "C", "La Liga", 1.0, 1.0),
        ];
        let refs: Vec<&HistoricalRow> = rows.iter().collect();
        assert_eq!(dominant_league(&refs).as_deref(), Some("La Liga"));
    }
}
