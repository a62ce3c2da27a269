use serde::Serialize;

use crate::dataset::SideStats;
use crate::error::CategoricalField;
use crate::resolver::ResolvedTeam;

/// Columns the scaler and models may be fitted on, in canonical order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    HomeTeam,
    AwayTeam,
    League,
    Season,
    HomeAvgCorners,
    HomeAvgYellowCards,
    HomeAvgRedCards,
    AwayAvgCorners,
    AwayAvgYellowCards,
    AwayAvgRedCards,
    TotalAvgCorners,
    TotalAvgYellowCards,
    TotalAvgRedCards,
}

impl Feature {
    pub const ALL: [Feature; 13] = [
        Feature::HomeTeam,
        Feature::AwayTeam,
        Feature::League,
        Feature::Season,
        Feature::HomeAvgCorners,
        Feature::HomeAvgYellowCards,
        Feature::HomeAvgRedCards,
        Feature::AwayAvgCorners,
        Feature::AwayAvgYellowCards,
        Feature::AwayAvgRedCards,
        Feature::TotalAvgCorners,
        Feature::TotalAvgYellowCards,
        Feature::TotalAvgRedCards,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Feature::HomeTeam => "home_team",
            Feature::AwayTeam => "away_team",
            Feature::League => "league",
            Feature::Season => "season",
            Feature::HomeAvgCorners => "home_avg_corners",
            Feature::HomeAvgYellowCards => "home_avg_yellow_cards",
            Feature::HomeAvgRedCards => "home_avg_red_cards",
            Feature::AwayAvgCorners => "away_avg_corners",
            Feature::AwayAvgYellowCards => "away_avg_yellow_cards",
            Feature::AwayAvgRedCards => "away_avg_red_cards",
            Feature::TotalAvgCorners => "total_avg_corners",
            Feature::TotalAvgYellowCards => "total_avg_yellow_cards",
            Feature::TotalAvgRedCards => "total_avg_red_cards",
        }
    }

    pub fn from_name(name: &str) -> Option<Feature> {
        let want = name.trim().to_ascii_lowercase();
        Feature::ALL.into_iter().find(|f| f.name() == want)
    }

    pub fn categorical_field(self) -> Option<CategoricalField> {
        match self {
            Feature::HomeTeam => Some(CategoricalField::HomeTeam),
            Feature::AwayTeam => Some(CategoricalField::AwayTeam),
            Feature::League => Some(CategoricalField::League),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FeatureValue {
    /// Raw categorical name, encoded later.
    Category(String),
    Number(f64),
}

/// Ordered feature mapping for one matchup.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeatureVector {
    fields: Vec<(Feature, FeatureValue)>,
}

impl FeatureVector {
    pub fn get(&self, feature: Feature) -> Option<&FeatureValue> {
        self.fields
            .iter()
            .find(|(f, _)| *f == feature)
            .map(|(_, v)| v)
    }

    pub fn number(&self, feature: Feature) -> Option<f64> {
        match self.get(feature)? {
            FeatureValue::Number(x) => Some(*x),
            FeatureValue::Category(_) => None,
        }
    }

    pub fn set(&mut self, feature: Feature, value: FeatureValue) {
        if let Some(slot) = self.fields.iter_mut().find(|(f, _)| *f == feature) {
            slot.1 = value;
        } else {
            self.fields.push((feature, value));
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &(Feature, FeatureValue)> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// total_avg_X = (home_avg_X + away_avg_X) / 2
pub fn combined_totals(home: SideStats, away: SideStats) -> SideStats {
    SideStats {
        corners: (home.corners + away.corners) / 2.0,
        yellow_cards: (home.yellow_cards + away.yellow_cards) / 2.0,
        red_cards: (home.red_cards + away.red_cards) / 2.0,
    }
}

pub fn build_features(
    home: &ResolvedTeam,
    away: &ResolvedTeam,
    league: &str,
    season: i32,
) -> FeatureVector {
    let h = home.means;
    let a = away.means;
    let total = combined_totals(h, a);

    let mut out = FeatureVector::default();
    for feature in Feature::ALL {
        let value = match feature {
            Feature::HomeTeam => FeatureValue::Category(home.name.clone()),
            Feature::AwayTeam => FeatureValue::Category(away.name.clone()),
            Feature::League => FeatureValue::Category(league.to_string()),
            Feature::Season => FeatureValue::Number(season as f64),
            Feature::HomeAvgCorners => FeatureValue::Number(h.corners),
            Feature::HomeAvgYellowCards => FeatureValue::Number(h.yellow_cards),
            Feature::HomeAvgRedCards => FeatureValue::Number(h.red_cards),
            Feature::AwayAvgCorners => FeatureValue::Number(a.corners),
            Feature::AwayAvgYellowCards => FeatureValue::Number(a.yellow_cards),
            Feature::AwayAvgRedCards => FeatureValue::Number(a.red_cards),
            Feature::TotalAvgCorners => FeatureValue::Number(total.corners),
            Feature::TotalAvgYellowCards => FeatureValue::Number(total.yellow_cards),
            Feature::TotalAvgRedCards => FeatureValue::Number(total.red_cards),
        };
        out.set(feature, value);
    }
    out
}
