use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::resolver::Role;

/// Categorical field the encoders know about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoricalField {
    HomeTeam,
    AwayTeam,
    League,
    Outcome,
}

impl CategoricalField {
    pub const ALL: [CategoricalField; 4] = [
        CategoricalField::HomeTeam,
        CategoricalField::AwayTeam,
        CategoricalField::League,
        CategoricalField::Outcome,
    ];

    pub fn key(self) -> &'static str {
        match self {
            CategoricalField::HomeTeam => "home_team",
            CategoricalField::AwayTeam => "away_team",
            CategoricalField::League => "league",
            CategoricalField::Outcome => "outcome",
        }
    }
}

impl fmt::Display for CategoricalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Error)]
pub enum PredictError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("unknown team: {name} (not recognised as {role} team)")]
    UnknownTeam { name: String, role: Role },

    #[error("unknown category for {field}: {value}")]
    UnknownCategory {
        field: CategoricalField,
        value: String,
    },

    #[error("model invocation failed: {0}")]
    Model(String),
}

/// Stable, transport-independent classification of a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    InvalidInput,
    UnknownTeam,
    UnknownCategory,
    Internal,
}

impl PredictError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            PredictError::InvalidInput(_) => ErrorCategory::InvalidInput,
            PredictError::UnknownTeam { .. } => ErrorCategory::UnknownTeam,
            PredictError::UnknownCategory { .. } => ErrorCategory::UnknownCategory,
            PredictError::Model(_) => ErrorCategory::Internal,
        }
    }

    /// Whether the caller can fix this by changing the request.
    pub fn is_user_facing(&self) -> bool {
        self.category() != ErrorCategory::Internal
    }
}

pub type PredictResult<T> = std::result::Result<T, PredictError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categories_separate_user_errors_from_internal() {
        let unknown = PredictError::UnknownTeam {
            name: "Zzyzx FC".to_string(),
            role: Role::Home,
        };
        assert_eq!(unknown.category(), ErrorCategory::UnknownTeam);
        assert!(unknown.is_user_facing());
        assert!(unknown.to_string().contains("Zzyzx FC"));

        let model = PredictError::Model("width mismatch".to_string());
        assert_eq!(model.category(), ErrorCategory::Internal);
        assert!(!model.is_user_facing());
    }
}
