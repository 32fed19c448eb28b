use thiserror::Error;

/// Failure to load game data (rules, config, scenarios).
///
/// Gameplay itself never fails outward: operations that cannot proceed are
/// no-ops that report an outcome enum instead.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("malformed game data: {0}")]
    Json(#[from] serde_json::Error),

    #[error("upgrade rule '{0}' is defined more than once")]
    DuplicateRule(String),

    #[error("no needs defined for tier {0}")]
    UnknownTier(String),

    #[error("scenario references unknown building '{0}'")]
    UnknownBuilding(String),

    #[error("scenario defines site '{0}' more than once")]
    DuplicateSite(String),

    #[error("invalid config: {0}")]
    InvalidConfig(String),
}
