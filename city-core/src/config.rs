use serde::{Deserialize, Serialize};

use crate::error::DataError;

/// Tuning for the settlement growth model and the host world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Seconds between satisfaction updates
    pub needs_interval: f32,
    /// Seconds between resident migrations
    pub residents_interval: f32,
    /// Per-update change of a resource satisfaction value
    pub satisfaction_step: f32,
    /// Aggregate strictly above this attracts a resident
    pub grow_threshold: f32,
    /// Aggregate strictly below this loses a resident
    pub shrink_threshold: f32,
    /// Aggregate at or above this makes a full residence eligible for promotion
    pub promotion_threshold: f32,
    /// Residents of the current tier the owner must have before promoting
    pub promotion_quota: u32,
    /// Search radius for need buildings and for the hub at build time
    pub need_search_radius: f32,
    /// Delivery cart speed, units per second
    pub barrow_speed: f32,
    /// Distance at which a delivery cart counts as arrived
    pub acceptance_radius: f32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            needs_interval: 1.0,
            residents_interval: 3.0,
            satisfaction_step: 0.03,
            grow_threshold: 0.65,
            shrink_threshold: 0.50,
            promotion_threshold: 0.95,
            promotion_quota: 90,
            need_search_radius: 1500.0,
            barrow_speed: 300.0,
            acceptance_radius: 50.0,
        }
    }
}

impl SimConfig {
    pub fn from_json(text: &str) -> Result<Self, DataError> {
        let config: SimConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), DataError> {
        if self.needs_interval <= 0.0 || self.residents_interval <= 0.0 {
            return Err(DataError::InvalidConfig(
                "update intervals must be positive".to_string(),
            ));
        }
        if !(self.satisfaction_step > 0.0 && self.satisfaction_step <= 1.0) {
            return Err(DataError::InvalidConfig(format!(
                "satisfaction_step {} outside (0, 1]",
                self.satisfaction_step
            )));
        }
        if self.shrink_threshold > self.grow_threshold {
            return Err(DataError::InvalidConfig(format!(
                "shrink_threshold {} above grow_threshold {}",
                self.shrink_threshold, self.grow_threshold
            )));
        }
        if self.need_search_radius < 0.0 || self.acceptance_radius < 0.0 {
            return Err(DataError::InvalidConfig(
                "radii must not be negative".to_string(),
            ));
        }
        if self.barrow_speed <= 0.0 {
            return Err(DataError::InvalidConfig(
                "barrow_speed must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
