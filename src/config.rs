use crate::boundary::BoundaryCurve;
use crate::error::SimError;
use crate::math::Point2d;
use serde::Deserialize;
use std::path::Path;

/// Tag identifying which triangulation variant a map was prepared for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MapKind {
    /// A two-wall corridor for the closest-vertex strategy.
    Corridor,
    /// A corridor prepared for a constant-turn-radius strategy.
    TurnRadius,
}

/// The simulation parameters, loaded once before engine construction.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SimulationConfig {
    /// Map type tag; must match the triangulation strategy in use.
    pub map: MapKind,
    /// The left corridor wall, entry end first.
    pub left_boundary: Vec<[f64; 2]>,
    /// The right corridor wall, entry end first.
    pub right_boundary: Vec<[f64; 2]>,
    /// Vehicles spawned per unit of simulated time.
    pub spawn_frequency: f64,
    /// Spawning stops after this much simulated time.
    pub horizon: Option<f64>,
    /// Explicit number of vehicles; takes precedence over `horizon`.
    pub vehicle_count: Option<usize>,
    /// Nominal vehicle speed.
    pub velocity: f64,
    /// Standard deviation of the per-vehicle speed adjustment factor;
    /// zero gives every vehicle the nominal speed.
    #[serde(default)]
    pub speed_stddev: f64,
    /// Seed for the spawn schedule's random generator.
    pub seed: u64,
    /// Vehicle collision radius.
    pub collision_radius: f64,
    /// Fixed timestep.
    pub time_step: f64,
    /// Terminate pairs of vehicles that come within collision range
    /// of each other. Off by default.
    #[serde(default)]
    pub vehicle_collisions: bool,
}

impl SimulationConfig {
    /// Loads and validates a configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, SimError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|err| SimError::config(format!("cannot read {}: {err}", path.display())))?;
        Self::from_json(&raw)
    }

    /// Parses and validates a configuration from a JSON string.
    pub fn from_json(raw: &str) -> Result<Self, SimError> {
        let config: Self =
            serde_json::from_str(raw).map_err(|err| SimError::config(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the configuration for missing or inconsistent fields.
    pub fn validate(&self) -> Result<(), SimError> {
        if self.vehicle_count.is_none() && self.horizon.is_none() {
            return Err(SimError::config(
                "either `vehicle_count` or `horizon` must be given",
            ));
        }
        if let Some(horizon) = self.horizon {
            if !horizon.is_finite() || horizon <= 0.0 {
                return Err(SimError::config("`horizon` must be positive and finite"));
            }
        }
        if self.speed_stddev < 0.0 {
            return Err(SimError::config("`speed_stddev` must not be negative"));
        }
        Ok(())
    }

    /// The two corridor walls as boundary curves.
    pub fn boundary_curves(&self) -> Result<(BoundaryCurve, BoundaryCurve), SimError> {
        let to_curve = |points: &[[f64; 2]]| {
            BoundaryCurve::new(points.iter().map(|&[x, y]| Point2d::new(x, y)).collect())
        };
        Ok((to_curve(&self.left_boundary)?, to_curve(&self.right_boundary)?))
    }

    /// The number of vehicles to schedule.
    pub fn num_vehicles(&self) -> usize {
        match (self.vehicle_count, self.horizon) {
            (Some(count), _) => count,
            (None, Some(horizon)) => (horizon * self.spawn_frequency).floor() as usize + 1,
            (None, None) => 0,
        }
    }
}
