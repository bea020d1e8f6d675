use crate::math::{heading_vector, Point2d, Vector2d};
use crate::VehicleId;

/// Why a vehicle finished.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EndReason {
    /// The vehicle passed through the corridor's exit edge.
    ReachedExit,
    /// The vehicle came within collision range of another vehicle.
    VehicleCollision,
    /// The vehicle came within collision range of a corridor wall.
    WallCollision,
}

/// A simulated vehicle.
///
/// Vehicles stay in the population for the whole run; a finished vehicle is
/// excluded from every further computation but keeps its final state as the
/// log record of its lifespan.
#[derive(Clone, Debug)]
pub struct Vehicle {
    /// The vehicle's ID.
    pub(crate) id: VehicleId,
    /// The world space position.
    pos: Point2d,
    /// The heading in radians.
    heading: f64,
    /// The speed in m/s.
    vel: f64,
    /// The collision radius in m.
    radius: f64,
    /// The simulated time at which the vehicle spawns.
    t_init: f64,
    /// The simulated time at which the vehicle finished.
    t_end: f64,
    /// Index of the mesh cell the vehicle is currently inside.
    cell: usize,
    /// Whether the vehicle has spawned and not yet finished.
    active: bool,
    /// Whether the vehicle has left the simulation.
    finished: bool,
    /// Why the vehicle finished, once it has.
    reason: Option<EndReason>,
}

impl Vehicle {
    /// Creates a vehicle scheduled to spawn at `t_init` in the entry cell.
    pub(crate) fn new(
        id: VehicleId,
        pos: Point2d,
        heading: f64,
        vel: f64,
        radius: f64,
        t_init: f64,
    ) -> Self {
        Self {
            id,
            pos,
            heading,
            vel,
            radius,
            t_init,
            t_end: f64::INFINITY,
            cell: 0,
            active: false,
            finished: false,
            reason: None,
        }
    }

    /// Gets the vehicle's ID.
    pub fn id(&self) -> VehicleId {
        self.id
    }

    /// The coordinates in world space of the vehicle.
    pub fn position(&self) -> Point2d {
        self.pos
    }

    /// The heading in radians.
    pub fn heading(&self) -> f64 {
        self.heading
    }

    /// A unit vector in world space aligned with the vehicle's heading.
    pub fn direction(&self) -> Vector2d {
        heading_vector(self.heading)
    }

    /// The vehicle's speed in m/s.
    pub fn vel(&self) -> f64 {
        self.vel
    }

    /// The collision radius in m.
    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// The simulated time at which the vehicle spawns.
    pub fn spawn_time(&self) -> f64 {
        self.t_init
    }

    /// The simulated time at which the vehicle finished,
    /// or +infinity while it has not.
    pub fn end_time(&self) -> f64 {
        self.t_end
    }

    /// Index of the mesh cell the vehicle is currently inside.
    pub fn cell(&self) -> usize {
        self.cell
    }

    /// Whether the vehicle has spawned and not yet finished.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Whether the vehicle has left the simulation.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Whether the vehicle is still waiting for its spawn time.
    pub fn is_pending(&self) -> bool {
        !self.active && !self.finished
    }

    /// Why the vehicle finished, once it has.
    pub fn end_reason(&self) -> Option<EndReason> {
        self.reason
    }

    /// Marks the vehicle active. Called exactly once, on the first step
    /// whose time window contains the spawn time.
    pub(crate) fn activate(&mut self) {
        self.active = true;
    }

    /// Moves the vehicle into another mesh cell.
    pub(crate) fn set_cell(&mut self, idx: usize) {
        self.cell = idx;
    }

    /// Advances the position with constant-velocity integration.
    ///
    /// A supplied heading is adopted before integrating (instantaneous
    /// reorientation). Does nothing unless the vehicle is active.
    pub(crate) fn propagate(&mut self, dt: f64, desired_heading: Option<f64>) {
        if !self.active || self.finished {
            return;
        }
        if let Some(heading) = desired_heading {
            self.heading = heading;
        }
        self.pos.x += self.vel * self.heading.cos() * dt;
        self.pos.y += self.vel * self.heading.sin() * dt;
    }

    /// Removes the vehicle from further simulation, recording when and why.
    pub(crate) fn terminate(&mut self, t: f64, reason: EndReason) {
        if self.finished {
            return;
        }
        self.active = false;
        self.finished = true;
        self.t_end = t;
        self.reason = Some(reason);
    }
}
