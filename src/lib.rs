pub use boundary::BoundaryCurve;
pub use cgmath;
pub use config::{MapKind, SimulationConfig};
pub use error::SimError;
pub use mesh::{CellLookup, ClosestVertex, TriangleCell, TriangleMesh, TriangulationStrategy};
pub use metrics::{Metrics, Sample};
pub use simulation::{DistanceMatrix, FollowCellDirection, Simulation, SteppingPolicy};
use slotmap::{new_key_type, SlotMap};
pub use slotmap::{Key, KeyData};
pub use vehicle::{EndReason, Vehicle};

mod boundary;
mod config;
mod error;
pub mod math;
mod mesh;
mod metrics;
mod simulation;
mod vehicle;

new_key_type! {
    /// Unique ID of a [Vehicle].
    pub struct VehicleId;
}

type VehicleSet = SlotMap<VehicleId, Vehicle>;
