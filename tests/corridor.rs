//! End-to-end tests driving the engine through small, exactly-known
//! corridors built by test-local triangulation strategies.

use assert_approx_eq::assert_approx_eq;
use corridor_sim::math::{LineSegment2d, Point2d, Vector2d};
use corridor_sim::{
    BoundaryCurve, EndReason, MapKind, SimError, Simulation, SimulationConfig, TriangleCell,
    TriangleMesh, TriangulationStrategy,
};

fn p(x: f64, y: f64) -> Point2d {
    Point2d::new(x, y)
}

/// A single triangular cell spanning x in [0, 3] with direction (1, 0).
/// Vehicles spawn at exactly (0, 0) because the entry edge is collapsed
/// to a point.
struct OneCell {
    /// The corridor-wall segment assigned to the cell.
    wall: LineSegment2d,
}

impl OneCell {
    fn far_wall() -> Self {
        Self {
            wall: LineSegment2d::new(p(0.0, 2.0), p(3.0, 2.0)),
        }
    }

    /// A wall lying on the vehicles' path from x = 1.5 onwards.
    fn wall_on_path() -> Self {
        Self {
            wall: LineSegment2d::new(p(1.5, 0.0), p(3.0, 0.0)),
        }
    }
}

impl TriangulationStrategy for OneCell {
    fn map_kind(&self) -> MapKind {
        MapKind::Corridor
    }

    fn triangulate(
        &self,
        _left: &BoundaryCurve,
        _right: &BoundaryCurve,
    ) -> Result<TriangleMesh, SimError> {
        let cell = TriangleCell::new(
            [p(0.0, -1.0), p(0.0, 1.0), p(3.0, 0.0)],
            Vector2d::new(1.0, 0.0),
            None,
            self.wall,
        )?;
        TriangleMesh::new(
            vec![cell],
            LineSegment2d::new(p(0.0, 0.0), p(0.0, 0.0)),
            LineSegment2d::new(p(3.0, 0.5), p(3.0, -0.5)),
        )
    }
}

fn config(vehicle_count: usize, spawn_frequency: f64) -> SimulationConfig {
    SimulationConfig {
        map: MapKind::Corridor,
        left_boundary: vec![[0.0, 1.0], [3.0, 1.0]],
        right_boundary: vec![[0.0, -1.0], [3.0, -1.0]],
        spawn_frequency,
        horizon: None,
        vehicle_count: Some(vehicle_count),
        velocity: 1.0,
        speed_stddev: 0.0,
        seed: 1,
        collision_radius: 0.05,
        time_step: 1.0,
        vehicle_collisions: false,
    }
}

/// One vehicle at unit speed crosses the cell and leaves through the exit
/// edge once the cell's x-extent is exceeded.
#[test]
fn vehicle_reaches_exit() {
    let mut sim = Simulation::new(&config(1, 1.0), &OneCell::far_wall()).unwrap();
    let id = sim.vehicle_order()[0];

    sim.step().unwrap();
    let veh = sim.get_vehicle(id);
    assert_approx_eq!(veh.position().x, 1.0);
    assert_approx_eq!(veh.position().y, 0.0);
    assert!(veh.is_active());

    for _ in 0..16 {
        if sim.is_finished() {
            break;
        }
        sim.step().unwrap();
    }
    let veh = sim.get_vehicle(id);
    assert!(sim.is_finished());
    assert_eq!(veh.end_reason(), Some(EndReason::ReachedExit));
    // The transition happened on the step at t = 3, when x moved past 3.
    assert_approx_eq!(veh.end_time(), 3.0);
    assert_eq!(sim.metrics().samples().len(), 4);
}

/// A vehicle whose distance to the cell's wall segment drops below its
/// collision radius terminates, and its matrix entries stay NaN after.
#[test]
fn vehicle_hits_wall() {
    let mut sim = Simulation::new(&config(2, 1.0), &OneCell::wall_on_path()).unwrap();
    let first = sim.vehicle_order()[0];

    // t = 0: the first vehicle moves to (1, 0), still clear of the wall.
    sim.step().unwrap();
    assert!(sim.get_vehicle(first).is_active());

    // t = 1: it reaches (2, 0), on the wall segment itself.
    sim.step().unwrap();
    let veh = sim.get_vehicle(first);
    assert_eq!(veh.end_reason(), Some(EndReason::WallCollision));
    assert_approx_eq!(veh.end_time(), 1.0);
    assert!(sim.distances().get(0, 1).is_nan());
    assert!(sim.distances().get(1, 0).is_nan());

    // The second vehicle follows the same path into the wall.
    while !sim.is_finished() {
        sim.step().unwrap();
    }
    for veh in sim.iter_vehicles() {
        assert_eq!(veh.end_reason(), Some(EndReason::WallCollision));
    }
    let n = sim.distances().len();
    for i in 0..n {
        for j in 0..n {
            assert!(sim.distances().get(i, j).is_nan());
        }
    }
}

/// With spawns far apart, the run is not finished during transient
/// zero-active windows while later vehicles are still pending.
#[test]
fn pending_spawns_keep_the_run_alive() {
    // Spawns at t = 0, 5 and 10; each vehicle exits 3 steps after spawning.
    let mut sim = Simulation::new(&config(3, 0.2), &OneCell::far_wall()).unwrap();

    let mut saw_zero_active_unfinished = false;
    let mut steps = 0;
    while !sim.is_finished() {
        sim.step().unwrap();
        steps += 1;
        assert!(steps <= 50, "run did not terminate");
        if sim.active_count() == 0 && !sim.is_finished() {
            saw_zero_active_unfinished = true;
        }
    }

    assert!(saw_zero_active_unfinished);
    for veh in sim.iter_vehicles() {
        assert_eq!(veh.end_reason(), Some(EndReason::ReachedExit));
    }
    let ends: Vec<f64> = sim.iter_vehicles().map(|v| v.end_time()).collect();
    assert_eq!(ends, vec![3.0, 8.0, 13.0]);
    // One sample per step, from t = 0 through t = 13.
    assert_eq!(sim.metrics().samples().len(), 14);
    assert_approx_eq!(sim.metrics().samples()[13].time, 13.0);
}

/// The documented extension point: with `vehicle_collisions` enabled, two
/// vehicles closing within the sum of their radii both terminate.
#[test]
fn vehicle_collision_policy() {
    // Two vehicles spawn at the same point one step apart and never
    // separate by more than their combined radii would allow.
    let mut cfg = config(2, 1.0);
    cfg.vehicle_collisions = true;
    cfg.collision_radius = 0.6;
    let mut sim = Simulation::new(&cfg, &OneCell::far_wall()).unwrap();

    // t = 1: both active at (2, 0) and (1, 0), exactly 1.0 apart, which
    // is less than the combined radius of 1.2.
    sim.step().unwrap();
    sim.step().unwrap();
    for veh in sim.iter_vehicles() {
        assert_eq!(veh.end_reason(), Some(EndReason::VehicleCollision));
        assert_approx_eq!(veh.end_time(), 1.0);
    }
    assert!(sim.is_finished());
}
