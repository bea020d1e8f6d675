use crate::config::SimulationConfig;
use crate::error::SimError;
use crate::mesh::{CellLookup, TriangleCell, TriangleMesh, TriangulationStrategy};
use crate::metrics::{Metrics, Sample};
use crate::vehicle::{EndReason, Vehicle};
use crate::{VehicleId, VehicleSet};
use cgmath::prelude::*;
use itertools::Itertools;
use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use smallvec::SmallVec;

/// Pairwise Euclidean distances between active vehicles.
///
/// Indexed by spawn order (see [Simulation::vehicle_order]). Entries
/// involving an inactive vehicle, and the diagonal, are NaN. The matrix is
/// rebuilt in full every step; there is no incremental update.
#[derive(Debug)]
pub struct DistanceMatrix {
    n: usize,
    data: Vec<f64>,
}

impl DistanceMatrix {
    fn new(n: usize) -> Self {
        Self {
            n,
            data: vec![f64::NAN; n * n],
        }
    }

    /// The number of vehicles the matrix covers.
    pub fn len(&self) -> usize {
        self.n
    }

    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    /// The distance between vehicles `i` and `j` in spawn order,
    /// NaN if either is inactive or `i == j`.
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.data[i * self.n + j]
    }

    /// The minimum finite distance from vehicle `i` to any other vehicle,
    /// NaN when there is none.
    pub fn closest(&self, i: usize) -> f64 {
        self.data[i * self.n..(i + 1) * self.n]
            .iter()
            .copied()
            .filter(|d| d.is_finite())
            .fold(f64::NAN, f64::min)
    }

    fn recompute(&mut self, vehicles: &VehicleSet, order: &[VehicleId]) {
        debug_assert_eq!(order.len(), self.n);
        self.data.fill(f64::NAN);
        let active: Vec<_> = order
            .iter()
            .enumerate()
            .filter_map(|(idx, id)| {
                let vehicle = &vehicles[*id];
                vehicle.is_active().then(|| (idx, vehicle.position()))
            })
            .collect();
        for (&(i, a), &(j, b)) in active.iter().tuple_combinations() {
            let dist = a.distance(b);
            self.data[i * self.n + j] = dist;
            self.data[j * self.n + i] = dist;
        }
    }

    fn clear(&mut self, i: usize) {
        for j in 0..self.n {
            self.data[i * self.n + j] = f64::NAN;
            self.data[j * self.n + i] = f64::NAN;
        }
    }
}

/// Chooses the heading a vehicle should adopt within a cell.
pub trait SteppingPolicy: std::fmt::Debug {
    fn desired_heading(&self, vehicle: &Vehicle, cell: &TriangleCell) -> f64;
}

/// Steers every vehicle along its current cell's traversal direction.
#[derive(Debug)]
pub struct FollowCellDirection;

impl SteppingPolicy for FollowCellDirection {
    fn desired_heading(&self, _vehicle: &Vehicle, cell: &TriangleCell) -> f64 {
        cell.heading()
    }
}

/// A corridor traversal simulation.
///
/// Owns the vehicle population and the distance matrix; the triangle mesh
/// is immutable once built. Single-threaded and step-driven: each call to
/// [step](Self::step) advances the clock by one fixed timestep.
#[derive(Debug)]
pub struct Simulation {
    /// The triangulated routing mesh.
    mesh: TriangleMesh,
    /// The vehicles being simulated. Finished vehicles stay in the
    /// population as the record of their lifespan.
    vehicles: VehicleSet,
    /// Vehicle IDs in spawn order; also the distance-matrix indexing.
    order: Vec<VehicleId>,
    /// Pairwise distances over the active set, rebuilt every step.
    distances: DistanceMatrix,
    /// Per-step aggregate metrics.
    metrics: Metrics,
    /// Heading selection policy.
    policy: Box<dyn SteppingPolicy>,
    /// Current simulated time.
    time: f64,
    /// Fixed timestep.
    dt: f64,
    /// Whether close vehicle pairs terminate each other.
    vehicle_collisions: bool,
}

impl Simulation {
    /// Builds the mesh with the given strategy and schedules every vehicle
    /// up front, using the default cell-following policy.
    pub fn new(
        config: &SimulationConfig,
        strategy: &dyn TriangulationStrategy,
    ) -> Result<Self, SimError> {
        Self::with_policy(config, strategy, Box::new(FollowCellDirection))
    }

    /// Builds a simulation with an explicit stepping policy.
    pub fn with_policy(
        config: &SimulationConfig,
        strategy: &dyn TriangulationStrategy,
        policy: Box<dyn SteppingPolicy>,
    ) -> Result<Self, SimError> {
        config.validate()?;
        if config.map != strategy.map_kind() {
            return Err(SimError::config(format!(
                "map type {:?} does not match the {:?} triangulation strategy",
                config.map,
                strategy.map_kind()
            )));
        }
        if config.time_step <= 0.0 {
            return Err(SimError::invalid("`time_step` must be positive"));
        }
        if config.velocity <= 0.0 {
            return Err(SimError::invalid("`velocity` must be positive"));
        }
        if config.spawn_frequency <= 0.0 {
            return Err(SimError::invalid("`spawn_frequency` must be positive"));
        }
        if config.collision_radius < 0.0 {
            return Err(SimError::invalid("`collision_radius` must not be negative"));
        }
        let count = config.num_vehicles();
        if count == 0 {
            return Err(SimError::invalid("vehicle count is zero"));
        }

        let (left, right) = config.boundary_curves()?;
        let mesh = strategy.triangulate(&left, &right)?;

        // The spawn schedule is drawn entirely from this seeded generator,
        // so a run is reproducible from its configuration alone.
        let mut rng = StdRng::seed_from_u64(config.seed);
        let speed_adjust = match config.speed_stddev {
            stddev if stddev > 0.0 => Some(
                Normal::new(1.0, stddev)
                    .map_err(|err| SimError::invalid(format!("`speed_stddev`: {err}")))?,
            ),
            _ => None,
        };

        let entry = mesh.entry_edge();
        let entry_heading = mesh.cell(0).heading();
        let mut vehicles = VehicleSet::default();
        let mut order = Vec::with_capacity(count);
        for k in 0..count {
            let t_init = k as f64 / config.spawn_frequency;
            let pos = entry.lerp(rng.gen_range(0.0..=1.0));
            let vel = match &speed_adjust {
                Some(normal) => config.velocity * normal.sample(&mut rng).clamp(0.75, 1.25),
                None => config.velocity,
            };
            let id = vehicles.insert_with_key(|id| {
                Vehicle::new(id, pos, entry_heading, vel, config.collision_radius, t_init)
            });
            debug!(
                "scheduled vehicle {:?}: t_init={t_init}, pos=({}, {}), vel={vel}",
                id, pos.x, pos.y
            );
            order.push(id);
        }
        info!("scheduled {count} vehicles over {} mesh cells", mesh.len());

        Ok(Self {
            mesh,
            vehicles,
            order,
            distances: DistanceMatrix::new(count),
            metrics: Metrics::default(),
            policy,
            time: 0.0,
            dt: config.time_step,
            vehicle_collisions: config.vehicle_collisions,
        })
    }

    /// Advances the simulation by one fixed timestep.
    ///
    /// Fails only when a vehicle can no longer be located in the mesh,
    /// which indicates inconsistent geometry and aborts the run.
    pub fn step(&mut self) -> Result<(), SimError> {
        let t = self.time;

        for idx in 0..self.order.len() {
            let id = self.order[idx];
            let vehicle = &mut self.vehicles[id];
            if vehicle.is_finished() || vehicle.spawn_time() > t {
                continue;
            }
            if !vehicle.is_active() {
                vehicle.activate();
                debug!("vehicle {:?} spawned at t={t}", id);
            }

            // Steer along the current cell and integrate.
            let cell = self.mesh.cell(vehicle.cell());
            let heading = self.policy.desired_heading(vehicle, cell);
            vehicle.propagate(self.dt, Some(heading));

            // Resolve cell transitions; leaving the final cell is the exit.
            match self.mesh.locate_from(vehicle.cell(), vehicle.position())? {
                CellLookup::Inside(cell_idx) => vehicle.set_cell(cell_idx),
                CellLookup::Exited => {
                    vehicle.terminate(t, EndReason::ReachedExit);
                    info!("vehicle {:?} reached the exit at t={t}", id);
                    continue;
                }
            }

            // Wall proximity.
            let wall = self.mesh.cell(vehicle.cell()).wall();
            if wall.distance_to(vehicle.position()) < vehicle.radius() {
                vehicle.terminate(t, EndReason::WallCollision);
                info!("vehicle {:?} hit a wall at t={t}", id);
            }
        }

        // The pairwise pass needs every vehicle's updated position, so it
        // runs strictly after the per-vehicle scan.
        self.distances.recompute(&self.vehicles, &self.order);
        if self.vehicle_collisions {
            self.resolve_vehicle_collisions(t);
        }
        self.metrics.push(self.sample(t));

        if !self.is_finished() {
            self.time = t + self.dt;
        }
        Ok(())
    }

    /// Terminates every active pair closer than the sum of their radii.
    fn resolve_vehicle_collisions(&mut self, t: f64) {
        let mut collided: SmallVec<[usize; 8]> = SmallVec::new();
        for (i, j) in (0..self.order.len()).tuple_combinations() {
            let dist = self.distances.get(i, j);
            if dist.is_nan() {
                continue;
            }
            let limit =
                self.vehicles[self.order[i]].radius() + self.vehicles[self.order[j]].radius();
            if dist < limit {
                collided.push(i);
                collided.push(j);
            }
        }
        for idx in collided {
            let id = self.order[idx];
            let vehicle = &mut self.vehicles[id];
            if !vehicle.is_finished() {
                vehicle.terminate(t, EndReason::VehicleCollision);
                info!("vehicle {:?} collided with another vehicle at t={t}", id);
            }
            self.distances.clear(idx);
        }
    }

    fn sample(&self, t: f64) -> Sample {
        let n = self.order.len();
        let mut closest_sum = 0.0;
        let mut closest_cnt = 0usize;
        for i in 0..n {
            let dist = self.distances.closest(i);
            if dist.is_finite() {
                closest_sum += dist;
                closest_cnt += 1;
            }
        }
        let mut pair_sum = 0.0;
        let mut pair_cnt = 0usize;
        for (i, j) in (0..n).tuple_combinations() {
            let dist = self.distances.get(i, j);
            if dist.is_finite() {
                pair_sum += dist;
                pair_cnt += 1;
            }
        }
        let mean = |sum: f64, cnt: usize| if cnt > 0 { sum / cnt as f64 } else { f64::NAN };
        Sample {
            time: t,
            active: self.active_count(),
            mean_closest: mean(closest_sum, closest_cnt),
            mean_pairwise: mean(pair_sum, pair_cnt),
        }
    }

    /// The current simulated time.
    pub fn time(&self) -> f64 {
        self.time
    }

    /// The fixed timestep.
    pub fn dt(&self) -> f64 {
        self.dt
    }

    /// The number of vehicles that have spawned and not yet finished.
    pub fn active_count(&self) -> usize {
        self.vehicles.values().filter(|v| v.is_active()).count()
    }

    /// Whether the run is over.
    ///
    /// Computed, never cached: true iff every scheduled vehicle has
    /// finished. A transient instant with zero active vehicles does not
    /// finish the run while later vehicles are still pending spawn.
    pub fn is_finished(&self) -> bool {
        self.vehicles.values().all(|v| v.is_finished())
    }

    /// The routing mesh.
    pub fn mesh(&self) -> &TriangleMesh {
        &self.mesh
    }

    /// The per-step metrics series.
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// The distance matrix as of the most recent step.
    pub fn distances(&self) -> &DistanceMatrix {
        &self.distances
    }

    /// Vehicle IDs in spawn order; this is also the indexing of the
    /// distance matrix.
    pub fn vehicle_order(&self) -> &[VehicleId] {
        &self.order
    }

    /// Returns an iterator over all the vehicles, in spawn order.
    pub fn iter_vehicles(&self) -> impl Iterator<Item = &Vehicle> {
        self.order.iter().map(|id| &self.vehicles[*id])
    }

    /// Gets a reference to the vehicle with the given ID.
    pub fn get_vehicle(&self, vehicle_id: VehicleId) -> &Vehicle {
        &self.vehicles[vehicle_id]
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::MapKind;
    use crate::mesh::ClosestVertex;

    fn config(vehicle_count: usize, spawn_frequency: f64) -> SimulationConfig {
        SimulationConfig {
            map: MapKind::Corridor,
            left_boundary: vec![[0.0, 5.0], [50.0, 5.0], [100.0, 5.0]],
            right_boundary: vec![[0.0, -5.0], [50.0, -5.0], [100.0, -5.0]],
            spawn_frequency,
            horizon: None,
            vehicle_count: Some(vehicle_count),
            velocity: 0.5,
            speed_stddev: 0.0,
            seed: 7,
            collision_radius: 0.3,
            time_step: 0.5,
            vehicle_collisions: false,
        }
    }

    fn run(sim: &mut Simulation, max_steps: usize) {
        for _ in 0..max_steps {
            if sim.is_finished() {
                return;
            }
            sim.step().unwrap();
        }
        assert!(sim.is_finished(), "run did not terminate");
    }

    #[test]
    fn rejects_map_mismatch() {
        let mut cfg = config(1, 1.0);
        cfg.map = MapKind::TurnRadius;
        let err = Simulation::new(&cfg, &ClosestVertex).unwrap_err();
        assert!(matches!(err, SimError::Config(_)));
    }

    #[test]
    fn rejects_bad_arguments() {
        let mut cfg = config(1, 1.0);
        cfg.time_step = 0.0;
        assert!(matches!(
            Simulation::new(&cfg, &ClosestVertex).unwrap_err(),
            SimError::InvalidArgument(_)
        ));

        let mut cfg = config(0, 1.0);
        cfg.vehicle_count = Some(0);
        assert!(matches!(
            Simulation::new(&cfg, &ClosestVertex).unwrap_err(),
            SimError::InvalidArgument(_)
        ));
    }

    #[test]
    fn vehicle_states_are_exclusive() {
        let mut sim = Simulation::new(&config(4, 0.5), &ClosestVertex).unwrap();
        for _ in 0..200 {
            if sim.is_finished() {
                break;
            }
            sim.step().unwrap();
            for vehicle in sim.iter_vehicles() {
                let states =
                    [vehicle.is_pending(), vehicle.is_active(), vehicle.is_finished()];
                assert_eq!(states.iter().filter(|s| **s).count(), 1);
            }
        }
    }

    #[test]
    fn matrix_is_symmetric_with_nan_diagonal() {
        let mut sim = Simulation::new(&config(3, 2.0), &ClosestVertex).unwrap();
        for _ in 0..20 {
            sim.step().unwrap();
            let n = sim.distances().len();
            for i in 0..n {
                assert!(sim.distances().get(i, i).is_nan());
                for j in 0..n {
                    let a = sim.distances().get(i, j);
                    let b = sim.distances().get(j, i);
                    assert!(a.is_nan() && b.is_nan() || a == b);
                }
            }
        }
    }

    #[test]
    fn mean_closest_bounded_by_mean_pairwise() {
        let mut sim = Simulation::new(&config(5, 1.0), &ClosestVertex).unwrap();
        run(&mut sim, 500);
        for sample in sim.metrics().samples() {
            if sample.active >= 2 {
                assert!(sample.mean_closest <= sample.mean_pairwise + 1e-12);
            }
        }
    }

    #[test]
    fn all_vehicles_finish() {
        let mut sim = Simulation::new(&config(3, 1.0), &ClosestVertex).unwrap();
        run(&mut sim, 2000);
        for vehicle in sim.iter_vehicles() {
            assert!(vehicle.is_finished());
            // Without vehicle collisions, only two reasons are possible.
            assert!(matches!(
                vehicle.end_reason(),
                Some(EndReason::ReachedExit) | Some(EndReason::WallCollision)
            ));
            assert!(vehicle.end_time().is_finite());
            assert!(vehicle.end_time() >= vehicle.spawn_time());
        }
        // One sample per step; the clock does not advance past the final step.
        let steps = sim.metrics().samples().len();
        assert_eq!((steps - 1) as f64 * sim.dt(), sim.time());
    }

    #[test]
    fn runs_are_reproducible() {
        let cfg = {
            let mut cfg = config(6, 1.5);
            cfg.speed_stddev = 0.1;
            cfg
        };
        let mut a = Simulation::new(&cfg, &ClosestVertex).unwrap();
        let mut b = Simulation::new(&cfg, &ClosestVertex).unwrap();
        run(&mut a, 1000);
        run(&mut b, 1000);

        let (sa, sb) = (a.metrics().samples(), b.metrics().samples());
        assert_eq!(sa.len(), sb.len());
        for (x, y) in sa.iter().zip(sb) {
            assert_eq!(x.time, y.time);
            assert_eq!(x.active, y.active);
            // Bitwise comparison, since NaN aggregates must match too.
            assert_eq!(x.mean_closest.to_bits(), y.mean_closest.to_bits());
            assert_eq!(x.mean_pairwise.to_bits(), y.mean_pairwise.to_bits());
        }
        for (va, vb) in a.iter_vehicles().zip(b.iter_vehicles()) {
            assert_eq!(va.position(), vb.position());
            assert_eq!(va.vel(), vb.vel());
            assert_eq!(va.end_time(), vb.end_time());
            assert_eq!(va.end_reason(), vb.end_reason());
        }
    }
}
