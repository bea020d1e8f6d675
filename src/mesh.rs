use crate::boundary::BoundaryCurve;
use crate::config::MapKind;
use crate::error::SimError;
use crate::math::{point_in_triangle, signed_area2, LineSegment2d, Point2d, Vector2d};
use cgmath::prelude::*;
use log::info;

/// Triangles with twice-signed-area below this are rejected as degenerate.
const AREA2_EPSILON: f64 = 1e-12;

/// One triangle of the routing mesh.
///
/// Cells are created once by a [TriangulationStrategy] and are immutable
/// thereafter; vehicles refer to them only by index into the [TriangleMesh].
#[derive(Clone, Debug)]
pub struct TriangleCell {
    /// The triangle's vertices, taken from the two boundary curves.
    verts: [Point2d; 3],
    /// Unit traversal direction toward the successor cell (or the exit).
    dir: Vector2d,
    /// Index of the successor cell; `None` means the exit has been reached.
    next: Option<usize>,
    /// The corridor-wall segment nearest this cell.
    wall: LineSegment2d,
}

impl TriangleCell {
    /// Creates a cell, rejecting degenerate triangles and zero directions.
    pub fn new(
        verts: [Point2d; 3],
        dir: Vector2d,
        next: Option<usize>,
        wall: LineSegment2d,
    ) -> Result<Self, SimError> {
        if signed_area2(verts[0], verts[1], verts[2]).abs() <= AREA2_EPSILON {
            return Err(SimError::geometry("degenerate (zero-area) triangle cell"));
        }
        if dir.magnitude2() == 0.0 {
            return Err(SimError::geometry("triangle cell has a zero direction"));
        }
        Ok(Self {
            verts,
            dir: dir.normalize(),
            next,
            wall,
        })
    }

    /// The triangle's vertices.
    pub fn vertices(&self) -> &[Point2d; 3] {
        &self.verts
    }

    /// The unit traversal direction.
    pub fn dir(&self) -> Vector2d {
        self.dir
    }

    /// The traversal direction as a heading angle in radians.
    pub fn heading(&self) -> f64 {
        self.dir.y.atan2(self.dir.x)
    }

    /// The successor cell index, or `None` at the corridor exit.
    pub fn next(&self) -> Option<usize> {
        self.next
    }

    /// The corridor-wall segment nearest this cell.
    pub fn wall(&self) -> LineSegment2d {
        self.wall
    }

    /// The triangle's centroid.
    pub fn centroid(&self) -> Point2d {
        Point2d::from_vec(
            (self.verts[0].to_vec() + self.verts[1].to_vec() + self.verts[2].to_vec()) / 3.0,
        )
    }

    /// Tests whether the point lies inside the cell, edges inclusive.
    pub fn contains(&self, point: Point2d) -> bool {
        point_in_triangle(point, &self.verts)
    }
}

/// The result of locating a point in the mesh.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CellLookup {
    /// The point lies inside the cell with this index.
    Inside(usize),
    /// The point has passed beyond the corridor's exit edge.
    Exited,
}

/// The triangulated corridor: an ordered arena of [TriangleCell] whose
/// successor pointers form an acyclic chain terminating at the exit.
#[derive(Debug)]
pub struct TriangleMesh {
    cells: Vec<TriangleCell>,
    entry: LineSegment2d,
    exit: LineSegment2d,
}

impl TriangleMesh {
    /// Assembles a mesh from prebuilt cells, validating the successor chain.
    ///
    /// Every strategy must go through here, so every mesh satisfies the same
    /// contract: non-empty, in-range successors, and no cycles.
    pub fn new(
        cells: Vec<TriangleCell>,
        entry: LineSegment2d,
        exit: LineSegment2d,
    ) -> Result<Self, SimError> {
        if cells.is_empty() {
            return Err(SimError::geometry("triangulation produced no cells"));
        }
        for (idx, cell) in cells.iter().enumerate() {
            if let Some(next) = cell.next() {
                if next >= cells.len() {
                    return Err(SimError::geometry(format!(
                        "cell {idx} points to nonexistent successor {next}"
                    )));
                }
            }
        }
        for start in 0..cells.len() {
            let mut idx = start;
            let mut hops = 0;
            while let Some(next) = cells[idx].next() {
                idx = next;
                hops += 1;
                if hops > cells.len() {
                    return Err(SimError::geometry(format!(
                        "successor chain from cell {start} contains a cycle"
                    )));
                }
            }
        }
        Ok(Self { cells, entry, exit })
    }

    /// The number of cells in the mesh.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Gets the cell with the given index.
    pub fn cell(&self, idx: usize) -> &TriangleCell {
        &self.cells[idx]
    }

    /// The cells of the mesh, in chain order for the built-in strategies.
    pub fn cells(&self) -> &[TriangleCell] {
        &self.cells
    }

    /// The corridor's entry edge, along which vehicles spawn.
    pub fn entry_edge(&self) -> LineSegment2d {
        self.entry
    }

    /// The corridor's exit edge.
    pub fn exit_edge(&self) -> LineSegment2d {
        self.exit
    }

    /// Locates a point by walking the successor chain from `start`.
    ///
    /// If the chain ends without containing the point, the point counts as
    /// exited only when it lies on the far side of the exit edge (opposite
    /// the final cell); anywhere else indicates an inconsistent mesh and
    /// is fatal.
    pub fn locate_from(&self, start: usize, point: Point2d) -> Result<CellLookup, SimError> {
        let mut idx = start;
        for _ in 0..=self.cells.len() {
            let cell = &self.cells[idx];
            if cell.contains(point) {
                return Ok(CellLookup::Inside(idx));
            }
            match cell.next() {
                Some(next) => idx = next,
                None => {
                    let inside = signed_area2(self.exit.a, self.exit.b, cell.centroid());
                    let beyond = signed_area2(self.exit.a, self.exit.b, point);
                    if inside * beyond < 0.0 {
                        return Ok(CellLookup::Exited);
                    }
                    return Err(SimError::geometry(format!(
                        "point ({}, {}) cannot be located in any cell",
                        point.x, point.y
                    )));
                }
            }
        }
        // Unreachable for meshes built through `new`, which rejects cycles.
        Err(SimError::geometry("successor chain contains a cycle"))
    }
}

/// Decomposes a corridor into a chain of directed triangle cells.
///
/// Multiple strategies may exist; all of them produce the [TriangleMesh]
/// contract, and each declares the map type it is valid for so the engine
/// can reject a configuration built for a different variant.
pub trait TriangulationStrategy {
    /// The map type this strategy expects in the configuration.
    fn map_kind(&self) -> MapKind;

    /// Builds the routing mesh from the two corridor walls.
    fn triangulate(
        &self,
        left: &BoundaryCurve,
        right: &BoundaryCurve,
    ) -> Result<TriangleMesh, SimError>;
}

/// The closest-vertex triangulation strategy.
///
/// Walks both walls simultaneously; at each step the wall whose next vertex
/// is nearest the opposite side of the current cross-section is advanced,
/// forming one triangle per advance. When one wall runs out of vertices its
/// final vertex is reused until the other wall is exhausted.
pub struct ClosestVertex;

impl TriangulationStrategy for ClosestVertex {
    fn map_kind(&self) -> MapKind {
        MapKind::Corridor
    }

    fn triangulate(
        &self,
        left: &BoundaryCurve,
        right: &BoundaryCurve,
    ) -> Result<TriangleMesh, SimError> {
        let l = left.points();
        let r = right.points();
        let mut i = 0;
        let mut j = 0;

        // First pass: fix the vertex sets and wall edges of all triangles.
        let mut tris: Vec<([Point2d; 3], LineSegment2d)> = vec![];
        while i + 1 < l.len() || j + 1 < r.len() {
            let advance_left = if i + 1 >= l.len() {
                false
            } else if j + 1 >= r.len() {
                true
            } else {
                l[i + 1].distance(r[j]) <= r[j + 1].distance(l[i])
            };
            let (verts, wall) = if advance_left {
                ([l[i], r[j], l[i + 1]], left.segment(i))
            } else {
                ([l[i], r[j], r[j + 1]], right.segment(j))
            };
            if signed_area2(verts[0], verts[1], verts[2]).abs() <= AREA2_EPSILON {
                return Err(SimError::geometry(format!(
                    "degenerate triangle at cell {}",
                    tris.len()
                )));
            }
            if advance_left {
                i += 1;
            } else {
                j += 1;
            }
            tris.push((verts, wall));
        }

        // Second pass: directions run centroid to centroid, with the final
        // cell aimed at the middle of the exit edge.
        let exit = LineSegment2d::new(left.last(), right.last());
        let centroids: Vec<Point2d> = tris
            .iter()
            .map(|(verts, _)| {
                Point2d::from_vec((verts[0].to_vec() + verts[1].to_vec() + verts[2].to_vec()) / 3.0)
            })
            .collect();
        let mut cells = Vec::with_capacity(tris.len());
        for (k, (verts, wall)) in tris.iter().enumerate() {
            let target = match centroids.get(k + 1) {
                Some(centroid) => *centroid,
                None => exit.midpoint(),
            };
            let next = (k + 1 < tris.len()).then_some(k + 1);
            cells.push(TriangleCell::new(*verts, target - centroids[k], next, *wall)?);
        }

        let mesh = TriangleMesh::new(
            cells,
            LineSegment2d::new(left.first(), right.first()),
            exit,
        )?;
        info!("triangulated corridor into {} cells", mesh.len());
        Ok(mesh)
    }
}
