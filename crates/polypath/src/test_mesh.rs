//! Navmeshes shared by the unit tests.

use crate::{AreaType, NavMesh, NavMeshBuilder, PolygonRef};

/// Number of cells along each side of [`grid_mesh`].
pub(crate) const GRID_SIZE: u32 = 5;

/// The area of cells passed as `walls` to [`grid_mesh`].
pub(crate) const WALL_AREA: AreaType = AreaType(100);

/// Returns the reference of the grid cell at the given row (z) and column (x).
pub(crate) fn grid_polygon(row: u32, column: u32) -> PolygonRef {
    PolygonRef(row * GRID_SIZE + column)
}

/// A 5x5 grid of unit squares on the y = 0 plane, built from a 6x6 vertex lattice.
///
/// Cell `(row, column)` spans `x` in `[column, column + 1]` and `z` in `[row, row + 1]`.
/// Neighbors are connected in all four directions. Cells listed in `walls` get [`WALL_AREA`].
pub(crate) fn grid_mesh(walls: &[(u32, u32)]) -> NavMesh {
    let vertex_row = GRID_SIZE + 1;
    let mut builder = NavMeshBuilder::default();
    for z in 0..vertex_row {
        for x in 0..vertex_row {
            builder.add_vertex([x as f32, 0.0, z as f32]);
        }
    }
    for row in 0..GRID_SIZE {
        for column in 0..GRID_SIZE {
            let area = if walls.contains(&(row, column)) {
                WALL_AREA
            } else {
                AreaType::DEFAULT
            };
            builder
                .add_polygon(
                    &[
                        (row + 1) * vertex_row + column,
                        (row + 1) * vertex_row + column + 1,
                        row * vertex_row + column + 1,
                        row * vertex_row + column,
                    ],
                    area,
                )
                .unwrap();
        }
    }
    for row in 0..GRID_SIZE {
        for column in 0..GRID_SIZE {
            let polygon = grid_polygon(row, column);
            if column > 0 {
                builder
                    .link(polygon, 3, grid_polygon(row, column - 1))
                    .unwrap();
            }
            if column + 1 < GRID_SIZE {
                builder
                    .link(polygon, 1, grid_polygon(row, column + 1))
                    .unwrap();
            }
            if row > 0 {
                builder
                    .link(polygon, 2, grid_polygon(row - 1, column))
                    .unwrap();
            }
            if row + 1 < GRID_SIZE {
                builder
                    .link(polygon, 0, grid_polygon(row + 1, column))
                    .unwrap();
            }
        }
    }
    builder.build().unwrap()
}

/// Returns `true` if the xz-projection of `point` lies within cell `polygon` of [`grid_mesh`].
pub(crate) fn grid_cell_contains(polygon: PolygonRef, point: glam::Vec3A) -> bool {
    const TOLERANCE: f32 = 1e-4;
    let row = polygon.0 / GRID_SIZE;
    let column = polygon.0 % GRID_SIZE;
    point.x >= column as f32 - TOLERANCE
        && point.x <= (column + 1) as f32 + TOLERANCE
        && point.z >= row as f32 - TOLERANCE
        && point.z <= (row + 1) as f32 + TOLERANCE
}
