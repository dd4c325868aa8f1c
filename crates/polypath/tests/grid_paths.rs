//! Path queries on grid navmeshes built through the public API.

use approx::assert_abs_diff_eq;
use glam::Vec3A;
use polypath::{AreaType, NavMesh, NavMeshBuilder, NavMeshQuery, PathStatus, PolygonRef};

/// A grid of unit cells whose vertices lie on the plane `y = height(x, z)`.
struct Grid {
    size: u32,
    mesh: NavMesh,
    /// Maps polygon references back to their `(row, column)`.
    cells: Vec<(u32, u32)>,
}

impl Grid {
    fn new(size: u32, holes: &[(u32, u32)], height: impl Fn(f32, f32) -> f32) -> Self {
        let vertex_row = size + 1;
        let mut builder = NavMeshBuilder::default();
        for z in 0..vertex_row {
            for x in 0..vertex_row {
                builder.add_vertex([x as f32, height(x as f32, z as f32), z as f32]);
            }
        }

        let mut cells = Vec::new();
        let mut polygons = vec![vec![None; size as usize]; size as usize];
        for row in 0..size {
            for column in 0..size {
                if holes.contains(&(row, column)) {
                    continue;
                }
                let polygon = builder
                    .add_polygon(
                        &[
                            (row + 1) * vertex_row + column,
                            (row + 1) * vertex_row + column + 1,
                            row * vertex_row + column + 1,
                            row * vertex_row + column,
                        ],
                        AreaType::DEFAULT,
                    )
                    .unwrap();
                polygons[row as usize][column as usize] = Some(polygon);
                cells.push((row, column));
            }
        }

        let cell = |row: u32, column: u32| polygons[row as usize][column as usize];
        for row in 0..size {
            for column in 0..size {
                let Some(polygon) = cell(row, column) else {
                    continue;
                };
                let neighbors = [
                    (0, (row + 1 < size).then(|| cell(row + 1, column)).flatten()),
                    (1, (column + 1 < size).then(|| cell(row, column + 1)).flatten()),
                    (2, (row > 0).then(|| cell(row - 1, column)).flatten()),
                    (3, (column > 0).then(|| cell(row, column - 1)).flatten()),
                ];
                for (edge, neighbor) in neighbors {
                    if let Some(neighbor) = neighbor {
                        builder.link(polygon, edge, neighbor).unwrap();
                    }
                }
            }
        }

        Self {
            size,
            mesh: builder.build().unwrap(),
            cells,
        }
    }

    fn contains(&self, polygon: PolygonRef, point: Vec3A) -> bool {
        const TOLERANCE: f32 = 1e-4;
        let (row, column) = self.cells[polygon.0 as usize];
        point.x >= column as f32 - TOLERANCE
            && point.x <= (column + 1) as f32 + TOLERANCE
            && point.z >= row as f32 - TOLERANCE
            && point.z <= (row + 1) as f32 + TOLERANCE
    }

    fn cell_center(&self, row: u32, column: u32) -> Vec3A {
        Vec3A::new(column as f32 + 0.5, 0.0, row as f32 + 0.5)
    }
}

fn slope(x: f32, z: f32) -> f32 {
    0.25 * x + 0.1 * z
}

#[test]
fn paths_stay_in_corridor_and_on_surface() {
    let grid = Grid::new(8, &[(2, 2), (2, 3), (2, 4), (5, 5), (6, 1)], slope);
    let mut query = NavMeshQuery::new(&grid.mesh, 256);

    let endpoints = [
        ((0, 0), (7, 7)),
        ((7, 0), (0, 7)),
        ((3, 3), (1, 3)),
        ((6, 0), (6, 2)),
        ((4, 4), (6, 6)),
        ((0, 7), (7, 1)),
    ];
    for ((start_row, start_column), (end_row, end_column)) in endpoints {
        let start = grid.cell_center(start_row, start_column);
        let end = grid.cell_center(end_row, end_column);
        let mut path: Vec<Vec3A> = Vec::new();
        let status = query.find_path(start, end, &mut path).unwrap();
        assert_eq!(status, PathStatus::empty(), "{start} -> {end}");

        let corridor = query.polygon_path();
        assert!(path.len() >= 2);
        assert!(path.len() <= corridor.len() + 2);
        assert_abs_diff_eq!(path[0].x, start.x);
        assert_abs_diff_eq!(path[0].z, start.z);
        assert_abs_diff_eq!(path.last().unwrap().x, end.x);
        assert_abs_diff_eq!(path.last().unwrap().z, end.z);

        for point in &path {
            assert!(
                corridor.iter().any(|&polygon| grid.contains(polygon, *point)),
                "{point} is outside the corridor of {start} -> {end}"
            );
            assert_abs_diff_eq!(point.y, slope(point.x, point.z), epsilon = 1e-4);
        }
        for pair in corridor.windows(2) {
            assert!(grid.mesh.get_portal(pair[0], pair[1]).is_some());
        }
    }
}

#[test]
fn path_goes_around_hole() {
    let hole = [(2, 2), (2, 3), (3, 2), (3, 3)];
    let grid = Grid::new(6, &hole, |_, _| 0.0);
    let mut query = NavMeshQuery::new(&grid.mesh, 64);

    let start = Vec3A::new(0.5, 0.0, 2.9);
    let end = Vec3A::new(5.5, 0.0, 2.9);
    let mut path: Vec<Vec3A> = Vec::new();
    let status = query.find_path(start, end, &mut path).unwrap();
    assert_eq!(status, PathStatus::empty());

    // Two corners of the hole
    assert_eq!(path.len(), 4);
    let length: f32 = path.windows(2).map(|pair| pair[0].distance(pair[1])).sum();
    assert!(length < 5.75, "path of length {length} is not taut");
    assert!(length > 5.49);

    for pair in path.windows(2) {
        for i in 0..=100 {
            let point = pair[0].lerp(pair[1], i as f32 / 100.0);
            let inside_hole = point.x > 2.001 && point.x < 3.999 && point.z > 2.001 && point.z < 3.999;
            assert!(!inside_hole, "segment {pair:?} crosses the hole at {point}");
        }
    }
}

#[test]
fn disconnected_islands_give_partial_path() {
    // A full column of holes splits the grid in two.
    let holes: Vec<_> = (0..4).map(|row| (row, 2)).collect();
    let grid = Grid::new(4, &holes, |_, _| 0.0);
    let mut query = NavMeshQuery::new(&grid.mesh, 64);

    let start = grid.cell_center(1, 0);
    let end = grid.cell_center(1, 3);
    let mut path: Vec<Vec3A> = Vec::new();
    let status = query.find_path(start, end, &mut path).unwrap();
    assert_eq!(status, PathStatus::PARTIAL);

    // The path ends on the edge of the left island facing the goal.
    let last = *path.last().unwrap();
    assert_abs_diff_eq!(last.x, 2.0, epsilon = 1e-5);
    assert!((1.0..=2.0).contains(&last.z));
    for point in &path {
        assert!(point.x <= 2.0 + 1e-5);
    }
}

#[test]
fn query_results_are_reproducible() {
    let grid = Grid::new(8, &[(1, 1), (3, 4), (4, 4), (5, 2)], slope);
    let start = grid.cell_center(0, 0);
    let end = grid.cell_center(7, 6);

    let run = |query: &mut NavMeshQuery| {
        let mut path: Vec<Vec3A> = Vec::new();
        let status = query.find_path(start, end, &mut path).unwrap();
        (status, query.polygon_path().to_vec(), path)
    };

    let mut query = NavMeshQuery::new(&grid.mesh, 256);
    let first = run(&mut query);
    let second = run(&mut query);
    let fresh = run(&mut NavMeshQuery::new(&grid.mesh, 256));
    assert_eq!(first, second);
    assert_eq!(first, fresh);
}
