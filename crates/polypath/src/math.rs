//! Geometry helpers shared by the mesh and the query.
//!
//! All 2D functions work on the xz-plane. The y-axis is up.

use glam::Vec3A;

/// Tolerance used for point coincidence checks. [Units: wu]
pub const EPSILON: f32 = 0.01;

/// Squared xz-distance below which the funnel apex counts as lying on a portal.
pub const PORTAL_APEX_EPSILON_SQR: f32 = 0.01;

/// Triangles whose doubled xz-area is smaller than this are too thin to sample heights from.
pub const HEIGHT_TRIANGLE_EPSILON: f32 = 0.01;

/// Returns `true` if the two points are within [`EPSILON`] of each other.
#[inline]
pub fn approx_eq(a: Vec3A, b: Vec3A) -> bool {
    a.distance_squared(b) < EPSILON * EPSILON
}

/// Twice the signed area of the triangle `a`, `b`, `c` projected onto the xz-plane.
///
/// This is the y-component of `(b - a) x (c - a)`. Drawing the xz-plane with x to the right
/// and z up, the result is positive if `c` lies clockwise of the directed segment `a -> b`,
/// negative if it lies counter-clockwise and zero if the points are collinear.
#[inline]
pub fn tri_area_2d(a: Vec3A, b: Vec3A, c: Vec3A) -> f32 {
    let ab_x = b.x - a.x;
    let ab_z = b.z - a.z;
    let ac_x = c.x - a.x;
    let ac_z = c.z - a.z;
    ac_x * ab_z - ab_x * ac_z
}

/// Projects `point` onto the segment `p`-`q` on the xz-plane.
///
/// # Returns
///
/// A tuple of
/// - the segment parameter `t` of the projection, clamped to `[0, 1]`
/// - the squared xz-distance between `point` and `p.lerp(q, t)`
///
/// A degenerate segment yields `t = 0`.
#[inline]
pub fn distance_point_segment_sqr_2d(point: Vec3A, p: Vec3A, q: Vec3A) -> (f32, f32) {
    let pq_x = q.x - p.x;
    let pq_z = q.z - p.z;
    let dx = point.x - p.x;
    let dz = point.z - p.z;
    let length_sqr = pq_x * pq_x + pq_z * pq_z;
    let mut t = pq_x * dx + pq_z * dz;
    if length_sqr > 0.0 {
        t /= length_sqr;
    }
    let t = t.clamp(0.0, 1.0);
    let dx = p.x + t * pq_x - point.x;
    let dz = p.z + t * pq_z - point.z;
    (t, dx * dx + dz * dz)
}

/// Samples the height of the triangle `a`, `b`, `c` below or above `point`.
///
/// Returns `None` if the xz-projection of `point` is outside the triangle, or if the
/// triangle is degenerate on the xz-plane.
pub fn height_on_triangle(point: Vec3A, a: Vec3A, b: Vec3A, c: Vec3A) -> Option<f32> {
    let ab = b - a;
    let ac = c - a;
    let ap = point - a;

    let mut denom = ab.z * ac.x - ab.x * ac.z;
    if denom.abs() < HEIGHT_TRIANGLE_EPSILON {
        return None;
    }
    // Weight of `c`
    let mut u = ab.z * ap.x - ab.x * ap.z;
    // Weight of `b`
    let mut v = ap.z * ac.x - ap.x * ac.z;
    if denom < 0.0 {
        denom = -denom;
        u = -u;
        v = -v;
    }

    if u >= 0.0 && v >= 0.0 && u + v <= denom {
        Some(a.y + (ac.y * u + ab.y * v) / denom)
    } else {
        None
    }
}
