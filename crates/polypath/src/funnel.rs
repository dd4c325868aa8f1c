//! String pulling through a corridor of portals.
//!
//! The funnel is anchored at an apex and bounded by a left and a right leg. Each portal
//! tightens a leg if that keeps the funnel from inverting. When a leg would cross the other
//! one, the other leg's endpoint becomes a corner of the path and the new apex.

use glam::Vec3A;

use crate::{
    PathSink,
    math::{EPSILON, PORTAL_APEX_EPSILON_SQR, approx_eq, distance_point_segment_sqr_2d, tri_area_2d},
};

/// Appends the straight path from `start` to `end` through `portals` to `sink`.
///
/// `portals` are the `(left, right)` edges crossed in order. `start` is always the first and
/// `end` always the last appended point. At most one corner is appended per portal, plus one
/// for the final step towards `end`.
pub(crate) fn string_pull(
    start: Vec3A,
    end: Vec3A,
    portals: &[(Vec3A, Vec3A)],
    sink: &mut impl PathSink,
) {
    const CROSS_EPSILON: f32 = EPSILON * EPSILON;

    sink.push_point(start);

    let mut apex = start;
    let mut portal_left = start;
    let mut portal_right = start;

    for i in 0..=portals.len() {
        let (left, right) = match portals.get(i) {
            Some(&(left, right)) => {
                // The apex already touches this portal.
                let (_, distance_sqr) = distance_point_segment_sqr_2d(apex, left, right);
                if distance_sqr < PORTAL_APEX_EPSILON_SQR {
                    continue;
                }
                (left, right)
            }
            None => (end, end),
        };

        if tri_area_2d(apex, portal_left, left) >= 0.0 {
            if approx_eq(apex, portal_left) || tri_area_2d(apex, portal_right, left) < CROSS_EPSILON
            {
                portal_left = left;
            } else {
                apex = portal_right;
                sink.push_point(apex);
                portal_left = apex;
                portal_right = apex;
            }
        }

        if tri_area_2d(apex, portal_right, right) <= 0.0 {
            if approx_eq(apex, portal_right) || tri_area_2d(apex, portal_left, right) > -CROSS_EPSILON
            {
                portal_right = right;
            } else {
                apex = portal_left;
                sink.push_point(apex);
                portal_left = apex;
                portal_right = apex;
            }
        }
    }

    sink.push_point(end);
}
