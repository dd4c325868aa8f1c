//! Traversal rules between neighboring polygons.

use crate::AreaType;

/// Decides whether the search may step from one polygon to a neighbor, based on their areas.
pub trait QueryFilter {
    /// Returns the extra cost of stepping from a polygon of area `from` to a polygon of
    /// area `to`, or `None` if the step is not allowed.
    ///
    /// The extra cost is added to the travelled distance. Negative costs are treated as zero.
    fn traversal_cost(&self, from: AreaType, to: AreaType) -> Option<f32>;
}

/// Allows steps between polygons of the same area only, at no extra cost.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AreaFilter;

impl QueryFilter for AreaFilter {
    #[inline]
    fn traversal_cost(&self, from: AreaType, to: AreaType) -> Option<f32> {
        (from == to).then_some(0.0)
    }
}

impl<F> QueryFilter for F
where
    F: Fn(AreaType, AreaType) -> Option<f32>,
{
    #[inline]
    fn traversal_cost(&self, from: AreaType, to: AreaType) -> Option<f32> {
        self(from, to)
    }
}
