//! Path queries on a [`NavMesh`].
//!
//! A query runs in two stages:
//! - An A* search over the polygon adjacency graph finds a corridor of polygons from the start to
//!   the goal. See [`NavMeshQuery::find_polygon_path`].
//! - The funnel algorithm pulls a taut string of corner points through that corridor.
//!   See [`NavMeshQuery::find_straight_path`].
//!
//! [`NavMeshQuery::find_path`] runs both.

use glam::{Vec3, Vec3A};
use thiserror::Error;

use crate::{
    AreaFilter, NavMesh, NodeFlags, NodeIndex, NodePool, OpenList, PolygonLocation, PolygonRef,
    QueryFilter, funnel::string_pull,
};

/// Receives the points of a straight path in order.
pub trait PathSink {
    /// Appends a point to the path.
    fn push_point(&mut self, point: Vec3A);
}

impl PathSink for Vec<Vec3A> {
    #[inline]
    fn push_point(&mut self, point: Vec3A) {
        self.push(point);
    }
}

impl PathSink for Vec<Vec3> {
    #[inline]
    fn push_point(&mut self, point: Vec3A) {
        self.push(point.into());
    }
}

bitflags::bitflags! {
    /// How a query result deviates from an exact answer. Empty for an exact result.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    #[repr(transparent)]
    pub struct PathStatus: u8 {
        /// The goal polygon could not be reached. The path ends at the polygon closest to the goal.
        const PARTIAL = 1;
        /// The node pool ran out of nodes during the search, so parts of the navmesh were not
        /// explored.
        const OUT_OF_NODES = 1 << 1;
        /// The start point was not on any polygon and was snapped to the closest polygon boundary.
        const START_APPROXIMATE = 1 << 2;
        /// The end point was not on any polygon and was snapped to the closest polygon boundary.
        const END_APPROXIMATE = 1 << 3;
    }
}

impl PathStatus {
    /// Returns `true` if the path reaches the requested goal polygon.
    #[inline]
    pub fn is_complete(self) -> bool {
        !self.contains(Self::PARTIAL)
    }
}

/// Errors that prevent a query from producing a path.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathError {
    /// The navmesh has no polygon to place the start point on.
    #[error("Cannot place the start point: the navmesh has no polygons")]
    StartNotLocated,
    /// Two consecutive polygons of a corridor are not linked.
    #[error("Polygon {from:?} has no link to polygon {to:?}")]
    NoPortal {
        /// The polygon the step starts at.
        from: PolygonRef,
        /// The polygon that was expected to be linked.
        to: PolygonRef,
    },
    /// A polygon reference does not belong to the navmesh.
    #[error("Polygon {0:?} is not part of the navmesh")]
    InvalidPolygonRef(PolygonRef),
    /// A straight path was requested for a corridor without polygons.
    #[error("Cannot build a straight path through an empty corridor")]
    EmptyCorridor,
}

/// The result of [`NavMeshQuery::find_polygon_path`].
/// The corridor itself is available through [`NavMeshQuery::polygon_path`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchOutcome {
    /// Either empty, or a combination of [`PathStatus::PARTIAL`] and
    /// [`PathStatus::OUT_OF_NODES`].
    pub status: PathStatus,
    /// The polygon the corridor ends at. The goal polygon unless the status is partial.
    pub last_polygon: PolygonRef,
}

/// Answers path queries on a [`NavMesh`].
///
/// The query owns its search state, so consecutive queries reuse the same allocations.
/// Use one query per thread.
#[derive(Debug, Clone)]
pub struct NavMeshQuery<'a, F = AreaFilter> {
    mesh: &'a NavMesh,
    filter: F,
    node_pool: NodePool,
    open_list: OpenList,
    polygon_path: Vec<PolygonRef>,
    portals: Vec<(Vec3A, Vec3A)>,
}

impl<'a> NavMeshQuery<'a> {
    /// Creates a query with the default [`AreaFilter`].
    ///
    /// `max_nodes` bounds the number of polygons a single search can visit and is rounded up
    /// to a power of two.
    pub fn new(mesh: &'a NavMesh, max_nodes: usize) -> Self {
        Self::with_filter(mesh, max_nodes, AreaFilter)
    }
}

impl<'a, F: QueryFilter> NavMeshQuery<'a, F> {
    /// Creates a query that uses `filter` to decide which neighbors are traversable.
    ///
    /// `max_nodes` bounds the number of polygons a single search can visit and is rounded up
    /// to a power of two.
    pub fn with_filter(mesh: &'a NavMesh, max_nodes: usize, filter: F) -> Self {
        let node_pool = NodePool::new(max_nodes);
        let open_list = OpenList::with_capacity(node_pool.capacity());
        Self {
            mesh,
            filter,
            node_pool,
            open_list,
            polygon_path: Vec::new(),
            portals: Vec::new(),
        }
    }

    /// The navmesh this query runs on.
    #[inline]
    pub fn mesh(&self) -> &'a NavMesh {
        self.mesh
    }

    /// The traversal filter.
    #[inline]
    pub fn filter(&self) -> &F {
        &self.filter
    }

    /// The search state left behind by the last search.
    #[inline]
    pub fn node_pool(&self) -> &NodePool {
        &self.node_pool
    }

    /// The corridor found by the last search, from the start polygon to the last polygon.
    #[inline]
    pub fn polygon_path(&self) -> &[PolygonRef] {
        &self.polygon_path
    }

    /// Places `point` on the navmesh. See [`NavMesh::locate_polygon`].
    #[inline]
    pub fn locate(&self, point: Vec3A) -> Option<PolygonLocation> {
        self.mesh.locate_polygon(point)
    }

    /// Finds a path from `start` to `end` and appends its corner points to `sink`.
    ///
    /// Points that are not on the navmesh are snapped to the closest polygon boundary first.
    /// The first appended point is the placed start, the last one the placed end, or, for a
    /// partial path, the end clamped to the last polygon of the corridor.
    ///
    /// Nothing is appended if an error is returned.
    ///
    /// # Errors
    ///
    /// Returns [`PathError::StartNotLocated`] if the navmesh has no polygons.
    pub fn find_path(
        &mut self,
        start: impl Into<Vec3A>,
        end: impl Into<Vec3A>,
        sink: &mut impl PathSink,
    ) -> Result<PathStatus, PathError> {
        let (start, end) = (start.into(), end.into());
        let (Some(start_location), Some(end_location)) = (self.locate(start), self.locate(end))
        else {
            return Err(PathError::StartNotLocated);
        };

        let mut status = PathStatus::empty();
        if !start_location.on_polygon {
            tracing::debug!(
                "Start {start} is not on the navmesh, snapped to {} on polygon {:?}",
                start_location.point,
                start_location.polygon
            );
            status |= PathStatus::START_APPROXIMATE;
        }
        if !end_location.on_polygon {
            tracing::debug!(
                "End {end} is not on the navmesh, snapped to {} on polygon {:?}",
                end_location.point,
                end_location.polygon
            );
            status |= PathStatus::END_APPROXIMATE;
        }

        let outcome = self.find_polygon_path(
            start_location.polygon,
            end_location.polygon,
            start_location.point,
            end_location.point,
        )?;
        status |= outcome.status;

        let end_point = if outcome.status.is_complete() {
            end_location.point
        } else {
            self.clamp_to_polygon(outcome.last_polygon, end_location.point)
        };

        Self::collect_portals(self.mesh, &self.polygon_path, &mut self.portals)?;
        string_pull(start_location.point, end_point, &self.portals, sink);
        Ok(status)
    }

    /// Searches the cheapest corridor of polygons from `start_polygon` to `end_polygon`.
    ///
    /// `start` and `end` are positions on the respective polygons. The search walks from
    /// `start` over the midpoints of the portals it crosses, estimating the remaining cost by
    /// the straight distance to `end`. Neighbors the filter rejects are never entered.
    ///
    /// If the goal cannot be reached, the corridor ends at the visited polygon whose position
    /// was closest to `end` and the outcome is flagged [`PathStatus::PARTIAL`].
    /// The corridor is stored in [`NavMeshQuery::polygon_path`].
    ///
    /// # Errors
    ///
    /// Returns [`PathError::InvalidPolygonRef`] if either polygon is not part of the navmesh.
    pub fn find_polygon_path(
        &mut self,
        start_polygon: PolygonRef,
        end_polygon: PolygonRef,
        start: Vec3A,
        end: Vec3A,
    ) -> Result<SearchOutcome, PathError> {
        let mesh = self.mesh;
        for polygon in [start_polygon, end_polygon] {
            if mesh.get_polygon(polygon).is_none() {
                return Err(PathError::InvalidPolygonRef(polygon));
            }
        }

        self.open_list.clear();
        self.polygon_path.clear();

        let start_index = self.node_pool.reset(start_polygon);
        let start_heuristic = start.distance(end);
        {
            let node = &mut self.node_pool[start_index];
            node.position = start;
            node.cost = 0.0;
            node.total = start_heuristic;
            node.parent = None;
            node.flags = NodeFlags::OPEN;
        }
        self.open_list.push(&mut self.node_pool, start_index);

        let mut best_index = start_index;
        let mut best_heuristic = start_heuristic;
        let mut out_of_nodes = false;

        while let Some(current_index) = self.open_list.pop(&mut self.node_pool) {
            let current = &mut self.node_pool[current_index];
            current.flags.remove(NodeFlags::OPEN);
            current.flags.insert(NodeFlags::CLOSED);
            if current.polygon == end_polygon {
                best_index = current_index;
                break;
            }
            let current = *current;

            let parent_polygon = self
                .node_pool
                .get(current.parent)
                .map(|parent| parent.polygon);
            let current_area = mesh.polygon(current.polygon).area;

            for link in mesh.links(current.polygon) {
                let neighbor_polygon = link.target;
                if Some(neighbor_polygon) == parent_polygon {
                    continue;
                }
                let neighbor_area = mesh.polygon(neighbor_polygon).area;
                let Some(extra_cost) = self.filter.traversal_cost(current_area, neighbor_area)
                else {
                    continue;
                };
                let Some(neighbor_index) = self.node_pool.get_or_allocate(neighbor_polygon) else {
                    out_of_nodes = true;
                    continue;
                };

                let neighbor = &mut self.node_pool[neighbor_index];
                if neighbor.flags.is_empty() {
                    let (left, right) = mesh.link_portal(current.polygon, link);
                    neighbor.position = (left + right) * 0.5;
                }

                let step_cost = current.position.distance(neighbor.position) + extra_cost.max(0.0);
                let (cost, heuristic) = if neighbor_polygon == end_polygon {
                    (
                        current.cost + step_cost + neighbor.position.distance(end),
                        0.0,
                    )
                } else {
                    (current.cost + step_cost, neighbor.position.distance(end))
                };
                let total = cost + heuristic;

                if !relax(
                    &mut self.node_pool,
                    &mut self.open_list,
                    neighbor_index,
                    current_index,
                    cost,
                    total,
                ) {
                    continue;
                }

                if heuristic < best_heuristic {
                    best_heuristic = heuristic;
                    best_index = neighbor_index;
                }
            }
        }

        let mut status = PathStatus::empty();
        if out_of_nodes {
            tracing::warn!(
                "Node pool with {} nodes exhausted while searching from polygon {start_polygon:?} to {end_polygon:?}, consider raising `max_nodes`",
                self.node_pool.capacity()
            );
            status |= PathStatus::OUT_OF_NODES;
        }
        let last_polygon = self.node_pool[best_index].polygon;
        if last_polygon != end_polygon {
            tracing::debug!(
                "Polygon {end_polygon:?} is not reachable from {start_polygon:?}, ending the path at {last_polygon:?}"
            );
            status |= PathStatus::PARTIAL;
        }

        self.retrieve_path(best_index);
        Ok(SearchOutcome {
            status,
            last_polygon,
        })
    }

    /// Pulls a straight path from `start` to `end` through `corridor` and appends its corner
    /// points to `sink`.
    ///
    /// `start` should lie on the first polygon of the corridor and `end` on the last one.
    /// The first appended point is `start`, the last one `end`. At most `corridor.len() + 2`
    /// points are appended.
    ///
    /// Nothing is appended if an error is returned.
    ///
    /// # Errors
    ///
    /// - [`PathError::EmptyCorridor`] if `corridor` is empty.
    /// - [`PathError::InvalidPolygonRef`] if a polygon of `corridor` is not part of the navmesh.
    /// - [`PathError::NoPortal`] if two consecutive polygons of `corridor` are not linked.
    pub fn find_straight_path(
        &mut self,
        corridor: &[PolygonRef],
        start: Vec3A,
        end: Vec3A,
        sink: &mut impl PathSink,
    ) -> Result<(), PathError> {
        Self::collect_portals(self.mesh, corridor, &mut self.portals)?;
        string_pull(start, end, &self.portals, sink);
        Ok(())
    }

    /// Fills `portals` with the shared edges between consecutive polygons of `corridor`.
    fn collect_portals(
        mesh: &NavMesh,
        corridor: &[PolygonRef],
        portals: &mut Vec<(Vec3A, Vec3A)>,
    ) -> Result<(), PathError> {
        portals.clear();
        if corridor.is_empty() {
            return Err(PathError::EmptyCorridor);
        }
        if let Some(&invalid) = corridor
            .iter()
            .find(|polygon| mesh.get_polygon(**polygon).is_none())
        {
            return Err(PathError::InvalidPolygonRef(invalid));
        }
        for pair in corridor.windows(2) {
            let (from, to) = (pair[0], pair[1]);
            let portal = mesh
                .get_portal(from, to)
                .ok_or(PathError::NoPortal { from, to })?;
            portals.push(portal);
        }
        Ok(())
    }

    /// Returns `point` if it lies on `polygon`, otherwise the closest point on its boundary.
    fn clamp_to_polygon(&self, polygon: PolygonRef, point: Vec3A) -> Vec3A {
        let polygon = self.mesh.polygon(polygon);
        match self.mesh.polygon_height(polygon, point) {
            Some(height) => Vec3A::new(point.x, height, point.z),
            None => self.mesh.closest_point_on_polygon(polygon, point),
        }
    }

    /// Stores the corridor ending at `last` in [`NavMeshQuery::polygon_path`].
    fn retrieve_path(&mut self, last: NodeIndex) {
        self.polygon_path.clear();
        let mut next = Some(last);
        // Bounded by the pool size in case the parents form a cycle.
        while let Some(node) = self.node_pool.get(next) {
            if self.polygon_path.len() >= self.node_pool.len() {
                tracing::error!("Search nodes form a parent cycle, truncating the corridor");
                break;
            }
            self.polygon_path.push(node.polygon);
            next = node.parent;
        }
        self.polygon_path.reverse();
    }
}

/// Offers `node` the route through `parent` with the given `cost` and `total`.
///
/// The route is taken if the node is unvisited or the route is cheaper than its current one.
/// A closed node is then reopened. Returns whether the route was taken.
fn relax(
    node_pool: &mut NodePool,
    open_list: &mut OpenList,
    node: NodeIndex,
    parent: NodeIndex,
    cost: f32,
    total: f32,
) -> bool {
    let search_node = &mut node_pool[node];
    if search_node
        .flags
        .intersects(NodeFlags::OPEN | NodeFlags::CLOSED)
        && search_node.total <= total
    {
        return false;
    }

    search_node.parent = Some(parent);
    search_node.flags.remove(NodeFlags::CLOSED);
    search_node.cost = cost;
    search_node.total = total;
    if search_node.flags.contains(NodeFlags::OPEN) {
        open_list.fix(node_pool, node);
    } else {
        search_node.flags.insert(NodeFlags::OPEN);
        open_list.push(node_pool, node);
    }
    true
}
