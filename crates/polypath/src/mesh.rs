//! The static polygon graph queried by [`NavMeshQuery`](crate::NavMeshQuery).
//!
//! A [`NavMesh`] is a flat set of convex polygons that index into a shared vertex array.
//! Polygons are connected through [`Link`]s, one per shared edge and direction, stored as a
//! singly linked list per polygon. Once built, a navmesh is never mutated, so any number of
//! queries may read it at the same time.

use std::ops::Deref;

use glam::Vec3A;
use thiserror::Error;

use crate::math::{distance_point_segment_sqr_2d, height_on_triangle};

/// The maximum number of vertices a [`Polygon`] can have.
pub const MAX_VERTICES_PER_POLYGON: usize = 6;

/// Stable index of a [`Polygon`] inside its [`NavMesh`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct PolygonRef(pub u32);

impl PolygonRef {
    /// The index of the polygon in [`NavMesh::polygons`].
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl From<u32> for PolygonRef {
    fn from(value: u32) -> Self {
        PolygonRef(value)
    }
}

/// The traversal class of a polygon.
///
/// Whether an agent may cross from one area to another is decided by a
/// [`QueryFilter`](crate::QueryFilter). The default filter only allows moving between
/// polygons of the same area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[repr(transparent)]
pub struct AreaType(pub u16);

impl Deref for AreaType {
    type Target = u16;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<u16> for AreaType {
    fn from(value: u16) -> Self {
        AreaType(value)
    }
}

impl AreaType {
    /// The area assigned to polygons by default.
    pub const DEFAULT: Self = Self(0);
}

/// A convex polygon of a [`NavMesh`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Polygon {
    /// Indices into [`NavMesh::vertices`]. Only the first [`Polygon::vertex_count`] are used.
    vertices: [u32; MAX_VERTICES_PER_POLYGON],
    vertex_count: u8,
    /// The traversal class of the polygon.
    pub area: AreaType,
    /// Index of the first [`Link`] of this polygon, `None` if it has no neighbors.
    pub first_link: Option<u32>,
}

impl Polygon {
    /// Creates an unconnected polygon from its vertex indices.
    ///
    /// The vertices must describe a convex polygon. Consecutive vertices `i` and `i + 1`
    /// (wrapping around) form edge `i`.
    ///
    /// The vertices must be wound clockwise in the xz-plane drawn with x to the right and z
    /// up, as in `(0, 0, 1), (1, 0, 1), (1, 0, 0), (0, 0, 0)`. [`tri_area_2d`] is then positive
    /// for any three consecutive vertices. Path queries over counter-clockwise polygons swap
    /// the sides of every portal and can cut corners.
    ///
    /// [`tri_area_2d`]: crate::math::tri_area_2d
    pub fn new(vertices: &[u32], area: AreaType) -> Result<Self, NavMeshError> {
        if vertices.len() < 3 || vertices.len() > MAX_VERTICES_PER_POLYGON {
            return Err(NavMeshError::InvalidVertexCount {
                count: vertices.len(),
            });
        }
        let mut indices = [0; MAX_VERTICES_PER_POLYGON];
        indices[..vertices.len()].copy_from_slice(vertices);
        Ok(Self {
            vertices: indices,
            vertex_count: vertices.len() as u8,
            area,
            first_link: None,
        })
    }

    /// The vertex indices of the polygon, in winding order.
    #[inline]
    pub fn vertices(&self) -> &[u32] {
        &self.vertices[..self.vertex_count as usize]
    }

    /// The number of vertices, and thus edges, of the polygon.
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertex_count as usize
    }

    /// Returns the vertex indices of edge `edge`.
    #[inline]
    fn edge(&self, edge: u8) -> (u32, u32) {
        let count = self.vertex_count as usize;
        let edge = edge as usize;
        (self.vertices[edge], self.vertices[(edge + 1) % count])
    }
}

/// A directed connection from one polygon to a neighbor sharing an edge with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Link {
    /// The neighbor polygon.
    pub target: PolygonRef,
    /// The next link of the owning polygon.
    pub next: Option<u32>,
    /// The local edge of the owning polygon that is shared with [`Link::target`].
    /// Edge `i` spans vertex `i` to vertex `i + 1` (wrapping around).
    pub edge: u8,
}

/// A static navigation mesh. Build with [`NavMeshBuilder`] or [`NavMesh::new`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NavMesh {
    vertices: Vec<Vec3A>,
    polygons: Vec<Polygon>,
    links: Vec<Link>,
}

/// The result of placing a point on a [`NavMesh`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PolygonLocation {
    /// The polygon the point was placed on.
    pub polygon: PolygonRef,
    /// The placed point.
    /// Its height is sampled from the polygon if [`PolygonLocation::on_polygon`],
    /// otherwise it is the closest point on the polygon's boundary.
    pub point: Vec3A,
    /// Whether the xz-projection of the point was inside the polygon.
    pub on_polygon: bool,
}

impl NavMesh {
    /// Creates a navmesh from raw data, checking that all indices are in bounds.
    pub fn new(
        vertices: Vec<Vec3A>,
        polygons: Vec<Polygon>,
        links: Vec<Link>,
    ) -> Result<Self, NavMeshError> {
        let mesh = Self {
            vertices,
            polygons,
            links,
        };
        mesh.validate()?;
        Ok(mesh)
    }

    fn validate(&self) -> Result<(), NavMeshError> {
        for (i, polygon) in self.polygons.iter().enumerate() {
            let polygon_ref = PolygonRef(i as u32);
            if let Some(&vertex) = polygon
                .vertices()
                .iter()
                .find(|&&vertex| vertex as usize >= self.vertices.len())
            {
                return Err(NavMeshError::VertexOutOfBounds {
                    polygon: polygon_ref,
                    vertex,
                });
            }
            if let Some(link) = polygon.first_link {
                if link as usize >= self.links.len() {
                    return Err(NavMeshError::LinkOutOfBounds { link });
                }
            }
        }
        for (i, link) in self.links.iter().enumerate() {
            if link.target.index() >= self.polygons.len() {
                return Err(NavMeshError::LinkTargetOutOfBounds {
                    link: i as u32,
                    target: link.target,
                });
            }
            if let Some(next) = link.next {
                if next as usize >= self.links.len() {
                    return Err(NavMeshError::LinkOutOfBounds { link: next });
                }
            }
        }
        // Edges can only be checked against the polygon owning the link.
        for (i, polygon) in self.polygons.iter().enumerate() {
            for link in self.links(PolygonRef(i as u32)).take(self.links.len()) {
                if link.edge as usize >= polygon.vertex_count() {
                    return Err(NavMeshError::EdgeOutOfBounds {
                        polygon: PolygonRef(i as u32),
                        edge: link.edge,
                    });
                }
            }
        }
        Ok(())
    }

    /// All vertices of the navmesh.
    #[inline]
    pub fn vertices(&self) -> &[Vec3A] {
        &self.vertices
    }

    /// All polygons of the navmesh. A polygon's index is its [`PolygonRef`].
    #[inline]
    pub fn polygons(&self) -> &[Polygon] {
        &self.polygons
    }

    /// The number of polygons in the navmesh.
    #[inline]
    pub fn polygon_count(&self) -> usize {
        self.polygons.len()
    }

    /// Returns the polygon with the given reference, `None` if it is not part of this navmesh.
    #[inline]
    pub fn get_polygon(&self, polygon: PolygonRef) -> Option<&Polygon> {
        self.polygons.get(polygon.index())
    }

    /// Returns the polygon with the given reference.
    /// # Panics
    /// Panics if the reference is not part of this navmesh.
    #[inline]
    pub fn polygon(&self, polygon: PolygonRef) -> &Polygon {
        &self.polygons[polygon.index()]
    }

    /// Iterates over the positions of a polygon's vertices in winding order.
    pub fn polygon_vertices(&self, polygon: &Polygon) -> impl Iterator<Item = Vec3A> {
        polygon
            .vertices()
            .iter()
            .map(|&vertex| self.vertices[vertex as usize])
    }

    /// Iterates over the outgoing links of a polygon.
    /// # Panics
    /// Panics if the reference is not part of this navmesh.
    pub fn links(&self, polygon: PolygonRef) -> Links<'_> {
        Links {
            links: &self.links,
            next: self.polygon(polygon).first_link,
        }
    }

    /// Returns the two vertices of the edge that `link` crosses, in the winding order of `from`.
    #[inline]
    pub(crate) fn link_portal(&self, from: PolygonRef, link: &Link) -> (Vec3A, Vec3A) {
        let (a, b) = self.polygon(from).edge(link.edge);
        (self.vertices[a as usize], self.vertices[b as usize])
    }

    /// Returns the shared edge between two adjacent polygons as `(left, right)`,
    /// in the winding order of `from`.
    ///
    /// Returns `None` if `from` has no link to `to`.
    pub fn get_portal(&self, from: PolygonRef, to: PolygonRef) -> Option<(Vec3A, Vec3A)> {
        self.get_polygon(from)?;
        let link = self.links(from).find(|link| link.target == to)?;
        Some(self.link_portal(from, link))
    }

    /// Returns the midpoint of the shared edge between two adjacent polygons.
    ///
    /// Returns `None` if `from` has no link to `to`.
    pub fn edge_mid_point(&self, from: PolygonRef, to: PolygonRef) -> Option<Vec3A> {
        let (left, right) = self.get_portal(from, to)?;
        Some((left + right) * 0.5)
    }

    /// Samples the height of the polygon at the xz-position of `point`.
    ///
    /// Returns `None` if the xz-projection of `point` is not inside the polygon.
    pub fn polygon_height(&self, polygon: &Polygon, point: Vec3A) -> Option<f32> {
        let vertices = polygon.vertices();
        let v0 = self.vertices[vertices[0] as usize];
        vertices[1..].windows(2).find_map(|edge| {
            let v1 = self.vertices[edge[0] as usize];
            let v2 = self.vertices[edge[1] as usize];
            height_on_triangle(point, v0, v1, v2)
        })
    }

    /// Returns the point on the polygon's boundary that is closest to `point` on the xz-plane.
    /// The height is interpolated along the closest edge.
    pub fn closest_point_on_polygon(&self, polygon: &Polygon, point: Vec3A) -> Vec3A {
        let mut best = (Vec3A::ZERO, f32::MAX);
        for i in 0..polygon.vertex_count() {
            let (a, b) = polygon.edge(i as u8);
            let a = self.vertices[a as usize];
            let b = self.vertices[b as usize];
            let (t, distance_sqr) = distance_point_segment_sqr_2d(point, a, b);
            if distance_sqr < best.1 {
                best = (a.lerp(b, t), distance_sqr);
            }
        }
        best.0
    }

    /// Finds the polygon `point` lies on.
    ///
    /// Polygons are scanned in order and the first one containing the xz-projection of `point`
    /// wins. If no polygon contains it, the point is snapped to the boundary point closest to it
    /// in 3D over all polygons and [`PolygonLocation::on_polygon`] is `false`.
    ///
    /// Returns `None` only if the navmesh has no polygons.
    pub fn locate_polygon(&self, point: Vec3A) -> Option<PolygonLocation> {
        let mut closest: Option<(PolygonLocation, f32)> = None;
        for (i, polygon) in self.polygons.iter().enumerate() {
            let polygon_ref = PolygonRef(i as u32);
            if let Some(height) = self.polygon_height(polygon, point) {
                return Some(PolygonLocation {
                    polygon: polygon_ref,
                    point: Vec3A::new(point.x, height, point.z),
                    on_polygon: true,
                });
            }
            let boundary_point = self.closest_point_on_polygon(polygon, point);
            let distance_sqr = point.distance_squared(boundary_point);
            if closest
                .as_ref()
                .is_none_or(|(_, best_distance_sqr)| distance_sqr < *best_distance_sqr)
            {
                closest = Some((
                    PolygonLocation {
                        polygon: polygon_ref,
                        point: boundary_point,
                        on_polygon: false,
                    },
                    distance_sqr,
                ));
            }
        }
        closest.map(|(location, _)| location)
    }
}

/// Iterator over the [`Link`]s of a polygon, created by [`NavMesh::links`].
#[derive(Debug, Clone)]
pub struct Links<'a> {
    links: &'a [Link],
    next: Option<u32>,
}

impl<'a> Iterator for Links<'a> {
    type Item = &'a Link;

    fn next(&mut self) -> Option<Self::Item> {
        let link = &self.links[self.next? as usize];
        self.next = link.next;
        Some(link)
    }
}

/// A builder for [`NavMesh`]es.
///
/// Links are directed. Two adjacent polygons need a link in each direction to be traversable
/// both ways.
#[derive(Debug, Clone, Default)]
pub struct NavMeshBuilder {
    /// The vertices polygons index into.
    pub vertices: Vec<Vec3A>,
    polygons: Vec<Polygon>,
    links: Vec<Link>,
}

impl NavMeshBuilder {
    /// Adds a vertex and returns its index.
    pub fn add_vertex(&mut self, vertex: impl Into<Vec3A>) -> u32 {
        self.vertices.push(vertex.into());
        self.vertices.len() as u32 - 1
    }

    /// Adds an unconnected polygon and returns its reference.
    ///
    /// `vertices` must be wound clockwise in the xz-plane drawn with x to the right and z up.
    /// See [`Polygon::new`].
    pub fn add_polygon(
        &mut self,
        vertices: &[u32],
        area: AreaType,
    ) -> Result<PolygonRef, NavMeshError> {
        let polygon = Polygon::new(vertices, area)?;
        self.polygons.push(polygon);
        Ok(PolygonRef(self.polygons.len() as u32 - 1))
    }

    /// Connects edge `edge` of `from` to `to`.
    ///
    /// The link is prepended to the link list of `from`, so links are visited in reverse
    /// insertion order.
    pub fn link(&mut self, from: PolygonRef, edge: u8, to: PolygonRef) -> Result<(), NavMeshError> {
        if to.index() >= self.polygons.len() {
            return Err(NavMeshError::LinkTargetOutOfBounds {
                link: self.links.len() as u32,
                target: to,
            });
        }
        let Some(polygon) = self.polygons.get_mut(from.index()) else {
            return Err(NavMeshError::PolygonOutOfBounds { polygon: from });
        };
        if edge as usize >= polygon.vertex_count() {
            return Err(NavMeshError::EdgeOutOfBounds {
                polygon: from,
                edge,
            });
        }
        self.links.push(Link {
            target: to,
            next: polygon.first_link,
            edge,
        });
        polygon.first_link = Some(self.links.len() as u32 - 1);
        Ok(())
    }

    /// Builds the navmesh.
    pub fn build(self) -> Result<NavMesh, NavMeshError> {
        NavMesh::new(self.vertices, self.polygons, self.links)
    }
}

/// Errors that can occur when building a [`NavMesh`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum NavMeshError {
    /// A polygon has too few or too many vertices.
    #[error(
        "Polygons need between 3 and {max} vertices, but got {count}",
        max = MAX_VERTICES_PER_POLYGON
    )]
    InvalidVertexCount {
        /// The vertex count of the offending polygon.
        count: usize,
    },
    /// A polygon refers to a vertex that does not exist.
    #[error("Polygon {polygon:?} refers to vertex {vertex}, which is out of bounds")]
    VertexOutOfBounds {
        /// The offending polygon.
        polygon: PolygonRef,
        /// The missing vertex index.
        vertex: u32,
    },
    /// A polygon reference does not exist.
    #[error("Polygon {polygon:?} is out of bounds")]
    PolygonOutOfBounds {
        /// The missing polygon.
        polygon: PolygonRef,
    },
    /// A link index does not exist.
    #[error("Link {link} is out of bounds")]
    LinkOutOfBounds {
        /// The missing link index.
        link: u32,
    },
    /// A link points to a polygon that does not exist.
    #[error("Link {link} targets polygon {target:?}, which is out of bounds")]
    LinkTargetOutOfBounds {
        /// The offending link.
        link: u32,
        /// The missing polygon.
        target: PolygonRef,
    },
    /// A link crosses an edge its polygon does not have.
    #[error("Polygon {polygon:?} has no edge {edge}")]
    EdgeOutOfBounds {
        /// The polygon owning the link.
        polygon: PolygonRef,
        /// The offending edge index.
        edge: u8,
    },
}
