#![doc = include_str!("../../../readme.md")]

mod filter;
mod funnel;
pub mod math;
mod mesh;
mod node_pool;
mod open_list;
mod query;
#[cfg(test)]
mod test_mesh;

pub use filter::{AreaFilter, QueryFilter};
pub use mesh::{
    AreaType, Link, Links, MAX_VERTICES_PER_POLYGON, NavMesh, NavMeshBuilder, NavMeshError,
    Polygon, PolygonLocation, PolygonRef,
};
pub use node_pool::{NodeFlags, NodeIndex, NodePool, SearchNode};
pub use open_list::OpenList;
pub use query::{NavMeshQuery, PathError, PathSink, PathStatus, SearchOutcome};
