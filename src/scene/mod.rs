//! Scene geometry: world-space triangle meshes and the containment queries
//! the classification pass relies on.

pub mod containment;
pub mod mesh;

pub use containment::{point_inside_mesh, points_inside_mesh};
pub use mesh::{Aabb, Mesh};
