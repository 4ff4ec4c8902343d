//! Point-in-mesh containment testing using ray casting.
//!
//! A ray is cast from each sample point along a fixed direction and the number
//! of surface crossings is counted; an odd count means the point is inside the
//! mesh. Points on or nearly on the surface cannot be classified reliably and
//! are reported as errors so that callers can decide how to treat them.

use super::mesh::Mesh;
use crate::error::{EchoBakeError, Result};
use crate::math::DVec3;

const EPS: f64 = 1e-9;

/// Crossing-test ray direction. Deliberately incommensurate with the axes so
/// grid-aligned geometry does not produce edge-grazing rays.
const RAY_DIRECTION: DVec3 = DVec3::new(0.57803, 0.70125, 0.41682);

/// Classifies each sample point as inside (`true`) or outside (`false`) the
/// mesh.
///
/// # Errors
///
/// Fails when any sample point is degenerate: on the mesh surface, or casting
/// a ray that grazes a triangle edge.
pub fn points_inside_mesh(mesh: &Mesh, points: &[DVec3]) -> Result<Vec<bool>> {
    points
        .iter()
        .map(|&point| point_inside_mesh(mesh, point))
        .collect()
}

/// Classifies a single point. See [`points_inside_mesh`].
pub fn point_inside_mesh(mesh: &Mesh, point: DVec3) -> Result<bool> {
    // Quick rejection: outside the bounding box means outside the mesh.
    if !mesh.aabb().contains(point) {
        return Ok(false);
    }

    let mut crossings = 0usize;
    for index in 0..mesh.triangles().len() {
        if ray_crosses_triangle(point, RAY_DIRECTION, mesh.triangle(index))?.is_some() {
            crossings += 1;
        }
    }

    Ok(crossings % 2 == 1)
}

/// Ray/triangle intersection distance, or `None` for a miss.
///
/// # Errors
///
/// Fails when the ray origin lies on the triangle or the crossing lands on a
/// triangle edge, where the parity count is unreliable.
fn ray_crosses_triangle(origin: DVec3, direction: DVec3, [a, b, c]: [DVec3; 3]) -> Result<Option<f64>> {
    let edge1 = b - a;
    let edge2 = c - a;
    let pvec = direction.cross(edge2);
    let det = edge1.dot(pvec);

    // Parallel rays never cross the triangle plane.
    if det.abs() < EPS {
        return Ok(None);
    }

    let inv_det = 1.0 / det;
    let tvec = origin - a;
    let u = tvec.dot(pvec) * inv_det;
    if !(0.0..=1.0).contains(&u) {
        return Ok(None);
    }

    let qvec = tvec.cross(edge1);
    let v = direction.dot(qvec) * inv_det;
    if v < 0.0 || u + v > 1.0 {
        return Ok(None);
    }

    let t = edge2.dot(qvec) * inv_det;
    if t < -EPS {
        return Ok(None);
    }
    if t.abs() <= EPS {
        return Err(EchoBakeError::GeometryQuery(format!(
            "sample point {origin} lies on the mesh surface"
        )));
    }
    if u < EPS || v < EPS || u + v > 1.0 - EPS {
        return Err(EchoBakeError::GeometryQuery(format!(
            "crossing ray from {origin} grazes a triangle edge"
        )));
    }

    Ok(Some(t))
}
