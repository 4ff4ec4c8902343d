use crate::error::{EchoBakeError, Result};
use crate::math::{DVec3, MeshTransform};

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: DVec3,
    pub max: DVec3,
}

impl Aabb {
    pub fn from_center_size(center: DVec3, size: DVec3) -> Self {
        Self {
            min: center - size / 2.0,
            max: center + size / 2.0,
        }
    }

    /// Smallest box enclosing all `points`. Callers must pass at least one
    /// point.
    pub fn from_points(points: &[DVec3]) -> Self {
        let mut min = DVec3::splat(f64::INFINITY);
        let mut max = DVec3::splat(f64::NEG_INFINITY);
        for &p in points {
            min = min.min(p);
            max = max.max(p);
        }
        Self { min, max }
    }

    /// True when the boxes overlap, touching included.
    pub fn overlaps(&self, other: &Aabb) -> bool {
        // Boxes are separated if any axis separates them.
        if self.max.x < other.min.x || self.min.x > other.max.x {
            return false;
        }
        if self.max.y < other.min.y || self.min.y > other.max.y {
            return false;
        }
        if self.max.z < other.min.z || self.min.z > other.max.z {
            return false;
        }
        true
    }

    /// True when `point` lies inside the box, boundary included.
    pub fn contains(&self, point: DVec3) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
            && point.z >= self.min.z
            && point.z <= self.max.z
    }
}

/// An immutable world-space triangle mesh.
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    vertices: Vec<DVec3>,
    triangles: Vec<[u32; 3]>,
    aabb: Aabb,
}

impl Mesh {
    /// Builds a world-space mesh from caller-local vertices and a flat index
    /// list, applying `transform` to every vertex.
    ///
    /// # Errors
    ///
    /// Fails when there are fewer than 3 vertices or indices, when the index
    /// count is not a multiple of 3, or when an index is out of range. Nothing
    /// is stored on failure.
    pub fn from_local(vertices: &[DVec3], indices: &[u32], transform: MeshTransform) -> Result<Self> {
        if vertices.len() < 3 {
            return Err(EchoBakeError::InvalidParam(format!(
                "a mesh needs at least 3 vertices, got {}",
                vertices.len()
            )));
        }
        if indices.len() < 3 {
            return Err(EchoBakeError::InvalidParam(format!(
                "a mesh needs at least 3 indices, got {}",
                indices.len()
            )));
        }
        if indices.len() % 3 != 0 {
            return Err(EchoBakeError::InvalidParam(format!(
                "index count must be a multiple of 3, got {}",
                indices.len()
            )));
        }
        if let Some(&bad) = indices.iter().find(|&&i| i as usize >= vertices.len()) {
            return Err(EchoBakeError::InvalidParam(format!(
                "index {bad} is outside the {} supplied vertices",
                vertices.len()
            )));
        }

        let world_vertices: Vec<DVec3> = vertices.iter().map(|&v| transform.apply(v)).collect();
        let triangles: Vec<[u32; 3]> = indices
            .chunks_exact(3)
            .map(|t| [t[0], t[1], t[2]])
            .collect();
        let aabb = Aabb::from_points(&world_vertices);

        Ok(Self {
            vertices: world_vertices,
            triangles,
            aabb,
        })
    }

    /// An axis-aligned box mesh, 12 triangles. Handy for tests and simple
    /// blocking volumes.
    pub fn cuboid(center: DVec3, size: DVec3) -> Self {
        let h = size / 2.0;
        let min = center - h;
        let max = center + h;
        let vertices = vec![
            DVec3::new(min.x, min.y, min.z),
            DVec3::new(max.x, min.y, min.z),
            DVec3::new(max.x, max.y, min.z),
            DVec3::new(min.x, max.y, min.z),
            DVec3::new(min.x, min.y, max.z),
            DVec3::new(max.x, min.y, max.z),
            DVec3::new(max.x, max.y, max.z),
            DVec3::new(min.x, max.y, max.z),
        ];
        let triangles = vec![
            [0, 2, 1],
            [0, 3, 2],
            [4, 5, 6],
            [4, 6, 7],
            [0, 1, 5],
            [0, 5, 4],
            [3, 7, 6],
            [3, 6, 2],
            [0, 4, 7],
            [0, 7, 3],
            [1, 2, 6],
            [1, 6, 5],
        ];
        let aabb = Aabb { min, max };
        Self {
            vertices,
            triangles,
            aabb,
        }
    }

    pub fn vertices(&self) -> &[DVec3] {
        &self.vertices
    }

    pub fn triangles(&self) -> &[[u32; 3]] {
        &self.triangles
    }

    pub fn aabb(&self) -> &Aabb {
        &self.aabb
    }

    /// Vertex positions of one triangle.
    pub fn triangle(&self, index: usize) -> [DVec3; 3] {
        let [a, b, c] = self.triangles[index];
        [
            self.vertices[a as usize],
            self.vertices[b as usize],
            self.vertices[c as usize],
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mesh_rejects_degenerate_input() {
        let verts = [DVec3::ZERO, DVec3::X, DVec3::Y];
        assert!(Mesh::from_local(&verts[..2], &[0, 1, 2], MeshTransform::identity()).is_err());
        assert!(Mesh::from_local(&verts, &[0, 1], MeshTransform::identity()).is_err());
        assert!(Mesh::from_local(&verts, &[0, 1, 2, 0], MeshTransform::identity()).is_err());
        assert!(Mesh::from_local(&verts, &[0, 1, 3], MeshTransform::identity()).is_err());
    }

    #[test]
    fn test_mesh_applies_transform() {
        let verts = [DVec3::ZERO, DVec3::X, DVec3::Y];
        let mesh = Mesh::from_local(
            &verts,
            &[0, 1, 2],
            MeshTransform::from_position(DVec3::new(0.0, 0.0, 5.0)),
        )
        .unwrap();
        assert_eq!(mesh.vertices()[0], DVec3::new(0.0, 0.0, 5.0));
        assert_eq!(mesh.aabb().min, DVec3::new(0.0, 0.0, 5.0));
        assert_eq!(mesh.aabb().max, DVec3::new(1.0, 1.0, 5.0));
    }

    #[test]
    fn test_cuboid_bounds() {
        let mesh = Mesh::cuboid(DVec3::ZERO, DVec3::splat(2.0));
        assert_eq!(mesh.triangles().len(), 12);
        assert_eq!(mesh.aabb().min, DVec3::splat(-1.0));
        assert_eq!(mesh.aabb().max, DVec3::splat(1.0));
    }

    #[test]
    fn test_aabb_overlap() {
        let a = Aabb::from_center_size(DVec3::ZERO, DVec3::splat(2.0));
        let b = Aabb::from_center_size(DVec3::new(1.5, 0.0, 0.0), DVec3::splat(2.0));
        let c = Aabb::from_center_size(DVec3::new(5.0, 0.0, 0.0), DVec3::splat(2.0));
        // Touching boxes overlap.
        let d = Aabb::from_center_size(DVec3::new(2.0, 0.0, 0.0), DVec3::splat(2.0));
        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&c));
        assert!(a.overlaps(&d));
    }
}
