//! Math types for EchoBake
//!
//! Simulation state is double precision throughout, so the `f64` variants of
//! the `glam` types are re-exported here.

pub use glam::{DAffine3, DQuat, DVec3};

/// Placement of a mesh in world space.
///
/// The transform is applied to local vertices as scale, then rotation, then
/// translation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshTransform {
    pub position: DVec3,
    pub rotation: DQuat,
    pub scale: DVec3,
}

impl MeshTransform {
    pub fn new(position: DVec3, rotation: DQuat, scale: DVec3) -> Self {
        Self {
            position,
            rotation,
            scale,
        }
    }

    pub fn identity() -> Self {
        Self {
            position: DVec3::ZERO,
            rotation: DQuat::IDENTITY,
            scale: DVec3::ONE,
        }
    }

    pub fn from_position(position: DVec3) -> Self {
        Self {
            position,
            rotation: DQuat::IDENTITY,
            scale: DVec3::ONE,
        }
    }

    pub fn affine(&self) -> DAffine3 {
        DAffine3::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }

    /// Transforms a local-space point into world space.
    pub fn apply(&self, point: DVec3) -> DVec3 {
        self.affine().transform_point3(point)
    }
}

impl Default for MeshTransform {
    fn default() -> Self {
        Self::identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_transform_is_noop() {
        let p = DVec3::new(1.0, -2.0, 3.0);
        assert_eq!(MeshTransform::identity().apply(p), p);
    }

    #[test]
    fn test_scale_applies_before_translation() {
        let transform = MeshTransform::new(
            DVec3::new(10.0, 0.0, 0.0),
            DQuat::IDENTITY,
            DVec3::splat(2.0),
        );
        let p = transform.apply(DVec3::new(1.0, 1.0, 1.0));
        assert!((p - DVec3::new(12.0, 2.0, 2.0)).length() < 1e-12);
    }

    #[test]
    fn test_rotation_about_y() {
        let transform = MeshTransform::new(
            DVec3::ZERO,
            DQuat::from_rotation_y(std::f64::consts::FRAC_PI_2),
            DVec3::ONE,
        );
        let p = transform.apply(DVec3::new(1.0, 0.0, 0.0));
        assert!((p - DVec3::new(0.0, 0.0, -1.0)).length() < 1e-9);
    }
}
