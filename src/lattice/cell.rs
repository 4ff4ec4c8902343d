use crate::math::DVec3;

/// Physical state of a single lattice cell.
///
/// `pressure` and `velocity` are overwritten on every time step of a run.
/// `absorption` and `open` are written once by the classification pass and
/// are read-only for the solver.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoxelCell {
    /// Scalar air pressure at the cell.
    pub pressure: f64,
    /// Particle velocity at the cell.
    pub velocity: DVec3,
    /// Absorption coefficient in [0, 1]. 0 is fully reflective.
    pub absorption: f64,
    /// Whether the cell is open air. Closed cells have their pressure forced
    /// toward zero on every step.
    pub open: bool,
}

impl VoxelCell {
    /// Gate factor multiplied into the pressure update: 1 for open air, 0 for
    /// solid.
    pub fn gate(&self) -> f64 {
        if self.open { 1.0 } else { 0.0 }
    }

    /// Admittance-like boundary term derived from the absorption coefficient.
    /// Fully reflective cells yield 1, fully absorptive cells yield 0.
    pub fn admittance(&self) -> f64 {
        (1.0 - self.absorption) / (1.0 + self.absorption)
    }

    pub(crate) fn reset_fields(&mut self) {
        self.pressure = 0.0;
        self.velocity = DVec3::ZERO;
    }
}

impl Default for VoxelCell {
    fn default() -> Self {
        Self {
            pressure: 0.0,
            velocity: DVec3::ZERO,
            absorption: 0.0,
            open: true,
        }
    }
}
