//! Uniform voxel lattice over a world-space bounding box.
//!
//! The lattice stores one [`VoxelCell`] per grid cell in a flat array indexed
//! by `x + y * nx + z * nx * ny`. World positions and cell indices convert
//! both ways; the conversions are mutual inverses at cell-center granularity.

mod cell;

pub use cell::VoxelCell;

use crate::error::{EchoBakeError, Result};
use crate::math::DVec3;

/// Geometry of a lattice: where it sits, how many cells it has and how big
/// each cell is.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatticeConfig {
    center: DVec3,
    size: DVec3,
    cell_size: f64,
    counts: [usize; 3],
}

impl LatticeConfig {
    /// Validates the requested extent and derives per-axis cell counts.
    ///
    /// Counts are `floor(size_axis / cell_size)`; an axis that fits no whole
    /// cell is an error.
    pub fn new(center: DVec3, size: DVec3, cell_size: f64) -> Result<Self> {
        if !(size.x > 0.0 && size.y > 0.0 && size.z > 0.0) {
            return Err(EchoBakeError::InvalidParam(format!(
                "lattice size must be strictly positive, got {size}"
            )));
        }
        if !(cell_size > 0.0) {
            return Err(EchoBakeError::InvalidParam(format!(
                "cell size must be strictly positive, got {cell_size}"
            )));
        }

        let counts = [
            (size.x / cell_size).floor() as usize,
            (size.y / cell_size).floor() as usize,
            (size.z / cell_size).floor() as usize,
        ];
        if counts.iter().any(|&n| n == 0) {
            return Err(EchoBakeError::InvalidParam(format!(
                "no cells of size {cell_size} fit in a lattice of size {size}"
            )));
        }

        Ok(Self {
            center,
            size,
            cell_size,
            counts,
        })
    }

    pub fn center(&self) -> DVec3 {
        self.center
    }

    pub fn size(&self) -> DVec3 {
        self.size
    }

    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    /// Per-axis cell counts `[nx, ny, nz]`.
    pub fn counts(&self) -> [usize; 3] {
        self.counts
    }

    pub fn min_corner(&self) -> DVec3 {
        self.center - self.size / 2.0
    }

    pub fn cell_count(&self) -> usize {
        self.counts[0] * self.counts[1] * self.counts[2]
    }

    /// True when a rebuild with these inputs would produce this configuration.
    pub fn matches(&self, center: DVec3, size: DVec3, cell_size: f64) -> bool {
        self.center == center && self.size == size && self.cell_size == cell_size
    }

    /// Composes a flat index from 3D cell indices. Callers must pass in-range
    /// indices.
    pub fn flat_index(&self, x: usize, y: usize, z: usize) -> usize {
        x + y * self.counts[0] + z * self.counts[0] * self.counts[1]
    }

    /// Decomposes a flat index into 3D cell indices.
    pub fn indices_of_flat(&self, index: usize) -> Result<[usize; 3]> {
        if index >= self.cell_count() {
            return Err(EchoBakeError::NotFound(format!(
                "cell index {index} is outside the lattice of {} cells",
                self.cell_count()
            )));
        }
        let plane = self.counts[0] * self.counts[1];
        let z = index / plane;
        let rem = index % plane;
        Ok([rem % self.counts[0], rem / self.counts[0], z])
    }

    /// Flat index of the cell containing a world position.
    ///
    /// Positions outside the lattice are an error; there is no clamping or
    /// wraparound.
    pub fn index_of_position(&self, position: DVec3) -> Result<usize> {
        let rel = (position - self.min_corner()) / self.cell_size;
        let ix = rel.x.floor();
        let iy = rel.y.floor();
        let iz = rel.z.floor();

        let in_range = |v: f64, count: usize| v >= 0.0 && v < count as f64;
        if !in_range(ix, self.counts[0])
            || !in_range(iy, self.counts[1])
            || !in_range(iz, self.counts[2])
        {
            return Err(EchoBakeError::NotFound(format!(
                "position {position} is outside the lattice"
            )));
        }

        Ok(self.flat_index(ix as usize, iy as usize, iz as usize))
    }

    /// World position of a cell's center.
    pub fn position_of_index(&self, index: usize) -> Result<DVec3> {
        let [x, y, z] = self.indices_of_flat(index)?;
        Ok(self.position_of_indices([x, y, z]))
    }

    pub(crate) fn position_of_indices(&self, [x, y, z]: [usize; 3]) -> DVec3 {
        self.min_corner()
            + (DVec3::new(x as f64, y as f64, z as f64) + DVec3::splat(0.5)) * self.cell_size
    }
}

/// A regular 3D grid of [`VoxelCell`] over a world-space bounding box.
#[derive(Debug, Clone, PartialEq)]
pub struct VoxelLattice {
    config: LatticeConfig,
    cells: Vec<VoxelCell>,
}

impl VoxelLattice {
    /// Allocates an all-open, zero-state lattice for the given configuration.
    pub fn new(config: LatticeConfig) -> Self {
        let cells = vec![VoxelCell::default(); config.cell_count()];
        Self { config, cells }
    }

    pub fn config(&self) -> &LatticeConfig {
        &self.config
    }

    pub fn cells(&self) -> &[VoxelCell] {
        &self.cells
    }

    pub(crate) fn cells_mut(&mut self) -> &mut [VoxelCell] {
        &mut self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn index_of_position(&self, position: DVec3) -> Result<usize> {
        self.config.index_of_position(position)
    }

    pub fn position_of_index(&self, index: usize) -> Result<DVec3> {
        self.config.position_of_index(index)
    }

    /// Sets a cell's classification directly.
    ///
    /// The geometry pass is the usual writer of these fields; this is the
    /// escape hatch for hand-authored occluders.
    pub fn classify_cell(&mut self, index: usize, absorption: f64, open: bool) -> Result<()> {
        if !(0.0..=1.0).contains(&absorption) {
            return Err(EchoBakeError::InvalidParam(format!(
                "absorption must be within [0, 1], got {absorption}"
            )));
        }
        let cell = self.cells.get_mut(index).ok_or_else(|| {
            EchoBakeError::NotFound(format!("cell index {index} is outside the lattice"))
        })?;
        cell.absorption = absorption;
        cell.open = open;
        Ok(())
    }

    /// Zeroes every cell's pressure and velocity, leaving classification
    /// untouched. Runs call this before stepping.
    pub(crate) fn reset_field_state(&mut self) {
        for cell in &mut self.cells {
            cell.reset_fields();
        }
    }

    /// Reopens every cell with zero absorption, ready for a fresh
    /// classification pass.
    pub(crate) fn reset_classification(&mut self) {
        for cell in &mut self.cells {
            cell.absorption = 0.0;
            cell.open = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> LatticeConfig {
        LatticeConfig::new(DVec3::ZERO, DVec3::new(4.0, 3.0, 2.0), 1.0).unwrap()
    }

    #[test]
    fn test_counts_are_floored() {
        let config = LatticeConfig::new(DVec3::ZERO, DVec3::new(4.9, 3.0, 2.1), 1.0).unwrap();
        assert_eq!(config.counts(), [4, 3, 2]);
    }

    #[test]
    fn test_rejects_non_positive_extents() {
        assert!(LatticeConfig::new(DVec3::ZERO, DVec3::new(0.0, 1.0, 1.0), 0.5).is_err());
        assert!(LatticeConfig::new(DVec3::ZERO, DVec3::new(1.0, -1.0, 1.0), 0.5).is_err());
        assert!(LatticeConfig::new(DVec3::ZERO, DVec3::ONE, 0.0).is_err());
        assert!(LatticeConfig::new(DVec3::ZERO, DVec3::ONE, -1.0).is_err());
    }

    #[test]
    fn test_rejects_axis_with_no_cells() {
        // 0.5 units along Y fits no whole 1-unit cell.
        let result = LatticeConfig::new(DVec3::ZERO, DVec3::new(4.0, 0.5, 2.0), 1.0);
        assert!(result.is_err());
    }

    #[test]
    fn test_round_trip_for_every_cell() {
        let config = config();
        for index in 0..config.cell_count() {
            let position = config.position_of_index(index).unwrap();
            assert_eq!(config.index_of_position(position).unwrap(), index);
        }
    }

    #[test]
    fn test_flat_index_is_a_bijection() {
        let config = config();
        let mut seen = vec![false; config.cell_count()];
        for z in 0..config.counts()[2] {
            for y in 0..config.counts()[1] {
                for x in 0..config.counts()[0] {
                    let flat = config.flat_index(x, y, z);
                    assert!(!seen[flat]);
                    seen[flat] = true;
                    assert_eq!(config.indices_of_flat(flat).unwrap(), [x, y, z]);
                }
            }
        }
        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn test_positions_outside_are_not_found() {
        let config = config();
        assert!(config.index_of_position(DVec3::new(2.5, 0.0, 0.0)).is_err());
        assert!(config.index_of_position(DVec3::new(-2.5, 0.0, 0.0)).is_err());
        assert!(config.index_of_position(DVec3::new(0.0, 1.6, 0.0)).is_err());
        assert!(config.index_of_position(DVec3::new(0.0, 0.0, -1.1)).is_err());
    }

    #[test]
    fn test_out_of_range_index_is_not_found() {
        let config = config();
        assert!(config.position_of_index(config.cell_count()).is_err());
        assert!(config.indices_of_flat(usize::MAX).is_err());
    }

    #[test]
    fn test_matches_detects_identical_request() {
        let config = config();
        assert!(config.matches(DVec3::ZERO, DVec3::new(4.0, 3.0, 2.0), 1.0));
        assert!(!config.matches(DVec3::ZERO, DVec3::new(4.0, 3.0, 2.0), 0.5));
        assert!(!config.matches(DVec3::X, DVec3::new(4.0, 3.0, 2.0), 1.0));
    }

    #[test]
    fn test_classify_cell_validates() {
        let mut lattice = VoxelLattice::new(config());
        assert!(lattice.classify_cell(0, 1.5, false).is_err());
        assert!(lattice.classify_cell(lattice.len(), 0.5, false).is_err());
        lattice.classify_cell(0, 0.75, false).unwrap();
        assert_eq!(lattice.cells()[0].absorption, 0.75);
        assert!(!lattice.cells()[0].open);
    }

    #[test]
    fn test_reset_classification_reopens_cells() {
        let mut lattice = VoxelLattice::new(config());
        lattice.classify_cell(3, 0.75, false).unwrap();
        lattice.reset_classification();
        assert!(lattice.cells().iter().all(|c| c.open && c.absorption == 0.0));
    }
}
