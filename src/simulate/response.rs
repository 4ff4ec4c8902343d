use crate::error::Result;
use crate::lattice::{LatticeConfig, VoxelCell};
use crate::math::DVec3;

/// Everything one simulation run records: a full per-cell state series plus
/// the run's sampling rate and a snapshot of the lattice geometry so world
/// positions still resolve after the run.
///
/// The series is reallocated and fully overwritten by each run; it is never
/// partially updated.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulatedResponse {
    config: LatticeConfig,
    sampling_rate: f64,
    time_steps: usize,
    /// `series[cell][step]`
    series: Vec<Vec<VoxelCell>>,
}

impl SimulatedResponse {
    pub(crate) fn allocate(config: LatticeConfig, sampling_rate: f64, time_steps: usize) -> Self {
        let series = vec![vec![VoxelCell::default(); time_steps]; config.cell_count()];
        Self {
            config,
            sampling_rate,
            time_steps,
            series,
        }
    }

    /// Copies the state of every cell into the series at `step`.
    pub(crate) fn record(&mut self, step: usize, cells: &[VoxelCell]) {
        for (slot, cell) in self.series.iter_mut().zip(cells) {
            slot[step] = *cell;
        }
    }

    /// Lattice geometry the run was recorded on.
    pub fn config(&self) -> &LatticeConfig {
        &self.config
    }

    pub fn sampling_rate(&self) -> f64 {
        self.sampling_rate
    }

    pub fn time_steps(&self) -> usize {
        self.time_steps
    }

    /// The recorded state series of one cell.
    pub fn cell_series(&self, cell_index: usize) -> Result<&[VoxelCell]> {
        // Validates the index and keeps the error message in one place.
        self.config.indices_of_flat(cell_index)?;
        Ok(&self.series[cell_index])
    }

    /// The recorded state series of the cell containing `position`.
    pub fn cell_series_at(&self, position: DVec3) -> Result<&[VoxelCell]> {
        let index = self.config.index_of_position(position)?;
        self.cell_series(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocation_and_recording() {
        let config = LatticeConfig::new(DVec3::ZERO, DVec3::splat(2.0), 1.0).unwrap();
        let mut response = SimulatedResponse::allocate(config, 1000.0, 4);

        let mut cells = vec![VoxelCell::default(); config.cell_count()];
        cells[3].pressure = 0.5;
        response.record(2, &cells);

        let series = response.cell_series(3).unwrap();
        assert_eq!(series.len(), 4);
        assert_eq!(series[2].pressure, 0.5);
        assert_eq!(series[0].pressure, 0.0);

        assert!(response.cell_series(config.cell_count()).is_err());
    }

    #[test]
    fn test_series_lookup_by_position() {
        let config = LatticeConfig::new(DVec3::ZERO, DVec3::splat(2.0), 1.0).unwrap();
        let response = SimulatedResponse::allocate(config, 1000.0, 4);
        assert!(response.cell_series_at(DVec3::new(0.5, 0.5, 0.5)).is_ok());
        assert!(response.cell_series_at(DVec3::splat(5.0)).is_err());
    }
}
