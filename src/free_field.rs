//! Geometry-free reference energy.
//!
//! Occlusion compares a simulated response against what the same source would
//! deliver with no geometry at all. To factor distance out, the reference run
//! integrates the response energy one world unit in front of the source and
//! normalizes it to a 1-unit distance under a planar 1/r spreading law; the
//! single cached scalar then reconstructs the expected free-field energy at
//! any listener/emitter separation.

use crate::config::SimulationSettings;
use crate::error::{EchoBakeError, Result};
use crate::lattice::{LatticeConfig, VoxelLattice};
use crate::math::DVec3;
use crate::simulate::{AcousticSimulator, FdtdSimulator, SPEED_OF_SOUND};

/// Direct-path duration of the integration window, in seconds.
const DIRECT_PATH_DURATION: f64 = 0.01;

/// Propagation energy normalized to a 1-unit reference distance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FreeFieldReference {
    energy_at_unit: f64,
    cell_size: f64,
}

impl FreeFieldReference {
    /// Rebuilds a reference from a previously computed energy, e.g. one
    /// persisted alongside a bake.
    pub fn new(energy_at_unit: f64, cell_size: f64) -> Self {
        Self {
            energy_at_unit,
            cell_size,
        }
    }

    /// Runs the solver over a fresh all-open lattice of the given
    /// configuration and integrates the response energy one world unit in
    /// front of `reference_position`.
    ///
    /// # Errors
    ///
    /// Fails when either position does not resolve to a cell, when the
    /// integration window is longer than the recorded series (nothing is read
    /// out of bounds), or when the cell size is so coarse that the 1-unit
    /// sample point falls into the reference cell itself.
    pub fn compute(
        config: &LatticeConfig,
        settings: &SimulationSettings,
        reference_position: DVec3,
    ) -> Result<Self> {
        let mut lattice = VoxelLattice::new(*config);
        let mut simulator = FdtdSimulator::new(settings)?;
        simulator.simulate(&mut lattice, reference_position)?;
        let Some(response) = simulator.response() else {
            return Err(EchoBakeError::Simulation(
                "free-field run recorded no response".into(),
            ));
        };

        let forward = reference_position + DVec3::X;
        let reference_index = config.index_of_position(reference_position)?;
        let sample_index = config.index_of_position(forward)?;

        let series = response.cell_series(sample_index)?;
        let sampling_rate = response.sampling_rate();

        // Direct-path duration plus the delay to travel one unit.
        let window = (DIRECT_PATH_DURATION * sampling_rate) as usize
            + (sampling_rate / SPEED_OF_SOUND) as usize;
        if window > series.len() {
            return Err(EchoBakeError::Analysis(format!(
                "integration window of {window} samples exceeds the {} recorded time steps",
                series.len()
            )));
        }

        let raw_energy: f64 = series[..window]
            .iter()
            .map(|cell| cell.pressure * cell.pressure)
            .sum();

        // Discrete grid distance between the reference cell and the sample
        // cell, which normalizes the 1/r spreading loss to exactly one unit.
        let reference_cell = config.indices_of_flat(reference_index)?;
        let sample_cell = config.indices_of_flat(sample_index)?;
        let cells_apart = sample_cell[0] as f64 - reference_cell[0] as f64;
        let distance = cells_apart * config.cell_size();
        if distance <= 0.0 {
            return Err(EchoBakeError::Analysis(format!(
                "cell size {} is too coarse: the 1-unit sample point falls in the reference cell",
                config.cell_size()
            )));
        }

        Ok(Self {
            energy_at_unit: raw_energy * distance,
            cell_size: config.cell_size(),
        })
    }

    /// The cached energy at the 1-unit reference distance.
    pub fn energy_at_unit(&self) -> f64 {
        self.energy_at_unit
    }

    /// Expected free-field energy for a listener/emitter pair of lattice
    /// cells.
    ///
    /// Distance is planar; the vertical axis is ignored by design, matching
    /// the solver's planar propagation. Coincident cells return the cached
    /// energy unchanged; otherwise the 1/r law divides it by the separation
    /// in world units.
    pub fn free_energy(&self, listener: [usize; 3], emitter: [usize; 3]) -> f64 {
        let lx = listener[0] as f64 * self.cell_size;
        let lz = listener[2] as f64 * self.cell_size;
        let ex = emitter[0] as f64 * self.cell_size;
        let ez = emitter[2] as f64 * self.cell_size;

        let r = ((ex - lx) * (ex - lx) + (ez - lz) * (ez - lz)).sqrt();
        if r == 0.0 {
            return self.energy_at_unit;
        }
        self.energy_at_unit / r
    }
}
