//! Acoustic wave simulation over a voxel lattice.
//!
//! The solver advances coupled pressure and particle-velocity fields through
//! discrete time steps and records the full lattice state at every step. All
//! derived quantities come from a requested frequency resolution; see
//! [`SimulationParams::derive`].

pub mod fdtd;
pub mod response;

pub use fdtd::FdtdSimulator;
pub use response::SimulatedResponse;

use crate::config::SimulationSettings;
use crate::error::{EchoBakeError, Result};
use crate::lattice::VoxelLattice;
use crate::math::DVec3;

/// Speed of sound in air, m/s.
pub const SPEED_OF_SOUND: f64 = 343.21;

/// Grid oversampling relative to the minimum resolved wavelength.
const CELLS_PER_WAVELENGTH: f64 = 3.5;

/// Safety margin applied to the time step.
const TIME_STEP_MARGIN: f64 = 1.5;

/// Quantities derived from [`SimulationSettings`] that every solver strategy
/// shares.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationParams {
    /// Shortest wavelength the run resolves, in meters.
    pub min_wavelength: f64,
    /// Spatial step of the scheme, in meters.
    pub cell_spacing: f64,
    /// Temporal step of the scheme, in seconds.
    pub seconds_per_sample: f64,
    /// Sampling rate of the recorded response, in Hz.
    pub sampling_rate: f64,
    /// Courant-style coefficient applied to every spatial-derivative term.
    pub update_coefficient: f64,
    pub time_steps: usize,
}

impl SimulationParams {
    /// Derives the run parameters for the requested resolution.
    ///
    /// The update coefficient is the scheme's Courant number; it is validated
    /// against the stability bound rather than trusted, since an unstable
    /// coefficient makes the fields grow without bound.
    pub fn derive(settings: &SimulationSettings) -> Result<Self> {
        if settings.time_steps == 0 {
            return Err(EchoBakeError::InvalidParam(
                "time step count must be positive".into(),
            ));
        }

        let frequency = settings.resolution.frequency_hz();
        let min_wavelength = SPEED_OF_SOUND / frequency;
        let cell_spacing = min_wavelength / CELLS_PER_WAVELENGTH;
        let seconds_per_sample = cell_spacing / (SPEED_OF_SOUND * TIME_STEP_MARGIN);
        let sampling_rate = 1.0 / seconds_per_sample;
        let update_coefficient = SPEED_OF_SOUND * seconds_per_sample / cell_spacing;

        if !(update_coefficient > 0.0 && update_coefficient <= 1.0) {
            return Err(EchoBakeError::Simulation(format!(
                "update coefficient {update_coefficient} violates the stability bound"
            )));
        }

        Ok(Self {
            min_wavelength,
            cell_spacing,
            seconds_per_sample,
            sampling_rate,
            update_coefficient,
            time_steps: settings.time_steps,
        })
    }
}

/// Precomputes the excitation waveform, one sample per time step.
///
/// The pulse is a Gaussian with its peak delayed by two standard deviations so
/// the excitation ramps up from (near) silence.
pub fn gaussian_pulse(settings: &SimulationSettings, params: &SimulationParams) -> Vec<f64> {
    let frequency = settings.resolution.frequency_hz();
    let sigma = 1.0 / (0.5 * std::f64::consts::PI * frequency);
    let delay = 2.0 * sigma;
    let dt = params.seconds_per_sample;

    (0..params.time_steps)
        .map(|step| {
            let t = step as f64 * dt;
            (-(t - delay) * (t - delay) / (sigma * sigma)).exp()
        })
        .collect()
}

/// A solver strategy that runs one complete simulation over a lattice.
///
/// Implementations own their derived parameters and their recorded response;
/// each `simulate` call reallocates the response and re-zeroes every cell's
/// pressure and velocity before stepping, so a run never observes state from
/// a previous one.
pub trait AcousticSimulator {
    /// Runs the solver over `lattice`, injecting the excitation pulse at the
    /// cell containing `listener` on every step.
    ///
    /// # Errors
    ///
    /// Fails when the lattice is empty or when `listener` does not resolve to
    /// a lattice cell: a run whose pulse is never injected records a
    /// meaningless all-zero response, so this aborts instead of degrading.
    fn simulate(&mut self, lattice: &mut VoxelLattice, listener: DVec3) -> Result<()>;

    /// Parameters derived at construction.
    fn params(&self) -> &SimulationParams;

    /// The response recorded by the most recent run, if any.
    fn response(&self) -> Option<&SimulatedResponse>;

    fn sampling_rate(&self) -> f64 {
        self.params().sampling_rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Resolution;

    #[test]
    fn test_params_match_closed_form() {
        let settings = SimulationSettings::new()
            .resolution(Resolution::Low)
            .time_steps(100);
        let params = SimulationParams::derive(&settings).unwrap();

        let min_wavelength = 343.21 / 275.0;
        let cell_spacing = min_wavelength / 3.5;
        let seconds_per_sample = cell_spacing / (343.21 * 1.5);

        assert!((params.min_wavelength - min_wavelength).abs() < 1e-12);
        assert!((params.cell_spacing - cell_spacing).abs() < 1e-12);
        assert!((params.seconds_per_sample - seconds_per_sample).abs() < 1e-15);
        assert!((params.sampling_rate - 1.0 / seconds_per_sample).abs() < 1e-9);
    }

    #[test]
    fn test_update_coefficient_is_stable() {
        for resolution in [
            Resolution::Low,
            Resolution::Medium,
            Resolution::High,
            Resolution::Extreme,
        ] {
            let settings = SimulationSettings::new().resolution(resolution).time_steps(8);
            let params = SimulationParams::derive(&settings).unwrap();
            assert!(params.update_coefficient > 0.0);
            assert!(params.update_coefficient <= 1.0);
            // The margin factor puts the coefficient at exactly 1/1.5.
            assert!((params.update_coefficient - 1.0 / 1.5).abs() < 1e-12);
        }
    }

    #[test]
    fn test_zero_time_steps_rejected() {
        let settings = SimulationSettings::new().time_steps(0);
        assert!(SimulationParams::derive(&settings).is_err());
    }

    #[test]
    fn test_pulse_shape() {
        let settings = SimulationSettings::new()
            .resolution(Resolution::Low)
            .time_steps(100);
        let params = SimulationParams::derive(&settings).unwrap();
        let pulse = gaussian_pulse(&settings, &params);

        assert_eq!(pulse.len(), 100);
        // Ramps up from near silence toward a unit peak at the delay...
        assert!(pulse[0] < 0.1);
        let peak = pulse.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        assert!(peak > 0.9 && peak <= 1.0);
        // ...and decays back down afterwards.
        assert!(pulse[99] < 1e-6);

        // Peak sits near delay / dt samples in.
        let sigma = 1.0 / (0.5 * std::f64::consts::PI * 275.0);
        let expected_peak_step = (2.0 * sigma / params.seconds_per_sample).round() as usize;
        let peak_step = pulse
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap();
        assert!(peak_step.abs_diff(expected_peak_step) <= 1);
    }
}
