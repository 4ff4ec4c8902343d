//! Response analysis: onset detection, direct-path energy and occlusion.
//!
//! Takes the recorded time series of one cell and compares its direct-path
//! energy against the free-field reference for the same listener/emitter
//! separation. The resulting ratio is the occlusion value a runtime engine
//! looks up instead of simulating live.

use crate::error::{EchoBakeError, Result};
use crate::free_field::FreeFieldReference;
use crate::math::DVec3;
use crate::simulate::SimulatedResponse;

/// Audibility threshold for onset detection, in dB relative to unit pressure.
const AUDIBILITY_THRESHOLD_DB: f64 = -110.0;

/// Direct-path window appended past the onset, in seconds.
const DIRECT_WINDOW_DURATION: f64 = 0.01;

/// The raw pressure series of one cell, ready for external encoding.
///
/// This crate does not write audio files; consumers receive the samples and
/// the sampling rate and encode them however they persist bakes.
#[derive(Debug, Clone, PartialEq)]
pub struct ImpulseResponse {
    pub samples: Vec<f64>,
    pub sampling_rate: f64,
}

impl ImpulseResponse {
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Duration of the response in seconds.
    pub fn duration(&self) -> f64 {
        self.samples.len() as f64 / self.sampling_rate
    }
}

/// Analyses one simulation run against a free-field reference.
pub struct ResponseAnalyser<'a> {
    response: &'a SimulatedResponse,
    free_field: &'a FreeFieldReference,
}

impl<'a> ResponseAnalyser<'a> {
    pub fn new(response: &'a SimulatedResponse, free_field: &'a FreeFieldReference) -> Self {
        Self {
            response,
            free_field,
        }
    }

    /// Occlusion of the path between `listener` and `emitter`.
    ///
    /// The value is the square root of the emitter cell's direct-path energy
    /// over the expected free-field energy at that separation. It is **not**
    /// clamped: a response that collects more energy than the free-field
    /// estimate (e.g. through constructive reflections) exceeds 1. Callers
    /// that need the conventional [0, 1] range should use
    /// [`occlusion_clamped`](Self::occlusion_clamped).
    ///
    /// A response that never crosses the audibility threshold is fully
    /// occluded and yields 0.
    pub fn occlusion(&self, listener: DVec3, emitter: DVec3) -> Result<f64> {
        let config = self.response.config();
        let listener_index = config.index_of_position(listener)?;
        let emitter_index = config.index_of_position(emitter)?;
        let series = self.response.cell_series(emitter_index)?;

        let threshold = 10f64.powf(AUDIBILITY_THRESHOLD_DB / 20.0);
        let Some(onset) = series
            .iter()
            .position(|cell| cell.pressure.abs() > threshold)
        else {
            log::debug!("response at {emitter} never crosses the audibility threshold");
            return Ok(0.0);
        };

        let window = onset + (DIRECT_WINDOW_DURATION * self.response.sampling_rate()).ceil() as usize;
        let end = window.min(series.len() - 1);
        let direct_energy: f64 = series[..=end]
            .iter()
            .map(|cell| cell.pressure * cell.pressure)
            .sum();

        let free_energy = self.free_field.free_energy(
            config.indices_of_flat(listener_index)?,
            config.indices_of_flat(emitter_index)?,
        );
        if free_energy <= 0.0 {
            return Err(EchoBakeError::Analysis(
                "free-field reference energy is not positive".into(),
            ));
        }

        Ok((direct_energy / free_energy).sqrt())
    }

    /// [`occlusion`](Self::occlusion) clamped to [0, 1], the form every known
    /// consumer wants.
    pub fn occlusion_clamped(&self, listener: DVec3, emitter: DVec3) -> Result<f64> {
        Ok(self.occlusion(listener, emitter)?.clamp(0.0, 1.0))
    }

    /// The emitter cell's raw pressure series, uninterpreted.
    pub fn encode(&self, position: DVec3) -> Result<ImpulseResponse> {
        let series = self.response.cell_series_at(position)?;
        Ok(ImpulseResponse {
            samples: series.iter().map(|cell| cell.pressure).collect(),
            sampling_rate: self.response.sampling_rate(),
        })
    }
}
