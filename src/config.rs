//! Configuration for EchoBake

use crate::math::DVec3;

/// Frequency resolution of a simulation run.
///
/// The resolution is the highest frequency the solver is asked to resolve.
/// Higher values shrink the minimum wavelength, which densifies the grid and
/// shortens the time step, so bake times grow quickly with resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// 275 Hz. Coarse but fast; good enough for broad occlusion baking.
    Low,
    /// 500 Hz.
    Medium,
    /// 725 Hz.
    High,
    /// 1000 Hz.
    Extreme,
}

impl Resolution {
    /// Maximum resolved frequency in Hz.
    pub fn frequency_hz(&self) -> f64 {
        match self {
            Resolution::Low => 275.0,
            Resolution::Medium => 500.0,
            Resolution::High => 725.0,
            Resolution::Extreme => 1000.0,
        }
    }
}

/// Settings for one simulation run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationSettings {
    pub resolution: Resolution,
    /// Number of time steps to record. Also the length of the baked response.
    pub time_steps: usize,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            resolution: Resolution::Low,
            time_steps: 300,
        }
    }
}

impl SimulationSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resolution(mut self, resolution: Resolution) -> Self {
        self.resolution = resolution;
        self
    }

    pub fn time_steps(mut self, time_steps: usize) -> Self {
        self.time_steps = time_steps;
        self
    }
}

/// Description of a bake world.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EchoBakeWorldDesc {
    /// Reference position of the scene. The voxel lattice is centered here and
    /// the free-field reference run injects its pulse here.
    pub position: DVec3,
    pub settings: SimulationSettings,
}

impl Default for EchoBakeWorldDesc {
    fn default() -> Self {
        Self {
            position: DVec3::ZERO,
            settings: SimulationSettings::default(),
        }
    }
}

impl EchoBakeWorldDesc {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn position(mut self, position: DVec3) -> Self {
        self.position = position;
        self
    }

    pub fn settings(mut self, settings: SimulationSettings) -> Self {
        self.settings = settings;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_presets() {
        assert_eq!(Resolution::Low.frequency_hz(), 275.0);
        assert_eq!(Resolution::Medium.frequency_hz(), 500.0);
        assert_eq!(Resolution::High.frequency_hz(), 725.0);
        assert_eq!(Resolution::Extreme.frequency_hz(), 1000.0);
    }

    #[test]
    fn test_settings_builder() {
        let settings = SimulationSettings::new()
            .resolution(Resolution::High)
            .time_steps(512);
        assert_eq!(settings.resolution, Resolution::High);
        assert_eq!(settings.time_steps, 512);
    }
}
