//! Finite-difference time-domain solver.
//!
//! Each time step runs four ordered phases: a pressure update from the
//! divergence of neighboring velocities, per-axis velocity updates driven by
//! pressure gradients and blended against absorbing walls, a full-state
//! recording into the response, and the excitation pulse injection at the
//! listener's cell. Later phases read state written by earlier ones, so the
//! order is load-bearing.

use super::{AcousticSimulator, SimulatedResponse, SimulationParams, gaussian_pulse};
use crate::config::SimulationSettings;
use crate::error::{EchoBakeError, Result};
use crate::lattice::{VoxelCell, VoxelLattice};
use crate::math::DVec3;

/// Lattice axis a velocity update advances along.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    X,
    Z,
}

impl Axis {
    fn stride(self, counts: [usize; 3]) -> usize {
        match self {
            Axis::X => 1,
            Axis::Z => counts[0] * counts[1],
        }
    }

    fn component(self, velocity: DVec3) -> f64 {
        match self {
            Axis::X => velocity.x,
            Axis::Z => velocity.z,
        }
    }

    fn set_component(self, velocity: &mut DVec3, value: f64) {
        match self {
            Axis::X => velocity.x = value,
            Axis::Z => velocity.z = value,
        }
    }

    fn index_along(self, x: usize, _y: usize, z: usize) -> usize {
        match self {
            Axis::X => x,
            Axis::Z => z,
        }
    }
}

/// The FDTD solver strategy.
pub struct FdtdSimulator {
    params: SimulationParams,
    pulse: Vec<f64>,
    response: Option<SimulatedResponse>,
}

impl FdtdSimulator {
    /// Derives run parameters and bakes the excitation pulse.
    pub fn new(settings: &SimulationSettings) -> Result<Self> {
        let params = SimulationParams::derive(settings)?;
        let pulse = gaussian_pulse(settings, &params);
        Ok(Self {
            params,
            pulse,
            response: None,
        })
    }

    /// The precomputed excitation waveform, one sample per time step.
    pub fn pulse(&self) -> &[f64] {
        &self.pulse
    }

    /// Pressure phase: every cell integrates the divergence of the velocities
    /// of its positive-axis neighbors. A neighbor beyond the lattice reads as
    /// zero velocity, which leaves the far faces open. The gate forces solid
    /// cells' pressure toward zero instead of letting it evolve.
    fn update_pressure(cells: &mut [VoxelCell], counts: [usize; 3], coefficient: f64) {
        let [nx, ny, nz] = counts;
        let plane = nx * ny;
        for z in 0..nz {
            for y in 0..ny {
                for x in 0..nx {
                    let index = x + y * nx + z * plane;
                    let next_x = if x + 1 < nx {
                        cells[index + 1]
                    } else {
                        VoxelCell::default()
                    };
                    let next_y = if y + 1 < ny {
                        cells[index + nx]
                    } else {
                        VoxelCell::default()
                    };
                    let next_z = if z + 1 < nz {
                        cells[index + plane]
                    } else {
                        VoxelCell::default()
                    };

                    let cell = &mut cells[index];
                    let divergence = (next_x.velocity.x - cell.velocity.x)
                        + (next_y.velocity.y - cell.velocity.y)
                        + (next_z.velocity.z - cell.velocity.z);
                    cell.pressure = cell.gate() * (cell.pressure - coefficient * divergence);
                }
            }
        }
    }

    /// Velocity phase along one axis. Interior cells read their negative
    /// neighbor and blend the plain pressure-gradient update with an
    /// admittance-weighted wall term: a fully open pair reduces to the
    /// gradient update, while an open/solid boundary leans on the wall term,
    /// so absorption produces partial reflection rather than all-or-nothing.
    fn update_velocity(cells: &mut [VoxelCell], counts: [usize; 3], coefficient: f64, axis: Axis) {
        let [nx, ny, nz] = counts;
        let stride = axis.stride(counts);
        for z in 0..nz {
            for y in 0..ny {
                for x in 0..nx {
                    // The first cell along the axis has no negative neighbor.
                    if axis.index_along(x, y, z) == 0 {
                        continue;
                    }
                    let index = x + y * nx + z * nx * ny;
                    let previous = cells[index - stride];
                    let cell = &mut cells[index];

                    let gate = cell.gate();
                    let previous_gate = previous.gate();

                    let gradient = cell.pressure - previous.pressure;
                    let open_update = axis.component(cell.velocity) - coefficient * gradient;

                    let boundary_admittance =
                        gate * previous.admittance() + previous_gate * cell.admittance();
                    let wall_update = boundary_admittance
                        * (previous.pressure * previous_gate + cell.pressure * gate);

                    let velocity =
                        gate * previous_gate * open_update + (previous_gate - gate) * wall_update;
                    axis.set_component(&mut cell.velocity, velocity);
                }
            }
        }
    }
}

impl AcousticSimulator for FdtdSimulator {
    fn simulate(&mut self, lattice: &mut VoxelLattice, listener: DVec3) -> Result<()> {
        if lattice.is_empty() {
            return Err(EchoBakeError::Simulation(
                "voxel lattice has no cells".into(),
            ));
        }

        let config = *lattice.config();
        let counts = config.counts();
        let coefficient = self.params.update_coefficient;

        lattice.reset_field_state();
        self.response = None;
        let mut response =
            SimulatedResponse::allocate(config, self.params.sampling_rate, self.params.time_steps);

        for step in 0..self.params.time_steps {
            Self::update_pressure(lattice.cells_mut(), counts, coefficient);
            // Propagation is planar: the vertical velocity component is never
            // advanced, matching the planar 1/r model the occlusion analysis
            // normalizes against.
            Self::update_velocity(lattice.cells_mut(), counts, coefficient, Axis::X);
            Self::update_velocity(lattice.cells_mut(), counts, coefficient, Axis::Z);

            response.record(step, lattice.cells());

            let pulse_index = lattice.index_of_position(listener).map_err(|err| {
                EchoBakeError::Simulation(format!(
                    "listener at {listener} does not resolve to a lattice cell, \
                     the excitation pulse cannot be injected: {err}"
                ))
            })?;
            lattice.cells_mut()[pulse_index].pressure += self.pulse[step];
        }

        self.response = Some(response);
        Ok(())
    }

    fn params(&self) -> &SimulationParams {
        &self.params
    }

    fn response(&self) -> Option<&SimulatedResponse> {
        self.response.as_ref()
    }
}
