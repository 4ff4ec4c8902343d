//! EchoBake: offline acoustic wave baking for games.
//!
//! EchoBake precomputes how sound propagates through a static 3D scene so a
//! game or audio engine can look up impulse responses and occlusion values at
//! runtime instead of simulating live. A bake runs in four stages:
//!
//! 1. **Voxelize**: scene triangle meshes are classified into a uniform
//!    [`lattice::VoxelLattice`] of open-air and solid cells, on a background
//!    thread.
//! 2. **Simulate**: an FDTD solver ([`simulate::FdtdSimulator`]) injects a
//!    Gaussian pulse at the listener and steps coupled pressure/velocity
//!    fields over the lattice, recording every cell at every step.
//! 3. **Reference**: a geometry-free run ([`free_field::FreeFieldReference`])
//!    captures pure distance spreading so geometry effects can be isolated.
//! 4. **Analyse**: [`analysis::ResponseAnalyser`] turns recorded series into
//!    onset times, direct-path energy and normalized occlusion values.
//!
//! [`world::EchoBakeWorld`] ties the stages together and is the usual entry
//! point.

pub mod analysis;
pub mod config;
pub mod error;
pub mod free_field;
pub mod lattice;
pub mod math;
pub mod scene;
pub mod simulate;
pub mod voxelize;
pub mod world;

pub use analysis::{ImpulseResponse, ResponseAnalyser};
pub use config::{EchoBakeWorldDesc, Resolution, SimulationSettings};
pub use error::EchoBakeError;
pub use free_field::FreeFieldReference;
pub use lattice::{LatticeConfig, VoxelCell, VoxelLattice};
pub use math::MeshTransform;
pub use scene::{Aabb, Mesh};
pub use simulate::{
    AcousticSimulator, FdtdSimulator, SPEED_OF_SOUND, SimulatedResponse, SimulationParams,
};
pub use voxelize::{DEFAULT_WALL_ABSORPTION, classify_cells};
pub use world::{EchoBakeWorld, VoxelizeStatus};
