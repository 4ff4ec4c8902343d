//! World coordination: geometry bookkeeping, background voxelization,
//! simulation runs and bake queries.
//!
//! `EchoBakeWorld` is the central API. It runs on the caller's thread and owns
//! the lattice, the geometry and the results of the most recent run. The
//! classification pass is the expensive part of a bake, O(meshes x cells)
//! with non-trivial containment work per cell, so it runs on a background
//! thread; the lattice is moved into the worker and handed back over a
//! channel, which keeps exactly one writer at a time.

use crate::analysis::{ImpulseResponse, ResponseAnalyser};
use crate::config::EchoBakeWorldDesc;
use crate::error::{EchoBakeError, Result};
use crate::free_field::FreeFieldReference;
use crate::lattice::{LatticeConfig, VoxelLattice};
use crate::math::{DVec3, MeshTransform};
use crate::scene::Mesh;
use crate::simulate::{AcousticSimulator, FdtdSimulator, SimulatedResponse};
use crate::voxelize::classify_cells;
use crossbeam_channel::Receiver;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::thread::JoinHandle;
use std::time::Instant;
use uuid::Uuid;

/// Progress of the background classification pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoxelizeStatus {
    NotStarted,
    Ongoing,
    Finished,
}

impl VoxelizeStatus {
    fn as_u8(self) -> u8 {
        match self {
            VoxelizeStatus::NotStarted => 0,
            VoxelizeStatus::Ongoing => 1,
            VoxelizeStatus::Finished => 2,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            1 => VoxelizeStatus::Ongoing,
            2 => VoxelizeStatus::Finished,
            _ => VoxelizeStatus::NotStarted,
        }
    }
}

struct VoxelizeTask {
    handle: JoinHandle<()>,
    receiver: Receiver<VoxelLattice>,
}

/// Main world object that owns a scene's geometry, its voxel lattice and the
/// results of the most recent bake run.
pub struct EchoBakeWorld {
    desc: EchoBakeWorldDesc,
    meshes: HashMap<Uuid, Mesh>,
    listener: DVec3,
    sources: HashMap<Uuid, DVec3>,
    lattice: Option<VoxelLattice>,
    simulator: Option<Box<dyn AcousticSimulator>>,
    free_field: Option<FreeFieldReference>,
    status: Arc<AtomicU8>,
    task: Option<VoxelizeTask>,
}

impl EchoBakeWorld {
    pub fn new(desc: EchoBakeWorldDesc) -> Result<Self> {
        Ok(Self {
            desc,
            meshes: HashMap::new(),
            listener: desc.position,
            sources: HashMap::new(),
            lattice: None,
            simulator: None,
            free_field: None,
            status: Arc::new(AtomicU8::new(VoxelizeStatus::NotStarted.as_u8())),
            task: None,
        })
    }

    pub fn desc(&self) -> &EchoBakeWorldDesc {
        &self.desc
    }

    /// Adds a mesh to the scene, applying `transform` to every vertex, and
    /// returns its handle.
    ///
    /// # Errors
    ///
    /// Fails on malformed input (fewer than 3 vertices or indices, an index
    /// count that is not a multiple of 3, or an out-of-range index); nothing
    /// is stored on failure.
    pub fn add_mesh(
        &mut self,
        vertices: &[DVec3],
        indices: &[u32],
        transform: MeshTransform,
    ) -> Result<Uuid> {
        let mesh = Mesh::from_local(vertices, indices, transform)?;
        let id = Uuid::new_v4();
        self.meshes.insert(id, mesh);
        self.free_field = None;
        Ok(id)
    }

    /// Removes a mesh by its handle.
    pub fn remove_mesh(&mut self, id: Uuid) -> Result<()> {
        if self.meshes.remove(&id).is_none() {
            return Err(EchoBakeError::NotFound(format!("no mesh with handle {id}")));
        }
        self.free_field = None;
        Ok(())
    }

    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }

    pub fn mesh_ids(&self) -> Vec<Uuid> {
        self.meshes.keys().copied().collect()
    }

    /// The listener position used for pulse injection. Mutable at any time;
    /// the next run picks up the current value.
    pub fn listener(&self) -> DVec3 {
        self.listener
    }

    pub fn set_listener(&mut self, position: DVec3) {
        self.listener = position;
    }

    /// Adds a source/emitter location and returns its handle.
    pub fn add_source(&mut self, position: DVec3) -> Uuid {
        let id = Uuid::new_v4();
        self.sources.insert(id, position);
        id
    }

    pub fn remove_source(&mut self, id: Uuid) -> Result<()> {
        if self.sources.remove(&id).is_none() {
            return Err(EchoBakeError::NotFound(format!(
                "no source with handle {id}"
            )));
        }
        Ok(())
    }

    pub fn source_position(&self, id: Uuid) -> Option<DVec3> {
        self.sources.get(&id).copied()
    }

    pub fn set_source_position(&mut self, id: Uuid, position: DVec3) -> Result<()> {
        match self.sources.get_mut(&id) {
            Some(stored) => {
                *stored = position;
                Ok(())
            }
            None => Err(EchoBakeError::NotFound(format!(
                "no source with handle {id}"
            ))),
        }
    }

    pub fn voxelize_status(&self) -> VoxelizeStatus {
        VoxelizeStatus::from_u8(self.status.load(Ordering::SeqCst))
    }

    /// Starts or polls the background classification pass.
    ///
    /// - `NotStarted`: validates the request, moves the lattice into a worker
    ///   thread and starts classifying. The lattice allocation is reused when
    ///   the requested configuration matches the current one, so repeating a
    ///   request is cheap.
    /// - `Ongoing`: returns success immediately; at most one pass runs per
    ///   world.
    /// - `Finished`: joins the worker, reinstalls the classified lattice and
    ///   resets to `NotStarted`.
    pub fn voxelize(&mut self, size: DVec3, cell_size: f64) -> Result<()> {
        match self.voxelize_status() {
            VoxelizeStatus::NotStarted => self.start_voxelize_task(size, cell_size),
            VoxelizeStatus::Ongoing => Ok(()),
            VoxelizeStatus::Finished => {
                self.join_voxelize_task();
                Ok(())
            }
        }
    }

    fn start_voxelize_task(&mut self, size: DVec3, cell_size: f64) -> Result<()> {
        // Reuse the allocation when the requested configuration is unchanged;
        // a failed validation must leave the current lattice untouched.
        let lattice = match self
            .lattice
            .take_if(|l| l.config().matches(self.desc.position, size, cell_size))
        {
            Some(existing) => existing,
            None => VoxelLattice::new(LatticeConfig::new(self.desc.position, size, cell_size)?),
        };

        let meshes: Vec<Mesh> = self.meshes.values().cloned().collect();
        let status = Arc::clone(&self.status);
        let (sender, receiver) = crossbeam_channel::bounded(1);

        // Ongoing is visible before the thread exists so a second request
        // cannot start a second worker.
        self.status
            .store(VoxelizeStatus::Ongoing.as_u8(), Ordering::SeqCst);

        let handle = std::thread::spawn(move || {
            let mut lattice = lattice;
            let started = Instant::now();
            let solid = classify_cells(&mut lattice, &meshes);
            log::info!(
                "voxelization classified {solid} of {} cells as solid in {:.3?}",
                lattice.len(),
                started.elapsed()
            );
            // Send fails only when the world was dropped mid-pass.
            let _ = sender.send(lattice);
            status.store(VoxelizeStatus::Finished.as_u8(), Ordering::SeqCst);
        });

        self.task = Some(VoxelizeTask { handle, receiver });
        Ok(())
    }

    /// Blocks until the worker (if any) is done, reinstalls the lattice and
    /// resets the status.
    fn join_voxelize_task(&mut self) {
        if let Some(task) = self.task.take() {
            match task.receiver.recv() {
                Ok(lattice) => {
                    self.lattice = Some(lattice);
                    self.free_field = None;
                }
                Err(_) => log::error!("voxelization worker dropped its result"),
            }
            if task.handle.join().is_err() {
                log::error!("voxelization worker panicked");
            }
            self.status
                .store(VoxelizeStatus::NotStarted.as_u8(), Ordering::SeqCst);
        }
    }

    /// Runs the solver over the current lattice and listener.
    ///
    /// Any outstanding classification pass is joined first; the run never
    /// observes a lattice that is still being classified.
    ///
    /// # Errors
    ///
    /// Fails when no lattice exists yet, or when the run itself fails (see
    /// [`AcousticSimulator::simulate`]).
    pub fn simulate(&mut self) -> Result<()> {
        self.join_voxelize_task();

        let lattice = self.lattice.as_mut().ok_or_else(|| {
            EchoBakeError::Simulation("no voxel lattice; voxelize the scene first".into())
        })?;

        let mut simulator: Box<dyn AcousticSimulator> =
            Box::new(FdtdSimulator::new(&self.desc.settings)?);

        log::info!("simulating over {} voxels", lattice.len());
        let started = Instant::now();
        simulator.simulate(lattice, self.listener)?;
        log::info!(
            "simulated {} time steps in {:.3?}",
            self.desc.settings.time_steps,
            started.elapsed()
        );

        self.simulator = Some(simulator);
        Ok(())
    }

    /// The response recorded by the most recent run, if any.
    pub fn response(&self) -> Option<&SimulatedResponse> {
        self.simulator.as_ref().and_then(|s| s.response())
    }

    /// True from the moment a classification pass starts until its result has
    /// been joined back in. Per-cell queries return neutral values in this
    /// window rather than stale or partial data.
    fn classification_in_flight(&self) -> bool {
        self.task.is_some()
    }

    /// Number of lattice cells. Zero while a classification pass is in flight
    /// or before the first voxelization.
    pub fn voxel_count(&self) -> usize {
        if self.classification_in_flight() {
            return 0;
        }
        self.lattice.as_ref().map_or(0, |lattice| lattice.len())
    }

    /// World position of a cell's center. Neutral (origin) while a
    /// classification pass is in flight.
    pub fn voxel_position(&self, index: usize) -> Result<DVec3> {
        if self.classification_in_flight() {
            return Ok(DVec3::ZERO);
        }
        let lattice = self
            .lattice
            .as_ref()
            .ok_or_else(|| EchoBakeError::NotFound("no voxel lattice".into()))?;
        lattice.position_of_index(index)
    }

    /// Absorption of a cell. Zero while a classification pass is in flight.
    pub fn voxel_absorption(&self, index: usize) -> Result<f64> {
        if self.classification_in_flight() {
            return Ok(0.0);
        }
        let lattice = self
            .lattice
            .as_ref()
            .ok_or_else(|| EchoBakeError::NotFound("no voxel lattice".into()))?;
        lattice.config().indices_of_flat(index)?;
        Ok(lattice.cells()[index].absorption)
    }

    /// Occlusion between the current listener and `emitter`, from the most
    /// recent run. Unclamped; see [`ResponseAnalyser::occlusion`].
    pub fn occlusion(&mut self, emitter: DVec3) -> Result<f64> {
        self.ensure_free_field()?;
        let (response, free_field) = self.analysis_inputs()?;
        ResponseAnalyser::new(response, free_field).occlusion(self.listener, emitter)
    }

    /// Occlusion clamped to [0, 1].
    pub fn occlusion_clamped(&mut self, emitter: DVec3) -> Result<f64> {
        Ok(self.occlusion(emitter)?.clamp(0.0, 1.0))
    }

    /// The raw pressure series at `emitter` from the most recent run, for
    /// external encoding.
    pub fn encode(&self, emitter: DVec3) -> Result<ImpulseResponse> {
        let response = self.response().ok_or_else(|| {
            EchoBakeError::Analysis("no simulated response; run simulate first".into())
        })?;
        let series = response.cell_series_at(emitter)?;
        Ok(ImpulseResponse {
            samples: series.iter().map(|cell| cell.pressure).collect(),
            sampling_rate: response.sampling_rate(),
        })
    }

    /// Computes the free-field reference on first use. The cache is dropped
    /// whenever geometry or the lattice changes.
    fn ensure_free_field(&mut self) -> Result<()> {
        if self.free_field.is_some() {
            return Ok(());
        }
        let lattice = self.lattice.as_ref().ok_or_else(|| {
            EchoBakeError::Simulation("no voxel lattice; voxelize the scene first".into())
        })?;
        log::debug!("computing free-field reference energy");
        let reference =
            FreeFieldReference::compute(lattice.config(), &self.desc.settings, self.desc.position)?;
        self.free_field = Some(reference);
        Ok(())
    }

    fn analysis_inputs(&self) -> Result<(&SimulatedResponse, &FreeFieldReference)> {
        let response = self.response().ok_or_else(|| {
            EchoBakeError::Analysis("no simulated response; run simulate first".into())
        })?;
        let free_field = self.free_field.as_ref().ok_or_else(|| {
            EchoBakeError::Analysis("free-field reference has not been computed".into())
        })?;
        Ok((response, free_field))
    }
}

impl Drop for EchoBakeWorld {
    fn drop(&mut self) {
        // Never leave a classification worker writing into a lattice nobody
        // will receive.
        self.join_voxelize_task();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Resolution, SimulationSettings};

    fn world() -> EchoBakeWorld {
        let desc = EchoBakeWorldDesc::new().settings(
            SimulationSettings::new()
                .resolution(Resolution::Low)
                .time_steps(30),
        );
        EchoBakeWorld::new(desc).unwrap()
    }

    fn triangle() -> (Vec<DVec3>, Vec<u32>) {
        (vec![DVec3::ZERO, DVec3::X, DVec3::Y], vec![0, 1, 2])
    }

    #[test]
    fn test_mesh_bookkeeping() {
        let mut world = world();
        let (vertices, indices) = triangle();

        let id = world
            .add_mesh(&vertices, &indices, MeshTransform::identity())
            .unwrap();
        assert_eq!(world.mesh_count(), 1);
        assert!(world.mesh_ids().contains(&id));

        world.remove_mesh(id).unwrap();
        assert_eq!(world.mesh_count(), 0);
        assert!(matches!(
            world.remove_mesh(id),
            Err(EchoBakeError::NotFound(_))
        ));
    }

    #[test]
    fn test_add_mesh_rejects_malformed_input() {
        let mut world = world();
        let (vertices, _) = triangle();

        assert!(
            world
                .add_mesh(&vertices[..2], &[0, 1, 2], MeshTransform::identity())
                .is_err()
        );
        assert!(
            world
                .add_mesh(&vertices, &[0, 1], MeshTransform::identity())
                .is_err()
        );
        assert!(
            world
                .add_mesh(&vertices, &[0, 1, 2, 0], MeshTransform::identity())
                .is_err()
        );
        assert!(
            world
                .add_mesh(&vertices, &[0, 1, 7], MeshTransform::identity())
                .is_err()
        );
        assert_eq!(world.mesh_count(), 0);
    }

    #[test]
    fn test_source_bookkeeping() {
        let mut world = world();
        let id = world.add_source(DVec3::new(1.0, 2.0, 3.0));
        assert_eq!(world.source_position(id), Some(DVec3::new(1.0, 2.0, 3.0)));

        world.set_source_position(id, DVec3::ZERO).unwrap();
        assert_eq!(world.source_position(id), Some(DVec3::ZERO));

        world.remove_source(id).unwrap();
        assert_eq!(world.source_position(id), None);
        assert!(world.remove_source(id).is_err());
    }

    #[test]
    fn test_voxelize_rejects_bad_extents() {
        let mut world = world();
        assert!(world.voxelize(DVec3::ZERO, 1.0).is_err());
        assert!(world.voxelize(DVec3::splat(4.0), 0.0).is_err());
        assert!(world.voxelize(DVec3::splat(0.5), 1.0).is_err());
        assert_eq!(world.voxelize_status(), VoxelizeStatus::NotStarted);
    }

    #[test]
    fn test_simulate_without_lattice_fails() {
        let mut world = world();
        assert!(matches!(
            world.simulate(),
            Err(EchoBakeError::Simulation(_))
        ));
    }

    #[test]
    fn test_queries_without_lattice() {
        let world = world();
        assert_eq!(world.voxel_count(), 0);
        assert!(world.voxel_position(0).is_err());
        assert!(world.voxel_absorption(0).is_err());
    }

    #[test]
    fn test_voxelize_then_query() {
        let mut world = world();
        world.voxelize(DVec3::splat(4.0), 1.0).unwrap();
        world.simulate().unwrap(); // joins the pass

        assert_eq!(world.voxel_count(), 64);
        let position = world.voxel_position(0).unwrap();
        assert!((position - DVec3::splat(-1.5)).length() < 1e-12);
        assert_eq!(world.voxel_absorption(0).unwrap(), 0.0);
        assert!(world.voxel_absorption(64).is_err());
    }

    #[test]
    fn test_listener_defaults_to_reference_position() {
        let desc = EchoBakeWorldDesc::new().position(DVec3::splat(2.0));
        let world = EchoBakeWorld::new(desc).unwrap();
        assert_eq!(world.listener(), DVec3::splat(2.0));
    }
}
