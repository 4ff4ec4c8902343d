//! Classification of lattice cells as open air or solid from scene geometry.
//!
//! For every mesh whose bounds touch the lattice, each overlapping cell is
//! sampled at nine points (its center and eight corners) against a
//! point-in-mesh containment query. A cell becomes solid only when more than
//! two of the nine samples land inside the mesh, which keeps thin shells from
//! closing cells they merely graze.

use crate::lattice::VoxelLattice;
use crate::math::DVec3;
use crate::scene::{Aabb, Mesh, points_inside_mesh};

/// Absorption coefficient assigned to cells classified as solid.
pub const DEFAULT_WALL_ABSORPTION: f64 = 0.75;

/// A cell is solid when strictly more than this many of its 9 sample points
/// are inside a mesh.
const SOLID_SAMPLE_THRESHOLD: usize = 2;

/// Runs the classification pass over `lattice` for `meshes` and returns the
/// number of solid cells.
///
/// Every cell is reopened first, so running the pass twice over unchanged
/// geometry produces identical results. A containment query that fails on a
/// degenerate sample point skips that cell (it stays open) and the pass
/// continues; geometry trouble never aborts classification.
pub fn classify_cells(lattice: &mut VoxelLattice, meshes: &[Mesh]) -> usize {
    lattice.reset_classification();

    let config = *lattice.config();
    let lattice_bounds = Aabb::from_center_size(config.center(), config.size());
    let [nx, ny, nz] = config.counts();

    for (mesh_number, mesh) in meshes.iter().enumerate() {
        if !mesh.aabb().overlaps(&lattice_bounds) {
            log::debug!("mesh {mesh_number} is outside the lattice bounds, skipping");
            continue;
        }

        for z in 0..nz {
            for y in 0..ny {
                for x in 0..nx {
                    let center = config.position_of_indices([x, y, z]);
                    let cell_bounds =
                        Aabb::from_center_size(center, DVec3::splat(config.cell_size()));
                    if !cell_bounds.overlaps(mesh.aabb()) {
                        continue;
                    }

                    match points_inside_mesh(mesh, &sample_points(center, config.cell_size())) {
                        Ok(inside) => {
                            let count = inside.iter().filter(|&&hit| hit).count();
                            if count > SOLID_SAMPLE_THRESHOLD {
                                let index = config.flat_index(x, y, z);
                                let cell = &mut lattice.cells_mut()[index];
                                cell.absorption = DEFAULT_WALL_ABSORPTION;
                                cell.open = false;
                            }
                        }
                        Err(err) => {
                            // Inexact cell; leave it open rather than guessing.
                            log::warn!(
                                "skipping cell ({x}, {y}, {z}): containment query failed: {err}"
                            );
                        }
                    }
                }
            }
        }
    }

    let solid = lattice.cells().iter().filter(|cell| !cell.open).count();
    log::debug!(
        "classified {solid} of {} cells as solid across {} meshes",
        lattice.len(),
        meshes.len()
    );
    solid
}

/// The cell center plus its eight corners.
fn sample_points(center: DVec3, cell_size: f64) -> [DVec3; 9] {
    let h = cell_size / 2.0;
    [
        center,
        center + DVec3::new(h, h, -h),
        center + DVec3::new(h, h, h),
        center + DVec3::new(-h, h, -h),
        center + DVec3::new(-h, h, h),
        center + DVec3::new(h, -h, -h),
        center + DVec3::new(h, -h, h),
        center + DVec3::new(-h, -h, -h),
        center + DVec3::new(-h, -h, h),
    ]
}
