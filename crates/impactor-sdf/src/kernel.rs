use impactor_core::{GeometryKernel, KernelError};
use tracing::trace;

use crate::primitives::{Cuboid, Cylinder, Sdf3};
use crate::solid::SdfSolid;

/// Default spacing of the volume sampling grid, millimeters.
pub const DEFAULT_VOLUME_CELL_MM: f64 = 0.25;

/// [`GeometryKernel`] backed by implicit CSG trees.
///
/// Booleans and transforms only build the tree; distances are evaluated
/// lazily by the volume query or by a mesher.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SdfKernel {
    volume_cell_mm: f64,
}

impl Default for SdfKernel {
    fn default() -> Self {
        Self {
            volume_cell_mm: DEFAULT_VOLUME_CELL_MM,
        }
    }
}

impl SdfKernel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_volume_cell(volume_cell_mm: f64) -> Result<Self, KernelError> {
        let volume_cell_mm = KernelError::require_positive("volume cell size", volume_cell_mm)?;
        Ok(Self { volume_cell_mm })
    }

    pub fn volume_cell_mm(&self) -> f64 {
        self.volume_cell_mm
    }
}

impl GeometryKernel for SdfKernel {
    type Solid = SdfSolid;

    fn cylinder(&self, diameter: f64, height: f64) -> Result<SdfSolid, KernelError> {
        Ok(SdfSolid::Cylinder(Cylinder::new(diameter, height)?))
    }

    fn cuboid(&self, size_x: f64, size_y: f64, size_z: f64) -> Result<SdfSolid, KernelError> {
        Ok(SdfSolid::Cuboid(Cuboid::new(size_x, size_y, size_z)?))
    }

    fn union(&self, a: SdfSolid, b: SdfSolid) -> Result<SdfSolid, KernelError> {
        Ok(SdfSolid::union(a, b))
    }

    fn subtract(&self, target: SdfSolid, tool: SdfSolid) -> Result<SdfSolid, KernelError> {
        Ok(SdfSolid::difference(target, tool))
    }

    fn translate(&self, solid: SdfSolid, offset: [f64; 3]) -> Result<SdfSolid, KernelError> {
        if offset.iter().any(|v| !v.is_finite()) {
            return Err(KernelError::Backend {
                message: format!("non-finite translation {offset:?}"),
            });
        }
        Ok(SdfSolid::translate(solid, offset))
    }

    fn rotate_z(&self, solid: SdfSolid, degrees: f64) -> Result<SdfSolid, KernelError> {
        if !degrees.is_finite() {
            return Err(KernelError::Backend {
                message: format!("non-finite rotation {degrees}"),
            });
        }
        Ok(SdfSolid::rotate_z(solid, degrees.to_radians()))
    }

    /// Midpoint-rule estimate over the solid's bounds.
    fn volume(&self, solid: &SdfSolid) -> Result<f64, KernelError> {
        let bounds = solid.bounds();
        let size = bounds.size();
        let h = self.volume_cell_mm;
        let counts = size.map(|extent| (extent / h).ceil().max(1.0) as usize);

        let mut inside = 0usize;
        for k in 0..counts[2] {
            let z = bounds.min[2] + (k as f64 + 0.5) * h;
            for j in 0..counts[1] {
                let y = bounds.min[1] + (j as f64 + 0.5) * h;
                for i in 0..counts[0] {
                    let x = bounds.min[0] + (i as f64 + 0.5) * h;
                    if solid.evaluate([x, y, z]) < 0.0 {
                        inside += 1;
                    }
                }
            }
        }
        trace!(cells = counts[0] * counts[1] * counts[2], inside, "sampled volume");

        if inside == 0 {
            return Err(KernelError::EmptySolid { operation: "volume" });
        }
        Ok(inside as f64 * h * h * h)
    }
}

#[cfg(test)]
mod tests {
    use std::f64::consts::PI;

    use approx::assert_relative_eq;
    use impactor_core::{GeometryKernel, KernelError};

    use super::SdfKernel;
    use crate::primitives::Sdf3;

    #[test]
    fn cylinder_volume_matches_closed_form() {
        let kernel = SdfKernel::with_volume_cell(0.1).expect("cell");
        let cyl = kernel.cylinder(10.0, 4.0).expect("cylinder");
        let volume = kernel.volume(&cyl).expect("volume");
        assert_relative_eq!(volume, PI * 25.0 * 4.0, max_relative = 0.02);
    }

    #[test]
    fn bored_plate_loses_the_bore_volume() {
        let kernel = SdfKernel::with_volume_cell(0.1).expect("cell");
        let plate = kernel.cylinder(20.0, 2.0).expect("plate");
        let bored = kernel
            .bore(plate, 4.0, [0.0, 0.0], -1.0, 4.0)
            .expect("bore");
        let volume = kernel.volume(&bored).expect("volume");
        assert_relative_eq!(volume, PI * (100.0 - 4.0) * 2.0, max_relative = 0.02);
    }

    #[test]
    fn rotate_z_takes_degrees() {
        let kernel = SdfKernel::new();
        let bar = kernel.cuboid(4.0, 1.0, 1.0).expect("bar");
        let bar = kernel.translate(bar, [3.0, 0.0, 0.0]).expect("translate");
        let bar = kernel.rotate_z(bar, 90.0).expect("rotate");
        assert!(bar.evaluate([0.0, 3.0, 0.5]) < 0.0);
    }

    #[test]
    fn fully_removed_solid_reports_empty() {
        let kernel = SdfKernel::new();
        let small = kernel.cylinder(2.0, 1.0).expect("small");
        let block = kernel.cuboid(20.0, 20.0, 3.0).expect("block");
        let block = kernel.translate(block, [0.0, 0.0, -1.0]).expect("lower");
        let nothing = kernel.subtract(small, block).expect("subtract");
        assert_eq!(
            kernel.volume(&nothing),
            Err(KernelError::EmptySolid { operation: "volume" })
        );
    }

    #[test]
    fn invalid_dimensions_and_offsets_are_rejected() {
        let kernel = SdfKernel::new();
        assert!(kernel.cylinder(-1.0, 2.0).is_err());
        assert!(kernel.cuboid(1.0, 0.0, 1.0).is_err());
        let cyl = kernel.cylinder(1.0, 1.0).expect("cylinder");
        assert!(kernel.translate(cyl.clone(), [f64::NAN, 0.0, 0.0]).is_err());
        assert!(kernel.rotate_z(cyl, f64::INFINITY).is_err());
        assert!(SdfKernel::with_volume_cell(0.0).is_err());
    }
}
