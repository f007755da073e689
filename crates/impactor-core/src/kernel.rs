//! Capability boundary to the solid modeling backend.
//!
//! The engine never models boundary representations itself; it only asks a
//! kernel for the handful of operations below. All solids use millimeters.

use crate::error::KernelError;

/// Narrow set of solid operations the templates are written against.
///
/// Primitives are built with their base on Z = 0, axis along +Z, centred on
/// the XY origin. Operations consume their inputs and return a new solid.
pub trait GeometryKernel {
    type Solid: Clone;

    /// Solid right circular cylinder (a disc when `height` is small).
    fn cylinder(&self, diameter: f64, height: f64) -> Result<Self::Solid, KernelError>;

    /// Axis-aligned box, `size_x` by `size_y` centred on the origin, `size_z` tall.
    fn cuboid(&self, size_x: f64, size_y: f64, size_z: f64)
    -> Result<Self::Solid, KernelError>;

    fn union(&self, a: Self::Solid, b: Self::Solid) -> Result<Self::Solid, KernelError>;

    /// `target` with `tool` removed.
    fn subtract(&self, target: Self::Solid, tool: Self::Solid)
    -> Result<Self::Solid, KernelError>;

    fn translate(&self, solid: Self::Solid, offset: [f64; 3]) -> Result<Self::Solid, KernelError>;

    /// Rigid rotation about the Z axis, counter-clockwise, in degrees.
    fn rotate_z(&self, solid: Self::Solid, degrees: f64) -> Result<Self::Solid, KernelError>;

    /// Enclosed volume in mm³. Used for reporting only.
    fn volume(&self, solid: &Self::Solid) -> Result<f64, KernelError>;

    /// Removes a circular bore of `diameter` centred at `center` (XY) spanning
    /// `z_start..z_start + depth`.
    fn bore(
        &self,
        target: Self::Solid,
        diameter: f64,
        center: [f64; 2],
        z_start: f64,
        depth: f64,
    ) -> Result<Self::Solid, KernelError> {
        let tool = self.cylinder(diameter, depth)?;
        let tool = self.translate(tool, [center[0], center[1], z_start])?;
        self.subtract(target, tool)
    }
}
