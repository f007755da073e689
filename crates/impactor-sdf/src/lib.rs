pub mod kernel;
pub mod operations;
pub mod primitives;
pub mod solid;
pub mod transforms;

pub use kernel::{DEFAULT_VOLUME_CELL_MM, SdfKernel};
pub use operations::{difference, union};
pub use primitives::{Aabb, Cuboid, Cylinder, Point3, Sdf3};
pub use solid::SdfSolid;
pub use transforms::{inverse_rotate_z, inverse_translate};
