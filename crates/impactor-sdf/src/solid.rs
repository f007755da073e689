use std::sync::Arc;

use crate::operations::{difference, union};
use crate::primitives::{Aabb, Cuboid, Cylinder, Point3, Sdf3};
use crate::transforms::{inverse_rotate_z, inverse_translate};

/// Immutable CSG tree evaluated as a signed distance field.
///
/// Children are shared, so cloning a solid is cheap and solids can be sent
/// across threads.
#[derive(Debug, Clone)]
pub enum SdfSolid {
    Cylinder(Cylinder),
    Cuboid(Cuboid),
    Union(Arc<SdfSolid>, Arc<SdfSolid>),
    Difference(Arc<SdfSolid>, Arc<SdfSolid>),
    Translate {
        solid: Arc<SdfSolid>,
        offset: Point3,
    },
    RotateZ {
        solid: Arc<SdfSolid>,
        radians: f64,
    },
}

impl SdfSolid {
    pub fn union(a: SdfSolid, b: SdfSolid) -> SdfSolid {
        SdfSolid::Union(Arc::new(a), Arc::new(b))
    }

    pub fn difference(target: SdfSolid, tool: SdfSolid) -> SdfSolid {
        SdfSolid::Difference(Arc::new(target), Arc::new(tool))
    }

    pub fn translate(solid: SdfSolid, offset: Point3) -> SdfSolid {
        SdfSolid::Translate {
            solid: Arc::new(solid),
            offset,
        }
    }

    pub fn rotate_z(solid: SdfSolid, radians: f64) -> SdfSolid {
        SdfSolid::RotateZ {
            solid: Arc::new(solid),
            radians,
        }
    }

    /// Conservative bounds. Differences keep the bounds of their target.
    pub fn bounds(&self) -> Aabb {
        match self {
            SdfSolid::Cylinder(c) => c.bounds(),
            SdfSolid::Cuboid(b) => b.bounds(),
            SdfSolid::Union(a, b) => a.bounds().union(&b.bounds()),
            SdfSolid::Difference(target, _) => target.bounds(),
            SdfSolid::Translate { solid, offset } => solid.bounds().translated(*offset),
            SdfSolid::RotateZ { solid, radians } => solid.bounds().rotated_z(*radians),
        }
    }

    /// Number of nodes in the tree.
    pub fn node_count(&self) -> usize {
        match self {
            SdfSolid::Cylinder(_) | SdfSolid::Cuboid(_) => 1,
            SdfSolid::Union(a, b) | SdfSolid::Difference(a, b) => {
                1 + a.node_count() + b.node_count()
            }
            SdfSolid::Translate { solid, .. } | SdfSolid::RotateZ { solid, .. } => {
                1 + solid.node_count()
            }
        }
    }

    pub fn contains(&self, point: Point3) -> bool {
        self.evaluate(point) < 0.0
    }
}

impl Sdf3 for SdfSolid {
    fn evaluate(&self, point: Point3) -> f64 {
        match self {
            SdfSolid::Cylinder(c) => c.evaluate(point),
            SdfSolid::Cuboid(b) => b.evaluate(point),
            SdfSolid::Union(a, b) => union(a.evaluate(point), b.evaluate(point)),
            SdfSolid::Difference(target, tool) => {
                difference(target.evaluate(point), tool.evaluate(point))
            }
            SdfSolid::Translate { solid, offset } => {
                solid.evaluate(inverse_translate(point, *offset))
            }
            SdfSolid::RotateZ { solid, radians } => {
                solid.evaluate(inverse_rotate_z(point, *radians))
            }
        }
    }
}

impl<S: Sdf3 + ?Sized> Sdf3 for Arc<S> {
    fn evaluate(&self, point: Point3) -> f64 {
        (**self).evaluate(point)
    }
}
