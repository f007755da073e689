use crate::primitives::Point3;

/// Maps a world point into the local space of a translated solid.
#[inline]
pub fn inverse_translate(point: Point3, offset: Point3) -> Point3 {
    [
        point[0] - offset[0],
        point[1] - offset[1],
        point[2] - offset[2],
    ]
}

/// Maps a world point into the local space of a solid rotated by `angle`
/// radians about Z.
#[inline]
pub fn inverse_rotate_z(point: Point3, angle: f64) -> Point3 {
    let c = angle.cos();
    let s = angle.sin();
    [c * point[0] + s * point[1], -s * point[0] + c * point[1], point[2]]
}
