/// Exact CSG union for true SDFs.
#[inline]
pub fn union(a: f64, b: f64) -> f64 {
    a.min(b)
}

/// Removes `b` from `a`.
#[inline]
pub fn difference(a: f64, b: f64) -> f64 {
    a.max(-b)
}
