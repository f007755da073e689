use std::collections::HashMap;

pub mod export;
pub mod exporter;
pub mod tetrahedra;

/// Indexed triangle mesh, millimeters.
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    pub vertices: Vec<[f64; 3]>,
    pub triangles: Vec<[u32; 3]>,
}

impl Mesh {
    pub fn empty() -> Self {
        Self {
            vertices: Vec::new(),
            triangles: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    fn corners(&self, tri: &[u32; 3]) -> [[f64; 3]; 3] {
        tri.map(|i| self.vertices[i as usize])
    }

    /// Divergence-theorem volume. Positive when triangles face outward.
    pub fn signed_volume(&self) -> f64 {
        self.triangles
            .iter()
            .map(|tri| {
                let [a, b, c] = self.corners(tri);
                dot(a, cross(b, c)) / 6.0
            })
            .sum()
    }

    pub fn surface_area(&self) -> f64 {
        self.triangles
            .iter()
            .map(|tri| {
                let [a, b, c] = self.corners(tri);
                let n = cross(sub(b, a), sub(c, a));
                dot(n, n).sqrt() * 0.5
            })
            .sum()
    }

    /// True when every edge is shared by exactly two triangles.
    pub fn is_closed(&self) -> bool {
        let mut edge_counts = HashMap::<(u32, u32), usize>::new();
        for tri in &self.triangles {
            for (a, b) in [(tri[0], tri[1]), (tri[1], tri[2]), (tri[2], tri[0])] {
                *edge_counts.entry((a.min(b), a.max(b))).or_insert(0) += 1;
            }
        }
        !edge_counts.is_empty() && edge_counts.values().all(|&count| count == 2)
    }
}

#[inline]
fn sub(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

#[inline]
fn dot(a: [f64; 3], b: [f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

#[inline]
fn cross(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

pub use export::{MeshFormat, to_ascii_stl, to_binary_stl, to_obj};
pub use exporter::{DEFAULT_CELL_SIZE_MM, MeshExporter, PartExport, StageManifest, mesh_solid};
pub use tetrahedra::{
    MAX_SAMPLE_COUNT, MeshingConfig, MeshingError, extract_mesh_from_sdf, extract_mesh_with,
};

#[cfg(test)]
mod tests {
    use super::Mesh;

    fn unit_tetrahedron() -> Mesh {
        Mesh {
            vertices: vec![
                [0.0, 0.0, 0.0],
                [1.0, 0.0, 0.0],
                [0.0, 1.0, 0.0],
                [0.0, 0.0, 1.0],
            ],
            triangles: vec![[0, 2, 1], [0, 1, 3], [0, 3, 2], [1, 2, 3]],
        }
    }

    #[test]
    fn empty_mesh_has_no_geometry() {
        let mesh = Mesh::empty();
        assert!(mesh.is_empty());
        assert!(!mesh.is_closed());
        assert_eq!(mesh.signed_volume(), 0.0);
    }

    #[test]
    fn outward_tetrahedron_has_positive_volume() {
        let mesh = unit_tetrahedron();
        assert!((mesh.signed_volume() - 1.0 / 6.0).abs() < 1e-12);
        assert!(mesh.is_closed());
    }

    #[test]
    fn open_surface_is_not_closed() {
        let mut mesh = unit_tetrahedron();
        mesh.triangles.pop();
        assert!(!mesh.is_closed());
    }
}
