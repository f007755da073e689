use std::collections::HashMap;

use impactor_sdf::{Aabb, Point3, Sdf3};
use rayon::prelude::*;
use thiserror::Error;
use tracing::warn;

use crate::Mesh;

const CORNER_OFFSETS: [[usize; 3]; 8] = [
    [0, 0, 0],
    [1, 0, 0],
    [1, 1, 0],
    [0, 1, 0],
    [0, 0, 1],
    [1, 0, 1],
    [1, 1, 1],
    [0, 1, 1],
];

/// Six tetrahedra around the 0-6 diagonal. Every cell is split the same
/// way, so faces shared between cells are split identically.
const CELL_TETRAHEDRA: [[usize; 4]; 6] = [
    [0, 1, 2, 6],
    [0, 2, 3, 6],
    [0, 3, 7, 6],
    [0, 7, 4, 6],
    [0, 4, 5, 6],
    [0, 5, 1, 6],
];

/// Upper bound on lattice samples, about 1 GiB of field values.
pub const MAX_SAMPLE_COUNT: usize = 1 << 27;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum MeshingError {
    #[error("cell size must be finite and positive, got {0}")]
    InvalidCellSize(f64),

    #[error("padding must be finite and non-negative, got {0}")]
    InvalidPadding(f64),

    #[error("bounds are not finite")]
    UnboundedRegion,

    #[error("lattice of {samples:.3e} samples exceeds the limit of {MAX_SAMPLE_COUNT}")]
    LatticeTooLarge { samples: f64 },
}

/// Sampling lattice for surface extraction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshingConfig {
    pub min: Point3,
    pub max: Point3,
    pub resolution: [usize; 3],
    pub iso_level: f64,
}

impl MeshingConfig {
    pub fn new(min: Point3, max: Point3, resolution: [usize; 3], iso_level: f64) -> Self {
        Self {
            min,
            max,
            resolution,
            iso_level,
        }
    }

    /// Lattice covering `bounds` plus `padding` at roughly `cell_size`
    /// spacing. The padding keeps the zero level away from the lattice
    /// boundary so the extracted surface is closed.
    pub fn for_bounds(
        bounds: &Aabb,
        cell_size: f64,
        padding: f64,
    ) -> Result<Self, MeshingError> {
        if !(cell_size.is_finite() && cell_size > 0.0) {
            return Err(MeshingError::InvalidCellSize(cell_size));
        }
        if !(padding.is_finite() && padding >= 0.0) {
            return Err(MeshingError::InvalidPadding(padding));
        }
        let padded = bounds.padded(padding);
        let size = padded.size();
        if size.iter().any(|extent| !extent.is_finite() || *extent < 0.0) {
            return Err(MeshingError::UnboundedRegion);
        }

        // Count in f64 first; the axis counts alone may not fit a usize.
        let counts = size.map(|extent| (extent / cell_size).ceil() + 1.0);
        let samples = counts[0] * counts[1] * counts[2];
        if samples > MAX_SAMPLE_COUNT as f64 {
            return Err(MeshingError::LatticeTooLarge { samples });
        }

        let config = Self::new(padded.min, padded.max, counts.map(|n| n as usize), 0.0);
        config
            .checked_sample_count()
            .map(|_| config)
            .ok_or(MeshingError::LatticeTooLarge { samples })
    }

    /// Number of lattice samples, `None` past [`MAX_SAMPLE_COUNT`].
    pub fn checked_sample_count(&self) -> Option<usize> {
        let [nx, ny, nz] = self.resolution;
        nx.checked_mul(ny)
            .and_then(|n| n.checked_mul(nz))
            .filter(|n| *n <= MAX_SAMPLE_COUNT)
    }

    fn spacing(&self) -> Point3 {
        let [nx, ny, nz] = self.resolution;
        [
            (self.max[0] - self.min[0]) / ((nx - 1) as f64),
            (self.max[1] - self.min[1]) / ((ny - 1) as f64),
            (self.max[2] - self.min[2]) / ((nz - 1) as f64),
        ]
    }
}

pub fn extract_mesh_from_sdf<S>(config: &MeshingConfig, sdf: &S) -> Mesh
where
    S: Sdf3 + Sync,
{
    extract_mesh_with(config, |point| sdf.evaluate(point))
}

/// Extracts the `iso_level` surface of `sample` with outward-facing triangles.
pub fn extract_mesh_with<F>(config: &MeshingConfig, sample: F) -> Mesh
where
    F: Fn(Point3) -> f64 + Sync,
{
    let [nx, ny, nz] = config.resolution;
    if nx < 2 || ny < 2 || nz < 2 {
        return Mesh::empty();
    }
    if config.checked_sample_count().is_none() {
        warn!(resolution = ?config.resolution, "lattice too large, nothing extracted");
        return Mesh::empty();
    }

    let spacing = config.spacing();
    let field = sample_grid(config, spacing, &sample);
    let point_at = |gx: usize, gy: usize, gz: usize| -> Point3 {
        [
            config.min[0] + (gx as f64) * spacing[0],
            config.min[1] + (gy as f64) * spacing[1],
            config.min[2] + (gz as f64) * spacing[2],
        ]
    };

    let mut mesh = Mesh::empty();
    let mut vertex_cache = HashMap::<(usize, usize), u32>::new();
    let mut corner_ids = [0usize; 8];
    let mut corner_values = [0.0_f64; 8];
    let mut corner_points = [[0.0_f64; 3]; 8];

    for z in 0..(nz - 1) {
        for y in 0..(ny - 1) {
            for x in 0..(nx - 1) {
                let mut inside = 0u8;
                for (corner, offset) in CORNER_OFFSETS.iter().enumerate() {
                    let (gx, gy, gz) = (x + offset[0], y + offset[1], z + offset[2]);
                    let idx = grid_index(gx, gy, gz, nx, ny);
                    corner_ids[corner] = idx;
                    corner_values[corner] = field[idx];
                    corner_points[corner] = point_at(gx, gy, gz);
                    if field[idx] < config.iso_level {
                        inside |= 1 << corner;
                    }
                }
                if inside == 0 || inside == u8::MAX {
                    continue;
                }

                for tet in CELL_TETRAHEDRA {
                    let cell = TetCorners {
                        ids: tet.map(|c| corner_ids[c]),
                        values: tet.map(|c| corner_values[c]),
                        points: tet.map(|c| corner_points[c]),
                    };
                    polygonize_tetrahedron(&mut mesh, &mut vertex_cache, &cell, config.iso_level);
                }
            }
        }
    }

    mesh
}

struct TetCorners {
    ids: [usize; 4],
    values: [f64; 4],
    points: [Point3; 4],
}

fn polygonize_tetrahedron(
    mesh: &mut Mesh,
    cache: &mut HashMap<(usize, usize), u32>,
    tet: &TetCorners,
    iso: f64,
) {
    let (inner, outer): (Vec<usize>, Vec<usize>) =
        (0..4).partition(|&corner| tet.values[corner] < iso);
    if inner.is_empty() || outer.is_empty() {
        return;
    }

    let mut crossing = |a: usize, b: usize| -> u32 {
        let key = ordered(tet.ids[a], tet.ids[b]);
        if let Some(index) = cache.get(&key).copied() {
            return index;
        }
        let point = interpolate_edge(
            tet.points[a],
            tet.points[b],
            tet.values[a],
            tet.values[b],
            iso,
        );
        let index = mesh.vertices.len() as u32;
        mesh.vertices.push(point);
        cache.insert(key, index);
        index
    };

    let triangles: Vec<[u32; 3]> = match (inner.as_slice(), outer.as_slice()) {
        ([a], [b, c, d]) | ([b, c, d], [a]) => {
            vec![[crossing(*a, *b), crossing(*a, *c), crossing(*a, *d)]]
        }
        ([a, b], [c, d]) => {
            let ac = crossing(*a, *c);
            let ad = crossing(*a, *d);
            let bc = crossing(*b, *c);
            let bd = crossing(*b, *d);
            vec![[ac, ad, bd], [ac, bd, bc]]
        }
        _ => return,
    };

    let outward = sub(centroid(tet, &outer), centroid(tet, &inner));
    for tri in triangles {
        let normal = triangle_normal(
            mesh.vertices[tri[0] as usize],
            mesh.vertices[tri[1] as usize],
            mesh.vertices[tri[2] as usize],
        );
        if dot(normal, outward) < 0.0 {
            mesh.triangles.push([tri[0], tri[2], tri[1]]);
        } else {
            mesh.triangles.push(tri);
        }
    }
}

fn sample_grid<F>(config: &MeshingConfig, spacing: Point3, sample: &F) -> Vec<f64>
where
    F: Fn(Point3) -> f64 + Sync,
{
    let [nx, ny, nz] = config.resolution;
    let mut field = vec![0.0_f64; nx * ny * nz];

    field
        .par_chunks_mut(nx * ny)
        .enumerate()
        .for_each(|(z, slab)| {
            let pz = config.min[2] + (z as f64) * spacing[2];
            for y in 0..ny {
                let py = config.min[1] + (y as f64) * spacing[1];
                for x in 0..nx {
                    let px = config.min[0] + (x as f64) * spacing[0];
                    slab[x + y * nx] = sample([px, py, pz]);
                }
            }
        });
    debug_assert_eq!(field.len(), nx * ny * nz);

    field
}

#[inline]
fn grid_index(x: usize, y: usize, z: usize, nx: usize, ny: usize) -> usize {
    x + y * nx + z * nx * ny
}

#[inline]
fn ordered(a: usize, b: usize) -> (usize, usize) {
    if a <= b { (a, b) } else { (b, a) }
}

#[inline]
fn interpolate_edge(p1: Point3, p2: Point3, v1: f64, v2: f64, iso: f64) -> Point3 {
    let dv = v2 - v1;
    let t = if dv.abs() <= f64::EPSILON {
        0.5
    } else {
        (iso - v1) / dv
    };
    [
        p1[0] + t * (p2[0] - p1[0]),
        p1[1] + t * (p2[1] - p1[1]),
        p1[2] + t * (p2[2] - p1[2]),
    ]
}

fn centroid(tet: &TetCorners, corners: &[usize]) -> Point3 {
    let n = corners.len() as f64;
    let mut sum = [0.0; 3];
    for &corner in corners {
        for axis in 0..3 {
            sum[axis] += tet.points[corner][axis];
        }
    }
    sum.map(|v| v / n)
}

#[inline]
fn sub(a: Point3, b: Point3) -> Point3 {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

#[inline]
fn dot(a: Point3, b: Point3) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

#[inline]
fn triangle_normal(a: Point3, b: Point3, c: Point3) -> Point3 {
    let ab = sub(b, a);
    let ac = sub(c, a);
    [
        ab[1] * ac[2] - ab[2] * ac[1],
        ab[2] * ac[0] - ab[0] * ac[2],
        ab[0] * ac[1] - ab[1] * ac[0],
    ]
}
