use std::str::FromStr;

use crate::Mesh;

/// Output encodings for a tessellated part.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MeshFormat {
    #[default]
    BinaryStl,
    AsciiStl,
    Obj,
}

impl MeshFormat {
    pub fn extension(self) -> &'static str {
        match self {
            MeshFormat::BinaryStl | MeshFormat::AsciiStl => "stl",
            MeshFormat::Obj => "obj",
        }
    }

    pub fn encode(self, mesh: &Mesh, name: &str) -> Vec<u8> {
        match self {
            MeshFormat::BinaryStl => to_binary_stl(mesh, name),
            MeshFormat::AsciiStl => to_ascii_stl(mesh, name).into_bytes(),
            MeshFormat::Obj => to_obj(mesh).into_bytes(),
        }
    }
}

impl FromStr for MeshFormat {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "stl" | "binary-stl" => Ok(MeshFormat::BinaryStl),
            "ascii-stl" => Ok(MeshFormat::AsciiStl),
            "obj" => Ok(MeshFormat::Obj),
            other => Err(format!(
                "unknown mesh format '{other}', expected stl, ascii-stl or obj"
            )),
        }
    }
}

#[inline]
fn unit_normal(a: [f64; 3], b: [f64; 3], c: [f64; 3]) -> [f64; 3] {
    let ab = [b[0] - a[0], b[1] - a[1], b[2] - a[2]];
    let ac = [c[0] - a[0], c[1] - a[1], c[2] - a[2]];
    let n = [
        ab[1] * ac[2] - ab[2] * ac[1],
        ab[2] * ac[0] - ab[0] * ac[2],
        ab[0] * ac[1] - ab[1] * ac[0],
    ];
    let len = (n[0] * n[0] + n[1] * n[1] + n[2] * n[2]).sqrt();
    if len <= f64::EPSILON {
        [0.0, 0.0, 0.0]
    } else {
        [n[0] / len, n[1] / len, n[2] / len]
    }
}

/// 80-byte header, little-endian triangle count, 50 bytes per facet.
pub fn to_binary_stl(mesh: &Mesh, name: &str) -> Vec<u8> {
    let mut bytes = Vec::<u8>::with_capacity(84 + mesh.triangles.len() * 50);

    let mut header = [0u8; 80];
    let name_bytes = name.as_bytes();
    let header_len = name_bytes.len().min(80);
    header[..header_len].copy_from_slice(&name_bytes[..header_len]);
    bytes.extend_from_slice(&header);
    bytes.extend_from_slice(&(mesh.triangles.len() as u32).to_le_bytes());

    for tri in &mesh.triangles {
        let [a, b, c] = tri.map(|i| mesh.vertices[i as usize]);
        for v in [unit_normal(a, b, c), a, b, c] {
            push_f32_triplet(&mut bytes, v);
        }
        bytes.extend_from_slice(&0u16.to_le_bytes());
    }

    bytes
}

pub fn to_ascii_stl(mesh: &Mesh, name: &str) -> String {
    let mut out = String::new();
    out.push_str(&format!("solid {name}\n"));
    for tri in &mesh.triangles {
        let [a, b, c] = tri.map(|i| mesh.vertices[i as usize]);
        let n = unit_normal(a, b, c);
        out.push_str(&format!("  facet normal {} {} {}\n", n[0], n[1], n[2]));
        out.push_str("    outer loop\n");
        for v in [a, b, c] {
            out.push_str(&format!("      vertex {} {} {}\n", v[0], v[1], v[2]));
        }
        out.push_str("    endloop\n");
        out.push_str("  endfacet\n");
    }
    out.push_str(&format!("endsolid {name}\n"));
    out
}

/// Wavefront OBJ with 1-based face indices.
pub fn to_obj(mesh: &Mesh) -> String {
    let mut out = String::new();
    for v in &mesh.vertices {
        out.push_str(&format!("v {} {} {}\n", v[0], v[1], v[2]));
    }
    for t in &mesh.triangles {
        out.push_str(&format!("f {} {} {}\n", t[0] + 1, t[1] + 1, t[2] + 1));
    }
    out
}

#[inline]
fn push_f32_triplet(bytes: &mut Vec<u8>, value: [f64; 3]) {
    for component in value {
        bytes.extend_from_slice(&(component as f32).to_le_bytes());
    }
}
