use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use impactor_core::{
    CassetteProfile, ExportError, StageAssembly, StageExporter, StageMetadata, ensure_dir,
    part_file_stem,
};
use impactor_sdf::SdfSolid;
use serde::Serialize;
use tracing::{debug, info};

use crate::Mesh;
use crate::export::MeshFormat;
use crate::tetrahedra::{MeshingConfig, MeshingError, extract_mesh_from_sdf};

/// Default lattice spacing for part tessellation, millimeters.
pub const DEFAULT_CELL_SIZE_MM: f64 = 0.4;

/// Per-part entry of the stage manifest.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PartExport {
    pub file: String,
    pub triangles: usize,
    pub mesh_volume_mm3: f64,
}

/// Contents of `<stage>_metadata.json`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageManifest {
    pub metadata: StageMetadata,
    pub profile: CassetteProfile,
    pub cell_size_mm: f64,
    pub parts: BTreeMap<String, PartExport>,
}

/// Tessellates an SDF solid over its padded bounds.
pub fn mesh_solid(solid: &SdfSolid, cell_size_mm: f64) -> Result<Mesh, MeshingError> {
    let config = MeshingConfig::for_bounds(&solid.bounds(), cell_size_mm, 2.0 * cell_size_mm)?;
    debug!(resolution = ?config.resolution, cell_size_mm, "tessellating solid");
    Ok(extract_mesh_from_sdf(&config, solid))
}

/// Writes one mesh file per part plus a JSON manifest.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshExporter {
    cell_size_mm: f64,
    format: MeshFormat,
}

impl Default for MeshExporter {
    fn default() -> Self {
        Self {
            cell_size_mm: DEFAULT_CELL_SIZE_MM,
            format: MeshFormat::default(),
        }
    }
}

impl MeshExporter {
    pub fn new(cell_size_mm: f64, format: MeshFormat) -> Result<Self, ExportError> {
        if !(cell_size_mm.is_finite() && cell_size_mm > 0.0) {
            return Err(ExportError::Tessellation {
                part: "*".to_string(),
                message: format!("cell size must be positive, got {cell_size_mm}"),
            });
        }
        Ok(Self {
            cell_size_mm,
            format,
        })
    }

    pub fn cell_size_mm(&self) -> f64 {
        self.cell_size_mm
    }

    pub fn format(&self) -> MeshFormat {
        self.format
    }

    fn write(&self, path: &Path, bytes: &[u8]) -> Result<(), ExportError> {
        fs::write(path, bytes).map_err(|source| ExportError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl StageExporter<SdfSolid> for MeshExporter {
    fn export_stage(
        &self,
        stage: &StageAssembly<'_, SdfSolid>,
        destination: &Path,
    ) -> Result<Vec<PathBuf>, ExportError> {
        ensure_dir(destination)?;

        let mut written = Vec::new();
        let mut parts = BTreeMap::new();
        for (part, solid) in stage.parts() {
            let mesh = mesh_solid(solid, self.cell_size_mm).map_err(|err| {
                ExportError::Tessellation {
                    part: part.to_string(),
                    message: err.to_string(),
                }
            })?;
            if mesh.is_empty() {
                return Err(ExportError::Tessellation {
                    part: part.to_string(),
                    message: format!("no surface found at {} mm cells", self.cell_size_mm),
                });
            }

            let stem = part_file_stem(stage.name(), part);
            let file = format!("{stem}.{}", self.format.extension());
            let path = destination.join(&file);
            self.write(&path, &self.format.encode(&mesh, &stem))?;
            info!(
                part,
                triangles = mesh.triangles.len(),
                "wrote {}",
                path.display()
            );

            parts.insert(
                part.to_string(),
                PartExport {
                    file,
                    triangles: mesh.triangles.len(),
                    mesh_volume_mm3: mesh.signed_volume(),
                },
            );
            written.push(path);
        }

        let manifest = StageManifest {
            metadata: stage.metadata().clone(),
            profile: *stage.profile(),
            cell_size_mm: self.cell_size_mm,
            parts,
        };
        let path = destination.join(format!("{}_metadata.json", stage.name()));
        self.write(&path, &serde_json::to_vec_pretty(&manifest)?)?;
        written.push(path);

        Ok(written)
    }
}
