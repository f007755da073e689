//! Export contract. File formats live in the backend crates.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::cascade::CascadeProject;
use crate::composer::{PART_BODY, PART_NOZZLE_PLATE, StageAssembly};
use crate::error::ExportError;

/// Persists the parts of a composed stage.
pub trait StageExporter<S> {
    /// Writes every part of `stage` into `destination` and returns the
    /// files written.
    fn export_stage(
        &self,
        stage: &StageAssembly<'_, S>,
        destination: &Path,
    ) -> Result<Vec<PathBuf>, ExportError>;

    /// Writes each stage into `<root>/<project>/<stage>/`.
    fn export_cascade(
        &self,
        project: &CascadeProject<'_, S>,
        root: &Path,
    ) -> Result<Vec<PathBuf>, ExportError> {
        let project_dir = root.join(project.name());
        let mut written = Vec::new();
        for stage in &project.stages {
            let stage_dir = project_dir.join(stage.name());
            written.extend(self.export_stage(stage, &stage_dir)?);
        }
        info!(
            files = written.len(),
            "exported cascade to {}",
            project_dir.display()
        );
        Ok(written)
    }
}

/// File stem for a part: `<stage>_body`, `<stage>_nozzle`, or `<stage>_<part>`.
pub fn part_file_stem(stage_name: &str, part_name: &str) -> String {
    let suffix = match part_name {
        PART_NOZZLE_PLATE => "nozzle",
        PART_BODY => "body",
        other => other,
    };
    format!("{stage_name}_{suffix}")
}

/// `create_dir_all` with the path attached to the error.
pub fn ensure_dir(path: &Path) -> Result<(), ExportError> {
    fs::create_dir_all(path).map_err(|source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    })
}
