//! Derives printable inertial impactor stages from a flow rate and a target
//! cut-point, independent of the solid modeling backend.

pub mod cascade;
pub mod composer;
pub mod error;
pub mod export;
pub mod family;
pub mod kernel;
pub mod physics;
pub mod profile;
pub mod templates;

pub use cascade::{CascadeProject, MultiStageComposer, StageOutcome, project_name, stage_name};
pub use composer::{
    AssemblyComposer, PART_BODY, PART_NOZZLE_PLATE, STACK_TOLERANCE_MM, StageAssembly,
    StageMetadata, StageReport,
};
pub use error::{ExportError, ImpactorError, ImpactorResult, KernelError};
pub use export::{StageExporter, ensure_dir, part_file_stem};
pub use family::DeviceFamily;
pub use kernel::GeometryKernel;
pub use physics::{
    DEFAULT_CURVE_SIZES_UM, EfficiencyPoint, PhysicalConstants, PhysicsConstraintSet,
    PhysicsSolver, REYNOLDS_ADVISORY_RANGE, ReynoldsRegime, SolveParams, collection_efficiency,
};
pub use profile::{CassetteProfile, MINIATURE_25MM, STANDARD_37MM};
