//! Single-stage composition: physics → dimensions → positioned parts.
//!
//! Stack layout along Z for one stage (body base at Z = 0):
//!
//! ```text
//!   body_height      ── top face, socket opening
//!   nozzle_exit_z    ── socket floor = underside of the nozzle plate
//!        │  jet_to_plate
//!   cup_floor_z      ── underside of the cup, struts start here
//!   0                ── body base, boss below
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{ImpactorError, ImpactorResult};
use crate::family::DeviceFamily;
use crate::kernel::GeometryKernel;
use crate::physics::{PhysicsConstraintSet, PhysicsSolver};
use crate::profile::CassetteProfile;
use crate::templates::{
    BodyDimensions, CupDimensions, StrutLayout, add_struts, impaction_body, impaction_cup,
    nozzle_plate,
};

pub const PART_NOZZLE_PLATE: &str = "nozzle_plate";
pub const PART_BODY: &str = "body";

/// Maximum deviation tolerated in the Z-stack relations.
pub const STACK_TOLERANCE_MM: f64 = 1e-6;

/// Derived placement data for one stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageMetadata {
    pub stage_name: String,
    pub flow_rate_lpm: f64,
    pub target_cutpoint_um: f64,
    pub body_height_mm: f64,
    pub nozzle_exit_z_mm: f64,
    pub cup_floor_z_mm: f64,
    pub cup_rim_z_mm: f64,
    pub cup_radius_mm: f64,
    pub constraints: PhysicsConstraintSet,
}

/// Named, positioned solids of one stage.
///
/// The parts are owned by the stage; the cassette profile is borrowed.
#[derive(Debug, Clone)]
pub struct StageAssembly<'p, S> {
    profile: &'p CassetteProfile,
    parts: BTreeMap<String, S>,
    metadata: StageMetadata,
}

impl<'p, S> StageAssembly<'p, S> {
    pub fn name(&self) -> &str {
        &self.metadata.stage_name
    }

    pub fn profile(&self) -> &'p CassetteProfile {
        self.profile
    }

    pub fn metadata(&self) -> &StageMetadata {
        &self.metadata
    }

    pub fn constraints(&self) -> &PhysicsConstraintSet {
        &self.metadata.constraints
    }

    pub fn part(&self, name: &str) -> Option<&S> {
        self.parts.get(name)
    }

    /// Parts in name order.
    pub fn parts(&self) -> impl Iterator<Item = (&str, &S)> {
        self.parts.iter().map(|(name, solid)| (name.as_str(), solid))
    }

    pub fn into_parts(self) -> BTreeMap<String, S> {
        self.parts
    }

    /// Re-checks `nozzle_exit_z = body_height - interface_height` and
    /// `cup_floor_z = nozzle_exit_z - jet_to_plate`.
    pub fn check_stack(&self) -> ImpactorResult<()> {
        let m = &self.metadata;
        let exit_error =
            (m.nozzle_exit_z_mm - (m.body_height_mm - self.profile.interface_height)).abs();
        let floor_error =
            (m.cup_floor_z_mm - (m.nozzle_exit_z_mm - m.constraints.jet_to_plate_mm)).abs();
        if exit_error > STACK_TOLERANCE_MM || floor_error > STACK_TOLERANCE_MM {
            return Err(ImpactorError::infeasible(format!(
                "stage '{}' Z-stack inconsistent: nozzle exit off by {exit_error:e} mm, cup floor off by {floor_error:e} mm",
                m.stage_name
            )));
        }
        Ok(())
    }
}

/// Metadata plus per-part volumes, ready for serialization.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageReport {
    pub metadata: StageMetadata,
    pub profile: CassetteProfile,
    pub part_volumes_mm3: BTreeMap<String, f64>,
}

/// Turns a flow rate and cut-point into one positioned stage.
#[derive(Debug, Clone)]
pub struct AssemblyComposer<K> {
    kernel: K,
    solver: PhysicsSolver,
    family: DeviceFamily,
}

impl<K: GeometryKernel> AssemblyComposer<K> {
    pub fn new(kernel: K) -> Self {
        Self {
            kernel,
            solver: PhysicsSolver::default(),
            family: DeviceFamily::default(),
        }
    }

    pub fn with_solver(mut self, solver: PhysicsSolver) -> Self {
        self.solver = solver;
        self
    }

    pub fn with_family(mut self, family: DeviceFamily) -> Self {
        self.family = family;
        self
    }

    pub fn kernel(&self) -> &K {
        &self.kernel
    }

    pub fn solver(&self) -> &PhysicsSolver {
        &self.solver
    }

    pub fn family(&self) -> &DeviceFamily {
        &self.family
    }

    pub fn compose_stage<'p>(
        &self,
        profile: &'p CassetteProfile,
        flow_rate_lpm: f64,
        target_cutpoint_um: f64,
        stage_name: &str,
    ) -> ImpactorResult<StageAssembly<'p, K::Solid>> {
        profile.validate()?;
        self.family.validate()?;
        let family = &self.family;

        let constraints =
            self.solver
                .solve(flow_rate_lpm, target_cutpoint_um, &family.solve_params())?;

        let body_height = constraints.jet_to_plate_mm + family.clearance_margin_mm;
        if body_height <= profile.interface_height {
            return Err(ImpactorError::infeasible(format!(
                "body height {body_height:.3} mm does not clear the {:.3} mm socket; nozzle exit would sit inside the interface",
                profile.interface_height
            )));
        }

        let cup_radius = constraints.nozzle_diameter_mm * family.cup_to_nozzle_ratio;
        let bore_radius = profile.flow_bore_radius();
        if bore_radius - cup_radius <= 0.0 {
            return Err(ImpactorError::infeasible(format!(
                "cup radius {cup_radius:.3} mm leaves no room for struts inside the {bore_radius:.3} mm flow bore"
            )));
        }

        let nozzle_exit_z = body_height - profile.interface_height;
        let cup_floor_z = nozzle_exit_z - constraints.jet_to_plate_mm;
        let cup_dims = CupDimensions {
            radius: cup_radius,
            rim_height: family.cup_rim_height_mm,
            floor_thickness: family.cup_floor_thickness_mm,
            wall_thickness: family.cup_wall_thickness_mm,
        };
        debug!(
            stage = stage_name,
            body_height,
            nozzle_exit_z,
            cup_floor_z,
            cup_radius,
            "derived stage stack"
        );

        let k = &self.kernel;
        let plate = nozzle_plate(
            k,
            profile.female_socket_diameter,
            constraints.throat_length_mm,
            constraints.nozzle_diameter_mm,
            family.nozzle_count,
        )
        .and_then(|plate| k.translate(plate, [0.0, 0.0, nozzle_exit_z]))
        .map_err(|source| ImpactorError::kernel(PART_NOZZLE_PLATE, source))?;

        let body = impaction_body(
            k,
            &BodyDimensions::stacked(profile, profile.inner_flow_diameter, body_height),
        )
        .map_err(|source| ImpactorError::kernel(PART_BODY, source))?;

        let cup = impaction_cup(k, &cup_dims)
            .and_then(|cup| k.translate(cup, [0.0, 0.0, cup_floor_z]))
            .map_err(|source| ImpactorError::kernel("cup", source))?;
        let body = k
            .union(body, cup)
            .map_err(|source| ImpactorError::kernel(PART_BODY, source))?;

        let struts = StrutLayout {
            inner_radius: cup_radius,
            outer_radius: bore_radius,
            z_pos: cup_floor_z,
            count: family.strut_count,
            width: family.strut_width_mm,
            thickness: family.strut_thickness_mm,
        };
        let body = add_struts(k, body, &struts)
            .map_err(|source| ImpactorError::kernel("struts", source))?;

        let mut parts = BTreeMap::new();
        parts.insert(PART_NOZZLE_PLATE.to_string(), plate);
        parts.insert(PART_BODY.to_string(), body);

        let stage = StageAssembly {
            profile,
            parts,
            metadata: StageMetadata {
                stage_name: stage_name.to_string(),
                flow_rate_lpm,
                target_cutpoint_um,
                body_height_mm: body_height,
                nozzle_exit_z_mm: nozzle_exit_z,
                cup_floor_z_mm: cup_floor_z,
                cup_rim_z_mm: cup_floor_z + cup_dims.total_height(),
                cup_radius_mm: cup_radius,
                constraints,
            },
        };
        stage.check_stack()?;

        info!(
            stage = stage_name,
            nozzle_diameter_mm = constraints.nozzle_diameter_mm,
            jet_to_plate_mm = constraints.jet_to_plate_mm,
            body_height_mm = body_height,
            "composed impactor stage"
        );
        Ok(stage)
    }

    /// Queries the kernel for each part's volume.
    pub fn report(&self, stage: &StageAssembly<'_, K::Solid>) -> ImpactorResult<StageReport> {
        let mut part_volumes_mm3 = BTreeMap::new();
        for (name, solid) in stage.parts() {
            let volume = self
                .kernel
                .volume(solid)
                .map_err(|source| ImpactorError::kernel(name, source))?;
            part_volumes_mm3.insert(name.to_string(), volume);
        }
        Ok(StageReport {
            metadata: stage.metadata().clone(),
            profile: *stage.profile(),
            part_volumes_mm3,
        })
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::{AssemblyComposer, PART_BODY, PART_NOZZLE_PLATE, STACK_TOLERANCE_MM};
    use crate::family::DeviceFamily;
    use crate::kernel::trace::{Op, TraceKernel};
    use crate::profile::{CassetteProfile, MINIATURE_25MM, STANDARD_37MM};

    fn composer() -> AssemblyComposer<TraceKernel> {
        AssemblyComposer::new(TraceKernel)
    }

    #[test]
    fn standard_stage_satisfies_stack_invariant() {
        let stage = composer()
            .compose_stage(&STANDARD_37MM, 4.0, 5.0, "stage_1_5.0um")
            .expect("5 µm stage fits the 37 mm cassette");
        let m = stage.metadata();
        let s = stage.constraints().jet_to_plate_mm;

        assert_relative_eq!(m.body_height_mm, s + 10.0, epsilon = 1e-12);
        assert_relative_eq!(m.nozzle_exit_z_mm, m.body_height_mm - 5.0, epsilon = 1e-12);
        assert!((m.cup_floor_z_mm - (m.body_height_mm - 5.0 - s)).abs() < STACK_TOLERANCE_MM);
        assert_relative_eq!(m.cup_rim_z_mm, m.cup_floor_z_mm + 5.0, epsilon = 1e-12);
        assert_relative_eq!(
            m.cup_radius_mm,
            3.0 * stage.constraints().nozzle_diameter_mm,
            epsilon = 1e-12
        );
        assert!(stage.check_stack().is_ok());
    }

    #[test]
    fn stage_exposes_plate_and_body() {
        let stage = composer()
            .compose_stage(&STANDARD_37MM, 4.0, 5.0, "s")
            .expect("stage");
        let names: Vec<&str> = stage.parts().map(|(name, _)| name).collect();
        assert_eq!(names, vec![PART_BODY, PART_NOZZLE_PLATE]);
    }

    #[test]
    fn nozzle_plate_fills_socket_and_sits_at_nozzle_exit() {
        let stage = composer()
            .compose_stage(&STANDARD_37MM, 4.0, 5.0, "s")
            .expect("stage");
        let plate = stage.part(PART_NOZZLE_PLATE).expect("plate");
        let (diameter, thickness) = plate.cylinders()[0];
        assert_eq!(diameter, STANDARD_37MM.female_socket_diameter);
        assert_relative_eq!(thickness, stage.constraints().throat_length_mm, epsilon = 1e-12);
        assert_eq!(
            plate.root(),
            Some(&Op::Translate([0.0, 0.0, stage.metadata().nozzle_exit_z_mm]))
        );
    }

    #[test]
    fn body_merges_cup_and_three_struts() {
        let stage = composer()
            .compose_stage(&STANDARD_37MM, 4.0, 5.0, "s")
            .expect("stage");
        let body = stage.part(PART_BODY).expect("body");
        assert_eq!(body.rotations(), vec![0.0, 120.0, 240.0]);
        let cup_floor = stage.metadata().cup_floor_z_mm;
        assert!(body.translations().contains(&[0.0, 0.0, cup_floor]));

        let cup_radius = stage.metadata().cup_radius_mm;
        let expected_bar = 17.0 - cup_radius + 4.0;
        assert!(body.0.iter().any(|op| matches!(
            op,
            Op::Cuboid { size } if (size[0] - expected_bar).abs() < 1e-12
        )));
    }

    #[test]
    fn cup_wider_than_flow_bore_is_infeasible() {
        let err = composer()
            .compose_stage(&STANDARD_37MM, 4.0, 10.0, "too_big")
            .expect_err("18 mm cup cannot fit a 17 mm bore");
        assert!(err.is_infeasible(), "{err}");
    }

    #[test]
    fn bore_narrower_than_six_nozzle_diameters_is_infeasible() {
        let profile = CassetteProfile {
            outer_diameter: 30.0,
            inner_flow_diameter: 20.0,
            male_boss_diameter: 24.0,
            female_socket_diameter: 24.2,
            interface_height: 3.0,
            wall_thickness: 2.0,
        };
        // 6 × 3.786 mm ≈ 22.7 mm > 20 mm bore
        let err = composer()
            .compose_stage(&profile, 4.0, 5.0, "narrow")
            .expect_err("cup exceeds bore");
        assert!(err.is_infeasible());
    }

    #[test]
    fn deep_interface_swallowing_the_body_is_infeasible() {
        let family = DeviceFamily {
            clearance_margin_mm: 0.5,
            ..DeviceFamily::default()
        };
        let profile = CassetteProfile {
            interface_height: 12.0,
            ..STANDARD_37MM
        };
        let err = AssemblyComposer::new(TraceKernel)
            .with_family(family)
            .compose_stage(&profile, 4.0, 2.5, "shallow")
            .expect_err("body shorter than the socket");
        assert!(err.is_infeasible());
    }

    #[test]
    fn invalid_physics_input_is_reported_before_geometry() {
        let err = composer()
            .compose_stage(&STANDARD_37MM, 0.0, 5.0, "s")
            .expect_err("zero flow");
        assert!(err.is_invalid_input());
    }

    #[test]
    fn invalid_profile_is_infeasible() {
        let profile = CassetteProfile {
            inner_flow_diameter: 40.0,
            ..STANDARD_37MM
        };
        assert!(
            composer()
                .compose_stage(&profile, 4.0, 5.0, "s")
                .expect_err("bad profile")
                .is_infeasible()
        );
    }

    #[test]
    fn kernel_rejection_names_the_part() {
        let family = DeviceFamily {
            cup_wall_thickness_mm: 50.0,
            ..DeviceFamily::default()
        };
        let err = AssemblyComposer::new(TraceKernel)
            .with_family(family)
            .compose_stage(&STANDARD_37MM, 4.0, 5.0, "s")
            .expect_err("negative cup bore");
        match err {
            super::ImpactorError::KernelFailure { part, .. } => assert_eq!(part, "cup"),
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn miniature_profile_composes_small_cutpoint() {
        let stage = composer()
            .compose_stage(&MINIATURE_25MM, 0.8, 4.0, "mini")
            .expect("1.9 mm nozzle fits the 25 mm cassette");
        assert!(stage.metadata().cup_radius_mm < MINIATURE_25MM.flow_bore_radius());
        assert!(stage.check_stack().is_ok());
    }

    #[test]
    fn report_lists_every_part_volume() {
        let c = composer();
        let stage = c.compose_stage(&STANDARD_37MM, 4.0, 5.0, "s").expect("stage");
        let report = c.report(&stage).expect("report");
        assert_eq!(report.part_volumes_mm3.len(), 2);
        assert!(report.part_volumes_mm3.values().all(|v| *v > 0.0));
        assert_eq!(report.profile, STANDARD_37MM);
    }
}
