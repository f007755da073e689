//! Composes real stages with the SDF kernel and samples points of the resulting solids.

use std::f64::consts::PI;

use approx::assert_relative_eq;
use impactor_core::{
    AssemblyComposer, CassetteProfile, MultiStageComposer, PART_BODY, PART_NOZZLE_PLATE,
    STANDARD_37MM,
};
use impactor_sdf::{SdfKernel, SdfSolid};

fn stage_parts() -> (SdfSolid, SdfSolid, impactor_core::StageMetadata) {
    let composer = AssemblyComposer::new(SdfKernel::new());
    let stage = composer
        .compose_stage(&STANDARD_37MM, 4.0, 5.0, "stage_1_5.0um")
        .expect("5 µm stage fits the 37 mm cassette");
    let plate = stage.part(PART_NOZZLE_PLATE).expect("plate").clone();
    let body = stage.part(PART_BODY).expect("body").clone();
    (plate, body, stage.metadata().clone())
}

#[test]
fn nozzle_plate_has_open_bore_at_the_exit_height() {
    let (plate, _, m) = stage_parts();
    let t = m.constraints.throat_length_mm;
    let mid = m.nozzle_exit_z_mm + t * 0.5;

    assert!(!plate.contains([0.0, 0.0, mid]), "nozzle bore must be open");
    assert!(plate.contains([10.0, 0.0, mid]));
    assert!(plate.contains([18.4, 0.0, mid]));
    assert!(!plate.contains([18.8, 0.0, mid]), "plate must fit the socket");
    assert!(!plate.contains([10.0, 0.0, m.nozzle_exit_z_mm - 0.2]));
}

#[test]
fn body_has_boss_below_and_socket_above() {
    let (_, body, m) = stage_parts();
    let h = m.body_height_mm;

    assert!(body.contains([19.5, 0.0, h * 0.5]), "housing wall");
    assert!(body.contains([18.0, 0.0, -2.5]), "boss");
    assert!(!body.contains([20.0, 0.0, -2.5]), "boss is narrower than the housing");
    assert!(!body.contains([18.0, 0.0, h - 1.0]), "socket is open");
    assert!(body.contains([20.0, 0.0, h - 1.0]), "socket wall");
    assert!(!body.contains([0.0, 0.0, -2.5]), "flow bore runs through the boss");
}

#[test]
fn cup_and_struts_hang_in_the_flow_bore() {
    let (_, body, m) = stage_parts();
    let floor = m.cup_floor_z_mm;
    let r = m.cup_radius_mm;

    assert!(body.contains([0.0, 0.0, floor + 1.0]), "cup floor");
    assert!(!body.contains([0.0, 0.0, floor + 3.0]), "cup interior");
    assert!(body.contains([r - 0.5, 0.0, floor + 3.0]), "cup wall");
    assert!(!body.contains([r + 0.5, 0.0, floor + 3.0]), "annular gap");

    let mid = (r + STANDARD_37MM.flow_bore_radius()) * 0.5;
    for angle_deg in [0.0_f64, 120.0, 240.0] {
        let a = angle_deg.to_radians();
        assert!(
            body.contains([mid * a.cos(), mid * a.sin(), floor + 1.0]),
            "strut at {angle_deg}°"
        );
    }
    let gap = 60.0_f64.to_radians();
    assert!(!body.contains([mid * gap.cos(), mid * gap.sin(), floor + 1.0]));
}

#[test]
fn plate_volume_is_disc_minus_nozzle() {
    let kernel = SdfKernel::with_volume_cell(0.1).expect("cell");
    let composer = AssemblyComposer::new(kernel);
    let stage = composer
        .compose_stage(&STANDARD_37MM, 4.0, 5.0, "s")
        .expect("stage");
    let report = composer.report(&stage).expect("report");

    let c = stage.constraints();
    let outer = STANDARD_37MM.female_socket_diameter * 0.5;
    let bore = c.nozzle_diameter_mm * 0.5;
    let expected = PI * (outer * outer - bore * bore) * c.throat_length_mm;
    assert_relative_eq!(
        report.part_volumes_mm3[PART_NOZZLE_PLATE],
        expected,
        max_relative = 0.03
    );
    assert!(report.part_volumes_mm3[PART_BODY] > expected);
}

#[test]
fn parallel_cascade_builds_sdf_stages() {
    let wide = CassetteProfile {
        outer_diameter: 60.0,
        inner_flow_diameter: 48.0,
        male_boss_diameter: 52.0,
        female_socket_diameter: 52.2,
        interface_height: 5.0,
        wall_thickness: 2.0,
    };
    let composer = AssemblyComposer::new(SdfKernel::new());
    let project = MultiStageComposer::new(&composer)
        .compose_cascade_parallel(&wide, 4.0, &[10.0, 5.0, 2.5])
        .expect("wide cassette fits all stages");
    assert_eq!(project.stages.len(), 3);
    for stage in &project.stages {
        let m = stage.metadata();
        let plate = stage.part(PART_NOZZLE_PLATE).expect("plate");
        let mid = m.nozzle_exit_z_mm + m.constraints.throat_length_mm * 0.5;
        assert!(!plate.contains([0.0, 0.0, mid]));
    }
}

#[test]
fn foam_chamber_is_hollow_and_mates_with_the_stack() {
    use impactor_core::templates::{BodyDimensions, foam_chamber};

    let dims = BodyDimensions::stacked(&STANDARD_37MM, 30.0, 40.0);
    let chamber = foam_chamber(&SdfKernel::new(), &dims).expect("chamber");

    assert!(!chamber.contains([0.0, 0.0, 20.0]), "foam cavity");
    assert!(!chamber.contains([14.0, 0.0, -2.5]), "cavity runs through the boss");
    assert!(chamber.contains([17.0, 0.0, -2.5]), "boss ring");
    assert!(!chamber.contains([19.5, 0.0, -2.5]), "nothing outside the boss");
    assert!(chamber.contains([19.5, 0.0, 20.0]), "housing wall");
    assert!(!chamber.contains([18.0, 0.0, 38.0]), "socket");
}
