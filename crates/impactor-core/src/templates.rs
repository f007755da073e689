//! Parametric part generators.
//!
//! Each function maps an already-derived set of dimensions to a kernel solid.
//! None of them knows about aerodynamics, and none of them judges whether the
//! dimensions make a sensible device; that is the composer's job.

use crate::error::KernelError;
use crate::kernel::GeometryKernel;
use crate::profile::CassetteProfile;

/// How far a through-cut extends past the faces it passes through, so that
/// cut and target never share a coplanar face.
pub const THROUGH_CUT_OVERSHOOT_MM: f64 = 1.0;

/// Overlap of each strut end into the part it joins.
pub const STRUT_OVERLAP_MM: f64 = 2.0;

/// Radius of the bore circle on multi-nozzle plates, in nozzle diameters.
pub const NOZZLE_PITCH_FACTOR: f64 = 1.5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyDimensions {
    pub outer_diameter: f64,
    pub flow_diameter: f64,
    pub height: f64,
    pub boss_diameter: f64,
    pub boss_height: f64,
    pub socket_diameter: f64,
    pub socket_depth: f64,
}

impl BodyDimensions {
    /// Section of `height` that mates with its neighbours through the
    /// profile's boss and socket, bored to `flow_diameter`.
    pub fn stacked(profile: &CassetteProfile, flow_diameter: f64, height: f64) -> Self {
        Self {
            outer_diameter: profile.outer_diameter,
            flow_diameter,
            height,
            boss_diameter: profile.male_boss_diameter,
            boss_height: profile.interface_height,
            socket_diameter: profile.female_socket_diameter,
            socket_depth: profile.interface_height,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CupDimensions {
    pub radius: f64,
    pub rim_height: f64,
    pub floor_thickness: f64,
    pub wall_thickness: f64,
}

impl CupDimensions {
    /// Cup with the stock 2 mm floor and 1 mm wall.
    pub fn new(radius: f64, rim_height: f64) -> Self {
        Self {
            radius,
            rim_height,
            floor_thickness: 2.0,
            wall_thickness: 1.0,
        }
    }

    pub fn total_height(&self) -> f64 {
        self.floor_thickness + self.rim_height
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrutLayout {
    pub inner_radius: f64,
    pub outer_radius: f64,
    pub z_pos: f64,
    pub count: u32,
    pub width: f64,
    pub thickness: f64,
}

impl StrutLayout {
    /// Three 2 mm square struts.
    pub fn new(inner_radius: f64, outer_radius: f64, z_pos: f64) -> Self {
        Self {
            inner_radius,
            outer_radius,
            z_pos,
            count: 3,
            width: 2.0,
            thickness: 2.0,
        }
    }

    /// Bar length including the overlap at both ends.
    pub fn bar_length(&self) -> f64 {
        self.outer_radius - self.inner_radius + 2.0 * STRUT_OVERLAP_MM
    }

    /// Angular position of strut `index`, first strut at 0°.
    pub fn angle_deg(&self, index: u32) -> f64 {
        360.0 * f64::from(index) / f64::from(self.count)
    }
}

/// Centres of `count` bores: one on the axis, or evenly spaced on a circle of
/// radius `1.5 × nozzle_diameter` starting at angle 0.
pub fn nozzle_positions(nozzle_diameter: f64, count: u32) -> Vec<[f64; 2]> {
    if count <= 1 {
        return vec![[0.0, 0.0]; count as usize];
    }
    let pitch = nozzle_diameter * NOZZLE_PITCH_FACTOR;
    (0..count)
        .map(|index| {
            let angle = std::f64::consts::TAU * f64::from(index) / f64::from(count);
            [pitch * angle.cos(), pitch * angle.sin()]
        })
        .collect()
}

/// Disc of `diameter` × `thickness` pierced by `nozzle_count` bores.
pub fn nozzle_plate<K: GeometryKernel>(
    kernel: &K,
    diameter: f64,
    thickness: f64,
    nozzle_diameter: f64,
    nozzle_count: u32,
) -> Result<K::Solid, KernelError> {
    if nozzle_count == 0 {
        return Err(KernelError::InvalidDimension {
            what: "nozzle count",
            value: 0.0,
        });
    }

    let mut plate = kernel.cylinder(diameter, thickness)?;
    for center in nozzle_positions(nozzle_diameter, nozzle_count) {
        plate = kernel.bore(
            plate,
            nozzle_diameter,
            center,
            -THROUGH_CUT_OVERSHOOT_MM,
            thickness + 2.0 * THROUGH_CUT_OVERSHOOT_MM,
        )?;
    }
    Ok(plate)
}

/// Cylindrical housing with a central flow bore, an optional male boss below
/// Z = 0 and an optional female socket recessed from the top face.
pub fn impaction_body<K: GeometryKernel>(
    kernel: &K,
    dims: &BodyDimensions,
) -> Result<K::Solid, KernelError> {
    bored_section(kernel, dims)
}

/// Housing for a foam pre-fractionator. `dims.flow_diameter` is the foam
/// chamber, which runs through the section and its boss.
pub fn foam_chamber<K: GeometryKernel>(
    kernel: &K,
    dims: &BodyDimensions,
) -> Result<K::Solid, KernelError> {
    require_interfaces_clear("foam chamber diameter", dims)?;
    bored_section(kernel, dims)
}

/// Base section carrying a 25 mm filter in its socket. `dims.flow_diameter`
/// is the outlet bore; the boss doubles as the hose interface.
pub fn filter_support<K: GeometryKernel>(
    kernel: &K,
    dims: &BodyDimensions,
) -> Result<K::Solid, KernelError> {
    require_interfaces_clear("filter outlet bore", dims)?;
    bored_section(kernel, dims)
}

/// The bore must leave material in the boss ring and the socket must leave a
/// floor under it.
fn require_interfaces_clear(
    what: &'static str,
    dims: &BodyDimensions,
) -> Result<(), KernelError> {
    if dims.boss_height > 0.0 && dims.flow_diameter >= dims.boss_diameter {
        return Err(KernelError::InvalidDimension {
            what,
            value: dims.flow_diameter,
        });
    }
    if dims.socket_depth >= dims.height {
        return Err(KernelError::InvalidDimension {
            what: "socket depth",
            value: dims.socket_depth,
        });
    }
    Ok(())
}

fn bored_section<K: GeometryKernel>(
    kernel: &K,
    dims: &BodyDimensions,
) -> Result<K::Solid, KernelError> {
    let mut body = kernel.cylinder(dims.outer_diameter, dims.height)?;

    let mut bore_bottom = 0.0;
    if dims.boss_height > 0.0 {
        let boss = kernel.cylinder(dims.boss_diameter, dims.boss_height)?;
        let boss = kernel.translate(boss, [0.0, 0.0, -dims.boss_height])?;
        body = kernel.union(body, boss)?;
        bore_bottom = -dims.boss_height;
    }

    if dims.socket_depth > 0.0 {
        body = kernel.bore(
            body,
            dims.socket_diameter,
            [0.0, 0.0],
            dims.height - dims.socket_depth,
            dims.socket_depth + THROUGH_CUT_OVERSHOOT_MM,
        )?;
    }

    kernel.bore(
        body,
        dims.flow_diameter,
        [0.0, 0.0],
        bore_bottom - THROUGH_CUT_OVERSHOOT_MM,
        dims.height - bore_bottom + 2.0 * THROUGH_CUT_OVERSHOOT_MM,
    )
}

/// Solid floor disc topped by an annular rim of `wall_thickness`.
pub fn impaction_cup<K: GeometryKernel>(
    kernel: &K,
    dims: &CupDimensions,
) -> Result<K::Solid, KernelError> {
    let diameter = 2.0 * dims.radius;
    let floor = kernel.cylinder(diameter, dims.floor_thickness)?;

    let rim = kernel.cylinder(diameter, dims.rim_height)?;
    let rim = kernel.bore(
        rim,
        2.0 * (dims.radius - dims.wall_thickness),
        [0.0, 0.0],
        -THROUGH_CUT_OVERSHOOT_MM,
        dims.rim_height + 2.0 * THROUGH_CUT_OVERSHOOT_MM,
    )?;
    let rim = kernel.translate(rim, [0.0, 0.0, dims.floor_thickness])?;

    kernel.union(floor, rim)
}

/// Unions `layout.count` radial bars into `part`.
pub fn add_struts<K: GeometryKernel>(
    kernel: &K,
    part: K::Solid,
    layout: &StrutLayout,
) -> Result<K::Solid, KernelError> {
    let length = layout.bar_length();
    let mid_radius = 0.5 * (layout.inner_radius + layout.outer_radius);

    let mut assembled = part;
    for index in 0..layout.count {
        let bar = kernel.cuboid(length, layout.width, layout.thickness)?;
        let bar = kernel.translate(bar, [mid_radius, 0.0, 0.0])?;
        let bar = kernel.rotate_z(bar, layout.angle_deg(index))?;
        let bar = kernel.translate(bar, [0.0, 0.0, layout.z_pos])?;
        assembled = kernel.union(assembled, bar)?;
    }
    Ok(assembled)
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::{
        BodyDimensions, CupDimensions, StrutLayout, add_struts, filter_support, foam_chamber,
        impaction_body, impaction_cup, nozzle_plate, nozzle_positions,
    };
    use crate::error::KernelError;
    use crate::kernel::GeometryKernel;
    use crate::kernel::trace::{Op, TraceKernel};
    use crate::profile::STANDARD_37MM;

    fn body_dims() -> BodyDimensions {
        BodyDimensions {
            outer_diameter: 42.0,
            flow_diameter: 34.0,
            height: 15.7,
            boss_diameter: 37.4,
            boss_height: 5.0,
            socket_diameter: 37.2,
            socket_depth: 5.0,
        }
    }

    #[test]
    fn single_nozzle_is_centred() {
        assert_eq!(nozzle_positions(3.0, 1), vec![[0.0, 0.0]]);
    }

    #[test]
    fn multi_nozzle_bores_sit_on_pitch_circle_starting_at_zero() {
        let positions = nozzle_positions(2.0, 4);
        assert_eq!(positions.len(), 4);
        assert_relative_eq!(positions[0][0], 3.0, epsilon = 1e-12);
        assert_relative_eq!(positions[0][1], 0.0, epsilon = 1e-12);
        assert_relative_eq!(positions[1][0], 0.0, epsilon = 1e-12);
        assert_relative_eq!(positions[1][1], 3.0, epsilon = 1e-12);
        for p in &positions {
            assert_relative_eq!((p[0] * p[0] + p[1] * p[1]).sqrt(), 3.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn nozzle_plate_bores_every_nozzle_through_the_disc() {
        let plate = nozzle_plate(&TraceKernel, 37.2, 3.8, 3.8, 3).expect("plate");
        assert_eq!(plate.count(|op| *op == Op::Subtract), 3);
        let cylinders = plate.cylinders();
        assert_eq!(cylinders[0], (37.2, 3.8));
        for (diameter, depth) in &cylinders[1..] {
            assert_eq!(*diameter, 3.8);
            assert!(*depth > 3.8, "bore must pass through the plate");
        }
    }

    #[test]
    fn nozzle_plate_without_nozzles_is_rejected() {
        assert!(nozzle_plate(&TraceKernel, 37.2, 3.8, 3.8, 0).is_err());
    }

    #[test]
    fn body_has_boss_socket_and_flow_bore() {
        let body = impaction_body(&TraceKernel, &body_dims()).expect("body");
        let diameters: Vec<f64> = body.cylinders().iter().map(|(d, _)| *d).collect();
        assert_eq!(diameters, vec![42.0, 37.4, 37.2, 34.0]);
        assert_eq!(body.count(|op| *op == Op::Union), 1);
        assert_eq!(body.count(|op| *op == Op::Subtract), 2);
        let offsets = body.translations();
        assert_eq!(offsets[0], [0.0, 0.0, -5.0]);
        assert_relative_eq!(offsets[1][2], 15.7 - 5.0, epsilon = 1e-12);
        assert_relative_eq!(offsets[2][2], -5.0 - 1.0, epsilon = 1e-12);
    }

    #[test]
    fn body_without_interfaces_is_a_bored_cylinder() {
        let dims = BodyDimensions {
            boss_height: 0.0,
            socket_depth: 0.0,
            ..body_dims()
        };
        let body = impaction_body(&TraceKernel, &dims).expect("body");
        let diameters: Vec<f64> = body.cylinders().iter().map(|(d, _)| *d).collect();
        assert_eq!(diameters, vec![42.0, 34.0]);
    }

    #[test]
    fn cup_rim_sits_on_floor() {
        let cup = impaction_cup(&TraceKernel, &CupDimensions::new(11.0, 3.0)).expect("cup");
        let cylinders = cup.cylinders();
        assert_eq!(cylinders[0], (22.0, 2.0));
        assert_eq!(cylinders[1], (22.0, 3.0));
        assert_eq!(cylinders[2].0, 20.0);
        assert_eq!(cup.root(), Some(&Op::Union));
        assert!(cup.translations().contains(&[0.0, 0.0, 2.0]));
    }

    #[test]
    fn cup_wall_thicker_than_radius_fails_in_kernel() {
        let dims = CupDimensions {
            wall_thickness: 5.0,
            ..CupDimensions::new(4.0, 3.0)
        };
        assert!(impaction_cup(&TraceKernel, &dims).is_err());
    }

    #[test]
    fn struts_are_evenly_spaced_from_zero_degrees() {
        let base = TraceKernel.cylinder(10.0, 1.0).expect("base");
        let layout = StrutLayout::new(11.0, 17.0, 4.0);
        let part = add_struts(&TraceKernel, base, &layout).expect("struts");
        assert_eq!(part.rotations(), vec![0.0, 120.0, 240.0]);
        assert_eq!(part.count(|op| matches!(op, Op::Cuboid { .. })), 3);
        assert!(part.0.contains(&Op::Cuboid {
            size: [17.0 - 11.0 + 4.0, 2.0, 2.0]
        }));
        assert!(part.translations().contains(&[14.0, 0.0, 0.0]));
        assert!(part.translations().contains(&[0.0, 0.0, 4.0]));
    }

    #[test]
    fn four_struts_are_a_right_angle_apart() {
        let layout = StrutLayout {
            count: 4,
            ..StrutLayout::new(5.0, 9.0, 0.0)
        };
        let angles: Vec<f64> = (0..4).map(|i| layout.angle_deg(i)).collect();
        assert_eq!(angles, vec![0.0, 90.0, 180.0, 270.0]);
    }

    #[test]
    fn stacked_section_takes_interfaces_from_profile() {
        let dims = BodyDimensions::stacked(&STANDARD_37MM, 20.0, 30.0);
        assert_eq!(dims.outer_diameter, STANDARD_37MM.outer_diameter);
        assert_eq!(dims.boss_diameter, STANDARD_37MM.male_boss_diameter);
        assert_eq!(dims.socket_diameter, STANDARD_37MM.female_socket_diameter);
        assert_eq!(dims.boss_height, STANDARD_37MM.interface_height);
        assert_eq!(dims.socket_depth, STANDARD_37MM.interface_height);
        assert_eq!((dims.flow_diameter, dims.height), (20.0, 30.0));
    }

    #[test]
    fn foam_chamber_bores_chamber_through_boss() {
        let dims = BodyDimensions::stacked(&STANDARD_37MM, 30.0, 40.0);
        let chamber = foam_chamber(&TraceKernel, &dims).expect("chamber");
        let cylinders = chamber.cylinders();
        assert_eq!(cylinders.len(), 4);
        let (chamber_diameter, chamber_depth) = cylinders[3];
        assert_eq!(chamber_diameter, 30.0);
        assert_relative_eq!(
            chamber_depth,
            40.0 + STANDARD_37MM.interface_height + 2.0,
            epsilon = 1e-12
        );
        assert!(
            chamber
                .translations()
                .contains(&[0.0, 0.0, -STANDARD_37MM.interface_height - 1.0])
        );
    }

    #[test]
    fn foam_chamber_wider_than_boss_is_rejected() {
        let dims = BodyDimensions::stacked(&STANDARD_37MM, 38.0, 40.0);
        assert!(matches!(
            foam_chamber(&TraceKernel, &dims),
            Err(KernelError::InvalidDimension {
                what: "foam chamber diameter",
                ..
            })
        ));
    }

    #[test]
    fn filter_support_has_socket_and_outlet() {
        let dims = BodyDimensions::stacked(&STANDARD_37MM, 6.0, 12.0);
        let support = filter_support(&TraceKernel, &dims).expect("support");
        let diameters: Vec<f64> = support.cylinders().iter().map(|(d, _)| *d).collect();
        assert_eq!(
            diameters,
            vec![
                STANDARD_37MM.outer_diameter,
                STANDARD_37MM.male_boss_diameter,
                STANDARD_37MM.female_socket_diameter,
                6.0
            ]
        );
        assert_eq!(support.count(|op| *op == Op::Subtract), 2);
    }

    #[test]
    fn filter_support_socket_deeper_than_base_is_rejected() {
        let dims = BodyDimensions::stacked(&STANDARD_37MM, 6.0, 4.0);
        assert!(matches!(
            filter_support(&TraceKernel, &dims),
            Err(KernelError::InvalidDimension {
                what: "socket depth",
                ..
            })
        ));
    }

    #[test]
    fn filter_support_without_boss_accepts_any_bore() {
        let dims = BodyDimensions {
            boss_height: 0.0,
            ..BodyDimensions::stacked(&STANDARD_37MM, 36.0, 12.0)
        };
        assert!(filter_support(&TraceKernel, &dims).is_ok());
    }
}
