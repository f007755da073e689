use serde::{Deserialize, Serialize};

use crate::error::{ImpactorError, ImpactorResult};

/// Mechanical interface of a standard sampling cassette family.
///
/// All dimensions are millimeters. Profiles are plain data, shared by
/// reference between every stage composed against them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CassetteProfile {
    pub outer_diameter: f64,
    pub inner_flow_diameter: f64,
    pub male_boss_diameter: f64,
    pub female_socket_diameter: f64,
    pub interface_height: f64,
    pub wall_thickness: f64,
}

/// 37 mm cassette.
pub const STANDARD_37MM: CassetteProfile = CassetteProfile {
    outer_diameter: 42.0,
    inner_flow_diameter: 34.0,
    male_boss_diameter: 37.4,
    female_socket_diameter: 37.2,
    interface_height: 5.0,
    wall_thickness: 2.0,
};

/// 25 mm cassette, 0.2 mm socket clearance.
pub const MINIATURE_25MM: CassetteProfile = CassetteProfile {
    outer_diameter: 26.0,
    inner_flow_diameter: 22.0,
    male_boss_diameter: 24.0,
    female_socket_diameter: 24.2,
    interface_height: 3.0,
    wall_thickness: 2.0,
};

const CATALOGUE: [(&str, CassetteProfile); 2] =
    [("standard", STANDARD_37MM), ("miniature", MINIATURE_25MM)];

impl Default for CassetteProfile {
    fn default() -> Self {
        STANDARD_37MM
    }
}

impl CassetteProfile {
    /// Looks up a named profile from the built-in catalogue.
    pub fn by_name(name: &str) -> Option<CassetteProfile> {
        CATALOGUE
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, profile)| *profile)
    }

    /// Names and values of the built-in catalogue, in declaration order.
    pub fn catalogue() -> &'static [(&'static str, CassetteProfile)] {
        &CATALOGUE
    }

    pub fn flow_bore_radius(&self) -> f64 {
        self.inner_flow_diameter * 0.5
    }

    /// Checks that every dimension is positive and that the flow bore sits
    /// inside both the boss and the socket, which sit inside the housing.
    pub fn validate(&self) -> ImpactorResult<()> {
        let fields = [
            ("outer_diameter", self.outer_diameter),
            ("inner_flow_diameter", self.inner_flow_diameter),
            ("male_boss_diameter", self.male_boss_diameter),
            ("female_socket_diameter", self.female_socket_diameter),
            ("interface_height", self.interface_height),
            ("wall_thickness", self.wall_thickness),
        ];
        for (name, value) in fields {
            if !(value.is_finite() && value > 0.0) {
                return Err(ImpactorError::infeasible(format!(
                    "profile {name} must be positive, got {value}"
                )));
            }
        }

        let nested = |inner: f64, middle: f64, what: &str| -> ImpactorResult<()> {
            if inner < middle && middle < self.outer_diameter {
                Ok(())
            } else {
                Err(ImpactorError::infeasible(format!(
                    "profile requires inner_flow_diameter ({inner}) < {what} ({middle}) < outer_diameter ({})",
                    self.outer_diameter
                )))
            }
        };
        nested(
            self.inner_flow_diameter,
            self.male_boss_diameter,
            "male_boss_diameter",
        )?;
        nested(
            self.inner_flow_diameter,
            self.female_socket_diameter,
            "female_socket_diameter",
        )
    }
}
