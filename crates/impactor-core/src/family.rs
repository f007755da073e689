use serde::{Deserialize, Serialize};

use crate::error::{ImpactorError, ImpactorResult};
use crate::physics::SolveParams;

/// Fixed design constants shared by every stage of one device family.
///
/// The defaults reproduce the single-nozzle round-jet impactor: S/W 1.5,
/// T/W 1.0, a 10 mm clearance allowance above the jet-to-plate gap, a cup
/// three nozzle diameters in radius and three 2 mm struts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceFamily {
    pub nozzle_count: u32,
    pub stk50: f64,
    pub s_w_ratio: f64,
    pub t_w_ratio: f64,
    pub clearance_margin_mm: f64,
    pub cup_to_nozzle_ratio: f64,
    pub cup_rim_height_mm: f64,
    pub cup_floor_thickness_mm: f64,
    pub cup_wall_thickness_mm: f64,
    pub strut_count: u32,
    pub strut_width_mm: f64,
    pub strut_thickness_mm: f64,
}

impl Default for DeviceFamily {
    fn default() -> Self {
        Self {
            nozzle_count: 1,
            stk50: 0.24,
            s_w_ratio: 1.5,
            t_w_ratio: 1.0,
            clearance_margin_mm: 10.0,
            cup_to_nozzle_ratio: 3.0,
            cup_rim_height_mm: 3.0,
            cup_floor_thickness_mm: 2.0,
            cup_wall_thickness_mm: 1.0,
            strut_count: 3,
            strut_width_mm: 2.0,
            strut_thickness_mm: 2.0,
        }
    }
}

impl DeviceFamily {
    pub fn solve_params(&self) -> SolveParams {
        SolveParams {
            nozzle_count: self.nozzle_count,
            stk50: self.stk50,
            s_w_ratio: self.s_w_ratio,
            t_w_ratio: self.t_w_ratio,
        }
    }

    pub fn validate(&self) -> ImpactorResult<()> {
        let positive = [
            ("clearance_margin_mm", self.clearance_margin_mm),
            ("cup_to_nozzle_ratio", self.cup_to_nozzle_ratio),
            ("cup_rim_height_mm", self.cup_rim_height_mm),
            ("cup_floor_thickness_mm", self.cup_floor_thickness_mm),
            ("cup_wall_thickness_mm", self.cup_wall_thickness_mm),
            ("strut_width_mm", self.strut_width_mm),
            ("strut_thickness_mm", self.strut_thickness_mm),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(ImpactorError::invalid_input(format!(
                    "device family {name} must be positive, got {value}"
                )));
            }
        }
        if self.strut_count == 0 {
            return Err(ImpactorError::invalid_input(
                "device family needs at least one strut to hold the cup",
            ));
        }
        self.solve_params().validate()
    }
}
