//! Stokes-number inversion for round-jet impactors.
//!
//! The cut-point relation `Stk50 = 4·ρp·d50²·C·Q / (9·π·μ·N·W³)` is solved
//! for the nozzle diameter `W`; every other dimension of a stage is a fixed
//! multiple of `W`.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{ImpactorError, ImpactorResult};

/// Advisory Reynolds window for a well-behaved round jet.
pub const REYNOLDS_ADVISORY_RANGE: (f64, f64) = (500.0, 3000.0);

/// Particle sizes (µm) tabulated by [`PhysicsSolver::efficiency_curve`] by default.
pub const DEFAULT_CURVE_SIZES_UM: [f64; 11] =
    [1.0, 2.0, 3.0, 4.0, 4.5, 5.0, 5.5, 6.0, 7.0, 8.0, 10.0];

/// Sharpness exponent of the Hill-type collection efficiency curve.
const EFFICIENCY_SHARPNESS: f64 = 2.0;

/// Material and gas properties used by the solver (SI units).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicalConstants {
    pub particle_density_kgm3: f64,
    pub air_viscosity_pas: f64,
    pub air_density_kgm3: f64,
    /// Cunningham slip correction. Held at 1.0, which is only valid above ~1 µm.
    pub cunningham_correction: f64,
}

impl Default for PhysicalConstants {
    fn default() -> Self {
        Self {
            particle_density_kgm3: 1000.0,
            air_viscosity_pas: 1.81e-5,
            air_density_kgm3: 1.2,
            cunningham_correction: 1.0,
        }
    }
}

/// Per-request nozzle parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SolveParams {
    pub nozzle_count: u32,
    pub stk50: f64,
    pub s_w_ratio: f64,
    pub t_w_ratio: f64,
}

impl Default for SolveParams {
    fn default() -> Self {
        Self {
            nozzle_count: 1,
            stk50: 0.24,
            s_w_ratio: 1.5,
            t_w_ratio: 1.0,
        }
    }
}

impl SolveParams {
    pub fn validate(&self) -> ImpactorResult<()> {
        if self.nozzle_count == 0 {
            return Err(ImpactorError::invalid_input("nozzle_count must be at least 1"));
        }
        require_positive("stk50", self.stk50)?;
        require_positive("s_w_ratio", self.s_w_ratio)?;
        require_positive("t_w_ratio", self.t_w_ratio)?;
        Ok(())
    }
}

/// Where the jet Reynolds number falls relative to [`REYNOLDS_ADVISORY_RANGE`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReynoldsRegime {
    BelowRange,
    InRange,
    AboveRange,
}

impl ReynoldsRegime {
    pub fn classify(reynolds: f64) -> Self {
        let (low, high) = REYNOLDS_ADVISORY_RANGE;
        if reynolds < low {
            ReynoldsRegime::BelowRange
        } else if reynolds > high {
            ReynoldsRegime::AboveRange
        } else {
            ReynoldsRegime::InRange
        }
    }
}

/// Dimensions and validation metrics derived for one stage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhysicsConstraintSet {
    pub nozzle_diameter_mm: f64,
    pub jet_velocity_ms: f64,
    pub reynolds_number: f64,
    pub reynolds_regime: ReynoldsRegime,
    pub jet_to_plate_mm: f64,
    pub throat_length_mm: f64,
}

/// One row of a collection efficiency table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EfficiencyPoint {
    pub particle_um: f64,
    pub stokes_number: f64,
    pub efficiency: f64,
}

/// Stateless apart from its physical constants; every call is a pure function.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PhysicsSolver {
    constants: PhysicalConstants,
}

impl PhysicsSolver {
    pub fn new(constants: PhysicalConstants) -> ImpactorResult<Self> {
        require_positive("particle_density_kgm3", constants.particle_density_kgm3)?;
        require_positive("air_viscosity_pas", constants.air_viscosity_pas)?;
        require_positive("air_density_kgm3", constants.air_density_kgm3)?;
        require_positive("cunningham_correction", constants.cunningham_correction)?;
        Ok(Self { constants })
    }

    pub fn constants(&self) -> &PhysicalConstants {
        &self.constants
    }

    /// Inverts the cut-point relation and derives the secondary ratios.
    pub fn solve(
        &self,
        flow_rate_lpm: f64,
        target_cutpoint_um: f64,
        params: &SolveParams,
    ) -> ImpactorResult<PhysicsConstraintSet> {
        require_positive("flow_rate_lpm", flow_rate_lpm)?;
        require_positive("target_cutpoint_um", target_cutpoint_um)?;
        params.validate()?;

        let q = lpm_to_m3s(flow_rate_lpm);
        let d50 = target_cutpoint_um * 1e-6;
        let c = &self.constants;
        let n = f64::from(params.nozzle_count);

        let numerator = 4.0 * c.particle_density_kgm3 * d50 * d50 * c.cunningham_correction * q;
        let denominator = 9.0 * PI * c.air_viscosity_pas * params.stk50 * n;
        let w = real_cbrt(numerator / denominator)?;

        let velocity = jet_velocity(q, params.nozzle_count, w);
        let reynolds = c.air_density_kgm3 * velocity * w / c.air_viscosity_pas;
        let regime = ReynoldsRegime::classify(reynolds);
        if regime != ReynoldsRegime::InRange {
            warn!(
                reynolds,
                ?regime,
                flow_rate_lpm,
                target_cutpoint_um,
                "jet Reynolds number outside advisory range"
            );
        }

        let nozzle_diameter_mm = w * 1000.0;
        let constraints = PhysicsConstraintSet {
            nozzle_diameter_mm,
            jet_velocity_ms: velocity,
            reynolds_number: reynolds,
            reynolds_regime: regime,
            jet_to_plate_mm: nozzle_diameter_mm * params.s_w_ratio,
            throat_length_mm: nozzle_diameter_mm * params.t_w_ratio,
        };
        debug!(
            nozzle_diameter_mm,
            jet_velocity_ms = velocity,
            reynolds,
            jet_to_plate_mm = constraints.jet_to_plate_mm,
            throat_length_mm = constraints.throat_length_mm,
            "solved nozzle geometry"
        );
        Ok(constraints)
    }

    /// Stokes number of a particle passing through an existing nozzle set.
    pub fn stokes_number(
        &self,
        flow_rate_lpm: f64,
        nozzle_diameter_mm: f64,
        nozzle_count: u32,
        particle_um: f64,
    ) -> ImpactorResult<f64> {
        require_positive("flow_rate_lpm", flow_rate_lpm)?;
        require_positive("nozzle_diameter_mm", nozzle_diameter_mm)?;
        require_positive("particle_um", particle_um)?;
        if nozzle_count == 0 {
            return Err(ImpactorError::invalid_input("nozzle_count must be at least 1"));
        }

        let c = &self.constants;
        let w = nozzle_diameter_mm * 1e-3;
        let dp = particle_um * 1e-6;
        let velocity = jet_velocity(lpm_to_m3s(flow_rate_lpm), nozzle_count, w);
        Ok(c.particle_density_kgm3 * dp * dp * c.cunningham_correction * velocity
            / (9.0 * c.air_viscosity_pas * w))
    }

    /// Tabulates Stokes number and collection efficiency for each particle size.
    pub fn efficiency_curve(
        &self,
        flow_rate_lpm: f64,
        constraints: &PhysicsConstraintSet,
        params: &SolveParams,
        sizes_um: &[f64],
    ) -> ImpactorResult<Vec<EfficiencyPoint>> {
        sizes_um
            .iter()
            .map(|&particle_um| {
                let stk = self.stokes_number(
                    flow_rate_lpm,
                    constraints.nozzle_diameter_mm,
                    params.nozzle_count,
                    particle_um,
                )?;
                Ok(EfficiencyPoint {
                    particle_um,
                    stokes_number: stk,
                    efficiency: collection_efficiency(stk, params.stk50),
                })
            })
            .collect()
    }
}

/// Hill-type collection efficiency `1 / (1 + (stk50/stk)^2)`.
pub fn collection_efficiency(stk: f64, stk50: f64) -> f64 {
    if stk <= 0.0 {
        return 0.0;
    }
    1.0 / (1.0 + (stk50 / stk).powf(EFFICIENCY_SHARPNESS))
}

#[inline]
fn lpm_to_m3s(flow_rate_lpm: f64) -> f64 {
    flow_rate_lpm / 1000.0 / 60.0
}

#[inline]
fn jet_velocity(q_m3s: f64, nozzle_count: u32, diameter_m: f64) -> f64 {
    let radius = diameter_m * 0.5;
    q_m3s / (f64::from(nozzle_count) * PI * radius * radius)
}

/// Real cube root of a non-negative operand.
fn real_cbrt(operand: f64) -> ImpactorResult<f64> {
    if !operand.is_finite() || operand < 0.0 {
        return Err(ImpactorError::invalid_input(format!(
            "cube-root operand must be finite and non-negative, got {operand}"
        )));
    }
    Ok(operand.cbrt())
}

fn require_positive(name: &str, value: f64) -> ImpactorResult<f64> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(ImpactorError::invalid_input(format!(
            "{name} must be positive, got {value}"
        )))
    }
}
