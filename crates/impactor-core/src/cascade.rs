//! Multi-stage cascades: one independent stage per cut-point.

use rayon::prelude::*;
use tracing::{info, warn};

use crate::composer::{AssemblyComposer, StageAssembly};
use crate::error::{ImpactorError, ImpactorResult};
use crate::kernel::GeometryKernel;
use crate::profile::CassetteProfile;

/// `stage_{n}_{cutpoint}um`, `n` counted from 1.
pub fn stage_name(index: usize, cutpoint_um: f64) -> String {
    format!("stage_{}_{}um", index + 1, format_decimal(cutpoint_um))
}

/// `impactor_{flow}LPM_{cp1}_{cp2}...`, used as the export directory.
pub fn project_name(flow_rate_lpm: f64, cutpoints_um: &[f64]) -> String {
    let cutpoints: Vec<String> = cutpoints_um.iter().map(|cp| format_decimal(*cp)).collect();
    format!(
        "impactor_{}LPM_{}",
        format_decimal(flow_rate_lpm),
        cutpoints.join("_")
    )
}

/// Whole numbers keep one decimal so `10` reads as `10.0`.
fn format_decimal(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}

/// Ordered stages sharing one flow rate and cassette profile.
#[derive(Debug, Clone)]
pub struct CascadeProject<'p, S> {
    pub flow_rate_lpm: f64,
    pub cutpoints_um: Vec<f64>,
    pub profile: &'p CassetteProfile,
    pub stages: Vec<StageAssembly<'p, S>>,
}

impl<S> CascadeProject<'_, S> {
    pub fn name(&self) -> String {
        project_name(self.flow_rate_lpm, &self.cutpoints_um)
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

/// Outcome of one stage when the cascade is composed without fail-fast.
pub type StageOutcome<'p, S> = (String, ImpactorResult<StageAssembly<'p, S>>);

/// Builds one stage per cut-point with a shared [`AssemblyComposer`].
///
/// Stages are independent: none is modified by another and nothing is
/// removed from neighbouring stages.
pub struct MultiStageComposer<'c, K> {
    composer: &'c AssemblyComposer<K>,
}

impl<'c, K: GeometryKernel> MultiStageComposer<'c, K> {
    pub fn new(composer: &'c AssemblyComposer<K>) -> Self {
        Self { composer }
    }

    /// Composes every stage in order, stopping at the first failure.
    pub fn compose_cascade<'p>(
        &self,
        profile: &'p CassetteProfile,
        flow_rate_lpm: f64,
        cutpoints_um: &[f64],
    ) -> ImpactorResult<CascadeProject<'p, K::Solid>> {
        require_cutpoints(cutpoints_um)?;
        warn_if_unordered(cutpoints_um);

        let mut stages = Vec::with_capacity(cutpoints_um.len());
        for (index, &cutpoint) in cutpoints_um.iter().enumerate() {
            let name = stage_name(index, cutpoint);
            let stage = self
                .composer
                .compose_stage(profile, flow_rate_lpm, cutpoint, &name)
                .map_err(|source| ImpactorError::stage(name, source))?;
            stages.push(stage);
        }

        info!(
            stages = stages.len(),
            flow_rate_lpm,
            "composed cascade {}",
            project_name(flow_rate_lpm, cutpoints_um)
        );
        Ok(CascadeProject {
            flow_rate_lpm,
            cutpoints_um: cutpoints_um.to_vec(),
            profile,
            stages,
        })
    }

    /// Composes every stage and reports each outcome, failed ones included.
    pub fn compose_cascade_each<'p>(
        &self,
        profile: &'p CassetteProfile,
        flow_rate_lpm: f64,
        cutpoints_um: &[f64],
    ) -> Vec<StageOutcome<'p, K::Solid>> {
        cutpoints_um
            .iter()
            .enumerate()
            .map(|(index, &cutpoint)| {
                let name = stage_name(index, cutpoint);
                let result = self
                    .composer
                    .compose_stage(profile, flow_rate_lpm, cutpoint, &name);
                if let Err(err) = &result {
                    warn!(stage = %name, error = %err, "stage failed");
                }
                (name, result)
            })
            .collect()
    }
}

impl<'c, K> MultiStageComposer<'c, K>
where
    K: GeometryKernel + Sync,
    K::Solid: Send,
{
    /// Fail-fast cascade with stages composed concurrently.
    ///
    /// Output order follows the cut-point order regardless of scheduling.
    pub fn compose_cascade_parallel<'p>(
        &self,
        profile: &'p CassetteProfile,
        flow_rate_lpm: f64,
        cutpoints_um: &[f64],
    ) -> ImpactorResult<CascadeProject<'p, K::Solid>> {
        require_cutpoints(cutpoints_um)?;
        warn_if_unordered(cutpoints_um);

        let stages = cutpoints_um
            .par_iter()
            .enumerate()
            .map(|(index, &cutpoint)| {
                let name = stage_name(index, cutpoint);
                self.composer
                    .compose_stage(profile, flow_rate_lpm, cutpoint, &name)
                    .map_err(|source| ImpactorError::stage(name, source))
            })
            .collect::<ImpactorResult<Vec<_>>>()?;

        info!(
            stages = stages.len(),
            flow_rate_lpm,
            "composed cascade {} in parallel",
            project_name(flow_rate_lpm, cutpoints_um)
        );
        Ok(CascadeProject {
            flow_rate_lpm,
            cutpoints_um: cutpoints_um.to_vec(),
            profile,
            stages,
        })
    }
}

fn require_cutpoints(cutpoints_um: &[f64]) -> ImpactorResult<()> {
    if cutpoints_um.is_empty() {
        return Err(ImpactorError::invalid_input(
            "cascade needs at least one cut-point",
        ));
    }
    Ok(())
}

fn warn_if_unordered(cutpoints_um: &[f64]) {
    if cutpoints_um.windows(2).any(|pair| pair[1] >= pair[0]) {
        warn!(
            ?cutpoints_um,
            "cut-points are not strictly decreasing; stages are built as given"
        );
    }
}
