//! A [`SpectrumDeconvoluter`] backed by `mzdeisotope`'s isotopic pattern fitting
use itertools::Itertools;
use mzdeisotope::{
    isotopic_model::{CachingIsotopicModel, IsotopicPatternParams, PROTON},
    scorer::{MSDeconvScorer, MaximizingFitFilter, PenalizedMSDeconvScorer},
    solution::DeconvolvedSolutionPeak,
    DeconvolutionEngine,
};
use mzpeaks::prelude::*;
use mzpeaks::{MassPeakSetType, Tolerance};
use tracing::{debug, trace};

use mzcascade::{
    DeconvolutionError, DeconvolutionParams, GroupPeak, MassBinSet, MassBinWindow, PeakGroup,
    SpectrumDeconvoluter,
};

use crate::args::EngineParams;
use crate::spectrum::{CPeak, CentroidedSpectrum};

pub type Averagine = CachingIsotopicModel<'static>;

type MS1Engine =
    DeconvolutionEngine<'static, CPeak, PenalizedMSDeconvScorer, MaximizingFitFilter>;
type MSnEngine = DeconvolutionEngine<'static, CPeak, MSDeconvScorer, MaximizingFitFilter>;

/// MS1 spectra are scored with a penalized scorer and wider isotopic patterns, deeper
/// levels with the plain scorer and truncated patterns.
enum LevelEngine {
    MS1(MS1Engine),
    MSn(MSnEngine),
}

impl LevelEngine {
    fn build(ms_level: u8, averagine: &Averagine, params: &EngineParams) -> Self {
        let (low, high) = params.charge_range;
        let (min_mz, max_mz) = params.mz_range;
        if ms_level <= 1 {
            let mut engine = DeconvolutionEngine::new(
                IsotopicPatternParams::default(),
                averagine.clone(),
                PenalizedMSDeconvScorer::new(0.02, 2.0),
                MaximizingFitFilter::new(params.ms1_score_threshold),
                true,
            );
            engine.populate_isotopic_model_cache(min_mz, max_mz, low, high);
            Self::MS1(engine)
        } else {
            let mut engine = DeconvolutionEngine::new(
                IsotopicPatternParams::new(0.8, 0.001, None, PROTON),
                averagine.clone(),
                MSDeconvScorer::default(),
                MaximizingFitFilter::new(params.msn_score_threshold),
                true,
            );
            engine.populate_isotopic_model_cache(min_mz, max_mz, low, high);
            Self::MSn(engine)
        }
    }

    fn deconvolute(
        &mut self,
        spectrum: &CentroidedSpectrum,
        params: &EngineParams,
        charge_range: (i32, i32),
    ) -> Result<MassPeakSetType<DeconvolvedSolutionPeak>, mzdeisotope::deconv_traits::DeconvolutionError>
    {
        let tolerance = Tolerance::PPM(params.error_tolerance as f64);
        match self {
            Self::MS1(engine) => engine.deconvolute_peaks(
                spectrum.peaks.clone(),
                tolerance,
                charge_range,
                params.ms1_missed_peaks,
            ),
            Self::MSn(engine) => engine.deconvolute_peaks(
                spectrum.peaks.clone(),
                tolerance,
                charge_range,
                params.msn_missed_peaks,
            ),
        }
    }
}

/// Deconvolves [`CentroidedSpectrum`]s with one lazily built `mzdeisotope` engine per
/// MS level, sharing the run's isotopic model.
pub struct EngineDeconvoluter {
    params: EngineParams,
    engines: Vec<Option<LevelEngine>>,
}

impl EngineDeconvoluter {
    pub fn new(params: EngineParams) -> Self {
        Self {
            params,
            engines: Vec::new(),
        }
    }

    pub fn params(&self) -> &EngineParams {
        &self.params
    }

    fn engine_for(&mut self, ms_level: u8, averagine: &Averagine) -> &mut LevelEngine {
        let i = ms_level as usize;
        if self.engines.len() <= i {
            self.engines.resize_with(i + 1, || None);
        }
        let params = &self.params;
        self.engines[i].get_or_insert_with(|| {
            debug!("Building MS{ms_level} deconvolution engine");
            LevelEngine::build(ms_level, averagine, params)
        })
    }
}

/// Keep the solutions no heavier than `max_mass`, and of those only the `max_count` most
/// intense, in increasing mass order.
pub fn select_solutions(
    solutions: &MassPeakSetType<DeconvolvedSolutionPeak>,
    max_mass: f64,
    max_count: Option<usize>,
) -> Vec<&DeconvolvedSolutionPeak> {
    let mut kept: Vec<&DeconvolvedSolutionPeak> = solutions
        .iter()
        .filter(|p| p.neutral_mass <= max_mass)
        .collect();
    if let Some(max_count) = max_count {
        if kept.len() > max_count {
            kept = kept
                .into_iter()
                .sorted_by(|a, b| b.intensity.total_cmp(&a.intensity))
                .take(max_count)
                .sorted_by(|a, b| a.neutral_mass.total_cmp(&b.neutral_mass))
                .collect();
        }
    }
    kept
}

/// Collapse a solution's isotopic envelope into a [`PeakGroup`] whose member peaks all
/// carry the solution's charge
pub fn peak_group_from_solution(solution: &DeconvolvedSolutionPeak) -> PeakGroup {
    let peaks = solution
        .envelope
        .iter()
        .map(|pt| GroupPeak::new(pt.mz, pt.intensity, solution.charge))
        .collect();
    PeakGroup::new(solution.neutral_mass, solution.score, peaks)
}

impl SpectrumDeconvoluter<CentroidedSpectrum> for EngineDeconvoluter {
    type Averagine = Averagine;

    fn deconvolute_spectrum(
        &mut self,
        spectrum: &CentroidedSpectrum,
        window: &mut MassBinWindow,
        averagine: &Self::Averagine,
        ms_level: u8,
        params: &DeconvolutionParams,
    ) -> Result<Vec<PeakGroup>, DeconvolutionError> {
        let charge_range = (
            params.min_charge,
            params.max_charge().max(params.min_charge),
        );
        let engine_params = self.params;
        let solutions = self
            .engine_for(ms_level, averagine)
            .deconvolute(spectrum, &engine_params, charge_range)
            .map_err(|e| DeconvolutionError::Failed(format!("{}: {e}", spectrum.id)))?;

        let groups: Vec<PeakGroup> =
            select_solutions(&solutions, params.max_mass, params.max_mass_count)
                .into_iter()
                .map(peak_group_from_solution)
                .collect();

        let bin_width = engine_params.log_mass_bin_width();
        let supported = groups
            .iter()
            .filter(|g| window.support_for(g.monoisotopic_mass.ln(), bin_width) > 0)
            .count();
        trace!(
            "{} yielded {} of {} solutions in {charge_range:?}, {supported} seen in the last {} scans",
            spectrum.id,
            groups.len(),
            solutions.len(),
            window.len(),
        );

        if let Some(bins) =
            MassBinSet::from_masses(groups.iter().map(|g| g.monoisotopic_mass), bin_width)
        {
            window.push(bins);
        }
        Ok(groups)
    }
}
