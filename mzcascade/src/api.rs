//! High level entry points
use crate::deconv_traits::SpectrumDeconvoluter;
use crate::params::CascadeParams;
use crate::pipeline::{CascadeDeconvoluter, CascadeOutput};
use crate::progress::ProgressReporter;
use crate::spectrum::SpectrumSource;

/// Deconvolve a complete run of `spectra` with `deconvoluter`, numbering from 1.
///
/// This is a shortcut for building a [`CascadeDeconvoluter`] and running it once.
pub fn deconvolute_run<S, D>(
    spectra: &[S],
    deconvoluter: D,
    averagine: &D::Averagine,
    params: CascadeParams,
) -> CascadeOutput
where
    S: SpectrumSource,
    D: SpectrumDeconvoluter<S>,
{
    CascadeDeconvoluter::new(params, deconvoluter).run(spectra, averagine)
}

/// As [`deconvolute_run`], reporting progress to `progress` after every spectrum
pub fn deconvolute_run_with_progress<S, D, P>(
    spectra: &[S],
    deconvoluter: D,
    averagine: &D::Averagine,
    params: CascadeParams,
    progress: &mut P,
) -> CascadeOutput
where
    S: SpectrumSource,
    D: SpectrumDeconvoluter<S>,
    P: ProgressReporter,
{
    CascadeDeconvoluter::new(params, deconvoluter).run_with_progress(spectra, averagine, progress)
}
