/*! The boundary between the multi-level driver and a single-spectrum deconvolution algorithm */
use thiserror::Error;

use crate::mass_bins::MassBinWindow;
use crate::params::DeconvolutionParams;
use crate::solution::PeakGroup;
use crate::spectrum::SpectrumSource;

/// An error a [`SpectrumDeconvoluter`] may report for one spectrum
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DeconvolutionError {
    #[error("Failed to deconvolve spectrum: {0}")]
    Failed(String),
    #[error("No isotopic model is available for MS level {0}")]
    MissingModel(u8),
}

/// Turns the peaks of one spectrum into [`PeakGroup`]s.
///
/// Implementations receive the rolling [`MassBinWindow`] of the spectrum's MS level and
/// may record the spectrum's own mass bins into it. They only need to fill in the
/// mass, score and member peaks of each group they return.
pub trait SpectrumDeconvoluter<S: SpectrumSource> {
    /// The precomputed isotopic pattern lookup shared by every call of a run
    type Averagine;

    fn deconvolute_spectrum(
        &mut self,
        spectrum: &S,
        window: &mut MassBinWindow,
        averagine: &Self::Averagine,
        ms_level: u8,
        params: &DeconvolutionParams,
    ) -> Result<Vec<PeakGroup>, DeconvolutionError>;
}

impl<S, F> SpectrumDeconvoluter<S> for F
where
    S: SpectrumSource,
    F: FnMut(&S, &mut MassBinWindow, u8, &DeconvolutionParams) -> Result<Vec<PeakGroup>, DeconvolutionError>,
{
    type Averagine = ();

    fn deconvolute_spectrum(
        &mut self,
        spectrum: &S,
        window: &mut MassBinWindow,
        _averagine: &Self::Averagine,
        ms_level: u8,
        params: &DeconvolutionParams,
    ) -> Result<Vec<PeakGroup>, DeconvolutionError> {
        (self)(spectrum, window, ms_level, params)
    }
}
