use mzdata::prelude::*;
use mzdata::spectrum::{MultiLayerSpectrum, Precursor, SignalContinuity};
use mzpeaks::prelude::*;
use mzpeaks::{CentroidPeak, MZPeakSetType};
use tracing::{trace, warn};

use mzcascade::{spectrum::ABSOLUTE_OFFSET_THRESHOLD, PrecursorWindow, SpectrumSource};

use mzdeisotope::solution::DeconvolvedSolutionPeak;

pub(crate) type CPeak = CentroidPeak;
pub(crate) type DPeak = DeconvolvedSolutionPeak;
pub(crate) type SpectrumType = MultiLayerSpectrum<CPeak, DPeak>;

/// The half width assumed for an isolation window that was not recorded
pub const DEFAULT_ISOLATION_HALF_WIDTH: f64 = 1.5;

/// A spectrum reduced to its centroids and the metadata needed to sequence it
#[derive(Debug, Clone)]
pub struct CentroidedSpectrum {
    pub id: String,
    pub index: usize,
    pub start_time: f64,
    pub ms_level: u8,
    pub peaks: MZPeakSetType<CPeak>,
    pub precursors: Vec<PrecursorWindow>,
}

impl CentroidedSpectrum {
    pub fn new(
        id: String,
        index: usize,
        start_time: f64,
        ms_level: u8,
        peaks: MZPeakSetType<CPeak>,
        precursors: Vec<PrecursorWindow>,
    ) -> Self {
        Self {
            id,
            index,
            start_time,
            ms_level,
            peaks,
            precursors,
        }
    }

    /// Centroid `spectrum`, picking peaks from profile data with `signal_to_noise`.
    ///
    /// A spectrum that cannot be centroided is kept with no peaks.
    pub fn from_spectrum(mut spectrum: SpectrumType, signal_to_noise: f32) -> Self {
        let precursors = spectrum.precursor_iter().map(precursor_window_of).collect();

        let peaks = match spectrum.signal_continuity() {
            SignalContinuity::Centroid => match spectrum.try_build_centroids() {
                Ok(peaks) => peaks.clone(),
                Err(e) => {
                    warn!("Failed to read centroids of {}: {e}", spectrum.id());
                    MZPeakSetType::empty()
                }
            },
            SignalContinuity::Profile => match spectrum.pick_peaks(signal_to_noise) {
                Ok(()) => spectrum.peaks.take().unwrap_or_else(MZPeakSetType::empty),
                Err(e) => {
                    warn!("Failed to pick peaks of {}: {e}", spectrum.id());
                    MZPeakSetType::empty()
                }
            },
            SignalContinuity::Unknown => {
                warn!("Can't infer peak mode for {}", spectrum.id());
                MZPeakSetType::empty()
            }
        };
        trace!(
            "Loaded {} MS{} with {} peaks",
            spectrum.id(),
            spectrum.ms_level(),
            peaks.len()
        );

        Self::new(
            spectrum.id().to_string(),
            spectrum.index(),
            spectrum.start_time(),
            spectrum.ms_level(),
            peaks,
            precursors,
        )
    }
}

/// Describe a precursor's isolation window, falling back to a relative default around the
/// selected ion for a bound that is missing
pub fn precursor_window_of(precursor: &Precursor) -> PrecursorWindow {
    let window = &precursor.isolation_window;
    window_from_bounds(
        precursor.ion().mz,
        window.lower_bound as f64,
        window.upper_bound as f64,
    )
}

/// Encode absolute bounds so that [`PrecursorWindow::normalize`] recovers them. Bounds at or
/// below [`ABSOLUTE_OFFSET_THRESHOLD`] would be read as offsets, so those are stored relative
/// to `mz` instead.
fn window_from_bounds(mz: f64, lower_bound: f64, upper_bound: f64) -> PrecursorWindow {
    let lower_offset = if lower_bound == 0.0 {
        DEFAULT_ISOLATION_HALF_WIDTH
    } else if lower_bound > ABSOLUTE_OFFSET_THRESHOLD {
        lower_bound
    } else {
        (mz - lower_bound).min(ABSOLUTE_OFFSET_THRESHOLD)
    };
    let upper_offset = if upper_bound == 0.0 {
        DEFAULT_ISOLATION_HALF_WIDTH
    } else if upper_bound > ABSOLUTE_OFFSET_THRESHOLD {
        upper_bound
    } else {
        (upper_bound - mz).min(ABSOLUTE_OFFSET_THRESHOLD)
    };
    PrecursorWindow::new(mz, lower_offset, upper_offset)
}

impl SpectrumSource for CentroidedSpectrum {
    fn ms_level(&self) -> u8 {
        self.ms_level
    }

    fn peak_count(&self) -> usize {
        self.peaks.len()
    }

    fn precursor_windows(&self) -> impl Iterator<Item = PrecursorWindow> + '_ {
        self.precursors.iter().copied()
    }
}
