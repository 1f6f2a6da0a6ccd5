//! What the orchestrator needs to know about a spectrum and its precursors
use mzpeaks::coordinate::{SimpleInterval, Span1D};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Isolation window offsets strictly greater than this are absolute m/z bounds,
/// otherwise they are distances from the window's center.
pub const ABSOLUTE_OFFSET_THRESHOLD: f64 = 100.0;

/// An absolute m/z interval, inclusive at both ends
pub type MzRange = SimpleInterval<f64>;

/// A precursor isolation window as reported by the instrument.
///
/// The offsets follow two conventions at once: a value above [`ABSOLUTE_OFFSET_THRESHOLD`]
/// is an absolute bound, anything else is relative to `mz`. Use [`PrecursorWindow::normalize`]
/// before comparing against m/z values.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PrecursorWindow {
    /// The window's center m/z
    pub mz: f64,
    pub lower_offset: f64,
    pub upper_offset: f64,
}

impl PrecursorWindow {
    pub fn new(mz: f64, lower_offset: f64, upper_offset: f64) -> Self {
        Self {
            mz,
            lower_offset,
            upper_offset,
        }
    }

    /// A window described by symmetric relative offsets around `mz`
    pub fn symmetric(mz: f64, half_width: f64) -> Self {
        Self::new(mz, half_width, half_width)
    }

    pub fn normalize(&self) -> MzRange {
        let start = if self.lower_offset > ABSOLUTE_OFFSET_THRESHOLD {
            self.lower_offset
        } else {
            self.mz - self.lower_offset
        };
        let end = if self.upper_offset > ABSOLUTE_OFFSET_THRESHOLD {
            self.upper_offset
        } else {
            self.mz + self.upper_offset
        };
        SimpleInterval::new(start, end)
    }

    pub fn contains(&self, mz: f64) -> bool {
        let window = self.normalize();
        window.start() <= mz && mz <= window.end()
    }
}

/// The view of a spectrum the multi-level driver works from.
///
/// Peak data itself is only consumed by the [`SpectrumDeconvoluter`](crate::deconv_traits::SpectrumDeconvoluter)
/// implementation, so this only exposes what sequencing decisions need.
pub trait SpectrumSource {
    /// The MS exponentiation level, 1 for survey scans
    fn ms_level(&self) -> u8;

    /// The number of peaks available to deconvolve
    fn peak_count(&self) -> usize;

    /// The isolation windows this spectrum's precursors were selected with. Empty for MS1
    /// spectra or when the source did not record any.
    fn precursor_windows(&self) -> impl Iterator<Item = PrecursorWindow> + '_;

    fn is_empty(&self) -> bool {
        self.peak_count() == 0
    }
}

/// A non-owning reference to a spectrum by its position in the input sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SpectrumRef(pub usize);

impl SpectrumRef {
    pub fn position(&self) -> usize {
        self.0
    }

    /// Look up the referenced spectrum in the sequence it was produced from
    pub fn resolve<'a, S>(&self, spectra: &'a [S]) -> Option<&'a S> {
        spectra.get(self.0)
    }
}

impl From<usize> for SpectrumRef {
    fn from(value: usize) -> Self {
        Self(value)
    }
}
