//! Estimating a dependent spectrum's charge and mass from its parent level
use tracing::trace;

use crate::level::{AnnotatedPeak, PrecursorPeakIndex};
use crate::spectrum::PrecursorWindow;

/// Added to a precursor's monoisotopic mass to cover the rest of its isotopic envelope
pub const ISOTOPE_MASS_MARGIN: f64 = 100.0;

/// The parent-level peak chosen as the precursor of a spectrum
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct PrecursorEstimate {
    pub mz: f64,
    pub charge: i32,
    pub intensity: f32,
    pub neutral_mass: f64,
}

impl PrecursorEstimate {
    /// The charge range width a dependent spectrum should search, which may be
    /// negative if `charge` is below `min_charge`
    pub fn charge_range(&self, min_charge: i32) -> i32 {
        self.charge - min_charge
    }

    pub fn max_mass(&self) -> f64 {
        self.neutral_mass + ISOTOPE_MASS_MARGIN
    }
}

impl From<&AnnotatedPeak> for PrecursorEstimate {
    fn from(value: &AnnotatedPeak) -> Self {
        Self {
            mz: value.mz,
            charge: value.charge,
            intensity: value.intensity,
            neutral_mass: value.neutral_mass,
        }
    }
}

/// Find the most intense peak of `parent` that falls inside any of `windows`.
///
/// The first peak seen wins ties. Returns `None` if no window contains a peak.
pub fn resolve_precursor<I>(windows: I, parent: &PrecursorPeakIndex) -> Option<PrecursorEstimate>
where
    I: IntoIterator<Item = PrecursorWindow>,
{
    if parent.is_empty() {
        return None;
    }
    let mut best: Option<&AnnotatedPeak> = None;
    for window in windows {
        let range = window.normalize();
        for peak in parent.between(range.start, range.end) {
            match best {
                Some(b) if peak.intensity <= b.intensity => {}
                _ => best = Some(peak),
            }
        }
    }
    let estimate = best.map(PrecursorEstimate::from);
    if let Some(e) = estimate.as_ref() {
        trace!(
            "Resolved precursor at {:0.3} with charge {} and mass {:0.3}",
            e.mz,
            e.charge,
            e.neutral_mass
        );
    }
    estimate
}
