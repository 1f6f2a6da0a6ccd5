//! Run-level configuration and the per-spectrum bounds handed to a deconvoluter

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A closed pair of charge states, (low, high)
pub type ChargeRange = (i32, i32);

/// The configuration for one multi-level deconvolution run.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CascadeParams {
    /// The lowest charge state to consider
    pub min_charge: i32,
    /// The highest charge state to consider for MS1 spectra
    pub max_charge: i32,
    /// The largest neutral mass to consider for MS1 spectra
    pub max_mass: f64,
    /// The deepest MS level to process. Spectra beyond it are ignored.
    pub max_ms_level: u8,
    /// The number of recent scans whose mass bins are retained, indexed by MS level - 1.
    ///
    /// Levels beyond the end of this list reuse its last entry.
    pub overlapped_scans: Vec<usize>,
    /// The maximum number of peak groups a deconvoluter may report per spectrum
    pub max_mass_count: Option<usize>,
}

impl Default for CascadeParams {
    fn default() -> Self {
        Self {
            min_charge: 1,
            max_charge: 30,
            max_mass: 50000.0,
            max_ms_level: 3,
            overlapped_scans: vec![15, 1],
            max_mass_count: None,
        }
    }
}

impl CascadeParams {
    pub fn new(
        min_charge: i32,
        max_charge: i32,
        max_mass: f64,
        max_ms_level: u8,
        overlapped_scans: Vec<usize>,
        max_mass_count: Option<usize>,
    ) -> Self {
        Self {
            min_charge,
            max_charge,
            max_mass,
            max_ms_level,
            overlapped_scans,
            max_mass_count,
        }
    }

    /// The width of the configured charge range, `max_charge - min_charge`
    pub fn charge_range(&self) -> i32 {
        self.max_charge - self.min_charge
    }

    /// The number of scans of overlap to retain for `ms_level`, at least one.
    pub fn overlapped_scans_for(&self, ms_level: u8) -> usize {
        let i = (ms_level.max(1) - 1) as usize;
        self.overlapped_scans
            .get(i)
            .or_else(|| self.overlapped_scans.last())
            .copied()
            .unwrap_or(1)
            .max(1)
    }

    /// The bounds used for every MS1 spectrum and the initial fallback of every level
    pub fn default_deconvolution_params(&self) -> DeconvolutionParams {
        DeconvolutionParams::new(
            self.min_charge,
            self.charge_range(),
            self.max_mass,
            self.max_mass_count,
        )
    }
}

/// The charge and mass bounds resolved for a single spectrum.
///
/// `charge_range` is a width over `min_charge`, so a precursor estimate of charge
/// `z` yields `z - min_charge`. It is not clamped and may be negative when a
/// parent assignment falls below the configured minimum.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DeconvolutionParams {
    pub min_charge: i32,
    pub charge_range: i32,
    pub max_mass: f64,
    pub max_mass_count: Option<usize>,
}

impl DeconvolutionParams {
    pub fn new(
        min_charge: i32,
        charge_range: i32,
        max_mass: f64,
        max_mass_count: Option<usize>,
    ) -> Self {
        Self {
            min_charge,
            charge_range,
            max_mass,
            max_mass_count,
        }
    }

    pub fn max_charge(&self) -> i32 {
        self.min_charge + self.charge_range
    }

    pub fn as_charge_range(&self) -> ChargeRange {
        (self.min_charge, self.max_charge())
    }
}
