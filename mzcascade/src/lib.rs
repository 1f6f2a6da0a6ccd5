//! Multi-level charge state deconvolution.
//!
//! Walks the spectra of an LC-MS/MS run in acquisition order, handing each one to a
//! single-spectrum [`SpectrumDeconvoluter`]. Peak groups found at one MS level narrow the
//! charge and mass search of the spectra isolated from them at the next level, and each
//! level keeps a bounded [`MassBinWindow`] of its recent scans for the deconvoluter to use.
pub mod api;
pub mod assembler;
pub mod deconv_traits;
pub mod level;
pub mod mass_bins;
pub mod params;
pub mod pipeline;
pub mod precursor;
pub mod progress;
pub mod solution;
pub mod spectrum;

pub use crate::api::{deconvolute_run, deconvolute_run_with_progress};
pub use crate::deconv_traits::{DeconvolutionError, SpectrumDeconvoluter};
pub use crate::level::{BoundsSource, LevelContextStore, PrecursorPeakIndex, ResolvedBounds};
pub use crate::mass_bins::{MassBinSet, MassBinWindow};
pub use crate::params::{CascadeParams, ChargeRange, DeconvolutionParams};
pub use crate::pipeline::{current_max_ms_level, CascadeDeconvoluter, CascadeOutput};
pub use crate::precursor::{resolve_precursor, PrecursorEstimate};
pub use crate::progress::{LevelCounts, LogProgress, NoProgress, ProgressReporter, RunSummary};
pub use crate::solution::{nominal_mass, GroupPeak, PeakGroup};
pub use crate::spectrum::{PrecursorWindow, SpectrumRef, SpectrumSource};
