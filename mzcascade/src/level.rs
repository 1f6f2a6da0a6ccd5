//! Per-MS-level state carried between spectra of one run
use std::cmp::Ordering;

use mzpeaks::{CoordinateLike, IntensityMeasurement, KnownCharge, Mass, MZ};
use tracing::trace;

use crate::mass_bins::MassBinWindow;
use crate::params::{CascadeParams, DeconvolutionParams};
use crate::precursor::{resolve_precursor, PrecursorEstimate};
use crate::solution::PeakGroup;
use crate::spectrum::PrecursorWindow;

/// A member peak of a deconvolved group, annotated with what its group resolved to
#[derive(Debug, Default, Clone, Copy, PartialEq, PartialOrd)]
pub struct AnnotatedPeak {
    pub mz: f64,
    pub charge: i32,
    pub intensity: f32,
    /// The monoisotopic neutral mass of the owning [`PeakGroup`]
    pub neutral_mass: f64,
}

impl AnnotatedPeak {
    pub fn new(mz: f64, charge: i32, intensity: f32, neutral_mass: f64) -> Self {
        Self {
            mz,
            charge,
            intensity,
            neutral_mass,
        }
    }
}

impl CoordinateLike<MZ> for AnnotatedPeak {
    fn coordinate(&self) -> f64 {
        self.mz
    }
}

impl CoordinateLike<Mass> for AnnotatedPeak {
    fn coordinate(&self) -> f64 {
        self.neutral_mass
    }
}

impl IntensityMeasurement for AnnotatedPeak {
    fn intensity(&self) -> f32 {
        self.intensity
    }
}

impl KnownCharge for AnnotatedPeak {
    fn charge(&self) -> i32 {
        self.charge
    }
}

/// The member peaks of the most recent spectrum at a level that produced peak groups,
/// sorted by m/z with one entry per distinct m/z.
///
/// When two member peaks share an exact m/z, the entry keeps the higher charge while
/// intensity and neutral mass come from whichever was recorded last.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct PrecursorPeakIndex {
    peaks: Vec<AnnotatedPeak>,
}

impl PrecursorPeakIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Discard the current contents and index the member peaks of `groups` instead
    #[tracing::instrument(skip_all, level = "trace")]
    pub fn rebuild(&mut self, groups: &[PeakGroup]) {
        self.peaks.clear();
        self.peaks.extend(groups.iter().flat_map(|group| {
            group.iter().map(|p| {
                AnnotatedPeak::new(p.mz, p.charge, p.intensity, group.monoisotopic_mass)
            })
        }));
        // Stable, so equal keys stay in the order they were recorded
        self.peaks.sort_by(|a, b| a.mz.total_cmp(&b.mz));
        self.peaks.dedup_by(|later, kept| {
            if later.mz.total_cmp(&kept.mz) == Ordering::Equal {
                kept.charge = kept.charge.max(later.charge);
                kept.intensity = later.intensity;
                kept.neutral_mass = later.neutral_mass;
                true
            } else {
                false
            }
        });
        trace!("Indexed {} precursor peaks from {} groups", self.peaks.len(), groups.len());
    }

    /// All entries with `start <= mz <= end`, in increasing m/z order
    pub fn between(&self, start: f64, end: f64) -> &[AnnotatedPeak] {
        let lo = self.peaks.partition_point(|p| p.mz < start);
        let hi = self.peaks.partition_point(|p| p.mz <= end);
        if hi <= lo {
            &[]
        } else {
            &self.peaks[lo..hi]
        }
    }

    pub fn clear(&mut self) {
        self.peaks.clear()
    }

    pub fn len(&self) -> usize {
        self.peaks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peaks.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, AnnotatedPeak> {
        self.peaks.iter()
    }
}

/// Where a spectrum's deconvolution bounds came from
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BoundsSource {
    /// The run's configured defaults, used for MS1
    Defaults,
    /// A peak of the parent level that fell in a precursor isolation window
    Precursor(PrecursorEstimate),
    /// The level's last successfully resolved bounds
    Fallback,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedBounds {
    pub params: DeconvolutionParams,
    pub source: BoundsSource,
}

/// The rolling state of a single MS level
#[derive(Debug, Clone, PartialEq)]
pub struct LevelContext {
    ms_level: u8,
    window: MassBinWindow,
    fallback: DeconvolutionParams,
    precursor_peaks: PrecursorPeakIndex,
}

impl LevelContext {
    pub fn new(ms_level: u8, overlapped_scans: usize, fallback: DeconvolutionParams) -> Self {
        Self {
            ms_level,
            window: MassBinWindow::with_capacity(overlapped_scans),
            fallback,
            precursor_peaks: PrecursorPeakIndex::new(),
        }
    }

    pub fn ms_level(&self) -> u8 {
        self.ms_level
    }

    pub fn window(&self) -> &MassBinWindow {
        &self.window
    }

    pub fn fallback(&self) -> &DeconvolutionParams {
        &self.fallback
    }

    pub fn precursor_peaks(&self) -> &PrecursorPeakIndex {
        &self.precursor_peaks
    }
}

/// The [`LevelContext`] of every MS level from 1 through the deepest processed level,
/// owned by one run.
#[derive(Debug, Clone, PartialEq)]
pub struct LevelContextStore {
    levels: Vec<LevelContext>,
    defaults: DeconvolutionParams,
}

impl LevelContextStore {
    pub fn new(max_ms_level: u8, params: &CascadeParams) -> Self {
        let defaults = params.default_deconvolution_params();
        let levels = (1..=max_ms_level)
            .map(|level| LevelContext::new(level, params.overlapped_scans_for(level), defaults))
            .collect();
        Self { levels, defaults }
    }

    /// The deepest level this store holds state for, 0 if none
    pub fn max_ms_level(&self) -> u8 {
        self.levels.len() as u8
    }

    pub fn defaults(&self) -> &DeconvolutionParams {
        &self.defaults
    }

    #[inline]
    fn slot(&self, ms_level: u8) -> Option<usize> {
        let i = (ms_level as usize).checked_sub(1)?;
        (i < self.levels.len()).then_some(i)
    }

    pub fn get(&self, ms_level: u8) -> Option<&LevelContext> {
        self.slot(ms_level).map(|i| &self.levels[i])
    }

    pub fn window_mut(&mut self, ms_level: u8) -> Option<&mut MassBinWindow> {
        let i = self.slot(ms_level)?;
        Some(&mut self.levels[i].window)
    }

    /// Decide the charge and mass bounds for a spectrum at `ms_level` isolated with
    /// `windows`.
    ///
    /// MS1 always uses the configured defaults. Deeper levels look for the most intense
    /// peak of the parent level inside any of the windows, remembering the result as
    /// this level's fallback, and otherwise reuse the fallback unchanged.
    ///
    /// Returns `None` if `ms_level` has no context in this store.
    pub fn resolve_bounds<I>(&mut self, ms_level: u8, windows: I) -> Option<ResolvedBounds>
    where
        I: IntoIterator<Item = PrecursorWindow>,
    {
        let i = self.slot(ms_level)?;
        if i == 0 {
            return Some(ResolvedBounds {
                params: self.defaults,
                source: BoundsSource::Defaults,
            });
        }

        let estimate = resolve_precursor(windows, &self.levels[i - 1].precursor_peaks);
        let level = &mut self.levels[i];
        let resolved = match estimate {
            Some(estimate) => {
                let min_charge = self.defaults.min_charge;
                level.fallback = DeconvolutionParams::new(
                    min_charge,
                    estimate.charge_range(min_charge),
                    estimate.max_mass(),
                    self.defaults.max_mass_count,
                );
                ResolvedBounds {
                    params: level.fallback,
                    source: BoundsSource::Precursor(estimate),
                }
            }
            None => ResolvedBounds {
                params: level.fallback,
                source: BoundsSource::Fallback,
            },
        };
        Some(resolved)
    }

    /// Replace the precursor peak index of `ms_level` with the peaks of `groups`
    pub fn update_precursor_peaks(&mut self, ms_level: u8, groups: &[PeakGroup]) {
        if let Some(i) = self.slot(ms_level) {
            self.levels[i].precursor_peaks.rebuild(groups);
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, LevelContext> {
        self.levels.iter()
    }
}
