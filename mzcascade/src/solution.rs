use itertools::Itertools;

use mzpeaks::{CoordinateLike, IntensityMeasurement, KnownCharge, Mass, MZ};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::params::ChargeRange;
use crate::spectrum::SpectrumRef;

/// Convert a monoisotopic neutral mass to its nominal mass
pub fn nominal_mass(mass: f64) -> i64 {
    (mass * 0.999497 + 0.5).floor() as i64
}

/// An experimental peak assigned to a [`PeakGroup`] at a particular charge
#[derive(Debug, Default, Clone, Copy, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GroupPeak {
    pub mz: f64,
    pub intensity: f32,
    pub charge: i32,
}

impl GroupPeak {
    pub fn new(mz: f64, intensity: f32, charge: i32) -> Self {
        Self {
            mz,
            intensity,
            charge,
        }
    }
}

impl CoordinateLike<MZ> for GroupPeak {
    fn coordinate(&self) -> f64 {
        self.mz
    }
}

impl IntensityMeasurement for GroupPeak {
    fn intensity(&self) -> f32 {
        self.intensity
    }
}

impl KnownCharge for GroupPeak {
    fn charge(&self) -> i32 {
        self.charge
    }
}

/// An isotopic envelope, possibly observed over several charge states, collapsed to a
/// single monoisotopic neutral mass.
///
/// A deconvoluter only fills in [`PeakGroup::monoisotopic_mass`], [`PeakGroup::score`]
/// and [`PeakGroup::peaks`]. The remaining fields are stamped by the
/// [`ResultAssembler`](crate::assembler::ResultAssembler) when the group is accepted
/// into a run's output and are not modified afterwards.
#[derive(Debug, Default, Clone, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PeakGroup {
    pub monoisotopic_mass: f64,
    pub score: f32,
    pub peaks: Vec<GroupPeak>,
    /// The spectrum this group was deconvolved from
    pub source: Option<SpectrumRef>,
    pub ms_level: u8,
    /// The run-wide index of this group
    pub mass_index: u64,
    /// The run-wide index of the source spectrum among spectra that produced groups
    pub spectrum_index: u64,
    /// The number of groups the source spectrum produced
    pub group_count: usize,
}

impl PeakGroup {
    pub fn new(monoisotopic_mass: f64, score: f32, peaks: Vec<GroupPeak>) -> Self {
        Self {
            monoisotopic_mass,
            score,
            peaks,
            ..Default::default()
        }
    }

    pub fn len(&self) -> usize {
        self.peaks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peaks.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, GroupPeak> {
        self.peaks.iter()
    }

    pub fn total_intensity(&self) -> f32 {
        self.peaks.iter().map(|p| p.intensity).sum()
    }

    /// The lowest and highest charge among member peaks
    pub fn charge_range(&self) -> Option<ChargeRange> {
        self.peaks.iter().map(|p| p.charge).minmax().into_option()
    }

    pub fn nominal_mass(&self) -> i64 {
        nominal_mass(self.monoisotopic_mass)
    }

    /// Look up the spectrum this group came from, if it has been assembled
    pub fn source_spectrum<'a, S>(&self, spectra: &'a [S]) -> Option<&'a S> {
        self.source.and_then(|r| r.resolve(spectra))
    }
}

impl CoordinateLike<Mass> for PeakGroup {
    fn coordinate(&self) -> f64 {
        self.monoisotopic_mass
    }
}

impl IntensityMeasurement for PeakGroup {
    fn intensity(&self) -> f32 {
        self.total_intensity()
    }
}

impl<'a> IntoIterator for &'a PeakGroup {
    type Item = &'a GroupPeak;
    type IntoIter = std::slice::Iter<'a, GroupPeak>;

    fn into_iter(self) -> Self::IntoIter {
        self.peaks.iter()
    }
}
