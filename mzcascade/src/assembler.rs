use crate::progress::RunSummary;
use crate::solution::PeakGroup;
use crate::spectrum::SpectrumRef;

/// Collects the peak groups of a run in input order, numbering them as they arrive.
///
/// The spectrum index advances once per spectrum that produced groups and the mass
/// index once per group. Both are shared by every MS level and are incremented before
/// they are assigned, so a fresh assembler numbers from 1.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ResultAssembler {
    peak_groups: Vec<PeakGroup>,
    spectrum_index: u64,
    mass_index: u64,
}

impl ResultAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Continue numbering after a previous run that last assigned `spectrum_index`
    /// and `mass_index`
    pub fn with_offsets(spectrum_index: u64, mass_index: u64) -> Self {
        Self {
            peak_groups: Vec::new(),
            spectrum_index,
            mass_index,
        }
    }

    /// The most recently assigned spectrum index
    pub fn spectrum_index(&self) -> u64 {
        self.spectrum_index
    }

    /// The most recently assigned mass index
    pub fn mass_index(&self) -> u64 {
        self.mass_index
    }

    /// Stamp and append the groups one spectrum produced, returning them as stored.
    ///
    /// An empty `groups` leaves the counters and `summary` untouched.
    pub fn push_spectrum(
        &mut self,
        source: SpectrumRef,
        ms_level: u8,
        groups: Vec<PeakGroup>,
        summary: &mut RunSummary,
    ) -> &[PeakGroup] {
        let start = self.peak_groups.len();
        if groups.is_empty() {
            return &self.peak_groups[start..];
        }

        let group_count = groups.len();
        self.spectrum_index += 1;
        let spectrum_index = self.spectrum_index;
        self.peak_groups.reserve(group_count);
        for mut group in groups {
            self.mass_index += 1;
            group.source = Some(source);
            group.ms_level = ms_level;
            group.mass_index = self.mass_index;
            group.spectrum_index = spectrum_index;
            group.group_count = group_count;
            self.peak_groups.push(group);
        }

        let counts = summary.level_mut(ms_level);
        counts.spectra_with_groups += 1;
        counts.peak_groups += group_count;
        &self.peak_groups[start..]
    }

    pub fn len(&self) -> usize {
        self.peak_groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peak_groups.is_empty()
    }

    pub fn peak_groups(&self) -> &[PeakGroup] {
        &self.peak_groups
    }

    pub fn into_inner(self) -> Vec<PeakGroup> {
        self.peak_groups
    }
}
