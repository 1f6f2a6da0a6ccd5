//! Rolling per-level history of the mass bins seen in recent scans.
//!
//! Masses are binned on a log scale relative to the smallest mass of the scan
//! that produced them, so each [`MassBinSet`] carries its own anchor.
use std::collections::{vec_deque, VecDeque};

/// The occupied log-mass bins of one scan
#[derive(Debug, Default, Clone, PartialEq)]
pub struct MassBinSet {
    bins: Vec<usize>,
    min_log_mass: f64,
}

impl MassBinSet {
    pub fn new(mut bins: Vec<usize>, min_log_mass: f64) -> Self {
        bins.sort_unstable();
        bins.dedup();
        Self { bins, min_log_mass }
    }

    /// Bin `masses` with a log-scale bin width of `bin_width`, anchored on the smallest
    /// positive mass. Returns `None` if there are no positive masses.
    pub fn from_masses<I: IntoIterator<Item = f64>>(masses: I, bin_width: f64) -> Option<Self> {
        let log_masses: Vec<f64> = masses
            .into_iter()
            .filter(|m| *m > 0.0)
            .map(f64::ln)
            .collect();
        let min_log_mass = log_masses.iter().copied().reduce(f64::min)?;
        let bins = log_masses
            .into_iter()
            .map(|v| bin_index(v, min_log_mass, bin_width))
            .collect();
        Some(Self::new(bins, min_log_mass))
    }

    pub fn bins(&self) -> &[usize] {
        &self.bins
    }

    pub fn min_log_mass(&self) -> f64 {
        self.min_log_mass
    }

    pub fn len(&self) -> usize {
        self.bins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    /// The bin `log_mass` would fall in under this set's anchor, if it is not below it
    pub fn bin_for(&self, log_mass: f64, bin_width: f64) -> Option<usize> {
        if log_mass + bin_width / 2.0 < self.min_log_mass {
            None
        } else {
            Some(bin_index(log_mass, self.min_log_mass, bin_width))
        }
    }

    pub fn contains_log_mass(&self, log_mass: f64, bin_width: f64) -> bool {
        self.bin_for(log_mass, bin_width)
            .is_some_and(|i| self.bins.binary_search(&i).is_ok())
    }
}

#[inline]
fn bin_index(log_mass: f64, min_log_mass: f64, bin_width: f64) -> usize {
    ((log_mass - min_log_mass) / bin_width + 0.5).max(0.0) as usize
}

/// A bounded history of [`MassBinSet`]s, oldest first.
///
/// The window never holds more than its capacity: pushing into a full window
/// evicts the oldest set.
#[derive(Debug, Clone, PartialEq)]
pub struct MassBinWindow {
    entries: VecDeque<MassBinSet>,
    capacity: usize,
}

impl Default for MassBinWindow {
    fn default() -> Self {
        Self::with_capacity(1)
    }
}

impl MassBinWindow {
    /// Create an empty window retaining at most `capacity` scans, at least one.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear()
    }

    /// Append the bins of the most recent scan, returning the evicted set if the
    /// window was full.
    pub fn push(&mut self, bins: MassBinSet) -> Option<MassBinSet> {
        let evicted = if self.entries.len() >= self.capacity {
            self.entries.pop_front()
        } else {
            None
        };
        self.entries.push_back(bins);
        evicted
    }

    pub fn iter(&self) -> vec_deque::Iter<'_, MassBinSet> {
        self.entries.iter()
    }

    pub fn latest(&self) -> Option<&MassBinSet> {
        self.entries.back()
    }

    /// The anchors of the retained scans, oldest first
    pub fn min_log_masses(&self) -> impl Iterator<Item = f64> + '_ {
        self.entries.iter().map(|e| e.min_log_mass)
    }

    /// The number of retained scans that observed `log_mass`
    pub fn support_for(&self, log_mass: f64, bin_width: f64) -> usize {
        self.entries
            .iter()
            .filter(|e| e.contains_log_mass(log_mass, bin_width))
            .count()
    }
}

impl<'a> IntoIterator for &'a MassBinWindow {
    type Item = &'a MassBinSet;
    type IntoIter = vec_deque::Iter<'a, MassBinSet>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
