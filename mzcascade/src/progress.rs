use std::ops::{Add, AddAssign};

use tracing::info;

/// What happened to the spectra of one MS level
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LevelCounts {
    /// Spectra at this level that were considered, including empty ones
    pub spectra: usize,
    /// Spectra that produced at least one peak group
    pub spectra_with_groups: usize,
    pub peak_groups: usize,
}

impl Add for LevelCounts {
    type Output = LevelCounts;

    fn add(self, rhs: Self) -> Self::Output {
        let mut dup = self;
        dup += rhs;
        dup
    }
}

impl AddAssign for LevelCounts {
    fn add_assign(&mut self, rhs: Self) {
        self.spectra += rhs.spectra;
        self.spectra_with_groups += rhs.spectra_with_groups;
        self.peak_groups += rhs.peak_groups;
    }
}

/// [`LevelCounts`] for every MS level a run touched
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunSummary {
    levels: Vec<LevelCounts>,
}

impl RunSummary {
    pub fn new() -> Self {
        Self::default()
    }

    /// The counts for `ms_level`, zero if nothing was seen at that level
    pub fn level(&self, ms_level: u8) -> LevelCounts {
        (ms_level as usize)
            .checked_sub(1)
            .and_then(|i| self.levels.get(i))
            .copied()
            .unwrap_or_default()
    }

    /// Mutable access to the counts for `ms_level`, growing the summary as needed.
    /// MS level 0 is treated as MS1.
    pub fn level_mut(&mut self, ms_level: u8) -> &mut LevelCounts {
        let i = (ms_level.max(1) - 1) as usize;
        if i >= self.levels.len() {
            self.levels.resize(i + 1, LevelCounts::default());
        }
        &mut self.levels[i]
    }

    pub fn total(&self) -> LevelCounts {
        self.levels
            .iter()
            .copied()
            .fold(LevelCounts::default(), |acc, c| acc + c)
    }

    /// The deepest level with any counts recorded
    pub fn max_ms_level(&self) -> u8 {
        self.levels.len() as u8
    }

    pub fn iter(&self) -> impl Iterator<Item = (u8, &LevelCounts)> + '_ {
        self.levels
            .iter()
            .enumerate()
            .map(|(i, c)| ((i + 1) as u8, c))
    }
}

impl Add for RunSummary {
    type Output = RunSummary;

    fn add(self, rhs: Self) -> Self::Output {
        let mut dup = self;
        dup += rhs;
        dup
    }
}

impl AddAssign for RunSummary {
    fn add_assign(&mut self, rhs: Self) {
        for (level, counts) in rhs.iter() {
            *self.level_mut(level) += *counts;
        }
    }
}

/// Receives the number of input spectra handled so far out of the total
pub trait ProgressReporter {
    fn report(&mut self, processed: usize, total: usize);
}

/// Discards progress updates
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn report(&mut self, _processed: usize, _total: usize) {}
}

impl<F: FnMut(usize, usize)> ProgressReporter for F {
    fn report(&mut self, processed: usize, total: usize) {
        (self)(processed, total)
    }
}

/// Logs progress whenever it advances by at least `step`, and once more on completion
#[derive(Debug, Clone, Copy)]
pub struct LogProgress {
    step: f64,
    last: Option<f64>,
}

impl Default for LogProgress {
    fn default() -> Self {
        Self::new(0.01)
    }
}

impl LogProgress {
    pub fn new(step: f64) -> Self {
        Self { step, last: None }
    }

    fn is_due(&self, fraction: f64, done: bool) -> bool {
        match self.last {
            None => true,
            Some(last) => fraction - last >= self.step || (done && last < 1.0),
        }
    }
}

impl ProgressReporter for LogProgress {
    fn report(&mut self, processed: usize, total: usize) {
        if total == 0 {
            return;
        }
        let fraction = processed as f64 / total as f64;
        if self.is_due(fraction, processed >= total) {
            info!(
                "{:0.0}% complete ({processed}/{total} spectra)",
                fraction * 100.0
            );
            self.last = Some(fraction);
        }
    }
}
