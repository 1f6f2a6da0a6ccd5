use std::fmt::Display;
use std::num::ParseIntError;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use mzdeisotope::{
    isotopic_model::{CachingIsotopicModel, IsotopicModels},
    scorer::ScoreType,
};

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArgIsotopicModels {
    Peptide,
    Glycan,
    Glycopeptide,
    PermethylatedGlycan,
    Heparin,
    HeparanSulfate,
}

impl From<ArgIsotopicModels> for IsotopicModels {
    fn from(value: ArgIsotopicModels) -> Self {
        match value {
            ArgIsotopicModels::Peptide => IsotopicModels::Peptide,
            ArgIsotopicModels::Glycan => IsotopicModels::Glycan,
            ArgIsotopicModels::Glycopeptide => IsotopicModels::Glycopeptide,
            ArgIsotopicModels::PermethylatedGlycan => IsotopicModels::PermethylatedGlycan,
            ArgIsotopicModels::Heparin => IsotopicModels::Heparin,
            ArgIsotopicModels::HeparanSulfate => IsotopicModels::HeparanSulfate,
        }
    }
}

impl From<ArgIsotopicModels> for CachingIsotopicModel<'static> {
    fn from(value: ArgIsotopicModels) -> Self {
        let model: IsotopicModels = value.into();
        model.into()
    }
}

impl Display for ArgIsotopicModels {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ChargeRangeParseError {
    #[error("Failed to parse charge range start {0}")]
    StartNotInteger(ParseIntError),
    #[error("Failed to parse charge range end {0}")]
    EndNotInteger(ParseIntError),
    #[error("Charge range start {0} is greater than end {1}")]
    Inverted(i32, i32),
    #[error("Charge states must be positive, got {0}")]
    NotPositive(i32),
}

/// A charge range denoted `low-high` or just `high`, starting from 1
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArgChargeRange(pub i32, pub i32);

impl ArgChargeRange {
    pub fn low(&self) -> i32 {
        self.0
    }

    pub fn high(&self) -> i32 {
        self.1
    }
}

impl FromStr for ArgChargeRange {
    type Err = ChargeRangeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (low, high) = match s.split_once('-') {
            Some((low, high)) => {
                let low = low
                    .trim()
                    .parse::<i32>()
                    .map_err(ChargeRangeParseError::StartNotInteger)?;
                let high = high
                    .trim()
                    .parse::<i32>()
                    .map_err(ChargeRangeParseError::EndNotInteger)?;
                (low, high)
            }
            None => {
                let high = s
                    .parse::<i32>()
                    .map_err(ChargeRangeParseError::EndNotInteger)?;
                (1, high)
            }
        };
        if low < 1 {
            return Err(ChargeRangeParseError::NotPositive(low));
        }
        if high < low {
            return Err(ChargeRangeParseError::Inverted(low, high));
        }
        Ok(Self(low, high))
    }
}

impl Display for ArgChargeRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.0, self.1)
    }
}

impl From<ArgChargeRange> for (i32, i32) {
    fn from(value: ArgChargeRange) -> Self {
        (value.0, value.1)
    }
}

/// Settings for the isotopic pattern fitting engine, one set shared by all MS levels
/// except where split by MS1/MSn
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EngineParams {
    /// The mass accuracy in parts-per-million
    pub error_tolerance: f32,
    pub ms1_score_threshold: ScoreType,
    pub msn_score_threshold: ScoreType,
    pub ms1_missed_peaks: u16,
    pub msn_missed_peaks: u16,
    /// The m/z range to pre-compute isotopic patterns over
    pub mz_range: (f64, f64),
    /// The charge range to pre-compute isotopic patterns over
    pub charge_range: (i32, i32),
}

impl Default for EngineParams {
    fn default() -> Self {
        Self {
            error_tolerance: 10.0,
            ms1_score_threshold: 20.0,
            msn_score_threshold: 10.0,
            ms1_missed_peaks: 1,
            msn_missed_peaks: 1,
            mz_range: (80.0, 2200.0),
            charge_range: (1, 30),
        }
    }
}

impl EngineParams {
    /// The width of a natural-log mass bin corresponding to the error tolerance
    pub fn log_mass_bin_width(&self) -> f64 {
        (1.0 + self.error_tolerance as f64 * 1e-6).ln()
    }
}
