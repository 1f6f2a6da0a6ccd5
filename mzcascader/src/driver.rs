use std::fs;
use std::io;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Instant;

use clap::Parser;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use mzdata::io::MZReaderType;
use mzdata::prelude::*;

use mzcascade::{CascadeDeconvoluter, CascadeParams, LogProgress, RunSummary};
use mzdeisotope::scorer::ScoreType;

use crate::args::{ArgChargeRange, ArgIsotopicModels, EngineParams};
use crate::engine::{Averagine, EngineDeconvoluter};
use crate::spectrum::{CPeak, CentroidedSpectrum, DPeak};
use crate::write::{write_peak_groups, OutputFormat};

#[derive(Debug, Error)]
pub enum MZCascaderError {
    #[error("An IO error occurred: {0}")]
    IOError(
        #[source]
        #[from]
        io::Error,
    ),
    #[error("Failed to open input file {0}: {1}")]
    InputOpenError(String, #[source] io::Error),
    #[error("The output file format for {0} was either unknown or not supported")]
    OutputFormatUnknown(String),
    #[error("Failed to write a table row: {0}")]
    CSVError(
        #[source]
        #[from]
        csv::Error,
    ),
    #[error("Failed to write a JSON row: {0}")]
    JSONError(
        #[source]
        #[from]
        serde_json::Error,
    ),
    #[error("Failed to read configuration: {0}")]
    ConfigError(
        #[source]
        #[from]
        figment::Error,
    ),
}

/// Multi-level charge state deconvolution of tandem mass spectrometry files.
///
/// Read a file, deconvolve its MS1 spectra and use the masses found to narrow the search
/// in the MSn spectra isolated from them, and write out a table of peak groups.
#[derive(Parser, Debug, Clone, Deserialize, Serialize)]
#[command(author, version)]
pub struct MZCascader {
    /// The path to read the input spectra from
    #[arg()]
    pub input_file: String,

    /// The path to write the peak group table to, or if '-' is passed, write to STDOUT.
    ///
    /// The format is inferred from the extension, `.tsv` or `.json`, optionally followed by
    /// `.gz`. STDOUT is always written as TSV.
    #[arg(short = 'o', long = "output-file", default_value = "-")]
    pub output_file: PathBuf,

    /// The path to write a log file to, in addition to STDERR
    #[arg(short = 'l', long = "log-file")]
    pub log_file: Option<PathBuf>,

    /// A TOML configuration file to read additional parameters from.
    ///
    /// Configurations are also read from `mzcascader.toml` in the working directory.
    /// Environment variables prefixed with `MZCASCADER_` will be read too.
    #[arg(long = "config-file")]
    pub config_file: Option<PathBuf>,

    /// The range of charge states to consider for MS1 spectra denoted (low)-(high) or (high)
    #[arg(
        short = 'z',
        long = "charge-range",
        default_value_t = ArgChargeRange(1, 30),
        value_parser = ArgChargeRange::from_str,
    )]
    pub charge_range: ArgChargeRange,

    /// The largest neutral mass to consider for MS1 spectra
    #[arg(long = "max-mass", default_value_t = 50000.0)]
    pub max_mass: f64,

    /// The deepest MS level to process
    #[arg(
        long = "max-ms-level",
        default_value_t = 3,
        value_parser = clap::value_parser!(u8).range(1..),
    )]
    pub max_ms_level: u8,

    /// The number of recent scans to retain masses from, per MS level starting from MS1.
    ///
    /// Levels beyond the list reuse its last entry.
    #[arg(
        long = "overlapped-scans",
        value_delimiter = ',',
        default_values_t = [15usize, 1],
    )]
    pub overlapped_scans: Vec<usize>,

    /// The most peak groups to report per spectrum, keeping the most intense
    #[arg(long = "max-mass-count")]
    pub max_mass_count: Option<usize>,

    /// The mass accuracy in parts-per-million
    #[arg(short = 'e', long = "error-tolerance", default_value_t = 10.0)]
    pub error_tolerance: f32,

    /// The isotopic model to use
    #[arg(short = 'a', long = "isotopic-model", default_value = "peptide")]
    pub isotopic_model: ArgIsotopicModels,

    /// The minimum isotopic pattern fit score for MS1 spectra
    #[arg(short = 's', long = "ms1-score-threshold", default_value_t = 20.0)]
    pub ms1_score_threshold: ScoreType,

    /// The minimum isotopic pattern fit score for MSn spectra
    #[arg(short = 'S', long = "msn-score-threshold", default_value_t = 10.0)]
    pub msn_score_threshold: ScoreType,

    /// The maximum number of missed peaks for MS1 spectra
    #[arg(short = 'm', long = "max-missed-peaks", default_value_t = 1)]
    pub ms1_missed_peaks: u16,

    /// The maximum number of missed peaks for MSn spectra
    #[arg(short = 'M', long = "msn-max-missed-peaks", default_value_t = 1)]
    pub msn_missed_peaks: u16,

    /// The minimum signal-to-noise ratio for picking peaks from profile spectra
    #[arg(long = "signal-to-noise", default_value_t = 1.0)]
    pub signal_to_noise: f32,
}

impl MZCascader {
    /// Layer the configuration files and environment over the parsed arguments
    pub fn load_config(args: Self) -> Result<Self, figment::Error> {
        let mut config = Figment::from(Serialized::defaults(args.clone()));
        if let Some(path) = args.config_file.as_ref() {
            config = config.merge(Toml::file_exact(path));
        }
        config
            .merge(Toml::file("mzcascader.toml"))
            .merge(Env::prefixed("MZCASCADER_"))
            .extract()
    }

    pub fn cascade_params(&self) -> CascadeParams {
        CascadeParams::new(
            self.charge_range.low(),
            self.charge_range.high(),
            self.max_mass,
            self.max_ms_level,
            self.overlapped_scans.clone(),
            self.max_mass_count,
        )
    }

    pub fn engine_params(&self) -> EngineParams {
        EngineParams {
            error_tolerance: self.error_tolerance,
            ms1_score_threshold: self.ms1_score_threshold,
            msn_score_threshold: self.msn_score_threshold,
            ms1_missed_peaks: self.ms1_missed_peaks,
            msn_missed_peaks: self.msn_missed_peaks,
            charge_range: self.charge_range.into(),
            ..Default::default()
        }
    }

    fn load_spectra(&self) -> Result<Vec<CentroidedSpectrum>, MZCascaderError> {
        let reader: MZReaderType<fs::File, CPeak, DPeak> =
            MZReaderType::open_path(&self.input_file)
                .map_err(|e| MZCascaderError::InputOpenError(self.input_file.clone(), e))?;
        let signal_to_noise = self.signal_to_noise;
        let spectra: Vec<_> = reader
            .map(|s| CentroidedSpectrum::from_spectrum(s, signal_to_noise))
            .collect();
        debug!("Loaded {} spectra", spectra.len());
        Ok(spectra)
    }

    fn log_summary(&self, summary: &RunSummary) {
        for (level, counts) in summary.iter() {
            info!(
                "MS{level} Spectra: {} / with peak groups: {}",
                counts.spectra, counts.spectra_with_groups
            );
            info!("MS{level} Peak Groups: {}", counts.peak_groups);
        }
    }

    pub fn main(&self) -> Result<(), MZCascaderError> {
        info!(
            "mzcascader v{}",
            option_env!("CARGO_PKG_VERSION").unwrap_or("unknown")
        );
        info!("Input: {}", self.input_file);
        info!("Output: {}", self.output_file.display());
        if OutputFormat::infer_from_path(&self.output_file).is_none() {
            return Err(MZCascaderError::OutputFormatUnknown(
                self.output_file.display().to_string(),
            ));
        }
        let start = Instant::now();

        let spectra = self.load_spectra()?;
        let read_done = Instant::now();

        let averagine: Averagine = self.isotopic_model.into();
        let mut cascade = CascadeDeconvoluter::new(
            self.cascade_params(),
            EngineDeconvoluter::new(self.engine_params()),
        );
        let mut progress = LogProgress::default();
        let output = cascade.run_with_progress(&spectra, &averagine, &mut progress);
        self.log_summary(&output.summary);

        write_peak_groups(&self.output_file, &output.peak_groups, &spectra)?;

        let done = Instant::now();
        debug!("Reading Elapsed Time: {:0.3?}", read_done - start);
        info!("Total Elapsed Time: {:0.3?}", done - start);
        Ok(())
    }
}
