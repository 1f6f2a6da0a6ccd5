use std::fs;
use std::io::{self, prelude::*};
use std::path::Path;

use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use mzcascade::PeakGroup;

use crate::driver::MZCascaderError;
use crate::spectrum::CentroidedSpectrum;

/// The tabular layouts peak groups can be written in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Tsv,
    Json,
}

impl OutputFormat {
    /// Infer the format and whether to gzip from a path's extensions, `-` meaning
    /// uncompressed TSV on STDOUT
    pub fn infer_from_path(path: &Path) -> Option<(Self, bool)> {
        if path == Path::new("-") {
            return Some((Self::Tsv, false));
        }
        let name = path.file_name()?.to_string_lossy().to_lowercase();
        let (stem, compressed) = match name.strip_suffix(".gz") {
            Some(stem) => (stem, true),
            None => (name.as_str(), false),
        };
        let ext = stem.rsplit_once('.').map(|(_, ext)| ext)?;
        let format = match ext {
            "tsv" | "txt" => Self::Tsv,
            "json" | "jsonl" => Self::Json,
            _ => return None,
        };
        Some((format, compressed))
    }
}

/// One row of output describing a single peak group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeakGroupRow {
    pub mass_index: u64,
    pub spectrum_index: u64,
    pub spectrum_id: String,
    pub scan_index: Option<usize>,
    pub ms_level: u8,
    pub start_time: Option<f64>,
    pub monoisotopic_mass: f64,
    pub nominal_mass: i64,
    pub intensity: f32,
    pub score: f32,
    pub min_charge: Option<i32>,
    pub max_charge: Option<i32>,
    pub peak_count: usize,
    pub group_count: usize,
}

impl PeakGroupRow {
    pub fn new(group: &PeakGroup, spectra: &[CentroidedSpectrum]) -> Self {
        let source = group.source_spectrum(spectra);
        let (min_charge, max_charge) = match group.charge_range() {
            Some((lo, hi)) => (Some(lo), Some(hi)),
            None => (None, None),
        };
        Self {
            mass_index: group.mass_index,
            spectrum_index: group.spectrum_index,
            spectrum_id: source.map(|s| s.id.clone()).unwrap_or_default(),
            scan_index: source.map(|s| s.index),
            ms_level: group.ms_level,
            start_time: source.map(|s| s.start_time),
            monoisotopic_mass: group.monoisotopic_mass,
            nominal_mass: group.nominal_mass(),
            intensity: group.total_intensity(),
            score: group.score,
            min_charge,
            max_charge,
            peak_count: group.len(),
            group_count: group.group_count,
        }
    }
}

pub(crate) fn write_rows<W: Write>(
    writer: W,
    format: OutputFormat,
    rows: impl IntoIterator<Item = PeakGroupRow>,
) -> Result<W, MZCascaderError> {
    match format {
        OutputFormat::Tsv => {
            let mut tsv = csv::WriterBuilder::new()
                .delimiter(b'\t')
                .from_writer(writer);
            for row in rows {
                tsv.serialize(row)?;
            }
            tsv.flush()?;
            Ok(tsv.into_inner().map_err(|e| e.into_error())?)
        }
        OutputFormat::Json => {
            let mut writer = writer;
            for row in rows {
                serde_json::to_writer(&mut writer, &row)?;
                writer.write_all(b"\n")?;
            }
            Ok(writer)
        }
    }
}

/// Write one row per peak group to `path`, or to STDOUT if it is `-`
pub fn write_peak_groups(
    path: &Path,
    groups: &[PeakGroup],
    spectra: &[CentroidedSpectrum],
) -> Result<(), MZCascaderError> {
    let (format, compressed) = OutputFormat::infer_from_path(path)
        .ok_or_else(|| MZCascaderError::OutputFormatUnknown(path.display().to_string()))?;
    debug!("Writing {format:?} output (compressed? {compressed})");
    let rows = groups.iter().map(|g| PeakGroupRow::new(g, spectra));

    if path == Path::new("-") {
        let mut handle = write_rows(io::stdout().lock(), format, rows)?;
        handle.flush()?;
    } else {
        let handle = io::BufWriter::new(fs::File::create(path)?);
        if compressed {
            let encoder = GzEncoder::new(handle, Compression::best());
            write_rows(encoder, format, rows)?.finish()?.flush()?;
        } else {
            write_rows(handle, format, rows)?.flush()?;
        }
    }
    info!("Wrote {} peak groups to {}", groups.len(), path.display());
    Ok(())
}
