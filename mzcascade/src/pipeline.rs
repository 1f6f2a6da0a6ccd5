//! Drives a [`SpectrumDeconvoluter`] over a run of spectra spanning several MS levels
use tracing::{debug, trace, warn};

use crate::assembler::ResultAssembler;
use crate::deconv_traits::SpectrumDeconvoluter;
use crate::level::LevelContextStore;
use crate::params::CascadeParams;
use crate::progress::{NoProgress, ProgressReporter, RunSummary};
use crate::solution::PeakGroup;
use crate::spectrum::{SpectrumRef, SpectrumSource};

/// The deepest MS level present in `spectra`, capped at `ceiling`
pub fn current_max_ms_level<S: SpectrumSource>(spectra: &[S], ceiling: u8) -> u8 {
    spectra
        .iter()
        .map(|s| s.ms_level())
        .max()
        .unwrap_or_default()
        .min(ceiling)
}

/// Everything one run produced
#[derive(Debug, Default, Clone, PartialEq)]
pub struct CascadeOutput {
    /// Peak groups in input order, numbered and tied to their source spectra
    pub peak_groups: Vec<PeakGroup>,
    pub summary: RunSummary,
    /// The last spectrum index assigned, to continue numbering in a later run
    pub spectrum_index: u64,
    /// The last mass index assigned, to continue numbering in a later run
    pub mass_index: u64,
}

/// Deconvolves every spectrum of a run in order, carrying charge and mass context
/// from each MS level down to the next.
///
/// All per-level state is created fresh by each call to [`CascadeDeconvoluter::run`],
/// so a run's output depends only on its input and the deconvoluter.
#[derive(Debug, Clone)]
pub struct CascadeDeconvoluter<D> {
    params: CascadeParams,
    deconvoluter: D,
    spectrum_index_offset: u64,
    mass_index_offset: u64,
}

impl<D> CascadeDeconvoluter<D> {
    pub fn new(params: CascadeParams, deconvoluter: D) -> Self {
        Self {
            params,
            deconvoluter,
            spectrum_index_offset: 0,
            mass_index_offset: 0,
        }
    }

    /// Number spectra and peak groups after the given last-used indices
    pub fn with_index_offsets(mut self, spectrum_index: u64, mass_index: u64) -> Self {
        self.spectrum_index_offset = spectrum_index;
        self.mass_index_offset = mass_index;
        self
    }

    pub fn params(&self) -> &CascadeParams {
        &self.params
    }

    pub fn deconvoluter(&self) -> &D {
        &self.deconvoluter
    }

    pub fn deconvoluter_mut(&mut self) -> &mut D {
        &mut self.deconvoluter
    }

    pub fn into_deconvoluter(self) -> D {
        self.deconvoluter
    }

    pub fn run<S>(&mut self, spectra: &[S], averagine: &D::Averagine) -> CascadeOutput
    where
        S: SpectrumSource,
        D: SpectrumDeconvoluter<S>,
    {
        self.run_with_progress(spectra, averagine, &mut NoProgress)
    }

    pub fn run_with_progress<S, P>(
        &mut self,
        spectra: &[S],
        averagine: &D::Averagine,
        progress: &mut P,
    ) -> CascadeOutput
    where
        S: SpectrumSource,
        D: SpectrumDeconvoluter<S>,
        P: ProgressReporter,
    {
        let max_ms_level = current_max_ms_level(spectra, self.params.max_ms_level);
        debug!(
            "Processing {} spectra up to MS{max_ms_level} (ceiling MS{})",
            spectra.len(),
            self.params.max_ms_level
        );

        let mut store = LevelContextStore::new(max_ms_level, &self.params);
        let mut assembler =
            ResultAssembler::with_offsets(self.spectrum_index_offset, self.mass_index_offset);
        let mut summary = RunSummary::new();

        let total = spectra.len();
        for (position, spectrum) in spectra.iter().enumerate() {
            self.process_spectrum(
                SpectrumRef(position),
                spectrum,
                averagine,
                max_ms_level,
                &mut store,
                &mut assembler,
                &mut summary,
            );
            progress.report(position + 1, total);
        }

        CascadeOutput {
            spectrum_index: assembler.spectrum_index(),
            mass_index: assembler.mass_index(),
            peak_groups: assembler.into_inner(),
            summary,
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn process_spectrum<S>(
        &mut self,
        source: SpectrumRef,
        spectrum: &S,
        averagine: &D::Averagine,
        max_ms_level: u8,
        store: &mut LevelContextStore,
        assembler: &mut ResultAssembler,
        summary: &mut RunSummary,
    ) where
        S: SpectrumSource,
        D: SpectrumDeconvoluter<S>,
    {
        let ms_level = spectrum.ms_level();
        let Some(bounds) = store.resolve_bounds(ms_level, spectrum.precursor_windows()) else {
            trace!("Skipping spectrum {} at MS{ms_level}", source.position());
            return;
        };
        summary.level_mut(ms_level).spectra += 1;
        trace!(
            "Spectrum {} at MS{ms_level}: charges {:?}, max mass {:0.3} from {:?}",
            source.position(),
            bounds.params.as_charge_range(),
            bounds.params.max_mass,
            bounds.source,
        );

        if spectrum.is_empty() {
            return;
        }
        let Some(window) = store.window_mut(ms_level) else {
            return;
        };
        let groups = match self.deconvoluter.deconvolute_spectrum(
            spectrum,
            window,
            averagine,
            ms_level,
            &bounds.params,
        ) {
            Ok(groups) => groups,
            Err(err) => {
                warn!(
                    "Failed to deconvolve spectrum {} at MS{ms_level}: {err}",
                    source.position()
                );
                return;
            }
        };
        if groups.is_empty() {
            return;
        }

        if ms_level < max_ms_level {
            store.update_precursor_peaks(ms_level, &groups);
        }
        assembler.push_spectrum(source, ms_level, groups, summary);
    }
}
