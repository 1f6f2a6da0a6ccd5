use std::collections::{HashMap, HashSet};

use mzcascade::{
    deconvolute_run, CascadeDeconvoluter, CascadeParams, DeconvolutionError,
    DeconvolutionParams, GroupPeak, LevelCounts, MassBinSet, MassBinWindow, PeakGroup,
    PrecursorWindow, SpectrumDeconvoluter, SpectrumRef, SpectrumSource,
};

#[derive(Debug, Clone)]
struct TestSpectrum {
    id: usize,
    ms_level: u8,
    peaks: Vec<(f64, f32)>,
    windows: Vec<PrecursorWindow>,
}

impl TestSpectrum {
    fn ms1(id: usize) -> Self {
        Self {
            id,
            ms_level: 1,
            peaks: vec![(500.0, 100.0)],
            windows: Vec::new(),
        }
    }

    fn msn(id: usize, ms_level: u8, windows: Vec<PrecursorWindow>) -> Self {
        Self {
            id,
            ms_level,
            peaks: vec![(300.0, 50.0)],
            windows,
        }
    }

    fn empty(mut self) -> Self {
        self.peaks.clear();
        self
    }
}

impl SpectrumSource for TestSpectrum {
    fn ms_level(&self) -> u8 {
        self.ms_level
    }

    fn peak_count(&self) -> usize {
        self.peaks.len()
    }

    fn precursor_windows(&self) -> impl Iterator<Item = PrecursorWindow> + '_ {
        self.windows.iter().copied()
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Call {
    id: usize,
    ms_level: u8,
    params: DeconvolutionParams,
    window_len: usize,
    window_capacity: usize,
}

/// Returns canned peak groups by spectrum id and records what it was asked to do
#[derive(Debug, Default, Clone)]
struct ScriptedDeconvoluter {
    outputs: HashMap<usize, Vec<PeakGroup>>,
    failures: HashSet<usize>,
    calls: Vec<Call>,
}

impl ScriptedDeconvoluter {
    fn with_output(mut self, id: usize, groups: Vec<PeakGroup>) -> Self {
        self.outputs.insert(id, groups);
        self
    }

    fn failing_on(mut self, id: usize) -> Self {
        self.failures.insert(id);
        self
    }

    fn call_for(&self, id: usize) -> Option<&Call> {
        self.calls.iter().find(|c| c.id == id)
    }
}

impl SpectrumDeconvoluter<TestSpectrum> for ScriptedDeconvoluter {
    type Averagine = ();

    fn deconvolute_spectrum(
        &mut self,
        spectrum: &TestSpectrum,
        window: &mut MassBinWindow,
        _averagine: &Self::Averagine,
        ms_level: u8,
        params: &DeconvolutionParams,
    ) -> Result<Vec<PeakGroup>, DeconvolutionError> {
        self.calls.push(Call {
            id: spectrum.id,
            ms_level,
            params: *params,
            window_len: window.len(),
            window_capacity: window.capacity(),
        });
        if self.failures.contains(&spectrum.id) {
            return Err(DeconvolutionError::Failed(format!("spectrum {}", spectrum.id)));
        }
        let groups = self.outputs.get(&spectrum.id).cloned().unwrap_or_default();
        if let Some(bins) =
            MassBinSet::from_masses(groups.iter().map(|g| g.monoisotopic_mass), 1e-5)
        {
            window.push(bins);
        }
        Ok(groups)
    }
}

fn group(mass: f64, peaks: &[(f64, f32, i32)]) -> PeakGroup {
    PeakGroup::new(
        mass,
        1.0,
        peaks
            .iter()
            .map(|(mz, intensity, charge)| GroupPeak::new(*mz, *intensity, *charge))
            .collect(),
    )
}

fn window(start: f64, end: f64) -> PrecursorWindow {
    let mz = (start + end) / 2.0;
    PrecursorWindow::new(mz, mz - start, end - mz)
}

fn run(
    spectra: &[TestSpectrum],
    deconvoluter: ScriptedDeconvoluter,
    params: CascadeParams,
) -> (mzcascade::CascadeOutput, ScriptedDeconvoluter) {
    let mut driver = CascadeDeconvoluter::new(params, deconvoluter);
    let output = driver.run(spectra, &());
    (output, driver.into_deconvoluter())
}

#[test_log::test]
fn test_precursor_context_reaches_ms2() {
    let spectra = vec![
        TestSpectrum::ms1(0),
        TestSpectrum::msn(1, 2, vec![window(500.0, 502.0)]),
    ];
    let deconvoluter = ScriptedDeconvoluter::default()
        .with_output(0, vec![group(5000.2, &[(501.03, 250.0, 10)])])
        .with_output(1, vec![group(1200.0, &[(601.0, 20.0, 2)])]);
    let (output, deconvoluter) = run(&spectra, deconvoluter, CascadeParams::default());

    let call = deconvoluter.call_for(1).unwrap();
    assert_eq!(call.ms_level, 2);
    assert_eq!(call.params.charge_range, 10 - 1);
    assert_eq!(call.params.max_mass, 5000.2 + 100.0);
    assert_eq!(call.params.min_charge, 1);

    assert_eq!(output.peak_groups.len(), 2);
    assert_eq!(output.peak_groups[1].source, Some(SpectrumRef(1)));
}

#[test_log::test]
fn test_ms1_uses_defaults() {
    let params = CascadeParams::new(2, 40, 20000.0, 3, vec![4, 2], Some(7));
    let mut decoy = TestSpectrum::ms1(2);
    decoy.windows.push(window(500.0, 502.0));
    let spectra = vec![
        TestSpectrum::ms1(0),
        TestSpectrum::msn(1, 2, vec![window(500.0, 502.0)]),
        decoy,
    ];
    let deconvoluter = ScriptedDeconvoluter::default()
        .with_output(0, vec![group(5000.2, &[(501.03, 250.0, 10)])])
        .with_output(1, vec![group(1200.0, &[(501.0, 20.0, 2)])]);
    let (_, deconvoluter) = run(&spectra, deconvoluter, params.clone());

    let defaults = params.default_deconvolution_params();
    assert_eq!(deconvoluter.call_for(0).unwrap().params, defaults);
    assert_eq!(deconvoluter.call_for(2).unwrap().params, defaults);
    assert_eq!(defaults.as_charge_range(), (2, 40));

    let ms2 = deconvoluter.call_for(1).unwrap();
    assert_eq!(ms2.params.charge_range, 8);
    assert_eq!(ms2.params.max_mass_count, Some(7));
}

#[test_log::test]
fn test_unmatched_precursor_reuses_fallback() {
    let spectra = vec![
        TestSpectrum::ms1(0),
        // No MS1 peak falls in this window
        TestSpectrum::msn(1, 2, vec![window(900.0, 901.0)]),
        TestSpectrum::msn(2, 2, vec![window(500.0, 502.0)]),
        TestSpectrum::msn(3, 2, vec![window(900.0, 901.0)]),
        TestSpectrum::msn(4, 2, Vec::new()),
    ];
    let deconvoluter = ScriptedDeconvoluter::default()
        .with_output(0, vec![group(5000.2, &[(501.03, 250.0, 10)])]);
    let params = CascadeParams::default();
    let (_, deconvoluter) = run(&spectra, deconvoluter, params.clone());

    assert_eq!(
        deconvoluter.call_for(1).unwrap().params,
        params.default_deconvolution_params()
    );
    let resolved = deconvoluter.call_for(2).unwrap().params;
    assert_eq!(resolved.max_mass, 5000.2 + 100.0);
    assert_eq!(deconvoluter.call_for(3).unwrap().params, resolved);
    assert_eq!(deconvoluter.call_for(4).unwrap().params, resolved);
}

#[test_log::test]
fn test_most_intense_candidate_wins() {
    let spectra = vec![
        TestSpectrum::ms1(0),
        TestSpectrum::msn(1, 2, vec![window(500.0, 502.0), window(700.0, 701.0)]),
    ];
    let deconvoluter = ScriptedDeconvoluter::default().with_output(
        0,
        vec![
            group(5000.2, &[(501.03, 250.0, 10)]),
            group(3500.0, &[(700.5, 900.0, 5)]),
            group(1500.0, &[(501.5, 240.0, 3)]),
        ],
    );
    let (_, deconvoluter) = run(&spectra, deconvoluter, CascadeParams::default());
    let call = deconvoluter.call_for(1).unwrap();
    assert_eq!(call.params.charge_range, 4);
    assert_eq!(call.params.max_mass, 3600.0);
}

#[test_log::test]
fn test_levels_only_consult_their_parent() {
    let spectra = vec![
        TestSpectrum::ms1(0),
        TestSpectrum::msn(1, 2, vec![window(500.0, 502.0)]),
        TestSpectrum::msn(2, 3, vec![window(500.0, 502.0)]),
        TestSpectrum::msn(3, 3, vec![window(750.5, 751.5)]),
    ];
    let deconvoluter = ScriptedDeconvoluter::default()
        .with_output(0, vec![group(5000.2, &[(501.03, 250.0, 10)])])
        .with_output(1, vec![group(1500.0, &[(751.0, 40.0, 2)])]);
    let params = CascadeParams::default();
    let (output, deconvoluter) = run(&spectra, deconvoluter, params.clone());

    assert_eq!(
        deconvoluter.call_for(2).unwrap().params,
        params.default_deconvolution_params()
    );
    let ms3 = deconvoluter.call_for(3).unwrap();
    assert_eq!(ms3.params.charge_range, 1);
    assert_eq!(ms3.params.max_mass, 1600.0);
    assert_eq!(output.summary.level(3).spectra, 2);
    assert_eq!(output.summary.level(3).spectra_with_groups, 0);
}

#[test_log::test]
fn test_parent_index_is_replaced() {
    let spectra = vec![
        TestSpectrum::ms1(0),
        TestSpectrum::ms1(1),
        TestSpectrum::msn(2, 2, vec![window(500.0, 502.0)]),
    ];
    let deconvoluter = ScriptedDeconvoluter::default()
        .with_output(0, vec![group(5000.2, &[(501.03, 250.0, 10)])])
        .with_output(1, vec![group(3000.0, &[(601.0, 250.0, 5)])]);
    let params = CascadeParams::default();
    let (_, deconvoluter) = run(&spectra, deconvoluter, params.clone());
    assert_eq!(
        deconvoluter.call_for(2).unwrap().params,
        params.default_deconvolution_params()
    );
}

#[test_log::test]
fn test_empty_spectra_leave_state_alone() {
    let spectra = vec![
        TestSpectrum::ms1(0),
        TestSpectrum::ms1(1).empty(),
        TestSpectrum::ms1(2),
        TestSpectrum::msn(3, 2, vec![window(500.0, 502.0)]),
    ];
    // Spectrum 2 finds nothing, which must not clear what spectrum 0 left behind
    let deconvoluter = ScriptedDeconvoluter::default()
        .with_output(0, vec![group(5000.2, &[(501.03, 250.0, 10)])])
        .with_output(1, vec![group(3000.0, &[(601.0, 250.0, 5)])]);
    let (output, deconvoluter) = run(&spectra, deconvoluter, CascadeParams::default());

    assert!(deconvoluter.call_for(1).is_none());
    assert_eq!(deconvoluter.call_for(3).unwrap().params.max_mass, 5100.2);
    assert_eq!(deconvoluter.call_for(2).unwrap().window_len, 1);

    let ms1 = output.summary.level(1);
    assert_eq!(ms1.spectra, 3);
    assert_eq!(ms1.spectra_with_groups, 1);
    assert_eq!(ms1.peak_groups, 1);
    assert!(output
        .peak_groups
        .iter()
        .all(|g| g.source != Some(SpectrumRef(1))));
}

#[test_log::test]
fn test_indices_are_global_and_increasing() {
    let spectra = vec![
        TestSpectrum::ms1(0),
        TestSpectrum::msn(1, 2, vec![window(500.0, 502.0)]),
        TestSpectrum::msn(2, 2, vec![window(500.0, 502.0)]),
        TestSpectrum::ms1(3),
        TestSpectrum::msn(4, 2, vec![window(500.0, 502.0)]),
    ];
    let deconvoluter = ScriptedDeconvoluter::default()
        .with_output(
            0,
            vec![
                group(5000.2, &[(501.03, 250.0, 10)]),
                group(2000.0, &[(401.0, 50.0, 5)]),
            ],
        )
        .with_output(1, vec![group(800.0, &[(401.0, 50.0, 2)])])
        .with_output(3, vec![group(4000.0, &[(501.0, 250.0, 8)])])
        .with_output(
            4,
            vec![
                group(900.0, &[(451.0, 10.0, 2)]),
                group(950.0, &[(476.0, 10.0, 2)]),
                group(990.0, &[(496.0, 10.0, 2)]),
            ],
        );
    let (output, _) = run(&spectra, deconvoluter, CascadeParams::default());

    let mass_indices: Vec<u64> = output.peak_groups.iter().map(|g| g.mass_index).collect();
    assert_eq!(mass_indices, vec![1, 2, 3, 4, 5, 6, 7]);
    let spectrum_indices: Vec<u64> = output
        .peak_groups
        .iter()
        .map(|g| g.spectrum_index)
        .collect();
    assert_eq!(spectrum_indices, vec![1, 1, 2, 3, 4, 4, 4]);
    let group_counts: Vec<usize> = output.peak_groups.iter().map(|g| g.group_count).collect();
    assert_eq!(group_counts, vec![2, 2, 1, 1, 3, 3, 3]);
    let sources: Vec<usize> = output
        .peak_groups
        .iter()
        .filter_map(|g| g.source.map(|s| s.position()))
        .collect();
    assert_eq!(sources, vec![0, 0, 1, 3, 4, 4, 4]);
    assert_eq!(output.spectrum_index, 4);
    assert_eq!(output.mass_index, 7);

    let source = output.peak_groups[2].source_spectrum(&spectra).unwrap();
    assert_eq!(source.id, 1);
    assert_eq!(output.summary.total().peak_groups, 7);
}

#[test_log::test]
fn test_index_offsets_continue_numbering() {
    let spectra = vec![TestSpectrum::ms1(0)];
    let deconvoluter = ScriptedDeconvoluter::default().with_output(
        0,
        vec![group(1000.0, &[(501.0, 1.0, 2)]), group(1100.0, &[(551.0, 1.0, 2)])],
    );
    let mut driver =
        CascadeDeconvoluter::new(CascadeParams::default(), deconvoluter).with_index_offsets(5, 20);
    let output = driver.run(&spectra, &());
    assert_eq!(output.peak_groups[0].spectrum_index, 6);
    assert_eq!(output.peak_groups[0].mass_index, 21);
    assert_eq!(output.peak_groups[1].mass_index, 22);
}

#[test_log::test]
fn test_ceiling_skips_deeper_levels() {
    let spectra = vec![
        TestSpectrum::ms1(0),
        TestSpectrum::msn(1, 2, vec![window(500.0, 502.0)]),
        TestSpectrum::msn(2, 3, vec![window(500.0, 502.0)]),
    ];
    let deconvoluter = ScriptedDeconvoluter::default()
        .with_output(0, vec![group(5000.2, &[(501.03, 250.0, 10)])])
        .with_output(1, vec![group(1000.0, &[(501.0, 1.0, 2)])])
        .with_output(2, vec![group(1000.0, &[(501.0, 1.0, 2)])]);
    let mut params = CascadeParams::default();
    params.max_ms_level = 2;
    let (output, deconvoluter) = run(&spectra, deconvoluter, params.clone());

    assert!(deconvoluter.call_for(2).is_none());
    assert_eq!(output.summary.level(3), LevelCounts::default());
    assert_eq!(output.summary.max_ms_level(), 2);
    assert_eq!(output.peak_groups.len(), 2);

    params.max_ms_level = 0;
    let (output, deconvoluter) = run(&spectra, ScriptedDeconvoluter::default(), params);
    assert!(output.peak_groups.is_empty());
    assert!(deconvoluter.calls.is_empty());
    assert_eq!(output.summary.total(), LevelCounts::default());
}

#[test_log::test]
fn test_level_zero_is_ignored() {
    let mut odd = TestSpectrum::ms1(1);
    odd.ms_level = 0;
    let spectra = vec![TestSpectrum::ms1(0), odd];
    let deconvoluter = ScriptedDeconvoluter::default()
        .with_output(1, vec![group(1000.0, &[(501.0, 1.0, 2)])]);
    let (output, deconvoluter) = run(&spectra, deconvoluter, CascadeParams::default());
    assert!(deconvoluter.call_for(1).is_none());
    assert_eq!(output.summary.level(1).spectra, 1);
    assert!(output.peak_groups.is_empty());
}

#[test_log::test]
fn test_failures_are_absorbed() {
    let spectra = vec![
        TestSpectrum::ms1(0),
        TestSpectrum::ms1(1),
        TestSpectrum::msn(2, 2, vec![window(500.0, 502.0)]),
    ];
    let deconvoluter = ScriptedDeconvoluter::default()
        .with_output(0, vec![group(5000.2, &[(501.03, 250.0, 10)])])
        .with_output(1, vec![group(3000.0, &[(501.5, 250.0, 5)])])
        .failing_on(1);
    let (output, deconvoluter) = run(&spectra, deconvoluter, CascadeParams::default());

    assert_eq!(output.summary.level(1).spectra, 2);
    assert_eq!(output.summary.level(1).spectra_with_groups, 1);
    assert_eq!(output.peak_groups.len(), 1);
    assert_eq!(deconvoluter.call_for(2).unwrap().params.max_mass, 5100.2);
}

#[test_log::test]
fn test_overlap_windows_are_bounded() {
    let spectra: Vec<TestSpectrum> = (0..6)
        .map(|i| {
            if i % 2 == 0 {
                TestSpectrum::ms1(i)
            } else {
                TestSpectrum::msn(i, 2, Vec::new())
            }
        })
        .collect();
    let mut deconvoluter = ScriptedDeconvoluter::default();
    for i in 0..6 {
        deconvoluter = deconvoluter.with_output(i, vec![group(1000.0 + i as f64, &[(501.0, 1.0, 2)])]);
    }
    let params = CascadeParams::new(1, 30, 50000.0, 3, vec![2], None);
    let (_, deconvoluter) = run(&spectra, deconvoluter, params);

    for call in deconvoluter.calls.iter() {
        assert_eq!(call.window_capacity, 2);
        assert!(call.window_len <= 2);
    }
    let ms1_lens: Vec<usize> = deconvoluter
        .calls
        .iter()
        .filter(|c| c.ms_level == 1)
        .map(|c| c.window_len)
        .collect();
    assert_eq!(ms1_lens, vec![0, 1, 2]);
}

#[test_log::test]
fn test_rerun_is_identical() {
    let spectra = vec![
        TestSpectrum::ms1(0),
        TestSpectrum::msn(1, 2, vec![window(500.0, 502.0)]),
        TestSpectrum::msn(2, 3, vec![window(600.0, 602.0)]),
        TestSpectrum::ms1(3),
        TestSpectrum::msn(4, 2, vec![window(900.0, 902.0)]),
    ];
    let deconvoluter = ScriptedDeconvoluter::default()
        .with_output(
            0,
            vec![
                group(5000.2, &[(501.03, 250.0, 10), (455.57, 120.0, 11)]),
                group(2500.0, &[(501.03, 90.0, 5)]),
            ],
        )
        .with_output(1, vec![group(1200.0, &[(601.0, 20.0, 2)])])
        .with_output(2, vec![group(300.0, &[(301.0, 20.0, 1)])])
        .with_output(3, vec![group(4500.0, &[(901.0, 20.0, 5)])])
        .with_output(4, vec![group(700.0, &[(351.0, 20.0, 2)])]);

    let first = deconvolute_run(&spectra, deconvoluter.clone(), &(), CascadeParams::default());
    let second = deconvolute_run(&spectra, deconvoluter, &(), CascadeParams::default());
    assert_eq!(first, second);
    assert_eq!(first.peak_groups.len(), 6);
}

#[test_log::test]
fn test_progress_is_reported_per_spectrum() {
    let spectra = vec![
        TestSpectrum::ms1(0),
        TestSpectrum::msn(1, 4, Vec::new()),
        TestSpectrum::ms1(2).empty(),
    ];
    let mut seen = Vec::new();
    let mut progress = |done: usize, total: usize| seen.push((done, total));
    let mut driver = CascadeDeconvoluter::new(CascadeParams::default(), ScriptedDeconvoluter::default());
    driver.run_with_progress(&spectra, &(), &mut progress);
    assert_eq!(seen, vec![(1, 3), (2, 3), (3, 3)]);
}

#[test_log::test]
fn test_closure_deconvoluter() {
    let spectra = vec![TestSpectrum::ms1(0), TestSpectrum::ms1(1).empty()];
    let deconvoluter = |spectrum: &TestSpectrum,
                        _window: &mut MassBinWindow,
                        _ms_level: u8,
                        params: &DeconvolutionParams|
     -> Result<Vec<PeakGroup>, DeconvolutionError> {
        let (mz, intensity) = spectrum.peaks[0];
        Ok(vec![group(params.max_mass.min(mz * 2.0), &[(mz, intensity, 2)])])
    };
    let output = deconvolute_run(&spectra, deconvoluter, &(), CascadeParams::default());
    assert_eq!(output.peak_groups.len(), 1);
    assert_eq!(output.peak_groups[0].monoisotopic_mass, 1000.0);
}
