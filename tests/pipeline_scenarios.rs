//! End-to-end pipeline scenarios.
//!
//! These tests run BOM rows through the whole pipeline and check the
//! per-sheet report rows and the project summary.

use fmeda_calc::fmeda::{
    AnalysisSettings, Asil, BomRow, ClassProfile, ComponentClass, ComponentLibrary, FailureMode,
    FaultClass, MechanismSet, MetricBasis, MetricValue, Pipeline, SafetyMechanism, SheetProfile,
    SheetResult, SheetTargets, Verdict,
};

/// Library with a single resistor profile: Ea 0.3 eV, open 70 %, drift 30 %.
fn resistor_library() -> ComponentLibrary {
    let mut library = ComponentLibrary::empty();
    library
        .insert_profile(
            ComponentClass::Resistor,
            ClassProfile::new(
                0.3,
                vec![FailureMode::new("open", 0.7), FailureMode::new("drift", 0.3)],
            ),
        )
        .expect("valid profile");
    library
}

fn resistor(designator: &str, sheet: &str, fit: f64, temperature: &str) -> BomRow {
    BomRow::new(designator, sheet)
        .with_class(ComponentClass::Resistor)
        .with_reference_fit(fit)
        .with_temperature(temperature)
}

fn result<'a>(report: &'a fmeda_calc::fmeda::FmedaReport, sheet: &str) -> &'a SheetResult {
    report
        .sheet(sheet)
        .expect("sheet present")
        .result
        .as_ref()
        .expect("sheet completed")
}

// =============================================================================
// Reference Scenarios
// =============================================================================

#[test]
fn test_single_resistor_without_mechanism() {
    let pipeline = Pipeline::new(AnalysisSettings::default(), resistor_library());
    let rows = vec![resistor("R1", "1", 10.0, "40")];

    let report = pipeline.run(&rows, &MechanismSet::empty(), &SheetTargets::new());
    let r = result(&report, "1");

    assert!((r.total_fit - 10.0).abs() < 1e-9);
    assert!((r.buckets.spf_residual - 10.0).abs() < 1e-9);
    assert_eq!(r.spfm, MetricValue::Applicable(0.0));
    assert_eq!(r.spfm_percent, "0.00%");
    assert_eq!(r.verdict, Verdict::FailSpfm);
}

#[test]
fn test_coverage_on_open_mode() {
    let pipeline = Pipeline::new(AnalysisSettings::default(), resistor_library());
    let rows = vec![resistor("R1", "1", 10.0, "40")];
    let mechanisms = MechanismSet::new(vec![SafetyMechanism::new("open-load detection", 0.99)
        .for_class(ComponentClass::Resistor)
        .for_mode("open")])
    .expect("valid mechanisms");

    let baseline = pipeline.run(&rows, &MechanismSet::empty(), &SheetTargets::new());
    let covered = pipeline.run(&rows, &mechanisms, &SheetTargets::new());
    let r = result(&covered, "1");

    // 7 FIT open at 99 % leaves 0.07; drift stays fully residual
    assert!((r.buckets.spf_residual - (0.07 + 3.0)).abs() < 1e-9);
    assert!((r.buckets.safe_covered - 6.93).abs() < 1e-9);
    assert!((r.total_fit - 10.0).abs() < 1e-9);

    let spfm = r.spfm.value().expect("applicable");
    let baseline_spfm = result(&baseline, "1").spfm.value().expect("applicable");
    assert!(spfm > baseline_spfm);
    assert!((spfm - 0.693).abs() < 1e-9);
}

#[test]
fn test_empty_sheet_is_not_applicable() {
    let pipeline = Pipeline::new(AnalysisSettings::default(), resistor_library());
    let rows = vec![resistor("R1", "1", 10.0, "40")];
    let targets = SheetTargets::new().with("2", SheetProfile::target(Asil::D));

    let report = pipeline.run(&rows, &MechanismSet::empty(), &targets);
    let r = result(&report, "2");

    assert!(r.total_fit.abs() < f64::EPSILON);
    assert_eq!(r.spfm, MetricValue::NotApplicable);
    assert_eq!(r.lfm, MetricValue::NotApplicable);
    assert_eq!(r.spfm_percent, "N/A");
    assert_eq!(r.verdict, Verdict::NotApplicable);
    assert_eq!(report.sheets.len(), 2);
    assert_eq!(report.summary.sheets_not_applicable, 1);
}

#[test]
fn test_malformed_row_isolates_sheet() {
    let pipeline = Pipeline::new(AnalysisSettings::default(), resistor_library());
    let rows = vec![
        resistor("R1", "1", 10.0, "40"),
        resistor("R2", "2", 5.0, "40"),
        resistor("R3", "2", 5.0, "N/A"),
        resistor("R4", "3", 1.0, "40"),
    ];
    let mechanisms =
        MechanismSet::new(vec![SafetyMechanism::new("monitor", 0.995)]).expect("valid mechanisms");

    let report = pipeline.run(&rows, &mechanisms, &SheetTargets::new());

    let failed = report.sheet("2").expect("sheet present");
    assert!(failed.result.is_none());
    let message = failed.error.as_deref().expect("error recorded");
    assert!(message.contains("Sheet '2'"));
    assert!(message.contains("row 3"));
    assert!(message.contains("N/A"));

    assert_eq!(result(&report, "1").verdict, Verdict::Pass);
    assert_eq!(result(&report, "3").verdict, Verdict::Pass);
    assert_eq!(report.summary.sheets_errored, 1);
    assert_eq!(report.summary.sheets_passed, 2);
    assert!(report.has_problems());
}

// =============================================================================
// Multi-Sheet Behaviour
// =============================================================================

#[test]
fn test_report_order_follows_first_appearance() {
    let pipeline = Pipeline::new(AnalysisSettings::default(), ComponentLibrary::builtin());
    let rows = vec![
        resistor("R1", "4.2.1", 1.0, "40"),
        resistor("R2", "4.1.1", 1.0, "40"),
        resistor("R3", "4.2.1", 1.0, "40"),
    ];
    let targets = SheetTargets::new()
        .with("4.1.1", SheetProfile::target(Asil::B))
        .with("5", SheetProfile::target(Asil::C));

    let report = pipeline.run(&rows, &MechanismSet::empty(), &targets);
    let order: Vec<&str> = report.sheets.iter().map(|s| s.sheet.as_str()).collect();

    assert_eq!(order, vec!["4.2.1", "4.1.1", "5"]);
    assert_eq!(report.sheets[0].target_asil, Asil::D);
    assert_eq!(report.sheets[1].target_asil, Asil::B);
    assert_eq!(report.sheets[2].target_asil, Asil::C);
}

#[test]
fn test_component_on_two_sheets_counts_on_both() {
    let pipeline = Pipeline::new(AnalysisSettings::default(), resistor_library());
    let rows = vec![resistor("R1", "1, 2", 4.0, "40")];

    let report = pipeline.run(&rows, &MechanismSet::empty(), &SheetTargets::new());

    assert!((result(&report, "1").total_fit - 4.0).abs() < 1e-9);
    assert!((result(&report, "2").total_fit - 4.0).abs() < 1e-9);
    assert!((report.summary.total_fit - 8.0).abs() < 1e-9);
}

#[test]
fn test_designator_list_counts_each_instance() {
    let pipeline = Pipeline::new(AnalysisSettings::default(), resistor_library());
    let rows = vec![resistor("R1_1, R1_2, R1_3", "1", 2.0, "40")];

    let report = pipeline.run(&rows, &MechanismSet::empty(), &SheetTargets::new());
    let r = result(&report, "1");

    assert_eq!(r.component_count, 3);
    assert_eq!(r.mode_count, 6);
    assert!((r.total_fit - 6.0).abs() < 1e-9);
}

#[test]
fn test_sheet_temperature_fills_blank_cells() {
    let pipeline = Pipeline::new(AnalysisSettings::default(), resistor_library());
    let rows = vec![BomRow::new("R1", "1").with_class("Resistor").with_reference_fit(10.0)];
    let targets = SheetTargets::new().with("1", SheetProfile::default().with_temperature(85.0));

    let report = pipeline.run(&rows, &MechanismSet::empty(), &targets);

    assert!(result(&report, "1").total_fit > 10.0);
}

#[test]
fn test_missing_class_profile_fails_sheet() {
    let pipeline = Pipeline::new(AnalysisSettings::default(), resistor_library());
    let rows = vec![
        BomRow::new("C1", "1")
            .with_class("Capacitor")
            .with_reference_fit(1.0)
            .with_temperature("40"),
        resistor("R1", "2", 1.0, "40"),
    ];

    let report = pipeline.run(&rows, &MechanismSet::empty(), &SheetTargets::new());

    let message = report.sheet("1").and_then(|s| s.error.as_deref()).expect("error");
    assert!(message.contains("Capacitor"));
    assert!(report.sheet("2").and_then(|s| s.result.as_ref()).is_some());
}

// =============================================================================
// Mechanism Rules and Metric Basis
// =============================================================================

#[test]
fn test_latent_faults_drive_lfm() {
    let mut library = ComponentLibrary::empty();
    library
        .insert_profile(
            ComponentClass::IcDigital,
            ClassProfile::new(
                0.4,
                vec![
                    FailureMode::new("loss of function", 0.5),
                    FailureMode::new("stuck bit", 0.5).classified(FaultClass::LatentMultiPoint),
                ],
            ),
        )
        .expect("valid profile");
    let pipeline = Pipeline::new(AnalysisSettings::default(), library);
    let rows = vec![BomRow::new("U1", "1")
        .with_class("IC_Digital")
        .with_reference_fit(100.0)
        .with_temperature("40")];
    let mechanisms = MechanismSet::new(vec![
        SafetyMechanism::new("lockstep", 0.995).for_mode("loss of function"),
        SafetyMechanism::new("memory test", 0.6).for_mode("stuck bit"),
    ])
    .expect("valid mechanisms");

    let report = pipeline.run(&rows, &mechanisms, &SheetTargets::new());
    let r = result(&report, "1");

    // LFM = 1 - 20 / (100 - 0.25 - 0)
    assert!((r.buckets.mpf_latent - 20.0).abs() < 1e-9);
    assert!((r.buckets.mpf_detected - 30.0).abs() < 1e-9);
    let lfm = r.lfm.value().expect("applicable");
    assert!((lfm - (1.0 - 20.0 / 99.75)).abs() < 1e-9);
    assert_eq!(r.verdict, Verdict::FailLfm);
    assert_eq!(r.highest_asil, Some(Asil::B));
}

#[test]
fn test_reclassified_safe_mode_leaves_spfm_denominator() {
    let settings = AnalysisSettings {
        metric_basis: MetricBasis::SafetyRelated,
        ..AnalysisSettings::default()
    };
    let pipeline = Pipeline::new(settings, resistor_library());
    let rows = vec![resistor("R1", "1", 10.0, "40")];
    let mechanisms = MechanismSet::new(vec![
        SafetyMechanism::new("drift harmless", 0.0)
            .for_mode("drift")
            .reclassify(FaultClass::Safe),
        SafetyMechanism::new("open-load detection", 0.99).for_mode("open"),
    ])
    .expect("valid mechanisms");

    let report = pipeline.run(&rows, &mechanisms, &SheetTargets::new());
    let r = result(&report, "1");

    // SPFM = 1 - 0.07 / (10 - 3)
    assert!((r.buckets.safe - 3.0).abs() < 1e-9);
    let spfm = r.spfm.value().expect("applicable");
    assert!((spfm - 0.99).abs() < 1e-9);
}

#[test]
fn test_lfm_not_applicable_for_safe_and_single_point_sheet() {
    let pipeline = Pipeline::new(AnalysisSettings::default(), resistor_library());
    let rows = vec![resistor("R1", "1", 1.0, "40")];
    let mechanisms = MechanismSet::new(vec![SafetyMechanism::new("drift harmless", 0.0)
        .for_mode("drift")
        .reclassify(FaultClass::Safe)])
    .expect("valid mechanisms");

    let report = pipeline.run(&rows, &mechanisms, &SheetTargets::new());
    let r = result(&report, "1");

    assert!((r.buckets.safe - 0.3).abs() < 1e-12);
    assert!((r.buckets.spf_residual - 0.7).abs() < 1e-12);
    assert_eq!(r.lfm, MetricValue::NotApplicable);
    assert_eq!(r.lfm_percent, "N/A");
    assert_eq!(r.verdict, Verdict::FailSpfm);
}

#[test]
fn test_parallel_and_sequential_reports_match() {
    let rows: Vec<BomRow> = (0..200)
        .map(|i| {
            resistor(
                &format!("R{i}"),
                &format!("4.{}.1", i % 13),
                0.1 + f64::from(i % 17),
                &format!("{}", 25 + i % 60),
            )
        })
        .collect();
    let mechanisms = MechanismSet::new(vec![
        SafetyMechanism::new("a", 0.9).on_sheet("4.3.1"),
        SafetyMechanism::new("b", 0.99).for_mode("open"),
    ])
    .expect("valid mechanisms");

    let parallel = Pipeline::new(AnalysisSettings::default(), resistor_library());
    let sequential = Pipeline::new(
        AnalysisSettings {
            parallel: false,
            ..AnalysisSettings::default()
        },
        resistor_library(),
    );

    let a = parallel.run(&rows, &mechanisms, &SheetTargets::new());
    let b = sequential.run(&rows, &mechanisms, &SheetTargets::new());
    assert_eq!(a, b);
    assert_eq!(a.sheets.len(), 13);
}
