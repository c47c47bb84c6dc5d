use std::fs;
use std::path::PathBuf;

use tempfile::{tempdir, TempDir};

use inpband::parser::abaqus::abaqus_inp::AbaqusInpParser;
use inpband::parser::abaqus::deck::InpDeck;
use inpband::pipeline::{run_batch, run_site, RunOptions};
use inpband::writer::inp_patch::{AnchorStatus, PatchOutcome};
use inpband::{PatchError, PipelineError, Point, Settings, Site};

/// Column of 21 nodes on z = -10..=10 in part CORD, plus one node at z = 11
fn cord_deck() -> String {
    let mut deck = String::from("*Heading\n** Job name: Job-1 Model name: Model-1\n*Part, name=CORD\n*Node\n");
    for i in 0..=21 {
        deck.push_str(&format!("{:7}, {:12}, {:12}, {:12}\n", i + 1, "0.", "0.", format!("{}.", i as i64 - 10)));
    }
    deck.push_str(
        "*End Part\n\
         **\n\
         ** ASSEMBLY\n\
         **\n\
         *Assembly, name=Assembly\n\
         **\n\
         *Instance, name=PART-1_1-1, part=CORD\n\
         *End Instance\n\
         **\n\
         *End Assembly\n\
         ** ----------------------------------------------------------------\n\
         **\n\
         ** STEP: Preload\n\
         **\n\
         *Step, name=Preload, nlgeom=NO\n\
         *Static\n\
         1., 1., 1e-05, 1.\n\
         **\n\
         ** PREDEFINED FIELDS\n\
         **\n\
         *End Step\n",
    );
    deck
}

fn write_deck(dir: &TempDir, text: &str) -> PathBuf {
    let path = dir.path().join("Job-1.inp");
    fs::write(&path, text).unwrap();
    path
}

fn z_site(name: &str) -> Site {
    Site::new(name, Point::new(0.0, 0.0, 0.0), Point::new(0.0, 0.0, 10.0), Point::new(0.0, 0.0, -10.0))
}

#[test]
fn single_site_patches_deck_once() {
    let dir = tempdir().unwrap();
    let path = write_deck(&dir, &cord_deck());
    let settings = Settings::default();

    let report = run_site(&path, &z_site("FIELD_BAND"), &settings, &RunOptions::default()).unwrap();
    let classification = &report.bands.classification;
    assert_eq!(classification.outside, 1);
    assert_eq!(classification.classified(), 21);
    // |z| = 0, 1 -> band 0: labels 10, 11, 12
    assert_eq!(classification.band(0), &[10, 11, 12]);
    // |z| = 8, 9, 10 with the closed edge
    assert_eq!(classification.band(4), &[1, 2, 3, 19, 20, 21]);
    match &report.outcome {
        Some(PatchOutcome::Written(patch)) => {
            assert_eq!(patch.node_sets, AnchorStatus::Inserted { records: 5 });
            assert!(patch.problems().is_empty());
        }
        other => panic!("unexpected outcome {:?}", other),
    }

    let first = fs::read_to_string(&path).unwrap();
    assert!(first.contains("*Nset, nset=FIELD_BAND_1, instance=PART-1_1-1\n 10, 11, 12\n"));
    assert!(first.contains("FIELD_BAND_2, 0.128\n"));
    assert!(first.contains("FIELD_BAND_5, 0.000\n"));
    assert!(first.starts_with("*Heading\n** Job name: Job-1 Model name: Model-1\n*Part, name=CORD\n"));

    let again = run_site(&path, &z_site("FIELD_BAND"), &settings, &RunOptions::default()).unwrap();
    assert!(matches!(again.outcome, Some(PatchOutcome::DuplicateSkipped(_))));
    assert_eq!(fs::read_to_string(&path).unwrap(), first);
}

#[test]
fn patched_deck_sets_read_back() {
    let dir = tempdir().unwrap();
    let path = write_deck(&dir, &cord_deck());
    run_site(&path, &z_site("FIELD_BAND"), &Settings::default(), &RunOptions::default()).unwrap();

    let deck = InpDeck::parse(&fs::read_to_string(&path).unwrap());
    assert_eq!(AbaqusInpParser::node_set_labels(&deck, "FIELD_BAND_3").unwrap(), vec![6, 7, 15, 16]);
}

#[test]
fn dry_run_leaves_deck_untouched() {
    let dir = tempdir().unwrap();
    let text = cord_deck();
    let path = write_deck(&dir, &text);
    let options = RunOptions { dry_run: true, vtu_output: Some(dir.path().join("bands.vtu")) };

    let report = run_site(&path, &z_site("FIELD_BAND"), &Settings::default(), &options).unwrap();
    assert!(report.outcome.is_none());
    assert_eq!(fs::read_to_string(&path).unwrap(), text);
    assert!(dir.path().join("bands.vtu").exists());
}

#[test]
fn missing_anchor_is_partial_success() {
    let dir = tempdir().unwrap();
    let path = write_deck(&dir, &cord_deck().replace("** PREDEFINED FIELDS\n", ""));

    let report = run_site(&path, &z_site("FIELD_BAND"), &Settings::default(), &RunOptions::default()).unwrap();
    let patch = match report.outcome {
        Some(PatchOutcome::Written(patch)) => patch,
        other => panic!("unexpected outcome {:?}", other),
    };
    assert!(patch.node_sets.is_inserted());
    assert!(!patch.predefined_fields.is_inserted());

    let text = fs::read_to_string(&path).unwrap();
    assert!(text.contains("*Nset, nset=FIELD_BAND_1"));
    assert!(!text.contains("*Temperature"));
}

#[test]
fn batch_continues_past_bad_sites() {
    let dir = tempdir().unwrap();
    let path = write_deck(&dir, &cord_deck());
    let sites = dir.path().join("coordinates.csv");
    fs::write(
        &sites,
        "site_name,center_x,center_y,center_z,upper_x,upper_y,upper_z,lower_x,lower_y,lower_z\n\
         C5,0,0,0,0,0,10,0,0,-10\n\
         short,0,0\n\
         flat,0,0,0,0,0,1,0,0,1\n\
         C6 low,0,0,-5,0,0,0,0,0,-10\n",
    )
    .unwrap();

    let batch = run_batch(&path, &sites, &Settings::default(), &RunOptions::default()).unwrap();
    assert_eq!(batch.warnings.len(), 1);
    assert_eq!(batch.failures.len(), 1);
    assert_eq!(batch.failures[0].site, "flat");
    assert!(matches!(batch.failures[0].error, PipelineError::Axis(_)));
    assert_eq!(batch.reports.len(), 2);
    assert_eq!(batch.reports[1].set_prefix, "C6_LOW_BAND");
    assert_eq!(batch.reports[1].site_index, 3);

    let text = fs::read_to_string(&path).unwrap();
    assert!(text.contains("*Nset, nset=C5_BAND_1, instance=PART-1_1-1"));
    assert!(text.contains("*Nset, nset=C6_LOW_BAND_1, instance=PART-1_1-1"));
    assert!(text.contains("** Name: predefinedfield-3-fieldband1   Type: Temperature"));
    // Both sites' node sets sit before the single *End Assembly
    let end_assembly = text.find("*End Assembly").unwrap();
    assert!(text.find("C6_LOW_BAND_5, instance").unwrap() < end_assembly);
}

#[test]
fn unknown_instance_is_reported() {
    let dir = tempdir().unwrap();
    let path = write_deck(&dir, &cord_deck());
    let mut settings = Settings::default();
    settings.patch.instance = "SKULL-1".to_string();

    let err = run_site(&path, &z_site("FIELD_BAND"), &settings, &RunOptions::default()).unwrap_err();
    assert!(err.to_string().contains("SKULL-1"));
    assert!(err.to_string().contains("PART-1_1-1"));
}

#[test]
fn batch_reports_partial_and_skipped_sites() {
    let dir = tempdir().unwrap();
    let path = write_deck(&dir, &cord_deck().replace("** PREDEFINED FIELDS\n", ""));
    let sites = dir.path().join("coordinates.csv");
    fs::write(
        &sites,
        "site_name,center_x,center_y,center_z,upper_x,upper_y,upper_z,lower_x,lower_y,lower_z\n\
         C5,0,0,0,0,0,10,0,0,-10\n\
         C5,0,0,0,0,0,10,0,0,-10\n",
    )
    .unwrap();

    let batch = run_batch(&path, &sites, &Settings::default(), &RunOptions::default()).unwrap();
    assert!(batch.failures.is_empty());
    assert!(batch.warnings.is_empty());
    assert!(!batch.is_clean());
    assert_eq!(batch.patch_issues.len(), 2);

    let missing = &batch.patch_issues[0];
    assert_eq!((missing.site.as_str(), missing.site_index), ("C5", 1));
    assert!(matches!(missing.issue, PatchError::AnchorNotFound { what: "predefined fields", .. }));

    let skipped = &batch.patch_issues[1];
    assert_eq!((skipped.site.as_str(), skipped.site_index), ("C5", 2));
    assert_eq!(skipped.issue, PatchError::DuplicateArtifact { marker: "C5_BAND_1".to_string() });
}

#[test]
fn clean_batch_has_no_issues() {
    let dir = tempdir().unwrap();
    let path = write_deck(&dir, &cord_deck());
    let sites = dir.path().join("coordinates.csv");
    fs::write(&sites, "header\nC5,0,0,0,0,0,10,0,0,-10\n").unwrap();

    let batch = run_batch(&path, &sites, &Settings::default(), &RunOptions::default()).unwrap();
    assert!(batch.is_clean());
}
