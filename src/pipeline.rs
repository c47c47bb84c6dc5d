//! Single-site and multi-site runs: read the deck, band the instance nodes for each
//! site, patch the deck and optionally export the banding for inspection.

use std::path::{Path, PathBuf};
use std::time::Instant;

use rayon::prelude::*;
use tracing::{error, info, warn};

use crate::banding::classifier::{assignments, classify};
use crate::banding::projection::Axis;
use crate::config::{BandSettings, Settings};
use crate::error::{PatchError, PipelineError};
use crate::parser::abaqus::abaqus_inp::AbaqusInpParser;
use crate::parser::sites_csv::{SiteWarning, SitesCsvParser};
use crate::structs_and_impls::*;
use crate::writer::inp_patch::{InpPatcher, PatchOutcome, PatchRequest};
use crate::writer::xml_writer::VTUWriter;

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub dry_run: bool,              // Classify and report, leave the deck alone
    pub vtu_output: Option<PathBuf>, // File for single-site runs, directory for batches
}

/// Banding of one site, independent of any deck
#[derive(Debug, Clone)]
pub struct SiteBands {
    pub axis: Axis,
    pub classification: BandClassification,
    pub table: FieldTable,
}

#[derive(Debug, Clone)]
pub struct SiteReport {
    pub site: Site,
    pub site_index: usize,
    pub set_prefix: String,
    pub bands: SiteBands,
    pub outcome: Option<PatchOutcome>, // None on dry runs
}

#[derive(Debug)]
pub struct SiteFailure {
    pub site: String,
    pub site_index: usize,
    pub error: PipelineError,
}

/// Site whose records were skipped (duplicate guard) or only partly written (missing anchor)
#[derive(Debug, Clone, PartialEq)]
pub struct SitePatchIssue {
    pub site: String,
    pub site_index: usize,
    pub issue: PatchError,
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub reports: Vec<SiteReport>,
    pub failures: Vec<SiteFailure>,
    pub warnings: Vec<SiteWarning>,
    pub patch_issues: Vec<SitePatchIssue>,
}

impl BatchReport {
    /// Every record parsed and every site fully written
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.warnings.is_empty() && self.patch_issues.is_empty()
    }

    fn record_patch_issues(&mut self, report: &SiteReport) {
        let issues: Vec<PatchError> = match &report.outcome {
            Some(PatchOutcome::DuplicateSkipped(err)) => vec![err.clone()],
            Some(PatchOutcome::Written(patch)) => patch.problems().into_iter().cloned().collect(),
            None => Vec::new(),
        };
        self.patch_issues.extend(issues.into_iter().map(|issue| SitePatchIssue {
            site: report.site.name.clone(),
            site_index: report.site_index,
            issue,
        }));
    }
}

/// Axis, classification and field table for one site
pub fn band_site(cloud: &NodeCloud, site: &Site, settings: &BandSettings) -> Result<SiteBands, PipelineError> {
    let axis = Axis::new(site.center, site.upper, site.lower)?;
    let classification = classify(cloud, &axis, settings.num_bands)?;
    let table = FieldTable::build(
        settings.num_bands,
        settings.peak_value,
        settings.min_value,
        settings.convention,
        settings.precision,
    )?;
    Ok(SiteBands { axis, classification, table })
}

/// Band one site given on the command line and patch it into the deck
pub fn run_site(
    deck_path: &Path,
    site: &Site,
    settings: &Settings,
    options: &RunOptions,
) -> Result<SiteReport, PipelineError> {
    settings.validate()?;
    info!("field convention: {}", settings.bands.convention);

    let (_, model) = AbaqusInpParser::parse_file(deck_path)?;
    let cloud = AbaqusInpParser::instance_nodes(&model, &settings.patch.instance)?;
    info!("found {} nodes in instance '{}'", cloud.len(), cloud.instance);

    let bands = band_site(&cloud, site, &settings.bands)?;
    if let Some(path) = &options.vtu_output {
        export_vtu(&cloud, &bands, &settings.bands, path)?;
    }

    let set_prefix = settings.patch.set_prefix.clone();
    let outcome = patch_site(deck_path, &bands, &set_prefix, 1, settings, options)?;

    let report = SiteReport { site: site.clone(), site_index: 1, set_prefix, bands, outcome };
    log_summary(&report);
    Ok(report)
}

/// Band every site of a sites table. Sites are classified in parallel; the deck is
/// patched one site at a time in table order. A failing site is recorded and skipped.
pub fn run_batch(
    deck_path: &Path,
    sites_path: &Path,
    settings: &Settings,
    options: &RunOptions,
) -> Result<BatchReport, PipelineError> {
    settings.validate()?;
    info!("field convention: {}", settings.bands.convention);

    let table = SitesCsvParser::parse_file(sites_path)?;
    let (_, model) = AbaqusInpParser::parse_file(deck_path)?;
    let cloud = AbaqusInpParser::instance_nodes(&model, &settings.patch.instance)?;
    info!("found {} nodes in instance '{}'", cloud.len(), cloud.instance);

    let start = Instant::now();
    let banded: Vec<Result<SiteBands, PipelineError>> = table
        .sites
        .par_iter()
        .map(|site| band_site(&cloud, site, &settings.bands))
        .collect();
    info!("classified {} sites in {:.2?}", table.sites.len(), start.elapsed());

    let mut batch = BatchReport { warnings: table.warnings.clone(), ..Default::default() };

    for (position, (site, result)) in table.sites.iter().zip(banded).enumerate() {
        let site_index = position + 1;
        info!("{}", "#".repeat(60));
        info!("SITE {}: {}", site_index, site.name);
        info!("{}", "#".repeat(60));

        match process_banded_site(deck_path, &cloud, site, site_index, result, settings, options) {
            Ok(report) => {
                log_summary(&report);
                batch.record_patch_issues(&report);
                batch.reports.push(report);
            }
            Err(err) => {
                error!("site {} ('{}') failed: {}", site_index, site.name, err);
                batch.failures.push(SiteFailure { site: site.name.clone(), site_index, error: err });
            }
        }
    }

    info!(
        "all {} sites processed ({} failed, {} with patch issues, {} records skipped)",
        table.sites.len(),
        batch.failures.len(),
        batch.patch_issues.len(),
        batch.warnings.len()
    );
    Ok(batch)
}

fn process_banded_site(
    deck_path: &Path,
    cloud: &NodeCloud,
    site: &Site,
    site_index: usize,
    banded: Result<SiteBands, PipelineError>,
    settings: &Settings,
    options: &RunOptions,
) -> Result<SiteReport, PipelineError> {
    let bands = banded?;
    let set_prefix = site.set_prefix();

    if let Some(dir) = &options.vtu_output {
        let path = dir.join(format!("{}.vtu", set_prefix));
        export_vtu(cloud, &bands, &settings.bands, &path)?;
    }

    let outcome = patch_site(deck_path, &bands, &set_prefix, site_index, settings, options)?;
    Ok(SiteReport { site: site.clone(), site_index, set_prefix, bands, outcome })
}

fn patch_site(
    deck_path: &Path,
    bands: &SiteBands,
    set_prefix: &str,
    site_index: usize,
    settings: &Settings,
    options: &RunOptions,
) -> Result<Option<PatchOutcome>, PipelineError> {
    if options.dry_run {
        info!("dry run, {} left unchanged", deck_path.display());
        return Ok(None);
    }
    let request = PatchRequest::new(&settings.patch, set_prefix, site_index);
    let outcome = InpPatcher::patch_file(deck_path, &bands.classification, &bands.table, &request)?;
    Ok(Some(outcome))
}

fn export_vtu(cloud: &NodeCloud, bands: &SiteBands, settings: &BandSettings, path: &Path) -> Result<(), PipelineError> {
    let assigned = assignments(cloud, &bands.axis, settings.num_bands)?;
    VTUWriter::write_banded_cloud(cloud, &assigned, &bands.table, path)?;
    Ok(())
}

/// Node set / field value table for one site
pub fn log_summary(report: &SiteReport) {
    let classification = &report.bands.classification;
    let table = &report.bands.table;

    info!("{}", "=".repeat(75));
    info!("SUMMARY: Node Sets and Field Values");
    info!("{}", "=".repeat(75));
    info!("{:<20} {:>10} {:>15} {:<30}", "Node Set", "Nodes", "Field Value", "Predefined Field");
    info!("{}", "-".repeat(75));
    for band in 0..classification.num_bands {
        let names = BandNames::new(&report.set_prefix, report.site_index, band);
        info!(
            "{:<20} {:>10} {:>15} {:<30}",
            names.node_set,
            classification.band(band).len(),
            table.formatted(band),
            names.predefined_field
        );
    }
    info!("{}", "=".repeat(75));
    info!("nodes outside region: {}", classification.outside);

    if let Some(PatchOutcome::DuplicateSkipped(err)) = &report.outcome {
        warn!("site {} ('{}'): {}", report.site_index, report.site.name, err);
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn cloud() -> NodeCloud {
        NodeCloud::new(
            "PART-1_1-1",
            (0..=24)
                .map(|i| Node::new(i + 1, Point::new(0.0, 0.0, i as f64 - 12.0)))
                .collect(),
        )
    }

    #[test]
    fn test_band_site() {
        let site = Site::new("S", Point::zeros(), Point::new(0.0, 0.0, 10.0), Point::new(0.0, 0.0, -10.0));
        let bands = band_site(&cloud(), &site, &BandSettings::default()).unwrap();

        // z = -12, -11, 11, 12 fall outside
        assert_eq!(bands.classification.outside, 4);
        assert_eq!(bands.classification.classified(), 21);
        // z = -1, 0, 1 in band 0
        assert_eq!(bands.classification.band(0), &[12, 13, 14]);
        assert_eq!(bands.table.len(), 5);
    }

    #[test]
    fn test_band_site_invalid_axis() {
        let p = Point::new(0.0, 0.0, 1.0);
        let site = Site::new("S", Point::zeros(), p, p);
        assert!(matches!(
            band_site(&cloud(), &site, &BandSettings::default()),
            Err(PipelineError::Axis(_))
        ));
    }
}
