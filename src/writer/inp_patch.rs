//! Writes band node sets and their predefined temperature fields straight into an
//! input deck.
//!
//! Node sets go right before the set anchor (`*End Assembly`), the field records right
//! after the field anchor (`** PREDEFINED FIELDS`). Every other line of the deck is
//! left untouched. A deck that already holds any of the set or field names is not
//! modified, which makes repeated runs with the same inputs a no-op.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::{info, warn};

use crate::config::PatchSettings;
use crate::error::{PatchError, PipelineError, WriterError};
use crate::parser::abaqus::deck::{normalize_name, InpDeck};
use crate::structs_and_impls::*;

/// Naming for one patch run
#[derive(Debug, Clone, PartialEq)]
pub struct PatchRequest {
    pub instance: String,
    pub set_prefix: String,
    pub site_index: usize,          // 1-based, goes into the predefined field names
    pub amplitude: String,
    pub labels_per_line: usize,
    pub set_anchor: String,
    pub field_anchor: String,
}

impl PatchRequest {
    pub fn new(settings: &PatchSettings, set_prefix: &str, site_index: usize) -> Self {
        PatchRequest {
            instance: settings.instance.clone(),
            set_prefix: set_prefix.to_string(),
            site_index,
            amplitude: settings.amplitude.clone(),
            labels_per_line: settings.labels_per_line.max(1),
            set_anchor: settings.set_anchor.clone(),
            field_anchor: settings.field_anchor.clone(),
        }
    }
}

/// Deck lines to insert, plus the names they define
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PatchRecords {
    pub node_set_lines: Vec<String>,
    pub field_lines: Vec<String>,
    pub set_names: Vec<String>,
    pub field_names: Vec<String>,
}

impl PatchRecords {
    /// Number of bands that produce records (empty bands are skipped)
    pub fn bands(&self) -> usize {
        self.set_names.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnchorStatus {
    Inserted { records: usize },
    NotFound(PatchError),
}

impl AnchorStatus {
    pub fn is_inserted(&self) -> bool {
        matches!(self, AnchorStatus::Inserted { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchReport {
    pub node_sets: AnchorStatus,
    pub predefined_fields: AnchorStatus,
}

impl PatchReport {
    /// Anchors that could not be found, one entry each
    pub fn problems(&self) -> Vec<&PatchError> {
        [&self.node_sets, &self.predefined_fields]
            .into_iter()
            .filter_map(|status| match status {
                AnchorStatus::NotFound(err) => Some(err),
                AnchorStatus::Inserted { .. } => None,
            })
            .collect()
    }

    pub fn changed_deck(&self) -> bool {
        [&self.node_sets, &self.predefined_fields]
            .iter()
            .any(|status| matches!(status, AnchorStatus::Inserted { records } if *records > 0))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchOutcome {
    Written(PatchReport),
    DuplicateSkipped(PatchError),
}

/// Split labels into data lines of `per_line` labels: " 1, 2, 3"
pub fn format_node_labels(labels: &[usize], per_line: usize) -> Vec<String> {
    labels
        .chunks(per_line.max(1))
        .map(|chunk| {
            let joined = chunk.iter().map(usize::to_string).collect::<Vec<_>>().join(", ");
            format!(" {}", joined)
        })
        .collect()
}

pub struct InpPatcher;

impl InpPatcher {
    pub fn build_records(
        classification: &BandClassification,
        table: &FieldTable,
        request: &PatchRequest,
    ) -> PatchRecords {
        let mut records = PatchRecords::default();

        for (band, labels) in classification.bands.iter().enumerate() {
            if labels.is_empty() || band >= table.len() {
                continue;
            }
            let names = BandNames::new(&request.set_prefix, request.site_index, band);

            records
                .node_set_lines
                .push(format!("*Nset, nset={}, instance={}", names.node_set, request.instance));
            records
                .node_set_lines
                .extend(format_node_labels(labels, request.labels_per_line));

            records
                .field_lines
                .push(format!("** Name: {}   Type: Temperature", names.predefined_field));
            records
                .field_lines
                .push(format!("*Temperature, amplitude={}", request.amplitude));
            records
                .field_lines
                .push(format!("{}, {}", names.node_set, table.formatted(band)));

            records.set_names.push(names.node_set);
            records.field_names.push(names.predefined_field);
        }

        records
    }

    /// First target name that the deck already defines, if any
    pub fn find_duplicate(deck: &InpDeck, records: &PatchRecords) -> Option<String> {
        let existing_sets: Vec<String> = deck.nset_names().iter().map(|n| normalize_name(n)).collect();
        let existing_fields: Vec<String> = deck.named_comments().iter().map(|n| normalize_name(n)).collect();

        records
            .set_names
            .iter()
            .find(|name| existing_sets.contains(&normalize_name(name)))
            .or_else(|| {
                records
                    .field_names
                    .iter()
                    .find(|name| existing_fields.contains(&normalize_name(name)))
            })
            .cloned()
    }

    /// Insert the records into the deck in memory
    pub fn apply(deck: &mut InpDeck, records: &PatchRecords, request: &PatchRequest) -> PatchOutcome {
        if let Some(marker) = Self::find_duplicate(deck, records) {
            let err = PatchError::DuplicateArtifact { marker };
            warn!("site {} ({}): {}", request.site_index, request.set_prefix, err);
            return PatchOutcome::DuplicateSkipped(err);
        }

        let set_index = deck.find_anchor(&request.set_anchor);
        let field_index = deck.find_anchor(&request.field_anchor);
        let bands = records.bands();

        // Insert at the later anchor first so the earlier index stays valid. When both
        // anchors are the same line, fields go after it and sets before it.
        let fields_first = matches!((set_index, field_index), (Some(s), Some(f)) if f >= s);
        if let (true, Some(f)) = (fields_first, field_index) {
            deck.insert_after(f, &records.field_lines);
        }
        if let Some(s) = set_index {
            deck.insert_before(s, &records.node_set_lines);
        }
        if let (false, Some(f)) = (fields_first, field_index) {
            deck.insert_after(f, &records.field_lines);
        }

        let node_sets = match set_index {
            Some(_) => AnchorStatus::Inserted { records: bands },
            None => AnchorStatus::NotFound(PatchError::AnchorNotFound {
                anchor: request.set_anchor.clone(),
                what: "node sets",
            }),
        };
        let predefined_fields = match field_index {
            Some(_) => AnchorStatus::Inserted { records: bands },
            None => AnchorStatus::NotFound(PatchError::AnchorNotFound {
                anchor: request.field_anchor.clone(),
                what: "predefined fields",
            }),
        };

        let report = PatchReport { node_sets, predefined_fields };
        for problem in report.problems() {
            warn!("site {} ({}): {}", request.site_index, request.set_prefix, problem);
        }
        PatchOutcome::Written(report)
    }

    /// Read the deck at `path`, patch it and write it back when anything was inserted
    ///
    /// Not safe against concurrent writers of the same file; callers serialise.
    pub fn patch_file(
        path: &Path,
        classification: &BandClassification,
        table: &FieldTable,
        request: &PatchRequest,
    ) -> Result<PatchOutcome, PipelineError> {
        let text = fs::read_to_string(path).map_err(|source| WriterError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut deck = InpDeck::parse(&text);

        let records = Self::build_records(classification, table, request);
        let outcome = Self::apply(&mut deck, &records, request);

        if let PatchOutcome::Written(report) = &outcome {
            if report.changed_deck() {
                Self::replace_file(path, &deck.to_text())?;
                info!("written to {}", path.display());
            }
            if report.node_sets.is_inserted() {
                info!("  - {} node set(s) inserted before {}", records.bands(), request.set_anchor);
            }
            if report.predefined_fields.is_inserted() {
                info!("  - {} predefined field(s) inserted after {}", records.bands(), request.field_anchor);
            }
        }

        Ok(outcome)
    }

    /// Write `text` to a sibling temporary file and rename it over `path`, so a failed
    /// write never leaves a truncated deck behind
    fn replace_file(path: &Path, text: &str) -> Result<(), WriterError> {
        let io_error = |source: io::Error| WriterError::Io { path: path.to_path_buf(), source };
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut staged = NamedTempFile::new_in(dir).map_err(io_error)?;
        if let Ok(metadata) = fs::metadata(path) {
            staged.as_file().set_permissions(metadata.permissions()).map_err(io_error)?;
        }
        staged.write_all(text.as_bytes()).map_err(io_error)?;
        staged.as_file().sync_all().map_err(io_error)?;
        staged.persist(path).map_err(|err| io_error(err.error))?;
        Ok(())
    }
}
