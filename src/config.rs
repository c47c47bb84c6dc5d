//! Run settings: band/field parameters and the naming used when patching a deck.
//!
//! Settings come from an optional JSON file; every field has a default matching the
//! values the spinal cord models were built with, and the command line overrides
//! whatever the file says.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::PipelineError;
use crate::structs_and_impls::FieldConvention;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BandSettings {
    pub num_bands: usize,
    pub peak_value: f64,
    pub min_value: f64,
    pub convention: FieldConvention,
    pub precision: u32,
}

impl Default for BandSettings {
    fn default() -> Self {
        BandSettings {
            num_bands: 5,
            peak_value: 0.15,
            min_value: 0.0,
            convention: FieldConvention::Linear,
            precision: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PatchSettings {
    pub instance: String,           // Part instance the node sets refer to
    pub set_prefix: String,         // Prefix of single-site node sets
    pub amplitude: String,          // Amplitude named on every *Temperature keyword
    pub labels_per_line: usize,     // Node labels per *Nset data line
    pub set_anchor: String,         // Node sets go right before this keyword line
    pub field_anchor: String,       // Predefined fields go right after this comment line
}

impl Default for PatchSettings {
    fn default() -> Self {
        PatchSettings {
            instance: "PART-1_1-1".to_string(),
            set_prefix: "FIELD_BAND".to_string(),
            amplitude: "Amp-1-preload".to_string(),
            labels_per_line: 16,
            set_anchor: "*End Assembly".to_string(),
            field_anchor: "** PREDEFINED FIELDS".to_string(),
        }
    }
}

/// Everything a run needs besides the site geometry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub bands: BandSettings,
    pub patch: PatchSettings,
}

impl Settings {
    pub fn from_json_file(path: &Path) -> Result<Settings, PipelineError> {
        let text = fs::read_to_string(path)
            .map_err(|e| PipelineError::Config(format!("cannot read {}: {}", path.display(), e)))?;
        let settings = Self::from_json_str(&text)
            .map_err(|e| PipelineError::Config(format!("{}: {}", path.display(), e)))?;
        debug!("loaded settings from {}: {:?}", path.display(), settings);
        Ok(settings)
    }

    pub fn from_json_str(text: &str) -> Result<Settings, PipelineError> {
        let settings: Settings =
            serde_json::from_str(text).map_err(|e| PipelineError::Config(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.bands.num_bands == 0 {
            return Err(PipelineError::Config("num_bands must be positive".to_string()));
        }
        if self.patch.labels_per_line == 0 {
            return Err(PipelineError::Config("labels_per_line must be positive".to_string()));
        }
        if !self.bands.peak_value.is_finite() || !self.bands.min_value.is_finite() {
            return Err(PipelineError::Config("peak_value and min_value must be finite".to_string()));
        }
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.bands.num_bands, 5);
        assert_eq!(settings.bands.convention, FieldConvention::Linear);
        assert_eq!(settings.patch.labels_per_line, 16);
        assert_eq!(settings.patch.amplitude, "Amp-1-preload");
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let settings = Settings::from_json_str(
            r#"{ "bands": { "num_bands": 7, "convention": "virtual-edge" }, "patch": { "instance": "CORD-1" } }"#,
        )
        .unwrap();
        assert_eq!(settings.bands.num_bands, 7);
        assert_eq!(settings.bands.convention, FieldConvention::VirtualEdge);
        assert_eq!(settings.bands.precision, 3);
        assert_eq!(settings.patch.instance, "CORD-1");
        assert_eq!(settings.patch.set_prefix, "FIELD_BAND");
    }

    #[test]
    fn test_rejects_zero_bands_and_unknown_keys() {
        assert!(Settings::from_json_str(r#"{ "bands": { "num_bands": 0 } }"#).is_err());
        assert!(Settings::from_json_str(r#"{ "bands": { "bandz": 3 } }"#).is_err());
    }
}
