use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while building the banding axis
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AxisError {
    #[error("invalid axis: upper {upper:?} and lower {lower:?} coincide (zero-length axis)")]
    InvalidAxis { upper: [f64; 3], lower: [f64; 3] },          // upper == lower, direction cannot be normalized

    #[error("invalid axis: non-finite coordinate in {which} point")]
    NonFinite { which: &'static str },                        // NaN / inf somewhere in center, upper or lower
}

/// Errors raised by band classification and field table construction
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BandError {
    #[error("number of bands must be positive, got {0}")]
    InvalidBandCount(usize),

    #[error("rounding precision {0} is out of range (0..=15)")]
    InvalidPrecision(u32),

    #[error(transparent)]
    Axis(#[from] AxisError),
}

/// Errors raised while reading input decks, site tables and label lists
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),                                    // File I/O errors (e.g., file not found)

    #[error("format error at line {line}: {message}")]
    Format { line: usize, message: String },                 // Malformed data, unexpected structure

    #[error("number parse error: {0}")]
    NumberParse(String),                                      // Failed number conversions (invalid float/int strings)

    #[error("instance '{name}' not found in deck (available: {available:?})")]
    UnknownInstance { name: String, available: Vec<String> },

    #[error("instance '{instance}' references unknown part '{part}'")]
    UnknownPart { instance: String, part: String },

    #[error("node set '{0}' not found in deck")]
    UnknownNodeSet(String),
}

// Implement automatic conversion from float parsing errors
// This allows us to use ? when parsing floating point numbers
impl From<std::num::ParseFloatError> for ParseError {
    fn from(err: std::num::ParseFloatError) -> Self {
        ParseError::NumberParse(format!("Float parse error: {}", err))
    }
}

// Same for integer node labels
impl From<std::num::ParseIntError> for ParseError {
    fn from(err: std::num::ParseIntError) -> Self {
        ParseError::NumberParse(format!("Int parse error: {}", err))
    }
}

/// Conditions reported by the deck patcher
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatchError {
    #[error("anchor '{anchor}' not found in deck, {what} were NOT written")]
    AnchorNotFound { anchor: String, what: &'static str },

    #[error("'{marker}' already exists in deck, skipping to avoid duplicates")]
    DuplicateArtifact { marker: String },
}

/// Writer errors for output operations
#[derive(Debug, Error)]
pub enum WriterError {
    #[error("I/O error writing {path}: {source}")]
    Io { path: PathBuf, source: io::Error },

    #[error("VTK error: {0}")]
    Vtk(String),

    #[error("invalid data: {0}")]
    InvalidData(String),
}

// vtkio's error is only guaranteed to be Debug, so it is flattened to text here
impl From<vtkio::Error> for WriterError {
    fn from(err: vtkio::Error) -> Self {
        WriterError::Vtk(format!("{:?}", err))
    }
}

/// Top level error of a single-site run
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Band(#[from] BandError),

    #[error(transparent)]
    Axis(#[from] AxisError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Writer(#[from] WriterError),

    #[error("configuration error: {0}")]
    Config(String),
}
