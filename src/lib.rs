// src/lib.rs

// Top-level modules (each has its own mod.rs or file):
pub mod error;
pub mod structs_and_impls;
pub mod config;
pub mod logging;
pub mod banding;
pub mod parser;
pub mod writer;
pub mod selection;
pub mod pipeline;

pub use banding::projection::Axis;
pub use config::{BandSettings, PatchSettings, Settings};
pub use error::*;
pub use structs_and_impls::*;
