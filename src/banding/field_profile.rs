use std::f64::consts::PI;

use tracing::debug;

use crate::error::BandError;
use crate::structs_and_impls::*;

/// Largest precision that still round-trips through 10^precision in f64
const MAX_PRECISION: u32 = 15;

/// Fractional position p_i of band `band` along the half cosine
pub fn band_position(band: usize, num_bands: usize, convention: FieldConvention) -> f64 {
    if num_bands <= 1 {
        return 0.0;
    }
    match convention {
        FieldConvention::Linear => band as f64 / (num_bands - 1) as f64,
        FieldConvention::VirtualEdge => band as f64 / num_bands as f64,
    }
}

/// Raised cosine between `peak` (p = 0) and `min` (p = 1), zero slope at both ends
pub fn raised_cosine(position: f64, peak_value: f64, min_value: f64) -> f64 {
    (peak_value - min_value) * (1.0 + (PI * position).cos()) / 2.0 + min_value
}

/// Inverse of [`raised_cosine`]: recover the position that produced `value`
///
/// Values outside [min, peak] are clamped, so rounded table entries at either end map
/// to 0 and 1 instead of NaN.
pub fn position_of(value: f64, peak_value: f64, min_value: f64) -> f64 {
    let amplitude = peak_value - min_value;
    if amplitude == 0.0 {
        return 0.0;
    }
    let cosine = (2.0 * (value - min_value) / amplitude - 1.0).clamp(-1.0, 1.0);
    cosine.acos() / PI
}

pub fn round_to(value: f64, precision: u32) -> f64 {
    let scale = 10f64.powi(precision as i32);
    (value * scale).round() / scale
}

impl FieldTable {
    pub fn build(
        num_bands: usize,
        peak_value: f64,
        min_value: f64,
        convention: FieldConvention,
        precision: u32,
    ) -> Result<FieldTable, BandError> {
        if num_bands == 0 {
            return Err(BandError::InvalidBandCount(num_bands));
        }
        if precision > MAX_PRECISION {
            return Err(BandError::InvalidPrecision(precision));
        }

        let positions: Vec<f64> = (0..num_bands)
            .map(|band| band_position(band, num_bands, convention))
            .collect();
        let values: Vec<f64> = positions
            .iter()
            .map(|&p| round_to(raised_cosine(p, peak_value, min_value), precision))
            .collect();

        debug!("field table ({} convention): {:?}", convention, values);

        Ok(FieldTable { convention, precision, peak_value, min_value, positions, values })
    }

    /// Position recovered from each rounded value
    pub fn recovered_positions(&self) -> Vec<f64> {
        self.values
            .iter()
            .map(|&v| position_of(v, self.peak_value, self.min_value))
            .collect()
    }

    /// Mirrored profile across the region, (band, signed position, value) from the
    /// lower edge through the center to the upper edge
    pub fn profile_rows(&self) -> Vec<(usize, f64, f64)> {
        let mut rows: Vec<(usize, f64, f64)> = self
            .positions
            .iter()
            .zip(&self.values)
            .enumerate()
            .skip(1)
            .rev()
            .map(|(band, (&p, &v))| (band, -p, v))
            .collect();
        rows.extend(
            self.positions
                .iter()
                .zip(&self.values)
                .enumerate()
                .map(|(band, (&p, &v))| (band, p, v)),
        );
        rows
    }
}
