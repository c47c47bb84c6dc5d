use tracing::{debug, info};

use crate::banding::projection::Axis;
use crate::error::BandError;
use crate::structs_and_impls::*;

/// Place a signed axial distance into one of `num_bands` mirrored bands
///
/// Band 0 is the slab around the center on both sides, band `num_bands - 1` the slab
/// next to either limit. The outer limits are closed: `d == d_upper` is still inside.
/// With no bands (`num_bands == 0`) or a NaN distance nothing can be placed and the
/// result is `Outside`; [`classify`] rejects a zero band count up front.
pub fn band_index(distance: f64, d_upper: f64, d_lower: f64, num_bands: usize) -> BandAssignment {
    if num_bands == 0 || distance.is_nan() || distance > d_upper || distance < d_lower {
        return BandAssignment::Outside;
    }

    // Normalize against the limit on the same side of the center
    let normalized = if distance >= 0.0 {
        if d_upper == 0.0 { 0.0 } else { distance.abs() / d_upper.abs() }
    } else if d_lower == 0.0 {
        0.0
    } else {
        distance.abs() / d_lower.abs()
    };

    let index = (normalized * num_bands as f64).floor() as usize;
    BandAssignment::Band(index.min(num_bands - 1))
}

/// Classify every node of the cloud against the axis
pub fn classify(cloud: &NodeCloud, axis: &Axis, num_bands: usize) -> Result<BandClassification, BandError> {
    if num_bands == 0 {
        return Err(BandError::InvalidBandCount(num_bands));
    }

    let mut classification = BandClassification::empty(num_bands);

    debug!("classifying {} nodes into {} bands", cloud.len(), num_bands);
    for node in &cloud.nodes {
        let distance = axis.project(&node.coordinates);
        match band_index(distance, axis.d_upper, axis.d_lower, num_bands) {
            BandAssignment::Band(index) => classification.bands[index].push(node.label),
            BandAssignment::Outside => classification.outside += 1,
        }
    }

    info!(
        "{} nodes classified into {} bands, {} outside region",
        classification.classified(),
        num_bands,
        classification.outside
    );
    Ok(classification)
}

/// Band of every node in cloud order, used by the VTU export
pub fn assignments(cloud: &NodeCloud, axis: &Axis, num_bands: usize) -> Result<Vec<BandAssignment>, BandError> {
    if num_bands == 0 {
        return Err(BandError::InvalidBandCount(num_bands));
    }
    Ok(cloud
        .nodes
        .iter()
        .map(|node| band_index(axis.project(&node.coordinates), axis.d_upper, axis.d_lower, num_bands))
        .collect())
}
