//! Axial banding: projection of nodes on a center/upper/lower axis, band assignment
//! and the raised-cosine field table applied to the bands.

pub mod projection;
pub mod classifier;
pub mod field_profile;

pub use classifier::{band_index, classify};
pub use field_profile::position_of;
pub use projection::Axis;
