//! Diagnostic plots of a sparse model: the keypoints of a few registered images, colored by
//! visibility, track length or depth, tiled into one canvas.

mod color;
mod error;
mod plot;

pub use color::ColorBy;
pub use error::*;
pub use plot::*;
