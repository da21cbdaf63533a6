//! Feature extraction and matching stages of an SfM pipeline.
//!
//! Local features are AKAZE keypoints with binary descriptors, global descriptors aggregate those
//! binary descriptors into one vector per image, and matching is mutual nearest neighbor in
//! Hamming space. Every stage writes a [`Store`] that later stages and later runs read back.

mod confs;
mod error;
mod extract;
mod features;
mod matching;
pub mod pair_list;
mod store;

pub use confs::*;
pub use error::*;
pub use extract::*;
pub use features::*;
pub use matching::*;
pub use store::*;
