//! Candidate image pairs for matching.
//!
//! Images of a video are paired with their neighbours in the sequence, with the images most
//! similar to them by global descriptor, or both. Pair lists are written as text files that the
//! matcher reads back.

mod error;
mod image_list;
mod retrieval;
mod sequence;

pub use error::*;
pub use image_list::*;
pub use retrieval::*;
pub use sequence::*;
