use bitarray::BitArray;
use serde::{Deserialize, Serialize};

/// The number of bytes in one AKAZE binary descriptor.
pub const DESCRIPTOR_BYTES: usize = 64;

/// An AKAZE M-LDB binary descriptor.
pub type Descriptor = BitArray<DESCRIPTOR_BYTES>;

/// The number of leading descriptor bits AKAZE writes, 3 channels of 6 + 36 + 120 comparisons.
///
/// The remaining bits of a [`Descriptor`] are always zero.
pub const MLDB_BITS: usize = 486;

/// The dimension of a [`GlobalDescriptor`], one per M-LDB bit.
pub const GLOBAL_DESCRIPTOR_DIM: usize = MLDB_BITS;

/// The keypoints and binary descriptors of one image.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocalFeatures {
    /// `(width, height)` of the original image.
    pub image_size: [u32; 2],
    /// Keypoint positions in pixels of the original image.
    pub keypoints: Vec<[f32; 2]>,
    /// Detector response of each keypoint.
    pub scores: Vec<f32>,
    /// The color of the original image under each keypoint.
    pub colors: Vec<[u8; 3]>,
    pub descriptors: Vec<Descriptor>,
}

impl LocalFeatures {
    pub fn new(image_size: [u32; 2]) -> Self {
        Self {
            image_size,
            ..Default::default()
        }
    }

    pub fn push(&mut self, keypoint: [f32; 2], score: f32, color: [u8; 3], descriptor: Descriptor) {
        self.keypoints.push(keypoint);
        self.scores.push(score);
        self.colors.push(color);
        self.descriptors.push(descriptor);
    }

    pub fn len(&self) -> usize {
        self.keypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keypoints.is_empty()
    }

    pub fn descriptor(&self, ix: usize) -> &Descriptor {
        &self.descriptors[ix]
    }
}

/// A whole-image descriptor used to retrieve visually similar images.
///
/// This is the frequency of every bit over the binary descriptors of the image,
/// centered and L2-normalized, so the dot product of two descriptors is their cosine similarity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalDescriptor(pub Vec<f32>);

impl GlobalDescriptor {
    pub fn from_binary_descriptors<'a>(descriptors: impl Iterator<Item = &'a Descriptor>) -> Self {
        let mut counts = vec![0u32; GLOBAL_DESCRIPTOR_DIM];
        let mut total = 0u32;
        for descriptor in descriptors {
            total += 1;
            let bytes = descriptor.bytes();
            for (bit, count) in counts.iter_mut().enumerate() {
                *count += u32::from((bytes[bit >> 3] >> (bit & 7)) & 1);
            }
        }
        if total == 0 {
            return Self(vec![0.0; GLOBAL_DESCRIPTOR_DIM]);
        }
        let mut vector: Vec<f32> = counts
            .into_iter()
            .map(|count| count as f32 / total as f32 - 0.5)
            .collect();
        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > f32::EPSILON {
            vector.iter_mut().for_each(|v| *v /= norm);
        } else {
            vector.iter_mut().for_each(|v| *v = 0.0);
        }
        Self(vector)
    }

    /// Cosine similarity of two descriptors.
    pub fn similarity(&self, other: &Self) -> f32 {
        self.0.iter().zip(&other.0).map(|(a, b)| a * b).sum()
    }
}

/// The feature matches between two images.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairMatches {
    /// `[feature in first image, feature in second image]`
    pub matches: Vec<[u32; 2]>,
    /// The Hamming distance of each match.
    pub distances: Vec<u32>,
}

impl PairMatches {
    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    /// The same matches seen from the second image.
    pub fn swapped(&self) -> Self {
        Self {
            matches: self.matches.iter().map(|&[a, b]| [b, a]).collect(),
            distances: self.distances.clone(),
        }
    }
}
