use crate::Error;
use image::Rgba;
use std::fmt;
use std::str::FromStr;

const MARKER_ALPHA: u8 = 200;

/// What the color of a keypoint shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorBy {
    /// Triangulated keypoints blue, the others red.
    Visibility,
    /// Triangulated keypoints from red (short tracks) to green (long tracks).
    TrackLength,
    /// Triangulated keypoints from green (near) to red (far).
    Depth,
}

impl ColorBy {
    pub const ALL: [ColorBy; 3] = [ColorBy::Visibility, ColorBy::TrackLength, ColorBy::Depth];
}

impl FromStr for ColorBy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "visibility" => Ok(ColorBy::Visibility),
            "track_length" => Ok(ColorBy::TrackLength),
            "depth" => Ok(ColorBy::Depth),
            _ => Err(Error::UnknownColorBy(s.to_owned())),
        }
    }
}

impl fmt::Display for ColorBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ColorBy::Visibility => "visibility",
            ColorBy::TrackLength => "track_length",
            ColorBy::Depth => "depth",
        })
    }
}

pub fn triangulated() -> Rgba<u8> {
    Rgba([0, 0, 255, MARKER_ALPHA])
}

pub fn untriangulated() -> Rgba<u8> {
    Rgba([255, 0, 0, MARKER_ALPHA])
}

/// Maps `0` to red, `0.5` to yellow and `1` to green. Values outside `[0, 1]` are clipped.
pub fn red_green(value: f64) -> Rgba<u8> {
    let x = value.clamp(0.0, 1.0) * 2.0;
    let channel = |c: f64| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
    Rgba([channel(2.0 - x), channel(x), 0, MARKER_ALPHA])
}

/// Spreads track lengths over `[0, 1]`. A single length maps to `1`.
pub fn normalize_track_lengths(lengths: &[usize]) -> Vec<f64> {
    let min = lengths.iter().copied().min().unwrap_or(0);
    let max = lengths.iter().copied().max().unwrap_or(0);
    lengths
        .iter()
        .map(|&length| {
            if max > min {
                (length - min) as f64 / (max - min) as f64
            } else {
                1.0
            }
        })
        .collect()
}

/// Maps depths to `[0, 1]` with near points high. The median depth of the image maps to `0.5`.
pub fn normalize_depths(depths: &[f64]) -> Vec<f64> {
    let mut sorted = depths.to_vec();
    sorted.sort_by(f64::total_cmp);
    let median = match sorted.get(sorted.len() / 2) {
        Some(&median) if median > 0.0 => median,
        _ => return vec![1.0; depths.len()],
    };
    depths
        .iter()
        .map(|&depth| 1.0 - (depth / (2.0 * median)).clamp(0.0, 1.0))
        .collect()
}
