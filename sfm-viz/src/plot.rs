use crate::{color, ColorBy, Error, Result};
use image::{Rgba, RgbaImage};
use imageproc::drawing::{self, Blend};
use itertools::Itertools;
use log::*;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_pcg::Pcg64;
use sfm_reconstruction::{Image, Point3D, Reconstruction};
use std::path::Path;

/// Draws the keypoints of up to `n` registered images of `model`, picked with a seeded RNG, and
/// tiles the images side by side in increasing image id order.
pub fn visualize_sfm_2d(
    model: &Reconstruction,
    image_dir: &Path,
    color_by: ColorBy,
    n: usize,
    seed: u64,
) -> Result<RgbaImage> {
    if n == 0 {
        return Err(Error::NoImagesRequested);
    }
    let mut rng = Pcg64::seed_from_u64(seed);
    let mut image_ids: Vec<u32> = model
        .reg_image_ids()
        .choose_multiple(&mut rng, n)
        .copied()
        .collect();
    image_ids.sort_unstable();
    if image_ids.is_empty() {
        return Err(Error::NoRegisteredImages);
    }

    let mut panels = Vec::with_capacity(image_ids.len());
    for id in image_ids {
        let image = match model.images.get(&id) {
            Some(image) => image,
            None => continue,
        };
        let path = image_dir.join(&image.name);
        debug!("plotting {} colored by {}", image.name, color_by);
        let panel = image::open(&path)
            .map_err(|source| Error::Image { path, source })?
            .to_rgba8();
        panels.push(draw_keypoints(panel, &keypoint_colors(model, image, color_by)));
    }
    Ok(tile_horizontally(&panels))
}

/// The keypoints of an image that are drawn for a color mode, with their colors.
pub fn keypoint_colors(
    model: &Reconstruction,
    image: &Image,
    color_by: ColorBy,
) -> Vec<([f64; 2], Rgba<u8>)> {
    let triangulated: Vec<([f64; 2], &Point3D)> = image
        .keypoints
        .iter()
        .zip(&image.point3d_ids)
        .filter_map(|(&keypoint, id)| {
            id.and_then(|id| model.points3d.get(&id))
                .map(|point| (keypoint, point))
        })
        .collect();

    match color_by {
        ColorBy::Visibility => image
            .keypoints
            .iter()
            .zip(&image.point3d_ids)
            .map(|(&keypoint, id)| {
                let color = match id.and_then(|id| model.points3d.get(&id)) {
                    Some(_) => color::triangulated(),
                    None => color::untriangulated(),
                };
                (keypoint, color)
            })
            .collect(),
        ColorBy::TrackLength => {
            let lengths = triangulated
                .iter()
                .map(|(_, point)| point.track.len())
                .collect_vec();
            triangulated
                .iter()
                .zip(color::normalize_track_lengths(&lengths))
                .map(|(&(keypoint, _), value)| (keypoint, color::red_green(value)))
                .collect()
        }
        ColorBy::Depth => {
            let depths = triangulated
                .iter()
                .map(|(_, point)| image.depth(point.xyz))
                .collect_vec();
            triangulated
                .iter()
                .zip(color::normalize_depths(&depths))
                .map(|(&(keypoint, _), value)| (keypoint, color::red_green(value)))
                .collect()
        }
    }
}

fn draw_keypoints(image: RgbaImage, keypoints: &[([f64; 2], Rgba<u8>)]) -> RgbaImage {
    let radius = (image.width().max(image.height()) / 400).max(1) as i32;
    let mut canvas = Blend(image);
    for &([x, y], color) in keypoints {
        drawing::draw_filled_circle_mut(
            &mut canvas,
            (x.round() as i32, y.round() as i32),
            radius,
            color,
        );
    }
    canvas.0
}

/// Places the panels left to right on a black canvas as tall as the tallest panel.
pub fn tile_horizontally(panels: &[RgbaImage]) -> RgbaImage {
    let width = panels.iter().map(RgbaImage::width).sum();
    let height = panels.iter().map(RgbaImage::height).max().unwrap_or(0);
    let mut canvas = RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 255]));
    let mut x_offset = 0;
    for panel in panels {
        let (panel_width, panel_height) = panel.dimensions();
        for (x, y) in (0..panel_width).cartesian_product(0..panel_height) {
            canvas.put_pixel(x + x_offset, y, *panel.get_pixel(x, y));
        }
        x_offset += panel_width;
    }
    canvas
}

/// Writes a plot, creating its directory first.
pub fn save_plot(plot: &RgbaImage, path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|source| Error::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }
    plot.save(path).map_err(|source| Error::Image {
        path: path.to_path_buf(),
        source,
    })?;
    info!("wrote plot {:?}", path);
    Ok(())
}
