use crate::{
    Error, GlobalConf, GlobalDescriptor, LocalConf, LocalFeatures, Result, Store,
};
use akaze::Akaze;
use image::{imageops::FilterType, DynamicImage, GenericImageView};
use log::*;
use serde::{de::DeserializeOwned, Serialize};
use std::borrow::Cow;
use std::path::{Path, PathBuf};

/// Extracts local features for every image of `image_list` missing from the store
/// `<export_dir>/<conf.output>.bin` and returns the path of the store.
pub fn extract_local_features(
    conf: &LocalConf,
    image_dir: &Path,
    export_dir: &Path,
    image_list: &[String],
    overwrite: bool,
) -> Result<PathBuf> {
    let path = export_dir.join(format!("{}.bin", conf.output));
    extract_into_store(&path, image_dir, image_list, overwrite, |image| {
        local_features(conf, image)
    })?;
    Ok(path)
}

/// Extracts a global descriptor for every image of `image_list` missing from the store
/// `<export_dir>/<conf.output>.bin` and returns the path of the store.
pub fn extract_global_descriptors(
    conf: &GlobalConf,
    image_dir: &Path,
    export_dir: &Path,
    image_list: &[String],
    overwrite: bool,
) -> Result<PathBuf> {
    let path = export_dir.join(format!("{}.bin", conf.output));
    extract_into_store(&path, image_dir, image_list, overwrite, |image| {
        global_descriptor(conf, image)
    })?;
    Ok(path)
}

fn extract_into_store<V>(
    path: &Path,
    image_dir: &Path,
    image_list: &[String],
    overwrite: bool,
    mut describe: impl FnMut(&DynamicImage) -> V,
) -> Result<()>
where
    V: Serialize + DeserializeOwned,
{
    let mut store: Store<String, V> = Store::open_or_create(path, overwrite)?;
    let missing: Vec<&String> = image_list
        .iter()
        .filter(|name| !store.contains_key(name.as_str()))
        .collect();
    if missing.is_empty() {
        info!("skipping extraction, all images are already in {:?}", path);
        return Ok(());
    }
    info!(
        "extracting {} images into {:?} ({} already present)",
        missing.len(),
        path,
        image_list.len() - missing.len()
    );
    for name in missing {
        let image_path = image_dir.join(name);
        let image = image::open(&image_path).map_err(|source| Error::Image {
            path: image_path.clone(),
            source,
        })?;
        debug!("describing {}", name);
        store.insert(name.clone(), describe(&image));
    }
    store.save()?;
    info!("finished exporting features to {:?}", path);
    Ok(())
}

/// Detects AKAZE keypoints and descriptors in `image`.
pub fn local_features(conf: &LocalConf, image: &DynamicImage) -> LocalFeatures {
    let (width, height) = image.dimensions();
    let (detection_image, scale) = resize_for_detection(image, conf.resize_max);
    let (keypoints, descriptors) = Akaze::new(conf.threshold).extract(&detection_image);

    // Strongest responses first.
    let mut order: Vec<usize> = (0..keypoints.len()).collect();
    order.sort_by(|&a, &b| keypoints[b].response.total_cmp(&keypoints[a].response));
    if let Some(max_keypoints) = conf.max_keypoints {
        order.truncate(max_keypoints);
    }

    let rgb = image.to_rgb8();
    let mut features = LocalFeatures::new([width, height]);
    for ix in order {
        let (x, y) = keypoints[ix].point;
        let keypoint = [x * scale[0], y * scale[1]];
        let px = (keypoint[0].round() as u32).min(width.saturating_sub(1));
        let py = (keypoint[1].round() as u32).min(height.saturating_sub(1));
        let color = rgb.get_pixel(px, py).0;
        features.push(keypoint, keypoints[ix].response, color, descriptors[ix]);
    }
    features
}

/// Aggregates the AKAZE descriptors of `image` into a [`GlobalDescriptor`].
pub fn global_descriptor(conf: &GlobalConf, image: &DynamicImage) -> GlobalDescriptor {
    let (detection_image, _) = resize_for_detection(image, conf.resize_max);
    let (_, descriptors) = Akaze::new(conf.threshold).extract(&detection_image);
    GlobalDescriptor::from_binary_descriptors(descriptors.iter())
}

/// Returns the image to run detection on and the factors mapping its pixels back to the original.
fn resize_for_detection(
    image: &DynamicImage,
    resize_max: Option<u32>,
) -> (Cow<'_, DynamicImage>, [f32; 2]) {
    let (width, height) = image.dimensions();
    match resize_max {
        Some(resize_max) if resize_max > 0 && width.max(height) > resize_max => {
            let ratio = resize_max as f64 / width.max(height) as f64;
            let new_width = ((width as f64 * ratio).round() as u32).max(1);
            let new_height = ((height as f64 * ratio).round() as u32).max(1);
            let resized = image.resize_exact(new_width, new_height, FilterType::Triangle);
            (
                Cow::Owned(resized),
                [
                    width as f32 / new_width as f32,
                    height as f32 / new_height as f32,
                ],
            )
        }
        _ => (Cow::Borrowed(image), [1.0, 1.0]),
    }
}
