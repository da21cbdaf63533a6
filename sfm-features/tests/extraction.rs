use image::{imageops::FilterType, DynamicImage, Rgb, RgbImage};
use sfm_features::{
    extract_global_descriptors, extract_local_features, local_features, FeatureStore, GlobalConf,
    GlobalStore, LocalConf, GLOBAL_DESCRIPTOR_DIM,
};
use std::path::Path;

const WIDTH: u32 = 320;
const HEIGHT: u32 = 240;

/// Colored squares of a few sizes on a white background.
fn textured_image() -> RgbImage {
    let mut image = RgbImage::from_pixel(WIDTH, HEIGHT, Rgb([255, 255, 255]));
    for row in 0..6u32 {
        for col in 0..8u32 {
            let size = 8 + (row * 3 + col * 5) % 11;
            let color = Rgb([(col * 30) as u8, (row * 40) as u8, ((row + col) * 15) as u8]);
            let (x0, y0) = (col * 40 + 12, row * 40 + 12);
            for y in y0..(y0 + size) {
                for x in x0..(x0 + size) {
                    image.put_pixel(x, y, color);
                }
            }
        }
    }
    image
}

fn conf(max_keypoints: Option<usize>, resize_max: Option<u32>) -> LocalConf {
    LocalConf {
        max_keypoints,
        resize_max,
        ..Default::default()
    }
}

fn write_image(dir: &Path, name: &str, image: &RgbImage) {
    let path = dir.join(name);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    image.save(path).unwrap();
}

#[test]
fn strongest_keypoints_are_kept() {
    let image = DynamicImage::ImageRgb8(textured_image());
    let all = local_features(&conf(None, None), &image);
    assert!(all.len() > 10, "only {} keypoints", all.len());
    assert!(all.scores.windows(2).all(|w| w[0] >= w[1]));

    let strongest = local_features(&conf(Some(10), None), &image);
    assert_eq!(strongest.len(), 10);
    assert_eq!(strongest.keypoints[..], all.keypoints[..10]);
    assert_eq!(strongest.scores[..], all.scores[..10]);
    assert_eq!(strongest.descriptors[..], all.descriptors[..10]);
}

#[test]
fn keypoints_are_in_original_image_pixels() {
    let image = DynamicImage::ImageRgb8(textured_image());
    let features = local_features(&conf(None, Some(WIDTH / 2)), &image);
    assert_eq!(features.image_size, [WIDTH, HEIGHT]);
    assert!(!features.is_empty());

    let half = image.resize_exact(WIDTH / 2, HEIGHT / 2, FilterType::Triangle);
    let detected = local_features(&conf(None, None), &half);
    let rescaled: Vec<[f32; 2]> = detected
        .keypoints
        .iter()
        .map(|&[x, y]| [x * 2.0, y * 2.0])
        .collect();
    assert_eq!(features.keypoints, rescaled);
    assert!(features
        .keypoints
        .iter()
        .all(|&[x, y]| (0.0..WIDTH as f32).contains(&x) && (0.0..HEIGHT as f32).contains(&y)));
}

#[test]
fn colors_are_sampled_from_the_original_image() {
    let rgb = textured_image();
    let features = local_features(
        &conf(Some(20), Some(WIDTH / 2)),
        &DynamicImage::ImageRgb8(rgb.clone()),
    );
    assert!(!features.is_empty());
    for (&[x, y], color) in features.keypoints.iter().zip(&features.colors) {
        let px = (x.round() as u32).min(WIDTH - 1);
        let py = (y.round() as u32).min(HEIGHT - 1);
        assert_eq!(rgb.get_pixel(px, py).0, *color);
    }
}

#[test]
fn present_images_are_skipped_unless_overwriting() {
    let dir = tempfile::tempdir().unwrap();
    let images = dir.path().join("images");
    let names = vec!["seq/0.png".to_owned()];
    write_image(&images, &names[0], &textured_image());
    let conf = conf(Some(50), Some(WIDTH / 2));

    let path = extract_local_features(&conf, &images, dir.path(), &names, false).unwrap();
    assert_eq!(path, dir.path().join(format!("{}.bin", conf.output)));
    let first = FeatureStore::open_existing(&path).unwrap();
    let first = first.get("seq/0.png").unwrap().clone();
    assert!(!first.is_empty());

    let mirrored = image::imageops::flip_horizontal(&textured_image());
    write_image(&images, &names[0], &mirrored);
    extract_local_features(&conf, &images, dir.path(), &names, false).unwrap();
    let kept = FeatureStore::open_existing(&path).unwrap();
    assert_eq!(kept.get("seq/0.png"), Some(&first));

    extract_local_features(&conf, &images, dir.path(), &names, true).unwrap();
    let redone = FeatureStore::open_existing(&path).unwrap();
    assert_ne!(redone.get("seq/0.png"), Some(&first));
}

#[test]
fn global_descriptors_are_stored_per_image() {
    let dir = tempfile::tempdir().unwrap();
    let images = dir.path().join("images");
    let names = vec!["a.png".to_owned(), "b.png".to_owned()];
    write_image(&images, &names[0], &textured_image());
    write_image(&images, &names[1], &textured_image());

    let conf = GlobalConf::default();
    let path = extract_global_descriptors(&conf, &images, dir.path(), &names, false).unwrap();
    let store = GlobalStore::open_existing(&path).unwrap();
    assert_eq!(store.len(), 2);
    let a = store.get("a.png").unwrap();
    let b = store.get("b.png").unwrap();
    assert_eq!(a.0.len(), GLOBAL_DESCRIPTOR_DIM);
    approx::assert_relative_eq!(a.similarity(b), 1.0, epsilon = 1e-4);
}

#[test]
fn missing_images_fail_extraction() {
    let dir = tempfile::tempdir().unwrap();
    let names = vec!["absent.png".to_owned()];
    let result = extract_local_features(&LocalConf::default(), dir.path(), dir.path(), &names, false);
    assert!(result.is_err());
}
