use bitarray::BitArray;
use sfm_features::{
    match_features, pair_list, Descriptor, FeatureStore, GlobalDescriptor, LocalFeatures,
    MatchStore, MatcherConf, PairMatches, DESCRIPTOR_BYTES, GLOBAL_DESCRIPTOR_DIM,
};

fn features(fills: &[u8]) -> LocalFeatures {
    let mut features = LocalFeatures::new([640, 480]);
    for (ix, &fill) in fills.iter().enumerate() {
        features.push(
            [ix as f32 * 10.0, 5.0],
            1.0,
            [fill, fill, fill],
            BitArray::new([fill; DESCRIPTOR_BYTES]),
        );
    }
    features
}

#[test]
fn store_roundtrips_through_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("feats.bin");

    let mut store = FeatureStore::create(&path);
    store.insert("a.jpg".to_owned(), features(&[0x00, 0xff]));
    store.save().unwrap();
    assert!(path.exists());
    assert!(!path.with_extension("partial").exists());

    let reopened = FeatureStore::open(&path).unwrap();
    assert_eq!(reopened.len(), 1);
    assert_eq!(reopened.get("a.jpg"), Some(&features(&[0x00, 0xff])));
}

#[test]
fn missing_store_opens_empty_but_is_required_when_existing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.bin");
    assert!(FeatureStore::open(&path).unwrap().is_empty());
    assert!(FeatureStore::open_existing(&path).is_err());
}

#[test]
fn overwrite_discards_previous_entries() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("feats.bin");
    let mut store = FeatureStore::create(&path);
    store.insert("a.jpg".to_owned(), features(&[1, 2]));
    store.save().unwrap();

    assert_eq!(FeatureStore::open_or_create(&path, false).unwrap().len(), 1);
    assert!(FeatureStore::open_or_create(&path, true).unwrap().is_empty());
}

#[test]
fn pair_lists_roundtrip_and_reject_malformed_lines() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pairs.txt");
    let pairs = vec![
        ("a.jpg".to_owned(), "b.jpg".to_owned()),
        ("a.jpg".to_owned(), "c.jpg".to_owned()),
    ];
    pair_list::write_pairs(&path, &pairs).unwrap();
    assert_eq!(
        std::fs::read_to_string(&path).unwrap(),
        "a.jpg b.jpg\na.jpg c.jpg\n"
    );
    assert_eq!(pair_list::parse_pairs(&path).unwrap(), pairs);

    std::fs::write(&path, "a.jpg b.jpg\n\nc.jpg\n").unwrap();
    let error = pair_list::parse_pairs(&path).unwrap_err();
    assert!(error.to_string().contains("line 3"));
}

#[test]
fn matching_skips_reversed_and_existing_pairs() {
    let dir = tempfile::tempdir().unwrap();
    let features_path = dir.path().join("feats.bin");
    let pairs_path = dir.path().join("pairs.txt");
    let matches_path = dir.path().join("matches.bin");

    let mut store = FeatureStore::create(&features_path);
    store.insert("a.jpg".to_owned(), features(&[0x00, 0xff, 0x0f]));
    store.insert("b.jpg".to_owned(), features(&[0xff, 0x00, 0x0f]));
    store.insert("c.jpg".to_owned(), features(&[0x0f, 0xff, 0x00]));
    store.save().unwrap();

    pair_list::write_pairs(
        &pairs_path,
        &[
            ("a.jpg".to_owned(), "b.jpg".to_owned()),
            ("b.jpg".to_owned(), "a.jpg".to_owned()),
        ],
    )
    .unwrap();
    let conf = MatcherConf::default();
    match_features(&conf, &pairs_path, &features_path, &matches_path, false).unwrap();

    let matches = MatchStore::open(&matches_path).unwrap();
    assert_eq!(matches.len(), 1);
    let ab = matches.find_pair("a.jpg", "b.jpg").unwrap();
    assert_eq!(ab.matches, vec![[0, 1], [1, 0], [2, 2]]);
    assert_eq!(matches.find_pair("b.jpg", "a.jpg"), Some(ab.swapped()));

    // A second run only adds the new pair.
    pair_list::write_pairs(
        &pairs_path,
        &[
            ("b.jpg".to_owned(), "a.jpg".to_owned()),
            ("a.jpg".to_owned(), "c.jpg".to_owned()),
        ],
    )
    .unwrap();
    match_features(&conf, &pairs_path, &features_path, &matches_path, false).unwrap();
    let matches = MatchStore::open(&matches_path).unwrap();
    assert_eq!(matches.len(), 2);
    assert!(matches.contains_pair("c.jpg", "a.jpg"));
    assert!(!matches.contains_pair("b.jpg", "c.jpg"));
}

#[test]
fn matching_reports_images_without_features() {
    let dir = tempfile::tempdir().unwrap();
    let features_path = dir.path().join("feats.bin");
    let pairs_path = dir.path().join("pairs.txt");
    let mut store = FeatureStore::create(&features_path);
    store.insert("a.jpg".to_owned(), features(&[0x00, 0xff]));
    store.save().unwrap();
    pair_list::write_pairs(&pairs_path, &[("a.jpg".to_owned(), "z.jpg".to_owned())]).unwrap();

    let error = match_features(
        &MatcherConf::default(),
        &pairs_path,
        &features_path,
        &dir.path().join("matches.bin"),
        false,
    )
    .unwrap_err();
    assert!(error.to_string().contains("z.jpg"));
}

#[test]
fn global_descriptors_rank_similar_images_higher() {
    let describe = |fills: &[u8]| {
        let words: Vec<Descriptor> = fills
            .iter()
            .map(|&fill| BitArray::new([fill; DESCRIPTOR_BYTES]))
            .collect();
        GlobalDescriptor::from_binary_descriptors(words.iter())
    };
    let (a, b, c) = (
        describe(&[0x0f, 0x0f]),
        describe(&[0x0f, 0x1f]),
        describe(&[0xf0, 0xf0]),
    );

    assert_eq!(a.0.len(), GLOBAL_DESCRIPTOR_DIM);
    approx::assert_relative_eq!(a.similarity(&a), 1.0, epsilon = 1e-5);
    assert!(a.similarity(&b) > a.similarity(&c));
    approx::assert_relative_eq!(a.similarity(&c), -1.0, epsilon = 1e-5);

    let empty = GlobalDescriptor::from_binary_descriptors(std::iter::empty());
    assert_eq!(empty.similarity(&a), 0.0);
}

#[test]
fn swapped_matches_index_the_other_image_first() {
    let matches = PairMatches {
        matches: vec![[0, 3], [2, 1]],
        distances: vec![5, 7],
    };
    assert_eq!(matches.swapped().matches, vec![[3, 0], [1, 2]]);
    assert_eq!(matches.swapped().distances, vec![5, 7]);
}
