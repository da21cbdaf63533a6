use crate::pair_list::{parse_pairs, Pair};
use crate::{Error, FeatureStore, LocalFeatures, MatchStore, MatcherConf, PairMatches, Result};
use bitarray::Hamming;
use log::*;
use space::{Knn, LinearKnn};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Matches the features of every pair listed in `pairs` and stores them in `matches`.
///
/// Pairs already present in the match store (in either order) are skipped unless `overwrite` is set,
/// and a pair listed in both orders is matched once.
pub fn match_features(
    conf: &MatcherConf,
    pairs: &Path,
    features: &Path,
    matches: &Path,
    overwrite: bool,
) -> Result<PathBuf> {
    let pairs = parse_pairs(pairs)?;
    let mut store = MatchStore::open_or_create(matches, overwrite)?;
    let new_pairs = find_unique_new_pairs(&pairs, &store);
    if new_pairs.is_empty() {
        info!("skipping matching, all pairs are already in {:?}", matches);
        return Ok(matches.to_path_buf());
    }
    let features_store = FeatureStore::open_existing(features)?;
    let lookup = |name: &str| {
        features_store
            .get(name)
            .ok_or_else(|| Error::MissingFeatures {
                name: name.to_owned(),
                path: features.to_path_buf(),
            })
    };

    info!(
        "matching {} pairs ({} listed) with {}",
        new_pairs.len(),
        pairs.len(),
        conf.output
    );
    for (a, b) in new_pairs {
        let pair_matches = symmetric_matching(lookup(&a)?, lookup(&b)?, conf);
        debug!("{} <-> {}: {} matches", a, b, pair_matches.len());
        store.insert((a, b), pair_matches);
    }
    store.save()?;
    info!("finished exporting matches to {:?}", matches);
    Ok(matches.to_path_buf())
}

/// Drops pairs that are already stored and pairs listed earlier in either order.
pub fn find_unique_new_pairs(pairs: &[Pair], store: &MatchStore) -> Vec<Pair> {
    let mut seen: HashSet<(&str, &str)> = HashSet::new();
    pairs
        .iter()
        .filter(|(a, b)| {
            let fresh = !seen.contains(&(a.as_str(), b.as_str()))
                && !seen.contains(&(b.as_str(), a.as_str()));
            seen.insert((a.as_str(), b.as_str()));
            fresh && !store.contains_pair(a, b)
        })
        .cloned()
        .collect()
}

/// This function performs non-symmetric matching from a to b.
///
/// Returns the best feature in `b` and its distance when it is sufficiently better than the
/// second best feature.
fn matching(a: &LocalFeatures, b: &LocalFeatures, conf: &MatcherConf) -> Vec<Option<(usize, u32)>> {
    // If there arent at least 2 features in both images, we produce no matches.
    if a.len() < 2 || b.len() < 2 {
        return vec![None; a.len()];
    }
    let knn_b = LinearKnn {
        metric: Hamming,
        iter: b.descriptors.iter(),
    };
    a.descriptors
        .iter()
        .map(|a_descriptor| {
            let knn = knn_b.knn(a_descriptor, 2);
            let (best, second) = (&knn[0], &knn[1]);
            let distinct = best.distance.saturating_add(conf.better_by) <= second.distance;
            let close = conf.max_distance.map_or(true, |max| best.distance <= max);
            if distinct && close {
                Some((best.index, best.distance))
            } else {
                None
            }
        })
        .collect()
}

/// This function performs symmetric matching between `a` and `b`.
///
/// Symmetric matching requires a feature in `b` to be the best match for a feature in `a`
/// and for the same feature in `a` to be the best match for the same feature in `b`.
pub fn symmetric_matching(a: &LocalFeatures, b: &LocalFeatures, conf: &MatcherConf) -> PairMatches {
    // The best match for each feature in image a to image b's features.
    let forward_matches = matching(a, b, conf);
    // The best match for each feature in image b to image a's features.
    let reverse_matches = matching(b, a, conf);
    let mut pair_matches = PairMatches::default();
    for (aix, forward) in forward_matches.into_iter().enumerate() {
        if let Some((bix, distance)) = forward {
            if matches!(reverse_matches[bix], Some((rix, _)) if rix == aix) {
                pair_matches.matches.push([aix as u32, bix as u32]);
                pair_matches.distances.push(distance);
            }
        }
    }
    pair_matches
}
