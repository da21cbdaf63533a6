use crate::{Error, Result};
use log::*;
use sfm_features::pair_list::{self, Pair};
use sfm_features::{GlobalDescriptor, GlobalStore};
use std::cmp::Ordering;
use std::path::{Path, PathBuf};

/// Selects the `num_select` best scoring candidates of every query.
///
/// `scores[q][d]` is the similarity of query `q` and database image `d`. Candidates flagged in
/// `invalid` or scoring below `min_score` are never selected. The selection of each query is
/// ordered by decreasing score and returned as `(query, database)` index pairs.
pub fn pairs_from_scores(
    scores: &[Vec<f32>],
    invalid: &[Vec<bool>],
    num_select: usize,
    min_score: f32,
) -> Vec<(usize, usize)> {
    let mut pairs = vec![];
    for (query, row) in scores.iter().enumerate() {
        let mut candidates: Vec<(usize, f32)> = row
            .iter()
            .copied()
            .enumerate()
            .filter(|&(db, score)| {
                !invalid[query][db] && score.is_finite() && score >= min_score
            })
            .collect();
        // Ties keep the database order.
        candidates.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        pairs.extend(
            candidates
                .into_iter()
                .take(num_select)
                .map(|(db, _)| (query, db)),
        );
    }
    pairs
}

/// Similarity of every query descriptor to every database descriptor.
pub fn score_matrix(queries: &[&GlobalDescriptor], database: &[&GlobalDescriptor]) -> Vec<Vec<f32>> {
    queries
        .iter()
        .map(|query| database.iter().map(|db| query.similarity(db)).collect())
        .collect()
}

/// Looks up the descriptor of every name in order.
pub fn descriptors_of<'a>(
    store: &'a GlobalStore,
    names: &[String],
) -> Result<Vec<&'a GlobalDescriptor>> {
    names
        .iter()
        .map(|name| {
            store.get(name.as_str()).ok_or_else(|| Error::MissingDescriptor {
                name: name.clone(),
                path: store.path().to_path_buf(),
            })
        })
        .collect()
}

/// Pairs every image with the `num_matched` most similar other images of the list.
pub fn retrieval_pairs(
    store: &GlobalStore,
    image_list: &[String],
    num_matched: usize,
) -> Result<Vec<Pair>> {
    let descriptors = descriptors_of(store, image_list)?;
    let scores = score_matrix(&descriptors, &descriptors);
    let invalid: Vec<Vec<bool>> = (0..image_list.len())
        .map(|query| (0..image_list.len()).map(|db| db == query).collect())
        .collect();
    let num_matched = num_matched.min(image_list.len());
    Ok(pairs_from_scores(&scores, &invalid, num_matched, 0.0)
        .into_iter()
        .map(|(query, db)| (image_list[query].clone(), image_list[db].clone()))
        .collect())
}

/// Writes the retrieval pairs of `image_list` to `output`.
pub fn pairs_from_retrieval(
    descriptors: &Path,
    output: &Path,
    image_list: &[String],
    num_matched: usize,
) -> Result<PathBuf> {
    info!(
        "extracting image pairs from a retrieval database of {} images",
        image_list.len()
    );
    let store = GlobalStore::open_existing(descriptors)?;
    let pairs = retrieval_pairs(&store, image_list, num_matched)?;
    info!("found {} pairs", pairs.len());
    pair_list::write_pairs(output, &pairs)?;
    Ok(output.to_path_buf())
}
