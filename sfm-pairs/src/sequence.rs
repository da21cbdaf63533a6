use crate::retrieval::{descriptors_of, pairs_from_scores, score_matrix};
use crate::{Error, Result};
use log::*;
use sfm_features::pair_list::{self, Pair};
use sfm_features::GlobalStore;
use std::path::{Path, PathBuf};

/// Periodic retrieval queries that close loops the sequence window cannot see.
#[derive(Debug, Clone, PartialEq)]
pub struct LoopClosure {
    /// The global descriptor store.
    pub retrieval_path: PathBuf,
    /// Every `retrieval_interval`-th image is a query.
    pub retrieval_interval: usize,
    /// The maximum number of loop closure pairs per query.
    pub num_loc: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SequenceOptions {
    pub window_size: usize,
    /// Also pair images at power of two offsets beyond the window.
    pub quadratic_overlap: bool,
    pub loop_closure: Option<LoopClosure>,
}

fn power_of_two(exponent: usize) -> Option<usize> {
    u32::try_from(exponent)
        .ok()
        .and_then(|exponent| 1usize.checked_shl(exponent))
}

/// Index pairs of a sequence of `n` images matched within a sliding window.
pub fn sequential_pairs(n: usize, window_size: usize, quadratic_overlap: bool) -> Vec<(usize, usize)> {
    let mut pairs = vec![];
    for i in 0..n.saturating_sub(1) {
        for j in i + 1..n.min(i + window_size + 1) {
            pairs.push((i, j));
            if quadratic_overlap {
                if let Some(q) = power_of_two(j - i) {
                    if q > window_size && i + q < n {
                        pairs.push((i, i + q));
                    }
                }
            }
        }
    }
    pairs
}

/// Flags, for every loop closure query, the images the sequential pairs already relate it to.
pub fn loop_closure_mask(
    n: usize,
    retrieval_interval: usize,
    window_size: usize,
    quadratic_overlap: bool,
) -> Vec<Vec<bool>> {
    (0..n)
        .step_by(retrieval_interval.max(1))
        .map(|query| {
            let mut row = vec![false; n];
            let mut mask_offset = |offset: usize| {
                if let Some(before) = query.checked_sub(offset) {
                    row[before] = true;
                }
                if let Some(after) = query.checked_add(offset).filter(|&after| after < n) {
                    row[after] = true;
                }
            };
            for k in 0..=window_size {
                mask_offset(k);
                if quadratic_overlap {
                    if let Some(q) = power_of_two(k) {
                        mask_offset(q);
                    }
                }
            }
            row
        })
        .collect()
}

/// Sequential pairs of `image_list`, extended with loop closure pairs when configured.
pub fn sequence_pairs(image_list: &[String], options: &SequenceOptions) -> Result<Vec<Pair>> {
    let n = image_list.len();
    let name_pair = |(a, b): (usize, usize)| (image_list[a].clone(), image_list[b].clone());
    let mut pairs: Vec<Pair> = sequential_pairs(n, options.window_size, options.quadratic_overlap)
        .into_iter()
        .map(name_pair)
        .collect();
    debug!("{} sequential pairs", pairs.len());

    if let Some(loop_closure) = &options.loop_closure {
        if loop_closure.retrieval_interval == 0 {
            return Err(Error::ZeroRetrievalInterval);
        }
        let store = GlobalStore::open_existing(&loop_closure.retrieval_path)?;
        let queries: Vec<String> = image_list
            .iter()
            .step_by(loop_closure.retrieval_interval)
            .cloned()
            .collect();
        let scores = score_matrix(
            &descriptors_of(&store, &queries)?,
            &descriptors_of(&store, image_list)?,
        );
        let mask = loop_closure_mask(
            n,
            loop_closure.retrieval_interval,
            options.window_size,
            options.quadratic_overlap,
        );
        let loop_pairs = pairs_from_scores(&scores, &mask, loop_closure.num_loc.min(n), 0.0);
        debug!(
            "{} loop closure pairs from {} queries",
            loop_pairs.len(),
            queries.len()
        );
        pairs.extend(
            loop_pairs
                .into_iter()
                .map(|(query, db)| (queries[query].clone(), image_list[db].clone())),
        );
    }
    Ok(pairs)
}

/// Writes the pairs of a sequence of images to `output`.
pub fn pairs_from_sequence(
    output: &Path,
    image_list: &[String],
    options: &SequenceOptions,
) -> Result<PathBuf> {
    info!(
        "generating pairs for a sequence of {} images with a window of {}",
        image_list.len(),
        options.window_size
    );
    let pairs = sequence_pairs(image_list, options)?;
    info!("found {} pairs", pairs.len());
    pair_list::write_pairs(output, &pairs)?;
    Ok(output.to_path_buf())
}
