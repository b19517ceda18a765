use kiddo::{ImmutableKdTree, SquaredEuclidean};

use crate::consts::{EXCLUSIVE_RADIUS, GOOD_MUTUAL_RADIUS};

/// Outcome of matching one tile's transformed reads against a catalog.
///
/// `pairs` is the hit set used for refinement: the union of exclusive and
/// good-mutual matches as `(read_index, catalog_index)`, ordered by read
/// index.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HitSummary {
    pub pairs: Vec<(usize, usize)>,
    pub exclusive: usize,
    pub good_mutual: usize,
    pub bad_mutual: usize,
    pub non_mutual: usize,
}

impl HitSummary {
    pub fn hit_count(&self) -> usize {
        self.exclusive + self.good_mutual
    }
}

/// Classify mutual-nearest-neighbor pairs between transformed read points
/// and catalog detections.
///
/// A pair is *mutual* when each point is the other's nearest neighbor.
/// Mutual pairs that are one-to-one within [`EXCLUSIVE_RADIUS`] are
/// exclusive hits; other mutual pairs within [`GOOD_MUTUAL_RADIUS`] are
/// good-mutual; mutual pairs beyond that are bad-mutual. Reads whose nearest
/// catalog point does not reciprocate but lies within the good-mutual radius
/// count as non-mutual.
pub fn classify_hits(reads: &[[f64; 2]], catalog: &[[f64; 2]]) -> HitSummary {
    if reads.is_empty() || catalog.is_empty() {
        return HitSummary::default();
    }

    let read_tree: ImmutableKdTree<f64, 2> = ImmutableKdTree::new_from_slice(reads);
    let cat_tree: ImmutableKdTree<f64, 2> = ImmutableKdTree::new_from_slice(catalog);

    let nearest_cat: Vec<(usize, f64)> = reads
        .iter()
        .map(|p| {
            let nn = cat_tree.nearest_one::<SquaredEuclidean>(p);
            (nn.item as usize, nn.distance.sqrt())
        })
        .collect();
    let nearest_read: Vec<usize> = catalog
        .iter()
        .map(|p| read_tree.nearest_one::<SquaredEuclidean>(p).item as usize)
        .collect();

    let exclusive_sq = EXCLUSIVE_RADIUS * EXCLUSIVE_RADIUS;
    let mut summary = HitSummary::default();
    for (i, &(j, dist)) in nearest_cat.iter().enumerate() {
        if nearest_read[j] != i {
            if dist <= GOOD_MUTUAL_RADIUS {
                summary.non_mutual += 1;
            }
            continue;
        }
        let one_to_one = dist <= EXCLUSIVE_RADIUS
            && cat_tree
                .within_unsorted::<SquaredEuclidean>(&reads[i], exclusive_sq)
                .len()
                == 1
            && read_tree
                .within_unsorted::<SquaredEuclidean>(&catalog[j], exclusive_sq)
                .len()
                == 1;
        if one_to_one {
            summary.exclusive += 1;
            summary.pairs.push((i, j));
        } else if dist <= GOOD_MUTUAL_RADIUS {
            summary.good_mutual += 1;
            summary.pairs.push((i, j));
        } else {
            summary.bad_mutual += 1;
        }
    }
    summary
}
