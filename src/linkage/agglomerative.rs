use super::union_find::UnionFind;
use super::{LinkageCriterion, LinkageEngine};
use crate::data_wrappers::{LinkageStep, MSTEdge};
use crate::linkage::ordering::optimal_leaf_ordering;
use crate::symmetrize::condensed_index;
use crate::HgcError;
use num_traits::Float;
use std::cmp::Ordering;
use tracing::debug;

/// The default [`LinkageEngine`]. Single linkage is built from a minimum spanning tree;
/// every other criterion repeatedly merges the closest pair of a dense working matrix and
/// updates it with the Lance-Williams formula of the criterion.
#[derive(Debug, Clone, Copy, Default)]
pub struct Agglomerative;

impl<T: Float> LinkageEngine<T> for Agglomerative {
    fn linkage(
        &self,
        condensed: &[T],
        n_samples: usize,
        criterion: LinkageCriterion,
        optimal_ordering: bool,
    ) -> Result<Vec<LinkageStep<T>>, HgcError> {
        validate_condensed(condensed, n_samples)?;
        let steps = match criterion {
            LinkageCriterion::Single => single_linkage(condensed, n_samples),
            _ => lance_williams(condensed, n_samples, criterion),
        };
        debug!(criterion = criterion.name(), merges = steps.len(), "computed linkage");
        if optimal_ordering {
            Ok(optimal_leaf_ordering(&steps, condensed, n_samples))
        } else {
            Ok(steps)
        }
    }
}

fn validate_condensed<T: Float>(condensed: &[T], n_samples: usize) -> Result<(), HgcError> {
    if n_samples == 0 {
        return Err(HgcError::ShapeError(
            "at least one entity is needed to cluster".to_string(),
        ));
    }
    let expected = n_samples * (n_samples - 1) / 2;
    if condensed.len() != expected {
        return Err(HgcError::ShapeError(format!(
            "a condensed matrix over {n_samples} entities has {expected} entries, got {}",
            condensed.len()
        )));
    }
    if let Some(bad) = condensed.iter().find(|d| !d.is_finite() || **d < T::zero()) {
        return Err(HgcError::InvalidDistance(format!(
            "linkage needs finite, non-negative distances, got {:?}",
            bad.to_f64()
        )));
    }
    Ok(())
}

fn single_linkage<T: Float>(condensed: &[T], n_samples: usize) -> Vec<LinkageStep<T>> {
    let mst = prims_min_spanning_tree(condensed, n_samples);
    make_linkage_steps(&mst, n_samples)
}

fn prims_min_spanning_tree<T: Float>(condensed: &[T], n_samples: usize) -> Vec<MSTEdge<T>> {
    let mut in_tree = vec![false; n_samples];
    let mut distances = vec![T::infinity(); n_samples];
    let mut nearest = vec![0; n_samples];
    let mut mst = Vec::with_capacity(n_samples.saturating_sub(1));

    let mut current = 0;
    for _ in 1..n_samples {
        in_tree[current] = true;
        let mut next = None;
        let mut current_min_dist = T::infinity();

        for i in 0..n_samples {
            if in_tree[i] {
                continue;
            }
            let dist = condensed[condensed_index(n_samples, current, i)];
            if dist < distances[i] {
                distances[i] = dist;
                nearest[i] = current;
            }
            if next.is_none() || distances[i] < current_min_dist {
                next = Some(i);
                current_min_dist = distances[i];
            }
        }
        let Some(next) = next else { break };
        mst.push(MSTEdge {
            left_node_id: nearest[next],
            right_node_id: next,
            distance: current_min_dist,
        });
        current = next;
    }
    sort_mst_by_dist(&mut mst);
    mst
}

fn sort_mst_by_dist<T: Float>(min_spanning_tree: &mut [MSTEdge<T>]) {
    min_spanning_tree.sort_by(|a, b| a.distance.partial_cmp(&b.distance).unwrap_or(Ordering::Equal));
}

fn make_linkage_steps<T: Float>(min_spanning_tree: &[MSTEdge<T>], n_samples: usize) -> Vec<LinkageStep<T>> {
    let mut steps = Vec::with_capacity(n_samples.saturating_sub(1));
    let mut union_find = UnionFind::new(n_samples);

    for mst_edge in min_spanning_tree {
        let left_child = union_find.find(mst_edge.left_node_id);
        let right_child = union_find.find(mst_edge.right_node_id);
        let size = union_find.size_of(left_child) + union_find.size_of(right_child);

        steps.push(LinkageStep {
            left: left_child.min(right_child),
            right: left_child.max(right_child),
            distance: mst_edge.distance,
            size,
        });
        union_find.union(left_child, right_child);
    }
    steps
}

/// Naive agglomeration over a dense matrix. Slot `i` of the matrix holds the active
/// cluster `ids[i]`; merging slots `i < j` keeps the new cluster in `i` and retires `j`.
fn lance_williams<T: Float>(
    condensed: &[T],
    n_samples: usize,
    criterion: LinkageCriterion,
) -> Vec<LinkageStep<T>> {
    let mut dist = vec![vec![T::zero(); n_samples]; n_samples];
    for i in 0..n_samples {
        for j in (i + 1)..n_samples {
            let d = condensed[condensed_index(n_samples, i, j)];
            dist[i][j] = d;
            dist[j][i] = d;
        }
    }
    let mut active = vec![true; n_samples];
    let mut ids: Vec<usize> = (0..n_samples).collect();
    let mut sizes = vec![1_usize; n_samples];
    let mut steps = Vec::with_capacity(n_samples.saturating_sub(1));

    for k in 0..n_samples.saturating_sub(1) {
        let Some((x, y)) = closest_pair(&dist, &active) else {
            break;
        };
        let d_xy = dist[x][y];
        let (size_x, size_y) = (sizes[x], sizes[y]);

        for i in 0..n_samples {
            if !active[i] || i == x || i == y {
                continue;
            }
            let updated = update_distance(
                criterion,
                dist[x][i],
                dist[y][i],
                d_xy,
                weight(size_x),
                weight(size_y),
                weight(sizes[i]),
            );
            dist[x][i] = updated;
            dist[i][x] = updated;
        }

        steps.push(LinkageStep {
            left: ids[x].min(ids[y]),
            right: ids[x].max(ids[y]),
            distance: d_xy,
            size: size_x + size_y,
        });
        active[y] = false;
        ids[x] = n_samples + k;
        sizes[x] = size_x + size_y;
    }
    steps
}

/// The active pair with the smallest distance; ties keep the first pair in row order.
fn closest_pair<T: Float>(dist: &[Vec<T>], active: &[bool]) -> Option<(usize, usize)> {
    let mut best: Option<(usize, usize, T)> = None;
    for i in 0..dist.len() {
        if !active[i] {
            continue;
        }
        for j in (i + 1)..dist.len() {
            if !active[j] {
                continue;
            }
            if best.map_or(true, |(_, _, d)| dist[i][j] < d) {
                best = Some((i, j, dist[i][j]));
            }
        }
    }
    best.map(|(i, j, _)| (i, j))
}

fn weight<T: Float>(size: usize) -> T {
    T::from(size).unwrap_or_else(T::max_value)
}

/// Distance from the union of clusters `x` and `y` to cluster `i`.
fn update_distance<T: Float>(
    criterion: LinkageCriterion,
    d_xi: T,
    d_yi: T,
    d_xy: T,
    size_x: T,
    size_y: T,
    size_i: T,
) -> T {
    let two = T::one() + T::one();
    let half = T::one() / two;
    let quarter = half * half;
    let size_xy = size_x + size_y;
    match criterion {
        LinkageCriterion::Single => d_xi.min(d_yi),
        LinkageCriterion::Complete => d_xi.max(d_yi),
        LinkageCriterion::Average => (size_x * d_xi + size_y * d_yi) / size_xy,
        LinkageCriterion::Weighted => half * (d_xi + d_yi),
        LinkageCriterion::Centroid => {
            let squared = (size_x * d_xi.powi(2) + size_y * d_yi.powi(2)
                - size_x * size_y * d_xy.powi(2) / size_xy)
                / size_xy;
            squared.max(T::zero()).sqrt()
        }
        LinkageCriterion::Median => {
            let squared = half * (d_xi.powi(2) + d_yi.powi(2)) - quarter * d_xy.powi(2);
            squared.max(T::zero()).sqrt()
        }
        LinkageCriterion::Ward => {
            let squared = ((size_i + size_x) * d_xi.powi(2) + (size_i + size_y) * d_yi.powi(2)
                - size_i * d_xy.powi(2))
                / (size_xy + size_i);
            squared.max(T::zero()).sqrt()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symmetrize::condense;

    fn condensed_line(points: &[f64]) -> Vec<f64> {
        let matrix: Vec<Vec<f64>> = points
            .iter()
            .map(|a| points.iter().map(|b| (a - b).abs()).collect())
            .collect();
        condense(&matrix).unwrap()
    }

    fn run(points: &[f64], criterion: LinkageCriterion) -> Vec<LinkageStep<f64>> {
        Agglomerative
            .linkage(&condensed_line(points), points.len(), criterion, false)
            .unwrap()
    }

    #[test]
    fn single_linkage_from_spanning_tree() {
        let steps = run(&[0.0, 1.0, 5.0, 11.0], LinkageCriterion::Single);
        assert_eq!(
            steps,
            vec![
                LinkageStep { left: 0, right: 1, distance: 1.0, size: 2 },
                LinkageStep { left: 2, right: 4, distance: 4.0, size: 3 },
                LinkageStep { left: 3, right: 5, distance: 6.0, size: 4 },
            ]
        );
    }

    #[test]
    fn complete_and_average_distances() {
        let complete = run(&[0.0, 1.0, 5.0, 11.0], LinkageCriterion::Complete);
        assert_eq!(complete[1], LinkageStep { left: 2, right: 4, distance: 5.0, size: 3 });
        assert_eq!(complete[2].distance, 11.0);

        let average = run(&[0.0, 1.0, 5.0, 11.0], LinkageCriterion::Average);
        assert_eq!(average[1].distance, 4.5);
        assert_eq!(average[2].distance, (11.0 + 10.0 + 6.0) / 3.0);
    }

    #[test]
    fn ward_on_two_pairs() {
        let steps = run(&[0.0, 2.0, 10.0, 12.0], LinkageCriterion::Ward);
        assert_eq!(steps[0], LinkageStep { left: 0, right: 1, distance: 2.0, size: 2 });
        assert_eq!(steps[1], LinkageStep { left: 2, right: 3, distance: 2.0, size: 2 });
        assert_eq!(steps[2].left, 4);
        assert_eq!(steps[2].right, 5);
        assert!((steps[2].distance - f64::sqrt(200.0)).abs() < 1e-9);
    }

    #[test]
    fn every_criterion_merges_everything() {
        for criterion in LinkageCriterion::ALL {
            let steps = run(&[3.0, 0.5, 7.0, 2.0, 9.5], criterion);
            assert_eq!(steps.len(), 4);
            assert_eq!(steps.last().unwrap().size, 5);
            assert!(steps.iter().all(|step| step.left < step.right));
        }
    }

    #[test]
    fn single_entity_has_no_merges() {
        let steps = Agglomerative
            .linkage(&[] as &[f64], 1, LinkageCriterion::Average, true)
            .unwrap();
        assert!(steps.is_empty());
    }

    #[test]
    fn rejects_bad_input() {
        assert!(matches!(
            Agglomerative.linkage(&[1.0_f64, 2.0], 3, LinkageCriterion::Single, false),
            Err(HgcError::ShapeError(..))
        ));
        assert!(matches!(
            Agglomerative.linkage(&[f64::NAN], 2, LinkageCriterion::Single, false),
            Err(HgcError::InvalidDistance(..))
        ));
        assert!(matches!(
            Agglomerative.linkage(&[] as &[f64], 0, LinkageCriterion::Single, false),
            Err(HgcError::ShapeError(..))
        ));
    }
}
