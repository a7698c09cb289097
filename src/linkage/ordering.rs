use crate::data_wrappers::LinkageStep;
use crate::symmetrize::condensed_index;
use num_traits::Float;

/// Leaf ranges of every cluster in the current left-to-right layout of a hierarchy.
struct LeafLayout {
    n_samples: usize,
    children: Vec<(usize, usize)>,
    order: Vec<usize>,
    start: Vec<usize>,
    size: Vec<usize>,
}

impl LeafLayout {
    fn new<T>(steps: &[LinkageStep<T>], n_samples: usize) -> Self {
        let n_nodes = n_samples + steps.len();
        let children: Vec<(usize, usize)> = steps.iter().map(|s| (s.left, s.right)).collect();

        let mut size = vec![1; n_nodes];
        for (k, &(left, right)) in children.iter().enumerate() {
            size[n_samples + k] = size[left] + size[right];
        }

        let mut start = vec![0; n_nodes];
        let mut order = vec![0; n_samples];
        let mut stack = vec![n_nodes - 1];
        while let Some(node) = stack.pop() {
            if node < n_samples {
                order[start[node]] = node;
                continue;
            }
            let (left, right) = children[node - n_samples];
            start[left] = start[node];
            start[right] = start[node] + size[left];
            stack.push(right);
            stack.push(left);
        }

        LeafLayout {
            n_samples,
            children,
            order,
            start,
            size,
        }
    }

    fn leaves(&self, node: usize) -> &[usize] {
        &self.order[self.start[node]..self.start[node] + self.size[node]]
    }

    fn contains(&self, node: usize, leaf: usize) -> bool {
        self.leaves(node).contains(&leaf)
    }

    /// Leaves that may end an ordering of `node` that starts at `leaf`.
    fn opposite(&self, node: usize, leaf: usize) -> &[usize] {
        if node < self.n_samples {
            return self.leaves(node);
        }
        let (left, right) = self.children[node - self.n_samples];
        if self.contains(left, leaf) {
            self.leaves(right)
        } else {
            self.leaves(left)
        }
    }
}

/// Reorders the children of each merge so that the sum of distances between adjacent
/// leaves is minimal, without changing the hierarchy (Bar-Joseph, Gifford and Jaakkola).
///
/// `cost[a][b]` holds the cheapest ordering of the smallest cluster containing both `a`
/// and `b` that starts at `a` and ends at `b`; `ends[a][b]` the inner leaves where that
/// ordering crosses from one child to the other.
pub(crate) fn optimal_leaf_ordering<T: Float>(
    steps: &[LinkageStep<T>],
    condensed: &[T],
    n_samples: usize,
) -> Vec<LinkageStep<T>> {
    if steps.len() < 2 {
        return steps.to_vec();
    }
    let layout = LeafLayout::new(steps, n_samples);
    let dist = |a: usize, b: usize| {
        if a == b {
            T::zero()
        } else {
            condensed[condensed_index(n_samples, a, b)]
        }
    };

    let mut cost = vec![vec![T::zero(); n_samples]; n_samples];
    let mut ends = vec![vec![(0, 0); n_samples]; n_samples];
    for step in steps {
        let right_start = layout.start[step.right];
        for &a in layout.leaves(step.left) {
            // Cheapest way to finish the left part and step over to each right leaf.
            let via: Vec<(T, usize)> = layout
                .leaves(step.right)
                .iter()
                .map(|&m| {
                    let mut best = (T::infinity(), a);
                    for &k in layout.opposite(step.left, a) {
                        let c = cost[a][k] + dist(k, m);
                        if c < best.0 {
                            best = (c, k);
                        }
                    }
                    best
                })
                .collect();

            for &b in layout.leaves(step.right) {
                let mut best = (T::infinity(), a, b);
                for &m in layout.opposite(step.right, b) {
                    let (c, k) = via[layout.start[m] - right_start];
                    let c = c + cost[m][b];
                    if c < best.0 {
                        best = (c, k, m);
                    }
                }
                let (c, k, m) = best;
                cost[a][b] = c;
                cost[b][a] = c;
                ends[a][b] = (k, m);
                ends[b][a] = (m, k);
            }
        }
    }

    let root = n_samples + steps.len() - 1;
    let (root_left, root_right) = layout.children[root - n_samples];
    let mut first = (T::infinity(), root_left, root_right);
    for &a in layout.leaves(root_left) {
        for &b in layout.leaves(root_right) {
            if cost[a][b] < first.0 {
                first = (cost[a][b], a, b);
            }
        }
    }

    let mut swapped = vec![false; steps.len()];
    let mut stack = vec![(root, first.1, first.2)];
    while let Some((node, a, b)) = stack.pop() {
        if node < n_samples {
            continue;
        }
        let (left, right) = layout.children[node - n_samples];
        let (outer, inner) = if layout.contains(left, a) {
            (left, right)
        } else {
            swapped[node - n_samples] = true;
            (right, left)
        };
        let (k, m) = ends[a][b];
        stack.push((outer, a, k));
        stack.push((inner, m, b));
    }

    steps
        .iter()
        .zip(swapped)
        .map(|(step, swap)| {
            let mut step = step.clone();
            if swap {
                std::mem::swap(&mut step.left, &mut step.right);
            }
            step
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(left: usize, right: usize, distance: f64, size: usize) -> LinkageStep<f64> {
        LinkageStep {
            left,
            right,
            distance,
            size,
        }
    }

    fn leaf_order(steps: &[LinkageStep<f64>], n: usize) -> Vec<usize> {
        LeafLayout::new(steps, n).order
    }

    #[test]
    fn adjacent_leaves_are_close() {
        // Points on a line at 0, 1, 10, 11; the pair (1, 10) should end up adjacent.
        let points = [0.0, 1.0, 10.0, 11.0];
        let mut condensed = Vec::new();
        for i in 0..4 {
            for j in (i + 1)..4 {
                condensed.push(f64::abs(points[i] - points[j]));
            }
        }
        let steps = vec![step(0, 1, 1.0, 2), step(2, 3, 1.0, 2), step(4, 5, 10.0, 4)];
        let reordered = optimal_leaf_ordering(&steps, &condensed, 4);
        let order = leaf_order(&reordered, 4);
        assert!(order == vec![0, 1, 2, 3] || order == vec![3, 2, 1, 0]);

        let crossed = vec![step(0, 1, 1.0, 2), step(2, 3, 1.0, 2), step(4, 5, 10.0, 4)];
        let flipped: Vec<_> = crossed
            .iter()
            .map(|s| step(s.right, s.left, s.distance, s.size))
            .collect();
        let order = leaf_order(&optimal_leaf_ordering(&flipped, &condensed, 4), 4);
        assert!(order == vec![0, 1, 2, 3] || order == vec![3, 2, 1, 0]);
    }

    #[test]
    fn hierarchy_is_preserved() {
        let condensed = vec![3.0, 1.0, 2.0];
        let steps = vec![step(0, 2, 1.0, 2), step(1, 3, 2.0, 3)];
        let reordered = optimal_leaf_ordering(&steps, &condensed, 3);
        for (before, after) in steps.iter().zip(&reordered) {
            let mut a = [before.left, before.right];
            let mut b = [after.left, after.right];
            a.sort();
            b.sort();
            assert_eq!(a, b);
            assert_eq!(before.distance, after.distance);
        }
    }
}
