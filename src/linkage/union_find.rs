/// Disjoint sets over the `2n - 1` cluster ids of a merge hierarchy. Merging two roots
/// creates the next cluster id, starting at `n`.
pub(crate) struct UnionFind {
    parent: Vec<usize>,
    next_label: usize,
    size: Vec<usize>,
}

impl UnionFind {
    pub(crate) fn new(n_samples: usize) -> Self {
        let length = (2 * n_samples).saturating_sub(1);
        let parent = (0..length).collect();
        let size = (0..length)
            .map(|n| if n < n_samples { 1 } else { 0 })
            .collect();

        UnionFind {
            parent,
            next_label: n_samples,
            size,
        }
    }

    /// Merges the clusters rooted at `m` and `n` into a new cluster.
    ///
    /// # Returns
    /// * The id of the new cluster.
    pub(crate) fn union(&mut self, m: usize, n: usize) -> usize {
        let label = self.next_label;
        self.parent[m] = label;
        self.parent[n] = label;
        self.size[label] = self.size[m] + self.size[n];
        self.next_label += 1;
        label
    }

    pub(crate) fn find(&mut self, n: usize) -> usize {
        let mut root = n;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        let mut p = n;
        while self.parent[p] != root {
            let next = self.parent[p];
            self.parent[p] = root;
            p = next;
        }
        root
    }

    pub(crate) fn size_of(&self, n: usize) -> usize {
        self.size[n]
    }
}
