//! Append-only configuration tree with exact nearest-neighbor lookup.

use nalgebra::DVector;

/// One tree node: a configuration plus the index of its parent.
#[derive(Debug, Clone)]
struct TreeNode {
    q: DVector<f64>,
    parent: Option<usize>,
}

/// A rooted tree over configurations. Nodes are append-only and addressed by
/// index; the root always sits at index 0.
///
/// Nearest-neighbor lookup is an exact linear scan under the Euclidean
/// metric, ties broken by insertion order. The planner tolerates approximate
/// answers, so a spatial index can replace the scan without touching callers.
#[derive(Debug)]
pub struct ConfigTree {
    nodes: Vec<TreeNode>,
}

impl ConfigTree {
    /// Create a tree holding only the root configuration.
    pub fn new(root: DVector<f64>) -> Self {
        Self {
            nodes: vec![TreeNode {
                q: root,
                parent: None,
            }],
        }
    }

    /// Append a configuration under an existing parent, returning the new
    /// node's index.
    ///
    /// # Panics
    ///
    /// If `parent` does not refer to an existing node.
    pub fn add_node(&mut self, parent: usize, q: DVector<f64>) -> usize {
        assert!(
            parent < self.nodes.len(),
            "parent index {parent} out of range ({} nodes)",
            self.nodes.len()
        );
        self.nodes.push(TreeNode {
            q,
            parent: Some(parent),
        });
        self.nodes.len() - 1
    }

    /// Index of the node closest to `q`.
    pub fn nearest(&self, q: &DVector<f64>) -> usize {
        self.nodes
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| {
                let da = (&a.q - q).norm_squared();
                let db = (&b.q - q).norm_squared();
                da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
            })
            .map(|(index, _)| index)
            .expect("tree always holds the root")
    }

    pub fn get(&self, index: usize) -> &DVector<f64> {
        &self.nodes[index].q
    }

    pub fn parent(&self, index: usize) -> Option<usize> {
        self.nodes[index].parent
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Configurations from `index` up to the root, in that order.
    pub fn walk_to_root(&self, index: usize) -> Vec<DVector<f64>> {
        let mut path = Vec::new();
        let mut current = Some(index);
        while let Some(node) = current {
            path.push(self.nodes[node].q.clone());
            current = self.nodes[node].parent;
        }
        path
    }
}
