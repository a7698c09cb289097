use crate::graph::ExchangeGraph;
use crate::tree::ClusterTree;
use crate::HgcError;
use std::path::Path;
use tracing::info;

/// Draws clustering results. Implementations write an image to `target` when one is given
/// and open an interactive view when `show` is set.
pub trait Renderer {
    /// Draws the dendrogram of `tree` with `labels` on its leaves.
    fn render_dendrogram(
        &self,
        tree: &ClusterTree<f64>,
        labels: &[String],
        target: Option<&Path>,
        show: bool,
    ) -> Result<(), HgcError>;

    /// Draws the flattened cluster tree.
    fn render_graph(
        &self,
        graph: &ExchangeGraph,
        target: Option<&Path>,
        show: bool,
    ) -> Result<(), HgcError>;
}

/// A [`Renderer`] that draws nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRenderer;

impl Renderer for NoRenderer {
    fn render_dendrogram(
        &self,
        tree: &ClusterTree<f64>,
        _labels: &[String],
        target: Option<&Path>,
        _show: bool,
    ) -> Result<(), HgcError> {
        if let Some(target) = target {
            info!(
                leaves = tree.leaf_count(),
                "No renderer configured, skipping dendrogram {}",
                target.display()
            );
        }
        Ok(())
    }

    fn render_graph(
        &self,
        graph: &ExchangeGraph,
        target: Option<&Path>,
        _show: bool,
    ) -> Result<(), HgcError> {
        if let Some(target) = target {
            info!(
                nodes = graph.node_count(),
                "No renderer configured, skipping graph plot {}",
                target.display()
            );
        }
        Ok(())
    }
}
