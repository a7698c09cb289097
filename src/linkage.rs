use crate::data_wrappers::LinkageStep;
use crate::HgcError;
use std::fmt::{Display, Formatter};
use tracing::info;

mod agglomerative;
mod ordering;
mod union_find;

pub use agglomerative::Agglomerative;

/// Rules for the distance between two clusters during agglomerative merging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkageCriterion {
    Single,
    Complete,
    Average,
    Weighted,
    Centroid,
    Median,
    Ward,
}

impl LinkageCriterion {
    pub const ALL: [LinkageCriterion; 7] = [
        LinkageCriterion::Single,
        LinkageCriterion::Complete,
        LinkageCriterion::Average,
        LinkageCriterion::Weighted,
        LinkageCriterion::Centroid,
        LinkageCriterion::Median,
        LinkageCriterion::Ward,
    ];

    /// Maps a clustering criterion name to a linkage criterion. Accepts the method names
    /// (`nearest point`, `farthest point`, `upgma`, `wpgma`, `upgmc`, `wpgmc`,
    /// `incremental`) as well as the canonical linkage names. An empty name selects
    /// average linkage.
    ///
    /// # Returns
    /// * `NotImplemented` for `diana`, since only bottom-up clustering is supported.
    /// * `AmbiguousCriterion` for `agnes`, which doesn't name a specific criterion.
    /// * `InvalidCriterion` for any other name.
    pub fn from_name(name: &str) -> Result<Self, HgcError> {
        let normalized = name.trim().to_lowercase().replace(['_', '-'], " ");
        match normalized.as_str() {
            "" => {
                info!("No clustering criterion given, using upgma (average linkage).");
                Ok(LinkageCriterion::Average)
            }
            "nearest point" | "single" => Ok(LinkageCriterion::Single),
            "farthest point" | "complete" => Ok(LinkageCriterion::Complete),
            "upgma" | "average" => Ok(LinkageCriterion::Average),
            "wpgma" | "weighted" => Ok(LinkageCriterion::Weighted),
            "upgmc" | "centroid" => Ok(LinkageCriterion::Centroid),
            "wpgmc" | "median" => Ok(LinkageCriterion::Median),
            "incremental" | "ward" => Ok(LinkageCriterion::Ward),
            "diana" => Err(HgcError::NotImplemented(
                "divisive (top-down) clustering; only agglomerative clustering is supported"
                    .to_string(),
            )),
            "agnes" => Err(HgcError::AmbiguousCriterion(name.to_string())),
            _ => Err(HgcError::InvalidCriterion(name.to_string())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            LinkageCriterion::Single => "single",
            LinkageCriterion::Complete => "complete",
            LinkageCriterion::Average => "average",
            LinkageCriterion::Weighted => "weighted",
            LinkageCriterion::Centroid => "centroid",
            LinkageCriterion::Median => "median",
            LinkageCriterion::Ward => "ward",
        }
    }
}

impl Display for LinkageCriterion {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Builds a merge hierarchy from condensed pairwise distances.
pub trait LinkageEngine<T> {
    /// # Parameters
    /// * `condensed` - the upper triangle of the distance matrix, row by row.
    /// * `n_samples` - the number of entities.
    /// * `criterion` - the rule for inter-cluster distances.
    /// * `optimal_ordering` - whether to reorder children so adjacent leaves are close.
    ///
    /// # Returns
    /// * `n_samples - 1` merges. The merge at position `k` creates cluster `n_samples + k`.
    fn linkage(
        &self,
        condensed: &[T],
        n_samples: usize,
        criterion: LinkageCriterion,
        optimal_ordering: bool,
    ) -> Result<Vec<LinkageStep<T>>, HgcError>;
}
