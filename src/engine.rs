//! The distance-computation collaborator: method and option parsing, edit costs, and the
//! [`DistanceEngine`] seam the pipeline computes distances through.
use crate::collection::GraphCollection;
use crate::matrix_parser::DistanceMatrixParser;
use crate::symmetrize::symmetrize;
use crate::HgcError;
use std::fmt::{Debug, Display, Formatter};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Graph edit distance approximation methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GedMethod {
    Branch,
    BranchFast,
    BranchTight,
}

impl GedMethod {
    /// Parses a method name. Short aliases are accepted and an empty name selects
    /// [`GedMethod::Branch`].
    pub fn parse(name: &str) -> Result<Self, HgcError> {
        match name.trim().to_uppercase().as_str() {
            "" => {
                info!("No GED method given, using BRANCH.");
                Ok(GedMethod::Branch)
            }
            "FAST" | "BRANCH_FAST" => Ok(GedMethod::BranchFast),
            "STANDARD" | "BRANCH" => Ok(GedMethod::Branch),
            "TIGHT" | "BRANCH_TIGHT" => Ok(GedMethod::BranchTight),
            _ => Err(HgcError::ConfigurationError(format!(
                "unknown GED method \"{name}\", expected one of FAST, STANDARD, TIGHT"
            ))),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            GedMethod::Branch => "BRANCH",
            GedMethod::BranchFast => "BRANCH_FAST",
            GedMethod::BranchTight => "BRANCH_TIGHT",
        }
    }
}

impl Display for GedMethod {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Whether the engine precomputes its per-graph state when the collection is initialized
/// or on first use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InitType {
    #[default]
    Lazy,
    Eager,
}

impl InitType {
    pub fn parse(name: &str) -> Result<Self, HgcError> {
        match name.trim().to_uppercase().as_str() {
            "" => {
                info!("No init type given, using LAZY.");
                Ok(InitType::Lazy)
            }
            "LAZY" => Ok(InitType::Lazy),
            "EAGER" => Ok(InitType::Eager),
            _ => Err(HgcError::ConfigurationError(format!(
                "unknown init type \"{name}\", expected LAZY or EAGER"
            ))),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            InitType::Lazy => "LAZY",
            InitType::Eager => "EAGER",
        }
    }
}

/// Free-form method options given as `--option value` pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MethodArguments {
    pairs: Vec<(String, String)>,
}

impl MethodArguments {
    /// Parses whitespace separated `--option value` pairs, e.g. `"--threads 4"`.
    pub fn parse(arguments: &str) -> Result<Self, HgcError> {
        Self::from_tokens(arguments.split_whitespace())
    }

    pub fn from_tokens<I, S>(tokens: I) -> Result<Self, HgcError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut pairs = Vec::new();
        let mut tokens = tokens.into_iter();
        while let Some(option) = tokens.next() {
            let option = option.as_ref();
            let Some(name) = option.strip_prefix("--").filter(|name| !name.is_empty()) else {
                return Err(HgcError::ConfigurationError(format!(
                    "method argument \"{option}\" must have the form --option"
                )));
            };
            let value = tokens.next().ok_or_else(|| {
                HgcError::ConfigurationError(format!("method option --{name} has no value"))
            })?;
            pairs.push((name.to_string(), value.as_ref().to_string()));
        }
        Ok(Self { pairs })
    }

    pub fn get(&self, option: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(name, _)| name == option)
            .map(|(_, value)| value.as_str())
    }

    /// Number of threads requested with `--threads`.
    pub fn threads(&self) -> Result<Option<usize>, HgcError> {
        self.get("threads")
            .map(|value| {
                value.parse().map_err(|_| {
                    HgcError::ConfigurationError(format!("--threads expects a count, got \"{value}\""))
                })
            })
            .transpose()
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl Display for MethodArguments {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let joined = self
            .pairs
            .iter()
            .map(|(name, value)| format!("--{name} {value}"))
            .collect::<Vec<_>>()
            .join(" ");
        write!(f, "{joined}")
    }
}

/// User supplied edit operation costs.
pub trait EditCosts: Send + Sync {
    fn node_insertion(&self, label: i64) -> f64;

    fn node_deletion(&self, label: i64) -> f64;

    fn node_relabel(&self, from: i64, to: i64) -> f64;

    fn edge_insertion(&self, label: f64) -> f64;

    fn edge_deletion(&self, label: f64) -> f64;

    fn edge_relabel(&self, from: f64, to: f64) -> f64;
}

/// Template costs: insertions and deletions cost 1, relabelling costs 1 unless the labels
/// are equal.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnitCosts;

impl EditCosts for UnitCosts {
    fn node_insertion(&self, _label: i64) -> f64 {
        1.0
    }

    fn node_deletion(&self, _label: i64) -> f64 {
        1.0
    }

    fn node_relabel(&self, from: i64, to: i64) -> f64 {
        if from == to {
            0.0
        } else {
            1.0
        }
    }

    fn edge_insertion(&self, _label: f64) -> f64 {
        1.0
    }

    fn edge_deletion(&self, _label: f64) -> f64 {
        1.0
    }

    fn edge_relabel(&self, from: f64, to: f64) -> f64 {
        if from == to {
            0.0
        } else {
            1.0
        }
    }
}

/// How the engine obtains its edit costs.
#[derive(Clone, Default)]
pub enum EditCostStrategy {
    Constant,
    Custom(Arc<dyn EditCosts>),
    /// Costs are derived by the engine from the loaded dataset.
    #[default]
    Auto,
}

impl EditCostStrategy {
    pub fn name(&self) -> &'static str {
        match self {
            EditCostStrategy::Constant => "constant",
            EditCostStrategy::Custom(_) => "custom",
            EditCostStrategy::Auto => "auto",
        }
    }
}

impl Debug for EditCostStrategy {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "EditCostStrategy::{}", self.name())
    }
}

/// Everything a [`DistanceEngine`] needs to know before computing distances.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub method: GedMethod,
    pub arguments: MethodArguments,
    pub init_type: InitType,
    pub edit_costs: EditCostStrategy,
}

/// The omics, clinical and cost files of a tabular dataset.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TabularSource {
    pub omics: PathBuf,
    pub clinical: Option<PathBuf>,
    pub costs: Option<PathBuf>,
    /// Whether the engine should derive its edit costs from `costs`.
    pub use_costs: bool,
}

/// An engine computing pairwise dissimilarities between the graphs of a collection.
pub trait DistanceEngine {
    fn configure(&mut self, config: &EngineConfig) -> Result<(), HgcError>;

    /// Name of the configured method, `None` until [`DistanceEngine::configure`] succeeds.
    fn method_name(&self) -> Option<String>;

    fn edit_costs_name(&self) -> String;

    /// Builds graphs from a tabular dataset and adds them to `collection`.
    ///
    /// # Returns
    /// * The number of sample graphs added.
    fn load_dataset(
        &mut self,
        source: &TabularSource,
        collection: &mut dyn GraphCollection,
    ) -> Result<usize, HgcError>;

    /// Square matrix of distances between every pair of graphs, indexed by graph id.
    fn compute_geds(&mut self, collection: &dyn GraphCollection) -> Result<Vec<Vec<f64>>, HgcError>;
}

/// A [`DistanceEngine`] that reads distances computed elsewhere from a distance-matrix
/// text file.
#[derive(Debug, Clone)]
pub struct PrecomputedDistances {
    path: PathBuf,
    config: Option<EngineConfig>,
}

impl PrecomputedDistances {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            config: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DistanceEngine for PrecomputedDistances {
    fn configure(&mut self, config: &EngineConfig) -> Result<(), HgcError> {
        debug!(method = config.method.name(), "precomputed distances ignore the GED method");
        self.config = Some(config.clone());
        Ok(())
    }

    fn method_name(&self) -> Option<String> {
        self.config.as_ref().map(|_| "PRECOMPUTED".to_string())
    }

    fn edit_costs_name(&self) -> String {
        self.config
            .as_ref()
            .map(|config| config.edit_costs.name())
            .unwrap_or("auto")
            .to_string()
    }

    fn load_dataset(
        &mut self,
        _source: &TabularSource,
        _collection: &mut dyn GraphCollection,
    ) -> Result<usize, HgcError> {
        Err(HgcError::NotImplemented(
            "precomputed distances can't build graphs from tabular data".to_string(),
        ))
    }

    fn compute_geds(&mut self, collection: &dyn GraphCollection) -> Result<Vec<Vec<f64>>, HgcError> {
        let mut matrix = DistanceMatrixParser::new().read_path::<f64>(&self.path)?;
        symmetrize(&mut matrix)?;
        if matrix.len() != collection.graph_count() {
            return Err(HgcError::ShapeError(format!(
                "{} holds distances for {} entities but the collection has {} graphs",
                self.path.display(),
                matrix.len(),
                collection.graph_count()
            )));
        }
        Ok(matrix)
    }
}
